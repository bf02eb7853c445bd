//! Import directive parsing.
//!
//! Accepts the forms an editor hands over:
//! - `import java.util.*;`
//! - `import java.util.List;`
//! - `import static java.lang.Math.max;` / `import static java.lang.Math.*;`
//! - a bare dotted path such as `java.util.List` or `java.util.*`

use crate::error::ImportSyntaxError;
use std::fmt;
use std::str::FromStr;

/// Trailing segment marking an on-demand import
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportDirective {
    /// Dotted identifiers, without the wildcard
    pub segments: Vec<String>,
    pub wildcard: bool,
    pub is_static: bool,
}

impl ImportDirective {
    pub fn single(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            wildcard: false,
            is_static: false,
        }
    }

    pub fn on_demand(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            wildcard: true,
            is_static: false,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ImportSyntaxError> {
        let mut body = text.trim();
        body = body.strip_suffix(';').unwrap_or(body).trim_end();
        body = strip_keyword(body, "import");

        let mut is_static = false;
        let stripped = strip_keyword(body, "static");
        if stripped.len() != body.len() {
            is_static = true;
            body = stripped;
        }

        if body.is_empty() {
            return Err(ImportSyntaxError::Empty);
        }

        let parts: Vec<&str> = body.split('.').map(str::trim).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut wildcard = false;

        for (i, part) in parts.iter().enumerate() {
            if *part == WILDCARD {
                if i + 1 != parts.len() {
                    return Err(ImportSyntaxError::MisplacedWildcard(text.to_string()));
                }
                wildcard = true;
                continue;
            }
            if !is_identifier(part) {
                return Err(ImportSyntaxError::InvalidSegment {
                    text: text.to_string(),
                    segment: part.to_string(),
                });
            }
            segments.push(part.to_string());
        }

        if segments.is_empty() {
            return Err(ImportSyntaxError::Empty);
        }
        // A static import names a member (or all members) of a type, so it
        // needs a type plus a member.
        if is_static && !wildcard && segments.len() < 2 {
            return Err(ImportSyntaxError::IncompleteStatic(text.to_string()));
        }

        Ok(Self {
            segments,
            wildcard,
            is_static,
        })
    }

    /// The identifier chain that locates the imported types in a package
    /// tree, with `*` appended for on-demand imports.
    ///
    /// Static imports bring members into scope; the chain for them names the
    /// declaring type.
    pub fn type_chain(&self) -> Vec<&str> {
        let mut chain: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        if self.is_static {
            if !self.wildcard {
                chain.pop();
            }
        } else if self.wildcard {
            chain.push(WILDCARD);
        }
        chain
    }
}

impl FromStr for ImportDirective {
    type Err = ImportSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImportDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("import ")?;
        if self.is_static {
            f.write_str("static ")?;
        }
        f.write_str(&self.segments.join("."))?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        f.write_str(";")
    }
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> &'a str {
    match text.strip_prefix(keyword) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            rest.trim_start()
        }
        _ => text,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_on_demand() {
        let d = ImportDirective::parse("import java.util.*;").unwrap();
        assert_eq!(d.segments, vec!["java", "util"]);
        assert!(d.wildcard);
        assert!(!d.is_static);
        assert_eq!(d.type_chain(), vec!["java", "util", "*"]);
    }

    #[test]
    fn test_parse_single_type_without_keyword() {
        let d: ImportDirective = "java.util.List".parse().unwrap();
        assert_eq!(d, ImportDirective::single(["java", "util", "List"]));
        assert_eq!(d.type_chain(), vec!["java", "util", "List"]);
    }

    #[test]
    fn test_parse_tolerates_spacing() {
        let d = ImportDirective::parse("  import  java . util . Map ;").unwrap();
        assert_eq!(d.segments, vec!["java", "util", "Map"]);
    }

    #[test]
    fn test_static_imports_name_declaring_type() {
        let member = ImportDirective::parse("import static java.lang.Math.max;").unwrap();
        assert!(member.is_static);
        assert_eq!(member.type_chain(), vec!["java", "lang", "Math"]);

        let all = ImportDirective::parse("import static java.lang.Math.*;").unwrap();
        assert_eq!(all.type_chain(), vec!["java", "lang", "Math"]);
    }

    #[test]
    fn test_package_named_static_is_not_a_keyword() {
        let d = ImportDirective::parse("import statics.Helper;").unwrap();
        assert!(!d.is_static);
        assert_eq!(d.segments, vec!["statics", "Helper"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ImportDirective::parse("import ;"), Err(ImportSyntaxError::Empty));
        assert_eq!(ImportDirective::parse("*"), Err(ImportSyntaxError::Empty));
        assert!(matches!(
            ImportDirective::parse("import java.*.List;"),
            Err(ImportSyntaxError::MisplacedWildcard(_))
        ));
        assert!(matches!(
            ImportDirective::parse("import java..List;"),
            Err(ImportSyntaxError::InvalidSegment { .. })
        ));
        assert!(matches!(
            ImportDirective::parse("import 1java.List;"),
            Err(ImportSyntaxError::InvalidSegment { .. })
        ));
        assert!(matches!(
            ImportDirective::parse("import static Math;"),
            Err(ImportSyntaxError::IncompleteStatic(_))
        ));
    }

    #[test]
    fn test_display() {
        let d = ImportDirective::parse("import static java.lang.Math.*").unwrap();
        assert_eq!(d.to_string(), "import static java.lang.Math.*;");
    }
}
