//! Minimal reader for generic signatures (JVMS 4.7.9.1), enough to list the
//! type parameters of a class or method with their erased bounds.

use classdex_api::TypeParameter;

/// Type parameters declared by a class or method signature, e.g.
/// `<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;`.
///
/// Malformed signatures yield no parameters.
pub fn type_parameters(signature: &str) -> Vec<TypeParameter> {
    let mut reader = Reader {
        bytes: signature.as_bytes(),
        pos: 0,
    };
    reader.type_parameters().unwrap_or_default()
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.peek()? == byte).then(|| self.pos += 1)
    }

    fn take_until(&mut self, stop: impl Fn(u8) -> bool) -> Option<&str> {
        let start = self.pos;
        while !stop(self.peek()?) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).ok()
    }

    fn type_parameters(&mut self) -> Option<Vec<TypeParameter>> {
        if self.peek() != Some(b'<') {
            return Some(Vec::new());
        }
        self.pos += 1;

        let mut params = Vec::new();
        while self.peek()? != b'>' {
            let name = self.take_until(|b| b == b':')?.to_string();
            let mut bounds = Vec::new();
            // Class bound (possibly empty), then interface bounds.
            while self.peek() == Some(b':') {
                self.pos += 1;
                if matches!(self.peek()?, b'L' | b'T' | b'[') {
                    bounds.push(self.reference_type()?);
                }
            }
            if name.is_empty() {
                return None;
            }
            params.push(TypeParameter { name, bounds });
        }
        self.expect(b'>')?;
        Some(params)
    }

    /// Read one reference type signature and return its erasure
    fn reference_type(&mut self) -> Option<String> {
        match self.peek()? {
            b'L' => {
                self.pos += 1;
                let name = self.take_until(|b| b == b'<' || b == b';' || b == b'.')?;
                let name = name.replace('/', ".");
                self.skip_class_tail()?;
                Some(name)
            }
            b'T' => {
                self.pos += 1;
                let name = self.take_until(|b| b == b';')?.to_string();
                self.expect(b';')?;
                Some(name)
            }
            b'[' => {
                self.pos += 1;
                let element = match self.peek()? {
                    b'L' | b'T' | b'[' => self.reference_type()?,
                    base => {
                        self.pos += 1;
                        base_name(base)?.to_string()
                    }
                };
                Some(format!("{}[]", element))
            }
            _ => None,
        }
    }

    /// Skip type arguments and inner-class suffixes up to and including the
    /// terminating `;`
    fn skip_class_tail(&mut self) -> Option<()> {
        let mut depth = 0usize;
        loop {
            let byte = self.peek()?;
            self.pos += 1;
            match byte {
                b'<' => depth += 1,
                b'>' => depth = depth.checked_sub(1)?,
                b';' if depth == 0 => return Some(()),
                _ => {}
            }
        }
    }
}

fn base_name(descriptor: u8) -> Option<&'static str> {
    Some(match descriptor {
        b'B' => "byte",
        b'C' => "char",
        b'D' => "double",
        b'F' => "float",
        b'I' => "int",
        b'J' => "long",
        b'S' => "short",
        b'Z' => "boolean",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &[TypeParameter]) -> Vec<(&str, Vec<&str>)> {
        params
            .iter()
            .map(|p| (p.name.as_str(), p.bounds.iter().map(String::as_str).collect()))
            .collect()
    }

    #[test]
    fn test_map_signature() {
        let params =
            type_parameters("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Map<TK;TV;>;");
        assert_eq!(
            names(&params),
            vec![
                ("K", vec!["java.lang.Object"]),
                ("V", vec!["java.lang.Object"])
            ]
        );
    }

    #[test]
    fn test_interface_bounds_and_nested_arguments() {
        let params = type_parameters(
            "<T::Ljava/lang/Comparable<-TT;>;E:Ljava/lang/Enum<TE;>;:Ljava/io/Serializable;>Ljava/lang/Object;",
        );
        assert_eq!(
            names(&params),
            vec![
                ("T", vec!["java.lang.Comparable"]),
                ("E", vec!["java.lang.Enum", "java.io.Serializable"])
            ]
        );
    }

    #[test]
    fn test_type_variable_and_array_bounds() {
        let params = type_parameters("<A:Ljava/lang/Object;B:TA;>(TB;)V");
        assert_eq!(names(&params)[1], ("B", vec!["A"]));
    }

    #[test]
    fn test_no_or_malformed_parameters() {
        assert!(type_parameters("Ljava/lang/Object;").is_empty());
        assert!(type_parameters("<T:Ljava/lang/Object").is_empty());
        assert!(type_parameters("").is_empty());
    }
}
