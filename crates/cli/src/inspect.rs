use classdex_api::TypeShape;
use classdex_java::DetachedShape;
use std::path::Path;

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let shape = DetachedShape::from_file(path)?;
    print!("{}", describe(&shape));
    Ok(())
}

/// Human readable summary of a class file's declared members
fn describe(shape: &dyn TypeShape) -> String {
    let mut out = String::new();
    let kind = if shape.is_interface() { "interface" } else { "class" };
    out.push_str(&format!("{} {}\n", kind, shape.name()));

    if let Some(module) = shape.module_name() {
        out.push_str(&format!("  module: {}\n", module));
    }

    let params = shape.type_params();
    if !params.is_empty() {
        let params: Vec<String> = params
            .iter()
            .map(|p| {
                if p.bounds.is_empty() {
                    p.name.clone()
                } else {
                    format!("{} extends {}", p.name, p.bounds.join(" & "))
                }
            })
            .collect();
        out.push_str(&format!("  type parameters: <{}>\n", params.join(", ")));
    }

    let supers: Vec<String> = shape.super_types().iter().map(ToString::to_string).collect();
    if !supers.is_empty() {
        out.push_str(&format!("  supertypes: {}\n", supers.join(", ")));
    }

    for field in shape.fields().values() {
        out.push_str(&format!(
            "  field {} {}{}\n",
            field.type_ref,
            field.name,
            modifiers(&field.modifiers)
        ));
    }
    for ctor in shape.constructors() {
        out.push_str(&format!("  constructor {}{}\n", ctor, modifiers(&ctor.modifiers)));
    }
    for overloads in shape.methods().values() {
        for method in overloads {
            out.push_str(&format!("  method {}{}\n", method, modifiers(&method.modifiers)));
        }
    }
    out
}

fn modifiers(modifiers: &[String]) -> String {
    if modifiers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", modifiers.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classdex_java::testing::{ClassFileBuilder, access};

    #[test]
    fn test_describe_class_file() {
        let bytes = ClassFileBuilder::class("app/Main")
            .field(access::PRIVATE, "count", "I")
            .method(access::PUBLIC, "run", "()V")
            .build();
        let shape = DetachedShape::from_bytes(bytes).unwrap();

        let text = describe(&shape);
        assert!(text.starts_with("class app.Main\n"));
        assert!(text.contains("supertypes: java.lang.Object"));
        assert!(text.contains("field int count [private]"));
        assert!(text.contains("method void run() [public]"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(run(&temp.path().join("Missing.class")).is_err());
    }
}
