//! A parsed class file together with where it came from.

use crate::converter::{JavaModifierConverter, JavaTypeConverter};
use crate::error::LoadError;
use crate::signature;
use classdex_api::{FieldInfo, MethodInfo, OBJECT, TypeParameter, TypeRef};
use ristretto_classfile::attributes::Attribute;
use ristretto_classfile::{ClassAccessFlags, ClassFile, MethodAccessFlags};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::debug;

const ACC_STATIC: u16 = 0x0008;

/// Entry of the InnerClasses attribute, with names in dotted binary form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedClass {
    pub binary_name: String,
    pub outer: Option<String>,
    pub simple_name: Option<String>,
    pub is_static: bool,
}

pub struct LoadedClass {
    binary_name: String,
    class_file: ClassFile,
    module: Option<String>,
    source: Option<PathBuf>,
}

impl LoadedClass {
    /// Parse class file bytes. The binary name is taken from the class file
    /// itself.
    pub fn parse(
        bytes: Vec<u8>,
        module: Option<String>,
        source: Option<PathBuf>,
    ) -> Result<Self, LoadError> {
        let label = source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<bytes>".to_string());
        let class_file =
            ClassFile::from_bytes(&mut Cursor::new(bytes)).map_err(|e| LoadError::Malformed {
                name: label.clone(),
                reason: format!("{e:?}"),
            })?;
        let binary_name = class_file
            .constant_pool
            .try_get_class(class_file.this_class)
            .map(|name| name.replace('/', "."))
            .map_err(|e| LoadError::Malformed {
                name: label,
                reason: format!("unreadable this_class: {e:?}"),
            })?;

        Ok(Self {
            binary_name,
            class_file,
            module,
            source,
        })
    }

    pub fn class_file(&self) -> &ClassFile {
        &self.class_file
    }

    /// Dotted binary name, e.g. `java.util.Map$Entry`
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn simple_name(&self) -> &str {
        let tail = self
            .binary_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.binary_name);
        tail.rsplit('$').next().unwrap_or(tail)
    }

    /// Defining module, known for classes read from a runtime image
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Classpath entry or file the class was read from
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    pub fn is_interface(&self) -> bool {
        self.class_file
            .access_flags
            .contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_public(&self) -> bool {
        self.class_file.access_flags.contains(ClassAccessFlags::PUBLIC)
    }

    pub fn is_final(&self) -> bool {
        self.class_file.access_flags.contains(ClassAccessFlags::FINAL)
    }

    /// Static nested classes are flagged in the InnerClasses attribute only
    pub fn is_static(&self) -> bool {
        self.nested_classes()
            .iter()
            .any(|n| n.binary_name == self.binary_name && n.is_static)
    }

    pub fn modifiers(&self) -> Vec<String> {
        JavaModifierConverter::parse_class(self.class_file.access_flags)
    }

    pub fn super_name(&self) -> Option<String> {
        if self.class_file.super_class == 0 {
            return None;
        }
        self.class_name_at(self.class_file.super_class)
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.class_file
            .interfaces
            .iter()
            .filter_map(|&index| self.class_name_at(index))
            .collect()
    }

    /// Superclass, then interfaces. An interface without superinterfaces
    /// reports `java.lang.Object`.
    pub fn declared_super_names(&self) -> Vec<String> {
        let interfaces = self.interface_names();
        if self.is_interface() && interfaces.is_empty() {
            return vec![OBJECT.to_string()];
        }
        let mut names: Vec<String> = if self.is_interface() {
            Vec::new()
        } else {
            self.super_name().into_iter().collect()
        };
        names.extend(interfaces);
        names
    }

    pub fn type_params(&self) -> Vec<TypeParameter> {
        self.signature(&self.class_file.attributes)
            .map(|sig| signature::type_parameters(&sig))
            .unwrap_or_default()
    }

    pub fn fields(&self) -> BTreeMap<String, FieldInfo> {
        let pool = &self.class_file.constant_pool;
        self.class_file
            .fields
            .iter()
            .filter_map(|field| {
                let name = pool.try_get_utf8(field.name_index).ok()?.to_string();
                let info = FieldInfo {
                    name: name.clone(),
                    type_ref: JavaTypeConverter::convert_type(&field.field_type),
                    modifiers: JavaModifierConverter::parse_field(field.access_flags),
                };
                Some((name, info))
            })
            .collect()
    }

    /// Declared methods grouped by name, excluding constructors and static
    /// initializers
    pub fn methods(&self) -> BTreeMap<String, Vec<MethodInfo>> {
        let mut methods: BTreeMap<String, Vec<MethodInfo>> = BTreeMap::new();
        for (name, info) in self.method_infos() {
            if name == "<init>" || name == "<clinit>" {
                continue;
            }
            methods.entry(name).or_default().push(info);
        }
        methods
    }

    pub fn constructors(&self) -> Vec<MethodInfo> {
        let simple = self.simple_name().to_string();
        self.method_infos()
            .into_iter()
            .filter(|(name, _)| name == "<init>")
            .map(|(_, mut info)| {
                info.name = simple.clone();
                info
            })
            .collect()
    }

    fn method_infos(&self) -> Vec<(String, MethodInfo)> {
        let pool = &self.class_file.constant_pool;
        self.class_file
            .methods
            .iter()
            .filter_map(|method| {
                let name = pool.try_get_utf8(method.name_index).ok()?.to_string();
                let descriptor = pool.try_get_utf8(method.descriptor_index).ok()?;
                let (return_type, parameters) = match JavaTypeConverter::convert_method(descriptor)
                {
                    Ok(converted) => converted,
                    Err(e) => {
                        debug!(
                            "Skipping {}.{}: bad descriptor {}: {e:?}",
                            self.binary_name, name, descriptor
                        );
                        return None;
                    }
                };
                let info = MethodInfo {
                    name: name.clone(),
                    return_type,
                    parameters,
                    modifiers: JavaModifierConverter::parse_method(method.access_flags),
                    is_varargs: method.access_flags.contains(MethodAccessFlags::VARARGS),
                    generic_signature: self.signature(&method.attributes),
                };
                Some((name, info))
            })
            .collect()
    }

    /// Entries of the InnerClasses attribute
    pub fn nested_classes(&self) -> Vec<NestedClass> {
        let pool = &self.class_file.constant_pool;
        let mut nested = Vec::new();
        for attribute in &self.class_file.attributes {
            let Attribute::InnerClasses { classes, .. } = attribute else {
                continue;
            };
            for entry in classes {
                let Some(binary_name) = self.class_name_at(entry.class_info_index) else {
                    continue;
                };
                let outer = (entry.outer_class_info_index != 0)
                    .then(|| self.class_name_at(entry.outer_class_info_index))
                    .flatten();
                let simple_name = (entry.name_index != 0)
                    .then(|| pool.try_get_utf8(entry.name_index).ok().map(|s| s.to_string()))
                    .flatten();
                nested.push(NestedClass {
                    binary_name,
                    outer,
                    simple_name,
                    is_static: entry.access_flags.bits() & ACC_STATIC != 0,
                });
            }
        }
        nested
    }

    /// Binary name of the enclosing class of a nested class
    pub fn outer_name(&self) -> Option<String> {
        let declared = self
            .nested_classes()
            .into_iter()
            .find(|n| n.binary_name == self.binary_name)
            .and_then(|n| n.outer);
        declared.or_else(|| {
            let idx = self.binary_name.rfind('$')?;
            Some(self.binary_name[..idx].to_string())
        })
    }

    /// Binary names of member classes declared directly in this class,
    /// whose name after the last `$` equals `name`
    pub fn inner_class_name(&self, name: &str) -> Option<String> {
        self.nested_classes()
            .into_iter()
            .filter(|n| n.outer.as_deref() == Some(self.binary_name.as_str()))
            .map(|n| n.binary_name)
            .find(|binary| binary.rsplit('$').next() == Some(name))
    }

    fn class_name_at(&self, index: u16) -> Option<String> {
        self.class_file
            .constant_pool
            .try_get_class(index)
            .ok()
            .map(|name| name.replace('/', "."))
    }

    fn signature(&self, attributes: &[Attribute]) -> Option<String> {
        attributes.iter().find_map(|attribute| match attribute {
            Attribute::Signature {
                signature_index, ..
            } => self
                .class_file
                .constant_pool
                .try_get_utf8(*signature_index)
                .ok()
                .map(|s| s.to_string()),
            _ => None,
        })
    }

    /// Declared supertypes as type references
    pub fn super_type_refs(&self) -> Vec<TypeRef> {
        self.declared_super_names()
            .into_iter()
            .map(TypeRef::Id)
            .collect()
    }
}

impl fmt::Debug for LoadedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedClass")
            .field("binary_name", &self.binary_name)
            .field("module", &self.module)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ClassFileBuilder, access};

    #[test]
    fn test_parse_members() {
        let bytes = ClassFileBuilder::class("com/example/Widget")
            .implements("java/lang/Runnable")
            .field(access::PUBLIC | access::STATIC | access::FINAL, "COUNT", "I")
            .field(access::PRIVATE, "name", "Ljava/lang/String;")
            .method(access::PUBLIC, "<init>", "()V")
            .method(access::PUBLIC, "<init>", "(Ljava/lang/String;)V")
            .method(access::PUBLIC, "run", "()V")
            .method(access::PUBLIC, "resize", "(I)V")
            .method(access::PUBLIC, "resize", "(II)V")
            .method(access::STATIC, "<clinit>", "()V")
            .build();
        let class = LoadedClass::parse(bytes, None, None).unwrap();

        assert_eq!(class.binary_name(), "com.example.Widget");
        assert_eq!(class.simple_name(), "Widget");
        assert_eq!(
            class.declared_super_names(),
            vec!["java.lang.Object", "java.lang.Runnable"]
        );

        let fields = class.fields();
        assert_eq!(fields["COUNT"].modifiers, vec!["public", "static", "final"]);
        assert_eq!(fields["name"].type_ref, TypeRef::Id("java.lang.String".to_string()));

        let methods = class.methods();
        assert_eq!(methods.keys().collect::<Vec<_>>(), vec!["resize", "run"]);
        assert_eq!(methods["resize"].len(), 2);

        let constructors = class.constructors();
        assert_eq!(constructors.len(), 2);
        assert!(constructors.iter().all(|c| c.name == "Widget"));
    }

    #[test]
    fn test_interface_without_parents_reports_object() {
        let bytes = ClassFileBuilder::interface("com/example/Marker").build();
        let class = LoadedClass::parse(bytes, None, None).unwrap();

        assert!(class.is_interface());
        assert!(class.modifiers().iter().all(|m| m != "abstract"));
        assert_eq!(class.declared_super_names(), vec!["java.lang.Object"]);
    }

    #[test]
    fn test_root_class_has_no_super() {
        let bytes = ClassFileBuilder::root("java/lang/Object").build();
        let class = LoadedClass::parse(bytes, None, None).unwrap();
        assert!(class.super_name().is_none());
        assert!(class.declared_super_names().is_empty());
    }

    #[test]
    fn test_nested_classes_and_signature() {
        let bytes = ClassFileBuilder::interface("java/util/Map")
            .signature("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;")
            .inner_class(
                "java/util/Map$Entry",
                Some("java/util/Map"),
                Some("Entry"),
                access::PUBLIC | access::STATIC | access::INTERFACE | access::ABSTRACT,
            )
            .build();
        let map = LoadedClass::parse(bytes, None, None).unwrap();

        let params = map.type_params();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "K");
        assert_eq!(map.inner_class_name("Entry").as_deref(), Some("java.util.Map$Entry"));
        assert!(map.inner_class_name("Missing").is_none());

        let bytes = ClassFileBuilder::interface("java/util/Map$Entry")
            .inner_class(
                "java/util/Map$Entry",
                Some("java/util/Map"),
                Some("Entry"),
                access::PUBLIC | access::STATIC | access::INTERFACE | access::ABSTRACT,
            )
            .build();
        let entry = LoadedClass::parse(bytes, None, None).unwrap();
        assert!(entry.is_static());
        assert_eq!(entry.simple_name(), "Entry");
        assert_eq!(entry.outer_name().as_deref(), Some("java.util.Map"));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = LoadedClass::parse(vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0], None, None).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }
}
