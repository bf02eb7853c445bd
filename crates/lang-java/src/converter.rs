//! Descriptor and access-flag conversion into the shared models.

use classdex_api::TypeRef;
use ristretto_classfile::{
    BaseType, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
};

pub struct JavaTypeConverter;

impl JavaTypeConverter {
    pub fn convert_type(ty: &FieldType) -> TypeRef {
        match ty {
            FieldType::Base(base) => TypeRef::Raw(Self::base_name(base).to_string()),
            FieldType::Object(name) => TypeRef::Id(name.replace('/', ".")),
            FieldType::Array(component) => {
                let mut dimensions = 1usize;
                let mut element = component.as_ref();
                while let FieldType::Array(inner) = element {
                    dimensions += 1;
                    element = inner.as_ref();
                }
                TypeRef::Array {
                    element: Box::new(Self::convert_type(element)),
                    dimensions,
                }
            }
        }
    }

    /// Convert a method descriptor into `(return type, parameter types)`
    pub fn convert_method(
        descriptor: &str,
    ) -> Result<(TypeRef, Vec<TypeRef>), ristretto_classfile::Error> {
        let (params, ret) = FieldType::parse_method_descriptor(descriptor)?;
        let return_type = ret
            .as_ref()
            .map(Self::convert_type)
            .unwrap_or_else(|| TypeRef::Raw("void".to_string()));
        let parameters = params.iter().map(Self::convert_type).collect();
        Ok((return_type, parameters))
    }

    fn base_name(base: &BaseType) -> &'static str {
        match base {
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
        }
    }
}

macro_rules! modifier_names {
    ($flags:expr, $( $flag:expr => $name:literal ),* $(,)?) => {{
        let mut mods = Vec::new();
        $(
            if $flags.contains($flag) {
                mods.push($name.to_string());
            }
        )*
        mods
    }};
}

pub struct JavaModifierConverter;

impl JavaModifierConverter {
    pub fn parse_class(flags: ClassAccessFlags) -> Vec<String> {
        let mut mods = modifier_names!(flags,
            ClassAccessFlags::PUBLIC => "public",
            ClassAccessFlags::FINAL => "final",
        );
        // Interfaces carry ABSTRACT implicitly.
        if flags.contains(ClassAccessFlags::ABSTRACT) && !flags.contains(ClassAccessFlags::INTERFACE)
        {
            mods.push("abstract".to_string());
        }
        mods
    }

    pub fn parse_field(flags: FieldAccessFlags) -> Vec<String> {
        modifier_names!(flags,
            FieldAccessFlags::PUBLIC => "public",
            FieldAccessFlags::PRIVATE => "private",
            FieldAccessFlags::PROTECTED => "protected",
            FieldAccessFlags::STATIC => "static",
            FieldAccessFlags::FINAL => "final",
            FieldAccessFlags::VOLATILE => "volatile",
            FieldAccessFlags::TRANSIENT => "transient",
        )
    }

    pub fn parse_method(flags: MethodAccessFlags) -> Vec<String> {
        modifier_names!(flags,
            MethodAccessFlags::PUBLIC => "public",
            MethodAccessFlags::PRIVATE => "private",
            MethodAccessFlags::PROTECTED => "protected",
            MethodAccessFlags::STATIC => "static",
            MethodAccessFlags::FINAL => "final",
            MethodAccessFlags::SYNCHRONIZED => "synchronized",
            MethodAccessFlags::NATIVE => "native",
            MethodAccessFlags::ABSTRACT => "abstract",
            MethodAccessFlags::STRICT => "strictfp",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_descriptor() {
        let (ret, params) =
            JavaTypeConverter::convert_method("(I[[Ljava/lang/String;)Ljava/util/List;").unwrap();

        assert_eq!(ret, TypeRef::Id("java.util.List".to_string()));
        assert_eq!(params[0], TypeRef::Raw("int".to_string()));
        assert_eq!(params[1].to_string(), "java.lang.String[][]");
    }

    #[test]
    fn test_void_return() {
        let (ret, params) = JavaTypeConverter::convert_method("()V").unwrap();
        assert_eq!(ret, TypeRef::Raw("void".to_string()));
        assert!(params.is_empty());
    }

    #[test]
    fn test_interface_is_not_reported_abstract() {
        let flags = ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        assert_eq!(JavaModifierConverter::parse_class(flags), vec!["public"]);

        let flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        assert_eq!(JavaModifierConverter::parse_method(flags), vec!["public", "static"]);
    }
}
