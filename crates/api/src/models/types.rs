//! Plain data describing the shape of a type.
//!
//! These are value types with no behavior logic; shapes produce them on
//! demand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a type as it appears in a member signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Primitive or `void`
    Raw(String),
    /// Class or interface by fully-qualified name
    Id(String),
    Array {
        element: Box<TypeRef>,
        dimensions: usize,
    },
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Raw(name) | TypeRef::Id(name) => f.write_str(name),
            TypeRef::Array {
                element,
                dimensions,
            } => {
                write!(f, "{}", element)?;
                for _ in 0..*dimensions {
                    f.write_str("[]")?;
                }
                Ok(())
            }
        }
    }
}

/// A generic type parameter declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParameter {
    /// Parameter name, e.g., "T"
    pub name: String,
    /// Upper bounds, e.g., ["java.lang.Comparable"] for `T extends Comparable<T>`
    pub bounds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub type_ref: TypeRef,
    /// Modifiers like public, static, final
    pub modifiers: Vec<String>,
}

/// A method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Simple name; constructors carry the simple name of their type
    pub name: String,
    pub return_type: TypeRef,
    pub parameters: Vec<TypeRef>,
    pub modifiers: Vec<String>,
    pub is_varargs: bool,
    /// Raw generic signature from bytecode, if available
    pub generic_signature: Option<String>,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.modifiers.iter().any(|m| m == "static")
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        write!(f, "{} {}({})", self.return_type, self.name, params.join(", "))
    }
}
