//! Type shape capability set.
//!
//! A shape answers "what does this type look like" questions regardless of
//! where the answers come from. Implementations compute member and
//! supertype information per call; constructing a shape only locates the
//! type.
//!
//! Shapes compare by underlying-type identity, never structurally: two shapes
//! are equal when they are views of the same loaded type.

use crate::error::ResolveResult;
use crate::models::{FieldInfo, MethodInfo, TypeParameter, TypeRef};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type SharedShape = Arc<dyn TypeShape>;

pub const OBJECT: &str = "java.lang.Object";

pub trait TypeShape: Send + Sync + Debug {
    /// Cast to Any for downcasting to concrete types.
    fn as_any(&self) -> &dyn Any;

    /// Fully-qualified binary name, e.g. `java.util.Map$Entry`, `int`,
    /// `java.lang.String[]`
    fn name(&self) -> String;

    /// Name without package or enclosing type
    fn simple_name(&self) -> String;

    fn is_interface(&self) -> bool;

    fn is_static(&self) -> bool;

    fn is_final(&self) -> bool;

    fn is_public(&self) -> bool;

    fn is_primitive(&self) -> bool {
        false
    }

    fn type_params(&self) -> Vec<TypeParameter>;

    /// Declared direct supertypes by reference: superclass first, then
    /// interfaces. Interfaces without superinterfaces report `java.lang.Object`.
    fn super_types(&self) -> Vec<TypeRef>;

    /// Direct supertypes as shapes, linked through the type's own loader.
    fn super_types_r(&self) -> Vec<SharedShape>;

    /// Declared fields by name
    fn fields(&self) -> BTreeMap<String, FieldInfo>;

    /// Declared methods grouped by name; overloads share an entry
    fn methods(&self) -> BTreeMap<String, Vec<MethodInfo>>;

    fn constructors(&self) -> Vec<MethodInfo>;

    /// Enclosing type of a nested type
    fn outer_class(&self) -> Option<SharedShape>;

    /// Nested type declared in this type, matched by its simple name
    fn inner_class(&self, name: &str) -> Option<SharedShape>;

    /// Array type whose element is this type
    fn array_of(&self) -> Option<SharedShape>;

    /// Element type if this is an array
    fn element_type(&self) -> Option<SharedShape>;

    /// Name of the defining module; `None` for the unnamed module
    fn module_name(&self) -> Option<String>;

    /// True iff a value of `other`'s type may be assigned to this type.
    /// Shapes from unrelated providers are never assignable.
    fn is_assignable_from(&self, other: &dyn TypeShape) -> bool;

    /// Resolve a name through this type's own loading context. Any failure
    /// yields `None`.
    fn relative_class(&self, name: &str) -> Option<SharedShape>;

    /// Identity comparison with another shape
    fn same_type(&self, other: &dyn TypeShape) -> bool;

    /// Hash consistent with `same_type`
    fn identity_hash(&self) -> u64;
}

impl PartialEq for dyn TypeShape {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other)
    }
}

impl Eq for dyn TypeShape {}

impl Hash for dyn TypeShape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.identity_hash());
    }
}

/// Provider that attaches shapes to discovered type names.
///
/// Called at most once per type handle; the handle caches the outcome.
pub trait ShapeProvider: Send + Sync {
    fn resolve(&self, fqn: &str) -> ResolveResult<SharedShape>;
}
