//! Type shapes backed by class files.
//!
//! - [`LoadedShape`]: a type linked through a [`ClasspathLoader`]. Covers
//!   classes, arrays and primitives and can walk to related types.
//! - [`DetachedShape`]: a single class file parsed on its own. Answers local
//!   facts only; anything that needs another type yields nothing.

use crate::class::LoadedClass;
use crate::error::LoadError;
use crate::loader::ClasspathLoader;
use classdex_api::{FieldInfo, MethodInfo, OBJECT, SharedShape, TypeParameter, TypeRef, TypeShape};
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

const CLONEABLE: &str = "java.lang.Cloneable";
const SERIALIZABLE: &str = "java.io.Serializable";
const BASE_MODULE: &str = "java.base";

/// Supertypes every array type has
const ARRAY_ROOTS: [&str; 3] = [OBJECT, CLONEABLE, SERIALIZABLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => Primitive::Boolean,
            "byte" => Primitive::Byte,
            "char" => Primitive::Char,
            "short" => Primitive::Short,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RuntimeType {
    Primitive(Primitive),
    Class(Arc<LoadedClass>),
    Array(Box<RuntimeType>),
}

impl RuntimeType {
    pub fn name(&self) -> String {
        match self {
            RuntimeType::Primitive(p) => p.name().to_string(),
            RuntimeType::Class(class) => class.binary_name().to_string(),
            RuntimeType::Array(element) => format!("{}[]", element.name()),
        }
    }

    fn same(&self, other: &RuntimeType) -> bool {
        match (self, other) {
            (RuntimeType::Primitive(a), RuntimeType::Primitive(b)) => a == b,
            (RuntimeType::Class(a), RuntimeType::Class(b)) => Arc::ptr_eq(a, b),
            (RuntimeType::Array(a), RuntimeType::Array(b)) => a.same(b),
            _ => false,
        }
    }

    fn hash_identity<H: Hasher>(&self, state: &mut H) {
        match self {
            RuntimeType::Primitive(p) => p.hash(state),
            RuntimeType::Class(class) => (Arc::as_ptr(class) as usize).hash(state),
            RuntimeType::Array(element) => {
                state.write_u8(b'[');
                element.hash_identity(state);
            }
        }
    }
}

/// A type linked through a class loader.
///
/// Two loaded shapes are the same type iff they come from the same loader
/// and denote the same loaded class (or primitive, or array thereof).
#[derive(Clone)]
pub struct LoadedShape {
    loader: Arc<ClasspathLoader>,
    ty: RuntimeType,
}

impl LoadedShape {
    pub fn new(loader: Arc<ClasspathLoader>, ty: RuntimeType) -> Self {
        Self { loader, ty }
    }

    pub fn runtime_type(&self) -> &RuntimeType {
        &self.ty
    }

    pub fn loader(&self) -> &Arc<ClasspathLoader> {
        &self.loader
    }

    fn class(&self) -> Option<&Arc<LoadedClass>> {
        match &self.ty {
            RuntimeType::Class(class) => Some(class),
            _ => None,
        }
    }

    fn with_type(&self, ty: RuntimeType) -> SharedShape {
        Arc::new(Self::new(Arc::clone(&self.loader), ty))
    }

    fn load(&self, name: &str) -> Option<RuntimeType> {
        self.loader
            .load_class(name)
            .ok()
            .map(RuntimeType::Class)
    }

    /// Direct supertypes as runtime types
    fn direct_supers(&self, ty: &RuntimeType) -> Vec<RuntimeType> {
        match ty {
            RuntimeType::Primitive(_) => Vec::new(),
            RuntimeType::Class(class) => class
                .declared_super_names()
                .iter()
                .filter_map(|name| self.load(name))
                .collect(),
            RuntimeType::Array(element) => {
                let element_supers = self.direct_supers(element);
                if element_supers.is_empty() {
                    ARRAY_ROOTS.iter().filter_map(|name| self.load(name)).collect()
                } else {
                    element_supers
                        .into_iter()
                        .map(|s| RuntimeType::Array(Box::new(s)))
                        .collect()
                }
            }
        }
    }

    /// Whether `source` is `target` or one of its transitive supertypes is
    fn class_reaches(&self, source: &Arc<LoadedClass>, target: &Arc<LoadedClass>) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([Arc::clone(source)]);
        while let Some(current) = queue.pop_front() {
            if Arc::ptr_eq(&current, target) {
                return true;
            }
            if !seen.insert(current.binary_name().to_string()) {
                continue;
            }
            for name in current.declared_super_names() {
                if let Ok(parent) = self.loader.load_class(&name) {
                    queue.push_back(parent);
                }
            }
        }
        false
    }

    fn assignable(&self, target: &RuntimeType, source: &RuntimeType) -> bool {
        match (target, source) {
            (RuntimeType::Primitive(t), RuntimeType::Primitive(s)) => t == s,
            (RuntimeType::Class(t), RuntimeType::Class(s)) => {
                t.binary_name() == OBJECT || self.class_reaches(s, t)
            }
            (RuntimeType::Class(t), RuntimeType::Array(_)) => {
                ARRAY_ROOTS.contains(&t.binary_name())
            }
            (RuntimeType::Array(t), RuntimeType::Array(s)) => match (t.as_ref(), s.as_ref()) {
                (RuntimeType::Primitive(a), RuntimeType::Primitive(b)) => a == b,
                (RuntimeType::Primitive(_), _) | (_, RuntimeType::Primitive(_)) => false,
                (t, s) => self.assignable(t, s),
            },
            _ => false,
        }
    }
}

impl TypeShape for LoadedShape {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> String {
        self.ty.name()
    }

    fn simple_name(&self) -> String {
        match &self.ty {
            RuntimeType::Primitive(p) => p.name().to_string(),
            RuntimeType::Class(class) => class.simple_name().to_string(),
            RuntimeType::Array(element) => {
                format!("{}[]", self.with_type((**element).clone()).simple_name())
            }
        }
    }

    fn is_interface(&self) -> bool {
        self.class().is_some_and(|c| c.is_interface())
    }

    fn is_static(&self) -> bool {
        self.class().is_some_and(|c| c.is_static())
    }

    fn is_final(&self) -> bool {
        match &self.ty {
            RuntimeType::Class(class) => class.is_final(),
            _ => true,
        }
    }

    fn is_public(&self) -> bool {
        match &self.ty {
            RuntimeType::Primitive(_) => true,
            RuntimeType::Class(class) => class.is_public(),
            RuntimeType::Array(element) => self.with_type((**element).clone()).is_public(),
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(self.ty, RuntimeType::Primitive(_))
    }

    fn type_params(&self) -> Vec<TypeParameter> {
        self.class().map(|c| c.type_params()).unwrap_or_default()
    }

    fn super_types(&self) -> Vec<TypeRef> {
        match &self.ty {
            RuntimeType::Class(class) => class.super_type_refs(),
            _ => self
                .super_types_r()
                .iter()
                .map(|s| to_type_ref(&s.name()))
                .collect(),
        }
    }

    fn super_types_r(&self) -> Vec<SharedShape> {
        self.direct_supers(&self.ty)
            .into_iter()
            .map(|ty| self.with_type(ty))
            .collect()
    }

    fn fields(&self) -> BTreeMap<String, FieldInfo> {
        self.class().map(|c| c.fields()).unwrap_or_default()
    }

    fn methods(&self) -> BTreeMap<String, Vec<MethodInfo>> {
        self.class().map(|c| c.methods()).unwrap_or_default()
    }

    fn constructors(&self) -> Vec<MethodInfo> {
        self.class().map(|c| c.constructors()).unwrap_or_default()
    }

    fn outer_class(&self) -> Option<SharedShape> {
        let outer = self.class()?.outer_name()?;
        self.load(&outer).map(|ty| self.with_type(ty))
    }

    fn inner_class(&self, name: &str) -> Option<SharedShape> {
        let inner = self.class()?.inner_class_name(name)?;
        self.load(&inner).map(|ty| self.with_type(ty))
    }

    fn array_of(&self) -> Option<SharedShape> {
        Some(self.with_type(RuntimeType::Array(Box::new(self.ty.clone()))))
    }

    fn element_type(&self) -> Option<SharedShape> {
        match &self.ty {
            RuntimeType::Array(element) => Some(self.with_type((**element).clone())),
            _ => None,
        }
    }

    fn module_name(&self) -> Option<String> {
        match &self.ty {
            RuntimeType::Primitive(_) => Some(BASE_MODULE.to_string()),
            RuntimeType::Class(class) => class.module().map(str::to_string),
            RuntimeType::Array(element) => self.with_type((**element).clone()).module_name(),
        }
    }

    fn is_assignable_from(&self, other: &dyn TypeShape) -> bool {
        let Some(other) = other.as_any().downcast_ref::<LoadedShape>() else {
            return false;
        };
        Arc::ptr_eq(&self.loader, &other.loader) && self.assignable(&self.ty, &other.ty)
    }

    fn relative_class(&self, name: &str) -> Option<SharedShape> {
        let shape = self.loader.shape(name).ok()?;
        Some(Arc::new(shape))
    }

    fn same_type(&self, other: &dyn TypeShape) -> bool {
        other
            .as_any()
            .downcast_ref::<LoadedShape>()
            .is_some_and(|o| Arc::ptr_eq(&self.loader, &o.loader) && self.ty.same(&o.ty))
    }

    fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        (Arc::as_ptr(&self.loader) as usize).hash(&mut hasher);
        self.ty.hash_identity(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Debug for LoadedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadedShape").field(&self.ty.name()).finish()
    }
}

impl fmt::Display for LoadedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ty.name())
    }
}

/// Shape of one class file read without a loader
#[derive(Debug, Clone)]
pub struct DetachedShape {
    class: Arc<LoadedClass>,
}

impl DetachedShape {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        Ok(Self {
            class: Arc::new(LoadedClass::parse(bytes, None, None)?),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path)?;
        Ok(Self {
            class: Arc::new(LoadedClass::parse(bytes, None, Some(path.to_path_buf()))?),
        })
    }

    pub fn class(&self) -> &LoadedClass {
        &self.class
    }
}

impl TypeShape for DetachedShape {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> String {
        self.class.binary_name().to_string()
    }

    fn simple_name(&self) -> String {
        self.class.simple_name().to_string()
    }

    fn is_interface(&self) -> bool {
        self.class.is_interface()
    }

    fn is_static(&self) -> bool {
        self.class.is_static()
    }

    fn is_final(&self) -> bool {
        self.class.is_final()
    }

    fn is_public(&self) -> bool {
        self.class.is_public()
    }

    fn type_params(&self) -> Vec<TypeParameter> {
        self.class.type_params()
    }

    fn super_types(&self) -> Vec<TypeRef> {
        self.class.super_type_refs()
    }

    fn super_types_r(&self) -> Vec<SharedShape> {
        Vec::new()
    }

    fn fields(&self) -> BTreeMap<String, FieldInfo> {
        self.class.fields()
    }

    fn methods(&self) -> BTreeMap<String, Vec<MethodInfo>> {
        self.class.methods()
    }

    fn constructors(&self) -> Vec<MethodInfo> {
        self.class.constructors()
    }

    fn outer_class(&self) -> Option<SharedShape> {
        None
    }

    fn inner_class(&self, _name: &str) -> Option<SharedShape> {
        None
    }

    fn array_of(&self) -> Option<SharedShape> {
        None
    }

    fn element_type(&self) -> Option<SharedShape> {
        None
    }

    fn module_name(&self) -> Option<String> {
        None
    }

    fn is_assignable_from(&self, other: &dyn TypeShape) -> bool {
        self.same_type(other)
    }

    fn relative_class(&self, _name: &str) -> Option<SharedShape> {
        None
    }

    fn same_type(&self, other: &dyn TypeShape) -> bool {
        other
            .as_any()
            .downcast_ref::<DetachedShape>()
            .is_some_and(|o| Arc::ptr_eq(&self.class, &o.class))
    }

    fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        (Arc::as_ptr(&self.class) as usize).hash(&mut hasher);
        hasher.finish()
    }
}

fn to_type_ref(name: &str) -> TypeRef {
    let mut dimensions = 0;
    let mut element = name;
    while let Some(inner) = element.strip_suffix("[]") {
        dimensions += 1;
        element = inner;
    }
    let element = if Primitive::from_name(element).is_some() {
        TypeRef::Raw(element.to_string())
    } else {
        TypeRef::Id(element.to_string())
    };
    if dimensions == 0 {
        element
    } else {
        TypeRef::Array {
            element: Box::new(element),
            dimensions,
        }
    }
}
