//! Java type model shared across Nova crates.
//!
//! This crate is the host side of Nova's type machinery: it describes Java types exactly as the
//! compiler sees them (no qualifiers, no inference state) and answers the structural questions
//! other crates need, such as erasure, direct supertypes and boxing. Higher-level crates (for
//! example `nova-qualifiers`) mirror these types and never reimplement the Java type algebra.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod java;

pub use java::format::{format_type, TypeDisplay};
pub use java::helpers::{
    boxed_class, class_type_params, direct_supertypes, enclosing_classes, erasure, is_raw,
    lower_bound, substitute, unboxed, upper_bound,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(u32);

impl ClassId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeVarId(u32);

impl TypeVarId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeVarId({})", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Binary name of the wrapper class (JLS 5.1.7).
    pub fn boxed_binary_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }
}

/// A use of a class or interface, e.g. `List<String>` or `Outer<String>.Inner`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassType {
    pub def: ClassId,
    pub args: Vec<Type>,
    /// The enclosing type use for inner (non-static nested) classes.
    pub outer: Option<Box<ClassType>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

/// A method or constructor signature viewed as a type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutableType {
    pub type_params: Vec<TypeVarId>,
    pub receiver: Option<Type>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub thrown: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    /// The absence of a type (e.g. the superclass of `java.lang.Object`).
    None,
    /// The pseudo-type of a package name.
    Package(String),
    Primitive(PrimitiveType),
    Class(ClassType),
    Array(Box<Type>),
    TypeVar(TypeVarId),
    Wildcard(WildcardBound),
    Intersection(Vec<Type>),
    Union(Vec<Type>),
    Executable(Box<ExecutableType>),
    Null,
}

impl Type {
    pub fn class(def: ClassId, args: Vec<Type>) -> Type {
        Type::Class(ClassType {
            def,
            args,
            outer: None,
        })
    }

    /// An inner class use qualified by its enclosing instance type.
    pub fn inner_class(outer: ClassType, def: ClassId, args: Vec<Type>) -> Type {
        Type::Class(ClassType {
            def,
            args,
            outer: Some(Box::new(outer)),
        })
    }

    pub fn array(component: Type) -> Type {
        Type::Array(Box::new(component))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Class(_)
                | Type::Array(_)
                | Type::TypeVar(_)
                | Type::Wildcard(_)
                | Type::Intersection(_)
                | Type::Union(_)
                | Type::Null
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: String,
    /// Declared upper bounds, in source order. Empty means `java.lang.Object`.
    pub upper_bounds: Vec<Type>,
    /// Only capture variables have lower bounds.
    pub lower_bound: Option<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    pub is_final: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub throws: Vec<Type>,
    pub is_static: bool,
    pub is_varargs: bool,
    pub is_abstract: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorDef {
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub throws: Vec<Type>,
    pub is_varargs: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    /// Binary name, e.g. `java.util.List` or `com.example.Outer$Inner`.
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<ConstructorDef>,
    pub methods: Vec<MethodDef>,
    /// Lexically enclosing class of a nested class.
    pub outer: Option<ClassId>,
}

impl ClassDef {
    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit('.').next().unwrap_or(&self.name);
        tail.rsplit('$').next().unwrap_or(tail)
    }
}

/// A reference to a declaration that can be viewed as a member of some type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Field { owner: ClassId, index: usize },
    Method { owner: ClassId, index: usize },
    Constructor { owner: ClassId, index: usize },
    Initializer { owner: ClassId, is_static: bool },
    TypeParameter(TypeVarId),
    Package(String),
}

impl MemberRef {
    /// The class declaring this member, if it has one.
    pub fn owner(&self) -> Option<ClassId> {
        match self {
            MemberRef::Field { owner, .. }
            | MemberRef::Method { owner, .. }
            | MemberRef::Constructor { owner, .. }
            | MemberRef::Initializer { owner, .. } => Some(*owner),
            MemberRef::TypeParameter(_) | MemberRef::Package(_) => None,
        }
    }

    /// Members whose type does not depend on a receiver: packages, initializers and type
    /// parameters.
    pub fn is_value_member(&self) -> bool {
        matches!(
            self,
            MemberRef::Field { .. } | MemberRef::Method { .. } | MemberRef::Constructor { .. }
        )
    }

    pub fn is_static(&self, env: &dyn TypeEnv) -> bool {
        match self {
            MemberRef::Field { owner, index } => env
                .class(*owner)
                .and_then(|def| def.fields.get(*index))
                .is_some_and(|f| f.is_static),
            MemberRef::Method { owner, index } => env
                .class(*owner)
                .and_then(|def| def.methods.get(*index))
                .is_some_and(|m| m.is_static),
            MemberRef::Initializer { is_static, .. } => *is_static,
            MemberRef::Constructor { .. }
            | MemberRef::TypeParameter(_)
            | MemberRef::Package(_) => false,
        }
    }
}

/// Classes every Java program can rely on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub number: ClassId,
    pub integer: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
    pub comparable: ClassId,
    pub enum_: ClassId,
}

/// Read-only access to class and type parameter definitions.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
    fn well_known(&self) -> &WellKnownTypes;
}

/// In-memory [`TypeEnv`] backed by vectors of definitions.
#[derive(Clone, Debug)]
pub struct TypeStore {
    classes: Vec<Option<ClassDef>>,
    class_names: HashMap<String, ClassId>,
    type_params: Vec<TypeParamDef>,
    well_known: WellKnownTypes,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::with_minimal_jdk()
    }
}

impl TypeStore {
    /// A store pre-populated with the handful of `java.lang`/`java.util` classes the type
    /// algebra depends on.
    pub fn with_minimal_jdk() -> Self {
        let placeholder = ClassId(0);
        let mut store = TypeStore {
            classes: Vec::new(),
            class_names: HashMap::new(),
            type_params: Vec::new(),
            well_known: WellKnownTypes {
                object: placeholder,
                string: placeholder,
                number: placeholder,
                integer: placeholder,
                cloneable: placeholder,
                serializable: placeholder,
                comparable: placeholder,
                enum_: placeholder,
            },
        };
        java::jdk::populate(&mut store);
        store
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    /// Reserve an id for `binary_name` without defining the class yet.
    pub fn intern_class_id(&mut self, binary_name: &str) -> ClassId {
        if let Some(id) = self.class_names.get(binary_name) {
            return *id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(None);
        self.class_names.insert(binary_name.to_string(), id);
        id
    }

    pub fn define_class(&mut self, id: ClassId, def: ClassDef) {
        self.class_names.insert(def.name.clone(), id);
        self.classes[id.0 as usize] = Some(def);
    }

    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        let id = self.intern_class_id(&def.name);
        self.define_class(id, def);
        id
    }

    pub fn add_type_param(&mut self, name: impl Into<String>, upper_bounds: Vec<Type>) -> TypeVarId {
        let id = TypeVarId(self.type_params.len() as u32);
        self.type_params.push(TypeParamDef {
            name: name.into(),
            upper_bounds,
            lower_bound: None,
        });
        id
    }

    /// Replace a type parameter definition. Used for two-pass allocation so self-referential
    /// bounds (`E extends Enum<E>`) can name the parameter being defined.
    pub fn define_type_param(&mut self, id: TypeVarId, def: TypeParamDef) {
        self.type_params[id.0 as usize] = def;
    }

    pub(crate) fn set_well_known(&mut self, well_known: WellKnownTypes) {
        self.well_known = well_known;
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.0 as usize)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        if let Some(id) = self.class_names.get(name) {
            return Some(*id);
        }
        // Implicit `java.lang.*` import.
        if !name.contains('.') {
            return self.class_names.get(&format!("java.lang.{name}")).copied();
        }
        None
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}
