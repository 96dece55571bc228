//! Qualified-type algebra for pluggable type checkers.
//!
//! A checker overlays a lattice of type qualifiers (nullness, taint, units, ...) on Java types. This
//! crate provides the checker-independent machinery:
//!
//! - [`AnnotatedType`]: a host [`nova_types::Type`] with a qualifier at every structural position,
//!   produced by the [`Annotator`].
//! - [`TypeHierarchy`]: qualifier-aware subtyping.
//! - [`as_super`] / [`as_member_of`]: viewpoint adaptation.
//! - [`lub`]: decorating a host LUB with the least upper bound of the inputs' qualifiers.
//! - [`QualifierPolymorphism`]: resolving polymorphic placeholder qualifiers at call sites.
//!
//! Everything is generic over the checker's qualifier domain `Q` and parameterized by a
//! [`QualContext`], which bundles the host type environment, the [`QualifierHierarchy`] and the
//! checker's hooks. There is no global state: independent checkers use independent contexts.

use std::fmt;
use std::hash::Hash;

mod annotator;
mod config;
mod context;
mod hierarchy;
mod lub;
mod model;
mod poly;
mod subtyping;
mod viewpoint;

pub use annotator::{AnnotationSource, Annotator, NoAnnotations, PathRoot, TypePath, TypePathStep};
pub use config::{json_schema, ConfigError, QualifierConfig, SubtypingConfig};
pub use context::{CheckerHooks, NoHooks, QualContext};
pub use hierarchy::{
    GraphHierarchy, GraphHierarchyBuilder, HierarchyError, PolyScope, QualifierHierarchy,
};
pub use lub::{lub, lub_pair};
pub use model::{
    expand_var_args, AnnotatedDeclared, AnnotatedExecutable, AnnotatedKind, AnnotatedType,
    AnnotatedTypeDeclaration, AnnotatedTypeDisplay, AnnotatedTypeVariable, AnnotatedWildcard,
    NoTypeKind, WildcardForm,
};
pub use poly::{PolymorphismError, PolymorphismTable, QualifierPolymorphism};
pub use subtyping::TypeHierarchy;
pub use viewpoint::{as_member_of, as_super, direct_supertypes};

/// A qualifier value. Checkers usually use a small `Copy` enum.
pub trait Qualifier: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> Qualifier for T {}
