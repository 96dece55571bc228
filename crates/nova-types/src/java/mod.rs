//! Java-specific helpers for Nova's type model.
//!
//! The formatter here is "Java-like" and stable, intended for diagnostics and for comparing types
//! whose identity the model does not otherwise capture (type variables, wildcards).

pub mod format;
pub mod helpers;
pub(crate) mod jdk;
