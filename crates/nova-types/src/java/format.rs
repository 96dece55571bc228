//! Java-like rendering of [`Type`]s.
//!
//! Class names are printed by their simple name (`List<String>`, `Outer<T>.Inner`) and type
//! variables by their declared name. Unknown ids render as `<class#N>`/`<tv#N>` so formatting never
//! fails.

use std::fmt;

use crate::{ClassType, Type, TypeEnv, WildcardBound};

pub fn format_type(env: &dyn TypeEnv, ty: &Type) -> String {
    TypeDisplay { env, ty }.to_string()
}

/// [`fmt::Display`] adapter pairing a type with the environment its ids resolve in.
pub struct TypeDisplay<'a> {
    pub env: &'a dyn TypeEnv,
    pub ty: &'a Type,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(self.env, self.ty, f)
    }
}

fn write_list(
    env: &dyn TypeEnv,
    items: &[Type],
    sep: &str,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write_type(env, item, f)?;
    }
    Ok(())
}

fn write_class(env: &dyn TypeEnv, class: &ClassType, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(outer) = &class.outer {
        write_class(env, outer, f)?;
        f.write_str(".")?;
    }
    match env.class(class.def) {
        Some(def) => f.write_str(def.simple_name())?,
        None => write!(f, "<class#{}>", class.def.to_raw())?,
    }
    if !class.args.is_empty() {
        f.write_str("<")?;
        write_list(env, &class.args, ", ", f)?;
        f.write_str(">")?;
    }
    Ok(())
}

fn write_type(env: &dyn TypeEnv, ty: &Type, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ty {
        Type::Void => f.write_str("void"),
        Type::None => f.write_str("none"),
        Type::Package(name) => f.write_str(name),
        Type::Null => f.write_str("null"),
        Type::Primitive(prim) => f.write_str(prim.keyword()),
        Type::Class(class) => write_class(env, class, f),
        Type::Array(component) => {
            write_type(env, component, f)?;
            f.write_str("[]")
        }
        Type::TypeVar(id) => match env.type_param(*id) {
            Some(tp) => f.write_str(&tp.name),
            None => write!(f, "<tv#{}>", id.to_raw()),
        },
        Type::Wildcard(WildcardBound::Unbounded) => f.write_str("?"),
        Type::Wildcard(WildcardBound::Extends(upper)) => {
            f.write_str("? extends ")?;
            write_type(env, upper, f)
        }
        Type::Wildcard(WildcardBound::Super(lower)) => {
            f.write_str("? super ")?;
            write_type(env, lower, f)
        }
        Type::Intersection(parts) => write_list(env, parts, " & ", f),
        Type::Union(parts) => write_list(env, parts, " | ", f),
        Type::Executable(exec) => {
            if !exec.type_params.is_empty() {
                f.write_str("<")?;
                for (idx, tv) in exec.type_params.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_type(env, &Type::TypeVar(*tv), f)?;
                }
                f.write_str("> ")?;
            }
            f.write_str("(")?;
            write_list(env, &exec.params, ", ", f)?;
            f.write_str(")")?;
            f.write_str(" -> ")?;
            write_type(env, &exec.return_type, f)?;
            if !exec.thrown.is_empty() {
                f.write_str(" throws ")?;
                write_list(env, &exec.thrown, ", ", f)?;
            }
            Ok(())
        }
    }
}
