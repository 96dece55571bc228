use std::collections::{HashMap, HashSet};

use crate::{
    ClassId, ClassType, ExecutableType, PrimitiveType, Type, TypeEnv, TypeVarId,
    WildcardBound,
};

/// Replace every type variable in `ty` that has an entry in `subst`.
///
/// Variables without a mapping are left untouched, so partial substitutions (e.g. only the
/// outer class' parameters) compose.
pub fn substitute(ty: &Type, subst: &HashMap<TypeVarId, Type>) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeVar(id) => subst.get(id).cloned().unwrap_or_else(|| ty.clone()),
        Type::Class(class) => Type::Class(substitute_class(class, subst)),
        Type::Array(component) => Type::array(substitute(component, subst)),
        Type::Wildcard(bound) => Type::Wildcard(match bound {
            WildcardBound::Unbounded => WildcardBound::Unbounded,
            WildcardBound::Extends(upper) => {
                WildcardBound::Extends(Box::new(substitute(upper, subst)))
            }
            WildcardBound::Super(lower) => WildcardBound::Super(Box::new(substitute(lower, subst))),
        }),
        Type::Intersection(parts) => {
            Type::Intersection(parts.iter().map(|p| substitute(p, subst)).collect())
        }
        Type::Union(parts) => Type::Union(parts.iter().map(|p| substitute(p, subst)).collect()),
        Type::Executable(exec) => Type::Executable(Box::new(ExecutableType {
            type_params: exec.type_params.clone(),
            receiver: exec.receiver.as_ref().map(|r| substitute(r, subst)),
            params: exec.params.iter().map(|p| substitute(p, subst)).collect(),
            return_type: substitute(&exec.return_type, subst),
            thrown: exec.thrown.iter().map(|t| substitute(t, subst)).collect(),
        })),
        Type::Void | Type::None | Type::Package(_) | Type::Primitive(_) | Type::Null => {
            ty.clone()
        }
    }
}

fn substitute_class(class: &ClassType, subst: &HashMap<TypeVarId, Type>) -> ClassType {
    ClassType {
        def: class.def,
        args: class.args.iter().map(|a| substitute(a, subst)).collect(),
        outer: class
            .outer
            .as_ref()
            .map(|outer| Box::new(substitute_class(outer, subst))),
    }
}

/// The formal/actual type argument pairs of a class use, including those of its enclosing uses.
///
/// Raw uses contribute nothing. Missing actuals (an adapter inconsistency) are skipped rather
/// than reported.
pub fn class_type_params(env: &dyn TypeEnv, class: &ClassType) -> Vec<(TypeVarId, Type)> {
    let mut out = Vec::new();
    let mut current = Some(class);
    while let Some(use_) = current {
        if let Some(def) = env.class(use_.def) {
            if !use_.args.is_empty() {
                out.extend(
                    def.type_params
                        .iter()
                        .copied()
                        .zip(use_.args.iter().cloned()),
                );
            }
        }
        current = use_.outer.as_deref();
    }
    out
}

/// Lexically enclosing classes of `id`, innermost first. Does not include `id` itself.
pub fn enclosing_classes(env: &dyn TypeEnv, id: ClassId) -> Vec<ClassId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(id);
    let mut current = env.class(id).and_then(|def| def.outer);
    while let Some(outer) = current {
        // Malformed stores could link a class to itself.
        if !seen.insert(outer) {
            break;
        }
        out.push(outer);
        current = env.class(outer).and_then(|def| def.outer);
    }
    out
}

/// Whether `ty` is a raw use of a generic class: `List` rather than `List<String>`.
pub fn is_raw(env: &dyn TypeEnv, ty: &Type) -> bool {
    let Type::Class(class) = ty else {
        return false;
    };
    class.args.is_empty()
        && env
            .class(class.def)
            .is_some_and(|def| !def.type_params.is_empty())
}

/// Declared upper bound of a type variable. Multiple bounds form an intersection; no bounds means
/// `java.lang.Object`.
pub fn upper_bound(env: &dyn TypeEnv, id: TypeVarId) -> Type {
    let object = Type::class(env.well_known().object, vec![]);
    let Some(tp) = env.type_param(id) else {
        return object;
    };
    match tp.upper_bounds.as_slice() {
        [] => object,
        [single] => single.clone(),
        many => Type::Intersection(many.to_vec()),
    }
}

/// Lower bound of a type variable; the null type when it has none.
pub fn lower_bound(env: &dyn TypeEnv, id: TypeVarId) -> Type {
    env.type_param(id)
        .and_then(|tp| tp.lower_bound.clone())
        .unwrap_or(Type::Null)
}

/// Type erasure (JLS 4.6).
pub fn erasure(env: &dyn TypeEnv, ty: &Type) -> Type {
    fn inner(env: &dyn TypeEnv, ty: &Type, seen_type_vars: &mut HashSet<TypeVarId>) -> Type {
        match ty {
            Type::Class(class) => Type::Class(erase_class(env, class, seen_type_vars)),
            Type::Array(component) => Type::array(inner(env, component, seen_type_vars)),
            Type::TypeVar(id) => {
                if !seen_type_vars.insert(*id) {
                    return Type::class(env.well_known().object, vec![]);
                }
                let bound = env
                    .type_param(*id)
                    .and_then(|tp| tp.upper_bounds.first().cloned())
                    .unwrap_or_else(|| Type::class(env.well_known().object, vec![]));
                let erased = inner(env, &bound, seen_type_vars);
                seen_type_vars.remove(id);
                erased
            }
            Type::Wildcard(WildcardBound::Extends(upper)) => inner(env, upper, seen_type_vars),
            Type::Wildcard(_) => Type::class(env.well_known().object, vec![]),
            Type::Intersection(parts) => match parts.first() {
                Some(first) => inner(env, first, seen_type_vars),
                None => Type::class(env.well_known().object, vec![]),
            },
            // Only used for multi-catch parameters; the alternatives share at least `Throwable`,
            // which the adapter is not asked to compute here.
            Type::Union(parts) => match parts.first() {
                Some(first) => inner(env, first, seen_type_vars),
                None => Type::class(env.well_known().object, vec![]),
            },
            Type::Executable(exec) => Type::Executable(Box::new(ExecutableType {
                type_params: vec![],
                receiver: exec
                    .receiver
                    .as_ref()
                    .map(|r| inner(env, r, seen_type_vars)),
                params: exec
                    .params
                    .iter()
                    .map(|p| inner(env, p, seen_type_vars))
                    .collect(),
                return_type: inner(env, &exec.return_type, seen_type_vars),
                thrown: exec
                    .thrown
                    .iter()
                    .map(|t| inner(env, t, seen_type_vars))
                    .collect(),
            })),
            Type::Void | Type::None | Type::Package(_) | Type::Primitive(_) | Type::Null => {
                ty.clone()
            }
        }
    }

    fn erase_class(
        env: &dyn TypeEnv,
        class: &ClassType,
        seen_type_vars: &mut HashSet<TypeVarId>,
    ) -> ClassType {
        ClassType {
            def: class.def,
            args: vec![],
            outer: class
                .outer
                .as_ref()
                .map(|outer| Box::new(erase_class(env, outer, seen_type_vars))),
        }
    }

    let mut seen_type_vars = HashSet::new();
    inner(env, ty, &mut seen_type_vars)
}

/// Direct supertypes of `ty` (JLS 4.10), superclass before interfaces.
///
/// Class supertypes are instantiated with the use's type arguments; a raw use yields raw
/// supertypes. Returns an empty list for `Object`, primitives and types the adapter does not know.
pub fn direct_supertypes(env: &dyn TypeEnv, ty: &Type) -> Vec<Type> {
    let object = Type::class(env.well_known().object, vec![]);
    match ty {
        Type::Class(class) => {
            let Some(def) = env.class(class.def) else {
                return vec![];
            };
            if class.def == env.well_known().object {
                return vec![];
            }

            let raw = is_raw(env, ty);
            let subst: HashMap<TypeVarId, Type> =
                class_type_params(env, class).into_iter().collect();
            let instantiate = |sup: &Type| {
                if raw {
                    erasure(env, sup)
                } else {
                    substitute(sup, &subst)
                }
            };

            let mut out = Vec::with_capacity(1 + def.interfaces.len());
            if let Some(sc) = &def.super_class {
                out.push(instantiate(sc));
            }
            out.extend(def.interfaces.iter().map(instantiate));

            // Interfaces without superinterfaces have `Object` as a supertype (JLS 4.10.2); so do
            // classes declared without an `extends` clause.
            if out.is_empty() {
                out.push(object);
            }
            out
        }
        Type::Array(_) => {
            let wk = env.well_known();
            vec![
                object,
                Type::class(wk.cloneable, vec![]),
                Type::class(wk.serializable, vec![]),
            ]
        }
        Type::TypeVar(id) => match env.type_param(*id) {
            Some(tp) if !tp.upper_bounds.is_empty() => tp.upper_bounds.clone(),
            _ => vec![object],
        },
        Type::Wildcard(WildcardBound::Extends(upper)) => vec![upper.as_ref().clone()],
        Type::Wildcard(_) => vec![object],
        Type::Intersection(parts) => parts.clone(),
        Type::Void
        | Type::None
        | Type::Package(_)
        | Type::Primitive(_)
        | Type::Union(_)
        | Type::Executable(_)
        | Type::Null => vec![],
    }
}

/// The wrapper class of `prim`, if the environment defines it.
pub fn boxed_class(env: &dyn TypeEnv, prim: PrimitiveType) -> Option<ClassId> {
    env.lookup_class(prim.boxed_binary_name())
}

/// The primitive type a wrapper class unboxes to (JLS 5.1.8).
pub fn unboxed(env: &dyn TypeEnv, ty: &Type) -> Option<PrimitiveType> {
    let Type::Class(class) = ty else {
        return None;
    };
    let name = &env.class(class.def)?.name;
    PrimitiveType::ALL
        .into_iter()
        .find(|prim| prim.boxed_binary_name() == name)
}
