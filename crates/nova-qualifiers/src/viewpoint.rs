//! Viewpoint adaptation: viewing a type as one of its supertypes, and a member through a receiver.

use std::collections::{HashMap, HashSet};

use nova_types::{
    boxed_class, enclosing_classes, format_type, is_raw, unboxed, ClassId, MemberRef, Type,
    TypeVarId,
};

use crate::{
    AnnotatedKind, AnnotatedType, Annotator, PathRoot, QualContext, Qualifier, TypePath,
    TypePathStep,
};

/// View `ty` as the ancestor of it that has the shape of `sup`.
///
/// The result has `sup`'s (erased) shape, carries `ty`'s primary qualifier and the type arguments
/// `ty` passes up its supertype chain. `None` means `ty` is not a subtype of `sup`'s erasure.
pub fn as_super<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    ty: &AnnotatedType<Q>,
    sup: &AnnotatedType<Q>,
) -> Option<AnnotatedType<Q>> {
    let _span = tracing::debug_span!("as_super").entered();
    if ty == sup {
        return Some(ty.clone());
    }
    let result = AsSuper::new(ctx).visit(ty, sup);
    if result.is_none() {
        tracing::trace!(
            target: "nova.qualifiers",
            ty = %ty.display(ctx.env()),
            sup = %sup.display(ctx.env()),
            "not a subtype"
        );
    }
    result
}

/// The direct supertypes of `ty`, decorated.
///
/// Supertypes of a class use are decorated from the class' `extends`/`implements` clauses,
/// instantiated with the use's type arguments (erased for raw uses), and take the primary
/// qualifier of `ty`.
pub fn direct_supertypes<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    ty: &AnnotatedType<Q>,
) -> Vec<AnnotatedType<Q>> {
    let env = ctx.env();
    let annotator = ctx.annotator();
    let with_primary = |sup: AnnotatedType<Q>| match ty.qualifier() {
        Some(q) => sup.with_qualifier(q.clone()),
        None => sup,
    };
    let object = || {
        with_primary(annotator.unqualified(&Type::class(env.well_known().object, vec![])))
    };

    match ty.kind() {
        AnnotatedKind::Declared(declared) => {
            let Some(def) = env.class(declared.def()) else {
                return vec![];
            };
            if declared.def() == env.well_known().object {
                return vec![];
            }

            let raw = is_raw(env, &ty.underlying());
            let mapping = type_arg_mapping(ctx, ty);
            let root = TypePath::new(PathRoot::Declaration(declared.def()));
            let mut out: Vec<AnnotatedType<Q>> = def
                .super_class
                .iter()
                .chain(def.interfaces.iter())
                .enumerate()
                .map(|(i, sup)| {
                    let sup = annotator.annotate_at(sup, &root.child(TypePathStep::Supertype(i)));
                    let sup = if raw {
                        sup.erased(env)
                    } else {
                        sup.substitute(&mapping)
                    };
                    with_primary(sup)
                })
                .collect();
            if out.is_empty() {
                out.push(object());
            }
            out
        }
        AnnotatedKind::Array(_) => {
            let wk = env.well_known();
            [wk.object, wk.cloneable, wk.serializable]
                .into_iter()
                .map(|def| with_primary(annotator.unqualified(&Type::class(def, vec![]))))
                .collect()
        }
        AnnotatedKind::TypeVariable(_) | AnnotatedKind::Wildcard(_) => {
            match annotator.upper_bound_of(ty) {
                Some(bound) => vec![bound],
                None => vec![object()],
            }
        }
        AnnotatedKind::Intersection(bounds) => bounds
            .iter()
            .map(|bound| with_primary(bound.clone()))
            .collect(),
        _ => vec![],
    }
}

/// Type variables of `ty`'s class and of its enclosing class uses, mapped to `ty`'s arguments.
fn type_arg_mapping<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    ty: &AnnotatedType<Q>,
) -> HashMap<TypeVarId, AnnotatedType<Q>> {
    let mut mapping = HashMap::new();
    let mut current = ty.as_declared();
    while let Some(declared) = current {
        if let Some(def) = ctx.env().class(declared.def()) {
            mapping.extend(
                def.type_params
                    .iter()
                    .copied()
                    .zip(declared.type_args().iter().cloned()),
            );
        }
        current = declared.enclosing().and_then(AnnotatedType::as_declared);
    }
    mapping
}

struct AsSuper<'c, 'a, Q: Qualifier> {
    ctx: &'c QualContext<'a, Q>,
    annotator: Annotator<'a, Q>,
    seen: HashSet<(Type, Type)>,
}

impl<'c, 'a, Q: Qualifier> AsSuper<'c, 'a, Q> {
    fn new(ctx: &'c QualContext<'a, Q>) -> Self {
        Self {
            ctx,
            annotator: ctx.annotator(),
            seen: HashSet::new(),
        }
    }

    fn visit(&mut self, ty: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> Option<AnnotatedType<Q>> {
        let key = (ty.underlying(), sup.underlying());
        if !self.seen.insert(key.clone()) {
            tracing::trace!(target: "nova.qualifiers", "as_super revisited a pair");
            return None;
        }
        let result = self.visit_kind(ty, sup);
        self.seen.remove(&key);
        result
    }

    fn visit_kind(
        &mut self,
        ty: &AnnotatedType<Q>,
        sup: &AnnotatedType<Q>,
    ) -> Option<AnnotatedType<Q>> {
        let env = self.ctx.env();
        match ty.kind() {
            AnnotatedKind::Primitive(prim) => match sup.kind() {
                AnnotatedKind::Primitive(target) => {
                    Some(with_primary_of(ty, AnnotatedType::primitive(*target)))
                }
                _ => {
                    let boxed = AnnotatedType::declared(boxed_class(env, *prim)?, vec![]);
                    self.visit(&with_primary_of(ty, boxed), sup)
                }
            },
            AnnotatedKind::TypeVariable(_) | AnnotatedKind::Wildcard(_) => {
                if self.should_stop(sup, ty) {
                    return Some(ty.clone());
                }
                let bound = self.annotator.upper_bound_of(ty)?;
                let found = self.visit(&bound, sup)?;
                Some(self.annotator.add_missing(&found, &self.ctx.hierarchy().top()))
            }
            AnnotatedKind::Array(component) => {
                if let Some(sup_component) = sup.as_array_component() {
                    if component.is_primitive() || sup_component.is_primitive() {
                        return self
                            .should_stop(sup_component, component)
                            .then(|| ty.clone());
                    }
                    let adapted = self.visit(component, sup_component)?;
                    return Some(with_primary_of(ty, AnnotatedType::array(adapted)));
                }
                if self.should_stop(sup, ty) {
                    return Some(ty.clone());
                }
                self.search_supertypes(ty, sup)
            }
            AnnotatedKind::Declared(_) => {
                if let AnnotatedKind::Primitive(target) = sup.kind() {
                    unboxed(env, &ty.underlying())?;
                    return Some(with_primary_of(ty, AnnotatedType::primitive(*target)));
                }
                if self.should_stop(sup, ty) {
                    return Some(ty.clone());
                }
                self.search_supertypes(ty, sup)
            }
            AnnotatedKind::Intersection(bounds) => bounds.iter().find_map(|bound| {
                let bound = match ty.qualifier() {
                    Some(q) => bound.clone().with_qualifier(q.clone()),
                    None => bound.clone(),
                };
                self.visit(&bound, sup)
            }),
            AnnotatedKind::Union(alternatives) => {
                alternatives.iter().find_map(|alt| self.visit(alt, sup))
            }
            AnnotatedKind::Null => match ty.qualifier() {
                Some(q) => Some(sup.clone().with_qualifier(q.clone())),
                None => Some(sup.clone()),
            },
            AnnotatedKind::Executable(_)
            | AnnotatedKind::NoType(_)
            | AnnotatedKind::TypeDeclaration(_)
            | AnnotatedKind::ParameterDeclaration(_) => {
                self.should_stop(sup, ty).then(|| ty.clone())
            }
        }
    }

    /// Direct supertypes first (superclass before interfaces), then the bound of a type variable
    /// or wildcard target.
    fn search_supertypes(
        &mut self,
        ty: &AnnotatedType<Q>,
        sup: &AnnotatedType<Q>,
    ) -> Option<AnnotatedType<Q>> {
        for candidate in direct_supertypes(self.ctx, ty) {
            if let Some(found) = self.visit(&candidate, sup) {
                return Some(found);
            }
        }
        if sup.is_type_variable() || sup.is_wildcard() {
            let bound = self.annotator.upper_bound_of(sup)?;
            return self.visit(ty, &bound);
        }
        None
    }

    /// Whether `sub` already has the shape of `sup`. A structural identity test, not subtyping.
    fn should_stop(&self, sup: &AnnotatedType<Q>, sub: &AnnotatedType<Q>) -> bool {
        match (sup.kind(), sub.kind()) {
            (AnnotatedKind::Primitive(a), AnnotatedKind::Primitive(b)) => a == b,
            (AnnotatedKind::Declared(a), AnnotatedKind::Declared(b)) => a.def() == b.def(),
            (AnnotatedKind::Array(a), AnnotatedKind::Array(b)) => self.should_stop(a, b),
            // Type variables and wildcards have no usable identity here; compare printed forms.
            _ => {
                let env = self.ctx.env();
                format_type(env, &sup.underlying()) == format_type(env, &sub.underlying())
            }
        }
    }
}

fn with_primary_of<Q: Qualifier>(
    from: &AnnotatedType<Q>,
    to: AnnotatedType<Q>,
) -> AnnotatedType<Q> {
    match from.qualifier() {
        Some(q) => to.with_qualifier(q.clone()),
        None => to,
    }
}

/// View `receiver` (or one of its enclosing class uses) as `owner_use`.
fn as_outer_super<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    receiver: &AnnotatedType<Q>,
    owner_use: &AnnotatedType<Q>,
) -> Option<AnnotatedType<Q>> {
    if receiver.as_declared().is_none() {
        return as_super(ctx, receiver, owner_use);
    }
    let mut current = Some(receiver);
    while let Some(candidate) = current {
        if let Some(found) = as_super(ctx, candidate, owner_use) {
            return Some(found);
        }
        current = candidate.as_declared().and_then(|d| d.enclosing());
    }
    tracing::warn!(
        target: "nova.qualifiers",
        receiver = %receiver.display(ctx.env()),
        owner = %owner_use.display(ctx.env()),
        "no enclosing type of the receiver has the member's class as supertype"
    );
    None
}

/// The type of `member` as seen through `receiver`.
///
/// Type variables of the member's class (and of its enclosing classes) are replaced by the
/// receiver's type arguments; raw receivers erase the member type. Static members and members
/// without a value type (packages, initializers, type parameters) are returned as declared.
/// Non-static results go through [`crate::CheckerHooks::post_as_member_of`].
///
/// Returns `None` if `member` does not resolve in the environment.
pub fn as_member_of<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    receiver: &AnnotatedType<Q>,
    member: &MemberRef,
) -> Option<AnnotatedType<Q>> {
    let _span = tracing::debug_span!("as_member_of", ?member).entered();
    let annotator = ctx.annotator();
    let member_type = annotator.annotate_member(member)?;
    if !member.is_value_member() || member.is_static(ctx.env()) {
        return Some(member_type);
    }
    let adapted = member_of(ctx, &annotator, receiver, member, member_type);
    Some(ctx.hooks().post_as_member_of(adapted, receiver, member))
}

fn member_of<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    annotator: &Annotator<'_, Q>,
    receiver: &AnnotatedType<Q>,
    member: &MemberRef,
    member_type: AnnotatedType<Q>,
) -> AnnotatedType<Q> {
    let env = ctx.env();
    match receiver.kind() {
        AnnotatedKind::TypeVariable(_) | AnnotatedKind::Wildcard(_) => {
            match annotator.upper_bound_of(receiver) {
                Some(bound) => member_of(ctx, annotator, &bound, member, member_type),
                None => member_type,
            }
        }
        AnnotatedKind::Intersection(bounds) => {
            let Some(owner) = member.owner() else {
                return member_type;
            };
            let owner_use = annotator.annotate_class_use(owner);
            bounds
                .iter()
                .filter(|bound| as_super(ctx, bound, &owner_use).is_some())
                .fold(member_type, |ty, bound| {
                    substitute_type_variables(ctx, annotator, bound, member, ty)
                })
        }
        AnnotatedKind::Union(_) => {
            substitute_type_variables(ctx, annotator, receiver, member, member_type)
        }
        AnnotatedKind::Declared(declared) => {
            let is_raw_call = member.owner() == Some(declared.def())
                && is_raw(env, &receiver.underlying());
            if is_raw_call {
                member_type.erased(env)
            } else {
                substitute_type_variables(ctx, annotator, receiver, member, member_type)
            }
        }
        // Members of arrays (`length`, `clone()`) and of other receivers keep their declared type.
        _ => member_type,
    }
}

fn substitute_type_variables<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    annotator: &Annotator<'_, Q>,
    receiver: &AnnotatedType<Q>,
    member: &MemberRef,
    member_type: AnnotatedType<Q>,
) -> AnnotatedType<Q> {
    let Some(owner) = member.owner() else {
        return member_type;
    };
    let mut mapping = HashMap::new();
    for class in std::iter::once(owner).chain(enclosing_classes(ctx.env(), owner)) {
        add_type_var_mappings(ctx, annotator, receiver, class, &mut mapping);
    }
    if mapping.is_empty() {
        return member_type;
    }
    member_type.substitute(&mapping)
}

fn add_type_var_mappings<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    annotator: &Annotator<'_, Q>,
    receiver: &AnnotatedType<Q>,
    class: ClassId,
    mapping: &mut HashMap<TypeVarId, AnnotatedType<Q>>,
) {
    let env = ctx.env();
    if env.class(class).map_or(true, |def| def.type_params.is_empty()) {
        return;
    }
    let owner_use = annotator.annotate_class_use(class);
    let Some(base) = as_outer_super(ctx, receiver, &owner_use) else {
        return;
    };
    let Some(owner_decl) = owner_use.as_declared() else {
        return;
    };

    let mut owner_params = Vec::with_capacity(owner_decl.type_args().len());
    for param in owner_decl.type_args() {
        let Some(var) = param.as_type_variable() else {
            tracing::error!(
                target: "nova.qualifiers",
                class = ?class,
                param = %param.display(env),
                "type arguments of a declaration must be type variables"
            );
            panic!(
                "type arguments of a declaration must be type variables: {} in {}",
                param.display(env),
                owner_use.display(env)
            );
        };
        owner_params.push((var.id(), param));
    }

    let base_raw = is_raw(env, &base.underlying());
    let base_args: Vec<AnnotatedType<Q>> = match base.as_declared() {
        Some(declared) if !base_raw => declared.type_args().to_vec(),
        // Raw base: each parameter becomes its erased upper bound.
        _ => owner_params.iter().map(|(_, param)| param.erased(env)).collect(),
    };
    if base_args.len() != owner_params.len() {
        tracing::error!(
            target: "nova.qualifiers",
            owner = %owner_use.display(env),
            base = %base.display(env),
            "unexpected number of type arguments"
        );
        panic!(
            "unexpected number of type arguments: owner {} base {}",
            owner_use.display(env),
            base.display(env)
        );
    }

    mapping.extend(
        owner_params
            .into_iter()
            .map(|(id, _)| id)
            .zip(base_args),
    );
}
