//! Qualifier-aware subtyping.

use std::collections::HashSet;

use crate::{
    as_super, AnnotatedKind, AnnotatedType, Annotator, QualContext, Qualifier, QualifierHierarchy,
};

/// Structural subtype test between qualified types.
///
/// Each query runs with its own visit history, so a `TypeHierarchy` can be shared freely.
pub struct TypeHierarchy<'a, Q: Qualifier> {
    ctx: QualContext<'a, Q>,
}

impl<'a, Q: Qualifier> TypeHierarchy<'a, Q> {
    pub fn new(ctx: QualContext<'a, Q>) -> Self {
        Self { ctx }
    }

    pub fn is_subtype(&self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        let _span = tracing::debug_span!("is_subtype").entered();
        let result = SubtypeVisit::new(&self.ctx).is_subtype(sub, sup);
        tracing::trace!(
            target: "nova.qualifiers",
            sub = %sub.display(self.ctx.env()),
            sup = %sup.display(self.ctx.env()),
            result,
            "subtype check"
        );
        result
    }

    /// Pairwise [`TypeHierarchy::is_subtype`].
    ///
    /// # Panics
    ///
    /// Panics if the lists differ in length.
    pub fn are_subtypes(&self, subs: &[AnnotatedType<Q>], sups: &[AnnotatedType<Q>]) -> bool {
        if subs.len() != sups.len() {
            tracing::error!(
                target: "nova.qualifiers",
                subs = subs.len(),
                sups = sups.len(),
                "are_subtypes called with lists of different length"
            );
            panic!(
                "are_subtypes called with {} subtypes and {} supertypes",
                subs.len(),
                sups.len()
            );
        }
        let mut visit = SubtypeVisit::new(&self.ctx);
        subs.iter()
            .zip(sups)
            .all(|(sub, sup)| visit.is_subtype(sub, sup))
    }

    /// Mutual subtypes.
    pub fn are_equal(&self, a: &AnnotatedType<Q>, b: &AnnotatedType<Q>) -> bool {
        SubtypeVisit::new(&self.ctx).is_equal(a, b)
    }
}

struct SubtypeVisit<'c, 'a, Q: Qualifier> {
    ctx: &'c QualContext<'a, Q>,
    hierarchy: &'a dyn QualifierHierarchy<Q>,
    annotator: Annotator<'a, Q>,
    /// Pairs being compared on the current path. A pair seen again is assumed to hold.
    history: HashSet<(AnnotatedType<Q>, AnnotatedType<Q>)>,
}

impl<'c, 'a, Q: Qualifier> SubtypeVisit<'c, 'a, Q> {
    fn new(ctx: &'c QualContext<'a, Q>) -> Self {
        Self {
            ctx,
            hierarchy: ctx.hierarchy(),
            annotator: ctx.annotator(),
            history: HashSet::new(),
        }
    }

    fn guarded(&mut self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        let key = (sub.clone(), sup.clone());
        if self.history.contains(&key) {
            tracing::trace!(target: "nova.qualifiers", "subtype check revisited; assuming it holds");
            return true;
        }
        self.history.insert(key.clone());
        let result = self.is_subtype(sub, sup);
        self.history.remove(&key);
        result
    }

    fn is_equal(&mut self, a: &AnnotatedType<Q>, b: &AnnotatedType<Q>) -> bool {
        self.is_subtype(a, b) && self.is_subtype(b, a)
    }

    fn upper_qualifier(&self, ty: &AnnotatedType<Q>) -> Q {
        ty.effective_upper_qualifier(self.hierarchy)
            .or_else(|| {
                self.annotator
                    .upper_bound_of(ty)
                    .and_then(|bound| bound.effective_upper_qualifier(self.hierarchy))
            })
            .unwrap_or_else(|| self.hierarchy.top())
    }

    fn lower_qualifier(&self, ty: &AnnotatedType<Q>) -> Q {
        ty.effective_lower_qualifier(self.hierarchy)
            .or_else(|| {
                self.annotator
                    .lower_bound_of(ty)
                    .and_then(|bound| bound.effective_lower_qualifier(self.hierarchy))
            })
            .unwrap_or_else(|| self.hierarchy.bottom())
    }

    fn upper(&self, ty: &AnnotatedType<Q>) -> AnnotatedType<Q> {
        match self.annotator.upper_bound_of(ty) {
            Some(bound) => bound,
            None => ty.clone(),
        }
    }

    fn lower(&self, ty: &AnnotatedType<Q>) -> AnnotatedType<Q> {
        match self.annotator.lower_bound_of(ty) {
            Some(bound) => bound,
            None => ty.clone(),
        }
    }

    fn is_subtype(&mut self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        match (sub.kind(), sup.kind()) {
            (AnnotatedKind::Union(alternatives), _) => {
                alternatives.iter().all(|alt| self.is_subtype(alt, sup))
            }
            (_, AnnotatedKind::Union(alternatives)) => {
                alternatives.iter().any(|alt| self.is_subtype(sub, alt))
            }
            (_, AnnotatedKind::Intersection(bounds)) => {
                if let Some(q) = sup.qualifier() {
                    if !self.hierarchy.is_subtype(&self.upper_qualifier(sub), q) {
                        return false;
                    }
                }
                bounds.iter().all(|bound| self.is_subtype(sub, bound))
            }
            (AnnotatedKind::Intersection(bounds), _) => bounds.iter().any(|bound| {
                let bound = match sub.qualifier() {
                    Some(q) => bound.clone().with_qualifier(q.clone()),
                    None => bound.clone(),
                };
                self.is_subtype(&bound, sup)
            }),
            (AnnotatedKind::TypeVariable(a), AnnotatedKind::TypeVariable(b)) if a.id() == b.id() => {
                self.same_type_variable(sub, sup)
            }
            (AnnotatedKind::Wildcard(_), AnnotatedKind::Wildcard(_)) => {
                let (sub_upper, sup_upper) = (self.upper(sub), self.upper(sup));
                let (sub_lower, sup_lower) = (self.lower(sub), self.lower(sup));
                self.guarded(&sub_upper, &sup_upper) && self.guarded(&sup_lower, &sub_lower)
            }
            (AnnotatedKind::TypeVariable(_) | AnnotatedKind::Wildcard(_), _) => {
                let sub_upper = self.upper(sub);
                if self.guarded(&sub_upper, sup) {
                    return true;
                }
                (sup.is_type_variable() || sup.is_wildcard()) && {
                    let sup_lower = self.lower(sup);
                    self.guarded(sub, &sup_lower)
                }
            }
            (_, AnnotatedKind::TypeVariable(_) | AnnotatedKind::Wildcard(_)) => {
                let sup_lower = self.lower(sup);
                self.guarded(sub, &sup_lower)
            }
            _ => self.concrete(sub, sup),
        }
    }

    /// Two uses of the same type variable. Unannotated uses stand for the same (unknown) type.
    fn same_type_variable(&mut self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        match (sub.qualifier(), sup.qualifier()) {
            (None, None) => true,
            (_, Some(sup_q)) => self.hierarchy.is_subtype(&self.upper_qualifier(sub), sup_q),
            (Some(sub_q), None) => self.hierarchy.is_subtype(sub_q, &self.lower_qualifier(sup)),
        }
    }

    fn concrete(&mut self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        let top = self.hierarchy.top();
        let sub_q = sub.qualifier().unwrap_or(&top);
        let sup_q = sup.qualifier().unwrap_or(&top);
        if sub.carries_qualifier()
            && sup.carries_qualifier()
            && !self.hierarchy.is_subtype(sub_q, sup_q)
        {
            return false;
        }

        match (sub.kind(), sup.kind()) {
            (AnnotatedKind::Primitive(a), AnnotatedKind::Primitive(b)) if a == b => true,
            (AnnotatedKind::Null, AnnotatedKind::Primitive(_)) => false,
            (AnnotatedKind::Null, _) => true,
            (AnnotatedKind::NoType(a), AnnotatedKind::NoType(b)) => a == b,
            (AnnotatedKind::Array(sub_component), AnnotatedKind::Array(sup_component)) => {
                if self.ctx.config().subtyping.invariant_array_components {
                    self.is_equal(sub_component, sup_component)
                } else {
                    self.is_subtype(sub_component, sup_component)
                }
            }
            (AnnotatedKind::TypeDeclaration(a), AnnotatedKind::TypeDeclaration(b)) => {
                a.def() == b.def()
            }
            (AnnotatedKind::Executable(a), AnnotatedKind::Executable(b)) => {
                a.params().len() == b.params().len()
                    && b
                        .params()
                        .iter()
                        .zip(a.params())
                        .all(|(sup_param, sub_param)| self.is_subtype(sup_param, sub_param))
                    && self.is_subtype(a.return_type(), b.return_type())
            }
            (_, AnnotatedKind::Declared(_) | AnnotatedKind::Primitive(_)) => {
                match as_super(self.ctx, sub, sup) {
                    Some(adapted) => self.structural(&adapted, sup),
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// `sub` has already been viewed as `sup`'s class; compare what lies below the top level.
    fn structural(&mut self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        match (sub.kind(), sup.kind()) {
            (AnnotatedKind::Primitive(a), AnnotatedKind::Primitive(b)) => a == b,
            (AnnotatedKind::Declared(a), AnnotatedKind::Declared(b)) => {
                if a.def() != b.def() {
                    return false;
                }
                if a.type_args().is_empty() || b.type_args().is_empty() {
                    // Raw on at least one side.
                    return self.ctx.config().subtyping.ignore_raw_types
                        || a.type_args().len() == b.type_args().len();
                }
                if a.type_args().len() != b.type_args().len() {
                    return false;
                }
                let args_ok = a
                    .type_args()
                    .iter()
                    .zip(b.type_args())
                    .all(|(sub_arg, sup_arg)| self.contains(sup_arg, sub_arg));
                args_ok
                    && match (a.enclosing(), b.enclosing()) {
                        (Some(sub_outer), Some(sup_outer)) => {
                            self.is_subtype(sub_outer, sup_outer)
                        }
                        _ => true,
                    }
            }
            _ => false,
        }
    }

    /// Type argument containment: does `sup_arg` contain `sub_arg`?
    fn contains(&mut self, sup_arg: &AnnotatedType<Q>, sub_arg: &AnnotatedType<Q>) -> bool {
        if sup_arg.is_wildcard() {
            let sup_upper = self.upper(sup_arg);
            let sup_lower = self.lower(sup_arg);
            if sub_arg.is_wildcard() {
                let sub_upper = self.upper(sub_arg);
                let sub_lower = self.lower(sub_arg);
                return self.guarded(&sub_upper, &sup_upper)
                    && self.guarded(&sup_lower, &sub_lower);
            }
            return self.guarded(&sup_lower, sub_arg) && self.guarded(sub_arg, &sup_upper);
        }
        if self.ctx.config().subtyping.covariant_type_args {
            self.is_subtype(sub_arg, sup_arg)
        } else {
            self.is_equal(sub_arg, sup_arg)
        }
    }
}
