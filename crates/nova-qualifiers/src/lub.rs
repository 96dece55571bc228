//! Least upper bounds of qualified types.
//!
//! The host LUB is computed elsewhere; here its shape is decorated with the least upper bound of
//! the qualifiers the inputs carry at each position.

use std::collections::{HashMap, HashSet};

use nova_types::Type;

use crate::{
    as_super, AnnotatedKind, AnnotatedType, Annotator, QualContext, Qualifier,
    QualifierHierarchy,
};

/// Decorate `shape`, the unqualified LUB of the inputs' host types, with the LUB of the inputs'
/// qualifiers. The result is fully qualified; positions no input speaks for get defaults.
pub fn lub<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    shape: &Type,
    inputs: &[AnnotatedType<Q>],
) -> AnnotatedType<Q> {
    let _span = tracing::debug_span!("lub", inputs = inputs.len()).entered();
    let annotator = ctx.annotator();
    let res = annotator.unqualified(shape);
    let mut visit = LubVisit::new(ctx);

    let decorated = match res.kind() {
        AnnotatedKind::Intersection(bounds) => {
            let bounds: Vec<AnnotatedType<Q>> = bounds
                .iter()
                .enumerate()
                .map(|(i, bound)| {
                    let viewed: Vec<AnnotatedType<Q>> = inputs
                        .iter()
                        .filter_map(|input| as_super(ctx, input, bound))
                        .collect();
                    visit.visit_at(Step::Bound(i), bound, &viewed)
                })
                .collect();
            let quals: Vec<Q> = bounds
                .iter()
                .filter_map(|bound| bound.effective_upper_qualifier(ctx.hierarchy()))
                .collect();
            let intersection = AnnotatedType::intersection(bounds);
            match ctx.hierarchy().least_upper_bound_all(&quals) {
                Some(q) => intersection.with_qualifier(q),
                None => intersection,
            }
        }
        _ => visit.visit(&res, inputs),
    };
    annotator.complete(&decorated)
}

/// [`lub`] of two types.
pub fn lub_pair<Q: Qualifier>(
    ctx: &QualContext<'_, Q>,
    a: &AnnotatedType<Q>,
    b: &AnnotatedType<Q>,
    shape: &Type,
) -> AnnotatedType<Q> {
    lub(ctx, shape, &[a.clone(), b.clone()])
}

/// One step from a result node to a child it decorates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Step {
    Argument(usize),
    Enclosing,
    Component,
    Bound(usize),
    UpperBound,
    ExtendsBound,
}

struct LubVisit<'c, 'a, Q: Qualifier> {
    ctx: &'c QualContext<'a, Q>,
    hierarchy: &'a dyn QualifierHierarchy<Q>,
    annotator: Annotator<'a, Q>,
    /// Result positions being decorated on the current path.
    visited: HashSet<Type>,
    /// Position of the node being decorated, from the root of the result.
    position: Vec<Step>,
    /// Extends bounds already computed for all-wildcard inputs, by result position. Equal
    /// wildcards at different positions (`Pair<?, ?>`) are decorated independently.
    wildcards: HashMap<Vec<Step>, AnnotatedType<Q>>,
}

impl<'c, 'a, Q: Qualifier> LubVisit<'c, 'a, Q> {
    fn new(ctx: &'c QualContext<'a, Q>) -> Self {
        Self {
            ctx,
            hierarchy: ctx.hierarchy(),
            annotator: ctx.annotator(),
            visited: HashSet::new(),
            position: Vec::new(),
            wildcards: HashMap::new(),
        }
    }

    fn visit_at(
        &mut self,
        step: Step,
        res: &AnnotatedType<Q>,
        inputs: &[AnnotatedType<Q>],
    ) -> AnnotatedType<Q> {
        self.position.push(step);
        let out = self.visit(res, inputs);
        self.position.pop();
        out
    }

    fn visit(&mut self, res: &AnnotatedType<Q>, inputs: &[AnnotatedType<Q>]) -> AnnotatedType<Q> {
        match res.kind() {
            AnnotatedKind::Wildcard(_) => self.visit_wildcard(res, inputs),
            AnnotatedKind::TypeVariable(_) => self.visit_type_variable(res, inputs),
            _ => self.visit_concrete(res, inputs),
        }
    }

    /// The primary qualifier a type variable or wildcard result takes from its inputs.
    ///
    /// When every input is a qualified type variable or wildcard use, the result is their LUB.
    /// Otherwise only the explicit non-bottom qualifiers of such inputs are kept; with none, the
    /// result stays unqualified and its bounds speak for it.
    fn explicit_primary(&self, inputs: &[AnnotatedType<Q>]) -> Option<Q> {
        let uses: Vec<&AnnotatedType<Q>> = inputs
            .iter()
            .filter(|input| input.is_type_variable() || input.is_wildcard())
            .collect();
        if uses.is_empty() {
            return None;
        }
        if uses.len() == inputs.len() && uses.iter().all(|input| input.has_qualifier()) {
            let quals: Vec<Q> = uses
                .iter()
                .filter_map(|input| input.qualifier().cloned())
                .collect();
            return self.hierarchy.least_upper_bound_all(&quals);
        }
        let explicit: Vec<Q> = uses
            .iter()
            .filter_map(|input| input.qualifier())
            .filter(|q| !self.hierarchy.is_bottom(q))
            .cloned()
            .collect();
        self.hierarchy.least_upper_bound_all(&explicit)
    }

    fn lower_glb(&self, inputs: &[AnnotatedType<Q>]) -> Option<Q> {
        let lowers: Vec<Q> = inputs
            .iter()
            .filter_map(|input| input.effective_lower_qualifier(self.hierarchy))
            .collect();
        self.hierarchy.greatest_lower_bound_all(&lowers)
    }

    fn visit_wildcard(
        &mut self,
        res: &AnnotatedType<Q>,
        inputs: &[AnnotatedType<Q>],
    ) -> AnnotatedType<Q> {
        let Some(wildcard) = res.as_wildcard() else {
            return res.clone();
        };
        let primary = self.explicit_primary(inputs);
        let inputs = bounds_of_uses(inputs);
        let super_bound = match self.lower_glb(&inputs) {
            Some(q) => wildcard.super_bound().clone().with_qualifier(q),
            None => wildcard.super_bound().clone(),
        };

        let extends_bound = if !inputs.is_empty() && inputs.iter().all(AnnotatedType::is_wildcard)
        {
            let key = self.position.clone();
            if let Some(cached) = self.wildcards.get(&key).cloned() {
                cached
            } else {
                let extends_inputs: Vec<AnnotatedType<Q>> = inputs
                    .iter()
                    .filter_map(|input| self.annotator.upper_bound_of(input))
                    .collect();
                let computed =
                    self.visit_at(Step::ExtendsBound, wildcard.extends_bound(), &extends_inputs);
                self.wildcards.insert(key, computed.clone());
                computed
            }
        } else {
            self.visit_at(Step::ExtendsBound, wildcard.extends_bound(), &inputs)
        };

        let out = AnnotatedType::wildcard(wildcard.form(), extends_bound, super_bound);
        match primary.or_else(|| res.qualifier().cloned()) {
            Some(q) => out.with_qualifier(q),
            None => out,
        }
    }

    fn visit_type_variable(
        &mut self,
        res: &AnnotatedType<Q>,
        inputs: &[AnnotatedType<Q>],
    ) -> AnnotatedType<Q> {
        let Some(var) = res.as_type_variable() else {
            return res.clone();
        };
        let key = res.underlying();
        if !self.visited.insert(key.clone()) {
            tracing::trace!(target: "nova.qualifiers", type_var = ?var.id(), "lub revisited type variable");
            return res.clone();
        }

        let primary = self.explicit_primary(inputs);
        let inputs = bounds_of_uses(inputs);
        let lower = var
            .lower_bound()
            .cloned()
            .or_else(|| self.annotator.lower_bound_of(res).map(|l| l.without_qualifier()));
        let lower = match (lower, self.lower_glb(&inputs)) {
            (Some(lower), Some(q)) => Some(lower.with_qualifier(q)),
            (lower, _) => lower,
        };
        let upper = var
            .upper_bound()
            .cloned()
            .or_else(|| self.annotator.upper_bound_of(res))
            .map(|upper| self.visit_at(Step::UpperBound, &upper, &inputs));

        self.visited.remove(&key);
        let out = AnnotatedType::type_variable(var.id(), upper, lower);
        match primary.or_else(|| res.qualifier().cloned()) {
            Some(q) => out.with_qualifier(q),
            None => out,
        }
    }

    fn visit_concrete(
        &mut self,
        res: &AnnotatedType<Q>,
        inputs: &[AnnotatedType<Q>],
    ) -> AnnotatedType<Q> {
        let key = res.underlying();
        if !self.visited.insert(key.clone()) {
            return res.clone();
        }

        // Type variable and wildcard inputs take part through their upper bounds, which carry
        // the use's explicit qualifier.
        let mut unified = Vec::with_capacity(inputs.len());
        for input in inputs {
            let input = if input.is_type_variable() || input.is_wildcard() {
                match self.annotator.upper_bound_of(input) {
                    Some(bound) => bound,
                    None => continue,
                }
            } else {
                input.clone()
            };
            let input = as_super(self.ctx, &input, res).unwrap_or(input);
            unified.push(input);
        }

        let quals: Vec<Q> = unified
            .iter()
            .filter_map(|input| input.qualifier().cloned())
            .collect();
        let top = self.hierarchy.least_upper_bound_all(&quals);

        let out = match res.kind() {
            AnnotatedKind::Declared(declared) => {
                let arity = declared.type_args().len();
                let same_arity: Vec<_> = unified
                    .iter()
                    .filter_map(AnnotatedType::as_declared)
                    .filter(|input| input.type_args().len() == arity)
                    .collect();
                let args = declared
                    .type_args()
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        let arg_inputs: Vec<AnnotatedType<Q>> = same_arity
                            .iter()
                            .map(|input| input.type_args()[i].clone())
                            .collect();
                        self.visit_at(Step::Argument(i), arg, &arg_inputs)
                    })
                    .collect();
                match declared.enclosing() {
                    Some(outer) => {
                        let outer_inputs: Vec<AnnotatedType<Q>> = unified
                            .iter()
                            .filter_map(|input| input.as_declared()?.enclosing().cloned())
                            .collect();
                        let outer = self.visit_at(Step::Enclosing, outer, &outer_inputs);
                        AnnotatedType::inner(outer, declared.def(), args)
                    }
                    None => AnnotatedType::declared(declared.def(), args),
                }
            }
            AnnotatedKind::Array(component) => {
                let components: Vec<AnnotatedType<Q>> = unified
                    .iter()
                    .filter_map(|input| input.as_array_component().cloned())
                    .collect();
                AnnotatedType::array(self.visit_at(Step::Component, component, &components))
            }
            _ => res.clone(),
        };


        self.visited.remove(&key);
        match top {
            Some(q) => out.with_qualifier(q),
            None => out,
        }
    }
}

/// Type variable and wildcard uses stripped of their primary qualifier, so that only their bounds
/// take part. The primary is decided separately by [`LubVisit::explicit_primary`].
fn bounds_of_uses<Q: Qualifier>(inputs: &[AnnotatedType<Q>]) -> Vec<AnnotatedType<Q>> {
    inputs
        .iter()
        .map(|input| {
            if input.is_type_variable() || input.is_wildcard() {
                input.clone().without_qualifier()
            } else {
                input.clone()
            }
        })
        .collect()
}
