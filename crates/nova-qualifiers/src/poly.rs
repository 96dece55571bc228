//! Qualifier polymorphism.
//!
//! A method signature may use placeholder qualifiers (`@PolyNull`, `@PolyTainted`, ...) that
//! stand for "whatever the call site passes". [`QualifierPolymorphism`] instantiates them: it
//! collects, for every placeholder, the qualifiers the actual arguments carry at the positions
//! where the declared parameters use it, joins them, and rewrites the signature.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{
    as_super, expand_var_args, AnnotatedExecutable, AnnotatedKind, AnnotatedType, Annotator,
    PolyScope, QualContext, Qualifier, QualifierHierarchy,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolymorphismError {
    #[error("qualifiers {first} and {second} are both polymorphic placeholders of the same scope")]
    MultiplePolymorphicQualifiers { first: String, second: String },
}

/// The placeholder qualifiers a checker declares, at most one per [`PolyScope`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolymorphismTable<Q> {
    hierarchy_poly: Option<Q>,
    poly_all: Option<Q>,
}

impl<Q: Qualifier> PolymorphismTable<Q> {
    /// Scan the declared qualifiers of `hierarchy` for placeholders.
    pub fn from_hierarchy(
        hierarchy: &dyn QualifierHierarchy<Q>,
    ) -> Result<Self, PolymorphismError> {
        let mut table = PolymorphismTable {
            hierarchy_poly: None,
            poly_all: None,
        };
        for q in hierarchy.qualifiers() {
            let slot = match hierarchy.polymorphic_scope(&q) {
                Some(PolyScope::Hierarchy) => &mut table.hierarchy_poly,
                Some(PolyScope::All) => &mut table.poly_all,
                None => continue,
            };
            if let Some(first) = slot {
                return Err(PolymorphismError::MultiplePolymorphicQualifiers {
                    first: format!("{first:?}"),
                    second: format!("{q:?}"),
                });
            }
            *slot = Some(q);
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.hierarchy_poly.is_none() && self.poly_all.is_none()
    }

    pub fn scope_of(&self, q: &Q) -> Option<PolyScope> {
        if self.hierarchy_poly.as_ref() == Some(q) {
            Some(PolyScope::Hierarchy)
        } else if self.poly_all.as_ref() == Some(q) {
            Some(PolyScope::All)
        } else {
            None
        }
    }

    pub fn is_placeholder(&self, q: &Q) -> bool {
        self.scope_of(q).is_some()
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Q> {
        self.hierarchy_poly.iter().chain(self.poly_all.iter())
    }
}

/// Placeholder to instantiation.
type Instantiation<Q> = HashMap<Q, Q>;

/// Resolves placeholder qualifiers in method, constructor and member-reference signatures.
pub struct QualifierPolymorphism<'a, Q: Qualifier> {
    ctx: QualContext<'a, Q>,
    table: PolymorphismTable<Q>,
}

impl<'a, Q: Qualifier> QualifierPolymorphism<'a, Q> {
    pub fn new(ctx: QualContext<'a, Q>) -> Result<Self, PolymorphismError> {
        let table = PolymorphismTable::from_hierarchy(ctx.hierarchy())?;
        Ok(Self::with_table(ctx, table))
    }

    pub fn with_table(ctx: QualContext<'a, Q>, table: PolymorphismTable<Q>) -> Self {
        Self { ctx, table }
    }

    pub fn table(&self) -> &PolymorphismTable<Q> {
        &self.table
    }

    /// Instantiate `method` for a call with the given argument types and, for instance methods,
    /// the receiver type.
    ///
    /// # Panics
    ///
    /// Panics if the argument count does not fit the (vararg-expanded) parameter list.
    pub fn resolve_call(
        &self,
        method: &AnnotatedExecutable<Q>,
        args: &[AnnotatedType<Q>],
        receiver: Option<&AnnotatedType<Q>>,
        is_varargs: bool,
    ) -> AnnotatedExecutable<Q> {
        let _span = tracing::debug_span!("resolve_call", args = args.len()).entered();
        if self.table.is_empty() {
            return method.clone();
        }
        let params = expand_var_args(method.params(), is_varargs, args);
        let mut collector = Collector::new(&self.ctx, &self.table);
        let mut mapping = collector.visit_all(args, &params);
        if let (Some(actual), Some(declared)) = (receiver, method.receiver()) {
            let from_receiver = collector.visit(actual, declared);
            mapping = collector.reduce(mapping, from_receiver);
        }
        self.apply(method, &mapping)
    }

    /// Instantiate a constructor. `constructed` is the type of the `new` expression, which speaks
    /// for a placeholder on the constructor's result.
    ///
    /// # Panics
    ///
    /// Panics if the argument count does not fit the (vararg-expanded) parameter list.
    pub fn resolve_constructor_call(
        &self,
        constructor: &AnnotatedExecutable<Q>,
        args: &[AnnotatedType<Q>],
        is_varargs: bool,
        constructed: &AnnotatedType<Q>,
    ) -> AnnotatedExecutable<Q> {
        let _span = tracing::debug_span!("resolve_constructor_call", args = args.len()).entered();
        if self.table.is_empty() {
            return constructor.clone();
        }
        let params = expand_var_args(constructor.params(), is_varargs, args);
        let mut collector = Collector::new(&self.ctx, &self.table);
        let mapping = collector.visit_all(args, &params);
        let from_result = collector.primary(constructed, constructor.return_type());
        let mapping = collector.reduce(mapping, from_result);
        self.apply(constructor, &mapping)
    }

    /// Instantiate the method `reference` refers to against the function type it is converted
    /// to.
    ///
    /// When the function type has one more parameter than the referenced method, the first one
    /// is the receiver (`String::length` as a `Function<String, Integer>`).
    pub fn resolve_member_reference(
        &self,
        functional: &AnnotatedExecutable<Q>,
        reference: &AnnotatedExecutable<Q>,
        reference_varargs: bool,
        functional_varargs: bool,
    ) -> AnnotatedExecutable<Q> {
        let _span = tracing::debug_span!("resolve_member_reference").entered();
        if self.table.is_empty() {
            return reference.clone();
        }
        if functional
            .return_type()
            .qualifier()
            .is_some_and(|q| self.table.is_placeholder(q))
        {
            tracing::trace!(
                target: "nova.qualifiers",
                "function type is polymorphic itself; leaving the reference unresolved"
            );
            return reference.clone();
        }

        let args = functional.params();
        let mut collector = Collector::new(&self.ctx, &self.table);
        let mut params = reference.params().to_vec();
        let mut mapping = Instantiation::new();
        match reference.receiver() {
            Some(receiver) if args.len() == params.len() + 1 => {
                params.insert(0, receiver.clone());
            }
            Some(receiver) => {
                if let Some(actual) = functional.receiver() {
                    mapping = collector.primary(actual, receiver);
                }
            }
            None => {}
        }
        if reference_varargs && !functional_varargs {
            params = expand_var_args(&params, true, args);
        }

        let from_params = collector.visit_all(args, &params);
        let mapping = collector.reduce(mapping, from_params);
        self.apply(reference, &mapping)
    }

    /// Instantiate the type of a field read through `owner`: a placeholder on the field stands
    /// for the owner's qualifier.
    pub fn resolve_field(
        &self,
        owner: &AnnotatedType<Q>,
        field: &AnnotatedType<Q>,
    ) -> AnnotatedType<Q> {
        if self.table.is_empty() {
            return field.clone();
        }
        let collector = Collector::new(&self.ctx, &self.table);
        let mut mapping = Instantiation::new();
        if let Some(q) = collector.upper_qualifier(owner) {
            for placeholder in self.table.placeholders() {
                mapping.insert(placeholder.clone(), q.clone());
            }
        }
        self.rewrite(field, &mapping)
    }

    fn apply(
        &self,
        exec: &AnnotatedExecutable<Q>,
        mapping: &Instantiation<Q>,
    ) -> AnnotatedExecutable<Q> {
        tracing::trace!(target: "nova.qualifiers", ?mapping, "polymorphic instantiation");
        AnnotatedExecutable::new(
            exec.type_params().to_vec(),
            exec.receiver().map(|receiver| self.rewrite(receiver, mapping)),
            exec.params()
                .iter()
                .map(|param| self.rewrite(param, mapping))
                .collect(),
            self.rewrite(exec.return_type(), mapping),
            exec.thrown()
                .iter()
                .map(|thrown| self.rewrite(thrown, mapping))
                .collect(),
        )
    }

    /// Replace instantiated placeholders by their instantiation and the rest by top. Type
    /// variable and wildcard positions holding an uninstantiated per-hierarchy placeholder are
    /// left unqualified.
    fn rewrite(&self, ty: &AnnotatedType<Q>, mapping: &Instantiation<Q>) -> AnnotatedType<Q> {
        let top = self.ctx.hierarchy().top();
        ty.map_qualifiers(&mut |node| {
            let q = node.qualifier()?;
            if let Some(instantiated) = mapping.get(q) {
                return Some(instantiated.clone());
            }
            match self.table.scope_of(q) {
                None => Some(q.clone()),
                Some(PolyScope::All) => Some(top.clone()),
                Some(PolyScope::Hierarchy) if node.is_type_variable() || node.is_wildcard() => {
                    None
                }
                Some(PolyScope::Hierarchy) => Some(top.clone()),
            }
        })
    }
}

/// Walks actual types and declared types in lock-step, recording what each placeholder meets.
struct Collector<'c, 'a, Q: Qualifier> {
    ctx: &'c QualContext<'a, Q>,
    table: &'c PolymorphismTable<Q>,
    hierarchy: &'a dyn QualifierHierarchy<Q>,
    annotator: Annotator<'a, Q>,
    /// (actual, declared) pairs on the current path.
    visiting: HashSet<(AnnotatedType<Q>, AnnotatedType<Q>)>,
}

impl<'c, 'a, Q: Qualifier> Collector<'c, 'a, Q> {
    fn new(ctx: &'c QualContext<'a, Q>, table: &'c PolymorphismTable<Q>) -> Self {
        Self {
            ctx,
            table,
            hierarchy: ctx.hierarchy(),
            annotator: ctx.annotator(),
            visiting: HashSet::new(),
        }
    }

    /// Join two instantiations; placeholders found in both take the LUB.
    fn reduce(&self, mut left: Instantiation<Q>, right: Instantiation<Q>) -> Instantiation<Q> {
        for (placeholder, q) in right {
            let joined = match left.get(&placeholder) {
                Some(existing) => self.hierarchy.least_upper_bound(existing, &q),
                None => q,
            };
            left.insert(placeholder, joined);
        }
        left
    }

    fn visit_all(
        &mut self,
        actuals: &[AnnotatedType<Q>],
        declared: &[AnnotatedType<Q>],
    ) -> Instantiation<Q> {
        if actuals.len() != declared.len() {
            tracing::error!(
                target: "nova.qualifiers",
                actuals = actuals.len(),
                declared = declared.len(),
                "argument and parameter lists differ in length"
            );
            panic!(
                "polymorphic resolution with {} arguments for {} parameters",
                actuals.len(),
                declared.len()
            );
        }
        let mut mapping = Instantiation::new();
        for (actual, param) in actuals.iter().zip(declared) {
            let found = self.visit(actual, param);
            mapping = self.reduce(mapping, found);
        }
        mapping
    }

    fn upper_qualifier(&self, ty: &AnnotatedType<Q>) -> Option<Q> {
        ty.effective_upper_qualifier(self.hierarchy).or_else(|| {
            self.annotator
                .upper_bound_of(ty)?
                .effective_upper_qualifier(self.hierarchy)
        })
    }

    /// The instantiation the primary qualifier of `declared` asks for.
    fn primary(&self, actual: &AnnotatedType<Q>, declared: &AnnotatedType<Q>) -> Instantiation<Q> {
        let mut mapping = Instantiation::new();
        if let Some(placeholder) = declared.qualifier() {
            if self.table.is_placeholder(placeholder) {
                if let Some(q) = self.upper_qualifier(actual) {
                    mapping.insert(placeholder.clone(), q);
                }
            }
        }
        mapping
    }

    fn visit(&mut self, actual: &AnnotatedType<Q>, declared: &AnnotatedType<Q>) -> Instantiation<Q> {
        let key = (actual.clone(), declared.clone());
        if !self.visiting.insert(key.clone()) {
            return Instantiation::new();
        }
        let mapping = self.visit_unguarded(actual, declared);
        self.visiting.remove(&key);
        mapping
    }

    fn visit_unguarded(
        &mut self,
        actual: &AnnotatedType<Q>,
        declared: &AnnotatedType<Q>,
    ) -> Instantiation<Q> {
        if matches!(actual.kind(), AnnotatedKind::Null) {
            return self.primary(actual, declared);
        }
        // A wildcard lined up with a concrete declared type speaks through its extends bound.
        let extends_bound = if actual.is_wildcard() && !declared.is_wildcard() {
            match self.annotator.upper_bound_of(actual) {
                Some(bound) => Some(bound),
                None => return self.primary(actual, declared),
            }
        } else {
            None
        };
        let actual = extends_bound.as_ref().unwrap_or(actual);
        let viewed = match declared.kind() {
            AnnotatedKind::Declared(_) | AnnotatedKind::Array(_) | AnnotatedKind::Primitive(_) => {
                as_super(self.ctx, actual, declared).unwrap_or_else(|| actual.clone())
            }
            _ => actual.clone(),
        };

        let mapping = self.primary(&viewed, declared);
        let nested = match (viewed.kind(), declared.kind()) {
            (AnnotatedKind::Array(a), AnnotatedKind::Array(d)) => self.visit(a, d),
            (AnnotatedKind::Declared(a), AnnotatedKind::Declared(d)) => {
                let mut nested = Instantiation::new();
                // Raw types have nothing to line up.
                if a.type_args().len() == d.type_args().len() {
                    for (a_arg, d_arg) in a.type_args().iter().zip(d.type_args()) {
                        let found = self.visit(a_arg, d_arg);
                        nested = self.reduce(nested, found);
                    }
                }
                if let (Some(a_outer), Some(d_outer)) = (a.enclosing(), d.enclosing()) {
                    let found = self.visit(a_outer, d_outer);
                    nested = self.reduce(nested, found);
                }
                nested
            }
            (AnnotatedKind::TypeVariable(_), AnnotatedKind::TypeVariable(_))
            | (AnnotatedKind::Wildcard(_), AnnotatedKind::Wildcard(_)) => {
                let mut nested = Instantiation::new();
                if let (Some(a), Some(d)) = (
                    self.annotator.upper_bound_of(&viewed),
                    self.annotator.upper_bound_of(declared),
                ) {
                    nested = self.visit(&a, &d);
                }
                if let (Some(a), Some(d)) = (
                    self.annotator.lower_bound_of(&viewed),
                    self.annotator.lower_bound_of(declared),
                ) {
                    let found = self.visit(&a, &d);
                    nested = self.reduce(nested, found);
                }
                nested
            }
            (AnnotatedKind::Intersection(a), AnnotatedKind::Intersection(d))
            | (AnnotatedKind::Union(a), AnnotatedKind::Union(d))
                if a.len() == d.len() =>
            {
                let mut nested = Instantiation::new();
                for (a_part, d_part) in a.iter().zip(d) {
                    let found = self.visit(a_part, d_part);
                    nested = self.reduce(nested, found);
                }
                nested
            }
            _ => Instantiation::new(),
        };
        self.reduce(mapping, nested)
    }
}
