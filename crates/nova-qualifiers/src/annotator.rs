//! Building qualified types from host types.

use std::collections::HashSet;

use nova_types::{
    lower_bound, upper_bound, ClassId, ExecutableType, MemberRef, Type, TypeEnv, TypeVarId,
    WildcardBound,
};

use crate::{AnnotatedExecutable, AnnotatedType, NoTypeKind, Qualifier, QualifierHierarchy, WildcardForm};

/// One step from a type position to one of its structural children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypePathStep {
    TypeArgument(usize),
    Component,
    /// Upper bound of a type parameter.
    UpperBound,
    /// Lower bound of a type parameter. Implicit lower bounds are the null type.
    LowerBound,
    ExtendsBound,
    SuperBound,
    /// A bound of an intersection or an alternative of a union.
    Bound(usize),
    Enclosing,
    Parameter(usize),
    Return,
    Receiver,
    Thrown(usize),
    /// The `i`-th declared direct supertype of a class (superclass first).
    Supertype(usize),
}

/// Where a [`TypePath`] starts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// A type written at a use site (local, cast, type argument of an expression, ...).
    Use,
    /// The declared type of a member. Type parameter bounds use
    /// `Member(MemberRef::TypeParameter(id))`.
    Member(MemberRef),
    /// A class declaration, its self use and its `extends`/`implements` clauses.
    Declaration(ClassId),
}

/// A type position: a root plus the steps leading to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypePath {
    root: PathRoot,
    steps: Vec<TypePathStep>,
}

impl TypePath {
    pub fn new(root: PathRoot) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    pub fn use_site() -> Self {
        Self::new(PathRoot::Use)
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    pub fn steps(&self) -> &[TypePathStep] {
        &self.steps
    }

    pub fn last(&self) -> Option<TypePathStep> {
        self.steps.last().copied()
    }

    pub fn child(&self, step: TypePathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push(step);
        Self {
            root: self.root.clone(),
            steps,
        }
    }
}

/// Qualifiers written in source (or produced by annotation conversion) for a type position.
pub trait AnnotationSource<Q> {
    fn qualifier(&self, ty: &Type, path: &TypePath) -> Option<Q>;
}

impl<Q, F> AnnotationSource<Q> for F
where
    F: Fn(&Type, &TypePath) -> Option<Q>,
{
    fn qualifier(&self, ty: &Type, path: &TypePath) -> Option<Q> {
        self(ty, path)
    }
}

/// A source without any annotations: every position gets its default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAnnotations;

impl<Q> AnnotationSource<Q> for NoAnnotations {
    fn qualifier(&self, _ty: &Type, _path: &TypePath) -> Option<Q> {
        None
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Consult the source and apply defaults.
    Decorate,
    /// Structure only.
    Bare,
}

/// Decorates host types with qualifiers.
///
/// Each position gets, in order of preference, the qualifier already present (when completing an
/// existing tree), the qualifier reported by the [`AnnotationSource`], or a default: bottom for
/// the null type (which also stands for missing lower bounds) and top everywhere else.
pub struct Annotator<'a, Q: Qualifier> {
    env: &'a dyn TypeEnv,
    hierarchy: &'a dyn QualifierHierarchy<Q>,
    source: &'a dyn AnnotationSource<Q>,
}

impl<'a, Q: Qualifier> Annotator<'a, Q> {
    pub fn new(
        env: &'a dyn TypeEnv,
        hierarchy: &'a dyn QualifierHierarchy<Q>,
        source: &'a dyn AnnotationSource<Q>,
    ) -> Self {
        Self {
            env,
            hierarchy,
            source,
        }
    }

    pub fn env(&self) -> &'a dyn TypeEnv {
        self.env
    }

    pub fn hierarchy(&self) -> &'a dyn QualifierHierarchy<Q> {
        self.hierarchy
    }

    /// Decorate a type written at a use site.
    pub fn annotate(&self, ty: &Type) -> AnnotatedType<Q> {
        self.annotate_at(ty, &TypePath::use_site())
    }

    pub fn annotate_at(&self, ty: &Type, path: &TypePath) -> AnnotatedType<Q> {
        let _span = tracing::trace_span!("annotate", ty = ?ty).entered();
        self.build(ty, path, &mut HashSet::new(), Mode::Decorate)
    }

    /// The structure of `ty` without any qualifiers.
    pub fn unqualified(&self, ty: &Type) -> AnnotatedType<Q> {
        self.build(ty, &TypePath::use_site(), &mut HashSet::new(), Mode::Bare)
    }

    pub fn default_qualifier(&self, ty: &Type) -> Q {
        match ty {
            Type::Null => self.hierarchy.bottom(),
            _ => self.hierarchy.top(),
        }
    }

    fn build(
        &self,
        ty: &Type,
        path: &TypePath,
        expanding: &mut HashSet<TypeVarId>,
        mode: Mode,
    ) -> AnnotatedType<Q> {
        let node = match ty {
            Type::Void => AnnotatedType::no_type(NoTypeKind::Void),
            Type::None => AnnotatedType::no_type(NoTypeKind::None),
            Type::Package(name) => AnnotatedType::no_type(NoTypeKind::Package(name.clone())),
            Type::Primitive(prim) => AnnotatedType::primitive(*prim),
            Type::Null => AnnotatedType::null(),
            Type::Class(class) => {
                let args = class
                    .args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        self.build(arg, &path.child(TypePathStep::TypeArgument(i)), expanding, mode)
                    })
                    .collect();
                match &class.outer {
                    Some(outer) => {
                        let outer = self.build(
                            &Type::Class(outer.as_ref().clone()),
                            &path.child(TypePathStep::Enclosing),
                            expanding,
                            mode,
                        );
                        AnnotatedType::inner(outer, class.def, args)
                    }
                    None => AnnotatedType::declared(class.def, args),
                }
            }
            Type::Array(component) => AnnotatedType::array(self.build(
                component,
                &path.child(TypePathStep::Component),
                expanding,
                mode,
            )),
            Type::TypeVar(id) => {
                if expanding.insert(*id) {
                    let (upper, lower) = self.build_bounds(*id, expanding, mode);
                    expanding.remove(id);
                    AnnotatedType::type_variable(*id, Some(upper), Some(lower))
                } else {
                    tracing::trace!(target: "nova.qualifiers", type_var = ?id, "cut recursive type variable bound");
                    AnnotatedType::type_variable(*id, None, None)
                }
            }
            Type::Wildcard(bound) => {
                let object = Type::class(self.env.well_known().object, vec![]);
                let (form, extends, super_) = match bound {
                    WildcardBound::Unbounded => (WildcardForm::Unbounded, object, Type::Null),
                    WildcardBound::Extends(upper) => {
                        (WildcardForm::Extends, upper.as_ref().clone(), Type::Null)
                    }
                    WildcardBound::Super(lower) => {
                        (WildcardForm::Super, object, lower.as_ref().clone())
                    }
                };
                AnnotatedType::wildcard(
                    form,
                    self.build(&extends, &path.child(TypePathStep::ExtendsBound), expanding, mode),
                    self.build(&super_, &path.child(TypePathStep::SuperBound), expanding, mode),
                )
            }
            Type::Intersection(parts) => AnnotatedType::intersection(
                self.build_all(parts, path, TypePathStep::Bound, expanding, mode),
            ),
            Type::Union(parts) => AnnotatedType::union(
                self.build_all(parts, path, TypePathStep::Bound, expanding, mode),
            ),
            Type::Executable(exec) => AnnotatedType::executable(AnnotatedExecutable::new(
                exec.type_params.clone(),
                exec.receiver.as_ref().map(|receiver| {
                    self.build(receiver, &path.child(TypePathStep::Receiver), expanding, mode)
                }),
                self.build_all(&exec.params, path, TypePathStep::Parameter, expanding, mode),
                self.build(
                    &exec.return_type,
                    &path.child(TypePathStep::Return),
                    expanding,
                    mode,
                ),
                self.build_all(&exec.thrown, path, TypePathStep::Thrown, expanding, mode),
            )),
        };

        if mode == Mode::Bare {
            return node;
        }
        match self.source.qualifier(ty, path) {
            Some(q) => node.with_qualifier(q),
            None if node.needs_qualifier() => node.with_qualifier(self.default_qualifier(ty)),
            None => node,
        }
    }

    fn build_all(
        &self,
        types: &[Type],
        path: &TypePath,
        step: fn(usize) -> TypePathStep,
        expanding: &mut HashSet<TypeVarId>,
        mode: Mode,
    ) -> Vec<AnnotatedType<Q>> {
        types
            .iter()
            .enumerate()
            .map(|(i, ty)| self.build(ty, &path.child(step(i)), expanding, mode))
            .collect()
    }

    fn build_bounds(
        &self,
        id: TypeVarId,
        expanding: &mut HashSet<TypeVarId>,
        mode: Mode,
    ) -> (AnnotatedType<Q>, AnnotatedType<Q>) {
        let root = TypePath::new(PathRoot::Member(MemberRef::TypeParameter(id)));
        let upper = self.build(
            &upper_bound(self.env, id),
            &root.child(TypePathStep::UpperBound),
            expanding,
            mode,
        );
        let lower = self.build(
            &lower_bound(self.env, id),
            &root.child(TypePathStep::LowerBound),
            expanding,
            mode,
        );
        (upper, lower)
    }

    /// Upper bound of a type variable use (or extends bound of a wildcard), with the use's
    /// explicit qualifier applied. A bound cut during construction is decorated afresh.
    pub fn upper_bound_of(&self, ty: &AnnotatedType<Q>) -> Option<AnnotatedType<Q>> {
        if let Some(bound) = ty.effective_upper_bound() {
            return Some(bound);
        }
        let var = ty.as_type_variable()?;
        let mut expanding = HashSet::from([var.id()]);
        let (upper, _) = self.build_bounds(var.id(), &mut expanding, Mode::Decorate);
        Some(match ty.qualifier() {
            Some(q) => upper.with_qualifier(q.clone()),
            None => upper,
        })
    }

    /// Counterpart of [`Annotator::upper_bound_of`] for lower (super) bounds.
    pub fn lower_bound_of(&self, ty: &AnnotatedType<Q>) -> Option<AnnotatedType<Q>> {
        if let Some(bound) = ty.effective_lower_bound() {
            return Some(bound);
        }
        let var = ty.as_type_variable()?;
        let mut expanding = HashSet::from([var.id()]);
        let (_, lower) = self.build_bounds(var.id(), &mut expanding, Mode::Decorate);
        Some(match ty.qualifier() {
            Some(q) => lower.with_qualifier(q.clone()),
            None => lower,
        })
    }

    /// The self use of a class, `C<T1, .., Tn>`, qualified by its enclosing class' self use for
    /// nested classes.
    pub fn declared_type(&self, def: ClassId) -> Type {
        let Some(class) = self.env.class(def) else {
            return Type::class(def, vec![]);
        };
        let args = class.type_params.iter().copied().map(Type::TypeVar).collect();
        match class.outer.map(|outer| self.declared_type(outer)) {
            Some(Type::Class(outer)) => Type::inner_class(outer, def, args),
            _ => Type::class(def, args),
        }
    }

    /// The class seen from inside its own declaration.
    pub fn annotate_class_use(&self, def: ClassId) -> AnnotatedType<Q> {
        self.annotate_at(
            &self.declared_type(def),
            &TypePath::new(PathRoot::Declaration(def)),
        )
    }

    /// A class declaration viewed as a type. Carries the qualifier of its self use.
    pub fn annotate_declaration(&self, def: ClassId) -> Option<AnnotatedType<Q>> {
        let class = self.env.class(def)?;
        let decl = AnnotatedType::type_declaration(def, class.type_params.clone());
        let path = TypePath::new(PathRoot::Declaration(def));
        let q = self
            .source
            .qualifier(&decl.underlying(), &path)
            .unwrap_or_else(|| self.hierarchy.top());
        Some(decl.with_qualifier(q))
    }

    pub fn annotate_field(&self, owner: ClassId, index: usize) -> Option<AnnotatedType<Q>> {
        let field = self.env.class(owner)?.fields.get(index)?;
        Some(self.annotate_at(
            &field.ty,
            &TypePath::new(PathRoot::Member(MemberRef::Field { owner, index })),
        ))
    }

    pub fn annotate_method(&self, owner: ClassId, index: usize) -> Option<AnnotatedType<Q>> {
        let method = self.env.class(owner)?.methods.get(index)?;
        let exec = ExecutableType {
            type_params: method.type_params.clone(),
            receiver: (!method.is_static).then(|| self.declared_type(owner)),
            params: method.params.clone(),
            return_type: method.return_type.clone(),
            thrown: method.throws.clone(),
        };
        Some(self.annotate_at(
            &Type::Executable(Box::new(exec)),
            &TypePath::new(PathRoot::Member(MemberRef::Method { owner, index })),
        ))
    }

    /// A constructor as an executable returning the constructed class' self use.
    pub fn annotate_constructor(&self, owner: ClassId, index: usize) -> Option<AnnotatedType<Q>> {
        let ctor = self.env.class(owner)?.constructors.get(index)?;
        let exec = ExecutableType {
            type_params: ctor.type_params.clone(),
            receiver: None,
            params: ctor.params.clone(),
            return_type: self.declared_type(owner),
            thrown: ctor.throws.clone(),
        };
        Some(self.annotate_at(
            &Type::Executable(Box::new(exec)),
            &TypePath::new(PathRoot::Member(MemberRef::Constructor { owner, index })),
        ))
    }

    /// The declared type of any member, without viewpoint adaptation.
    pub fn annotate_member(&self, member: &MemberRef) -> Option<AnnotatedType<Q>> {
        match member {
            MemberRef::Field { owner, index } => self.annotate_field(*owner, *index),
            MemberRef::Method { owner, index } => self.annotate_method(*owner, *index),
            MemberRef::Constructor { owner, index } => self.annotate_constructor(*owner, *index),
            MemberRef::Initializer { .. } => {
                let exec = ExecutableType {
                    type_params: vec![],
                    receiver: None,
                    params: vec![],
                    return_type: Type::Void,
                    thrown: vec![],
                };
                Some(self.annotate_at(
                    &Type::Executable(Box::new(exec)),
                    &TypePath::new(PathRoot::Member(member.clone())),
                ))
            }
            MemberRef::TypeParameter(id) => {
                self.env.type_param(*id)?;
                Some(self.annotate_at(
                    &Type::TypeVar(*id),
                    &TypePath::new(PathRoot::Member(member.clone())),
                ))
            }
            MemberRef::Package(name) => Some(self.annotate_at(
                &Type::Package(name.clone()),
                &TypePath::new(PathRoot::Member(member.clone())),
            )),
        }
    }

    /// Fill every missing qualifier of `node`. Qualifiers already present are kept; the
    /// source is consulted for the rest, then the defaults.
    ///
    /// Completing a fully qualified tree returns it unchanged.
    pub fn complete(&self, node: &AnnotatedType<Q>) -> AnnotatedType<Q> {
        let fresh = self.annotate(&node.underlying());
        let mut out = node.clone();
        self.fill(&mut out, Some(&fresh));
        out
    }

    /// Decorate `ty`, keeping the qualifiers of `existing`, which must mirror `ty`.
    ///
    /// # Panics
    ///
    /// Panics if `existing` does not have the structure of `ty`.
    pub fn redecorate(&self, ty: &Type, existing: &AnnotatedType<Q>) -> AnnotatedType<Q> {
        if !existing.mirrors(ty) {
            tracing::error!(
                target: "nova.qualifiers",
                expected = ?ty,
                found = ?existing.underlying(),
                "qualified type does not mirror its host type"
            );
            panic!(
                "qualified type does not mirror its host type: expected {ty:?}, found {:?}",
                existing.underlying()
            );
        }
        self.complete(existing)
    }

    fn fill(&self, node: &mut AnnotatedType<Q>, fresh: Option<&AnnotatedType<Q>>) {
        if !node.has_qualifier() {
            let q = fresh.and_then(|f| f.qualifier().cloned()).or_else(|| {
                node.needs_qualifier()
                    .then(|| self.default_qualifier(&node.underlying()))
            });
            node.set_qualifier(q);
        }
        let fresh_children = fresh
            .filter(|f| same_shape(node, f))
            .map(AnnotatedType::children)
            .unwrap_or_default();
        for (i, child) in node.children_mut().into_iter().enumerate() {
            self.fill(child, fresh_children.get(i).copied());
        }
    }

    /// Give `qualifier` to every position that needs a qualifier and has none.
    pub fn add_missing(&self, node: &AnnotatedType<Q>, qualifier: &Q) -> AnnotatedType<Q> {
        node.map_qualifiers(&mut |n| {
            n.qualifier()
                .cloned()
                .or_else(|| n.needs_qualifier().then(|| qualifier.clone()))
        })
    }
}

fn same_shape<Q: Qualifier>(a: &AnnotatedType<Q>, b: &AnnotatedType<Q>) -> bool {
    std::mem::discriminant(a.kind()) == std::mem::discriminant(b.kind())
        && a.children().len() == b.children().len()
}
