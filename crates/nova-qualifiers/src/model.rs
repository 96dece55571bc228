//! Qualified types.
//!
//! An [`AnnotatedType`] mirrors a host [`Type`] node for node and attaches a qualifier to each
//! position. The host type is never stored separately: [`AnnotatedType::underlying`] rebuilds it
//! from the tree, so a node cannot drift from the host structure it describes.

use std::collections::HashMap;
use std::fmt;

use nova_types::{
    erasure, ClassId, ClassType, ExecutableType, PrimitiveType, Type, TypeEnv, TypeVarId,
    WildcardBound,
};

use crate::{Qualifier, QualifierHierarchy};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoTypeKind {
    Void,
    None,
    Package(String),
}

/// Which host wildcard form a wildcard node mirrors. Both bounds are always materialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WildcardForm {
    Unbounded,
    Extends,
    Super,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedDeclared<Q> {
    pub(crate) def: ClassId,
    pub(crate) args: Vec<AnnotatedType<Q>>,
    pub(crate) outer: Option<Box<AnnotatedType<Q>>>,
}

impl<Q: Qualifier> AnnotatedDeclared<Q> {
    pub fn def(&self) -> ClassId {
        self.def
    }

    pub fn type_args(&self) -> &[AnnotatedType<Q>] {
        &self.args
    }

    /// The enclosing type use of an inner class, e.g. `Outer<String>` in `Outer<String>.Inner`.
    pub fn enclosing(&self) -> Option<&AnnotatedType<Q>> {
        self.outer.as_deref()
    }

    fn class_type(&self) -> ClassType {
        ClassType {
            def: self.def,
            args: self.args.iter().map(AnnotatedType::underlying).collect(),
            outer: self
                .outer
                .as_deref()
                .and_then(AnnotatedType::as_declared)
                .map(|outer| Box::new(outer.class_type())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedExecutable<Q> {
    pub(crate) type_params: Vec<TypeVarId>,
    pub(crate) receiver: Option<AnnotatedType<Q>>,
    pub(crate) params: Vec<AnnotatedType<Q>>,
    pub(crate) return_type: AnnotatedType<Q>,
    pub(crate) thrown: Vec<AnnotatedType<Q>>,
}

impl<Q: Qualifier> AnnotatedExecutable<Q> {
    pub fn new(
        type_params: Vec<TypeVarId>,
        receiver: Option<AnnotatedType<Q>>,
        params: Vec<AnnotatedType<Q>>,
        return_type: AnnotatedType<Q>,
        thrown: Vec<AnnotatedType<Q>>,
    ) -> Self {
        Self {
            type_params,
            receiver,
            params,
            return_type,
            thrown,
        }
    }

    pub fn type_params(&self) -> &[TypeVarId] {
        &self.type_params
    }

    pub fn receiver(&self) -> Option<&AnnotatedType<Q>> {
        self.receiver.as_ref()
    }

    pub fn params(&self) -> &[AnnotatedType<Q>] {
        &self.params
    }

    pub fn return_type(&self) -> &AnnotatedType<Q> {
        &self.return_type
    }

    pub fn thrown(&self) -> &[AnnotatedType<Q>] {
        &self.thrown
    }
}

/// A use of a type variable.
///
/// A bound is `None` when it refers back to a variable that was already being expanded when this
/// node was built (`E extends Enum<E>`); [`crate::Annotator::upper_bound_of`] materializes it on
/// demand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedTypeVariable<Q> {
    pub(crate) id: TypeVarId,
    pub(crate) upper: Option<Box<AnnotatedType<Q>>>,
    pub(crate) lower: Option<Box<AnnotatedType<Q>>>,
}

impl<Q: Qualifier> AnnotatedTypeVariable<Q> {
    pub fn id(&self) -> TypeVarId {
        self.id
    }

    pub fn upper_bound(&self) -> Option<&AnnotatedType<Q>> {
        self.upper.as_deref()
    }

    pub fn lower_bound(&self) -> Option<&AnnotatedType<Q>> {
        self.lower.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedWildcard<Q> {
    pub(crate) form: WildcardForm,
    pub(crate) extends_bound: Box<AnnotatedType<Q>>,
    pub(crate) super_bound: Box<AnnotatedType<Q>>,
}

impl<Q: Qualifier> AnnotatedWildcard<Q> {
    pub fn form(&self) -> WildcardForm {
        self.form
    }

    pub fn extends_bound(&self) -> &AnnotatedType<Q> {
        &self.extends_bound
    }

    pub fn super_bound(&self) -> &AnnotatedType<Q> {
        &self.super_bound
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedTypeDeclaration<Q> {
    pub(crate) def: ClassId,
    pub(crate) type_params: Vec<TypeVarId>,
    marker: std::marker::PhantomData<Q>,
}

impl<Q: Qualifier> AnnotatedTypeDeclaration<Q> {
    pub fn def(&self) -> ClassId {
        self.def
    }

    pub fn type_params(&self) -> &[TypeVarId] {
        &self.type_params
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotatedKind<Q> {
    Primitive(PrimitiveType),
    Array(Box<AnnotatedType<Q>>),
    Declared(AnnotatedDeclared<Q>),
    Executable(Box<AnnotatedExecutable<Q>>),
    Intersection(Vec<AnnotatedType<Q>>),
    Union(Vec<AnnotatedType<Q>>),
    TypeVariable(AnnotatedTypeVariable<Q>),
    Wildcard(AnnotatedWildcard<Q>),
    NoType(NoTypeKind),
    Null,
    /// A class declaration seen as a type, with its own type parameters as arguments.
    TypeDeclaration(AnnotatedTypeDeclaration<Q>),
    /// A type parameter's declaration. Its bounds live in the host environment.
    ParameterDeclaration(TypeVarId),
}

/// A host type decorated with qualifiers.
///
/// Executables, unions and type parameter declarations never carry a qualifier. Type variable and
/// wildcard uses carry one only when it was written explicitly; otherwise their bounds decide.
/// Every other node has exactly one qualifier once fully annotated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatedType<Q> {
    qualifier: Option<Q>,
    kind: AnnotatedKind<Q>,
}

impl<Q: Qualifier> AnnotatedType<Q> {
    fn unqualified(kind: AnnotatedKind<Q>) -> Self {
        Self {
            qualifier: None,
            kind,
        }
    }

    pub fn primitive(prim: PrimitiveType) -> Self {
        Self::unqualified(AnnotatedKind::Primitive(prim))
    }

    pub fn array(component: AnnotatedType<Q>) -> Self {
        Self::unqualified(AnnotatedKind::Array(Box::new(component)))
    }

    pub fn declared(def: ClassId, args: Vec<AnnotatedType<Q>>) -> Self {
        Self::unqualified(AnnotatedKind::Declared(AnnotatedDeclared {
            def,
            args,
            outer: None,
        }))
    }

    /// An inner class use. Panics if `outer` is not a declared type.
    pub fn inner(outer: AnnotatedType<Q>, def: ClassId, args: Vec<AnnotatedType<Q>>) -> Self {
        if outer.as_declared().is_none() {
            tracing::error!(target: "nova.qualifiers", ?outer, "enclosing type of an inner class must be a declared type");
            panic!("enclosing type of an inner class must be a declared type, got {outer:?}");
        }
        Self::unqualified(AnnotatedKind::Declared(AnnotatedDeclared {
            def,
            args,
            outer: Some(Box::new(outer)),
        }))
    }

    pub fn executable(exec: AnnotatedExecutable<Q>) -> Self {
        Self::unqualified(AnnotatedKind::Executable(Box::new(exec)))
    }

    pub fn intersection(bounds: Vec<AnnotatedType<Q>>) -> Self {
        Self::unqualified(AnnotatedKind::Intersection(bounds))
    }

    pub fn union(alternatives: Vec<AnnotatedType<Q>>) -> Self {
        Self::unqualified(AnnotatedKind::Union(alternatives))
    }

    pub fn type_variable(
        id: TypeVarId,
        upper: Option<AnnotatedType<Q>>,
        lower: Option<AnnotatedType<Q>>,
    ) -> Self {
        Self::unqualified(AnnotatedKind::TypeVariable(AnnotatedTypeVariable {
            id,
            upper: upper.map(Box::new),
            lower: lower.map(Box::new),
        }))
    }

    pub fn wildcard(
        form: WildcardForm,
        extends_bound: AnnotatedType<Q>,
        super_bound: AnnotatedType<Q>,
    ) -> Self {
        Self::unqualified(AnnotatedKind::Wildcard(AnnotatedWildcard {
            form,
            extends_bound: Box::new(extends_bound),
            super_bound: Box::new(super_bound),
        }))
    }

    pub fn no_type(kind: NoTypeKind) -> Self {
        Self::unqualified(AnnotatedKind::NoType(kind))
    }

    pub fn null() -> Self {
        Self::unqualified(AnnotatedKind::Null)
    }

    pub fn type_declaration(def: ClassId, type_params: Vec<TypeVarId>) -> Self {
        Self::unqualified(AnnotatedKind::TypeDeclaration(AnnotatedTypeDeclaration {
            def,
            type_params,
            marker: std::marker::PhantomData,
        }))
    }

    pub fn parameter_declaration(id: TypeVarId) -> Self {
        Self::unqualified(AnnotatedKind::ParameterDeclaration(id))
    }

    pub fn qualifier(&self) -> Option<&Q> {
        self.qualifier.as_ref()
    }

    pub fn kind(&self) -> &AnnotatedKind<Q> {
        &self.kind
    }

    pub fn has_qualifier(&self) -> bool {
        self.qualifier.is_some()
    }

    /// Whether this position can hold a qualifier at all.
    pub fn carries_qualifier(&self) -> bool {
        !matches!(
            self.kind,
            AnnotatedKind::Executable(_)
                | AnnotatedKind::Union(_)
                | AnnotatedKind::ParameterDeclaration(_)
        )
    }

    /// Whether a fully annotated tree must have a qualifier here.
    pub fn needs_qualifier(&self) -> bool {
        self.carries_qualifier()
            && !matches!(
                self.kind,
                AnnotatedKind::TypeVariable(_) | AnnotatedKind::Wildcard(_)
            )
    }

    /// Replace the primary qualifier. Ignored on positions that do not carry one.
    pub fn with_qualifier(mut self, qualifier: Q) -> Self {
        if self.carries_qualifier() {
            self.qualifier = Some(qualifier);
        }
        self
    }

    /// Set the primary qualifier only if there is none yet.
    pub fn with_missing_qualifier(self, qualifier: Q) -> Self {
        if self.qualifier.is_some() {
            return self;
        }
        self.with_qualifier(qualifier)
    }

    pub fn without_qualifier(mut self) -> Self {
        self.qualifier = None;
        self
    }

    pub(crate) fn set_qualifier(&mut self, qualifier: Option<Q>) {
        if self.carries_qualifier() {
            self.qualifier = qualifier;
        }
    }

    pub fn as_declared(&self) -> Option<&AnnotatedDeclared<Q>> {
        match &self.kind {
            AnnotatedKind::Declared(declared) => Some(declared),
            _ => None,
        }
    }

    pub fn as_array_component(&self) -> Option<&AnnotatedType<Q>> {
        match &self.kind {
            AnnotatedKind::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn as_executable(&self) -> Option<&AnnotatedExecutable<Q>> {
        match &self.kind {
            AnnotatedKind::Executable(exec) => Some(exec),
            _ => None,
        }
    }

    pub fn as_type_variable(&self) -> Option<&AnnotatedTypeVariable<Q>> {
        match &self.kind {
            AnnotatedKind::TypeVariable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_wildcard(&self) -> Option<&AnnotatedWildcard<Q>> {
        match &self.kind {
            AnnotatedKind::Wildcard(wildcard) => Some(wildcard),
            _ => None,
        }
    }

    pub fn is_type_variable(&self) -> bool {
        matches!(self.kind, AnnotatedKind::TypeVariable(_))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, AnnotatedKind::Wildcard(_))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, AnnotatedKind::Primitive(_))
    }

    /// The host type this node mirrors.
    pub fn underlying(&self) -> Type {
        match &self.kind {
            AnnotatedKind::Primitive(prim) => Type::Primitive(*prim),
            AnnotatedKind::Array(component) => Type::array(component.underlying()),
            AnnotatedKind::Declared(declared) => Type::Class(declared.class_type()),
            AnnotatedKind::Executable(exec) => Type::Executable(Box::new(ExecutableType {
                type_params: exec.type_params.clone(),
                receiver: exec.receiver.as_ref().map(AnnotatedType::underlying),
                params: exec.params.iter().map(AnnotatedType::underlying).collect(),
                return_type: exec.return_type.underlying(),
                thrown: exec.thrown.iter().map(AnnotatedType::underlying).collect(),
            })),
            AnnotatedKind::Intersection(bounds) => {
                Type::Intersection(bounds.iter().map(AnnotatedType::underlying).collect())
            }
            AnnotatedKind::Union(alternatives) => {
                Type::Union(alternatives.iter().map(AnnotatedType::underlying).collect())
            }
            AnnotatedKind::TypeVariable(var) => Type::TypeVar(var.id),
            AnnotatedKind::Wildcard(wildcard) => Type::Wildcard(match wildcard.form {
                WildcardForm::Unbounded => WildcardBound::Unbounded,
                WildcardForm::Extends => {
                    WildcardBound::Extends(Box::new(wildcard.extends_bound.underlying()))
                }
                WildcardForm::Super => {
                    WildcardBound::Super(Box::new(wildcard.super_bound.underlying()))
                }
            }),
            AnnotatedKind::NoType(NoTypeKind::Void) => Type::Void,
            AnnotatedKind::NoType(NoTypeKind::None) => Type::None,
            AnnotatedKind::NoType(NoTypeKind::Package(name)) => Type::Package(name.clone()),
            AnnotatedKind::Null => Type::Null,
            AnnotatedKind::TypeDeclaration(decl) => Type::class(
                decl.def,
                decl.type_params.iter().copied().map(Type::TypeVar).collect(),
            ),
            AnnotatedKind::ParameterDeclaration(id) => Type::TypeVar(*id),
        }
    }

    /// Whether this node has exactly the structure of `host`.
    pub fn mirrors(&self, host: &Type) -> bool {
        self.underlying() == *host
    }

    /// Direct structural children, bounds included.
    pub fn children(&self) -> Vec<&AnnotatedType<Q>> {
        match &self.kind {
            AnnotatedKind::Array(component) => vec![component],
            AnnotatedKind::Declared(declared) => declared
                .outer
                .as_deref()
                .into_iter()
                .chain(declared.args.iter())
                .collect(),
            AnnotatedKind::Executable(exec) => exec
                .receiver
                .iter()
                .chain(exec.params.iter())
                .chain(std::iter::once(&exec.return_type))
                .chain(exec.thrown.iter())
                .collect(),
            AnnotatedKind::Intersection(parts) | AnnotatedKind::Union(parts) => {
                parts.iter().collect()
            }
            AnnotatedKind::TypeVariable(var) => var
                .upper
                .as_deref()
                .into_iter()
                .chain(var.lower.as_deref())
                .collect(),
            AnnotatedKind::Wildcard(wildcard) => {
                vec![&wildcard.extends_bound, &wildcard.super_bound]
            }
            AnnotatedKind::Primitive(_)
            | AnnotatedKind::NoType(_)
            | AnnotatedKind::Null
            | AnnotatedKind::TypeDeclaration(_)
            | AnnotatedKind::ParameterDeclaration(_) => vec![],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Vec<&mut AnnotatedType<Q>> {
        match &mut self.kind {
            AnnotatedKind::Array(component) => vec![component.as_mut()],
            AnnotatedKind::Declared(declared) => declared
                .outer
                .as_deref_mut()
                .into_iter()
                .chain(declared.args.iter_mut())
                .collect(),
            AnnotatedKind::Executable(exec) => {
                let exec = exec.as_mut();
                exec.receiver
                    .iter_mut()
                    .chain(exec.params.iter_mut())
                    .chain(std::iter::once(&mut exec.return_type))
                    .chain(exec.thrown.iter_mut())
                    .collect()
            }
            AnnotatedKind::Intersection(parts) | AnnotatedKind::Union(parts) => {
                parts.iter_mut().collect()
            }
            AnnotatedKind::TypeVariable(var) => var
                .upper
                .as_deref_mut()
                .into_iter()
                .chain(var.lower.as_deref_mut())
                .collect(),
            AnnotatedKind::Wildcard(wildcard) => vec![
                wildcard.extends_bound.as_mut(),
                wildcard.super_bound.as_mut(),
            ],
            AnnotatedKind::Primitive(_)
            | AnnotatedKind::NoType(_)
            | AnnotatedKind::Null
            | AnnotatedKind::TypeDeclaration(_)
            | AnnotatedKind::ParameterDeclaration(_) => vec![],
        }
    }

    /// Visit every node, parents before children.
    pub fn walk(&self, f: &mut impl FnMut(&AnnotatedType<Q>)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// `true` when no position that needs a qualifier is missing one.
    pub fn is_fully_qualified(&self) -> bool {
        let mut complete = true;
        self.walk(&mut |node| {
            if node.needs_qualifier() && node.qualifier.is_none() {
                complete = false;
            }
        });
        complete
    }

    fn map_children(&self, f: &mut dyn FnMut(&AnnotatedType<Q>) -> AnnotatedType<Q>) -> AnnotatedKind<Q> {
        match &self.kind {
            AnnotatedKind::Array(component) => AnnotatedKind::Array(Box::new(f(component))),
            AnnotatedKind::Declared(declared) => AnnotatedKind::Declared(AnnotatedDeclared {
                def: declared.def,
                args: declared.args.iter().map(&mut *f).collect(),
                outer: declared.outer.as_deref().map(|outer| Box::new(f(outer))),
            }),
            AnnotatedKind::Executable(exec) => {
                AnnotatedKind::Executable(Box::new(AnnotatedExecutable {
                    type_params: exec.type_params.clone(),
                    receiver: exec.receiver.as_ref().map(&mut *f),
                    params: exec.params.iter().map(&mut *f).collect(),
                    return_type: f(&exec.return_type),
                    thrown: exec.thrown.iter().map(&mut *f).collect(),
                }))
            }
            AnnotatedKind::Intersection(bounds) => {
                AnnotatedKind::Intersection(bounds.iter().map(&mut *f).collect())
            }
            AnnotatedKind::Union(alternatives) => {
                AnnotatedKind::Union(alternatives.iter().map(&mut *f).collect())
            }
            AnnotatedKind::TypeVariable(var) => {
                AnnotatedKind::TypeVariable(AnnotatedTypeVariable {
                    id: var.id,
                    upper: var.upper.as_deref().map(|upper| Box::new(f(upper))),
                    lower: var.lower.as_deref().map(|lower| Box::new(f(lower))),
                })
            }
            AnnotatedKind::Wildcard(wildcard) => AnnotatedKind::Wildcard(AnnotatedWildcard {
                form: wildcard.form,
                extends_bound: Box::new(f(&wildcard.extends_bound)),
                super_bound: Box::new(f(&wildcard.super_bound)),
            }),
            AnnotatedKind::Primitive(_)
            | AnnotatedKind::NoType(_)
            | AnnotatedKind::Null
            | AnnotatedKind::TypeDeclaration(_)
            | AnnotatedKind::ParameterDeclaration(_) => self.kind.clone(),
        }
    }

    /// Rebuild the tree, asking `f` for the new qualifier of every position that carries one.
    ///
    /// `f` sees each node as it was before the rewrite.
    pub fn map_qualifiers<F>(&self, f: &mut F) -> AnnotatedType<Q>
    where
        F: FnMut(&AnnotatedType<Q>) -> Option<Q>,
    {
        let qualifier = if self.carries_qualifier() {
            f(self)
        } else {
            None
        };
        AnnotatedType {
            qualifier,
            kind: self.map_children(&mut |child| child.map_qualifiers(f)),
        }
    }

    /// Replace type variable uses by the mapped types.
    ///
    /// An explicit qualifier on the variable use overrides the primary qualifier of its
    /// replacement (`@Q T` with `T := String` becomes `@Q String`).
    pub fn substitute(
        &self,
        mapping: &HashMap<TypeVarId, AnnotatedType<Q>>,
    ) -> AnnotatedType<Q> {
        if mapping.is_empty() {
            return self.clone();
        }
        if let AnnotatedKind::TypeVariable(var) = &self.kind {
            if let Some(replacement) = mapping.get(&var.id) {
                return match &self.qualifier {
                    Some(q) => replacement.clone().with_qualifier(q.clone()),
                    None => replacement.clone(),
                };
            }
        }
        AnnotatedType {
            qualifier: self.qualifier.clone(),
            kind: self.map_children(&mut |child| child.substitute(mapping)),
        }
    }

    /// Type erasure, keeping the qualifiers of the positions that survive.
    ///
    /// A type variable erases to its (erased) upper bound; its explicit qualifier, if any, wins
    /// over the bound's.
    pub fn erased(&self, env: &dyn TypeEnv) -> AnnotatedType<Q> {
        let keep_own = |erased: AnnotatedType<Q>| match &self.qualifier {
            Some(q) => erased.with_qualifier(q.clone()),
            None => erased,
        };
        match &self.kind {
            AnnotatedKind::Declared(declared) => AnnotatedType {
                qualifier: self.qualifier.clone(),
                kind: AnnotatedKind::Declared(AnnotatedDeclared {
                    def: declared.def,
                    args: vec![],
                    outer: declared
                        .outer
                        .as_deref()
                        .map(|outer| Box::new(outer.erased(env))),
                }),
            },
            AnnotatedKind::Array(component) => AnnotatedType {
                qualifier: self.qualifier.clone(),
                kind: AnnotatedKind::Array(Box::new(component.erased(env))),
            },
            AnnotatedKind::TypeVariable(var) => match var.upper.as_deref() {
                Some(upper) => keep_own(upper.erased(env)),
                None => match erasure(env, &Type::TypeVar(var.id)) {
                    Type::Class(class) => keep_own(Self::raw_class(&class)),
                    _ => self.clone(),
                },
            },
            AnnotatedKind::Wildcard(wildcard) => keep_own(wildcard.extends_bound.erased(env)),
            AnnotatedKind::Intersection(bounds) | AnnotatedKind::Union(bounds) => {
                match bounds.first() {
                    Some(first) => keep_own(first.erased(env)),
                    None => self.clone(),
                }
            }
            AnnotatedKind::Executable(exec) => AnnotatedType::executable(AnnotatedExecutable {
                type_params: vec![],
                receiver: exec.receiver.as_ref().map(|r| r.erased(env)),
                params: exec.params.iter().map(|p| p.erased(env)).collect(),
                return_type: exec.return_type.erased(env),
                thrown: exec.thrown.iter().map(|t| t.erased(env)).collect(),
            }),
            AnnotatedKind::Primitive(_)
            | AnnotatedKind::NoType(_)
            | AnnotatedKind::Null
            | AnnotatedKind::TypeDeclaration(_)
            | AnnotatedKind::ParameterDeclaration(_) => self.clone(),
        }
    }

    fn raw_class(class: &ClassType) -> AnnotatedType<Q> {
        AnnotatedType::unqualified(AnnotatedKind::Declared(AnnotatedDeclared {
            def: class.def,
            args: vec![],
            outer: class
                .outer
                .as_deref()
                .map(|outer| Box::new(Self::raw_class(outer))),
        }))
    }

    /// The qualifier of the most general value of this type: the primary qualifier, or else the
    /// effective qualifier of the upper (extends) bound.
    ///
    /// `None` when the answer lies behind a cut back-reference or the position is unannotated.
    pub fn effective_upper_qualifier(&self, hierarchy: &dyn QualifierHierarchy<Q>) -> Option<Q> {
        if let Some(q) = &self.qualifier {
            return Some(q.clone());
        }
        match &self.kind {
            AnnotatedKind::TypeVariable(var) => {
                var.upper.as_deref()?.effective_upper_qualifier(hierarchy)
            }
            AnnotatedKind::Wildcard(wildcard) => {
                wildcard.extends_bound.effective_upper_qualifier(hierarchy)
            }
            // Conflicting bounds: the value satisfies all of them, so take the lowest.
            AnnotatedKind::Intersection(bounds) => {
                let quals: Vec<Q> = bounds
                    .iter()
                    .filter_map(|b| b.effective_upper_qualifier(hierarchy))
                    .collect();
                hierarchy.greatest_lower_bound_all(&quals)
            }
            AnnotatedKind::Union(alternatives) => {
                let quals: Vec<Q> = alternatives
                    .iter()
                    .filter_map(|a| a.effective_upper_qualifier(hierarchy))
                    .collect();
                hierarchy.least_upper_bound_all(&quals)
            }
            _ => None,
        }
    }

    /// The qualifier of the most specific value of this type: the primary qualifier, or else the
    /// effective qualifier of the lower (super) bound.
    pub fn effective_lower_qualifier(&self, hierarchy: &dyn QualifierHierarchy<Q>) -> Option<Q> {
        if let Some(q) = &self.qualifier {
            return Some(q.clone());
        }
        match &self.kind {
            AnnotatedKind::TypeVariable(var) => {
                var.lower.as_deref()?.effective_lower_qualifier(hierarchy)
            }
            AnnotatedKind::Wildcard(wildcard) => {
                wildcard.super_bound.effective_lower_qualifier(hierarchy)
            }
            AnnotatedKind::Intersection(_) | AnnotatedKind::Union(_) => {
                self.effective_upper_qualifier(hierarchy)
            }
            _ => None,
        }
    }

    /// The upper bound of a type variable or the extends bound of a wildcard, carrying this
    /// use's explicit qualifier. `None` for other kinds and for cut bounds.
    pub fn effective_upper_bound(&self) -> Option<AnnotatedType<Q>> {
        let bound = match &self.kind {
            AnnotatedKind::TypeVariable(var) => var.upper.as_deref()?,
            AnnotatedKind::Wildcard(wildcard) => &wildcard.extends_bound,
            _ => return None,
        };
        Some(match &self.qualifier {
            Some(q) => bound.clone().with_qualifier(q.clone()),
            None => bound.clone(),
        })
    }

    /// Counterpart of [`AnnotatedType::effective_upper_bound`] for lower (super) bounds.
    pub fn effective_lower_bound(&self) -> Option<AnnotatedType<Q>> {
        let bound = match &self.kind {
            AnnotatedKind::TypeVariable(var) => var.lower.as_deref()?,
            AnnotatedKind::Wildcard(wildcard) => &wildcard.super_bound,
            _ => return None,
        };
        Some(match &self.qualifier {
            Some(q) => bound.clone().with_qualifier(q.clone()),
            None => bound.clone(),
        })
    }

    pub fn display<'a>(&'a self, env: &'a dyn TypeEnv) -> AnnotatedTypeDisplay<'a, Q> {
        AnnotatedTypeDisplay { env, ty: self }
    }
}

fn array_depth<Q: Qualifier>(ty: &AnnotatedType<Q>) -> usize {
    let mut depth = 0;
    let mut current = ty;
    while let Some(component) = current.as_array_component() {
        depth += 1;
        current = component;
    }
    depth
}

/// Parameter types a call with `args` must match, expanding a trailing varargs array.
///
/// A call that passes an array of the varargs parameter's depth in the last position uses the
/// declared parameters unchanged.
pub fn expand_var_args<Q: Qualifier>(
    params: &[AnnotatedType<Q>],
    is_varargs: bool,
    args: &[AnnotatedType<Q>],
) -> Vec<AnnotatedType<Q>> {
    if !is_varargs {
        return params.to_vec();
    }
    let Some((varargs, fixed)) = params.split_last() else {
        return params.to_vec();
    };
    let Some(component) = varargs.as_array_component() else {
        return params.to_vec();
    };

    if params.len() == args.len() {
        if let Some(last) = args.last() {
            if last.as_array_component().is_some() && array_depth(last) == array_depth(varargs) {
                return params.to_vec();
            }
        }
    }

    let mut expanded = fixed.to_vec();
    for _ in 0..args.len().saturating_sub(fixed.len()) {
        expanded.push(component.clone());
    }
    expanded
}

/// Java-like rendering with inline qualifiers: `@Q List<@Q String>`, `@A String @B []`.
pub struct AnnotatedTypeDisplay<'a, Q> {
    env: &'a dyn TypeEnv,
    ty: &'a AnnotatedType<Q>,
}

impl<Q: Qualifier> fmt::Display for AnnotatedTypeDisplay<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_annotated(self.env, self.ty, f)
    }
}

fn write_qualifier<Q: Qualifier>(ty: &AnnotatedType<Q>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &ty.qualifier {
        Some(q) => write!(f, "@{q:?} "),
        None => Ok(()),
    }
}

fn write_joined<Q: Qualifier>(
    env: &dyn TypeEnv,
    items: &[AnnotatedType<Q>],
    sep: &str,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write_annotated(env, item, f)?;
    }
    Ok(())
}

fn write_type_var(env: &dyn TypeEnv, id: TypeVarId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match env.type_param(id) {
        Some(tp) => f.write_str(&tp.name),
        None => write!(f, "<tv#{}>", id.to_raw()),
    }
}

fn write_class_name(env: &dyn TypeEnv, def: ClassId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match env.class(def) {
        Some(class) => f.write_str(class.simple_name()),
        None => write!(f, "<class#{}>", def.to_raw()),
    }
}

fn write_annotated<Q: Qualifier>(
    env: &dyn TypeEnv,
    ty: &AnnotatedType<Q>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match &ty.kind {
        AnnotatedKind::Array(component) => {
            write_annotated(env, component, f)?;
            if ty.qualifier.is_some() {
                f.write_str(" ")?;
                write_qualifier(ty, f)?;
            }
            f.write_str("[]")
        }
        AnnotatedKind::Declared(declared) => {
            if let Some(outer) = &declared.outer {
                write_annotated(env, outer, f)?;
                f.write_str(".")?;
            }
            write_qualifier(ty, f)?;
            write_class_name(env, declared.def, f)?;
            if !declared.args.is_empty() {
                f.write_str("<")?;
                write_joined(env, &declared.args, ", ", f)?;
                f.write_str(">")?;
            }
            Ok(())
        }
        AnnotatedKind::Primitive(prim) => {
            write_qualifier(ty, f)?;
            f.write_str(prim.keyword())
        }
        AnnotatedKind::TypeVariable(var) => {
            write_qualifier(ty, f)?;
            write_type_var(env, var.id, f)
        }
        AnnotatedKind::Wildcard(wildcard) => {
            write_qualifier(ty, f)?;
            f.write_str("?")?;
            match wildcard.form {
                WildcardForm::Unbounded => Ok(()),
                WildcardForm::Extends => {
                    f.write_str(" extends ")?;
                    write_annotated(env, &wildcard.extends_bound, f)
                }
                WildcardForm::Super => {
                    f.write_str(" super ")?;
                    write_annotated(env, &wildcard.super_bound, f)
                }
            }
        }
        AnnotatedKind::Intersection(bounds) => {
            write_qualifier(ty, f)?;
            write_joined(env, bounds, " & ", f)
        }
        AnnotatedKind::Union(alternatives) => write_joined(env, alternatives, " | ", f),
        AnnotatedKind::Executable(exec) => {
            if !exec.type_params.is_empty() {
                f.write_str("<")?;
                for (idx, id) in exec.type_params.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_type_var(env, *id, f)?;
                }
                f.write_str("> ")?;
            }
            f.write_str("(")?;
            write_joined(env, &exec.params, ", ", f)?;
            f.write_str(") -> ")?;
            write_annotated(env, &exec.return_type, f)?;
            if !exec.thrown.is_empty() {
                f.write_str(" throws ")?;
                write_joined(env, &exec.thrown, ", ", f)?;
            }
            Ok(())
        }
        AnnotatedKind::NoType(kind) => {
            write_qualifier(ty, f)?;
            match kind {
                NoTypeKind::Void => f.write_str("void"),
                NoTypeKind::None => f.write_str("none"),
                NoTypeKind::Package(name) => f.write_str(name),
            }
        }
        AnnotatedKind::Null => {
            write_qualifier(ty, f)?;
            f.write_str("null")
        }
        AnnotatedKind::TypeDeclaration(decl) => {
            write_qualifier(ty, f)?;
            write_class_name(env, decl.def, f)?;
            if !decl.type_params.is_empty() {
                f.write_str("<")?;
                for (idx, id) in decl.type_params.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_type_var(env, *id, f)?;
                }
                f.write_str(">")?;
            }
            Ok(())
        }
        AnnotatedKind::ParameterDeclaration(id) => write_type_var(env, *id, f),
    }
}
