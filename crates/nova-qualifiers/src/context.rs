use nova_types::{MemberRef, Type, TypeEnv};

use crate::{
    AnnotatedType, AnnotationSource, Annotator, NoAnnotations, Qualifier, QualifierConfig,
    QualifierHierarchy, TypeHierarchy,
};

/// Checker-specific adjustments applied by the generic engines.
pub trait CheckerHooks<Q: Qualifier> {
    /// Adjust the type of a non-static member after it has been viewed through `receiver`.
    fn post_as_member_of(
        &self,
        ty: AnnotatedType<Q>,
        receiver: &AnnotatedType<Q>,
        member: &MemberRef,
    ) -> AnnotatedType<Q> {
        let _ = (receiver, member);
        ty
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl<Q: Qualifier> CheckerHooks<Q> for NoHooks {}

/// Everything one checker instance needs to run the qualifier algebra.
///
/// Contexts are cheap to build and hold only borrows; two checkers never share one.
pub struct QualContext<'a, Q: Qualifier> {
    env: &'a dyn TypeEnv,
    hierarchy: &'a dyn QualifierHierarchy<Q>,
    source: &'a dyn AnnotationSource<Q>,
    hooks: &'a dyn CheckerHooks<Q>,
    config: &'a QualifierConfig,
}

impl<Q: Qualifier> Clone for QualContext<'_, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q: Qualifier> Copy for QualContext<'_, Q> {}

static DEFAULT_CONFIG: QualifierConfig = QualifierConfig {
    subtyping: crate::SubtypingConfig {
        ignore_raw_types: true,
        invariant_array_components: false,
        covariant_type_args: false,
    },
};

impl<'a, Q: Qualifier> QualContext<'a, Q> {
    pub fn new(env: &'a dyn TypeEnv, hierarchy: &'a dyn QualifierHierarchy<Q>) -> Self {
        Self {
            env,
            hierarchy,
            source: &NoAnnotations,
            hooks: &NoHooks,
            config: &DEFAULT_CONFIG,
        }
    }

    pub fn with_source(mut self, source: &'a dyn AnnotationSource<Q>) -> Self {
        self.source = source;
        self
    }

    pub fn with_hooks(mut self, hooks: &'a dyn CheckerHooks<Q>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_config(mut self, config: &'a QualifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn env(&self) -> &'a dyn TypeEnv {
        self.env
    }

    pub fn hierarchy(&self) -> &'a dyn QualifierHierarchy<Q> {
        self.hierarchy
    }

    pub fn hooks(&self) -> &'a dyn CheckerHooks<Q> {
        self.hooks
    }

    pub fn config(&self) -> &'a QualifierConfig {
        self.config
    }

    pub fn annotator(&self) -> Annotator<'a, Q> {
        Annotator::new(self.env, self.hierarchy, self.source)
    }

    /// Decorate a host type written at a use site.
    pub fn decorate(&self, ty: &Type) -> AnnotatedType<Q> {
        self.annotator().annotate(ty)
    }

    pub fn is_subtype(&self, sub: &AnnotatedType<Q>, sup: &AnnotatedType<Q>) -> bool {
        TypeHierarchy::new(*self).is_subtype(sub, sup)
    }

    pub fn as_super(
        &self,
        ty: &AnnotatedType<Q>,
        sup: &AnnotatedType<Q>,
    ) -> Option<AnnotatedType<Q>> {
        crate::as_super(self, ty, sup)
    }

    pub fn as_member_of(
        &self,
        receiver: &AnnotatedType<Q>,
        member: &MemberRef,
    ) -> Option<AnnotatedType<Q>> {
        crate::as_member_of(self, receiver, member)
    }

    pub fn lub(&self, shape: &Type, inputs: &[AnnotatedType<Q>]) -> AnnotatedType<Q> {
        crate::lub(self, shape, inputs)
    }
}
