#![allow(dead_code)]

use nova_qualifiers::{
    AnnotatedExecutable, AnnotatedType, AnnotationSource, GraphHierarchy, PathRoot, PolyScope,
    QualContext, QualifierConfig, TypePath, TypePathStep,
};
use nova_types::{
    ClassDef, ClassId, ClassKind, ConstructorDef, FieldDef, MemberRef, MethodDef, Type, TypeEnv,
    TypeStore, TypeVarId,
};
use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Three-point lattice: `Bottom <: Poly <: Top`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Qual {
    Top,
    Poly,
    Bottom,
}

pub fn hierarchy() -> GraphHierarchy<Qual> {
    GraphHierarchy::builder()
        .qualifier(Qual::Top, [])
        .polymorphic(Qual::Poly, PolyScope::Hierarchy, [Qual::Top])
        .qualifier(Qual::Bottom, [Qual::Poly])
        .build()
        .expect("valid lattice")
}

/// Annotations written on `com.example.Box`:
///
/// ```java
/// class Box<T> {
///     T value;
///     @Poly Box(@Poly T value) {}
///     @Poly T identity(@Poly T x);
///     @Poly String make(@Poly Box<T> this);
///     static @Poly String join(@Poly String... parts);
/// }
/// ```
pub struct BoxSignatures {
    pub boxed: ClassId,
}

impl AnnotationSource<Qual> for BoxSignatures {
    fn qualifier(&self, _ty: &Type, path: &TypePath) -> Option<Qual> {
        use TypePathStep::*;

        let PathRoot::Member(member) = path.root() else {
            return None;
        };
        if member.owner() != Some(self.boxed) {
            return None;
        }
        let poly = match (member, path.steps()) {
            (MemberRef::Constructor { index: 0, .. }, [Parameter(0)] | [Return]) => true,
            (MemberRef::Method { index: 0, .. }, [Parameter(0)] | [Return]) => true,
            (MemberRef::Method { index: 1, .. }, [Receiver] | [Return]) => true,
            (MemberRef::Method { index: 2, .. }, [Parameter(0), Component] | [Return]) => true,
            _ => false,
        };
        poly.then_some(Qual::Poly)
    }
}

pub struct Fixture {
    pub env: TypeStore,
    pub hierarchy: GraphHierarchy<Qual>,
    pub source: BoxSignatures,
    pub config: QualifierConfig,
    pub boxed: ClassId,
    pub t: TypeVarId,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let mut env = TypeStore::with_minimal_jdk();
        let object = Type::class(env.well_known().object, vec![]);
        let string = Type::class(env.well_known().string, vec![]);

        let t = env.add_type_param("T", vec![object.clone()]);
        let boxed_id = env.intern_class_id("com.example.Box");
        let method = |name: &str, params: Vec<Type>, return_type: Type| MethodDef {
            name: name.to_string(),
            type_params: vec![],
            params,
            return_type,
            throws: vec![],
            is_static: false,
            is_varargs: false,
            is_abstract: false,
        };
        env.define_class(
            boxed_id,
            ClassDef {
                name: "com.example.Box".to_string(),
                kind: ClassKind::Class,
                type_params: vec![t],
                super_class: Some(object),
                interfaces: vec![],
                fields: vec![FieldDef {
                    name: "value".to_string(),
                    ty: Type::TypeVar(t),
                    is_static: false,
                    is_final: false,
                }],
                constructors: vec![ConstructorDef {
                    type_params: vec![],
                    params: vec![Type::TypeVar(t)],
                    throws: vec![],
                    is_varargs: false,
                }],
                methods: vec![
                    method("identity", vec![Type::TypeVar(t)], Type::TypeVar(t)),
                    method("make", vec![], string.clone()),
                    MethodDef {
                        is_static: true,
                        is_varargs: true,
                        ..method("join", vec![Type::array(string.clone())], string)
                    },
                ],
                outer: None,
            },
        );

        Fixture {
            env,
            hierarchy: hierarchy(),
            source: BoxSignatures { boxed: boxed_id },
            config: QualifierConfig::default(),
            boxed: boxed_id,
            t,
        }
    }

    pub fn ctx(&self) -> QualContext<'_, Qual> {
        QualContext::new(&self.env, &self.hierarchy)
            .with_source(&self.source)
            .with_config(&self.config)
    }

    pub fn class(&self, name: &str) -> ClassId {
        self.env
            .class_id(name)
            .unwrap_or_else(|| panic!("unknown class {name}"))
    }

    /// `java.lang.Enum` and its `E extends Enum<E>` parameter.
    pub fn enum_e(&self) -> (ClassId, TypeVarId) {
        let enum_ = self.env.well_known().enum_;
        let e = self
            .env
            .class(enum_)
            .map(|def| def.type_params[0])
            .expect("Enum is defined");
        (enum_, e)
    }

    /// The default decoration of `ty` (top everywhere).
    pub fn decorate(&self, ty: &Type) -> AnnotatedType<Qual> {
        self.ctx().decorate(ty)
    }

    /// `@q C` for a non-generic class `C`.
    pub fn plain(&self, name: &str, q: Qual) -> AnnotatedType<Qual> {
        AnnotatedType::declared(self.class(name), vec![]).with_qualifier(q)
    }

    pub fn string(&self, q: Qual) -> AnnotatedType<Qual> {
        self.plain("java.lang.String", q)
    }

    pub fn integer(&self, q: Qual) -> AnnotatedType<Qual> {
        self.plain("java.lang.Integer", q)
    }

    pub fn object(&self, q: Qual) -> AnnotatedType<Qual> {
        self.plain("java.lang.Object", q)
    }

    /// `@q C<args>`.
    pub fn generic(
        &self,
        name: &str,
        args: Vec<AnnotatedType<Qual>>,
        q: Qual,
    ) -> AnnotatedType<Qual> {
        AnnotatedType::declared(self.class(name), args).with_qualifier(q)
    }

    pub fn box_of(&self, arg: AnnotatedType<Qual>, q: Qual) -> AnnotatedType<Qual> {
        AnnotatedType::declared(self.boxed, vec![arg]).with_qualifier(q)
    }

    pub fn method(&self, index: usize) -> AnnotatedExecutable<Qual> {
        self.executable(&MemberRef::Method {
            owner: self.boxed,
            index,
        })
    }

    pub fn constructor(&self) -> AnnotatedExecutable<Qual> {
        self.executable(&MemberRef::Constructor {
            owner: self.boxed,
            index: 0,
        })
    }

    fn executable(&self, member: &MemberRef) -> AnnotatedExecutable<Qual> {
        self.ctx()
            .annotator()
            .annotate_member(member)
            .and_then(|ty| ty.as_executable().cloned())
            .expect("executable member")
    }
}

/// Install a test writer when `RUST_LOG` is set, e.g. `RUST_LOG=nova.qualifiers=trace`.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Default)]
pub struct SharedLogBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedLogBuffer {
    pub fn as_string(&self) -> String {
        let bytes = self.0.lock().expect("log buffer mutex poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

pub struct SharedLogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self.0.lock().expect("log buffer mutex poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedLogBuffer {
    type Writer = SharedLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogWriter(self.0.clone())
    }
}

/// Run `f` with a subscriber that records events at `level` and above into the returned buffer.
pub fn capture_logs<T>(level: tracing::Level, f: impl FnOnce() -> T) -> (T, String) {
    let logs = SharedLogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_max_level(level)
        .with_writer(logs.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.as_string())
}
