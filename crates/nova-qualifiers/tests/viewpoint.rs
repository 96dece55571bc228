mod support;

use nova_qualifiers::{as_super, direct_supertypes, AnnotatedType, CheckerHooks};
use nova_types::{ClassDef, ClassKind, FieldDef, MemberRef, PrimitiveType, Type};
use pretty_assertions::assert_eq;
use support::{capture_logs, Fixture, Qual};

#[test]
fn as_super_to_the_same_shape_is_identity() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let samples = [
        fx.generic("java.util.List", vec![fx.integer(Qual::Bottom)], Qual::Top),
        AnnotatedType::array(fx.string(Qual::Bottom)).with_qualifier(Qual::Top),
        AnnotatedType::primitive(PrimitiveType::Long).with_qualifier(Qual::Bottom),
        fx.decorate(&Type::TypeVar(fx.t)),
    ];
    for ty in &samples {
        assert_eq!(as_super(&ctx, ty, ty).as_ref(), Some(ty));
    }
}

#[test]
fn as_super_keeps_type_argument_qualifiers() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let list = fx.generic("java.util.List", vec![fx.integer(Qual::Bottom)], Qual::Top);
    let collection = ctx
        .annotator()
        .annotate_class_use(fx.class("java.util.Collection"));

    let found = ctx.as_super(&list, &collection).unwrap();
    assert_eq!(
        found.display(&fx.env).to_string(),
        "@Top Collection<@Bottom Integer>"
    );
}

#[test]
fn as_super_carries_the_primary_qualifier_up_the_chain() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let numbers = fx.generic("java.util.ArrayList", vec![fx.integer(Qual::Top)], Qual::Bottom);
    let iterable = ctx
        .annotator()
        .annotate_class_use(fx.class("java.lang.Iterable"));

    let found = ctx.as_super(&numbers, &iterable).unwrap();
    assert_eq!(
        found.display(&fx.env).to_string(),
        "@Bottom Iterable<@Top Integer>"
    );
}

#[test]
fn primitives_box_and_boxes_unbox() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let int = AnnotatedType::primitive(PrimitiveType::Int);

    let boxed = ctx
        .as_super(&int.clone().with_qualifier(Qual::Bottom), &fx.integer(Qual::Top))
        .unwrap();
    assert_eq!(boxed, fx.integer(Qual::Bottom));

    let unboxed = ctx
        .as_super(&fx.integer(Qual::Bottom), &int.clone().with_qualifier(Qual::Top))
        .unwrap();
    assert_eq!(unboxed, int.clone().with_qualifier(Qual::Bottom));

    assert_eq!(ctx.as_super(&fx.string(Qual::Top), &int.with_qualifier(Qual::Top)), None);
}

#[test]
fn unrelated_types_are_not_supertypes() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let list = ctx.annotator().annotate_class_use(fx.class("java.util.List"));
    assert_eq!(ctx.as_super(&fx.string(Qual::Top), &list), None);
}

#[test]
fn arrays_view_as_object() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let strings = AnnotatedType::array(fx.string(Qual::Top)).with_qualifier(Qual::Bottom);

    let found = ctx.as_super(&strings, &fx.object(Qual::Top)).unwrap();
    assert_eq!(found, fx.object(Qual::Bottom));

    let supers = direct_supertypes(&ctx, &strings);
    let rendered: Vec<String> = supers
        .iter()
        .map(|sup| sup.display(&fx.env).to_string())
        .collect();
    assert_eq!(
        rendered,
        vec![
            "@Bottom Object".to_string(),
            "@Bottom Cloneable".to_string(),
            "@Bottom Serializable".to_string(),
        ]
    );
}

#[test]
fn field_types_are_substituted_with_receiver_arguments() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let value = MemberRef::Field {
        owner: fx.boxed,
        index: 0,
    };

    for q in [Qual::Top, Qual::Bottom] {
        let receiver = fx.box_of(fx.string(q), Qual::Top);
        assert_eq!(ctx.as_member_of(&receiver, &value), Some(fx.string(q)));
    }
}

#[test]
fn raw_receivers_erase_member_types() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let raw = AnnotatedType::declared(fx.boxed, vec![]).with_qualifier(Qual::Top);
    let value = MemberRef::Field {
        owner: fx.boxed,
        index: 0,
    };

    let ty = ctx.as_member_of(&raw, &value).unwrap();
    assert_eq!(ty.display(&fx.env).to_string(), "@Top Object");
}

#[test]
fn inherited_methods_see_the_receiver_arguments() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let receiver = fx.generic("java.util.ArrayList", vec![fx.string(Qual::Bottom)], Qual::Top);
    let get = MemberRef::Method {
        owner: fx.class("java.util.List"),
        index: 0,
    };

    let ty = ctx.as_member_of(&receiver, &get).unwrap();
    let exec = ty.as_executable().unwrap();
    assert_eq!(exec.return_type(), &fx.string(Qual::Bottom));
    assert_eq!(
        exec.params(),
        &[AnnotatedType::primitive(PrimitiveType::Int).with_qualifier(Qual::Top)]
    );
    assert_eq!(
        exec.receiver().map(|r| r.display(&fx.env).to_string()),
        Some("@Top List<@Bottom String>".to_string())
    );
}

#[test]
fn static_and_non_value_members_are_returned_as_declared() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let receiver = fx.string(Qual::Bottom);
    let format = MemberRef::Method {
        owner: fx.class("java.lang.String"),
        index: 1,
    };
    assert_eq!(
        ctx.as_member_of(&receiver, &format),
        ctx.annotator().annotate_member(&format)
    );

    let package = MemberRef::Package("java.util".to_string());
    let ty = ctx.as_member_of(&receiver, &package).unwrap();
    assert_eq!(ty.underlying(), Type::Package("java.util".to_string()));
}

#[test]
fn type_variable_receivers_use_their_bound() {
    let mut fx = Fixture::new();
    let string = Type::class(fx.class("java.lang.String"), vec![]);
    let s = fx
        .env
        .add_type_param("S", vec![Type::class(fx.boxed, vec![string])]);
    let ctx = fx.ctx();
    let receiver = ctx.decorate(&Type::TypeVar(s));
    let value = MemberRef::Field {
        owner: fx.boxed,
        index: 0,
    };

    assert_eq!(ctx.as_member_of(&receiver, &value), Some(fx.string(Qual::Top)));
}

#[test]
fn members_of_generic_outer_classes_use_the_enclosing_arguments() {
    let mut fx = Fixture::new();
    let object = Type::class(fx.class("java.lang.Object"), vec![]);
    let u = fx.env.add_type_param("U", vec![object.clone()]);
    let outer = fx.env.add_class(ClassDef {
        name: "com.example.Outer".to_string(),
        kind: ClassKind::Class,
        type_params: vec![u],
        super_class: Some(object.clone()),
        interfaces: vec![],
        fields: vec![],
        constructors: vec![],
        methods: vec![],
        outer: None,
    });
    let inner = fx.env.add_class(ClassDef {
        name: "com.example.Outer$Inner".to_string(),
        kind: ClassKind::Class,
        type_params: vec![],
        super_class: Some(object),
        interfaces: vec![],
        fields: vec![FieldDef {
            name: "item".to_string(),
            ty: Type::TypeVar(u),
            is_static: false,
            is_final: false,
        }],
        constructors: vec![],
        methods: vec![],
        outer: Some(outer),
    });

    let ctx = fx.ctx();
    let receiver = AnnotatedType::inner(
        AnnotatedType::declared(outer, vec![fx.string(Qual::Bottom)]).with_qualifier(Qual::Top),
        inner,
        vec![],
    )
    .with_qualifier(Qual::Top);
    let item = MemberRef::Field {
        owner: inner,
        index: 0,
    };

    assert_eq!(ctx.as_member_of(&receiver, &item), Some(fx.string(Qual::Bottom)));
}

struct BottomFields;

impl CheckerHooks<Qual> for BottomFields {
    fn post_as_member_of(
        &self,
        ty: AnnotatedType<Qual>,
        _receiver: &AnnotatedType<Qual>,
        member: &MemberRef,
    ) -> AnnotatedType<Qual> {
        match member {
            MemberRef::Field { .. } => ty.with_qualifier(Qual::Bottom),
            _ => ty,
        }
    }
}

#[test]
fn checker_hooks_adjust_adapted_members() {
    let fx = Fixture::new();
    let ctx = fx.ctx().with_hooks(&BottomFields);
    let receiver = fx.box_of(fx.string(Qual::Top), Qual::Top);
    let value = MemberRef::Field {
        owner: fx.boxed,
        index: 0,
    };

    assert_eq!(ctx.as_member_of(&receiver, &value), Some(fx.string(Qual::Bottom)));
}

#[test]
fn members_of_unrelated_classes_are_left_unsubstituted() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let value = MemberRef::Field {
        owner: fx.boxed,
        index: 0,
    };

    let (ty, logs) = capture_logs(tracing::Level::WARN, || {
        ctx.as_member_of(&fx.string(Qual::Top), &value)
    });
    assert_eq!(ty, ctx.annotator().annotate_member(&value));
    assert!(
        logs.contains("no enclosing type of the receiver has the member's class as supertype"),
        "logs: {logs}"
    );
}
