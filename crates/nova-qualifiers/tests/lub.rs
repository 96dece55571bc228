mod support;

use nova_qualifiers::{lub_pair, AnnotatedType, WildcardForm};
use nova_types::{ClassDef, ClassKind, Type, WildcardBound};
use pretty_assertions::assert_eq;
use support::{Fixture, Qual};

fn class_type(fx: &Fixture, name: &str, args: Vec<Type>) -> Type {
    Type::class(fx.class(name), args)
}

#[test]
fn primary_qualifiers_are_joined() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let shape = class_type(&fx, "java.lang.Integer", vec![]);

    assert_eq!(
        ctx.lub(&shape, &[fx.integer(Qual::Bottom), fx.integer(Qual::Top)]),
        fx.integer(Qual::Top)
    );
    assert_eq!(
        ctx.lub(&shape, &[fx.integer(Qual::Bottom), fx.integer(Qual::Bottom)]),
        fx.integer(Qual::Bottom)
    );
    assert_eq!(
        lub_pair(&ctx, &fx.integer(Qual::Top), &fx.integer(Qual::Bottom), &shape),
        fx.integer(Qual::Top)
    );
}

#[test]
fn inputs_are_viewed_as_the_shape_first() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let string = class_type(&fx, "java.lang.String", vec![]);
    let shape = class_type(&fx, "java.util.List", vec![string]);
    let list = fx.generic("java.util.List", vec![fx.string(Qual::Bottom)], Qual::Top);
    let array_list = fx.generic("java.util.ArrayList", vec![fx.string(Qual::Bottom)], Qual::Bottom);

    let expected = fx.generic("java.util.List", vec![fx.string(Qual::Bottom)], Qual::Top);
    assert_eq!(ctx.lub(&shape, &[list.clone(), array_list.clone()]), expected);
    // Order and repetition of the inputs do not matter.
    assert_eq!(ctx.lub(&shape, &[array_list, list.clone()]), expected);
    assert_eq!(ctx.lub(&shape, &[list.clone(), list.clone()]), list);
}

#[test]
fn wildcard_positions_join_extends_and_meet_super_bounds() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let shape = class_type(
        &fx,
        "java.util.List",
        vec![Type::Wildcard(WildcardBound::Unbounded)],
    );
    let strings = fx.generic("java.util.List", vec![fx.string(Qual::Bottom)], Qual::Top);
    let numbers = fx.generic("java.util.List", vec![fx.integer(Qual::Top)], Qual::Top);

    let out = ctx.lub(&shape, &[strings, numbers]);
    assert!(out.is_fully_qualified());
    let arg = &out.as_declared().unwrap().type_args()[0];
    let wildcard = arg.as_wildcard().unwrap();
    assert_eq!(wildcard.extends_bound().qualifier(), Some(&Qual::Top));
    assert_eq!(wildcard.super_bound().qualifier(), Some(&Qual::Bottom));
}

#[test]
fn type_variable_inputs_use_their_upper_bound() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let shape = class_type(&fx, "java.lang.Object", vec![]);
    let bottom_t = fx
        .decorate(&Type::TypeVar(fx.t))
        .with_qualifier(Qual::Bottom);

    assert_eq!(ctx.lub(&shape, &[bottom_t.clone()]), fx.object(Qual::Bottom));
    assert_eq!(
        ctx.lub(&shape, &[bottom_t, fx.string(Qual::Top)]),
        fx.object(Qual::Top)
    );
}

#[test]
fn self_referential_shapes_terminate() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let (_, e) = fx.enum_e();
    let shape = Type::TypeVar(e);

    let out = ctx.lub(&shape, &[fx.decorate(&shape)]);
    assert_eq!(out.underlying(), shape);
    assert!(out.is_fully_qualified());
    let upper = out.as_type_variable().and_then(|var| var.upper_bound());
    assert_eq!(upper.and_then(AnnotatedType::qualifier), Some(&Qual::Top));
}

#[test]
fn declared_self_referential_shapes_are_fully_qualified() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let (enum_, e) = fx.enum_e();
    let shape = Type::class(enum_, vec![Type::TypeVar(e)]);

    let out = ctx.lub(&shape, &[fx.decorate(&shape), fx.decorate(&shape)]);
    assert_eq!(out.underlying(), shape);
    assert!(out.is_fully_qualified());
    assert_eq!(out.qualifier(), Some(&Qual::Top));
}

#[test]
fn qualified_type_variables_are_their_own_lub() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let shape = Type::TypeVar(fx.t);
    let bottom_t = fx.decorate(&shape).with_qualifier(Qual::Bottom);
    let top_t = fx.decorate(&shape).with_qualifier(Qual::Top);

    assert_eq!(ctx.lub(&shape, &[bottom_t.clone(), bottom_t.clone()]), bottom_t);
    assert_eq!(ctx.lub(&shape, &[bottom_t.clone(), top_t.clone()]), top_t);

    // An unqualified use keeps the result unqualified; only the bounds are joined.
    let out = ctx.lub(&shape, &[bottom_t, fx.decorate(&shape)]);
    assert_eq!(out.qualifier(), None);
    assert!(out.is_fully_qualified());
}

#[test]
fn each_wildcard_position_is_joined_on_its_own() {
    let mut fx = Fixture::new();
    let object = Type::class(fx.class("java.lang.Object"), vec![]);
    let a = fx.env.add_type_param("A", vec![object.clone()]);
    let b = fx.env.add_type_param("B", vec![object.clone()]);
    let pair = fx.env.add_class(ClassDef {
        name: "com.example.Pair".to_string(),
        kind: ClassKind::Class,
        type_params: vec![a, b],
        super_class: Some(object),
        interfaces: vec![],
        fields: vec![],
        constructors: vec![],
        methods: vec![],
        outer: None,
    });

    let ctx = fx.ctx();
    let extends = |q| {
        AnnotatedType::wildcard(
            WildcardForm::Extends,
            fx.integer(q),
            AnnotatedType::null().with_qualifier(Qual::Bottom),
        )
    };
    let input = AnnotatedType::declared(pair, vec![extends(Qual::Bottom), extends(Qual::Top)])
        .with_qualifier(Qual::Top);
    let unbounded = Type::Wildcard(WildcardBound::Unbounded);
    let shape = Type::class(pair, vec![unbounded.clone(), unbounded]);

    let out = ctx.lub(&shape, &[input.clone(), input]);
    assert!(out.is_fully_qualified());
    let extends_qualifiers: Vec<Option<Qual>> = out
        .as_declared()
        .unwrap()
        .type_args()
        .iter()
        .map(|arg| arg.as_wildcard().unwrap().extends_bound().qualifier().copied())
        .collect();
    assert_eq!(extends_qualifiers, vec![Some(Qual::Bottom), Some(Qual::Top)]);
}

#[test]
fn intersection_shapes_take_the_join_of_their_bounds() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let shape = Type::Intersection(vec![
        class_type(&fx, "java.lang.Object", vec![]),
        class_type(&fx, "java.io.Serializable", vec![]),
    ]);

    let out = ctx.lub(&shape, &[fx.string(Qual::Bottom), fx.integer(Qual::Bottom)]);
    assert_eq!(out.qualifier(), Some(&Qual::Bottom));
    assert!(out.is_fully_qualified());

    let out = ctx.lub(&shape, &[fx.string(Qual::Bottom), fx.integer(Qual::Top)]);
    assert_eq!(out.qualifier(), Some(&Qual::Top));
}

#[test]
fn array_components_are_joined_independently() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let shape = Type::array(class_type(&fx, "java.lang.String", vec![]));
    let a = AnnotatedType::array(fx.string(Qual::Bottom)).with_qualifier(Qual::Top);
    let b = AnnotatedType::array(fx.string(Qual::Top)).with_qualifier(Qual::Bottom);

    assert_eq!(
        lub_pair(&ctx, &a, &b, &shape),
        AnnotatedType::array(fx.string(Qual::Top)).with_qualifier(Qual::Top)
    );
    assert_eq!(lub_pair(&ctx, &a, &a, &shape), a);
}
