mod support;

use nova_qualifiers::{
    AnnotatedType, QualifierConfig, SubtypingConfig, TypeHierarchy, WildcardForm,
};
use nova_types::{PrimitiveType, Type, WildcardBound};
use support::{Fixture, Qual};

#[test]
fn qualifiers_are_checked_at_the_top_level() {
    let fx = Fixture::new();
    let ctx = fx.ctx();

    assert!(ctx.is_subtype(&fx.string(Qual::Bottom), &fx.object(Qual::Top)));
    assert!(!ctx.is_subtype(&fx.string(Qual::Top), &fx.object(Qual::Bottom)));
    assert!(!ctx.is_subtype(&fx.object(Qual::Bottom), &fx.string(Qual::Bottom)));
}

#[test]
fn primitives_compare_qualifiers_only() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let int = |q: Qual| AnnotatedType::primitive(PrimitiveType::Int).with_qualifier(q);

    assert!(ctx.is_subtype(&int(Qual::Bottom), &int(Qual::Top)));
    assert!(!ctx.is_subtype(&int(Qual::Top), &int(Qual::Bottom)));
}

#[test]
fn null_is_below_references_but_not_primitives() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let null = AnnotatedType::null().with_qualifier(Qual::Bottom);

    assert!(ctx.is_subtype(&null, &fx.string(Qual::Bottom)));
    assert!(!ctx.is_subtype(
        &null,
        &AnnotatedType::primitive(PrimitiveType::Int).with_qualifier(Qual::Top)
    ));
}

#[test]
fn type_arguments_are_invariant_by_default() {
    let fx = Fixture::new();
    let list = "java.util.List";
    let sub = fx.generic(list, vec![fx.string(Qual::Bottom)], Qual::Top);
    let sup = fx.generic(list, vec![fx.string(Qual::Top)], Qual::Top);

    assert!(!fx.ctx().is_subtype(&sub, &sup));
    assert!(fx.ctx().is_subtype(&sup, &sup));

    let covariant = QualifierConfig {
        subtyping: SubtypingConfig {
            covariant_type_args: true,
            ..SubtypingConfig::default()
        },
    };
    assert!(fx.ctx().with_config(&covariant).is_subtype(&sub, &sup));
}

#[test]
fn type_arguments_follow_the_supertype_chain() {
    let fx = Fixture::new();
    let sub = fx.generic("java.util.ArrayList", vec![fx.string(Qual::Bottom)], Qual::Top);
    let same = fx.generic("java.util.Collection", vec![fx.string(Qual::Bottom)], Qual::Top);
    let other = fx.generic("java.util.Collection", vec![fx.string(Qual::Top)], Qual::Top);

    assert!(fx.ctx().is_subtype(&sub, &same));
    assert!(!fx.ctx().is_subtype(&sub, &other));
}

#[test]
fn wildcards_contain_arguments_within_their_bounds() {
    let fx = Fixture::new();
    let list = fx.class("java.util.List");
    let object = Type::class(fx.class("java.lang.Object"), vec![]);
    let sub = fx.generic("java.util.List", vec![fx.string(Qual::Bottom)], Qual::Top);

    // List<? extends @Top Object>, as decorated by default.
    let any = fx.decorate(&Type::class(
        list,
        vec![Type::Wildcard(WildcardBound::Extends(Box::new(object)))],
    ));
    assert!(fx.ctx().is_subtype(&sub, &any));

    // List<? extends @Bottom Object>
    let narrow = fx.generic(
        "java.util.List",
        vec![AnnotatedType::wildcard(
            WildcardForm::Extends,
            fx.object(Qual::Bottom),
            AnnotatedType::null().with_qualifier(Qual::Bottom),
        )],
        Qual::Top,
    );
    assert!(fx.ctx().is_subtype(&sub, &narrow));
    let top_list = fx.generic("java.util.List", vec![fx.string(Qual::Top)], Qual::Top);
    assert!(!fx.ctx().is_subtype(&top_list, &narrow));
}

#[test]
fn array_components_are_covariant_unless_configured() {
    let fx = Fixture::new();
    let sub = AnnotatedType::array(fx.integer(Qual::Bottom)).with_qualifier(Qual::Top);
    let sup = AnnotatedType::array(fx.integer(Qual::Top)).with_qualifier(Qual::Top);

    assert!(fx.ctx().is_subtype(&sub, &sup));

    let invariant = QualifierConfig {
        subtyping: SubtypingConfig {
            invariant_array_components: true,
            ..SubtypingConfig::default()
        },
    };
    assert!(!fx.ctx().with_config(&invariant).is_subtype(&sub, &sup));
    assert!(fx.ctx().with_config(&invariant).is_subtype(&sup, &sup));
}

#[test]
fn raw_types_skip_the_argument_check() {
    let fx = Fixture::new();
    let raw = fx.generic("java.util.List", vec![], Qual::Top);
    let generic = fx.generic("java.util.List", vec![fx.string(Qual::Bottom)], Qual::Top);

    assert!(fx.ctx().is_subtype(&raw, &generic));

    let strict = QualifierConfig {
        subtyping: SubtypingConfig {
            ignore_raw_types: false,
            ..SubtypingConfig::default()
        },
    };
    assert!(!fx.ctx().with_config(&strict).is_subtype(&raw, &generic));
}

#[test]
fn uses_of_one_type_variable_compare_through_bounds() {
    let fx = Fixture::new();
    let t = fx.decorate(&Type::TypeVar(fx.t));
    let bottom_t = t.clone().with_qualifier(Qual::Bottom);

    assert!(fx.ctx().is_subtype(&t, &t));
    // The lower bound of `T` is the null type, which defaults to bottom.
    assert!(fx.ctx().is_subtype(&bottom_t, &t));
    // The upper bound of `T` is `@Top Object`.
    assert!(!fx.ctx().is_subtype(&t, &bottom_t));
    assert!(fx.ctx().is_subtype(&t, &fx.object(Qual::Top)));
    assert!(!fx.ctx().is_subtype(&t, &fx.object(Qual::Bottom)));
}

#[test]
fn unions_and_intersections() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let union = AnnotatedType::union(vec![fx.string(Qual::Bottom), fx.integer(Qual::Top)]);

    assert!(ctx.is_subtype(&union, &fx.object(Qual::Top)));
    assert!(!ctx.is_subtype(&union, &fx.object(Qual::Bottom)));

    let serializable = fx.plain("java.io.Serializable", Qual::Top);
    let object_and_serializable =
        AnnotatedType::intersection(vec![fx.object(Qual::Top), serializable.clone()]);
    assert!(ctx.is_subtype(&fx.string(Qual::Bottom), &object_and_serializable));

    let serializable_and_chars = AnnotatedType::intersection(vec![
        serializable,
        fx.plain("java.lang.CharSequence", Qual::Top),
    ]);
    assert!(ctx.is_subtype(&fx.string(Qual::Top), &serializable_and_chars));
    assert!(!ctx.is_subtype(&fx.integer(Qual::Top), &serializable_and_chars));
}

#[test]
fn self_referential_bounds_terminate() {
    let fx = Fixture::new();
    let (enum_, e) = fx.enum_e();
    let var = fx.decorate(&Type::TypeVar(e));
    let enum_of_e = fx.decorate(&Type::class(enum_, vec![Type::TypeVar(e)]));

    assert!(fx.ctx().is_subtype(&var, &enum_of_e));
    assert!(fx.ctx().is_subtype(&var, &var));
}

#[test]
fn parallel_lists_are_checked_pairwise() {
    let fx = Fixture::new();
    let hierarchy = TypeHierarchy::new(fx.ctx());
    assert!(hierarchy.are_subtypes(
        &[fx.string(Qual::Bottom), fx.integer(Qual::Top)],
        &[fx.object(Qual::Top), fx.integer(Qual::Top)],
    ));
    assert!(!hierarchy.are_subtypes(
        &[fx.string(Qual::Bottom), fx.integer(Qual::Top)],
        &[fx.object(Qual::Top), fx.integer(Qual::Bottom)],
    ));
    assert!(hierarchy.are_equal(&fx.string(Qual::Top), &fx.string(Qual::Top)));
}

#[test]
#[should_panic(expected = "are_subtypes called with")]
fn unbalanced_lists_are_a_contract_violation() {
    let fx = Fixture::new();
    TypeHierarchy::new(fx.ctx()).are_subtypes(&[fx.string(Qual::Top)], &[]);
}
