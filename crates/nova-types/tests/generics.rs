use std::collections::HashMap;

use nova_types::{
    direct_supertypes, erasure, is_raw, lower_bound, substitute, upper_bound, ClassDef, ClassKind,
    FieldDef, Type, TypeEnv, TypeParamDef, TypeStore,
};

use pretty_assertions::assert_eq;

#[test]
fn supertypes_are_instantiated_with_use_site_arguments() {
    let env = TypeStore::with_minimal_jdk();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let supers = direct_supertypes(&env, &Type::class(array_list, vec![string.clone()]));
    assert_eq!(supers[0], Type::class(env.well_known().object, vec![]));
    assert_eq!(supers[1], Type::class(list, vec![string]));
}

#[test]
fn raw_types_have_raw_supertypes() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let collection = env.class_id("java.util.Collection").unwrap();

    let raw_list = Type::class(list, vec![]);
    assert!(is_raw(&env, &raw_list));
    assert_eq!(
        direct_supertypes(&env, &raw_list),
        vec![Type::class(collection, vec![])]
    );
}

#[test]
fn self_referential_bounds_erase_without_looping() {
    let env = TypeStore::with_minimal_jdk();
    let enum_ = env.well_known().enum_;
    let e = env.class(enum_).unwrap().type_params[0];

    assert_eq!(
        erasure(&env, &Type::TypeVar(e)),
        Type::class(enum_, vec![])
    );
    assert_eq!(
        upper_bound(&env, e),
        Type::class(enum_, vec![Type::TypeVar(e)])
    );
    assert_eq!(lower_bound(&env, e), Type::Null);
}

#[test]
fn substitution_reaches_nested_positions() {
    let mut env = TypeStore::with_minimal_jdk();
    let object = Type::class(env.well_known().object, vec![]);
    let string = Type::class(env.well_known().string, vec![]);
    let list = env.class_id("java.util.List").unwrap();

    let t = env.add_type_param("T", vec![object]);
    let boxed = env.add_class(ClassDef {
        name: "com.example.Box".to_string(),
        kind: ClassKind::Class,
        type_params: vec![t],
        super_class: None,
        interfaces: vec![],
        fields: vec![FieldDef {
            name: "value".to_string(),
            ty: Type::TypeVar(t),
            is_static: false,
            is_final: false,
        }],
        constructors: vec![],
        methods: vec![],
        outer: None,
    });
    assert!(is_raw(&env, &Type::class(boxed, vec![])));

    let subst = HashMap::from([(t, string.clone())]);
    let declared = Type::array(Type::class(list, vec![Type::TypeVar(t)]));
    assert_eq!(
        substitute(&declared, &subst),
        Type::array(Type::class(list, vec![string]))
    );
}

#[test]
fn capture_variables_expose_their_lower_bound() {
    let mut env = TypeStore::with_minimal_jdk();
    let integer = Type::class(env.well_known().integer, vec![]);
    let object = Type::class(env.well_known().object, vec![]);

    let cap = env.add_type_param("CAP#1", vec![object.clone()]);
    env.define_type_param(
        cap,
        TypeParamDef {
            name: "CAP#1".to_string(),
            upper_bounds: vec![object],
            lower_bound: Some(integer.clone()),
        },
    );
    assert_eq!(lower_bound(&env, cap), integer);
}
