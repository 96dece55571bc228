use crate::{
    ClassDef, ClassKind, FieldDef, MethodDef, PrimitiveType, Type, TypeParamDef,
    TypeStore, WellKnownTypes,
};

fn class(name: &str, kind: ClassKind) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        kind,
        type_params: vec![],
        super_class: None,
        interfaces: vec![],
        fields: vec![],
        constructors: vec![],
        methods: vec![],
        outer: None,
    }
}

fn method(name: &str, params: Vec<Type>, return_type: Type) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        type_params: vec![],
        params,
        return_type,
        throws: vec![],
        is_static: false,
        is_varargs: false,
        is_abstract: false,
    }
}

fn abstract_method(name: &str, params: Vec<Type>, return_type: Type) -> MethodDef {
    MethodDef {
        is_abstract: true,
        ..method(name, params, return_type)
    }
}

/// Define the classes of [`TypeStore::with_minimal_jdk`].
pub(crate) fn populate(store: &mut TypeStore) {
    // Intern everything first so declarations can refer to each other in any order.
    let object = store.intern_class_id("java.lang.Object");
    let string = store.intern_class_id("java.lang.String");
    let char_sequence = store.intern_class_id("java.lang.CharSequence");
    let number = store.intern_class_id("java.lang.Number");
    let cloneable = store.intern_class_id("java.lang.Cloneable");
    let serializable = store.intern_class_id("java.io.Serializable");
    let comparable = store.intern_class_id("java.lang.Comparable");
    let enum_ = store.intern_class_id("java.lang.Enum");
    let iterable = store.intern_class_id("java.lang.Iterable");
    let collection = store.intern_class_id("java.util.Collection");
    let list = store.intern_class_id("java.util.List");
    let array_list = store.intern_class_id("java.util.ArrayList");

    let object_ty = Type::class(object, vec![]);
    let string_ty = Type::class(string, vec![]);
    let serializable_ty = Type::class(serializable, vec![]);

    let mut object_def = class("java.lang.Object", ClassKind::Class);
    object_def.methods = vec![
        method("toString", vec![], string_ty.clone()),
        method(
            "equals",
            vec![object_ty.clone()],
            Type::Primitive(PrimitiveType::Boolean),
        ),
        method("hashCode", vec![], Type::Primitive(PrimitiveType::Int)),
    ];
    store.define_class(object, object_def);

    store.define_class(cloneable, class("java.lang.Cloneable", ClassKind::Interface));
    store.define_class(serializable, class("java.io.Serializable", ClassKind::Interface));

    let mut char_sequence_def = class("java.lang.CharSequence", ClassKind::Interface);
    char_sequence_def.methods = vec![abstract_method(
        "length",
        vec![],
        Type::Primitive(PrimitiveType::Int),
    )];
    store.define_class(char_sequence, char_sequence_def);

    // interface Comparable<T>
    let comparable_t = store.add_type_param("T", vec![object_ty.clone()]);
    let mut comparable_def = class("java.lang.Comparable", ClassKind::Interface);
    comparable_def.type_params = vec![comparable_t];
    comparable_def.methods = vec![abstract_method(
        "compareTo",
        vec![Type::TypeVar(comparable_t)],
        Type::Primitive(PrimitiveType::Int),
    )];
    store.define_class(comparable, comparable_def);

    let mut string_def = class("java.lang.String", ClassKind::Class);
    string_def.super_class = Some(object_ty.clone());
    string_def.interfaces = vec![
        serializable_ty.clone(),
        Type::class(comparable, vec![string_ty.clone()]),
        Type::class(char_sequence, vec![]),
    ];
    string_def.methods = vec![
        method("length", vec![], Type::Primitive(PrimitiveType::Int)),
        MethodDef {
            is_static: true,
            is_varargs: true,
            ..method(
                "format",
                vec![string_ty.clone(), Type::array(object_ty.clone())],
                string_ty.clone(),
            )
        },
    ];
    store.define_class(string, string_def);

    let mut number_def = class("java.lang.Number", ClassKind::Class);
    number_def.super_class = Some(object_ty.clone());
    number_def.interfaces = vec![serializable_ty.clone()];
    number_def.methods = vec![abstract_method(
        "intValue",
        vec![],
        Type::Primitive(PrimitiveType::Int),
    )];
    store.define_class(number, number_def);

    for prim in PrimitiveType::ALL {
        let name = prim.boxed_binary_name();
        let id = store.intern_class_id(name);
        let numeric = !matches!(prim, PrimitiveType::Boolean | PrimitiveType::Char);
        let self_ty = Type::class(id, vec![]);
        let mut def = class(name, ClassKind::Class);
        def.super_class = Some(if numeric {
            Type::class(number, vec![])
        } else {
            object_ty.clone()
        });
        def.interfaces = if numeric {
            vec![Type::class(comparable, vec![self_ty.clone()])]
        } else {
            vec![
                serializable_ty.clone(),
                Type::class(comparable, vec![self_ty.clone()]),
            ]
        };
        def.fields = vec![FieldDef {
            name: "TYPE".to_string(),
            ty: Type::class(object, vec![]),
            is_static: true,
            is_final: true,
        }];
        def.methods = vec![MethodDef {
            is_static: true,
            ..method("valueOf", vec![Type::Primitive(prim)], self_ty)
        }];
        store.define_class(id, def);
    }
    let integer = store.intern_class_id(PrimitiveType::Int.boxed_binary_name());

    // abstract class Enum<E extends Enum<E>> implements Comparable<E>, Serializable
    let enum_e = store.add_type_param("E", vec![object_ty.clone()]);
    store.define_type_param(
        enum_e,
        TypeParamDef {
            name: "E".to_string(),
            upper_bounds: vec![Type::class(enum_, vec![Type::TypeVar(enum_e)])],
            lower_bound: None,
        },
    );
    let mut enum_def = class("java.lang.Enum", ClassKind::Class);
    enum_def.type_params = vec![enum_e];
    enum_def.super_class = Some(object_ty.clone());
    enum_def.interfaces = vec![
        Type::class(comparable, vec![Type::TypeVar(enum_e)]),
        serializable_ty.clone(),
    ];
    enum_def.methods = vec![
        method("name", vec![], string_ty.clone()),
        method("ordinal", vec![], Type::Primitive(PrimitiveType::Int)),
    ];
    store.define_class(enum_, enum_def);

    // interface Iterable<T>
    let iterable_t = store.add_type_param("T", vec![object_ty.clone()]);
    let mut iterable_def = class("java.lang.Iterable", ClassKind::Interface);
    iterable_def.type_params = vec![iterable_t];
    store.define_class(iterable, iterable_def);

    // interface Collection<E> extends Iterable<E>
    let collection_e = store.add_type_param("E", vec![object_ty.clone()]);
    let mut collection_def = class("java.util.Collection", ClassKind::Interface);
    collection_def.type_params = vec![collection_e];
    collection_def.interfaces = vec![Type::class(iterable, vec![Type::TypeVar(collection_e)])];
    collection_def.methods = vec![
        abstract_method(
            "add",
            vec![Type::TypeVar(collection_e)],
            Type::Primitive(PrimitiveType::Boolean),
        ),
        abstract_method("size", vec![], Type::Primitive(PrimitiveType::Int)),
    ];
    store.define_class(collection, collection_def);

    // interface List<E> extends Collection<E>
    let list_e = store.add_type_param("E", vec![object_ty.clone()]);
    let mut list_def = class("java.util.List", ClassKind::Interface);
    list_def.type_params = vec![list_e];
    list_def.interfaces = vec![Type::class(collection, vec![Type::TypeVar(list_e)])];
    list_def.methods = vec![
        abstract_method(
            "get",
            vec![Type::Primitive(PrimitiveType::Int)],
            Type::TypeVar(list_e),
        ),
        abstract_method(
            "set",
            vec![Type::Primitive(PrimitiveType::Int), Type::TypeVar(list_e)],
            Type::TypeVar(list_e),
        ),
    ];
    store.define_class(list, list_def);

    // class ArrayList<E> implements List<E>, Cloneable, Serializable
    let array_list_e = store.add_type_param("E", vec![object_ty.clone()]);
    let mut array_list_def = class("java.util.ArrayList", ClassKind::Class);
    array_list_def.type_params = vec![array_list_e];
    array_list_def.super_class = Some(object_ty);
    array_list_def.interfaces = vec![
        Type::class(list, vec![Type::TypeVar(array_list_e)]),
        Type::class(cloneable, vec![]),
        serializable_ty,
    ];
    store.define_class(array_list, array_list_def);

    store.set_well_known(WellKnownTypes {
        object,
        string,
        number,
        integer,
        cloneable,
        serializable,
        comparable,
        enum_,
    });
}
