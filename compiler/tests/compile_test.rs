#![cfg(test)]

use dynaproto_compiler::{
    builder::Builder,
    compile_schema,
    error::ProtoError,
    parser::parse,
    tokenizer::tokenize,
};
use dynaproto_schema::{Constant, FieldType, Rule, ScalarType};

#[test]
fn test_parse_message() {
    let input = r#"
    package demo;

    message Person {
      required string name = 1;
      optional int32 age = 2;
      repeated string tags = 3;
    }
    "#;

    let tokens = tokenize(input).expect("tokenize failed");
    let file = parse(&tokens).expect("parse failed");

    assert_eq!(file.package.as_deref(), Some("demo"));
    assert_eq!(file.messages.len(), 1);

    let person = &file.messages[0];
    assert_eq!(person.name, "Person");
    assert_eq!(person.fields.len(), 3);

    assert_eq!(person.fields[0].name, "name");
    assert_eq!(person.fields[0].rule, Rule::Required);
    assert_eq!(person.fields[0].type_ref, "string");
    assert_eq!(person.fields[0].id, 1);

    assert_eq!(person.fields[1].name, "age");
    assert_eq!(person.fields[1].rule, Rule::Optional);
    assert_eq!(person.fields[1].type_ref, "int32");
    assert_eq!(person.fields[1].id, 2);

    assert_eq!(person.fields[2].name, "tags");
    assert_eq!(person.fields[2].rule, Rule::Repeated);
    assert_eq!(person.fields[2].type_ref, "string");
    assert_eq!(person.fields[2].id, 3);
}

#[test]
fn test_parse_enum_and_options() {
    let input = r#"
    option java_package = "com.example.demo";

    enum PhoneType {
      MOBILE = 0;
      HOME = 1;
      WORK = 2;
    }

    message Settings {
      optional int32 retries = 1 [default = 3, deprecated = true];
    }
    "#;

    let file = parse(&tokenize(input).unwrap()).expect("parse failed");

    assert_eq!(file.options.len(), 1);
    assert_eq!(file.options[0].0, "java_package");
    assert_eq!(
        file.options[0].1,
        Constant::Str("com.example.demo".to_owned())
    );

    let phone_type = &file.enums[0];
    assert_eq!(phone_type.name, "PhoneType");
    assert_eq!(phone_type.values.len(), 3);
    assert_eq!(phone_type.values[1].name, "HOME");
    assert_eq!(phone_type.values[1].number, 1);

    let retries = &file.messages[0].fields[0];
    assert_eq!(retries.options.len(), 2);
    assert_eq!(retries.default(), Some(&Constant::Int(3)));
    assert_eq!(retries.options[1].1, Constant::Word("true".to_owned()));
}

#[test]
fn test_compile_resolves_nested_and_forward_references() {
    let input = r#"
    package demo;

    message Person {
      required string name = 1;
      repeated Person.PhoneNumber phones = 2;
      optional AddressBook book = 3;

      message PhoneNumber {
        required string number = 1;
        optional PhoneType type = 2;
      }

      enum PhoneType {
        MOBILE = 0;
        HOME = 1;
      }
    }

    message AddressBook {
      repeated Person people = 1;
    }
    "#;

    let schema = compile_schema(input).expect("compile failed");

    let person_id = schema.lookup("demo.Person").expect("Person missing");
    let phone_id = schema
        .lookup("demo.Person.PhoneNumber")
        .expect("PhoneNumber missing");
    let type_id = schema
        .lookup(".demo.Person.PhoneType")
        .expect("PhoneType missing");
    let book_id = schema.lookup("demo.AddressBook").expect("AddressBook missing");

    assert_eq!(schema.full_name(phone_id), "demo.Person.PhoneNumber");

    let person = schema.message(person_id).unwrap();
    let (_, phones) = person.field_by_name("phones").unwrap();
    assert_eq!(phones.ty, FieldType::Message(phone_id));
    let (_, book) = person.field_by_name("book").unwrap();
    assert_eq!(book.ty, FieldType::Message(book_id));

    let phone = schema.message(phone_id).unwrap();
    let (_, type_field) = phone.field_by_name("type").unwrap();
    assert_eq!(type_field.ty, FieldType::Enum(type_id));

    let book_def = schema.message(book_id).unwrap();
    let (_, people) = book_def.field_by_name("people").unwrap();
    assert_eq!(people.ty, FieldType::Message(person_id));
}

#[test]
fn test_nested_type_shadows_outer_type() {
    // Both the root and Outer declare a type named Inner. A relative
    // reference from Outer must bind to the nested one.
    let input = r#"
    message Inner {
      optional int32 a = 1;
    }

    message Outer {
      optional Inner child = 1;
      optional .Inner top = 2;

      message Inner {
        optional string b = 1;
      }
    }
    "#;

    let schema = compile_schema(input).expect("compile failed");

    let top_inner = schema.lookup("Inner").unwrap();
    let nested_inner = schema.lookup("Outer.Inner").unwrap();
    assert_ne!(top_inner, nested_inner);

    let outer = schema.message(schema.lookup("Outer").unwrap()).unwrap();
    let (_, child) = outer.field_by_name("child").unwrap();
    assert_eq!(child.ty, FieldType::Message(nested_inner));
    let (_, top) = outer.field_by_name("top").unwrap();
    assert_eq!(top.ty, FieldType::Message(top_inner));
}

#[test]
fn test_scalar_types_resolve_without_lookup() {
    let input = r#"
    message Mixed {
      optional sint32 delta = 1;
      optional fixed32 stamp = 2;
      optional sfixed64 offset = 3;
      optional double ratio = 4;
      optional bytes blob = 5;
    }
    "#;

    let schema = compile_schema(input).expect("compile failed");
    let mixed = schema.message(schema.lookup("Mixed").unwrap()).unwrap();

    let expect = [
        ("delta", ScalarType::Sint32),
        ("stamp", ScalarType::Fixed32),
        ("offset", ScalarType::Sfixed64),
        ("ratio", ScalarType::Double),
        ("blob", ScalarType::Bytes),
    ];
    for (name, scalar) in expect {
        let (_, field) = mixed.field_by_name(name).unwrap();
        assert_eq!(field.ty, FieldType::Scalar(scalar));
    }
}

#[test]
fn test_duplicate_field_id_is_rejected() {
    let input = r#"
    message M {
      optional int32 a = 5;
      optional int32 b = 5;
    }
    "#;

    match compile_schema(input) {
        Err(ProtoError::Definition { msg, .. }) => {
            assert!(msg.contains("5"), "unexpected message: {}", msg)
        }
        other => panic!("expected a definition error, got {:?}", other),
    }
}

#[test]
fn test_field_id_bounds_are_enforced() {
    let max = (1u32 << 29) - 1;
    let ok = format!("message M {{ optional int32 a = {}; }}", max);
    assert!(compile_schema(&ok).is_ok());

    for bad in [
        "message M { optional int32 a = 0; }".to_owned(),
        "message M { optional int32 a = -1; }".to_owned(),
        format!("message M {{ optional int32 a = {}; }}", max + 1),
        "message M { optional int32 a = 19000; }".to_owned(),
        "message M { optional int32 a = 19999; }".to_owned(),
    ] {
        assert!(
            matches!(compile_schema(&bad), Err(ProtoError::Definition { .. })),
            "expected {} to be rejected",
            bad
        );
    }
    assert!(compile_schema("message M { optional int32 a = 18999; }").is_ok());
    assert!(compile_schema("message M { optional int32 a = 20000; }").is_ok());
}

#[test]
fn test_unresolved_reference_names_field_and_type() {
    let input = r#"
    message M {
      optional Missing thing = 1;
    }
    "#;

    match compile_schema(input) {
        Err(ProtoError::Resolution(msg)) => {
            assert!(msg.contains("\"Missing\""), "unexpected message: {}", msg);
            assert!(msg.contains("\"thing\""), "unexpected message: {}", msg);
        }
        other => panic!("expected a resolution error, got {:?}", other),
    }
}

#[test]
fn test_namespace_is_not_a_field_type() {
    let input = r#"
    package demo.nested;

    message M {
      optional demo.nested thing = 1;
    }
    "#;

    assert!(matches!(
        compile_schema(input),
        Err(ProtoError::Resolution(_))
    ));
}

#[test]
fn test_syntax_errors_carry_position() {
    match compile_schema("message M { optional int32 = 1; }") {
        Err(ProtoError::Syntax { line, column, .. }) => {
            assert_eq!(line, 1);
            assert!(column > 0);
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }

    // "07" lexes as "0" then "7"; the zero id is rejected first.
    assert!(matches!(
        compile_schema("message M { optional int32 a = 07; }"),
        Err(ProtoError::Definition { .. })
    ));

    assert!(matches!(
        compile_schema(r#"message M { optional string s = 1 [default = "oops]; }"#),
        Err(ProtoError::Lexical { .. })
    ));
}

#[test]
fn test_builder_is_incremental_and_resolve_is_idempotent() {
    let first = parse(&tokenize("message A { optional B b = 1; }").unwrap()).unwrap();
    let second = parse(&tokenize("message B { optional int32 x = 1; }").unwrap()).unwrap();

    let mut builder = Builder::new();
    builder.create(&first).unwrap();

    // A.b refers to a type that only the second unit declares.
    assert!(builder.resolve_all().is_err());

    builder.create(&second).unwrap();
    builder.resolve_all().unwrap();
    builder.resolve_all().unwrap();

    let schema = builder.build().unwrap();
    let b_id = schema.lookup("B").unwrap();
    let a = schema.message(schema.lookup("A").unwrap()).unwrap();
    let (_, b_field) = a.field_by_name("b").unwrap();
    assert_eq!(b_field.ty, FieldType::Message(b_id));
}

#[test]
fn test_build_fails_before_resolve() {
    let file = parse(&tokenize("message A { optional A next = 1; }").unwrap()).unwrap();
    let mut builder = Builder::new();
    builder.create(&file).unwrap();
    assert!(matches!(builder.build(), Err(ProtoError::Resolution(_))));
}

#[test]
fn test_duplicate_type_name_is_rejected() {
    let input = r#"
    message M { optional int32 a = 1; }
    enum M { ZERO = 0; }
    "#;

    assert!(matches!(
        compile_schema(input),
        Err(ProtoError::Definition { .. })
    ));
}

#[test]
fn test_shared_package_across_units() {
    let first = parse(&tokenize("package demo; message A { optional int32 x = 1; }").unwrap())
        .unwrap();
    let second = parse(&tokenize("package demo; message B { optional A a = 1; }").unwrap())
        .unwrap();

    let mut builder = Builder::new();
    builder.create(&first).unwrap();
    builder.create(&second).unwrap();
    builder.resolve_all().unwrap();
    let schema = builder.build().unwrap();

    let a_id = schema.lookup("demo.A").unwrap();
    let b = schema.message(schema.lookup("demo.B").unwrap()).unwrap();
    let (_, a_field) = b.field_by_name("a").unwrap();
    assert_eq!(a_field.ty, FieldType::Message(a_id));
}

#[test]
fn test_defaults_survive_compilation() {
    let input = r#"
    message Config {
      optional int32 retries = 1 [default = 3];
      optional string label = 2 [default = "none"];
      optional bool verbose = 3 [default = true];
    }
    "#;

    let schema = compile_schema(input).expect("compile failed");
    let config = schema.message(schema.lookup("Config").unwrap()).unwrap();

    let (_, retries) = config.field_by_name("retries").unwrap();
    assert_eq!(retries.default, Some(Constant::Int(3)));
    let (_, label) = config.field_by_name("label").unwrap();
    assert_eq!(label.default, Some(Constant::Str("none".to_owned())));
    let (_, verbose) = config.field_by_name("verbose").unwrap();
    assert_eq!(verbose.default, Some(Constant::Word("true".to_owned())));
}
