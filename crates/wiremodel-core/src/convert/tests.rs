use super::*;
use crate::config::ConvertOptions;
use crate::date::ChronoDateAdapter;
use crate::model::{ConversionTable, DataModel, FieldSpec, ModelType, TemplateDefinition};
use crate::value::{OrderedMap, OrderedSet};
use chrono::{FixedOffset, TimeZone};
use serde_json::json;

fn options(direction: Direction, policy: ConvertPolicy) -> ConvertItemOptions {
    let mut options = ConvertItemOptions::new(direction, policy);
    options.model_name = "TestModel".to_string();
    options
}

fn to_model(registry: &ConverterRegistry, type_name: &str, source: Value) -> Result<Value> {
    let request = DispatchRequest::new("field", type_name);
    registry.dispatch(&source, &request, &options(Direction::ToModel, ConvertPolicy::Default))
}

fn to_wire(registry: &ConverterRegistry, type_name: &str, source: Value) -> Result<Value> {
    let request = DispatchRequest::new("field", type_name);
    registry.dispatch(&source, &request, &options(Direction::ToWire, ConvertPolicy::Default))
}

fn with_params<'a>(request: DispatchRequest<'a>, params: &'a Params) -> DispatchRequest<'a> {
    DispatchRequest {
        params: Some(params),
        ..request
    }
}

#[test]
fn test_number_converter() {
    let registry = ConverterRegistry::with_builtins();
    let cases = [
        (Value::from("0"), Value::Number(0.0)),
        (Value::from("-"), Value::Undefined),
        (Value::from("298---343242"), Value::Number(298.0)),
        (Value::from("+456"), Value::Number(456.0)),
        (Value::from("aaa"), Value::Undefined),
        (Value::from(""), Value::Undefined),
        (Value::from("1.000007.001"), Value::Number(1.000007)),
        (Value::from(-123), Value::Number(-123.0)),
        (Value::from(0.0000000000001), Value::Number(0.0000000000001)),
        (Value::Bool(true), Value::Undefined),
    ];
    for (source, expected) in cases {
        assert_eq!(to_model(&registry, "number", source.clone()).unwrap(), expected, "source {:?}", source);
    }
}

#[test]
fn test_string_converter() {
    let registry = ConverterRegistry::with_builtins();
    assert_eq!(to_model(&registry, "string", Value::from(1.5)).unwrap(), Value::from("1.5"));
    assert_eq!(to_model(&registry, "string", Value::from(100)).unwrap(), Value::from("100"));
    assert_eq!(to_model(&registry, "string", Value::Bool(false)).unwrap(), Value::from("false"));
    assert_eq!(to_model(&registry, "string", Value::Null).unwrap(), Value::Null);
    assert_eq!(
        to_model(&registry, "string", Value::from(json!({ "a": 1 }))).unwrap(),
        Value::from(r#"{"a":1}"#)
    );
}

#[test]
fn test_string_converter_formats_dates() {
    let mut registry = ConverterRegistry::with_builtins();
    let offset = FixedOffset::east_opt(8 * 3600).unwrap();
    registry.set_date_adapter(Arc::new(ChronoDateAdapter::with_offset(offset)));
    let date = offset.with_ymd_and_hms(2022, 12, 18, 10, 30, 0).unwrap();

    assert_eq!(
        to_wire(&registry, "string", Value::Date(date)).unwrap(),
        Value::from("2022-12-18 10:30:00")
    );
    let request = DispatchRequest {
        date_format: Some("YYYY/MM/DD"),
        ..DispatchRequest::new("field", "string")
    };
    let value = registry
        .dispatch(&Value::Date(date), &request, &options(Direction::ToWire, ConvertPolicy::Default))
        .unwrap();
    assert_eq!(value, Value::from("2022/12/18"));
}

#[test]
fn test_boolean_converter() {
    let registry = ConverterRegistry::with_builtins();
    let cases = [
        (Value::Bool(true), true),
        (Value::from("1"), true),
        (Value::from("0"), false),
        (Value::from(""), false),
        (Value::from("TRUE"), true),
        (Value::from("false"), false),
        (Value::from("dzfx1112"), false),
        (Value::from(0), false),
        (Value::from(1000), true),
        (Value::from(-1000), false),
    ];
    for (source, expected) in cases {
        assert_eq!(to_model(&registry, "boolean", source.clone()).unwrap(), Value::Bool(expected), "source {:?}", source);
    }
}

#[test]
fn test_strict_boolean_rejects_objects() {
    let registry = ConverterRegistry::with_builtins();
    let request = DispatchRequest {
        required: true,
        ..DispatchRequest::new("flag", "boolean")
    };
    let err = registry
        .dispatch(
            &Value::from(json!({})),
            &request,
            &options(Direction::ToModel, ConvertPolicy::StrictRequired),
        )
        .unwrap_err();
    assert!(matches!(err, Error::AllConvertersFailed { ref messages, .. } if messages == &["Not a boolean".to_string()]));
}

#[test]
fn test_date_converters() {
    let mut registry = ConverterRegistry::with_builtins();
    let offset = FixedOffset::east_opt(8 * 3600).unwrap();
    registry.set_date_adapter(Arc::new(ChronoDateAdapter::with_offset(offset)));

    let value = to_model(&registry, "date", Value::from("2022-12-18 10:30:00")).unwrap();
    assert_eq!(value.as_date().map(|d| d.timestamp()), Some(1_671_330_600));

    let value = to_model(&registry, "date", Value::from(1_671_330_600_000i64)).unwrap();
    assert_eq!(value.as_date().map(|d| d.timestamp()), Some(1_671_330_600));

    assert_eq!(to_model(&registry, "dayjs", Value::from("")).unwrap(), Value::Null);
    assert_eq!(to_model(&registry, "dayjs", Value::Undefined).unwrap(), Value::Undefined);
    assert_eq!(to_model(&registry, "date", Value::from("not a date")).unwrap(), Value::Undefined);
}

#[test]
fn test_multiple_converter() {
    let registry = ConverterRegistry::with_builtins();
    let mut params = Params::new();
    params.insert("type".to_string(), Value::from("divide"));
    params.insert("multiple".to_string(), Value::from(100));
    let request = with_params(DispatchRequest::new("price", "multiple"), &params);
    let model_options = options(Direction::ToModel, ConvertPolicy::Default);

    assert_eq!(
        registry.dispatch(&Value::from(150), &request, &model_options).unwrap(),
        Value::Number(1.5)
    );

    params.insert("multiple".to_string(), Value::from(0));
    let request = with_params(DispatchRequest::new("price", "multiple"), &params);
    assert_eq!(
        registry.dispatch(&Value::from(150), &request, &model_options).unwrap(),
        Value::Undefined
    );
}

#[test]
fn test_add_default_value_converter() {
    let registry = ConverterRegistry::with_builtins();
    let mut params = Params::new();
    params.insert("defaultValue".to_string(), Value::from(15));
    let request = with_params(DispatchRequest::new("count", "addDefaultValue"), &params);
    let model_options = options(Direction::ToModel, ConvertPolicy::Default);

    for empty in [Value::Undefined, Value::Null, Value::from(""), Value::Array(Vec::new())] {
        assert_eq!(registry.dispatch(&empty, &request, &model_options).unwrap(), Value::from(15));
    }
    assert_eq!(
        registry.dispatch(&Value::from("1"), &request, &model_options).unwrap(),
        Value::from("1")
    );
}

#[test]
fn test_default_injection_types_accept_missing_required_values() {
    let registry = ConverterRegistry::with_builtins();
    let request = DispatchRequest {
        required: true,
        ..DispatchRequest::new("count", "original")
    };
    let value = registry
        .dispatch(
            &Value::Undefined,
            &request,
            &options(Direction::ToModel, ConvertPolicy::StrictRequired),
        )
        .unwrap();
    assert_eq!(value, Value::Undefined);
}

#[test]
fn test_map_converter() {
    let registry = ConverterRegistry::with_builtins();
    let source = Value::from(json!([{ "id": "a", "v": 1 }, { "v": 2 }]));
    let value = to_model(&registry, "map", source).unwrap();
    let map = value.as_map().unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.contains_key(&Value::from("a")));
    assert!(map.contains_key(&Value::Number(1.0)));

    let value = to_model(&registry, "map", Value::from(json!({ "x": 1 }))).unwrap();
    assert_eq!(value.as_map().and_then(|m| m.get(&Value::from("x"))), Some(&Value::Number(1.0)));

    let mut map = OrderedMap::new();
    map.insert(Value::from("k"), Value::from(true));
    let value = to_wire(&registry, "object", Value::Map(map)).unwrap();
    assert_eq!(value.to_json(), json!({ "k": true }));
}

#[test]
fn test_set_converter() {
    let registry = ConverterRegistry::with_builtins();
    let value = to_model(&registry, "set", Value::from("[1, 2, 2, 3]")).unwrap();
    assert_eq!(value.as_set().map(OrderedSet::len), Some(3));

    let value = to_wire(&registry, "array", value).unwrap();
    assert_eq!(value.to_json(), json!([1, 2, 3]));
}

#[test]
fn test_set_converter_large_input() {
    let registry = ConverterRegistry::with_builtins();
    let items: Vec<Value> = (0..60_000).map(|i| Value::from(i % 40_000)).collect();
    let value = to_model(&registry, "set", Value::Array(items)).unwrap();
    let set = value.as_set().unwrap();
    assert_eq!(set.len(), 40_000);
    assert!(set.contains(&Value::Number(39_999.0)));
    assert_eq!(set.iter().nth(1234), Some(&Value::Number(1234.0)));

    let items: Vec<Value> = (0..40_000)
        .map(|i| Value::from(json!({ "id": i, "n": i % 7 })))
        .collect();
    let value = to_model(&registry, "map", Value::Array(items)).unwrap();
    let map = value.as_map().unwrap();
    assert_eq!(map.len(), 40_000);
    assert_eq!(map.get(&Value::Number(12.0)).and_then(|v| v.get("n")), Some(&Value::Number(5.0)));
}

#[test]
fn test_array_with_primitive_child() {
    let registry = ConverterRegistry::with_builtins();
    let child = ChildModel::from("number");
    let request = DispatchRequest {
        child_model: Some(&child),
        ..DispatchRequest::new("list", "array")
    };
    let value = registry
        .dispatch(
            &Value::from(json!(["1", 2, "x"])),
            &request,
            &options(Direction::ToModel, ConvertPolicy::Default),
        )
        .unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Undefined])
    );
}

#[test]
fn test_object_with_named_child() {
    let registry = ConverterRegistry::with_builtins();
    let child = ChildModel::from(ModelType::new("Inner", || {
        DataModel::new("Inner").with_table(ConversionTable::new().field("n", FieldSpec::new().model("number").wire("string")))
    }));
    let request = DispatchRequest {
        child_model: Some(&child),
        ..DispatchRequest::new("inner", "object")
    };

    let value = registry
        .dispatch(
            &Value::from(json!({ "n": "7" })),
            &request,
            &options(Direction::ToModel, ConvertPolicy::Default),
        )
        .unwrap();
    let inner = value.as_model().unwrap();
    assert_eq!(inner.name(), "Inner");
    assert_eq!(inner.get("n"), Some(&Value::Number(7.0)));

    let wire = registry
        .dispatch(&value, &request, &options(Direction::ToWire, ConvertPolicy::Default))
        .unwrap();
    assert_eq!(wire.to_json(), json!({ "n": "7" }));

    let err = registry
        .dispatch(
            &Value::from(json!([1])),
            &DispatchRequest { required: true, ..request },
            &options(Direction::ToModel, ConvertPolicy::StrictRequired),
        )
        .unwrap_err();
    assert!(err.to_string().contains("Need object type, unexpected array type."));
}

#[test]
fn test_object_with_template_child_to_wire() {
    let registry = ConverterRegistry::with_builtins();
    let child = ChildModel::from(TemplateDefinition::new(
        ConversionTable::new().field("n", FieldSpec::new().wire("string")),
    ));
    let request = DispatchRequest {
        child_model: Some(&child),
        ..DispatchRequest::new("inner", "object")
    };
    let wire = registry
        .dispatch(
            &Value::from(json!({ "n": 3 })),
            &request,
            &options(Direction::ToWire, ConvertPolicy::Default),
        )
        .unwrap();
    assert_eq!(wire.to_json(), json!({ "n": "3" }));
}

#[test]
fn test_json_converter() {
    let registry = ConverterRegistry::with_builtins();
    let value = to_model(&registry, "json", Value::from(r#"{"a": [1]}"#)).unwrap();
    assert_eq!(value.to_json(), json!({ "a": [1] }));
    assert_eq!(to_model(&registry, "json", Value::from(3)).unwrap(), Value::Undefined);
}

#[test]
fn test_registration_is_idempotent() {
    let mut registry = ConverterRegistry::new();
    let config = ConverterConfig::new("Upper", "upper", |source, _| match source {
        Value::String(s) => Ok(Value::String(s.to_uppercase())),
        _ => Err(ConvertFailure::Rejected(None)),
    });
    registry.register(config.clone());
    registry.register(config);
    assert_eq!(registry.converters_for("upper").len(), 1);
    assert_eq!(to_model(&registry, "upper", Value::from("abc")).unwrap(), Value::from("ABC"));

    assert!(registry.unregister("Upper", "upper").is_some());
    assert!(registry.unregister("Upper", "upper").is_none());
    assert!(registry.converters_for("upper").is_empty());
}

#[test]
fn test_candidates_are_tried_in_order() {
    let mut registry = ConverterRegistry::with_builtins();
    registry.register(ConverterConfig::new("BoolToNumber", "number", |source, _| match source {
        Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        _ => Err(ConvertFailure::rejected("Not a boolean")),
    }));
    assert_eq!(to_model(&registry, "number", Value::Bool(true)).unwrap(), Value::Number(1.0));
    assert_eq!(to_model(&registry, "number", Value::from("4")).unwrap(), Value::Number(4.0));
}

#[test]
fn test_fatal_failure_aborts_chain() {
    let mut registry = ConverterRegistry::new();
    registry.register(ConverterConfig::new("Fatal", "t", |_, _| {
        Err(ConvertFailure::from(Error::Assertion {
            message: "boom".to_string(),
        }))
    }));
    registry.register(ConverterConfig::new("Never", "t", |_, _| Ok(Value::Null)));
    let err = to_model(&registry, "t", Value::Null).unwrap_err();
    assert!(matches!(err, Error::Assertion { ref message } if message == "boom"));
}

#[test]
fn test_policy_errors() {
    let registry = ConverterRegistry::with_builtins();
    let strict = options(Direction::ToModel, ConvertPolicy::StrictProvided);

    let err = registry
        .dispatch(&Value::from(1), &DispatchRequest::new("a", ""), &strict)
        .unwrap_err();
    assert!(matches!(err, Error::MustProvideDirection { ref direction, .. } if direction == "model"));

    let err = registry
        .dispatch(&Value::from(1), &DispatchRequest::new("a", "missing"), &strict)
        .unwrap_err();
    assert!(matches!(err, Error::NoConverterFound { ref type_name, ref model, .. } if type_name == "missing" && model == "TestModel"));

    let required = DispatchRequest {
        required: true,
        ..DispatchRequest::new("a", "string")
    };
    let err = registry.dispatch(&Value::Null, &required, &strict).unwrap_err();
    assert!(matches!(err, Error::RequiredKeyNull { .. }));

    let lenient = options(Direction::ToModel, ConvertPolicy::Warning);
    assert_eq!(
        registry.dispatch(&Value::from(1), &DispatchRequest::new("a", "missing"), &lenient).unwrap(),
        Value::from(1)
    );
    assert_eq!(
        registry.dispatch(&Value::from(1), &DispatchRequest::new("a", ""), &lenient).unwrap(),
        Value::from(1)
    );
}

#[test]
fn test_strict_not_required_failure_yields_undefined() {
    let registry = ConverterRegistry::with_builtins();
    let value = registry
        .dispatch(
            &Value::from("abc"),
            &DispatchRequest::new("a", "number"),
            &options(Direction::ToModel, ConvertPolicy::StrictProvided),
        )
        .unwrap();
    assert_eq!(value, Value::Undefined);
}

#[test]
fn test_warning_all_failed_yields_undefined() {
    let mut registry = ConverterRegistry::with_builtins();
    registry.register(ConverterConfig::new("First", "picky", |_, _| {
        Err(ConvertFailure::rejected("not first"))
    }));
    registry.register(ConverterConfig::new("Second", "picky", |_, _| {
        Err(ConvertFailure::rejected("not second"))
    }));

    for policy in [ConvertPolicy::Warning, ConvertPolicy::WarningRequired, ConvertPolicy::Default] {
        let lenient = options(Direction::ToModel, policy);
        for required in [false, true] {
            let request = DispatchRequest {
                required,
                ..DispatchRequest::new("a", "picky")
            };
            assert_eq!(registry.dispatch(&Value::from(1), &request, &lenient).unwrap(), Value::Undefined);
        }
        let value = registry
            .dispatch(&Value::from("abc"), &DispatchRequest::new("n", "number"), &lenient)
            .unwrap();
        assert_eq!(value, Value::Undefined);
    }
}

#[test]
fn test_strict_base_type_check() {
    let registry = ConverterRegistry::with_builtins();
    let mut strict = options(Direction::ToModel, ConvertPolicy::StrictRequired);
    strict.user_options = ConvertOptions::new().with_strict_base_type_check(true);
    let request = DispatchRequest {
        required: true,
        ..DispatchRequest::new("n", "number")
    };

    let err = registry.dispatch(&Value::from("12"), &request, &strict).unwrap_err();
    assert!(matches!(err, Error::AllConvertersFailed { .. }));
    assert_eq!(registry.dispatch(&Value::from(12), &request, &strict).unwrap(), Value::Number(12.0));
}

#[test]
fn test_already_typed_values_are_unchanged() {
    let registry = ConverterRegistry::with_builtins();
    let strict = options(Direction::ToModel, ConvertPolicy::StrictRequired);
    for (type_name, source) in [
        ("object", Value::from(json!({ "a": 1 }))),
        ("array", Value::from(json!([1, "b"]))),
        ("boolean", Value::Bool(true)),
        ("number", Value::Number(4.25)),
    ] {
        let request = DispatchRequest {
            required: true,
            ..DispatchRequest::new("v", type_name)
        };
        assert_eq!(registry.dispatch(&source, &request, &strict).unwrap(), source);
    }
}
