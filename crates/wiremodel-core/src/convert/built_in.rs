//! Built-in converters
//!
//! Registration order matters: candidates of the same type are tried in the
//! order they are registered here.

use super::numeric::{number_to_string, parse_float};
use super::types::{ConvertContext, ConvertFailure, ConvertResult, ConverterConfig};
use super::{resolve_element, ConverterRegistry};
use crate::value::{Object, OrderedMap, OrderedSet, Value};

/// Register every built-in converter
pub fn register_all(registry: &mut ConverterRegistry) {
    registry.register(
        ConverterConfig::new("DefaultArray", "array", convert_array)
            .with_pre_required_check(empty_source_check),
    );
    registry.register(ConverterConfig::new("MapToArray", "array", convert_map_to_array));
    registry.register(ConverterConfig::new("SetToArray", "array", convert_set_to_array));
    registry.register(
        ConverterConfig::new("DefaultObject", "object", convert_object)
            .with_pre_required_check(empty_source_check),
    );
    registry.register(ConverterConfig::new("MapToObject", "object", convert_map_to_object));
    registry.register(ConverterConfig::new("DefaultBoolean", "boolean", convert_boolean));
    registry.register(ConverterConfig::new("DefaultString", "string", convert_string));
    registry.register(ConverterConfig::new("DefaultNumber", "number", convert_number));
    registry.register(ConverterConfig::new("DefaultDate", "date", convert_date));
    registry.register(ConverterConfig::new("DefaultDayjs", "dayjs", convert_dayjs));
    registry.register(ConverterConfig::new("DefaultJson", "json", convert_json));
    registry.register(ConverterConfig::new("DefaultUndefined", "undefined", |_, _| {
        Ok(Value::Undefined)
    }));
    registry.register(ConverterConfig::new("DefaultNull", "null", |_, _| Ok(Value::Null)));
    registry.register(ConverterConfig::new("DefaultOriginal", "original", convert_add_default));
    registry.register(ConverterConfig::new(
        "DefaultAddDefaultValue",
        "addDefaultValue",
        convert_add_default,
    ));
    registry.register(ConverterConfig::new("DefaultMultiple", "multiple", convert_multiple));
    registry.register(ConverterConfig::new("DefaultMap", "map", convert_map));
    registry.register(ConverterConfig::new("DefaultSet", "set", convert_set));
}

fn empty_source_check(source: &Value) -> Option<String> {
    match source {
        Value::Undefined => Some("Empty".to_string()),
        Value::String(s) if s.is_empty() => Some("Empty".to_string()),
        _ => None,
    }
}

/// Expected runtime shape for the opt-in strict base-type check
#[derive(Clone, Copy)]
enum BaseType {
    Array,
    Tag(&'static str),
}

fn check_base_type(source: &Value, expected: BaseType, ctx: &ConvertContext<'_>) -> Result<(), ConvertFailure> {
    if !ctx.options.user_options.strict_base_type_check() || !ctx.strict_to_model() {
        return Ok(());
    }
    let matches = match expected {
        BaseType::Array => matches!(source, Value::Array(_)),
        BaseType::Tag(tag) => !source.is_null() && source.type_tag() == tag,
    };
    if matches {
        return Ok(());
    }
    let expected_name = match expected {
        BaseType::Array => "array",
        BaseType::Tag(tag) => tag,
    };
    Err(ConvertFailure::rejected(format!(
        "Strict base type check failed: expected {} but got {} at {}",
        expected_name,
        source.kind_name(),
        ctx.key
    )))
}

fn parse_json_source(text: &str) -> Result<Value, ConvertFailure> {
    Value::parse_json(text).map_err(|err| ConvertFailure::rejected(err.to_string()))
}

fn element_path(ctx: &ConvertContext<'_>, index: usize) -> String {
    format!("{}[{}]", ctx.key, index)
}

fn convert_elements<'v>(
    items: impl Iterator<Item = &'v Value>,
    ctx: &ConvertContext<'_>,
) -> Result<Vec<Value>, ConvertFailure> {
    items
        .enumerate()
        .map(|(index, item)| resolve_element(item, &element_path(ctx, index), ctx))
        .collect()
}

fn convert_array(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    check_base_type(source, BaseType::Array, ctx)?;
    let parsed;
    let source = match source {
        Value::String(text) => {
            parsed = parse_json_source(text)?;
            &parsed
        }
        other => other,
    };
    match source {
        Value::Array(items) => Ok(Value::Array(convert_elements(items.iter(), ctx)?)),
        other => Err(ConvertFailure::rejected(format!(
            "Need array type, unexpected {} type",
            other.kind_name()
        ))),
    }
}

fn convert_map_to_array(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    match source {
        Value::Map(map) => Ok(Value::Array(convert_elements(map.values(), ctx)?)),
        _ => Err(ConvertFailure::Rejected(None)),
    }
}

fn convert_set_to_array(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    match source {
        Value::Set(set) => Ok(Value::Array(convert_elements(set.iter(), ctx)?)),
        _ => Err(ConvertFailure::Rejected(None)),
    }
}

fn convert_object(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    check_base_type(source, BaseType::Tag("object"), ctx)?;
    let parsed;
    let source = match source {
        Value::String(text) => {
            parsed = parse_json_source(text)?;
            &parsed
        }
        other => other,
    };
    match source {
        Value::Null => Ok(Value::Null),
        Value::Array(_) => Err(ConvertFailure::rejected(
            "Need object type, unexpected array type.",
        )),
        Value::Object(_) | Value::Model(_) => resolve_element(source, ctx.key, ctx),
        other => Err(ConvertFailure::rejected(format!(
            "Need object type, unexpected {} type",
            other.kind_name()
        ))),
    }
}

fn convert_map_to_object(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    let Value::Map(map) = source else {
        return Err(ConvertFailure::Rejected(None));
    };
    let mut object = Object::new();
    for (key, value) in map.iter() {
        let name = key.display_key();
        let path = format!("{}.{}", ctx.key, name);
        object.insert(name, resolve_element(value, &path, ctx)?);
    }
    Ok(Value::Object(object))
}

fn convert_boolean(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    check_base_type(source, BaseType::Tag("boolean"), ctx)?;
    match source {
        Value::String(s) => Ok(Value::Bool(s.eq_ignore_ascii_case("true") || s == "1")),
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) => Ok(Value::Bool(*n > 0.0)),
        _ if ctx.strict_to_model() => Err(ConvertFailure::rejected("Not a boolean")),
        other => Ok(Value::Bool(!other.is_nullish())),
    }
}

fn convert_string(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    check_base_type(source, BaseType::Tag("string"), ctx)?;
    if ctx.strict_to_model() && !matches!(source, Value::String(_)) {
        return Err(ConvertFailure::rejected("Not a string"));
    }
    match source {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Number(n) => Ok(Value::String(number_to_string(*n))),
        Value::BigInt(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Undefined => Ok(Value::String("undefined".to_string())),
        Value::Null => Ok(Value::Null),
        Value::Date(date) => Ok(Value::String(
            ctx.dates().format(date, ctx.output_date_format()),
        )),
        Value::Function(_) => Err(ConvertFailure::rejected("Can not stringify a function")),
        other => Ok(Value::String(other.to_json_string())),
    }
}

fn convert_number(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    check_base_type(source, BaseType::Tag("number"), ctx)?;
    match source {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Date(date) => Ok(Value::Number(date.timestamp_millis() as f64)),
        Value::Null => Err(ConvertFailure::rejected("Number should not be null")),
        Value::String(s) => parse_float(s)
            .map(Value::Number)
            .ok_or_else(|| ConvertFailure::rejected(format!("Can not parse '{}' as a number", s))),
        other => Err(ConvertFailure::rejected(format!(
            "Can not convert {} to a number",
            other.kind_name()
        ))),
    }
}

fn parse_date(text: &str, ctx: &ConvertContext<'_>) -> ConvertResult {
    ctx.dates()
        .parse(text, ctx.date_format)
        .map(Value::Date)
        .ok_or_else(|| ConvertFailure::rejected("Invalid date"))
}

fn date_from_millis(millis: f64, ctx: &ConvertContext<'_>) -> ConvertResult {
    ctx.dates()
        .from_millis(millis)
        .map(Value::Date)
        .ok_or_else(|| ConvertFailure::rejected("Invalid date"))
}

fn convert_date(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    match source {
        Value::String(text) => parse_date(text, ctx),
        Value::Number(n) => date_from_millis(*n, ctx),
        Value::Null => Ok(Value::Null),
        other => Err(ConvertFailure::rejected(format!(
            "Can not convert {} to a date",
            other.kind_name()
        ))),
    }
}

fn convert_dayjs(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    match source {
        Value::String(text) if text.is_empty() => Ok(Value::Null),
        Value::String(text) => parse_date(text, ctx),
        Value::Number(n) => date_from_millis(*n, ctx),
        Value::Undefined => Ok(Value::Undefined),
        Value::Null => Ok(Value::Null),
        other => Err(ConvertFailure::rejected(format!(
            "Can not convert {} to a date",
            other.kind_name()
        ))),
    }
}

fn convert_json(source: &Value, _ctx: &ConvertContext<'_>) -> ConvertResult {
    match source {
        Value::String(text) => parse_json_source(text),
        other if other.type_tag() == "object" => Ok(other.clone()),
        _ => Err(ConvertFailure::Rejected(None)),
    }
}

/// Nullish, empty string or empty array
fn is_empty_source(source: &Value) -> bool {
    match source {
        Value::Undefined | Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn convert_add_default(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    if is_empty_source(source) {
        if let Some(default) = ctx.param("defaultValue") {
            return Ok(default.clone());
        }
    }
    Ok(source.clone())
}

fn convert_multiple(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    let Value::Number(n) = source else {
        return Err(ConvertFailure::rejected("Not a number"));
    };
    let factor = ctx
        .param("multiple")
        .and_then(|value| match value {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_float(s),
            _ => None,
        })
        .ok_or_else(|| ConvertFailure::rejected("Param multiple must be a number"))?;
    match ctx.param("type").and_then(Value::as_str).unwrap_or("multiply") {
        "multiply" => Ok(Value::Number(n * factor)),
        "divide" if factor == 0.0 => Err(ConvertFailure::rejected("Can not divide by zero")),
        "divide" => Ok(Value::Number(n / factor)),
        other => Err(ConvertFailure::rejected(format!(
            "Unknown multiple type '{}', expected multiply or divide",
            other
        ))),
    }
}

fn convert_map(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    match source {
        Value::Array(items) => {
            let map_key = ctx.param("mapKey").and_then(Value::as_str).unwrap_or("id");
            let mut map = OrderedMap::new();
            for (index, item) in items.iter().enumerate() {
                let key = match item.get(map_key) {
                    Some(key) if !key.is_undefined() => key.clone(),
                    _ => Value::Number(index as f64),
                };
                map.insert(key, resolve_element(item, &element_path(ctx, index), ctx)?);
            }
            Ok(Value::Map(map))
        }
        Value::Object(object) => {
            let mut map = OrderedMap::new();
            for (key, item) in object {
                let path = format!("{}.{}", ctx.key, key);
                map.insert(Value::String(key.clone()), resolve_element(item, &path, ctx)?);
            }
            Ok(Value::Map(map))
        }
        Value::Map(map) => Ok(Value::Map(map.clone())),
        Value::Null => Ok(Value::Null),
        other => Err(ConvertFailure::rejected(format!(
            "Need array or object type to build a map, unexpected {} type",
            other.kind_name()
        ))),
    }
}

fn convert_set(source: &Value, ctx: &ConvertContext<'_>) -> ConvertResult {
    check_base_type(source, BaseType::Array, ctx)?;
    let parsed;
    let source = match source {
        Value::String(text) => {
            parsed = parse_json_source(text)?;
            &parsed
        }
        other => other,
    };
    match source {
        Value::Array(items) => Ok(Value::Set(
            convert_elements(items.iter(), ctx)?.into_iter().collect::<OrderedSet>(),
        )),
        Value::Set(set) => Ok(Value::Set(set.clone())),
        Value::Null => Ok(Value::Null),
        other => Err(ConvertFailure::rejected(format!(
            "Need array type to build a set, unexpected {} type",
            other.kind_name()
        ))),
    }
}

