//! Heuristics for locating data inside loosely shaped payloads

use crate::value::{Object, Value};
use crate::{Error, Result};
use std::collections::HashMap;

/// Share of elements that must have the same type tag for an array to count
/// as a list
const UNIFORM_ARRAY_RATIO: f64 = 0.8;

/// A key-matching rule for [`find_one_property`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyCondition {
    /// The value of the only key, when the object has exactly one
    SelectOnlyOne,
    /// The value of the first key, when nothing else matched
    SelectAtLeastOne,
    /// Key equal to the name
    Match(String),
    StartWith(String),
    EndWith(String),
    Contain(String),
}

impl PropertyCondition {
    fn matches(&self, key: &str) -> bool {
        match self {
            Self::Match(name) => !name.is_empty() && key == name,
            Self::StartWith(name) => !name.is_empty() && key.starts_with(name.as_str()),
            Self::EndWith(name) => !name.is_empty() && key.ends_with(name.as_str()),
            Self::Contain(name) => !name.is_empty() && key.contains(name.as_str()),
            Self::SelectOnlyOne | Self::SelectAtLeastOne => false,
        }
    }
}

fn keyed(value: &Value) -> Option<&Object> {
    match value {
        Value::Object(object) => Some(object),
        Value::Model(model) if !model.is_array() => Some(model.properties()),
        _ => None,
    }
}

/// Find the most plausible list inside `value`.
///
/// Direct properties are checked before nested objects; an array qualifies
/// when it is non-empty and mostly uniform. Non-object input yields an empty
/// slice.
pub fn find_best_array(value: &Value) -> &[Value] {
    let Some(object) = keyed(value) else {
        return &[];
    };

    let direct = object.values().find_map(|item| match item {
        Value::Array(items) if is_uniform_list(items) => Some(items.as_slice()),
        _ => None,
    });
    if let Some(items) = direct {
        return items;
    }

    object
        .values()
        .filter(|item| keyed(item).is_some())
        .map(find_best_array)
        .find(|items| !items.is_empty())
        .unwrap_or(&[])
}

fn is_uniform_list(items: &[Value]) -> bool {
    if items.is_empty() {
        return false;
    }
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.type_tag()).or_default() += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    max as f64 / items.len() as f64 >= UNIFORM_ARRAY_RATIO
}

/// Pick one property of an object by the given conditions.
///
/// `SelectOnlyOne` is checked first wherever it appears, the name conditions
/// follow in order, `SelectAtLeastOne` is the last resort. When nothing
/// matches and `assert_message` is set, the call fails with it.
pub fn find_one_property<'a>(
    value: &'a Value,
    conditions: &[PropertyCondition],
    assert_message: Option<&str>,
) -> Result<Option<&'a Value>> {
    let found = keyed(value).and_then(|object| select_property(object, conditions));
    match (found, assert_message) {
        (None, Some(message)) => Err(Error::Assertion {
            message: message.to_string(),
        }),
        (found, _) => Ok(found),
    }
}

fn select_property<'a>(object: &'a Object, conditions: &[PropertyCondition]) -> Option<&'a Value> {
    if conditions.contains(&PropertyCondition::SelectOnlyOne) && object.len() == 1 {
        return object.values().next();
    }
    for condition in conditions {
        if let Some((_, value)) = object.iter().find(|(key, _)| condition.matches(key)) {
            return Some(value);
        }
    }
    if conditions.contains(&PropertyCondition::SelectAtLeastOne) {
        return object.values().next();
    }
    None
}

/// Options of [`any_to_array`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyToArrayOptions {
    /// Look for a nested list inside parsed JSON objects
    pub nest_array: bool,
}

impl Default for AnyToArrayOptions {
    fn default() -> Self {
        Self { nest_array: true }
    }
}

/// Coerce any value into a list.
///
/// Arrays pass through, nullish values and empty strings give an empty list,
/// JSON text is parsed first, maps, sets and objects give their values, other
/// scalars become a single element.
pub fn any_to_array(value: &Value, options: AnyToArrayOptions) -> Vec<Value> {
    match value {
        Value::Undefined | Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::Array(items) => items.clone(),
        Value::String(text) if text.starts_with('{') || text.starts_with('[') => {
            match Value::parse_json(text) {
                Ok(Value::Array(items)) => items,
                Ok(parsed) => {
                    if options.nest_array {
                        let best = find_best_array(&parsed);
                        if !best.is_empty() {
                            return best.to_vec();
                        }
                    }
                    any_to_array(&parsed, options)
                }
                Err(err) => {
                    log::debug!("any_to_array: {}", err);
                    Vec::new()
                }
            }
        }
        Value::Map(map) => map.values().cloned().collect(),
        Value::Set(set) => set.iter().cloned().collect(),
        Value::Object(object) => object.values().cloned().collect(),
        Value::Model(model) => match model.array() {
            Some(items) => items.to_vec(),
            None => model.properties().values().cloned().collect(),
        },
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_best_array_prefers_direct_properties() {
        let source = value(json!({
            "name": "test",
            "info": { "items": ["a", "b"] },
            "data": [1, 2, 3, 4, 5]
        }));
        assert_eq!(find_best_array(&source), value(json!([1, 2, 3, 4, 5])).as_array().unwrap().as_slice());
    }

    #[test]
    fn test_best_array_descends_into_objects() {
        let source = value(json!({
            "result": { "success": true, "data": { "list": [{ "id": 1 }, { "id": 2 }], "total": 2 } }
        }));
        assert_eq!(find_best_array(&source).len(), 2);
    }

    #[test]
    fn test_best_array_skips_mixed_and_empty() {
        let source = value(json!({
            "empty": [],
            "mixed": [1, "a", true, {}, []],
            "good": [{ "id": 1 }, { "id": 2 }, { "id": 3 }]
        }));
        let best = find_best_array(&source);
        assert_eq!(best.len(), 3);
        assert_eq!(best[0].get("id"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_best_array_non_object_input() {
        assert!(find_best_array(&value(json!([1, 2, 3]))).is_empty());
        assert!(find_best_array(&Value::Null).is_empty());
        assert!(find_best_array(&value(json!({ "e1": [], "e2": [], "info": {} }))).is_empty());
    }

    #[test]
    fn test_find_one_property_conditions() {
        let source = value(json!({
            "name": "test",
            "user_id": 123,
            "item_name": "test_item",
            "result_data": "result"
        }));

        let found = find_one_property(&source, &[PropertyCondition::EndWith("_id".into())], None).unwrap();
        assert_eq!(found, Some(&Value::Number(123.0)));

        let found = find_one_property(&source, &[PropertyCondition::Contain("_".into())], None).unwrap();
        assert_eq!(found, Some(&Value::Number(123.0)));

        let found = find_one_property(
            &source,
            &[
                PropertyCondition::Match("missing".into()),
                PropertyCondition::SelectAtLeastOne,
            ],
            None,
        )
        .unwrap();
        assert_eq!(found, Some(&Value::from("test")));

        let found = find_one_property(&source, &[PropertyCondition::SelectOnlyOne], None).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_find_one_property_select_only_one_first() {
        let source = value(json!({ "value": "single" }));
        let found = find_one_property(
            &source,
            &[PropertyCondition::Match("other".into()), PropertyCondition::SelectOnlyOne],
            None,
        )
        .unwrap();
        assert_eq!(found, Some(&Value::from("single")));
    }

    #[test]
    fn test_find_one_property_assertion() {
        let source = value(json!({ "name": "test" }));
        let err = find_one_property(&source, &[PropertyCondition::Match("id".into())], Some("id is required"))
            .unwrap_err();
        assert!(matches!(err, Error::Assertion { ref message } if message == "id is required"));
    }

    #[test]
    fn test_any_to_array() {
        let options = AnyToArrayOptions::default();
        assert_eq!(any_to_array(&value(json!({ "a": 1, "b": 2 })), options), vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(any_to_array(&Value::from("[1, 2]"), options), vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(
            any_to_array(&Value::from(r#"{"data": {"list": [1, 2, 3]}}"#), options).len(),
            3
        );
        assert!(any_to_array(&Value::from("{a: 1}"), options).is_empty());
        assert!(any_to_array(&Value::from(""), options).is_empty());
        assert!(any_to_array(&Value::Null, options).is_empty());
        assert_eq!(any_to_array(&Value::from("test"), options), vec![Value::from("test")]);
        assert_eq!(any_to_array(&Value::Bool(true), options), vec![Value::Bool(true)]);
    }

    #[test]
    fn test_any_to_array_without_nesting() {
        let options = AnyToArrayOptions { nest_array: false };
        let items = any_to_array(&Value::from(r#"{"data": [1, 2], "name": "x"}"#), options);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Value::from("x"));
    }
}
