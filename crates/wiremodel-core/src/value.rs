//! Dynamic value tree shared by the wire side and the model side
//!
//! Wire payloads arrive as JSON, but the model side needs richer shapes: dates,
//! maps keyed by arbitrary values, insertion-ordered sets and nested model
//! instances. [`Value`] covers both, and converts to and from
//! [`serde_json::Value`] at the boundary.

use crate::model::DataModel;
use crate::Result;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use indexmap::{Equivalent, IndexMap, IndexSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Insertion-ordered string-keyed object
pub type Object = IndexMap<String, Value>;

/// A dynamic value handled by the conversion engine
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent value; never serialized
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    Date(DateTime<FixedOffset>),
    Array(Vec<Value>),
    Object(Object),
    Map(OrderedMap),
    Set(OrderedSet),
    Model(Box<DataModel>),
    /// Callable stored on a model; skipped by every serialization path
    Function(FunctionValue),
}

/// Named callable that can live in a model's property bag
#[derive(Clone)]
pub struct FunctionValue {
    name: String,
    func: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
}

impl FunctionValue {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }

    /// Whether both values share the same underlying callable
    pub fn ptr_eq(&self, other: &FunctionValue) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionValue({})", self.name)
    }
}

/// Hashable key wrapper so arbitrary values can index a map or a set.
///
/// Keys compare like [`Value`] equality, except that `NaN` matches `NaN`,
/// so every key can be found again.
#[derive(Clone)]
struct ValueKey(Value);

/// Borrowed lookup form of [`ValueKey`]
struct KeyRef<'a>(&'a Value);

fn same_key(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

/// `-0` hashes like `0` and every `NaN` alike
fn canonical_bits(n: f64) -> u64 {
    if n == 0.0 {
        0
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

/// Hash consistent with [`same_key`]. Objects hash their entries in key
/// order because object equality ignores order; maps, sets, models and
/// functions only contribute a coarse summary.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Undefined | Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Number(n) => canonical_bits(*n).hash(state),
        Value::BigInt(n) => n.hash(state),
        Value::String(s) => s.hash(state),
        Value::Date(date) => (date.timestamp(), date.timestamp_subsec_nanos()).hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(object) => {
            object.len().hash(state);
            let mut entries: Vec<(&String, &Value)> = object.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                key.hash(state);
                hash_value(item, state);
            }
        }
        Value::Map(map) => map.len().hash(state),
        Value::Set(set) => set.len().hash(state),
        Value::Model(model) => model.name().hash(state),
        Value::Function(func) => func.name().hash(state),
    }
}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        same_key(&self.0, &other.0)
    }
}

impl Eq for ValueKey {}

impl Hash for KeyRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self.0, state);
    }
}

impl Equivalent<ValueKey> for KeyRef<'_> {
    fn equivalent(&self, key: &ValueKey) -> bool {
        same_key(self.0, &key.0)
    }
}

/// Associative container keyed by arbitrary values, iterated in insertion order
#[derive(Clone, Default, PartialEq)]
pub struct OrderedMap {
    entries: IndexMap<ValueKey, Value>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(&KeyRef(key))
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(&KeyRef(key))
    }

    /// Insert or replace; a replaced entry keeps its original position
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.entries.insert(ValueKey(key), value)
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.shift_remove(&KeyRef(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (&k.0, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys().map(|k| &k.0)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

impl fmt::Debug for OrderedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(Value, Value)> for OrderedMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (ValueKey(k), v)).collect(),
        }
    }
}

/// Collection deduplicated by equality, iterated in first-insertion order
#[derive(Clone, Default, PartialEq)]
pub struct OrderedSet {
    items: IndexSet<ValueKey>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal value was already present
    pub fn insert(&mut self, value: Value) -> bool {
        self.items.insert(ValueKey(value))
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains(&KeyRef(value))
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.items.shift_remove(&KeyRef(value))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().map(|k| &k.0)
    }
}

impl fmt::Debug for OrderedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Value> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(ValueKey).collect(),
        }
    }
}

impl Value {
    /// Runtime type tag in the style of JavaScript's `typeof`
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            _ => "object",
        }
    }

    /// Descriptive shape name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Model(_) => "model",
            Value::Function(_) => "function",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Scalars that a keyed model cannot represent
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Number(_) | Value::BigInt(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&OrderedSet> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&DataModel> {
        match self {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_model_mut(&mut self) -> Option<&mut DataModel> {
        match self {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Property lookup on objects and models
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Model(model) => model.get(key),
            _ => None,
        }
    }

    /// Parse JSON text into a value
    pub fn parse_json(text: &str) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Value::from(json))
    }

    /// Convert to plain JSON with `JSON.stringify` semantics: undefined and
    /// functions are dropped from objects and become `null` inside arrays
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => json_number(*n),
            Value::BigInt(n) => match i64::try_from(*n) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(n.to_string()),
            },
            Value::String(s) => Json::String(s.clone()),
            Value::Date(d) => Json::String(
                d.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_)))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Map(map) => Json::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_)))
                    .map(|(k, v)| (k.display_key(), v.to_json()))
                    .collect(),
            ),
            Value::Set(set) => Json::Array(set.iter().map(Value::to_json).collect()),
            Value::Model(model) => model.to_plain(),
        }
    }

    /// Compact JSON text of [`Value::to_json`]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// String form used when a value becomes an object key
    pub fn display_key(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::BigInt(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            other => other.to_json_string(),
        }
    }
}

/// JSON number for an f64, preferring the integer representation
pub(crate) fn json_number(n: f64) -> serde_json::Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Value::Object(map)
    }
}

impl From<OrderedMap> for Value {
    fn from(map: OrderedMap) -> Self {
        Value::Map(map)
    }
}

impl From<OrderedSet> for Value {
    fn from(set: OrderedSet) -> Self {
        Value::Set(set)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(date: DateTime<FixedOffset>) -> Self {
        Value::Date(date)
    }
}

impl From<DataModel> for Value {
    fn from(model: DataModel) -> Self {
        Value::Model(Box::new(model))
    }
}

impl From<FunctionValue> for Value {
    fn from(func: FunctionValue) -> Self {
        Value::Function(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order() {
        let value = Value::from(json!({"b": 1, "a": 2, "c": 3}));
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_to_json_drops_undefined_and_functions() {
        let mut object = Object::new();
        object.insert("a".to_string(), Value::Undefined);
        object.insert("b".to_string(), Value::from(1));
        object.insert(
            "c".to_string(),
            Value::Function(FunctionValue::new("noop", |_| Value::Undefined)),
        );
        object.insert(
            "d".to_string(),
            Value::Array(vec![
                Value::from(1),
                Value::Function(FunctionValue::new("noop", |_| Value::Undefined)),
                Value::from("1"),
            ]),
        );
        assert_eq!(
            Value::Object(object).to_json(),
            json!({"b": 1, "d": [1, null, "1"]})
        );
    }

    #[test]
    fn test_integral_numbers_serialize_without_fraction() {
        let value = Value::Array(vec![Value::from(1), Value::from(2.5)]);
        assert_eq!(value.to_json_string(), "[1,2.5]");
    }

    #[test]
    fn test_ordered_map_replace_keeps_position() {
        let mut map = OrderedMap::new();
        map.insert(Value::from(1), Value::from("a"));
        map.insert(Value::from(2), Value::from("b"));
        assert_eq!(map.insert(Value::from(1), Value::from("c")), Some(Value::from("a")));
        let values: Vec<&Value> = map.values().collect();
        assert_eq!(values, vec![&Value::from("c"), &Value::from("b")]);
    }

    #[test]
    fn test_ordered_set_deduplicates_in_first_insertion_order() {
        let set: OrderedSet = [3, 2, 3, 5, 5, 9]
            .into_iter()
            .map(Value::from)
            .collect();
        let items: Vec<f64> = set.iter().filter_map(Value::as_f64).collect();
        assert_eq!(items, vec![3.0, 2.0, 5.0, 9.0]);
    }

    #[test]
    fn test_ordered_keys_follow_value_equality() {
        let mut set = OrderedSet::new();
        assert!(set.insert(Value::Number(0.0)));
        assert!(!set.insert(Value::Number(-0.0)));
        assert!(set.insert(Value::Number(f64::NAN)));
        assert!(!set.insert(Value::Number(f64::NAN)));
        assert!(set.insert(Value::from(json!({ "a": 1, "b": [1, 2] }))));
        assert!(!set.insert(Value::from(json!({ "b": [1, 2], "a": 1 }))));
        assert!(set.insert(Value::from("0")));
        assert_eq!(set.len(), 4);

        assert!(set.remove(&Value::Number(f64::NAN)));
        let items: Vec<&Value> = set.iter().collect();
        assert_eq!(items[0], &Value::Number(0.0));
        assert_eq!(items[2], &Value::from("0"));

        let mut map = OrderedMap::new();
        map.insert(Value::from(json!([1, "x"])), Value::from(true));
        assert_eq!(map.get(&Value::from(json!([1, "x"]))), Some(&Value::from(true)));
        assert_eq!(map.get(&Value::from(json!(["x", 1]))), None);
        assert_eq!(map.remove(&Value::from(json!([1, "x"]))), Some(Value::from(true)));
        assert!(map.is_empty());
    }

    #[test]
    fn test_map_serializes_as_object() {
        let map: OrderedMap = vec![
            (Value::from(1), Value::from("x")),
            (Value::from("k"), Value::from(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(Value::Map(map).to_json(), json!({"1": "x", "k": true}));
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(Value::Null.type_tag(), "object");
        assert_eq!(Value::Array(vec![]).type_tag(), "object");
        assert_eq!(Value::from("x").type_tag(), "string");
        assert_eq!(Value::Undefined.type_tag(), "undefined");
        assert_eq!(Value::Null.kind_name(), "null");
    }
}
