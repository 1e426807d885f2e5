//! Core types of the converter registry
//!
//! Converters are plain closures over a borrowed source value and a
//! [`ConvertContext`] describing the field being converted. A converter either
//! produces a value, rejects the source (the next candidate is tried) or fails
//! fatally (the whole conversion aborts).

use super::chain::ChainError;
use super::ConverterRegistry;
use crate::config::ConvertOptions;
use crate::date::{DateAdapter, DEFAULT_DATE_FORMAT};
use crate::model::{ModelType, TemplateDefinition};
use crate::value::Value;
use crate::{ConvertPolicy, Error};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Free-form converter parameters, e.g. `multiple`, `defaultValue`, `mapKey`
pub type Params = IndexMap<String, Value>;

/// Conversion direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Model side to wire side
    ToWire,
    /// Wire side to model side
    ToModel,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ToWire => "wire",
            Direction::ToModel => "model",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a converter candidate did not produce a value
#[derive(Debug)]
pub enum ConvertFailure {
    /// The candidate does not accept this source; try the next one
    Rejected(Option<String>),
    /// Abort the conversion with this error
    Fatal(Box<Error>),
}

impl ConvertFailure {
    pub fn rejected(message: impl Into<String>) -> Self {
        ConvertFailure::Rejected(Some(message.into()))
    }

    pub fn message(&self) -> Option<String> {
        match self {
            ConvertFailure::Rejected(message) => message.clone(),
            ConvertFailure::Fatal(err) => Some(err.to_string()),
        }
    }
}

impl From<Error> for ConvertFailure {
    fn from(err: Error) -> Self {
        ConvertFailure::Fatal(Box::new(err))
    }
}

impl ChainError for ConvertFailure {
    fn is_fatal(&self) -> bool {
        matches!(self, ConvertFailure::Fatal(_))
    }
}

/// Result of one converter invocation
pub type ConvertResult = std::result::Result<Value, ConvertFailure>;

/// Converter body
pub type ConverterFn = Arc<dyn Fn(&Value, &ConvertContext<'_>) -> ConvertResult + Send + Sync>;

/// Presence check run before a converter when the field is required.
/// Returns a message describing why the source counts as not provided.
pub type PreRequiredCheckFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// A registered converter candidate
#[derive(Clone)]
pub struct ConverterConfig {
    /// Unique key used to unregister the converter
    pub key: String,
    /// Type name the converter is registered under
    pub target_type: String,
    pub pre_required_check: Option<PreRequiredCheckFn>,
    pub converter: ConverterFn,
}

impl ConverterConfig {
    pub fn new(
        key: impl Into<String>,
        target_type: impl Into<String>,
        converter: impl Fn(&Value, &ConvertContext<'_>) -> ConvertResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            target_type: target_type.into(),
            pre_required_check: None,
            converter: Arc::new(converter),
        }
    }

    pub fn with_pre_required_check(
        mut self,
        check: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.pre_required_check = Some(Arc::new(check));
        self
    }

    /// Identity comparison: same key, same target and the same converter body
    pub fn same_as(&self, other: &ConverterConfig) -> bool {
        self.key == other.key
            && self.target_type == other.target_type
            && Arc::ptr_eq(&self.converter, &other.converter)
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("key", &self.key)
            .field("target_type", &self.target_type)
            .field("pre_required_check", &self.pre_required_check.is_some())
            .finish()
    }
}

/// Nested type descriptor of `object`/`array`/`map`/`set` fields
#[derive(Clone)]
pub enum ChildModel {
    /// A declared model type
    Named(ModelType),
    /// An inline template
    Template(Arc<TemplateDefinition>),
    /// A converter type name applied to each element
    Primitive(String),
}

impl fmt::Debug for ChildModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildModel::Named(model_type) => write!(f, "Named({})", model_type.name()),
            ChildModel::Template(_) => f.write_str("Template(..)"),
            ChildModel::Primitive(name) => write!(f, "Primitive({})", name),
        }
    }
}

impl From<ModelType> for ChildModel {
    fn from(model_type: ModelType) -> Self {
        ChildModel::Named(model_type)
    }
}

impl From<TemplateDefinition> for ChildModel {
    fn from(template: TemplateDefinition) -> Self {
        ChildModel::Template(Arc::new(template))
    }
}

impl From<Arc<TemplateDefinition>> for ChildModel {
    fn from(template: Arc<TemplateDefinition>) -> Self {
        ChildModel::Template(template)
    }
}

impl From<&str> for ChildModel {
    fn from(type_name: &str) -> Self {
        ChildModel::Primitive(type_name.to_string())
    }
}

/// Model-level settings a conversion runs under
#[derive(Debug, Clone)]
pub struct ConvertItemOptions {
    pub direction: Direction,
    pub policy: ConvertPolicy,
    /// Model default date format, may be empty
    pub default_date_format: String,
    pub user_options: ConvertOptions,
    /// Debug name of the model that declares the field
    pub model_name: String,
}

impl ConvertItemOptions {
    pub fn new(direction: Direction, policy: ConvertPolicy) -> Self {
        Self {
            direction,
            policy,
            default_date_format: String::new(),
            user_options: ConvertOptions::default(),
            model_name: String::new(),
        }
    }
}

/// One dispatch into the registry
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    /// Full dotted path of the value, for diagnostics
    pub key: &'a str,
    pub type_name: &'a str,
    pub required: bool,
    pub params: Option<&'a Params>,
    pub child_model: Option<&'a ChildModel>,
    /// Field date format, already defaulted to the model's one
    pub date_format: Option<&'a str>,
}

impl<'a> DispatchRequest<'a> {
    pub fn new(key: &'a str, type_name: &'a str) -> Self {
        Self {
            key,
            type_name,
            required: false,
            params: None,
            child_model: None,
            date_format: None,
        }
    }
}

/// Everything a converter sees besides the source value
pub struct ConvertContext<'a> {
    pub key: &'a str,
    pub type_name: &'a str,
    pub child_model: Option<&'a ChildModel>,
    pub date_format: Option<&'a str>,
    pub params: Option<&'a Params>,
    pub options: &'a ConvertItemOptions,
    pub registry: &'a ConverterRegistry,
}

impl<'a> ConvertContext<'a> {
    pub fn param(&self, name: &str) -> Option<&'a Value> {
        self.params.and_then(|params| params.get(name))
    }

    pub fn direction(&self) -> Direction {
        self.options.direction
    }

    pub fn dates(&self) -> &'a dyn DateAdapter {
        self.registry.date_adapter()
    }

    /// Format used to print dates: field, then model, then the library default
    pub fn output_date_format(&self) -> &'a str {
        let options: &'a ConvertItemOptions = self.options;
        match self.date_format.filter(|f| !f.is_empty()) {
            Some(format) => format,
            None if !options.default_date_format.is_empty() => &options.default_date_format,
            None => DEFAULT_DATE_FORMAT,
        }
    }

    /// Strict policy converting towards the model side
    pub fn strict_to_model(&self) -> bool {
        self.options.direction == Direction::ToModel && self.options.policy.is_strict()
    }
}

/// Scope shared by the nested conversions of one top-level call
#[derive(Clone, Copy)]
pub(crate) struct ConvertScope<'a> {
    pub registry: &'a ConverterRegistry,
    pub options: &'a ConvertOptions,
    pub key_prefix: &'a str,
}

impl<'a> ConvertScope<'a> {
    pub fn nested(&self, key_prefix: &'a str) -> ConvertScope<'a> {
        ConvertScope {
            registry: self.registry,
            options: self.options,
            key_prefix,
        }
    }

    /// `prefix.key`, or `key` at the top level
    pub fn path_of(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.key_prefix, key)
        }
    }
}
