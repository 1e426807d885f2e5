//! The model engine
//!
//! A [`DataModel`] is an insertion-ordered property bag plus the configuration
//! that drives its conversion: a [`ConversionTable`], a [`ConvertPolicy`], name
//! mappings, hooks and blacklists. [`DataModel::from_wire`] populates the bag
//! from wire data and [`DataModel::to_wire`] produces wire data from it.
//!
//! Declared model types are factories returning a configured instance (see
//! [`ModelType`] and [`ModelDefinition`]); inline templates build the same kind
//! of instance from a table literal (see [`TemplateDefinition`]).

mod builder;
mod clone;
pub mod field;
mod template;
mod typed;


pub use clone::CloneOptions;
pub use field::{
    resolve_field, ConversionTable, CustomConvertFn, FieldSpec, FieldStages, PresolveFn, SideSpec,
};
pub use template::TemplateDefinition;
pub use typed::{FieldAccessor, TypedModel};

use crate::case::{to_case, NameCase};
use crate::config::ConvertOptions;
use crate::convert::{
    global_registry, ChildModel, ConvertItemOptions, ConvertScope, ConverterRegistry, Direction,
    DispatchRequest, DEFAULT_INJECTION_TYPES,
};
use crate::path;
use crate::value::{Object, Value};
use crate::{ConvertPolicy, Error, Result};
use indexmap::{IndexMap, IndexSet};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Returns the stages of a key computed at conversion time
pub type DynamicKeyTypeFn = Arc<dyn Fn(&str, Direction) -> Option<FieldStages> + Send + Sync>;
/// May replace the incoming wire data before conversion
pub type BeforeFromWireHook = Arc<dyn Fn(&DataModel, Value) -> Result<Value> + Send + Sync>;
pub type AfterFromWireHook = Arc<dyn Fn(&mut DataModel) -> Result<()> + Send + Sync>;
pub type BeforeToWireHook = Arc<dyn Fn(&DataModel) -> Result<()> + Send + Sync>;
/// Receives the output map, still keyed by model-side names
pub type AfterToWireHook = Arc<dyn Fn(&DataModel, &mut Object) -> Result<()> + Send + Sync>;

/// Types that must not trigger the structural required-field check
const PROVIDE_CHECK_EXEMPT_TYPES: [&str; 2] = ["undefined", "null"];

/// Naming convention of each side, used when no explicit mapping exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameCaseRule {
    pub model: NameCase,
    pub wire: NameCase,
}

/// Conversion configuration of a model instance
#[derive(Clone, Default)]
pub struct ModelConfig {
    pub conversion_table: ConversionTable,
    pub convert_policy: ConvertPolicy,
    /// Wire-side name to model-side name
    pub name_mapper_wire_to_model: IndexMap<String, String>,
    /// Model-side name to wire-side name
    pub name_mapper_model_to_wire: IndexMap<String, String>,
    pub name_case: Option<NameCaseRule>,
    pub default_date_format: String,
    pub dynamic_key_type: Option<DynamicKeyTypeFn>,
    pub before_from_wire: Option<BeforeFromWireHook>,
    pub after_from_wire: Option<AfterFromWireHook>,
    pub before_to_wire: Option<BeforeToWireHook>,
    pub after_to_wire: Option<AfterToWireHook>,
    pub blacklist_to_wire: IndexSet<String>,
    pub blacklist_to_model: IndexSet<String>,
    /// Do not send `null` or empty-string values
    pub dont_send_if_empty: bool,
    /// Do not send `null` values
    pub dont_send_if_null: bool,
    /// Element model of array mode
    pub array_element: Option<ChildModel>,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("conversion_table", &self.conversion_table)
            .field("convert_policy", &self.convert_policy)
            .field("name_mapper_wire_to_model", &self.name_mapper_wire_to_model)
            .field("name_mapper_model_to_wire", &self.name_mapper_model_to_wire)
            .field("name_case", &self.name_case)
            .field("default_date_format", &self.default_date_format)
            .field("blacklist_to_wire", &self.blacklist_to_wire)
            .field("blacklist_to_model", &self.blacklist_to_model)
            .field("dont_send_if_empty", &self.dont_send_if_empty)
            .field("dont_send_if_null", &self.dont_send_if_null)
            .field("array_element", &self.array_element)
            .finish_non_exhaustive()
    }
}

/// Factory of configured model instances
#[derive(Clone)]
pub struct ModelType {
    name: String,
    factory: Arc<dyn Fn() -> DataModel + Send + Sync>,
}

impl ModelType {
    pub fn new(name: impl Into<String>, factory: impl Fn() -> DataModel + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Model type of a [`ModelDefinition`]
    pub fn of<T: ModelDefinition>() -> Self {
        Self::new(T::model_name(), T::definition)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A fresh instance that remembers this type, which makes it cloneable
    pub fn instantiate(&self) -> DataModel {
        let mut model = (self.factory)();
        model.model_type = Some(self.clone());
        model
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelType({})", self.name)
    }
}

/// A declared model: a type whose definition builds a configured instance
pub trait ModelDefinition: 'static {
    /// Build an empty, configured instance
    fn definition() -> DataModel;

    /// Debug name used in diagnostics
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn model_type() -> ModelType
    where
        Self: Sized,
    {
        ModelType::of::<Self>()
    }
}

/// Builds model instances, either from a declared type or an inline template
pub trait ModelFactory {
    fn create(&self) -> DataModel;
}

impl ModelFactory for ModelType {
    fn create(&self) -> DataModel {
        self.instantiate()
    }
}

impl ModelFactory for Arc<TemplateDefinition> {
    fn create(&self) -> DataModel {
        self.instantiate(None)
    }
}

/// A model instance
#[derive(Clone)]
pub struct DataModel {
    name: String,
    model_type: Option<ModelType>,
    properties: Object,
    config: ModelConfig,
    last_wire_data: Option<Value>,
    array: Option<Vec<Value>>,
}

impl fmt::Debug for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("DataModel");
        debug.field("name", &self.name).field("properties", &self.properties);
        if let Some(array) = &self.array {
            debug.field("array", array);
        }
        debug.finish()
    }
}

impl PartialEq for DataModel {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.properties == other.properties && self.array == other.array
    }
}

impl DataModel {
    /// An empty model with the default configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_type: None,
            properties: Object::new(),
            config: ModelConfig::default(),
            last_wire_data: None,
            array: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> Option<&ModelType> {
        self.model_type.as_ref()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.config
    }

    // Configuration

    pub fn with_table(mut self, table: ConversionTable) -> Self {
        self.config.conversion_table = table;
        self
    }

    pub fn with_policy(mut self, policy: ConvertPolicy) -> Self {
        self.config.convert_policy = policy;
        self
    }

    pub fn with_default_date_format(mut self, format: impl Into<String>) -> Self {
        self.config.default_date_format = format.into();
        self
    }

    pub fn with_dynamic_key_type(
        mut self,
        f: impl Fn(&str, Direction) -> Option<FieldStages> + Send + Sync + 'static,
    ) -> Self {
        self.config.dynamic_key_type = Some(Arc::new(f));
        self
    }

    pub fn with_before_from_wire(
        mut self,
        f: impl Fn(&DataModel, Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.config.before_from_wire = Some(Arc::new(f));
        self
    }

    pub fn with_after_from_wire(
        mut self,
        f: impl Fn(&mut DataModel) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.config.after_from_wire = Some(Arc::new(f));
        self
    }

    pub fn with_before_to_wire(
        mut self,
        f: impl Fn(&DataModel) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.config.before_to_wire = Some(Arc::new(f));
        self
    }

    pub fn with_after_to_wire(
        mut self,
        f: impl Fn(&DataModel, &mut Object) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.config.after_to_wire = Some(Arc::new(f));
        self
    }

    /// Keys never written to the wire side
    pub fn with_blacklist_to_wire<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.blacklist_to_wire.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Keys never read from the wire side
    pub fn with_blacklist_to_model<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.blacklist_to_model.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_dont_send_if_empty(mut self, enabled: bool) -> Self {
        self.config.dont_send_if_empty = enabled;
        self
    }

    pub fn with_dont_send_if_null(mut self, enabled: bool) -> Self {
        self.config.dont_send_if_null = enabled;
        self
    }

    /// Set both name mappings from a wire-to-model table
    pub fn set_name_mapper<I, W, M>(&mut self, wire_to_model: I) -> &mut Self
    where
        I: IntoIterator<Item = (W, M)>,
        W: Into<String>,
        M: Into<String>,
    {
        self.config.name_mapper_wire_to_model.clear();
        self.config.name_mapper_model_to_wire.clear();
        for (wire, model) in wire_to_model {
            let (wire, model) = (wire.into(), model.into());
            self.config
                .name_mapper_model_to_wire
                .insert(model.clone(), wire.clone());
            self.config.name_mapper_wire_to_model.insert(wire, model);
        }
        self
    }

    pub fn with_name_mapper<I, W, M>(mut self, wire_to_model: I) -> Self
    where
        I: IntoIterator<Item = (W, M)>,
        W: Into<String>,
        M: Into<String>,
    {
        self.set_name_mapper(wire_to_model);
        self
    }

    /// Derive names of unmapped keys from the naming convention of each side
    pub fn set_name_case(&mut self, model_case: NameCase, wire_case: NameCase) -> &mut Self {
        self.config.name_case = Some(NameCaseRule {
            model: model_case,
            wire: wire_case,
        });
        self
    }

    pub fn with_name_case(mut self, model_case: NameCase, wire_case: NameCase) -> Self {
        self.set_name_case(model_case, wire_case);
        self
    }

    /// Accept top-level arrays, converting each element with `element`
    pub fn set_array_type(&mut self, element: impl Into<ChildModel>) -> &mut Self {
        self.config.array_element = Some(element.into());
        self
    }

    pub fn with_array_type(mut self, element: impl Into<ChildModel>) -> Self {
        self.set_array_type(element);
        self
    }

    /// Set a property, builder style
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    // Properties

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    /// Copy every entry of `values` onto the property bag
    pub fn extend(&mut self, values: Object) {
        self.properties.extend(values);
    }

    pub fn properties(&self) -> &Object {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Object {
        &mut self.properties
    }

    /// Read a nested value through an object path such as `items[0].name`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let segments = path::parse_path(path).ok()?;
        let (first, rest) = segments.split_first()?;
        let root = match first {
            path::PathSegment::Key(key) => self.properties.get(key)?,
            path::PathSegment::Index(index) => self.array_item(*index)?,
        };
        rest.iter().try_fold(root, |current, segment| path::step(current, segment))
    }

    /// Write a nested value through an object path, creating missing objects
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let (head, tail) = split_first_key(path)?;
        match tail {
            None => {
                self.properties.insert(head.to_string(), value.into());
                Ok(())
            }
            Some(tail) => {
                let slot = self
                    .properties
                    .entry(head.to_string())
                    .or_insert(Value::Undefined);
                path::set_path(slot, tail, value.into())
            }
        }
    }

    /// Wire data of the last `from_wire` call
    pub fn last_wire_data(&self) -> Option<&Value> {
        self.last_wire_data.as_ref()
    }

    /// Plain JSON of the model: `_`-prefixed keys, functions and undefined
    /// values are left out
    pub fn to_plain(&self) -> serde_json::Value {
        if let Some(items) = &self.array {
            return serde_json::Value::Array(items.iter().map(Value::to_json).collect());
        }
        serde_json::Value::Object(
            self.properties
                .iter()
                .filter(|(key, value)| {
                    !key.starts_with('_') && !matches!(value, Value::Undefined | Value::Function(_))
                })
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }

    // Array mode

    /// Whether the model holds a top-level array
    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    pub fn array(&self) -> Option<&[Value]> {
        self.array.as_deref()
    }

    pub fn array_len(&self) -> usize {
        self.array.as_ref().map_or(0, Vec::len)
    }

    pub fn array_item(&self, index: usize) -> Option<&Value> {
        self.array.as_ref().and_then(|items| items.get(index))
    }

    pub fn array_push(&mut self, item: impl Into<Value>) {
        self.array.get_or_insert_with(Vec::new).push(item.into());
    }

    pub fn array_remove(&mut self, index: usize) -> Option<Value> {
        let items = self.array.as_mut()?;
        (index < items.len()).then(|| items.remove(index))
    }

    // Naming

    /// Model-side name of a wire key: explicit mapping, else case rule, else identity
    pub fn model_key_for(&self, wire_key: &str) -> String {
        if let Some(model_key) = self.config.name_mapper_wire_to_model.get(wire_key) {
            return model_key.clone();
        }
        match self.config.name_case {
            Some(rule) => to_case(rule.model, wire_key),
            None => wire_key.to_string(),
        }
    }

    /// Wire-side name of a model key: explicit mapping, else case rule, else identity
    pub fn wire_key_for(&self, model_key: &str) -> String {
        if let Some(wire_key) = self.config.name_mapper_model_to_wire.get(model_key) {
            return wire_key.clone();
        }
        let reverse = self
            .config
            .name_mapper_wire_to_model
            .iter()
            .find(|(_, model)| model.as_str() == model_key);
        if let Some((wire_key, _)) = reverse {
            return wire_key.clone();
        }
        match self.config.name_case {
            Some(rule) => to_case(rule.wire, model_key),
            None => model_key.to_string(),
        }
    }

    fn field_stages(&self, model_key: &str, direction: Direction) -> Option<Cow<'_, FieldStages>> {
        if let Some(dynamic) = &self.config.dynamic_key_type {
            if let Some(stages) = dynamic(model_key, direction) {
                return Some(Cow::Owned(stages));
            }
        }
        self.config.conversion_table.get(model_key).map(Cow::Borrowed)
    }

    fn item_options(&self, direction: Direction, user_options: &ConvertOptions) -> ConvertItemOptions {
        ConvertItemOptions {
            direction,
            policy: self.config.convert_policy,
            default_date_format: self.config.default_date_format.clone(),
            user_options: user_options.clone(),
            model_name: self.name.clone(),
        }
    }

    // from-wire

    /// Populate the model from wire data (a parsed value or JSON text)
    pub fn from_wire(&mut self, data: impl Into<Value>) -> Result<&mut Self> {
        self.from_wire_with(data, &ConvertOptions::default())
    }

    pub fn from_wire_with(&mut self, data: impl Into<Value>, options: &ConvertOptions) -> Result<&mut Self> {
        let registry = global_registry();
        self.from_wire_with_registry(data, options, &registry)
    }

    /// Populate the model using an explicit registry
    pub fn from_wire_with_registry(
        &mut self,
        data: impl Into<Value>,
        options: &ConvertOptions,
        registry: &ConverterRegistry,
    ) -> Result<&mut Self> {
        let options = options.with_global_defaults();
        let scope = ConvertScope {
            registry,
            options: &options,
            key_prefix: "",
        };
        self.from_wire_in(data.into(), &scope)?;
        Ok(self)
    }

    pub(crate) fn from_wire_in(&mut self, data: Value, scope: &ConvertScope<'_>) -> Result<()> {
        self.last_wire_data = Some(data.clone());

        let data = match data {
            Value::String(text) => match Value::parse_json(&text) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(text),
            },
            other => other,
        };

        match data {
            Value::Object(object) => self.from_wire_object(object, scope),
            Value::Model(model) if !model.is_array() => {
                self.from_wire_object(model.properties, scope)
            }
            Value::Model(model) => {
                let items = model.array.unwrap_or_default();
                self.from_wire_items(items, scope)
            }
            Value::Array(items) => self.from_wire_items(items, scope),
            other => self.report_bad_type(other.kind_name(), None),
        }
    }

    fn report_bad_type(&self, source_type: &str, hint: Option<String>) -> Result<()> {
        let err = Error::TryConvertBadType {
            source_type: source_type.to_string(),
            target_type: "object".to_string(),
            model: self.name.clone(),
            hint,
        };
        let policy = self.config.convert_policy;
        if policy.is_strict() {
            return Err(err);
        }
        if policy.is_warning() {
            log::warn!("{}", err);
        }
        Ok(())
    }

    fn from_wire_items(&mut self, items: Vec<Value>, scope: &ConvertScope<'_>) -> Result<()> {
        let Some(element) = self.config.array_element.clone() else {
            return self.report_bad_type(
                "array",
                Some("use transform_array_model or set_array_type to convert arrays".to_string()),
            );
        };

        let options = self.item_options(Direction::ToModel, scope.options);
        let mut converted = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let path = format!("{}[{}]", scope.key_prefix, index);
            let value = match &element {
                ChildModel::Named(model_type) => {
                    let mut model = model_type.instantiate();
                    model.from_wire_in(item, &scope.nested(&path))?;
                    Value::from(model)
                }
                ChildModel::Template(template) => {
                    let mut model = template.instantiate(item.as_object().cloned());
                    model.from_wire_in(item, &scope.nested(&path))?;
                    Value::from(model)
                }
                ChildModel::Primitive(type_name) => {
                    let request = DispatchRequest::new(&path, type_name);
                    scope.registry.dispatch(&item, &request, &options)?
                }
            };
            converted.push(value);
        }
        self.array = Some(converted);
        Ok(())
    }

    fn from_wire_object(&mut self, data: Object, scope: &ConvertScope<'_>) -> Result<()> {
        let data = match self.config.before_from_wire.clone() {
            Some(hook) => match hook(self, Value::Object(data))? {
                Value::Object(object) => object,
                other => return self.report_bad_type(other.kind_name(), None),
            },
            None => data,
        };

        let options = self.item_options(Direction::ToModel, scope.options);
        if !scope.options.provide_check_disabled() {
            self.check_wire_provided(&data)?;
        }

        let mut pending: IndexSet<String> =
            self.config.conversion_table.force_apply_fields().into_iter().collect();
        let policy_required = self.config.convert_policy.is_required();

        for (wire_key, value) in data {
            let model_key = self.model_key_for(&wire_key);
            if self.config.blacklist_to_model.contains(&wire_key)
                || self.config.blacklist_to_model.contains(&model_key)
            {
                continue;
            }
            let path = scope.path_of(&wire_key);
            if !scope.options.allows_key(&path) {
                continue;
            }

            let resolved = match self.field_stages(&model_key, Direction::ToModel) {
                Some(stages) => Some(resolve_field(&value, &stages, &path, &options, scope.registry)?),
                None => None,
            };
            match resolved {
                Some(result) => {
                    pending.shift_remove(&model_key);
                    self.properties.insert(model_key, result);
                }
                None if !policy_required => {
                    self.properties.insert(model_key, value);
                }
                None => {}
            }
        }

        for model_key in pending {
            let path = scope.path_of(&self.wire_key_for(&model_key));
            if !scope.options.allows_key(&path) {
                continue;
            }
            let resolved = match self.field_stages(&model_key, Direction::ToModel) {
                Some(stages) => resolve_field(&Value::Undefined, &stages, &path, &options, scope.registry)?,
                None => continue,
            };
            self.properties.insert(model_key, resolved);
        }

        if let Some(hook) = self.config.after_from_wire.clone() {
            hook(self)?;
        }
        Ok(())
    }

    /// Every mandatory declared field must be present on the wire data
    fn check_wire_provided(&self, data: &Object) -> Result<()> {
        let policy_required = self.config.convert_policy.is_required();
        for (field, stages) in self.config.conversion_table.iter() {
            let Some(side) = stages.first().map(|stage| &stage.model) else {
                continue;
            };
            let type_name = side.type_name();
            if !side.is_required(policy_required)
                || PROVIDE_CHECK_EXEMPT_TYPES.contains(&type_name)
                || DEFAULT_INJECTION_TYPES.contains(&type_name)
            {
                continue;
            }
            let wire_key = self.wire_key_for(field);
            if data.get(&wire_key).map_or(true, Value::is_nullish) {
                return Err(Error::RequiredFieldMissing {
                    key: field.to_string(),
                    wire_key: (wire_key != field).then_some(wire_key),
                    model: self.name.clone(),
                });
            }
        }
        Ok(())
    }

    // to-wire

    /// Produce wire data from the model
    pub fn to_wire(&self) -> Result<Value> {
        self.to_wire_with(&ConvertOptions::default())
    }

    pub fn to_wire_with(&self, options: &ConvertOptions) -> Result<Value> {
        let registry = global_registry();
        self.to_wire_with_registry(options, &registry)
    }

    /// Produce wire data using an explicit registry
    pub fn to_wire_with_registry(&self, options: &ConvertOptions, registry: &ConverterRegistry) -> Result<Value> {
        let options = options.with_global_defaults();
        let scope = ConvertScope {
            registry,
            options: &options,
            key_prefix: "",
        };
        self.to_wire_in(&scope)
    }

    pub(crate) fn to_wire_in(&self, scope: &ConvertScope<'_>) -> Result<Value> {
        if let Some(items) = self.array.as_ref().filter(|items| !items.is_empty()) {
            let mut output = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                output.push(match item {
                    Value::Model(model) => {
                        let path = format!("{}[{}]", scope.key_prefix, index);
                        model.to_wire_in(&scope.nested(&path))?
                    }
                    other => other.clone(),
                });
            }
            return Ok(Value::Array(output));
        }

        if let Some(hook) = &self.config.before_to_wire {
            hook(self)?;
        }

        let options = self.item_options(Direction::ToWire, scope.options);
        if !scope.options.provide_check_disabled() {
            self.check_model_provided()?;
        }

        let mut pending: IndexSet<String> =
            self.config.conversion_table.force_apply_fields().into_iter().collect();
        let policy_required = self.config.convert_policy.is_required();
        let mut output = Object::new();

        for (key, value) in &self.properties {
            if key.starts_with('_') || self.config.blacklist_to_wire.contains(key) {
                continue;
            }
            let path = scope.path_of(&self.wire_key_for(key));
            if !scope.options.allows_key(&path) {
                continue;
            }
            if matches!(value, Value::Undefined | Value::Function(_))
                || (self.config.dont_send_if_null && value.is_null())
                || (self.config.dont_send_if_empty && is_null_or_empty(value))
            {
                continue;
            }

            match self.field_stages(key, Direction::ToWire) {
                Some(stages) => {
                    let result = resolve_field(value, &stages, &path, &options, scope.registry)?;
                    pending.shift_remove(key);
                    output.insert(key.clone(), result);
                }
                None if !policy_required => {
                    output.insert(key.clone(), value.clone());
                }
                None => {}
            }
        }

        for key in pending {
            let path = scope.path_of(&self.wire_key_for(&key));
            if !scope.options.allows_key(&path) {
                continue;
            }
            if let Some(stages) = self.field_stages(&key, Direction::ToWire) {
                let result = resolve_field(&Value::Undefined, &stages, &path, &options, scope.registry)?;
                output.insert(key, result);
            }
        }

        if let Some(hook) = &self.config.after_to_wire {
            hook(self, &mut output)?;
        }

        self.remap_to_wire_names(&mut output)?;
        Ok(Value::Object(output))
    }

    /// Every mandatory declared field must hold a value on the model
    fn check_model_provided(&self) -> Result<()> {
        let policy_required = self.config.convert_policy.is_required();
        for (field, stages) in self.config.conversion_table.iter() {
            let Some(side) = stages.first().map(|stage| &stage.wire) else {
                continue;
            };
            let type_name = side.type_name();
            if !side.is_required(policy_required)
                || PROVIDE_CHECK_EXEMPT_TYPES.contains(&type_name)
                || DEFAULT_INJECTION_TYPES.contains(&type_name)
            {
                continue;
            }
            if self.properties.get(field).map_or(true, Value::is_nullish) {
                let wire_key = self.wire_key_for(field);
                return Err(Error::RequiredFieldMissing {
                    key: field.to_string(),
                    wire_key: (wire_key != field).then_some(wire_key),
                    model: self.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Rename model-side keys to wire-side keys in place
    fn remap_to_wire_names(&self, output: &mut Object) -> Result<()> {
        let keys: Vec<String> = output.keys().cloned().collect();
        for key in keys {
            let wire_key = self.wire_key_for(&key);
            if wire_key == key {
                continue;
            }
            let Some((index, _, value)) = output.shift_remove_full(&key) else {
                continue;
            };
            match output.get_mut(&wire_key) {
                Some(existing) => {
                    if *existing != value {
                        let err = Error::OverlapTable {
                            key: key.clone(),
                            wire_key: wire_key.clone(),
                            model: self.name.clone(),
                        };
                        if self.config.convert_policy.is_strict() {
                            return Err(err);
                        }
                        log::warn!("{}", err);
                    }
                    *existing = value;
                }
                None => {
                    output.shift_insert(index, wire_key, value);
                }
            }
        }
        Ok(())
    }
}

fn is_null_or_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Split `head.rest` or `head[0]...` into the first key and the remaining path
fn split_first_key(path: &str) -> Result<(&str, Option<&str>)> {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    let head = &path[..end];
    if head.is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            message: "path must start with a property name".to_string(),
        });
    }
    let rest = &path[end..];
    match rest.strip_prefix('.') {
        Some(tail) => Ok((head, Some(tail))),
        None if rest.is_empty() => Ok((head, None)),
        None => Ok((head, Some(rest))),
    }
}
