//! Converter registry and dispatch
//!
//! A [`ConverterRegistry`] maps type names to ordered lists of converter
//! candidates. [`ConverterRegistry::dispatch`] tries the candidates of a type
//! in registration order and applies the model's [`ConvertPolicy`] to the
//! outcome.
//!
//! A process-wide registry preloaded with the built-in converters backs the
//! model API; [`register_converter`] and [`unregister_converter`] extend it.
//! Conversions work on a snapshot of it taken at the start of the top-level
//! call.

pub mod built_in;
pub mod chain;
pub mod numeric;
pub mod types;

#[cfg(test)]
mod tests;

pub use chain::{first_success, ChainError, ChainOutcome};
pub use types::{
    ChildModel, ConvertContext, ConvertFailure, ConvertItemOptions, ConvertResult,
    ConverterConfig, ConverterFn, Direction, DispatchRequest, Params, PreRequiredCheckFn,
};
pub(crate) use types::ConvertScope;

use crate::date::{ChronoDateAdapter, DateAdapter, SharedDateAdapter};
use crate::value::Value;
use crate::{ConvertPolicy, Error, Result};
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// Type names whose converters inject defaults and so accept absent sources
pub const DEFAULT_INJECTION_TYPES: [&str; 2] = ["addDefaultValue", "original"];

static GLOBAL_REGISTRY: OnceLock<RwLock<Arc<ConverterRegistry>>> = OnceLock::new();

/// Ordered converter candidates per type name
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: IndexMap<String, Vec<ConverterConfig>>,
    date_adapter: SharedDateAdapter,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters)
            .finish()
    }
}

impl ConverterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            converters: IndexMap::new(),
            date_adapter: Arc::new(ChronoDateAdapter::new()),
        }
    }

    /// A registry holding the built-in converters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.init();
        registry
    }

    /// Reset to exactly the built-in converters
    pub fn init(&mut self) {
        self.converters.clear();
        built_in::register_all(self);
    }

    /// Append a converter to the bucket of its target type.
    ///
    /// Registering the same config twice logs a warning and does nothing.
    pub fn register(&mut self, config: ConverterConfig) {
        let bucket = self.converters.entry(config.target_type.clone()).or_default();
        if bucket.iter().any(|existing| existing.same_as(&config)) {
            log::warn!(
                "Converter {}-{} already registered",
                config.target_type,
                config.key
            );
            return;
        }
        bucket.push(config);
    }

    /// Remove the first converter of `target_type` registered under `key`
    pub fn unregister(&mut self, key: &str, target_type: &str) -> Option<ConverterConfig> {
        let bucket = self.converters.get_mut(target_type)?;
        let index = bucket.iter().position(|config| config.key == key)?;
        Some(bucket.remove(index))
    }

    /// Candidates registered for `type_name`, in registration order
    pub fn converters_for(&self, type_name: &str) -> &[ConverterConfig] {
        self.converters
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.converters.keys().map(String::as_str)
    }

    pub fn date_adapter(&self) -> &dyn DateAdapter {
        self.date_adapter.as_ref()
    }

    pub fn set_date_adapter(&mut self, adapter: SharedDateAdapter) {
        self.date_adapter = adapter;
    }

    /// Convert `source` through the candidates registered for the requested type
    pub fn dispatch(
        &self,
        source: &Value,
        request: &DispatchRequest<'_>,
        options: &ConvertItemOptions,
    ) -> Result<Value> {
        let policy = options.policy;
        let key = request.key;

        if request.type_name.is_empty() {
            if policy.is_strict() {
                return Err(Error::MustProvideDirection {
                    key: key.to_string(),
                    direction: options.direction.to_string(),
                    model: options.model_name.clone(),
                });
            }
            return Ok(source.clone());
        }

        let bucket = self.converters_for(request.type_name);
        if bucket.is_empty() {
            if policy.is_strict() {
                return Err(Error::NoConverterFound {
                    key: key.to_string(),
                    type_name: request.type_name.to_string(),
                    model: options.model_name.clone(),
                });
            }
            if policy.is_warning() {
                log::warn!(
                    "Convert {} failed: no converter was found for type {} (model {}), raw data returned",
                    key,
                    request.type_name,
                    options.model_name
                );
            }
            return Ok(source.clone());
        }

        if request.required
            && !DEFAULT_INJECTION_TYPES.contains(&request.type_name)
            && source.is_nullish()
        {
            if policy.is_strict() {
                return Err(Error::RequiredKeyNull {
                    key: key.to_string(),
                    model: options.model_name.clone(),
                });
            }
            if policy.is_warning() {
                log::warn!(
                    "Convert {} warning: key {} is required but not provided or null (model {})",
                    key,
                    key,
                    options.model_name
                );
            }
        }

        let context = ConvertContext {
            key,
            type_name: request.type_name,
            child_model: request.child_model,
            date_format: request.date_format,
            params: request.params,
            options,
            registry: self,
        };

        let outcome = first_success(bucket, |config| {
            if request.required {
                let missing = config
                    .pre_required_check
                    .as_ref()
                    .and_then(|check| check(source));
                if let Some(reason) = missing {
                    report(
                        policy,
                        format_args!(
                            "Convert {} warning: key {} is required but not provided ({}, converter {})",
                            key, key, reason, config.key
                        ),
                    );
                }
            }
            (config.converter)(source, &context)
        });

        match outcome {
            ChainOutcome::Success(value) => Ok(value),
            ChainOutcome::Aborted(ConvertFailure::Fatal(err)) => Err(*err),
            ChainOutcome::Aborted(failure) => self.all_failed(vec![failure], request, options),
            ChainOutcome::Exhausted(failures) => self.all_failed(failures, request, options),
        }
    }

    fn all_failed(
        &self,
        failures: Vec<ConvertFailure>,
        request: &DispatchRequest<'_>,
        options: &ConvertItemOptions,
    ) -> Result<Value> {
        let messages: Vec<String> = failures.iter().filter_map(ConvertFailure::message).collect();
        if options.policy.is_strict() && request.required {
            log::error!(
                "Convert {} failed: all converters failed for type {}: {}",
                request.key,
                request.type_name,
                messages.join(", ")
            );
            return Err(Error::AllConvertersFailed {
                key: request.key.to_string(),
                type_name: request.type_name.to_string(),
                messages,
                model: options.model_name.clone(),
            });
        }
        report(
            options.policy,
            format_args!(
                "Convert {} failed: all converters failed for type {} (model {}): {}",
                request.key,
                request.type_name,
                options.model_name,
                messages.join(", ")
            ),
        );
        Ok(Value::Undefined)
    }
}

/// Log under strict and warning policies, stay silent under `default`
fn report(policy: ConvertPolicy, message: fmt::Arguments<'_>) {
    if policy.is_strict() || policy.is_warning() {
        log::warn!("{}", message);
    }
}

fn global() -> &'static RwLock<Arc<ConverterRegistry>> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(Arc::new(ConverterRegistry::with_builtins())))
}

/// Edit the process-wide registry, copying it first when a conversion still
/// holds the current snapshot
fn update_global<T>(edit: impl FnOnce(&mut ConverterRegistry) -> T) -> T {
    let mut guard = global().write().unwrap_or_else(|e| e.into_inner());
    edit(Arc::make_mut(&mut guard))
}

/// Snapshot of the process-wide registry.
///
/// Conversions keep the snapshot for the whole top-level call and hold no lock,
/// so hooks and custom converters may register converters; the change applies
/// to later conversions.
pub fn global_registry() -> Arc<ConverterRegistry> {
    global().read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Register a converter on the process-wide registry
pub fn register_converter(config: ConverterConfig) {
    update_global(|registry| registry.register(config));
}

/// Unregister a converter from the process-wide registry
pub fn unregister_converter(key: &str, target_type: &str) -> Option<ConverterConfig> {
    update_global(|registry| registry.unregister(key, target_type))
}

/// Replace the date adapter of the process-wide registry
pub fn set_global_date_adapter(adapter: SharedDateAdapter) {
    update_global(|registry| registry.set_date_adapter(adapter));
}

/// Reset the process-wide registry to the built-in converters
pub fn reset_global_registry() {
    update_global(ConverterRegistry::init);
}

/// Resolve one nested element of an `object`/`array`/`map`/`set` value
/// against the child model of the field
pub(crate) fn resolve_element(
    element: &Value,
    path: &str,
    context: &ConvertContext<'_>,
) -> std::result::Result<Value, ConvertFailure> {
    let scope = ConvertScope {
        registry: context.registry,
        options: &context.options.user_options,
        key_prefix: path,
    };

    match context.direction() {
        Direction::ToWire => match (element, context.child_model) {
            (Value::Model(model), _) => Ok(model.to_wire_in(&scope)?),
            (Value::Object(object), Some(ChildModel::Template(template))) => {
                let model = template.instantiate(Some(object.clone()));
                Ok(model.to_wire_in(&scope)?)
            }
            (Value::Object(object), Some(ChildModel::Named(model_type))) => {
                let mut model = model_type.instantiate();
                model.extend(object.clone());
                Ok(model.to_wire_in(&scope)?)
            }
            (element, Some(ChildModel::Primitive(type_name))) => {
                dispatch_element(element, path, type_name, context)
            }
            (element, _) => Ok(element.clone()),
        },
        Direction::ToModel => match (element, context.child_model) {
            (Value::Model(model), _) => Ok(Value::Model(model.clone())),
            (element, Some(ChildModel::Named(model_type))) => {
                let mut model = model_type.instantiate();
                model.from_wire_in(element.clone(), &scope)?;
                Ok(Value::from(model))
            }
            (element, Some(ChildModel::Template(template))) => {
                // Wire entries seed the child, so undeclared keys survive required policies
                let mut model = template.instantiate(element.as_object().cloned());
                model.from_wire_in(element.clone(), &scope)?;
                Ok(Value::from(model))
            }
            (element, Some(ChildModel::Primitive(type_name))) => {
                dispatch_element(element, path, type_name, context)
            }
            (element, None) => Ok(element.clone()),
        },
    }
}

fn dispatch_element(
    element: &Value,
    path: &str,
    type_name: &str,
    context: &ConvertContext<'_>,
) -> std::result::Result<Value, ConvertFailure> {
    let request = DispatchRequest {
        key: path,
        type_name,
        required: false,
        params: None,
        child_model: None,
        date_format: context.date_format,
    };
    Ok(context
        .registry
        .dispatch(element, &request, context.options)?)
}
