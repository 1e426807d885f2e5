//! Model cloning

use super::DataModel;
use crate::value::{Object, OrderedMap, OrderedSet, Value};
use crate::{Error, Result};

/// What [`DataModel::clone_model`] copies besides primitive properties
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Rebuild nested models and containers element by element
    pub deep_clone: bool,
    /// Copy function-valued properties
    pub clone_function: bool,
    /// Copy the conversion configuration and `_`-prefixed properties,
    /// functions included
    pub clone_config: bool,
}

impl CloneOptions {
    pub fn deep() -> Self {
        Self {
            deep_clone: true,
            ..Self::default()
        }
    }

    pub fn with_functions(mut self) -> Self {
        self.clone_function = true;
        self
    }

    pub fn with_config(mut self) -> Self {
        self.clone_config = true;
        self
    }
}

impl DataModel {
    /// A fresh instance of the same model type carrying this model's data.
    ///
    /// Fails with [`Error::CannotClone`] when the model was not created from a
    /// model type or template.
    pub fn clone_model(&self, options: CloneOptions) -> Result<DataModel> {
        let model_type = self.model_type.as_ref().ok_or_else(|| Error::CannotClone {
            model: self.name.clone(),
        })?;

        let mut copy = model_type.instantiate();
        if options.clone_config {
            copy.config = self.config.clone();
        }

        for (key, value) in &self.properties {
            let private = key.starts_with('_');
            if private && !options.clone_config {
                continue;
            }
            // Functions kept under `_` keys belong to the configuration
            if matches!(value, Value::Function(_)) && !options.clone_function && !private {
                continue;
            }
            copy.properties.insert(key.clone(), clone_value(value, options)?);
        }

        copy.array = match &self.array {
            Some(items) => Some(
                items
                    .iter()
                    .map(|item| clone_value(item, options))
                    .collect::<Result<_>>()?,
            ),
            None => None,
        };
        copy.last_wire_data = self.last_wire_data.clone();
        Ok(copy)
    }
}

fn clone_value(value: &Value, options: CloneOptions) -> Result<Value> {
    if !options.deep_clone {
        return Ok(value.clone());
    }
    Ok(match value {
        Value::Model(model) if model.model_type.is_some() => Value::from(model.clone_model(options)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| clone_value(item, options))
                .collect::<Result<_>>()?,
        ),
        Value::Object(object) => {
            let mut copy = Object::with_capacity(object.len());
            for (key, item) in object {
                copy.insert(key.clone(), clone_value(item, options)?);
            }
            Value::Object(copy)
        }
        Value::Map(map) => {
            let mut copy = OrderedMap::new();
            for (key, item) in map.iter() {
                copy.insert(clone_value(key, options)?, clone_value(item, options)?);
            }
            Value::Map(copy)
        }
        Value::Set(set) => Value::Set(
            set.iter()
                .map(|item| clone_value(item, options))
                .collect::<Result<OrderedSet>>()?,
        ),
        other => other.clone(),
    })
}
