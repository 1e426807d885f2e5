//! Bridge between typed structs and the dynamic property bag
//!
//! A [`TypedModel`] lists one [`FieldAccessor`] per struct field; conversion
//! still runs on a [`DataModel`] built from the type's [`ModelType`].

use super::{DataModel, ModelType};
use crate::config::ConvertOptions;
use crate::value::Value;
use crate::Result;

/// Getter/setter pair of one struct field
pub struct FieldAccessor<T> {
    /// Model-side property name
    pub name: &'static str,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, &Value) -> Result<()>,
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldAccessor<T> {}

impl<T> FieldAccessor<T> {
    pub const fn new(
        name: &'static str,
        get: fn(&T) -> Value,
        set: fn(&mut T, &Value) -> Result<()>,
    ) -> Self {
        Self { name, get, set }
    }
}

/// A struct convertible through its model type
pub trait TypedModel: Default + Sized {
    fn model_type() -> ModelType;

    fn fields() -> Vec<FieldAccessor<Self>>;

    /// Read the declared fields out of a converted model; absent and
    /// undefined properties keep their defaults
    fn from_model(model: &DataModel) -> Result<Self> {
        let mut typed = Self::default();
        for field in Self::fields() {
            match model.get(field.name) {
                None | Some(Value::Undefined) => {}
                Some(value) => (field.set)(&mut typed, value)?,
            }
        }
        Ok(typed)
    }

    fn to_model(&self) -> DataModel {
        let mut model = Self::model_type().instantiate();
        for field in Self::fields() {
            model.set(field.name, (field.get)(self));
        }
        model
    }

    fn from_wire(data: impl Into<Value>) -> Result<Self> {
        Self::from_wire_with(data, &ConvertOptions::default())
    }

    fn from_wire_with(data: impl Into<Value>, options: &ConvertOptions) -> Result<Self> {
        let mut model = Self::model_type().instantiate();
        model.from_wire_with(data, options)?;
        Self::from_model(&model)
    }

    fn to_wire(&self) -> Result<Value> {
        self.to_model().to_wire()
    }
}
