//! Fluent construction of field specs and conversion tables
//!
//! ```
//! use wiremodel_core::{ConversionTable, FieldSpec};
//!
//! let table = ConversionTable::new()
//!     .field("name", FieldSpec::new().model("string").wire("string"))
//!     .field(
//!         "price",
//!         vec![
//!             FieldSpec::new().model("number").wire("number"),
//!             FieldSpec::new()
//!                 .model("multiple")
//!                 .model_param("type", "divide")
//!                 .model_param("multiple", 100)
//!                 .wire("multiple")
//!                 .wire_param("type", "multiply")
//!                 .wire_param("multiple", 100),
//!         ],
//!     );
//! assert_eq!(table.len(), 2);
//! ```

use super::field::{ConversionTable, FieldSpec, FieldStages};
use crate::convert::{ChildModel, ConvertItemOptions, Direction};
use crate::value::Value;
use crate::Result;
use std::sync::Arc;

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter type used towards the model side
    pub fn model(self, type_name: impl Into<String>) -> Self {
        self.with_type(Direction::ToModel, type_name)
    }

    /// Converter type used towards the wire side
    pub fn wire(self, type_name: impl Into<String>) -> Self {
        self.with_type(Direction::ToWire, type_name)
    }

    pub fn model_required(self, required: bool) -> Self {
        self.with_required(Direction::ToModel, required)
    }

    pub fn wire_required(self, required: bool) -> Self {
        self.with_required(Direction::ToWire, required)
    }

    pub fn model_date_format(mut self, format: impl Into<String>) -> Self {
        self.model.date_format = Some(format.into());
        self
    }

    pub fn wire_date_format(mut self, format: impl Into<String>) -> Self {
        self.wire.date_format = Some(format.into());
        self
    }

    pub fn model_child(mut self, child: impl Into<ChildModel>) -> Self {
        self.model.child_model = Some(child.into());
        self
    }

    pub fn wire_child(mut self, child: impl Into<ChildModel>) -> Self {
        self.wire.child_model = Some(child.into());
        self
    }

    pub fn model_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model.params.insert(name.into(), value.into());
        self
    }

    pub fn wire_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.wire.params.insert(name.into(), value.into());
        self
    }

    /// Bypass the registry towards the model side
    pub fn custom_to_model(
        mut self,
        f: impl Fn(&Value, &FieldSpec, &ConvertItemOptions) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.model.custom_fn = Some(Arc::new(f));
        self
    }

    /// Bypass the registry towards the wire side
    pub fn custom_to_wire(
        mut self,
        f: impl Fn(&Value, &FieldSpec, &ConvertItemOptions) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.wire.custom_fn = Some(Arc::new(f));
        self
    }

    pub fn model_presolve(
        mut self,
        f: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.model.presolve = Some(Arc::new(f));
        self
    }

    pub fn wire_presolve(
        mut self,
        f: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.wire.presolve = Some(Arc::new(f));
        self
    }

    pub fn force_apply(mut self) -> Self {
        self.force_apply = true;
        self
    }

    fn with_type(mut self, direction: Direction, type_name: impl Into<String>) -> Self {
        self.side_mut(direction).type_name = Some(type_name.into());
        self
    }

    fn with_required(mut self, direction: Direction, required: bool) -> Self {
        self.side_mut(direction).required = Some(required);
        self
    }
}

impl ConversionTable {
    /// Add a field, replacing any previous declaration
    pub fn field(mut self, name: impl Into<String>, stages: impl Into<FieldStages>) -> Self {
        self.insert(name, stages);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_both_sides() {
        let spec = FieldSpec::new()
            .model("number")
            .model_required(false)
            .wire("string")
            .wire_date_format("YYYY")
            .model_param("defaultValue", 15)
            .force_apply();
        assert_eq!(spec.model.type_name(), "number");
        assert_eq!(spec.model.required, Some(false));
        assert_eq!(spec.wire.type_name(), "string");
        assert_eq!(spec.wire.date_format.as_deref(), Some("YYYY"));
        assert_eq!(spec.model.params.get("defaultValue"), Some(&Value::from(15)));
        assert!(spec.force_apply);
    }

    #[test]
    fn test_table_collects_force_apply_fields() {
        let table = ConversionTable::new()
            .field("a", FieldSpec::new().model("string"))
            .field(
                "b",
                vec![
                    FieldSpec::new().model("addDefaultValue").force_apply(),
                    FieldSpec::new().model("number"),
                ],
            );
        assert_eq!(table.force_apply_fields(), vec!["b".to_string()]);
        assert_eq!(table.get("b").map(FieldStages::len), Some(2));
    }
}
