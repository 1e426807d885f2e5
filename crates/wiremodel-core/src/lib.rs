//! Wiremodel Core - bidirectional conversion between wire data and typed models
//!
//! This crate converts loosely typed wire data (JSON received from or sent to a
//! server) into model instances and back, driven by a declarative per-field
//! conversion table.
//!
//! # Main Components
//!
//! - **Converter Registry**: ordered converter candidates per type name, with
//!   the built-in `string`, `number`, `boolean`, `date`, `array`, `object`,
//!   `map`, `set`, `json`, `multiple` and default-injection converters
//! - **Model Engine**: `from_wire` / `to_wire` over a [`DataModel`], name
//!   mapping, hooks, blacklists, array mode and cloning
//! - **Inline Templates**: table literals usable wherever a model type is
//! - **Discovery**: heuristics to locate lists and properties in payloads
//! - **Utilities**: object-path access and name-case conversion
//!
//! # Example
//!
//! ```
//! use wiremodel_core::{ConversionTable, ConvertPolicy, DataModel, FieldSpec, Result, Value};
//!
//! fn example() -> Result<()> {
//!     let mut order = DataModel::new("Order")
//!         .with_policy(ConvertPolicy::StrictProvided)
//!         .with_table(ConversionTable::new().field("price", FieldSpec::new().model("number").wire("string")));
//!     order.from_wire(r#"{"price": "12.5"}"#)?;
//!     assert_eq!(order.get("price"), Some(&Value::Number(12.5)));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod case;
pub mod config;
pub mod convert;
pub mod date;
pub mod discovery;
pub mod error;
pub mod model;
pub mod path;
pub mod transform;
pub mod value;

// Re-export main types for convenience
pub use error::{ConvertPolicy, Error, Result};
pub use value::{FunctionValue, Object, OrderedMap, OrderedSet, Value};

pub use case::{to_case, NameCase};
pub use config::{ConvertOptions, EngineConfig, KeyFilter};
pub use convert::{
    global_registry, register_converter, unregister_converter, ChildModel, ConvertContext,
    ConvertFailure, ConvertItemOptions, ConvertResult, ConverterConfig, ConverterRegistry,
    Direction, DispatchRequest, Params,
};
pub use date::{ChronoDateAdapter, DateAdapter, DEFAULT_DATE_FORMAT};
pub use discovery::{any_to_array, find_best_array, find_one_property, AnyToArrayOptions, PropertyCondition};
pub use model::{
    CloneOptions, ConversionTable, DataModel, FieldAccessor, FieldSpec, FieldStages, ModelConfig,
    ModelDefinition, ModelFactory, ModelType, TemplateDefinition, TypedModel,
};
pub use path::{get_path, set_path};
pub use transform::{transform_array_model, transform_model, transform_with_converter, ConverterTransform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::CannotClone {
            model: "User".to_string(),
        };
        assert!(err.to_string().contains("User"));
    }
}
