//! One-call conversion helpers

use crate::config::ConvertOptions;
use crate::convert::{global_registry, ChildModel, ConvertItemOptions, Direction, DispatchRequest};
use crate::model::{DataModel, ModelFactory};
use crate::value::Value;
use crate::{ConvertPolicy, Error, Result};

/// Debug name reported by [`transform_with_converter`]
const TRANSFORM_MODEL_NAME: &str = "transform_with_converter";

/// Convert wire data into a new instance of `factory`
pub fn transform_model<F: ModelFactory>(
    factory: &F,
    source: impl Into<Value>,
    options: &ConvertOptions,
) -> Result<DataModel> {
    let mut model = factory.create();
    model.from_wire_with(source, options)?;
    Ok(model)
}

/// Convert each element of a wire list into a new instance of `factory`.
///
/// Sets and maps are converted through their values. An absent or non-list
/// source is an error when `throw_if_fail` is set, and an empty list otherwise.
pub fn transform_array_model<F: ModelFactory>(
    factory: &F,
    source: &Value,
    key: &str,
    throw_if_fail: bool,
    options: &ConvertOptions,
) -> Result<Vec<DataModel>> {
    let items: Vec<&Value> = match source {
        Value::Undefined => {
            return fail_or_empty(throw_if_fail, Error::ArrayRequiredKeyMissing { key: key.to_string() })
        }
        Value::Array(items) => items.iter().collect(),
        Value::Set(set) => set.iter().collect(),
        Value::Map(map) => map.values().collect(),
        _ => return fail_or_empty(throw_if_fail, Error::ArrayIsNotArray { key: key.to_string() }),
    };

    items
        .into_iter()
        .map(|item| transform_model(factory, item.clone(), options))
        .collect()
}

fn fail_or_empty(throw_if_fail: bool, err: Error) -> Result<Vec<DataModel>> {
    if throw_if_fail {
        Err(err)
    } else {
        log::debug!("{}", err);
        Ok(Vec::new())
    }
}

/// Options of [`transform_with_converter`]
#[derive(Debug, Clone)]
pub struct ConverterTransform<'a> {
    /// Name reported in diagnostics
    pub key: &'a str,
    pub child_model: Option<&'a ChildModel>,
    pub default_date_format: &'a str,
    pub policy: ConvertPolicy,
    pub options: ConvertOptions,
}

impl Default for ConverterTransform<'_> {
    fn default() -> Self {
        Self {
            key: "root",
            child_model: None,
            default_date_format: crate::date::DEFAULT_DATE_FORMAT,
            policy: ConvertPolicy::StrictRequired,
            options: ConvertOptions::default(),
        }
    }
}

/// Convert a single value to the model side with the converters of `type_name`
pub fn transform_with_converter(
    type_name: &str,
    source: &Value,
    transform: &ConverterTransform<'_>,
) -> Result<Value> {
    let item_options = ConvertItemOptions {
        direction: Direction::ToModel,
        policy: transform.policy,
        default_date_format: transform.default_date_format.to_string(),
        user_options: transform.options.with_global_defaults(),
        model_name: TRANSFORM_MODEL_NAME.to_string(),
    };
    let request = DispatchRequest {
        key: transform.key,
        type_name,
        required: true,
        params: None,
        child_model: transform.child_model,
        date_format: None,
    };
    global_registry().dispatch(source, &request, &item_options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversionTable, FieldSpec, TemplateDefinition};
    use serde_json::json;
    use std::sync::Arc;

    fn template() -> Arc<TemplateDefinition> {
        Arc::new(TemplateDefinition::new(
            ConversionTable::new().field("count", FieldSpec::new().model("number")),
        ))
    }

    #[test]
    fn test_transform_model_with_template() {
        let model = transform_model(&template(), Value::from(json!({ "count": "12" })), &ConvertOptions::default()).unwrap();
        assert_eq!(model.get("count"), Some(&Value::Number(12.0)));
    }

    #[test]
    fn test_transform_array_model() {
        let source = Value::from(json!([{ "count": "1" }, { "count": 2 }]));
        let models = transform_array_model(&template(), &source, "list", true, &ConvertOptions::default()).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].get("count"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_transform_array_model_errors() {
        let options = ConvertOptions::default();
        let err = transform_array_model(&template(), &Value::Undefined, "list", true, &options).unwrap_err();
        assert!(matches!(err, Error::ArrayRequiredKeyMissing { .. }));

        let err = transform_array_model(&template(), &Value::from("x"), "list", true, &options).unwrap_err();
        assert!(matches!(err, Error::ArrayIsNotArray { ref key } if key == "list"));

        let models = transform_array_model(&template(), &Value::from("x"), "list", false, &options).unwrap();
        assert!(models.is_empty());
    }

    #[test]
    fn test_transform_with_converter() {
        let transform = ConverterTransform::default();
        let value = transform_with_converter("number", &Value::from("3.5"), &transform).unwrap();
        assert_eq!(value, Value::Number(3.5));

        let err = transform_with_converter("number", &Value::Null, &transform).unwrap_err();
        assert!(matches!(err, Error::RequiredKeyNull { ref key, .. } if key == "root"));
    }
}
