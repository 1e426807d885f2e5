//! Discovery helpers applied to realistic payloads

mod test_support;

use serde_json::json;
use test_support::OrderLine;
use wiremodel_core::{
    any_to_array, find_best_array, find_one_property, transform_array_model, AnyToArrayOptions,
    ConvertOptions, Error, ModelDefinition, PropertyCondition, Value,
};

fn paged_response() -> Value {
    Value::from(json!({
        "code": 0,
        "message": "ok",
        "result": {
            "page": { "index": 1, "size": 20 },
            "records": [
                { "sku": "pen", "quantity": "2", "price": "150" },
                { "sku": "ink", "quantity": "1", "price": "1925" }
            ]
        }
    }))
}

#[test]
fn test_best_array_feeds_array_transform() {
    let response = paged_response();
    let records = Value::Array(find_best_array(&response).to_vec());
    let lines = transform_array_model(&OrderLine::model_type(), &records, "records", true, &ConvertOptions::default())
        .expect("records should convert");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].get("price"), Some(&Value::Number(19.25)));
}

#[test]
fn test_find_result_property_by_suffix() {
    let response = paged_response();
    let conditions = [
        PropertyCondition::Match("data".to_string()),
        PropertyCondition::EndWith("result".to_string()),
    ];
    let result = find_one_property(&response, &conditions, Some("no result in response"))
        .unwrap()
        .unwrap();
    assert!(result.get("records").is_some());

    let err = find_one_property(&response, &[PropertyCondition::StartWith("items".to_string())], Some("no items"))
        .unwrap_err();
    assert_eq!(err.to_string(), "no items");
    assert!(matches!(err, Error::Assertion { .. }));
}

#[test]
fn test_any_to_array_on_json_text() {
    let text = Value::from(paged_response().to_json_string());
    let items = any_to_array(&text, AnyToArrayOptions::default());
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].get("sku"), Some(&Value::from("pen")));

    let values = any_to_array(&text, AnyToArrayOptions { nest_array: false });
    assert_eq!(values.len(), 3);
}
