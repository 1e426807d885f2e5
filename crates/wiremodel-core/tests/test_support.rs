//! Shared test support utilities for integration tests

#![allow(dead_code)]

use serde_json::json;
use wiremodel_core::{
    ConversionTable, ConvertPolicy, DataModel, FieldSpec, ModelDefinition, ModelType, Value,
};

/// Order line: numeric quantity, price stored in cents on the wire
pub struct OrderLine;

impl ModelDefinition for OrderLine {
    fn definition() -> DataModel {
        DataModel::new("OrderLine")
            .with_policy(ConvertPolicy::StrictProvided)
            .with_table(
                ConversionTable::new()
                    .field("sku", FieldSpec::new().model("string").wire("string"))
                    .field("quantity", FieldSpec::new().model("number").wire("number"))
                    .field(
                        "price",
                        vec![
                            FieldSpec::new().model("number").wire("number"),
                            FieldSpec::new()
                                .model("multiple")
                                .model_param("type", "divide")
                                .model_param("multiple", 100)
                                .wire("multiple")
                                .wire_param("type", "multiply")
                                .wire_param("multiple", 100),
                        ],
                    ),
            )
    }
}

/// Order with snake_case wire names, nested lines and a creation date
pub struct Order;

impl ModelDefinition for Order {
    fn definition() -> DataModel {
        DataModel::new("Order")
            .with_policy(ConvertPolicy::StrictRequired)
            .with_name_mapper([("order_no", "orderNumber"), ("created_at", "createdAt")])
            .with_table(
                ConversionTable::new()
                    .field("orderNumber", FieldSpec::new().model("string").wire("string"))
                    .field("paid", FieldSpec::new().model("boolean").wire("boolean"))
                    .field(
                        "lines",
                        FieldSpec::new()
                            .model("array")
                            .model_child(OrderLine::model_type())
                            .wire("array"),
                    )
                    .field(
                        "createdAt",
                        FieldSpec::new()
                            .model("date")
                            .wire("string")
                            .wire_date_format("YYYY-MM-DD"),
                    ),
            )
    }
}

pub fn order_type() -> ModelType {
    Order::model_type()
}

/// Wire payload of an [`Order`]
pub fn order_payload() -> Value {
    Value::from(json!({
        "order_no": "A-100",
        "paid": "true",
        "created_at": "2024-03-05T10:00:00+00:00",
        "lines": [
            { "sku": "pen", "quantity": "2", "price": "150" },
            { "sku": "ink", "quantity": 1, "price": 1925 }
        ]
    }))
}
