// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{CommissionRate, Money, NotificationKind, OrderStatus, PaymentMethod, ProductId};
use serde_json::json;

#[test]
fn enums_serialize_as_snake_case_strings() {
    assert_eq!(
        serde_json::to_value(OrderStatus::AwaitingPayment).expect("json"),
        json!("awaiting_payment")
    );
    assert_eq!(
        serde_json::to_value(PaymentMethod::CashOnDelivery).expect("json"),
        json!("cash_on_delivery")
    );
    assert_eq!(
        serde_json::to_value(NotificationKind::ProductRejected).expect("json"),
        json!("product_rejected")
    );
}

#[test]
fn numeric_newtypes_validate_during_deserialization() {
    assert!(serde_json::from_value::<Money>(json!(-1)).is_err());
    assert!(serde_json::from_value::<ProductId>(json!(0)).is_err());
    assert!(serde_json::from_value::<CommissionRate>(json!(10_001)).is_err());
    let id: ProductId = serde_json::from_value(json!(12)).expect("id");
    assert_eq!(id.get(), 12);
}
