// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AddressId, Money, OrderId, OrderItemId, ProductId, SellerId, UserId, ValidationError};

pub const INLINE_ADDRESS_MAX_LEN: usize = 500;
pub const MAX_LINE_ITEMS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AwaitingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::AwaitingPayment,
        Self::Paid,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Orders in these states block a second order for the same products.
    #[must_use]
    pub const fn is_unsettled(self) -> bool {
        matches!(self, Self::Pending | Self::AwaitingPayment)
    }

    #[must_use]
    pub const fn buyer_may_cancel(self) -> bool {
        self.is_unsettled()
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Cancelled)
                | (Self::AwaitingPayment, Self::Paid)
                | (Self::AwaitingPayment, Self::Cancelled)
                | (Self::Paid, Self::Processing)
                | (Self::Paid, Self::Refunded)
                | (Self::Paid, Self::Cancelled)
                | (Self::Processing, Self::Shipped)
                | (Self::Processing, Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Refunded)
        )
    }

    /// Whether stock goes back to the shelf when entering this state.
    #[must_use]
    pub const fn restocks(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError(format!("unknown order status `{s}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    BankTransfer,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::BankTransfer => "bank_transfer",
        }
    }

    #[must_use]
    pub const fn initial_status(self) -> OrderStatus {
        match self {
            Self::CashOnDelivery => OrderStatus::Pending,
            Self::BankTransfer => OrderStatus::AwaitingPayment,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(ValidationError(format!("unknown payment method `{other}`"))),
        }
    }
}

/// Per-item progress owned by the seller of that item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Cancelled)
                | (Self::Shipped, Self::Cancelled)
        )
    }
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ValidationError(format!(
                "unknown fulfillment status `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub total: Money,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub seller_amount: Money,
    pub status: FulfillmentStatus,
}

/// One line of a checkout request, carrying the price the buyer saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl LineItemRequest {
    /// Rejects empty, oversized or duplicated line lists.
    pub fn validate_all(items: &[Self]) -> Result<(), ValidationError> {
        if items.is_empty() {
            return Err(ValidationError("order must contain at least one item".to_string()));
        }
        if items.len() > MAX_LINE_ITEMS {
            return Err(ValidationError(format!(
                "order exceeds {MAX_LINE_ITEMS} line items"
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for item in items {
            if item.quantity == 0 || item.quantity > crate::MAX_CART_QUANTITY {
                return Err(ValidationError(format!(
                    "quantity for product {} must be within 1..={}",
                    item.product_id,
                    crate::MAX_CART_QUANTITY
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(ValidationError(format!(
                    "product {} appears more than once",
                    item.product_id
                )));
            }
        }
        Ok(())
    }
}

/// Where an order ships: a saved address or free text typed at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingTarget {
    Stored(AddressId),
    Inline(String),
}

impl ShippingTarget {
    pub fn from_parts(
        address_id: Option<AddressId>,
        inline: Option<&str>,
    ) -> Result<Self, ValidationError> {
        match (address_id, inline.map(str::trim)) {
            (Some(_), Some(_)) => Err(ValidationError(
                "provide either address_id or shipping_address, not both".to_string(),
            )),
            (Some(id), None) => Ok(Self::Stored(id)),
            (None, Some(text)) if text.is_empty() => Err(ValidationError(
                "shipping_address must not be empty".to_string(),
            )),
            (None, Some(text)) if text.chars().count() > INLINE_ADDRESS_MAX_LEN => {
                Err(ValidationError(format!(
                    "shipping_address exceeds max length {INLINE_ADDRESS_MAX_LEN}"
                )))
            }
            (None, Some(text)) => Ok(Self::Inline(text.to_string())),
            (None, None) => Err(ValidationError(
                "address_id or shipping_address is required".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_roundtrip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().expect("parse"), status);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn terminal_states_have_no_exits_except_delivered_refund() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
            assert!(!OrderStatus::Refunded.can_transition_to(next));
        }
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Refunded));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn payment_method_picks_initial_status() {
        assert_eq!(
            PaymentMethod::CashOnDelivery.initial_status(),
            OrderStatus::Pending
        );
        assert_eq!(
            PaymentMethod::BankTransfer.initial_status(),
            OrderStatus::AwaitingPayment
        );
    }

    #[test]
    fn shipping_target_requires_exactly_one_source() {
        let id = AddressId::new(3).expect("id");
        assert_eq!(
            ShippingTarget::from_parts(Some(id), None).expect("stored"),
            ShippingTarget::Stored(id)
        );
        assert!(ShippingTarget::from_parts(Some(id), Some("x")).is_err());
        assert!(ShippingTarget::from_parts(None, None).is_err());
        assert!(ShippingTarget::from_parts(None, Some("   ")).is_err());
        assert_eq!(
            ShippingTarget::from_parts(None, Some(" 1 Main St ")).expect("inline"),
            ShippingTarget::Inline("1 Main St".to_string())
        );
    }
}
