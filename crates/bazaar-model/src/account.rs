// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{optional_len, require_email, require_len};
use crate::{AddressId, NotificationId, ProductId, UserId, ValidationError};

pub const MAX_CART_QUANTITY: u32 = 99;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError(format!("unknown role `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: i64,
}

/// Self-service profile edit; blank strings clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl ProfileChanges {
    /// Trims, validates, and lowercases the e-mail.
    pub fn normalize(
        display_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let display_name = display_name.map(str::trim).filter(|s| !s.is_empty());
        optional_len("display_name", display_name, 100)?;
        let email = email.map(str::trim).filter(|s| !s.is_empty());
        if let Some(e) = email {
            require_email("email", e)?;
        }
        Ok(Self {
            display_name: display_name.map(str::to_string),
            email: email.map(str::to_ascii_lowercase),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
}

impl Address {
    /// Single-line snapshot copied onto an order.
    #[must_use]
    pub fn shipping_label(&self) -> String {
        let mut parts = vec![self.full_name.clone(), self.line1.clone()];
        if let Some(line2) = &self.line2 {
            parts.push(line2.clone());
        }
        parts.push(format!("{} {}", self.postal_code, self.city));
        parts.push(self.country.clone());
        if let Some(phone) = &self.phone {
            parts.push(phone.clone());
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressInput {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_len("full_name", &self.full_name, 1, 120)?;
        require_len("line1", &self.line1, 1, 200)?;
        optional_len("line2", self.line2.as_deref(), 200)?;
        require_len("city", &self.city, 1, 100)?;
        require_len("postal_code", &self.postal_code, 1, 20)?;
        require_len("country", &self.country, 2, 56)?;
        optional_len("phone", self.phone.as_deref(), 32)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ProductApproved,
    ProductRejected,
    SellerApproved,
    SellerRejected,
    SellerSuspended,
    NewOrder,
    OrderStatusChanged,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductApproved => "product_approved",
            Self::ProductRejected => "product_rejected",
            Self::SellerApproved => "seller_approved",
            Self::SellerRejected => "seller_rejected",
            Self::SellerSuspended => "seller_suspended",
            Self::NewOrder => "new_order",
            Self::OrderStatusChanged => "order_status_changed",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "product_approved" => Ok(Self::ProductApproved),
            "product_rejected" => Ok(Self::ProductRejected),
            "seller_approved" => Ok(Self::SellerApproved),
            "seller_rejected" => Ok(Self::SellerRejected),
            "seller_suspended" => Ok(Self::SellerSuspended),
            "new_order" => Ok(Self::NewOrder),
            "order_status_changed" => Ok(Self::OrderStatusChanged),
            other => Err(ValidationError(format!(
                "unknown notification kind `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub added_at: i64,
}

impl CartItem {
    pub fn validate_quantity(quantity: u32) -> Result<(), ValidationError> {
        if quantity == 0 || quantity > MAX_CART_QUANTITY {
            return Err(ValidationError(format!(
                "quantity must be within 1..={MAX_CART_QUANTITY}, got {quantity}"
            )));
        }
        Ok(())
    }
}
