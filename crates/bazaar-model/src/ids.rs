// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

macro_rules! row_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value <= 0 {
                    return Err(ValidationError(format!(
                        concat!($kind, " must be positive, got {}"),
                        value
                    )));
                }
                Ok(Self(value))
            }

            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, ValidationError> {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, ValidationError> {
                let parsed = s.trim().parse::<i64>().map_err(|_| {
                    ValidationError(format!(concat!($kind, " must be an integer, got `{}`"), s))
                })?;
                Self::new(parsed)
            }
        }
    };
}

row_id!(SellerId, "seller_id");
row_id!(ProductId, "product_id");
row_id!(CategoryId, "category_id");
row_id!(OrderId, "order_id");
row_id!(OrderItemId, "order_item_id");
row_id!(AddressId, "address_id");
row_id!(NotificationId, "notification_id");
