// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{optional_len, require_email, require_len};
use crate::{SellerId, UserId, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl SellerStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
        }
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Suspended)
                | (Self::Suspended, Self::Approved)
                | (Self::Rejected, Self::Pending)
        )
    }
}

impl Display for SellerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SellerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "suspended" => Ok(Self::Suspended),
            other => Err(ValidationError(format!("unknown seller status `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub user_id: UserId,
    pub shop_name: String,
    pub description: Option<String>,
    pub contact_email: String,
    pub phone: Option<String>,
    pub status: SellerStatus,
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Seller {
    #[must_use]
    pub fn is_trading(&self) -> bool {
        self.status == SellerStatus::Approved
    }
}

/// Onboarding form submitted by a user who wants to sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SellerApplication {
    pub shop_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub contact_email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl SellerApplication {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_len("shop_name", &self.shop_name, 2, 120)?;
        optional_len("description", self.description.as_deref(), 2000)?;
        require_email("contact_email", &self.contact_email)?;
        optional_len("phone", self.phone.as_deref(), 32)?;
        Ok(())
    }

    /// Trimmed copy stored by the repository.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            shop_name: self.shop_name.trim().to_string(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            contact_email: self.contact_email.trim().to_ascii_lowercase(),
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}
