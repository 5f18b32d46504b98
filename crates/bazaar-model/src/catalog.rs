// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{optional_len, require_len};
use crate::{CategoryId, Money, ProductId, SellerId, ValidationError};

pub const PRODUCT_NAME_MAX_LEN: usize = 200;
pub const PRODUCT_DESCRIPTION_MAX_LEN: usize = 5000;
pub const PRODUCT_STOCK_MAX: i64 = 1_000_000;
pub const IMAGE_URL_MAX_LEN: usize = 2048;
pub const SLUG_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl NewCategory {
    /// Validates the name and resolves the slug, deriving it from the name when absent.
    pub fn resolve_slug(&self) -> Result<String, ValidationError> {
        require_len("name", &self.name, 1, 80)?;
        match &self.slug {
            Some(raw) => parse_slug(raw),
            None => parse_slug(&slugify(&self.name)),
        }
    }
}

pub fn parse_slug(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("slug must not be empty".to_string()));
    }
    if s.len() > SLUG_MAX_LEN {
        return Err(ValidationError(format!(
            "slug exceeds max length {SLUG_MAX_LEN}"
        )));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError("slug must match [a-z0-9-]+".to_string()));
    }
    if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
        return Err(ValidationError(
            "slug must not start/end with '-' or contain '--'".to_string(),
        ));
    }
    Ok(s.to_string())
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProductStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub const fn can_approve(self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }

    #[must_use]
    pub const fn can_reject(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ValidationError(format!("unknown product status `{other}`"))),
        }
    }
}

/// Listing order for catalog searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }
}

impl FromStr for ProductSort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            other => Err(ValidationError(format!("unknown sort `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock: i64,
    pub image_url: Option<String>,
    pub status: ProductStatus,
    pub rejection_reason: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Price a buyer pays per unit right now.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }

    /// Approved and switched on. Seller standing is checked separately.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Approved && self.is_active
    }
}

/// Seller input for a new listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_len("name", &self.name, 1, PRODUCT_NAME_MAX_LEN)?;
        optional_len(
            "description",
            self.description.as_deref(),
            PRODUCT_DESCRIPTION_MAX_LEN,
        )?;
        validate_pricing(self.price, self.discount_price)?;
        validate_stock(self.stock)?;
        validate_image_url(self.image_url.as_deref())
    }
}

/// Partial update of a listing. `clear_discount` removes an existing discount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub discount_price: Option<Money>,
    #[serde(default)]
    pub clear_discount: bool,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Changes to what the listing claims (text, price, category) need another review.
    #[must_use]
    pub fn requires_review(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.price.is_some()
            || self.discount_price.is_some()
            || self.clear_discount
            || self.category_id.is_some()
    }

    /// Applies the patch onto `current`, validating the merged result.
    pub fn apply_to(&self, current: &Product) -> Result<Product, ValidationError> {
        if self.clear_discount && self.discount_price.is_some() {
            return Err(ValidationError(
                "discount_price and clear_discount are mutually exclusive".to_string(),
            ));
        }
        let mut next = current.clone();
        if let Some(name) = &self.name {
            require_len("name", name, 1, PRODUCT_NAME_MAX_LEN)?;
            next.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            optional_len("description", Some(description), PRODUCT_DESCRIPTION_MAX_LEN)?;
            let trimmed = description.trim();
            next.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(price) = self.price {
            next.price = price;
        }
        if self.clear_discount {
            next.discount_price = None;
        } else if let Some(discount) = self.discount_price {
            next.discount_price = Some(discount);
        }
        validate_pricing(next.price, next.discount_price)?;
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
            next.stock = stock;
        }
        if let Some(category) = self.category_id {
            next.category_id = Some(category);
        }
        if let Some(url) = &self.image_url {
            validate_image_url(Some(url))?;
            next.image_url = Some(url.trim().to_string());
        }
        Ok(next)
    }
}

fn validate_pricing(price: Money, discount: Option<Money>) -> Result<(), ValidationError> {
    if price.is_zero() {
        return Err(ValidationError("price must be greater than zero".to_string()));
    }
    if let Some(d) = discount {
        if d.is_zero() || d >= price {
            return Err(ValidationError(format!(
                "discount_price {d} must be above zero and below price {price}"
            )));
        }
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<(), ValidationError> {
    if !(0..=PRODUCT_STOCK_MAX).contains(&stock) {
        return Err(ValidationError(format!(
            "stock must be within 0..={PRODUCT_STOCK_MAX}, got {stock}"
        )));
    }
    Ok(())
}

fn validate_image_url(url: Option<&str>) -> Result<(), ValidationError> {
    let Some(url) = url else {
        return Ok(());
    };
    let url = url.trim();
    if url.len() > IMAGE_URL_MAX_LEN {
        return Err(ValidationError(format!(
            "image_url exceeds max length {IMAGE_URL_MAX_LEN}"
        )));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ValidationError(
            "image_url must be an http(s) URL".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Home & Garden "), "home-garden");
        assert_eq!(slugify("Books"), "books");
        let cat = NewCategory {
            name: "Kids' Toys!".to_string(),
            slug: None,
        };
        assert_eq!(cat.resolve_slug().expect("slug"), "kids-toys");
    }

    #[test]
    fn explicit_slug_is_validated() {
        assert!(parse_slug("ok-slug-1").is_ok());
        assert!(parse_slug("Bad").is_err());
        assert!(parse_slug("-edge").is_err());
        assert!(parse_slug("a--b").is_err());
    }

    #[test]
    fn status_gates_match_moderation_rules() {
        assert!(ProductStatus::Pending.can_approve());
        assert!(ProductStatus::Rejected.can_approve());
        assert!(!ProductStatus::Approved.can_approve());
        assert!(ProductStatus::Approved.can_reject());
        assert!(!ProductStatus::Rejected.can_reject());
    }
}
