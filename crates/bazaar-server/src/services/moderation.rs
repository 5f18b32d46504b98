// SPDX-License-Identifier: Apache-2.0

//! Admin review of product listings.

use bazaar_model::{NotificationKind, Product, ProductId, ProductStatus, ValidationError};
use bazaar_store::Store;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::services::notify;

pub const REASON_MAX_LEN: usize = 500;

/// Trimmed, non-empty, bounded moderation reason.
pub(crate) fn normalize_reason(raw: &str) -> Result<String, ServiceError> {
    let reason = raw.trim();
    if reason.is_empty() {
        return Err(ValidationError::new("reason must not be empty").into());
    }
    if reason.chars().count() > REASON_MAX_LEN {
        return Err(
            ValidationError::new(format!("reason exceeds max length {REASON_MAX_LEN}")).into(),
        );
    }
    Ok(reason.to_string())
}

fn notify_owner(store: &Store, product: &Product, kind: NotificationKind, message: &str, now: i64) {
    match store.get_seller(product.seller_id) {
        Ok(seller) => notify(store, &seller.user_id, kind, message, now),
        Err(e) => warn!(
            product_id = product.id.get(),
            seller_id = product.seller_id.get(),
            "product owner lookup failed: {e}"
        ),
    }
}

pub fn approve_product(store: &Store, now: i64, id: ProductId) -> Result<Product, ServiceError> {
    let current = store.get_product(id)?;
    if !current.status.can_approve() {
        return Err(ServiceError::invalid_transition(
            "product",
            current.status,
            ProductStatus::Approved,
        ));
    }
    let product =
        store.set_product_status(id, current.status, ProductStatus::Approved, true, None, now)?;
    notify_owner(
        store,
        &product,
        NotificationKind::ProductApproved,
        &format!("Your product \"{}\" was approved and is now listed", product.name),
        now,
    );
    info!(product_id = id.get(), seller_id = product.seller_id.get(), "product approved");
    Ok(product)
}

pub fn reject_product(
    store: &Store,
    now: i64,
    id: ProductId,
    reason: &str,
) -> Result<Product, ServiceError> {
    let reason = normalize_reason(reason)?;
    let current = store.get_product(id)?;
    if !current.status.can_reject() {
        return Err(ServiceError::invalid_transition(
            "product",
            current.status,
            ProductStatus::Rejected,
        ));
    }
    let product = store.set_product_status(
        id,
        current.status,
        ProductStatus::Rejected,
        false,
        Some(&reason),
        now,
    )?;
    notify_owner(
        store,
        &product,
        NotificationKind::ProductRejected,
        &format!("Your product \"{}\" was rejected: {reason}", product.name),
        now,
    );
    info!(product_id = id.get(), seller_id = product.seller_id.get(), "product rejected");
    Ok(product)
}
