// SPDX-License-Identifier: Apache-2.0

//! Seller-side catalog changes: create, edit, toggle, delete.

use bazaar_model::{
    Product, ProductDraft, ProductId, ProductPatch, ProductStatus, Seller, ValidationError,
};
use bazaar_store::Store;
use tracing::info;

use crate::error::ServiceError;

pub const WITHDRAWN_REASON: &str = "withdrawn by seller";

/// Outcome of a seller delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// The product appears on orders, so it was hidden instead.
    Archived(Product),
}

/// Products of other sellers read as missing.
fn owned_product(store: &Store, seller: &Seller, id: ProductId) -> Result<Product, ServiceError> {
    let product = store.get_product(id)?;
    if product.seller_id != seller.id {
        return Err(ServiceError::NotFound(format!("product {id}")));
    }
    Ok(product)
}

pub fn create_product(
    store: &Store,
    now: i64,
    seller: &Seller,
    draft: &ProductDraft,
) -> Result<Product, ServiceError> {
    let product = store.insert_product(seller.id, draft, now)?;
    info!(
        product_id = product.id.get(),
        seller_id = seller.id.get(),
        "product submitted for review"
    );
    Ok(product)
}

/// Applies a patch. Edits to what the listing claims send an approved or
/// rejected product back to review and take it off the storefront.
pub fn update_product(
    store: &Store,
    now: i64,
    seller: &Seller,
    id: ProductId,
    patch: &ProductPatch,
) -> Result<Product, ServiceError> {
    if patch.is_empty() {
        return Err(ValidationError::new("patch changes nothing").into());
    }
    let current = owned_product(store, seller, id)?;
    let mut next = patch.apply_to(&current)?;
    let rereview = patch.requires_review() && current.status != ProductStatus::Pending;
    if rereview {
        next.status = ProductStatus::Pending;
        next.is_active = false;
        next.rejection_reason = None;
    }
    next.updated_at = now.max(current.updated_at + 1);
    let product = store.update_product(&current, &next)?;
    info!(
        product_id = id.get(),
        seller_id = seller.id.get(),
        rereview,
        "product updated"
    );
    Ok(product)
}

pub fn set_active(
    store: &Store,
    now: i64,
    seller: &Seller,
    id: ProductId,
    active: bool,
) -> Result<Product, ServiceError> {
    let current = owned_product(store, seller, id)?;
    if current.status != ProductStatus::Approved {
        return Err(ServiceError::Conflict(format!(
            "product {id} is {}; only approved products can be toggled",
            current.status
        )));
    }
    Ok(store.set_product_active(id, active, now)?)
}

pub fn remove_product(
    store: &Store,
    now: i64,
    seller: &Seller,
    id: ProductId,
) -> Result<Removal, ServiceError> {
    let current = owned_product(store, seller, id)?;
    if store.product_has_orders(id)? {
        let archived = store.set_product_status(
            id,
            current.status,
            ProductStatus::Rejected,
            false,
            Some(WITHDRAWN_REASON),
            now,
        )?;
        info!(product_id = id.get(), seller_id = seller.id.get(), "product archived");
        return Ok(Removal::Archived(archived));
    }
    store.delete_product(id)?;
    info!(product_id = id.get(), seller_id = seller.id.get(), "product deleted");
    Ok(Removal::Deleted)
}
