// SPDX-License-Identifier: Apache-2.0

//! Seller applications and admin decisions on them.

use bazaar_model::{
    NotificationKind, Role, Seller, SellerApplication, SellerId, SellerStatus, UserId,
};
use bazaar_store::Store;
use tracing::info;

use crate::error::ServiceError;
use crate::services::moderation::normalize_reason;
use crate::services::notify;

/// Files or re-files an application; only a rejected applicant may re-apply.
pub fn apply(
    store: &Store,
    now: i64,
    user: &UserId,
    application: &SellerApplication,
) -> Result<Seller, ServiceError> {
    let seller = store.upsert_seller_application(user, application, now)?;
    info!(seller_id = seller.id.get(), user_id = %user, "seller application filed");
    Ok(seller)
}

fn transition(
    store: &Store,
    now: i64,
    id: SellerId,
    from: SellerStatus,
    to: SellerStatus,
    reason: Option<&str>,
) -> Result<Seller, ServiceError> {
    let current = store.get_seller(id)?;
    if current.status != from || !from.can_transition_to(to) {
        return Err(ServiceError::invalid_transition("seller", current.status, to));
    }
    let seller = store.set_seller_status(id, from, to, reason, now)?;
    info!(
        seller_id = id.get(),
        from = from.as_str(),
        to = to.as_str(),
        "seller status changed"
    );
    Ok(seller)
}

/// Grants the seller role unless the owner already outranks it.
fn grant_seller_role(store: &Store, user: &UserId) -> Result<(), ServiceError> {
    let profile = store.get_user(user)?;
    if profile.role == Role::Buyer {
        store.set_user_role(user, Role::Seller)?;
    }
    Ok(())
}

pub fn approve_seller(store: &Store, now: i64, id: SellerId) -> Result<Seller, ServiceError> {
    let seller = transition(
        store,
        now,
        id,
        SellerStatus::Pending,
        SellerStatus::Approved,
        None,
    )?;
    grant_seller_role(store, &seller.user_id)?;
    notify(
        store,
        &seller.user_id,
        NotificationKind::SellerApproved,
        &format!("Your shop \"{}\" was approved; you can now list products", seller.shop_name),
        now,
    );
    Ok(seller)
}

pub fn reject_seller(
    store: &Store,
    now: i64,
    id: SellerId,
    reason: &str,
) -> Result<Seller, ServiceError> {
    let reason = normalize_reason(reason)?;
    let seller = transition(
        store,
        now,
        id,
        SellerStatus::Pending,
        SellerStatus::Rejected,
        Some(&reason),
    )?;
    notify(
        store,
        &seller.user_id,
        NotificationKind::SellerRejected,
        &format!("Your seller application was rejected: {reason}"),
        now,
    );
    Ok(seller)
}

/// Suspension hides every product of the shop from the storefront; the
/// listings themselves are untouched.
pub fn suspend_seller(
    store: &Store,
    now: i64,
    id: SellerId,
    reason: &str,
) -> Result<Seller, ServiceError> {
    let reason = normalize_reason(reason)?;
    let seller = transition(
        store,
        now,
        id,
        SellerStatus::Approved,
        SellerStatus::Suspended,
        Some(&reason),
    )?;
    notify(
        store,
        &seller.user_id,
        NotificationKind::SellerSuspended,
        &format!("Your shop was suspended: {reason}"),
        now,
    );
    Ok(seller)
}

pub fn reinstate_seller(store: &Store, now: i64, id: SellerId) -> Result<Seller, ServiceError> {
    let seller = transition(
        store,
        now,
        id,
        SellerStatus::Suspended,
        SellerStatus::Approved,
        None,
    )?;
    grant_seller_role(store, &seller.user_id)?;
    notify(
        store,
        &seller.user_id,
        NotificationKind::SellerApproved,
        &format!("Your shop \"{}\" was reinstated", seller.shop_name),
        now,
    );
    Ok(seller)
}
