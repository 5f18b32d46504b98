// SPDX-License-Identifier: Apache-2.0

//! Order placement.
//!
//! The steps run as separate store calls. A failure after the order row
//! exists is undone by compensation: restore decremented stock, drop the
//! item rows, drop the order row.

use std::collections::BTreeSet;

use bazaar_api::PlaceOrderRequest;
use bazaar_model::{
    LineItemRequest, Money, NotificationKind, Order, OrderId, OrderItem, ProductId,
    ShippingTarget, UserId, ValidationError,
};
use bazaar_store::{NewOrder, NewOrderItem, Store, StoreErrorCode};
use tracing::{error, info, warn};

use crate::error::ServiceError;
use crate::services::notify;

pub const NOTES_MAX_LEN: usize = 1000;

/// What a successful placement produced.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

fn validate_request(request: &PlaceOrderRequest) -> Result<ShippingTarget, ServiceError> {
    LineItemRequest::validate_all(&request.items)?;
    if let Some(notes) = &request.notes {
        if notes.chars().count() > NOTES_MAX_LEN {
            return Err(ValidationError::new(format!(
                "notes exceed max length {NOTES_MAX_LEN}"
            ))
            .into());
        }
    }
    Ok(ShippingTarget::from_parts(
        request.address_id,
        request.shipping_address.as_deref(),
    )?)
}

/// Checks every line against the live catalog and builds the rows to insert.
fn price_lines(
    store: &Store,
    items: &[LineItemRequest],
) -> Result<(Vec<NewOrderItem>, Money), ServiceError> {
    let commission = store.commission_rate()?;
    let mut rows = Vec::with_capacity(items.len());
    let mut total = Money::ZERO;
    for line in items {
        let product = match store.get_product(line.product_id) {
            Ok(p) => p,
            Err(e) if e.is_not_found() => {
                return Err(ServiceError::ProductUnavailable(line.product_id))
            }
            Err(e) => return Err(e.into()),
        };
        let seller = store.get_seller(product.seller_id)?;
        if !product.is_purchasable() || !seller.is_trading() {
            return Err(ServiceError::ProductUnavailable(product.id));
        }
        if product.stock < i64::from(line.quantity) {
            return Err(ServiceError::OutOfStock {
                product: product.id,
                available: product.stock,
                requested: line.quantity,
            });
        }
        let unit_price = product.effective_price();
        if unit_price != line.price {
            return Err(ServiceError::PriceMismatch {
                product: product.id,
                expected: unit_price.cents(),
                submitted: line.price.cents(),
            });
        }
        let line_total = unit_price.checked_mul(line.quantity)?;
        total = total.checked_add(line_total)?;
        rows.push(NewOrderItem {
            product_id: product.id,
            seller_id: product.seller_id,
            product_name: product.name,
            quantity: line.quantity,
            unit_price,
            seller_amount: commission.seller_amount(line_total),
        });
    }
    Ok((rows, total))
}

fn resolve_shipping(
    store: &Store,
    buyer: &UserId,
    target: ShippingTarget,
) -> Result<String, ServiceError> {
    match target {
        ShippingTarget::Stored(id) => Ok(store.get_address(buyer, id)?.shipping_label()),
        ShippingTarget::Inline(text) => Ok(text),
    }
}

/// Undo for a half-written order. Failures here are logged and swallowed so
/// the caller still sees the original error.
fn compensate(store: &Store, order: OrderId, decremented: &[(ProductId, u32)]) {
    for (product, quantity) in decremented {
        if let Err(e) = store.restore_stock(*product, *quantity) {
            error!(order_id = order.get(), product_id = product.get(), "stock restore failed: {e}");
        } else {
            warn!(order_id = order.get(), product_id = product.get(), quantity, "stock restored");
        }
    }
    match store.delete_order_items(order) {
        Ok(removed) => warn!(order_id = order.get(), removed, "order items removed"),
        Err(e) => error!(order_id = order.get(), "order item cleanup failed: {e}"),
    }
    match store.delete_order(order) {
        Ok(()) => warn!(order_id = order.get(), "order removed"),
        Err(e) => error!(order_id = order.get(), "order cleanup failed: {e}"),
    }
}

fn decrement_all(
    store: &Store,
    order: OrderId,
    items: &[NewOrderItem],
) -> Result<(), (ServiceError, Vec<(ProductId, u32)>)> {
    let mut done = Vec::with_capacity(items.len());
    for item in items {
        if let Err(e) = store.decrement_stock(item.product_id, item.quantity) {
            warn!(
                order_id = order.get(),
                product_id = item.product_id.get(),
                "stock decrement failed: {e}"
            );
            let err = if e.code == StoreErrorCode::Conflict {
                let available = store
                    .get_product(item.product_id)
                    .map_or(0, |p| p.stock);
                ServiceError::OutOfStock {
                    product: item.product_id,
                    available,
                    requested: item.quantity,
                }
            } else {
                e.into()
            };
            return Err((err, done));
        }
        done.push((item.product_id, item.quantity));
    }
    Ok(())
}

pub fn place_order(
    store: &Store,
    now: i64,
    buyer: &UserId,
    request: &PlaceOrderRequest,
) -> Result<PlacedOrder, ServiceError> {
    let target = validate_request(request)?;

    let product_ids: Vec<ProductId> = request.items.iter().map(|i| i.product_id).collect();
    let open = store.unsettled_orders_with_products(buyer, &product_ids)?;
    if !open.is_empty() {
        info!(user_id = %buyer, orders = ?open, "duplicate order rejected");
        return Err(ServiceError::DuplicateOrder { orders: open });
    }

    let (rows, total) = price_lines(store, &request.items)?;
    let shipping_address = resolve_shipping(store, buyer, target)?;
    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let order = store.insert_order(
        &NewOrder {
            user_id: buyer.clone(),
            status: request.payment_method.initial_status(),
            payment_method: request.payment_method,
            shipping_address,
            total,
            notes,
        },
        now,
    )?;

    let items = match store.insert_order_items(order.id, &rows) {
        Ok(items) => items,
        Err(e) => {
            warn!(order_id = order.id.get(), "order item insert failed: {e}");
            compensate(store, order.id, &[]);
            return Err(e.into());
        }
    };

    if let Err((err, decremented)) = decrement_all(store, order.id, &rows) {
        compensate(store, order.id, &decremented);
        return Err(err);
    }

    if let Err(e) = store.clear_cart_products(buyer, &product_ids) {
        warn!(order_id = order.id.get(), "cart cleanup failed: {e}");
    }

    let sellers: BTreeSet<_> = items.iter().map(|i| i.seller_id).collect();
    for seller_id in sellers {
        let lines = items.iter().filter(|i| i.seller_id == seller_id).count();
        match store.get_seller(seller_id) {
            Ok(seller) => notify(
                store,
                &seller.user_id,
                NotificationKind::NewOrder,
                &format!("New order #{}: {lines} item(s) to fulfil", order.id),
                now,
            ),
            Err(e) => warn!(seller_id = seller_id.get(), "seller lookup for notification failed: {e}"),
        }
    }

    info!(
        order_id = order.id.get(),
        user_id = %buyer,
        total = total.cents(),
        items = items.len(),
        status = order.status.as_str(),
        "order placed"
    );
    Ok(PlacedOrder { order, items })
}
