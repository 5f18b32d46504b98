// SPDX-License-Identifier: Apache-2.0

//! Order and order-item status changes after placement.

use bazaar_model::{
    FulfillmentStatus, NotificationKind, Order, OrderId, OrderItem, OrderItemId, OrderStatus,
    Seller, UserId,
};
use bazaar_store::{Store, StoreErrorCode};
use tracing::{error, info};

use crate::error::ServiceError;
use crate::services::notify;

/// Compare-and-set to `next`, with the side effects every order move shares.
fn move_order(
    store: &Store,
    now: i64,
    current: &Order,
    next: OrderStatus,
) -> Result<Order, ServiceError> {
    let order = store.set_order_status(current.id, current.status, next, now)?;
    if next.restocks() {
        match store.cancel_open_items(order.id, None) {
            Ok(lines) => info!(order_id = order.id.get(), items = lines.len(), "open items restocked"),
            Err(e) => {
                error!(order_id = order.id.get(), "restock after cancel failed: {e}");
                return Err(e.into());
            }
        }
    }
    notify(
        store,
        &order.user_id,
        NotificationKind::OrderStatusChanged,
        &format!("Order #{} is now {}", order.id, order.status),
        now,
    );
    info!(
        order_id = order.id.get(),
        from = current.status.as_str(),
        to = next.as_str(),
        "order status changed"
    );
    Ok(order)
}

/// Buyer-initiated cancel. Orders of other users read as missing.
pub fn cancel_order(
    store: &Store,
    now: i64,
    buyer: &UserId,
    id: OrderId,
) -> Result<Order, ServiceError> {
    let current = store.get_order(id)?;
    if &current.user_id != buyer {
        return Err(ServiceError::NotFound(format!("order {id}")));
    }
    if !current.status.buyer_may_cancel() {
        return Err(ServiceError::invalid_transition(
            "order",
            current.status,
            OrderStatus::Cancelled,
        ));
    }
    move_order(store, now, &current, OrderStatus::Cancelled)
}

/// Admin status change along the transition table.
pub fn set_order_status(
    store: &Store,
    now: i64,
    id: OrderId,
    next: OrderStatus,
) -> Result<Order, ServiceError> {
    let current = store.get_order(id)?;
    if !current.status.can_transition_to(next) {
        return Err(ServiceError::invalid_transition("order", current.status, next));
    }
    move_order(store, now, &current, next)
}

/// Order status implied by its items once they all settled, if any.
fn settled_status(items: &[OrderItem]) -> Option<OrderStatus> {
    if items.is_empty() {
        return None;
    }
    if items.iter().all(|i| i.status == FulfillmentStatus::Cancelled) {
        return Some(OrderStatus::Cancelled);
    }
    items
        .iter()
        .filter(|i| i.status != FulfillmentStatus::Cancelled)
        .all(|i| i.status == FulfillmentStatus::Delivered)
        .then_some(OrderStatus::Delivered)
}

/// Seller-side progress on one line. Settling the last open line settles
/// the order too.
pub fn set_item_status(
    store: &Store,
    now: i64,
    seller: &Seller,
    id: OrderItemId,
    next: FulfillmentStatus,
) -> Result<OrderItem, ServiceError> {
    let item = store.get_order_item(id)?;
    if item.seller_id != seller.id {
        return Err(ServiceError::NotFound(format!("order item {id}")));
    }
    if !item.status.can_transition_to(next) {
        return Err(ServiceError::invalid_transition("order item", item.status, next));
    }
    let order = store.get_order(item.order_id)?;
    if order.status.is_terminal() || order.status == OrderStatus::AwaitingPayment {
        return Err(ServiceError::Conflict(format!(
            "order {} is {}; its items cannot change",
            order.id, order.status
        )));
    }

    let updated = if next == FulfillmentStatus::Cancelled {
        // Races a buyer or admin cancel of the whole order; whichever
        // transaction reaches the item first restocks it.
        store
            .cancel_open_items(order.id, Some(id))?
            .pop()
            .ok_or_else(|| ServiceError::Conflict(format!("order item {id} is already settled")))?
    } else {
        store.set_order_item_status(id, item.status, next)?
    };
    info!(
        order_id = order.id.get(),
        item_id = id.get(),
        seller_id = seller.id.get(),
        to = next.as_str(),
        "order item status changed"
    );

    let items = store.order_items(order.id)?;
    if let Some(settled) = settled_status(&items) {
        if settled != order.status {
            // Item-driven moves bypass the admin transition table; stock for
            // cancelled lines was already returned above.
            let order = match store.set_order_status(order.id, order.status, settled, now) {
                Ok(order) => order,
                Err(e) if e.code == StoreErrorCode::Conflict => {
                    info!(order_id = order.id.get(), "order moved concurrently; not settling: {e}");
                    return Ok(updated);
                }
                Err(e) => return Err(e.into()),
            };
            notify(
                store,
                &order.user_id,
                NotificationKind::OrderStatusChanged,
                &format!("Order #{} is now {}", order.id, order.status),
                now,
            );
            info!(order_id = order.id.get(), to = settled.as_str(), "order settled by items");
        }
    }
    Ok(updated)
}
