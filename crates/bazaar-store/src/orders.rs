// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{
    FulfillmentStatus, Money, Order, OrderId, OrderItem, OrderItemId, OrderStatus, PaymentMethod,
    ProductId, SellerId, UserId,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use crate::paging::{clamp_limit, sql_limit, IdCursor};
use crate::row_decode::{
    id_col, order_item_row, order_item_row_at, order_row, parse_col, ORDER_COLUMNS,
    ORDER_ITEM_COLUMNS,
};
use crate::{FailPoint, Page, Store, StoreError, StoreErrorCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub total: Money,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub seller_amount: Money,
}

/// An order item as a seller sees it, with the parent order's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerOrderLine {
    pub item: OrderItem,
    pub order_status: OrderStatus,
    pub shipping_address: String,
    pub ordered_at: i64,
}

fn order_by_id(conn: &Connection, id: OrderId) -> Result<Option<Order>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1"),
            [id.get()],
            order_row,
        )
        .optional()?)
}

fn item_by_id(conn: &Connection, id: OrderItemId) -> Result<Option<OrderItem>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items i WHERE i.id = ?1"),
            [id.get()],
            order_item_row,
        )
        .optional()?)
}

fn collect_orders(
    conn: &Connection,
    sql: &str,
    args: &[Value],
) -> Result<Vec<Order>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), order_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn seller_line_row(row: &Row<'_>) -> rusqlite::Result<SellerOrderLine> {
    Ok(SellerOrderLine {
        item: order_item_row_at(row, 0)?,
        order_status: parse_col(row, 9)?,
        shipping_address: row.get(10)?,
        ordered_at: row.get(11)?,
    })
}

fn order_page(rows: Vec<Order>, limit: usize) -> Result<Page<Order>, StoreError> {
    Ok(Page::from_overfetch(rows, clamp_limit(limit), |last| {
        IdCursor {
            before: last.id.get(),
        }
        .encode()
    })?)
}

impl Store {
    /// Unsettled orders of `user` that already contain any of `products`.
    pub fn unsettled_orders_with_products(
        &self,
        user: &UserId,
        products: &[ProductId],
    ) -> Result<Vec<OrderId>, StoreError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; products.len()].join(", ");
        let mut args = vec![
            Value::Text(user.as_str().to_string()),
            Value::Text(OrderStatus::Pending.as_str().to_string()),
            Value::Text(OrderStatus::AwaitingPayment.as_str().to_string()),
        ];
        args.extend(products.iter().map(|p| Value::Integer(p.get())));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT o.id FROM orders o JOIN order_items i ON i.order_id = o.id
                 WHERE o.user_id = ? AND o.status IN (?, ?) AND i.product_id IN ({placeholders})
                 ORDER BY o.id"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), |row| id_col(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_order(&self, order: &NewOrder, now: i64) -> Result<Order, StoreError> {
        self.trip(FailPoint::InsertOrder)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO orders(user_id, status, payment_method, shipping_address, total, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    order.user_id.as_str(),
                    order.status.as_str(),
                    order.payment_method.as_str(),
                    order.shipping_address,
                    order.total.cents(),
                    order.notes,
                    now
                ],
            )?;
            let id = OrderId::new(conn.last_insert_rowid())?;
            order_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("order {id}")))
        })
    }

    /// Inserts every line of an order in one transaction: all rows or none.
    pub fn insert_order_items(
        &self,
        order: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, StoreError> {
        self.trip(FailPoint::InsertOrderItems)?;
        self.with_tx(|tx| {
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO order_items(order_id, product_id, seller_id, product_name, quantity, unit_price, seller_amount, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending')",
                )?;
                for item in items {
                    stmt.execute(params![
                        order.get(),
                        item.product_id.get(),
                        item.seller_id.get(),
                        item.product_name,
                        item.quantity,
                        item.unit_price.cents(),
                        item.seller_amount.cents()
                    ])?;
                }
            }
            let mut stmt = tx.prepare(&format!(
                "SELECT {ORDER_ITEM_COLUMNS} FROM order_items i WHERE i.order_id = ?1 ORDER BY i.id"
            ))?;
            let rows = stmt
                .query_map([order.get()], order_item_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Takes `quantity` units off the shelf in a single conditional update.
    /// Insufficient stock reports `conflict` and leaves the row untouched.
    pub fn decrement_stock(&self, product: ProductId, quantity: u32) -> Result<(), StoreError> {
        self.trip(FailPoint::DecrementStock)?;
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE products SET stock = stock - ?2 WHERE id = ?1 AND stock >= ?2",
                params![product.get(), quantity],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::conflict(format!(
                "insufficient stock for product {product}"
            )));
        }
        debug!(product_id = product.get(), quantity, "stock decremented");
        Ok(())
    }

    pub fn restore_stock(&self, product: ProductId, quantity: u32) -> Result<(), StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE products SET stock = stock + ?2 WHERE id = ?1",
                params![product.get(), quantity],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("product {product}")));
        }
        Ok(())
    }

    pub fn delete_order_items(&self, order: OrderId) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM order_items WHERE order_id = ?1", [order.get()])?)
        })
    }

    pub fn delete_order(&self, order: OrderId) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM orders WHERE id = ?1", [order.get()])?;
            Ok(())
        })
    }

    pub fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.with_conn(|conn| {
            order_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("order {id}")))
        })
    }

    pub fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_ITEM_COLUMNS} FROM order_items i WHERE i.order_id = ?1 ORDER BY i.id"
            ))?;
            let rows = stmt
                .query_map([order.get()], order_item_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_orders_for_user(
        &self,
        user: &UserId,
        before: Option<IdCursor>,
        limit: usize,
    ) -> Result<Page<Order>, StoreError> {
        let args = [
            Value::Text(user.as_str().to_string()),
            before.map_or(Value::Null, |c| Value::Integer(c.before)),
            Value::Integer(sql_limit(limit)),
        ];
        let rows = self.with_conn(|conn| {
            collect_orders(
                conn,
                &format!(
                    "SELECT {ORDER_COLUMNS} FROM orders o
                     WHERE o.user_id = ?1 AND (?2 IS NULL OR o.id < ?2)
                     ORDER BY o.id DESC LIMIT ?3"
                ),
                &args,
            )
        })?;
        order_page(rows, limit)
    }

    pub fn list_orders(
        &self,
        status: Option<OrderStatus>,
        before: Option<IdCursor>,
        limit: usize,
    ) -> Result<Page<Order>, StoreError> {
        let args = [
            status.map_or(Value::Null, |s| Value::Text(s.as_str().to_string())),
            before.map_or(Value::Null, |c| Value::Integer(c.before)),
            Value::Integer(sql_limit(limit)),
        ];
        let rows = self.with_conn(|conn| {
            collect_orders(
                conn,
                &format!(
                    "SELECT {ORDER_COLUMNS} FROM orders o
                     WHERE (?1 IS NULL OR o.status = ?1) AND (?2 IS NULL OR o.id < ?2)
                     ORDER BY o.id DESC LIMIT ?3"
                ),
                &args,
            )
        })?;
        order_page(rows, limit)
    }

    /// Compare-and-set on the order status.
    pub fn set_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        now: i64,
    ) -> Result<Order, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
                params![id.get(), expected.as_str(), next.as_str(), now],
            )?;
            let current =
                order_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("order {id}")))?;
            if changed == 0 {
                return Err(StoreError::conflict(format!(
                    "order {id} is {}, expected {expected}",
                    current.status
                )));
            }
            Ok(current)
        })
    }

    /// Cancels the open items of `order` (only `item`, when given) and puts
    /// their units back on the shelf, all in one transaction. Returns the
    /// items this call cancelled; items already settled are left alone, so
    /// each unit is restocked at most once.
    pub fn cancel_open_items(
        &self,
        order: OrderId,
        item: Option<OrderItemId>,
    ) -> Result<Vec<OrderItem>, StoreError> {
        self.with_tx(|tx| {
            let open = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {ORDER_ITEM_COLUMNS} FROM order_items i
                     WHERE i.order_id = ?1 AND (?2 IS NULL OR i.id = ?2)
                       AND i.status NOT IN ('delivered', 'cancelled')
                     ORDER BY i.id"
                ))?;
                let rows = stmt
                    .query_map(params![order.get(), item.map(OrderItemId::get)], order_item_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };
            let mut cancelled = Vec::with_capacity(open.len());
            for mut line in open {
                let changed = tx.execute(
                    "UPDATE order_items SET status = 'cancelled' WHERE id = ?1 AND status = ?2",
                    params![line.id.get(), line.status.as_str()],
                )?;
                if changed == 0 {
                    continue;
                }
                tx.execute(
                    "UPDATE products SET stock = stock + ?2 WHERE id = ?1",
                    params![line.product_id.get(), line.quantity],
                )?;
                debug!(item_id = line.id.get(), quantity = line.quantity, "item cancelled and restocked");
                line.status = FulfillmentStatus::Cancelled;
                cancelled.push(line);
            }
            Ok(cancelled)
        })
    }

    pub fn get_order_item(&self, id: OrderItemId) -> Result<OrderItem, StoreError> {
        self.with_conn(|conn| {
            item_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("order item {id}")))
        })
    }

    /// Compare-and-set on one item's fulfillment status.
    pub fn set_order_item_status(
        &self,
        id: OrderItemId,
        expected: FulfillmentStatus,
        next: FulfillmentStatus,
    ) -> Result<OrderItem, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE order_items SET status = ?3 WHERE id = ?1 AND status = ?2",
                params![id.get(), expected.as_str(), next.as_str()],
            )?;
            let current = item_by_id(conn, id)?
                .ok_or_else(|| StoreError::not_found(format!("order item {id}")))?;
            if changed == 0 {
                return Err(StoreError::new(
                    StoreErrorCode::Conflict,
                    format!(
                        "order item {id} is {}, expected {}",
                        current.status.as_str(),
                        expected.as_str()
                    ),
                ));
            }
            Ok(current)
        })
    }

    pub fn seller_order_lines(
        &self,
        seller: SellerId,
        status: Option<FulfillmentStatus>,
        before: Option<IdCursor>,
        limit: usize,
    ) -> Result<Page<SellerOrderLine>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_ITEM_COLUMNS}, o.status, o.shipping_address, o.created_at
                 FROM order_items i JOIN orders o ON o.id = i.order_id
                 WHERE i.seller_id = ?1 AND (?2 IS NULL OR i.status = ?2) AND (?3 IS NULL OR i.id < ?3)
                 ORDER BY i.id DESC LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        seller.get(),
                        status.map(FulfillmentStatus::as_str),
                        before.map(|c| c.before),
                        sql_limit(limit)
                    ],
                    seller_line_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        Ok(Page::from_overfetch(rows, clamp_limit(limit), |last| {
            IdCursor {
                before: last.item.id.get(),
            }
            .encode()
        })?)
    }
}
