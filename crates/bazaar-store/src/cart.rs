// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{CartItem, Product, ProductId, UserId, MAX_CART_QUANTITY};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::Serialize;

use crate::row_decode::{id_col, product_row_at, u32_col, PRODUCT_COLUMNS};
use crate::{Store, StoreError};

/// A cart row together with the product as it is now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

fn cart_item_row(row: &Row<'_>) -> rusqlite::Result<CartItem> {
    Ok(CartItem {
        product_id: id_col(row, 0)?,
        quantity: u32_col(row, 1)?,
        added_at: row.get(2)?,
    })
}

impl Store {
    pub fn cart_lines(&self, user: &UserId) -> Result<Vec<CartLine>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT c.product_id, c.quantity, c.added_at, {PRODUCT_COLUMNS}
                 FROM cart_items c JOIN products p ON p.id = c.product_id
                 WHERE c.user_id = ?1 ORDER BY c.added_at, c.product_id"
            ))?;
            let rows = stmt
                .query_map([user.as_str()], |row| {
                    let item = cart_item_row(row)?;
                    let product = product_row_at(row, 3)?;
                    Ok(CartLine { item, product })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Adds `quantity` to the line, creating it if needed. The total is
    /// capped at the per-line maximum.
    pub fn add_cart_item(
        &self,
        user: &UserId,
        product: ProductId,
        quantity: u32,
        now: i64,
    ) -> Result<CartItem, StoreError> {
        CartItem::validate_quantity(quantity)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cart_items(user_id, product_id, quantity, added_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, product_id) DO UPDATE SET quantity = MIN(quantity + excluded.quantity, ?5)",
                params![user.as_str(), product.get(), quantity, now, MAX_CART_QUANTITY],
            )?;
            Ok(conn.query_row(
                "SELECT product_id, quantity, added_at FROM cart_items WHERE user_id = ?1 AND product_id = ?2",
                params![user.as_str(), product.get()],
                cart_item_row,
            )?)
        })
    }

    pub fn set_cart_quantity(
        &self,
        user: &UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<CartItem, StoreError> {
        CartItem::validate_quantity(quantity)?;
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE cart_items SET quantity = ?3 WHERE user_id = ?1 AND product_id = ?2",
                params![user.as_str(), product.get(), quantity],
            )?;
            conn.query_row(
                "SELECT product_id, quantity, added_at FROM cart_items WHERE user_id = ?1 AND product_id = ?2",
                params![user.as_str(), product.get()],
                cart_item_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(format!("cart item for product {product}")))
        })
    }

    pub fn remove_cart_item(&self, user: &UserId, product: ProductId) -> Result<(), StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM cart_items WHERE user_id = ?1 AND product_id = ?2",
                params![user.as_str(), product.get()],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("cart item for product {product}")));
        }
        Ok(())
    }

    pub fn clear_cart(&self, user: &UserId) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM cart_items WHERE user_id = ?1", [user.as_str()])?)
        })
    }

    /// Drops only the lines for `products`; used after a successful checkout.
    pub fn clear_cart_products(
        &self,
        user: &UserId,
        products: &[ProductId],
    ) -> Result<usize, StoreError> {
        if products.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; products.len()].join(", ");
        let mut args = vec![Value::Text(user.as_str().to_string())];
        args.extend(products.iter().map(|p| Value::Integer(p.get())));
        self.with_conn(|conn| {
            Ok(conn.execute(
                &format!(
                    "DELETE FROM cart_items WHERE user_id = ? AND product_id IN ({placeholders})"
                ),
                params_from_iter(args.iter()),
            )?)
        })
    }
}
