// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{Money, SellerId};
use rusqlite::Row;
use serde::Serialize;

use crate::row_decode::money_col;
use crate::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerStats {
    pub product_count: i64,
    pub approved_product_count: i64,
    pub pending_product_count: i64,
    pub order_item_count: i64,
    pub units_sold: i64,
    pub gross_sales: Money,
    pub earnings: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStats {
    pub user_count: i64,
    pub seller_count: i64,
    pub pending_seller_count: i64,
    pub product_count: i64,
    pub pending_product_count: i64,
    pub order_count: i64,
    pub gross_merchandise_value: Money,
    pub commission_earned: Money,
}

/// Sales figures ignore cancelled lines and cancelled or refunded orders.
const COUNTED_SALES: &str = "i.status <> 'cancelled' AND o.status NOT IN ('cancelled', 'refunded')";

fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    row.get(idx)
}

impl Store {
    pub fn seller_stats(&self, seller: SellerId) -> Result<SellerStats, StoreError> {
        self.with_conn(|conn| {
            let (product_count, approved_product_count, pending_product_count) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'approved'), 0),
                        COALESCE(SUM(status = 'pending'), 0)
                 FROM products WHERE seller_id = ?1",
                [seller.get()],
                |row| Ok((count(row, 0)?, count(row, 1)?, count(row, 2)?)),
            )?;
            let (order_item_count, units_sold, gross_sales, earnings) = conn.query_row(
                &format!(
                    "SELECT COUNT(*),
                            COALESCE(SUM(i.quantity), 0),
                            COALESCE(SUM(i.unit_price * i.quantity), 0),
                            COALESCE(SUM(i.seller_amount), 0)
                     FROM order_items i JOIN orders o ON o.id = i.order_id
                     WHERE i.seller_id = ?1 AND {COUNTED_SALES}"
                ),
                [seller.get()],
                |row| {
                    Ok((
                        count(row, 0)?,
                        count(row, 1)?,
                        money_col(row, 2)?,
                        money_col(row, 3)?,
                    ))
                },
            )?;
            Ok(SellerStats {
                product_count,
                approved_product_count,
                pending_product_count,
                order_item_count,
                units_sold,
                gross_sales,
                earnings,
            })
        })
    }

    pub fn market_stats(&self) -> Result<MarketStats, StoreError> {
        self.with_conn(|conn| {
            let (user_count, seller_count, pending_seller_count) = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM users),
                        (SELECT COUNT(*) FROM sellers WHERE status = 'approved'),
                        (SELECT COUNT(*) FROM sellers WHERE status = 'pending')",
                [],
                |row| Ok((count(row, 0)?, count(row, 1)?, count(row, 2)?)),
            )?;
            let (product_count, pending_product_count, order_count) = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM products),
                        (SELECT COUNT(*) FROM products WHERE status = 'pending'),
                        (SELECT COUNT(*) FROM orders)",
                [],
                |row| Ok((count(row, 0)?, count(row, 1)?, count(row, 2)?)),
            )?;
            let (gross, seller_share) = conn.query_row(
                &format!(
                    "SELECT COALESCE(SUM(i.unit_price * i.quantity), 0), COALESCE(SUM(i.seller_amount), 0)
                     FROM order_items i JOIN orders o ON o.id = i.order_id
                     WHERE {COUNTED_SALES}"
                ),
                [],
                |row| Ok((money_col(row, 0)?, money_col(row, 1)?)),
            )?;
            Ok(MarketStats {
                user_count,
                seller_count,
                pending_seller_count,
                product_count,
                pending_product_count,
                order_count,
                gross_merchandise_value: gross,
                commission_earned: gross.checked_sub(seller_share)?,
            })
        })
    }
}
