// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{Seller, SellerApplication, SellerId, SellerStatus, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::paging::{clamp_limit, sql_limit, IdCursor};
use crate::row_decode::{seller_row, SELLER_COLUMNS};
use crate::{Page, Store, StoreError};

fn seller_by_id(conn: &Connection, id: SellerId) -> Result<Option<Seller>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE id = ?1"),
            [id.get()],
            seller_row,
        )
        .optional()?)
}

fn seller_by_user(conn: &Connection, user: &UserId) -> Result<Option<Seller>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE user_id = ?1"),
            [user.as_str()],
            seller_row,
        )
        .optional()?)
}

impl Store {
    /// Files a seller application. A rejected applicant may re-apply, which
    /// overwrites the shop details and returns the row to `pending`.
    pub fn upsert_seller_application(
        &self,
        user: &UserId,
        application: &SellerApplication,
        now: i64,
    ) -> Result<Seller, StoreError> {
        application.validate()?;
        let app = application.normalized();
        self.with_tx(|tx| {
            match seller_by_user(tx, user)? {
                None => {
                    tx.execute(
                        "INSERT INTO sellers(user_id, shop_name, description, contact_email, phone, status, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?6)",
                        params![
                            user.as_str(),
                            app.shop_name,
                            app.description,
                            app.contact_email,
                            app.phone,
                            now
                        ],
                    )?;
                }
                Some(existing)
                    if existing
                        .status
                        .can_transition_to(SellerStatus::Pending) =>
                {
                    tx.execute(
                        "UPDATE sellers SET shop_name = ?2, description = ?3, contact_email = ?4, phone = ?5,
                             status = 'pending', rejection_reason = NULL, updated_at = ?6
                         WHERE id = ?1",
                        params![
                            existing.id.get(),
                            app.shop_name,
                            app.description,
                            app.contact_email,
                            app.phone,
                            now
                        ],
                    )?;
                }
                Some(existing) => {
                    return Err(StoreError::conflict(format!(
                        "seller application already {}",
                        existing.status
                    )));
                }
            }
            seller_by_user(tx, user)?.ok_or_else(|| StoreError::not_found("seller"))
        })
    }

    pub fn get_seller(&self, id: SellerId) -> Result<Seller, StoreError> {
        self.with_conn(|conn| {
            seller_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("seller {id}")))
        })
    }

    pub fn find_seller_by_user(&self, user: &UserId) -> Result<Option<Seller>, StoreError> {
        self.with_conn(|conn| seller_by_user(conn, user))
    }

    /// Compare-and-set on the seller status. Fails with `conflict` when the
    /// row moved away from `expected` in the meantime.
    pub fn set_seller_status(
        &self,
        id: SellerId,
        expected: SellerStatus,
        next: SellerStatus,
        reason: Option<&str>,
        now: i64,
    ) -> Result<Seller, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sellers SET status = ?3, rejection_reason = ?4, updated_at = ?5
                 WHERE id = ?1 AND status = ?2",
                params![id.get(), expected.as_str(), next.as_str(), reason, now],
            )?;
            let current =
                seller_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("seller {id}")))?;
            if changed == 0 {
                return Err(StoreError::conflict(format!(
                    "seller {id} is {}, expected {expected}",
                    current.status
                )));
            }
            Ok(current)
        })
    }

    pub fn update_seller_profile(
        &self,
        id: SellerId,
        profile: &SellerApplication,
        now: i64,
    ) -> Result<Seller, StoreError> {
        profile.validate()?;
        let app = profile.normalized();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sellers SET shop_name = ?2, description = ?3, contact_email = ?4, phone = ?5, updated_at = ?6
                 WHERE id = ?1",
                params![id.get(), app.shop_name, app.description, app.contact_email, app.phone, now],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(format!("seller {id}")));
            }
            seller_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("seller {id}")))
        })
    }

    pub fn list_sellers(
        &self,
        status: Option<SellerStatus>,
        before: Option<IdCursor>,
        limit: usize,
    ) -> Result<Page<Seller>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELLER_COLUMNS} FROM sellers
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR id < ?2)
                 ORDER BY id DESC LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        status.map(SellerStatus::as_str),
                        before.map(|c| c.before),
                        sql_limit(limit)
                    ],
                    seller_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        Ok(Page::from_overfetch(rows, clamp_limit(limit), |last| {
            IdCursor {
                before: last.id.get(),
            }
            .encode()
        })?)
    }
}
