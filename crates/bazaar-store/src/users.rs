// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{Role, UserId, UserProfile};
use rusqlite::{params, OptionalExtension};

use crate::paging::{clamp_limit, sql_limit, UserCursor};
use crate::row_decode::{user_row, USER_COLUMNS};
use crate::{Page, Store, StoreError};

impl Store {
    /// Returns the profile for `id`, creating a buyer row on first sight.
    pub fn ensure_user(&self, id: &UserId, now: i64) -> Result<UserProfile, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users(id, role, created_at) VALUES (?1, 'buyer', ?2)",
                params![id.as_str(), now],
            )?;
            Ok(conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id.as_str()],
                user_row,
            )?)
        })
    }

    pub fn get_user(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id.as_str()],
                user_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(format!("user {id}")))
        })
    }

    pub fn update_user_profile(
        &self,
        id: &UserId,
        display_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET display_name = ?2, email = ?3 WHERE id = ?1",
                params![id.as_str(), display_name, email],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("user {id}")));
        }
        self.get_user(id)
    }

    pub fn set_user_role(&self, id: &UserId, role: Role) -> Result<UserProfile, StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET role = ?2 WHERE id = ?1",
                params![id.as_str(), role.as_str()],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("user {id}")));
        }
        self.get_user(id)
    }

    pub fn list_users(
        &self,
        role: Option<Role>,
        after: Option<&UserCursor>,
        limit: usize,
    ) -> Result<Page<UserProfile>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR role = ?1) AND (?2 IS NULL OR id > ?2)
                 ORDER BY id ASC LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        role.map(Role::as_str),
                        after.map(|c| c.after.as_str()),
                        sql_limit(limit)
                    ],
                    user_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        Ok(Page::from_overfetch(rows, clamp_limit(limit), |last| {
            UserCursor {
                after: last.id.as_str().to_string(),
            }
            .encode()
        })?)
    }

    pub fn count_users(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }
}
