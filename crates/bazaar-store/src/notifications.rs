// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{Notification, NotificationId, NotificationKind, UserId};
use rusqlite::{params, OptionalExtension};

use crate::paging::{clamp_limit, sql_limit, IdCursor};
use crate::row_decode::{notification_row, NOTIFICATION_COLUMNS};
use crate::{Page, Store, StoreError};

impl Store {
    pub fn insert_notification(
        &self,
        user: &UserId,
        kind: NotificationKind,
        message: &str,
        now: i64,
    ) -> Result<Notification, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications(user_id, kind, message, is_read, created_at) VALUES (?1, ?2, ?3, 0, ?4)",
                params![user.as_str(), kind.as_str(), message, now],
            )?;
            Ok(conn.query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                [conn.last_insert_rowid()],
                notification_row,
            )?)
        })
    }

    pub fn list_notifications(
        &self,
        user: &UserId,
        unread_only: bool,
        before: Option<IdCursor>,
        limit: usize,
    ) -> Result<Page<Notification>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0) AND (?3 IS NULL OR id < ?3)
                 ORDER BY id DESC LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        user.as_str(),
                        unread_only,
                        before.map(|c| c.before),
                        sql_limit(limit)
                    ],
                    notification_row,
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

    pub fn unread_notification_count(&self, user: &UserId) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user.as_str()],
                |row| row.get(0),
            )?)
        })
    }

    /// Notifications of other users read as missing.
    pub fn mark_notification_read(
        &self,
        user: &UserId,
        id: NotificationId,
    ) -> Result<Notification, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id.get(), user.as_str()],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1 AND user_id = ?2"
                ),
                params![id.get(), user.as_str()],
                notification_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(format!("notification {id}")))
        })
    }

    pub fn mark_all_notifications_read(&self, user: &UserId) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user.as_str()],
            )?)
        })
    }
}
