// SPDX-License-Identifier: Apache-2.0

use bazaar_model::CommissionRate;
use rusqlite::params;
use rusqlite::types::Type;

use crate::row_decode::conversion;
use crate::{Store, StoreError};

impl Store {
    /// Current marketplace commission. The settings row is seeded by
    /// migration with the default rate.
    pub fn commission_rate(&self) -> Result<CommissionRate, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT commission_bps FROM settings WHERE id = 1", [], |row| {
                let bps: u32 = row.get(0)?;
                conversion(0, Type::Integer, CommissionRate::from_bps(bps))
            })?)
        })
    }

    pub fn set_commission_rate(
        &self,
        rate: CommissionRate,
        now: i64,
    ) -> Result<CommissionRate, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings(id, commission_bps, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET commission_bps = excluded.commission_bps, updated_at = excluded.updated_at",
                params![rate.bps(), now],
            )?;
            Ok(())
        })?;
        tracing::info!(commission_bps = rate.bps(), "commission rate updated");
        self.commission_rate()
    }
}
