// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! SQLite persistence for the marketplace.
//!
//! One [`Store`] owns a single connection behind a mutex. Callers on an async
//! runtime are expected to hop onto a blocking thread before calling in.

mod addresses;
mod cart;
mod catalog;
mod error;
mod notifications;
mod orders;
mod paging;
mod row_decode;
mod schema;
mod sellers;
mod settings;
mod stats;
mod users;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

pub use cart::CartLine;
pub use catalog::{ProductFilter, ProductScope};
pub use error::{StoreError, StoreErrorCode};
pub use orders::{NewOrder, NewOrderItem, SellerOrderLine};
pub use paging::{IdCursor, Page, ProductCursor, UserCursor};
pub use schema::SCHEMA_VERSION;
pub use stats::{MarketStats, SellerStats};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Named injection sites along the order placement path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertOrderItems,
    DecrementStock,
}

impl FailPoint {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsertOrder => "insert_order",
            Self::InsertOrderItems => "insert_order_items",
            Self::DecrementStock => "decrement_stock",
        }
    }
}

pub struct Store {
    conn: Mutex<Connection>,
    failpoints: Mutex<BTreeMap<FailPoint, usize>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
            failpoints: Mutex::new(BTreeMap::new()),
        })
    }

    /// Creates every table and index if missing, then records the schema
    /// version. Refuses databases written by a newer build.
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            if current > SCHEMA_VERSION {
                return Err(StoreError::new(
                    StoreErrorCode::Validation,
                    format!(
                        "database schema version {current} is newer than supported {SCHEMA_VERSION}"
                    ),
                ));
            }
            conn.execute_batch(schema::SCHEMA_SQL)?;
            conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
            debug!(from = current, to = SCHEMA_VERSION, "schema migrated");
            Ok(())
        })
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?))
    }

    /// Cheap round trip used by the readiness check.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    /// Fails the next call that reaches `point`.
    pub fn arm(&self, point: FailPoint) {
        self.arm_after(point, 0);
    }

    /// Lets `skip` calls through `point`, then fails the one after.
    pub fn arm_after(&self, point: FailPoint, skip: usize) {
        if let Ok(mut armed) = self.failpoints.lock() {
            armed.insert(point, skip);
        }
    }

    pub fn disarm_all(&self) {
        if let Ok(mut armed) = self.failpoints.lock() {
            armed.clear();
        }
    }

    pub(crate) fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut armed = self
            .failpoints
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "failpoint lock poisoned"))?;
        match armed.get_mut(&point) {
            Some(0) => {
                armed.remove(&point);
                Err(StoreError::new(
                    StoreErrorCode::InjectedFault,
                    format!("injected fault at {}", point.as_str()),
                ))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "connection lock poisoned"))
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.lock()?;
        f(&guard)
    }

    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}
