// SPDX-License-Identifier: Apache-2.0

use bazaar_core::canonical::{decode_cursor_payload, encode_cursor_payload};
use serde::{Deserialize, Serialize};

use bazaar_model::ProductSort;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Builds a page from `limit + 1` fetched rows; the extra row only signals
    /// that another page exists.
    pub(crate) fn from_overfetch(
        mut rows: Vec<T>,
        limit: usize,
        cursor_for: impl FnOnce(&T) -> Result<String, bazaar_core::Error>,
    ) -> Result<Self, bazaar_core::Error> {
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            match rows.last() {
                Some(last) => Some(cursor_for(last)?),
                None => None,
            }
        } else {
            None
        };
        Ok(Self {
            items: rows,
            next_cursor,
        })
    }
}

/// Keyset position for listings ordered by descending row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdCursor {
    pub before: i64,
}

/// Keyset position for product searches; bound to the sort it was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductCursor {
    pub sort: ProductSort,
    pub key: i64,
    pub id: i64,
}

/// Keyset position for user listings ordered by ascending user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCursor {
    pub after: String,
}

macro_rules! cursor_codec {
    ($ty:ty) => {
        impl $ty {
            pub fn encode(&self) -> Result<String, bazaar_core::Error> {
                encode_cursor_payload(self)
            }

            pub fn decode(token: &str) -> Result<Self, bazaar_core::Error> {
                decode_cursor_payload(token)
            }
        }
    };
}

cursor_codec!(IdCursor);
cursor_codec!(ProductCursor);
cursor_codec!(UserCursor);

pub(crate) fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, 100)
}

pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(clamp_limit(limit) + 1).unwrap_or(101)
}
