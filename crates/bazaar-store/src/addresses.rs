// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{Address, AddressId, AddressInput, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::row_decode::{address_row, ADDRESS_COLUMNS};
use crate::{Store, StoreError};

fn address_owned_by(
    conn: &Connection,
    user: &UserId,
    id: AddressId,
) -> Result<Address, StoreError> {
    conn.query_row(
        &format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?1 AND user_id = ?2"),
        params![id.get(), user.as_str()],
        address_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found(format!("address {id}")))
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl Store {
    pub fn list_addresses(&self, user: &UserId) -> Result<Vec<Address>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = ?1 ORDER BY is_default DESC, id"
            ))?;
            let rows = stmt
                .query_map([user.as_str()], address_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Addresses of other users read as missing.
    pub fn get_address(&self, user: &UserId, id: AddressId) -> Result<Address, StoreError> {
        self.with_conn(|conn| address_owned_by(conn, user, id))
    }

    /// The first address a user saves becomes the default.
    pub fn insert_address(
        &self,
        user: &UserId,
        input: &AddressInput,
    ) -> Result<Address, StoreError> {
        input.validate()?;
        self.with_tx(|tx| {
            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM addresses WHERE user_id = ?1",
                [user.as_str()],
                |row| row.get(0),
            )?;
            let is_default = input.is_default || existing == 0;
            if is_default {
                tx.execute(
                    "UPDATE addresses SET is_default = 0 WHERE user_id = ?1",
                    [user.as_str()],
                )?;
            }
            tx.execute(
                "INSERT INTO addresses(user_id, full_name, line1, line2, city, postal_code, country, phone, is_default)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.as_str(),
                    input.full_name.trim(),
                    input.line1.trim(),
                    trimmed(input.line2.as_deref()),
                    input.city.trim(),
                    input.postal_code.trim(),
                    input.country.trim(),
                    trimmed(input.phone.as_deref()),
                    is_default
                ],
            )?;
            let id = AddressId::new(tx.last_insert_rowid())?;
            address_owned_by(tx, user, id)
        })
    }

    pub fn update_address(
        &self,
        user: &UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, StoreError> {
        input.validate()?;
        self.with_tx(|tx| {
            let current = address_owned_by(tx, user, id)?;
            let is_default = input.is_default || current.is_default;
            if input.is_default {
                tx.execute(
                    "UPDATE addresses SET is_default = 0 WHERE user_id = ?1 AND id <> ?2",
                    params![user.as_str(), id.get()],
                )?;
            }
            tx.execute(
                "UPDATE addresses SET full_name = ?2, line1 = ?3, line2 = ?4, city = ?5, postal_code = ?6,
                     country = ?7, phone = ?8, is_default = ?9
                 WHERE id = ?1",
                params![
                    id.get(),
                    input.full_name.trim(),
                    input.line1.trim(),
                    trimmed(input.line2.as_deref()),
                    input.city.trim(),
                    input.postal_code.trim(),
                    input.country.trim(),
                    trimmed(input.phone.as_deref()),
                    is_default
                ],
            )?;
            address_owned_by(tx, user, id)
        })
    }

    /// Deleting the default promotes the oldest remaining address.
    pub fn delete_address(&self, user: &UserId, id: AddressId) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let current = address_owned_by(tx, user, id)?;
            tx.execute("DELETE FROM addresses WHERE id = ?1", [id.get()])?;
            if current.is_default {
                tx.execute(
                    "UPDATE addresses SET is_default = 1
                     WHERE id = (SELECT MIN(id) FROM addresses WHERE user_id = ?1)",
                    [user.as_str()],
                )?;
            }
            Ok(())
        })
    }
}
