// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use bazaar_model::{
    Address, Money, Notification, Order, OrderItem, Product, Seller, UserId, UserProfile,
    ValidationError,
};
use rusqlite::types::Type;
use rusqlite::Row;

pub(crate) fn conversion<T, E>(idx: usize, ty: Type, result: Result<T, E>) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    result.map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e)))
}

pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ValidationError>,
{
    let raw: String = row.get(idx)?;
    conversion(idx, Type::Text, raw.parse::<T>())
}

pub(crate) fn id_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: TryFrom<i64, Error = ValidationError>,
{
    let raw: i64 = row.get(idx)?;
    conversion(idx, Type::Integer, T::try_from(raw))
}

pub(crate) fn opt_id_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: TryFrom<i64, Error = ValidationError>,
{
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|v| conversion(idx, Type::Integer, T::try_from(v)))
        .transpose()
}

pub(crate) fn user_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<UserId> {
    let raw: String = row.get(idx)?;
    conversion(idx, Type::Text, UserId::new(raw))
}

pub(crate) fn u32_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    conversion(idx, Type::Integer, u32::try_from(raw))
}

pub(crate) const USER_COLUMNS: &str = "id, display_name, email, role, created_at";

pub(crate) fn user_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: user_col(row, 0)?,
        display_name: row.get(1)?,
        email: row.get(2)?,
        role: parse_col(row, 3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) const SELLER_COLUMNS: &str = "id, user_id, shop_name, description, contact_email, phone, status, rejection_reason, created_at, updated_at";

pub(crate) fn seller_row(row: &Row<'_>) -> rusqlite::Result<Seller> {
    Ok(Seller {
        id: id_col(row, 0)?,
        user_id: user_col(row, 1)?,
        shop_name: row.get(2)?,
        description: row.get(3)?,
        contact_email: row.get(4)?,
        phone: row.get(5)?,
        status: parse_col(row, 6)?,
        rejection_reason: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Product columns qualified with the `p` alias so listings can join sellers.
pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.seller_id, p.category_id, p.name, p.description, p.price, p.discount_price, p.stock, p.image_url, p.status, p.rejection_reason, p.is_active, p.created_at, p.updated_at";

pub(crate) fn product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    product_row_at(row, 0)
}

/// Decodes [`PRODUCT_COLUMNS`] starting at column `base`.
pub(crate) fn product_row_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Product> {
    let discount: Option<i64> = row.get(base + 6)?;
    Ok(Product {
        id: id_col(row, base)?,
        seller_id: id_col(row, base + 1)?,
        category_id: opt_id_col(row, base + 2)?,
        name: row.get(base + 3)?,
        description: row.get(base + 4)?,
        price: money_col(row, base + 5)?,
        discount_price: discount
            .map(|v| conversion(base + 6, Type::Integer, Money::from_cents(v)))
            .transpose()?,
        stock: row.get(base + 7)?,
        image_url: row.get(base + 8)?,
        status: parse_col(row, base + 9)?,
        rejection_reason: row.get(base + 10)?,
        is_active: row.get(base + 11)?,
        created_at: row.get(base + 12)?,
        updated_at: row.get(base + 13)?,
    })
}

pub(crate) fn money_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Money> {
    let raw: i64 = row.get(idx)?;
    conversion(idx, Type::Integer, Money::from_cents(raw))
}

pub(crate) const ADDRESS_COLUMNS: &str =
    "id, user_id, full_name, line1, line2, city, postal_code, country, phone, is_default";

pub(crate) fn address_row(row: &Row<'_>) -> rusqlite::Result<Address> {
    Ok(Address {
        id: id_col(row, 0)?,
        user_id: user_col(row, 1)?,
        full_name: row.get(2)?,
        line1: row.get(3)?,
        line2: row.get(4)?,
        city: row.get(5)?,
        postal_code: row.get(6)?,
        country: row.get(7)?,
        phone: row.get(8)?,
        is_default: row.get(9)?,
    })
}

pub(crate) const ORDER_COLUMNS: &str = "o.id, o.user_id, o.status, o.payment_method, o.shipping_address, o.total, o.notes, o.created_at, o.updated_at";

pub(crate) fn order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: id_col(row, 0)?,
        user_id: user_col(row, 1)?,
        status: parse_col(row, 2)?,
        payment_method: parse_col(row, 3)?,
        shipping_address: row.get(4)?,
        total: money_col(row, 5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub(crate) const ORDER_ITEM_COLUMNS: &str = "i.id, i.order_id, i.product_id, i.seller_id, i.product_name, i.quantity, i.unit_price, i.seller_amount, i.status";

pub(crate) fn order_item_row(row: &Row<'_>) -> rusqlite::Result<OrderItem> {
    order_item_row_at(row, 0)
}

pub(crate) fn order_item_row_at(row: &Row<'_>, base: usize) -> rusqlite::Result<OrderItem> {
    Ok(OrderItem {
        id: id_col(row, base)?,
        order_id: id_col(row, base + 1)?,
        product_id: id_col(row, base + 2)?,
        seller_id: id_col(row, base + 3)?,
        product_name: row.get(base + 4)?,
        quantity: u32_col(row, base + 5)?,
        unit_price: money_col(row, base + 6)?,
        seller_amount: money_col(row, base + 7)?,
        status: parse_col(row, base + 8)?,
    })
}

pub(crate) const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, message, is_read, created_at";

pub(crate) fn notification_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: id_col(row, 0)?,
        user_id: user_col(row, 1)?,
        kind: parse_col(row, 2)?,
        message: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}
