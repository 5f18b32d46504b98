// SPDX-License-Identifier: Apache-2.0

use bazaar_model::{
    Category, CategoryId, Money, Product, ProductDraft, ProductId, ProductSort, ProductStatus,
    SellerId,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::paging::{clamp_limit, sql_limit, ProductCursor};
use crate::row_decode::{id_col, product_row, PRODUCT_COLUMNS};
use crate::{Page, Store, StoreError, StoreErrorCode};

fn sort_key_expr(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "p.created_at",
        ProductSort::PriceAsc | ProductSort::PriceDesc => "COALESCE(p.discount_price, p.price)",
    }
}

fn sort_key_of(sort: ProductSort, product: &Product) -> i64 {
    match sort {
        ProductSort::Newest => product.created_at,
        ProductSort::PriceAsc | ProductSort::PriceDesc => product.effective_price().cents(),
    }
}

/// Which slice of the catalog a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductScope {
    /// Approved, active, from an approved seller.
    Storefront,
    /// Everything a seller owns regardless of status.
    Seller(SellerId),
    /// Admin review queue, optionally narrowed to one status.
    Moderation(Option<ProductStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub scope: ProductScope,
    pub q: Option<String>,
    pub category: Option<CategoryId>,
    pub seller: Option<SellerId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: ProductSort,
    pub cursor: Option<ProductCursor>,
    pub limit: usize,
}

impl ProductFilter {
    #[must_use]
    pub fn new(scope: ProductScope) -> Self {
        Self {
            scope,
            q: None,
            category: None,
            seller: None,
            min_price: None,
            max_price: None,
            sort: ProductSort::Newest,
            cursor: None,
            limit: 20,
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn product_by_id(conn: &Connection, id: ProductId) -> Result<Option<Product>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1"),
            [id.get()],
            product_row,
        )
        .optional()?)
}

fn category_exists(conn: &Connection, id: CategoryId) -> Result<bool, StoreError> {
    Ok(conn
        .query_row("SELECT 1 FROM categories WHERE id = ?1", [id.get()], |_| Ok(()))
        .optional()?
        .is_some())
}

fn require_category(conn: &Connection, id: Option<CategoryId>) -> Result<(), StoreError> {
    match id {
        Some(id) if !category_exists(conn, id)? => Err(StoreError::new(
            StoreErrorCode::Validation,
            format!("category {id} does not exist"),
        )),
        _ => Ok(()),
    }
}

impl Store {
    pub fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, slug FROM categories ORDER BY name, id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Category {
                        id: id_col(row, 0)?,
                        name: row.get(1)?,
                        slug: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_category(&self, name: &str, slug: &str) -> Result<Category, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories(name, slug) VALUES (?1, ?2)",
                params![name.trim(), slug],
            )
            .map_err(|e| match StoreError::from(e) {
                err if err.code == StoreErrorCode::Conflict => {
                    StoreError::conflict(format!("category slug `{slug}` already exists"))
                }
                err => err,
            })?;
            Ok(Category {
                id: CategoryId::new(conn.last_insert_rowid())?,
                name: name.trim().to_string(),
                slug: slug.to_string(),
            })
        })
    }

    /// Products in the category keep existing with no category.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM categories WHERE id = ?1", [id.get()])?)
        })?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("category {id}")));
        }
        Ok(())
    }

    pub fn insert_product(
        &self,
        seller: SellerId,
        draft: &ProductDraft,
        now: i64,
    ) -> Result<Product, StoreError> {
        draft.validate()?;
        self.with_conn(|conn| {
            require_category(conn, draft.category_id)?;
            let description = draft
                .description
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            conn.execute(
                "INSERT INTO products(seller_id, category_id, name, description, price, discount_price, stock, image_url, status, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', 0, ?9, ?9)",
                params![
                    seller.get(),
                    draft.category_id.map(CategoryId::get),
                    draft.name.trim(),
                    description,
                    draft.price.cents(),
                    draft.discount_price.map(Money::cents),
                    draft.stock,
                    draft.image_url.as_deref().map(str::trim),
                    now
                ],
            )?;
            let id = ProductId::new(conn.last_insert_rowid())?;
            product_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("product {id}")))
        })
    }

    pub fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        self.with_conn(|conn| {
            product_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("product {id}")))
        })
    }

    /// Storefront lookup: hidden products read as missing.
    pub fn get_visible_product(&self, id: ProductId) -> Result<Product, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products p JOIN sellers s ON s.id = p.seller_id
                     WHERE p.id = ?1 AND p.status = 'approved' AND p.is_active = 1 AND s.status = 'approved'"
                ),
                [id.get()],
                product_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(format!("product {id}")))
        })
    }

    /// Writes the edited columns of `next` over `previous`. The write is
    /// guarded on `previous.updated_at`; stock is applied as a delta so
    /// concurrent order placements are not lost.
    pub fn update_product(&self, previous: &Product, next: &Product) -> Result<Product, StoreError> {
        let id = previous.id;
        let stock_delta = next.stock - previous.stock;
        self.with_conn(|conn| {
            require_category(conn, next.category_id)?;
            let changed = conn.execute(
                "UPDATE products SET name = ?2, description = ?3, price = ?4, discount_price = ?5,
                     stock = MAX(stock + ?6, 0), category_id = ?7, image_url = ?8, status = ?9,
                     rejection_reason = ?10, is_active = ?11, updated_at = ?12
                 WHERE id = ?1 AND updated_at = ?13",
                params![
                    id.get(),
                    next.name,
                    next.description,
                    next.price.cents(),
                    next.discount_price.map(Money::cents),
                    stock_delta,
                    next.category_id.map(CategoryId::get),
                    next.image_url,
                    next.status.as_str(),
                    next.rejection_reason,
                    next.is_active,
                    next.updated_at,
                    previous.updated_at
                ],
            )?;
            if changed == 0 {
                return match product_by_id(conn, id)? {
                    Some(_) => Err(StoreError::conflict(format!(
                        "product {id} changed concurrently"
                    ))),
                    None => Err(StoreError::not_found(format!("product {id}"))),
                };
            }
            product_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("product {id}")))
        })
    }

    /// Compare-and-set on the moderation status.
    pub fn set_product_status(
        &self,
        id: ProductId,
        expected: ProductStatus,
        next: ProductStatus,
        is_active: bool,
        reason: Option<&str>,
        now: i64,
    ) -> Result<Product, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE products SET status = ?3, is_active = ?4, rejection_reason = ?5, updated_at = ?6
                 WHERE id = ?1 AND status = ?2",
                params![id.get(), expected.as_str(), next.as_str(), is_active, reason, now],
            )?;
            let current = product_by_id(conn, id)?
                .ok_or_else(|| StoreError::not_found(format!("product {id}")))?;
            if changed == 0 {
                return Err(StoreError::conflict(format!(
                    "product {id} is {}, expected {expected}",
                    current.status
                )));
            }
            debug!(product_id = id.get(), status = next.as_str(), "product status set");
            Ok(current)
        })
    }

    /// Toggles visibility; only approved products may be switched.
    pub fn set_product_active(
        &self,
        id: ProductId,
        active: bool,
        now: i64,
    ) -> Result<Product, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'approved'",
                params![id.get(), active, now],
            )?;
            let current = product_by_id(conn, id)?
                .ok_or_else(|| StoreError::not_found(format!("product {id}")))?;
            if changed == 0 {
                return Err(StoreError::conflict(format!(
                    "product {id} is {}; only approved products can be toggled",
                    current.status
                )));
            }
            Ok(current)
        })
    }

    pub fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let changed = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM products WHERE id = ?1", [id.get()])?))?;
        if changed == 0 {
            return Err(StoreError::not_found(format!("product {id}")));
        }
        Ok(())
    }

    pub fn product_has_orders(&self, id: ProductId) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM order_items WHERE product_id = ?1 LIMIT 1",
                    [id.get()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn search_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError> {
        let sort = filter.sort;
        if let Some(cursor) = &filter.cursor {
            if cursor.sort != sort {
                return Err(StoreError::new(
                    StoreErrorCode::Validation,
                    format!(
                        "cursor was issued for sort `{}`, not `{}`",
                        cursor.sort.as_str(),
                        sort.as_str()
                    ),
                ));
            }
        }

        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p");
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        match filter.scope {
            ProductScope::Storefront => {
                sql.push_str(" JOIN sellers s ON s.id = p.seller_id");
                clauses.push(
                    "p.status = 'approved' AND p.is_active = 1 AND s.status = 'approved'".into(),
                );
            }
            ProductScope::Seller(seller) => {
                clauses.push("p.seller_id = ?".into());
                args.push(Value::Integer(seller.get()));
            }
            ProductScope::Moderation(Some(status)) => {
                clauses.push("p.status = ?".into());
                args.push(Value::Text(status.as_str().to_string()));
            }
            ProductScope::Moderation(None) => {}
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            clauses.push(
                "(p.name LIKE ? ESCAPE '\\' OR COALESCE(p.description, '') LIKE ? ESCAPE '\\')"
                    .into(),
            );
            let pattern = escape_like(q);
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }
        if let Some(category) = filter.category {
            clauses.push("p.category_id = ?".into());
            args.push(Value::Integer(category.get()));
        }
        if let Some(seller) = filter.seller {
            clauses.push("p.seller_id = ?".into());
            args.push(Value::Integer(seller.get()));
        }
        if let Some(min) = filter.min_price {
            clauses.push("COALESCE(p.discount_price, p.price) >= ?".into());
            args.push(Value::Integer(min.cents()));
        }
        if let Some(max) = filter.max_price {
            clauses.push("COALESCE(p.discount_price, p.price) <= ?".into());
            args.push(Value::Integer(max.cents()));
        }
        let key = sort_key_expr(sort);
        let (cmp, dir) = if sort == ProductSort::PriceAsc {
            (">", "ASC")
        } else {
            ("<", "DESC")
        };
        if let Some(cursor) = &filter.cursor {
            clauses.push(format!("({key} {cmp} ? OR ({key} = ? AND p.id {cmp} ?))"));
            args.push(Value::Integer(cursor.key));
            args.push(Value::Integer(cursor.key));
            args.push(Value::Integer(cursor.id));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {key} {dir}, p.id {dir} LIMIT ?"));
        args.push(Value::Integer(sql_limit(filter.limit)));

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), product_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        Ok(Page::from_overfetch(rows, clamp_limit(filter.limit), |last| {
            ProductCursor {
                sort,
                key: sort_key_of(sort, last),
                id: last.id.get(),
            }
            .encode()
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn price_sorts_share_the_effective_price_key() {
        assert_eq!(
            sort_key_expr(ProductSort::PriceAsc),
            sort_key_expr(ProductSort::PriceDesc)
        );
        assert_eq!(sort_key_expr(ProductSort::Newest), "p.created_at");
    }
}
