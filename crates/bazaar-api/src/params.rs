// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::str::FromStr;

use bazaar_model::{CategoryId, Money, ProductSort, SellerId};

use crate::errors::ApiError;

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;
pub const MAX_CURSOR_BYTES: usize = 1024;
pub const MAX_SEARCH_TERM_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSearchParams {
    pub q: Option<String>,
    pub category: Option<CategoryId>,
    pub seller: Option<SellerId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: ProductSort,
    pub page: PageParams,
}

/// Parses `limit` and `cursor`. Cursor contents are opaque here; decoding
/// happens where the keyset is known.
pub fn parse_page_params(
    query: &BTreeMap<String, String>,
    default_limit: usize,
) -> Result<PageParams, ApiError> {
    let limit = match query.get("limit") {
        Some(raw) => {
            let value = raw
                .parse::<usize>()
                .map_err(|_| ApiError::invalid_param("limit", raw))?;
            if value == 0 || value > MAX_PAGE_LIMIT {
                return Err(ApiError::invalid_param("limit", raw));
            }
            value
        }
        None => default_limit.clamp(1, MAX_PAGE_LIMIT),
    };
    let cursor = query.get("cursor").cloned();
    if let Some(value) = &cursor {
        if value.is_empty() || value.len() > MAX_CURSOR_BYTES {
            return Err(ApiError::invalid_cursor(value));
        }
    }
    Ok(PageParams { limit, cursor })
}

/// Parses an optional enum-valued parameter such as `status`.
pub fn parse_enum_param<T: FromStr>(
    query: &BTreeMap<String, String>,
    name: &str,
) -> Result<Option<T>, ApiError> {
    query
        .get(name)
        .map(|raw| raw.parse::<T>().map_err(|_| ApiError::invalid_param(name, raw)))
        .transpose()
}

pub fn parse_product_search_params(
    query: &BTreeMap<String, String>,
    default_limit: usize,
) -> Result<ProductSearchParams, ApiError> {
    let page = parse_page_params(query, default_limit)?;
    let q = query
        .get("q")
        .map(|raw| raw.trim().to_string())
        .filter(|q| !q.is_empty());
    if let Some(term) = &q {
        if term.chars().count() > MAX_SEARCH_TERM_CHARS {
            return Err(ApiError::invalid_param("q", term));
        }
    }
    let min_price = parse_money(query, "min_price")?;
    let max_price = parse_money(query, "max_price")?;
    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            return Err(ApiError::invalid_param(
                "min_price",
                &format!("{min} > max_price {max}"),
            ));
        }
    }
    Ok(ProductSearchParams {
        q,
        category: parse_enum_param(query, "category")?,
        seller: parse_enum_param(query, "seller")?,
        min_price,
        max_price,
        sort: parse_enum_param(query, "sort")?.unwrap_or_default(),
        page,
    })
}

fn parse_money(query: &BTreeMap<String, String>, name: &str) -> Result<Option<Money>, ApiError> {
    query
        .get(name)
        .map(|raw| Money::parse(raw).map_err(|_| ApiError::invalid_param(name, raw)))
        .transpose()
}
