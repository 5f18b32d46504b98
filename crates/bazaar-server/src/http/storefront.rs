// SPDX-License-Identifier: Apache-2.0

//! Public catalog reads. Nothing here needs a session.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use bazaar_api::{parse_product_search_params, ApiError, PageDto, PublicSellerDto};
use bazaar_model::{Category, Product, ProductId, SellerId, SellerStatus};
use bazaar_store::{ProductCursor, ProductFilter, ProductScope};

use crate::error::{HttpResult, ServiceError};
use crate::http::{page_dto, path_id, run_blocking};
use crate::AppState;

/// Builds a search filter from query parameters. A cursor minted for a
/// different sort order is rejected rather than reinterpreted.
pub(crate) fn product_filter(
    scope: ProductScope,
    query: &BTreeMap<String, String>,
    default_limit: usize,
) -> Result<ProductFilter, ApiError> {
    let params = parse_product_search_params(query, default_limit)?;
    let cursor = match params.page.cursor.as_deref() {
        Some(raw) => {
            let cursor = ProductCursor::decode(raw).map_err(|_| ApiError::invalid_cursor(raw))?;
            if cursor.sort != params.sort {
                return Err(ApiError::invalid_cursor(raw));
            }
            Some(cursor)
        }
        None => None,
    };
    let mut filter = ProductFilter::new(scope);
    filter.q = params.q;
    filter.category = params.category;
    filter.seller = params.seller;
    filter.min_price = params.min_price;
    filter.max_price = params.max_price;
    filter.sort = params.sort;
    filter.cursor = cursor;
    filter.limit = params.page.limit;
    Ok(filter)
}

pub(crate) async fn categories_handler(
    State(state): State<AppState>,
) -> HttpResult<Json<Vec<Category>>> {
    let categories = run_blocking(&state, |store, _| Ok(store.list_categories()?)).await?;
    Ok(Json(categories))
}

pub(crate) async fn products_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Product>>> {
    let filter = product_filter(ProductScope::Storefront, &query, state.api.default_page_limit)?;
    let page = run_blocking(&state, move |store, _| Ok(store.search_products(&filter)?)).await?;
    Ok(Json(page_dto(page)))
}

pub(crate) async fn product_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> HttpResult<Json<Product>> {
    let id: ProductId = path_id(&raw, "id")?;
    let product = run_blocking(&state, move |store, _| Ok(store.get_visible_product(id)?)).await?;
    Ok(Json(product))
}

/// Shops that are not approved are invisible to the public.
fn public_seller(store: &bazaar_store::Store, id: SellerId) -> Result<PublicSellerDto, ServiceError> {
    let seller = store.get_seller(id)?;
    if seller.status != SellerStatus::Approved {
        return Err(ServiceError::NotFound(format!("seller {id}")));
    }
    Ok(seller.into())
}

pub(crate) async fn seller_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> HttpResult<Json<PublicSellerDto>> {
    let id: SellerId = path_id(&raw, "id")?;
    let seller = run_blocking(&state, move |store, _| public_seller(store, id)).await?;
    Ok(Json(seller))
}

pub(crate) async fn seller_products_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Product>>> {
    let id: SellerId = path_id(&raw, "id")?;
    let mut filter =
        product_filter(ProductScope::Storefront, &query, state.api.default_page_limit)?;
    filter.seller = Some(id);
    let page = run_blocking(&state, move |store, _| {
        public_seller(store, id)?;
        Ok(store.search_products(&filter)?)
    })
    .await?;
    Ok(Json(page_dto(page)))
}
