// SPDX-License-Identifier: Apache-2.0

//! Seller dashboard: application, shop profile, listings and fulfilment.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use bazaar_api::{
    parse_enum_param, parse_page_params, PageDto, SetActiveRequest, SetFulfillmentStatusRequest,
};
use bazaar_model::{
    FulfillmentStatus, OrderItem, OrderItemId, Product, ProductDraft, ProductId, ProductPatch,
    Seller, SellerApplication,
};
use bazaar_store::{ProductScope, SellerOrderLine, SellerStats};
use tracing::info;

use crate::error::HttpResult;
use crate::http::extract::{Caller, JsonBody, SellerCaller};
use crate::http::storefront::product_filter;
use crate::http::{created, id_cursor, no_content, page_dto, path_id, run_blocking};
use crate::services::{fulfillment, listings, onboarding};
use crate::AppState;

/// Open to any signed-in user; the admin decides.
pub(crate) async fn apply_handler(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(application): JsonBody<SellerApplication>,
) -> HttpResult<Response> {
    let user = caller.profile.id;
    let seller =
        run_blocking(&state, move |store, now| onboarding::apply(store, now, &user, &application))
            .await?;
    Ok(created(seller))
}

pub(crate) async fn profile_handler(caller: SellerCaller) -> Json<Seller> {
    Json(caller.seller)
}

pub(crate) async fn update_profile_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    JsonBody(profile): JsonBody<SellerApplication>,
) -> HttpResult<Json<Seller>> {
    let id = caller.seller.id;
    let seller = run_blocking(&state, move |store, now| {
        Ok(store.update_seller_profile(id, &profile, now)?)
    })
    .await?;
    info!(seller_id = id.get(), "seller profile updated");
    Ok(Json(seller))
}

/// Every listing the shop owns, whatever its review status.
pub(crate) async fn products_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Product>>> {
    let filter = product_filter(
        ProductScope::Seller(caller.seller.id),
        &query,
        state.api.default_page_limit,
    )?;
    let page = run_blocking(&state, move |store, _| Ok(store.search_products(&filter)?)).await?;
    Ok(Json(page_dto(page)))
}

pub(crate) async fn create_product_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    JsonBody(draft): JsonBody<ProductDraft>,
) -> HttpResult<Response> {
    caller.require_trading()?;
    let seller = caller.seller;
    let product = run_blocking(&state, move |store, now| {
        listings::create_product(store, now, &seller, &draft)
    })
    .await?;
    Ok(created(product))
}

pub(crate) async fn update_product_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    Path(raw): Path<String>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> HttpResult<Json<Product>> {
    let id: ProductId = path_id(&raw, "id")?;
    caller.require_trading()?;
    let seller = caller.seller;
    let product = run_blocking(&state, move |store, now| {
        listings::update_product(store, now, &seller, id, &patch)
    })
    .await?;
    Ok(Json(product))
}

/// 204 whether the product was deleted or archived.
pub(crate) async fn delete_product_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    Path(raw): Path<String>,
) -> HttpResult<Response> {
    let id: ProductId = path_id(&raw, "id")?;
    caller.require_trading()?;
    let seller = caller.seller;
    run_blocking(&state, move |store, now| {
        listings::remove_product(store, now, &seller, id)
    })
    .await?;
    Ok(no_content())
}

pub(crate) async fn set_active_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<SetActiveRequest>,
) -> HttpResult<Json<Product>> {
    let id: ProductId = path_id(&raw, "id")?;
    caller.require_trading()?;
    let seller = caller.seller;
    let product = run_blocking(&state, move |store, now| {
        listings::set_active(store, now, &seller, id, body.is_active)
    })
    .await?;
    Ok(Json(product))
}

pub(crate) async fn orders_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<SellerOrderLine>>> {
    let page = parse_page_params(&query, state.api.default_page_limit)?;
    let status = parse_enum_param::<FulfillmentStatus>(&query, "status")?;
    let before = id_cursor(page.cursor.as_deref())?;
    let seller = caller.seller.id;
    let lines = run_blocking(&state, move |store, _| {
        Ok(store.seller_order_lines(seller, status, before, page.limit)?)
    })
    .await?;
    Ok(Json(page_dto(lines)))
}

pub(crate) async fn item_status_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<SetFulfillmentStatusRequest>,
) -> HttpResult<Json<OrderItem>> {
    let id: OrderItemId = path_id(&raw, "id")?;
    caller.require_trading()?;
    let seller = caller.seller;
    let item = run_blocking(&state, move |store, now| {
        fulfillment::set_item_status(store, now, &seller, id, body.status)
    })
    .await?;
    Ok(Json(item))
}

pub(crate) async fn stats_handler(
    State(state): State<AppState>,
    caller: SellerCaller,
) -> HttpResult<Json<SellerStats>> {
    let seller = caller.seller.id;
    let stats = run_blocking(&state, move |store, _| Ok(store.seller_stats(seller)?)).await?;
    Ok(Json(stats))
}
