// SPDX-License-Identifier: Apache-2.0

//! Admin console: onboarding and moderation queues, orders, settings,
//! categories and users.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use bazaar_api::{
    parse_enum_param, parse_page_params, ApiError, PageDto, ReasonRequest, SetOrderStatusRequest,
    SetRoleRequest, SettingsDto, UpdateSettingsRequest,
};
use bazaar_model::{
    CategoryId, CommissionRate, NewCategory, Order, OrderId, OrderStatus, Product, ProductId,
    ProductStatus, Role, Seller, SellerId, SellerStatus, UserId, UserProfile,
};
use bazaar_store::{MarketStats, ProductScope, UserCursor};
use tracing::info;

use crate::error::{HttpResult, ServiceError};
use crate::http::extract::{AdminCaller, JsonBody};
use crate::http::storefront::product_filter;
use crate::http::{created, id_cursor, no_content, page_dto, path_id, run_blocking};
use crate::services::{fulfillment, moderation, onboarding};
use crate::AppState;

fn settings_dto(rate: CommissionRate) -> SettingsDto {
    SettingsDto {
        commission_rate: rate.as_ratio(),
        commission_bps: rate.bps(),
    }
}

pub(crate) async fn sellers_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Seller>>> {
    let page = parse_page_params(&query, state.api.default_page_limit)?;
    let status = parse_enum_param::<SellerStatus>(&query, "status")?;
    let before = id_cursor(page.cursor.as_deref())?;
    let sellers = run_blocking(&state, move |store, _| {
        Ok(store.list_sellers(status, before, page.limit)?)
    })
    .await?;
    Ok(Json(page_dto(sellers)))
}

pub(crate) async fn approve_seller_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
) -> HttpResult<Json<Seller>> {
    let id: SellerId = path_id(&raw, "id")?;
    let seller =
        run_blocking(&state, move |store, now| onboarding::approve_seller(store, now, id)).await?;
    Ok(Json(seller))
}

pub(crate) async fn reject_seller_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<ReasonRequest>,
) -> HttpResult<Json<Seller>> {
    let id: SellerId = path_id(&raw, "id")?;
    let seller = run_blocking(&state, move |store, now| {
        onboarding::reject_seller(store, now, id, &body.reason)
    })
    .await?;
    Ok(Json(seller))
}

pub(crate) async fn suspend_seller_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<ReasonRequest>,
) -> HttpResult<Json<Seller>> {
    let id: SellerId = path_id(&raw, "id")?;
    let seller = run_blocking(&state, move |store, now| {
        onboarding::suspend_seller(store, now, id, &body.reason)
    })
    .await?;
    Ok(Json(seller))
}

pub(crate) async fn reinstate_seller_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
) -> HttpResult<Json<Seller>> {
    let id: SellerId = path_id(&raw, "id")?;
    let seller =
        run_blocking(&state, move |store, now| onboarding::reinstate_seller(store, now, id))
            .await?;
    Ok(Json(seller))
}

/// Moderation queue. `status` narrows it; search filters apply as on the
/// storefront.
pub(crate) async fn products_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Product>>> {
    let status = parse_enum_param::<ProductStatus>(&query, "status")?;
    let filter = product_filter(
        ProductScope::Moderation(status),
        &query,
        state.api.default_page_limit,
    )?;
    let page = run_blocking(&state, move |store, _| Ok(store.search_products(&filter)?)).await?;
    Ok(Json(page_dto(page)))
}

pub(crate) async fn approve_product_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
) -> HttpResult<Json<Product>> {
    let id: ProductId = path_id(&raw, "id")?;
    let product =
        run_blocking(&state, move |store, now| moderation::approve_product(store, now, id))
            .await?;
    Ok(Json(product))
}

pub(crate) async fn reject_product_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<ReasonRequest>,
) -> HttpResult<Json<Product>> {
    let id: ProductId = path_id(&raw, "id")?;
    let product = run_blocking(&state, move |store, now| {
        moderation::reject_product(store, now, id, &body.reason)
    })
    .await?;
    Ok(Json(product))
}

pub(crate) async fn orders_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Order>>> {
    let page = parse_page_params(&query, state.api.default_page_limit)?;
    let status = parse_enum_param::<OrderStatus>(&query, "status")?;
    let before = id_cursor(page.cursor.as_deref())?;
    let orders = run_blocking(&state, move |store, _| {
        Ok(store.list_orders(status, before, page.limit)?)
    })
    .await?;
    Ok(Json(page_dto(orders)))
}

pub(crate) async fn order_status_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<SetOrderStatusRequest>,
) -> HttpResult<Json<Order>> {
    let id: OrderId = path_id(&raw, "id")?;
    let order = run_blocking(&state, move |store, now| {
        fulfillment::set_order_status(store, now, id, body.status)
    })
    .await?;
    Ok(Json(order))
}

pub(crate) async fn settings_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> HttpResult<Json<SettingsDto>> {
    let rate = run_blocking(&state, |store, _| Ok(store.commission_rate()?)).await?;
    Ok(Json(settings_dto(rate)))
}

/// Applies to orders placed from now on; existing items keep their split.
pub(crate) async fn update_settings_handler(
    State(state): State<AppState>,
    admin: AdminCaller,
    JsonBody(body): JsonBody<UpdateSettingsRequest>,
) -> HttpResult<Json<SettingsDto>> {
    let rate = CommissionRate::from_ratio(body.commission_rate).map_err(ServiceError::from)?;
    let rate = run_blocking(&state, move |store, now| {
        Ok(store.set_commission_rate(rate, now)?)
    })
    .await?;
    info!(admin = %admin.profile.id, commission_bps = rate.bps(), "settings changed");
    Ok(Json(settings_dto(rate)))
}

pub(crate) async fn create_category_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(body): JsonBody<NewCategory>,
) -> HttpResult<Response> {
    let slug = body.resolve_slug().map_err(ServiceError::from)?;
    let category = run_blocking(&state, move |store, _| {
        Ok(store.insert_category(&body.name, &slug)?)
    })
    .await?;
    Ok(created(category))
}

pub(crate) async fn delete_category_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(raw): Path<String>,
) -> HttpResult<Response> {
    let id: CategoryId = path_id(&raw, "id")?;
    run_blocking(&state, move |store, _| Ok(store.delete_category(id)?)).await?;
    Ok(no_content())
}

/// Ordered by user id; the cursor carries the last id seen.
pub(crate) async fn users_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<UserProfile>>> {
    let page = parse_page_params(&query, state.api.default_page_limit)?;
    let role = parse_enum_param::<Role>(&query, "role")?;
    let after = page
        .cursor
        .as_deref()
        .map(|raw| UserCursor::decode(raw).map_err(|_| ApiError::invalid_cursor(raw)))
        .transpose()?;
    let users = run_blocking(&state, move |store, _| {
        Ok(store.list_users(role, after.as_ref(), page.limit)?)
    })
    .await?;
    Ok(Json(page_dto(users)))
}

pub(crate) async fn user_role_handler(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<SetRoleRequest>,
) -> HttpResult<Json<UserProfile>> {
    let id: UserId = path_id(&raw, "id")?;
    if id == admin.profile.id {
        return Err(ServiceError::Forbidden("admins cannot change their own role".to_string()).into());
    }
    let profile = run_blocking(&state, move |store, _| Ok(store.set_user_role(&id, body.role)?))
        .await?;
    info!(admin = %admin.profile.id, user_id = %profile.id, role = profile.role.as_str(), "role changed");
    Ok(Json(profile))
}

pub(crate) async fn stats_handler(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> HttpResult<Json<MarketStats>> {
    let stats = run_blocking(&state, |store, _| Ok(store.market_stats()?)).await?;
    Ok(Json(stats))
}
