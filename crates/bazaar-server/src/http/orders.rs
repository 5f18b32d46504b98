// SPDX-License-Identifier: Apache-2.0

//! Buyer side of orders.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use bazaar_api::{parse_page_params, OrderDetailDto, PageDto, PlaceOrderRequest};
use bazaar_model::{Order, OrderId, Role};

use crate::error::{HttpResult, ServiceError};
use crate::http::extract::{Caller, JsonBody};
use crate::http::{created, id_cursor, page_dto, path_id, run_blocking};
use crate::services::{checkout, fulfillment};
use crate::AppState;

pub(crate) async fn orders_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<PageDto<Order>>> {
    let page = parse_page_params(&query, state.api.default_page_limit)?;
    let before = id_cursor(page.cursor.as_deref())?;
    let user = caller.profile.id;
    let orders = run_blocking(&state, move |store, _| {
        Ok(store.list_orders_for_user(&user, before, page.limit)?)
    })
    .await?;
    Ok(Json(page_dto(orders)))
}

pub(crate) async fn place_order_handler(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<PlaceOrderRequest>,
) -> HttpResult<Response> {
    let buyer = caller.profile.id;
    let placed =
        run_blocking(&state, move |store, now| checkout::place_order(store, now, &buyer, &body))
            .await?;
    Ok(created(OrderDetailDto {
        order: placed.order,
        items: placed.items,
    }))
}

/// Buyers see their own orders; admins see any.
pub(crate) async fn order_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
) -> HttpResult<Json<OrderDetailDto>> {
    let id: OrderId = path_id(&raw, "id")?;
    let profile = caller.profile;
    let detail = run_blocking(&state, move |store, _| {
        let order = store.get_order(id)?;
        if order.user_id != profile.id && profile.role != Role::Admin {
            return Err(ServiceError::NotFound(format!("order {id}")));
        }
        let items = store.order_items(id)?;
        Ok(OrderDetailDto { order, items })
    })
    .await?;
    Ok(Json(detail))
}

pub(crate) async fn cancel_order_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
) -> HttpResult<Json<Order>> {
    let id: OrderId = path_id(&raw, "id")?;
    let buyer = caller.profile.id;
    let order = run_blocking(&state, move |store, now| {
        fulfillment::cancel_order(store, now, &buyer, id)
    })
    .await?;
    Ok(Json(order))
}
