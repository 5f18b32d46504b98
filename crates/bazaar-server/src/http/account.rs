// SPDX-License-Identifier: Apache-2.0

//! The caller's own profile, address book and notifications.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use bazaar_api::{
    parse_enum_param, parse_page_params, MeDto, NotificationPageDto, UpdateProfileRequest,
};
use bazaar_model::{
    Address, AddressId, AddressInput, Notification, NotificationId, ProfileChanges, UserProfile,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{HttpResult, ServiceError};
use crate::http::extract::{Caller, JsonBody};
use crate::http::{created, id_cursor, no_content, path_id, run_blocking};
use crate::AppState;

pub(crate) async fn me_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> HttpResult<Json<MeDto>> {
    let profile = caller.profile;
    let user = profile.id.clone();
    let seller = run_blocking(&state, move |store, _| Ok(store.find_seller_by_user(&user)?)).await?;
    Ok(Json(MeDto { profile, seller }))
}

pub(crate) async fn update_me_handler(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> HttpResult<Json<UserProfile>> {
    let changes =
        ProfileChanges::normalize(body.display_name.as_deref(), body.email.as_deref())
            .map_err(ServiceError::from)?;
    let user = caller.profile.id;
    let profile = run_blocking(&state, move |store, _| {
        Ok(store.update_user_profile(
            &user,
            changes.display_name.as_deref(),
            changes.email.as_deref(),
        )?)
    })
    .await?;
    Ok(Json(profile))
}

pub(crate) async fn addresses_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> HttpResult<Json<Vec<Address>>> {
    let user = caller.profile.id;
    let addresses = run_blocking(&state, move |store, _| Ok(store.list_addresses(&user)?)).await?;
    Ok(Json(addresses))
}

pub(crate) async fn create_address_handler(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<AddressInput>,
) -> HttpResult<Response> {
    let user = caller.profile.id;
    let address =
        run_blocking(&state, move |store, _| Ok(store.insert_address(&user, &input)?)).await?;
    Ok(created(address))
}

pub(crate) async fn update_address_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
    JsonBody(input): JsonBody<AddressInput>,
) -> HttpResult<Json<Address>> {
    let id: AddressId = path_id(&raw, "id")?;
    let user = caller.profile.id;
    let address =
        run_blocking(&state, move |store, _| Ok(store.update_address(&user, id, &input)?)).await?;
    Ok(Json(address))
}

pub(crate) async fn delete_address_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
) -> HttpResult<Response> {
    let id: AddressId = path_id(&raw, "id")?;
    let user = caller.profile.id;
    run_blocking(&state, move |store, _| Ok(store.delete_address(&user, id)?)).await?;
    Ok(no_content())
}

/// Newest first; `unread=true` narrows to unread entries.
pub(crate) async fn notifications_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<BTreeMap<String, String>>,
) -> HttpResult<Json<NotificationPageDto>> {
    let page = parse_page_params(&query, state.api.default_page_limit)?;
    let unread_only = parse_enum_param::<bool>(&query, "unread")?.unwrap_or(false);
    let before = id_cursor(page.cursor.as_deref())?;
    let user = caller.profile.id;
    let dto = run_blocking(&state, move |store, _| {
        let items = store.list_notifications(&user, unread_only, before, page.limit)?;
        let unread_count = store.unread_notification_count(&user)?;
        Ok(NotificationPageDto {
            items: items.items,
            next_cursor: items.next_cursor,
            unread_count,
        })
    })
    .await?;
    Ok(Json(dto))
}

pub(crate) async fn read_notification_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
) -> HttpResult<Json<Notification>> {
    let id: NotificationId = path_id(&raw, "id")?;
    let user = caller.profile.id;
    let notification =
        run_blocking(&state, move |store, _| Ok(store.mark_notification_read(&user, id)?)).await?;
    Ok(Json(notification))
}

pub(crate) async fn read_all_notifications_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> HttpResult<Json<Value>> {
    let user = caller.profile.id;
    let log_user = user.clone();
    let updated =
        run_blocking(&state, move |store, _| Ok(store.mark_all_notifications_read(&user)?)).await?;
    info!(user_id = %log_user, updated, "notifications marked read");
    Ok(Json(json!({ "updated": updated })))
}
