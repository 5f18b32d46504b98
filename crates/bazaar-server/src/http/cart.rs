// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use bazaar_api::{AddCartItemRequest, CartDto, CartLineDto, SetCartQuantityRequest};
use bazaar_model::{Money, ProductId, UserId};
use bazaar_store::Store;

use crate::error::{HttpResult, ServiceError};
use crate::http::extract::{Caller, JsonBody};
use crate::http::{no_content, path_id, run_blocking};
use crate::AppState;

/// Cart priced at current catalog prices. Lines that can no longer be bought
/// stay visible but do not count toward the total.
fn cart_view(store: &Store, user: &UserId) -> Result<CartDto, ServiceError> {
    let lines = store.cart_lines(user)?;
    let mut trading = BTreeMap::new();
    let mut out = Vec::with_capacity(lines.len());
    let mut total = Money::ZERO;
    for line in lines {
        let seller_id = line.product.seller_id;
        let seller_ok = match trading.get(&seller_id) {
            Some(ok) => *ok,
            None => {
                let ok = store.get_seller(seller_id)?.is_trading();
                trading.insert(seller_id, ok);
                ok
            }
        };
        let available = seller_ok && line.product.is_purchasable();
        let unit_price = line.product.effective_price();
        let line_total = unit_price.checked_mul(line.item.quantity)?;
        if available {
            total = total.checked_add(line_total)?;
        }
        out.push(CartLineDto {
            product_id: line.product.id,
            name: line.product.name,
            quantity: line.item.quantity,
            unit_price,
            line_total,
            in_stock: line.product.stock >= i64::from(line.item.quantity),
            available,
        });
    }
    Ok(CartDto { lines: out, total })
}

pub(crate) async fn cart_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> HttpResult<Json<CartDto>> {
    let user = caller.profile.id;
    let cart = run_blocking(&state, move |store, _| cart_view(store, &user)).await?;
    Ok(Json(cart))
}

pub(crate) async fn clear_cart_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> HttpResult<Response> {
    let user = caller.profile.id;
    run_blocking(&state, move |store, _| Ok(store.clear_cart(&user)?)).await?;
    Ok(no_content())
}

/// Only products on the storefront can be added.
pub(crate) async fn add_item_handler(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<AddCartItemRequest>,
) -> HttpResult<Json<CartDto>> {
    let user = caller.profile.id;
    let cart = run_blocking(&state, move |store, now| {
        match store.get_visible_product(body.product_id) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                return Err(ServiceError::ProductUnavailable(body.product_id))
            }
            Err(e) => return Err(e.into()),
        }
        store.add_cart_item(&user, body.product_id, body.quantity, now)?;
        cart_view(store, &user)
    })
    .await?;
    Ok(Json(cart))
}

pub(crate) async fn set_quantity_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
    JsonBody(body): JsonBody<SetCartQuantityRequest>,
) -> HttpResult<Json<CartDto>> {
    let product: ProductId = path_id(&raw, "product_id")?;
    let user = caller.profile.id;
    let cart = run_blocking(&state, move |store, _| {
        store.set_cart_quantity(&user, product, body.quantity)?;
        cart_view(store, &user)
    })
    .await?;
    Ok(Json(cart))
}

pub(crate) async fn remove_item_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw): Path<String>,
) -> HttpResult<Response> {
    let product: ProductId = path_id(&raw, "product_id")?;
    let user = caller.profile.id;
    run_blocking(&state, move |store, _| Ok(store.remove_cart_item(&user, product)?)).await?;
    Ok(no_content())
}
