// SPDX-License-Identifier: Apache-2.0

mod support;

use bazaar_model::{OrderStatus, ProductId, SellerStatus};
use bazaar_store::FailPoint;
use serde_json::json;
use support::{
    approved_seller, call, discounted_product, get, listed_product, spawn, state, T0,
};

fn order_body(lines: &[(ProductId, u32, i64)], payment: &str) -> String {
    let items: Vec<_> = lines
        .iter()
        .map(|(id, qty, price)| json!({"product_id": id, "quantity": qty, "price": price}))
        .collect();
    json!({
        "items": items,
        "payment_method": payment,
        "shipping_address": "1 Market St, Springfield",
    })
    .to_string()
}

#[tokio::test]
async fn cash_order_decrements_stock_clears_cart_and_notifies_seller() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Lamp", 2500, 5);
    let addr = spawn(state.clone()).await;

    let add = call(
        addr,
        "POST",
        "/v1/cart/items",
        "buyer",
        Some(&json!({"product_id": product.id, "quantity": 2}).to_string()),
    )
    .await;
    assert_eq!(add.status, 200, "{}", add.body);
    assert_eq!(add.json()["total"], 5000);

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 2, 2500)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(placed.status, 201, "{}", placed.body);
    let body = placed.json();
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["total"], 5000);
    assert_eq!(body["items"][0]["seller_amount"], 4500);

    assert_eq!(state.store.get_product(product.id).unwrap().stock, 3);
    let cart = get(addr, "/v1/cart", Some("buyer")).await.json();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 0);

    let inbox = get(addr, "/v1/me/notifications", Some("shopkeeper")).await.json();
    assert_eq!(inbox["unread_count"], 1);
    assert_eq!(inbox["items"][0]["kind"], "new_order");
}

#[tokio::test]
async fn bank_transfer_orders_await_payment() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Kettle", 4000, 2);
    let addr = spawn(state).await;

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 1, 4000)], "bank_transfer")),
    )
    .await;
    assert_eq!(placed.status, 201, "{}", placed.body);
    assert_eq!(placed.json()["order"]["status"], "awaiting_payment");
}

#[tokio::test]
async fn stale_price_and_short_stock_are_rejected_without_side_effects() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Chair", 9900, 1);
    let addr = spawn(state.clone()).await;

    let stale = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 1, 9000)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(stale.status, 422);
    assert_eq!(stale.error_code(), "PriceMismatch");
    assert_eq!(stale.json()["error"]["details"]["expected"], 9900);

    let short = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 2, 9900)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(short.status, 422);
    assert_eq!(short.error_code(), "OutOfStock");

    assert_eq!(state.store.get_product(product.id).unwrap().stock, 1);
    assert!(state
        .store
        .list_orders(None, None, 10)
        .unwrap()
        .items
        .is_empty());
}

#[tokio::test]
async fn second_order_for_unsettled_products_is_a_duplicate() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Rug", 1500, 10);
    let addr = spawn(state).await;
    let body = order_body(&[(product.id, 1, 1500)], "cash_on_delivery");

    let first = call(addr, "POST", "/v1/orders", "buyer", Some(&body)).await;
    assert_eq!(first.status, 201);
    let second = call(addr, "POST", "/v1/orders", "buyer", Some(&body)).await;
    assert_eq!(second.status, 409);
    assert_eq!(second.error_code(), "DuplicateOrder");

    let other_buyer = call(addr, "POST", "/v1/orders", "someone-else", Some(&body)).await;
    assert_eq!(other_buyer.status, 201);
}

#[tokio::test]
async fn failed_stock_step_compensates_the_whole_order() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let first = listed_product(&state.store, &seller, "Cup", 500, 4);
    let second = listed_product(&state.store, &seller, "Saucer", 300, 4);
    let addr = spawn(state.clone()).await;

    state.store.arm_after(FailPoint::DecrementStock, 1);
    let failed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(
            &[(first.id, 2, 500), (second.id, 1, 300)],
            "cash_on_delivery",
        )),
    )
    .await;
    assert_eq!(failed.status, 500);
    assert_eq!(failed.error_code(), "Internal");

    assert_eq!(state.store.get_product(first.id).unwrap().stock, 4);
    assert_eq!(state.store.get_product(second.id).unwrap().stock, 4);
    assert!(state
        .store
        .list_orders(None, None, 10)
        .unwrap()
        .items
        .is_empty());
    assert!(!state.store.product_has_orders(first.id).unwrap());
}

#[tokio::test]
async fn buyer_cancel_restores_stock_once() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Vase", 1200, 3);
    let addr = spawn(state.clone()).await;

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 2, 1200)], "cash_on_delivery")),
    )
    .await
    .json();
    let order_id = placed["order"]["id"].as_i64().unwrap();
    assert_eq!(state.store.get_product(product.id).unwrap().stock, 1);

    let stranger = call(addr, "POST", &format!("/v1/orders/{order_id}/cancel"), "intruder", None).await;
    assert_eq!(stranger.status, 404);

    let cancelled = call(addr, "POST", &format!("/v1/orders/{order_id}/cancel"), "buyer", None).await;
    assert_eq!(cancelled.status, 200, "{}", cancelled.body);
    assert_eq!(cancelled.json()["status"], OrderStatus::Cancelled.as_str());
    assert_eq!(state.store.get_product(product.id).unwrap().stock, 3);

    let again = call(addr, "POST", &format!("/v1/orders/{order_id}/cancel"), "buyer", None).await;
    assert_eq!(again.status, 409);
    assert_eq!(again.error_code(), "InvalidTransition");
    assert_eq!(state.store.get_product(product.id).unwrap().stock, 3);

    let detail = get(addr, &format!("/v1/orders/{order_id}"), Some("buyer")).await.json();
    assert_eq!(detail["items"][0]["status"], "cancelled");
}

#[tokio::test]
async fn hidden_products_and_suspended_shops_cannot_be_bought() {
    let state = state();
    let open_shop = approved_seller(&state.store, "open-shop");
    let closed_shop = approved_seller(&state.store, "closed-shop");
    let shelved = listed_product(&state.store, &open_shop, "Shelved", 700, 4);
    let frozen = listed_product(&state.store, &closed_shop, "Frozen", 900, 4);
    state.store.set_product_active(shelved.id, false, T0).unwrap();
    state
        .store
        .set_seller_status(
            closed_shop.id,
            SellerStatus::Approved,
            SellerStatus::Suspended,
            Some("chargebacks"),
            T0,
        )
        .unwrap();
    let addr = spawn(state.clone()).await;

    for (product, price) in [(shelved.id, 700), (frozen.id, 900)] {
        let reply = call(
            addr,
            "POST",
            "/v1/orders",
            "buyer",
            Some(&order_body(&[(product, 1, price)], "cash_on_delivery")),
        )
        .await;
        assert_eq!(reply.status, 422, "{}", reply.body);
        assert_eq!(reply.error_code(), "ProductUnavailable");
        assert_eq!(reply.json()["error"]["details"]["product_id"], product.get());
    }
    assert_eq!(state.store.get_product(shelved.id).unwrap().stock, 4);
    assert_eq!(state.store.get_product(frozen.id).unwrap().stock, 4);
}

#[tokio::test]
async fn sale_price_is_the_price_buyers_must_confirm() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let coat = discounted_product(&state.store, &seller, "Coat", 10_000, 7_500, 3);
    let addr = spawn(state).await;

    let list_price = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(coat.id, 1, 10_000)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(list_price.error_code(), "PriceMismatch");
    assert_eq!(list_price.json()["error"]["details"]["expected"], 7_500);

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(coat.id, 2, 7_500)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(placed.status, 201, "{}", placed.body);
    let body = placed.json();
    assert_eq!(body["order"]["total"], 15_000);
    assert_eq!(body["items"][0]["unit_price"], 7_500);
    assert_eq!(body["items"][0]["seller_amount"], 13_500);
}

#[tokio::test]
async fn stored_address_is_copied_onto_the_order() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let clock = listed_product(&state.store, &seller, "Clock", 3000, 2);
    let addr = spawn(state).await;

    let saved = call(
        addr,
        "POST",
        "/v1/me/addresses",
        "buyer",
        Some(
            &json!({
                "full_name": "Ada Byron",
                "line1": "12 Engine Row",
                "city": "London",
                "postal_code": "N1 9GU",
                "country": "GB",
            })
            .to_string(),
        ),
    )
    .await;
    assert_eq!(saved.status, 201, "{}", saved.body);
    let address_id = saved.json()["id"].as_i64().unwrap();

    let order = |who: &'static str| {
        let body = json!({
            "items": [{"product_id": clock.id, "quantity": 1, "price": 3000}],
            "payment_method": "cash_on_delivery",
            "address_id": address_id,
        })
        .to_string();
        async move { call(addr, "POST", "/v1/orders", who, Some(&body)).await }
    };

    let borrowed = order("someone-else").await;
    assert_eq!(borrowed.status, 404);

    let placed = order("buyer").await;
    assert_eq!(placed.status, 201, "{}", placed.body);
    assert_eq!(
        placed.json()["order"]["shipping_address"],
        "Ada Byron, 12 Engine Row, N1 9GU London, GB"
    );
}

#[tokio::test]
async fn failed_item_insert_removes_the_order_row() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Tray", 1100, 6);
    let addr = spawn(state.clone()).await;

    state.store.arm(FailPoint::InsertOrderItems);
    let failed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 2, 1100)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(failed.status, 500);
    assert_eq!(failed.error_code(), "Internal");
    assert!(state
        .store
        .list_orders(None, None, 10)
        .unwrap()
        .items
        .is_empty());
    assert_eq!(state.store.get_product(product.id).unwrap().stock, 6);

    let retried = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(product.id, 2, 1100)], "cash_on_delivery")),
    )
    .await;
    assert_eq!(retried.status, 201, "{}", retried.body);
}

#[tokio::test]
async fn item_cancel_then_order_cancel_restocks_each_line_once() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let plate = listed_product(&state.store, &seller, "Plate", 600, 5);
    let bowl = listed_product(&state.store, &seller, "Bowl", 400, 5);
    let addr = spawn(state.clone()).await;

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(&order_body(&[(plate.id, 2, 600), (bowl.id, 1, 400)], "cash_on_delivery")),
    )
    .await
    .json();
    let order_id = placed["order"]["id"].as_i64().unwrap();
    let plate_item = placed["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["product_id"] == plate.id.get())
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let dropped = call(
        addr,
        "PUT",
        &format!("/v1/seller/order-items/{plate_item}/status"),
        "shopkeeper",
        Some(&json!({"status": "cancelled"}).to_string()),
    )
    .await;
    assert_eq!(dropped.status, 200, "{}", dropped.body);
    assert_eq!(state.store.get_product(plate.id).unwrap().stock, 5);

    let again = call(
        addr,
        "PUT",
        &format!("/v1/seller/order-items/{plate_item}/status"),
        "shopkeeper",
        Some(&json!({"status": "cancelled"}).to_string()),
    )
    .await;
    assert_eq!(again.status, 409);

    let cancelled = call(addr, "POST", &format!("/v1/orders/{order_id}/cancel"), "buyer", None).await;
    assert_eq!(cancelled.status, 200, "{}", cancelled.body);
    assert_eq!(state.store.get_product(plate.id).unwrap().stock, 5);
    assert_eq!(state.store.get_product(bowl.id).unwrap().stock, 5);
}
