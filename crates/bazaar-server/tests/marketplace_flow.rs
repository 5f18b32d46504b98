// SPDX-License-Identifier: Apache-2.0

mod support;

use bazaar_model::ProductStatus;
use serde_json::json;
use support::{approved_seller, call, get, listed_product, make_admin, spawn, state};

#[tokio::test]
async fn applicant_becomes_seller_only_after_admin_approval() {
    let state = state();
    make_admin(&state.store, "root");
    let addr = spawn(state).await;

    let applied = call(
        addr,
        "POST",
        "/v1/seller/apply",
        "maker",
        Some(
            &json!({"shop_name": "Maker Goods", "contact_email": "Maker@Example.com"})
                .to_string(),
        ),
    )
    .await;
    assert_eq!(applied.status, 201, "{}", applied.body);
    let seller = applied.json();
    assert_eq!(seller["status"], "pending");
    let seller_id = seller["id"].as_i64().unwrap();

    let me = get(addr, "/v1/me", Some("maker")).await.json();
    assert_eq!(me["profile"]["role"], "buyer");
    assert_eq!(me["seller"]["status"], "pending");

    let early = get(addr, "/v1/seller/profile", Some("maker")).await;
    assert_eq!(early.status, 403);
    assert_eq!(early.error_code(), "Forbidden");

    let by_buyer = call(addr, "POST", &format!("/v1/admin/sellers/{seller_id}/approve"), "maker", None).await;
    assert_eq!(by_buyer.status, 403);

    let pending = get(addr, "/v1/admin/sellers?status=pending", Some("root")).await.json();
    assert_eq!(pending["items"].as_array().unwrap().len(), 1);

    let approved = call(addr, "POST", &format!("/v1/admin/sellers/{seller_id}/approve"), "root", None).await;
    assert_eq!(approved.status, 200, "{}", approved.body);
    assert_eq!(approved.json()["status"], "approved");

    let me = get(addr, "/v1/me", Some("maker")).await.json();
    assert_eq!(me["profile"]["role"], "seller");
    let inbox = get(addr, "/v1/me/notifications", Some("maker")).await.json();
    assert_eq!(inbox["items"][0]["kind"], "seller_approved");

    let twice = call(addr, "POST", &format!("/v1/admin/sellers/{seller_id}/approve"), "root", None).await;
    assert_eq!(twice.status, 409);
    assert_eq!(twice.error_code(), "InvalidTransition");

    let public = get(addr, &format!("/v1/sellers/{seller_id}"), None).await.json();
    assert_eq!(public["shop_name"], "Maker Goods");
    assert!(public.get("contact_email").is_none());
}

#[tokio::test]
async fn listings_stay_hidden_until_approved_and_return_to_review_on_edit() {
    let state = state();
    make_admin(&state.store, "root");
    approved_seller(&state.store, "potter");
    let addr = spawn(state).await;

    let created = call(
        addr,
        "POST",
        "/v1/seller/products",
        "potter",
        Some(&json!({"name": "Bowl", "price": 1800, "stock": 6}).to_string()),
    )
    .await;
    assert_eq!(created.status, 201, "{}", created.body);
    let product_id = created.json()["id"].as_i64().unwrap();
    assert_eq!(created.json()["status"], "pending");

    assert_eq!(get(addr, &format!("/v1/products/{product_id}"), None).await.status, 404);
    let listed = get(addr, "/v1/products", None).await.json();
    assert!(listed["items"].as_array().unwrap().is_empty());
    let cart = call(
        addr,
        "POST",
        "/v1/cart/items",
        "buyer",
        Some(&json!({"product_id": product_id, "quantity": 1}).to_string()),
    )
    .await;
    assert_eq!(cart.error_code(), "ProductUnavailable");

    let queue = get(addr, "/v1/admin/products?status=pending", Some("root")).await.json();
    assert_eq!(queue["items"][0]["id"], product_id);
    let approved = call(addr, "POST", &format!("/v1/admin/products/{product_id}/approve"), "root", None).await;
    assert_eq!(approved.status, 200, "{}", approved.body);

    let visible = get(addr, &format!("/v1/products/{product_id}"), None).await;
    assert_eq!(visible.status, 200);
    assert_eq!(visible.json()["price"], 1800);

    let restock = call(
        addr,
        "PUT",
        &format!("/v1/seller/products/{product_id}"),
        "potter",
        Some(&json!({"stock": 20}).to_string()),
    )
    .await;
    assert_eq!(restock.json()["status"], "approved");

    let repriced = call(
        addr,
        "PUT",
        &format!("/v1/seller/products/{product_id}"),
        "potter",
        Some(&json!({"price": 2200}).to_string()),
    )
    .await;
    assert_eq!(repriced.status, 200, "{}", repriced.body);
    assert_eq!(repriced.json()["status"], "pending");
    assert_eq!(get(addr, &format!("/v1/products/{product_id}"), None).await.status, 404);

    let rejected = call(
        addr,
        "POST",
        &format!("/v1/admin/products/{product_id}/reject"),
        "root",
        Some(&json!({"reason": "  blurry photos  "}).to_string()),
    )
    .await;
    assert_eq!(rejected.status, 200, "{}", rejected.body);
    assert_eq!(rejected.json()["rejection_reason"], "blurry photos");
}

#[tokio::test]
async fn other_sellers_cannot_touch_a_listing() {
    let state = state();
    let owner = approved_seller(&state.store, "owner");
    approved_seller(&state.store, "rival");
    let product = listed_product(&state.store, &owner, "Scarf", 3000, 2);
    let addr = spawn(state).await;

    let edit = call(
        addr,
        "PUT",
        &format!("/v1/seller/products/{}", product.id),
        "rival",
        Some(&json!({"stock": 0}).to_string()),
    )
    .await;
    assert_eq!(edit.status, 404);
    let delete = call(addr, "DELETE", &format!("/v1/seller/products/{}", product.id), "rival", None).await;
    assert_eq!(delete.status, 404);
}

#[tokio::test]
async fn suspended_seller_disappears_from_the_storefront() {
    let state = state();
    make_admin(&state.store, "root");
    let seller = approved_seller(&state.store, "weaver");
    let product = listed_product(&state.store, &seller, "Blanket", 7000, 3);
    let addr = spawn(state).await;

    let suspended = call(
        addr,
        "POST",
        &format!("/v1/admin/sellers/{}/suspend", seller.id),
        "root",
        Some(&json!({"reason": "chargebacks"}).to_string()),
    )
    .await;
    assert_eq!(suspended.status, 200, "{}", suspended.body);
    assert_eq!(get(addr, &format!("/v1/products/{}", product.id), None).await.status, 404);
    assert_eq!(get(addr, &format!("/v1/sellers/{}", seller.id), None).await.status, 404);

    let blocked = call(
        addr,
        "POST",
        "/v1/seller/products",
        "weaver",
        Some(&json!({"name": "Shawl", "price": 100, "stock": 1}).to_string()),
    )
    .await;
    assert_eq!(blocked.status, 403);

    let reinstated = call(addr, "POST", &format!("/v1/admin/sellers/{}/reinstate", seller.id), "root", None).await;
    assert_eq!(reinstated.json()["status"], "approved");
    assert_eq!(get(addr, &format!("/v1/products/{}", product.id), None).await.status, 200);
}

#[tokio::test]
async fn delivering_every_item_settles_the_order() {
    let state = state();
    let first_shop = approved_seller(&state.store, "baker");
    let second_shop = approved_seller(&state.store, "grocer");
    let bread = listed_product(&state.store, &first_shop, "Bread", 400, 10);
    let milk = listed_product(&state.store, &second_shop, "Milk", 250, 10);
    let addr = spawn(state).await;

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(
            &json!({
                "items": [
                    {"product_id": bread.id, "quantity": 1, "price": 400},
                    {"product_id": milk.id, "quantity": 2, "price": 250},
                ],
                "payment_method": "cash_on_delivery",
                "shipping_address": "9 Elm Row",
            })
            .to_string(),
        ),
    )
    .await;
    assert_eq!(placed.status, 201, "{}", placed.body);
    let order_id = placed.json()["order"]["id"].as_i64().unwrap();

    let baker_lines = get(addr, "/v1/seller/orders", Some("baker")).await.json();
    let baker_items = baker_lines["items"].as_array().unwrap();
    assert_eq!(baker_items.len(), 1);
    let bread_item = baker_items[0]["item"]["id"].as_i64().unwrap();
    let grocer_lines = get(addr, "/v1/seller/orders", Some("grocer")).await.json();
    let milk_item = grocer_lines["items"][0]["item"]["id"].as_i64().unwrap();

    let foreign = call(
        addr,
        "PUT",
        &format!("/v1/seller/order-items/{milk_item}/status"),
        "baker",
        Some(&json!({"status": "shipped"}).to_string()),
    )
    .await;
    assert_eq!(foreign.status, 404);

    let skipped = call(
        addr,
        "PUT",
        &format!("/v1/seller/order-items/{bread_item}/status"),
        "baker",
        Some(&json!({"status": "delivered"}).to_string()),
    )
    .await;
    assert_eq!(skipped.error_code(), "InvalidTransition");

    for (who, item) in [("baker", bread_item), ("grocer", milk_item)] {
        for status in ["processing", "shipped", "delivered"] {
            let moved = call(
                addr,
                "PUT",
                &format!("/v1/seller/order-items/{item}/status"),
                who,
                Some(&json!({ "status": status }).to_string()),
            )
            .await;
            assert_eq!(moved.status, 200, "{who} -> {status}: {}", moved.body);
        }
    }

    let detail = get(addr, &format!("/v1/orders/{order_id}"), Some("buyer")).await.json();
    assert_eq!(detail["order"]["status"], "delivered");

    let stats = get(addr, "/v1/seller/stats", Some("grocer")).await.json();
    assert_eq!(stats["earnings"], 450);
    assert_eq!(stats["units_sold"], 2);
}

#[tokio::test]
async fn deleting_a_listing_keeps_products_that_were_ordered() {
    let state = state();
    let seller = approved_seller(&state.store, "shopkeeper");
    let unsold = listed_product(&state.store, &seller, "Unsold", 1000, 3);
    let sold = listed_product(&state.store, &seller, "Sold", 1200, 3);
    let addr = spawn(state.clone()).await;

    let placed = call(
        addr,
        "POST",
        "/v1/orders",
        "buyer",
        Some(
            &json!({
                "items": [{"product_id": sold.id, "quantity": 1, "price": 1200}],
                "payment_method": "cash_on_delivery",
                "shipping_address": "1 Market St, Springfield",
            })
            .to_string(),
        ),
    )
    .await;
    assert_eq!(placed.status, 201, "{}", placed.body);

    let gone = call(addr, "DELETE", &format!("/v1/seller/products/{}", unsold.id), "shopkeeper", None).await;
    assert_eq!(gone.status, 204, "{}", gone.body);
    assert!(state.store.get_product(unsold.id).unwrap_err().is_not_found());

    let archived = call(addr, "DELETE", &format!("/v1/seller/products/{}", sold.id), "shopkeeper", None).await;
    assert_eq!(archived.status, 204, "{}", archived.body);
    let kept = state.store.get_product(sold.id).unwrap();
    assert_eq!(kept.status, ProductStatus::Rejected);
    assert_eq!(kept.rejection_reason.as_deref(), Some("withdrawn by seller"));
    assert!(!kept.is_active);
    assert_eq!(get(addr, &format!("/v1/products/{}", sold.id), None).await.status, 404);

    let order_id = placed.json()["order"]["id"].as_i64().unwrap();
    let history = get(addr, &format!("/v1/orders/{order_id}"), Some("buyer")).await;
    assert_eq!(history.status, 200);
    assert_eq!(history.json()["items"][0]["product_name"], "Sold");
}

#[tokio::test]
async fn rejected_listing_notifies_the_seller_with_the_reason() {
    let state = state();
    make_admin(&state.store, "root");
    let seller = approved_seller(&state.store, "shopkeeper");
    let product = listed_product(&state.store, &seller, "Lamp", 4500, 1);
    let addr = spawn(state).await;

    let rejected = call(
        addr,
        "POST",
        &format!("/v1/admin/products/{}/reject", product.id),
        "root",
        Some(&json!({"reason": "counterfeit branding"}).to_string()),
    )
    .await;
    assert_eq!(rejected.status, 200, "{}", rejected.body);

    let inbox = get(addr, "/v1/me/notifications", Some("shopkeeper")).await.json();
    let notice = inbox["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["kind"] == "product_rejected")
        .cloned()
        .expect("rejection notice");
    let message = notice["message"].as_str().unwrap();
    assert!(message.contains("Lamp"), "{message}");
    assert!(message.contains("counterfeit branding"), "{message}");
}
