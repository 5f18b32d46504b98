// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Barrier};
use std::thread;

use bazaar_model::{
    AddressInput, CommissionRate, FulfillmentStatus, Money, NotificationKind, Order, OrderStatus,
    PaymentMethod, Product, ProductDraft, ProductId, ProductSort, ProductStatus, Role, Seller,
    SellerApplication, SellerStatus, UserId,
};
use bazaar_store::{
    FailPoint, IdCursor, NewOrder, NewOrderItem, ProductCursor, ProductFilter, ProductScope, Store,
    StoreErrorCode, SCHEMA_VERSION,
};

const T0: i64 = 1_700_000_000_000;

fn store() -> Store {
    let store = Store::open_in_memory().expect("open");
    store.migrate().expect("migrate");
    store
}

fn user(name: &str) -> UserId {
    UserId::new(name).expect("user id")
}

fn approved_seller(store: &Store, name: &str) -> Seller {
    let uid = user(name);
    store.ensure_user(&uid, T0).expect("user");
    let app = SellerApplication {
        shop_name: format!("{name} shop"),
        description: None,
        contact_email: format!("{name}@example.com"),
        phone: None,
    };
    let seller = store
        .upsert_seller_application(&uid, &app, T0)
        .expect("apply");
    store
        .set_seller_status(seller.id, SellerStatus::Pending, SellerStatus::Approved, None, T0)
        .expect("approve")
}

fn listed_product(store: &Store, seller: &Seller, name: &str, cents: i64, stock: i64, at: i64) -> Product {
    let draft = ProductDraft {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        price: Money::from_cents(cents).expect("money"),
        discount_price: None,
        stock,
        category_id: None,
        image_url: None,
    };
    let product = store.insert_product(seller.id, &draft, at).expect("insert");
    store
        .set_product_status(product.id, ProductStatus::Pending, ProductStatus::Approved, true, None, at)
        .expect("approve")
}

#[test]
fn on_disk_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bazaar.sqlite");
    {
        let store = Store::open(&path).expect("open");
        store.migrate().expect("migrate");
        store.ensure_user(&user("alice"), T0).expect("user");
    }
    let store = Store::open(&path).expect("reopen");
    store.migrate().expect("migrate again");
    assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
    assert_eq!(store.get_user(&user("alice")).expect("user").role, Role::Buyer);
}

#[test]
fn ensure_user_is_idempotent_and_keeps_role() {
    let store = store();
    let uid = user("bob");
    store.ensure_user(&uid, T0).expect("first");
    store.set_user_role(&uid, Role::Admin).expect("promote");
    let again = store.ensure_user(&uid, T0 + 5).expect("second");
    assert_eq!(again.role, Role::Admin);
    assert_eq!(again.created_at, T0);
    assert!(store.get_user(&user("ghost")).expect_err("missing").is_not_found());
}

#[test]
fn seller_application_reapply_only_after_rejection() {
    let store = store();
    let uid = user("carol");
    store.ensure_user(&uid, T0).expect("user");
    let app = SellerApplication {
        shop_name: "Carol Crafts".to_string(),
        description: None,
        contact_email: "carol@example.com".to_string(),
        phone: None,
    };
    let seller = store.upsert_seller_application(&uid, &app, T0).expect("apply");
    assert_eq!(seller.status, SellerStatus::Pending);
    let dup = store.upsert_seller_application(&uid, &app, T0).expect_err("dup");
    assert_eq!(dup.code, StoreErrorCode::Conflict);

    store
        .set_seller_status(seller.id, SellerStatus::Pending, SellerStatus::Rejected, Some("blurry logo"), T0)
        .expect("reject");
    let again = store.upsert_seller_application(&uid, &app, T0 + 1).expect("reapply");
    assert_eq!(again.id, seller.id);
    assert_eq!(again.status, SellerStatus::Pending);
    assert_eq!(again.rejection_reason, None);
}

#[test]
fn stale_status_compare_and_set_conflicts() {
    let store = store();
    let seller = approved_seller(&store, "dave");
    let err = store
        .set_seller_status(seller.id, SellerStatus::Pending, SellerStatus::Approved, None, T0)
        .expect_err("stale");
    assert_eq!(err.code, StoreErrorCode::Conflict);
}

#[test]
fn decrement_stock_is_conditional() {
    let store = store();
    let seller = approved_seller(&store, "erin");
    let product = listed_product(&store, &seller, "Mug", 1200, 3, T0);
    store.decrement_stock(product.id, 2).expect("take two");
    let err = store.decrement_stock(product.id, 2).expect_err("only one left");
    assert_eq!(err.code, StoreErrorCode::Conflict);
    assert_eq!(store.get_product(product.id).expect("get").stock, 1);
    store.restore_stock(product.id, 2).expect("restore");
    assert_eq!(store.get_product(product.id).expect("get").stock, 3);
}

#[test]
fn failpoints_interrupt_order_writes() {
    let store = store();
    let buyer = user("frank");
    store.ensure_user(&buyer, T0).expect("user");
    let seller = approved_seller(&store, "gina");
    let product = listed_product(&store, &seller, "Lamp", 5000, 5, T0);

    store.arm(FailPoint::InsertOrder);
    let new_order = NewOrder {
        user_id: buyer.clone(),
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::CashOnDelivery,
        shipping_address: "1 Main St".to_string(),
        total: Money::from_cents(5000).expect("money"),
        notes: None,
    };
    let err = store.insert_order(&new_order, T0).expect_err("injected");
    assert_eq!(err.code, StoreErrorCode::InjectedFault);

    let order = store.insert_order(&new_order, T0).expect("order");
    store.arm(FailPoint::InsertOrderItems);
    let line = NewOrderItem {
        product_id: product.id,
        seller_id: seller.id,
        product_name: product.name.clone(),
        quantity: 1,
        unit_price: product.price,
        seller_amount: CommissionRate::default().seller_amount(product.price),
    };
    assert!(store.insert_order_items(order.id, std::slice::from_ref(&line)).is_err());
    assert!(store.order_items(order.id).expect("items").is_empty());

    let items = store.insert_order_items(order.id, &[line]).expect("items");
    assert_eq!(items[0].seller_amount.cents(), 4500);
    assert_eq!(
        store
            .unsettled_orders_with_products(&buyer, &[product.id])
            .expect("guard"),
        vec![order.id]
    );

    store.delete_order_items(order.id).expect("delete items");
    store.delete_order(order.id).expect("delete order");
    assert!(store.get_order(order.id).expect_err("gone").is_not_found());
}

#[test]
fn storefront_hides_unapproved_inactive_and_suspended() {
    let store = store();
    let seller = approved_seller(&store, "hank");
    let visible = listed_product(&store, &seller, "Visible", 1000, 1, T0);
    let hidden = listed_product(&store, &seller, "Hidden", 1000, 1, T0 + 1);
    store.set_product_active(hidden.id, false, T0 + 2).expect("hide");
    let draft = ProductDraft {
        name: "Pending".to_string(),
        description: None,
        price: Money::from_cents(900).expect("money"),
        discount_price: None,
        stock: 1,
        category_id: None,
        image_url: None,
    };
    store.insert_product(seller.id, &draft, T0 + 3).expect("pending");

    let page = store
        .search_products(&ProductFilter::new(ProductScope::Storefront))
        .expect("search");
    let ids: Vec<ProductId> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![visible.id]);

    store
        .set_seller_status(seller.id, SellerStatus::Approved, SellerStatus::Suspended, None, T0)
        .expect("suspend");
    let page = store
        .search_products(&ProductFilter::new(ProductScope::Storefront))
        .expect("search");
    assert!(page.items.is_empty());
    assert!(store.get_visible_product(visible.id).expect_err("hidden").is_not_found());

    let own = store
        .search_products(&ProductFilter::new(ProductScope::Seller(seller.id)))
        .expect("own");
    assert_eq!(own.items.len(), 3);
}

#[test]
fn price_sorted_search_pages_through_every_row() {
    let store = store();
    let seller = approved_seller(&store, "ivy");
    for (i, cents) in [500, 300, 300, 900, 100].into_iter().enumerate() {
        listed_product(&store, &seller, &format!("Item {i}"), cents, 1, T0 + i as i64);
    }
    let mut filter = ProductFilter::new(ProductScope::Storefront);
    filter.sort = ProductSort::PriceAsc;
    filter.limit = 2;
    let mut seen = Vec::new();
    loop {
        let page = store.search_products(&filter).expect("page");
        seen.extend(page.items.iter().map(|p| p.effective_price().cents()));
        match page.next_cursor {
            Some(token) => filter.cursor = Some(ProductCursor::decode(&token).expect("cursor")),
            None => break,
        }
    }
    assert_eq!(seen, vec![100, 300, 300, 500, 900]);

    filter.sort = ProductSort::PriceDesc;
    let err = store.search_products(&filter).expect_err("cursor sort mismatch");
    assert_eq!(err.code, StoreErrorCode::Validation);
}

#[test]
fn text_and_price_filters_narrow_results() {
    let store = store();
    let seller = approved_seller(&store, "jack");
    listed_product(&store, &seller, "Blue Teapot", 2500, 1, T0);
    listed_product(&store, &seller, "Red Teapot", 4000, 1, T0 + 1);
    listed_product(&store, &seller, "Blue Scarf", 1500, 1, T0 + 2);

    let mut filter = ProductFilter::new(ProductScope::Storefront);
    filter.q = Some("teapot".to_string());
    filter.max_price = Some(Money::from_cents(3000).expect("money"));
    let page = store.search_products(&filter).expect("search");
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Blue Teapot"]);
}

#[test]
fn product_update_applies_stock_as_delta() {
    let store = store();
    let seller = approved_seller(&store, "kate");
    let before = listed_product(&store, &seller, "Vase", 3000, 10, T0);
    store.decrement_stock(before.id, 4).expect("sold four");

    let mut next = before.clone();
    next.stock = 12;
    next.updated_at = T0 + 10;
    let after = store.update_product(&before, &next).expect("update");
    assert_eq!(after.stock, 8);

    let err = store.update_product(&before, &next).expect_err("stale edit");
    assert_eq!(err.code, StoreErrorCode::Conflict);
}

#[test]
fn cart_quantities_are_capped_and_cleared_per_product() {
    let store = store();
    let buyer = user("liam");
    store.ensure_user(&buyer, T0).expect("user");
    let seller = approved_seller(&store, "mona");
    let a = listed_product(&store, &seller, "A", 100, 5, T0);
    let b = listed_product(&store, &seller, "B", 100, 5, T0);

    store.add_cart_item(&buyer, a.id, 60, T0).expect("add");
    let line = store.add_cart_item(&buyer, a.id, 60, T0).expect("add again");
    assert_eq!(line.quantity, 99);
    store.add_cart_item(&buyer, b.id, 1, T0).expect("add b");
    assert!(store.set_cart_quantity(&buyer, a.id, 0).is_err());

    assert_eq!(store.clear_cart_products(&buyer, &[a.id]).expect("clear"), 1);
    let lines = store.cart_lines(&buyer).expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product.id, b.id);
}

#[test]
fn single_default_address_per_user() {
    let store = store();
    let owner = user("nina");
    let other = user("oscar");
    store.ensure_user(&owner, T0).expect("user");
    store.ensure_user(&other, T0).expect("user");
    let input = |name: &str, is_default: bool| AddressInput {
        full_name: name.to_string(),
        line1: "1 Road".to_string(),
        line2: None,
        city: "Town".to_string(),
        postal_code: "12345".to_string(),
        country: "NL".to_string(),
        phone: None,
        is_default,
    };
    let first = store.insert_address(&owner, &input("Home", false)).expect("first");
    assert!(first.is_default);
    let second = store.insert_address(&owner, &input("Work", true)).expect("second");
    assert!(second.is_default);
    let defaults = store
        .list_addresses(&owner)
        .expect("list")
        .into_iter()
        .filter(|a| a.is_default)
        .count();
    assert_eq!(defaults, 1);

    assert!(store.get_address(&other, first.id).expect_err("not owner").is_not_found());
    store.delete_address(&owner, second.id).expect("delete default");
    assert!(store.get_address(&owner, first.id).expect("promoted").is_default);
}

#[test]
fn notifications_are_owner_scoped() {
    let store = store();
    let owner = user("paul");
    let other = user("quinn");
    store.ensure_user(&owner, T0).expect("user");
    store.ensure_user(&other, T0).expect("user");
    let n = store
        .insert_notification(&owner, NotificationKind::NewOrder, "New order #1", T0)
        .expect("insert");
    store
        .insert_notification(&owner, NotificationKind::ProductApproved, "Approved", T0)
        .expect("insert");
    assert!(store.mark_notification_read(&other, n.id).expect_err("foreign").is_not_found());
    assert!(store.mark_notification_read(&owner, n.id).expect("read").is_read);
    assert_eq!(store.unread_notification_count(&owner).expect("count"), 1);
    assert_eq!(store.mark_all_notifications_read(&owner).expect("all"), 1);
    let page = store
        .list_notifications(&owner, true, None, 10)
        .expect("list");
    assert!(page.items.is_empty());
}

#[test]
fn commission_setting_defaults_and_updates() {
    let store = store();
    assert_eq!(store.commission_rate().expect("rate").bps(), 1000);
    let rate = CommissionRate::from_bps(1250).expect("rate");
    assert_eq!(store.set_commission_rate(rate, T0).expect("set"), rate);
    assert_eq!(store.commission_rate().expect("rate"), rate);
}

#[test]
fn stats_exclude_cancelled_orders() {
    let store = store();
    let buyer = user("rita");
    store.ensure_user(&buyer, T0).expect("user");
    let seller = approved_seller(&store, "sam");
    let product = listed_product(&store, &seller, "Bowl", 1000, 10, T0);
    let rate = CommissionRate::default();

    let mut order_ids = Vec::new();
    for _ in 0..2 {
        let order = store
            .insert_order(
                &NewOrder {
                    user_id: buyer.clone(),
                    status: OrderStatus::Pending,
                    payment_method: PaymentMethod::CashOnDelivery,
                    shipping_address: "1 Main St".to_string(),
                    total: Money::from_cents(2000).expect("money"),
                    notes: None,
                },
                T0,
            )
            .expect("order");
        let line_total = Money::from_cents(2000).expect("money");
        store
            .insert_order_items(
                order.id,
                &[NewOrderItem {
                    product_id: product.id,
                    seller_id: seller.id,
                    product_name: "Bowl".to_string(),
                    quantity: 2,
                    unit_price: product.price,
                    seller_amount: rate.seller_amount(line_total),
                }],
            )
            .expect("items");
        order_ids.push(order.id);
    }
    store
        .set_order_status(order_ids[1], OrderStatus::Pending, OrderStatus::Cancelled, T0 + 1)
        .expect("cancel");
    store
        .cancel_open_items(order_ids[1], None)
        .expect("cancel items");

    let stats = store.seller_stats(seller.id).expect("seller stats");
    assert_eq!(stats.order_item_count, 1);
    assert_eq!(stats.units_sold, 2);
    assert_eq!(stats.gross_sales.cents(), 2000);
    assert_eq!(stats.earnings.cents(), 1800);

    let market = store.market_stats().expect("market");
    assert_eq!(market.order_count, 2);
    assert_eq!(market.gross_merchandise_value.cents(), 2000);
    assert_eq!(market.commission_earned.cents(), 200);

    let mine = store.list_orders_for_user(&buyer, None, 1).expect("page");
    assert_eq!(mine.items[0].id, order_ids[1]);
    let cursor = IdCursor::decode(mine.next_cursor.as_deref().expect("cursor")).expect("decode");
    let rest = store.list_orders_for_user(&buyer, Some(cursor), 1).expect("page 2");
    assert_eq!(rest.items[0].id, order_ids[0]);
    assert!(rest.next_cursor.is_none());
}

fn placed_order(store: &Store, buyer: &UserId, lines: &[(&Product, &Seller, u32)]) -> Order {
    let order = store
        .insert_order(
            &NewOrder {
                user_id: buyer.clone(),
                status: OrderStatus::Pending,
                payment_method: PaymentMethod::CashOnDelivery,
                shipping_address: "4 Quay Rd".to_string(),
                total: Money::ZERO,
                notes: None,
            },
            T0,
        )
        .expect("order");
    let rate = CommissionRate::default();
    let items: Vec<NewOrderItem> = lines
        .iter()
        .map(|(product, seller, quantity)| NewOrderItem {
            product_id: product.id,
            seller_id: seller.id,
            product_name: product.name.clone(),
            quantity: *quantity,
            unit_price: product.price,
            seller_amount: rate.seller_amount(product.price),
        })
        .collect();
    store.insert_order_items(order.id, &items).expect("items");
    for (product, _, quantity) in lines {
        store.decrement_stock(product.id, *quantity).expect("take");
    }
    order
}

#[test]
fn cancelling_open_items_restocks_each_item_once() {
    let store = store();
    let buyer = user("tess");
    store.ensure_user(&buyer, T0).expect("user");
    let seller = approved_seller(&store, "uma");
    let jar = listed_product(&store, &seller, "Jar", 800, 5, T0);
    let lid = listed_product(&store, &seller, "Lid", 200, 5, T0 + 1);
    let order = placed_order(&store, &buyer, &[(&jar, &seller, 2), (&lid, &seller, 3)]);
    let items = store.order_items(order.id).expect("items");
    let jar_item = items.iter().find(|i| i.product_id == jar.id).expect("jar line").id;

    let one = store.cancel_open_items(order.id, Some(jar_item)).expect("cancel jar");
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].status, FulfillmentStatus::Cancelled);
    assert_eq!(store.get_product(jar.id).expect("jar").stock, 5);

    let rest = store.cancel_open_items(order.id, None).expect("cancel order items");
    assert_eq!(rest.iter().map(|i| i.product_id).collect::<Vec<_>>(), vec![lid.id]);
    assert_eq!(store.get_product(jar.id).expect("jar").stock, 5);
    assert_eq!(store.get_product(lid.id).expect("lid").stock, 5);

    assert!(store.cancel_open_items(order.id, None).expect("again").is_empty());
    assert!(store.cancel_open_items(order.id, Some(jar_item)).expect("again").is_empty());
    assert_eq!(store.get_product(lid.id).expect("lid").stock, 5);
}

#[test]
fn racing_item_and_order_cancels_never_overstock() {
    let store = Arc::new(store());
    let buyer = user("vera");
    store.ensure_user(&buyer, T0).expect("user");
    let seller = approved_seller(&store, "wes");
    let cup = listed_product(&store, &seller, "Cup", 500, 200, T0);

    for _ in 0..50 {
        let order = placed_order(&store, &buyer, &[(&cup, &seller, 2)]);
        let item = store.order_items(order.id).expect("items")[0].id;
        let barrier = Arc::new(Barrier::new(2));
        let handles = [Some(item), None].map(|target| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.cancel_open_items(order.id, target).expect("cancel").len()
            })
        });
        let restocked: usize = handles.into_iter().map(|h| h.join().expect("join")).sum();
        assert_eq!(restocked, 1);
        assert_eq!(store.get_product(cup.id).expect("cup").stock, 200);
    }
}
