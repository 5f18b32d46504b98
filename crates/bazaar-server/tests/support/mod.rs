// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use bazaar_core::FixedClock;
use bazaar_model::{
    Money, Product, ProductDraft, ProductStatus, Role, Seller, SellerApplication, SellerStatus,
    UserId,
};
use bazaar_server::{build_router, issue_token, ApiConfig, AppState, RateLimitConfig, SessionClaims};
use bazaar_store::Store;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const SECRET: &str = "integration-test-secret-0123456789";
pub const T0: i64 = 1_700_000_000_000;

pub fn api_config() -> ApiConfig {
    ApiConfig {
        token_secret: SECRET.to_string(),
        rate_limit_per_ip: RateLimitConfig {
            capacity: 1000.0,
            refill_per_sec: 1000.0,
        },
        ..ApiConfig::default()
    }
}

pub fn state_with(api: ApiConfig) -> AppState {
    let store = Store::open_in_memory().expect("open store");
    store.migrate().expect("migrate");
    AppState::with_clock(store, api, Arc::new(FixedClock::new(T0)))
}

pub fn state() -> AppState {
    state_with(api_config())
}

pub async fn spawn(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

pub fn user(name: &str) -> UserId {
    UserId::new(name).expect("user id")
}

pub fn token(name: &str) -> String {
    issue_token(
        SECRET.as_bytes(),
        &SessionClaims {
            sub: user(name),
            exp: T0 / 1000 + 3600,
        },
    )
    .expect("issue token")
}

pub fn bearer(name: &str) -> String {
    format!("Bearer {}", token(name))
}

pub fn make_admin(store: &Store, name: &str) {
    let uid = user(name);
    store.ensure_user(&uid, T0).expect("ensure admin");
    store.set_user_role(&uid, Role::Admin).expect("promote");
}

pub fn approved_seller(store: &Store, name: &str) -> Seller {
    let uid = user(name);
    store.ensure_user(&uid, T0).expect("ensure seller");
    let seller = store
        .upsert_seller_application(
            &uid,
            &SellerApplication {
                shop_name: format!("{name} shop"),
                description: None,
                contact_email: format!("{name}@example.com"),
                phone: None,
            },
            T0,
        )
        .expect("apply");
    store.set_user_role(&uid, Role::Seller).expect("seller role");
    store
        .set_seller_status(seller.id, SellerStatus::Pending, SellerStatus::Approved, None, T0)
        .expect("approve seller")
}

pub fn listed_product(store: &Store, seller: &Seller, name: &str, cents: i64, stock: i64) -> Product {
    list_draft(
        store,
        seller,
        ProductDraft {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents).expect("money"),
            discount_price: None,
            stock,
            category_id: None,
            image_url: None,
        },
    )
}

pub fn discounted_product(
    store: &Store,
    seller: &Seller,
    name: &str,
    cents: i64,
    sale_cents: i64,
    stock: i64,
) -> Product {
    list_draft(
        store,
        seller,
        ProductDraft {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents).expect("money"),
            discount_price: Some(Money::from_cents(sale_cents).expect("money")),
            stock,
            category_id: None,
            image_url: None,
        },
    )
}

fn list_draft(store: &Store, seller: &Seller, draft: ProductDraft) -> Product {
    let product = store.insert_product(seller.id, &draft, T0).expect("insert product");
    store
        .set_product_status(
            product.id,
            ProductStatus::Pending,
            ProductStatus::Approved,
            true,
            None,
            T0,
        )
        .expect("approve product")
}

pub struct Reply {
    pub status: u16,
    pub head: String,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("json body ({e}): {}", self.body))
    }

    pub fn header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.head
            .lines()
            .find(|l| l.to_ascii_lowercase().starts_with(&prefix))
            .map(|l| l[prefix.len()..].trim().to_string())
    }

    pub fn error_code(&self) -> String {
        self.json()["error"]["code"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

fn dechunk(body: &str) -> String {
    let mut out = String::new();
    let mut rest = body;
    while let Some((size_line, tail)) = rest.split_once("\r\n") {
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        out.push_str(&tail[..size]);
        rest = tail[size..].trim_start_matches("\r\n");
    }
    out
}

pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> Reply {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(payload) = body {
        req.push_str("Content-Type: application/json\r\n");
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    } else if matches!(method, "POST" | "PUT") {
        req.push_str("Content-Length: 0\r\n");
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    if let Some(payload) = body {
        req.push_str(payload);
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, raw_body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    let chunked = head
        .to_ascii_lowercase()
        .contains("transfer-encoding: chunked");
    Reply {
        status,
        head: head.to_string(),
        body: if chunked {
            dechunk(raw_body)
        } else {
            raw_body.to_string()
        },
    }
}

pub async fn get(addr: SocketAddr, path: &str, who: Option<&str>) -> Reply {
    match who {
        Some(name) => {
            let auth = bearer(name);
            send(addr, "GET", path, &[("Authorization", &auth)], None).await
        }
        None => send(addr, "GET", path, &[], None).await,
    }
}

pub async fn call(addr: SocketAddr, method: &str, path: &str, who: &str, body: Option<&str>) -> Reply {
    let auth = bearer(who);
    send(addr, method, path, &[("Authorization", &auth)], body).await
}
