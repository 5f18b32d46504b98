// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! HTTP service of the marketplace: router, middleware, session tokens and
//! the workflows behind each endpoint.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use bazaar_core::{Clock, SystemClock};
use bazaar_store::Store;
use tracing::info;

pub mod auth;
mod config;
mod error;
mod http;
mod middleware;
pub mod services;
mod telemetry;

pub use auth::{issue_token, verify_token, AuthError, SessionClaims};
pub use config::{
    validate_startup_config_contract, ApiConfig, RateLimitConfig, CONFIG_SCHEMA_VERSION,
    DEV_TOKEN_SECRET, MIN_TOKEN_SECRET_BYTES,
};
pub use error::ServiceError;

pub const CRATE_NAME: &str = "bazaar-server";

use crate::http::{account, admin, cart, ops, orders, seller, storefront};
use crate::middleware::guards::{cors_middleware, drain_middleware, rate_limit_middleware};
use crate::middleware::request_tracing::request_tracing_middleware;
use crate::telemetry::metrics::RequestMetrics;
use crate::telemetry::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub api: Arc<ApiConfig>,
    pub clock: Arc<dyn Clock>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, api: ApiConfig) -> Self {
        Self::with_clock(store, api, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(store: Store, api: ApiConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            api: Arc::new(api),
            clock,
            accepting_requests: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            rate_limiter: Arc::new(RateLimiter::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Stops accepting new requests; in-flight ones finish.
    pub fn begin_drain(&self) {
        if self.accepting_requests.swap(false, Ordering::Relaxed) {
            info!("draining: refusing new requests");
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let store = Store::open_in_memory().expect("in-memory store");
        store.migrate().expect("migrate");
        let api = ApiConfig {
            token_secret: "unit-test-secret-0123456789".to_string(),
            ..ApiConfig::default()
        };
        Self::with_clock(store, api, Arc::new(bazaar_core::FixedClock::new(1_700_000_000_000)))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz_handler))
        .route("/readyz", get(ops::readyz_handler))
        .route("/metrics", get(ops::metrics_handler))
        .route("/v1/version", get(ops::version_handler))
        .route("/v1/openapi.json", get(ops::openapi_handler))
        .route("/v1/categories", get(storefront::categories_handler))
        .route("/v1/products", get(storefront::products_handler))
        .route("/v1/products/:id", get(storefront::product_handler))
        .route("/v1/sellers/:id", get(storefront::seller_handler))
        .route("/v1/sellers/:id/products", get(storefront::seller_products_handler))
        .route(
            "/v1/me",
            get(account::me_handler).put(account::update_me_handler),
        )
        .route(
            "/v1/me/addresses",
            get(account::addresses_handler).post(account::create_address_handler),
        )
        .route(
            "/v1/me/addresses/:id",
            put(account::update_address_handler).delete(account::delete_address_handler),
        )
        .route("/v1/me/notifications", get(account::notifications_handler))
        .route(
            "/v1/me/notifications/read-all",
            post(account::read_all_notifications_handler),
        )
        .route(
            "/v1/me/notifications/:id/read",
            post(account::read_notification_handler),
        )
        .route(
            "/v1/cart",
            get(cart::cart_handler).delete(cart::clear_cart_handler),
        )
        .route("/v1/cart/items", post(cart::add_item_handler))
        .route(
            "/v1/cart/items/:product_id",
            put(cart::set_quantity_handler).delete(cart::remove_item_handler),
        )
        .route(
            "/v1/orders",
            get(orders::orders_handler).post(orders::place_order_handler),
        )
        .route("/v1/orders/:id", get(orders::order_handler))
        .route("/v1/orders/:id/cancel", post(orders::cancel_order_handler))
        .route("/v1/seller/apply", post(seller::apply_handler))
        .route(
            "/v1/seller/profile",
            get(seller::profile_handler).put(seller::update_profile_handler),
        )
        .route(
            "/v1/seller/products",
            get(seller::products_handler).post(seller::create_product_handler),
        )
        .route(
            "/v1/seller/products/:id",
            put(seller::update_product_handler).delete(seller::delete_product_handler),
        )
        .route("/v1/seller/products/:id/active", post(seller::set_active_handler))
        .route("/v1/seller/orders", get(seller::orders_handler))
        .route(
            "/v1/seller/order-items/:id/status",
            put(seller::item_status_handler),
        )
        .route("/v1/seller/stats", get(seller::stats_handler))
        .route("/v1/admin/sellers", get(admin::sellers_handler))
        .route("/v1/admin/sellers/:id/approve", post(admin::approve_seller_handler))
        .route("/v1/admin/sellers/:id/reject", post(admin::reject_seller_handler))
        .route("/v1/admin/sellers/:id/suspend", post(admin::suspend_seller_handler))
        .route("/v1/admin/sellers/:id/reinstate", post(admin::reinstate_seller_handler))
        .route("/v1/admin/products", get(admin::products_handler))
        .route("/v1/admin/products/:id/approve", post(admin::approve_product_handler))
        .route("/v1/admin/products/:id/reject", post(admin::reject_product_handler))
        .route("/v1/admin/orders", get(admin::orders_handler))
        .route("/v1/admin/orders/:id/status", put(admin::order_status_handler))
        .route(
            "/v1/admin/settings",
            get(admin::settings_handler).put(admin::update_settings_handler),
        )
        .route("/v1/admin/categories", post(admin::create_category_handler))
        .route("/v1/admin/categories/:id", delete(admin::delete_category_handler))
        .route("/v1/admin/users", get(admin::users_handler))
        .route("/v1/admin/users/:id/role", put(admin::user_role_handler))
        .route("/v1/admin/stats", get(admin::stats_handler))
        .fallback(ops::fallback_handler)
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn_with_state(state.clone(), drain_middleware))
        .layer(from_fn_with_state(state.clone(), request_tracing_middleware))
        .with_state(state)
}
