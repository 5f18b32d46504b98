// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use bazaar_core::ResultExt;
use bazaar_server::{
    build_router, validate_startup_config_contract, ApiConfig, AppState, RateLimitConfig,
    DEV_TOKEN_SECRET,
};
use bazaar_store::Store;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("BAZAAR_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn token_secret() -> Result<String, String> {
    match env::var("BAZAAR_TOKEN_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ if env_bool("BAZAAR_ALLOW_INSECURE_DEV_SECRET", false) => {
            warn!("BAZAAR_TOKEN_SECRET unset; using the insecure development secret");
            Ok(DEV_TOKEN_SECRET.to_string())
        }
        _ => Err("BAZAAR_TOKEN_SECRET is required (or set BAZAAR_ALLOW_INSECURE_DEV_SECRET=1)"
            .to_string()),
    }
}

fn api_config_from_env() -> Result<ApiConfig, String> {
    let defaults = ApiConfig::default();
    let rate_defaults = RateLimitConfig::default();
    Ok(ApiConfig {
        max_body_bytes: env_usize("BAZAAR_MAX_BODY_BYTES", defaults.max_body_bytes),
        rate_limit_per_ip: RateLimitConfig {
            capacity: env_f64("BAZAAR_RATE_LIMIT_CAPACITY", rate_defaults.capacity),
            refill_per_sec: env_f64(
                "BAZAAR_RATE_LIMIT_REFILL_PER_SEC",
                rate_defaults.refill_per_sec,
            ),
        },
        cors_allowed_origins: env_list("BAZAAR_CORS_ALLOWED_ORIGINS"),
        default_page_limit: env_usize("BAZAAR_DEFAULT_PAGE_LIMIT", defaults.default_page_limit),
        token_secret: token_secret()?,
    })
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("BAZAAR_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let db_path =
        PathBuf::from(env::var("BAZAAR_DB_PATH").unwrap_or_else(|_| "bazaar.sqlite".to_string()));

    let api = api_config_from_env()?;
    validate_startup_config_contract(&api)?;

    let store = Store::open(&db_path)
        .with_context("open database")
        .map_err(|e| format!("{e} ({})", db_path.display()))?;
    store
        .migrate()
        .with_context("migrate schema")
        .map_err(|e| e.to_string())?;

    let state = AppState::new(store, api);
    let app = build_router(state.clone());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!(bind = %bind_addr, db = %db_path.display(), "bazaar-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            state.begin_drain();
            let drain_ms = env_u64("BAZAAR_SHUTDOWN_DRAIN_MS", 2000);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
