// SPDX-License-Identifier: Apache-2.0

use bazaar_api::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use serde::Serialize;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

/// Signing secret used only when `BAZAAR_ALLOW_INSECURE_DEV_SECRET=1`.
pub const DEV_TOKEN_SECRET: &str = "bazaar-insecure-dev-secret-change-me";

pub const MIN_TOKEN_SECRET_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 30.0,
            refill_per_sec: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub rate_limit_per_ip: RateLimitConfig,
    pub cors_allowed_origins: Vec<String>,
    pub default_page_limit: usize,
    #[serde(skip_serializing)]
    pub token_secret: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
            rate_limit_per_ip: RateLimitConfig::default(),
            cors_allowed_origins: Vec::new(),
            default_page_limit: DEFAULT_PAGE_LIMIT,
            token_secret: String::new(),
        }
    }
}

pub fn validate_startup_config_contract(api: &ApiConfig) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".to_string());
    }
    let rl = api.rate_limit_per_ip;
    if !rl.capacity.is_finite() || rl.capacity < 1.0 {
        return Err("rate limit capacity must be >= 1".to_string());
    }
    if !rl.refill_per_sec.is_finite() || rl.refill_per_sec <= 0.0 {
        return Err("rate limit refill_per_sec must be > 0".to_string());
    }
    if api.default_page_limit == 0 || api.default_page_limit > MAX_PAGE_LIMIT {
        return Err(format!(
            "default_page_limit must be within 1..={MAX_PAGE_LIMIT}"
        ));
    }
    if api.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
        return Err(format!(
            "token_secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes"
        ));
    }
    if let Some(bad) = api
        .cors_allowed_origins
        .iter()
        .find(|o| o.is_empty() || o.ends_with('/'))
    {
        return Err(format!("invalid cors origin `{bad}`"));
    }
    Ok(())
}
