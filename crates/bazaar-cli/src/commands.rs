// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use bazaar_core::{Clock, ResultExt, SystemClock, UserId};
use bazaar_model::{CommissionRate, Role};
use bazaar_server::{SessionClaims, MIN_TOKEN_SECRET_BYTES};
use bazaar_store::{Store, SCHEMA_VERSION};
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::{CliError, CRATE_NAME};

/// Tables reported by `inspect-db`, in schema order.
const INSPECTED_TABLES: [&str; 10] = [
    "users",
    "sellers",
    "categories",
    "products",
    "cart_items",
    "addresses",
    "orders",
    "order_items",
    "notifications",
    "settings",
];

fn open_migrated(db: &Path) -> Result<Store, CliError> {
    let shown = db.display().to_string();
    let store = Store::open(db)
        .with_context("open database")
        .map_err(|e| CliError::dependency(e.to_string()).with_detail("db", &shown))?;
    store
        .migrate()
        .with_context("migrate schema")
        .map_err(|e| CliError::dependency(e.to_string()).with_detail("db", &shown))?;
    Ok(store)
}

fn resolve_secret(flag: Option<String>) -> Result<String, CliError> {
    let secret = flag
        .or_else(|| std::env::var("BAZAAR_TOKEN_SECRET").ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CliError::usage("token secret required: pass --secret or set BAZAAR_TOKEN_SECRET"))?;
    if secret.len() < MIN_TOKEN_SECRET_BYTES {
        return Err(CliError::validation(format!(
            "token secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes"
        )));
    }
    Ok(secret)
}

fn parse_user(raw: &str) -> Result<UserId, CliError> {
    UserId::new(raw).map_err(|e| CliError::validation(e.to_string()).with_detail("user", raw))
}

pub(crate) fn migrate(db: &Path) -> Result<Value, CliError> {
    let store = open_migrated(db)?;
    let version = store
        .schema_version()
        .map_err(|e| CliError::dependency(e.to_string()))?;
    info!(db = %db.display(), schema_version = version, "database migrated");
    Ok(json!({"db": db.display().to_string(), "schema_version": version}))
}

pub(crate) fn issue_token(sub: &str, ttl_secs: i64, secret: Option<String>) -> Result<Value, CliError> {
    if ttl_secs <= 0 {
        return Err(CliError::validation("ttl_secs must be > 0".to_string()));
    }
    let secret = resolve_secret(secret)?;
    let claims = SessionClaims {
        sub: parse_user(sub)?,
        exp: SystemClock.now_secs().saturating_add(ttl_secs),
    };
    let token = bazaar_server::issue_token(secret.as_bytes(), &claims)
        .map_err(|e| CliError::internal(e.to_string()))?;
    Ok(json!({"token": token, "sub": claims.sub.as_str(), "exp": claims.exp}))
}

pub(crate) fn verify_token(token: &str, secret: Option<String>) -> Result<Value, CliError> {
    let secret = resolve_secret(secret)?;
    let claims = bazaar_server::verify_token(secret.as_bytes(), token, SystemClock.now_secs())
        .map_err(|e| CliError::validation(format!("token rejected: {e}")))?;
    Ok(json!({"sub": claims.sub.as_str(), "exp": claims.exp}))
}

pub(crate) fn promote_user(db: &Path, user: &str, role: &str) -> Result<Value, CliError> {
    let id = parse_user(user)?;
    let role: Role = role.parse().map_err(|_| {
        CliError::validation(format!("unknown role `{role}`; expected buyer, seller or admin"))
    })?;
    let store = open_migrated(db)?;
    store
        .ensure_user(&id, SystemClock.now_millis())
        .map_err(|e| CliError::dependency(e.to_string()))?;
    let profile = store
        .set_user_role(&id, role)
        .map_err(|e| CliError::dependency(e.to_string()))?;
    info!(user_id = %id, role = role.as_str(), "role changed from the cli");
    Ok(json!({"user": profile.id.as_str(), "role": profile.role.as_str()}))
}

pub(crate) fn set_commission(db: &Path, ratio: f64) -> Result<Value, CliError> {
    let rate = CommissionRate::from_ratio(ratio).map_err(|e| CliError::validation(e.to_string()))?;
    let store = open_migrated(db)?;
    let stored = store
        .set_commission_rate(rate, SystemClock.now_millis())
        .map_err(|e| CliError::dependency(e.to_string()))?;
    Ok(json!({"commission_rate": stored.as_ratio(), "commission_bps": stored.bps()}))
}

/// Read-only look at a database file; never migrates it.
pub(crate) fn inspect_db(db: &Path) -> Result<Value, CliError> {
    if !db.is_file() {
        return Err(CliError::dependency(format!("database not found: {}", db.display())));
    }
    let conn = Connection::open_with_flags(db, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| CliError::dependency(e.to_string()))?;
    let schema_version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| CliError::dependency(e.to_string()))?;

    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
        .map_err(|e| CliError::dependency(e.to_string()))?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| CliError::dependency(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::dependency(e.to_string()))?;

    let mut counts = Map::new();
    for table in INSPECTED_TABLES {
        if !present.iter().any(|t| t == table) {
            continue;
        }
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(|e| CliError::dependency(e.to_string()))?;
        counts.insert(table.to_string(), Value::from(n));
    }
    let commission_bps: Option<i64> = if present.iter().any(|t| t == "settings") {
        conn.query_row("SELECT commission_bps FROM settings WHERE id = 1", [], |row| row.get(0))
            .ok()
    } else {
        None
    };

    Ok(json!({
        "db": db.display().to_string(),
        "schema_version": schema_version,
        "supported_schema_version": SCHEMA_VERSION,
        "row_counts": counts,
        "commission_bps": commission_bps,
    }))
}

pub(crate) fn version() -> Value {
    json!({"name": CRATE_NAME, "version": env!("CARGO_PKG_VERSION")})
}
