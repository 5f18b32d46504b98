// SPDX-License-Identifier: Apache-2.0

use serde_json::{json, Map, Value};

use crate::errors::ApiErrorCode;

/// Access class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Authenticated,
    Seller,
    Admin,
}

/// Every v1 route as `(method, OpenAPI path, access, summary)`.
pub const V1_ROUTES: &[(&str, &str, RouteAccess, &str)] = &[
    ("get", "/healthz", RouteAccess::Public, "liveness"),
    ("get", "/readyz", RouteAccess::Public, "readiness"),
    ("get", "/metrics", RouteAccess::Public, "prometheus metrics"),
    ("get", "/v1/version", RouteAccess::Public, "service version"),
    ("get", "/v1/openapi.json", RouteAccess::Public, "this document"),
    ("get", "/v1/categories", RouteAccess::Public, "list categories"),
    ("get", "/v1/products", RouteAccess::Public, "search storefront products"),
    ("get", "/v1/products/{id}", RouteAccess::Public, "storefront product"),
    ("get", "/v1/sellers/{id}", RouteAccess::Public, "public seller profile"),
    ("get", "/v1/sellers/{id}/products", RouteAccess::Public, "seller storefront"),
    ("get", "/v1/me", RouteAccess::Authenticated, "current profile"),
    ("put", "/v1/me", RouteAccess::Authenticated, "update profile"),
    ("get", "/v1/me/addresses", RouteAccess::Authenticated, "list addresses"),
    ("post", "/v1/me/addresses", RouteAccess::Authenticated, "add address"),
    ("put", "/v1/me/addresses/{id}", RouteAccess::Authenticated, "update address"),
    ("delete", "/v1/me/addresses/{id}", RouteAccess::Authenticated, "delete address"),
    ("get", "/v1/me/notifications", RouteAccess::Authenticated, "list notifications"),
    ("post", "/v1/me/notifications/{id}/read", RouteAccess::Authenticated, "mark notification read"),
    ("post", "/v1/me/notifications/read-all", RouteAccess::Authenticated, "mark all notifications read"),
    ("get", "/v1/cart", RouteAccess::Authenticated, "view cart"),
    ("delete", "/v1/cart", RouteAccess::Authenticated, "empty cart"),
    ("post", "/v1/cart/items", RouteAccess::Authenticated, "add to cart"),
    ("put", "/v1/cart/items/{product_id}", RouteAccess::Authenticated, "set cart quantity"),
    ("delete", "/v1/cart/items/{product_id}", RouteAccess::Authenticated, "remove from cart"),
    ("get", "/v1/orders", RouteAccess::Authenticated, "list own orders"),
    ("post", "/v1/orders", RouteAccess::Authenticated, "place order"),
    ("get", "/v1/orders/{id}", RouteAccess::Authenticated, "order detail"),
    ("post", "/v1/orders/{id}/cancel", RouteAccess::Authenticated, "cancel unsettled order"),
    ("post", "/v1/seller/apply", RouteAccess::Authenticated, "apply to sell"),
    ("get", "/v1/seller/profile", RouteAccess::Seller, "own seller profile"),
    ("put", "/v1/seller/profile", RouteAccess::Seller, "update seller profile"),
    ("get", "/v1/seller/products", RouteAccess::Seller, "own products"),
    ("post", "/v1/seller/products", RouteAccess::Seller, "create product"),
    ("put", "/v1/seller/products/{id}", RouteAccess::Seller, "edit product"),
    ("delete", "/v1/seller/products/{id}", RouteAccess::Seller, "delete or archive product"),
    ("post", "/v1/seller/products/{id}/active", RouteAccess::Seller, "toggle product visibility"),
    ("get", "/v1/seller/orders", RouteAccess::Seller, "order items to fulfil"),
    ("put", "/v1/seller/order-items/{id}/status", RouteAccess::Seller, "advance fulfillment"),
    ("get", "/v1/seller/stats", RouteAccess::Seller, "sales summary"),
    ("get", "/v1/admin/sellers", RouteAccess::Admin, "list sellers"),
    ("post", "/v1/admin/sellers/{id}/approve", RouteAccess::Admin, "approve seller"),
    ("post", "/v1/admin/sellers/{id}/reject", RouteAccess::Admin, "reject seller"),
    ("post", "/v1/admin/sellers/{id}/suspend", RouteAccess::Admin, "suspend seller"),
    ("post", "/v1/admin/sellers/{id}/reinstate", RouteAccess::Admin, "reinstate seller"),
    ("get", "/v1/admin/products", RouteAccess::Admin, "moderation queue"),
    ("post", "/v1/admin/products/{id}/approve", RouteAccess::Admin, "approve product"),
    ("post", "/v1/admin/products/{id}/reject", RouteAccess::Admin, "reject product"),
    ("get", "/v1/admin/orders", RouteAccess::Admin, "list all orders"),
    ("put", "/v1/admin/orders/{id}/status", RouteAccess::Admin, "change order status"),
    ("get", "/v1/admin/settings", RouteAccess::Admin, "marketplace settings"),
    ("put", "/v1/admin/settings", RouteAccess::Admin, "update commission"),
    ("post", "/v1/admin/categories", RouteAccess::Admin, "create category"),
    ("delete", "/v1/admin/categories/{id}", RouteAccess::Admin, "delete category"),
    ("get", "/v1/admin/users", RouteAccess::Admin, "list users"),
    ("put", "/v1/admin/users/{id}/role", RouteAccess::Admin, "change user role"),
    ("get", "/v1/admin/stats", RouteAccess::Admin, "marketplace summary"),
];

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiErrorEnvelope"}}}
    })
}

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| {
            let schema = if name == "id" || name.ends_with("_id") {
                json!({"type": "integer", "minimum": 1})
            } else {
                json!({"type": "string"})
            };
            json!({"name": name, "in": "path", "required": true, "schema": schema})
        })
        .collect()
}

fn query_parameters(method: &str, path: &str) -> Vec<Value> {
    let mut params = Vec::new();
    let paged = method == "get"
        && matches!(
            path,
            "/v1/products"
                | "/v1/sellers/{id}/products"
                | "/v1/me/notifications"
                | "/v1/orders"
                | "/v1/seller/products"
                | "/v1/seller/orders"
                | "/v1/admin/sellers"
                | "/v1/admin/products"
                | "/v1/admin/orders"
                | "/v1/admin/users"
        );
    if paged {
        params.push(json!({"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 100}}));
        params.push(json!({"name": "cursor", "in": "query", "schema": {"type": "string"}}));
    }
    if method == "get"
        && matches!(
            path,
            "/v1/products" | "/v1/sellers/{id}/products" | "/v1/seller/products" | "/v1/admin/products"
        )
    {
        params.push(json!({"name": "q", "in": "query", "schema": {"type": "string", "maxLength": 200}}));
        params.push(json!({"name": "category", "in": "query", "schema": {"type": "integer"}}));
        params.push(json!({"name": "min_price", "in": "query", "schema": {"type": "string", "pattern": "^[0-9]+(\\.[0-9]{1,2})?$"}}));
        params.push(json!({"name": "max_price", "in": "query", "schema": {"type": "string", "pattern": "^[0-9]+(\\.[0-9]{1,2})?$"}}));
        params.push(json!({"name": "sort", "in": "query", "schema": {"type": "string", "enum": ["newest", "price_asc", "price_desc"]}}));
    }
    if method == "get"
        && matches!(
            path,
            "/v1/admin/sellers" | "/v1/admin/products" | "/v1/admin/orders" | "/v1/seller/orders"
        )
    {
        params.push(json!({"name": "status", "in": "query", "schema": {"type": "string"}}));
    }
    if method == "get" && path == "/v1/admin/users" {
        params.push(json!({"name": "role", "in": "query", "schema": {"type": "string", "enum": ["buyer", "seller", "admin"]}}));
    }
    if method == "get" && path == "/v1/me/notifications" {
        params.push(json!({"name": "unread", "in": "query", "schema": {"type": "boolean"}}));
    }
    params
}

fn operation(method: &str, path: &str, access: RouteAccess, summary: &str) -> Value {
    let mut responses = Map::new();
    let ok = if method == "post" && matches!(path, "/v1/orders" | "/v1/seller/products" | "/v1/me/addresses" | "/v1/admin/categories" | "/v1/seller/apply") {
        "201"
    } else if method == "delete" {
        "204"
    } else {
        "200"
    };
    responses.insert(ok.to_string(), json!({"description": summary}));
    if method != "get" || path.contains('{') || !matches!(access, RouteAccess::Public) {
        responses.insert("400".to_string(), error_response("invalid request"));
    }
    if !matches!(access, RouteAccess::Public) {
        responses.insert("401".to_string(), error_response("missing or invalid bearer token"));
    }
    if matches!(access, RouteAccess::Seller | RouteAccess::Admin) {
        responses.insert("403".to_string(), error_response("role not permitted"));
    }
    if path.contains('{') {
        responses.insert("404".to_string(), error_response("not found"));
    }
    if method != "get" && !matches!(access, RouteAccess::Public) {
        responses.insert("409".to_string(), error_response("conflicting state"));
    }
    if method == "post" && path == "/v1/orders" {
        responses.insert("422".to_string(), error_response("price mismatch, out of stock or unavailable product"));
    }
    if path == "/readyz" {
        responses.insert("503".to_string(), error_response("not ready"));
    }
    responses.insert("429".to_string(), error_response("rate limited"));

    let mut parameters = path_parameters(path);
    parameters.extend(query_parameters(method, path));
    let mut op = json!({
        "summary": summary,
        "parameters": parameters,
        "responses": responses,
    });
    if !matches!(access, RouteAccess::Public) {
        op["security"] = json!([{"bearerAuth": []}]);
    }
    op
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    let mut paths = Map::new();
    for (method, path, access, summary) in V1_ROUTES {
        let entry = paths
            .entry((*path).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert((*method).to_string(), operation(method, path, *access, summary));
        }
    }
    let error_codes: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    json!({
      "openapi": "3.0.3",
      "info": {
        "title": "bazaar API",
        "version": "v1"
      },
      "paths": paths,
      "components": {
        "securitySchemes": {
          "bearerAuth": {"type": "http", "scheme": "bearer"}
        },
        "schemas": {
          "ApiErrorCode": {"type": "string", "enum": error_codes},
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details", "request_id"],
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"},
              "request_id": {"type": "string"}
            }
          },
          "ApiErrorEnvelope": {
            "type": "object",
            "required": ["error"],
            "properties": {"error": {"$ref": "#/components/schemas/ApiError"}}
          },
          "Money": {"type": "integer", "minimum": 0, "description": "minor currency units (cents)"}
        }
      }
    })
}
