// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Wire contract of the v1 HTTP API: error envelope, status mapping, query
//! parameter parsing, request/response bodies and the OpenAPI document.

mod dto;
mod error_mapping;
mod errors;
mod openapi;
mod params;

pub use dto::{
    AddCartItemRequest, CartDto, CartLineDto, MeDto, NotificationPageDto, OrderDetailDto,
    PageDto, PlaceOrderRequest, PublicSellerDto, ReasonRequest, SetActiveRequest,
    SetCartQuantityRequest, SetFulfillmentStatusRequest, SetOrderStatusRequest, SetRoleRequest,
    SettingsDto, UpdateProfileRequest, UpdateSettingsRequest, VersionDto,
};
pub use error_mapping::{map_error, ApiErrorMapping, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode};
pub use openapi::{openapi_v1_spec, RouteAccess, V1_ROUTES};
pub use params::{
    parse_enum_param, parse_page_params, parse_product_search_params, PageParams,
    ProductSearchParams, DEFAULT_PAGE_LIMIT, MAX_CURSOR_BYTES, MAX_PAGE_LIMIT,
};

pub const API_VERSION: &str = "v1";
