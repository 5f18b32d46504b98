// SPDX-License-Identifier: Apache-2.0

//! Request extractors: authenticated callers by role and JSON bodies that
//! fail with the API error envelope.

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use bazaar_api::{ApiError, ApiErrorCode};
use bazaar_model::{Role, Seller, UserProfile};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::auth::{bearer_token, verify_token};
use crate::error::{HttpError, ServiceError};
use crate::http::run_blocking;
use crate::AppState;

/// Any signed-in user. Unknown subjects are provisioned as buyers.
#[derive(Debug, Clone)]
pub(crate) struct Caller {
    pub profile: UserProfile,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, HttpError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let claims = bearer_token(header)
            .and_then(|token| {
                verify_token(
                    state.api.token_secret.as_bytes(),
                    token,
                    state.clock.now_secs(),
                )
            })
            .map_err(|e| {
                debug!("authentication rejected: {e}");
                ServiceError::from(e)
            })?;
        let subject = claims.sub;
        let profile =
            run_blocking(state, move |store, now| Ok(store.ensure_user(&subject, now)?)).await?;
        Ok(Self { profile })
    }
}

/// Caller holding the seller role together with their shop.
#[derive(Debug, Clone)]
pub(crate) struct SellerCaller {
    pub profile: UserProfile,
    pub seller: Seller,
}

impl SellerCaller {
    /// Listing and fulfilment changes need a shop in good standing.
    pub(crate) fn require_trading(&self) -> Result<(), ServiceError> {
        if self.seller.is_trading() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "seller account is {}",
                self.seller.status
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SellerCaller {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, HttpError> {
        let Caller { profile } = Caller::from_request_parts(parts, state).await?;
        if !matches!(profile.role, Role::Seller | Role::Admin) {
            return Err(ServiceError::Forbidden("seller role required".to_string()).into());
        }
        let user = profile.id.clone();
        let seller = run_blocking(state, move |store, _| Ok(store.find_seller_by_user(&user)?))
            .await?
            .ok_or_else(|| ServiceError::Forbidden("no seller account".to_string()))?;
        Ok(Self { profile, seller })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AdminCaller {
    pub profile: UserProfile,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, HttpError> {
        let Caller { profile } = Caller::from_request_parts(parts, state).await?;
        if profile.role != Role::Admin {
            return Err(ServiceError::Forbidden("admin role required".to_string()).into());
        }
        Ok(Self { profile })
    }
}

/// `axum::Json` with rejections rendered as `ValidationFailed` or
/// `PayloadTooLarge`.
#[derive(Debug, Clone)]
pub(crate) struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, HttpError> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&rejection).into()),
        }
    }
}

fn json_rejection(rejection: &JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(
            ApiErrorCode::PayloadTooLarge,
            "request body too large",
            json!({}),
        );
    }
    ApiError::validation_failed(rejection.body_text())
}
