// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    Conflict,
    Io,
    InjectedFault,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Conflict => "conflict",
            Self::Io => "io_error",
            Self::InjectedFault => "injected_fault",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", .code.as_str(), .message)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(StoreErrorCode::NotFound, format!("{what} not found"))
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Conflict, message)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == StoreErrorCode::NotFound
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::QueryReturnedNoRows => {
                Self::new(StoreErrorCode::NotFound, "row not found")
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::new(StoreErrorCode::Conflict, value.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::ReadOnly
                        | rusqlite::ErrorCode::DiskFull
                        | rusqlite::ErrorCode::SystemIoFailure
                ) =>
            {
                Self::new(StoreErrorCode::Io, value.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) => {
                Self::new(StoreErrorCode::Validation, value.to_string())
            }
            _ => Self::new(StoreErrorCode::Internal, value.to_string()),
        }
    }
}

impl From<bazaar_model::ValidationError> for StoreError {
    fn from(value: bazaar_model::ValidationError) -> Self {
        Self::new(StoreErrorCode::Validation, value.0)
    }
}

impl From<bazaar_core::Error> for StoreError {
    fn from(value: bazaar_core::Error) -> Self {
        Self::new(StoreErrorCode::Validation, value.to_string())
    }
}
