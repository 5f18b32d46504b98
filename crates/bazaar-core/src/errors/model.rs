// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;

/// Process exit status of the operator CLI.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

/// What is wrong with a rejected user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIdProblem {
    Empty,
    TooLong,
    BadCharacter(char),
}

impl fmt::Display for UserIdProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("is empty"),
            Self::TooLong => write!(f, "is longer than {} bytes", crate::types::ids::MAX_USER_ID_LEN),
            Self::BadCharacter(c) => {
                write!(f, "contains {c:?}; subjects use lowercase letters, digits, '-' and '_'")
            }
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// A page position could not be serialized.
    CursorEncode(serde_json::Error),
    /// The client's cursor token is not URL-safe base64.
    CursorNotBase64(String),
    /// The cursor decoded but does not describe a page position.
    CursorPayload(String),
    /// HMAC refused the signing key.
    SigningKey,
    UserId {
        value: String,
        problem: UserIdProblem,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CursorEncode(err) => write!(f, "cannot encode page cursor: {err}"),
            Self::CursorNotBase64(detail) => write!(f, "cursor is not base64url: {detail}"),
            Self::CursorPayload(detail) => write!(f, "cursor payload is malformed: {detail}"),
            Self::SigningKey => f.write_str("token signing key rejected"),
            Self::UserId { value, problem } => write!(f, "user id `{value}` {problem}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CursorEncode(err) => Some(err),
            _ => None,
        }
    }
}

/// Error shape printed by the operator CLI in `--json` mode.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}
