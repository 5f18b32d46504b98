// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn require_len(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(if min == 1 {
            ValidationError(format!("{field} must not be empty"))
        } else {
            ValidationError(format!("{field} must be at least {min} characters"))
        });
    }
    if len > max {
        return Err(ValidationError(format!(
            "{field} exceeds max length {max}"
        )));
    }
    Ok(())
}

pub(crate) fn optional_len(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => require_len(field, v, 0, max),
        None => Ok(()),
    }
}

pub(crate) fn require_email(field: &str, value: &str) -> Result<(), ValidationError> {
    require_len(field, value, 3, 254)?;
    let email = value.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.contains(char::is_whitespace);
    if !valid {
        return Err(ValidationError(format!(
            "{field} `{email}` is not an e-mail address"
        )));
    }
    Ok(())
}
