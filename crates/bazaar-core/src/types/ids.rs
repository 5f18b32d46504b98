// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, UserIdProblem};

pub(crate) const MAX_USER_ID_LEN: usize = 64;

/// Subject of a session token, as issued by the identity provider.
///
/// Subjects are short lowercase slugs (`buyer-7`, `ops_admin`) so they can
/// be logged and used in URLs without escaping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        match subject_problem(&value) {
            Some(problem) => Err(Error::UserId { value, problem }),
            None => Ok(Self(value)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn subject_problem(value: &str) -> Option<UserIdProblem> {
    if value.is_empty() {
        return Some(UserIdProblem::Empty);
    }
    if value.len() > MAX_USER_ID_LEN {
        return Some(UserIdProblem::TooLong);
    }
    value
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '-' | '_'))
        .map(UserIdProblem::BadCharacter)
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        Self::new(value)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::new(s)
    }
}
