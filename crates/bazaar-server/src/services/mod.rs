// SPDX-License-Identifier: Apache-2.0

//! Marketplace workflows. Each function is synchronous and takes the store
//! plus the current time in unix millis; HTTP handlers run them on the
//! blocking pool.

use bazaar_model::{NotificationKind, UserId};
use bazaar_store::Store;
use tracing::warn;

pub mod checkout;
pub mod fulfillment;
pub mod listings;
pub mod moderation;
pub mod onboarding;

/// Notifications are a side effect; losing one never fails the workflow.
pub(crate) fn notify(store: &Store, user: &UserId, kind: NotificationKind, message: &str, now: i64) {
    if let Err(e) = store.insert_notification(user, kind, message, now) {
        warn!(user_id = %user, kind = kind.as_str(), "notification dropped: {e}");
    }
}
