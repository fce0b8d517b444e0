//! Points ledger rules
//!
//! Fixed deltas tied to user actions. The balance lives on the user
//! profile and is clamped at zero by the database update itself.
//! Deltas are best-effort relative to the action that triggered
//! them: a failed delta is logged and counted, the action stands.

use crate::data::Database;
use crate::metrics::POINTS_DELTAS_TOTAL;

/// Awarded to the author when a report is created.
pub const CREATE_REPORT: i64 = 10;
/// Awarded for writing a comment.
pub const COMMENT: i64 = 2;
/// Awarded for casting a vote, either kind.
pub const VOTE: i64 = 1;
/// Bonus for a report validated as repaired.
///
/// No code path applies this automatically; the admin transition to
/// `reparado` carries no ledger side effect.
pub const REPORT_REPAIRED_BONUS: i64 = 5;
/// Penalty to the author when a report is rejected by vote threshold.
pub const REPORT_REJECTED: i64 = -3;
/// Penalty for deleting one's own report.
pub const SELF_DELETE_REPORT: i64 = -10;

/// Apply a delta to a user's balance, logging the reason.
///
/// Never fails the caller: a missing profile or storage error is
/// logged and swallowed.
pub async fn apply(db: &Database, user_id: &str, delta: i64, reason: &'static str) {
    match db.apply_points_delta(user_id, delta).await {
        Ok(true) => {
            POINTS_DELTAS_TOTAL.with_label_values(&[reason]).inc();
            tracing::debug!(user_id, delta, reason, "Points delta applied");
        }
        Ok(false) => {
            tracing::warn!(user_id, delta, reason, "Points delta skipped: profile not found");
        }
        Err(error) => {
            tracing::warn!(user_id, delta, reason, %error, "Points delta failed");
        }
    }
}
