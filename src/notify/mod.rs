//! Outbound notifications
//!
//! Fire-and-forget email notifications for comment and status-change
//! events. Nothing here blocks a request or retries on failure.

mod mailer;

use std::future::Future;
use std::time::Duration;

pub use mailer::{Mailer, comment_notification, status_change_notification};

use crate::error::AppError;
use crate::metrics::EMAILS_TOTAL;

const OUTBOUND_EMAIL_TIMEOUT_SECS: u64 = 10;

/// Spawn a best-effort notification send.
///
/// The request that triggered the notification never waits on it;
/// failures and timeouts are logged and counted only.
pub fn spawn_best_effort_email<F>(kind: &'static str, future: F)
where
    F: Future<Output = Result<Option<String>, AppError>> + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(Duration::from_secs(OUTBOUND_EMAIL_TIMEOUT_SECS), future).await {
            Ok(Ok(message_id)) => {
                EMAILS_TOTAL.with_label_values(&[kind, "sent"]).inc();
                tracing::info!(kind, message_id = ?message_id, "Notification email sent");
            }
            Ok(Err(error)) => {
                EMAILS_TOTAL.with_label_values(&[kind, "failed"]).inc();
                tracing::warn!(
                    kind,
                    %error,
                    "Notification email failed (no retry policy configured)"
                );
            }
            Err(_) => {
                EMAILS_TOTAL.with_label_values(&[kind, "timeout"]).inc();
                tracing::warn!(
                    kind,
                    timeout_seconds = OUTBOUND_EMAIL_TIMEOUT_SECS,
                    "Notification email timed out (no retry policy configured)"
                );
            }
        }
    });
}
