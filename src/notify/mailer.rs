//! Transactional email client
//!
//! Sends notification emails through an HTTP email API
//! (Resend-compatible). Delivery is fire-and-forget: failures are
//! logged and counted, never surfaced to the end user.

use serde::Deserialize;

use crate::config::EmailConfig;
use crate::error::AppError;

/// Email service over a transactional HTTP API.
pub struct Mailer {
    config: EmailConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl Mailer {
    /// Create a new mailer.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Check if outbound email is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send one email.
    ///
    /// Returns the provider message ID when available. A disabled
    /// mailer drops the message and returns `None`.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<Option<String>, AppError> {
        if !self.config.enabled {
            tracing::debug!(to = %to, subject = %subject, "Email disabled; dropping message");
            return Ok(None);
        }

        let body = serde_json::json!({
            "from": self.config.from_address,
            "to": [to],
            "subject": subject,
            "html": html_body,
        });

        let response = self
            .http_client
            .post(format!(
                "{}/emails",
                self.config.api_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let parsed: SendResponse = response.json().await.unwrap_or(SendResponse { id: None });
            Ok(parsed.id)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(AppError::Email(format!(
                "email API returned {}: {}",
                status, error_text
            )))
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

fn wrap_html(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    {}
    <hr style="margin-top: 40px; border: none; border-top: 1px solid #e9ecef;">
    <p style="font-size: 12px; color: #6c757d;">
        Este correo fue enviado por JackeMate.
    </p>
</body>
</html>"#,
        content
    )
}

/// Build the "new comment on your report" email.
///
/// User-provided text is escaped before interpolation.
pub fn comment_notification(
    report_title: &str,
    commenter_username: &str,
    comment_body: &str,
) -> (String, String) {
    let subject = format!(
        "Nuevo comentario en tu reporte \"{}\"",
        html_escape::encode_text(report_title)
    );
    let html = wrap_html(&format!(
        "<p><strong>{}</strong> comentó en tu reporte \"{}\":</p>\
         <blockquote>{}</blockquote>",
        html_escape::encode_text(commenter_username),
        html_escape::encode_text(report_title),
        html_escape::encode_text(comment_body),
    ));
    (subject, html)
}

/// Build the "report status changed" email.
pub fn status_change_notification(
    report_title: &str,
    previous_status: &str,
    new_status: &str,
    comment: Option<&str>,
) -> (String, String) {
    let subject = format!(
        "Tu reporte \"{}\" cambió de estado",
        html_escape::encode_text(report_title)
    );
    let comment_html = comment
        .map(|c| format!("<blockquote>{}</blockquote>", html_escape::encode_text(c)))
        .unwrap_or_default();
    let html = wrap_html(&format!(
        "<p>Tu reporte \"{}\" pasó de <strong>{}</strong> a <strong>{}</strong>.</p>{}",
        html_escape::encode_text(report_title),
        html_escape::encode_text(previous_status),
        html_escape::encode_text(new_status),
        comment_html,
    ));
    (subject, html)
}
