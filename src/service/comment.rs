//! Comment service
//!
//! Comment creation, listing, and soft deletion tied to a report
//! and its author.

use std::sync::Arc;

use crate::data::{Comment, Database, EntityId, Role, UserProfile};
use crate::error::AppError;
use crate::metrics::COMMENTS_TOTAL;
use crate::notify::{Mailer, comment_notification, spawn_best_effort_email};
use crate::service::points;

const MAX_COMMENT_CHARS: usize = 1000;

/// Comment service
pub struct CommentService {
    db: Arc<Database>,
    mailer: Arc<Mailer>,
}

impl CommentService {
    /// Create new comment service
    pub fn new(db: Arc<Database>, mailer: Arc<Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Create a comment on a visible report
    ///
    /// Awards the commenter points and attempts a "new comment on
    /// your report" email to the report owner; the email never blocks
    /// or fails the comment.
    pub async fn create(
        &self,
        author: &UserProfile,
        report_id: &str,
        body: String,
    ) -> Result<Comment, AppError> {
        if !Role::parse(&author.role)?.can_comment() {
            return Err(AppError::Forbidden);
        }

        let report = self
            .db
            .get_visible_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let body = body.trim().to_string();
        if body.is_empty() || body.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::Validation(format!(
                "el comentario es obligatorio (máximo {} caracteres)",
                MAX_COMMENT_CHARS
            )));
        }

        let comment = Comment {
            id: EntityId::new().0,
            report_id: report_id.to_string(),
            author_id: author.id.clone(),
            body,
            created_at: chrono::Utc::now(),
            deleted_at: None,
        };
        self.db.insert_comment(&comment).await?;
        COMMENTS_TOTAL.with_label_values(&["create"]).inc();
        points::apply(&self.db, &author.id, points::COMMENT, "comment").await;

        tracing::info!(
            report_id = %report_id,
            comment_id = %comment.id,
            author = %author.username,
            "Comment created"
        );

        // Commenting on one's own report sends nothing
        if report.author_id != author.id && self.mailer.is_enabled() {
            let db = self.db.clone();
            let mailer = self.mailer.clone();
            let owner_id = report.author_id.clone();
            let title = report.title.clone();
            let commenter = author.username.clone();
            let comment_body = comment.body.clone();

            spawn_best_effort_email("new_comment", async move {
                let Some(owner) = db.get_user(&owner_id).await? else {
                    return Ok(None);
                };
                let (subject, html) = comment_notification(&title, &commenter, &comment_body);
                mailer.send(&owner.email, &subject, &html).await
            });
        }

        Ok(comment)
    }

    /// List visible comments for a visible report, oldest first.
    pub async fn list(&self, report_id: &str) -> Result<Vec<Comment>, AppError> {
        self.db
            .get_visible_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.db.list_visible_comments(report_id).await
    }

    /// Soft-delete a comment
    ///
    /// Permitted for the comment's author or an admin.
    pub async fn delete(&self, actor: &UserProfile, comment_id: &str) -> Result<(), AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if comment.deleted_at.is_some() {
            return Err(AppError::NotFound);
        }

        if comment.author_id != actor.id && !Role::parse(&actor.role)?.is_admin() {
            return Err(AppError::Forbidden);
        }

        if self.db.soft_delete_comment(comment_id).await? {
            COMMENTS_TOTAL.with_label_values(&["delete"]).inc();
            tracing::info!(
                comment_id = %comment_id,
                actor = %actor.username,
                "Comment soft-deleted"
            );
        }

        Ok(())
    }
}
