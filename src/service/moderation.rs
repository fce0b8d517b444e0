//! Moderation service
//!
//! Vote casting, the 5-vote rejection threshold, and admin-driven
//! status transitions. Every transition appends a StateHistory row
//! and notifies the report author by email, fire-and-forget.

use std::sync::Arc;

use crate::data::{
    Database, Report, ReportStatus, Role, StateHistory, StateTransition, UserProfile, VoteKind,
};
use crate::error::AppError;
use crate::metrics::{STATUS_TRANSITIONS_TOTAL, VOTES_TOTAL};
use crate::notify::{Mailer, spawn_best_effort_email, status_change_notification};
use crate::service::points;

/// Number of "does not exist" votes that reject a report.
pub const REJECT_VOTE_THRESHOLD: i64 = 5;

const AUTO_REJECT_COMMENT: &str = "Rechazado automáticamente por votos de la comunidad";

/// Outcome of a vote.
#[derive(Debug)]
pub struct VoteOutcome {
    /// Tally for this vote kind after the cast
    pub tally: i64,
    /// Report status after any threshold transition
    pub status: String,
}

/// Moderation service
pub struct ModerationService {
    db: Arc<Database>,
    mailer: Arc<Mailer>,
}

impl ModerationService {
    /// Create new moderation service
    pub fn new(db: Arc<Database>, mailer: Arc<Mailer>) -> Self {
        Self { db, mailer }
    }

    // =========================================================================
    // Votes
    // =========================================================================

    /// Cast a vote on a report
    ///
    /// One vote per (report, voter, kind); authors cannot vote on
    /// their own reports. Each accepted vote awards the voter a
    /// point. A `no_existe` vote that reaches the threshold rejects
    /// the report exactly once: the transition is a guarded update,
    /// so concurrent votes at the boundary cannot double-trigger it
    /// or double-penalize the author. `reparado` votes are tallied
    /// only; that status is reachable through the admin path alone.
    pub async fn cast_vote(
        &self,
        voter: &UserProfile,
        report_id: &str,
        kind: VoteKind,
    ) -> Result<VoteOutcome, AppError> {
        if !Role::parse(&voter.role)?.can_vote() {
            return Err(AppError::Forbidden);
        }

        let report = self
            .db
            .get_visible_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if report.author_id == voter.id {
            return Err(AppError::Validation(
                "no puede votar su propio reporte".to_string(),
            ));
        }

        let Some(tally) = self.db.cast_vote(report_id, &voter.id, kind).await? else {
            return Err(AppError::Validation(
                "ya votó en este reporte".to_string(),
            ));
        };

        VOTES_TOTAL.with_label_values(&[kind.as_str()]).inc();
        points::apply(&self.db, &voter.id, points::VOTE, "vote").await;

        tracing::info!(
            report_id = %report_id,
            voter = %voter.username,
            kind = kind.as_str(),
            tally,
            "Vote cast"
        );

        if kind == VoteKind::NoExiste && tally >= REJECT_VOTE_THRESHOLD {
            if let Some(transition) = self
                .db
                .transition_report_status(
                    report_id,
                    ReportStatus::Rechazado,
                    Some(&voter.id),
                    Some(AUTO_REJECT_COMMENT),
                )
                .await?
            {
                STATUS_TRANSITIONS_TOTAL
                    .with_label_values(&["rechazado", "votos"])
                    .inc();
                points::apply(
                    &self.db,
                    &report.author_id,
                    points::REPORT_REJECTED,
                    "report_rejected",
                )
                .await;

                tracing::info!(
                    report_id = %report_id,
                    tally,
                    "Report rejected by vote threshold"
                );

                self.notify_status_change(&report, &transition);
            }
        }

        // Re-read so a threshold crossed by a concurrent vote is
        // still reflected in the response
        let status = self
            .db
            .get_visible_report(report_id)
            .await?
            .map(|r| r.status)
            .unwrap_or(report.status);

        Ok(VoteOutcome { tally, status })
    }

    // =========================================================================
    // Admin transitions
    // =========================================================================

    /// Change a report's status directly
    ///
    /// Admin only. Appends the same kind of StateHistory row as the
    /// vote-driven transition. No ledger side effect on this path.
    pub async fn admin_set_status(
        &self,
        actor: &UserProfile,
        report_id: &str,
        new_status: ReportStatus,
        comment: Option<String>,
    ) -> Result<StateTransition, AppError> {
        if !Role::parse(&actor.role)?.is_admin() {
            return Err(AppError::Forbidden);
        }

        let report = self
            .db
            .get_visible_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if report.status == new_status.as_str() {
            return Err(AppError::Validation(
                "el reporte ya tiene ese estado".to_string(),
            ));
        }

        let transition = self
            .db
            .transition_report_status(report_id, new_status, Some(&actor.id), comment.as_deref())
            .await?
            .ok_or_else(|| {
                AppError::Unprocessable(
                    "el estado del reporte cambió, vuelva a intentarlo".to_string(),
                )
            })?;

        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[new_status.as_str(), "admin"])
            .inc();

        tracing::info!(
            report_id = %report_id,
            admin = %actor.username,
            previous = %transition.previous_status,
            new = %transition.new_status,
            "Report status changed by admin"
        );

        self.notify_status_change(&report, &transition);

        Ok(transition)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// List the status history for a report.
    ///
    /// History stays readable for soft-deleted reports (audit).
    pub async fn list_history(&self, report_id: &str) -> Result<Vec<StateHistory>, AppError> {
        self.db
            .get_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.db.list_state_history(report_id).await
    }

    fn notify_status_change(&self, report: &Report, transition: &StateTransition) {
        if !self.mailer.is_enabled() {
            return;
        }

        let db = self.db.clone();
        let mailer = self.mailer.clone();
        let author_id = report.author_id.clone();
        let title = report.title.clone();
        let previous = transition.previous_status.clone();
        let new = transition.new_status.clone();

        spawn_best_effort_email("status_change", async move {
            let Some(author) = db.get_user(&author_id).await? else {
                return Ok(None);
            };
            let (subject, html) = status_change_notification(&title, &previous, &new, None);
            mailer.send(&author.email, &subject, &html).await
        });
    }
}
