//! SQLite database operations
//!
//! All database access goes through this module.
//! The counters at risk under concurrent requests (points balance,
//! vote tallies, the threshold transition) are expressed as atomic
//! SQL updates or single transactions, never as read-modify-write
//! in application code.

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Filters for the paginated report feed.
///
/// All filters are conjunctive; `search` matches title or
/// description as a case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub has_location: Option<bool>,
    pub offset: i64,
    pub limit: i64,
}

/// Result of a status transition attempt.
///
/// Returned only when the row actually changed; a raced or
/// redundant transition yields `None` from the caller's view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub previous_status: String,
    pub new_status: String,
}

fn push_report_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ReportFilter) {
    builder.push(" WHERE deleted_at IS NULL");

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR description LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(status) = &filter.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(priority) = &filter.priority {
        builder.push(" AND priority = ").push_bind(priority.clone());
    }
    match filter.has_location {
        Some(true) => {
            builder.push(" AND latitude IS NOT NULL AND longitude IS NOT NULL");
        }
        Some(false) => {
            builder.push(" AND (latitude IS NULL OR longitude IS NULL)");
        }
        None => {}
    }
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user profile.
    ///
    /// Returns `false` when the username or email is already taken.
    pub async fn insert_user(&self, user: &UserProfile) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, points, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.points)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db_err))
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a user profile by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user profile by username.
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user profile by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Change a user's role.
    pub async fn set_user_role(&self, id: &str, role: Role) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a points delta to a user, clamped at zero.
    ///
    /// Atomic in SQL (`MAX(0, points + delta)`), so concurrent
    /// deltas for the same user cannot lose updates.
    ///
    /// Returns `false` when the profile does not exist.
    pub async fn apply_points_delta(&self, user_id: &str, delta: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET points = MAX(0, points + ?) WHERE id = ?")
            .bind(delta)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get (id, username) pairs for a batch of users.
    ///
    /// Used to label feed pages and comment lists in one query.
    pub async fn get_usernames(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<(String, String)>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id, username FROM users WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in user_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Count registered users.
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Insert a new report.
    pub async fn insert_report(&self, report: &Report) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO reports (id, title, description, author_id, category, priority,
                                  status, latitude, longitude, created_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&report.id)
        .bind(&report.title)
        .bind(&report.description)
        .bind(&report.author_id)
        .bind(&report.category)
        .bind(&report.priority)
        .bind(&report.status)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(report.created_at)
        .bind(report.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a report by ID, including soft-deleted rows (audit access).
    pub async fn get_report(&self, id: &str) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    /// Get a report by ID, excluding soft-deleted rows.
    pub async fn get_visible_report(&self, id: &str) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    /// List visible reports matching the filter, newest first.
    ///
    /// Returns the page of reports and the total match count so the
    /// caller can compute `hasMore`.
    pub async fn list_reports(
        &self,
        filter: &ReportFilter,
    ) -> Result<(Vec<Report>, i64), AppError> {
        let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM reports");
        push_report_filters(&mut count_builder, filter);
        let count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM reports");
        push_report_filters(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let reports = builder
            .build_query_as::<Report>()
            .fetch_all(&self.pool)
            .await?;

        Ok((reports, count))
    }

    /// Soft-delete a report.
    ///
    /// Returns `false` when the report was already deleted (or does
    /// not exist), so a repeated delete has no further effect.
    pub async fn soft_delete_report(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE reports SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition a report's status and append the history row.
    ///
    /// The update is a compare-and-swap on the status read inside the
    /// same transaction (`WHERE status = <previous>`), so concurrent
    /// callers cannot double-apply a transition: exactly one caller
    /// observes `Some(..)`, everyone else `None`. Redundant requests
    /// (report already in the target status) also yield `None`.
    pub async fn transition_report_status(
        &self,
        report_id: &str,
        new_status: ReportStatus,
        actor_id: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Option<StateTransition>, AppError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT status FROM reports WHERE id = ? AND deleted_at IS NULL")
                .bind(report_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Ok(None);
        };
        if previous == new_status.as_str() {
            return Ok(None);
        }

        let result = sqlx::query(
            "UPDATE reports SET status = ? WHERE id = ? AND status = ? AND deleted_at IS NULL",
        )
        .bind(new_status.as_str())
        .bind(report_id)
        .bind(&previous)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO state_history (id, report_id, previous_status, new_status, actor_id, comment, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(EntityId::new().0)
        .bind(report_id)
        .bind(&previous)
        .bind(new_status.as_str())
        .bind(actor_id)
        .bind(comment)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(StateTransition {
            previous_status: previous,
            new_status: new_status.as_str().to_string(),
        }))
    }

    /// Count visible reports.
    pub async fn count_visible_reports(&self) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count visible reports grouped by status.
    pub async fn count_reports_by_status(&self) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM reports WHERE deleted_at IS NULL GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count visible reports grouped by category.
    pub async fn count_reports_by_category(&self) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT category, COUNT(*) FROM reports WHERE deleted_at IS NULL GROUP BY category
             ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Report photos
    // =========================================================================

    /// Insert a photo record for a report.
    pub async fn insert_report_photo(&self, photo: &ReportPhoto) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO report_photos (id, report_id, position, object_key, url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&photo.id)
        .bind(&photo.report_id)
        .bind(photo.position)
        .bind(&photo.object_key)
        .bind(&photo.url)
        .bind(photo.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the ordered photo list for a report.
    pub async fn get_report_photos(&self, report_id: &str) -> Result<Vec<ReportPhoto>, AppError> {
        let photos = sqlx::query_as::<_, ReportPhoto>(
            "SELECT * FROM report_photos WHERE report_id = ? ORDER BY position",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    /// Get photos for a batch of reports (one query for a feed page).
    pub async fn get_photos_for_reports(
        &self,
        report_ids: &[String],
    ) -> Result<Vec<ReportPhoto>, AppError> {
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT * FROM report_photos WHERE report_id IN (");
        let mut separated = builder.separated(", ");
        for id in report_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY report_id, position");

        let photos = builder
            .build_query_as::<ReportPhoto>()
            .fetch_all(&self.pool)
            .await?;
        Ok(photos)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Insert a new comment.
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO comments (id, report_id, author_id, body, created_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.report_id)
        .bind(&comment.author_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .bind(comment.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a comment by ID, including soft-deleted rows (audit access).
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    /// List visible comments for a report, oldest first.
    pub async fn list_visible_comments(&self, report_id: &str) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE report_id = ? AND deleted_at IS NULL
             ORDER BY created_at ASC",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// Soft-delete a comment.
    pub async fn soft_delete_comment(&self, id: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE comments SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Votes
    // =========================================================================

    /// Cast a vote and return the resulting tally.
    ///
    /// The insert and the count run in one transaction; the unique
    /// index on (report, voter, kind) plus `INSERT OR IGNORE` makes
    /// duplicates a no-op, reported as `None`.
    pub async fn cast_vote(
        &self,
        report_id: &str,
        voter_id: &str,
        kind: VoteKind,
    ) -> Result<Option<i64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO votes (id, report_id, voter_id, kind, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(EntityId::new().0)
        .bind(report_id)
        .bind(voter_id)
        .bind(kind.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let tally: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE report_id = ? AND kind = ?")
                .bind(report_id)
                .bind(kind.as_str())
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(Some(tally))
    }

    /// Count votes of a kind for a report.
    pub async fn count_votes(&self, report_id: &str, kind: VoteKind) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE report_id = ? AND kind = ?")
                .bind(report_id)
                .bind(kind.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // =========================================================================
    // State history
    // =========================================================================

    /// List the status transition history for a report, oldest first.
    pub async fn list_state_history(
        &self,
        report_id: &str,
    ) -> Result<Vec<StateHistory>, AppError> {
        let history = sqlx::query_as::<_, StateHistory>(
            "SELECT * FROM state_history WHERE report_id = ? ORDER BY created_at ASC",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }
}
