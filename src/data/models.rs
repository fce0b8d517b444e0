//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User profile
// =============================================================================

/// A registered user with role and gamification points
///
/// The points balance is clamped to >= 0 by the ledger update
/// (`Database::apply_points_delta`), never by application code.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Role: admin, citizen, interested
    pub role: String,
    /// Gamification points balance (never negative)
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

/// User roles
///
/// Authorization is a pure predicate over the role; the profile
/// (and therefore the role) is re-read from the database on every
/// privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Citizen,
    Interested,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Citizen => "citizen",
            Self::Interested => "interested",
        }
    }

    /// Parse a stored role value.
    ///
    /// Unknown values are rejected rather than defaulted: a profile
    /// with a corrupt role must not pass any permission gate.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "admin" => Ok(Self::Admin),
            "citizen" => Ok(Self::Citizen),
            "interested" => Ok(Self::Interested),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown role in profile: {other}"
            ))),
        }
    }

    /// Admins and citizens may create reports.
    pub fn can_create_reports(&self) -> bool {
        matches!(self, Self::Admin | Self::Citizen)
    }

    /// Admins and citizens may comment.
    pub fn can_comment(&self) -> bool {
        matches!(self, Self::Admin | Self::Citizen)
    }

    /// Admins and citizens may vote.
    pub fn can_vote(&self) -> bool {
        matches!(self, Self::Admin | Self::Citizen)
    }

    /// Only admins may change report status directly.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

// =============================================================================
// Report
// =============================================================================

/// A geolocated citizen report of an urban problem
///
/// Created in `pendiente`; status changes only through the vote
/// threshold or an admin action. Soft-deleted rows stay in storage
/// for audit and are excluded from every visible listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author_id: String,
    /// Free-form category slug, e.g. "alumbrado", "baches"
    pub category: String,
    /// Priority: baja, media, alta
    pub priority: String,
    /// Status: pendiente, reparado, rechazado
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker; a report is visible iff this is unset
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Report statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pendiente,
    Reparado,
    Rechazado,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Reparado => "reparado",
            Self::Rechazado => "rechazado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(Self::Pendiente),
            "reparado" => Some(Self::Reparado),
            "rechazado" => Some(Self::Rechazado),
            _ => None,
        }
    }
}

/// Report priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Baja,
    Media,
    Alta,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baja => "baja",
            Self::Media => "media",
            Self::Alta => "alta",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "baja" => Some(Self::Baja),
            "media" => Some(Self::Media),
            "alta" => Some(Self::Alta),
            _ => None,
        }
    }
}

// =============================================================================
// Report photo
// =============================================================================

/// Photo attached to a report
///
/// Actual files are stored in Cloudflare R2.
/// This record holds the object key and public URL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportPhoto {
    pub id: String,
    pub report_id: String,
    /// Order within the report's photo list
    pub position: i64,
    /// S3 key for the photo file
    pub object_key: String,
    /// Public URL served via Custom Domain
    pub url: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Comment
// =============================================================================

/// Comment on a report
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub report_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker; only the author or an admin may set it
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Vote
// =============================================================================

/// Vote kinds
///
/// Votes are stored write-only and read back as tallies; at most one
/// vote per (report, voter, kind), enforced by a unique index and
/// `INSERT OR IGNORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    /// "This problem does not exist"; 5 of these reject the report
    NoExiste,
    /// "This problem was repaired"; tallied only, no automatic transition
    Reparado,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoExiste => "no_existe",
            Self::Reparado => "reparado",
        }
    }
}

// =============================================================================
// State history
// =============================================================================

/// Append-only record of a report status transition
///
/// Written on every transition (vote-driven and admin-driven alike);
/// never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StateHistory {
    pub id: String,
    pub report_id: String,
    pub previous_status: String,
    pub new_status: String,
    /// Who caused the transition (the tipping voter or the admin)
    pub actor_id: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
