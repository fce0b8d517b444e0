//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database, storage, ledger, and
//! notification operations.

mod comment;
mod moderation;
pub mod points;
mod report;

pub use comment::CommentService;
pub use moderation::{ModerationService, REJECT_VOTE_THRESHOLD, VoteOutcome};
pub use report::{CreatedReport, NewReport, PhotoUpload, ReportDetail, ReportService};
