//! Report service
//!
//! Handles report creation, lookup, listing, and soft deletion.

use std::sync::Arc;

use crate::data::{
    Database, EntityId, Priority, Report, ReportFilter, ReportPhoto, ReportStatus, Role,
    UserProfile, VoteKind,
};
use crate::error::AppError;
use crate::metrics::{PHOTO_UPLOADS_TOTAL, REPORTS_TOTAL};
use crate::service::points;
use crate::storage::MediaStorage;

const MAX_TITLE_CHARS: usize = 120;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_PHOTO_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Input for report creation.
#[derive(Debug)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo: Option<PhotoUpload>,
}

/// A photo received with a report submission.
#[derive(Debug)]
pub struct PhotoUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Outcome of report creation.
///
/// `warning` is set when the report persisted but its photo did not.
#[derive(Debug)]
pub struct CreatedReport {
    pub report: Report,
    pub photos: Vec<ReportPhoto>,
    pub warning: Option<String>,
}

/// A report with its photos and vote tallies, for detail responses.
#[derive(Debug)]
pub struct ReportDetail {
    pub report: Report,
    pub photos: Vec<ReportPhoto>,
    pub votes_no_existe: i64,
    pub votes_reparado: i64,
}

/// Report service
pub struct ReportService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

fn is_supported_photo_type(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/jpeg" | "image/png" | "image/webp" | "image/gif"
    )
}

fn validate_coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(Option<f64>, Option<f64>), AppError> {
    match (latitude, longitude) {
        (None, None) => Ok((None, None)),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(AppError::Validation(
                    "las coordenadas están fuera de rango".to_string(),
                ));
            }
            Ok((Some(lat), Some(lon)))
        }
        _ => Err(AppError::Validation(
            "latitud y longitud deben enviarse juntas".to_string(),
        )),
    }
}

impl ReportService {
    /// Create new report service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a new report
    ///
    /// The author must be an admin or citizen; the role is checked
    /// before any write. The photo upload is a best-effort side step:
    /// a storage failure leaves the report in place and is reported
    /// through `warning` instead of rolling anything back.
    pub async fn create(
        &self,
        author: &UserProfile,
        new: NewReport,
    ) -> Result<CreatedReport, AppError> {
        if !Role::parse(&author.role)?.can_create_reports() {
            return Err(AppError::Forbidden);
        }

        let title = new.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "el título es obligatorio (máximo {} caracteres)",
                MAX_TITLE_CHARS
            )));
        }

        let description = new.description.trim().to_string();
        if description.is_empty() || description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "la descripción es obligatoria (máximo {} caracteres)",
                MAX_DESCRIPTION_CHARS
            )));
        }

        let category = new.category.trim().to_ascii_lowercase();
        if category.is_empty() {
            return Err(AppError::Validation(
                "la categoría es obligatoria".to_string(),
            ));
        }

        let priority = Priority::parse(new.priority.trim())
            .ok_or_else(|| {
                AppError::Validation("la prioridad debe ser baja, media o alta".to_string())
            })?
            .as_str()
            .to_string();

        let (latitude, longitude) = validate_coordinates(new.latitude, new.longitude)?;

        // Malformed photos are rejected up front; only storage
        // failures downgrade to a partial success.
        if let Some(photo) = &new.photo {
            if !is_supported_photo_type(&photo.content_type) {
                return Err(AppError::Validation(
                    "la foto debe ser JPEG, PNG, WebP o GIF".to_string(),
                ));
            }
            if photo.data.len() > MAX_PHOTO_UPLOAD_BYTES {
                return Err(AppError::Validation(format!(
                    "la foto supera el tamaño máximo de {} MB",
                    MAX_PHOTO_UPLOAD_BYTES / (1024 * 1024)
                )));
            }
        }

        let report = Report {
            id: EntityId::new().0,
            title,
            description,
            author_id: author.id.clone(),
            category,
            priority,
            status: ReportStatus::Pendiente.as_str().to_string(),
            latitude,
            longitude,
            created_at: chrono::Utc::now(),
            deleted_at: None,
        };

        self.db.insert_report(&report).await?;
        REPORTS_TOTAL.inc();
        points::apply(&self.db, &author.id, points::CREATE_REPORT, "create_report").await;

        tracing::info!(
            report_id = %report.id,
            author = %author.username,
            category = %report.category,
            "Report created"
        );

        let mut photos = Vec::new();
        let mut warning = None;
        if let Some(photo) = new.photo {
            match self
                .store_photo(&report.id, 0, photo.data, &photo.content_type)
                .await
            {
                Ok(stored) => {
                    PHOTO_UPLOADS_TOTAL.with_label_values(&["ok"]).inc();
                    photos.push(stored);
                }
                Err(error) => {
                    PHOTO_UPLOADS_TOTAL.with_label_values(&["failed"]).inc();
                    tracing::warn!(
                        report_id = %report.id,
                        %error,
                        "Photo upload failed; report kept without photo"
                    );
                    warning = Some(
                        "el reporte fue creado pero la foto no pudo ser almacenada".to_string(),
                    );
                }
            }
        }

        Ok(CreatedReport {
            report,
            photos,
            warning,
        })
    }

    async fn store_photo(
        &self,
        report_id: &str,
        position: i64,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<ReportPhoto, AppError> {
        let (object_key, url) = self
            .storage
            .upload_report_photo(report_id, position, data, content_type)
            .await?;

        let photo = ReportPhoto {
            id: EntityId::new().0,
            report_id: report_id.to_string(),
            position,
            object_key,
            url,
            created_at: chrono::Utc::now(),
        };
        self.db.insert_report_photo(&photo).await?;
        Ok(photo)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get a visible report with photos and vote tallies.
    pub async fn get_detail(&self, id: &str) -> Result<ReportDetail, AppError> {
        let report = self
            .db
            .get_visible_report(id)
            .await?
            .ok_or(AppError::NotFound)?;
        let photos = self.db.get_report_photos(id).await?;
        let votes_no_existe = self.db.count_votes(id, VoteKind::NoExiste).await?;
        let votes_reparado = self.db.count_votes(id, VoteKind::Reparado).await?;

        Ok(ReportDetail {
            report,
            photos,
            votes_no_existe,
            votes_reparado,
        })
    }

    /// List visible reports with their photos.
    ///
    /// Returns the page, the total match count, and the photos for
    /// every report on the page (one batch query).
    pub async fn list(
        &self,
        filter: &ReportFilter,
    ) -> Result<(Vec<Report>, i64, Vec<ReportPhoto>), AppError> {
        let (reports, count) = self.db.list_reports(filter).await?;
        let ids: Vec<String> = reports.iter().map(|r| r.id.clone()).collect();
        let photos = self.db.get_photos_for_reports(&ids).await?;
        Ok((reports, count, photos))
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Soft-delete a report
    ///
    /// Permitted for the report's author or an admin. Deleting one's
    /// own report costs points; an admin removing someone else's
    /// report does not touch the ledger. Comments, votes, and history
    /// stay in storage for audit.
    pub async fn delete(&self, actor: &UserProfile, report_id: &str) -> Result<(), AppError> {
        let report = self
            .db
            .get_visible_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let is_owner = report.author_id == actor.id;
        if !is_owner && !Role::parse(&actor.role)?.is_admin() {
            return Err(AppError::Forbidden);
        }

        // A raced double-delete flips nothing and must not charge twice
        if !self.db.soft_delete_report(report_id).await? {
            return Ok(());
        }
        REPORTS_TOTAL.dec();

        if is_owner {
            points::apply(
                &self.db,
                &actor.id,
                points::SELF_DELETE_REPORT,
                "self_delete_report",
            )
            .await;
        }

        tracing::info!(
            report_id = %report_id,
            actor = %actor.username,
            owner_delete = is_owner,
            "Report soft-deleted"
        );

        Ok(())
    }
}
