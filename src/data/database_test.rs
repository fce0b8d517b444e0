//! Database tests

use super::*;
use chrono::Utc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn test_user(username: &str) -> UserProfile {
    UserProfile {
        id: EntityId::new().0,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "test-hash".to_string(),
        role: Role::Citizen.as_str().to_string(),
        points: 0,
        created_at: Utc::now(),
    }
}

fn test_report(author_id: &str) -> Report {
    Report {
        id: EntityId::new().0,
        title: "Bache en Av. Principal".to_string(),
        description: "Bache profundo frente al nro 1200".to_string(),
        author_id: author_id.to_string(),
        category: "baches".to_string(),
        priority: Priority::Media.as_str().to_string(),
        status: ReportStatus::Pendiente.as_str().to_string(),
        latitude: Some(-34.6),
        longitude: Some(-58.4),
        created_at: Utc::now(),
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_user_insert_and_get() {
    let (db, _temp_dir) = create_test_db().await;

    let user = test_user("vecina");
    assert!(db.insert_user(&user).await.unwrap());

    let retrieved = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(retrieved.username, "vecina");
    assert_eq!(retrieved.points, 0);

    let by_email = db.get_user_by_email("vecina@example.com").await.unwrap();
    assert!(by_email.is_some());
}

#[tokio::test]
async fn test_user_insert_rejects_duplicates() {
    let (db, _temp_dir) = create_test_db().await;

    let user = test_user("vecina");
    assert!(db.insert_user(&user).await.unwrap());

    let mut duplicate = test_user("vecina");
    duplicate.email = "otra@example.com".to_string();
    assert!(!db.insert_user(&duplicate).await.unwrap());
}

#[tokio::test]
async fn test_points_delta_clamps_at_zero() {
    let (db, _temp_dir) = create_test_db().await;

    let user = test_user("vecina");
    db.insert_user(&user).await.unwrap();

    assert!(db.apply_points_delta(&user.id, 10).await.unwrap());
    assert_eq!(db.get_user(&user.id).await.unwrap().unwrap().points, 10);

    // Delta larger than the balance floors at zero
    assert!(db.apply_points_delta(&user.id, -25).await.unwrap());
    assert_eq!(db.get_user(&user.id).await.unwrap().unwrap().points, 0);

    // Unknown profile is a no-op failure
    assert!(!db.apply_points_delta("no-such-user", 5).await.unwrap());
}

#[tokio::test]
async fn test_report_crud_and_soft_delete() {
    let (db, _temp_dir) = create_test_db().await;

    let user = test_user("vecina");
    db.insert_user(&user).await.unwrap();

    let report = test_report(&user.id);
    db.insert_report(&report).await.unwrap();

    let retrieved = db.get_visible_report(&report.id).await.unwrap().unwrap();
    assert_eq!(retrieved.status, "pendiente");

    assert!(db.soft_delete_report(&report.id).await.unwrap());
    // Second delete is a no-op
    assert!(!db.soft_delete_report(&report.id).await.unwrap());

    // Hidden from visible lookups, still reachable by id for audit
    assert!(db.get_visible_report(&report.id).await.unwrap().is_none());
    let audit = db.get_report(&report.id).await.unwrap().unwrap();
    assert!(audit.deleted_at.is_some());
}

#[tokio::test]
async fn test_list_reports_filters_and_pagination() {
    let (db, _temp_dir) = create_test_db().await;

    let user = test_user("vecina");
    db.insert_user(&user).await.unwrap();

    for i in 0..15 {
        let mut report = test_report(&user.id);
        report.title = format!("Reporte {i}");
        report.category = if i % 3 == 0 {
            "alumbrado".to_string()
        } else {
            "baches".to_string()
        };
        db.insert_report(&report).await.unwrap();
    }

    let filter = ReportFilter {
        category: Some("alumbrado".to_string()),
        offset: 0,
        limit: 3,
        ..Default::default()
    };
    let (page, count) = db.list_reports(&filter).await.unwrap();
    assert_eq!(count, 5);
    assert_eq!(page.len(), 3);
    assert!(page.iter().all(|r| r.category == "alumbrado"));

    let filter = ReportFilter {
        category: Some("alumbrado".to_string()),
        offset: 3,
        limit: 3,
        ..Default::default()
    };
    let (page, count) = db.list_reports(&filter).await.unwrap();
    assert_eq!(count, 5);
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn test_list_reports_search_excludes_deleted() {
    let (db, _temp_dir) = create_test_db().await;

    let user = test_user("vecina");
    db.insert_user(&user).await.unwrap();

    let mut visible = test_report(&user.id);
    visible.title = "Semaforo roto".to_string();
    db.insert_report(&visible).await.unwrap();

    let mut deleted = test_report(&user.id);
    deleted.title = "Semaforo caido".to_string();
    db.insert_report(&deleted).await.unwrap();
    db.soft_delete_report(&deleted.id).await.unwrap();

    let filter = ReportFilter {
        search: Some("semaforo".to_string()),
        offset: 0,
        limit: 10,
        ..Default::default()
    };
    let (page, count) = db.list_reports(&filter).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(page[0].id, visible.id);
}

#[tokio::test]
async fn test_cast_vote_uniqueness_and_tally() {
    let (db, _temp_dir) = create_test_db().await;

    let author = test_user("autora");
    let voter = test_user("votante");
    db.insert_user(&author).await.unwrap();
    db.insert_user(&voter).await.unwrap();

    let report = test_report(&author.id);
    db.insert_report(&report).await.unwrap();

    let tally = db
        .cast_vote(&report.id, &voter.id, VoteKind::NoExiste)
        .await
        .unwrap();
    assert_eq!(tally, Some(1));

    // Duplicate vote of the same kind is rejected
    let duplicate = db
        .cast_vote(&report.id, &voter.id, VoteKind::NoExiste)
        .await
        .unwrap();
    assert_eq!(duplicate, None);

    // A different kind from the same voter is a separate tally
    let repaired = db
        .cast_vote(&report.id, &voter.id, VoteKind::Reparado)
        .await
        .unwrap();
    assert_eq!(repaired, Some(1));

    assert_eq!(
        db.count_votes(&report.id, VoteKind::NoExiste).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_transition_is_idempotent_and_appends_history() {
    let (db, _temp_dir) = create_test_db().await;

    let author = test_user("autora");
    db.insert_user(&author).await.unwrap();
    let report = test_report(&author.id);
    db.insert_report(&report).await.unwrap();

    let transition = db
        .transition_report_status(&report.id, ReportStatus::Rechazado, None, Some("umbral"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transition.previous_status, "pendiente");
    assert_eq!(transition.new_status, "rechazado");

    // Re-applying the same transition is a no-op
    let again = db
        .transition_report_status(&report.id, ReportStatus::Rechazado, None, None)
        .await
        .unwrap();
    assert!(again.is_none());

    let history = db.list_state_history(&report.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_status, "pendiente");
    assert_eq!(history[0].new_status, "rechazado");
    assert_eq!(history[0].comment.as_deref(), Some("umbral"));
}

#[tokio::test]
async fn test_transition_skips_deleted_reports() {
    let (db, _temp_dir) = create_test_db().await;

    let author = test_user("autora");
    db.insert_user(&author).await.unwrap();
    let report = test_report(&author.id);
    db.insert_report(&report).await.unwrap();
    db.soft_delete_report(&report.id).await.unwrap();

    let transition = db
        .transition_report_status(&report.id, ReportStatus::Rechazado, None, None)
        .await
        .unwrap();
    assert!(transition.is_none());
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let (db, _temp_dir) = create_test_db().await;

    let author = test_user("autora");
    db.insert_user(&author).await.unwrap();
    let report = test_report(&author.id);
    db.insert_report(&report).await.unwrap();

    let comment = Comment {
        id: EntityId::new().0,
        report_id: report.id.clone(),
        author_id: author.id.clone(),
        body: "Sigue igual".to_string(),
        created_at: Utc::now(),
        deleted_at: None,
    };
    db.insert_comment(&comment).await.unwrap();

    let visible = db.list_visible_comments(&report.id).await.unwrap();
    assert_eq!(visible.len(), 1);

    assert!(db.soft_delete_comment(&comment.id).await.unwrap());
    let visible = db.list_visible_comments(&report.id).await.unwrap();
    assert!(visible.is_empty());

    // Still retrievable by id for audit
    let audit = db.get_comment(&comment.id).await.unwrap().unwrap();
    assert!(audit.deleted_at.is_some());
}

#[tokio::test]
async fn test_report_photos_batch_lookup() {
    let (db, _temp_dir) = create_test_db().await;

    let author = test_user("autora");
    db.insert_user(&author).await.unwrap();
    let report = test_report(&author.id);
    db.insert_report(&report).await.unwrap();

    let photo = ReportPhoto {
        id: EntityId::new().0,
        report_id: report.id.clone(),
        position: 0,
        object_key: format!("reportes/{}/0.jpg", report.id),
        url: format!("https://fotos.example.com/reportes/{}/0.jpg", report.id),
        created_at: Utc::now(),
    };
    db.insert_report_photo(&photo).await.unwrap();

    let photos = db.get_report_photos(&report.id).await.unwrap();
    assert_eq!(photos.len(), 1);

    let batch = db
        .get_photos_for_reports(&[report.id.clone()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);
    assert!(db.get_photos_for_reports(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_counts() {
    let (db, _temp_dir) = create_test_db().await;

    let author = test_user("autora");
    db.insert_user(&author).await.unwrap();

    for _ in 0..3 {
        db.insert_report(&test_report(&author.id)).await.unwrap();
    }
    let mut rejected = test_report(&author.id);
    rejected.status = ReportStatus::Rechazado.as_str().to_string();
    db.insert_report(&rejected).await.unwrap();

    assert_eq!(db.count_visible_reports().await.unwrap(), 4);
    let by_status = db.count_reports_by_status().await.unwrap();
    assert!(by_status.contains(&("pendiente".to_string(), 3)));
    assert!(by_status.contains(&("rechazado".to_string(), 1)));
}
