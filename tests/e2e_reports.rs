//! Report lifecycle tests: creation, feed, soft delete

mod common;

use common::TestServer;
use jackemate::data::Role;

#[tokio::test]
async fn create_report_starts_pending_and_awards_points() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    let body = server.create_report(&token, "Bache en Av. Principal").await;
    assert_eq!(body["reporte"]["estado"], "pendiente");
    assert_eq!(body["reporte"]["titulo"], "Bache en Av. Principal");
    assert_eq!(body["reporte"]["autor"]["username"], "vecina");
    assert!(body.get("advertencia").is_none());

    let profile = server.profile(&token).await;
    assert_eq!(profile["puntos"], 10);
}

#[tokio::test]
async fn create_report_requires_authentication() {
    let server = TestServer::new().await;

    let form = reqwest::multipart::Form::new()
        .text("titulo", "Bache")
        .text("descripcion", "Bache profundo")
        .text("categoria", "baches")
        .text("prioridad", "media");

    let response = server
        .client
        .post(server.url("/reportes"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn interested_role_cannot_create_reports() {
    let server = TestServer::new().await;
    let (user, token) = server
        .create_user_with_role("observadora", Role::Interested)
        .await;

    let form = reqwest::multipart::Form::new()
        .text("titulo", "Bache")
        .text("descripcion", "Bache profundo")
        .text("categoria", "baches")
        .text("prioridad", "media");

    let response = server
        .client
        .post(server.url("/reportes"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Rejected before any write: no points, no report
    let profile = server.state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(profile.points, 0);
    let list: serde_json::Value = server
        .client
        .get(server.url("/reportes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn create_report_rejects_missing_fields() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    let form = reqwest::multipart::Form::new()
        .text("titulo", "")
        .text("descripcion", "Bache profundo")
        .text("categoria", "baches")
        .text("prioridad", "media");

    let response = server
        .client
        .post(server.url("/reportes"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn create_report_rejects_unpaired_coordinates() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    let form = reqwest::multipart::Form::new()
        .text("titulo", "Bache")
        .text("descripcion", "Bache profundo")
        .text("categoria", "baches")
        .text("prioridad", "media")
        .text("latitud", "-34.6");

    let response = server
        .client
        .post(server.url("/reportes"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn feed_paginates_with_has_more() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    for i in 0..26 {
        server
            .create_report_in_category(&token, &format!("Luminaria {i}"), "alumbrado")
            .await;
    }
    server
        .create_report_in_category(&token, "Bache 1", "baches")
        .await;

    // Second page of the alumbrado feed
    let body: serde_json::Value = server
        .client
        .get(server.url("/reportes?offset=12&limite=12&categoria=alumbrado"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["count"], 26);
    assert_eq!(body["data"].as_array().unwrap().len(), 12);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["offset"], 12);
    assert_eq!(body["limite"], 12);

    // Last page
    let body: serde_json::Value = server
        .client
        .get(server.url("/reportes?offset=24&limite=12&categoria=alumbrado"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn feed_orders_newest_first_and_searches() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    server.create_report(&token, "Bache viejo").await;
    server.create_report(&token, "Semaforo roto").await;
    server.create_report(&token, "Bache nuevo").await;

    let body: serde_json::Value = server
        .client
        .get(server.url("/reportes?search=bache"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["count"], 2);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["titulo"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Bache nuevo", "Bache viejo"]);
}

#[tokio::test]
async fn feed_rejects_unknown_status_filter() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/reportes?estado=inexistente"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn owner_delete_hides_report_and_charges_points() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    let body = server.create_report(&token, "Bache en Av. Principal").await;
    let report_id = body["reporte"]["id"].as_str().unwrap().to_string();

    let response = server
        .client
        .delete(server.url(&format!("/reportes/{report_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Points: +10 on create, -10 on self-delete
    let profile = server.profile(&token).await;
    assert_eq!(profile["puntos"], 0);

    // Hidden from the feed and from detail
    let list: serde_json::Value = server
        .client
        .get(server.url("/reportes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 0);

    let detail = server
        .client
        .get(server.url(&format!("/reportes/{report_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 404);

    // History stays reachable for audit
    let history = server
        .client
        .get(server.url(&format!("/reportes/{report_id}/historial")))
        .send()
        .await
        .unwrap();
    assert_eq!(history.status(), 200);
}

#[tokio::test]
async fn stranger_cannot_delete_report() {
    let server = TestServer::new().await;
    let owner_token = server.register("vecina").await;
    let other_token = server.register("intrusa").await;

    let body = server.create_report(&owner_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let response = server
        .client
        .delete(server.url(&format!("/reportes/{report_id}")))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn admin_delete_does_not_charge_owner() {
    let server = TestServer::new().await;
    let owner_token = server.register("vecina").await;
    let admin_token = server.admin_token().await;

    let body = server.create_report(&owner_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let response = server
        .client
        .delete(server.url(&format!("/reportes/{report_id}")))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Owner keeps the creation bonus
    let profile = server.profile(&owner_token).await;
    assert_eq!(profile["puntos"], 10);
}

#[tokio::test]
async fn stats_report_visible_counts() {
    let server = TestServer::new().await;
    let token = server.register("vecina").await;

    server
        .create_report_in_category(&token, "Luminaria", "alumbrado")
        .await;
    server.create_report(&token, "Bache").await;

    let body: serde_json::Value = server
        .client
        .get(server.url("/estadisticas"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["total_reportes"], 2);
    assert_eq!(body["por_estado"]["pendiente"], 2);
    assert_eq!(body["por_categoria"]["alumbrado"], 1);
    assert_eq!(body["por_categoria"]["baches"], 1);
    // admin + vecina
    assert_eq!(body["total_usuarios"], 2);
}
