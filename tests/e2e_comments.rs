//! Comment lifecycle tests

mod common;

use common::TestServer;
use jackemate::data::Role;

#[tokio::test]
async fn comment_persists_and_awards_points() {
    let server = TestServer::new().await;
    let author_token = server.register("autora").await;
    let commenter_token = server.register("comentarista").await;

    let body = server.create_report(&author_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/reportes/{report_id}/comentarios")))
        .bearer_auth(&commenter_token)
        .json(&serde_json::json!({ "texto": "Sigue igual que la semana pasada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let comment: serde_json::Value = response.json().await.unwrap();
    assert_eq!(comment["autor"]["username"], "comentarista");

    let profile = server.profile(&commenter_token).await;
    assert_eq!(profile["puntos"], 2);

    let list: serde_json::Value = server
        .client
        .get(server.url(&format!("/reportes/{report_id}/comentarios")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["texto"], "Sigue igual que la semana pasada");
}

#[tokio::test]
async fn empty_comment_is_rejected() {
    let server = TestServer::new().await;
    let author_token = server.register("autora").await;
    let commenter_token = server.register("comentarista").await;

    let body = server.create_report(&author_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/reportes/{report_id}/comentarios")))
        .bearer_auth(&commenter_token)
        .json(&serde_json::json!({ "texto": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn interested_role_cannot_comment() {
    let server = TestServer::new().await;
    let author_token = server.register("autora").await;
    let (_, interested_token) = server
        .create_user_with_role("observadora", Role::Interested)
        .await;

    let body = server.create_report(&author_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/reportes/{report_id}/comentarios")))
        .bearer_auth(&interested_token)
        .json(&serde_json::json!({ "texto": "Hola" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn author_can_soft_delete_own_comment() {
    let server = TestServer::new().await;
    let author_token = server.register("autora").await;
    let commenter_token = server.register("comentarista").await;

    let body = server.create_report(&author_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let comment: serde_json::Value = server
        .client
        .post(server.url(&format!("/reportes/{report_id}/comentarios")))
        .bearer_auth(&commenter_token)
        .json(&serde_json::json!({ "texto": "Sigue igual" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment_id = comment["id"].as_str().unwrap();

    let response = server
        .client
        .delete(server.url(&format!("/comentarios/{comment_id}")))
        .bearer_auth(&commenter_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Gone from the visible listing, kept in storage for audit
    let list: serde_json::Value = server
        .client
        .get(server.url(&format!("/reportes/{report_id}/comentarios")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.as_array().unwrap().is_empty());

    let audit = server.state.db.get_comment(comment_id).await.unwrap().unwrap();
    assert!(audit.deleted_at.is_some());
}

#[tokio::test]
async fn stranger_cannot_delete_comment_admin_can() {
    let server = TestServer::new().await;
    let author_token = server.register("autora").await;
    let commenter_token = server.register("comentarista").await;
    let stranger_token = server.register("intrusa").await;
    let admin_token = server.admin_token().await;

    let body = server.create_report(&author_token, "Bache").await;
    let report_id = body["reporte"]["id"].as_str().unwrap();

    let comment: serde_json::Value = server
        .client
        .post(server.url(&format!("/reportes/{report_id}/comentarios")))
        .bearer_auth(&commenter_token)
        .json(&serde_json::json!({ "texto": "Sigue igual" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment_id = comment["id"].as_str().unwrap();

    let response = server
        .client
        .delete(server.url(&format!("/comentarios/{comment_id}")))
        .bearer_auth(&stranger_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .delete(server.url(&format!("/comentarios/{comment_id}")))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn commenting_on_missing_report_is_404() {
    let server = TestServer::new().await;
    let token = server.register("comentarista").await;

    let response = server
        .client
        .post(server.url("/reportes/01ARZ3NDEKTSV4RRFFQ69G5FAV/comentarios"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "texto": "Hola" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
