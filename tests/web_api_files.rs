//! Web API File Tests
//!
//! Integration tests for the owner file endpoints.

mod common;

use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;

use common::{bearer, create_context, create_test_server, owner_token};

fn upload_form(name: &str, content: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(name)
            .mime_type("text/plain"),
    )
}

async fn upload(server: &TestServer, owner: &str, form: MultipartForm) -> Value {
    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer(owner))
        .multipart(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

fn file_id(body: &Value) -> i64 {
    body["data"]["id"].as_i64().unwrap()
}

// ============================================================================
// Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_file_success() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let form = upload_form("notes.txt", b"hello world")
        .add_text("expiration_hours", "48")
        .add_text("download_limit", "3")
        .add_text("password", "abc123");
    let body = upload(&server, "alice", form).await;

    let data = &body["data"];
    assert_eq!(data["original_name"], "notes.txt");
    assert_eq!(data["size"], 11);
    assert_eq!(data["content_type"], "text/plain");
    assert_eq!(data["download_count"], 0);
    assert_eq!(data["download_limit"], 3);
    assert_eq!(data["has_password"], true);
    assert_eq!(data["is_active"], true);
    assert_eq!(data["is_expired"], false);
    assert!(data.get("password_hash").is_none());
    assert!(data.get("blob_ref").is_none());

    let token = data["share_token"].as_str().unwrap();
    assert_eq!(token.len(), 43);
    assert_eq!(data["share_url"], format!("/api/share/{token}"));
}

#[tokio::test]
async fn test_upload_without_auth() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let response = server
        .post("/api/files")
        .multipart(upload_form("a.txt", b"x"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_upload_with_invalid_token() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, "Bearer not-a-jwt")
        .multipart(upload_form("a.txt", b"x"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer("alice"))
        .multipart(MultipartForm::new().add_text("expiration_hours", "1"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_bad_limits() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    for (field, value) in [
        ("download_limit", "0"),
        ("expiration_hours", "100000"),
    ] {
        let response = server
            .post("/api/files")
            .add_header(AUTHORIZATION, bearer("alice"))
            .multipart(upload_form("a.txt", b"x").add_text(field, value))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer("alice"))
        .multipart(upload_form("a.txt", b"x").add_text("download_limit", "many"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_password_with_control_characters() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer("alice"))
        .multipart(upload_form("a.txt", b"x").add_text("password", "tab\there"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.service.list_owned_files("alice", true).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let response = server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer("alice"))
        .multipart(upload_form("run.exe", b"MZ"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.service.list_owned_files("alice", true).await.unwrap().len(), 0);
}

// ============================================================================
// List / Get Tests
// ============================================================================

#[tokio::test]
async fn test_list_files() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let first = upload(&server, "alice", upload_form("a.txt", b"1")).await;
    upload(&server, "alice", upload_form("b.txt", b"2")).await;
    upload(&server, "bob", upload_form("c.txt", b"3")).await;

    server
        .delete(&format!("/api/files/{}", file_id(&first)))
        .add_header(AUTHORIZATION, bearer("alice"))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/files")
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    response.assert_status_ok();
    let files = response.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["original_name"], "b.txt");

    let response = server
        .get("/api/files")
        .add_query_param("include_inactive", "true")
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    let files = response.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(files.len(), 2);
    let revoked = files.iter().find(|f| f["original_name"] == "a.txt").unwrap();
    assert_eq!(revoked["is_active"], false);
    assert_eq!(revoked["inactive_reason"], "revoked");
}

#[tokio::test]
async fn test_list_files_with_query_token() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    upload(&server, "alice", upload_form("a.txt", b"1")).await;

    let response = server
        .get("/api/files")
        .add_query_param("token", owner_token("alice"))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_file() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let uploaded = upload(&server, "alice", upload_form("a.txt", b"1")).await;

    let response = server
        .get(&format!("/api/files/{}", file_id(&uploaded)))
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["share_token"], uploaded["data"]["share_token"]);
}

#[tokio::test]
async fn test_get_file_of_another_owner() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let uploaded = upload(&server, "alice", upload_form("a.txt", b"1")).await;

    let response = server
        .get(&format!("/api/files/{}", file_id(&uploaded)))
        .add_header(AUTHORIZATION, bearer("mallory"))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_file_not_found() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    let response = server
        .get("/api/files/9999")
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Revoke Tests
// ============================================================================

#[tokio::test]
async fn test_revoke_file_twice() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let uploaded = upload(&server, "alice", upload_form("a.txt", b"1")).await;
    let path = format!("/api/files/{}", file_id(&uploaded));

    let response = server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["status"], "revoked");

    let response = server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["status"], "already_revoked");

    // The owner no longer sees the file either.
    server
        .get(&path)
        .add_header(AUTHORIZATION, bearer("alice"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_revoke_file_of_another_owner() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let uploaded = upload(&server, "alice", upload_form("a.txt", b"1")).await;
    let token = uploaded["data"]["share_token"].as_str().unwrap().to_string();

    server
        .delete(&format!("/api/files/{}", file_id(&uploaded)))
        .add_header(AUTHORIZATION, bearer("mallory"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .get(&format!("/api/share/{token}"))
        .await
        .assert_status_ok();
}

// ============================================================================
// Owner Download Tests
// ============================================================================

#[tokio::test]
async fn test_owner_download_is_not_counted() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let form = upload_form("report.txt", b"owner bytes")
        .add_text("download_limit", "1")
        .add_text("password", "abc123");
    let uploaded = upload(&server, "alice", form).await;
    let path = format!("/api/files/{}/download", file_id(&uploaded));

    for _ in 0..3 {
        let response = server
            .get(&path)
            .add_header(AUTHORIZATION, bearer("alice"))
            .await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"owner bytes");
        assert_eq!(
            response.header(CONTENT_DISPOSITION),
            "attachment; filename=\"report.txt\""
        );
    }

    let info = server
        .get(&format!(
            "/api/share/{}",
            uploaded["data"]["share_token"].as_str().unwrap()
        ))
        .await;
    assert_eq!(info.json::<Value>()["data"]["download_count"], 0);
}

#[tokio::test]
async fn test_owner_download_requires_auth() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let uploaded = upload(&server, "alice", upload_form("a.txt", b"1")).await;

    server
        .get(&format!("/api/files/{}/download", file_id(&uploaded)))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Cleanup Tests
// ============================================================================

#[tokio::test]
async fn test_cleanup_requires_auth() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);

    server
        .post("/api/files/cleanup")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_retires_expired_files() {
    let ctx = create_context().await;
    let server = create_test_server(&ctx);
    let expired = upload(
        &server,
        "alice",
        upload_form("old.txt", b"old").add_text("expiration_hours", "0"),
    )
    .await;
    upload(&server, "alice", upload_form("new.txt", b"new")).await;

    let response = server
        .post("/api/files/cleanup")
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    response.assert_status_ok();
    let report = &response.json::<Value>()["data"];
    assert_eq!(report["deactivated"], 1);
    assert_eq!(report["reclaimed"], 0);
    assert_eq!(report["errors"], 0);

    let response = server
        .get("/api/files")
        .add_query_param("include_inactive", "true")
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    let files = response.json::<Value>()["data"].as_array().unwrap().clone();
    let retired = files.iter().find(|f| f["id"] == file_id(&expired)).unwrap();
    assert_eq!(retired["is_active"], false);
    assert_eq!(retired["inactive_reason"], "expired");
    let live = files.iter().find(|f| f["original_name"] == "new.txt").unwrap();
    assert_eq!(live["is_active"], true);

    // A second pass has nothing left to do.
    let response = server
        .post("/api/files/cleanup")
        .add_header(AUTHORIZATION, bearer("alice"))
        .await;
    assert_eq!(response.json::<Value>()["data"]["deactivated"], 0);
}
