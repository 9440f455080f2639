//! Test helpers for integration tests.
//!
//! Provides service fixtures, a router-backed `TestServer`, and owner token
//! helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;

use sharegate::share::ShareService;
use sharegate::web::middleware::JwtClaims;
use sharegate::web::{create_router, AppState, JwtState};
use sharegate::{Config, Database, FileStorage};

/// Secret shared by test tokens and the test server.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// A share service over temporary storage.
pub struct TestContext {
    pub service: ShareService,
    pub db: Arc<Database>,
    pub storage: Arc<FileStorage>,
    pub config: Config,
    _temp: TempDir,
}

/// Create a test configuration.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.logging.file = String::new();
    config
}

/// Create a service backed by an in-memory database.
pub async fn create_context() -> TestContext {
    create_context_with(test_config()).await
}

/// Create a service backed by an in-memory database and the given config.
pub async fn create_context_with(config: Config) -> TestContext {
    let temp = TempDir::new().unwrap();
    let db = Arc::new(Database::open_in_memory().await.unwrap());
    let storage = Arc::new(FileStorage::new(temp.path().join("blobs")).unwrap());
    let service = ShareService::new(db.clone(), storage.clone(), &config);
    TestContext {
        service,
        db,
        storage,
        config,
        _temp: temp,
    }
}

/// Create a service backed by a file database that allows concurrent
/// connections.
pub async fn create_file_context() -> TestContext {
    let temp = TempDir::new().unwrap();
    let config = test_config();
    let db = Arc::new(Database::open(temp.path().join("share.db")).await.unwrap());
    let storage = Arc::new(FileStorage::new(temp.path().join("blobs")).unwrap());
    let service = ShareService::new(db.clone(), storage.clone(), &config);
    TestContext {
        service,
        db,
        storage,
        config,
        _temp: temp,
    }
}

/// Create a test server around a context's service.
pub fn create_test_server(ctx: &TestContext) -> TestServer {
    let app_state = Arc::new(AppState::new(
        ctx.service.clone(),
        ctx.config.server.password_attempts_per_minute,
    ));
    let jwt_state = Arc::new(JwtState::new(&ctx.config.auth.jwt_secret));
    let router = create_router(app_state, jwt_state, &ctx.config.server.cors_origins);
    TestServer::new(router).expect("Failed to create test server")
}

/// Issue an owner bearer token.
pub fn owner_token(owner_id: &str) -> String {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = JwtClaims {
        sub: owner_id.to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Authorization header value for an owner.
pub fn bearer(owner_id: &str) -> String {
    format!("Bearer {}", owner_token(owner_id))
}
