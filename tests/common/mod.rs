//! Common test utilities for E2E tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use jackemate::auth::{Session, create_session_token, hash_password};
use jackemate::data::{EntityId, Role, UserProfile};
use jackemate::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration (email disabled, storage never exercised)
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            storage: config::StorageConfig {
                media: config::MediaStorageConfig {
                    bucket: "test-fotos".to_string(),
                    public_url: "https://fotos.test.example.com".to_string(),
                },
            },
            cloudflare: config::CloudflareConfig {
                account_id: "test-account".to_string(),
                r2_access_key_id: "test-key".to_string(),
                r2_secret_access_key: "test-secret".to_string(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            email: config::EmailConfig {
                enabled: false,
                api_url: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from_address: "JackeMate <no-reply@test.example.com>".to_string(),
            },
            instance: config::InstanceConfig {
                title: "JackeMate Test".to_string(),
                description: "Test instance".to_string(),
                contact_email: "admin@test.example.com".to_string(),
            },
            admin: config::AdminConfig {
                username: "admin".to_string(),
                email: Some("admin@test.example.com".to_string()),
                password: "admin-test-password".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config.clone()).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = jackemate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register a citizen through the API and return their token
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/registro"))
            .json(&serde_json::json!({
                "username": username,
                "email": format!("{username}@test.example.com"),
                "password": "test-password-123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "signup should succeed");

        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Insert a profile directly with the given role and mint its token
    pub async fn create_user_with_role(&self, username: &str, role: Role) -> (UserProfile, String) {
        let user = UserProfile {
            id: EntityId::new().0,
            username: username.to_string(),
            email: format!("{username}@test.example.com"),
            password_hash: hash_password("test-password-123").unwrap(),
            role: role.as_str().to_string(),
            points: 0,
            created_at: Utc::now(),
        };
        assert!(self.state.db.insert_user(&user).await.unwrap());

        let token = self.token_for(&user);
        (user, token)
    }

    /// Mint a session token for an existing profile
    pub fn token_for(&self, user: &UserProfile) -> String {
        let now = Utc::now();
        let session = Session {
            user_id: user.id.clone(),
            email: user.email.clone(),
            created_at: now,
            expires_at: now + Duration::days(7),
        };
        create_session_token(&session, &self.state.config.auth.session_secret).unwrap()
    }

    /// Mint a token for the seeded admin account
    pub async fn admin_token(&self) -> String {
        let admin = self
            .state
            .db
            .get_user_by_username("admin")
            .await
            .unwrap()
            .expect("admin account is seeded at startup");
        self.token_for(&admin)
    }

    /// Create a report through the API (multipart, no photo)
    pub async fn create_report(&self, token: &str, title: &str) -> serde_json::Value {
        self.create_report_in_category(token, title, "baches").await
    }

    /// Create a report through the API in a given category
    pub async fn create_report_in_category(
        &self,
        token: &str,
        title: &str,
        category: &str,
    ) -> serde_json::Value {
        let form = reqwest::multipart::Form::new()
            .text("titulo", title.to_string())
            .text("descripcion", format!("Descripción de {title}"))
            .text("categoria", category.to_string())
            .text("prioridad", "media");

        let response = self
            .client
            .post(self.url("/reportes"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "report creation should succeed");

        response.json().await.unwrap()
    }

    /// Fetch the caller's profile
    pub async fn profile(&self, token: &str) -> serde_json::Value {
        let response = self
            .client
            .get(self.url("/auth/yo"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}
