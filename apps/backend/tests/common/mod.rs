//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up the router against a real database
//! - Stub language models and photo store with fixed behaviour
//! - Identity header helpers
//!
//! # Requirements
//! Integration tests require a PostgreSQL database (set DATABASE_URL).
//! Storage defaults to dummy credentials that are never reached;
//! upload tests substitute `StubStore`.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use uuid::Uuid;

use dayflow_backend::build_router;
use dayflow_backend::config::StorageConfig;
use dayflow_backend::db::Database;
use dayflow_backend::routes::auth::USER_ID_HEADER;
use dayflow_backend::services::llm::{ChatMessage, LanguageModel, LlmError, MessageContent};
use dayflow_backend::services::storage::{PhotoStore, StorageError, StorageService};
use dayflow_backend::AppState;

/// Model that is always down, so every enrichment takes its fallback.
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        Err(LlmError::Http { status: 503 })
    }
}

/// Model that answers every prompt with the same text.
pub struct FixedModel(pub String);

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

/// Model that remembers every text message it was sent.
#[derive(Default)]
pub struct RecordingModel {
    pub reply: String,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Default::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock").clone()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let mut prompts = self.prompts.lock().expect("prompt lock");
        for message in messages {
            if let MessageContent::Text(text) = message.content {
                prompts.push(text);
            }
        }
        Ok(self.reply.clone())
    }
}

/// Store that keeps nothing and fails for the listed file names.
pub struct StubStore {
    pub failing: Vec<String>,
}

#[async_trait]
impl PhotoStore for StubStore {
    async fn upload_photo(
        &self,
        user_id: &str,
        filename: &str,
        _content: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.failing.iter().any(|name| name == filename) {
            return Err(StorageError::S3("stub upload failure".to_string()));
        }
        Ok(format!("https://photos.test/{user_id}/{filename}"))
    }
}

/// Test context containing database connection and router.
///
/// Each context uses a fresh random user id.
pub struct TestContext {
    pub db: Arc<Database>,
    pub user_id: String,
    app: Router,
}

impl TestContext {
    /// Create a context whose language model always fails.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        Self::with_model(Arc::new(FailingModel)).await
    }

    pub async fn with_model(llm: Arc<dyn LanguageModel>) -> Self {
        let storage = StorageService::new(&StorageConfig {
            bucket: "test-bucket".to_string(),
            region: "auto".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key: "test-key".to_string(),
            secret_key: "test-secret".to_string(),
            public_url: None,
            timeout: Duration::from_secs(1),
        });
        Self::with_services(llm, Arc::new(storage)).await
    }

    pub async fn with_services(llm: Arc<dyn LanguageModel>, storage: Arc<dyn PhotoStore>) -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url, 5)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);

        let state = AppState {
            db: db.clone(),
            storage,
            llm,
            google: None,
            frontend_url: None,
        };

        Self {
            db,
            user_id: format!("test-{}", Uuid::new_v4()),
            app: build_router(state),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Identity header for this context's user.
    pub fn user_header(&self) -> (HeaderName, HeaderValue) {
        Self::header_for(&self.user_id)
    }

    /// Identity header for an arbitrary user.
    pub fn header_for(user_id: &str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_str(user_id).expect("valid header value"),
        )
    }

    /// Remove the user; diaries, timeline, photos and calendar rows cascade.
    pub async fn cleanup(&self) {
        Self::cleanup_user(&self.db, &self.user_id).await;
    }

    pub async fn cleanup_user(db: &Database, user_id: &str) {
        let _ = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(db.pool())
            .await;
    }

    /// Count every timeline row of a diary, soft-deleted included.
    pub async fn count_timeline_rows(&self, diary_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM timeline_events WHERE diary_id = $1")
            .bind(diary_id)
            .fetch_one(self.db.pool())
            .await
            .expect("count query")
    }

    /// Count active calendar-sourced timeline rows of a diary.
    pub async fn count_active_calendar_rows(&self, diary_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM timeline_events \
             WHERE diary_id = $1 AND source = 'calendar' AND NOT is_deleted",
        )
        .bind(diary_id)
        .fetch_one(self.db.pool())
        .await
        .expect("count query")
    }

    /// Count diaries of this context's user.
    pub async fn count_diaries(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM diaries WHERE user_id = $1")
            .bind(&self.user_id)
            .fetch_one(self.db.pool())
            .await
            .expect("count query")
    }
}
