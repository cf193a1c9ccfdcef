//! Test utilities for integration tests
use std::sync::{Arc, RwLock};

use axum::Router;
use axum::body::Body;

use cardboard::api::AppState;
use cardboard::api::app;
use cardboard::core::AppConfig;

/// Creates a test application router backed by in-memory state. The
/// completion hostname points at the given URL so tests can mock the
/// model with `mockito`.
pub fn test_app(llm_hostname: &str) -> Router {
    let config = AppConfig {
        openai_api_hostname: llm_hostname.to_string(),
        openai_api_key: String::from("test-api-key"),
        openai_model: String::from("gpt-4"),
        system_message: String::from("You are a helpful assistant."),
        web_ui_path: String::from("./web-ui"),
    };
    let app_state = AppState::new(config);
    app(Arc::new(RwLock::new(app_state)))
}

/// Collect a finite response body into a string. Not for SSE
/// responses, which never end.
#[allow(dead_code)]
pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
