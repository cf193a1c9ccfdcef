//! Router for the chat API

use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, sse::Event, sse::KeepAlive, sse::Sse},
    routing::{get, post},
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::public;
use crate::ai::tools::default_tools;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::chat::Chat;

type SharedState = Arc<RwLock<AppState>>;

/// Get the transcript for a single chat session by ID
async fn chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transcript = {
        let shared = state.read().expect("Unable to read shared state");
        shared.sessions.get(&id).cloned()
    };

    let Some(transcript) = transcript else {
        return Ok((
            StatusCode::NOT_FOUND,
            format!("Chat session {} not found", id),
        )
            .into_response());
    };

    Ok(axum::Json(public::ChatTranscriptResponse { transcript }).into_response())
}

/// Get a list of all chat session ids
async fn chat_list(
    State(state): State<SharedState>,
) -> Result<axum::Json<public::ChatSessionsResponse>, ApiError> {
    let mut sessions: Vec<String> = {
        let shared = state.read().expect("Unable to read shared state");
        shared.sessions.keys().cloned().collect()
    };
    sessions.sort();

    Ok(axum::Json(public::ChatSessionsResponse { sessions }))
}

/// Initiate or add to a chat session and stream the response
async fn chat_handler(
    State(state): State<SharedState>,
    axum::Json(payload): axum::Json<public::ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (tx, rx) = mpsc::unbounded_channel::<String>();

    let sse_stream = UnboundedReceiverStream::new(rx)
        .map(|chunk| Ok::<Event, Infallible>(Event::default().data(chunk)));

    let (config, transcript) = {
        let shared = state.read().expect("Unable to read shared state");
        let transcript = shared
            .sessions
            .get(&payload.session_id)
            .cloned()
            .unwrap_or_default();
        (shared.config.clone(), transcript)
    };

    let session_id = payload.session_id;
    let message = payload.message;
    let state = Arc::clone(&state);

    // Run the turn in its own task so the response stream starts
    // immediately
    tokio::spawn(async move {
        let mut chat = Chat::builder(
            &config.openai_api_hostname,
            &config.openai_api_key,
            &config.openai_model,
        )
        .system_message(&config.system_message)
        .transcript(transcript)
        .streaming(tx.clone())
        .tools(default_tools())
        .build();

        match chat.next_msg(&message).await {
            Ok(_) => {
                let mut shared = state.write().expect("Unable to write shared state");
                shared
                    .sessions
                    .insert(session_id, chat.transcript().clone());
            }
            Err(e) => {
                tracing::error!("Chat handler error: {}. Root cause: {}", e, e.root_cause());

                // Surface a generic error to the client; the request
                // is abandoned with no retry
                let err_msg = format!("Something went wrong: {}", e);
                let completion_chunk = json!({
                    "id": "error",
                    "choices": [
                        {
                            "finish_reason": "error",
                            "delta": { "content": err_msg }
                        }
                    ]
                })
                .to_string();
                let _ = tx.send(completion_chunk);
            }
        }
    });

    let resp = Sse::new(sse_stream)
        .keep_alive(
            KeepAlive::default()
                .text("keep-alive")
                .interval(Duration::from_millis(100)),
        )
        .into_response();

    Ok(resp)
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_handler))
        .route("/{id}", get(chat_session))
        .route("/sessions", get(chat_list))
}
