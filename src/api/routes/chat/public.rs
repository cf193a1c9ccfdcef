//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::chat::Transcript;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatTranscriptResponse {
    pub transcript: Transcript,
}

#[derive(Serialize)]
pub struct ChatSessionsResponse {
    pub sessions: Vec<String>,
}
