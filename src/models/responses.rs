use serde::{Deserialize, Serialize};
use crate::models::domain::{ConversationStep, MissingInfo, ScoredResult, SearchIntent};

/// Response for the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<ScoredResult>,
    pub total_count: usize,
    pub intent: SearchIntent,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
    #[serde(default, skip_serializing_if = "ConversationStep::is_none")]
    pub conversation_step: ConversationStep,
    pub search_duration_ms: u64,
    pub fallback_used: bool,
    pub needs_more_info: bool,
    pub missing_info: Vec<MissingInfo>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
