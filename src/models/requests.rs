use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::UserLocation;

/// Minimum query length after trimming
pub const MIN_QUERY_CHARS: usize = 3;

/// Message returned for queries shorter than the minimum length
pub const QUERY_TOO_SHORT: &str = "Query must be at least 3 characters";

/// Request to run a conversational clinic search
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(custom(function = "validate_query"))]
    #[serde(default, deserialize_with = "lenient_query")]
    pub query: String,
    #[serde(alias = "session_id", rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(alias = "visitor_id", rename = "visitorId", default)]
    pub visitor_id: Option<String>,
    #[serde(alias = "user_location", rename = "userLocation", default)]
    pub user_location: Option<UserLocation>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: None,
            visitor_id: None,
            user_location: None,
        }
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.user_location = Some(UserLocation { lat, lon });
        self
    }
}

/// Non-string queries read as empty and fail the length check
fn lenient_query<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(query)) => query,
        _ => String::new(),
    })
}

fn validate_query(query: &str) -> Result<(), ValidationError> {
    if query.trim().chars().count() < MIN_QUERY_CHARS {
        let mut error = ValidationError::new("query_too_short");
        error.message = Some(QUERY_TOO_SHORT.into());
        return Err(error);
    }
    Ok(())
}
