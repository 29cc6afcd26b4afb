//! Clinic Search - conversational dental clinic search service
//!
//! Turns a free-text query into a structured intent, narrows a bounded pool of
//! clinics by location, proximity and budget, ranks the survivors and tells the
//! caller what to ask next when the query is incomplete.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{RuleBasedExtractor, SearchEngine, SearchError, SearchOptions, TextIntentExtractor};
pub use models::{ScoredResult, SearchIntent, SearchRequest, SearchResponse};
pub use services::{ClinicStore, SearchLogSink, StoreError};
