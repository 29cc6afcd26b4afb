// Service exports
pub mod memory;
pub mod postgres;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CandidateQuery, ClinicCandidate, SearchLogEntry};

pub use memory::InMemoryStore;
pub use postgres::{PostgresClient, PostgresError};
pub use supabase::{SupabaseClient, SupabaseError};

/// Errors surfaced by any clinic store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Supabase(#[from] SupabaseError),

    #[error(transparent)]
    Postgres(#[from] PostgresError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the clinic store
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Load up to `query.pool_size` active, non-duplicate clinics ordered by
    /// rating, joined with paid status, city/state and (optionally) prices
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<ClinicCandidate>, StoreError>;

    async fn health_check(&self) -> bool;
}

/// Destination for search analytics records
#[async_trait]
pub trait SearchLogSink: Send + Sync {
    async fn record_search(&self, entry: &SearchLogEntry) -> Result<(), StoreError>;
}
