use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::{CandidateQuery, ClinicCandidate, SearchLogEntry};
use crate::services::{ClinicStore, SearchLogSink, StoreError};

/// Clinic store backed by a fixed list of clinics
///
/// Used for local development against a JSON fixtures file and by the
/// test suites, which also inspect load counts and recorded logs.
#[derive(Default)]
pub struct InMemoryStore {
    clinics: Vec<ClinicCandidate>,
    load_calls: AtomicUsize,
    logs: Mutex<Vec<SearchLogEntry>>,
    load_failure: Option<String>,
    log_failure: Option<String>,
    load_delay: Option<Duration>,
}

impl InMemoryStore {
    pub fn new(clinics: Vec<ClinicCandidate>) -> Self {
        Self {
            clinics,
            ..Self::default()
        }
    }

    /// Load clinics from a JSON array of candidates
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to read {}: {}", path.display(), e)))?;
        let clinics: Vec<ClinicCandidate> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Unavailable(format!("Invalid fixtures in {}: {}", path.display(), e)))?;

        tracing::info!("Loaded {} clinics from {}", clinics.len(), path.display());

        Ok(Self::new(clinics))
    }

    /// Every candidate load fails with the given message
    pub fn with_load_failure(mut self, message: impl Into<String>) -> Self {
        self.load_failure = Some(message.into());
        self
    }

    /// Every log write fails with the given message
    pub fn with_log_failure(mut self, message: impl Into<String>) -> Self {
        self.log_failure = Some(message.into());
        self
    }

    /// Candidate loads sleep before answering
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub async fn recorded_logs(&self) -> Vec<SearchLogEntry> {
        self.logs.lock().await.clone()
    }
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<ClinicCandidate>, StoreError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.load_failure {
            return Err(StoreError::Unavailable(message.clone()));
        }

        let mut clinics = self.clinics.clone();
        clinics.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        clinics.truncate(query.pool_size);

        if !query.include_treatments {
            for clinic in &mut clinics {
                clinic.treatments.clear();
            }
        }

        Ok(clinics)
    }

    async fn health_check(&self) -> bool {
        self.load_failure.is_none()
    }
}

#[async_trait]
impl SearchLogSink for InMemoryStore {
    async fn record_search(&self, entry: &SearchLogEntry) -> Result<(), StoreError> {
        if let Some(message) = &self.log_failure {
            return Err(StoreError::Unavailable(message.clone()));
        }

        self.logs.lock().await.push(entry.clone());
        Ok(())
    }
}
