use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::conversation::{self, generate_suggestions};
use crate::core::filters::FilterPipeline;
use crate::core::intent::TextIntentExtractor;
use crate::core::scoring::{rank, score_candidate};
use crate::models::{
    CandidateQuery, ConversationState, ScoredResult, ScoringWeights, SearchIntent, SearchLogEntry,
    SearchRequest, SearchResponse, ShownResult,
};
use crate::services::{ClinicStore, SearchLogSink, StoreError};

/// Errors that abort a search request
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database search timed out after {0:?}")]
    Timeout(Duration),
}

/// Tunables for one engine instance
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub pool_size: usize,
    pub max_results: usize,
    pub store_timeout: Duration,
    pub max_suggestions: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            pool_size: 150,
            max_results: 15,
            store_timeout: Duration::from_secs(5),
            max_suggestions: 3,
        }
    }
}

/// Search orchestrator
///
/// # Pipeline Stages
/// 1. Intent extraction
/// 2. Pre-search clarification (may answer without touching the store)
/// 3. Bounded candidate load
/// 4. Location, proximity and budget filtering
/// 5. Scoring and ranking
/// 6. Conversation state and suggestions
/// 7. Fire-and-forget search log
#[derive(Clone)]
pub struct SearchEngine {
    extractor: Arc<dyn TextIntentExtractor>,
    store: Arc<dyn ClinicStore>,
    log_sink: Arc<dyn SearchLogSink>,
    filters: FilterPipeline,
    weights: ScoringWeights,
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(
        extractor: Arc<dyn TextIntentExtractor>,
        store: Arc<dyn ClinicStore>,
        log_sink: Arc<dyn SearchLogSink>,
        filters: FilterPipeline,
        weights: ScoringWeights,
        options: SearchOptions,
    ) -> Self {
        Self {
            extractor,
            store,
            log_sink,
            filters,
            weights,
            options,
        }
    }

    /// Run one search request end to end
    ///
    /// The request is assumed to be validated already.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let intent = self.extractor.extract(&request.query, request.user_location);

        tracing::debug!(
            "Extracted intent: treatments={:?} city={:?} state={:?} budget={:?}",
            intent.treatments,
            intent.location.city,
            intent.location.state,
            intent.budget.max
        );

        if let Some(state) = conversation::preflight(&intent) {
            tracing::info!(
                "Asking for more information ({:?}) before searching",
                state.conversation_step
            );
            return Ok(build_response(intent, Vec::new(), 0, state, Vec::new(), started));
        }

        let query = CandidateQuery {
            pool_size: self.options.pool_size,
            include_treatments: intent.has_service() || intent.budget.max.is_some(),
            as_of: Utc::now(),
        };

        let candidates = match tokio::time::timeout(self.options.store_timeout, self.store.load_candidates(&query)).await {
            Ok(loaded) => loaded?,
            Err(_) => return Err(SearchError::Timeout(self.options.store_timeout)),
        };
        let pool_size = candidates.len();

        let filtered = self.filters.apply(&intent, candidates);
        let scored = filtered
            .into_iter()
            .map(|candidate| score_candidate(candidate, &intent, &self.weights))
            .collect();

        let mut results = rank(scored);
        let total_count = results.len();
        results.truncate(self.options.max_results);

        let state = conversation::resolve(&intent, total_count);
        let suggestions = generate_suggestions(&intent, total_count, self.options.max_suggestions);
        let response = build_response(intent, results, total_count, state, suggestions, started);

        tracing::info!(
            "Search completed: {} of {} candidates matched in {}ms",
            total_count,
            pool_size,
            response.search_duration_ms
        );

        self.dispatch_log(request, &response);

        Ok(response)
    }

    pub async fn health_check(&self) -> bool {
        self.store.health_check().await
    }

    /// Persist the search in the background; failures never reach the caller
    fn dispatch_log(&self, request: &SearchRequest, response: &SearchResponse) {
        let entry = SearchLogEntry {
            session_id: request
                .session_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            visitor_id: request.visitor_id.clone(),
            original_query: request.query.clone(),
            extracted_intent: response.intent.clone(),
            results_shown: shown_results(&response.results),
            results_count: response.total_count,
            search_duration_ms: response.search_duration_ms,
            fallback_used: response.fallback_used,
        };

        let sink = Arc::clone(&self.log_sink);
        tokio::spawn(async move {
            match sink.record_search(&entry).await {
                Ok(()) => tracing::debug!("Recorded search for session {}", entry.session_id),
                Err(e) => tracing::warn!("Failed to record search log: {}", e),
            }
        });
    }
}

fn shown_results(results: &[ScoredResult]) -> Vec<ShownResult> {
    results
        .iter()
        .map(|r| ShownResult {
            id: r.id.clone(),
            score: r.relevance_score,
        })
        .collect()
}

fn build_response(
    intent: SearchIntent,
    results: Vec<ScoredResult>,
    total_count: usize,
    state: ConversationState,
    suggestions: Vec<String>,
    started: Instant,
) -> SearchResponse {
    SearchResponse {
        results,
        total_count,
        intent,
        suggestions,
        follow_up_question: state.follow_up_question,
        conversation_step: state.conversation_step,
        search_duration_ms: started.elapsed().as_millis() as u64,
        // Only the rule-based extractor exists
        fallback_used: true,
        needs_more_info: !state.missing_info.is_empty(),
        missing_info: state.missing_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::intent::RuleBasedExtractor;
    use crate::core::keywords::KeywordTables;
    use crate::models::{CityInfo, ClinicCandidate, ConversationStep, StateInfo, TreatmentPrice};
    use crate::services::InMemoryStore;

    fn create_clinic(id: &str, city: &str, rating: f64, implant_price: Option<f64>) -> ClinicCandidate {
        ClinicCandidate {
            id: id.to_string(),
            name: format!("Clinic {}", id),
            slug: format!("clinic-{}", id),
            address: String::new(),
            cover_image_url: String::new(),
            rating,
            review_count: 10,
            latitude: None,
            longitude: None,
            city: Some(CityInfo {
                name: city.to_string(),
                slug: city.to_lowercase().replace(' ', "-"),
                state: Some(StateInfo {
                    slug: "massachusetts".to_string(),
                    abbreviation: "MA".to_string(),
                }),
            }),
            is_paid: false,
            treatments: vec![TreatmentPrice {
                treatment_name: "Dental Implant".to_string(),
                price_from: implant_price,
                price_to: None,
            }],
        }
    }

    fn create_engine(store: Arc<InMemoryStore>) -> SearchEngine {
        let tables = KeywordTables::default();
        let filters = FilterPipeline::new(tables.state_abbreviations.clone());
        let extractor = RuleBasedExtractor::new(tables, 15.0).unwrap();

        SearchEngine::new(
            Arc::new(extractor),
            store.clone(),
            store,
            filters,
            ScoringWeights::default(),
            SearchOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_budget_only_skips_store() {
        let store = Arc::new(InMemoryStore::new(vec![create_clinic("1", "Boston", 4.5, Some(100.0))]));
        let engine = create_engine(store.clone());

        let response = engine.search(&SearchRequest::new("under $2000")).await.unwrap();

        assert_eq!(response.conversation_step, ConversationStep::AskService);
        assert!(response.needs_more_info);
        assert!(response.results.is_empty());
        assert_eq!(store.load_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_filters_by_city_and_budget() {
        let store = Arc::new(InMemoryStore::new(vec![
            create_clinic("1", "Boston", 4.5, Some(2500.0)),
            create_clinic("2", "Boston", 4.9, Some(4000.0)),
            create_clinic("3", "Cambridge", 4.7, Some(1000.0)),
        ]));
        let engine = create_engine(store.clone());

        let response = engine
            .search(&SearchRequest::new("dental implants in boston under $3000"))
            .await
            .unwrap();

        assert_eq!(response.total_count, 1);
        assert_eq!(response.results[0].id, "1");
        assert_eq!(response.conversation_step, ConversationStep::ExpandBudget);
        assert!(response.fallback_used);
        assert_eq!(store.load_calls(), 1);
    }

    #[tokio::test]
    async fn test_store_timeout() {
        let store = Arc::new(InMemoryStore::new(vec![]).with_load_delay(Duration::from_millis(200)));
        let tables = KeywordTables::default();
        let engine = SearchEngine::new(
            Arc::new(RuleBasedExtractor::new(tables, 15.0).unwrap()),
            store.clone(),
            store,
            FilterPipeline::default(),
            ScoringWeights::default(),
            SearchOptions {
                store_timeout: Duration::from_millis(20),
                ..SearchOptions::default()
            },
        );

        let err = engine.search(&SearchRequest::new("cleaning in boston")).await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)));
    }
}
