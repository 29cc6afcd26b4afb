// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BudgetIntent, BudgetPreference, CandidateQuery, CityInfo, ClinicCandidate, ConversationState,
    ConversationStep, FilteredCandidate, LocationIntent, MissingInfo, PriceRange, ScoredResult,
    ScoringWeights, SearchIntent, SearchLogEntry, ShownResult, StateInfo, TreatmentPrice, Urgency,
    UserLocation,
};
pub use requests::{SearchRequest, MIN_QUERY_CHARS, QUERY_TOO_SHORT};
pub use responses::{ErrorResponse, HealthResponse, SearchResponse};
