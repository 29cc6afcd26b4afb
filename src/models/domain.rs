use serde::{Deserialize, Serialize};

/// Caller geolocation supplied with a search request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lon: f64,
}

/// Qualitative price preference extracted from the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPreference {
    Affordable,
    Premium,
    #[default]
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Emergency,
    SameDay,
    Weekend,
    #[default]
    Normal,
}

/// Where the caller wants to be treated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub near_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_lon: Option<f64>,
    pub radius_km: f64,
}

impl LocationIntent {
    /// True when the query names a city or state, or asks for nearby clinics
    pub fn is_specified(&self) -> bool {
        self.city.is_some() || self.state.is_some() || self.near_me
    }

    /// Caller coordinates, when both halves are known
    pub fn user_coordinates(&self) -> Option<(f64, f64)> {
        match (self.user_lat, self.user_lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    pub preference: BudgetPreference,
}

/// Structured interpretation of a free-text search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIntent {
    pub treatments: Vec<String>,
    pub location: LocationIntent,
    pub budget: BudgetIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<String>,
    pub urgency: Urgency,
    pub preferences: Vec<String>,
    pub original_query: String,
}

impl SearchIntent {
    pub fn has_service(&self) -> bool {
        !self.treatments.is_empty()
    }

    pub fn primary_treatment(&self) -> Option<&str> {
        self.treatments.first().map(String::as_str)
    }
}

/// State reference resolved for a clinic's city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInfo {
    pub slug: String,
    #[serde(default)]
    pub abbreviation: String,
}

/// City reference resolved for a clinic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityInfo {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub state: Option<StateInfo>,
}

/// Listed price range of one treatment at one clinic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPrice {
    pub treatment_name: String,
    #[serde(default)]
    pub price_from: Option<f64>,
    #[serde(default)]
    pub price_to: Option<f64>,
}

impl TreatmentPrice {
    pub fn has_price(&self) -> bool {
        self.price_from.is_some() || self.price_to.is_some()
    }
}

/// Read-only clinic snapshot eligible for ranking in one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicCandidate {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub cover_image_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: Option<CityInfo>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub treatments: Vec<TreatmentPrice>,
}

impl ClinicCandidate {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// A candidate that survived filtering, with its distance to the caller if computed
#[derive(Debug, Clone)]
pub struct FilteredCandidate {
    pub clinic: ClinicCandidate,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub from: f64,
    pub to: f64,
}

/// Ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub city_name: String,
    pub state_slug: String,
    pub rating: f64,
    pub review_count: u32,
    pub cover_image_url: String,
    pub is_paid: bool,
    pub relevance_score: f64,
    pub match_reasons: Vec<String>,
    pub treatments_matched: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Critical piece of information the query did not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingInfo {
    Service,
    Location,
}

/// Follow-up the caller should present to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    AskService,
    AskLocation,
    NoResults,
    ExpandBudget,
    #[default]
    None,
}

impl ConversationStep {
    pub fn is_none(&self) -> bool {
        matches!(self, ConversationStep::None)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationState {
    pub missing_info: Vec<MissingInfo>,
    pub follow_up_question: Option<String>,
    pub conversation_step: ConversationStep,
}

/// Parameters for a bounded candidate load
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub pool_size: usize,
    pub include_treatments: bool,
    pub as_of: chrono::DateTime<chrono::Utc>,
}

/// Result shown to the caller, as recorded in the search log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShownResult {
    pub id: String,
    pub score: f64,
}

/// Analytics record persisted after every completed search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLogEntry {
    pub session_id: String,
    pub visitor_id: Option<String>,
    pub original_query: String,
    pub extracted_intent: SearchIntent,
    pub results_shown: Vec<ShownResult>,
    pub results_count: usize,
    pub search_duration_ms: u64,
    pub fallback_used: bool,
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub base: f64,
    pub rating: f64,
    pub paid: f64,
    pub treatment_match: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 0.5,
            rating: 0.25,
            paid: 0.15,
            treatment_match: 0.10,
        }
    }
}
