// Core algorithm exports
pub mod conversation;
pub mod distance;
pub mod engine;
pub mod filters;
pub mod intent;
pub mod keywords;
pub mod scoring;

pub use conversation::{generate_suggestions, missing_info, preflight, resolve};
pub use distance::haversine_distance;
pub use engine::{SearchEngine, SearchError, SearchOptions};
pub use filters::{find_treatment, matches_location, within_budget, FilterPipeline};
pub use intent::{RuleBasedExtractor, TextIntentExtractor};
pub use keywords::{KeywordTables, StateToken};
pub use scoring::{calculate_relevance, rank, score_candidate};
