//! Keyword tables driving the rule-based intent extractor.
//!
//! Every table is ordered data: where two entries can both match, the one
//! declared first wins. The defaults can be overridden from the `search.keywords`
//! section of the configuration, and tests substitute smaller fixtures.

use serde::Deserialize;
use std::collections::HashMap;

/// A state token and the canonical abbreviation it resolves to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StateToken {
    pub token: String,
    pub canonical: String,
}

impl StateToken {
    pub fn new(token: &str, canonical: &str) -> Self {
        Self {
            token: token.to_string(),
            canonical: canonical.to_string(),
        }
    }
}

/// Immutable keyword configuration for intent extraction and location filtering
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTables {
    #[serde(default = "default_treatments")]
    pub treatments: Vec<String>,
    #[serde(default = "default_affordable")]
    pub affordable: Vec<String>,
    #[serde(default = "default_premium")]
    pub premium: Vec<String>,
    #[serde(default = "default_state_tokens")]
    pub state_tokens: Vec<StateToken>,
    #[serde(default = "default_state_abbreviations")]
    pub state_abbreviations: HashMap<String, String>,
    #[serde(default = "default_near_me")]
    pub near_me: Vec<String>,
    #[serde(default = "default_location_stop_words")]
    pub location_stop_words: Vec<String>,
    #[serde(default = "default_insurances")]
    pub insurances: Vec<String>,
    #[serde(default = "default_emergency")]
    pub emergency: Vec<String>,
    #[serde(default = "default_same_day")]
    pub same_day: Vec<String>,
    #[serde(default = "default_weekend")]
    pub weekend: Vec<String>,
    #[serde(default = "default_preferences")]
    pub preferences: Vec<String>,
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            treatments: default_treatments(),
            affordable: default_affordable(),
            premium: default_premium(),
            state_tokens: default_state_tokens(),
            state_abbreviations: default_state_abbreviations(),
            near_me: default_near_me(),
            location_stop_words: default_location_stop_words(),
            insurances: default_insurances(),
            emergency: default_emergency(),
            same_day: default_same_day(),
            weekend: default_weekend(),
            preferences: default_preferences(),
        }
    }
}

impl KeywordTables {
    /// Canonical abbreviation for a state token, if the token is in the table
    pub fn canonical_state(&self, token: &str) -> Option<&str> {
        self.state_tokens
            .iter()
            .find(|s| s.token == token)
            .map(|s| s.canonical.as_str())
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.location_stop_words.iter().any(|w| w == word)
    }

    /// True when the word belongs to a treatment or preference keyword
    pub fn is_service_word(&self, word: &str) -> bool {
        self.treatments
            .iter()
            .chain(self.preferences.iter())
            .chain(self.affordable.iter())
            .chain(self.premium.iter())
            .flat_map(|k| k.split_whitespace())
            .any(|part| {
                word == part
                    || word.strip_prefix(part).is_some_and(|rest| rest == "s" || rest == "es")
            })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_treatments() -> Vec<String> {
    strings(&[
        "implant", "root canal", "braces", "invisalign", "whitening", "veneers",
        "crown", "bridge", "denture", "extraction", "wisdom", "cleaning", "checkup",
        "emergency", "cosmetic", "gum", "sedation", "filling", "cavity", "dental work",
        "teeth", "tooth", "molar", "orthodontic", "periodontal", "fluoride", "sealant",
    ])
}

fn default_affordable() -> Vec<String> {
    strings(&["affordable", "cheap", "budget", "low cost"])
}

fn default_premium() -> Vec<String> {
    strings(&["premium", "best", "top", "luxury"])
}

fn default_state_tokens() -> Vec<StateToken> {
    vec![
        StateToken::new("california", "CA"),
        StateToken::new("ca", "CA"),
        StateToken::new("massachusetts", "MA"),
        StateToken::new("ma", "MA"),
        StateToken::new("connecticut", "CT"),
        StateToken::new("ct", "CT"),
        StateToken::new("new york", "NY"),
        StateToken::new("ny", "NY"),
        StateToken::new("texas", "TX"),
        StateToken::new("tx", "TX"),
        StateToken::new("florida", "FL"),
        StateToken::new("fl", "FL"),
    ]
}

fn default_state_abbreviations() -> HashMap<String, String> {
    [
        ("california", "ca"),
        ("massachusetts", "ma"),
        ("connecticut", "ct"),
        ("newyork", "ny"),
        ("texas", "tx"),
        ("florida", "fl"),
    ]
    .into_iter()
    .map(|(name, abbr)| (name.to_string(), abbr.to_string()))
    .collect()
}

fn default_near_me() -> Vec<String> {
    strings(&["near me", "nearby", "close to me"])
}

fn default_location_stop_words() -> Vec<String> {
    strings(&[
        "me", "my", "you", "here", "the", "area", "under", "below", "max", "budget",
        "within", "for", "with", "who", "that", "which", "and", "or", "on", "at", "by",
        "in", "near", "around", "today", "tomorrow", "tonight", "now", "asap", "this",
        "next", "weekend", "saturday", "sunday", "please", "accepting", "accepts",
        "taking", "open", "cheap", "affordable",
    ])
}

fn default_insurances() -> Vec<String> {
    strings(&[
        "delta dental", "aetna", "metlife", "cigna", "united", "blue cross", "humana",
        "guardian",
    ])
}

fn default_emergency() -> Vec<String> {
    strings(&["emergency", "urgent", "asap"])
}

fn default_same_day() -> Vec<String> {
    strings(&["today", "same day", "now"])
}

fn default_weekend() -> Vec<String> {
    strings(&["weekend", "saturday", "sunday"])
}

fn default_preferences() -> Vec<String> {
    strings(&[
        "gentle", "pain-free", "painless", "experienced", "highly rated", "sedation",
        "female", "male", "speaks spanish",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_token_order() {
        let tables = KeywordTables::default();
        let order: Vec<&str> = tables.state_tokens.iter().map(|s| s.token.as_str()).collect();
        assert_eq!(
            order,
            vec!["california", "ca", "massachusetts", "ma", "connecticut", "ct",
                 "new york", "ny", "texas", "tx", "florida", "fl"]
        );
    }

    #[test]
    fn test_canonical_state() {
        let tables = KeywordTables::default();
        assert_eq!(tables.canonical_state("california"), Some("CA"));
        assert_eq!(tables.canonical_state("ny"), Some("NY"));
        assert_eq!(tables.canonical_state("oregon"), None);
    }

    #[test]
    fn test_service_words() {
        let tables = KeywordTables::default();
        assert!(tables.is_service_word("implants"));
        assert!(tables.is_service_word("cheap"));
        assert!(!tables.is_service_word("boston"));
    }
}
