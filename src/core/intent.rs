use regex::Regex;

use crate::core::keywords::KeywordTables;
use crate::models::{BudgetIntent, BudgetPreference, LocationIntent, SearchIntent, Urgency, UserLocation};

/// Turns a free-text query into a structured [`SearchIntent`].
///
/// Implementations must be pure: the same `(query, user_location)` always
/// yields the same intent. The filter and scoring stages only ever see the
/// returned intent, so a model-backed extractor can replace the rule-based one
/// without touching them.
pub trait TextIntentExtractor: Send + Sync {
    fn extract(&self, query: &str, user_location: Option<UserLocation>) -> SearchIntent;
}

/// Deterministic keyword and regex based extractor
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    tables: KeywordTables,
    default_radius_km: f64,
    budget_re: Regex,
    quantity_re: Regex,
    state_res: Vec<(Regex, String)>,
    preposition_re: Regex,
    place_re: Regex,
    comma_re: Regex,
}

impl RuleBasedExtractor {
    pub fn new(tables: KeywordTables, default_radius_km: f64) -> Result<Self, regex::Error> {
        let budget_re = Regex::new(r"(?:under|below|max|budget|within)\s*\$?(\d+(?:,\d{3})*(?:\.\d{2})?)")?;
        let quantity_re = Regex::new(r"\b(\d+)\s*(?:implants?|teeth|tooth|crowns?|veneers?)")?;

        let state_res = tables
            .state_tokens
            .iter()
            .map(|s| {
                Regex::new(&format!(r"\b{}\b", regex::escape(&s.token)))
                    .map(|re| (re, s.canonical.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Full state names may follow the comma; anything else must be a two-letter code
        let state_names = tables
            .state_tokens
            .iter()
            .filter(|s| s.token.len() > 2)
            .map(|s| regex::escape(&s.token))
            .collect::<Vec<_>>();
        let state_alternatives = if state_names.is_empty() {
            "[a-z]{2}".to_string()
        } else {
            format!("{}|[a-z]{{2}}", state_names.join("|"))
        };

        let preposition_re = Regex::new(r"\b(?:in|near|around)\s+")?;
        let place_re = Regex::new(&format!(
            r"^([a-z][a-z\s-]*)(?:,\s*({})\b)?",
            state_alternatives
        ))?;
        let comma_re = Regex::new(r"([a-z][a-z\s-]*),\s*([a-z]{2})\b")?;

        Ok(Self {
            tables,
            default_radius_km,
            budget_re,
            quantity_re,
            state_res,
            preposition_re,
            place_re,
            comma_re,
        })
    }

    fn extract_treatments(&self, text: &str) -> Vec<String> {
        let mut treatments: Vec<String> = Vec::new();
        for keyword in &self.tables.treatments {
            if text.contains(keyword.as_str()) && !treatments.contains(keyword) {
                treatments.push(keyword.clone());
            }
        }
        treatments
    }

    fn extract_budget(&self, text: &str) -> BudgetIntent {
        let max = self
            .budget_re
            .captures(text)
            .and_then(|caps| caps[1].replace(',', "").parse::<f64>().ok());

        let preference = if contains_any(text, &self.tables.affordable) {
            BudgetPreference::Affordable
        } else if contains_any(text, &self.tables.premium) {
            BudgetPreference::Premium
        } else {
            BudgetPreference::Any
        };

        BudgetIntent {
            max,
            min: None,
            preference,
        }
    }

    /// Digits already read as the budget amount are never a quantity
    fn extract_quantity(&self, text: &str) -> Option<u32> {
        let budget_span = self
            .budget_re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.range());

        self.quantity_re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find(|m| !budget_span.as_ref().is_some_and(|span| span.contains(&m.start())))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|q| *q > 0)
    }

    fn extract_location(&self, text: &str, user_location: Option<UserLocation>) -> LocationIntent {
        // Stage 1: state token table, first entry wins
        let mut state = self
            .state_res
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, canonical)| canonical.clone());

        // Stage 2: "in / near / around <city>[, <state>]"
        let mut city = None;
        for prefix in self.preposition_re.find_iter(text) {
            let Some(caps) = self.place_re.captures(&text[prefix.end()..]) else {
                continue;
            };
            let raw = &caps[1];
            let words: Vec<&str> = raw
                .split_whitespace()
                .take_while(|w| !self.tables.is_stop_word(w))
                .collect();
            let truncated = words.len() < raw.split_whitespace().count();

            let Some(found) = self.clean_city(&words.join(" ")) else {
                continue;
            };
            city = Some(found);

            if state.is_none() && !truncated {
                if let Some(raw_state) = caps.get(2) {
                    let raw_state = raw_state.as_str().trim();
                    state = Some(
                        self.tables
                            .canonical_state(raw_state)
                            .map(str::to_string)
                            .unwrap_or_else(|| raw_state.to_uppercase()),
                    );
                }
            }
            break;
        }

        // Stage 3: bare "<city>, <ST>"
        if city.is_none() {
            if let Some(caps) = self.comma_re.captures(text) {
                let mut words: Vec<&str> = caps[1]
                    .split_whitespace()
                    .rev()
                    .take_while(|w| !self.tables.is_stop_word(w) && !self.tables.is_service_word(w))
                    .collect();
                words.reverse();

                if let Some(found) = self.clean_city(&words.join(" ")) {
                    city = Some(found);
                    if state.is_none() {
                        state = Some(caps[2].to_uppercase());
                    }
                }
            }
        }

        // A trailing state token belongs to the state, not the city
        if let Some(current) = city.take() {
            let mut trimmed = current.clone();
            for token in &self.tables.state_tokens {
                let suffix = format!(" {}", token.token);
                if let Some(rest) = current.strip_suffix(&suffix) {
                    if rest.trim().len() > 1 {
                        trimmed = rest.trim().to_string();
                        if state.is_none() {
                            state = Some(token.canonical.clone());
                        }
                        break;
                    }
                }
            }
            // A bare state name ("in texas") constrains the state only
            match self.tables.canonical_state(&trimmed) {
                Some(canonical) => {
                    if state.is_none() {
                        state = Some(canonical.to_string());
                    }
                }
                None => city = Some(trimmed),
            }
        }

        LocationIntent {
            state,
            city,
            near_me: contains_any(text, &self.tables.near_me),
            user_lat: user_location.map(|l| l.lat),
            user_lon: user_location.map(|l| l.lon),
            radius_km: self.default_radius_km,
        }
    }

    /// Collapses whitespace and rejects junk shorter than two characters
    fn clean_city(&self, raw: &str) -> Option<String> {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_whitespace() || *c == '-')
            .collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let cleaned = cleaned.trim_matches('-').to_string();

        (cleaned.chars().count() > 1).then_some(cleaned)
    }

    fn extract_insurance(&self, text: &str) -> Option<String> {
        self.tables
            .insurances
            .iter()
            .find(|ins| text.contains(ins.as_str()))
            .cloned()
    }

    fn extract_urgency(&self, text: &str) -> Urgency {
        if contains_any(text, &self.tables.emergency) {
            Urgency::Emergency
        } else if contains_any(text, &self.tables.same_day) {
            Urgency::SameDay
        } else if contains_any(text, &self.tables.weekend) {
            Urgency::Weekend
        } else {
            Urgency::Normal
        }
    }

    fn extract_preferences(&self, text: &str) -> Vec<String> {
        self.tables
            .preferences
            .iter()
            .filter(|p| contains_word(text, p))
            .cloned()
            .collect()
    }
}

impl TextIntentExtractor for RuleBasedExtractor {
    fn extract(&self, query: &str, user_location: Option<UserLocation>) -> SearchIntent {
        let text = query.to_lowercase();

        SearchIntent {
            treatments: self.extract_treatments(&text),
            location: self.extract_location(&text, user_location),
            budget: self.extract_budget(&text),
            quantity: self.extract_quantity(&text),
            insurance: self.extract_insurance(&text),
            urgency: self.extract_urgency(&text),
            preferences: self.extract_preferences(&text),
            original_query: query.to_string(),
        }
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

/// Substring match that refuses to start or end inside a word ("male" in "female")
fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(start, matched)| {
        let end = start + matched.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
