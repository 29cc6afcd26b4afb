use std::collections::HashMap;

use crate::core::distance::haversine_distance;
use crate::models::{ClinicCandidate, FilteredCandidate, SearchIntent, TreatmentPrice};

/// Lowercase and strip whitespace, hyphens and underscores
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Check a clinic against the normalized city and state of the intent
///
/// This is Stage 1 of the filter pipeline. Clinics without a resolved city
/// never pass once a location constraint is active.
#[inline]
pub fn matches_location(
    clinic: &ClinicCandidate,
    intent_city: &str,
    intent_state: &str,
    state_abbreviations: &HashMap<String, String>,
) -> bool {
    let Some(city) = &clinic.city else {
        return false;
    };

    if !intent_city.is_empty() {
        let city_slug = normalize(&city.slug);
        let city_name = normalize(&city.name);
        let city_matches = city_slug == intent_city
            || city_name == intent_city
            || (!city_slug.is_empty() && (city_slug.contains(intent_city) || intent_city.contains(&city_slug)));
        if !city_matches {
            return false;
        }
    }

    if !intent_state.is_empty() {
        let wanted = state_abbreviations
            .get(intent_state)
            .map(String::as_str)
            .unwrap_or(intent_state);
        let state_matches = city.state.as_ref().is_some_and(|state| {
            normalize(&state.slug) == wanted || normalize(&state.abbreviation) == wanted
        });
        if !state_matches {
            return false;
        }
    }

    true
}

/// Distance from the caller when the clinic lies within the radius
///
/// This is Stage 2. Clinics without coordinates are rejected.
#[inline]
pub fn distance_within_radius(
    clinic: &ClinicCandidate,
    user_lat: f64,
    user_lon: f64,
    radius_km: f64,
) -> Option<f64> {
    let (lat, lon) = clinic.coordinates()?;
    let distance = haversine_distance(user_lat, user_lon, lat, lon);
    (distance <= radius_km).then_some(distance)
}

/// Price row for a requested treatment, matched by substring in either direction
pub fn find_treatment<'a>(clinic: &'a ClinicCandidate, treatment: &str) -> Option<&'a TreatmentPrice> {
    let target = normalize(treatment);
    clinic.treatments.iter().find(|t| {
        let name = normalize(&t.treatment_name);
        !name.is_empty() && (name.contains(&target) || target.contains(&name))
    })
}

/// Check whether the clinic can perform the first requested treatment within budget
///
/// This is Stage 3. Missing pricing is not grounds for exclusion: a clinic
/// with no matching treatment row, or a row without prices, is kept.
#[inline]
pub fn within_budget(clinic: &ClinicCandidate, intent: &SearchIntent) -> bool {
    let (Some(max), Some(treatment)) = (intent.budget.max, intent.primary_treatment()) else {
        return true;
    };

    match find_treatment(clinic, treatment) {
        Some(row) if row.has_price() => {
            let quantity = intent.quantity.unwrap_or(1) as f64;
            row.price_from.unwrap_or(0.0) * quantity <= max
        }
        _ => true,
    }
}

/// Location, proximity and budget filters applied in that fixed order
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    state_abbreviations: HashMap<String, String>,
}

impl FilterPipeline {
    pub fn new(state_abbreviations: HashMap<String, String>) -> Self {
        Self { state_abbreviations }
    }

    /// Narrow the candidate pool; every stage only removes candidates
    pub fn apply(&self, intent: &SearchIntent, candidates: Vec<ClinicCandidate>) -> Vec<FilteredCandidate> {
        let intent_city = normalize(intent.location.city.as_deref().unwrap_or(""));
        let intent_state = normalize(intent.location.state.as_deref().unwrap_or(""));
        let location_active = !intent_city.is_empty() || !intent_state.is_empty();

        let proximity = if intent.location.near_me {
            intent.location.user_coordinates()
        } else {
            None
        };
        let budget_active = intent.budget.max.is_some() && intent.has_service();

        candidates
            .into_iter()
            // Stage 1: city / state
            .filter(|clinic| {
                !location_active
                    || matches_location(clinic, &intent_city, &intent_state, &self.state_abbreviations)
            })
            // Stage 2: radius around the caller
            .filter_map(|clinic| match proximity {
                Some((lat, lon)) => distance_within_radius(&clinic, lat, lon, intent.location.radius_km)
                    .map(|d| FilteredCandidate { clinic, distance_km: Some(d) }),
                None => Some(FilteredCandidate { clinic, distance_km: None }),
            })
            // Stage 3: price of the first requested treatment
            .filter(|candidate| !budget_active || within_budget(&candidate.clinic, intent))
            .collect()
    }
}
