use crate::core::filters::{find_treatment, normalize};
use crate::models::{ClinicCandidate, FilteredCandidate, PriceRange, ScoredResult, ScoringWeights, SearchIntent};

/// Scores closer than this are ordered by rating instead
pub const SCORE_TIE_MARGIN: f64 = 0.1;

/// Rating at which a clinic is called out as highly rated
const HIGHLY_RATED: f64 = 4.5;

/// Calculate a relevance score (0-1) for a clinic
///
/// Scoring formula:
/// score = (
///     base +                          # every surviving clinic
///     rating / 5 * rating_weight +    # 0-5 stars
///     paid_bonus +                    # active subscription
///     treatment_weight * matches      # requested treatments the clinic lists
/// )
pub fn calculate_relevance(
    clinic: &ClinicCandidate,
    intent: &SearchIntent,
    weights: &ScoringWeights,
) -> (f64, Vec<String>) {
    let mut score = weights.base;

    if clinic.rating > 0.0 {
        score += (clinic.rating / 5.0) * weights.rating;
    }

    if clinic.is_paid {
        score += weights.paid;
    }

    let matched = matched_treatments(clinic, intent);
    score += weights.treatment_match * matched.len() as f64;

    (score.min(1.0).max(0.0), matched)
}

/// Clinic treatment names hit by the requested treatments, each row counted once
fn matched_treatments(clinic: &ClinicCandidate, intent: &SearchIntent) -> Vec<String> {
    let mut used = vec![false; clinic.treatments.len()];
    let mut matched = Vec::new();

    for requested in &intent.treatments {
        let target = normalize(requested);
        let hit = clinic
            .treatments
            .iter()
            .enumerate()
            .find(|(i, t)| !used[*i] && normalize(&t.treatment_name).contains(&target));

        if let Some((i, t)) = hit {
            used[i] = true;
            matched.push(t.treatment_name.clone());
        }
    }

    matched
}

/// Human-readable reasons, independent of the numeric score
pub fn build_match_reasons(
    clinic: &ClinicCandidate,
    intent: &SearchIntent,
    matched: &[String],
    distance_km: Option<f64>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if clinic.rating >= HIGHLY_RATED {
        reasons.push(format!("Highly rated ({}★)", clinic.rating));
    }

    if let Some(first) = matched.first() {
        reasons.push(format!("Offers {}", first));
    }

    if let Some(max) = intent.budget.max {
        let row = match intent.primary_treatment() {
            Some(treatment) => find_treatment(clinic, treatment),
            None => clinic.treatments.iter().find(|t| t.has_price()),
        };
        let quantity = intent.quantity.unwrap_or(1) as f64;
        if row.and_then(|r| r.price_from).is_some_and(|from| from * quantity <= max) {
            reasons.push("Within budget".to_string());
        }
    }

    if let Some(distance) = distance_km {
        reasons.push(format!("{:.1} km away", distance));
    }

    if clinic.is_paid {
        reasons.push("Verified practice".to_string());
    }

    reasons
}

/// Displayed price for the first requested treatment
pub fn price_range(clinic: &ClinicCandidate, intent: &SearchIntent) -> Option<PriceRange> {
    let row = find_treatment(clinic, intent.primary_treatment()?)?;
    if !row.has_price() {
        return None;
    }

    let from = row.price_from.unwrap_or(0.0);
    Some(PriceRange {
        from,
        to: row.price_to.or(row.price_from).unwrap_or(0.0),
    })
}

pub fn score_candidate(
    candidate: FilteredCandidate,
    intent: &SearchIntent,
    weights: &ScoringWeights,
) -> ScoredResult {
    let FilteredCandidate { clinic, distance_km } = candidate;
    let (relevance_score, treatments_matched) = calculate_relevance(&clinic, intent, weights);
    let match_reasons = build_match_reasons(&clinic, intent, &treatments_matched, distance_km);
    let price_range = price_range(&clinic, intent);

    let (city_name, state_slug) = match &clinic.city {
        Some(city) => (
            city.name.clone(),
            city.state.as_ref().map(|s| s.slug.clone()).unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    ScoredResult {
        id: clinic.id,
        name: clinic.name,
        slug: clinic.slug,
        address: clinic.address,
        city_name,
        state_slug,
        rating: clinic.rating,
        review_count: clinic.review_count,
        cover_image_url: clinic.cover_image_url,
        is_paid: clinic.is_paid,
        relevance_score,
        match_reasons,
        treatments_matched,
        price_range,
        distance_km,
    }
}

/// Order results for display
///
/// Paid clinics always come first. Within the same paid status a result
/// scoring more than [`SCORE_TIE_MARGIN`] above another precedes it; closer
/// scores are ordered by rating, and full ties keep their input order.
pub fn rank(results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    let (paid, unpaid): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.is_paid);

    let mut ranked = order_by_relevance(paid);
    ranked.extend(order_by_relevance(unpaid));
    ranked
}

/// Repeatedly take the best-rated result among those within the tie margin of
/// the highest remaining score. Pairwise "margin, then rating" comparison is not
/// transitive, so this selection is used instead of a comparator sort.
fn order_by_relevance(mut pool: Vec<ScoredResult>) -> Vec<ScoredResult> {
    let mut ordered = Vec::with_capacity(pool.len());

    while !pool.is_empty() {
        let top = pool
            .iter()
            .map(|r| r.relevance_score)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut pick: Option<usize> = None;
        for (i, r) in pool.iter().enumerate() {
            if top - r.relevance_score > SCORE_TIE_MARGIN {
                continue;
            }
            match pick {
                Some(p) if pool[p].rating >= r.rating => {}
                _ => pick = Some(i),
            }
        }

        ordered.push(pool.remove(pick.unwrap_or(0)));
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetIntent, LocationIntent, TreatmentPrice, Urgency};

    fn create_clinic(rating: f64, is_paid: bool, treatments: &[(&str, Option<f64>, Option<f64>)]) -> ClinicCandidate {
        ClinicCandidate {
            id: "c1".to_string(),
            name: "Smile Studio".to_string(),
            slug: "smile-studio".to_string(),
            address: "1 Main St".to_string(),
            cover_image_url: String::new(),
            rating,
            review_count: 120,
            latitude: None,
            longitude: None,
            city: None,
            is_paid,
            treatments: treatments
                .iter()
                .map(|(name, from, to)| TreatmentPrice {
                    treatment_name: name.to_string(),
                    price_from: *from,
                    price_to: *to,
                })
                .collect(),
        }
    }

    fn create_intent(treatments: &[&str], budget: Option<f64>) -> SearchIntent {
        SearchIntent {
            treatments: treatments.iter().map(|t| t.to_string()).collect(),
            location: LocationIntent {
                state: None,
                city: Some("boston".to_string()),
                near_me: false,
                user_lat: None,
                user_lon: None,
                radius_km: 15.0,
            },
            budget: BudgetIntent {
                max: budget,
                ..BudgetIntent::default()
            },
            quantity: None,
            insurance: None,
            urgency: Urgency::Normal,
            preferences: vec![],
            original_query: String::new(),
        }
    }

    fn result(id: &str, score: f64, rating: f64, is_paid: bool) -> ScoredResult {
        ScoredResult {
            id: id.to_string(),
            name: id.to_string(),
            slug: id.to_string(),
            address: String::new(),
            city_name: String::new(),
            state_slug: String::new(),
            rating,
            review_count: 0,
            cover_image_url: String::new(),
            is_paid,
            relevance_score: score,
            match_reasons: vec![],
            treatments_matched: vec![],
            price_range: None,
            distance_km: None,
        }
    }

    fn ids(results: &[ScoredResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_score_formula() {
        let weights = ScoringWeights::default();
        let clinic = create_clinic(4.0, false, &[]);
        let (score, matched) = calculate_relevance(&clinic, &create_intent(&[], None), &weights);

        assert!((score - 0.7).abs() < 1e-9, "0.5 + 0.8 * 0.25 = 0.7, got {}", score);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_score_clamped() {
        let weights = ScoringWeights::default();
        let clinic = create_clinic(5.0, true, &[("Implants", None, None), ("Crown", None, None)]);
        let (score, matched) = calculate_relevance(&clinic, &create_intent(&["implant", "crown"], None), &weights);

        assert_eq!(score, 1.0);
        assert_eq!(matched, vec!["Implants", "Crown"]);
    }

    #[test]
    fn test_overlapping_keywords_count_once() {
        let weights = ScoringWeights::default();
        let clinic = create_clinic(0.0, false, &[("Teeth Whitening", Some(300.0), None)]);
        let (score, matched) = calculate_relevance(&clinic, &create_intent(&["whitening", "teeth"], None), &weights);

        assert_eq!(matched, vec!["Teeth Whitening"]);
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_match_reasons_order() {
        let clinic = create_clinic(4.8, true, &[("Dental Implants", Some(1200.0), Some(3000.0))]);
        let intent = create_intent(&["implant"], Some(2000.0));
        let matched = vec!["Dental Implants".to_string()];

        let reasons = build_match_reasons(&clinic, &intent, &matched, Some(3.456));
        assert_eq!(
            reasons,
            vec![
                "Highly rated (4.8★)",
                "Offers Dental Implants",
                "Within budget",
                "3.5 km away",
                "Verified practice",
            ]
        );
    }

    #[test]
    fn test_within_budget_reason_needs_price() {
        let clinic = create_clinic(3.0, false, &[("Dental Implants", None, Some(3000.0))]);
        let intent = create_intent(&["implant"], Some(2000.0));

        let reasons = build_match_reasons(&clinic, &intent, &[], None);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_price_range() {
        let intent = create_intent(&["implant"], None);

        let both = create_clinic(4.0, false, &[("Implants", Some(1000.0), Some(2500.0))]);
        assert_eq!(price_range(&both, &intent), Some(PriceRange { from: 1000.0, to: 2500.0 }));

        let from_only = create_clinic(4.0, false, &[("Implants", Some(1000.0), None)]);
        assert_eq!(price_range(&from_only, &intent), Some(PriceRange { from: 1000.0, to: 1000.0 }));

        let none = create_clinic(4.0, false, &[("Implants", None, None)]);
        assert_eq!(price_range(&none, &intent), None);
    }

    #[test]
    fn test_paid_always_first() {
        let ranked = rank(vec![
            result("free-high", 0.95, 5.0, false),
            result("paid-low", 0.6, 1.0, true),
        ]);
        assert_eq!(ids(&ranked), vec!["paid-low", "free-high"]);
    }

    #[test]
    fn test_score_margin_then_rating() {
        let ranked = rank(vec![
            result("a", 0.70, 4.9, false),
            result("b", 0.85, 3.0, false),
            result("c", 0.78, 4.0, false),
        ]);
        // b leads by > 0.1 over a; b and c are within the margin and c is better rated
        assert_eq!(ids(&ranked), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input = vec![
            result("x", 0.8, 4.0, false),
            result("y", 0.8, 4.0, false),
            result("z", 0.8, 4.0, false),
        ];
        let once = rank(input.clone());
        let twice = rank(once.clone());

        assert_eq!(ids(&once), vec!["x", "y", "z"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_margin_invariant_holds_with_cycles() {
        // a > c by score, c > b by rating, b > a by rating
        let ranked = rank(vec![
            result("a", 0.90, 1.0, false),
            result("b", 0.84, 2.0, false),
            result("c", 0.78, 3.0, false),
        ]);

        for (i, earlier) in ranked.iter().enumerate() {
            for later in &ranked[i + 1..] {
                assert!(later.relevance_score - earlier.relevance_score <= SCORE_TIE_MARGIN);
            }
        }
    }

    #[test]
    fn test_score_candidate_fields() {
        let clinic = create_clinic(4.6, false, &[("Root Canal", Some(800.0), Some(1200.0))]);
        let intent = create_intent(&["root canal"], Some(1000.0));
        let result = score_candidate(
            FilteredCandidate { clinic, distance_km: Some(2.0) },
            &intent,
            &ScoringWeights::default(),
        );

        assert_eq!(result.treatments_matched, vec!["Root Canal"]);
        assert_eq!(result.price_range, Some(PriceRange { from: 800.0, to: 1200.0 }));
        assert_eq!(result.distance_km, Some(2.0));
        assert!(result.relevance_score <= 1.0);
        assert_eq!(result.city_name, "");
    }
}
