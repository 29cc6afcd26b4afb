use crate::models::{ConversationState, ConversationStep, MissingInfo, SearchIntent};

/// Result counts below this, with a budget in play, suggest widening the budget
const FEW_RESULTS: usize = 5;

/// Information the query is missing, service before location
pub fn missing_info(intent: &SearchIntent) -> Vec<MissingInfo> {
    let mut missing = Vec::new();

    if intent.budget.max.is_some() && !intent.has_service() {
        missing.push(MissingInfo::Service);
    }
    if !intent.location.is_specified() {
        missing.push(MissingInfo::Location);
    }

    missing
}

/// Decide whether the query must be answered with a question before any
/// clinic is loaded
///
/// A budget alone asks for the service; a service without any location
/// (and without caller coordinates) asks for the location.
pub fn preflight(intent: &SearchIntent) -> Option<ConversationState> {
    let has_service = intent.has_service();
    let has_location = intent.location.is_specified();
    let has_budget_only = intent.budget.max.is_some() && !has_service && !has_location;

    if has_budget_only {
        return Some(ConversationState {
            missing_info: vec![MissingInfo::Service, MissingInfo::Location],
            follow_up_question: Some(
                "What dental service are you looking for? (e.g., cleaning, implants, whitening, braces)"
                    .to_string(),
            ),
            conversation_step: ConversationStep::AskService,
        });
    }

    if has_service && !has_location && intent.location.user_lat.is_none() {
        let service = intent.primary_treatment().unwrap_or("this service");
        return Some(ConversationState {
            missing_info: vec![MissingInfo::Location],
            follow_up_question: Some(format!(
                "Great! Where are you looking for {}? (e.g., Los Angeles, Boston, or \"near me\")",
                service
            )),
            conversation_step: ConversationStep::AskLocation,
        });
    }

    None
}

/// Pick the follow-up once the pipeline has run
pub fn resolve(intent: &SearchIntent, total_count: usize) -> ConversationState {
    let missing = missing_info(intent);

    let (step, question) = if total_count == 0 && missing.contains(&MissingInfo::Service) {
        (
            ConversationStep::AskService,
            Some("What specific service are you looking for? (e.g., cleaning, implants, whitening)".to_string()),
        )
    } else if total_count == 0 && missing.contains(&MissingInfo::Location) {
        let service = intent.primary_treatment().unwrap_or("dental care");
        (
            ConversationStep::AskLocation,
            Some(format!("Which city would you like to find {} in?", service)),
        )
    } else if total_count == 0 {
        let budget = intent
            .budget
            .max
            .map(format_amount)
            .unwrap_or_else(|| "?".to_string());
        (
            ConversationStep::NoResults,
            Some(format!(
                "No dentists found for \"{}\" within ${} in {}. Try a higher budget or different location.",
                intent.primary_treatment().unwrap_or("your search"),
                budget,
                intent.location.city.as_deref().unwrap_or("your area"),
            )),
        )
    } else if total_count < FEW_RESULTS && intent.budget.max.is_some() {
        (
            ConversationStep::ExpandBudget,
            Some(format!(
                "Found {} matches. Want to see more options at a higher budget?",
                total_count
            )),
        )
    } else {
        (ConversationStep::None, None)
    };

    ConversationState {
        missing_info: missing,
        follow_up_question: question,
        conversation_step: step,
    }
}

/// Short hints for refining the query
pub fn generate_suggestions(intent: &SearchIntent, total_count: usize, limit: usize) -> Vec<String> {
    let mut suggestions = Vec::new();

    if total_count == 0 {
        if let Some(max) = intent.budget.max {
            suggestions.push(format!("Try increasing budget to ${}", format_amount(max * 1.5)));
        }
    }

    if intent.location.city.is_none() && !intent.location.near_me {
        suggestions.push("Try adding a city name for better results".to_string());
    }

    if !intent.has_service() {
        suggestions.push("Specify a service like 'cleaning' or 'whitening'".to_string());
    }

    suggestions.truncate(limit);
    suggestions
}

/// Whole amounts print without a fractional part
fn format_amount(amount: f64) -> String {
    format!("{}", amount)
}
