// HTTP API tests for Clinic Search

use actix_web::{http::StatusCode, test, web, App};
use clinic_search::core::{FilterPipeline, KeywordTables, RuleBasedExtractor, SearchEngine, SearchOptions};
use clinic_search::models::{CityInfo, ClinicCandidate, ScoringWeights, StateInfo, TreatmentPrice};
use clinic_search::routes::{self, AppState};
use clinic_search::services::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn create_clinic(id: &str, rating: f64, implant_price: f64) -> ClinicCandidate {
    ClinicCandidate {
        id: id.to_string(),
        name: format!("Clinic {}", id),
        slug: format!("clinic-{}", id),
        address: String::new(),
        cover_image_url: String::new(),
        rating,
        review_count: 12,
        latitude: Some(42.35),
        longitude: Some(-71.06),
        city: Some(CityInfo {
            name: "Boston".to_string(),
            slug: "boston".to_string(),
            state: Some(StateInfo {
                slug: "massachusetts".to_string(),
                abbreviation: "MA".to_string(),
            }),
        }),
        is_paid: false,
        treatments: vec![TreatmentPrice {
            treatment_name: "Dental Implant".to_string(),
            price_from: Some(implant_price),
            price_to: None,
        }],
    }
}

fn create_state(store: Arc<InMemoryStore>) -> AppState {
    let keywords = KeywordTables::default();
    let filters = FilterPipeline::new(keywords.state_abbreviations.clone());
    let extractor = RuleBasedExtractor::new(keywords, 15.0).unwrap();

    AppState {
        engine: Arc::new(SearchEngine::new(
            Arc::new(extractor),
            store.clone(),
            store,
            filters,
            ScoringWeights::default(),
            SearchOptions::default(),
        )),
    }
}

macro_rules! init_app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(create_state($store)))
                .app_data(routes::json_config())
                .configure(routes::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_search_returns_camel_case_response() {
    let store = Arc::new(InMemoryStore::new(vec![create_clinic("1", 4.8, 2000.0), create_clinic("2", 4.1, 5000.0)]));
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({ "query": "implants in boston under $3000", "sessionId": "abc" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["fallbackUsed"], true);
    assert_eq!(body["needsMoreInfo"], false);
    assert_eq!(body["conversationStep"], "expand_budget");
    assert_eq!(body["intent"]["budget"]["max"], 3000.0);
    assert_eq!(body["intent"]["location"]["city"], "boston");
    assert_eq!(body["results"][0]["id"], "1");
    assert_eq!(body["results"][0]["city_name"], "Boston");
    assert!(body["searchDurationMs"].is_u64());
}

#[actix_web::test]
async fn test_short_query_rejected_without_processing() {
    let store = Arc::new(InMemoryStore::new(vec![create_clinic("1", 4.8, 2000.0)]));
    let app = init_app!(store.clone());

    for query in ["", "ab", "   ab   "] {
        let req = test::TestRequest::post()
            .uri("/api/v1/search")
            .set_json(json!({ "query": query }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Query must be at least 3 characters" }));
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({ "sessionId": "no-query" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.load_calls(), 0);
    assert!(store.recorded_logs().await.is_empty());
}

#[actix_web::test]
async fn test_malformed_json() {
    let app = init_app!(Arc::new(InMemoryStore::default()));

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"query\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON"));
}

#[actix_web::test]
async fn test_non_string_query_rejected() {
    let store = Arc::new(InMemoryStore::new(vec![create_clinic("1", 4.8, 2000.0)]));
    let app = init_app!(store.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({ "query": 42 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Query must be at least 3 characters" }));
    assert_eq!(store.load_calls(), 0);
}

#[actix_web::test]
async fn test_clarification_response() {
    let store = Arc::new(InMemoryStore::new(vec![create_clinic("1", 4.8, 2000.0)]));
    let app = init_app!(store.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({ "query": "under $2000" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["conversationStep"], "ask_service");
    assert_eq!(body["missingInfo"], json!(["service", "location"]));
    assert_eq!(body["needsMoreInfo"], true);
    assert_eq!(body["results"], json!([]));
    assert!(body["followUpQuestion"].as_str().unwrap().starts_with("What dental service"));
    assert_eq!(store.load_calls(), 0);
}

#[actix_web::test]
async fn test_complete_search_omits_conversation_step() {
    let clinics = (0..6).map(|i| create_clinic(&i.to_string(), 4.0, 100.0)).collect();
    let app = init_app!(Arc::new(InMemoryStore::new(clinics)));

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({ "query": "implant in boston" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["totalCount"], 6);
    assert!(body.get("conversationStep").is_none());
    assert!(body.get("followUpQuestion").is_none());
    assert_eq!(body["missingInfo"], json!([]));
}

#[actix_web::test]
async fn test_store_failure_is_500() {
    let store = Arc::new(InMemoryStore::default().with_load_failure("relation \"clinics\" does not exist"));
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({ "query": "cleaning in boston" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("does not exist"));
}

#[actix_web::test]
async fn test_health() {
    let app = init_app!(Arc::new(InMemoryStore::default()));
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");

    let app = init_app!(Arc::new(InMemoryStore::default().with_load_failure("down")));
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "degraded");
}
