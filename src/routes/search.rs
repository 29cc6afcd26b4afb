use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{SearchEngine, SearchError};
use crate::models::{ErrorResponse, HealthResponse, SearchRequest, QUERY_TOO_SHORT};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

/// Configure all search-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/search", web::post().to(search));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.engine.health_check().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Conversational clinic search
///
/// POST /api/v1/search
///
/// Request body:
/// ```json
/// {
///   "query": "dental implants in boston under $3000",
///   "sessionId": "string",
///   "visitorId": "string",
///   "userLocation": { "lat": 42.36, "lon": -71.06 }
/// }
/// ```
async fn search(state: web::Data<AppState>, req: web::Json<SearchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Rejected search request: {}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse::new(QUERY_TOO_SHORT));
    }

    match state.engine.search(&req).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            match &e {
                SearchError::Timeout(_) => tracing::error!("Search timed out for query {:?}", req.query),
                SearchError::Store(_) => tracing::error!("Search failed for query {:?}: {}", req.query, e),
            }
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
    }
}
