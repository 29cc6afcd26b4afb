use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clinic_search::config::{Settings, StoreBackend};
use clinic_search::core::{FilterPipeline, RuleBasedExtractor, SearchEngine};
use clinic_search::models::ScoringWeights;
use clinic_search::routes::{self, AppState};
use clinic_search::services::{ClinicStore, InMemoryStore, PostgresClient, SearchLogSink, SupabaseClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type Backend = (Arc<dyn ClinicStore>, Arc<dyn SearchLogSink>);

fn startup_error(message: String) -> std::io::Error {
    error!("{}", message);
    std::io::Error::other(message)
}

/// Connect the configured clinic store; the same backend receives search logs
async fn connect_backend(settings: &Settings) -> std::io::Result<Backend> {
    match settings.store.backend {
        StoreBackend::Supabase => {
            let supabase = settings
                .supabase
                .as_ref()
                .ok_or_else(|| startup_error("Supabase backend selected but [supabase] is not configured".to_string()))?;
            let timeout = Duration::from_secs(supabase.request_timeout_secs.unwrap_or(10));

            let client = SupabaseClient::new(supabase.url.clone(), supabase.service_key.clone(), timeout)
                .map_err(|e| startup_error(format!("Failed to create Supabase client: {}", e)))?;
            let client = Arc::new(client);

            info!("Supabase client initialized");
            Ok((client.clone(), client))
        }
        StoreBackend::Postgres => {
            let database = settings
                .database
                .as_ref()
                .ok_or_else(|| startup_error("Postgres backend selected but [database] is not configured".to_string()))?;

            let client = PostgresClient::from_settings(
                &database.url,
                database.max_connections,
                database.min_connections,
                database.acquire_timeout_secs,
            )
            .await
            .map_err(|e| startup_error(format!("Failed to connect to PostgreSQL: {}", e)))?;
            let client = Arc::new(client);

            info!("PostgreSQL client initialized (max: {} connections)", database.max_connections.unwrap_or(10));
            Ok((client.clone(), client))
        }
        StoreBackend::Memory => {
            let store = match &settings.store.fixtures_path {
                Some(path) => InMemoryStore::from_json_file(path)
                    .map_err(|e| startup_error(format!("Failed to load fixtures: {}", e)))?,
                None => InMemoryStore::default(),
            };
            let store = Arc::new(store);

            info!("In-memory clinic store initialized");
            Ok((store.clone(), store))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting clinic search service...");

    let settings = Settings::load().map_err(|e| startup_error(format!("Failed to load configuration: {}", e)))?;

    info!("Configuration loaded successfully (store backend: {:?})", settings.store.backend);

    let (store, log_sink) = connect_backend(&settings).await?;

    let keywords = settings.search.keywords.clone();
    let filters = FilterPipeline::new(keywords.state_abbreviations.clone());
    let extractor = RuleBasedExtractor::new(keywords, settings.search.default_radius_km)
        .map_err(|e| startup_error(format!("Invalid keyword tables: {}", e)))?;
    let weights = ScoringWeights::from(&settings.scoring.weights);

    info!("Search engine initialized with weights: {:?}", weights);

    let engine = SearchEngine::new(
        Arc::new(extractor),
        store,
        log_sink,
        filters,
        weights,
        settings.search.options(),
    );

    let app_state = AppState {
        engine: Arc::new(engine),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
