use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandidateQuery, CityInfo, ClinicCandidate, SearchLogEntry, StateInfo, TreatmentPrice};
use crate::services::{ClinicStore, SearchLogSink, StoreError};

/// Errors that can occur when reading clinics directly from PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("Database search failed: {0}")]
    SqlxError(#[from] sqlx::Error),
}

const CANDIDATES_SQL: &str = r#"
    SELECT
        c.id::text AS id,
        c.name,
        c.slug,
        c.address,
        c.rating::float8 AS rating,
        c.review_count::int8 AS review_count,
        c.cover_image_url,
        c.latitude::float8 AS latitude,
        c.longitude::float8 AS longitude,
        ci.name AS city_name,
        ci.slug AS city_slug,
        s.slug AS state_slug,
        s.abbreviation AS state_abbreviation,
        EXISTS (
            SELECT 1 FROM clinic_subscriptions cs
            WHERE cs.clinic_id = c.id
              AND cs.status = 'active'
              AND cs.expires_at > $2
        ) AS is_paid
    FROM clinics c
    LEFT JOIN cities ci ON ci.id = c.city_id
    LEFT JOIN states s ON s.id = ci.state_id
    WHERE c.is_active = true
      AND c.is_duplicate = false
    ORDER BY c.rating DESC NULLS LAST
    LIMIT $1
"#;

const TREATMENTS_SQL: &str = r#"
    SELECT
        ct.clinic_id::text AS clinic_id,
        ct.price_from::float8 AS price_from,
        ct.price_to::float8 AS price_to,
        t.name AS treatment_name
    FROM clinic_treatments ct
    LEFT JOIN treatments t ON t.id = ct.treatment_id
    WHERE ct.clinic_id::text = ANY($1)
"#;

/// PostgreSQL clinic store
///
/// Reads the same tables the REST backend does, but with a single join
/// per request instead of one round trip per table.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from optional pool settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL clinic store");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
        )
        .await
    }

    async fn fetch_treatments(&self, clinic_ids: &[String]) -> Result<HashMap<String, Vec<TreatmentPrice>>, PostgresError> {
        let mut prices: HashMap<String, Vec<TreatmentPrice>> = HashMap::new();
        if clinic_ids.is_empty() {
            return Ok(prices);
        }

        let rows = sqlx::query(TREATMENTS_SQL)
            .bind(clinic_ids)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let clinic_id: String = row.try_get("clinic_id")?;
            prices.entry(clinic_id).or_default().push(TreatmentPrice {
                treatment_name: row.try_get::<Option<String>, _>("treatment_name")?.unwrap_or_default(),
                price_from: row.try_get("price_from")?,
                price_to: row.try_get("price_to")?,
            });
        }

        Ok(prices)
    }
}

fn candidate_from_row(row: &PgRow) -> Result<ClinicCandidate, sqlx::Error> {
    let city_slug: Option<String> = row.try_get("city_slug")?;
    let state_slug: Option<String> = row.try_get("state_slug")?;

    let state = state_slug.map(|slug| -> Result<StateInfo, sqlx::Error> {
        Ok(StateInfo {
            slug,
            abbreviation: row
                .try_get::<Option<String>, _>("state_abbreviation")?
                .unwrap_or_default(),
        })
    });
    let state = state.transpose()?;

    let city = match city_slug {
        Some(slug) => Some(CityInfo {
            name: row.try_get::<Option<String>, _>("city_name")?.unwrap_or_default(),
            slug,
            state,
        }),
        None => None,
    };

    let review_count: Option<i64> = row.try_get("review_count")?;

    Ok(ClinicCandidate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        address: row.try_get::<Option<String>, _>("address")?.unwrap_or_default(),
        cover_image_url: row
            .try_get::<Option<String>, _>("cover_image_url")?
            .unwrap_or_default(),
        rating: row.try_get::<Option<f64>, _>("rating")?.unwrap_or(0.0),
        review_count: review_count.unwrap_or(0).clamp(0, u32::MAX as i64) as u32,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        city,
        is_paid: row.try_get("is_paid")?,
        treatments: Vec::new(),
    })
}

#[async_trait]
impl ClinicStore for PostgresClient {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<ClinicCandidate>, StoreError> {
        let rows = sqlx::query(CANDIDATES_SQL)
            .bind(query.pool_size as i64)
            .bind(query.as_of)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        let mut candidates = rows
            .iter()
            .map(candidate_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PostgresError::from)?;

        if query.include_treatments {
            let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
            let mut prices = self.fetch_treatments(&ids).await?;
            for candidate in &mut candidates {
                candidate.treatments = prices.remove(&candidate.id).unwrap_or_default();
            }
        }

        tracing::debug!("Loaded {} clinics from PostgreSQL", candidates.len());

        Ok(candidates)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl SearchLogSink for PostgresClient {
    async fn record_search(&self, entry: &SearchLogEntry) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO ai_search_logs (
                session_id, visitor_id, original_query, extracted_intent,
                results_shown, results_count, search_duration_ms, fallback_used
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;

        sqlx::query(query)
            .bind(&entry.session_id)
            .bind(&entry.visitor_id)
            .bind(&entry.original_query)
            .bind(Json(&entry.extracted_intent))
            .bind(Json(&entry.results_shown))
            .bind(entry.results_count as i32)
            .bind(entry.search_duration_ms as i64)
            .bind(entry.fallback_used)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(())
    }
}
