use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandidateQuery, CityInfo, ClinicCandidate, SearchLogEntry, StateInfo, TreatmentPrice};
use crate::services::{ClinicStore, SearchLogSink, StoreError};

/// Errors that can occur when talking to the Supabase REST API
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Database search failed: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Identifier that PostgREST may render as a string (uuid) or a number (serial)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawId")]
struct RowId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for RowId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => RowId(s),
            RawId::Number(n) => RowId(n.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClinicRow {
    id: RowId,
    name: String,
    slug: String,
    address: Option<String>,
    rating: Option<f64>,
    review_count: Option<u32>,
    cover_image_url: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city_id: Option<RowId>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionRow {
    clinic_id: RowId,
}

#[derive(Debug, Deserialize)]
struct CityRow {
    id: RowId,
    name: Option<String>,
    slug: Option<String>,
    state_id: Option<RowId>,
}

#[derive(Debug, Deserialize)]
struct StateRow {
    id: RowId,
    slug: Option<String>,
    abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreatmentRef {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClinicTreatmentRow {
    clinic_id: RowId,
    price_from: Option<f64>,
    price_to: Option<f64>,
    treatment: Option<TreatmentRef>,
}

/// Supabase (PostgREST) client
///
/// Reads the clinic, subscription, city, state and treatment tables and
/// writes search analytics to `ai_search_logs`.
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    client: Client,
}

impl SupabaseClient {
    /// Create a new Supabase client
    pub fn new(base_url: String, service_key: String, timeout: Duration) -> Result<Self, SupabaseError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            service_key,
            client,
        })
    }

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        format!(
            "{}/rest/v1/{}?{}",
            self.base_url.trim_end_matches('/'),
            table,
            query
        )
    }

    /// Run a filtered select against one table
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, SupabaseError> {
        let url = self.table_url(table, params);

        tracing::debug!("Selecting from {}", table);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Select from {} failed: {} - {}", table, status, body);
            return Err(SupabaseError::ApiError(format!("{} returned {}", table, status)));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| SupabaseError::InvalidResponse(format!("Failed to parse {} rows: {}", table, e)))
    }

    async fn fetch_clinics(&self, pool_size: usize) -> Result<Vec<ClinicRow>, SupabaseError> {
        self.select(
            "clinics",
            &[
                (
                    "select",
                    "id,name,slug,address,rating,review_count,cover_image_url,latitude,longitude,city_id".to_string(),
                ),
                ("is_active", "eq.true".to_string()),
                ("is_duplicate", "eq.false".to_string()),
                ("order", "rating.desc".to_string()),
                ("limit", pool_size.to_string()),
            ],
        )
        .await
    }

    async fn fetch_paid_ids(
        &self,
        clinic_ids: &[String],
        as_of: chrono::DateTime<chrono::Utc>,
    ) -> Result<HashSet<String>, SupabaseError> {
        if clinic_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<SubscriptionRow> = self
            .select(
                "clinic_subscriptions",
                &[
                    ("select", "clinic_id".to_string()),
                    ("clinic_id", in_list(clinic_ids)),
                    ("status", "eq.active".to_string()),
                    ("expires_at", format!("gt.{}", as_of.to_rfc3339())),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(|r| r.clinic_id.0).collect())
    }

    async fn fetch_cities(&self, city_ids: &[String]) -> Result<Vec<CityRow>, SupabaseError> {
        if city_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select(
            "cities",
            &[
                ("select", "id,name,slug,state_id".to_string()),
                ("id", in_list(city_ids)),
            ],
        )
        .await
    }

    async fn fetch_states(&self, state_ids: &[String]) -> Result<Vec<StateRow>, SupabaseError> {
        if state_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select(
            "states",
            &[
                ("select", "id,slug,abbreviation".to_string()),
                ("id", in_list(state_ids)),
            ],
        )
        .await
    }

    async fn fetch_treatments(&self, clinic_ids: &[String]) -> Result<Vec<ClinicTreatmentRow>, SupabaseError> {
        if clinic_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select(
            "clinic_treatments",
            &[
                ("select", "clinic_id,price_from,price_to,treatment:treatments(name,slug)".to_string()),
                ("clinic_id", in_list(clinic_ids)),
            ],
        )
        .await
    }

    /// Resolve city ids to cities with their states
    async fn resolve_cities(&self, city_ids: &[String]) -> Result<HashMap<String, CityInfo>, SupabaseError> {
        let cities = self.fetch_cities(city_ids).await?;

        let state_ids = unique(cities.iter().filter_map(|c| c.state_id.as_ref().map(|id| id.0.clone())));
        let states: HashMap<String, StateInfo> = self
            .fetch_states(&state_ids)
            .await?
            .into_iter()
            .map(|s| {
                (
                    s.id.0,
                    StateInfo {
                        slug: s.slug.unwrap_or_default(),
                        abbreviation: s.abbreviation.unwrap_or_default(),
                    },
                )
            })
            .collect();

        Ok(cities
            .into_iter()
            .map(|c| {
                let state = c.state_id.and_then(|id| states.get(&id.0).cloned());
                (
                    c.id.0,
                    CityInfo {
                        name: c.name.unwrap_or_default(),
                        slug: c.slug.unwrap_or_default(),
                        state,
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl ClinicStore for SupabaseClient {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<ClinicCandidate>, StoreError> {
        let clinics = self.fetch_clinics(query.pool_size).await?;

        let clinic_ids: Vec<String> = clinics.iter().map(|c| c.id.0.clone()).collect();
        let city_ids = unique(clinics.iter().filter_map(|c| c.city_id.as_ref().map(|id| id.0.clone())));

        // Subscriptions, cities and prices are independent of each other
        let (paid, cities, treatments) = tokio::try_join!(
            self.fetch_paid_ids(&clinic_ids, query.as_of),
            self.resolve_cities(&city_ids),
            async {
                if query.include_treatments {
                    self.fetch_treatments(&clinic_ids).await
                } else {
                    Ok(Vec::new())
                }
            },
        )?;

        let mut prices: HashMap<String, Vec<TreatmentPrice>> = HashMap::new();
        for row in treatments {
            prices.entry(row.clinic_id.0).or_default().push(TreatmentPrice {
                treatment_name: row.treatment.and_then(|t| t.name).unwrap_or_default(),
                price_from: row.price_from,
                price_to: row.price_to,
            });
        }

        tracing::debug!(
            "Loaded {} clinics ({} paid, {} cities, {} priced)",
            clinics.len(),
            paid.len(),
            cities.len(),
            prices.len()
        );

        Ok(clinics
            .into_iter()
            .map(|row| {
                let id = row.id.0;
                ClinicCandidate {
                    is_paid: paid.contains(&id),
                    city: row.city_id.and_then(|city_id| cities.get(&city_id.0).cloned()),
                    treatments: prices.remove(&id).unwrap_or_default(),
                    id,
                    name: row.name,
                    slug: row.slug,
                    address: row.address.unwrap_or_default(),
                    cover_image_url: row.cover_image_url.unwrap_or_default(),
                    rating: row.rating.unwrap_or(0.0),
                    review_count: row.review_count.unwrap_or(0),
                    latitude: row.latitude,
                    longitude: row.longitude,
                }
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        self.select::<serde_json::Value>("clinics", &[("select", "id".to_string()), ("limit", "1".to_string())])
            .await
            .is_ok()
    }
}

#[async_trait]
impl SearchLogSink for SupabaseClient {
    async fn record_search(&self, entry: &SearchLogEntry) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/ai_search_logs", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(&self.service_key)
            .json(entry)
            .send()
            .await
            .map_err(SupabaseError::from)?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Failed to record search: {}",
                response.status()
            ))
            .into());
        }

        Ok(())
    }
}

/// PostgREST `in.(a,b,c)` filter
fn in_list(ids: &[String]) -> String {
    format!("in.({})", ids.join(","))
}

fn unique(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}
