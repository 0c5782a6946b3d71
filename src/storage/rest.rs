//! Hosted schedule store reached over a PostgREST-style HTTP API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{RaceStore, StoreResult};
use crate::config::StoreConfig;
use crate::error::{RunError, StoreError};
use crate::types::{NormalizedRunnerUpdate, PersistedRace, RunnerRecord};

const RACE_COLUMNS: &str = "race_id,track_name,race_number,race_date,purse";
const RUNNER_COLUMNS: &str = "runner_id,horse_name,post_position";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the hosted schedule tables
pub struct RestStore {
    client: Client,
    base_url: String,
    races_table: String,
    runners_table: String,
}

impl RestStore {
    /// Build a client from configuration. Missing credentials are fatal.
    pub fn from_config(config: &StoreConfig) -> Result<Self, RunError> {
        let (url, key) = config.rest_credentials()?;

        let mut headers = HeaderMap::new();
        let key_header = HeaderValue::from_str(key)
            .map_err(|_| RunError::MissingConfig("store.service_key (invalid header value)"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| RunError::MissingConfig("store.service_key (invalid header value)"))?;
        headers.insert("apikey", key_header);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(StoreError::from)?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            races_table: config.races_table.clone(),
            runners_table: config.runners_table.clone(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    async fn send(request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn select<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<Vec<T>> {
        Ok(Self::send(request).await?.json().await?)
    }

    async fn patch(&self, table: &str, key: (&str, &str), body: &serde_json::Value) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.table(table))
            .query(&[(key.0, format!("eq.{}", key.1))])
            .header("Prefer", "return=minimal")
            .json(body);
        Self::send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl RaceStore for RestStore {
    async fn find_race_exact(
        &self,
        track_name: &str,
        race_number: u32,
        race_date: &str,
    ) -> StoreResult<Option<PersistedRace>> {
        let request = self.client.get(self.table(&self.races_table)).query(&[
            ("select", RACE_COLUMNS.to_string()),
            ("track_name", format!("eq.{}", track_name)),
            ("race_number", format!("eq.{}", race_number)),
            ("race_date", format!("eq.{}", race_date)),
            ("limit", "1".to_string()),
        ]);
        let races: Vec<PersistedRace> = self.select(request).await?;
        Ok(races.into_iter().next())
    }

    async fn find_races_fuzzy(
        &self,
        token: &str,
        race_number: u32,
        race_date: &str,
    ) -> StoreResult<Vec<PersistedRace>> {
        let request = self.client.get(self.table(&self.races_table)).query(&[
            ("select", RACE_COLUMNS.to_string()),
            ("track_name", format!("ilike.*{}*", token)),
            ("race_number", format!("eq.{}", race_number)),
            ("race_date", format!("eq.{}", race_date)),
        ]);
        self.select(request).await
    }

    async fn update_minutes_to_post(&self, race_id: &str, minutes: u32) -> StoreResult<()> {
        self.patch(
            &self.races_table,
            ("race_id", race_id),
            &serde_json::json!({ "mtp": minutes }),
        )
        .await
    }

    async fn find_runners(
        &self,
        race_id: &str,
        post_position: u32,
    ) -> StoreResult<Vec<RunnerRecord>> {
        let request = self.client.get(self.table(&self.runners_table)).query(&[
            ("select", RUNNER_COLUMNS.to_string()),
            ("race_id", format!("eq.{}", race_id)),
            ("post_position", format!("eq.{}", post_position)),
        ]);
        self.select(request).await
    }

    async fn update_runner(
        &self,
        runner_id: &str,
        update: &NormalizedRunnerUpdate,
    ) -> StoreResult<()> {
        let body = serde_json::to_value(update).unwrap_or_default();
        debug!(runner_id, %body, "patching runner");
        self.patch(&self.runners_table, ("runner_id", runner_id), &body)
            .await
    }
}
