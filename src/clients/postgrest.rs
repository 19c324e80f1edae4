use crate::config::BackendConfig;
use crate::constants::records::SELECT_COLUMNS;
use crate::keys::KeyHash;
use crate::models::{Record, RecordId};
use crate::store::{BackendError, RecordBackend};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    pub base_url: String,

    pub api_key: String,

    pub table: String,

    pub timeout: Duration,
}

impl From<&BackendConfig> for PostgrestConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            timeout: config.request_timeout(),
        }
    }
}

/// Table access over a PostgREST endpoint (Supabase's `/rest/v1`).
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    client: Client,
    config: PostgrestConfig,
}

impl PostgrestClient {
    pub fn new(config: PostgrestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("qrsync/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(PostgrestConfig::from(config))
    }

    fn table_url(&self) -> Result<Url, BackendError> {
        let base = self.config.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(BackendError::Config("backend URL is not set".to_string()));
        }

        Url::parse(&format!("{base}/rest/v1/{}", self.config.table))
            .map_err(|e| BackendError::Config(format!("invalid backend URL '{base}': {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "PostgREST request rejected");
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn select_one(&self, url: Url) -> Result<Option<Record>, BackendError> {
        let response = self.send(self.request(Method::GET, url)).await?;
        let rows: Vec<Record> = response.json().await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl RecordBackend for PostgrestClient {
    async fn insert(&self, record: &Record) -> Result<(), BackendError> {
        let url = self.table_url()?;

        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "return=minimal")
                .json(record),
        )
        .await?;

        Ok(())
    }

    async fn latest_by_key(&self, key_hash: &KeyHash) -> Result<Option<Record>, BackendError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", SELECT_COLUMNS)
            .append_pair("pin_hash", &format!("eq.{key_hash}"))
            .append_pair("order", "expires_at.desc")
            .append_pair("limit", "1");

        self.select_one(url).await
    }

    async fn find(
        &self,
        id: &RecordId,
        key_hash: &KeyHash,
    ) -> Result<Option<Record>, BackendError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", SELECT_COLUMNS)
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("pin_hash", &format!("eq.{key_hash}"))
            .append_pair("limit", "1");

        self.select_one(url).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        self.send(
            self.request(Method::DELETE, url)
                .header("Prefer", "return=minimal"),
        )
        .await?;

        Ok(())
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, BackendError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair(
                "expires_at",
                &format!("lt.{}", cutoff.to_rfc3339_opts(SecondsFormat::Millis, true)),
            )
            .append_pair("select", "id");

        let response = self
            .send(
                self.request(Method::DELETE, url)
                    .header("Prefer", "return=representation"),
            )
            .await?;

        let deleted: Vec<serde_json::Value> = response.json().await?;
        Ok(deleted.len() as u64)
    }

    async fn probe(&self) -> Result<(), BackendError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");

        let response = self.send(self.request(Method::GET, url)).await?;
        let _: Vec<serde_json::Value> = response.json().await?;
        Ok(())
    }
}
