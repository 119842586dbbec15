//! # BI Tool Client
//!
//! The two calls the audit makes against the BI tool's REST API, behind the
//! `CardApi` trait so the pipeline can run against an in-memory fake in tests.
//!
//! - `GET {base_url}/api/card` lists every card. Anything but `200 OK` is a
//!   hard failure; the pipeline never runs on a partial listing.
//! - `PUT {base_url}/api/card/{id}` with `{"archived": true}` archives one card.
//!   The response is handed back untouched: deciding whether the card was
//!   really archived is the executor's job.
//!
//! Requests are made with a blocking client and no timeout, one at a time.
//! Callers run it inside `tokio::task::spawn_blocking`, opening the session
//! there through `Connect`.

use crate::config::MetabaseConfig;
use crate::error::AuditError;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

const API_KEY_HEADER: &str = "X-API-KEY";

/// Raw answer to an archive request.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveResponse {
    pub status: u16,
    pub body: String,
}

/// External collaborator the pipeline reads cards from and archives cards in.
pub trait CardApi {
    /// Lists all cards as opaque JSON objects.
    fn fetch_cards(&self) -> Result<Vec<Value>, AuditError>;

    /// Sends a single archive request for `card_id`. No retry.
    fn archive_card(&self, card_id: i64) -> Result<ArchiveResponse, AuditError>;
}

/// Opens a `CardApi` session. Handlers hold the connector in `web::Data` and
/// call it on the blocking worker, once per run.
pub trait Connect: Send + Sync + 'static {
    type Api: CardApi;

    fn connect(&self) -> Result<Self::Api, AuditError>;
}

impl Connect for MetabaseConfig {
    type Api = MetabaseClient;

    fn connect(&self) -> Result<MetabaseClient, AuditError> {
        MetabaseClient::new(self)
    }
}

/// `CardApi` over HTTP with the static API key installed once per session.
pub struct MetabaseClient {
    http: Client,
    base_url: String,
}

impl MetabaseClient {
    pub fn new(config: &MetabaseConfig) -> Result<Self, AuditError> {
        Self::with_builder(config, Client::builder())
    }

    fn with_builder(config: &MetabaseConfig, builder: ClientBuilder) -> Result<Self, AuditError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| AuditError::Config("API key is not a valid header value".to_string()))?;
        headers.insert(API_KEY_HEADER, api_key);

        let http = builder
            .default_headers(headers)
            .timeout(Option::<Duration>::None)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl CardApi for MetabaseClient {
    fn fetch_cards(&self) -> Result<Vec<Value>, AuditError> {
        let response = self.http.get(format!("{}/api/card", self.base_url)).send()?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            log::error!("Card listing failed: {} - {}", status, body);
            return Err(AuditError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn archive_card(&self, card_id: i64) -> Result<ArchiveResponse, AuditError> {
        let response = self
            .http
            .put(format!("{}/api/card/{}", self.base_url, card_id))
            .json(&json!({ "archived": true }))
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(ArchiveResponse { status, body })
    }
}
