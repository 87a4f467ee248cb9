//! Live HTTP backend.
//!
//! Talks to the mail-parser API (`/api/emails`, `/api/stats`, `/api/parse`)
//! and to each service's health URL. Every request is bounded by the
//! configured timeout; failures are folded into [`GatewayError`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::traits::{EmailPage, Gateway, GatewayError, Result};
use crate::config::{HealthSettings, Settings};
use crate::domain::{
    EmailId, EmailListParams, EmailStats, EmailWithAnalysis, HealthStatus, ParseEmailRequest,
    ParseEmailResponse, ServiceKey,
};

/// Gateway backed by real network calls.
pub struct HttpGateway {
    /// HTTP client carrying the request timeout.
    client: reqwest::Client,
    /// API base without trailing slash.
    base_url: String,
    /// Health endpoint per service.
    health: HealthSettings,
}

impl HttpGateway {
    /// Builds a gateway from startup settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.api.timeout)
            .build()
            .map_err(|e| GatewayError::Network(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.api.base_url.trim_end_matches('/').to_string(),
            health: settings.health.clone(),
        })
    }

    /// Overrides the HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| GatewayError::Network(format!("invalid URL {}: {}", raw, e)))
    }

    /// Builds the list URL. Unset, empty and zero values are left out.
    pub fn list_url(&self, params: &EmailListParams) -> Result<Url> {
        let mut url = self.endpoint("/api/emails")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(account) = params.account.as_deref().filter(|a| !a.is_empty()) {
                query.append_pair("account", account);
            }
            if let Some(limit) = params.limit.filter(|&l| l > 0) {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = params.offset.filter(|&o| o > 0) {
                query.append_pair("offset", &offset.to_string());
            }
            if let Some(search) = params.search_text() {
                query.append_pair("search", search);
            }
            if let Some(category) = params.category.as_deref().filter(|c| !c.is_empty()) {
                query.append_pair("category", category);
            }
            if let Some(sentiment) = params.sentiment.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("sentiment", sentiment);
            }
            if let Some(processed) = params.processed {
                query.append_pair("processed", if processed { "true" } else { "false" });
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        handle_response(response, what).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
        what: &str,
    ) -> Result<T> {
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        handle_response(response, what).await
    }
}

/// Maps a reqwest failure that happened before a status was available.
fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Network(format!("request timed out: {}", e))
    } else if e.is_decode() {
        GatewayError::InvalidResponse(e.to_string())
    } else {
        GatewayError::Network(e.to_string())
    }
}

/// Maps a non-success status. 5xx means the service is unavailable; any
/// other unexpected status means the answer is not what was asked for.
fn status_error(status: StatusCode, body: &str, what: &str) -> GatewayError {
    if status == StatusCode::NOT_FOUND {
        GatewayError::NotFound(what.to_string())
    } else if status.is_server_error() {
        GatewayError::Network(format!("server error ({}): {}", status, body))
    } else {
        GatewayError::InvalidResponse(format!("unexpected status ({}): {}", status, body))
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::InvalidResponse(format!("parse response: {}", e)))
}

async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;

    if !status.is_success() {
        let body = String::from_utf8_lossy(&bytes);
        return Err(status_error(status, &body, what));
    }

    decode_body(&bytes)
}

#[async_trait]
impl Gateway for HttpGateway {
    fn backend(&self) -> &'static str {
        "http"
    }

    async fn fetch_emails(&self, params: &EmailListParams) -> Result<EmailPage> {
        let url = self.list_url(params)?;
        let page: EmailPage = self.get(url, "email list").await?;
        if !page.is_consistent_with(params.effective_offset()) {
            tracing::warn!(
                total = page.total,
                page = page.page,
                limit = page.limit,
                "pagination envelope disagrees with the requested offset"
            );
        }
        Ok(page)
    }

    async fn fetch_email(&self, id: EmailId) -> Result<EmailWithAnalysis> {
        let url = self.endpoint(&format!("/api/emails/{}", id))?;
        self.get(url, &format!("email {}", id)).await
    }

    async fn fetch_stats(&self) -> Result<EmailStats> {
        let url = self.endpoint("/api/stats")?;
        self.get(url, "stats").await
    }

    async fn fetch_health(&self, service: ServiceKey) -> Result<HealthStatus> {
        let raw = self.health.url_for(service);
        let url = Url::parse(raw)
            .map_err(|e| GatewayError::Network(format!("invalid URL {}: {}", raw, e)))?;
        self.get(url, &format!("{} health", service)).await
    }

    async fn parse_email(&self, request: &ParseEmailRequest) -> Result<ParseEmailResponse> {
        let url = self.endpoint("/api/parse")?;
        self.post(url, request, "parse").await
    }
}
