//! In-memory fixture backend.
//!
//! Answers the same contract as [`HttpGateway`](super::HttpGateway) from a
//! fixed record set, with the same filtering and pagination rules and an
//! artificial latency. Used for development and for deterministic tests.

use std::collections::HashSet;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::traits::{EmailPage, Gateway, GatewayError, Result};
use crate::domain::{
    category, sentiment, Email, EmailAnalysis, EmailId, EmailListParams, EmailStats,
    EmailWithAnalysis, HealthStatus, PaginatedResponse, ParseEmailRequest, ParseEmailResponse,
    Provider, ServiceKey,
};

/// Simulated latency of list queries.
pub const LIST_LATENCY: Duration = Duration::from_millis(500);
/// Simulated latency of single-record and auxiliary calls.
pub const ITEM_LATENCY: Duration = Duration::from_millis(300);

/// 2024-09-15T00:00:00Z.
const FIXTURE_DAY: u64 = 1_726_358_400;

/// Gateway serving a deterministic in-memory dataset.
pub struct FixtureGateway {
    records: Vec<EmailWithAnalysis>,
    stats: EmailStats,
    list_latency: Duration,
    item_latency: Duration,
    unreachable: HashSet<ServiceKey>,
}

impl Default for FixtureGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureGateway {
    /// Creates the standard three-record dataset with realistic latency.
    pub fn new() -> Self {
        Self {
            records: sample_records(),
            stats: EmailStats {
                total: 127,
                analyzed: 98,
                processed: 127,
            },
            list_latency: LIST_LATENCY,
            item_latency: ITEM_LATENCY,
            unreachable: HashSet::new(),
        }
    }

    /// Overrides both simulated latencies.
    pub fn with_latency(mut self, list: Duration, item: Duration) -> Self {
        self.list_latency = list;
        self.item_latency = item;
        self
    }

    /// Removes all simulated latency.
    pub fn instant(self) -> Self {
        self.with_latency(Duration::ZERO, Duration::ZERO)
    }

    /// Replaces the record set.
    pub fn with_records(mut self, records: Vec<EmailWithAnalysis>) -> Self {
        self.records = records;
        self
    }

    /// Replaces the stats snapshot.
    pub fn with_stats(mut self, stats: EmailStats) -> Self {
        self.stats = stats;
        self
    }

    /// Makes health checks of `service` fail as if it were down.
    pub fn with_unreachable(mut self, service: ServiceKey) -> Self {
        self.unreachable.insert(service);
        self
    }

    /// The record set served by this gateway.
    pub fn records(&self) -> &[EmailWithAnalysis] {
        &self.records
    }

    async fn delay(duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[async_trait]
impl Gateway for FixtureGateway {
    fn backend(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_emails(&self, params: &EmailListParams) -> Result<EmailPage> {
        Self::delay(self.list_latency).await;

        let matching: Vec<EmailWithAnalysis> = self
            .records
            .iter()
            .filter(|record| params.matches(record))
            .cloned()
            .collect();

        Ok(PaginatedResponse::from_window(
            matching,
            params.effective_offset(),
            params.effective_limit(),
        ))
    }

    async fn fetch_email(&self, id: EmailId) -> Result<EmailWithAnalysis> {
        Self::delay(self.item_latency).await;

        self.records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("email {}", id)))
    }

    async fn fetch_stats(&self) -> Result<EmailStats> {
        Self::delay(self.item_latency).await;
        Ok(self.stats)
    }

    async fn fetch_health(&self, service: ServiceKey) -> Result<HealthStatus> {
        Self::delay(self.item_latency).await;

        if self.unreachable.contains(&service) {
            return Err(GatewayError::Network(format!(
                "{} unreachable: connection refused",
                service
            )));
        }
        Ok(HealthStatus::healthy(service))
    }

    async fn parse_email(&self, request: &ParseEmailRequest) -> Result<ParseEmailResponse> {
        Self::delay(self.item_latency).await;

        if request.raw_email.trim().is_empty() {
            return Err(GatewayError::InvalidResponse("empty raw_email".to_string()));
        }

        let header = |name: &str| header_value(&request.raw_email, name);
        Ok(ParseEmailResponse {
            id: EmailId(Utc::now().timestamp_millis()),
            from_addr: header("From").unwrap_or_else(|| "test@example.com".to_string()),
            to_addr: header("To").unwrap_or_else(|| "user@example.com".to_string()),
            subject: header("Subject").unwrap_or_else(|| "Email de test".to_string()),
            category: Some(category::GENERAL.to_string()),
            sentiment: Some(sentiment::NEUTRE.to_string()),
            summary: Some("Ceci est un email de test".to_string()),
            processed: true,
            status: "success".to_string(),
        })
    }
}

/// Value of the first `name:` header line before the blank line.
fn header_value(raw: &str, name: &str) -> Option<String> {
    raw.lines()
        .take_while(|line| !line.trim().is_empty())
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
}

fn at(hour: u64, minute: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH + Duration::from_secs(FIXTURE_DAY + hour * 3600 + minute * 60))
}

struct Sample {
    id: i64,
    provider: Provider,
    external_id: &'static str,
    from_addr: &'static str,
    subject: &'static str,
    hour: u64,
    minute: u64,
    body: &'static str,
    summary: &'static str,
    category: &'static str,
    sentiment: &'static str,
    score: f64,
}

impl Sample {
    fn build(self) -> EmailWithAnalysis {
        let processed_at = at(self.hour, self.minute + 2);
        EmailWithAnalysis {
            email: Email {
                id: EmailId(self.id),
                provider: self.provider,
                external_id: Some(self.external_id.to_string()),
                from_addr: self.from_addr.to_string(),
                to_addr: "gestionimmobiliermj@gmail.com".to_string(),
                cc_addr: None,
                subject: self.subject.to_string(),
                sent_at: at(self.hour, self.minute),
                received_at: at(self.hour, self.minute + 1),
                raw_headers: None,
                raw_body: self.body.to_string(),
                mailbox: "INBOX".to_string(),
                processed: true,
                processed_at: Some(processed_at),
                error: None,
            },
            analysis: Some(EmailAnalysis {
                id: self.id,
                email_id: EmailId(self.id),
                summary: Some(self.summary.to_string()),
                category: Some(self.category.to_string()),
                sentiment: Some(self.sentiment.to_string()),
                score: Some(self.score),
                created_at: processed_at,
            }),
            attachments: Vec::new(),
        }
    }
}

/// The standard dataset: an invoice, an urgent support request and a
/// commercial proposal.
pub fn sample_records() -> Vec<EmailWithAnalysis> {
    vec![
        Sample {
            id: 1,
            provider: Provider::Gmail,
            external_id: "gmail_001",
            from_addr: "facturation@acme.com",
            subject: "Facture #2024-001 - Votre commande du 15 septembre",
            hour: 14,
            minute: 30,
            body: "Bonjour,\n\nVeuillez trouver ci-joint votre facture...",
            summary: "Facture mensuelle pour services",
            category: category::FACTURE,
            sentiment: sentiment::NEUTRE,
            score: 0.8,
        }
        .build(),
        Sample {
            id: 2,
            provider: Provider::Gmail,
            external_id: "gmail_002",
            from_addr: "support@servicetech.fr",
            subject: "Urgent: Problème avec votre installation",
            hour: 16,
            minute: 45,
            body: "Nous avons détecté un problème urgent...",
            summary: "Problème technique urgent nécessitant une intervention",
            category: category::SUPPORT,
            sentiment: sentiment::NEGATIF,
            score: 0.9,
        }
        .build(),
        Sample {
            id: 3,
            provider: Provider::Outlook,
            external_id: "outlook_001",
            from_addr: "commercial@newbusiness.com",
            subject: "Proposition de partenariat commercial",
            hour: 10,
            minute: 15,
            body: "Bonjour,\n\nNous aimerions vous proposer...",
            summary: "Proposition de collaboration commerciale",
            category: category::COMMERCIAL,
            sentiment: sentiment::POSITIF,
            score: 0.7,
        }
        .build(),
    ]
}
