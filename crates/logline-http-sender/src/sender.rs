//! Batch sender for HTTP delivery.

use crate::{HttpSenderError, HttpSenderResult};
use async_trait::async_trait;
use logline::{BoxError, DeliveryOutcome, Sender, SerializedRecord};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde_json::value::{to_raw_value, RawValue};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct HttpSenderConfig {
    /// URL every batch is POSTed to.
    pub endpoint: String,
    /// Bearer token, if the endpoint needs one.
    pub auth_token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for HttpSenderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/logs".to_string(),
            auth_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sender that POSTs batches as JSON arrays.
pub struct HttpSender {
    endpoint: Url,
    auth_token: Option<String>,
    client: Client,
}

impl HttpSender {
    /// Create a sender, validating the endpoint URL.
    pub fn new(config: HttpSenderConfig) -> HttpSenderResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            HttpSenderError::InvalidConfig(format!("endpoint {}: {}", config.endpoint, e))
        })?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint,
            auth_token: config.auth_token,
            client,
        })
    }

    /// The endpoint batches are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSender")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.auth_token.is_some())
            .finish()
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn deliver(&self, batch: &[SerializedRecord]) -> Result<DeliveryOutcome, BoxError> {
        let body = encode_batch(batch)?;

        debug!(
            url = %self.endpoint,
            records = batch.len(),
            bytes = body.len(),
            "Sending batch"
        );

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    url = %self.endpoint,
                    records = batch.len(),
                    error = %e,
                    "Transport failure, deferring batch"
                );
                return Ok(DeliveryOutcome::Deferred);
            }
        };

        let status = response.status();
        let outcome = classify_status(status);
        match outcome {
            DeliveryOutcome::Delivered => {
                info!(records = batch.len(), status = %status, "Batch delivered");
            }
            DeliveryOutcome::Deferred => {
                warn!(records = batch.len(), status = %status, "Endpoint busy, deferring batch");
            }
            DeliveryOutcome::Rejected => {
                let body = response.text().await.unwrap_or_default();
                warn!(
                    records = batch.len(),
                    status = %status,
                    body = %body,
                    "Endpoint rejected batch"
                );
            }
        }

        Ok(outcome)
    }
}

/// Map an HTTP status onto a delivery outcome.
pub fn classify_status(status: StatusCode) -> DeliveryOutcome {
    if status.is_success() {
        DeliveryOutcome::Delivered
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        DeliveryOutcome::Deferred
    } else {
        DeliveryOutcome::Rejected
    }
}

/// Encode a batch as a JSON array of payloads.
///
/// Payloads that already are JSON are embedded as-is; anything else is sent
/// as a JSON string.
pub fn encode_batch(batch: &[SerializedRecord]) -> HttpSenderResult<String> {
    let items = batch
        .iter()
        .map(|record| match RawValue::from_string(record.payload.clone()) {
            Ok(raw) => Ok(raw),
            Err(_) => to_raw_value(&record.payload),
        })
        .collect::<Result<Vec<Box<RawValue>>, _>>()?;

    Ok(serde_json::to_string(&items)?)
}
