// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::buffer::EventBuffer;
use crate::config::ShipperConfig;
use crate::error::ShipperError;
use crate::http::get_client;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Counters describing the outcome of one transmission pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Requests that got a response.
    pub attempted: usize,
    pub delivered: usize,
    /// Records refused with a 4xx and purged.
    pub rejected: usize,
    /// Records still buffered once the pass ended.
    pub retained: usize,
    /// Whether the pass stopped early on a transport error.
    pub aborted: bool,
}

#[async_trait]
pub trait Transmit: Send + Sync {
    /// Walks the buffer once, shipping and removing records. Records the pass
    /// could not deliver must be left in place for the next one.
    async fn transmit(&self, buffer: &EventBuffer) -> PassSummary;
}

/// What to do with a record given the intake's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    /// 4xx: the intake will never accept this record.
    Rejected(StatusCode),
    /// 5xx: keep the record for the next pass.
    Retry(StatusCode),
}

#[must_use]
pub fn classify(status: StatusCode) -> Outcome {
    if status.is_client_error() {
        Outcome::Rejected(status)
    } else if status.is_server_error() {
        Outcome::Retry(status)
    } else {
        Outcome::Delivered
    }
}

/// Ships records one request each to the Datadog HTTP log intake.
#[derive(Debug, Clone)]
pub struct HttpTransmitter {
    client: reqwest::Client,
    endpoint: String,
    // Endpoint without the API key, for diagnostics.
    display_endpoint: String,
    timeout: Duration,
}

impl HttpTransmitter {
    pub fn new(config: &ShipperConfig) -> Result<Self, ShipperError> {
        Ok(Self {
            client: get_client(config)?,
            endpoint: config.intake_endpoint(),
            display_endpoint: config.intake_base(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl Transmit for HttpTransmitter {
    async fn transmit(&self, buffer: &EventBuffer) -> PassSummary {
        let mut summary = PassSummary::default();
        // Records appended from here on belong to the next pass.
        let len = buffer.size();

        for index in 0..len {
            let Some(record) = buffer.get(index) else {
                continue;
            };

            let resp = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
                .body(record)
                .send()
                .await;

            let resp = match resp {
                Ok(resp) => resp,
                Err(e) => {
                    error!(
                        "LOGS | Failed to post log to {}: {}",
                        self.display_endpoint, e
                    );
                    summary.aborted = true;
                    break;
                }
            };

            summary.attempted += 1;
            match classify(resp.status()) {
                Outcome::Delivered => {
                    debug!("LOGS | Log posted successfully");
                    buffer.delete(index);
                    summary.delivered += 1;
                }
                Outcome::Rejected(status) => {
                    error!(
                        "LOGS | Client error: log ingestion URL: {}; status code: {}; message: {:?}. Log dropped",
                        self.display_endpoint,
                        status.as_u16(),
                        resp.text().await.unwrap_or_default()
                    );
                    buffer.delete(index);
                    summary.rejected += 1;
                }
                Outcome::Retry(status) => {
                    warn!(
                        "LOGS | Intake error: log ingestion URL: {}; status code: {}; message: {:?}. Will retry",
                        self.display_endpoint,
                        status.as_u16(),
                        resp.text().await.unwrap_or_default()
                    );
                }
            }
        }

        summary.retained = (0..len).filter(|i| buffer.get(*i).is_some()).count();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(StatusCode::OK), Outcome::Delivered);
        assert_eq!(classify(StatusCode::ACCEPTED), Outcome::Delivered);
        assert_eq!(classify(StatusCode::MOVED_PERMANENTLY), Outcome::Delivered);
        assert_eq!(
            classify(StatusCode::BAD_REQUEST),
            Outcome::Rejected(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            classify(StatusCode::FORBIDDEN),
            Outcome::Rejected(StatusCode::FORBIDDEN)
        );
        assert_eq!(
            classify(StatusCode::INTERNAL_SERVER_ERROR),
            Outcome::Retry(StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(
            classify(StatusCode::SERVICE_UNAVAILABLE),
            Outcome::Retry(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[test]
    fn test_new_uses_intake_endpoint() {
        let config = ShipperConfig {
            api_key: "secret".to_string(),
            ..Default::default()
        };
        let transmitter = HttpTransmitter::new(&config).expect("failed to build transmitter");
        assert_eq!(
            transmitter.endpoint,
            "https://http-intake.logs.datadoghq.com:443/v1/input/secret"
        );
        assert!(!transmitter.display_endpoint.contains("secret"));
    }

    #[tokio::test]
    async fn test_empty_buffer_sends_nothing() {
        let config = ShipperConfig {
            intake_url: "http://127.0.0.1".to_string(),
            intake_port: 9,
            ..Default::default()
        };
        let transmitter = HttpTransmitter::new(&config).expect("failed to build transmitter");
        let summary = transmitter.transmit(&EventBuffer::new()).await;
        assert_eq!(summary, PassSummary::default());
    }
}
