//! Push delivery through an HTTP push gateway.
//!
//! [`HttpPushSender`] POSTs the subscription and JSON payload to a gateway
//! that performs VAPID signing and payload encryption. The response status
//! is mapped onto [`DeliveryError`]: 404/410 mean the browser subscription
//! is gone, 429 and 5xx are worth retrying, other 4xx are permanent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{DeliveryError, PushSender, PushTarget};

/// Default HTTP request timeout for one gateway call.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default push message time-to-live at the push service.
const DEFAULT_TTL_SECS: u32 = 86_400;

/// Longest error body carried into `last_error`.
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// PushGatewayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PushGatewayConfig {
    pub url: String,
    /// Bearer token sent to the gateway, if it requires one.
    pub token: Option<String>,
    pub request_timeout: Duration,
    pub ttl_secs: u32,
}

impl PushGatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                    | Required | Default                      |
    /// |-----------------------------|----------|------------------------------|
    /// | `PUSH_GATEWAY_URL`          | yes      | (push disabled when unset)   |
    /// | `PUSH_GATEWAY_TOKEN`        | no       |                              |
    /// | `PUSH_GATEWAY_TIMEOUT_SECS` | no       | `10`                         |
    /// | `PUSH_TTL_SECS`             | no       | `86400`                      |
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("PUSH_GATEWAY_URL").ok()?;
        Some(Self {
            url,
            token: std::env::var("PUSH_GATEWAY_TOKEN").ok(),
            request_timeout: Duration::from_secs(
                std::env::var("PUSH_GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            ttl_secs: std::env::var("PUSH_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECS),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpPushSender
// ---------------------------------------------------------------------------

pub struct HttpPushSender {
    client: reqwest::Client,
    config: PushGatewayConfig,
}

impl HttpPushSender {
    pub fn new(config: PushGatewayConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn request_body(&self, target: &PushTarget, payload: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "subscription": {
                "endpoint": target.endpoint,
                "keys": {
                    "p256dh": target.p256dh,
                    "auth": target.auth,
                },
            },
            "payload": payload,
            "ttl": self.config.ttl_secs,
        })
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(
        &self,
        target: &PushTarget,
        payload: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .json(&self.request_body(target, payload));
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| classify_request_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

/// Map a non-success gateway status onto the failure taxonomy.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> DeliveryError {
    let detail = format!("push gateway returned {status}: {}", truncate(body));
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => DeliveryError::Expired,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            DeliveryError::Transient(detail)
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            DeliveryError::Unavailable(detail)
        }
        s if s.is_server_error() => DeliveryError::Transient(detail),
        _ => DeliveryError::Permanent(detail),
    }
}

fn classify_request_error(err: &reqwest::Error) -> DeliveryError {
    if err.is_connect() {
        DeliveryError::Unavailable(err.to_string())
    } else if err.is_builder() {
        DeliveryError::Permanent(err.to_string())
    } else {
        DeliveryError::Transient(err.to_string())
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn gone_and_not_found_mean_expired() {
        assert_eq!(classify_status(StatusCode::GONE, ""), DeliveryError::Expired);
        assert_eq!(classify_status(StatusCode::NOT_FOUND, ""), DeliveryError::Expired);
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        assert_matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            DeliveryError::Transient(_)
        );
        assert_matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            DeliveryError::Transient(_)
        );
    }

    #[test]
    fn gateway_outage_is_unavailable() {
        assert_matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            DeliveryError::Unavailable(_)
        );
    }

    #[test]
    fn other_client_errors_are_permanent() {
        assert_matches!(
            classify_status(StatusCode::BAD_REQUEST, "payload too large"),
            DeliveryError::Permanent(msg) if msg.contains("payload too large")
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1000);
        assert_eq!(truncate(&body).len(), MAX_ERROR_BODY);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn request_body_carries_keys_and_ttl() {
        let sender = HttpPushSender::new(PushGatewayConfig {
            url: "http://localhost:9999/send".into(),
            token: None,
            request_timeout: Duration::from_secs(1),
            ttl_secs: 60,
        })
        .unwrap();
        let target = PushTarget {
            endpoint: "https://push.example.com/abc".into(),
            p256dh: "p".into(),
            auth: "a".into(),
        };
        let body = sender.request_body(&target, &serde_json::json!({"title": "hi"}));
        assert_eq!(body["subscription"]["keys"]["auth"], "a");
        assert_eq!(body["payload"]["title"], "hi");
        assert_eq!(body["ttl"], 60);
    }
}
