// src/relay.rs

//! Feed relay: S3 upload to ingestion endpoint.
//!
//! DealerCenter drops feed exports into an S3 bucket. The relay Lambda is
//! triggered by the `ObjectCreated` notification and:
//! 1. Downloads the object
//! 2. Decodes it as UTF-8 text (lossy; vendor exports carry stray bytes)
//! 3. POSTs it verbatim to the sync endpoint with the shared secret
//!
//! Failures are logged and reported back to the invoker, never retried
//! here. The endpoint's status and body are propagated so a failed relay
//! is visible in the invocation result.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Relay configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Full URL of the sync endpoint, including the `/sync` path
    pub endpoint_url: String,
    /// Shared secret forwarded as `x-api-key`
    pub api_key: String,
}

impl RelayConfig {
    /// Build a config, rejecting an endpoint that does not parse as a URL.
    pub fn new(endpoint_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let endpoint_url = endpoint_url.into();
        url::Url::parse(&endpoint_url)?;
        Ok(Self {
            endpoint_url,
            api_key: api_key.into(),
        })
    }

    /// Read `SYNC_ENDPOINT_URL` and `SYNC_API_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(
            std::env::var("SYNC_ENDPOINT_URL")
                .map_err(|_| AppError::config("SYNC_ENDPOINT_URL is not set"))?,
            std::env::var("SYNC_API_KEY")
                .map_err(|_| AppError::config("SYNC_API_KEY is not set"))?,
        )
    }
}

/// S3 notification payload, trimmed to the fields the relay reads.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Invocation result, reported back to whatever triggered the relay.
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    pub success: bool,
    /// HTTP status the sync endpoint answered with (0 if never reached)
    pub status: u16,
    /// Endpoint response body, propagated verbatim
    pub body: String,
    pub relayed_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decode an object key from an S3 event.
///
/// Event keys arrive URL-encoded with `+` for spaces, the same scheme as
/// form fields.
pub fn decode_s3_key(key: &str) -> String {
    url::form_urlencoded::parse(format!("k={key}").as_bytes())
        .find(|(name, _)| name == "k")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| key.to_string())
}

#[cfg(feature = "lambda")]
mod forward {
    use std::time::Duration;

    use lambda_runtime::{Error as LambdaError, LambdaEvent};
    use tracing::{error, info, instrument, warn};

    use crate::error::{AppError, Result};

    use super::{RelayConfig, RelayResponse, S3Event, decode_s3_key};

    /// Lambda entry point for S3 notifications.
    #[instrument(skip(event))]
    pub async fn handler(
        event: LambdaEvent<S3Event>,
    ) -> std::result::Result<RelayResponse, LambdaError> {
        let (payload, _context) = event.into_parts();

        match run_relay(&payload).await {
            Ok(response) => {
                info!(
                    "Relay finished: endpoint answered {} ({} bytes sent)",
                    response.status, response.relayed_bytes
                );
                Ok(response)
            }
            Err(e) => {
                // Returning Err would make S3 redeliver the event; report
                // the failure in the payload instead.
                error!("Relay failed: {}", e);
                Ok(RelayResponse {
                    success: false,
                    status: 0,
                    body: String::new(),
                    relayed_bytes: 0,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    async fn run_relay(event: &S3Event) -> Result<RelayResponse> {
        let config = RelayConfig::from_env()?;

        let record = event
            .records
            .first()
            .ok_or_else(|| AppError::validation("event carries no records"))?;
        if event.records.len() > 1 {
            warn!("Event carries {} records; relaying the first", event.records.len());
        }

        let bucket = &record.s3.bucket.name;
        let key = decode_s3_key(&record.s3.object.key);
        info!("Relaying s3://{}/{} ({})", bucket, key, record.event_name);

        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = aws_sdk_s3::Client::new(&aws);
        let object = s3
            .get_object()
            .bucket(bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| AppError::store(e.into_service_error().to_string()))?;
        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::store(e.to_string()))?
            .into_bytes();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        let response = client
            .post(&config.endpoint_url)
            .header("x-api-key", &config.api_key)
            .header("content-type", "text/csv")
            .body(text)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let success = (200..300).contains(&status);
        if !success {
            error!("Sync endpoint answered {}: {}", status, body);
        }

        Ok(RelayResponse {
            success,
            status,
            body,
            relayed_bytes: bytes.len(),
            error: None,
        })
    }
}

#[cfg(feature = "lambda")]
pub use forward::handler;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_and_percent_sequences_decode() {
        assert_eq!(
            decode_s3_key("feeds/red+flower%2B1.csv"),
            "feeds/red flower+1.csv"
        );
        assert_eq!(decode_s3_key("feeds/caf%C3%A9.csv"), "feeds/café.csv");
    }

    #[test]
    fn plain_keys_pass_through() {
        assert_eq!(decode_s3_key("feeds/inventory.csv"), "feeds/inventory.csv");
    }

    #[test]
    fn endpoint_url_must_parse() {
        let err = RelayConfig::new("not a url", "key").unwrap_err();
        assert!(matches!(err, AppError::Url(_)));

        let config = RelayConfig::new("https://sync.example.com/sync", "key").unwrap();
        assert_eq!(config.endpoint_url, "https://sync.example.com/sync");
    }

    #[test]
    fn notification_payload_deserializes() {
        let json = r#"{
            "Records": [
                {
                    "eventName": "ObjectCreated:Put",
                    "s3": {
                        "bucket": { "name": "dealer-feeds" },
                        "object": { "key": "exports/2026-08-14+inventory.csv", "size": 48213 }
                    }
                }
            ]
        }"#;

        let event: S3Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.records.len(), 1);
        let record = &event.records[0];
        assert_eq!(record.event_name, "ObjectCreated:Put");
        assert_eq!(record.s3.bucket.name, "dealer-feeds");
        assert_eq!(
            decode_s3_key(&record.s3.object.key),
            "exports/2026-08-14 inventory.csv"
        );
        assert_eq!(record.s3.object.size, Some(48213));
    }

    #[test]
    fn recordless_payload_still_parses() {
        let event: S3Event = serde_json::from_str("{}").unwrap();
        assert!(event.records.is_empty());
    }
}
