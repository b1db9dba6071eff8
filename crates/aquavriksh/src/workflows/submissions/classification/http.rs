use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use super::{ClassificationError, Classifier, Detection};
use crate::config::ClassifierConfig;

/// Largest classifier response body accepted by default.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// HTTP client for the hosted detection workflow.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_response_bytes: usize,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassificationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ClassificationError::Unavailable(err.to_string()))?;
        Ok(Self::with_client(
            client,
            config.endpoint.clone(),
            config.api_key.clone(),
        ))
    }

    /// Reuse an existing [`reqwest::Client`] so connection pools can be shared.
    pub fn with_client(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Bodies larger than `bytes` are rejected as malformed.
    pub fn with_response_limit(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    pub fn with_timeout(
        endpoint: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, ClassificationError> {
        Self::new(&ClassifierConfig {
            endpoint,
            api_key,
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image_url: &str) -> Result<Vec<Detection>, ClassificationError> {
        let body = json!({
            "api_key": self.api_key,
            "inputs": {
                "image": { "type": "url", "value": image_url }
            }
        });

        let mut response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ClassificationError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let head = response.chunk().await.ok().flatten().unwrap_or_default();
            let body = String::from_utf8_lossy(&head[..head.len().min(200)]);
            return Err(ClassificationError::Unavailable(format!(
                "status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let limit = self.max_response_bytes;
        let too_large = || {
            ClassificationError::MalformedResponse(format!("response body exceeds {limit} bytes"))
        };
        if response.content_length().is_some_and(|length| length > limit as u64) {
            return Err(too_large());
        }

        let mut payload = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| {
            if err.is_timeout() {
                ClassificationError::Unavailable(err.to_string())
            } else {
                ClassificationError::MalformedResponse(err.to_string())
            }
        })? {
            if payload.len() + chunk.len() > limit {
                return Err(too_large());
            }
            payload.extend_from_slice(&chunk);
        }
        let payload: Value = serde_json::from_slice(&payload).map_err(|err| {
            ClassificationError::MalformedResponse(format!("invalid json: {err}"))
        })?;

        let detections = parse_detections(&payload)?;
        debug!(image_url, detections = detections.len(), "classifier responded");
        Ok(detections)
    }
}

/// Extract detections from a workflow (`outputs[0].predictions.predictions`) or plain
/// model (`predictions`) response. Unknown fields are ignored.
pub fn parse_detections(payload: &Value) -> Result<Vec<Detection>, ClassificationError> {
    let predictions = payload
        .pointer("/outputs/0/predictions/predictions")
        .or_else(|| payload.get("predictions"))
        .ok_or_else(|| {
            ClassificationError::MalformedResponse("missing predictions list".to_string())
        })?
        .as_array()
        .ok_or_else(|| {
            ClassificationError::MalformedResponse("predictions is not a list".to_string())
        })?;

    predictions
        .iter()
        .enumerate()
        .map(|(index, prediction)| {
            let label = prediction
                .get("class")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ClassificationError::MalformedResponse(format!(
                        "prediction {index} has no class label"
                    ))
                })?;
            let confidence = prediction
                .get("confidence")
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    ClassificationError::MalformedResponse(format!(
                        "prediction {index} has no numeric confidence"
                    ))
                })?;
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ClassificationError::MalformedResponse(format!(
                    "prediction {index} confidence {confidence} outside [0, 1]"
                )));
            }
            Ok(Detection::new(label, confidence))
        })
        .collect()
}
