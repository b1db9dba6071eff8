//! Boundary to the remote image classifier.
//!
//! The pipeline only depends on [`Classifier`]; [`HttpClassifier`] talks to the hosted
//! inference workflow and [`parse_detections`] turns its payload into [`Detection`]s.

mod http;

pub use http::{parse_detections, HttpClassifier};

use serde::{Deserialize, Serialize};

/// One labeled object found in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Failure modes of a classification call. Both are retryable from the pipeline's view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("classification service unavailable: {0}")]
    Unavailable(String),
    #[error("classification response malformed: {0}")]
    MalformedResponse(String),
}

/// Remote classifier returning detections for an image reference. No retries are performed here.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image_url: &str) -> Result<Vec<Detection>, ClassificationError>;
}
