use aquavriksh::config::ScoringSettings;
use aquavriksh::error::AppError;
use aquavriksh::workflows::submissions::{
    Badge, BadgeId, Detection, ScoringConfig, ScoringPolicy,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) policy: Arc<ScoringPolicy>,
}

pub(crate) fn scoring_policy(settings: ScoringSettings) -> ScoringPolicy {
    ScoringPolicy::new(ScoringConfig {
        baseline_award: settings.baseline_award,
        ..ScoringConfig::default()
    })
}

/// Badge catalog seeded into the in-memory store.
pub(crate) fn default_badges() -> Vec<Badge> {
    [
        (1, "First Sprout", "Earn your first point for a verified photo", 1),
        (2, "Shore Sentinel", "Reach 100 points of verified reports", 100),
        (3, "Green Guardian", "Reach 500 points protecting mangroves", 500),
        (4, "Mangrove Marshal", "Reach 1000 points of coastal stewardship", 1000),
    ]
    .into_iter()
    .map(|(id, name, description, threshold)| Badge {
        id: BadgeId(id),
        name: name.to_string(),
        description: description.to_string(),
        image_url: format!("/static/badges/{id}.png"),
        threshold,
    })
    .collect()
}

/// Parse and validate caller-supplied detections.
pub(crate) fn read_detections(raw: &str) -> Result<Vec<Detection>, AppError> {
    let detections: Vec<Detection> = serde_json::from_str(raw)?;
    validate_detections(&detections)?;
    Ok(detections)
}

pub(crate) fn validate_detections(detections: &[Detection]) -> Result<(), AppError> {
    for detection in detections {
        if !(0.0..=1.0).contains(&detection.confidence) {
            return Err(AppError::Detections(format!(
                "confidence {} for '{}' is outside [0, 1]",
                detection.confidence, detection.label
            )));
        }
    }
    Ok(())
}
