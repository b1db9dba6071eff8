use super::super::classification::Detection;
use super::ContributingEvidence;

pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// First detection whose label is in the qualifying set.
pub(crate) fn first_qualifying<'a>(
    detections: &'a [Detection],
    qualifying: &[String],
) -> Option<&'a Detection> {
    detections
        .iter()
        .find(|detection| qualifying.contains(&normalize_label(&detection.label)))
}

/// Contributing detection with the highest base weight. Earlier detections win ties.
pub(crate) fn strongest_contributor(
    detections: &[Detection],
    weights: &[(String, u32)],
) -> Option<ContributingEvidence> {
    let mut selected: Option<ContributingEvidence> = None;
    for detection in detections {
        let label = normalize_label(&detection.label);
        let Some(weight) = weights
            .iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, weight)| *weight)
        else {
            continue;
        };

        if selected
            .as_ref()
            .map_or(true, |current| weight > current.weight)
        {
            selected = Some(ContributingEvidence {
                label: detection.label.clone(),
                weight,
                confidence: detection.confidence,
            });
        }
    }
    selected
}

/// `round(weight × confidence)` with confidence clamped into [0, 1].
pub(crate) fn award_points(weight: u32, confidence: f64) -> u32 {
    let confidence = if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    };
    // The product never exceeds `weight`, so the cast cannot truncate.
    (f64::from(weight) * confidence).round() as u32
}
