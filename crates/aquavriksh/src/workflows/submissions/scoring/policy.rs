use super::super::classification::Detection;
use super::super::domain::Decision;
use super::rules::{award_points, first_qualifying, strongest_contributor};
use super::{Assessment, NormalizedTables};

pub(crate) fn decide(detections: &[Detection], tables: &NormalizedTables) -> Assessment {
    let Some(qualifying) = first_qualifying(detections, &tables.qualifying) else {
        return Assessment {
            decision: Decision::Rejected,
            qualifying_label: None,
            evidence: None,
        };
    };

    let evidence = strongest_contributor(detections, &tables.weights);
    let points = match &evidence {
        Some(evidence) => award_points(evidence.weight, evidence.confidence),
        None => tables.baseline_award,
    };

    Assessment {
        decision: Decision::Approved { points },
        qualifying_label: Some(qualifying.label.clone()),
        evidence,
    }
}
