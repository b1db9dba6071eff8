mod config;
mod policy;
mod rules;

pub use config::{CategoryWeight, ScoringConfig};

use serde::{Deserialize, Serialize};

use super::classification::Detection;
use super::domain::Decision;
use rules::normalize_label;

/// Stateless policy that turns classifier detections into a [`Decision`].
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    tables: NormalizedTables,
}

#[derive(Debug, Clone)]
pub(crate) struct NormalizedTables {
    pub qualifying: Vec<String>,
    pub weights: Vec<(String, u32)>,
    pub baseline_award: u32,
}

impl ScoringPolicy {
    pub fn new(config: ScoringConfig) -> Self {
        let tables = NormalizedTables {
            qualifying: config
                .qualifying_labels
                .iter()
                .map(|label| normalize_label(label))
                .collect(),
            weights: config
                .contributing_weights
                .iter()
                .map(|entry| (normalize_label(&entry.label), entry.weight))
                .collect(),
            baseline_award: config.baseline_award,
        };
        Self { tables }
    }

    pub fn evaluate(&self, detections: &[Detection]) -> Decision {
        self.assess(detections).decision
    }

    /// Evaluate and keep the detections that drove the decision.
    pub fn assess(&self, detections: &[Detection]) -> Assessment {
        policy::decide(detections, &self.tables)
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// The contributing detection selected to size an award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingEvidence {
    pub label: String,
    pub weight: u32,
    pub confidence: f64,
}

/// Decision plus the audit trail behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub decision: Decision,
    pub qualifying_label: Option<String>,
    pub evidence: Option<ContributingEvidence>,
}

impl Assessment {
    pub fn summary(&self) -> String {
        match (&self.decision, &self.evidence) {
            (Decision::Rejected, _) => self.decision.summary(),
            (Decision::Approved { points }, Some(evidence)) => format!(
                "approved for {points} point(s): {} (weight {}, confidence {:.2})",
                evidence.label, evidence.weight, evidence.confidence
            ),
            (Decision::Approved { points }, None) => {
                format!("approved for {points} point(s): no contributing evidence")
            }
        }
    }
}
