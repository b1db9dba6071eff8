use serde::{Deserialize, Serialize};

/// Base reward for one contributing category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub label: String,
    pub weight: u32,
}

impl CategoryWeight {
    pub fn new(label: impl Into<String>, weight: u32) -> Self {
        Self {
            label: label.into(),
            weight,
        }
    }
}

/// Label tables driving admissibility and point sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Vegetation classes; at least one must be present for a submission to count.
    pub qualifying_labels: Vec<String>,
    /// Threat classes and their base weights, in table order.
    pub contributing_weights: Vec<CategoryWeight>,
    /// Award for admissible photos with no contributing detection.
    pub baseline_award: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            qualifying_labels: vec!["mangrove tree".to_string(), "normal tree".to_string()],
            contributing_weights: vec![
                CategoryWeight::new("cut stump", 2),
                CategoryWeight::new("excavator", 5),
                CategoryWeight::new("fallen tree", 1),
                CategoryWeight::new("pollutant slick", 4),
                CategoryWeight::new("trash", 2),
                CategoryWeight::new("trash pile", 3),
                CategoryWeight::new("truck", 1),
            ],
            baseline_award: 0,
        }
    }
}
