use std::path::PathBuf;

use aquavriksh::config::ScoringSettings;
use aquavriksh::error::AppError;
use clap::Args;

use crate::infra::{read_detections, scoring_policy};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding an array of `{"label": ..., "confidence": ...}` objects
    #[arg(long)]
    pub(crate) detections: PathBuf,
    /// Points awarded when vegetation is present without contributing evidence
    #[arg(long, default_value_t = 0)]
    pub(crate) baseline_award: u32,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.detections)?;
    let detections = read_detections(&raw)?;
    let policy = scoring_policy(ScoringSettings {
        baseline_award: args.baseline_award,
    });
    let assessment = policy.assess(&detections);

    println!("Detections: {}", detections.len());
    for detection in &detections {
        println!("  - {} ({:.2})", detection.label, detection.confidence);
    }
    println!("Decision: {}", assessment.summary());
    if let Some(label) = &assessment.qualifying_label {
        println!("Admitted by: {label}");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&assessment).map_err(AppError::from)?
    );
    Ok(())
}
