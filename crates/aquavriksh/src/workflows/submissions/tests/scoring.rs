use super::common::*;
use crate::workflows::submissions::classification::Detection;
use crate::workflows::submissions::domain::Decision;
use crate::workflows::submissions::scoring::{CategoryWeight, ScoringConfig, ScoringPolicy};

#[test]
fn mangrove_with_trash_is_approved_for_weighted_confidence() {
    let policy = ScoringPolicy::default();

    let assessment = policy.assess(&mangrove_with_trash());

    assert_eq!(assessment.decision, Decision::Approved { points: 2 });
    assert_eq!(assessment.qualifying_label.as_deref(), Some("mangrove tree"));
    let evidence = assessment.evidence.expect("trash selected");
    assert_eq!(evidence.label, "trash");
    assert_eq!(evidence.weight, 2);
}

#[test]
fn contributing_labels_without_vegetation_are_rejected() {
    let policy = ScoringPolicy::default();

    assert_eq!(
        policy.evaluate(&[Detection::new("truck", 0.99)]),
        Decision::Rejected
    );
    assert_eq!(
        policy.evaluate(&[
            Detection::new("excavator", 0.97),
            Detection::new("pollutant slick", 0.91),
            Detection::new("trash pile", 0.88),
        ]),
        Decision::Rejected
    );
}

#[test]
fn empty_detections_are_rejected() {
    let assessment = ScoringPolicy::default().assess(&[]);
    assert_eq!(assessment.decision, Decision::Rejected);
    assert!(assessment.qualifying_label.is_none());
    assert!(assessment.evidence.is_none());
}

#[test]
fn highest_weight_wins_over_highest_confidence() {
    let policy = ScoringPolicy::default();
    let detections = vec![
        Detection::new("trash", 0.99),
        Detection::new("normal tree", 0.6),
        Detection::new("excavator", 0.5),
        Detection::new("pollutant slick", 0.95),
    ];

    // excavator weight 5 × 0.5 = 2.5, rounded half up.
    assert_eq!(policy.evaluate(&detections), Decision::Approved { points: 3 });
}

#[test]
fn qualifying_only_detections_receive_the_baseline_award() {
    let detections = vec![Detection::new("mangrove tree", 0.9), Detection::new("bird", 0.7)];

    assert_eq!(
        ScoringPolicy::default().evaluate(&detections),
        Decision::Approved { points: 0 }
    );

    let generous = ScoringPolicy::new(ScoringConfig {
        baseline_award: 1,
        ..ScoringConfig::default()
    });
    let assessment = generous.assess(&detections);
    assert_eq!(assessment.decision, Decision::Approved { points: 1 });
    assert!(assessment.summary().contains("no contributing evidence"));
}

#[test]
fn labels_are_matched_case_insensitively() {
    let detections = vec![
        Detection::new(" Mangrove Tree", 0.9),
        Detection::new("TRASH PILE", 1.0),
    ];
    assert_eq!(
        ScoringPolicy::default().evaluate(&detections),
        Decision::Approved { points: 3 }
    );
}

#[test]
fn low_confidence_can_round_to_zero_and_still_approve() {
    let detections = vec![Detection::new("normal tree", 0.9), Detection::new("truck", 0.4)];
    assert_eq!(
        ScoringPolicy::default().evaluate(&detections),
        Decision::Approved { points: 0 }
    );
}

#[test]
fn points_match_weight_times_confidence_for_every_contributing_label() {
    let config = ScoringConfig::default();
    let policy = ScoringPolicy::new(config.clone());

    for CategoryWeight { label, weight } in &config.contributing_weights {
        for confidence in [0.0, 0.13, 0.5, 0.77, 1.0] {
            let detections = vec![
                Detection::new("normal tree", 0.5),
                Detection::new(label.clone(), confidence),
            ];
            let expected = (f64::from(*weight) * confidence).round() as u32;
            assert_eq!(
                policy.evaluate(&detections),
                Decision::Approved { points: expected },
                "label {label} confidence {confidence}"
            );
        }
    }
}

#[test]
fn custom_tables_drive_the_decision() {
    let policy = ScoringPolicy::new(ScoringConfig {
        qualifying_labels: vec!["seagrass".to_string()],
        contributing_weights: vec![CategoryWeight::new("ghost net", 10)],
        baseline_award: 0,
    });

    assert_eq!(
        policy.evaluate(&[Detection::new("mangrove tree", 0.9), Detection::new("ghost net", 0.9)]),
        Decision::Rejected
    );
    assert_eq!(
        policy.evaluate(&[Detection::new("seagrass", 0.9), Detection::new("ghost net", 0.84)]),
        Decision::Approved { points: 8 }
    );
}
