//! Photo submission intake, classification, scoring, and award pipeline.
//!
//! A submission is stored as pending before the remote classifier is called. Detections are
//! scored by [`ScoringPolicy`] and the resulting [`Decision`] is applied to the submission and
//! its owner in a single store transaction (see [`apply_award`]).

pub mod award;
pub mod badges;
pub mod classification;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use award::{apply_award, AwardError, AwardReceipt, AwardRequest};
pub use badges::BadgeCatalog;
pub use classification::{ClassificationError, Classifier, Detection, HttpClassifier};
pub use domain::{
    Badge, BadgeId, Decision, GeoPoint, IntakeViolation, InvalidTransition, Submission,
    SubmissionId, SubmissionIntake, SubmissionStatus, UserId, UserProfile,
};
pub use memory::MemoryStore;
pub use repository::{NewSubmission, RepositoryError, StoreTransaction, SubmissionStore};
pub use router::submission_router;
pub use scoring::{
    Assessment, CategoryWeight, ContributingEvidence, ScoringConfig, ScoringPolicy,
};
pub use service::{ProcessingOutcome, SubmissionService, SubmissionServiceError};
pub use views::{DashboardView, SubmissionView, UserView};
