use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned sequence id of a registered contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Store-assigned sequence id of a photo submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

/// Identifier of a badge catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capture location of a photo, validated to WGS84 ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, IntakeViolation> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(IntakeViolation::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(IntakeViolation::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Payload posted by a contributor for a new photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionIntake {
    pub image_url: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SubmissionIntake {
    /// Validate the raw payload into the pieces a pending submission needs.
    pub fn validate(&self) -> Result<(String, GeoPoint), IntakeViolation> {
        let image_url = self.image_url.trim();
        if image_url.is_empty() {
            return Err(IntakeViolation::MissingImage);
        }
        let location = GeoPoint::new(self.latitude, self.longitude)?;
        Ok((image_url.to_string(), location))
    }
}

/// Reasons a submission payload is refused before a record is created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("image reference must not be empty")]
    MissingImage,
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Lifecycle state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    ClassificationFailed,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::ClassificationFailed => "classification_failed",
        }
    }

    /// Label shown to the submitter. A failed classification is still "processing" to them.
    pub const fn public_label(self) -> &'static str {
        match self {
            SubmissionStatus::ClassificationFailed => SubmissionStatus::Pending.label(),
            other => other.label(),
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, SubmissionStatus::Approved | SubmissionStatus::Rejected)
    }
}

/// Attempted state change that the lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("submission {submission_id} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub submission_id: SubmissionId,
    pub from: &'static str,
    pub to: &'static str,
}

/// A single photo capture and its classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub image_url: String,
    pub location: GeoPoint,
    pub captured_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub points_earned: u32,
    pub classification_attempts: u32,
    pub last_failure: Option<String>,
}

impl Submission {
    /// Attach the scoring decision. Only a pending submission can be finalized.
    pub fn finalize(&mut self, decision: &Decision) -> Result<(), InvalidTransition> {
        let target = match decision {
            Decision::Approved { .. } => SubmissionStatus::Approved,
            Decision::Rejected => SubmissionStatus::Rejected,
        };
        self.transition(target)?;
        self.points_earned = decision.points();
        self.last_failure = None;
        Ok(())
    }

    /// Park the submission after the classifier could not produce a usable answer, or the
    /// award for its answer could not be written.
    pub fn mark_classification_failed(
        &mut self,
        attempts: u32,
        reason: String,
    ) -> Result<(), InvalidTransition> {
        self.transition(SubmissionStatus::ClassificationFailed)?;
        self.classification_attempts = self.classification_attempts.saturating_add(attempts);
        self.last_failure = Some(reason);
        Ok(())
    }

    /// Operator-triggered re-submission of a failed classification.
    pub fn reopen(&mut self) -> Result<(), InvalidTransition> {
        self.transition(SubmissionStatus::Pending)
    }

    fn transition(&mut self, to: SubmissionStatus) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (self.status, to),
            (SubmissionStatus::Pending, SubmissionStatus::Approved)
                | (SubmissionStatus::Pending, SubmissionStatus::Rejected)
                | (SubmissionStatus::Pending, SubmissionStatus::ClassificationFailed)
                | (SubmissionStatus::ClassificationFailed, SubmissionStatus::Pending)
        );
        if !allowed {
            return Err(InvalidTransition {
                submission_id: self.id,
                from: self.status.label(),
                to: to.label(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Outcome of the scoring policy for one set of detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Rejected,
    Approved { points: u32 },
}

impl Decision {
    pub const fn points(&self) -> u32 {
        match self {
            Decision::Rejected => 0,
            Decision::Approved { points } => *points,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Decision::Rejected => "rejected: no qualifying vegetation detected".to_string(),
            Decision::Approved { points } => format!("approved for {points} point(s)"),
        }
    }
}

/// A registered contributor and their cumulative standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub points: u64,
    pub badges: BTreeSet<BadgeId>,
    pub submissions: Vec<SubmissionId>,
}

/// Catalog entry unlocked automatically once a contributor reaches its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub threshold: u64,
}
