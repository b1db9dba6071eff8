use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::badges::BadgeCatalog;
use super::domain::{
    BadgeId, GeoPoint, Submission, SubmissionId, SubmissionStatus, UserId, UserProfile,
};

/// Fields supplied by intake; the store assigns the id and the pending state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub user_id: UserId,
    pub image_url: String,
    pub location: GeoPoint,
    pub captured_at: DateTime<Utc>,
}

/// Document store abstraction so the service can be exercised in isolation.
///
/// Reads and creates are single-document operations. Anything touching a user's
/// cumulative state goes through [`SubmissionStore::transaction`], which must apply
/// every staged write or none of them.
pub trait SubmissionStore: Send + Sync {
    fn create_user(
        &self,
        display_name: String,
        joined_at: DateTime<Utc>,
    ) -> Result<UserProfile, RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError>;
    fn create_submission(&self, draft: NewSubmission) -> Result<Submission, RepositoryError>;
    fn fetch_submission(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError>;
    fn submissions_for_user(&self, id: UserId) -> Result<Vec<Submission>, RepositoryError>;
    fn submissions_in_state(
        &self,
        status: SubmissionStatus,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError>;
    fn badge_catalog(&self) -> Result<BadgeCatalog, RepositoryError>;

    /// Run `work` atomically. Transactions touching the same user are serialized.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Primitive operations available inside a store transaction.
pub trait StoreTransaction {
    fn submission(&self, id: SubmissionId) -> Result<Submission, RepositoryError>;
    fn update_submission(&mut self, submission: Submission) -> Result<(), RepositoryError>;
    fn user(&self, id: UserId) -> Result<UserProfile, RepositoryError>;
    fn user_points(&self, id: UserId) -> Result<u64, RepositoryError>;
    /// Add `delta` to the user's points and return the new total.
    fn increment_user_points(&mut self, id: UserId, delta: u64) -> Result<u64, RepositoryError>;
    fn replace_user_badges(
        &mut self,
        id: UserId,
        badges: BTreeSet<BadgeId>,
    ) -> Result<(), RepositoryError>;
    /// Append to the user's history. Returns `false` when the id was already recorded.
    fn append_user_history(
        &mut self,
        id: UserId,
        submission: SubmissionId,
    ) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("points overflow for user {0}")]
    PointsOverflow(UserId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn user_not_found(id: UserId) -> Self {
        Self::NotFound {
            entity: "user",
            id: id.0,
        }
    }

    pub fn submission_not_found(id: SubmissionId) -> Self {
        Self::NotFound {
            entity: "submission",
            id: id.0,
        }
    }
}
