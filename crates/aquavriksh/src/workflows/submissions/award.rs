use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::badges::BadgeCatalog;
use super::domain::{BadgeId, Decision, InvalidTransition, Submission, SubmissionId, UserId};
use super::repository::{RepositoryError, SubmissionStore};

/// Decision to apply to a pending submission and its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardRequest {
    pub submission_id: SubmissionId,
    pub user_id: UserId,
    pub decision: Decision,
    /// Classifier calls spent on this run, added to the submission's counter.
    pub classification_attempts: u32,
}

/// Committed result of an award transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardReceipt {
    pub submission: Submission,
    pub user_points: u64,
    pub badges: BTreeSet<BadgeId>,
    pub newly_unlocked: Vec<BadgeId>,
}

#[derive(Debug, thiserror::Error)]
pub enum AwardError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error("submission {submission_id} belongs to user {owner}, not {requested}")]
    OwnerMismatch {
        submission_id: SubmissionId,
        owner: UserId,
        requested: UserId,
    },
}

/// Apply a decision in one store transaction: finalize the submission, append it to the
/// owner's history, add approved points, and recompute the badge set from the new total.
pub fn apply_award<R>(
    store: &R,
    request: AwardRequest,
    catalog: &BadgeCatalog,
) -> Result<AwardReceipt, AwardError>
where
    R: SubmissionStore,
{
    store.transaction(|tx| {
        let mut submission = tx.submission(request.submission_id)?;
        if submission.user_id != request.user_id {
            return Err(AwardError::OwnerMismatch {
                submission_id: submission.id,
                owner: submission.user_id,
                requested: request.user_id,
            });
        }
        submission.classification_attempts = submission
            .classification_attempts
            .saturating_add(request.classification_attempts);
        submission.finalize(&request.decision)?;

        let previous_badges = tx.user(request.user_id)?.badges;
        tx.append_user_history(request.user_id, submission.id)?;

        let user_points = match request.decision {
            Decision::Approved { points } if points > 0 => {
                tx.increment_user_points(request.user_id, u64::from(points))?
            }
            _ => tx.user_points(request.user_id)?,
        };

        let badges = catalog.eligible(user_points);
        tx.replace_user_badges(request.user_id, badges.clone())?;
        tx.update_submission(submission.clone())?;

        let newly_unlocked = badges.difference(&previous_badges).copied().collect();
        Ok(AwardReceipt {
            submission,
            user_points,
            badges,
            newly_unlocked,
        })
    })
}
