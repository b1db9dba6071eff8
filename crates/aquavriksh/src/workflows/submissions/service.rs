use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::award::{apply_award, AwardError, AwardReceipt, AwardRequest};
use super::classification::{ClassificationError, Classifier, Detection};
use super::domain::{
    Badge, BadgeId, IntakeViolation, InvalidTransition, Submission, SubmissionId, SubmissionIntake,
    SubmissionStatus, UserId, UserProfile,
};
use super::repository::{NewSubmission, RepositoryError, SubmissionStore};
use super::scoring::{Assessment, ScoringPolicy};
use super::views::DashboardView;
use crate::config::RetryConfig;

const DASHBOARD_RECENT_LIMIT: usize = 10;

/// Service composing the store, the remote classifier, and the scoring policy.
pub struct SubmissionService<R, C> {
    repository: Arc<R>,
    classifier: Arc<C>,
    policy: Arc<ScoringPolicy>,
    retry: RetryConfig,
    classify_timeout: Duration,
}

/// How a processing run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    Awarded {
        assessment: Assessment,
        receipt: AwardReceipt,
    },
    /// Retries were exhausted; the submission is parked until an operator re-submits it.
    ClassificationFailed {
        submission: Submission,
        error: ClassificationError,
    },
}

impl<R, C> SubmissionService<R, C>
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        classifier: Arc<C>,
        policy: ScoringPolicy,
        retry: RetryConfig,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            classifier,
            policy: Arc::new(policy),
            retry,
            classify_timeout,
        }
    }

    /// Create a contributor account. Credentials are handled elsewhere.
    pub fn register_user(
        &self,
        display_name: &str,
    ) -> Result<UserProfile, SubmissionServiceError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(SubmissionServiceError::InvalidDisplayName);
        }
        let user = self
            .repository
            .create_user(display_name.to_string(), Utc::now())?;
        info!(user_id = %user.id, "contributor registered");
        Ok(user)
    }

    pub fn user(&self, user_id: UserId) -> Result<UserProfile, SubmissionServiceError> {
        self.repository
            .fetch_user(user_id)?
            .ok_or(SubmissionServiceError::UnknownUser(user_id))
    }

    /// Record a new submission in the pending state. Classification happens in [`Self::process`].
    pub fn submit(
        &self,
        user_id: UserId,
        intake: SubmissionIntake,
    ) -> Result<Submission, SubmissionServiceError> {
        let (image_url, location) = intake.validate()?;
        self.user(user_id)?;

        let submission = self.repository.create_submission(NewSubmission {
            user_id,
            image_url,
            location,
            captured_at: Utc::now(),
        })?;
        info!(submission_id = %submission.id, %user_id, "submission recorded as pending");
        Ok(submission)
    }

    /// Classify, score, and award a pending submission.
    pub async fn process(
        &self,
        submission_id: SubmissionId,
    ) -> Result<ProcessingOutcome, SubmissionServiceError> {
        let submission = self.submission(submission_id)?;
        if submission.status != SubmissionStatus::Pending {
            return Err(InvalidTransition {
                submission_id,
                from: submission.status.label(),
                to: "processing",
            }
            .into());
        }

        let (detections, attempts) = match self.classify_with_retry(&submission).await {
            Ok(classified) => classified,
            Err((error, attempts)) => {
                let parked = self.park_failed(submission_id, attempts, error.to_string())?;
                warn!(
                    %submission_id,
                    attempts,
                    error = %error,
                    "classification retries exhausted"
                );
                return Ok(ProcessingOutcome::ClassificationFailed {
                    submission: parked,
                    error,
                });
            }
        };

        let assessment = self.policy.assess(&detections);
        let receipt = match self.award(&submission, &assessment, attempts) {
            Ok(receipt) => receipt,
            Err(error) => {
                // The award rolled back; park the record so operators can reopen it.
                let reason = format!("award failed: {error}");
                match self.park_failed(submission_id, attempts, reason) {
                    Ok(_) => {
                        warn!(%submission_id, error = %error, "award failed, submission parked")
                    }
                    Err(park_error) => warn!(
                        %submission_id,
                        error = %error,
                        park_error = %park_error,
                        "award failed and the submission could not be parked"
                    ),
                }
                return Err(error);
            }
        };

        info!(
            %submission_id,
            user_id = %submission.user_id,
            status = receipt.submission.status.label(),
            points = receipt.submission.points_earned,
            user_points = receipt.user_points,
            unlocked = receipt.newly_unlocked.len(),
            "submission scored: {}",
            assessment.summary()
        );

        Ok(ProcessingOutcome::Awarded {
            assessment,
            receipt,
        })
    }

    /// Run [`Self::process`] on the runtime without holding up the caller.
    pub fn spawn_processing(self: &Arc<Self>, submission_id: SubmissionId) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = service.process(submission_id).await {
                warn!(%submission_id, error = %err, "submission processing failed");
            }
        });
    }

    /// Move a parked submission back to pending without processing it.
    pub fn reopen(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Submission, SubmissionServiceError> {
        let reopened = self
            .repository
            .transaction(|tx| -> Result<Submission, SubmissionServiceError> {
                let mut submission = tx.submission(submission_id)?;
                submission.reopen()?;
                tx.update_submission(submission.clone())?;
                Ok(submission)
            })?;
        info!(%submission_id, "submission reopened for classification");
        Ok(reopened)
    }

    /// Reopen a parked submission and process it again.
    pub async fn resubmit(
        &self,
        submission_id: SubmissionId,
    ) -> Result<ProcessingOutcome, SubmissionServiceError> {
        self.reopen(submission_id)?;
        self.process(submission_id).await
    }

    pub fn submission(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Submission, SubmissionServiceError> {
        self.repository
            .fetch_submission(submission_id)?
            .ok_or(SubmissionServiceError::UnknownSubmission(submission_id))
    }

    pub fn user_submissions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Submission>, SubmissionServiceError> {
        self.user(user_id)?;
        Ok(self.repository.submissions_for_user(user_id)?)
    }

    /// Submissions parked after classifier or award failures, oldest first.
    pub fn failed_submissions(
        &self,
        limit: usize,
    ) -> Result<Vec<Submission>, SubmissionServiceError> {
        Ok(self
            .repository
            .submissions_in_state(SubmissionStatus::ClassificationFailed, limit)?)
    }

    pub fn badges(&self) -> Result<Vec<Badge>, SubmissionServiceError> {
        Ok(self.repository.badge_catalog()?.badges().to_vec())
    }

    pub fn badge(&self, badge_id: BadgeId) -> Result<Badge, SubmissionServiceError> {
        self.repository
            .badge_catalog()?
            .badges()
            .iter()
            .find(|badge| badge.id == badge_id)
            .cloned()
            .ok_or(SubmissionServiceError::UnknownBadge(badge_id))
    }

    pub fn dashboard(&self, user_id: UserId) -> Result<DashboardView, SubmissionServiceError> {
        let user = self.user(user_id)?;
        let submissions = self.repository.submissions_for_user(user_id)?;
        let catalog = self.repository.badge_catalog()?;
        let badges = catalog.resolve(&user.badges).cloned().collect();
        Ok(DashboardView::build(
            &user,
            submissions,
            badges,
            DASHBOARD_RECENT_LIMIT,
        ))
    }

    async fn classify_with_retry(
        &self,
        submission: &Submission,
    ) -> Result<(Vec<Detection>, u32), (ClassificationError, u32)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                self.classify_timeout,
                self.classifier.classify(&submission.image_url),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ClassificationError::Unavailable(format!(
                    "no response within {}ms",
                    self.classify_timeout.as_millis()
                ))),
            };

            match result {
                Ok(detections) => {
                    debug!(
                        submission_id = %submission.id,
                        attempt,
                        detections = detections.len(),
                        "classified"
                    );
                    return Ok((detections, attempt));
                }
                Err(error) => {
                    if let ClassificationError::MalformedResponse(reason) = &error {
                        warn!(
                            submission_id = %submission.id,
                            image_url = %submission.image_url,
                            %reason,
                            "classifier returned an unexpected payload"
                        );
                    }
                    if attempt >= self.retry.max_attempts {
                        return Err((error, attempt));
                    }
                    let backoff = self.retry.backoff_after(attempt);
                    warn!(
                        submission_id = %submission.id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "classification failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn award(
        &self,
        submission: &Submission,
        assessment: &Assessment,
        attempts: u32,
    ) -> Result<AwardReceipt, SubmissionServiceError> {
        let catalog = self.repository.badge_catalog()?;
        let receipt = apply_award(
            self.repository.as_ref(),
            AwardRequest {
                submission_id: submission.id,
                user_id: submission.user_id,
                decision: assessment.decision,
                classification_attempts: attempts,
            },
            &catalog,
        )?;
        Ok(receipt)
    }

    fn park_failed(
        &self,
        submission_id: SubmissionId,
        attempts: u32,
        reason: String,
    ) -> Result<Submission, SubmissionServiceError> {
        self.repository
            .transaction(|tx| -> Result<Submission, SubmissionServiceError> {
                let mut submission = tx.submission(submission_id)?;
                submission.mark_classification_failed(attempts, reason)?;
                tx.update_submission(submission.clone())?;
                Ok(submission)
            })
    }
}

/// Error raised by the submission service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error("display name must not be empty")]
    InvalidDisplayName,
    #[error("user {0} not found")]
    UnknownUser(UserId),
    #[error("submission {0} not found")]
    UnknownSubmission(SubmissionId),
    #[error("badge {0} not found")]
    UnknownBadge(BadgeId),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Award(#[from] AwardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
