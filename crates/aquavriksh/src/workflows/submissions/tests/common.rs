use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::config::RetryConfig;
use crate::workflows::submissions::classification::{
    ClassificationError, Classifier, Detection,
};
use crate::workflows::submissions::domain::{
    Badge, BadgeId, GeoPoint, Submission, SubmissionId, SubmissionIntake, UserId, UserProfile,
};
use crate::workflows::submissions::memory::MemoryStore;
use crate::workflows::submissions::repository::{
    NewSubmission, RepositoryError, StoreTransaction, SubmissionStore,
};
use crate::workflows::submissions::scoring::ScoringPolicy;
use crate::workflows::submissions::service::SubmissionService;
use crate::workflows::submissions::BadgeCatalog;

pub(super) fn badge(id: u64, name: &str, threshold: u64) -> Badge {
    Badge {
        id: BadgeId(id),
        name: name.to_string(),
        description: format!("Unlocked at {threshold} points"),
        image_url: format!("https://cdn.example/badges/{id}.png"),
        threshold,
    }
}

pub(super) fn badges() -> Vec<Badge> {
    vec![
        badge(1, "First Sprout", 1),
        badge(2, "Shore Sentinel", 100),
        badge(3, "Green Guardian", 500),
    ]
}

pub(super) fn catalog() -> BadgeCatalog {
    BadgeCatalog::new(badges())
}

pub(super) fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_badges(badges()))
}

pub(super) fn intake() -> SubmissionIntake {
    SubmissionIntake {
        image_url: "https://res.cloudinary.example/aquavriksh/mangrove-01.jpg".to_string(),
        latitude: 21.9497,
        longitude: 89.1833,
    }
}

pub(super) fn mangrove_with_trash() -> Vec<Detection> {
    vec![
        Detection::new("mangrove tree", 0.95),
        Detection::new("trash", 0.80),
    ]
}

pub(super) fn register(store: &MemoryStore, name: &str) -> UserProfile {
    store
        .create_user(name.to_string(), Utc::now())
        .expect("user created")
}

pub(super) fn pending_submission(store: &MemoryStore, user_id: UserId) -> Submission {
    store
        .create_submission(NewSubmission {
            user_id,
            image_url: "https://img.example/pending.jpg".to_string(),
            location: GeoPoint::new(12.97, 77.59).expect("valid point"),
            captured_at: Utc::now(),
        })
        .expect("submission created")
}

pub(super) fn seed_points(store: &MemoryStore, user_id: UserId, points: u64) {
    store
        .transaction(|tx| tx.increment_user_points(user_id, points))
        .expect("seed points");
}

pub(super) fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    }
}

pub(super) fn build_service<C>(
    store: Arc<MemoryStore>,
    classifier: Arc<C>,
) -> SubmissionService<MemoryStore, C>
where
    C: Classifier + 'static,
{
    SubmissionService::new(
        store,
        classifier,
        ScoringPolicy::default(),
        fast_retry(3),
        Duration::from_millis(200),
    )
}

/// Classifier replaying queued results, then repeating a fallback.
pub(super) struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Vec<Detection>, ClassificationError>>>,
    fallback: Result<Vec<Detection>, ClassificationError>,
    calls: AtomicU32,
}

impl ScriptedClassifier {
    pub(super) fn always(result: Result<Vec<Detection>, ClassificationError>) -> Self {
        Self::scripted(Vec::new(), result)
    }

    pub(super) fn scripted(
        script: Vec<Result<Vec<Detection>, ClassificationError>>,
        fallback: Result<Vec<Detection>, ClassificationError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _image_url: &str) -> Result<Vec<Detection>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().expect("script mutex poisoned").pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Classifier that never answers within the pipeline's timeout.
pub(super) struct StalledClassifier;

#[async_trait::async_trait]
impl Classifier for StalledClassifier {
    async fn classify(&self, _image_url: &str) -> Result<Vec<Detection>, ClassificationError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

/// Store whose transactions fail when finalizing a submission, after the user writes are staged.
/// Non-final status writes (parking, reopening) go through.
pub(super) struct FinalizeFailsStore {
    pub(super) inner: MemoryStore,
}

struct FinalizeFailsTransaction<'a> {
    inner: &'a mut dyn StoreTransaction,
}

impl StoreTransaction for FinalizeFailsTransaction<'_> {
    fn submission(&self, id: SubmissionId) -> Result<Submission, RepositoryError> {
        self.inner.submission(id)
    }

    fn update_submission(&mut self, submission: Submission) -> Result<(), RepositoryError> {
        if submission.status.is_final() {
            return Err(RepositoryError::Unavailable("write conflict".to_string()));
        }
        self.inner.update_submission(submission)
    }

    fn user(&self, id: UserId) -> Result<UserProfile, RepositoryError> {
        self.inner.user(id)
    }

    fn user_points(&self, id: UserId) -> Result<u64, RepositoryError> {
        self.inner.user_points(id)
    }

    fn increment_user_points(&mut self, id: UserId, delta: u64) -> Result<u64, RepositoryError> {
        self.inner.increment_user_points(id, delta)
    }

    fn replace_user_badges(
        &mut self,
        id: UserId,
        badges: BTreeSet<BadgeId>,
    ) -> Result<(), RepositoryError> {
        self.inner.replace_user_badges(id, badges)
    }

    fn append_user_history(
        &mut self,
        id: UserId,
        submission: SubmissionId,
    ) -> Result<bool, RepositoryError> {
        self.inner.append_user_history(id, submission)
    }
}

impl SubmissionStore for FinalizeFailsStore {
    fn create_user(
        &self,
        display_name: String,
        joined_at: chrono::DateTime<Utc>,
    ) -> Result<UserProfile, RepositoryError> {
        self.inner.create_user(display_name, joined_at)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn create_submission(&self, draft: NewSubmission) -> Result<Submission, RepositoryError> {
        self.inner.create_submission(draft)
    }

    fn fetch_submission(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.inner.fetch_submission(id)
    }

    fn submissions_for_user(&self, id: UserId) -> Result<Vec<Submission>, RepositoryError> {
        self.inner.submissions_for_user(id)
    }

    fn submissions_in_state(
        &self,
        status: crate::workflows::submissions::SubmissionStatus,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError> {
        self.inner.submissions_in_state(status, limit)
    }

    fn badge_catalog(&self) -> Result<BadgeCatalog, RepositoryError> {
        self.inner.badge_catalog()
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner.transaction(|tx| {
            let mut faulty = FinalizeFailsTransaction { inner: tx };
            work(&mut faulty)
        })
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
