use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::badges::BadgeCatalog;
use super::domain::{
    Badge, BadgeId, Submission, SubmissionId, SubmissionStatus, UserId, UserProfile,
};
use super::repository::{NewSubmission, RepositoryError, StoreTransaction, SubmissionStore};

/// In-process document store used by the service binary and tests.
///
/// Collections live behind one mutex. A transaction stages copies of the documents it
/// touches and writes them back only when its closure succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Documents>,
}

#[derive(Debug, Default)]
struct Documents {
    users: HashMap<UserId, UserProfile>,
    submissions: BTreeMap<SubmissionId, Submission>,
    badges: Vec<Badge>,
    user_sequence: u64,
    submission_sequence: u64,
}

impl MemoryStore {
    pub fn with_badges(badges: Vec<Badge>) -> Self {
        Self {
            documents: Mutex::new(Documents {
                badges,
                ..Documents::default()
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Documents>, RepositoryError> {
        self.documents
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl SubmissionStore for MemoryStore {
    fn create_user(
        &self,
        display_name: String,
        joined_at: DateTime<Utc>,
    ) -> Result<UserProfile, RepositoryError> {
        let mut documents = self.lock()?;
        documents.user_sequence += 1;
        let badges = BadgeCatalog::new(documents.badges.clone()).eligible(0);
        let user = UserProfile {
            id: UserId(documents.user_sequence),
            display_name,
            joined_at,
            points: 0,
            badges,
            submissions: Vec::new(),
        };
        documents.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn create_submission(&self, draft: NewSubmission) -> Result<Submission, RepositoryError> {
        let mut documents = self.lock()?;
        if !documents.users.contains_key(&draft.user_id) {
            return Err(RepositoryError::user_not_found(draft.user_id));
        }
        documents.submission_sequence += 1;
        let submission = Submission {
            id: SubmissionId(documents.submission_sequence),
            user_id: draft.user_id,
            image_url: draft.image_url,
            location: draft.location,
            captured_at: draft.captured_at,
            status: SubmissionStatus::Pending,
            points_earned: 0,
            classification_attempts: 0,
            last_failure: None,
        };
        documents.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    fn fetch_submission(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Ok(self.lock()?.submissions.get(&id).cloned())
    }

    fn submissions_for_user(&self, id: UserId) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self
            .lock()?
            .submissions
            .values()
            .filter(|submission| submission.user_id == id)
            .cloned()
            .collect())
    }

    fn submissions_in_state(
        &self,
        status: SubmissionStatus,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self
            .lock()?
            .submissions
            .values()
            .filter(|submission| submission.status == status)
            .take(limit)
            .cloned()
            .collect())
    }

    fn badge_catalog(&self) -> Result<BadgeCatalog, RepositoryError> {
        Ok(BadgeCatalog::new(self.lock()?.badges.clone()))
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut documents = self.lock()?;
        let mut staged = StagedTransaction::new(&documents);
        let output = work(&mut staged)?;

        let (users, submissions) = staged.into_writes();
        documents.users.extend(users);
        documents.submissions.extend(submissions);
        Ok(output)
    }
}

struct StagedTransaction<'a> {
    committed: &'a Documents,
    users: HashMap<UserId, UserProfile>,
    submissions: HashMap<SubmissionId, Submission>,
}

impl<'a> StagedTransaction<'a> {
    fn new(committed: &'a Documents) -> Self {
        Self {
            committed,
            users: HashMap::new(),
            submissions: HashMap::new(),
        }
    }

    fn into_writes(self) -> (HashMap<UserId, UserProfile>, HashMap<SubmissionId, Submission>) {
        (self.users, self.submissions)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut UserProfile, RepositoryError> {
        if !self.users.contains_key(&id) {
            let user = self
                .committed
                .users
                .get(&id)
                .cloned()
                .ok_or_else(|| RepositoryError::user_not_found(id))?;
            self.users.insert(id, user);
        }
        self.users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::user_not_found(id))
    }
}

impl StoreTransaction for StagedTransaction<'_> {
    fn submission(&self, id: SubmissionId) -> Result<Submission, RepositoryError> {
        self.submissions
            .get(&id)
            .or_else(|| self.committed.submissions.get(&id))
            .cloned()
            .ok_or_else(|| RepositoryError::submission_not_found(id))
    }

    fn update_submission(&mut self, submission: Submission) -> Result<(), RepositoryError> {
        if !self.submissions.contains_key(&submission.id)
            && !self.committed.submissions.contains_key(&submission.id)
        {
            return Err(RepositoryError::submission_not_found(submission.id));
        }
        self.submissions.insert(submission.id, submission);
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<UserProfile, RepositoryError> {
        self.users
            .get(&id)
            .or_else(|| self.committed.users.get(&id))
            .cloned()
            .ok_or_else(|| RepositoryError::user_not_found(id))
    }

    fn user_points(&self, id: UserId) -> Result<u64, RepositoryError> {
        self.users
            .get(&id)
            .or_else(|| self.committed.users.get(&id))
            .map(|user| user.points)
            .ok_or_else(|| RepositoryError::user_not_found(id))
    }

    fn increment_user_points(&mut self, id: UserId, delta: u64) -> Result<u64, RepositoryError> {
        let user = self.user_mut(id)?;
        user.points = user
            .points
            .checked_add(delta)
            .ok_or(RepositoryError::PointsOverflow(id))?;
        Ok(user.points)
    }

    fn replace_user_badges(
        &mut self,
        id: UserId,
        badges: BTreeSet<BadgeId>,
    ) -> Result<(), RepositoryError> {
        self.user_mut(id)?.badges = badges;
        Ok(())
    }

    fn append_user_history(
        &mut self,
        id: UserId,
        submission: SubmissionId,
    ) -> Result<bool, RepositoryError> {
        let user = self.user_mut(id)?;
        if user.submissions.contains(&submission) {
            return Ok(false);
        }
        user.submissions.push(submission);
        Ok(true)
    }
}
