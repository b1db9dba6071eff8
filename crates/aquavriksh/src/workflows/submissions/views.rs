use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Badge, BadgeId, Submission, SubmissionId, SubmissionStatus, UserId, UserProfile,
};

/// Submitter-facing representation of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    pub submission_id: SubmissionId,
    pub user_id: UserId,
    pub image_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
    pub status: &'static str,
    pub points_earned: u32,
}

impl From<&Submission> for SubmissionView {
    fn from(submission: &Submission) -> Self {
        Self {
            submission_id: submission.id,
            user_id: submission.user_id,
            image_url: submission.image_url.clone(),
            latitude: submission.location.latitude(),
            longitude: submission.location.longitude(),
            captured_at: submission.captured_at,
            status: submission.status.public_label(),
            points_earned: submission.points_earned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub user_id: UserId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub points: u64,
    pub badges: Vec<BadgeId>,
    pub submissions: Vec<SubmissionId>,
}

impl From<&UserProfile> for UserView {
    fn from(user: &UserProfile) -> Self {
        Self {
            user_id: user.id,
            display_name: user.display_name.clone(),
            joined_at: user.joined_at,
            points: user.points,
            badges: user.badges.iter().copied().collect(),
            submissions: user.submissions.clone(),
        }
    }
}

/// Per-contributor summary backing the dashboard screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub user: UserView,
    pub total_submissions: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Includes submissions parked after classifier failures.
    pub processing: usize,
    pub success_rate_percent: u32,
    pub badges: Vec<Badge>,
    pub recent_submissions: Vec<SubmissionView>,
}

impl DashboardView {
    pub fn build(
        user: &UserProfile,
        mut submissions: Vec<Submission>,
        badges: Vec<Badge>,
        recent_limit: usize,
    ) -> Self {
        let count = |status: SubmissionStatus| {
            submissions
                .iter()
                .filter(|submission| submission.status == status)
                .count()
        };
        let approved = count(SubmissionStatus::Approved);
        let rejected = count(SubmissionStatus::Rejected);
        let total_submissions = submissions.len();

        submissions.sort_by(|a, b| b.captured_at.cmp(&a.captured_at).then(b.id.cmp(&a.id)));
        let recent_submissions = submissions
            .iter()
            .take(recent_limit)
            .map(SubmissionView::from)
            .collect();

        Self {
            user: UserView::from(user),
            total_submissions,
            approved,
            rejected,
            processing: total_submissions - approved - rejected,
            success_rate_percent: success_rate_percent(approved, total_submissions),
            badges,
            recent_submissions,
        }
    }
}

/// Share of approved submissions, rounded to the nearest percent.
fn success_rate_percent(approved: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = (approved * 100 + total / 2) / total;
    u32::try_from(percent).unwrap_or(100)
}
