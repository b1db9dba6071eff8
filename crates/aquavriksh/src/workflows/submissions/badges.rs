use std::collections::BTreeSet;

use super::domain::{Badge, BadgeId};

/// Snapshot of the badge catalog, loaded once before an award is applied. Entries are
/// kept in ascending threshold order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
}

impl BadgeCatalog {
    pub fn new(mut badges: Vec<Badge>) -> Self {
        badges.sort_by_key(|badge| badge.threshold);
        Self { badges }
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    /// Every badge whose threshold is covered by `points`.
    pub fn eligible(&self, points: u64) -> BTreeSet<BadgeId> {
        self.badges
            .iter()
            .filter(|badge| badge.threshold <= points)
            .map(|badge| badge.id)
            .collect()
    }

    /// Catalog entries for a stored badge set, skipping ids the catalog no longer knows.
    pub fn resolve<'a>(
        &'a self,
        ids: &'a BTreeSet<BadgeId>,
    ) -> impl Iterator<Item = &'a Badge> + 'a {
        self.badges.iter().filter(move |badge| ids.contains(&badge.id))
    }
}
