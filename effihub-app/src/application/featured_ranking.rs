use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::AppSummary;

/// How many apps the featured strip shows.
pub const FEATURED_LIMIT: u64 = 4;

/// Read-mostly provider of the current top-apps ranking.
///
/// Handed to consumers by explicit composition (it lives on `AppContext`),
/// refreshed by whoever just changed vote-derived data. Readers between
/// refreshes see the previous ranking, which is the same staleness the
/// cached listing views have.
pub struct FeaturedRanking {
    apps: RwLock<Vec<AppSummary>>,
}

impl FeaturedRanking {
    pub fn new() -> Self {
        Self {
            apps: RwLock::new(Vec::new()),
        }
    }

    /// Replace the ranking wholesale with a freshly queried top list.
    pub fn refresh(&self, top_apps: Vec<AppSummary>) {
        let mut apps = self.apps.write().expect("ranking lock poisoned");
        *apps = top_apps;
    }

    /// 1-based rank of an app within the featured strip, if it made the cut.
    pub fn rank_of(&self, app_id: Uuid) -> Option<usize> {
        let apps = self.apps.read().expect("ranking lock poisoned");
        apps.iter().position(|app| app.id == app_id).map(|idx| idx + 1)
    }

    pub fn top(&self) -> Vec<AppSummary> {
        self.apps.read().expect("ranking lock poisoned").clone()
    }
}

impl Default for FeaturedRanking {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Platform;

    fn summary(name: &str, upvotes: i64) -> AppSummary {
        AppSummary {
            id: Uuid::new_v4(),
            name: name.into(),
            slogan: String::new(),
            logo_url: None,
            app_link: "https://example.com".into(),
            platform: Platform::Pc,
            category_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            upvotes_count: upvotes,
            created_at: None,
        }
    }

    #[test]
    fn rank_is_one_based_position() {
        let ranking = FeaturedRanking::new();
        let first = summary("focus-timer", 12);
        let second = summary("note-vault", 9);
        let first_id = first.id;
        let second_id = second.id;
        ranking.refresh(vec![first, second]);

        assert_eq!(ranking.rank_of(first_id), Some(1));
        assert_eq!(ranking.rank_of(second_id), Some(2));
        assert_eq!(ranking.rank_of(Uuid::new_v4()), None);
    }

    #[test]
    fn refresh_replaces_the_previous_ranking() {
        let ranking = FeaturedRanking::new();
        let old = summary("old", 5);
        let old_id = old.id;
        ranking.refresh(vec![old]);

        let new = summary("new", 8);
        let new_id = new.id;
        ranking.refresh(vec![new]);

        assert_eq!(ranking.rank_of(old_id), None);
        assert_eq!(ranking.rank_of(new_id), Some(1));
        assert_eq!(ranking.top().len(), 1);
    }
}
