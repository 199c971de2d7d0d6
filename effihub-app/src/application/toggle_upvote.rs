use effihub_errors::AppError;
use uuid::Uuid;

use crate::application::vote_ledger::{VoteCommand, VoteLedger, WriteOutcome};
use crate::domain::{UpvoteEvent, UpvoteRow, VoteToggle};
use crate::infrastructure::cache::QueryCache;
use crate::infrastructure::realtime::UpvoteFeed;

/// The storage contract a vote mutation needs: an insert guarded by the
/// (app_id, user_id) uniqueness constraint, surfaced as `AppError::Conflict`
/// when it already holds, and a delete keyed on the same pair.
///
/// Implementations also keep the denormalized per-app vote count in step
/// with the rows they touch.
pub trait VoteStore {
    fn insert_if_absent(
        &self,
        app_id: Uuid,
        user_id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), AppError>> + Send;

    fn delete_by_match(
        &self,
        app_id: Uuid,
        user_id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), AppError>> + Send;
}

/// Drives one upvote-button click end to end: ledger transition, stored
/// write, duplicate-conflict fallback, feed publication and the fan-out
/// invalidation of vote-derived views.
pub struct ToggleUpvote<S: VoteStore> {
    store: S,
    feed: UpvoteFeed,
    cache: QueryCache,
}

impl<S: VoteStore> ToggleUpvote<S> {
    pub fn new(store: S, feed: UpvoteFeed, cache: QueryCache) -> Self {
        Self { store, feed, cache }
    }

    pub async fn execute(&self, ledger: &mut VoteLedger) -> Result<VoteToggle, AppError> {
        let app_id = ledger.app_id();
        let user_id = match ledger.viewer() {
            Some(id) => id,
            None => return Err(AppError::Unauthenticated),
        };

        let mut command = ledger.toggle()?;
        let mut failure: Option<AppError> = None;

        // The conflict fallback can chain one follow-up delete.
        while let Some(cmd) = command.take() {
            let written = match cmd {
                VoteCommand::Insert => self.store.insert_if_absent(app_id, user_id).await,
                VoteCommand::Delete => self.store.delete_by_match(app_id, user_id).await,
            };
            let outcome = match written {
                Ok(()) => {
                    let row = UpvoteRow { app_id, user_id };
                    let event = match cmd {
                        VoteCommand::Insert => UpvoteEvent::Inserted(row),
                        VoteCommand::Delete => UpvoteEvent::Deleted(row),
                    };
                    self.feed.publish(event);
                    WriteOutcome::Ok
                }
                Err(AppError::Conflict) => WriteOutcome::Conflict,
                Err(err) => {
                    let message = err.to_string();
                    failure = Some(err);
                    WriteOutcome::Failed(message)
                }
            };
            command = ledger.resolve(outcome);
        }

        if let Some(err) = failure {
            // Optimistic state is already reverted; the caller surfaces a
            // transient notification and nothing is retried.
            tracing::warn!(%app_id, %user_id, error = %err, "vote write failed");
            return Err(err);
        }

        self.cache.invalidate_vote_views(app_id);
        Ok(VoteToggle {
            voted: ledger.is_upvoted(),
            upvotes_count: ledger.count(),
        })
    }
}
