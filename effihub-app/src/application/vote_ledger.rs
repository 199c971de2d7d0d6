use effihub_errors::AppError;
use uuid::Uuid;

use crate::domain::UpvoteEvent;

/// Viewer-local vote state for one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Unvoted,
    Voted,
    Pending { intended: Intended },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intended {
    Voted,
    Unvoted,
}

/// A write the caller must issue against the vote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteCommand {
    Insert,
    Delete,
}

/// How a previously issued write came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Ok,
    /// The uniqueness constraint on (app_id, user_id) already held.
    Conflict,
    /// Network or storage failure; the action is not retried automatically.
    Failed(String),
}

/// Optimistic vote state for one (app, viewer) pair, reconciled against the
/// per-app change feed.
///
/// The displayed count is `confirmed + unconfirmed`: `confirmed` only ever
/// moves when a feed event is applied, `unconfirmed` is the latency-hiding
/// optimistic delta. When the feed reflects one of our own writes back, the
/// matching unconfirmed delta is consumed instead of applying the event a
/// second time, so local arithmetic can never drift from the feed-driven
/// value.
#[derive(Debug, Clone)]
pub struct VoteLedger {
    app_id: Uuid,
    viewer: Option<Uuid>,
    state: VoteState,
    confirmed: i64,
    unconfirmed: i64,
}

impl VoteLedger {
    pub fn new(app_id: Uuid, viewer: Option<Uuid>, upvotes_count: i64, is_upvoted: bool) -> Self {
        Self {
            app_id,
            viewer,
            state: if is_upvoted {
                VoteState::Voted
            } else {
                VoteState::Unvoted
            },
            confirmed: upvotes_count.max(0),
            unconfirmed: 0,
        }
    }

    pub fn app_id(&self) -> Uuid {
        self.app_id
    }

    pub fn viewer(&self) -> Option<Uuid> {
        self.viewer
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    /// Displayed aggregate, floored at zero.
    pub fn count(&self) -> i64 {
        (self.confirmed + self.unconfirmed).max(0)
    }

    /// The view-local derived flag: does a vote exist (or is one intended)
    /// for this viewer right now.
    pub fn is_upvoted(&self) -> bool {
        matches!(
            self.state,
            VoteState::Voted
                | VoteState::Pending {
                    intended: Intended::Voted
                }
        )
    }

    /// One click of the upvote button.
    ///
    /// Unauthenticated viewers are rejected synchronously with no transition
    /// and no command. A click while a write is still pending is ignored.
    pub fn toggle(&mut self) -> Result<Option<VoteCommand>, AppError> {
        if self.viewer.is_none() {
            return Err(AppError::Unauthenticated);
        }
        match self.state {
            VoteState::Pending { .. } => Ok(None),
            VoteState::Unvoted => {
                self.state = VoteState::Pending {
                    intended: Intended::Voted,
                };
                self.unconfirmed += 1;
                Ok(Some(VoteCommand::Insert))
            }
            VoteState::Voted => {
                self.state = VoteState::Pending {
                    intended: Intended::Unvoted,
                };
                self.unconfirmed -= 1;
                Ok(Some(VoteCommand::Delete))
            }
        }
    }

    /// Settle the in-flight write. Returns a follow-up command when the
    /// duplicate-insert fallback demands a compensating delete.
    ///
    /// A resolution that arrives after a feed event already made the state
    /// absolute is stale and ignored; in particular a conflict reported for
    /// an insert the feed has since confirmed as ours does NOT trigger the
    /// compensating delete, which is what lets two racing tabs of the same
    /// user converge on a single persisted vote.
    pub fn resolve(&mut self, outcome: WriteOutcome) -> Option<VoteCommand> {
        let intended = match self.state {
            VoteState::Pending { intended } => intended,
            _ => return None,
        };
        match (intended, outcome) {
            (Intended::Voted, WriteOutcome::Ok) => {
                self.state = VoteState::Voted;
                None
            }
            (Intended::Voted, WriteOutcome::Conflict) => {
                // A concurrent insert beat ours: the vote already exists.
                // Revert the optimistic increment (the existing row was never
                // counted locally) and toggle it off instead.
                self.unconfirmed -= 1;
                self.state = VoteState::Pending {
                    intended: Intended::Unvoted,
                };
                Some(VoteCommand::Delete)
            }
            (Intended::Voted, WriteOutcome::Failed(_)) => {
                self.unconfirmed -= 1;
                self.state = VoteState::Unvoted;
                None
            }
            (Intended::Unvoted, WriteOutcome::Ok | WriteOutcome::Conflict) => {
                self.state = VoteState::Unvoted;
                None
            }
            (Intended::Unvoted, WriteOutcome::Failed(_)) => {
                self.unconfirmed += 1;
                self.state = VoteState::Voted;
                None
            }
        }
    }

    /// Apply one change-feed event. Events arrive in per-app commit order and
    /// are the single source of truth for count convergence.
    pub fn apply_event(&mut self, event: &UpvoteEvent) {
        match event {
            UpvoteEvent::Inserted(row) => {
                if row.app_id != self.app_id {
                    return;
                }
                let ours = Some(row.user_id) == self.viewer;
                self.confirmed += 1;
                if ours {
                    if self.unconfirmed > 0 {
                        self.unconfirmed -= 1;
                    }
                    self.state = VoteState::Voted;
                }
            }
            UpvoteEvent::Deleted(row) => {
                if row.app_id != self.app_id {
                    return;
                }
                let ours = Some(row.user_id) == self.viewer;
                if self.confirmed > 0 {
                    self.confirmed -= 1;
                    if ours && self.unconfirmed < 0 {
                        self.unconfirmed += 1;
                    }
                } else if ours && self.unconfirmed < 0 {
                    self.unconfirmed += 1;
                }
                if ours {
                    self.state = VoteState::Unvoted;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpvoteRow;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    fn inserted(app: Uuid, user: Uuid) -> UpvoteEvent {
        UpvoteEvent::Inserted(UpvoteRow {
            app_id: app,
            user_id: user,
        })
    }

    fn deleted(app: Uuid, user: Uuid) -> UpvoteEvent {
        UpvoteEvent::Deleted(UpvoteRow {
            app_id: app,
            user_id: user,
        })
    }

    #[test]
    fn unauthenticated_click_is_rejected_without_transition() {
        let (app, _) = ids();
        let mut ledger = VoteLedger::new(app, None, 3, false);
        assert!(matches!(ledger.toggle(), Err(AppError::Unauthenticated)));
        assert_eq!(ledger.state(), VoteState::Unvoted);
        assert_eq!(ledger.count(), 3);
    }

    #[test]
    fn upvote_is_optimistic_then_confirmed() {
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 3, false);

        let cmd = ledger.toggle().unwrap();
        assert_eq!(cmd, Some(VoteCommand::Insert));
        // Local state flips before the write lands.
        assert_eq!(ledger.count(), 4);
        assert!(ledger.is_upvoted());

        assert_eq!(ledger.resolve(WriteOutcome::Ok), None);
        assert_eq!(ledger.state(), VoteState::Voted);
        assert_eq!(ledger.count(), 4);

        // Our own write reflected back must not be double-applied.
        ledger.apply_event(&inserted(app, user));
        assert_eq!(ledger.count(), 4);
        assert_eq!(ledger.state(), VoteState::Voted);
    }

    #[test]
    fn transient_failure_reverts_optimistic_state() {
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 3, false);

        ledger.toggle().unwrap();
        assert_eq!(ledger.count(), 4);
        let follow_up = ledger.resolve(WriteOutcome::Failed("network".into()));
        assert_eq!(follow_up, None);
        assert_eq!(ledger.state(), VoteState::Unvoted);
        assert_eq!(ledger.count(), 3);
    }

    #[test]
    fn unvote_failure_restores_voted_state() {
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 4, true);

        let cmd = ledger.toggle().unwrap();
        assert_eq!(cmd, Some(VoteCommand::Delete));
        assert_eq!(ledger.count(), 3);
        assert!(!ledger.is_upvoted());

        ledger.resolve(WriteOutcome::Failed("5xx".into()));
        assert_eq!(ledger.state(), VoteState::Voted);
        assert_eq!(ledger.count(), 4);
    }

    #[test]
    fn duplicate_insert_becomes_compensating_delete() {
        // A stale page votes on an app the user already voted for elsewhere.
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 3, false);

        ledger.toggle().unwrap();
        assert_eq!(ledger.count(), 4);

        let follow_up = ledger.resolve(WriteOutcome::Conflict);
        assert_eq!(follow_up, Some(VoteCommand::Delete));
        // Optimistic increment reverted: decremented relative to the click.
        assert_eq!(ledger.count(), 3);
        assert!(!ledger.is_upvoted());

        assert_eq!(ledger.resolve(WriteOutcome::Ok), None);
        assert_eq!(ledger.state(), VoteState::Unvoted);
        assert_eq!(ledger.count(), 3);

        // The pre-existing row surfaces on the feed, then our delete does.
        ledger.apply_event(&inserted(app, user));
        ledger.apply_event(&deleted(app, user));
        assert_eq!(ledger.count(), 3);
        assert_eq!(ledger.state(), VoteState::Unvoted);
    }

    #[test]
    fn feed_confirmation_makes_late_conflict_stale() {
        // Second of two racing tabs: the first tab's insert commits and its
        // feed event arrives before our own insert's conflict response.
        let (app, user) = ids();
        let mut tab = VoteLedger::new(app, Some(user), 3, false);

        tab.toggle().unwrap();
        assert_eq!(tab.count(), 4);

        tab.apply_event(&inserted(app, user));
        assert_eq!(tab.state(), VoteState::Voted);
        assert_eq!(tab.count(), 4);

        // Stale resolution: no compensating delete, vote survives.
        assert_eq!(tab.resolve(WriteOutcome::Conflict), None);
        assert_eq!(tab.state(), VoteState::Voted);
        assert_eq!(tab.count(), 4);
    }

    #[test]
    fn two_tabs_converge_on_one_vote() {
        // Both tabs click, one insert wins, feed events fan out to both,
        // and the loser's conflict response is stale by then.
        let (app, user) = ids();
        let mut tab_a = VoteLedger::new(app, Some(user), 3, false);
        let mut tab_b = VoteLedger::new(app, Some(user), 3, false);

        assert_eq!(tab_a.toggle().unwrap(), Some(VoteCommand::Insert));
        assert_eq!(tab_b.toggle().unwrap(), Some(VoteCommand::Insert));

        // Tab A's insert commits; the event reaches both tabs.
        tab_a.resolve(WriteOutcome::Ok);
        let event = inserted(app, user);
        tab_a.apply_event(&event);
        tab_b.apply_event(&event);

        // Tab B's insert then reports the uniqueness conflict.
        assert_eq!(tab_b.resolve(WriteOutcome::Conflict), None);

        for tab in [&tab_a, &tab_b] {
            assert_eq!(tab.state(), VoteState::Voted);
            assert_eq!(tab.count(), 4);
        }
    }

    #[test]
    fn toggle_then_untoggle_returns_to_initial_state() {
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 7, false);

        ledger.toggle().unwrap();
        ledger.resolve(WriteOutcome::Ok);
        ledger.apply_event(&inserted(app, user));

        ledger.toggle().unwrap();
        ledger.resolve(WriteOutcome::Ok);
        ledger.apply_event(&deleted(app, user));

        assert_eq!(ledger.state(), VoteState::Unvoted);
        assert_eq!(ledger.count(), 7);
    }

    #[test]
    fn count_never_goes_negative() {
        // Duplicate delete events floor the count at zero.
        let (app, user) = ids();
        let other = Uuid::new_v4();
        let mut ledger = VoteLedger::new(app, Some(user), 1, false);

        ledger.apply_event(&deleted(app, other));
        ledger.apply_event(&deleted(app, other));
        ledger.apply_event(&deleted(app, other));
        assert_eq!(ledger.count(), 0);

        ledger.apply_event(&inserted(app, other));
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn clicks_while_pending_are_ignored() {
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 2, false);

        assert_eq!(ledger.toggle().unwrap(), Some(VoteCommand::Insert));
        assert_eq!(ledger.toggle().unwrap(), None);
        assert_eq!(ledger.toggle().unwrap(), None);
        assert_eq!(ledger.count(), 3);
    }

    #[test]
    fn events_for_other_apps_are_not_applied() {
        let (app, user) = ids();
        let other_app = Uuid::new_v4();
        let mut ledger = VoteLedger::new(app, Some(user), 5, false);

        ledger.apply_event(&inserted(other_app, user));
        assert_eq!(ledger.count(), 5);
        assert_eq!(ledger.state(), VoteState::Unvoted);
    }

    #[test]
    fn feed_events_drive_state_to_row_existence() {
        // After any event sequence, state matches whether a row exists for
        // (app, viewer) as of the last applied event.
        let (app, user) = ids();
        let other = Uuid::new_v4();
        let mut ledger = VoteLedger::new(app, Some(user), 0, false);

        let script = [
            (inserted(app, other), false, 1),
            (inserted(app, user), true, 2),
            (deleted(app, other), true, 1),
            (deleted(app, user), false, 0),
            (inserted(app, user), true, 1),
        ];
        for (event, expect_voted, expect_count) in script {
            ledger.apply_event(&event);
            assert_eq!(ledger.is_upvoted(), expect_voted);
            assert_eq!(ledger.count(), expect_count);
        }
    }

    #[test]
    fn second_device_vote_marks_viewer_as_voted() {
        // A remote insert by the same user (another device) flips the flag
        // without any local action.
        let (app, user) = ids();
        let mut ledger = VoteLedger::new(app, Some(user), 3, false);

        ledger.apply_event(&inserted(app, user));
        assert!(ledger.is_upvoted());
        assert_eq!(ledger.count(), 4);
    }
}
