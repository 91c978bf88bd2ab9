//! Reconciliation of a fetched snapshot against the stored graph.
//!
//! Each direction is diffed independently. Removed edges are archived with
//! their original start timestamp before deletion; new edges are inserted
//! idempotently. Edges present in both sets are never touched.

use std::collections::HashSet;

use crate::domain::errors::WorkerError;
use crate::domain::models::SponsorshipSnapshot;
use crate::domain::services::EdgeDiff;
use crate::infrastructure::persistence::repositories::{
    EdgeDirection, SponsorshipRepository, UsersRepository,
};
use crate::utils::logging;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Referenced ids that had no user row before this pass
    pub new_ids: Vec<i64>,
    /// Edges archived across both directions
    pub removed_edges: u64,
    /// Edges inserted across both directions
    pub added_edges: u64,
}

/// Applies snapshot diffs to the stored sponsorship graph
pub struct GraphReconciler {
    users: UsersRepository,
    sponsorships: SponsorshipRepository,
}

impl GraphReconciler {
    /// Create a new GraphReconciler
    pub fn new(users: UsersRepository, sponsorships: SponsorshipRepository) -> Self {
        Self {
            users,
            sponsorships,
        }
    }

    /// Reconcile both directions for one account
    pub async fn reconcile(
        &self,
        github_id: i64,
        snapshot: &SponsorshipSnapshot,
    ) -> Result<ReconcileOutcome, WorkerError> {
        let mut referenced: Vec<i64> = snapshot.referenced_ids().into_iter().collect();
        referenced.sort_unstable();

        // Which ids are new must be decided before placeholders exist.
        let new_ids = self.users.filter_unknown(&referenced).await?;
        self.users.ensure_placeholders(&referenced).await?;

        let mut outcome = ReconcileOutcome {
            new_ids,
            ..Default::default()
        };

        self.reconcile_direction(
            github_id,
            EdgeDirection::IncomingSponsors,
            &snapshot.sponsors,
            &mut outcome,
        )
        .await?;
        self.reconcile_direction(
            github_id,
            EdgeDirection::OutgoingSponsoring,
            &snapshot.sponsoring,
            &mut outcome,
        )
        .await?;

        if outcome.removed_edges > 0 || outcome.added_edges > 0 {
            logging::log_info(&format!(
                "Reconciled {}: +{} -{} edges, {} new accounts",
                github_id,
                outcome.added_edges,
                outcome.removed_edges,
                outcome.new_ids.len()
            ));
        }

        Ok(outcome)
    }

    async fn reconcile_direction(
        &self,
        github_id: i64,
        direction: EdgeDirection,
        fresh: &[i64],
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), WorkerError> {
        let stored = self.sponsorships.stored_set(github_id, direction).await?;
        let fresh: HashSet<i64> = fresh.iter().copied().collect();
        let diff = EdgeDiff::compute(&stored, &fresh);

        if diff.is_empty() {
            return Ok(());
        }

        outcome.removed_edges += self
            .sponsorships
            .archive_and_remove(github_id, direction, &diff.to_remove)
            .await?;
        self.sponsorships
            .insert_edges(github_id, direction, &diff.to_add)
            .await?;
        outcome.added_edges += diff.to_add.len() as u64;

        Ok(())
    }
}
