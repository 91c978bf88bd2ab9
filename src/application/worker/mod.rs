//! Ingest worker control loop.
//!
//! One backlog item per cycle: identify the account, enrich its profile,
//! fetch its relationships, reconcile the stored graph, adjust its queue
//! priority and mark it done. Discovery sweeps and stale requeues are
//! interleaved on their own schedules.

pub mod activity;
pub mod discovery;
pub mod fetcher;
pub mod reconcile;
pub mod run_state;

pub use activity::ActivityCollector;
pub use discovery::{DiscoveryEngine, DiscoveryMode, DiscoverySink, DISCOVERY_PRIORITY};
pub use fetcher::RelationshipFetcher;
pub use reconcile::{GraphReconciler, ReconcileOutcome};
pub use run_state::WorkerRunState;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::domain::errors::WorkerError;
use crate::domain::models::{Demographics, EnrichmentState, UserProfile};
use crate::domain::services::DemographicSource;
use crate::infrastructure::api::{ApiError, LocationResolver, PlatformTransport, TokenProvider};
use crate::infrastructure::persistence::repositories::{QueueItem, QueueStatus, Repositories};
use crate::infrastructure::persistence::{DbPool, RepositoryFactory};
use crate::utils::logging;

/// Priority bounds for queue entries
const MIN_PRIORITY: i32 = 1;
const MAX_PRIORITY: i32 = 10;
/// Priority for accounts first seen through another account's relationships
const RELATED_PRIORITY: i32 = 5;

/// Extract the `data` object of a GraphQL response, rejecting error payloads
pub(crate) fn graphql_data(response: &Value) -> Result<&Value, ApiError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(ApiError::ResponseError(format!(
                "GraphQL errors: {}",
                Value::Array(errors.clone())
            )));
        }
    }
    response
        .get("data")
        .ok_or_else(|| ApiError::ResponseError("GraphQL response missing data".to_string()))
}

/// New priority after one processing cycle.
///
/// Accounts that surfaced unseen accounts climb, accounts with a stable
/// graph hold, accounts with no relationships sink. Always within bounds.
fn adjust_priority(current: i32, has_relationships: bool, found_new_ids: bool) -> i32 {
    let adjusted = if found_new_ids {
        current + 1
    } else if has_relationships {
        current
    } else {
        current - 1
    };
    adjusted.clamp(MIN_PRIORITY, MAX_PRIORITY)
}

/// The long-running ingest worker
pub struct IngestWorker {
    config: AppConfig,
    db_pool: DbPool,
    repos: Repositories,
    transport: Arc<dyn PlatformTransport>,
    tokens: Arc<dyn TokenProvider>,
    demographics: Arc<dyn DemographicSource>,
    location: LocationResolver,
    discovery: DiscoveryEngine,
    fetcher: RelationshipFetcher,
    last_sweep: Instant,
    last_incremental: Option<Instant>,
}

impl IngestWorker {
    /// Create a new IngestWorker
    pub fn new(
        config: AppConfig,
        db_pool: DbPool,
        transport: Arc<dyn PlatformTransport>,
        tokens: Arc<dyn TokenProvider>,
        demographics: Arc<dyn DemographicSource>,
    ) -> Self {
        let repos = RepositoryFactory::create_repositories(&db_pool);
        let location = LocationResolver::new(&config);
        let discovery = DiscoveryEngine::new(transport.clone(), config.search.clone());
        let fetcher = RelationshipFetcher::new(transport.clone());

        Self {
            config,
            db_pool,
            repos,
            transport,
            tokens,
            demographics,
            location,
            discovery,
            fetcher,
            last_sweep: Instant::now(),
            last_incremental: None,
        }
    }

    /// Run the control loop until an unclassified error stops it.
    /// Database connectivity loss is handled in place by reconnecting.
    pub async fn run(&mut self) -> Result<(), WorkerError> {
        logging::log_header("Sponsor graph ingest worker");

        loop {
            match self.run_cycle().await {
                Ok(processed_item) => {
                    if processed_item {
                        sleep(Duration::from_millis(self.config.worker.item_delay_ms)).await;
                    }
                }
                Err(e) if e.is_connectivity_loss() => {
                    logging::log_warning(&format!("Database connection lost: {}", e));
                    self.reconnect().await?;
                }
                Err(e) => {
                    logging::log_error(&format!("Worker stopping on unrecoverable error: {}", e));
                    return Err(e);
                }
            }
        }
    }

    /// One cycle: housekeeping, then at most one backlog item. Returns
    /// whether an item was taken; a drained backlog loops again immediately.
    async fn run_cycle(&mut self) -> Result<bool, WorkerError> {
        self.maybe_seed().await?;

        if self.tokens.is_expiring_soon() {
            logging::log_info("Auth token close to expiry, refreshing");
            self.tokens.refresh().await?;
        }

        self.maybe_stale_sweep().await?;

        let item = match self.repos.queue.dequeue_highest_priority().await? {
            Some(item) => item,
            None => {
                // Drained backlog: top up with fresh accounts, then give
                // everything already processed another pass.
                logging::log_info("Backlog drained, running incremental discovery");
                self.discovery
                    .run(DiscoveryMode::Incremental, &self.repos.queue)
                    .await?;
                let requeued = self.repos.queue.requeue_all_completed().await?;
                logging::log_info(&format!("Re-enqueued {} completed entries", requeued));
                return Ok(false);
            }
        };

        self.process_item(item).await?;
        Ok(true)
    }

    /// Run discovery sweeps the run state says are owed
    async fn maybe_seed(&mut self) -> Result<(), WorkerError> {
        let path = self.config.worker.state_path.clone();
        let mut state = WorkerRunState::load(&path)?;
        let now = Utc::now();

        if state.needs_full_sweep(now, self.config.worker.full_seed_interval_days) {
            self.discovery
                .run(DiscoveryMode::Full, &self.repos.queue)
                .await?;
            state.mark_full_sweep_done(Utc::now());
            state.save(&path)?;
            return Ok(());
        }

        // Incremental sweeps are cheap but not free; in-process throttling
        // keeps a fast-draining backlog from re-running them every cycle.
        let throttle = Duration::from_secs(self.config.worker.sweep_interval_secs);
        let throttled = self
            .last_incremental
            .map(|at| at.elapsed() < throttle)
            .unwrap_or(false);

        if !throttled
            && state.needs_incremental_sweep(now, self.config.search.incremental_window_days)
        {
            self.discovery
                .run(DiscoveryMode::Incremental, &self.repos.queue)
                .await?;
            self.last_incremental = Some(Instant::now());
        }

        Ok(())
    }

    /// Periodically requeue stale completed entries and recycle the pool
    async fn maybe_stale_sweep(&mut self) -> Result<(), WorkerError> {
        if self.last_sweep.elapsed() < Duration::from_secs(self.config.worker.sweep_interval_secs) {
            return Ok(());
        }

        let requeued = self
            .repos
            .queue
            .requeue_stale_completed(self.config.worker.stale_after_days)
            .await?;
        logging::log_info(&format!(
            "Stale sweep re-enqueued {} entries; recycling database connection",
            requeued
        ));

        self.reconnect().await?;
        self.last_sweep = Instant::now();
        Ok(())
    }

    /// Process one backlog item end to end
    async fn process_item(&mut self, item: QueueItem) -> Result<(), WorkerError> {
        logging::log_debug(&format!(
            "Processing account {} at priority {}",
            item.github_id, item.priority
        ));

        let profile = match self.transport.rest_get(&format!("/user/{}", item.github_id)).await {
            Ok(payload) => payload,
            Err(ApiError::NotFound) => {
                // The platform no longer knows this id. Everything recorded
                // about it goes, history included.
                logging::log_info(&format!(
                    "Account {} gone from the platform, purging",
                    item.github_id
                ));
                self.repos.users.purge(item.github_id).await?;
                return Ok(());
            }
            Err(e) if e.is_recoverable() => {
                // Leave the entry pending so it is retried later.
                logging::log_warning(&format!(
                    "Profile fetch failed for {}: {}",
                    item.github_id, e
                ));
                return Ok(());
            }
            Err(e) => {
                // Retrying cannot fix a rejected request; park the entry
                // until a future enqueue resurrects it.
                logging::log_error(&format!(
                    "Profile lookup rejected for {}: {}",
                    item.github_id, e
                ));
                self.repos
                    .queue
                    .set_status(item.github_id, QueueStatus::Failed, None)
                    .await?;
                return Ok(());
            }
        };

        let profile = match UserProfile::from_json(&profile) {
            Some(profile) => profile,
            None => {
                logging::log_warning(&format!(
                    "Account {} has no usable profile payload, skipping",
                    item.github_id
                ));
                self.repos
                    .queue
                    .set_status(item.github_id, QueueStatus::Skipped, None)
                    .await?;
                return Ok(());
            }
        };

        self.enrich(&profile).await?;

        let snapshot = match self.fetcher.fetch(profile.kind, profile.github_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                logging::log_warning(&format!(
                    "Relationship fetch failed for {}: {}",
                    profile.github_id, e
                ));
                return Ok(());
            }
        };

        let reconciler = GraphReconciler::new(
            self.repos.users.clone(),
            self.repos.sponsorships.clone(),
        );
        let outcome = reconciler.reconcile(profile.github_id, &snapshot).await?;

        if !outcome.new_ids.is_empty() {
            self.repos
                .queue
                .enqueue_or_bump(&outcome.new_ids, RELATED_PRIORITY)
                .await?;
        }

        if snapshot.has_relationships() {
            let collector =
                ActivityCollector::new(self.transport.clone(), self.repos.activity.clone());
            collector
                .collect(
                    profile.github_id,
                    profile.kind,
                    profile.github_created_at,
                    self.config.worker.activity_refresh_days,
                )
                .await?;
        }

        let priority = adjust_priority(
            item.priority,
            snapshot.has_relationships(),
            !outcome.new_ids.is_empty(),
        );
        self.repos
            .queue
            .set_status(profile.github_id, QueueStatus::Completed, Some(priority))
            .await?;
        self.repos
            .users
            .finalize_scrape(
                profile.github_id,
                snapshot.private_sponsor_count,
                snapshot.min_tier_cents,
            )
            .await?;

        Ok(())
    }

    /// Upsert the profile with demographics per the enrichment rules, after
    /// resolving any handle collision with a stale row.
    async fn enrich(&self, profile: &UserProfile) -> Result<(), WorkerError> {
        let merged = self
            .repos
            .users
            .merge_handle_collision(profile.github_id, &profile.username)
            .await?;
        if merged {
            logging::log_info(&format!(
                "Merged stale identity holding handle '{}' into {}",
                profile.username, profile.github_id
            ));
        }

        let identity = self.repos.users.find_identity(profile.github_id).await?;
        let (state, prior) = match &identity {
            Some(identity) => (
                EnrichmentState::from_columns(
                    identity.is_enriched,
                    identity.demographics.has_pronouns,
                ),
                identity.demographics.clone(),
            ),
            None => (EnrichmentState::Unenriched, Demographics::default()),
        };

        let country = match &profile.location {
            Some(raw) => self.location.resolve_country(raw).await,
            None => None,
        };
        let signal = self
            .demographics
            .resolve(&profile.username, profile.name.as_deref(), country.as_deref())
            .await;
        let (_, demographics) = state.apply(signal, &prior);

        self.repos.users.upsert_profile(profile, &demographics).await?;
        Ok(())
    }

    /// Rebuild the pool and every repository bound to it
    async fn reconnect(&mut self) -> Result<(), WorkerError> {
        self.db_pool = DbPool::new(&self.config).await?;
        self.repos = RepositoryFactory::create_repositories(&self.db_pool);
        logging::log_info("Database connection re-established");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_climbs_on_new_ids() {
        assert_eq!(adjust_priority(3, true, true), 4);
        assert_eq!(adjust_priority(10, true, true), 10);
    }

    #[test]
    fn test_priority_holds_on_stable_graph() {
        assert_eq!(adjust_priority(7, true, false), 7);
    }

    #[test]
    fn test_priority_sinks_without_relationships() {
        assert_eq!(adjust_priority(4, false, false), 3);
        assert_eq!(adjust_priority(1, false, false), 1);
    }

    #[test]
    fn test_priority_always_within_bounds() {
        for current in -5..20 {
            for (has_rel, found_new) in [(false, false), (true, false), (true, true)] {
                let p = adjust_priority(current, has_rel, found_new);
                assert!((MIN_PRIORITY..=MAX_PRIORITY).contains(&p));
            }
        }
    }

    #[test]
    fn test_graphql_data_rejects_error_payloads() {
        let response = json!({ "data": { "ok": true }, "errors": [{ "message": "nope" }] });
        assert!(graphql_data(&response).is_err());

        let response = json!({ "data": { "ok": true } });
        assert_eq!(graphql_data(&response).unwrap(), &json!({ "ok": true }));
    }
}
