//! Job scheduler that hands ACTIVE missions to simulation workers.
//!
//! Its one job is starting exactly one worker per ACTIVE mission: enqueue is
//! idempotent through the worker registry, start-up is retried under the
//! configured [`RetryPolicy`](crate::backoff::RetryPolicy), and concurrency is
//! bounded by a semaphore.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use survey_core::MissionError;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::loops::simulation::MissionWorker;
use crate::state::AppState;

/// Proof that a worker slot for a mission is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLease {
    pub mission_id: String,
    pub generation: u64,
}

/// Mission id to the generation of the worker currently holding it.
#[derive(Default)]
pub struct WorkerRegistry {
    leases: DashMap<String, u64>,
    next_generation: AtomicU64,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the worker slot for a mission, or `None` if one is already held.
    pub fn claim(&self, mission_id: &str) -> Option<WorkerLease> {
        match self.leases.entry(mission_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                entry.insert(generation);
                Some(WorkerLease {
                    mission_id: mission_id.to_string(),
                    generation,
                })
            }
        }
    }

    /// Release a lease. A stale lease never evicts a newer worker.
    pub fn release(&self, lease: &WorkerLease) -> bool {
        self.leases
            .remove_if(&lease.mission_id, |_, generation| *generation == lease.generation)
            .is_some()
    }

    pub fn is_running(&self, mission_id: &str) -> bool {
        self.leases.contains_key(mission_id)
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }
}

#[derive(Clone)]
pub struct JobScheduler {
    state: Arc<AppState>,
    permits: Arc<Semaphore>,
}

impl JobScheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        let permits = Arc::new(Semaphore::new(state.config().max_concurrent_workers));
        Self { state, permits }
    }

    /// Hand a mission to a worker. Returns false when one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, mission_id: &str) -> bool {
        let Some(lease) = self.state.workers().claim(mission_id) else {
            debug!(mission_id, "Worker already running, enqueue ignored");
            return false;
        };

        debug!(mission_id, generation = lease.generation, "Mission enqueued");
        tokio::spawn(run_job(
            Arc::clone(&self.state),
            Arc::clone(&self.permits),
            lease,
        ));
        true
    }
}

async fn run_job(state: Arc<AppState>, permits: Arc<Semaphore>, lease: WorkerLease) {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            warn!(mission_id = %lease.mission_id, "Worker pool closed");
            state.workers().release(&lease);
            return;
        }
    };

    if let Some(worker) = prepare_with_retry(&state, &lease).await {
        // Run on its own task so a panic surfaces as a JoinError here.
        match tokio::spawn(worker.run()).await {
            Ok(Ok(exit)) => {
                info!(mission_id = %lease.mission_id, ?exit, "Simulation worker finished");
            }
            Ok(Err(err)) => {
                error!(mission_id = %lease.mission_id, error = %err, "Simulation worker failed");
                state.recover_worker_failure(&lease.mission_id, &err);
            }
            Err(join_err) => {
                let err = MissionError::WorkerFailure(join_err.to_string());
                error!(mission_id = %lease.mission_id, error = %err, "Simulation worker crashed");
                state.recover_worker_failure(&lease.mission_id, &err);
            }
        }
    }

    state.workers().release(&lease);
}

async fn prepare_with_retry(state: &Arc<AppState>, lease: &WorkerLease) -> Option<MissionWorker> {
    let policy = &state.config().retry;
    let mut attempt = 1;

    loop {
        match MissionWorker::prepare(Arc::clone(state), lease.clone()) {
            Ok(worker) => return worker,
            Err(err) if err.is_retryable() && policy.should_retry(attempt) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    mission_id = %lease.mission_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Worker start failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                error!(
                    mission_id = %lease.mission_id,
                    attempt,
                    error = %err,
                    "Worker start failed, giving up"
                );
                state.recover_worker_failure(&lease.mission_id, &err);
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive_until_released() {
        let registry = WorkerRegistry::new();
        let lease = registry.claim("M1").unwrap();
        assert!(registry.claim("M1").is_none());
        assert!(registry.is_running("M1"));

        assert!(registry.release(&lease));
        assert!(!registry.is_running("M1"));
        assert!(registry.claim("M1").is_some());
    }

    #[test]
    fn stale_lease_does_not_evict_newer_worker() {
        let registry = WorkerRegistry::new();
        let old = registry.claim("M1").unwrap();
        registry.release(&old);
        let new = registry.claim("M1").unwrap();

        assert!(!registry.release(&old));
        assert!(registry.is_running("M1"));
        assert_ne!(old.generation, new.generation);
    }
}
