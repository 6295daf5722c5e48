use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use scorebook_store::{LeaseGrant, LeaseStore, StoreError};

use crate::clock::Clock;
use crate::error::ReconcileError;

/// The held reconciliation lease. Released on [`LeaseGuard::release`], or
/// on drop as a fallback.
///
/// Every acquisition gets a fresh run id, so a live lease refuses a second
/// run even when both runs share an owner.
pub struct LeaseGuard<S: LeaseStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    owner: String,
    run_id: String,
    ttl: Duration,
    released: bool,
}

impl<S: LeaseStore> LeaseGuard<S> {
    /// Acquire the lease or fail with [`ReconcileError::InProgress`].
    ///
    /// The outer error is a storage failure; the inner one a refusal.
    pub fn acquire(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        owner: &str,
        ttl: Duration,
    ) -> Result<Result<Self, ReconcileError>, StoreError> {
        let now = clock.now();
        let run_id = Uuid::now_v7().to_string();
        match store.try_acquire(owner, &run_id, now, ttl)? {
            LeaseGrant::Held(held) => Ok(Err(ReconcileError::InProgress {
                owner: held.owner,
                expires_at: held.expires_at,
            })),
            grant => {
                if let LeaseGrant::TakenOver { previous, .. } = &grant {
                    warn!(
                        previous_owner = %previous.owner,
                        previous_run = %previous.run_id,
                        expired_at = %previous.expires_at,
                        "took over expired reconciliation lease"
                    );
                }
                debug!(owner, %run_id, "acquired reconciliation lease");
                Ok(Ok(Self {
                    store,
                    clock,
                    owner: owner.to_string(),
                    run_id,
                    ttl,
                    released: false,
                }))
            }
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Extend the lease. `Ok(false)` means another run has claimed it.
    pub fn renew(&self) -> Result<bool, StoreError> {
        self.store.renew(&self.run_id, self.clock.now(), self.ttl)
    }

    pub fn release(mut self) -> Result<(), StoreError> {
        self.released = true;
        if !self.store.release(&self.run_id)? {
            warn!(owner = %self.owner, run_id = %self.run_id, "lease was no longer held at release");
        }
        Ok(())
    }
}

impl<S: LeaseStore> Drop for LeaseGuard<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.store.release(&self.run_id) {
            warn!(owner = %self.owner, error = %e, "failed to release lease");
        }
    }
}
