//! Coordination of credential renewals across concurrent calls.
//!
//! When several calls fail with 401 at about the same time, each of them
//! would otherwise hit the renewal endpoint, and the last response to arrive
//! would silently overwrite the credentials stored by the others. Under
//! [`RenewalPolicy::Shared`] renewals are serialized behind one lock and
//! numbered by a generation counter: a call remembers the generation it sent
//! its request under, and if a renewal has completed since then it reuses
//! that outcome instead of renewing again.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// How concurrent renewals are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RenewalPolicy {
    /// One renewal at a time; calls that failed under an older credential
    /// reuse the newest outcome.
    #[default]
    Shared,

    /// Every failing call renews on its own. Concurrent renewals race and the
    /// last one to finish wins.
    PerCall,
}

/// Result of one renewal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// New credentials are stored.
    Renewed,

    /// There was no refresh token; credentials were cleared.
    MissingRefresh,

    /// The renewal endpoint failed; credentials were cleared.
    Failed(String),
}

/// Serializes renewals and memoizes the latest outcome.
#[derive(Debug)]
pub struct RenewalCoordinator {
    policy: RenewalPolicy,
    generation: AtomicU64,
    last_outcome: Mutex<Option<RenewalOutcome>>,
}

impl RenewalCoordinator {
    pub fn new(policy: RenewalPolicy) -> Self {
        Self {
            policy,
            generation: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    /// Number of renewals completed so far.
    ///
    /// Read this before loading the credential a request is sent with.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Renew credentials for a call that was sent under generation `observed`.
    ///
    /// `renew` performs the actual renewal and is only invoked when no newer
    /// outcome is available (always, under [`RenewalPolicy::PerCall`]).
    pub async fn renew<F, Fut>(&self, observed: u64, renew: F) -> RenewalOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RenewalOutcome>,
    {
        match self.policy {
            RenewalPolicy::PerCall => {
                let outcome = renew().await;
                self.generation.fetch_add(1, Ordering::AcqRel);
                outcome
            }
            RenewalPolicy::Shared => {
                let mut last = self.last_outcome.lock().await;

                if self.generation() != observed {
                    if let Some(outcome) = last.as_ref() {
                        tracing::debug!(
                            observed,
                            current = self.generation(),
                            "Reusing outcome of a concurrent renewal"
                        );
                        return outcome.clone();
                    }
                }

                let outcome = renew().await;
                *last = Some(outcome.clone());
                self.generation.fetch_add(1, Ordering::AcqRel);
                outcome
            }
        }
    }
}

impl RenewalCoordinator {
    /// Forget the memoized outcome and start a new generation.
    ///
    /// Call whenever credentials are replaced outside renewal (login,
    /// logout): a call that failed under the old credentials then renews
    /// against the new ones instead of reusing an outcome that predates them.
    pub async fn reset(&self) {
        let mut last = self.last_outcome.lock().await;
        *last = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for RenewalCoordinator {
    fn default() -> Self {
        Self::new(RenewalPolicy::default())
    }
}
