//! Mining sessions
//!
//! One session is one in-flight nonce search. The search runs on a blocking
//! worker thread against a frozen template; the control loop cancels it by
//! raising a shared flag and then joins the worker before touching any
//! working state.

use crate::domain::BlockTemplate;
use crate::metrics::Metrics;
use crate::ports::PowEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Cooperative cancellation flag shared with the search worker
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    /// Create a signal that is not yet raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the search to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a session ended
#[derive(Clone, Debug)]
pub enum SessionOutcome {
    /// The engine found a nonce for the template
    Found {
        /// Round the session belonged to
        round: u64,
        /// Searched template
        template: Arc<BlockTemplate>,
        /// Sealing nonce
        nonce: u64,
    },
    /// The engine gave up without being cancelled
    Exhausted {
        /// Round the session belonged to
        round: u64,
    },
    /// Cancelled, or the worker panicked
    Cancelled {
        /// Round the session belonged to
        round: u64,
    },
}

/// Keeps the live-session counter honest whatever way the worker exits
struct ActiveSessionGuard(Arc<Metrics>);

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        self.0.session_exited();
    }
}

/// An in-flight nonce search
///
/// Dropping a session raises its cancel flag without joining the worker.
pub struct MiningSession {
    round: u64,
    cancel: CancelSignal,
    template: Arc<BlockTemplate>,
    handle: JoinHandle<Option<u64>>,
}

impl MiningSession {
    /// Start searching `template` on a blocking worker
    pub fn spawn(
        round: u64,
        engine: Arc<dyn PowEngine>,
        template: Arc<BlockTemplate>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let previous = metrics.session_entered();
        if let Err(e) = crate::domain::check_no_active_session(previous) {
            error!(round, error = %e, "[pow-miner] Invariant violated");
        }
        debug_assert!(previous == 0, "overlapping mining sessions");

        let guard = ActiveSessionGuard(metrics);
        let cancel = CancelSignal::new();
        let worker_cancel = cancel.clone();
        let worker_template = Arc::clone(&template);

        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            engine.search(&worker_template, &worker_cancel)
        });

        Self {
            round,
            cancel,
            template,
            handle,
        }
    }

    /// Round this session belongs to
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Wait for the worker to finish on its own
    ///
    /// Cancel-safe: dropping the future leaves the session intact. Once this
    /// returns the session must be discarded.
    pub async fn wait(&mut self) -> SessionOutcome {
        let round = self.round;
        match (&mut self.handle).await {
            Ok(Some(nonce)) if !self.cancel.is_cancelled() => SessionOutcome::Found {
                round,
                template: Arc::clone(&self.template),
                nonce,
            },
            Ok(Some(_)) => SessionOutcome::Cancelled { round },
            Ok(None) if self.cancel.is_cancelled() => SessionOutcome::Cancelled { round },
            Ok(None) => SessionOutcome::Exhausted { round },
            Err(e) => {
                error!(round, error = %e, "[pow-miner] Mining worker failed");
                SessionOutcome::Cancelled { round }
            }
        }
    }

    /// Cancel the search and wait for the worker's exit acknowledgment
    ///
    /// A nonce found concurrently with the cancellation is discarded.
    pub async fn cancel_and_join(mut self) {
        self.cancel.cancel();
        match (&mut self.handle).await {
            Ok(late) => debug!(
                round = self.round,
                discarded_nonce = late.is_some(),
                "[pow-miner] Mining session joined"
            ),
            Err(e) => error!(
                round = self.round,
                error = %e,
                "[pow-miner] Mining worker failed"
            ),
        }
    }
}

impl Drop for MiningSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockHeader, WorldState};
    use std::time::Duration;

    /// Spins until cancelled, or returns immediately when `nonce` is set.
    struct TestEngine {
        nonce: Option<u64>,
        panic: bool,
    }

    impl PowEngine for TestEngine {
        fn search(&self, _template: &BlockTemplate, cancel: &CancelSignal) -> Option<u64> {
            if self.panic {
                panic!("engine blew up");
            }
            if self.nonce.is_some() {
                return self.nonce;
            }
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            None
        }

        fn verify(&self, _header: &BlockHeader) -> bool {
            true
        }

        fn set_turbo(&self, _on: bool) {}

        fn turbo(&self) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            "test"
        }
    }

    fn template() -> Arc<BlockTemplate> {
        Arc::new(BlockTemplate::new(BlockHeader::default(), WorldState::new()))
    }

    fn engine(nonce: Option<u64>) -> Arc<dyn PowEngine> {
        Arc::new(TestEngine { nonce, panic: false })
    }

    #[test]
    fn test_cancel_signal() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());
        signal.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_found_nonce() {
        let metrics = Arc::new(Metrics::new());
        let mut session = MiningSession::spawn(1, engine(Some(9)), template(), metrics.clone());

        match session.wait().await {
            SessionOutcome::Found { round, nonce, .. } => {
                assert_eq!(round, 1);
                assert_eq!(nonce, 9);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(metrics.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_cancel_and_join_acknowledges() {
        let metrics = Arc::new(Metrics::new());
        let session = MiningSession::spawn(2, engine(None), template(), metrics.clone());
        assert_eq!(metrics.active_sessions(), 1);

        tokio::time::timeout(Duration::from_secs(5), session.cancel_and_join())
            .await
            .expect("worker did not acknowledge cancellation");

        assert_eq!(metrics.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_dropped_session_stops_its_worker() {
        let metrics = Arc::new(Metrics::new());
        let session = MiningSession::spawn(5, engine(None), template(), metrics.clone());
        assert_eq!(metrics.active_sessions(), 1);

        drop(session);

        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.active_sessions() != 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("worker kept spinning after the session was dropped");
    }

    #[tokio::test]
    async fn test_exhausted_search() {
        struct Exhausted;
        impl PowEngine for Exhausted {
            fn search(&self, _t: &BlockTemplate, _c: &CancelSignal) -> Option<u64> {
                None
            }
            fn verify(&self, _h: &BlockHeader) -> bool {
                false
            }
            fn set_turbo(&self, _on: bool) {}
            fn turbo(&self) -> bool {
                false
            }
            fn name(&self) -> &'static str {
                "exhausted"
            }
        }

        let metrics = Arc::new(Metrics::new());
        let mut session = MiningSession::spawn(3, Arc::new(Exhausted), template(), metrics);
        assert!(matches!(
            session.wait().await,
            SessionOutcome::Exhausted { round: 3 }
        ));
    }

    #[tokio::test]
    async fn test_panicked_worker_counts_as_cancelled() {
        let metrics = Arc::new(Metrics::new());
        let panicking: Arc<dyn PowEngine> = Arc::new(TestEngine {
            nonce: None,
            panic: true,
        });
        let mut session = MiningSession::spawn(4, panicking, template(), metrics.clone());

        assert!(matches!(
            session.wait().await,
            SessionOutcome::Cancelled { round: 4 }
        ));
        assert_eq!(metrics.active_sessions(), 0);
    }
}
