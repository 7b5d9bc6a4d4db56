//! Single-flight coordination of refresh exchanges.
//!
//! The coordinator is a two-phase state machine (`Idle`, `Refreshing`). The
//! first request that needs a new access token becomes the leader of a refresh
//! cycle and performs the exchange; every request that fails while the cycle
//! is open subscribes to the same `watch` channel and receives the leader's
//! outcome. The phase check and the transition happen under one lock with no
//! suspension point in between, so at most one exchange is in flight.
//!
//! A leader that is dropped before settling (its future cancelled) still
//! releases the cycle: waiters observe a failure and the phase returns to
//! `Idle`.

use secrecy::SecretString;
use std::{
    mem,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
};
use tokio::sync::watch;
use tracing::debug;

/// Result of one refresh cycle as fanned out to waiters.
pub(crate) type RefreshOutcome = Result<SecretString, String>;

type Slot = Option<RefreshOutcome>;

const ABANDONED: &str = "refresh abandoned before completion";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

enum RefreshState {
    Idle,
    Refreshing(watch::Sender<Slot>),
}

pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    cycles: AtomicU64,
}

pub(crate) enum Ticket<'a> {
    Leader(RefreshCycle<'a>),
    Waiter(RefreshWaiter),
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            cycles: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn phase(&self) -> RefreshPhase {
        match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::Refreshing(_) => RefreshPhase::Refreshing,
        }
    }

    /// Number of refresh cycles started since creation.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Requests currently parked on the open cycle.
    #[must_use]
    pub fn waiting(&self) -> usize {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            RefreshState::Idle => 0,
            RefreshState::Refreshing(tx) => tx.receiver_count(),
        }
    }

    /// Joins the open cycle, or opens one and returns its leader handle.
    pub(crate) fn join(&self) -> Ticket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let RefreshState::Refreshing(tx) = &*state {
            debug!("refresh in flight, queueing request");
            return Ticket::Waiter(RefreshWaiter { rx: tx.subscribe() });
        }

        let (tx, _) = watch::channel(None);
        *state = RefreshState::Refreshing(tx);
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(cycle, "refresh phase IDLE -> REFRESHING");

        Ticket::Leader(RefreshCycle {
            coordinator: self,
            settled: false,
        })
    }

    fn finish(&self, outcome: RefreshOutcome) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let RefreshState::Refreshing(tx) = mem::replace(&mut *state, RefreshState::Idle) {
            debug!(
                waiters = tx.receiver_count(),
                success = outcome.is_ok(),
                "refresh phase REFRESHING -> IDLE"
            );
            tx.send_replace(Some(outcome));
        }
    }
}

/// Leader handle for an open refresh cycle.
pub(crate) struct RefreshCycle<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshCycle<'_> {
    /// Publishes the outcome to every waiter and returns the phase to `Idle`.
    pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.finish(outcome);
    }
}

impl Drop for RefreshCycle<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.finish(Err(ABANDONED.to_string()));
        }
    }
}

pub(crate) struct RefreshWaiter {
    rx: watch::Receiver<Slot>,
}

impl RefreshWaiter {
    pub(crate) async fn wait(mut self) -> RefreshOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => slot
                .clone()
                .unwrap_or_else(|| Err(ABANDONED.to_string())),
            Err(_) => Err(ABANDONED.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn expect_leader(ticket: Ticket<'_>) -> RefreshCycle<'_> {
        match ticket {
            Ticket::Leader(cycle) => cycle,
            Ticket::Waiter(_) => panic!("expected to lead the refresh cycle"),
        }
    }

    fn expect_waiter(ticket: Ticket<'_>) -> RefreshWaiter {
        match ticket {
            Ticket::Waiter(waiter) => waiter,
            Ticket::Leader(_) => panic!("expected to wait on the refresh cycle"),
        }
    }

    #[tokio::test]
    async fn only_first_join_leads() {
        let coordinator = RefreshCoordinator::new();
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);

        let leader = expect_leader(coordinator.join());
        assert_eq!(coordinator.phase(), RefreshPhase::Refreshing);

        let first = expect_waiter(coordinator.join());
        let second = expect_waiter(coordinator.join());
        assert_eq!(coordinator.waiting(), 2);
        assert_eq!(coordinator.cycles(), 1);

        leader.settle(Ok(secret("t2")));
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);

        for waiter in [first, second] {
            let token = waiter.wait().await.unwrap();
            assert_eq!(token.expose_secret(), "t2");
        }
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let leader = expect_leader(coordinator.join());
        let waiters: Vec<_> = (0..3).map(|_| expect_waiter(coordinator.join())).collect();

        leader.settle(Err("refresh rejected".to_string()));

        for waiter in waiters {
            assert_eq!(waiter.wait().await.err(), Some("refresh rejected".to_string()));
        }
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn dropped_leader_releases_cycle() {
        let coordinator = RefreshCoordinator::new();
        let leader = expect_leader(coordinator.join());
        let waiter = expect_waiter(coordinator.join());

        drop(leader);

        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
        assert_eq!(waiter.wait().await.err(), Some(ABANDONED.to_string()));
    }

    #[tokio::test]
    async fn settled_cycle_allows_a_new_one() {
        let coordinator = RefreshCoordinator::new();
        expect_leader(coordinator.join()).settle(Ok(secret("t2")));
        expect_leader(coordinator.join()).settle(Ok(secret("t3")));
        assert_eq!(coordinator.cycles(), 2);
    }

    #[tokio::test]
    async fn waiter_parked_before_settle_is_woken() {
        let coordinator = RefreshCoordinator::new();
        let leader = expect_leader(coordinator.join());
        let waiter = expect_waiter(coordinator.join());

        let parked = tokio::spawn(waiter.wait());
        tokio::task::yield_now().await;
        leader.settle(Ok(secret("t2")));

        let token = parked.await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "t2");
    }
}
