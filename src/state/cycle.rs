use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::time::Instant;

/// Process-wide loop bookkeeping: the single-flight guard, the AFK
/// suspension flag, the buy-cycle counter and when maintenance last ran.
#[derive(Debug, Default)]
pub struct CycleState {
    running: AtomicBool,
    /// Bumped on every successful `try_begin` so a stale guard can't
    /// release a newer iteration.
    epoch: AtomicU64,
    afk: AtomicBool,
    buy_cycles: AtomicU64,
    maintenance: Mutex<MaintenanceMark>,
}

/// Last time / cycle count at which periodic maintenance ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceMark {
    pub last_run: Option<Instant>,
    pub last_cycle: u64,
}

/// Held for the duration of one cycle iteration.
#[derive(Debug)]
pub struct RunGuard<'a> {
    state: &'a CycleState,
    epoch: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.state.epoch.load(Ordering::Acquire) == self.epoch {
            self.state.running.store(false, Ordering::Release);
        }
    }
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the loop. `None` if an iteration is already in flight or we're
    /// suspended for AFK handling.
    pub fn try_begin(&self) -> Option<RunGuard<'_>> {
        if self.is_suspended() {
            return None;
        }
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        Some(RunGuard { state: self, epoch })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Forcibly drop the single-flight claim (AFK preemption).
    pub fn release_running(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.running.store(false, Ordering::Release);
    }

    /// Set the AFK flag. Returns false if it was already set.
    pub fn suspend(&self) -> bool {
        !self.afk.swap(true, Ordering::AcqRel)
    }

    pub fn resume(&self) {
        self.afk.store(false, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.afk.load(Ordering::Acquire)
    }

    /// Count one successful buy-and-list cycle. Returns the new total.
    pub fn record_buy_cycle(&self) -> u64 {
        self.buy_cycles.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn buy_cycles(&self) -> u64 {
        self.buy_cycles.load(Ordering::Acquire)
    }

    pub fn maintenance_mark(&self) -> MaintenanceMark {
        *self.maintenance.lock()
    }

    pub fn mark_maintenance(&self, now: Instant, cycle: u64) {
        *self.maintenance.lock() = MaintenanceMark {
            last_run: Some(now),
            last_cycle: cycle,
        };
    }
}
