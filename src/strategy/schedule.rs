use std::time::Duration;
use tokio::time::Instant;

use crate::state::MaintenanceMark;

/// Why periodic maintenance is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueReason {
    Cycles(u64),
    Elapsed(Duration),
}

/// Decide whether a periodic sell-all should run now.
///
/// Due when `cycle` is a positive multiple of `cycle_interval` that hasn't
/// already triggered a run, or when more than `time_interval` has passed
/// since the last run. Before the first run is recorded only the cycle rule
/// applies.
pub fn maintenance_due(
    mark: &MaintenanceMark,
    cycle: u64,
    now: Instant,
    cycle_interval: u64,
    time_interval: Duration,
) -> Option<DueReason> {
    if cycle > 0 && cycle_interval > 0 && cycle % cycle_interval == 0 && cycle != mark.last_cycle {
        return Some(DueReason::Cycles(cycle));
    }

    let elapsed = now.saturating_duration_since(mark.last_run?);
    (elapsed > time_interval).then_some(DueReason::Elapsed(elapsed))
}
