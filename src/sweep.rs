//! Periodic eviction keeping long-run index memory bounded.
//!
//! The sweep task runs on a fixed period for the engine's lifetime and is
//! aborted on disposal. Readers are never blocked: they iterate `Arc`
//! snapshots, and entries replaced since the snapshot was taken are left
//! alone.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::store::{IndexStore, IndexedFile};

/// Time between sweeps.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Entries indexed longer ago than this are evicted regardless of pressure.
pub const STALE_AFTER: Duration = Duration::from_secs(30 * 60);

/// Entry count the sweep shrinks an over-full store toward, oldest first.
pub const SOFT_TARGET: usize = 4000;

/// Spawns the recurring sweep task over the given store.
///
/// The returned handle must be aborted on engine disposal so the timer does
/// not keep the process alive.
pub fn spawn_sweeper(store: Arc<IndexStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + SWEEP_PERIOD, SWEEP_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = sweep(&store, Instant::now());
            if evicted > 0 {
                log::debug!("sweep evicted={} remaining={}", evicted, store.len());
            }
        }
    })
}

/// One sweep over the store with the default thresholds.
pub fn sweep(store: &IndexStore, now: Instant) -> usize {
    sweep_with(store, now, STALE_AFTER, SOFT_TARGET)
}

/// Evicts stale entries, then shrinks toward `soft_target` oldest-first.
/// Returns the number of evicted entries.
///
/// Access recency is not tracked for indexed entries, so over-target
/// shrinking orders by index age, not by last use.
fn sweep_with(
    store: &IndexStore,
    now: Instant,
    stale_after: Duration,
    soft_target: usize,
) -> usize {
    let snapshot = store.snapshot();
    let mut evicted = 0usize;

    let mut remaining: Vec<&Arc<IndexedFile>> = Vec::with_capacity(snapshot.len());
    for entry in &snapshot {
        if now.saturating_duration_since(entry.indexed_at) >= stale_after {
            if store.remove_entry(entry) {
                evicted += 1;
            }
        } else {
            remaining.push(entry);
        }
    }

    let excess = store.len().saturating_sub(soft_target);
    if excess > 0 {
        remaining.sort_by_key(|entry| entry.indexed_at);
        for entry in remaining.into_iter().take(excess) {
            if store.remove_entry(entry) {
                evicted += 1;
            }
        }
    }

    evicted
}
