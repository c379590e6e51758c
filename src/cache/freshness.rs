//! Time-based staleness policy.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Fetch stamp plus the stale time it is judged against.
///
/// Data is fresh while `now - fetched_at < stale_time`. Staleness is only
/// checked on access; nothing is evicted eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
  stale_time: Duration,
  fetched_at: Option<Instant>,
}

impl Freshness {
  /// A never-fetched stamp with the given stale time.
  pub fn new(stale_time: Duration) -> Self {
    Self {
      stale_time,
      fetched_at: None,
    }
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  pub fn fetched_at(&self) -> Option<Instant> {
    self.fetched_at
  }

  pub fn is_fresh_at(&self, now: Instant) -> bool {
    match self.fetched_at {
      Some(at) => now.saturating_duration_since(at) < self.stale_time,
      None => false,
    }
  }

  pub fn is_fresh(&self) -> bool {
    self.is_fresh_at(Instant::now())
  }

  pub fn stamp(&mut self, at: Instant) {
    self.fetched_at = Some(at);
  }

  pub fn invalidate(&mut self) {
    self.fetched_at = None;
  }

  /// Stamp from a wall-clock time recorded by an earlier process.
  ///
  /// The stamp is back-dated by the snapshot's age. If the monotonic clock
  /// cannot go back that far the stamp is left unset (stale).
  pub fn stamp_from_wall_clock(&mut self, cached_at: DateTime<Utc>) {
    // A snapshot from the future counts as brand new
    let age = (Utc::now() - cached_at).to_std().unwrap_or_default();
    self.fetched_at = Instant::now().checked_sub(age);
  }
}
