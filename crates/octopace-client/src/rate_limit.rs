//! Request pacing for rate-limit groups
//!
//! Keeps calls below the remote service's rate limits by spacing them out
//! in time, rather than reacting to 429 responses after the fact.
//!
//! ## Architecture
//!
//! - [`Pacer`]: enforces a minimum interval between consecutive grants.
//!   Waiters are served in the order they asked.
//! - [`ThrottleRegistry`]: one lazily created [`Pacer`] per rate-limit
//!   group, plus an optional global pacer every call also passes through.
//!
//! Calls in different groups never delay each other, except through the
//! global pacer, which admits calls in the order they reserved.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use octopace_client::rate_limit::ThrottleRegistry;
//! use octopace_core::domain::GroupId;
//!
//! # async fn example() {
//! let registry = ThrottleRegistry::new(
//!     [(GroupId::search(), Duration::from_secs(2))],
//!     Duration::from_millis(720),
//!     None,
//! );
//! let permit = registry.acquire(&GroupId::search()).await;
//! // ... make API call ...
//! # let _ = permit;
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use octopace_core::config::RateLimitsConfig;
use octopace_core::domain::{DomainError, GroupId};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

// ============================================================================
// Pacer
// ============================================================================

/// Minimum-interval pacer for one gate.
///
/// Each caller reserves the next free slot under a short lock, then sleeps
/// until that slot outside the lock. Because reservation and bookkeeping
/// happen together, concurrent callers get distinct slots spaced by at
/// least `interval`, in the order they reserved.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    /// Earliest instant the next caller may be granted
    next: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Creates a pacer. The first caller is granted immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Mutex::new(None),
        }
    }

    /// Minimum spacing between two grants
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserves the next slot and returns the instant it starts.
    ///
    /// The slot is consumed even if the caller never waits for it.
    pub fn reserve(&self) -> Instant {
        let mut next = self.lock();
        let grant = earliest(Instant::now(), *next);
        *next = Some(grant + self.interval);
        grant
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for the next slot. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let requested = Instant::now();
        let grant = self.reserve();
        if grant > requested {
            sleep_until(grant).await;
        }
        grant.saturating_duration_since(requested)
    }

    /// How long a caller arriving now would wait
    pub fn time_until_available(&self) -> Duration {
        match *self.lock() {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }
}

/// Later of `now` and the next free slot
fn earliest(now: Instant, next: Option<Instant>) -> Instant {
    match next {
        Some(at) if at > now => at,
        _ => now,
    }
}

// ============================================================================
// ThrottlePermit
// ============================================================================

/// Proof that a call passed its pacing gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePermit {
    group: GroupId,
    waited: Duration,
}

impl ThrottlePermit {
    /// Group the permit was granted for
    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// Total time spent waiting on the group and global gates
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

// ============================================================================
// ThrottleRegistry
// ============================================================================

/// Per-group pacers plus an optional global pacer.
///
/// Thread-safe and designed to be shared via `Arc<ThrottleRegistry>`.
/// Every wrapped operation built from the same registry shares its pacers.
pub struct ThrottleRegistry {
    /// Configured per-group intervals
    intervals: BTreeMap<GroupId, Duration>,
    /// Interval for groups without their own setting
    default_interval: Duration,
    /// Pacers created on first use
    pacers: DashMap<GroupId, Arc<Pacer>>,
    global: Option<Pacer>,
}

impl std::fmt::Debug for ThrottleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleRegistry")
            .field("intervals", &self.intervals)
            .field("default_interval", &self.default_interval)
            .field("global", &self.global_interval())
            .finish()
    }
}

impl ThrottleRegistry {
    /// Creates a registry.
    ///
    /// A `global` of `None` or zero disables the global gate.
    pub fn new(
        intervals: impl IntoIterator<Item = (GroupId, Duration)>,
        default_interval: Duration,
        global: Option<Duration>,
    ) -> Self {
        Self {
            intervals: intervals.into_iter().collect(),
            default_interval,
            pacers: DashMap::new(),
            global: global.filter(|d| !d.is_zero()).map(Pacer::new),
        }
    }

    /// Builds a registry from configuration.
    ///
    /// Groups without an interval fall back to the interval of
    /// `default_group`.
    pub fn from_config(
        config: &RateLimitsConfig,
        default_group: &GroupId,
    ) -> Result<Self, DomainError> {
        let intervals = config
            .groups
            .iter()
            .map(|(name, ms)| Ok((GroupId::new(name.as_str())?, Duration::from_millis(*ms))))
            .collect::<Result<Vec<_>, DomainError>>()?;

        let default_interval = config
            .interval_for(default_group.as_str())
            .unwrap_or(Duration::ZERO);

        debug!(
            groups = intervals.len(),
            default_group = %default_group,
            default_interval_ms = default_interval.as_millis() as u64,
            global_ms = config.global,
            "Creating throttle registry"
        );
        Ok(Self::new(
            intervals,
            default_interval,
            config.global_interval(),
        ))
    }

    /// Interval applied to `group`
    pub fn interval_for(&self, group: &GroupId) -> Duration {
        self.intervals
            .get(group)
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// Interval of the global gate, if enabled
    pub fn global_interval(&self) -> Option<Duration> {
        self.global.as_ref().map(Pacer::interval)
    }

    /// Configured groups and groups that have been used, in name order
    pub fn groups(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self.intervals.keys().cloned().collect();
        for entry in self.pacers.iter() {
            if !self.intervals.contains_key(entry.key()) {
                groups.push(entry.key().clone());
            }
        }
        groups.sort();
        groups
    }

    /// Gets or creates the pacer for `group`.
    fn pacer(&self, group: &GroupId) -> Arc<Pacer> {
        if let Some(pacer) = self.pacers.get(group) {
            return Arc::clone(pacer.value());
        }
        let pacer = self
            .pacers
            .entry(group.clone())
            .or_insert_with(|| {
                let interval = self.interval_for(group);
                debug!(
                    group = %group,
                    interval_ms = interval.as_millis() as u64,
                    "Creating pacer for group"
                );
                Arc::new(Pacer::new(interval))
            });
        Arc::clone(pacer.value())
    }

    /// Reserves the start instant of the next call in `group`.
    ///
    /// With the global gate enabled, the group slot and the global slot are
    /// taken together under both locks (global, then group), so calls start
    /// in the order they reserved across all groups. The start is the
    /// earliest instant free in both gates.
    pub fn reserve(&self, group: &GroupId) -> Instant {
        let pacer = self.pacer(group);
        let Some(global) = &self.global else {
            return pacer.reserve();
        };

        let mut global_next = global.lock();
        let mut group_next = pacer.lock();
        let start = earliest(earliest(Instant::now(), *global_next), *group_next);
        *group_next = Some(start + pacer.interval());
        *global_next = Some(start + global.interval());
        start
    }

    /// Waits until a call in `group` may start.
    ///
    /// The reservation happens on the first poll, before any waiting.
    pub async fn acquire(&self, group: &GroupId) -> ThrottlePermit {
        let requested = Instant::now();
        let start = self.reserve(group);
        if start > requested {
            sleep_until(start).await;
        }
        let waited = start.saturating_duration_since(requested);

        trace!(group = %group, waited_ms = waited.as_millis() as u64, "Throttle permit granted");
        ThrottlePermit {
            group: group.clone(),
            waited,
        }
    }
}
