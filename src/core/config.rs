//! # Global tree configuration.
//!
//! Provides [`TreeConfig`], the centralized settings for a supervision [`Tree`](crate::Tree).
//!
//! Config is used in three places:
//! 1. **Tree creation**: `Tree::builder(config)` names the root group and sizes the bus
//! 2. **Priority bookkeeping**: groups and units clamp priorities through [`TreeConfig::clamp_priority`]
//! 3. **Shutdown**: `Tree::run_until_signal` waits at most [`TreeConfig::grace`]
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → treated as 1 (clamped)
//! - `min_priority > max_priority` → the range collapses to `max_priority`

use std::time::Duration;

/// Global configuration for a supervision tree.
///
/// ## Field semantics
/// - `root_name`: Name of the root ("system") group
/// - `min_priority` / `max_priority`: Legal priority range (inclusive)
/// - `norm_priority`: Priority given to units created outside any running unit
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `initial_capacity`: Initial capacity of each group's member/child collections
/// - `grace`: Maximum wait for units to terminate during shutdown
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling range checks across the codebase.
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Name of the root group.
    pub root_name: String,

    /// Lowest legal priority.
    pub min_priority: u8,

    /// Default priority for units created outside of any running unit.
    pub norm_priority: u8,

    /// Highest legal priority; also the root group's initial ceiling.
    pub max_priority: u8,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Initial capacity of member and child-group collections.
    ///
    /// Collections grow geometrically afterwards; the value is not observable.
    pub initial_capacity: usize,

    /// Maximum time to wait for units to terminate during shutdown.
    pub grace: Duration,
}

impl TreeConfig {
    /// Clamps `p` into the legal priority range.
    ///
    /// # Example
    /// ```
    /// use groupvisor::TreeConfig;
    ///
    /// let cfg = TreeConfig::default();
    /// assert_eq!(cfg.clamp_priority(0), 1);
    /// assert_eq!(cfg.clamp_priority(7), 7);
    /// assert_eq!(cfg.clamp_priority(200), 10);
    /// ```
    #[inline]
    pub fn clamp_priority(&self, p: u8) -> u8 {
        let min = self.min_priority.min(self.max_priority);
        p.clamp(min, self.max_priority)
    }

    /// Returns the normal priority, clamped into the legal range.
    #[inline]
    pub fn default_priority(&self) -> u8 {
        self.clamp_priority(self.norm_priority)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for TreeConfig {
    /// Default configuration:
    ///
    /// - `root_name = "system"`
    /// - priorities `1..=10`, normal `5`
    /// - `bus_capacity = 1024`
    /// - `initial_capacity = 4`
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            root_name: "system".to_string(),
            min_priority: 1,
            norm_priority: 5,
            max_priority: 10,
            bus_capacity: 1024,
            initial_capacity: 4,
            grace: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_range_collapses_to_max() {
        let cfg = TreeConfig {
            min_priority: 9,
            max_priority: 3,
            ..TreeConfig::default()
        };
        assert_eq!(cfg.clamp_priority(1), 3);
        assert_eq!(cfg.clamp_priority(8), 3);
    }

    #[test]
    fn bus_capacity_never_zero() {
        let cfg = TreeConfig {
            bus_capacity: 0,
            ..TreeConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
