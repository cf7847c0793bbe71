//! # Path Cache
//!
//! **LRU plus timeout reuse of computed paths**
//!
//! Pathfinding dominates the simulation budget when many units travel at
//! once. Requests quantize to a coarse grid so "close enough" start and
//! goal pairs share one cached path. Entries go stale on a frame timeout
//! because the world keeps changing after a path was computed, and the
//! least-recently-used entry makes room when the cache is full.
//!
//! The cache never computes paths itself. The host looks up first, runs
//! its own pathfinder on a miss, then stores the result:
//!
//! ```rust,ignore
//! if let Some(path) = cache.lookup(unit_id, start, goal, layer, locomotor) {
//!     return path;
//! }
//! let waypoints = pathfinder.find(start, goal);
//! cache.store(unit_id, start, goal, layer, locomotor, waypoints.clone());
//! ```

use crate::error::{AiError, AiResult};
use crate::types::WorldPos;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A cached waypoint list, shared between users without copying.
pub type SharedPath = Arc<[WorldPos]>;

/// Integer cell on the cache grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    /// Cell column.
    pub x: i32,
    /// Cell row.
    pub y: i32,
}

/// Path space a request runs in. Paths in different layers never alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathLayer {
    /// Ground movement, obstacle-aware.
    Ground,
    /// Air movement.
    Air,
}

/// Identity of a cached path after quantization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathKey {
    /// Quantized start cell.
    pub start: GridCell,
    /// Quantized goal cell.
    pub goal: GridCell,
    /// Path space.
    pub layer: PathLayer,
    /// Locomotor class, or the requester id when sharing is disabled.
    pub discriminator: u32,
}

/// Balance knobs for the path cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathCacheConfig {
    /// Master switch. Disabled means every lookup misses and every store
    /// is ignored.
    pub enabled: bool,
    /// Entry cap. The least-recently-used entry is evicted at capacity.
    pub max_entries: usize,
    /// Frames after creation before a cached path is considered stale.
    pub path_timeout_frames: u32,
    /// World units per cache grid cell.
    pub cell_size: f32,
    /// Frames between stale-entry sweeps.
    pub cleanup_interval_frames: u32,
    /// Whether different units may share one cached path.
    pub share_across_units: bool,
    /// Whether map-change notifications clear the cache.
    pub invalidate_on_map_changes: bool,
}

impl Default for PathCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
            // 5 seconds at the 30 Hz simulation tick.
            path_timeout_frames: 150,
            cell_size: 10.0,
            cleanup_interval_frames: 30,
            share_across_units: true,
            invalidate_on_map_changes: true,
        }
    }
}

impl PathCacheConfig {
    /// Checks the knobs for values the cache cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> AiResult<()> {
        if self.max_entries == 0 {
            return Err(AiError::InvalidConfig(
                "max entries must be at least 1".to_string(),
            ));
        }
        if self.cell_size <= 0.0 {
            return Err(AiError::InvalidConfig(
                "cell size must be positive".to_string(),
            ));
        }
        if self.path_timeout_frames == 0 {
            return Err(AiError::InvalidConfig(
                "path timeout must be at least 1 frame".to_string(),
            ));
        }
        if self.cleanup_interval_frames == 0 {
            return Err(AiError::InvalidConfig(
                "cleanup interval must be at least 1 frame".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters describing cache effectiveness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathCacheStats {
    /// Entries currently cached.
    pub current_size: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries removed to make room.
    pub evicted: u64,
    /// Entries removed because they went stale.
    pub expired: u64,
    /// Total times cached paths were handed out.
    pub total_reuse: u64,
}

impl PathCacheStats {
    /// Hit share of all lookups, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f32 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f32 / lookups as f32 * 100.0
    }
}

struct PathEntry {
    path: SharedPath,
    creation_frame: u32,
    last_access_frame: u32,
    use_count: u32,
}

impl PathEntry {
    fn is_fresh(&self, current_frame: u32, timeout_frames: u32) -> bool {
        // Staleness is age since creation, not since last use. The world
        // keeps diverging from the snapshot the path was computed against
        // no matter how often the path gets reused.
        current_frame.saturating_sub(self.creation_frame) < timeout_frames
    }
}

/// LRU plus timeout cache of computed paths.
///
/// Single-threaded, driven from the simulation tick. Call
/// [`begin_frame`](Self::begin_frame) once per tick before any lookups so
/// staleness and access times use the right clock.
pub struct PathCache {
    config: PathCacheConfig,
    entries: HashMap<PathKey, PathEntry>,
    current_frame: u32,
    last_cleanup_frame: u32,
    stats: PathCacheStats,
}

impl PathCache {
    /// Creates a cache sized for its entry cap.
    #[must_use]
    pub fn new(config: PathCacheConfig) -> Self {
        let capacity = config.max_entries;
        Self {
            config,
            entries: HashMap::with_capacity(capacity),
            current_frame: 0,
            last_cleanup_frame: 0,
            stats: PathCacheStats::default(),
        }
    }

    /// Advances the cache clock and sweeps stale entries periodically.
    pub fn begin_frame(&mut self, frame: u32) {
        self.current_frame = frame;
        if frame.saturating_sub(self.last_cleanup_frame) >= self.config.cleanup_interval_frames {
            self.sweep_expired();
            self.last_cleanup_frame = frame;
        }
    }

    /// Tries to answer a path request from the cache.
    ///
    /// A stale entry found here is dropped on the spot and reported as a
    /// miss. `requester` only matters when sharing across units is off.
    pub fn lookup(
        &mut self,
        requester: u32,
        start: WorldPos,
        goal: WorldPos,
        layer: PathLayer,
        locomotor: u32,
    ) -> Option<SharedPath> {
        if !self.config.enabled {
            return None;
        }
        let key = self.key_for(requester, start, goal, layer, locomotor);
        let frame = self.current_frame;
        let timeout = self.config.path_timeout_frames;

        let mut stale = false;
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.is_fresh(frame, timeout) {
                entry.last_access_frame = frame;
                entry.use_count += 1;
                self.stats.hits += 1;
                self.stats.total_reuse += 1;
                return Some(Arc::clone(&entry.path));
            }
            stale = true;
        }
        if stale {
            self.entries.remove(&key);
            self.stats.expired += 1;
        }
        self.stats.misses += 1;
        None
    }

    /// Stores a computed path, evicting the least-recently-used entry if
    /// the cache is full. Storing over an existing key replaces it.
    pub fn store(
        &mut self,
        requester: u32,
        start: WorldPos,
        goal: WorldPos,
        layer: PathLayer,
        locomotor: u32,
        waypoints: Vec<WorldPos>,
    ) {
        if !self.config.enabled {
            return;
        }
        let key = self.key_for(requester, start, goal, layer, locomotor);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            PathEntry {
                path: waypoints.into(),
                creation_frame: self.current_frame,
                last_access_frame: self.current_frame,
                use_count: 0,
            },
        );
    }

    /// Drops every cached path.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Drops entries whose start or goal cell lies within `radius` world
    /// units of `pos`. Called when terrain or obstacles change locally.
    pub fn invalidate_near(&mut self, pos: WorldPos, radius: f32) {
        let center = self.world_to_cell(pos);
        #[allow(clippy::cast_possible_truncation)]
        let radius_cells = (radius / self.config.cell_size).ceil() as i32;
        let limit_sq = i64::from(radius_cells) * i64::from(radius_cells);
        self.entries.retain(|key, _| {
            cell_distance_sq(key.start, center) > limit_sq
                && cell_distance_sq(key.goal, center) > limit_sq
        });
    }

    /// Host notification that the map changed fundamentally.
    pub fn on_map_changed(&mut self) {
        if self.config.invalidate_on_map_changes {
            self.invalidate_all();
        }
    }

    /// Clears entries, clock and counters. Keeps the config.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.current_frame = 0;
        self.last_cleanup_frame = 0;
        self.stats = PathCacheStats::default();
    }

    /// Zeroes the counters without touching cached entries.
    pub fn reset_stats(&mut self) {
        self.stats = PathCacheStats::default();
    }

    /// Counter snapshot with the live entry count filled in.
    #[must_use]
    pub fn stats(&self) -> PathCacheStats {
        let mut stats = self.stats;
        stats.current_size = self.entries.len();
        stats
    }

    /// Entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runtime master switch.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Whether caching is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Current balance values.
    #[must_use]
    pub fn config(&self) -> &PathCacheConfig {
        &self.config
    }

    /// Replaces the balance values, evicting down to the new cap if it
    /// shrank below the current entry count.
    pub fn set_config(&mut self, config: PathCacheConfig) {
        self.config = config;
        while self.entries.len() > self.config.max_entries {
            self.evict_lru();
        }
    }

    fn sweep_expired(&mut self) {
        let frame = self.current_frame;
        let timeout = self.config.path_timeout_frames;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.is_fresh(frame, timeout));
        self.stats.expired += (before - self.entries.len()) as u64;
    }

    fn evict_lru(&mut self) {
        // Linear scan. The cap is small and eviction only happens on a
        // store that found the cache full.
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_access_frame, entry.use_count))
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evicted += 1;
        }
    }

    fn key_for(
        &self,
        requester: u32,
        start: WorldPos,
        goal: WorldPos,
        layer: PathLayer,
        locomotor: u32,
    ) -> PathKey {
        PathKey {
            start: self.world_to_cell(start),
            goal: self.world_to_cell(goal),
            layer,
            discriminator: if self.config.share_across_units {
                locomotor
            } else {
                requester
            },
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn world_to_cell(&self, pos: WorldPos) -> GridCell {
        GridCell {
            x: (pos.x / self.config.cell_size).floor() as i32,
            y: (pos.y / self.config.cell_size).floor() as i32,
        }
    }
}

fn cell_distance_sq(a: GridCell, b: GridCell) -> i64 {
    let dx = i64::from(a.x) - i64::from(b.x);
    let dy = i64::from(a.y) - i64::from(b.y);
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUND: PathLayer = PathLayer::Ground;

    fn straight_path(start: WorldPos, goal: WorldPos) -> Vec<WorldPos> {
        vec![start, goal]
    }

    #[test]
    fn test_store_then_lookup_hits() {
        let mut cache = PathCache::new(PathCacheConfig::default());
        cache.begin_frame(0);

        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));

        let path = cache.lookup(1, start, goal, GROUND, 0).expect("cached path");
        assert_eq!(path.len(), 2);

        let stats = cache.stats();
        assert_eq!(stats.current_size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total_reuse, 1);
    }

    #[test]
    fn test_nearby_requests_share_one_path() {
        let mut cache = PathCache::new(PathCacheConfig::default());
        cache.begin_frame(0);

        // Default cell size is 10: both starts quantize to cell (1, 0) and
        // both goals to cell (9, 9).
        let start_a = WorldPos::new(12.0, 7.0);
        let start_b = WorldPos::new(19.9, 2.0);
        let goal_a = WorldPos::new(91.0, 95.0);
        let goal_b = WorldPos::new(98.0, 90.5);

        cache.store(1, start_a, goal_a, GROUND, 0, straight_path(start_a, goal_a));
        assert!(cache.lookup(2, start_b, goal_b, GROUND, 0).is_some());
    }

    #[test]
    fn test_layers_and_locomotors_do_not_alias() {
        let mut cache = PathCache::new(PathCacheConfig::default());
        cache.begin_frame(0);

        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));

        assert!(cache.lookup(1, start, goal, PathLayer::Air, 0).is_none());
        assert!(cache.lookup(1, start, goal, GROUND, 7).is_none());
        assert!(cache.lookup(1, start, goal, GROUND, 0).is_some());
    }

    #[test]
    fn test_sharing_off_keys_by_requester() {
        let config = PathCacheConfig {
            share_across_units: false,
            ..PathCacheConfig::default()
        };
        let mut cache = PathCache::new(config);
        cache.begin_frame(0);

        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));

        assert!(cache.lookup(2, start, goal, GROUND, 0).is_none());
        assert!(cache.lookup(1, start, goal, GROUND, 0).is_some());
    }

    #[test]
    fn test_lru_eviction_prefers_least_recently_used() {
        let config = PathCacheConfig {
            max_entries: 2,
            ..PathCacheConfig::default()
        };
        let mut cache = PathCache::new(config);

        let a = (WorldPos::new(5.0, 5.0), WorldPos::new(95.0, 5.0));
        let b = (WorldPos::new(205.0, 5.0), WorldPos::new(295.0, 5.0));
        let c = (WorldPos::new(405.0, 5.0), WorldPos::new(495.0, 5.0));

        cache.begin_frame(0);
        cache.store(1, a.0, a.1, GROUND, 0, straight_path(a.0, a.1));
        cache.begin_frame(1);
        cache.store(1, b.0, b.1, GROUND, 0, straight_path(b.0, b.1));

        // Touch A so B becomes the least recently used.
        cache.begin_frame(2);
        assert!(cache.lookup(1, a.0, a.1, GROUND, 0).is_some());

        cache.begin_frame(3);
        cache.store(1, c.0, c.1, GROUND, 0, straight_path(c.0, c.1));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(1, a.0, a.1, GROUND, 0).is_some());
        assert!(cache.lookup(1, b.0, b.1, GROUND, 0).is_none());
        assert!(cache.lookup(1, c.0, c.1, GROUND, 0).is_some());
        assert_eq!(cache.stats().evicted, 1);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let config = PathCacheConfig {
            max_entries: 3,
            ..PathCacheConfig::default()
        };
        let mut cache = PathCache::new(config);
        cache.begin_frame(0);

        for i in 0u8..10 {
            let x = f32::from(i) * 100.0;
            let start = WorldPos::new(x, 0.0);
            let goal = WorldPos::new(x, 500.0);
            cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.stats().evicted, 7);
    }

    #[test]
    fn test_stale_entry_expires_at_lookup() {
        // Long cleanup interval keeps the sweep out of the way.
        let config = PathCacheConfig {
            cleanup_interval_frames: 10_000,
            ..PathCacheConfig::default()
        };
        let mut cache = PathCache::new(config);

        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);
        cache.begin_frame(0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));

        // One frame inside the timeout still hits.
        cache.begin_frame(149);
        assert!(cache.lookup(1, start, goal, GROUND, 0).is_some());

        cache.begin_frame(150);
        assert!(cache.lookup(1, start, goal, GROUND, 0).is_none());

        let stats = cache.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.current_size, 0);
    }

    #[test]
    fn test_periodic_sweep_removes_stale_entries() {
        let mut cache = PathCache::new(PathCacheConfig::default());

        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);
        cache.begin_frame(0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));

        // Frame 150 is both past the timeout and past the sweep interval.
        cache.begin_frame(150);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn test_invalidate_near_is_selective() {
        let mut cache = PathCache::new(PathCacheConfig::default());
        cache.begin_frame(0);

        let near = (WorldPos::new(5.0, 5.0), WorldPos::new(15.0, 15.0));
        let far = (WorldPos::new(500.0, 500.0), WorldPos::new(600.0, 600.0));
        cache.store(1, near.0, near.1, GROUND, 0, straight_path(near.0, near.1));
        cache.store(1, far.0, far.1, GROUND, 0, straight_path(far.0, far.1));

        cache.invalidate_near(WorldPos::new(0.0, 0.0), 30.0);

        assert!(cache.lookup(1, near.0, near.1, GROUND, 0).is_none());
        assert!(cache.lookup(1, far.0, far.1, GROUND, 0).is_some());
    }

    #[test]
    fn test_map_change_honors_config_flag() {
        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);

        let mut cache = PathCache::new(PathCacheConfig::default());
        cache.begin_frame(0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));
        cache.on_map_changed();
        assert!(cache.is_empty());

        let config = PathCacheConfig {
            invalidate_on_map_changes: false,
            ..PathCacheConfig::default()
        };
        let mut cache = PathCache::new(config);
        cache.begin_frame(0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));
        cache.on_map_changed();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disabled_cache_is_inert() {
        let config = PathCacheConfig {
            enabled: false,
            ..PathCacheConfig::default()
        };
        let mut cache = PathCache::new(config);
        cache.begin_frame(0);

        let start = WorldPos::new(5.0, 5.0);
        let goal = WorldPos::new(95.0, 95.0);
        cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));

        assert!(cache.is_empty());
        assert!(cache.lookup(1, start, goal, GROUND, 0).is_none());
        assert_eq!(cache.stats(), PathCacheStats::default());
    }

    #[test]
    fn test_shrinking_cap_evicts_down() {
        let mut cache = PathCache::new(PathCacheConfig::default());
        cache.begin_frame(0);

        for i in 0u8..5 {
            let x = f32::from(i) * 100.0;
            let start = WorldPos::new(x, 0.0);
            let goal = WorldPos::new(x, 500.0);
            cache.store(1, start, goal, GROUND, 0, straight_path(start, goal));
        }
        assert_eq!(cache.len(), 5);

        let config = PathCacheConfig {
            max_entries: 2,
            ..PathCacheConfig::default()
        };
        cache.set_config(config);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_hit_rate() {
        let mut stats = PathCacheStats::default();
        assert!(stats.hit_rate().abs() < f32::EPSILON);

        stats.hits = 3;
        stats.misses = 1;
        assert!((stats.hit_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        assert!(PathCacheConfig::default().validate().is_ok());

        let config = PathCacheConfig {
            max_entries: 0,
            ..PathCacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AiError::InvalidConfig(_))
        ));

        let config = PathCacheConfig {
            cell_size: 0.0,
            ..PathCacheConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PathCacheConfig {
            path_timeout_frames: 0,
            ..PathCacheConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PathCacheConfig {
            cleanup_interval_frames: 0,
            ..PathCacheConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
