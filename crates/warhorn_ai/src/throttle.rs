//! # AI Update Throttle
//!
//! **Update level-of-detail for large unit counts**
//!
//! Far-away idle units do not need fresh decisions every frame. Each frame
//! the simulation asks, per unit, whether its full AI update should run.
//! The answer is keyed to distance from the observer and to combat state,
//! and the surviving updates are staggered across frames by unit id so
//! they spread evenly instead of bunching on one frame.
//!
//! When adaptive throttling is on, a rolling average of recent frame times
//! stretches the non-critical intervals whenever the frame budget is
//! blown, and relaxes them again once the average recovers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warhorn_ai::{ThrottleConfig, UpdateThrottle};
//!
//! let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
//! throttle.begin_frame(frame, camera_pos);
//! for unit in &units {
//!     if throttle.should_update(&unit.snapshot()) {
//!         unit.run_ai_update();
//!     }
//! }
//! throttle.record_frame_time(frame_ms);
//! ```

use crate::error::{AiError, AiResult};
use crate::types::WorldPos;
use serde::{Deserialize, Serialize};

/// Number of update priority levels.
pub const PRIORITY_COUNT: usize = 5;

/// Number of samples in the adaptive frame-time ring.
const FRAME_TIME_SAMPLES: usize = 30;

/// Update priority bands, most to least frequent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdatePriority {
    /// In combat, selected, or at point-blank range. Updates every frame
    /// and is exempt from adaptive throttling.
    Critical = 0,
    /// Close to the observer.
    High = 1,
    /// Mid-range.
    Medium = 2,
    /// Far away.
    Low = 3,
    /// Very far and idle.
    VeryLow = 4,
}

impl UpdatePriority {
    /// Index into per-priority tables such as
    /// [`ThrottleConfig::update_interval`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Balance knobs for the update throttle.
///
/// All distances are squared world-unit distances, matching what
/// [`WorldPos::distance_sq`] produces.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Master switch. Disabled means every unit updates every frame.
    pub enabled: bool,
    /// Units closer than this stay critical even when idle.
    pub critical_distance_sq: f32,
    /// Outer bound of the high band.
    pub high_distance_sq: f32,
    /// Outer bound of the medium band.
    pub medium_distance_sq: f32,
    /// Outer bound of the low band. Beyond it is very low.
    pub low_distance_sq: f32,
    /// Update interval in frames per priority band, critical first.
    pub update_interval: [u32; PRIORITY_COUNT],
    /// Stretch non-critical intervals when the frame budget is blown.
    pub adaptive_throttling: bool,
    /// Frame time the adaptive signal steers toward, in milliseconds.
    pub target_frame_time_ms: u32,
    /// Upper bound for the adaptive interval multiplier.
    pub max_throttle_multiplier: u32,
    /// How many frames after taking damage a unit still counts as in
    /// combat.
    pub combat_memory_frames: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 20, 40, 80 and 160 world units, squared.
            critical_distance_sq: 400.0,
            high_distance_sq: 1_600.0,
            medium_distance_sq: 6_400.0,
            low_distance_sq: 25_600.0,
            update_interval: [1, 2, 5, 10, 20],
            adaptive_throttling: true,
            target_frame_time_ms: 30,
            max_throttle_multiplier: 3,
            // 5 seconds at the 30 Hz simulation tick.
            combat_memory_frames: 150,
        }
    }
}

impl ThrottleConfig {
    /// Checks the knobs for values the scheduler cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::InvalidConfig`] naming the offending field group.
    pub fn validate(&self) -> AiResult<()> {
        if self.update_interval.iter().any(|&interval| interval == 0) {
            return Err(AiError::InvalidConfig(
                "update intervals must be at least 1 frame".to_string(),
            ));
        }
        if self.critical_distance_sq <= 0.0
            || self.high_distance_sq <= self.critical_distance_sq
            || self.medium_distance_sq <= self.high_distance_sq
            || self.low_distance_sq <= self.medium_distance_sq
        {
            return Err(AiError::InvalidConfig(
                "distance bands must be positive and strictly ascending".to_string(),
            ));
        }
        if self.target_frame_time_ms == 0 {
            return Err(AiError::InvalidConfig(
                "target frame time must be at least 1 ms".to_string(),
            ));
        }
        if self.max_throttle_multiplier == 0 {
            return Err(AiError::InvalidConfig(
                "max throttle multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the host reports about one unit when asking whether to update it.
#[derive(Clone, Copy, Debug)]
pub struct UnitSnapshot {
    /// Stable unit id. Keys the update stagger.
    pub id: u32,
    /// Current position in world units.
    pub position: WorldPos,
    /// Whether the unit is executing an attack right now.
    pub is_attacking: bool,
    /// Whether the unit holds a target that is still alive.
    pub has_live_victim: bool,
    /// Whether the player has the unit selected.
    pub is_selected: bool,
    /// Frame the unit last took damage, if it ever has.
    pub last_damage_frame: Option<u32>,
}

/// Per-frame census of throttle decisions.
///
/// Reset by [`UpdateThrottle::begin_frame`], so a snapshot taken at end of
/// frame describes exactly that frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Units queried this frame.
    pub total_units: u32,
    /// Units classified critical.
    pub critical: u32,
    /// Units classified high.
    pub high: u32,
    /// Units classified medium.
    pub medium: u32,
    /// Units classified low.
    pub low: u32,
    /// Units classified very low.
    pub very_low: u32,
    /// Updates allowed this frame.
    pub updates_run: u32,
    /// Updates skipped this frame.
    pub updates_skipped: u32,
}

impl ThrottleStats {
    /// Share of queried units whose update was skipped, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn skipped_percentage(&self) -> f32 {
        if self.total_units == 0 {
            return 0.0;
        }
        self.updates_skipped as f32 / self.total_units as f32 * 100.0
    }
}

/// Distance and combat based update-frequency scheduler.
///
/// Single-threaded. One instance lives in the simulation and is driven
/// once per tick: [`begin_frame`](Self::begin_frame), then
/// [`should_update`](Self::should_update) per unit, then
/// [`record_frame_time`](Self::record_frame_time) with the measured cost.
pub struct UpdateThrottle {
    config: ThrottleConfig,
    current_frame: u32,
    observer_pos: WorldPos,
    multiplier: u32,
    frame_times: [u32; FRAME_TIME_SAMPLES],
    frame_time_index: usize,
    stats: ThrottleStats,
}

impl UpdateThrottle {
    /// Creates a scheduler. The frame-time ring starts filled with the
    /// target so the adaptive multiplier begins at 1.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        let target = config.target_frame_time_ms;
        Self {
            config,
            current_frame: 0,
            observer_pos: WorldPos::default(),
            multiplier: 1,
            frame_times: [target; FRAME_TIME_SAMPLES],
            frame_time_index: 0,
            stats: ThrottleStats::default(),
        }
    }

    /// Starts a new frame: fixes the observer position, refreshes the
    /// adaptive multiplier and resets the census.
    pub fn begin_frame(&mut self, frame: u32, observer_pos: WorldPos) {
        self.current_frame = frame;
        self.observer_pos = observer_pos;
        self.multiplier = if self.config.adaptive_throttling {
            self.adaptive_multiplier()
        } else {
            1
        };
        self.stats = ThrottleStats::default();
    }

    /// Feeds one measured frame time, in milliseconds, into the adaptive
    /// ring.
    pub fn record_frame_time(&mut self, millis: u32) {
        self.frame_times[self.frame_time_index] = millis;
        self.frame_time_index = (self.frame_time_index + 1) % FRAME_TIME_SAMPLES;
    }

    /// Decides whether this unit's AI update runs this frame.
    ///
    /// Also counts the unit in the frame census, so call it exactly once
    /// per unit per frame.
    pub fn should_update(&mut self, unit: &UnitSnapshot) -> bool {
        if !self.config.enabled {
            return true;
        }

        let priority = self.priority_of(unit);
        self.stats.total_units += 1;
        match priority {
            UpdatePriority::Critical => self.stats.critical += 1,
            UpdatePriority::High => self.stats.high += 1,
            UpdatePriority::Medium => self.stats.medium += 1,
            UpdatePriority::Low => self.stats.low += 1,
            UpdatePriority::VeryLow => self.stats.very_low += 1,
        }

        let mut interval = self.config.update_interval[priority.index()];
        // Critical units are never throttled further, whatever the load.
        if priority != UpdatePriority::Critical && self.multiplier > 1 {
            interval *= self.multiplier;
        }
        let interval = interval.max(1);

        // Stagger by id so one band's units spread across the interval's
        // frames instead of all landing on the same one.
        let should = self.current_frame % interval == unit.id % interval;
        if should {
            self.stats.updates_run += 1;
        } else {
            self.stats.updates_skipped += 1;
        }
        should
    }

    /// Classifies a unit without touching the census.
    #[must_use]
    pub fn priority_of(&self, unit: &UnitSnapshot) -> UpdatePriority {
        if self.in_combat(unit) || unit.is_selected {
            return UpdatePriority::Critical;
        }
        let distance_sq = unit.position.distance_sq(&self.observer_pos);
        if distance_sq < self.config.critical_distance_sq {
            UpdatePriority::Critical
        } else if distance_sq < self.config.high_distance_sq {
            UpdatePriority::High
        } else if distance_sq < self.config.medium_distance_sq {
            UpdatePriority::Medium
        } else if distance_sq < self.config.low_distance_sq {
            UpdatePriority::Low
        } else {
            UpdatePriority::VeryLow
        }
    }

    /// Clears frame counter, ring, multiplier and census back to startup
    /// state. Keeps the config.
    pub fn reset(&mut self) {
        self.current_frame = 0;
        self.observer_pos = WorldPos::default();
        self.multiplier = 1;
        self.frame_times = [self.config.target_frame_time_ms; FRAME_TIME_SAMPLES];
        self.frame_time_index = 0;
        self.stats = ThrottleStats::default();
    }

    /// Census for the current frame so far.
    #[must_use]
    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }

    /// Multiplier applied to non-critical intervals this frame.
    #[must_use]
    pub fn throttle_multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Runtime master switch.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Whether throttling is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Current balance values.
    #[must_use]
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Replaces the balance values wholesale. Takes effect at the next
    /// [`begin_frame`](Self::begin_frame).
    pub fn set_config(&mut self, config: ThrottleConfig) {
        self.config = config;
    }

    fn in_combat(&self, unit: &UnitSnapshot) -> bool {
        if unit.is_attacking {
            return true;
        }
        if let Some(damage_frame) = unit.last_damage_frame {
            if self.current_frame.saturating_sub(damage_frame) < self.config.combat_memory_frames {
                return true;
            }
        }
        unit.has_live_victim
    }

    #[allow(clippy::cast_possible_truncation)]
    fn adaptive_multiplier(&self) -> u32 {
        let total: u32 = self.frame_times.iter().sum();
        let average = total / FRAME_TIME_SAMPLES as u32;
        if average <= self.config.target_frame_time_ms {
            return 1;
        }
        // One extra interval step per 10 ms of average overshoot.
        let over_target = average - self.config.target_frame_time_ms;
        (1 + over_target / 10).min(self.config.max_throttle_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_unit(id: u32, x: f32, y: f32) -> UnitSnapshot {
        UnitSnapshot {
            id,
            position: WorldPos::new(x, y),
            is_attacking: false,
            has_live_victim: false,
            is_selected: false,
            last_damage_frame: None,
        }
    }

    #[test]
    fn test_distance_bands() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        throttle.begin_frame(0, WorldPos::new(0.0, 0.0));

        assert_eq!(
            throttle.priority_of(&idle_unit(1, 10.0, 0.0)),
            UpdatePriority::Critical
        );
        assert_eq!(
            throttle.priority_of(&idle_unit(2, 30.0, 0.0)),
            UpdatePriority::High
        );
        assert_eq!(
            throttle.priority_of(&idle_unit(3, 70.0, 0.0)),
            UpdatePriority::Medium
        );
        assert_eq!(
            throttle.priority_of(&idle_unit(4, 150.0, 0.0)),
            UpdatePriority::Low
        );
        assert_eq!(
            throttle.priority_of(&idle_unit(5, 200.0, 0.0)),
            UpdatePriority::VeryLow
        );
    }

    #[test]
    fn test_combat_and_selection_force_critical() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        throttle.begin_frame(200, WorldPos::new(0.0, 0.0));

        let mut unit = idle_unit(1, 500.0, 500.0);
        assert_eq!(throttle.priority_of(&unit), UpdatePriority::VeryLow);

        unit.is_attacking = true;
        assert_eq!(throttle.priority_of(&unit), UpdatePriority::Critical);
        unit.is_attacking = false;

        unit.has_live_victim = true;
        assert_eq!(throttle.priority_of(&unit), UpdatePriority::Critical);
        unit.has_live_victim = false;

        unit.is_selected = true;
        assert_eq!(throttle.priority_of(&unit), UpdatePriority::Critical);
        unit.is_selected = false;

        // Damage 100 frames ago is still inside the 150-frame memory.
        unit.last_damage_frame = Some(100);
        assert_eq!(throttle.priority_of(&unit), UpdatePriority::Critical);

        // Damage 190 frames ago has been forgotten.
        unit.last_damage_frame = Some(10);
        assert_eq!(throttle.priority_of(&unit), UpdatePriority::VeryLow);
    }

    #[test]
    fn test_stagger_spreads_updates_over_interval() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        // Medium band, interval 5, id 7: updates when frame % 5 == 2.
        let unit = idle_unit(7, 70.0, 0.0);

        let mut updated_frames = Vec::new();
        for frame in 0..20 {
            throttle.begin_frame(frame, WorldPos::new(0.0, 0.0));
            if throttle.should_update(&unit) {
                updated_frames.push(frame);
            }
        }
        assert_eq!(updated_frames, vec![2, 7, 12, 17]);
    }

    #[test]
    fn test_critical_updates_every_frame() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        let unit = idle_unit(13, 5.0, 5.0);

        for frame in 0..10 {
            throttle.begin_frame(frame, WorldPos::new(0.0, 0.0));
            assert!(throttle.should_update(&unit));
        }
    }

    #[test]
    fn test_disabled_passes_everything_without_census() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        throttle.set_enabled(false);
        throttle.begin_frame(3, WorldPos::new(0.0, 0.0));

        for id in 0..50 {
            assert!(throttle.should_update(&idle_unit(id, 900.0, 900.0)));
        }
        assert_eq!(throttle.stats().total_units, 0);
    }

    #[test]
    fn test_adaptive_multiplier_engages_and_clamps() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());

        // 60 ms average is 30 ms over target: raw step 4, clamped to 3.
        for _ in 0..FRAME_TIME_SAMPLES {
            throttle.record_frame_time(60);
        }
        throttle.begin_frame(1, WorldPos::new(0.0, 0.0));
        assert_eq!(throttle.throttle_multiplier(), 3);

        // 45 ms average is 15 ms over target: one step up.
        for _ in 0..FRAME_TIME_SAMPLES {
            throttle.record_frame_time(45);
        }
        throttle.begin_frame(2, WorldPos::new(0.0, 0.0));
        assert_eq!(throttle.throttle_multiplier(), 2);

        // Recovered below target: back to 1.
        for _ in 0..FRAME_TIME_SAMPLES {
            throttle.record_frame_time(20);
        }
        throttle.begin_frame(3, WorldPos::new(0.0, 0.0));
        assert_eq!(throttle.throttle_multiplier(), 1);
    }

    #[test]
    fn test_adaptive_multiplier_spares_critical_units() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        for _ in 0..FRAME_TIME_SAMPLES {
            throttle.record_frame_time(60);
        }

        let critical = idle_unit(4, 1.0, 0.0);
        for frame in 0..6 {
            throttle.begin_frame(frame, WorldPos::new(0.0, 0.0));
            assert!(throttle.should_update(&critical));
        }

        // High band stretches from every 2 frames to every 6.
        let high = idle_unit(6, 30.0, 0.0);
        let mut updates = 0;
        for frame in 0..12 {
            throttle.begin_frame(frame, WorldPos::new(0.0, 0.0));
            if throttle.should_update(&high) {
                updates += 1;
            }
        }
        assert_eq!(updates, 2);
    }

    #[test]
    fn test_census_sums_and_resets() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        throttle.begin_frame(0, WorldPos::new(0.0, 0.0));

        let mut attacker = idle_unit(0, 400.0, 0.0);
        attacker.is_attacking = true;
        throttle.should_update(&attacker);
        throttle.should_update(&idle_unit(1, 30.0, 0.0));
        throttle.should_update(&idle_unit(2, 300.0, 0.0));

        let stats = throttle.stats();
        assert_eq!(stats.total_units, 3);
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.high, 1);
        assert_eq!(stats.very_low, 1);
        assert_eq!(stats.updates_run + stats.updates_skipped, stats.total_units);
        assert!(stats.skipped_percentage() >= 0.0);

        // The census belongs to one frame only.
        throttle.begin_frame(1, WorldPos::new(0.0, 0.0));
        assert_eq!(throttle.stats(), ThrottleStats::default());
    }

    #[test]
    fn test_reset_restores_startup_state() {
        let mut throttle = UpdateThrottle::new(ThrottleConfig::default());
        for _ in 0..FRAME_TIME_SAMPLES {
            throttle.record_frame_time(90);
        }
        throttle.begin_frame(500, WorldPos::new(10.0, 10.0));
        assert!(throttle.throttle_multiplier() > 1);

        throttle.reset();
        assert_eq!(throttle.throttle_multiplier(), 1);
        assert_eq!(throttle.stats(), ThrottleStats::default());

        throttle.begin_frame(0, WorldPos::new(0.0, 0.0));
        assert_eq!(throttle.throttle_multiplier(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        assert!(ThrottleConfig::default().validate().is_ok());

        let mut config = ThrottleConfig::default();
        config.update_interval[2] = 0;
        assert!(matches!(
            config.validate(),
            Err(AiError::InvalidConfig(_))
        ));

        let config = ThrottleConfig {
            high_distance_sq: 100.0,
            ..ThrottleConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ThrottleConfig {
            target_frame_time_ms: 0,
            ..ThrottleConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ThrottleConfig {
            max_throttle_multiplier: 0,
            ..ThrottleConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
