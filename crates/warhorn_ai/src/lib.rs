//! # WARHORN AI Performance Systems
//!
//! Pure Rust update throttling and path caching for large battles.
//!
//! ## Design Principles
//!
//! 1. **Pay per relevance** - Units far from the action think less often
//! 2. **Reuse before recompute** - Similar path requests share one cached result
//! 3. **Graceful degradation** - Blown frame budgets stretch update intervals instead of hitching
//! 4. **External configuration** - All balance data in TOML files
//!
//! ## Thread Safety
//!
//! Both subsystems are single-threaded and meant to be driven from the
//! simulation tick. There are no locks to contend on the hot path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use warhorn_ai::{AiConfig, PathCache, UpdateThrottle};
//!
//! // Load balance values from config
//! let config = AiConfig::from_toml_file("data/balance/ai.toml")?;
//! let mut throttle = UpdateThrottle::new(config.throttle.clone());
//! let mut cache = PathCache::new(config.path_cache.clone());
//!
//! // Once per simulation tick
//! throttle.begin_frame(frame, camera_pos);
//! cache.begin_frame(frame);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod path_cache;
pub mod throttle;
pub mod types;

pub use config::AiConfig;
pub use error::{AiError, AiResult};
pub use path_cache::{
    GridCell, PathCache, PathCacheConfig, PathCacheStats, PathKey, PathLayer, SharedPath,
};
pub use throttle::{
    ThrottleConfig, ThrottleStats, UnitSnapshot, UpdatePriority, UpdateThrottle, PRIORITY_COUNT,
};
pub use types::WorldPos;
