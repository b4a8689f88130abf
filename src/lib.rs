//! Aim Trainer - a timed target-shooting game for the browser
//!
//! Core modules:
//! - `sim`: Session state machine, target scheduling, hit resolution, effects
//! - `tuning`: Data-driven difficulty presets and asset/background manifests
//! - `history`: Bounded local history of finished sessions
//! - `persistence`: Key/value storage (LocalStorage on web, files natively)
//! - `assets`: Image/sound preload tracking with graceful fallback
//! - `renderer`: Canvas 2D draw command generation
//! - `platform`: Clocks and the deferred-callback timer queue

pub mod assets;
pub mod audio;
pub mod history;
pub mod hud;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use history::{ResultArchive, SessionRecord};
pub use settings::Settings;
pub use sim::{Engine, GameEvent, SessionPhase};
pub use tuning::{BackgroundStages, DifficultyPreset, PresetStore};

/// Game configuration constants
pub mod consts {
    /// Length of one play session
    pub const SESSION_DURATION_MS: f64 = 60_000.0;

    /// Countdown labels shown before the session starts
    pub const COUNTDOWN_VALUES: [&str; 3] = ["3", "2", "1"];
    /// Spacing between countdown ticks (and between "1" and the start)
    pub const COUNTDOWN_INTERVAL_MS: f64 = 1000.0;

    /// Scoring
    pub const BASE_POINTS: f64 = 100.0;
    pub const CRITICAL_BONUS: f64 = 50.0;
    /// Hits per combo tier; each tier adds 10% to the multiplier
    pub const COMBO_TIER_SIZE: u32 = 5;

    /// Number of past sessions kept in local history
    pub const RECENT_RESULTS_LIMIT: usize = 10;
    /// Storage keys
    pub const RESULTS_STORAGE_KEY: &str = "aimTrainerResults";
    pub const SETTINGS_STORAGE_KEY: &str = "aimTrainerSettings";

    /// Background swap burst
    pub const BURST_SHARD_COUNT: usize = 24;
    pub const BURST_DURATION_MS: f64 = 700.0;
}
