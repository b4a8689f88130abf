//! Game simulation module
//!
//! All gameplay logic lives here, free of rendering and platform code:
//! - Time comes in as explicit millisecond timestamps
//! - Randomness comes from the engine's seeded RNG
//! - Live targets keep spawn order

pub mod effects;
pub mod hit;
pub mod session;
pub mod state;
pub mod targets;
pub mod tick;

pub use effects::{BackgroundDrift, BackgroundTracker, Effect, EffectList, Shard, StageChange};
pub use hit::{ShotOutcome, combo_multiplier, find_hit, resolve_shot};
pub use session::{Engine, StartError};
pub use state::{
    Controls, GameEvent, SessionContext, SessionMetrics, SessionPhase, StatusTone, Target,
};
pub use targets::TargetScheduler;
pub use tick::{FrameOutcome, tick};
