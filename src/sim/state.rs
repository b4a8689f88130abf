//! Session state and core simulation types
//!
//! Everything a running session mutates lives in [`SessionContext`], which
//! the engine owns and hands to each step explicitly.

use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::targets::TargetScheduler;
use crate::audio::SoundCue;
use crate::history::SessionRecord;
use crate::platform::TimerToken;
use crate::tuning::DifficultyPreset;

/// Current phase of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for the player to press start
    Idle,
    /// "3", "2", "1" before the clock starts
    Countdown,
    /// Targets live, clock running
    Running,
    /// Transient: archival happens, then straight back to Idle
    Ended,
}

/// A live target
#[derive(Debug, Clone)]
pub struct Target {
    /// Unique per engine, never reused
    pub id: u32,
    pub pos: Vec2,
    pub radius: f32,
    /// Pixels per millisecond
    pub vel: Vec2,
    pub created_at: f64,
    pub expires_at: f64,
    pub preset: Rc<DifficultyPreset>,
    /// Image key used to draw this target
    pub asset_key: String,
}

impl Target {
    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.pos.distance(point)
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at
    }
}

/// Score and accuracy counters for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Weighted points, fractional until archived
    pub score: f64,
    pub kills: u32,
    pub misses: u32,
    /// Current run of consecutive hits
    pub streak: u32,
    /// Best streak this session
    pub max_combo: u32,
    /// Sum of time-to-kill over all kills
    pub total_kill_time_ms: f64,
}

impl SessionMetrics {
    pub fn attempts(&self) -> u32 {
        self.kills + self.misses
    }

    /// Percent of attempts that were kills, 0 with no attempts
    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => f64::from(self.kills) / f64::from(n) * 100.0,
        }
    }

    /// Mean time-to-kill in ms, 0 with no kills
    pub fn avg_ttk(&self) -> f64 {
        match self.kills {
            0 => 0.0,
            n => self.total_kill_time_ms / f64::from(n),
        }
    }

    /// Count a kill; returns the streak after it
    pub fn register_kill(&mut self, time_to_kill_ms: f64) -> u32 {
        self.kills += 1;
        self.total_kill_time_ms += time_to_kill_ms.max(0.0);
        self.streak += 1;
        self.max_combo = self.max_combo.max(self.streak);
        self.streak
    }

    /// Count a miss (explicit or expired target)
    pub fn register_miss(&mut self) {
        self.misses += 1;
        self.streak = 0;
    }
}

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTone::Info => "info",
            StatusTone::Success => "success",
            StatusTone::Warning => "warning",
            StatusTone::Error => "error",
        }
    }
}

/// Which session controls are usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl Controls {
    pub const IDLE: Controls = Controls {
        start_enabled: true,
        stop_enabled: false,
    };
    pub const ACTIVE: Controls = Controls {
        start_enabled: false,
        stop_enabled: true,
    };
}

/// Outbound signals for the surrounding UI, drained by the host each frame
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Status {
        message: &'static str,
        tone: StatusTone,
    },
    Sound(SoundCue),
    /// Show a countdown value over the play surface
    CountdownShow(&'static str),
    CountdownHide,
    Controls(Controls),
    FinishBanner {
        visible: bool,
    },
    /// Active background stage changed; `None` clears the background
    BackgroundChanged {
        image: Option<String>,
    },
    /// Archive contents after a write
    HistoryUpdated(Vec<SessionRecord>),
    SessionEnded {
        /// `None` when the session was not archived
        record: Option<SessionRecord>,
        aborted: bool,
    },
}

/// Deferred work owned by the engine's timer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Show `COUNTDOWN_VALUES[step]`
    CountdownStep(usize),
    /// Countdown finished; begin running
    CountdownExpire,
}

/// Countdown in progress
#[derive(Debug, Clone)]
pub struct PendingStart {
    pub token: TimerToken,
    pub difficulty: String,
    pub preset: Rc<DifficultyPreset>,
}

/// One running session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub difficulty: String,
    pub metrics: SessionMetrics,
    pub targets: TargetScheduler,
    pub ends_at: f64,
    pub last_frame_at: f64,
}

impl SessionContext {
    /// Time left on the session clock, never negative
    pub fn remaining_ms(&self, now: f64) -> f64 {
        (self.ends_at - now).max(0.0)
    }
}
