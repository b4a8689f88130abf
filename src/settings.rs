//! Player preferences
//!
//! Persisted separately from the results history.

use serde::{Deserialize, Serialize};

use crate::audio::SoundCue;
use crate::consts::SETTINGS_STORAGE_KEY;
use crate::persistence::KeyValueStore;

/// Player settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Silence all cues
    pub muted: bool,

    // === Visual Effects ===
    /// Slow pan of the background image
    pub background_drift: bool,
    /// Radial burst when the background stage changes
    pub stage_bursts: bool,

    // === Accessibility ===
    /// Reduced motion (no drift, no bursts)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            muted: false,

            background_drift: true,
            stage_bursts: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective background drift (respects reduced_motion)
    pub fn effective_drift(&self) -> bool {
        self.background_drift && !self.reduced_motion
    }

    /// Effective stage bursts (respects reduced_motion)
    pub fn effective_bursts(&self) -> bool {
        self.stage_bursts && !self.reduced_motion
    }

    /// Final playback volume for a cue
    pub fn cue_volume(&self, cue: SoundCue) -> f32 {
        if self.muted {
            0.0
        } else {
            (cue.base_volume() * self.master_volume).clamp(0.0, 1.0)
        }
    }

    /// Load settings, falling back to defaults on any problem
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(SETTINGS_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    return settings;
                }
                Err(e) => log::warn!("Stored settings are malformed: {e}"),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read settings: {e}"),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings; failures are logged
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(self) {
            Ok(json) => match store.set(SETTINGS_STORAGE_KEY, &json) {
                Ok(()) => log::info!("Settings saved"),
                Err(e) => log::error!("Failed to save settings: {e}"),
            },
            Err(e) => log::error!("Failed to encode settings: {e}"),
        }
    }
}
