//! Data-driven game balance
//!
//! Difficulty presets, asset manifests and background stages arrive as
//! loosely-typed JSON from the hosting page. Everything is coerced into
//! typed structures here; malformed entries are treated as absent.

use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec2;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Configuration errors surfaced to the player as a status message
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no difficulty selected")]
    NoDifficultySelected,

    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),

    #[error("invalid preset '{key}': {reason}")]
    InvalidPreset { key: String, reason: String },

    #[error("malformed manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Per-difficulty tuning bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyPreset {
    /// Target radius (px)
    pub radius: f32,
    /// Target speed range [min, max] (px/sec)
    pub speed: [f32; 2],
    /// How long a target lives before it counts as a miss
    pub lifetime_ms: f64,
    /// Delay range between spawns [min, max]
    pub spawn_interval_ms: [f64; 2],
    /// Maximum number of live targets
    #[serde(deserialize_with = "whole_count")]
    pub max_concurrent: usize,
    /// Hits within this distance of the center are critical
    pub critical_threshold_px: f32,
}

impl DifficultyPreset {
    /// Check range ordering and positivity
    pub fn validate(&self) -> Result<(), String> {
        if !(self.radius > 0.0) {
            return Err(format!("radius must be positive, got {}", self.radius));
        }
        let [min_speed, max_speed] = self.speed;
        if !(min_speed >= 0.0 && min_speed <= max_speed) {
            return Err(format!("bad speed range [{min_speed}, {max_speed}]"));
        }
        let [min_interval, max_interval] = self.spawn_interval_ms;
        if !(min_interval >= 0.0 && min_interval <= max_interval) {
            return Err(format!(
                "bad spawn interval range [{min_interval}, {max_interval}]"
            ));
        }
        if !(self.lifetime_ms > 0.0) {
            return Err(format!("lifetime_ms must be positive, got {}", self.lifetime_ms));
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be at least 1".to_string());
        }
        if !(self.critical_threshold_px >= 0.0) {
            return Err("critical_threshold_px must not be negative".to_string());
        }
        Ok(())
    }

    pub fn easy() -> Self {
        Self {
            radius: 36.0,
            speed: [40.0, 90.0],
            lifetime_ms: 2600.0,
            spawn_interval_ms: [700.0, 1100.0],
            max_concurrent: 3,
            critical_threshold_px: 10.0,
        }
    }

    pub fn normal() -> Self {
        Self {
            radius: 28.0,
            speed: [80.0, 160.0],
            lifetime_ms: 2000.0,
            spawn_interval_ms: [500.0, 850.0],
            max_concurrent: 4,
            critical_threshold_px: 8.0,
        }
    }

    pub fn hard() -> Self {
        Self {
            radius: 20.0,
            speed: [140.0, 260.0],
            lifetime_ms: 1400.0,
            spawn_interval_ms: [320.0, 600.0],
            max_concurrent: 5,
            critical_threshold_px: 5.0,
        }
    }
}

/// Difficulty presets keyed by name, validated on lookup
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    raw: BTreeMap<String, Value>,
}

impl PresetStore {
    /// Parse the `{key: preset}` object supplied by the page.
    /// Anything that isn't an object yields an empty store.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let raw = match value {
            Value::Object(map) => map.into_iter().collect(),
            other => {
                log::warn!("Difficulty data is not an object ({other}), no presets available");
                BTreeMap::new()
            }
        };
        Self { raw }
    }

    /// Easy/normal/hard presets used when the page supplies none
    pub fn builtin() -> Self {
        let mut store = Self::default();
        store.insert("easy", &DifficultyPreset::easy());
        store.insert("normal", &DifficultyPreset::normal());
        store.insert("hard", &DifficultyPreset::hard());
        store
    }

    pub fn insert(&mut self, key: &str, preset: &DifficultyPreset) {
        match serde_json::to_value(preset) {
            Ok(value) => {
                self.raw.insert(key.to_string(), value);
            }
            Err(e) => log::error!("Failed to encode preset '{key}': {e}"),
        }
    }

    /// Difficulty keys in stable order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    /// Look up and validate a preset
    pub fn get(&self, key: &str) -> Result<Rc<DifficultyPreset>, ConfigError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::NoDifficultySelected);
        }
        let value = self
            .raw
            .get(key)
            .ok_or_else(|| ConfigError::UnknownDifficulty(key.to_string()))?;
        let preset: DifficultyPreset =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidPreset {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        preset.validate().map_err(|reason| ConfigError::InvalidPreset {
            key: key.to_string(),
            reason,
        })?;
        Ok(Rc::new(preset))
    }
}

/// Logical asset key to URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetManifest {
    pub entries: BTreeMap<String, String>,
}

impl AssetManifest {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Non-string and blank URLs are dropped
    pub fn from_value(value: &Value) -> Self {
        let mut entries = BTreeMap::new();
        if let Value::Object(map) = value {
            for (key, url) in map {
                match url.as_str().map(str::trim) {
                    Some(url) if !url.is_empty() => {
                        entries.insert(key.clone(), url.to_string());
                    }
                    _ => log::warn!("Dropping asset '{key}': no usable URL"),
                }
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A background image unlocked at a kill count
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundStage {
    pub threshold: f64,
    /// Empty means "no image"
    pub image: String,
}

impl BackgroundStage {
    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

/// Background stages, sorted by threshold, never empty
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundStages {
    stages: Vec<BackgroundStage>,
}

impl Default for BackgroundStages {
    fn default() -> Self {
        Self {
            stages: vec![BackgroundStage {
                threshold: 0.0,
                image: String::new(),
            }],
        }
    }
}

impl BackgroundStages {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Normalize `{stages: [{threshold, image}]}`
    pub fn from_value(value: &Value) -> Self {
        let entries = value
            .get("stages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let stages = entries
            .iter()
            .filter_map(|entry| {
                let Some(threshold) = entry.get("threshold").and_then(numeric) else {
                    log::warn!("Dropping background stage with non-numeric threshold: {entry}");
                    return None;
                };
                let image = entry
                    .get("image")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|image| !image.is_empty());
                let Some(image) = image else {
                    log::warn!("Dropping background stage without an image: {entry}");
                    return None;
                };
                Some(BackgroundStage {
                    threshold,
                    image: image.to_string(),
                })
            })
            .collect();

        Self::new(stages)
    }

    /// Sort ascending and make sure a threshold-0 stage leads
    pub fn new(mut stages: Vec<BackgroundStage>) -> Self {
        stages.retain(|s| s.threshold.is_finite());
        stages.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        if stages.first().is_none_or(|s| s.threshold > 0.0) {
            stages.insert(
                0,
                BackgroundStage {
                    threshold: 0.0,
                    image: String::new(),
                },
            );
        }
        Self { stages }
    }

    /// Index of the last stage whose threshold doesn't exceed `kills`
    pub fn active_index(&self, kills: u32) -> usize {
        let kills = f64::from(kills);
        let mut index = 0;
        for (i, stage) in self.stages.iter().enumerate() {
            if kills >= stage.threshold {
                index = i;
            } else {
                break;
            }
        }
        index
    }

    pub fn get(&self, index: usize) -> Option<&BackgroundStage> {
        self.stages.get(index)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Page JSON has no integer type: accept `4` and `4.0`, reject `4.5`
fn whole_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let n = f64::deserialize(deserializer)?;
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 {
        Ok(n as usize)
    } else {
        Err(D::Error::custom(format!("expected a whole count, got {n}")))
    }
}

/// Numbers and numeric strings; anything else is absent
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Slow pan of the background image (percent of the surface)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    pub center: Vec2,
    pub amplitude: Vec2,
    /// Cycles per second on each axis
    pub frequency: Vec2,
    /// Phase offset of the vertical sinusoid (radians)
    pub phase_y: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            center: Vec2::new(50.0, 50.0),
            amplitude: Vec2::new(8.0, 50.0),
            frequency: Vec2::new(0.03, 0.25),
            phase_y: std::f32::consts::FRAC_PI_3,
        }
    }
}

impl DriftConfig {
    /// Background position at `t` seconds after the drift started
    pub fn position_at(&self, t: f32) -> Vec2 {
        use std::f32::consts::TAU;
        Vec2::new(
            self.center.x + (t * TAU * self.frequency.x).sin() * self.amplitude.x,
            self.center.y + (t * TAU * self.frequency.y + self.phase_y).sin() * self.amplitude.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_presets_are_valid() {
        let store = PresetStore::builtin();
        for key in ["easy", "normal", "hard"] {
            let preset = store.get(key).unwrap();
            assert!(preset.speed[0] <= preset.speed[1]);
            assert!(preset.spawn_interval_ms[0] <= preset.spawn_interval_ms[1]);
        }
    }

    #[test]
    fn test_preset_lookup_errors() {
        let store = PresetStore::builtin();
        assert!(matches!(store.get(""), Err(ConfigError::NoDifficultySelected)));
        assert!(matches!(store.get("  "), Err(ConfigError::NoDifficultySelected)));
        assert!(matches!(
            store.get("insane"),
            Err(ConfigError::UnknownDifficulty(k)) if k == "insane"
        ));
    }

    #[test]
    fn test_preset_parsed_from_page_json() {
        let store = PresetStore::from_json(
            r#"{"drill": {"radius": 20, "speed": [0, 0], "lifetime_ms": 5000,
                "spawn_interval_ms": [0, 0], "max_concurrent": 1, "critical_threshold_px": 5}}"#,
        )
        .unwrap();
        let preset = store.get("drill").unwrap();
        assert_eq!(preset.radius, 20.0);
        assert_eq!(preset.speed, [0.0, 0.0]);
        assert_eq!(preset.max_concurrent, 1);
    }

    #[test]
    fn test_whole_float_counts_accepted() {
        let store = PresetStore::from_value(json!({
            "normal": {"radius": 28.0, "speed": [80.0, 160.0], "lifetime_ms": 2000.0,
                "spawn_interval_ms": [500.0, 850.0], "max_concurrent": 4.0,
                "critical_threshold_px": 8.0},
            "fractional": {"radius": 28, "speed": [80, 160], "lifetime_ms": 2000,
                "spawn_interval_ms": [500, 850], "max_concurrent": 2.5,
                "critical_threshold_px": 8},
            "negative": {"radius": 28, "speed": [80, 160], "lifetime_ms": 2000,
                "spawn_interval_ms": [500, 850], "max_concurrent": -1,
                "critical_threshold_px": 8},
        }));
        assert_eq!(store.get("normal").unwrap().max_concurrent, 4);
        assert!(matches!(store.get("fractional"), Err(ConfigError::InvalidPreset { .. })));
        assert!(matches!(store.get("negative"), Err(ConfigError::InvalidPreset { .. })));
    }

    #[test]
    fn test_invalid_preset_rejected_lazily() {
        let store = PresetStore::from_value(json!({
            "inverted": {"radius": 20, "speed": [300, 100], "lifetime_ms": 1000,
                "spawn_interval_ms": [0, 0], "max_concurrent": 1, "critical_threshold_px": 5},
            "partial": {"radius": 20},
        }));
        // Both keys are listed; validation happens on lookup
        assert_eq!(store.keys().count(), 2);
        assert!(matches!(store.get("inverted"), Err(ConfigError::InvalidPreset { .. })));
        assert!(matches!(store.get("partial"), Err(ConfigError::InvalidPreset { .. })));
    }

    #[test]
    fn test_non_object_preset_data() {
        let store = PresetStore::from_value(json!([1, 2, 3]));
        assert_eq!(store.keys().count(), 0);
        assert!(PresetStore::from_json("{not json").is_err());
    }

    #[test]
    fn test_asset_manifest_drops_bad_urls() {
        let manifest = AssetManifest::from_value(&json!({
            "normal": "/img/normal.png",
            "hard": 42,
            "easy": "  ",
        }));
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries["normal"], "/img/normal.png");
    }

    #[test]
    fn test_background_stages_normalized() {
        let stages = BackgroundStages::from_value(&json!({
            "stages": [
                {"threshold": 20, "image": "c.png"},
                {"threshold": "10", "image": "b.png"},
                {"threshold": 0, "image": "a.png"},
                {"threshold": "lots", "image": "x.png"},
                {"threshold": 5, "image": ""},
                {"threshold": 7},
            ]
        }));
        assert_eq!(stages.len(), 3);
        assert_eq!(stages.get(0).unwrap().image, "a.png");
        assert_eq!(stages.get(1).unwrap().threshold, 10.0);
        assert_eq!(stages.get(2).unwrap().image, "c.png");
    }

    #[test]
    fn test_background_sentinel_when_empty() {
        let stages = BackgroundStages::from_value(&json!({}));
        assert_eq!(stages.len(), 1);
        assert_eq!(stages.get(0).unwrap().threshold, 0.0);
        assert!(!stages.get(0).unwrap().has_image());
        assert_eq!(stages.active_index(0), 0);
        assert_eq!(stages.active_index(500), 0);
    }

    #[test]
    fn test_background_sentinel_prepended_when_first_stage_is_late() {
        let stages = BackgroundStages::from_value(&json!({
            "stages": [{"threshold": 5, "image": "late.png"}]
        }));
        assert_eq!(stages.len(), 2);
        assert_eq!(stages.active_index(4), 0);
        assert_eq!(stages.active_index(5), 1);
    }

    #[test]
    fn test_active_index_picks_highest_reached_threshold() {
        let stages = BackgroundStages::new(vec![
            BackgroundStage {
                threshold: 0.0,
                image: "a".into(),
            },
            BackgroundStage {
                threshold: 10.0,
                image: "b".into(),
            },
            BackgroundStage {
                threshold: 20.0,
                image: "c".into(),
            },
        ]);
        assert_eq!(stages.active_index(0), 0);
        assert_eq!(stages.active_index(9), 0);
        assert_eq!(stages.active_index(10), 1);
        assert_eq!(stages.active_index(15), 1);
        assert_eq!(stages.active_index(20), 2);
    }

    #[test]
    fn test_drift_starts_near_center() {
        let drift = DriftConfig::default();
        let p = drift.position_at(0.0);
        assert!((p.x - 50.0).abs() < 1e-4);
        // y starts phase-shifted by π/3
        let expected_y = 50.0 + (std::f32::consts::FRAC_PI_3).sin() * 50.0;
        assert!((p.y - expected_y).abs() < 1e-3);
    }

    #[test]
    fn test_drift_stays_within_amplitude() {
        let drift = DriftConfig::default();
        for i in 0..200 {
            let p = drift.position_at(i as f32 * 0.37);
            assert!((p.x - 50.0).abs() <= 8.0 + 1e-3);
            assert!((p.y - 50.0).abs() <= 50.0 + 1e-3);
        }
    }
}
