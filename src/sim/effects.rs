//! Transient visual effects and background progression
//!
//! Effects are pure data with a start time; the render pass reads them and
//! the list is re-filtered every frame rather than decayed in place.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use crate::consts::{BURST_DURATION_MS, BURST_SHARD_COUNT};
use crate::renderer::colors;
use crate::tuning::{BackgroundStages, DriftConfig};

/// One particle of a burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shard {
    /// Starting angle around the burst center
    pub angle: f32,
    /// Extra rotation over the burst's lifetime
    pub spin: f32,
    /// Fraction of the ring radius this shard sits at
    pub scale: f32,
    pub size: f32,
    pub fill: [f32; 4],
}

/// Radial ring + shards, centered on the play surface
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub start_time: f64,
    pub duration: f64,
    pub base_radius: f32,
    pub stroke: [f32; 4],
    pub shards: Vec<Shard>,
}

impl Effect {
    /// Background swap burst
    pub fn burst<R: Rng + ?Sized>(now: f64, surface: Vec2, rng: &mut R) -> Self {
        let shards = (0..BURST_SHARD_COUNT)
            .map(|i| Shard {
                angle: TAU * i as f32 / BURST_SHARD_COUNT as f32,
                spin: (rng.random::<f32>() - 0.5) * PI,
                scale: 0.25 + rng.random::<f32>() * 0.75,
                size: 8.0 + rng.random::<f32>() * 6.0,
                fill: colors::BURST_SHARD,
            })
            .collect();
        Self {
            start_time: now,
            duration: BURST_DURATION_MS,
            base_radius: surface.min_element() * 0.1,
            stroke: colors::BURST_RING,
            shards,
        }
    }

    /// Elapsed fraction; may exceed 1 or be negative
    pub fn progress(&self, now: f64) -> f64 {
        (now - self.start_time) / self.duration
    }

    pub fn is_alive(&self, now: f64) -> bool {
        self.progress(now) < 1.0
    }
}

/// Live effects
#[derive(Debug, Clone, Default)]
pub struct EffectList {
    effects: Vec<Effect>,
}

impl EffectList {
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Drop finished effects and return the survivors for drawing
    pub fn live(&mut self, now: f64) -> &[Effect] {
        self.effects.retain(|e| e.is_alive(now));
        &self.effects
    }
}

/// A stage switch the host should apply
#[derive(Debug, Clone, PartialEq)]
pub struct StageChange {
    pub index: usize,
    /// `None` clears the background
    pub image: Option<String>,
    /// Whether this switch deserves a burst
    pub burst: bool,
}

/// Tracks which background stage is showing
#[derive(Debug, Clone)]
pub struct BackgroundTracker {
    stages: BackgroundStages,
    current: Option<usize>,
}

impl BackgroundTracker {
    pub fn new(stages: BackgroundStages) -> Self {
        Self {
            stages,
            current: None,
        }
    }

    pub fn stages(&self) -> &BackgroundStages {
        &self.stages
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Forget the active stage so the next update is an initial assignment
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Recompute the stage for `kills`. Returns the change, if any.
    /// The first assignment after construction or reset never bursts.
    pub fn update(&mut self, kills: u32) -> Option<StageChange> {
        let index = self.stages.active_index(kills);
        if self.current == Some(index) {
            return None;
        }
        let burst = self.current.is_some();
        self.current = Some(index);
        let image = self
            .stages
            .get(index)
            .filter(|s| s.has_image())
            .map(|s| s.image.clone());
        Some(StageChange {
            index,
            image,
            burst,
        })
    }
}

/// Slow pan of the background image, on its own timeline
#[derive(Debug, Clone, Default)]
pub struct BackgroundDrift {
    config: DriftConfig,
    started_at: Option<f64>,
}

impl BackgroundDrift {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            started_at: None,
        }
    }

    /// (Re)start from the center
    pub fn start(&mut self, now: f64) {
        self.started_at = Some(now);
    }

    pub fn cancel(&mut self) {
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Background position in percent, `None` when stopped
    pub fn offset(&self, now: f64) -> Option<Vec2> {
        let started = self.started_at?;
        let t = ((now - started) / 1000.0) as f32;
        Some(self.config.position_at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::BackgroundStage;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn stages() -> BackgroundStages {
        BackgroundStages::new(vec![
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
        ])
    }

    #[test]
    fn test_stage_progression_bursts_once() {
        let mut tracker = BackgroundTracker::new(stages());
        let first = tracker.update(0).unwrap();
        assert_eq!(first.index, 0);
        assert!(!first.burst);
        assert_eq!(first.image.as_deref(), Some("a"));

        for kills in 1..10 {
            assert_eq!(tracker.update(kills), None);
        }
        let second = tracker.update(10).unwrap();
        assert_eq!(second.index, 1);
        assert!(second.burst);
        assert_eq!(tracker.update(15), None);
        assert_eq!(tracker.current(), Some(1));
    }

    #[test]
    fn test_reset_suppresses_burst() {
        let mut tracker = BackgroundTracker::new(stages());
        tracker.update(25);
        tracker.reset();
        let change = tracker.update(0).unwrap();
        assert_eq!(change.index, 0);
        assert!(!change.burst);
    }

    #[test]
    fn test_sentinel_stage_has_no_image() {
        let mut tracker = BackgroundTracker::new(BackgroundStages::default());
        let change = tracker.update(0).unwrap();
        assert_eq!(change.index, 0);
        assert_eq!(change.image, None);
    }

    #[test]
    fn test_burst_shape() {
        let mut rng = Pcg32::seed_from_u64(42);
        let effect = Effect::burst(100.0, Vec2::new(800.0, 600.0), &mut rng);
        assert_eq!(effect.shards.len(), BURST_SHARD_COUNT);
        assert_relative_eq!(effect.base_radius, 60.0);
        assert_eq!(effect.duration, BURST_DURATION_MS);
        for (i, shard) in effect.shards.iter().enumerate() {
            assert_relative_eq!(shard.angle, TAU * i as f32 / BURST_SHARD_COUNT as f32);
            assert!(shard.spin.abs() <= PI / 2.0);
            assert!((0.25..=1.0).contains(&shard.scale));
            assert!((8.0..=14.0).contains(&shard.size));
        }
    }

    #[test]
    fn test_effects_expire_by_elapsed_fraction() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut list = EffectList::default();
        list.push(Effect::burst(0.0, Vec2::new(100.0, 100.0), &mut rng));
        list.push(Effect::burst(500.0, Vec2::new(100.0, 100.0), &mut rng));
        assert_eq!(list.live(699.0).len(), 2);
        assert_eq!(list.live(700.0).len(), 1);
        assert_eq!(list.live(1200.0).len(), 0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_drift_runs_only_when_started() {
        let mut drift = BackgroundDrift::default();
        assert_eq!(drift.offset(0.0), None);
        drift.start(1000.0);
        let origin = drift.offset(1000.0).unwrap();
        assert_relative_eq!(origin.x, 50.0);
        assert!(drift.offset(5000.0).unwrap() != origin);
        drift.cancel();
        assert!(!drift.is_running());
    }
}
