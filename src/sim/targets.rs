//! Target spawning, movement and expiry

use std::rc::Rc;

use glam::Vec2;
use rand::Rng;

use super::state::Target;
use crate::tuning::DifficultyPreset;

/// Uniform sample from `[min, max]`; collapses to `min` for an empty range
pub fn sample_range<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        min
    } else {
        min + rng.random::<f64>() * (max - min)
    }
}

/// Owns the live targets of one session
#[derive(Debug, Clone)]
pub struct TargetScheduler {
    preset: Rc<DifficultyPreset>,
    asset_key: String,
    /// Live targets in spawn order
    targets: Vec<Target>,
    next_spawn_at: f64,
    next_id: u32,
}

impl TargetScheduler {
    pub fn new(preset: Rc<DifficultyPreset>, asset_key: &str) -> Self {
        Self {
            preset,
            asset_key: asset_key.to_string(),
            targets: Vec::new(),
            next_spawn_at: 0.0,
            next_id: 1,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn next_spawn_at(&self) -> f64 {
        self.next_spawn_at
    }

    /// Create a target somewhere fully inside the surface, heading anywhere
    pub fn spawn<R: Rng + ?Sized>(&mut self, now: f64, surface: Vec2, rng: &mut R) -> u32 {
        let preset = &self.preset;
        let r = preset.radius;
        let x = r + rng.random::<f32>() * (surface.x - r * 2.0).max(0.0);
        let y = r + rng.random::<f32>() * (surface.y - r * 2.0).max(0.0);

        let [min_speed, max_speed] = preset.speed;
        let speed = if max_speed <= min_speed {
            min_speed
        } else {
            rng.random_range(min_speed..max_speed)
        };
        let heading = rng.random::<f32>() * std::f32::consts::TAU;
        // px/sec -> px/ms
        let vel = Vec2::from_angle(heading) * (speed / 1000.0);

        let id = self.next_id;
        self.next_id += 1;
        self.targets.push(Target {
            id,
            pos: Vec2::new(x, y),
            radius: r,
            vel,
            created_at: now,
            expires_at: now + preset.lifetime_ms,
            preset: Rc::clone(&self.preset),
            asset_key: self.asset_key.clone(),
        });
        id
    }

    pub fn schedule_next_spawn<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) {
        let [min, max] = self.preset.spawn_interval_ms;
        self.next_spawn_at = now + sample_range(rng, min, max);
    }

    /// Spawn one target if there is room and one is due
    pub fn spawn_if_needed<R: Rng + ?Sized>(
        &mut self,
        now: f64,
        surface: Vec2,
        rng: &mut R,
    ) -> Option<u32> {
        if self.targets.len() >= self.preset.max_concurrent || now < self.next_spawn_at {
            return None;
        }
        let id = self.spawn(now, surface, rng);
        self.schedule_next_spawn(now, rng);
        Some(id)
    }

    /// Move every target, bounce off the edges, drop the expired ones.
    /// Returns how many expired.
    pub fn advance(&mut self, now: f64, delta_ms: f64, surface: Vec2) -> u32 {
        let dt = delta_ms as f32;
        let mut expired = 0;
        self.targets.retain_mut(|t| {
            t.pos += t.vel * dt;
            let r = t.radius;
            if t.pos.x - r <= 0.0 || t.pos.x + r >= surface.x {
                t.vel.x = -t.vel.x;
                // Surface may be narrower than 2r, so no f32::clamp
                t.pos.x = t.pos.x.max(r).min(surface.x - r);
            }
            if t.pos.y - r <= 0.0 || t.pos.y + r >= surface.y {
                t.vel.y = -t.vel.y;
                t.pos.y = t.pos.y.max(r).min(surface.y - r);
            }

            if t.is_expired(now) {
                expired += 1;
                false
            } else {
                true
            }
        });
        expired
    }

    /// Remove a target by id
    pub fn remove(&mut self, id: u32) -> Option<Target> {
        let idx = self.targets.iter().position(|t| t.id == id)?;
        Some(self.targets.remove(idx))
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    #[cfg(test)]
    pub(crate) fn target_mut(&mut self, id: u32) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.id == id)
    }
}
