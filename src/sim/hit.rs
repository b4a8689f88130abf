//! Shot resolution and scoring

use glam::Vec2;

use super::state::{SessionMetrics, Target};
use super::targets::TargetScheduler;
use crate::consts::{BASE_POINTS, COMBO_TIER_SIZE, CRITICAL_BONUS};

/// Result of one shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotOutcome {
    Hit {
        target_id: u32,
        distance: f32,
        points: f64,
        critical: bool,
    },
    Miss,
}

impl ShotOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, ShotOutcome::Hit { .. })
    }
}

/// Combo multiplier for a streak: +10% per full tier
pub fn combo_multiplier(streak: u32) -> f64 {
    1.0 + f64::from(streak / COMBO_TIER_SIZE) * 0.1
}

/// Nearest target whose disc contains `point`.
/// Equal distances keep the earlier-spawned target.
pub fn find_hit(targets: &[Target], point: Vec2) -> Option<(u32, f32)> {
    let mut best: Option<(u32, f32)> = None;
    for target in targets {
        let distance = target.distance_to(point);
        if distance > target.radius {
            continue;
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((target.id, distance));
        }
    }
    best
}

/// Apply a shot at `point` to the live set and the metrics
pub fn resolve_shot(
    targets: &mut TargetScheduler,
    metrics: &mut SessionMetrics,
    point: Vec2,
    now: f64,
) -> ShotOutcome {
    let hit = find_hit(targets.targets(), point);
    let Some((target, distance)) = hit.and_then(|(id, d)| targets.remove(id).map(|t| (t, d)))
    else {
        metrics.register_miss();
        return ShotOutcome::Miss;
    };

    let streak = metrics.register_kill(now - target.created_at);
    let critical = distance <= target.preset.critical_threshold_px;
    let base = if critical {
        BASE_POINTS + CRITICAL_BONUS
    } else {
        BASE_POINTS
    };
    let points = base * combo_multiplier(streak);
    metrics.score += points;

    ShotOutcome::Hit {
        target_id: target.id,
        distance,
        points,
        critical,
    }
}
