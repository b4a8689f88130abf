//! One animation-frame step of a running session
//!
//! Advances targets, counts expiries as misses, spawns if due and checks
//! the session clock. Rendering and HUD updates are the caller's job.

use glam::Vec2;
use rand::Rng;

use super::state::{GameEvent, SessionContext};
use crate::audio::SoundCue;

/// What the engine should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    /// Session clock ran out this frame
    TimeExpired,
}

/// Advance a running session to `now`
pub fn tick<R: Rng + ?Sized>(
    ctx: &mut SessionContext,
    now: f64,
    surface: Vec2,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) -> FrameOutcome {
    // Frames never run backwards
    let delta = (now - ctx.last_frame_at).max(0.0);
    ctx.last_frame_at = ctx.last_frame_at.max(now);

    let expired = ctx.targets.advance(now, delta, surface);
    for _ in 0..expired {
        ctx.metrics.register_miss();
        events.push(GameEvent::Sound(SoundCue::Miss));
    }

    ctx.targets.spawn_if_needed(now, surface, rng);

    if now >= ctx.ends_at {
        FrameOutcome::TimeExpired
    } else {
        FrameOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SESSION_DURATION_MS;
    use crate::sim::state::SessionMetrics;
    use crate::sim::targets::TargetScheduler;
    use crate::tuning::DifficultyPreset;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::rc::Rc;

    const SURFACE: Vec2 = Vec2::new(640.0, 480.0);

    fn context(preset: DifficultyPreset, now: f64, rng: &mut Pcg32) -> SessionContext {
        let mut targets = TargetScheduler::new(Rc::new(preset), "test");
        targets.spawn(now, SURFACE, rng);
        targets.schedule_next_spawn(now, rng);
        SessionContext {
            difficulty: "test".to_string(),
            metrics: SessionMetrics::default(),
            targets,
            ends_at: now + SESSION_DURATION_MS,
            last_frame_at: now,
        }
    }

    #[test]
    fn test_expiry_counts_as_miss() {
        let mut rng = Pcg32::seed_from_u64(12345);
        let preset = DifficultyPreset {
            radius: 20.0,
            speed: [0.0, 0.0],
            lifetime_ms: 5000.0,
            spawn_interval_ms: [0.0, 0.0],
            max_concurrent: 1,
            critical_threshold_px: 5.0,
        };
        let mut ctx = context(preset, 0.0, &mut rng);
        ctx.metrics.streak = 4;
        let mut events = Vec::new();

        let mut now = 0.0;
        while now < 4990.0 {
            now += 10.0;
            tick(&mut ctx, now, SURFACE, &mut rng, &mut events);
        }
        assert_eq!(ctx.metrics.misses, 0);
        assert!(events.is_empty());

        assert_eq!(
            tick(&mut ctx, 5000.0, SURFACE, &mut rng, &mut events),
            FrameOutcome::Continue
        );
        assert_eq!(ctx.metrics.misses, 1);
        assert_eq!(ctx.metrics.streak, 0);
        assert_eq!(events, [GameEvent::Sound(SoundCue::Miss)]);
        // Zero interval: the replacement spawns in the same frame
        assert_eq!(ctx.targets.len(), 1);
        assert_eq!(ctx.targets.targets()[0].created_at, 5000.0);
    }

    #[test]
    fn test_time_expired_at_session_end() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut ctx = context(DifficultyPreset::normal(), 1000.0, &mut rng);
        let mut events = Vec::new();
        assert_eq!(
            tick(&mut ctx, 60_999.0, SURFACE, &mut rng, &mut events),
            FrameOutcome::Continue
        );
        assert_eq!(
            tick(&mut ctx, 61_000.0, SURFACE, &mut rng, &mut events),
            FrameOutcome::TimeExpired
        );
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut rng = Pcg32::seed_from_u64(99999);
            let mut ctx = context(DifficultyPreset::hard(), 0.0, &mut rng);
            let mut events = Vec::new();
            let mut now = 0.0;
            for _ in 0..600 {
                now += 16.0;
                tick(&mut ctx, now, SURFACE, &mut rng, &mut events);
            }
            let positions: Vec<_> = ctx.targets.targets().iter().map(|t| t.pos).collect();
            (ctx.metrics.misses, positions)
        };
        assert_eq!(run(), run());
    }
}
