//! Session state machine
//!
//! Idle -> Countdown -> Running -> Ended -> Idle. The engine owns the live
//! session, the countdown timers, the effect list and the background
//! tracker. Every operation takes the current time explicitly; the host
//! drives [`Engine::update`] once per animation frame and drains
//! [`GameEvent`]s afterwards.

use std::rc::Rc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use thiserror::Error;

use super::effects::{BackgroundDrift, BackgroundTracker, Effect, EffectList, StageChange};
use super::hit::{ShotOutcome, resolve_shot};
use super::state::{
    Controls, GameEvent, PendingStart, SessionContext, SessionMetrics, SessionPhase, StatusTone,
    Target, TimerEvent,
};
use super::targets::TargetScheduler;
use super::tick::{FrameOutcome, tick};
use crate::audio::SoundCue;
use crate::consts::{COUNTDOWN_INTERVAL_MS, COUNTDOWN_VALUES, SESSION_DURATION_MS};
use crate::history::{ResultArchive, SessionRecord};
use crate::hud::HudSnapshot;
use crate::platform::{Clock, TimerQueue};
use crate::renderer::{DrawCmd, shapes};
use crate::settings::Settings;
use crate::tuning::{BackgroundStages, ConfigError, DriftConfig, PresetStore};

/// Why a session could not start
#[derive(Debug, Error)]
pub enum StartError {
    #[error("a countdown or session is already active")]
    AlreadyActive,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The game engine
pub struct Engine {
    presets: PresetStore,
    settings: Settings,
    archive: ResultArchive,
    clock: Box<dyn Clock>,
    rng: Pcg32,
    surface: Vec2,

    phase: SessionPhase,
    timers: TimerQueue<TimerEvent>,
    pending: Option<PendingStart>,
    session: Option<SessionContext>,
    /// Metrics of the last finished session, shown while idle
    last_metrics: SessionMetrics,

    effects: EffectList,
    background: BackgroundTracker,
    drift: BackgroundDrift,

    history: Vec<SessionRecord>,
    events: Vec<GameEvent>,
}

impl Engine {
    pub fn new(
        presets: PresetStore,
        stages: BackgroundStages,
        settings: Settings,
        archive: ResultArchive,
        clock: Box<dyn Clock>,
        surface: Vec2,
        seed: u64,
    ) -> Self {
        let history = archive.load(clock.wall_time());
        let mut engine = Self {
            presets,
            settings,
            archive,
            clock,
            rng: Pcg32::seed_from_u64(seed),
            surface,
            phase: SessionPhase::Idle,
            timers: TimerQueue::new(),
            pending: None,
            session: None,
            last_metrics: SessionMetrics::default(),
            effects: EffectList::default(),
            background: BackgroundTracker::new(stages),
            drift: BackgroundDrift::new(DriftConfig::default()),
            history,
            events: Vec::new(),
        };
        let now = engine.clock.now_ms();
        engine.refresh_background(now);
        engine
    }

    // === Queries ===

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Monotonic time from the engine's clock
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_surface(&mut self, surface: Vec2) {
        self.surface = surface;
    }

    /// Live metrics while running, else the last session's
    pub fn metrics(&self) -> &SessionMetrics {
        self.session
            .as_ref()
            .map_or(&self.last_metrics, |ctx| &ctx.metrics)
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|ctx| ctx.difficulty.as_str())
            .or_else(|| self.pending.as_ref().map(|p| p.difficulty.as_str()))
    }

    pub fn targets(&self) -> &[Target] {
        self.session
            .as_ref()
            .map_or(&[][..], |ctx| ctx.targets.targets())
    }

    pub fn remaining_ms(&self, now: f64) -> Option<f64> {
        self.session.as_ref().map(|ctx| ctx.remaining_ms(now))
    }

    pub fn hud(&self, now: f64) -> HudSnapshot {
        HudSnapshot::from_metrics(self.metrics(), self.remaining_ms(now))
    }

    pub fn history(&self) -> &[SessionRecord] {
        &self.history
    }

    pub fn background_index(&self) -> Option<usize> {
        self.background.current()
    }

    /// Background position in percent while the drift is running
    pub fn background_offset(&self, now: f64) -> Option<Vec2> {
        self.drift.offset(now)
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Take the signals produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Settings & assets ===

    pub fn apply_settings(&mut self, settings: Settings, now: f64) {
        self.settings = settings;
        let has_image = self
            .background
            .current()
            .and_then(|i| self.background.stages().get(i))
            .is_some_and(|s| s.has_image());
        if has_image && self.settings.effective_drift() {
            if !self.drift.is_running() {
                self.drift.start(now);
            }
        } else {
            self.drift.cancel();
        }
    }

    pub fn on_assets_ready(&mut self, now: f64) {
        log::info!("Assets ready");
        self.refresh_background(now);
        self.status("Assets ready. Click start when you are ready.", StatusTone::Info);
    }

    pub fn on_assets_failed(&mut self) {
        self.status(
            "Asset preload failed. You can still play using fallback graphics.",
            StatusTone::Warning,
        );
    }

    // === Transitions ===

    /// Idle -> Countdown for the given difficulty
    pub fn start_countdown(
        &mut self,
        difficulty: Option<&str>,
        now: f64,
    ) -> Result<(), StartError> {
        if matches!(self.phase, SessionPhase::Countdown | SessionPhase::Running) {
            return Err(StartError::AlreadyActive);
        }
        let key = difficulty.unwrap_or_default().trim();
        let preset = match self.presets.get(key) {
            Ok(preset) => preset,
            Err(e) => {
                log::warn!("Cannot start: {e}");
                self.status("Select a valid difficulty to start.", StatusTone::Error);
                self.controls(Controls::IDLE);
                return Err(e.into());
            }
        };

        self.timers.cancel_all();
        self.pending = Some(PendingStart {
            token: self.timers.token(),
            difficulty: key.to_string(),
            preset,
        });
        self.phase = SessionPhase::Countdown;
        log::info!("Countdown started ({key})");
        self.status("Get ready...", StatusTone::Info);
        self.controls(Controls::ACTIVE);
        self.countdown_step(0, now);
        Ok(())
    }

    fn countdown_step(&mut self, step: usize, now: f64) {
        let Some(value) = COUNTDOWN_VALUES.get(step) else {
            return;
        };
        self.events.push(GameEvent::CountdownShow(value));
        self.events.push(GameEvent::Sound(SoundCue::Countdown));
        let next = if step + 1 < COUNTDOWN_VALUES.len() {
            TimerEvent::CountdownStep(step + 1)
        } else {
            TimerEvent::CountdownExpire
        };
        self.timers.schedule(now + COUNTDOWN_INTERVAL_MS, next);
    }

    /// Countdown -> Idle. A no-op returning false when no countdown is active.
    pub fn cancel_countdown(&mut self) -> bool {
        if self.phase != SessionPhase::Countdown {
            return false;
        }
        self.timers.cancel_all();
        self.pending = None;
        self.phase = SessionPhase::Idle;
        log::info!("Countdown cancelled");
        self.events.push(GameEvent::CountdownHide);
        self.status("Countdown cancelled.", StatusTone::Info);
        self.controls(Controls::IDLE);
        true
    }

    /// Stop control: cancels a countdown or aborts a running session
    pub fn stop(&mut self, now: f64) {
        match self.phase {
            SessionPhase::Countdown => {
                self.cancel_countdown();
            }
            SessionPhase::Running => self.end_session(now, true),
            SessionPhase::Idle | SessionPhase::Ended => {}
        }
    }

    fn begin_running(&mut self, pending: PendingStart, now: f64) {
        self.timers.cancel_all();
        self.events.push(GameEvent::CountdownHide);

        let mut targets = TargetScheduler::new(Rc::clone(&pending.preset), &pending.difficulty);
        targets.spawn(now, self.surface, &mut self.rng);
        targets.schedule_next_spawn(now, &mut self.rng);

        self.session = Some(SessionContext {
            difficulty: pending.difficulty,
            metrics: SessionMetrics::default(),
            targets,
            ends_at: now + SESSION_DURATION_MS,
            last_frame_at: now,
        });
        self.phase = SessionPhase::Running;

        self.effects.clear();
        self.background.reset();
        self.refresh_background(now);

        log::info!("Session started");
        self.events.push(GameEvent::FinishBanner { visible: false });
        self.status("Session started. Good luck!", StatusTone::Info);
        self.controls(Controls::ACTIVE);
    }

    /// Running -> Ended -> Idle
    fn end_session(&mut self, now: f64, aborted: bool) {
        let Some(mut ctx) = self.session.take() else {
            return;
        };
        self.phase = SessionPhase::Ended;
        self.timers.cancel_all();
        ctx.targets.clear();
        ctx.last_frame_at = now;

        self.events.push(GameEvent::CountdownHide);
        self.controls(Controls::IDLE);
        if aborted {
            log::info!("Session stopped");
            self.events.push(GameEvent::FinishBanner { visible: false });
            self.status("Session stopped.", StatusTone::Info);
        } else {
            log::info!("Session complete: score {}", ctx.metrics.score.round());
            self.events.push(GameEvent::FinishBanner { visible: true });
            self.events.push(GameEvent::Sound(SoundCue::Finish));
            self.status("Session complete!", StatusTone::Success);
        }

        let record = if aborted && ctx.metrics.attempts() == 0 {
            log::debug!("Aborted before any attempt, not archiving");
            None
        } else {
            let played_at = self.clock.wall_time();
            let record = SessionRecord::from_metrics(
                self.new_record_id(),
                &ctx.metrics,
                &ctx.difficulty,
                played_at,
            );
            self.history = self.archive.record(record.clone(), played_at);
            self.events
                .push(GameEvent::HistoryUpdated(self.history.clone()));
            Some(record)
        };
        self.events.push(GameEvent::SessionEnded { record, aborted });

        self.last_metrics = ctx.metrics;
        self.phase = SessionPhase::Idle;
    }

    fn new_record_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill(&mut bytes);
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }

    // === Frame & input ===

    /// Fire due timers, then step the running session
    pub fn update(&mut self, now: f64) {
        while let Some(fired) = self.timers.pop_due(now) {
            if !self.timers.is_current(fired.token) {
                continue;
            }
            let Some(pending) = self.pending.as_ref() else {
                continue;
            };
            if pending.token != fired.token || self.phase != SessionPhase::Countdown {
                continue;
            }
            match fired.event {
                TimerEvent::CountdownStep(step) => self.countdown_step(step, fired.due_at),
                TimerEvent::CountdownExpire => {
                    if let Some(pending) = self.pending.take() {
                        self.begin_running(pending, fired.due_at);
                    }
                }
            }
        }

        let outcome = match self.session.as_mut() {
            Some(ctx) if self.phase == SessionPhase::Running => {
                tick(ctx, now, self.surface, &mut self.rng, &mut self.events)
            }
            _ => return,
        };
        match outcome {
            FrameOutcome::TimeExpired => self.end_session(now, false),
            FrameOutcome::Continue => self.refresh_background(now),
        }
    }

    /// Resolve a shot at a surface coordinate. `None` outside a running session.
    pub fn shoot(&mut self, point: Vec2, now: f64) -> Option<ShotOutcome> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        let ctx = self.session.as_mut()?;
        let outcome = resolve_shot(&mut ctx.targets, &mut ctx.metrics, point, now);
        match outcome {
            ShotOutcome::Hit { critical, .. } => {
                ctx.targets.schedule_next_spawn(now, &mut self.rng);
                if critical {
                    self.status("Critical!", StatusTone::Success);
                    self.events.push(GameEvent::Sound(SoundCue::Critical));
                } else {
                    self.status("Nice shot!", StatusTone::Success);
                    self.events.push(GameEvent::Sound(SoundCue::Hit));
                }
            }
            ShotOutcome::Miss => {
                self.status("Missed shot.", StatusTone::Warning);
                self.events.push(GameEvent::Sound(SoundCue::Miss));
            }
        }
        self.refresh_background(now);
        Some(outcome)
    }

    /// Draw list for this frame; finished effects are dropped here
    pub fn compose_scene(&mut self, now: f64, image_ready: impl Fn(&str) -> bool) -> Vec<DrawCmd> {
        let effects = self.effects.live(now);
        let targets = self
            .session
            .as_ref()
            .map_or(&[][..], |ctx| ctx.targets.targets());
        shapes::scene(self.surface, targets, effects, now, image_ready)
    }

    // === Background ===

    fn refresh_background(&mut self, now: f64) {
        let kills = self.metrics().kills;
        if let Some(change) = self.background.update(kills) {
            self.apply_stage(change, now);
        }
    }

    fn apply_stage(&mut self, change: StageChange, now: f64) {
        log::debug!("Background stage {}", change.index);
        if change.image.is_some() && self.settings.effective_drift() {
            self.drift.start(now);
        } else {
            self.drift.cancel();
        }
        if change.burst && self.settings.effective_bursts() {
            self.effects
                .push(Effect::burst(now, self.surface, &mut self.rng));
        }
        self.events
            .push(GameEvent::BackgroundChanged { image: change.image });
    }

    // === Helpers ===

    fn status(&mut self, message: &'static str, tone: StatusTone) {
        self.events.push(GameEvent::Status { message, tone });
    }

    fn controls(&mut self, controls: Controls) {
        self.events.push(GameEvent::Controls(controls));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::platform::ManualClock;
    use crate::tuning::{BackgroundStage, DifficultyPreset};
    use chrono::TimeZone;

    const SURFACE: Vec2 = Vec2::new(800.0, 600.0);

    fn still() -> DifficultyPreset {
        DifficultyPreset {
            radius: 20.0,
            speed: [0.0, 0.0],
            lifetime_ms: 5000.0,
            spawn_interval_ms: [0.0, 0.0],
            max_concurrent: 1,
            critical_threshold_px: 5.0,
        }
    }

    fn engine_with(stages: BackgroundStages) -> (Engine, ManualClock) {
        let clock = ManualClock::new(chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        let mut presets = PresetStore::builtin();
        presets.insert("still", &still());
        let engine = Engine::new(
            presets,
            stages,
            Settings::default(),
            ResultArchive::new(Box::new(MemoryStore::new())),
            Box::new(clock.clone()),
            SURFACE,
            12345,
        );
        (engine, clock)
    }

    fn engine() -> (Engine, ManualClock) {
        engine_with(BackgroundStages::default())
    }

    /// Start "still" at t=0 and run through the countdown
    fn running(engine: &mut Engine) -> f64 {
        engine.start_countdown(Some("still"), 0.0).unwrap();
        engine.update(3000.0);
        assert!(engine.is_running());
        3000.0
    }

    fn statuses(events: &[GameEvent]) -> Vec<&'static str> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Status { message, .. } => Some(*message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_missing_difficulty_is_rejected() {
        let (mut engine, _) = engine();
        engine.drain_events();
        let err = engine.start_countdown(None, 0.0).unwrap_err();
        assert!(matches!(err, StartError::Config(ConfigError::NoDifficultySelected)));
        let err = engine.start_countdown(Some("nightmare"), 0.0).unwrap_err();
        assert!(matches!(err, StartError::Config(ConfigError::UnknownDifficulty(_))));
        assert_eq!(engine.phase(), SessionPhase::Idle);

        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::Status {
            message: "Select a valid difficulty to start.",
            tone: StatusTone::Error,
        }));
        assert!(events.contains(&GameEvent::Controls(Controls::IDLE)));
    }

    #[test]
    fn test_countdown_ticks_then_runs() {
        let (mut engine, _) = engine();
        engine.drain_events();
        engine.start_countdown(Some("still"), 0.0).unwrap();
        assert_eq!(engine.phase(), SessionPhase::Countdown);
        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::CountdownShow("3")));
        assert!(events.contains(&GameEvent::Controls(Controls::ACTIVE)));

        engine.update(999.0);
        assert!(engine.drain_events().is_empty());
        engine.update(1000.0);
        assert!(engine.drain_events().contains(&GameEvent::CountdownShow("2")));
        engine.update(2000.0);
        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::CountdownShow("1")));
        assert!(events.contains(&GameEvent::Sound(SoundCue::Countdown)));
        assert_eq!(engine.phase(), SessionPhase::Countdown);

        engine.update(3000.0);
        assert!(engine.is_running());
        assert_eq!(engine.targets().len(), 1);
        assert_eq!(engine.targets()[0].created_at, 3000.0);
        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::CountdownHide));
        assert_eq!(statuses(&events), ["Session started. Good luck!"]);
    }

    #[test]
    fn test_late_poll_keeps_countdown_cadence() {
        let (mut engine, _) = engine();
        engine.start_countdown(Some("still"), 0.0).unwrap();
        engine.update(4000.0);
        assert!(engine.is_running());
        assert_eq!(engine.targets()[0].created_at, 3000.0);
        assert_eq!(engine.remaining_ms(4000.0), Some(59_000.0));
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let (mut engine, _) = engine();
        engine.start_countdown(Some("still"), 0.0).unwrap();
        assert!(matches!(
            engine.start_countdown(Some("easy"), 10.0),
            Err(StartError::AlreadyActive)
        ));
        assert_eq!(engine.difficulty(), Some("still"));
        engine.update(3000.0);
        assert!(matches!(
            engine.start_countdown(Some("easy"), 3010.0),
            Err(StartError::AlreadyActive)
        ));
        assert!(engine.is_running());
    }

    #[test]
    fn test_cancel_countdown_is_idempotent() {
        let (mut engine, _) = engine();
        engine.drain_events();
        assert!(!engine.cancel_countdown());
        assert!(engine.drain_events().is_empty());

        engine.start_countdown(Some("still"), 0.0).unwrap();
        assert!(engine.cancel_countdown());
        assert_eq!(engine.phase(), SessionPhase::Idle);
        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::CountdownHide));
        assert!(events.contains(&GameEvent::Controls(Controls::IDLE)));

        // Stale timers must not start anything
        engine.update(10_000.0);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert!(!engine.cancel_countdown());
    }

    #[test]
    fn test_restart_after_cancel_ignores_old_timers() {
        let (mut engine, _) = engine();
        engine.start_countdown(Some("still"), 0.0).unwrap();
        engine.update(1500.0);
        engine.cancel_countdown();
        engine.start_countdown(Some("easy"), 1600.0).unwrap();
        // Old schedule would have expired at 3000
        engine.update(3000.0);
        assert_eq!(engine.phase(), SessionPhase::Countdown);
        engine.update(4600.0);
        assert!(engine.is_running());
        assert_eq!(engine.difficulty(), Some("easy"));
    }

    #[test]
    fn test_hit_and_miss_through_engine() {
        let (mut engine, _) = engine();
        let now = running(&mut engine);
        engine.drain_events();

        let target = engine.targets()[0].pos;
        let outcome = engine.shoot(target + Vec2::new(3.0, 0.0), now + 250.0).unwrap();
        assert!(matches!(outcome, ShotOutcome::Hit { critical: true, .. }));
        assert_eq!(engine.metrics().kills, 1);
        assert_eq!(engine.metrics().total_kill_time_ms, 250.0);

        let far = if target.x > 400.0 { 5.0 } else { 795.0 };
        assert_eq!(engine.shoot(Vec2::new(far, 5.0), now + 300.0), Some(ShotOutcome::Miss));
        assert_eq!(engine.metrics().misses, 1);
        assert_eq!(engine.metrics().streak, 0);

        let events = engine.drain_events();
        assert_eq!(statuses(&events), ["Critical!", "Missed shot."]);
        assert!(events.contains(&GameEvent::Sound(SoundCue::Critical)));
        assert!(events.contains(&GameEvent::Sound(SoundCue::Miss)));
    }

    #[test]
    fn test_shots_ignored_when_not_running() {
        let (mut engine, _) = engine();
        assert_eq!(engine.shoot(Vec2::new(10.0, 10.0), 0.0), None);
        engine.start_countdown(Some("still"), 0.0).unwrap();
        assert_eq!(engine.shoot(Vec2::new(10.0, 10.0), 10.0), None);
        assert_eq!(engine.metrics().misses, 0);
    }

    #[test]
    fn test_hit_reschedules_spawn() {
        let (mut engine, _) = engine();
        let now = running(&mut engine);
        let pos = engine.targets()[0].pos;
        engine.shoot(pos, now + 100.0);
        assert!(engine.targets().is_empty());
        // Zero interval: replacement on the next frame
        engine.update(now + 116.0);
        assert_eq!(engine.targets().len(), 1);
        assert_eq!(engine.targets()[0].created_at, now + 116.0);
    }

    #[test]
    fn test_session_ends_after_sixty_seconds() {
        let (mut engine, _) = engine();
        let start = running(&mut engine);
        engine.shoot(engine.targets()[0].pos, start + 10.0);
        engine.drain_events();

        engine.update(start + 59_999.0);
        assert!(engine.is_running());
        engine.update(start + 60_000.0);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert!(engine.targets().is_empty());

        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::FinishBanner { visible: true }));
        assert!(events.contains(&GameEvent::Sound(SoundCue::Finish)));
        assert!(statuses(&events).contains(&"Session complete!"));
        let ended = events.iter().find_map(|e| match e {
            GameEvent::SessionEnded { record, aborted } => Some((record.clone(), *aborted)),
            _ => None,
        });
        let (record, aborted) = ended.unwrap();
        assert!(!aborted);
        let record = record.unwrap();
        assert_eq!(record.difficulty, "still");
        assert_eq!(record.kills, 1);
        assert_eq!(uuid::Uuid::parse_str(&record.id).unwrap().get_version_num(), 4);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.hud(start + 60_001.0).time_remaining, "0.0 s");
        assert_eq!(engine.hud(start + 60_001.0).kills, "1");
    }

    #[test]
    fn test_abort_without_attempts_is_not_archived() {
        let (mut engine, _) = engine();
        let now = running(&mut engine);
        engine.stop(now + 500.0);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert!(engine.history().is_empty());
        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::SessionEnded {
            record: None,
            aborted: true
        }));
        assert!(events.contains(&GameEvent::FinishBanner { visible: false }));
    }

    #[test]
    fn test_abort_with_a_miss_is_archived() {
        let (mut engine, _) = engine();
        let now = running(&mut engine);
        let target = engine.targets()[0].pos;
        let far = if target.y > 300.0 { 5.0 } else { 595.0 };
        engine.shoot(Vec2::new(target.x, far), now + 100.0);
        engine.stop(now + 500.0);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history()[0].misses, 1);
        assert_eq!(engine.history()[0].accuracy, 0.0);
    }

    #[test]
    fn test_stop_during_countdown_cancels() {
        let (mut engine, _) = engine();
        engine.start_countdown(Some("still"), 0.0).unwrap();
        engine.stop(500.0);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert!(statuses(&engine.drain_events()).contains(&"Countdown cancelled."));
        engine.stop(600.0);
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_background_burst_on_stage_change() {
        let stages = BackgroundStages::new(vec![
            BackgroundStage {
                threshold: 0.0,
                image: "a.png".into(),
            },
            BackgroundStage {
                threshold: 2.0,
                image: "b.png".into(),
            },
        ]);
        let (mut engine, _) = engine_with(stages);
        assert_eq!(engine.background_index(), Some(0));
        assert!(engine.drain_events().contains(&GameEvent::BackgroundChanged {
            image: Some("a.png".into())
        }));
        assert!(engine.background_offset(0.0).is_some());

        let mut now = running(&mut engine);
        assert_eq!(engine.effect_count(), 0);
        engine.drain_events();
        for _ in 0..2 {
            now += 20.0;
            engine.update(now);
            let pos = engine.targets()[0].pos;
            engine.shoot(pos, now);
        }
        assert_eq!(engine.background_index(), Some(1));
        assert_eq!(engine.effect_count(), 1);
        let changes = engine
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::BackgroundChanged { .. }))
            .count();
        assert_eq!(changes, 1);

        // Burst is drawn, then dropped once finished
        let cmds = engine.compose_scene(now + 10.0, |_| false);
        assert!(cmds.iter().any(|c| matches!(c, DrawCmd::StrokeCircle { .. })));
        engine.compose_scene(now + 700.0, |_| false);
        assert_eq!(engine.effect_count(), 0);
    }

    #[test]
    fn test_reduced_motion_suppresses_burst() {
        let stages = BackgroundStages::new(vec![BackgroundStage {
            threshold: 1.0,
            image: "b.png".into(),
        }]);
        let (mut engine, _) = engine_with(stages);
        engine.apply_settings(
            Settings {
                reduced_motion: true,
                ..Default::default()
            },
            0.0,
        );
        let now = running(&mut engine);
        let pos = engine.targets()[0].pos;
        engine.shoot(pos, now + 10.0);
        assert_eq!(engine.background_index(), Some(1));
        assert_eq!(engine.effect_count(), 0);
        assert_eq!(engine.background_offset(now + 20.0), None);
    }

    #[test]
    fn test_drift_only_runs_on_stages_with_an_image() {
        // Sentinel stage 0 has no image
        let stages = BackgroundStages::new(vec![BackgroundStage {
            threshold: 1.0,
            image: "b.png".into(),
        }]);
        let (mut engine, _) = engine_with(stages);
        assert_eq!(engine.background_index(), Some(0));
        assert_eq!(engine.background_offset(0.0), None);

        let now = running(&mut engine);
        assert_eq!(engine.background_offset(now), None);
        let pos = engine.targets()[0].pos;
        engine.shoot(pos, now + 10.0);
        assert_eq!(engine.background_index(), Some(1));
        assert!(engine.background_offset(now + 20.0).is_some());
        engine.stop(now + 30.0);

        engine.start_countdown(Some("still"), 10_000.0).unwrap();
        engine.update(13_000.0);
        assert_eq!(engine.background_index(), Some(0));
        assert_eq!(engine.background_offset(13_000.0), None);
        assert!(engine.drain_events().contains(&GameEvent::BackgroundChanged { image: None }));
    }

    #[test]
    fn test_settings_change_toggles_running_drift() {
        let stages = BackgroundStages::new(vec![BackgroundStage {
            threshold: 0.0,
            image: "a.png".into(),
        }]);
        let (mut engine, _) = engine_with(stages);
        assert!(engine.background_offset(100.0).is_some());

        let calm = Settings {
            background_drift: false,
            ..Default::default()
        };
        engine.apply_settings(calm.clone(), 100.0);
        assert_eq!(engine.settings(), &calm);
        assert_eq!(engine.background_offset(200.0), None);

        engine.apply_settings(Settings::default(), 300.0);
        assert_eq!(
            engine.background_offset(300.0),
            Some(DriftConfig::default().position_at(0.0))
        );
    }

    #[test]
    fn test_new_session_restarts_stage_without_burst() {
        let stages = BackgroundStages::new(vec![
            BackgroundStage {
                threshold: 0.0,
                image: "a.png".into(),
            },
            BackgroundStage {
                threshold: 1.0,
                image: "b.png".into(),
            },
        ]);
        let (mut engine, _) = engine_with(stages);
        let now = running(&mut engine);
        let pos = engine.targets()[0].pos;
        engine.shoot(pos, now + 10.0);
        assert_eq!(engine.background_index(), Some(1));
        engine.stop(now + 20.0);

        engine.start_countdown(Some("still"), 10_000.0).unwrap();
        engine.update(13_000.0);
        assert_eq!(engine.background_index(), Some(0));
        assert_eq!(engine.effect_count(), 0);
    }
}
