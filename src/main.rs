//! Aim Trainer entry point
//!
//! The browser build wires the engine to the page; the native build runs a
//! headless demo session.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        Document, Element, Event, HtmlAudioElement, HtmlButtonElement, HtmlCanvasElement,
        HtmlElement, HtmlImageElement, HtmlInputElement, HtmlSelectElement, MouseEvent,
    };

    use aim_trainer::assets::{AssetStore, preload};
    use aim_trainer::audio::AudioManager;
    use aim_trainer::history::{EMPTY_HISTORY_MESSAGE, RESULTS_TABLE_COLUMNS, SessionRecord};
    use aim_trainer::persistence::LocalStore;
    use aim_trainer::platform::SystemClock;
    use aim_trainer::renderer::CanvasRenderer;
    use aim_trainer::sim::{Controls, Engine, GameEvent};
    use aim_trainer::tuning::{AssetManifest, BackgroundStages, PresetStore};
    use aim_trainer::{ResultArchive, Settings};

    /// Preference inputs; the page may leave them out
    struct SettingsControls {
        volume: HtmlInputElement,
        muted: HtmlInputElement,
        drift: HtmlInputElement,
        bursts: HtmlInputElement,
        reduced_motion: HtmlInputElement,
    }

    impl SettingsControls {
        fn find(document: &Document) -> Option<Self> {
            Some(Self {
                volume: element(document, "setting-volume")?,
                muted: element(document, "setting-mute")?,
                drift: element(document, "setting-drift")?,
                bursts: element(document, "setting-bursts")?,
                reduced_motion: element(document, "setting-reduced-motion")?,
            })
        }

        fn inputs(&self) -> [&HtmlInputElement; 5] {
            [
                &self.volume,
                &self.muted,
                &self.drift,
                &self.bursts,
                &self.reduced_motion,
            ]
        }

        fn show(&self, settings: &Settings) {
            self.volume
                .set_value_as_number(f64::from(settings.master_volume) * 100.0);
            self.muted.set_checked(settings.muted);
            self.drift.set_checked(settings.background_drift);
            self.bursts.set_checked(settings.stage_bursts);
            self.reduced_motion.set_checked(settings.reduced_motion);
        }

        fn read(&self, current: &Settings) -> Settings {
            let volume = self.volume.value_as_number();
            Settings {
                master_volume: if volume.is_finite() {
                    (volume / 100.0).clamp(0.0, 1.0) as f32
                } else {
                    current.master_volume
                },
                muted: self.muted.checked(),
                background_drift: self.drift.checked(),
                stage_bursts: self.bursts.checked(),
                reduced_motion: self.reduced_motion.checked(),
            }
        }
    }

    /// Page elements the game talks to
    struct Page {
        document: Document,
        start_button: HtmlButtonElement,
        stop_button: HtmlButtonElement,
        difficulty: HtmlSelectElement,
        status: HtmlElement,
        finish_banner: Element,
        countdown: Option<Element>,
        settings: Option<SettingsControls>,
    }

    impl Page {
        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn set_status(&self, message: &str, tone: &str) {
            self.status.set_text_content(Some(message));
            let _ = self.status.dataset().set("tone", tone);
        }

        fn set_visible(el: &Element, visible: bool) {
            let classes = el.class_list();
            let _ = if visible {
                classes.add_1("is-visible")
            } else {
                classes.remove_1("is-visible")
            };
            let _ = el.set_attribute("aria-hidden", if visible { "false" } else { "true" });
        }

        fn set_controls(&self, controls: Controls) {
            self.start_button.set_disabled(!controls.start_enabled);
            self.stop_button.set_disabled(!controls.stop_enabled);
        }

        fn show_countdown(&self, value: &str) {
            if let Some(el) = &self.countdown {
                el.set_text_content(Some(value));
                Self::set_visible(el, true);
            }
        }

        fn hide_countdown(&self) {
            if let Some(el) = &self.countdown {
                Self::set_visible(el, false);
                el.set_text_content(Some(""));
            }
        }

        /// Rebuild the recent results table body
        fn render_results(&self, results: &[SessionRecord]) {
            let Some(tbody) = self.document.get_element_by_id("recent-results-body") else {
                return;
            };
            tbody.set_inner_html("");
            let append_row = |cells: &[String], colspan: Option<u32>| -> Result<(), JsValue> {
                let row = self.document.create_element("tr")?;
                for value in cells {
                    let cell = self.document.create_element("td")?;
                    if let Some(span) = colspan {
                        cell.set_attribute("colspan", &span.to_string())?;
                    }
                    cell.set_text_content(Some(value));
                    row.append_child(&cell)?;
                }
                tbody.append_child(&row)?;
                Ok(())
            };
            let result = if results.is_empty() {
                append_row(
                    &[EMPTY_HISTORY_MESSAGE.to_string()],
                    Some(RESULTS_TABLE_COLUMNS as u32),
                )
            } else {
                results
                    .iter()
                    .try_for_each(|record| append_row(&record.table_cells(), None))
            };
            if let Err(e) = result {
                log::warn!("Failed to render results table: {e:?}");
            }
        }
    }

    /// Game instance holding all state
    struct Game {
        engine: Engine,
        renderer: CanvasRenderer,
        audio: AudioManager,
        page: Page,
        images: Rc<RefCell<AssetStore<HtmlImageElement>>>,
        sounds: Rc<RefCell<AssetStore<HtmlAudioElement>>>,
        assets_ready: bool,
        store: LocalStore,
    }

    impl Game {
        /// One animation frame
        fn frame(&mut self, time: f64) {
            self.engine.set_surface(self.renderer.size());
            self.engine.update(time);
            self.flush_events();
            self.render(time);
            self.update_hud(time);
            // Drift depends only on time since the stage change
            self.update_drift(time);
        }

        /// Apply engine signals to the page
        fn flush_events(&mut self) {
            for event in self.engine.drain_events() {
                match event {
                    GameEvent::Status { message, tone } => {
                        self.page.set_status(message, tone.as_str())
                    }
                    GameEvent::Sound(cue) => self.audio.play(cue, &self.sounds.borrow()),
                    GameEvent::CountdownShow(value) => self.page.show_countdown(value),
                    GameEvent::CountdownHide => self.page.hide_countdown(),
                    GameEvent::Controls(controls) => self.page.set_controls(controls),
                    GameEvent::FinishBanner { visible } => {
                        Page::set_visible(&self.page.finish_banner, visible)
                    }
                    GameEvent::BackgroundChanged { image } => self.apply_background(image),
                    GameEvent::HistoryUpdated(history) => self.page.render_results(&history),
                    GameEvent::SessionEnded { record, aborted } => {
                        log::info!(
                            "Session ended (aborted: {aborted}, archived: {})",
                            record.is_some()
                        );
                    }
                }
            }
        }

        fn apply_background(&self, image: Option<String>) {
            let style = self.renderer.canvas().style();
            match image {
                Some(url) => {
                    let _ = style.set_property("background-image", &format!("url('{url}')"));
                    let _ = style.set_property("background-size", "cover");
                    let _ = style.set_property("background-repeat", "no-repeat");
                    let _ = style.set_property("background-position", "50% 50%");
                }
                None => {
                    let _ = style.set_property("background-image", "");
                }
            }
        }

        fn update_drift(&self, time: f64) {
            if let Some(pos) = self.engine.background_offset(time) {
                let _ = self
                    .renderer
                    .canvas()
                    .style()
                    .set_property("background-position", &format!("{}% {}%", pos.x, pos.y));
            }
        }

        fn render(&mut self, time: f64) {
            let images = self.images.borrow();
            let ready = self.assets_ready;
            let cmds = self
                .engine
                .compose_scene(time, |key| {
                    ready && images.is_usable(key, HtmlImageElement::complete)
                });
            self.renderer.render(&cmds, &images);
        }

        fn update_hud(&self, time: f64) {
            let hud = self.engine.hud(time);
            for (id, text) in hud.fields() {
                self.page.set_text(id, text);
            }
        }

        fn on_start(&mut self) {
            let now = self.engine.now_ms();
            let key = self.page.difficulty.value();
            if let Err(e) = self.engine.start_countdown(Some(&key), now) {
                log::info!("Start ignored: {e}");
            }
            self.flush_events();
        }

        fn on_stop(&mut self) {
            let now = self.engine.now_ms();
            self.engine.stop(now);
            self.flush_events();
            self.render(now);
            self.update_hud(now);
        }

        /// Save, then hand the new settings to the engine and the mixer
        fn on_settings_changed(&mut self) {
            let Some(controls) = &self.page.settings else {
                return;
            };
            let settings = controls.read(self.engine.settings());
            if &settings == self.engine.settings() {
                return;
            }
            settings.save(&mut self.store);
            self.audio.apply_settings(&settings);
            let now = self.engine.now_ms();
            self.engine.apply_settings(settings, now);
        }

        /// Shots resolve and redraw immediately
        fn on_shot(&mut self, event: &MouseEvent) {
            let rect = self.renderer.canvas().get_bounding_client_rect();
            let point = Vec2::new(
                (f64::from(event.client_x()) - rect.left()) as f32,
                (f64::from(event.client_y()) - rect.top()) as f32,
            );
            let now = self.engine.now_ms();
            if self.engine.shoot(point, now).is_some() {
                self.flush_events();
                self.update_hud(now);
                self.render(now);
            }
        }
    }

    /// Parse a `<script type="application/json">` block; missing or broken is `{}`
    fn json_script(document: &Document, id: &str) -> serde_json::Value {
        let Some(text) = document
            .get_element_by_id(id)
            .and_then(|el| el.text_content())
        else {
            return serde_json::Value::Object(Default::default());
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::error!("Failed to parse JSON block #{id}: {e}");
            serde_json::Value::Object(Default::default())
        })
    }

    fn element<T: JsCast>(document: &Document, id: &str) -> Option<T> {
        document.get_element_by_id(id)?.dyn_into::<T>().ok()
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Aim Trainer starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let (
            Some(canvas),
            Some(start_button),
            Some(stop_button),
            Some(difficulty),
            Some(status),
            Some(finish_banner),
        ) = (
            element::<HtmlCanvasElement>(&document, "aim-canvas"),
            element::<HtmlButtonElement>(&document, "start-button"),
            element::<HtmlButtonElement>(&document, "stop-button"),
            element::<HtmlSelectElement>(&document, "difficulty-select"),
            element::<HtmlElement>(&document, "game-status"),
            document.get_element_by_id("finish-banner"),
        )
        else {
            log::warn!("Aim Trainer: required DOM elements are missing");
            return;
        };
        let countdown = document.get_element_by_id("countdown-overlay");
        if countdown.is_none() {
            log::warn!("Aim Trainer: countdown overlay element is missing");
        }

        let renderer = match CanvasRenderer::new(canvas.clone()) {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("Canvas unavailable: {e:?}");
                return;
            }
        };

        let presets = PresetStore::from_value(json_script(&document, "difficulty-data"));
        let image_manifest = AssetManifest::from_value(&json_script(&document, "target-assets"));
        let audio_manifest = AssetManifest::from_value(&json_script(&document, "audio-assets"));
        let stages = BackgroundStages::from_value(&json_script(&document, "background-assets"));

        let store = LocalStore::new();
        let settings = Settings::load(&store);
        let clock = SystemClock::new();
        let seed = js_sys::Date::now() as u64;
        let engine = Engine::new(
            presets,
            stages,
            settings.clone(),
            ResultArchive::new(Box::new(store.clone())),
            Box::new(clock),
            renderer.size(),
            seed,
        );
        log::info!("Engine initialized with seed: {seed}");

        let settings_controls = SettingsControls::find(&document);
        let page = Page {
            document,
            start_button,
            stop_button,
            difficulty,
            status,
            finish_banner,
            countdown,
            settings: settings_controls,
        };
        if let Some(controls) = &page.settings {
            controls.show(&settings);
        }
        page.render_results(engine.history());
        Page::set_visible(&page.finish_banner, false);
        page.set_controls(Controls::IDLE);

        let images = Rc::new(RefCell::new(AssetStore::new()));
        let sounds = Rc::new(RefCell::new(AssetStore::new()));
        let game = Rc::new(RefCell::new(Game {
            engine,
            renderer,
            audio: AudioManager::new(&settings),
            page,
            images: Rc::clone(&images),
            sounds: Rc::clone(&sounds),
            assets_ready: false,
            store,
        }));
        game.borrow_mut().flush_events();

        setup_input_handlers(&canvas, game.clone());
        request_animation_frame(game.clone());

        // Preload in the background; play works with fallbacks meanwhile
        {
            let game = game.clone();
            wasm_bindgen_futures::spawn_local(async move {
                preload(&image_manifest, images, &audio_manifest, sounds).await;
                let mut g = game.borrow_mut();
                let now = g.engine.now_ms();
                g.assets_ready = true;
                g.engine.on_assets_ready(now);
                let missing = g.images.borrow().missing() + g.sounds.borrow().missing();
                if missing > 0 {
                    log::warn!("{missing} assets failed to load");
                    g.engine.on_assets_failed();
                }
                g.flush_events();
            });
        }

        log::info!("Aim Trainer running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Shots
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                game.borrow_mut().on_shot(&event);
            });
            let _ =
                canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Start
        {
            let game = game.clone();
            let button = game.borrow().page.start_button.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().on_start();
            });
            let _ =
                button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Settings
        let inputs: Vec<HtmlInputElement> = game
            .borrow()
            .page
            .settings
            .iter()
            .flat_map(|controls| controls.inputs().map(Clone::clone))
            .collect();
        for input in inputs {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
                game.borrow_mut().on_settings_changed();
            });
            let _ =
                input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Stop / cancel countdown
        {
            let button = game.borrow().page.stop_button.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().on_stop();
            });
            let _ =
                button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Continuous loop: timers, simulation, render and drift all ride the
    /// same frame callback
    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");
        let closure = Closure::once(move |time: f64| {
            game.borrow_mut().frame(time);
            request_animation_frame(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Aim Trainer (native) starting...");
    log::info!("The playable build targets the browser - run with `trunk serve`");

    if let Err(e) = demo::run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless session with a scripted shooter
#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::error::Error;
    use std::path::PathBuf;

    use chrono::Utc;
    use glam::Vec2;

    use aim_trainer::persistence::FileStore;
    use aim_trainer::platform::{Clock, ManualClock};
    use aim_trainer::sim::{Engine, GameEvent, SessionPhase};
    use aim_trainer::tuning::{BackgroundStages, PresetStore};
    use aim_trainer::{ResultArchive, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Time the bot needs between shots
    const REACTION_MS: f64 = 280.0;
    /// Every Nth shot is pulled wide
    const WILD_SHOT_EVERY: u32 = 7;
    const SURFACE: Vec2 = Vec2::new(960.0, 540.0);
    const SEED: u64 = 12345;

    pub fn run() -> Result<(), Box<dyn Error>> {
        let dir = std::env::var_os("AIM_TRAINER_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("aim-trainer"));
        log::info!("Storing results in {}", dir.display());

        let settings = Settings::load(&FileStore::new(&dir));
        let clock = ManualClock::new(Utc::now());
        let mut engine = Engine::new(
            PresetStore::builtin(),
            BackgroundStages::default(),
            settings,
            ResultArchive::new(Box::new(FileStore::new(&dir))),
            Box::new(clock.clone()),
            SURFACE,
            SEED,
        );

        engine.start_countdown(Some("normal"), clock.now_ms())?;

        let mut next_shot = 0.0;
        let mut shots = 0u32;
        let mut ended = false;
        while !ended {
            let now = clock.advance(FRAME_MS);
            engine.update(now);

            if engine.phase() == SessionPhase::Running && now >= next_shot {
                // Oldest target first, like a player clearing the board
                if let Some(target) = engine.targets().first() {
                    shots += 1;
                    let aim = if shots % WILD_SHOT_EVERY == 0 {
                        target.pos + Vec2::splat(target.radius * 2.0)
                    } else {
                        target.pos + Vec2::new(target.radius * 0.2, 0.0)
                    };
                    engine.shoot(aim, now);
                    next_shot = now + REACTION_MS;
                }
            }

            for event in engine.drain_events() {
                match event {
                    GameEvent::Status { message, tone } => {
                        log::debug!("[{}] {message}", tone.as_str())
                    }
                    GameEvent::SessionEnded { record, .. } => {
                        ended = true;
                        if let Some(record) = record {
                            log::info!("Archived session {}", record.id);
                        }
                    }
                    _ => {}
                }
            }
        }

        let hud = engine.hud(clock.now_ms());
        for (field, value) in hud.fields() {
            log::info!("{field}: {value}");
        }
        log::info!("{} sessions in history", engine.history().len());
        Ok(())
    }
}
