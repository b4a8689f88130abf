//! Sound cues
//!
//! The simulation only names cues; the browser build plays them from the
//! preloaded clips. A missing clip or a refused `play()` (autoplay policy)
//! means silence, never an error.

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Target hit
    Hit,
    /// Target hit inside the critical zone
    Critical,
    /// Shot missed or target expired
    Miss,
    /// Session ran to the end
    Finish,
    /// Countdown tick
    Countdown,
}

impl SoundCue {
    pub const ALL: [SoundCue; 5] = [
        SoundCue::Hit,
        SoundCue::Critical,
        SoundCue::Miss,
        SoundCue::Finish,
        SoundCue::Countdown,
    ];

    /// Key in the audio manifest
    pub fn key(&self) -> &'static str {
        match self {
            SoundCue::Hit => "hit",
            SoundCue::Critical => "critical",
            SoundCue::Miss => "miss",
            SoundCue::Finish => "finish",
            SoundCue::Countdown => "countdown",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cue| cue.key() == key)
    }

    /// Mix level before master volume
    pub fn base_volume(&self) -> f32 {
        match self {
            SoundCue::Hit => 0.35,
            SoundCue::Critical => 0.5,
            SoundCue::Miss => 0.3,
            SoundCue::Finish => 0.6,
            SoundCue::Countdown => 0.5,
        }
    }
}

/// Volume for a manifest key that isn't a known cue
pub const DEFAULT_CLIP_VOLUME: f32 = 0.4;

/// Base volume for any audio manifest key
pub fn clip_volume(key: &str) -> f32 {
    SoundCue::from_key(key).map_or(DEFAULT_CLIP_VOLUME, |cue| cue.base_volume())
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlAudioElement;

    use super::SoundCue;
    use crate::assets::AssetStore;
    use crate::settings::Settings;

    /// Plays cues from preloaded clips
    pub struct AudioManager {
        settings: Settings,
    }

    impl AudioManager {
        pub fn new(settings: &Settings) -> Self {
            Self {
                settings: settings.clone(),
            }
        }

        pub fn apply_settings(&mut self, settings: &Settings) {
            self.settings = settings.clone();
        }

        /// Play a fresh copy of the clip so overlapping cues don't cut each other off
        pub fn play(&self, cue: SoundCue, clips: &AssetStore<HtmlAudioElement>) {
            let vol = self.settings.cue_volume(cue);
            if vol <= 0.0 {
                return;
            }
            let Some(base) = clips.get(cue.key()) else {
                return;
            };

            let instance = match base.clone_node() {
                Ok(node) => match node.dyn_into::<HtmlAudioElement>() {
                    Ok(audio) => audio,
                    Err(_) => return,
                },
                Err(e) => {
                    log::debug!("Unable to clone sound {}: {:?}", cue.key(), e);
                    return;
                }
            };
            instance.set_volume(f64::from(vol));

            match instance.play() {
                Ok(promise) => {
                    // Swallow autoplay rejections
                    let key = cue.key();
                    let on_reject = Closure::<dyn FnMut(JsValue)>::new(move |e: JsValue| {
                        log::debug!("Sound {key} refused to play: {e:?}");
                    });
                    let _ = promise.catch(&on_reject);
                    on_reject.forget();
                }
                Err(e) => log::debug!("Unable to play sound {}: {:?}", cue.key(), e),
            }
        }
    }
}
