//! Asset preload tracking
//!
//! Each key is written at most once while preloading and read-only after.
//! A failed load is recorded as [`AssetSlot::Missing`]; nothing here ever
//! blocks play, callers fall back to plain shapes or silence.

use std::collections::BTreeMap;

use crate::tuning::AssetManifest;

/// Load state of one asset
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSlot<T> {
    Pending,
    Loaded(T),
    Missing,
}

/// Named assets of one kind (images or sounds)
#[derive(Debug, Clone)]
pub struct AssetStore<T> {
    slots: BTreeMap<String, AssetSlot<T>>,
    ready: bool,
}

impl<T> Default for AssetStore<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            ready: false,
        }
    }
}

impl<T> AssetStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every manifest key as pending.
    /// An empty manifest is ready immediately.
    pub fn begin(&mut self, manifest: &AssetManifest) {
        for (key, _) in manifest.iter() {
            self.slots
                .entry(key.to_string())
                .or_insert(AssetSlot::Pending);
        }
        self.refresh_ready();
    }

    /// Settle one key. Returns false if the key was already settled.
    pub fn resolve(&mut self, key: &str, result: Result<T, String>) -> bool {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert(AssetSlot::Pending);
        if !matches!(slot, AssetSlot::Pending) {
            log::warn!("Asset {key} already settled, ignoring second load");
            return false;
        }
        *slot = match result {
            Ok(asset) => AssetSlot::Loaded(asset),
            Err(reason) => {
                log::warn!("Failed to load asset {key}: {reason}");
                AssetSlot::Missing
            }
        };
        self.refresh_ready();
        true
    }

    fn refresh_ready(&mut self) {
        if !self.ready && self.pending() == 0 {
            self.ready = true;
        }
    }

    /// Latches true once nothing is pending
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, AssetSlot::Pending))
            .count()
    }

    pub fn missing(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, AssetSlot::Missing))
            .count()
    }

    pub fn slot(&self, key: &str) -> Option<&AssetSlot<T>> {
        self.slots.get(key)
    }

    /// The loaded asset, if any
    pub fn get(&self, key: &str) -> Option<&T> {
        match self.slots.get(key)? {
            AssetSlot::Loaded(asset) => Some(asset),
            _ => None,
        }
    }

    /// Usable for drawing: preload finished and this key loaded
    pub fn is_available(&self, key: &str) -> bool {
        self.is_usable(key, |_| true)
    }

    /// Like [`is_available`](Self::is_available), with an extra check on
    /// the asset itself (a bitmap that is still decoding, say)
    pub fn is_usable(&self, key: &str, check: impl Fn(&T) -> bool) -> bool {
        self.ready && self.get(key).is_some_and(check)
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::preload;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use js_sys::{Array, Promise};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{HtmlAudioElement, HtmlImageElement};

    use super::AssetStore;
    use crate::audio::clip_volume;
    use crate::tuning::AssetManifest;

    /// One in-flight load: key, URL, settle promise
    type Job = (String, String, Promise);

    /// Promise that resolves with the element on success and `null` on
    /// failure; it never rejects
    fn settle_on<E: JsCast + Clone + 'static>(
        element: &E,
        target: &web_sys::EventTarget,
        ok_event: &str,
    ) -> Promise {
        let element = element.clone();
        let target = target.clone();
        let ok_event = ok_event.to_string();
        Promise::new(&mut move |resolve, _reject| {
            let on_ok = {
                let resolve = resolve.clone();
                let element = element.clone();
                Closure::once(move |_: web_sys::Event| {
                    let _ = resolve.call1(&JsValue::NULL, element.unchecked_ref());
                })
            };
            let on_err = Closure::once(move |_: web_sys::Event| {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::NULL);
            });
            let _ = target
                .add_event_listener_with_callback(&ok_event, on_ok.as_ref().unchecked_ref());
            let _ =
                target.add_event_listener_with_callback("error", on_err.as_ref().unchecked_ref());
            on_ok.forget();
            on_err.forget();
        })
    }

    /// Write settled values into `store`; `results` lines up with `jobs`
    fn apply<T: JsCast>(jobs: Vec<Job>, results: &[JsValue], store: &Rc<RefCell<AssetStore<T>>>) {
        let mut store = store.borrow_mut();
        for (i, (key, url, _)) in jobs.into_iter().enumerate() {
            let value = results.get(i).cloned().unwrap_or(JsValue::NULL);
            let result = value
                .dyn_into::<T>()
                .map_err(|_| format!("could not load {url}"));
            store.resolve(&key, result);
        }
    }

    /// Kick off every image; loading starts as soon as `src` is set
    fn start_images(
        manifest: &AssetManifest,
        store: &Rc<RefCell<AssetStore<HtmlImageElement>>>,
    ) -> Vec<Job> {
        store.borrow_mut().begin(manifest);
        let mut jobs = Vec::new();
        for (key, url) in manifest.iter() {
            let image = match HtmlImageElement::new() {
                Ok(image) => image,
                Err(e) => {
                    store.borrow_mut().resolve(key, Err(format!("{e:?}")));
                    continue;
                }
            };
            let promise = settle_on(&image, image.unchecked_ref(), "load");
            image.set_src(url);
            jobs.push((key.to_string(), url.to_string(), promise));
        }
        jobs
    }

    /// Kick off every clip with its base volume set
    fn start_audio(
        manifest: &AssetManifest,
        store: &Rc<RefCell<AssetStore<HtmlAudioElement>>>,
    ) -> Vec<Job> {
        store.borrow_mut().begin(manifest);
        let mut jobs = Vec::new();
        for (key, url) in manifest.iter() {
            let audio = match HtmlAudioElement::new() {
                Ok(audio) => audio,
                Err(e) => {
                    store.borrow_mut().resolve(key, Err(format!("{e:?}")));
                    continue;
                }
            };
            audio.set_preload("auto");
            audio.set_volume(f64::from(clip_volume(key)));
            let promise = settle_on(&audio, audio.unchecked_ref(), "canplaythrough");
            audio.set_src(url);
            jobs.push((key.to_string(), url.to_string(), promise));
        }
        jobs
    }

    /// Load images and sounds together and wait for all of them to settle
    pub async fn preload(
        image_manifest: &AssetManifest,
        images: Rc<RefCell<AssetStore<HtmlImageElement>>>,
        audio_manifest: &AssetManifest,
        sounds: Rc<RefCell<AssetStore<HtmlAudioElement>>>,
    ) {
        let image_jobs = start_images(image_manifest, &images);
        let audio_jobs = start_audio(audio_manifest, &sounds);

        let promises: Array = image_jobs
            .iter()
            .chain(&audio_jobs)
            .map(|(_, _, p)| p.clone())
            .collect();
        let results: Vec<JsValue> = match JsFuture::from(Promise::all(&promises)).await {
            Ok(results) => Array::from(&results).to_vec(),
            Err(e) => {
                log::warn!("Asset preload wait failed: {e:?}");
                Vec::new()
            }
        };

        let split = image_jobs.len().min(results.len());
        let (image_results, audio_results) = results.split_at(split);
        apply(image_jobs, image_results, &images);
        apply(audio_jobs, audio_results, &sounds);
    }
}
