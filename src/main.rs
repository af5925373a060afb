//! Cinematic Preloader entry point
//!
//! In the browser: waits for page load, then boots the preloader and drives
//! it from a `requestAnimationFrame` loop. Natively: runs the whole sequence
//! headless on a virtual clock and logs what happened.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;

    use cinematic_preloader::audio::WebAudioBackend;
    use cinematic_preloader::platform::{BrowserClock, LocalStorageStore};
    use cinematic_preloader::preloader::DomView;
    use cinematic_preloader::preloader::dom::START_OVERLAY_ID;
    use cinematic_preloader::{Boot, Bus, Preloader, Settings, VisibilityGate};

    pub fn run() {
        console_error_panic_hook::set_once();
        // Ignore a second init if the page loads the module twice
        let _ = console_log::init_with_level(log::Level::Info);

        let Some(window) = web_sys::window() else {
            return;
        };
        let ready = window
            .document()
            .is_some_and(|d| d.ready_state() == "complete");
        if ready {
            start();
        } else {
            let closure = Closure::once_into_js(start);
            let _ = window.add_event_listener_with_callback("load", closure.unchecked_ref());
        }
    }

    fn start() {
        let settings = Settings::load();
        install_reset_hook(&settings.storage_key);

        let Some(view) = DomView::new() else {
            log::error!("No document, preloader disabled");
            return;
        };

        let boot = Preloader::boot(
            settings,
            Rc::new(LocalStorageStore),
            Box::new(view),
            Box::new(WebAudioBackend::new()),
            Rc::new(BrowserClock),
        );

        let preloader = match boot {
            Boot::Skipped => return,
            Boot::Showing(preloader) => Rc::new(RefCell::new(*preloader)),
        };

        setup_start_click(preloader.clone());
        install_audio_hooks(preloader.clone());
        request_animation_frame(preloader);
    }

    /// `resetPreloader()` console helper
    fn install_reset_hook(key: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let gate = VisibilityGate::new(Rc::new(LocalStorageStore), key);
        let closure = Closure::<dyn Fn()>::new(move || {
            if let Err(e) = gate.reset() {
                log::warn!("Could not reset preloader: {}", e);
            }
        });
        let _ = js_sys::Reflect::set(
            &window,
            &JsValue::from_str("resetPreloader"),
            closure.as_ref(),
        );
        closure.forget();
    }

    /// `preloaderAudio.setVolume(bus, level)` / `preloaderAudio.toggleMute()`
    fn install_audio_hooks(preloader: Rc<RefCell<Preloader>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let hooks = js_sys::Object::new();

        let set_volume = {
            let preloader = preloader.clone();
            Closure::<dyn Fn(String, f32)>::new(move |bus: String, level: f32| {
                match bus.parse::<Bus>() {
                    Ok(bus) => preloader.borrow_mut().audio_mut().set_volume(bus, level),
                    Err(e) => log::warn!("{}", e),
                }
            })
        };
        let toggle_mute = Closure::<dyn Fn() -> bool>::new(move || {
            preloader.borrow_mut().audio_mut().toggle_mute()
        });

        let _ = js_sys::Reflect::set(&hooks, &JsValue::from_str("setVolume"), set_volume.as_ref());
        let _ = js_sys::Reflect::set(&hooks, &JsValue::from_str("toggleMute"), toggle_mute.as_ref());
        let _ = js_sys::Reflect::set(&window, &JsValue::from_str("preloaderAudio"), &hooks);
        set_volume.forget();
        toggle_mute.forget();
    }

    fn setup_start_click(preloader: Rc<RefCell<Preloader>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(overlay) = document.get_element_by_id(START_OVERLAY_ID) else {
            log::warn!("Start overlay missing, starting without a gesture");
            preloader.borrow_mut().on_start_gesture();
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            // Click is the user gesture that unlocks audio
            preloader.borrow_mut().on_start_gesture();
        });
        let _ = overlay.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(preloader: Rc<RefCell<Preloader>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |_time: f64| {
            frame_loop(preloader);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(preloader: Rc<RefCell<Preloader>>) {
        let idle = {
            let mut p = preloader.borrow_mut();
            p.frame();
            p.is_idle()
        };

        // Keep pumping after teardown until the faded sounds are released
        if !idle {
            request_animation_frame(preloader);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    web_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Cinematic Preloader (native) starting...");
    log::info!("Native mode runs headless - build for wasm32 to see the overlay");

    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::rc::Rc;

    use cinematic_preloader::audio::SimBackend;
    use cinematic_preloader::platform::{Clock, KeyValueStore, MemoryStore, VirtualClock};
    use cinematic_preloader::preloader::RecordingView;
    use cinematic_preloader::{Boot, Preloader, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Give up after this much virtual time
    const LIMIT_MS: f64 = 60_000.0;

    pub fn run() {
        let settings = Settings {
            seed: 0x5EED,
            ..Settings::load()
        };
        let key = settings.storage_key.clone();

        let clock = VirtualClock::new();
        let store = MemoryStore::new();
        let view = RecordingView::new();
        let backend = SimBackend::new(Rc::new(clock.clone()));

        let boot = Preloader::boot(
            settings,
            Rc::new(store.clone()),
            Box::new(view.clone()),
            Box::new(backend.clone()),
            Rc::new(clock.clone()),
        );
        let mut preloader = match boot {
            Boot::Skipped => {
                log::info!("Preloader skipped");
                return;
            }
            Boot::Showing(preloader) => preloader,
        };

        preloader.on_start_gesture();
        while !preloader.is_idle() && clock.now_ms() < LIMIT_MS {
            preloader.frame();
            clock.advance(FRAME_MS);
        }

        for label in view.stage_log() {
            log::info!("  \u{2713} {}", label);
        }
        log::info!(
            "Finished in {:.0} ms: {} voices synthesized, flag = {:?}",
            clock.now_ms(),
            backend.voice_count(),
            store.get(&key).ok().flatten()
        );
        if !preloader.is_finished() {
            log::warn!("Sequence did not finish within {} ms", LIMIT_MS);
        }
    }
}
