//! Cinematic Preloader - splash screen with a synthesized soundtrack
//!
//! Core modules:
//! - `audio`: Procedural cues, three-bus mixer, Web Audio / simulated backends
//! - `preloader`: Stage sequencer, progress animator, particle backdrop, view
//! - `gate`: Persisted one-time "already seen" flag
//! - `platform`: Browser/native clock and storage abstraction
//! - `sched`: Timer queue every delayed action goes through
//! - `settings`: Data-driven configuration

pub mod audio;
pub mod error;
pub mod gate;
pub mod platform;
pub mod preloader;
pub mod sched;
pub mod settings;

pub use audio::{AudioSystem, Bus, Cue};
pub use error::{AudioError, Error, Result, StoreError};
pub use gate::VisibilityGate;
pub use preloader::{Boot, Preloader, SequencerState, Stage};
pub use settings::{BusVolumes, Settings};

/// Configuration constants
pub mod consts {
    /// Bulk-stop fade window (seconds of audio time)
    pub const STOP_FADE_SECS: f64 = 0.5;

    /// Reference frame rate the per-frame smoothing factors are tuned for
    pub const REFERENCE_FPS: f32 = 60.0;
    /// Longest frame step fed to animations (tab switches, debugger pauses)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Default persisted flag key
    pub const SEEN_KEY: &str = "hasSeenPreloader";
    /// Value written when the preloader has been seen
    pub const SEEN_VALUE: &str = "true";

    /// Event dispatched on `document` once the preloader is gone
    pub const COMPLETE_EVENT: &str = "preloaderComplete";

    /// Logo used when the page doesn't provide `window.logoPath`
    pub const DEFAULT_LOGO_PATH: &str = "/static/images/logo.png";
}

/// Convert a per-reference-frame blend factor into one for a step of `dt` seconds
#[inline]
pub fn frame_blend(factor: f32, dt: f32) -> f32 {
    let frames = dt.clamp(0.0, consts::MAX_FRAME_DT) * consts::REFERENCE_FPS;
    1.0 - (1.0 - factor.clamp(0.0, 1.0)).powf(frames)
}
