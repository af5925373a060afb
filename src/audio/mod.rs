//! Audio system
//!
//! Procedurally generated cues routed through a three-bus mixer. The
//! [`AudioSystem`] is created once per page session and owned by the
//! preloader; nothing here is global.

pub mod backend;
pub mod mixer;
pub mod param;
pub mod synth;
pub mod voice;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use backend::{AudioBackend, SimBackend, SimVoice, VoiceId};
pub use mixer::{Mixer, SoundHandle};
pub use param::{ParamEvent, ParamTimeline};
pub use synth::{Cue, ScheduledVoice, ToneSynth};
pub use voice::{Bus, Source, Voice, Waveform};
#[cfg(target_arch = "wasm32")]
pub use web::WebAudioBackend;

use crate::settings::BusVolumes;

/// Mixer plus synthesizer
pub struct AudioSystem {
    mixer: Mixer,
    synth: ToneSynth,
}

impl AudioSystem {
    pub fn new(backend: Box<dyn AudioBackend>, volumes: BusVolumes, seed: u64) -> Self {
        Self {
            mixer: Mixer::new(backend, volumes),
            synth: ToneSynth::new(seed),
        }
    }

    /// Unlock audio; must run inside a user gesture in browsers
    pub fn initialize(&mut self) -> bool {
        self.mixer.initialize()
    }

    pub fn is_ready(&self) -> bool {
        self.mixer.is_initialized()
    }

    /// Play a cue (no-op when unavailable or muted)
    pub fn play(&mut self, cue: Cue) {
        self.synth.play(&mut self.mixer, cue);
    }

    /// Per-frame housekeeping
    pub fn pump(&mut self) {
        self.mixer.pump();
    }

    pub fn stop_all(&mut self) {
        self.mixer.stop_all();
    }

    /// No sounds registered and none waiting for their onset
    pub fn is_idle(&self) -> bool {
        self.mixer.active_handles().is_empty() && self.mixer.pending_voices() == 0
    }

    pub fn set_volume(&mut self, bus: Bus, level: f32) {
        self.mixer.set_volume(bus, level);
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.mixer.toggle_mute()
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }
}
