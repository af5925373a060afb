//! Three-bus mixer
//!
//! Music and effects buses feed a master bus. The mixer owns the backend, the
//! stored bus volumes, the mute state and the registry of in-flight sounds.
//! Audio is always optional: if the backend can't be opened the mixer stays
//! uninitialized and every playback call quietly does nothing.

use super::backend::{AudioBackend, VoiceId};
use super::voice::{Bus, Voice};
use crate::consts::STOP_FADE_SECS;
use crate::sched::TimerQueue;
use crate::settings::BusVolumes;

/// One in-flight synthesized sound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundHandle {
    pub id: VoiceId,
    pub bus: Bus,
    /// Audio time the voice started
    pub started_at: f64,
    /// Audio time the voice's source stops
    pub stop_at: f64,
    /// Set by a bulk stop: audio time the forced fade completes
    pub fade_until: Option<f64>,
}

impl SoundHandle {
    /// Whether the handle should leave the registry at audio time `now`
    fn expired(&self, now: f64) -> bool {
        now >= self.stop_at || self.fade_until.is_some_and(|end| now >= end)
    }
}

/// Bus gains, mute and the active-sound registry
pub struct Mixer {
    backend: Box<dyn AudioBackend>,
    volumes: BusVolumes,
    initialized: bool,
    muted: bool,
    handles: Vec<SoundHandle>,
    /// Voices waiting for their onset, keyed by audio time in ms
    pending: TimerQueue<Voice>,
}

impl Mixer {
    pub fn new(backend: Box<dyn AudioBackend>, volumes: BusVolumes) -> Self {
        Self {
            backend,
            volumes: volumes.clamped(),
            initialized: false,
            muted: false,
            handles: Vec::new(),
            pending: TimerQueue::new(),
        }
    }

    /// Open the audio context and wire the buses
    ///
    /// Returns whether audio is available. Failure leaves the mixer in
    /// no-audio mode; a later call may try again.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        if let Err(e) = self.backend.open() {
            log::warn!("Audio not available: {}", e);
            return false;
        }

        let master = if self.muted { 0.0 } else { self.volumes.master };
        let wiring = self
            .backend
            .set_bus_gain(Bus::Master, master)
            .and_then(|_| self.backend.set_bus_gain(Bus::Music, self.volumes.music))
            .and_then(|_| self.backend.set_bus_gain(Bus::Sfx, self.volumes.sfx));
        if let Err(e) = wiring {
            log::warn!("Audio buses could not be configured: {}", e);
            return false;
        }

        self.backend.resume();
        self.initialized = true;
        log::info!(
            "Audio initialized (master {:.2}, music {:.2}, sfx {:.2})",
            self.volumes.master,
            self.volumes.music,
            self.volumes.sfx
        );
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether a cue started now would be heard
    pub fn can_play(&self) -> bool {
        self.initialized && !self.muted
    }

    /// Audio clock in seconds (0 before initialization)
    pub fn now(&self) -> f64 {
        if self.initialized {
            self.backend.current_time()
        } else {
            0.0
        }
    }

    /// Stored volume for a bus
    pub fn volume(&self, bus: Bus) -> f32 {
        match bus {
            Bus::Master => self.volumes.master,
            Bus::Music => self.volumes.music,
            Bus::Sfx => self.volumes.sfx,
        }
    }

    /// Set a bus volume (clamped to 0.0 - 1.0), applied immediately
    ///
    /// While muted the master level is stored but the bus stays silent.
    pub fn set_volume(&mut self, bus: Bus, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        match bus {
            Bus::Master => self.volumes.master = level,
            Bus::Music => self.volumes.music = level,
            Bus::Sfx => self.volumes.sfx = level,
        }

        if !self.initialized || (bus == Bus::Master && self.muted) {
            return;
        }
        if let Err(e) = self.backend.set_bus_gain(bus, level) {
            log::warn!("Failed to set {} volume: {}", bus.as_str(), e);
        }
    }

    /// Flip mute and return the new state
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    /// Mute/unmute everything via the master bus
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if !self.initialized {
            return;
        }
        let level = if muted { 0.0 } else { self.volumes.master };
        if let Err(e) = self.backend.set_bus_gain(Bus::Master, level) {
            log::warn!("Failed to apply mute: {}", e);
        }
    }

    /// Play a voice now (`delay_ms <= 0`) or after `delay_ms`
    ///
    /// No-op while uninitialized or muted. Backend errors are logged, never
    /// returned.
    pub fn play_voice(&mut self, voice: Voice, delay_ms: f64) {
        if !self.can_play() {
            return;
        }
        if delay_ms > 0.0 {
            let now_ms = self.now() * 1000.0;
            self.pending.schedule_after(now_ms, delay_ms, voice);
        } else {
            self.start_voice(&voice);
        }
    }

    fn start_voice(&mut self, voice: &Voice) {
        let at = self.backend.current_time();
        match self.backend.start_voice(voice, at) {
            Ok(id) => self.handles.push(SoundHandle {
                id,
                bus: voice.bus,
                started_at: at,
                stop_at: at + voice.length.max(0.0),
                fade_until: None,
            }),
            Err(e) => log::warn!("Error playing sound: {}", e),
        }
    }

    /// Start voices whose onset has come and drop finished handles
    ///
    /// Call once per frame.
    pub fn pump(&mut self) {
        if !self.initialized {
            return;
        }

        let now = self.backend.current_time();
        for (_, voice) in self.pending.drain_due(now * 1000.0) {
            if self.can_play() {
                self.start_voice(&voice);
            }
        }

        let backend = &mut self.backend;
        self.handles.retain(|h| {
            if h.expired(now) {
                backend.release_voice(h.id);
                false
            } else {
                true
            }
        });
    }

    /// Fade everything out
    ///
    /// Master ramps to silence over [`STOP_FADE_SECS`]; every sound still
    /// playing gets the same forced fade on its own gain. Handles that exist
    /// now leave the registry once the window has elapsed; sounds started
    /// later are untouched.
    pub fn stop_all(&mut self) {
        if !self.initialized {
            return;
        }

        let now = self.backend.current_time();
        let end = now + STOP_FADE_SECS;

        if let Err(e) = self.backend.fade_bus(Bus::Master, now, end) {
            log::warn!("Failed to fade master bus: {}", e);
        }

        let mut faded = 0;
        for handle in self.handles.iter_mut() {
            if handle.fade_until.is_some() {
                continue;
            }
            if now < handle.stop_at {
                match self.backend.fade_voice(handle.id, now, end) {
                    Ok(()) => faded += 1,
                    // Source already gone
                    Err(e) => log::debug!("Voice {} not faded: {}", handle.id, e),
                }
            }
            handle.fade_until = Some(end);
        }

        log::info!(
            "Stopping all sounds ({} fading over {:.1}s)",
            faded,
            STOP_FADE_SECS
        );
    }

    /// Sounds currently registered
    pub fn active_handles(&self) -> &[SoundHandle] {
        &self.handles
    }

    /// Voices scheduled but not yet started
    pub fn pending_voices(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::SimBackend;
    use crate::audio::param::ParamTimeline;
    use crate::audio::voice::Waveform;
    use crate::platform::VirtualClock;
    use proptest::prelude::*;
    use std::rc::Rc;

    fn mixer() -> (Mixer, SimBackend, VirtualClock) {
        let clock = VirtualClock::new();
        let backend = SimBackend::new(Rc::new(clock.clone()));
        let mixer = Mixer::new(Box::new(backend.clone()), BusVolumes::default());
        (mixer, backend, clock)
    }

    fn pad(length: f64) -> Voice {
        Voice::tone(
            Waveform::Sine,
            ParamTimeline::constant(220.0),
            ParamTimeline::constant(0.08),
            Bus::Music,
            length,
        )
    }

    #[test]
    fn test_initialize_applies_default_volumes() {
        let (mut mixer, backend, _) = mixer();
        assert!(mixer.initialize());
        assert!(mixer.is_initialized());
        assert!((backend.bus_gain_at(Bus::Master, 0.0) - 0.7).abs() < 1e-6);
        assert!((backend.bus_gain_at(Bus::Music, 0.0) - 0.3).abs() < 1e-6);
        assert!((backend.bus_gain_at(Bus::Sfx, 0.0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_initialize_twice_is_noop() {
        let (mut mixer, backend, clock) = mixer();
        assert!(mixer.initialize());
        clock.advance(1000.0);
        assert!(mixer.initialize());
        assert!((backend.current_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_denied_context_falls_back_to_silence() {
        let clock = VirtualClock::new();
        let backend = SimBackend::denying(Rc::new(clock));
        let mut mixer = Mixer::new(Box::new(backend.clone()), BusVolumes::default());

        assert!(!mixer.initialize());
        mixer.play_voice(pad(1.0), 0.0);
        mixer.stop_all();
        mixer.pump();
        assert!(mixer.active_handles().is_empty());
        assert_eq!(backend.voice_count(), 0);
    }

    #[test]
    fn test_set_volume_clamps() {
        let (mut mixer, backend, _) = mixer();
        mixer.initialize();
        mixer.set_volume(Bus::Sfx, 1.5);
        assert_eq!(mixer.volume(Bus::Sfx), 1.0);
        assert_eq!(backend.bus_gain_at(Bus::Sfx, 0.0), 1.0);

        mixer.set_volume(Bus::Music, -0.2);
        assert_eq!(mixer.volume(Bus::Music), 0.0);

        mixer.set_volume(Bus::Master, f32::NAN);
        assert_eq!(mixer.volume(Bus::Master), 0.0);
    }

    #[test]
    fn test_set_volume_before_initialize_is_stored() {
        let (mut mixer, backend, _) = mixer();
        mixer.set_volume(Bus::Music, 0.9);
        mixer.initialize();
        assert!((backend.bus_gain_at(Bus::Music, 0.0) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_toggle_mute_restores_master() {
        let (mut mixer, backend, _) = mixer();
        mixer.initialize();

        assert!(mixer.toggle_mute());
        assert_eq!(backend.bus_gain_at(Bus::Master, 0.0), 0.0);

        // Volume changes while muted are remembered, not applied
        mixer.set_volume(Bus::Master, 0.4);
        assert_eq!(backend.bus_gain_at(Bus::Master, 0.0), 0.0);

        assert!(!mixer.toggle_mute());
        assert!((backend.bus_gain_at(Bus::Master, 0.0) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_play_while_muted_or_uninitialized_is_silent() {
        let (mut mixer, backend, _) = mixer();
        mixer.play_voice(pad(1.0), 0.0);
        assert_eq!(backend.voice_count(), 0);

        mixer.initialize();
        mixer.set_muted(true);
        mixer.play_voice(pad(1.0), 0.0);
        mixer.play_voice(pad(1.0), 100.0);
        assert_eq!(backend.voice_count(), 0);
        assert_eq!(mixer.pending_voices(), 0);
    }

    #[test]
    fn test_deferred_voice_starts_on_pump() {
        let (mut mixer, backend, clock) = mixer();
        mixer.initialize();
        mixer.play_voice(pad(1.0), 500.0);
        assert_eq!(mixer.pending_voices(), 1);

        clock.advance(499.0);
        mixer.pump();
        assert_eq!(backend.voice_count(), 0);

        clock.advance(1.0);
        mixer.pump();
        assert_eq!(backend.voice_count(), 1);
        assert_eq!(mixer.active_handles().len(), 1);
        assert!((mixer.active_handles()[0].started_at - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_finished_handles_are_pruned() {
        let (mut mixer, backend, clock) = mixer();
        mixer.initialize();
        mixer.play_voice(pad(0.15), 0.0);
        let id = mixer.active_handles()[0].id;

        clock.advance(149.0);
        mixer.pump();
        assert_eq!(mixer.active_handles().len(), 1);

        clock.advance(1.0);
        mixer.pump();
        assert!(mixer.active_handles().is_empty());
        assert!(backend.voice(id).unwrap().released);
    }

    #[test]
    fn test_stop_all_fades_and_clears() {
        let (mut mixer, backend, clock) = mixer();
        mixer.initialize();
        for _ in 0..3 {
            mixer.play_voice(pad(8.0), 0.0);
        }
        let ids: Vec<_> = mixer.active_handles().iter().map(|h| h.id).collect();

        clock.advance(2000.0);
        mixer.stop_all();
        assert_eq!(mixer.active_handles().len(), 3);

        // Halfway through the fade each voice is at half level
        let half = backend.voice(ids[0]).unwrap().gain_at(2.25);
        assert!((half - 0.04).abs() < 1e-5);
        assert!((backend.bus_gain_at(Bus::Master, 2.25) - 0.35).abs() < 1e-5);

        clock.advance(499.0);
        mixer.pump();
        assert_eq!(mixer.active_handles().len(), 3);

        clock.advance(1.0);
        mixer.pump();
        assert!(mixer.active_handles().is_empty());
        for id in ids {
            assert_eq!(backend.voice(id).unwrap().gain_at(2.5), 0.0);
        }
    }

    #[test]
    fn test_stop_all_with_no_handles() {
        let (mut mixer, _, clock) = mixer();
        mixer.initialize();
        mixer.stop_all();
        clock.advance(600.0);
        mixer.pump();
        assert!(mixer.active_handles().is_empty());
    }

    #[test]
    fn test_stop_all_skips_finished_voices() {
        let (mut mixer, backend, clock) = mixer();
        mixer.initialize();
        mixer.play_voice(pad(0.1), 0.0);
        let id = mixer.active_handles()[0].id;

        // Still registered (no pump yet) but its source has already stopped
        clock.advance(200.0);
        mixer.stop_all();
        let voice = backend.voice(id).unwrap();
        assert_eq!(voice.gain.events().len(), 0);
    }

    #[test]
    fn test_sounds_started_during_fade_survive_clear() {
        let (mut mixer, _, clock) = mixer();
        mixer.initialize();
        mixer.play_voice(pad(8.0), 0.0);
        mixer.stop_all();

        clock.advance(100.0);
        mixer.play_voice(pad(8.0), 0.0);
        assert_eq!(mixer.active_handles().len(), 2);

        clock.advance(500.0);
        mixer.pump();
        assert_eq!(mixer.active_handles().len(), 1);
        assert!(mixer.active_handles()[0].fade_until.is_none());
    }

    proptest! {
        #[test]
        fn prop_stop_all_empties_registry(
            lengths in prop::collection::vec(0.0f64..10.0, 0..24),
            elapsed_ms in 0u32..3000,
        ) {
            let (mut mixer, backend, clock) = mixer();
            mixer.initialize();
            for length in &lengths {
                mixer.play_voice(pad(*length), 0.0);
            }
            prop_assert_eq!(mixer.active_handles().len(), lengths.len());

            clock.advance(f64::from(elapsed_ms));
            mixer.stop_all();
            clock.advance(STOP_FADE_SECS * 1000.0 + 1.0);
            mixer.pump();

            prop_assert!(mixer.active_handles().is_empty());
            prop_assert!(backend.voices().iter().all(|v| v.released));
        }

        #[test]
        fn prop_volume_always_in_range(level in any::<f32>(), bus_index in 0usize..3) {
            let bus = [Bus::Master, Bus::Music, Bus::Sfx][bus_index];
            let (mut mixer, _, _) = mixer();
            mixer.initialize();
            mixer.set_volume(bus, level);
            let stored = mixer.volume(bus);
            prop_assert!((0.0..=1.0).contains(&stored));
        }
    }
}
