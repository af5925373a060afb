//! Audio graph backends
//!
//! The mixer talks to the outside world only through [`AudioBackend`]. The
//! browser build drives a real `AudioContext`; [`SimBackend`] keeps the same
//! graph as data and evaluates it against a [`Clock`], which is what the
//! tests and the headless binary use.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::param::ParamTimeline;
use super::voice::{Bus, Voice};
use crate::error::AudioError;
use crate::platform::Clock;

/// Backend-assigned voice identifier
pub type VoiceId = u64;

/// A three-bus audio graph: music and sfx feed master, master feeds the sink
pub trait AudioBackend {
    /// Create the context and the bus nodes. Called once per session.
    fn open(&mut self) -> Result<(), AudioError>;

    /// Audio clock in seconds
    fn current_time(&self) -> f64;

    /// Set a bus gain immediately, dropping any scheduled automation
    fn set_bus_gain(&mut self, bus: Bus, value: f32) -> Result<(), AudioError>;

    /// Hold the bus gain at `at`, then ramp linearly to silence by `end`
    fn fade_bus(&mut self, bus: Bus, at: f64, end: f64) -> Result<(), AudioError>;

    /// Build the voice's nodes, start it at `at` and schedule its stop
    fn start_voice(&mut self, voice: &Voice, at: f64) -> Result<VoiceId, AudioError>;

    /// Hold the voice gain at `at`, then ramp linearly to silence by `end`
    fn fade_voice(&mut self, id: VoiceId, at: f64, end: f64) -> Result<(), AudioError>;

    /// Forget a voice whose stop time has passed
    fn release_voice(&mut self, id: VoiceId);

    /// Resume a suspended context (browsers suspend until a user gesture)
    fn resume(&self) {}
}

/// A started voice as the simulated graph sees it
#[derive(Debug, Clone)]
pub struct SimVoice {
    pub id: VoiceId,
    pub voice: Voice,
    pub started_at: f64,
    pub stop_at: f64,
    /// Gain envelope in absolute audio time
    pub gain: ParamTimeline,
    pub released: bool,
}

impl SimVoice {
    /// Voice gain at audio time `t` (0 outside its lifetime)
    pub fn gain_at(&self, t: f64) -> f32 {
        if t < self.started_at || t >= self.stop_at {
            0.0
        } else {
            self.gain.value_at(t)
        }
    }
}

#[derive(Debug, Default)]
struct SimGraph {
    opened_at_ms: Option<f64>,
    buses: BTreeMap<u8, ParamTimeline>,
    voices: BTreeMap<VoiceId, SimVoice>,
    next_id: VoiceId,
}

fn bus_key(bus: Bus) -> u8 {
    match bus {
        Bus::Master => 0,
        Bus::Music => 1,
        Bus::Sfx => 2,
    }
}

/// In-memory model of a Web Audio graph
///
/// Clones share the same graph, so a test can keep one to inspect what the
/// mixer did with the other.
#[derive(Clone)]
pub struct SimBackend {
    clock: Rc<dyn Clock>,
    graph: Rc<RefCell<SimGraph>>,
    deny_open: bool,
}

impl SimBackend {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            graph: Rc::new(RefCell::new(SimGraph::default())),
            deny_open: false,
        }
    }

    /// Backend whose context creation always fails
    pub fn denying(clock: Rc<dyn Clock>) -> Self {
        Self {
            deny_open: true,
            ..Self::new(clock)
        }
    }

    pub fn is_open(&self) -> bool {
        self.graph.borrow().opened_at_ms.is_some()
    }

    /// Bus gain at audio time `t`
    pub fn bus_gain_at(&self, bus: Bus, t: f64) -> f32 {
        self.graph
            .borrow()
            .buses
            .get(&bus_key(bus))
            .map(|p| p.value_at(t))
            .unwrap_or(1.0)
    }

    /// Every voice ever started, in start order
    pub fn voices(&self) -> Vec<SimVoice> {
        self.graph.borrow().voices.values().cloned().collect()
    }

    pub fn voice(&self, id: VoiceId) -> Option<SimVoice> {
        self.graph.borrow().voices.get(&id).cloned()
    }

    pub fn voice_count(&self) -> usize {
        self.graph.borrow().voices.len()
    }

    /// Effective output level of a voice at `t`: its gain times its bus and master
    #[cfg(test)]
    pub fn output_level(&self, id: VoiceId, t: f64) -> f32 {
        let Some(v) = self.voice(id) else { return 0.0 };
        let master = self.bus_gain_at(Bus::Master, t);
        let bus = if v.voice.bus == Bus::Master {
            1.0
        } else {
            self.bus_gain_at(v.voice.bus, t)
        };
        v.gain_at(t) * bus * master
    }

    fn check_open(&self) -> Result<(), AudioError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(AudioError::NotInitialized)
        }
    }
}

impl AudioBackend for SimBackend {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.deny_open {
            return Err(AudioError::ContextUnavailable(
                "context creation denied".to_string(),
            ));
        }
        let mut graph = self.graph.borrow_mut();
        if graph.opened_at_ms.is_none() {
            graph.opened_at_ms = Some(self.clock.now_ms());
            for bus in [Bus::Master, Bus::Music, Bus::Sfx] {
                graph.buses.insert(bus_key(bus), ParamTimeline::constant(1.0));
            }
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        match self.graph.borrow().opened_at_ms {
            Some(opened) => (self.clock.now_ms() - opened).max(0.0) / 1000.0,
            None => 0.0,
        }
    }

    fn set_bus_gain(&mut self, bus: Bus, value: f32) -> Result<(), AudioError> {
        self.check_open()?;
        self.graph
            .borrow_mut()
            .buses
            .insert(bus_key(bus), ParamTimeline::constant(value));
        Ok(())
    }

    fn fade_bus(&mut self, bus: Bus, at: f64, end: f64) -> Result<(), AudioError> {
        self.check_open()?;
        let mut graph = self.graph.borrow_mut();
        let param = graph
            .buses
            .entry(bus_key(bus))
            .or_insert_with(|| ParamTimeline::constant(1.0));
        param.cancel_and_hold(at);
        param.push(super::param::ParamEvent::LinearRamp { value: 0.0, end });
        Ok(())
    }

    fn start_voice(&mut self, voice: &Voice, at: f64) -> Result<VoiceId, AudioError> {
        self.check_open()?;
        if voice.length < 0.0 {
            return Err(AudioError::Scheduling(format!(
                "negative voice length {}",
                voice.length
            )));
        }
        let mut graph = self.graph.borrow_mut();
        graph.next_id += 1;
        let id = graph.next_id;
        graph.voices.insert(
            id,
            SimVoice {
                id,
                voice: voice.clone(),
                started_at: at,
                stop_at: at + voice.length,
                gain: voice.gain.shifted(at),
                released: false,
            },
        );
        Ok(id)
    }

    fn fade_voice(&mut self, id: VoiceId, at: f64, end: f64) -> Result<(), AudioError> {
        self.check_open()?;
        let mut graph = self.graph.borrow_mut();
        let v = graph
            .voices
            .get_mut(&id)
            .ok_or_else(|| AudioError::Scheduling(format!("no voice {}", id)))?;
        v.gain.cancel_and_hold(at);
        v.gain
            .push(super::param::ParamEvent::LinearRamp { value: 0.0, end });
        Ok(())
    }

    fn release_voice(&mut self, id: VoiceId) {
        if let Some(v) = self.graph.borrow_mut().voices.get_mut(&id) {
            v.released = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::VirtualClock;

    fn blip() -> Voice {
        Voice::tone(
            super::super::voice::Waveform::Sine,
            ParamTimeline::constant(600.0),
            ParamTimeline::new(0.0).set_at(0.2, 0.0).exp_to(0.01, 0.15),
            Bus::Sfx,
            0.15,
        )
    }

    #[test]
    fn test_closed_backend_rejects_voices() {
        let clock = VirtualClock::new();
        let mut backend = SimBackend::new(Rc::new(clock));
        assert_eq!(
            backend.start_voice(&blip(), 0.0),
            Err(AudioError::NotInitialized)
        );
    }

    #[test]
    fn test_denying_backend_fails_open() {
        let mut backend = SimBackend::denying(Rc::new(VirtualClock::new()));
        assert!(matches!(
            backend.open(),
            Err(AudioError::ContextUnavailable(_))
        ));
        assert!(!backend.is_open());
    }

    #[test]
    fn test_audio_time_counts_from_open() {
        let clock = VirtualClock::starting_at(5000.0);
        let mut backend = SimBackend::new(Rc::new(clock.clone()));
        backend.open().unwrap();
        clock.advance(1500.0);
        assert!((backend.current_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_voice_gain_is_zero_after_stop() {
        let clock = VirtualClock::new();
        let mut backend = SimBackend::new(Rc::new(clock));
        backend.open().unwrap();
        let id = backend.start_voice(&blip(), 1.0).unwrap();
        let v = backend.voice(id).unwrap();
        assert!((v.gain_at(1.0) - 0.2).abs() < 1e-6);
        assert_eq!(v.gain_at(1.2), 0.0);
        assert!((v.stop_at - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_output_level_includes_bus_and_master() {
        let clock = VirtualClock::new();
        let mut backend = SimBackend::new(Rc::new(clock));
        backend.open().unwrap();
        backend.set_bus_gain(Bus::Master, 0.5).unwrap();
        backend.set_bus_gain(Bus::Sfx, 0.5).unwrap();
        let id = backend.start_voice(&blip(), 0.0).unwrap();
        assert!((backend.output_level(id, 0.0) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_fade_bus_reaches_silence() {
        let clock = VirtualClock::new();
        let mut backend = SimBackend::new(Rc::new(clock));
        backend.open().unwrap();
        backend.set_bus_gain(Bus::Master, 0.7).unwrap();
        backend.fade_bus(Bus::Master, 2.0, 2.5).unwrap();
        assert!((backend.bus_gain_at(Bus::Master, 2.0) - 0.7).abs() < 1e-6);
        assert!((backend.bus_gain_at(Bus::Master, 2.25) - 0.35).abs() < 1e-5);
        assert_eq!(backend.bus_gain_at(Bus::Master, 2.5), 0.0);
    }
}
