//! Web Audio backend
//!
//! Builds each voice as real nodes: source -> (filter) -> gain -> bus, with
//! the voice's automation replayed onto the node parameters.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AudioContext, AudioParam, AudioScheduledSourceNode, BiquadFilterType, GainNode,
    OscillatorType,
};

use super::backend::{AudioBackend, VoiceId};
use super::param::{ParamEvent, ParamTimeline};
use super::voice::{Bus, Source, Voice, Waveform};
use crate::error::{AudioError, js_reason};

fn node_err(e: JsValue) -> AudioError {
    AudioError::NodeCreation(js_reason(&e))
}

fn sched_err(e: JsValue) -> AudioError {
    AudioError::Scheduling(js_reason(&e))
}

fn osc_type(waveform: Waveform) -> OscillatorType {
    match waveform {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Square => OscillatorType::Square,
        Waveform::Triangle => OscillatorType::Triangle,
    }
}

/// Replay a timeline onto an AudioParam, shifted to start at `offset`
fn apply(param: &AudioParam, timeline: &ParamTimeline, offset: f64) -> Result<(), AudioError> {
    param.set_value(timeline.default_value);
    for event in timeline.events() {
        match *event {
            ParamEvent::SetValue { value, time } => {
                param.set_value_at_time(value, offset + time)
            }
            ParamEvent::LinearRamp { value, end } => {
                param.linear_ramp_to_value_at_time(value, offset + end)
            }
            ParamEvent::ExponentialRamp { value, end } => {
                param.exponential_ramp_to_value_at_time(value, offset + end)
            }
        }
        .map_err(sched_err)?;
    }
    Ok(())
}

/// Hold the current value at `at` and ramp to zero by `end`
fn fade_param(param: &AudioParam, at: f64, end: f64) -> Result<(), AudioError> {
    param.cancel_scheduled_values(at).map_err(sched_err)?;
    param.set_value_at_time(param.value(), at).map_err(sched_err)?;
    param
        .linear_ramp_to_value_at_time(0.0, end)
        .map_err(sched_err)?;
    Ok(())
}

struct Graph {
    ctx: AudioContext,
    master: GainNode,
    music: GainNode,
    sfx: GainNode,
}

impl Graph {
    fn bus(&self, bus: Bus) -> &GainNode {
        match bus {
            Bus::Master => &self.master,
            Bus::Music => &self.music,
            Bus::Sfx => &self.sfx,
        }
    }
}

struct LiveVoice {
    source: AudioScheduledSourceNode,
    gain: GainNode,
}

/// Backend on a browser `AudioContext`
#[derive(Default)]
pub struct WebAudioBackend {
    graph: Option<Graph>,
    voices: HashMap<VoiceId, LiveVoice>,
    next_id: VoiceId,
}

impl WebAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn graph(&self) -> Result<&Graph, AudioError> {
        self.graph.as_ref().ok_or(AudioError::NotInitialized)
    }

    /// Build the source node(s) for a voice, connected into `gain`
    fn build_source(
        graph: &Graph,
        voice: &Voice,
        gain: &GainNode,
        at: f64,
    ) -> Result<AudioScheduledSourceNode, AudioError> {
        match &voice.source {
            Source::Oscillator {
                waveform,
                frequency,
                detune,
            } => {
                let osc = graph.ctx.create_oscillator().map_err(node_err)?;
                osc.set_type(osc_type(*waveform));
                apply(&osc.frequency(), frequency, at)?;
                osc.detune().set_value(*detune);
                osc.connect_with_audio_node(gain).map_err(node_err)?;
                Ok(osc.unchecked_into())
            }
            Source::FilteredNoise { seed, cutoff, q } => {
                let rate = graph.ctx.sample_rate();
                let len = ((rate as f64 * voice.length) as u32).max(1);
                let buffer = graph.ctx.create_buffer(1, len, rate).map_err(node_err)?;

                let mut rng = Pcg32::seed_from_u64(*seed);
                let mut samples: Vec<f32> =
                    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
                buffer.copy_to_channel(&mut samples, 0).map_err(node_err)?;

                let noise = graph.ctx.create_buffer_source().map_err(node_err)?;
                noise.set_buffer(Some(&buffer));

                let filter = graph.ctx.create_biquad_filter().map_err(node_err)?;
                filter.set_type(BiquadFilterType::Bandpass);
                apply(&filter.frequency(), cutoff, at)?;
                filter.q().set_value(*q);

                noise.connect_with_audio_node(&filter).map_err(node_err)?;
                filter.connect_with_audio_node(gain).map_err(node_err)?;
                Ok(noise.unchecked_into())
            }
        }
    }
}

impl AudioBackend for WebAudioBackend {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.graph.is_some() {
            return Ok(());
        }

        let ctx = AudioContext::new()
            .map_err(|e| AudioError::ContextUnavailable(js_reason(&e)))?;
        let master = ctx.create_gain().map_err(node_err)?;
        let music = ctx.create_gain().map_err(node_err)?;
        let sfx = ctx.create_gain().map_err(node_err)?;

        music.connect_with_audio_node(&master).map_err(node_err)?;
        sfx.connect_with_audio_node(&master).map_err(node_err)?;
        master
            .connect_with_audio_node(&ctx.destination())
            .map_err(node_err)?;

        self.graph = Some(Graph {
            ctx,
            master,
            music,
            sfx,
        });
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.graph
            .as_ref()
            .map(|g| g.ctx.current_time())
            .unwrap_or(0.0)
    }

    fn set_bus_gain(&mut self, bus: Bus, value: f32) -> Result<(), AudioError> {
        let graph = self.graph()?;
        let param = graph.bus(bus).gain();
        param
            .cancel_scheduled_values(graph.ctx.current_time())
            .map_err(sched_err)?;
        param.set_value(value);
        Ok(())
    }

    fn fade_bus(&mut self, bus: Bus, at: f64, end: f64) -> Result<(), AudioError> {
        let graph = self.graph()?;
        fade_param(&graph.bus(bus).gain(), at, end)
    }

    fn start_voice(&mut self, voice: &Voice, at: f64) -> Result<VoiceId, AudioError> {
        let graph = self.graph()?;

        let gain = graph.ctx.create_gain().map_err(node_err)?;
        apply(&gain.gain(), &voice.gain, at)?;
        gain.connect_with_audio_node(graph.bus(voice.bus))
            .map_err(node_err)?;

        let source = match Self::build_source(graph, voice, &gain, at) {
            Ok(source) => source,
            Err(e) => {
                let _ = gain.disconnect();
                return Err(e);
            }
        };
        let scheduled = source
            .start_with_when(at)
            .and_then(|_| source.stop_with_when(at + voice.length))
            .map_err(sched_err);
        if let Err(e) = scheduled {
            // Untracked nodes must not stay attached to the bus
            let _ = source.disconnect();
            let _ = gain.disconnect();
            return Err(e);
        }

        self.next_id += 1;
        let id = self.next_id;
        self.voices.insert(id, LiveVoice { source, gain });
        Ok(id)
    }

    fn fade_voice(&mut self, id: VoiceId, at: f64, end: f64) -> Result<(), AudioError> {
        let live = self
            .voices
            .get(&id)
            .ok_or_else(|| AudioError::Scheduling(format!("no voice {}", id)))?;
        fade_param(&live.gain.gain(), at, end)
    }

    fn release_voice(&mut self, id: VoiceId) {
        if let Some(live) = self.voices.remove(&id) {
            let _ = live.source.disconnect();
            let _ = live.gain.disconnect();
        }
    }

    /// Resume audio context (required after user gesture)
    fn resume(&self) {
        if let Some(graph) = &self.graph {
            if graph.ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = graph.ctx.resume();
            }
        }
    }
}
