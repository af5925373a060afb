//! Cue synthesizer
//!
//! Procedurally generated sound effects - no external files needed! Each cue
//! expands into one or more [`Voice`]s with their own envelopes; staggered
//! parts are handed to the mixer with an onset delay.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::mixer::Mixer;
use super::param::ParamTimeline;
use super::voice::{Bus, Voice, Waveform};
use crate::error::Error;

/// Named sound cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cue {
    /// Rising two-oscillator swell played when audio unlocks
    Startup,
    /// Short tick for each progress step
    Progress,
    /// Two-tone confirm chime
    Stage,
    /// Ascending C major arpeggio followed by a whoosh
    Complete,
    /// Band-passed noise sweep
    Whoosh,
    /// Burst of random square blips
    Glitch,
    /// Eight-second detuned pad bed on the music bus
    Ambient,
}

impl Cue {
    pub const ALL: [Cue; 7] = [
        Cue::Startup,
        Cue::Progress,
        Cue::Stage,
        Cue::Complete,
        Cue::Whoosh,
        Cue::Glitch,
        Cue::Ambient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cue::Startup => "startup",
            Cue::Progress => "progress",
            Cue::Stage => "stage",
            Cue::Complete => "complete",
            Cue::Whoosh => "whoosh",
            Cue::Glitch => "glitch",
            Cue::Ambient => "ambient",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cue::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownCue(s.to_string()))
    }
}

impl TryFrom<String> for Cue {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cue> for String {
    fn from(cue: Cue) -> Self {
        cue.as_str().to_string()
    }
}

/// Floor for exponential decays (they can't reach zero)
const DECAY_FLOOR: f32 = 0.01;

/// C4, E4, G4, C5
pub const COMPLETE_CHORD: [f32; 4] = [261.63, 329.63, 392.00, 523.25];
/// Gap between chord notes
pub const CHORD_STAGGER_MS: f64 = 80.0;
/// Delay from the start of `complete` to its trailing whoosh
pub const COMPLETE_WHOOSH_DELAY_MS: f64 = 400.0;
/// Gap between the two `stage` beeps
pub const STAGE_ECHO_DELAY_MS: f64 = 50.0;
/// Gap between glitch blips
pub const GLITCH_STAGGER_MS: f64 = 30.0;
pub const GLITCH_BLIPS: usize = 5;
/// Pad bed: (frequency Hz, detune cents, onset ms)
pub const AMBIENT_PADS: [(f32, f32, f64); 4] = [
    (130.81, 0.0, 0.0),
    (164.81, 5.0, 500.0),
    (196.00, -5.0, 1000.0),
    (261.63, 10.0, 1500.0),
];
/// Length of each pad
pub const AMBIENT_DURATION: f64 = 8.0;
const AMBIENT_LEVEL: f32 = 0.08;

/// A voice and how long after the cue it begins
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVoice {
    pub delay_ms: f64,
    pub voice: Voice,
}

impl ScheduledVoice {
    fn now(voice: Voice) -> Self {
        Self {
            delay_ms: 0.0,
            voice,
        }
    }

    fn after(delay_ms: f64, voice: Voice) -> Self {
        Self { delay_ms, voice }
    }
}

/// Sharp attack-free blip: `peak` decaying exponentially over `length`
fn decay(peak: f32, length: f64) -> ParamTimeline {
    ParamTimeline::new(0.0)
        .set_at(peak, 0.0)
        .exp_to(DECAY_FLOOR, length)
}

/// Expands cues into voices
pub struct ToneSynth {
    rng: Pcg32,
}

impl ToneSynth {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Play a cue through the mixer
    ///
    /// Fire-and-forget: silent when the mixer can't play, and backend errors
    /// are logged by the mixer rather than returned.
    pub fn play(&mut self, mixer: &mut Mixer, cue: Cue) {
        if !mixer.can_play() {
            return;
        }
        log::debug!("Cue: {}", cue);
        for part in self.voices(cue) {
            mixer.play_voice(part.voice, part.delay_ms);
        }
    }

    /// The voices making up a cue
    pub fn voices(&mut self, cue: Cue) -> Vec<ScheduledVoice> {
        match cue {
            Cue::Startup => self.startup(),
            Cue::Progress => self.progress(),
            Cue::Stage => self.stage(),
            Cue::Complete => self.complete(),
            Cue::Whoosh => self.whoosh(),
            Cue::Glitch => self.glitch(),
            Cue::Ambient => self.ambient(),
        }
    }

    /// Low swell plus an octave-up triangle harmonic
    fn startup(&mut self) -> Vec<ScheduledVoice> {
        let swell = |waveform, from: f32, to: f32, peak: f32| {
            Voice::tone(
                waveform,
                ParamTimeline::new(from).set_at(from, 0.0).exp_to(to, 1.0),
                ParamTimeline::new(0.0)
                    .set_at(0.0, 0.0)
                    .linear_to(peak, 0.1)
                    .exp_to(DECAY_FLOOR, 1.5),
                Bus::Sfx,
                1.5,
            )
        };
        vec![
            ScheduledVoice::now(swell(Waveform::Sine, 100.0, 400.0, 0.3)),
            ScheduledVoice::now(swell(Waveform::Triangle, 200.0, 800.0, 0.15)),
        ]
    }

    fn progress(&mut self) -> Vec<ScheduledVoice> {
        vec![ScheduledVoice::now(Voice::tone(
            Waveform::Sine,
            ParamTimeline::new(600.0).set_at(600.0, 0.0).exp_to(800.0, 0.1),
            decay(0.2, 0.15),
            Bus::Sfx,
            0.15,
        ))]
    }

    /// High beep, then a lower echo
    fn stage(&mut self) -> Vec<ScheduledVoice> {
        let beep = |freq: f32, peak: f32| {
            Voice::tone(
                Waveform::Square,
                ParamTimeline::constant(freq),
                decay(peak, 0.08),
                Bus::Sfx,
                0.08,
            )
        };
        vec![
            ScheduledVoice::now(beep(1200.0, 0.15)),
            ScheduledVoice::after(STAGE_ECHO_DELAY_MS, beep(900.0, 0.1)),
        ]
    }

    fn complete(&mut self) -> Vec<ScheduledVoice> {
        let mut parts: Vec<ScheduledVoice> = COMPLETE_CHORD
            .iter()
            .enumerate()
            .map(|(i, &freq)| {
                ScheduledVoice::after(
                    i as f64 * CHORD_STAGGER_MS,
                    Voice::tone(
                        Waveform::Sine,
                        ParamTimeline::constant(freq),
                        decay(0.2, 0.5),
                        Bus::Sfx,
                        0.5,
                    ),
                )
            })
            .collect();

        for mut part in self.whoosh() {
            part.delay_ms += COMPLETE_WHOOSH_DELAY_MS;
            parts.push(part);
        }
        parts
    }

    fn whoosh(&mut self) -> Vec<ScheduledVoice> {
        vec![ScheduledVoice::now(Voice::noise(
            self.rng.next_u64(),
            ParamTimeline::new(2000.0).set_at(2000.0, 0.0).exp_to(100.0, 0.5),
            1.0,
            decay(0.3, 0.5),
            Bus::Sfx,
            0.5,
        ))]
    }

    fn glitch(&mut self) -> Vec<ScheduledVoice> {
        (0..GLITCH_BLIPS)
            .map(|i| {
                let freq: f32 = self.rng.random_range(500.0..2500.0);
                ScheduledVoice::after(
                    i as f64 * GLITCH_STAGGER_MS,
                    Voice::tone(
                        Waveform::Square,
                        ParamTimeline::constant(freq),
                        decay(0.1, 0.05),
                        Bus::Sfx,
                        0.05,
                    ),
                )
            })
            .collect()
    }

    /// Fade in over 1s, hold, fade out over the final second
    fn ambient(&mut self) -> Vec<ScheduledVoice> {
        AMBIENT_PADS
            .iter()
            .map(|&(freq, detune, onset)| {
                let gain = ParamTimeline::new(0.0)
                    .set_at(0.0, 0.0)
                    .linear_to(AMBIENT_LEVEL, 1.0)
                    .set_at(AMBIENT_LEVEL, AMBIENT_DURATION - 1.0)
                    .linear_to(0.0, AMBIENT_DURATION);
                ScheduledVoice::after(
                    onset,
                    Voice::tone(
                        Waveform::Sine,
                        ParamTimeline::constant(freq),
                        gain,
                        Bus::Music,
                        AMBIENT_DURATION,
                    )
                    .detuned(detune),
                )
            })
            .collect()
    }
}
