//! Voice descriptions
//!
//! A [`Voice`] is one self-contained synthesized sound: a source, a gain
//! envelope, the bus it feeds and its length. All times are relative to the
//! moment the voice starts.

use std::str::FromStr;

use super::param::ParamTimeline;
use crate::error::Error;

/// Routing bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    Master,
    Music,
    Sfx,
}

impl Bus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bus::Master => "master",
            Bus::Music => "music",
            Bus::Sfx => "sfx",
        }
    }
}

impl FromStr for Bus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "master" => Ok(Bus::Master),
            "music" => Ok(Bus::Music),
            "sfx" | "effects" => Ok(Bus::Sfx),
            _ => Err(Error::invalid_value(format!("unknown bus '{}'", s))),
        }
    }
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

/// What generates the signal
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Periodic oscillator
    Oscillator {
        waveform: Waveform,
        frequency: ParamTimeline,
        /// Detune in cents
        detune: f32,
    },
    /// White noise through a band-pass filter
    FilteredNoise {
        /// Seed for the noise buffer
        seed: u64,
        /// Band-pass centre frequency
        cutoff: ParamTimeline,
        q: f32,
    },
}

/// One synthesized sound, ready to hand to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub source: Source,
    pub gain: ParamTimeline,
    pub bus: Bus,
    /// Seconds after start at which the source stops
    pub length: f64,
}

impl Voice {
    /// Oscillator voice on the given bus
    pub fn tone(
        waveform: Waveform,
        frequency: ParamTimeline,
        gain: ParamTimeline,
        bus: Bus,
        length: f64,
    ) -> Self {
        Self {
            source: Source::Oscillator {
                waveform,
                frequency,
                detune: 0.0,
            },
            gain,
            bus,
            length,
        }
    }

    /// Band-passed noise burst on the given bus
    pub fn noise(
        seed: u64,
        cutoff: ParamTimeline,
        q: f32,
        gain: ParamTimeline,
        bus: Bus,
        length: f64,
    ) -> Self {
        Self {
            source: Source::FilteredNoise { seed, cutoff, q },
            gain,
            bus,
            length,
        }
    }

    /// Builder: set detune (oscillators only)
    pub fn detuned(mut self, cents: f32) -> Self {
        if let Source::Oscillator { detune, .. } = &mut self.source {
            *detune = cents;
        }
        self
    }

    pub fn waveform(&self) -> Option<Waveform> {
        match &self.source {
            Source::Oscillator { waveform, .. } => Some(*waveform),
            Source::FilteredNoise { .. } => None,
        }
    }

    /// Frequency (or filter cutoff) at `t` seconds into the voice
    pub fn frequency_at(&self, t: f64) -> f32 {
        match &self.source {
            Source::Oscillator {
                frequency, detune, ..
            } => frequency.value_at(t) * 2f32.powf(*detune / 1200.0),
            Source::FilteredNoise { cutoff, .. } => cutoff.value_at(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_names_roundtrip() {
        for bus in [Bus::Master, Bus::Music, Bus::Sfx] {
            assert_eq!(bus.as_str().parse::<Bus>().ok(), Some(bus));
        }
        assert_eq!("SFX".parse::<Bus>().ok(), Some(Bus::Sfx));
        assert_eq!("effects".parse::<Bus>().ok(), Some(Bus::Sfx));
        assert!("drums".parse::<Bus>().is_err());
    }

    #[test]
    fn test_detune_raises_pitch() {
        let v = Voice::tone(
            Waveform::Sine,
            ParamTimeline::constant(440.0),
            ParamTimeline::constant(0.1),
            Bus::Music,
            1.0,
        )
        .detuned(1200.0);
        assert!((v.frequency_at(0.5) - 880.0).abs() < 0.01);
    }
}
