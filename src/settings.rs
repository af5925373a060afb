//! Preloader settings
//!
//! Everything tunable about the sequence lives here: bus volumes, the stage
//! list, choreography delays, progress smoothing, backdrop density and page
//! integration. The page may override any field through a
//! `window.preloaderSettings` object.

use serde::{Deserialize, Serialize};

use crate::audio::Cue;
use crate::consts::{DEFAULT_LOGO_PATH, SEEN_KEY};
use crate::error::{Error, Result};
use crate::preloader::Stage;

/// Default level of each mixer bus (0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusVolumes {
    pub master: f32,
    pub music: f32,
    pub sfx: f32,
}

impl Default for BusVolumes {
    fn default() -> Self {
        Self {
            master: 0.7,
            music: 0.3,
            sfx: 0.6,
        }
    }
}

impl BusVolumes {
    /// Every level clamped to 0.0 - 1.0 (NaN becomes 0)
    pub fn clamped(self) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            master: clamp(self.master),
            music: clamp(self.music),
            sfx: clamp(self.sfx),
        }
    }
}

/// The production stage list
pub fn default_stages() -> Vec<Stage> {
    [
        ("INITIATING SECURE CONNECTION", 800.0, Cue::Stage),
        ("VERIFYING PROTOCOLS", 600.0, Cue::Stage),
        ("LOADING CORE MODULES", 900.0, Cue::Stage),
        ("ESTABLISHING GLOBAL LINK", 700.0, Cue::Stage),
        ("SYNCHRONIZING DATA", 600.0, Cue::Stage),
        ("PREPARING INTERFACE", 500.0, Cue::Stage),
        ("SYSTEM READY", 400.0, Cue::Complete),
    ]
    .into_iter()
    .map(|(label, duration_ms, cue)| Stage::new(label, duration_ms, Some(cue)))
    .collect()
}

/// Preloader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    pub volumes: BusVolumes,
    /// Start muted
    pub muted: bool,

    // === Sequence ===
    pub stages: Vec<Stage>,
    /// Gesture to first stage
    pub start_delay_ms: f64,
    /// Gesture to the ambient pad bed
    pub ambient_delay_ms: f64,
    /// Completion to overlay fade
    pub fade_delay_ms: f64,
    /// Overlay fade to exit animation (and whoosh)
    pub exit_delay_ms: f64,
    /// Exit animation to teardown
    pub teardown_delay_ms: f64,

    // === Progress bar ===
    /// Fraction of the remaining gap closed per 60 Hz frame
    pub smoothing: f32,
    /// Gap (percentage points) below which the bar snaps to target
    pub snap_threshold: f32,

    // === Backdrop ===
    pub particle_count: usize,
    /// Distance (px) under which particles are linked
    pub link_distance: f32,

    // === Page ===
    pub logo_path: String,
    pub title: String,
    pub subtitle: String,
    /// Persisted flag key
    pub storage_key: String,
    /// Seed for glitch frequencies, noise and particle layout (0 = time based)
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volumes: BusVolumes::default(),
            muted: false,

            stages: default_stages(),
            start_delay_ms: 500.0,
            ambient_delay_ms: 500.0,
            fade_delay_ms: 500.0,
            exit_delay_ms: 800.0,
            teardown_delay_ms: 1500.0,

            smoothing: 0.1,
            snap_threshold: 0.5,

            particle_count: 150,
            link_distance: 100.0,

            logo_path: DEFAULT_LOGO_PATH.to_string(),
            title: "PACUNATO S.A.".to_string(),
            subtitle: "INTERNATIONAL PROCUREMENT".to_string(),
            storage_key: SEEN_KEY.to_string(),
            seed: 0,
        }
    }
}

impl Settings {
    /// Parse and validate a JSON override (missing fields keep defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the sequencer or animator can't work with
    pub fn validate(&self) -> Result<()> {
        if let Some(stage) = self
            .stages
            .iter()
            .find(|s| !s.duration_ms.is_finite() || s.duration_ms < 0.0)
        {
            return Err(Error::invalid_value(format!(
                "stage '{}' has invalid duration {}",
                stage.label, stage.duration_ms
            )));
        }

        let delays = [
            ("start_delay_ms", self.start_delay_ms),
            ("ambient_delay_ms", self.ambient_delay_ms),
            ("fade_delay_ms", self.fade_delay_ms),
            ("exit_delay_ms", self.exit_delay_ms),
            ("teardown_delay_ms", self.teardown_delay_ms),
        ];
        if let Some((name, value)) = delays.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(Error::invalid_value(format!("{} must be >= 0, got {}", name, value)));
        }

        if self.smoothing.is_nan() || self.smoothing <= 0.0 || self.smoothing > 1.0 {
            return Err(Error::invalid_value(format!(
                "smoothing must be in (0, 1], got {}",
                self.smoothing
            )));
        }
        if self.snap_threshold.is_nan() || self.snap_threshold < 0.0 {
            return Err(Error::invalid_value("snap_threshold must be >= 0"));
        }
        if self.storage_key.is_empty() {
            return Err(Error::invalid_value("storage_key must not be empty"));
        }
        Ok(())
    }

    /// Sum of all stage durations
    pub fn sequence_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.duration_ms).sum()
    }

    /// Load page overrides (WASM only)
    ///
    /// Reads `window.preloaderSettings` (object) and `window.logoPath`.
    /// Anything missing or invalid falls back to defaults.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        use wasm_bindgen::JsValue;

        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let global = |name: &str| {
            js_sys::Reflect::get(&window, &JsValue::from_str(name))
                .ok()
                .filter(|v| !v.is_undefined() && !v.is_null())
        };

        let mut settings = match global("preloaderSettings")
            .and_then(|v| js_sys::JSON::stringify(&v).ok())
            .map(String::from)
        {
            Some(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded preloader settings from page");
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring window.preloaderSettings: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        if let Some(path) = global("logoPath").and_then(|v| v.as_string()) {
            settings.logo_path = path;
        }
        settings
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_sequence() {
        let s = Settings::default();
        assert_eq!(s.stages.len(), 7);
        assert_eq!(s.sequence_ms(), 4500.0);
        assert_eq!(s.stages.last().and_then(|st| st.cue), Some(Cue::Complete));
        assert_eq!(s.volumes, BusVolumes { master: 0.7, music: 0.3, sfx: 0.6 });
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = Settings::from_json(r#"{ "logo_path": "/img/x.png", "volumes": { "music": 0.5 } }"#)
            .unwrap();
        assert_eq!(s.logo_path, "/img/x.png");
        assert_eq!(s.volumes.music, 0.5);
        assert_eq!(s.volumes.master, 0.7);
        assert_eq!(s.stages.len(), 7);
    }

    #[test]
    fn test_custom_stages() {
        let s = Settings::from_json(
            r#"{ "stages": [
                { "label": "A", "duration_ms": 100, "cue": "stage" },
                { "label": "B", "duration_ms": 100 }
            ] }"#,
        )
        .unwrap();
        assert_eq!(s.stages.len(), 2);
        assert_eq!(s.stages[0].cue, Some(Cue::Stage));
        assert_eq!(s.stages[1].cue, None);
    }

    #[test]
    fn test_unknown_cue_rejected() {
        let err = Settings::from_json(
            r#"{ "stages": [ { "label": "A", "duration_ms": 100, "cue": "fanfare" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSettings(_)));
        assert!(err.to_string().contains("fanfare"));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = Settings::from_json(r#"{ "stages": [ { "label": "A", "duration_ms": -1 } ] }"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn test_smoothing_out_of_range_rejected() {
        assert!(Settings::from_json(r#"{ "smoothing": 0 }"#).is_err());
        assert!(Settings::from_json(r#"{ "smoothing": 1.5 }"#).is_err());
        assert!(Settings::from_json(r#"{ "smoothing": 1.0 }"#).is_ok());
    }

    #[test]
    fn test_bus_volumes_clamped() {
        let v = BusVolumes {
            master: 2.0,
            music: -1.0,
            sfx: f32::NAN,
        }
        .clamped();
        assert_eq!(v, BusVolumes { master: 1.0, music: 0.0, sfx: 0.0 });
    }

    #[test]
    fn test_serde_roundtrip_of_defaults() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        let back = Settings::from_json(&json).unwrap();
        assert_eq!(back, Settings::default());
    }
}
