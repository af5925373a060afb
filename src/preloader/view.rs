//! Display seam
//!
//! The preloader drives its overlay only through [`PreloaderView`]. The
//! browser build uses `DomView`; tests and the headless binary use
//! [`RecordingView`].

use std::cell::RefCell;
use std::rc::Rc;

use super::particles::ParticleField;
use crate::settings::Settings;

pub trait PreloaderView {
    /// Build the overlay (logo, title, progress bar, stage log, backdrop canvas)
    fn mount_overlay(&mut self, settings: &Settings);

    /// Full-screen "click to start" prompt
    fn show_start_prompt(&mut self, title: &str);
    fn hide_start_prompt(&mut self);

    /// Current stage label
    fn set_label(&mut self, label: &str);
    /// Append a completed-stage line to the stage log
    fn push_stage_indicator(&mut self, label: &str);
    /// Bar width and percent text; `percent` is the displayed value
    fn set_progress(&mut self, percent: f32);

    /// Start the overlay fade-out
    fn begin_fade(&mut self);
    /// Start the exit animation
    fn begin_exit(&mut self);
    fn remove_overlay(&mut self);

    fn set_scroll_locked(&mut self, locked: bool);
    /// Tell the page the preloader is gone
    fn emit_complete(&mut self);

    /// Backdrop canvas size, if there is one
    fn canvas_size(&self) -> Option<(f32, f32)>;
    fn draw_particles(&mut self, field: &ParticleField, link_distance: f32);
}

/// A recorded view call
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    MountOverlay { logo_path: String },
    ShowStartPrompt,
    HideStartPrompt,
    SetLabel(String),
    StageIndicator(String),
    BeginFade,
    BeginExit,
    RemoveOverlay,
    ScrollLocked(bool),
    EmitComplete,
}

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<ViewCall>,
    progress: Vec<f32>,
    particle_frames: usize,
}

/// In-memory view; clones share one recording
#[derive(Debug, Clone)]
pub struct RecordingView {
    recording: Rc<RefCell<Recording>>,
    canvas: Option<(f32, f32)>,
}

impl Default for RecordingView {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingView {
    pub fn new() -> Self {
        Self {
            recording: Rc::default(),
            canvas: Some((400.0, 400.0)),
        }
    }

    /// A view whose page has no backdrop canvas
    pub fn without_canvas() -> Self {
        Self {
            canvas: None,
            ..Self::new()
        }
    }

    /// Every recorded call except per-frame progress and particle draws
    pub fn calls(&self) -> Vec<ViewCall> {
        self.recording.borrow().calls.clone()
    }

    pub fn count(&self, call: &ViewCall) -> usize {
        self.recording
            .borrow()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    pub fn contains(&self, call: &ViewCall) -> bool {
        self.count(call) > 0
    }

    /// Progress values in the order they were shown
    pub fn progress(&self) -> Vec<f32> {
        self.recording.borrow().progress.clone()
    }

    pub fn last_progress(&self) -> Option<f32> {
        self.recording.borrow().progress.last().copied()
    }

    pub fn particle_frames(&self) -> usize {
        self.recording.borrow().particle_frames
    }

    /// Last mount/remove wins
    pub fn overlay_mounted(&self) -> bool {
        self.recording
            .borrow()
            .calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ViewCall::MountOverlay { .. } => Some(true),
                ViewCall::RemoveOverlay => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn scroll_locked(&self) -> bool {
        self.recording
            .borrow()
            .calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ViewCall::ScrollLocked(locked) => Some(*locked),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn stage_log(&self) -> Vec<String> {
        self.recording
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                ViewCall::StageIndicator(label) => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ViewCall) {
        self.recording.borrow_mut().calls.push(call);
    }
}

impl PreloaderView for RecordingView {
    fn mount_overlay(&mut self, settings: &Settings) {
        self.record(ViewCall::MountOverlay {
            logo_path: settings.logo_path.clone(),
        });
    }

    fn show_start_prompt(&mut self, _title: &str) {
        self.record(ViewCall::ShowStartPrompt);
    }

    fn hide_start_prompt(&mut self) {
        self.record(ViewCall::HideStartPrompt);
    }

    fn set_label(&mut self, label: &str) {
        self.record(ViewCall::SetLabel(label.to_string()));
    }

    fn push_stage_indicator(&mut self, label: &str) {
        self.record(ViewCall::StageIndicator(label.to_string()));
    }

    fn set_progress(&mut self, percent: f32) {
        self.recording.borrow_mut().progress.push(percent);
    }

    fn begin_fade(&mut self) {
        self.record(ViewCall::BeginFade);
    }

    fn begin_exit(&mut self) {
        self.record(ViewCall::BeginExit);
    }

    fn remove_overlay(&mut self) {
        self.record(ViewCall::RemoveOverlay);
    }

    fn set_scroll_locked(&mut self, locked: bool) {
        self.record(ViewCall::ScrollLocked(locked));
    }

    fn emit_complete(&mut self) {
        self.record(ViewCall::EmitComplete);
    }

    fn canvas_size(&self) -> Option<(f32, f32)> {
        self.canvas
    }

    fn draw_particles(&mut self, _field: &ParticleField, _link_distance: f32) {
        self.recording.borrow_mut().particle_frames += 1;
    }
}
