//! Cinematic preloader
//!
//! Owns everything the splash sequence needs and advances it one display
//! frame at a time: timers, the stage sequencer, audio housekeeping, the
//! progress bar and the particle backdrop. Nothing here reads wall-clock time
//! directly; the injected [`Clock`] decides what "now" is.

pub mod particles;
pub mod progress;
pub mod stage;
pub mod view;
#[cfg(target_arch = "wasm32")]
pub mod dom;

pub use particles::{Link, Particle, ParticleField};
pub use progress::ProgressAnimator;
pub use stage::{SequencerState, Stage, StageSequencer, Transition};
pub use view::{PreloaderView, RecordingView, ViewCall};
#[cfg(target_arch = "wasm32")]
pub use dom::DomView;

use std::rc::Rc;

use crate::audio::{AudioBackend, AudioSystem, Cue};
use crate::gate::VisibilityGate;
use crate::platform::{Clock, KeyValueStore};
use crate::sched::TimerQueue;
use crate::settings::Settings;

/// Label shown before the start gesture
pub const WAITING_LABEL: &str = "AWAITING INITIALIZATION";

/// Steps of the start and completion choreography
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    /// Start the ambient pad bed
    Ambient,
    /// Overlay starts fading
    Fade,
    /// Whoosh plus exit animation
    Exit,
    /// Silence audio, remove the overlay, persist the flag
    Teardown,
}

/// Outcome of [`Preloader::boot`]
pub enum Boot {
    /// Already seen; nothing was mounted and scrolling is unlocked
    Skipped,
    /// Overlay mounted, waiting for the start gesture
    Showing(Box<Preloader>),
}

impl Boot {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Boot::Skipped)
    }

    pub fn into_preloader(self) -> Option<Box<Preloader>> {
        match self {
            Boot::Skipped => None,
            Boot::Showing(preloader) => Some(preloader),
        }
    }
}

pub struct Preloader {
    settings: Settings,
    gate: VisibilityGate,
    view: Box<dyn PreloaderView>,
    audio: AudioSystem,
    clock: Rc<dyn Clock>,
    sequencer: StageSequencer,
    progress: ProgressAnimator,
    particles: Option<ParticleField>,
    timers: TimerQueue<Task>,
    last_frame_ms: Option<f64>,
    started: bool,
    finished: bool,
}

impl Preloader {
    /// Decide whether to show the preloader and, if so, mount it
    pub fn boot(
        settings: Settings,
        store: Rc<dyn KeyValueStore>,
        mut view: Box<dyn PreloaderView>,
        backend: Box<dyn AudioBackend>,
        clock: Rc<dyn Clock>,
    ) -> Boot {
        let gate = VisibilityGate::new(store, settings.storage_key.clone());
        if gate.has_seen() {
            log::info!("Preloader already seen, skipping");
            view.set_scroll_locked(false);
            return Boot::Skipped;
        }

        log::info!("First visit, showing preloader");
        let seed = if settings.seed != 0 {
            settings.seed
        } else {
            clock.now_ms() as u64
        };

        view.mount_overlay(&settings);
        view.set_scroll_locked(true);
        view.set_label(WAITING_LABEL);
        view.set_progress(0.0);
        view.show_start_prompt(&settings.title);

        let particles = match view.canvas_size() {
            Some((width, height)) => Some(ParticleField::new(
                settings.particle_count,
                width,
                height,
                seed,
            )),
            None => {
                log::warn!("No backdrop canvas, particles disabled");
                None
            }
        };

        let mut audio = AudioSystem::new(backend, settings.volumes, seed);
        if settings.muted {
            audio.mixer_mut().set_muted(true);
        }

        Boot::Showing(Box::new(Self {
            sequencer: StageSequencer::new(settings.stages.clone()),
            progress: ProgressAnimator::new(settings.smoothing, settings.snap_threshold),
            settings,
            gate,
            view,
            audio,
            clock,
            particles,
            timers: TimerQueue::new(),
            last_frame_ms: None,
            started: false,
            finished: false,
        }))
    }

    /// Handle the start click
    ///
    /// Only the first call does anything. Returns whether this call started
    /// the sequence.
    pub fn on_start_gesture(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        let now = self.clock.now_ms();

        self.view.hide_start_prompt();

        if self.audio.initialize() {
            self.audio.play(Cue::Startup);
            self.timers
                .schedule_after(now, self.settings.ambient_delay_ms, Task::Ambient);
        }

        self.sequencer.start(now, self.settings.start_delay_ms);
        log::info!("Preloader sequence started");
        true
    }

    /// Advance everything to the clock's current time
    pub fn frame(&mut self) {
        let now = self.clock.now_ms();
        let dt = self
            .last_frame_ms
            .map(|last| ((now - last) / 1000.0) as f32)
            .unwrap_or(0.0);
        self.last_frame_ms = Some(now);

        if self.finished {
            self.audio.pump();
            return;
        }

        if let Some(transition) = self.sequencer.poll(now) {
            self.apply(transition, now);
        }

        while let Some((_, task)) = self.timers.pop_due(now) {
            self.run(task, now);
            if self.finished {
                break;
            }
        }

        self.audio.pump();

        if self.finished {
            return;
        }

        self.progress.set_target(self.sequencer.target());
        if !self.progress.is_settled() {
            self.progress.advance(dt);
        }
        self.view.set_progress(self.progress.displayed());

        if let Some(field) = &mut self.particles {
            field.step(dt);
            self.view.draw_particles(field, self.settings.link_distance);
        }
    }

    fn apply(&mut self, transition: Transition, now: f64) {
        match transition {
            Transition::Entered { label, cue, .. } => {
                if let Some(cue) = cue {
                    self.audio.play(cue);
                }
                self.view.set_label(&label);
                self.view.push_stage_indicator(&label);
                self.audio.play(Cue::Progress);
            }
            Transition::Completed => {
                log::info!("Loading complete");
                self.audio.play(Cue::Complete);
                self.timers
                    .schedule_after(now, self.settings.fade_delay_ms, Task::Fade);
            }
        }
    }

    fn run(&mut self, task: Task, now: f64) {
        match task {
            Task::Ambient => self.audio.play(Cue::Ambient),
            Task::Fade => {
                self.view.begin_fade();
                self.timers
                    .schedule_after(now, self.settings.exit_delay_ms, Task::Exit);
            }
            Task::Exit => {
                self.audio.play(Cue::Whoosh);
                self.view.begin_exit();
                self.timers
                    .schedule_after(now, self.settings.teardown_delay_ms, Task::Teardown);
            }
            Task::Teardown => self.teardown(),
        }
    }

    fn teardown(&mut self) {
        self.audio.stop_all();
        self.view.remove_overlay();
        self.view.set_scroll_locked(false);

        if let Err(e) = self.gate.mark_seen() {
            log::warn!("Could not persist preloader flag: {}", e);
        }

        self.view.emit_complete();
        self.particles = None;
        self.finished = true;
        log::info!("Preloader finished");
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Overlay removed and flag written (or attempted)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Finished and the audio registry has drained
    ///
    /// Keep calling [`Preloader::frame`] until this holds; the bulk stop only
    /// releases its sounds on a later frame.
    pub fn is_idle(&self) -> bool {
        self.finished && self.audio.is_idle()
    }

    /// Target progress percentage
    pub fn target(&self) -> f32 {
        self.sequencer.target()
    }

    /// Displayed progress percentage
    pub fn displayed(&self) -> f32 {
        self.progress.displayed()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gate(&self) -> &VisibilityGate {
        &self.gate
    }

    pub fn audio(&self) -> &AudioSystem {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioSystem {
        &mut self.audio
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.particles.as_ref()
    }
}
