//! Stage sequencer
//!
//! `Idle -> Playing(0) -> ... -> Playing(N-1) -> Complete`, forward only.
//! Each stage is held for its duration, measured from the poll that entered
//! it, so a late frame can delay a stage but never shorten the next one.

use serde::{Deserialize, Serialize};

use crate::audio::Cue;
use crate::sched::TimerQueue;

/// One step of the loading sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub label: String,
    pub duration_ms: f64,
    #[serde(default)]
    pub cue: Option<Cue>,
}

impl Stage {
    pub fn new(label: impl Into<String>, duration_ms: f64, cue: Option<Cue>) -> Self {
        Self {
            label: label.into(),
            duration_ms,
            cue,
        }
    }
}

/// Where the sequence is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    /// Waiting for the start gesture
    Idle,
    /// Showing stage `i`
    Playing(usize),
    /// All stages shown
    Complete,
}

/// Emitted by [`StageSequencer::poll`] when the state changes
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Entered {
        index: usize,
        label: String,
        cue: Option<Cue>,
        target: f32,
    },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Enter(usize),
    Complete,
}

pub struct StageSequencer {
    stages: Vec<Stage>,
    state: SequencerState,
    target: f32,
    started: bool,
    timers: TimerQueue<Step>,
    transitions: usize,
}

impl StageSequencer {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            state: SequencerState::Idle,
            target: 0.0,
            started: false,
            timers: TimerQueue::new(),
            transitions: 0,
        }
    }

    /// Leave `Idle` after `lead_in_ms`. Returns false if already started.
    pub fn start(&mut self, now_ms: f64, lead_in_ms: f64) -> bool {
        if self.started {
            return false;
        }
        self.started = true;

        if self.stages.is_empty() {
            self.timers.schedule_at(now_ms, Step::Complete);
        } else {
            self.timers.schedule_after(now_ms, lead_in_ms, Step::Enter(0));
        }
        true
    }

    /// Apply at most one due transition
    pub fn poll(&mut self, now_ms: f64) -> Option<Transition> {
        let (_, step) = self.timers.pop_due(now_ms)?;
        self.transitions += 1;

        match step {
            Step::Enter(index) => {
                let count = self.stages.len();
                let stage = &self.stages[index];
                let next = if index + 1 < count {
                    Step::Enter(index + 1)
                } else {
                    Step::Complete
                };
                self.timers.schedule_after(now_ms, stage.duration_ms, next);

                let target = index as f32 / count as f32 * 100.0;
                self.target = self.target.max(target);
                self.state = SequencerState::Playing(index);
                log::debug!("Stage {}/{}: {}", index + 1, count, stage.label);

                Some(Transition::Entered {
                    index,
                    label: stage.label.clone(),
                    cue: stage.cue,
                    target: self.target,
                })
            }
            Step::Complete => {
                self.target = 100.0;
                self.state = SequencerState::Complete;
                log::debug!("Stage sequence complete");
                Some(Transition::Completed)
            }
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Target progress percentage (never decreases)
    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_complete(&self) -> bool {
        self.state == SequencerState::Complete
    }

    /// When the next transition is due
    pub fn next_due(&self) -> Option<f64> {
        self.timers.next_due()
    }

    /// Transitions applied so far (stage entries plus completion)
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ab() -> StageSequencer {
        StageSequencer::new(vec![
            Stage::new("A", 100.0, None),
            Stage::new("B", 100.0, None),
        ])
    }

    #[test]
    fn test_idle_until_started() {
        let mut seq = ab();
        assert_eq!(seq.poll(10_000.0), None);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(seq.target(), 0.0);
    }

    #[test]
    fn test_two_stage_scenario() {
        let mut seq = ab();
        assert!(seq.start(0.0, 0.0));

        match seq.poll(0.0) {
            Some(Transition::Entered { index, label, target, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(label, "A");
                assert_eq!(target, 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(seq.poll(99.0), None);
        assert!(matches!(seq.poll(100.0), Some(Transition::Entered { index: 1, .. })));
        assert_eq!(seq.state(), SequencerState::Playing(1));
        assert_eq!(seq.target(), 50.0);

        assert_eq!(seq.poll(200.0), Some(Transition::Completed));
        assert_eq!(seq.state(), SequencerState::Complete);
        assert_eq!(seq.target(), 100.0);

        assert_eq!(seq.poll(1_000_000.0), None);
        assert_eq!(seq.transitions(), 3);
    }

    #[test]
    fn test_lead_in_delay() {
        let mut seq = ab();
        seq.start(1000.0, 500.0);
        assert_eq!(seq.poll(1499.0), None);
        assert!(seq.poll(1500.0).is_some());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut seq = ab();
        assert!(seq.start(0.0, 0.0));
        assert!(!seq.start(50.0, 0.0));
        seq.poll(0.0);
        assert_eq!(seq.next_due(), Some(100.0));
    }

    #[test]
    fn test_late_poll_applies_one_transition() {
        let mut seq = ab();
        seq.start(0.0, 0.0);
        seq.poll(0.0);
        // A long stall only enters B; B is then held for its full duration
        assert!(matches!(seq.poll(5000.0), Some(Transition::Entered { index: 1, .. })));
        assert_eq!(seq.poll(5000.0), None);
        assert_eq!(seq.poll(5100.0), Some(Transition::Completed));
    }

    #[test]
    fn test_empty_sequence_completes_immediately() {
        let mut seq = StageSequencer::new(Vec::new());
        seq.start(0.0, 500.0);
        assert_eq!(seq.poll(0.0), Some(Transition::Completed));
        assert_eq!(seq.target(), 100.0);
    }

    #[test]
    fn test_cue_carried_on_entry() {
        let mut seq = StageSequencer::new(vec![Stage::new("READY", 10.0, Some(Cue::Complete))]);
        seq.start(0.0, 0.0);
        match seq.poll(0.0) {
            Some(Transition::Entered { cue, .. }) => assert_eq!(cue, Some(Cue::Complete)),
            other => panic!("unexpected {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_n_stages_then_complete(
            durations in prop::collection::vec(0.0f64..500.0, 0..12),
            frame_ms in 1.0f64..50.0,
        ) {
            let stages: Vec<Stage> = durations
                .iter()
                .enumerate()
                .map(|(i, d)| Stage::new(format!("S{}", i), *d, None))
                .collect();
            let n = stages.len();
            let mut seq = StageSequencer::new(stages);
            seq.start(0.0, 0.0);

            let mut entries: Vec<(usize, f64)> = Vec::new();
            let mut completed_at = None;
            let mut last_target = 0.0f32;
            let mut now = 0.0;
            while completed_at.is_none() {
                if let Some(t) = seq.poll(now) {
                    match t {
                        Transition::Entered { index, .. } => entries.push((index, now)),
                        Transition::Completed => completed_at = Some(now),
                    }
                }
                prop_assert!(seq.target() >= last_target);
                last_target = seq.target();
                now += frame_ms;
            }

            prop_assert_eq!(entries.len(), n);
            for (k, (index, _)) in entries.iter().enumerate() {
                prop_assert_eq!(*index, k);
            }
            let mut boundaries: Vec<f64> = entries.iter().map(|(_, t)| *t).collect();
            if let Some(end) = completed_at {
                boundaries.push(end);
            }
            for (k, pair) in boundaries.windows(2).enumerate() {
                prop_assert!(pair[1] - pair[0] >= durations[k]);
            }
            prop_assert_eq!(seq.target(), 100.0);
        }
    }
}
