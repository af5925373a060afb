//! Parameter automation
//!
//! A [`ParamTimeline`] is the list of automation events a Web Audio
//! `AudioParam` would receive, kept as data so the same envelope can be
//! replayed onto a real node or evaluated directly.

/// One automation event (times in seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` at `time`
    SetValue { value: f32, time: f64 },
    /// Ramp linearly from the previous event to `value`, arriving at `end`
    LinearRamp { value: f32, end: f64 },
    /// Ramp exponentially from the previous event to `value`, arriving at `end`
    ExponentialRamp { value: f32, end: f64 },
}

impl ParamEvent {
    /// Time at which the event's value is reached
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } => time,
            ParamEvent::LinearRamp { end, .. } => end,
            ParamEvent::ExponentialRamp { end, .. } => end,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            ParamEvent::SetValue { value, .. }
            | ParamEvent::LinearRamp { value, .. }
            | ParamEvent::ExponentialRamp { value, .. } => value,
        }
    }

    fn shifted(self, offset: f64) -> Self {
        match self {
            ParamEvent::SetValue { value, time } => ParamEvent::SetValue {
                value,
                time: time + offset,
            },
            ParamEvent::LinearRamp { value, end } => ParamEvent::LinearRamp {
                value,
                end: end + offset,
            },
            ParamEvent::ExponentialRamp { value, end } => ParamEvent::ExponentialRamp {
                value,
                end: end + offset,
            },
        }
    }
}

/// Automation curve for one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    /// Value before any event applies
    pub default_value: f32,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    /// Constant parameter
    pub fn constant(value: f32) -> Self {
        Self::new(value)
    }

    /// Builder: jump to `value` at `time`
    pub fn set_at(mut self, value: f32, time: f64) -> Self {
        self.push(ParamEvent::SetValue { value, time });
        self
    }

    /// Builder: linear ramp to `value` ending at `end`
    pub fn linear_to(mut self, value: f32, end: f64) -> Self {
        self.push(ParamEvent::LinearRamp { value, end });
        self
    }

    /// Builder: exponential ramp to `value` ending at `end`
    pub fn exp_to(mut self, value: f32, end: f64) -> Self {
        self.push(ParamEvent::ExponentialRamp { value, end });
        self
    }

    /// Append an event, keeping events ordered by time (stable for ties)
    pub fn push(&mut self, event: ParamEvent) {
        let at = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(at, event);
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    /// Time of the last event (0 if none)
    #[cfg(test)]
    pub fn end_time(&self) -> f64 {
        self.events.last().map(|e| e.time()).unwrap_or(0.0)
    }

    /// Same curve moved later by `offset` seconds
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            default_value: self.default_value,
            events: self.events.iter().map(|e| e.shifted(offset)).collect(),
        }
    }

    /// Evaluate the curve at time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        let mut value = self.default_value;
        let mut prev_time = 0.0_f64;

        for event in &self.events {
            match *event {
                ParamEvent::SetValue { value: v, time } => {
                    if t < time {
                        return value;
                    }
                    value = v;
                    prev_time = time;
                }
                ParamEvent::LinearRamp { value: v, end } => {
                    if t < end {
                        if t <= prev_time || end <= prev_time {
                            return value;
                        }
                        let frac = ((t - prev_time) / (end - prev_time)) as f32;
                        return value + (v - value) * frac;
                    }
                    value = v;
                    prev_time = end;
                }
                ParamEvent::ExponentialRamp { value: v, end } => {
                    if t < end {
                        // Exponential ramps need both endpoints on the same side of zero
                        if t <= prev_time || end <= prev_time || value * v <= 0.0 {
                            return value;
                        }
                        let frac = (t - prev_time) / (end - prev_time);
                        return value * (v / value).powf(frac as f32);
                    }
                    value = v;
                    prev_time = end;
                }
            }
        }

        value
    }

    /// Drop every event at or after `t` and hold the value the curve had at `t`
    pub fn cancel_and_hold(&mut self, t: f64) -> f32 {
        let held = self.value_at(t);
        self.events.retain(|e| e.time() < t);
        self.push(ParamEvent::SetValue { value: held, time: t });
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_constant() {
        let p = ParamTimeline::constant(0.7);
        assert_eq!(p.value_at(0.0), 0.7);
        assert_eq!(p.value_at(100.0), 0.7);
    }

    #[test]
    fn test_linear_attack() {
        let p = ParamTimeline::new(0.0).set_at(0.0, 0.0).linear_to(0.3, 0.1);
        assert!(approx(p.value_at(0.05), 0.15));
        assert!(approx(p.value_at(0.1), 0.3));
        assert!(approx(p.value_at(1.0), 0.3));
    }

    #[test]
    fn test_exponential_decay_midpoint_is_geometric_mean() {
        let p = ParamTimeline::new(0.0).set_at(0.2, 0.0).exp_to(0.01, 0.15);
        let mid = p.value_at(0.075);
        assert!(approx(mid, (0.2_f32 * 0.01).sqrt()));
        assert!(approx(p.value_at(0.15), 0.01));
    }

    #[test]
    fn test_exponential_from_zero_holds() {
        let p = ParamTimeline::new(0.0).set_at(0.0, 0.0).exp_to(1.0, 1.0);
        assert_eq!(p.value_at(0.5), 0.0);
        assert_eq!(p.value_at(1.0), 1.0);
    }

    #[test]
    fn test_events_sorted_on_insert() {
        let mut p = ParamTimeline::new(0.0);
        p.push(ParamEvent::SetValue { value: 2.0, time: 2.0 });
        p.push(ParamEvent::SetValue { value: 1.0, time: 1.0 });
        assert_eq!(p.events()[0].time(), 1.0);
        assert_eq!(p.end_time(), 2.0);
    }

    #[test]
    fn test_cancel_and_hold_mid_ramp() {
        let mut p = ParamTimeline::new(0.0)
            .set_at(0.0, 0.0)
            .linear_to(1.0, 1.0)
            .set_at(1.0, 7.0)
            .linear_to(0.0, 8.0);
        let held = p.cancel_and_hold(0.5);
        assert!(approx(held, 0.5));
        assert_eq!(p.events().len(), 2);
        assert!(approx(p.value_at(5.0), 0.5));
    }

    #[test]
    fn test_shifted() {
        let p = ParamTimeline::new(0.0).set_at(0.0, 0.0).linear_to(1.0, 1.0);
        let q = p.shifted(10.0);
        assert!(approx(q.value_at(10.5), 0.5));
        assert_eq!(q.value_at(5.0), 0.0);
    }
}
