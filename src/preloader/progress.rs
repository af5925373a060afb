//! Progress bar animation
//!
//! Exponential approach of the displayed percentage toward the target,
//! independent of stage timing.

use crate::frame_blend;

#[derive(Debug, Clone)]
pub struct ProgressAnimator {
    displayed: f32,
    target: f32,
    smoothing: f32,
    snap_threshold: f32,
}

impl Default for ProgressAnimator {
    fn default() -> Self {
        Self::new(0.1, 0.5)
    }
}

impl ProgressAnimator {
    pub fn new(smoothing: f32, snap_threshold: f32) -> Self {
        Self {
            displayed: 0.0,
            target: 0.0,
            smoothing,
            snap_threshold,
        }
    }

    /// Raise the target (decreases are ignored)
    pub fn set_target(&mut self, target: f32) {
        let target = target.clamp(0.0, 100.0);
        if target > self.target {
            self.target = target;
        }
    }

    /// Step the animation by `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        if self.displayed >= self.target {
            return;
        }

        let gap = self.target - self.displayed;
        self.displayed += gap * frame_blend(self.smoothing, dt);

        if self.target - self.displayed < self.snap_threshold {
            self.displayed = self.target;
        }
        // Never overshoot, whatever the factor
        self.displayed = self.displayed.min(self.target);
    }

    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whole percent shown in the label
    pub fn percent(&self) -> u32 {
        self.displayed.floor() as u32
    }

    /// Displayed has caught up with the target
    pub fn is_settled(&self) -> bool {
        self.displayed == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn test_single_frame_closes_ten_percent() {
        let mut anim = ProgressAnimator::default();
        anim.set_target(55.0);
        anim.advance(FRAME);
        assert!((anim.displayed() - 5.5).abs() < 1e-3);
        assert_eq!(anim.percent(), 5);
    }

    #[test]
    fn test_snaps_when_close() {
        let mut anim = ProgressAnimator::default();
        anim.set_target(100.0);
        let mut frames = 0;
        while !anim.is_settled() {
            anim.advance(FRAME);
            frames += 1;
            assert!(frames < 1000, "animator never settled");
        }
        assert_eq!(anim.displayed(), 100.0);
        assert_eq!(anim.percent(), 100);
    }

    #[test]
    fn test_target_never_decreases() {
        let mut anim = ProgressAnimator::default();
        anim.set_target(60.0);
        anim.set_target(20.0);
        assert_eq!(anim.target(), 60.0);
    }

    #[test]
    fn test_zero_dt_is_a_noop() {
        let mut anim = ProgressAnimator::default();
        anim.set_target(80.0);
        anim.advance(0.0);
        assert_eq!(anim.displayed(), 0.0);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut clamped = ProgressAnimator::default();
        clamped.set_target(100.0);
        clamped.advance(10.0);

        let mut reference = ProgressAnimator::default();
        reference.set_target(100.0);
        reference.advance(crate::consts::MAX_FRAME_DT);

        assert_eq!(clamped.displayed(), reference.displayed());
        assert!(clamped.displayed() < 100.0);
    }

    proptest! {
        #[test]
        fn prop_displayed_monotonic_and_bounded(
            steps in prop::collection::vec((0.0f32..120.0, 0.0f32..0.2), 1..200),
        ) {
            let mut anim = ProgressAnimator::default();
            let mut last = anim.displayed();
            for (target, dt) in steps {
                anim.set_target(target);
                anim.advance(dt);
                prop_assert!(anim.displayed() >= last);
                prop_assert!(anim.displayed() <= anim.target());
                last = anim.displayed();
            }
        }
    }
}
