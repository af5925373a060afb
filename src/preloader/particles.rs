//! Particle backdrop behind the logo
//!
//! Points spawn scattered over the canvas and converge on a cloud around the
//! centre while their initial drift dies out. Purely cosmetic.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::{MAX_FRAME_DT, REFERENCE_FPS};

/// Fraction of the distance to target covered per frame
const PULL: f32 = 0.05;
/// Drift multiplier per frame
const DRIFT_DECAY: f32 = 0.95;
/// Alpha gained per frame
const FADE_IN: f32 = 0.01;
/// Half-size of the square the targets are spread over (px)
const TARGET_SPREAD: f32 = 100.0;
/// Link line opacity at zero distance
const LINK_OPACITY: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub target: Vec2,
    /// Drift in px per reference frame
    pub drift: Vec2,
    /// Radius (px)
    pub size: f32,
    /// Hue (degrees)
    pub hue: f32,
    /// Lightness (percent)
    pub lightness: f32,
    pub alpha: f32,
}

impl Particle {
    /// CSS color at full saturation
    pub fn css_color(&self, alpha: f32) -> String {
        format!(
            "hsla({:.0}, 100%, {:.0}%, {:.3})",
            self.hue, self.lightness, alpha
        )
    }
}

/// A line between two nearby particles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub a: usize,
    pub b: usize,
    pub opacity: f32,
}

pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new(count: usize, width: f32, height: f32, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let centre = Vec2::new(width, height) * 0.5;
        let spread = |rng: &mut Pcg32| rng.random_range(-1.0f32..1.0);

        let particles = (0..count)
            .map(|_| Particle {
                pos: Vec2::new(
                    rng.random_range(0.0..width.max(1.0)),
                    rng.random_range(0.0..height.max(1.0)),
                ),
                target: centre
                    + Vec2::new(spread(&mut rng), spread(&mut rng)) * TARGET_SPREAD,
                drift: Vec2::new(spread(&mut rng), spread(&mut rng)),
                size: rng.random_range(1.0..4.0),
                hue: rng.random_range(190.0..210.0),
                lightness: rng.random_range(50.0..80.0),
                alpha: rng.random_range(0.0..1.0),
            })
            .collect();

        Self { particles }
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        let frames = dt.clamp(0.0, MAX_FRAME_DT) * REFERENCE_FPS;
        if frames == 0.0 {
            return;
        }
        let pull = crate::frame_blend(PULL, dt);
        let decay = DRIFT_DECAY.powf(frames);

        for p in &mut self.particles {
            p.pos += (p.target - p.pos) * pull + p.drift * frames;
            p.drift *= decay;
            p.alpha = (p.alpha + FADE_IN * frames).min(1.0);
        }
    }

    /// Pairs closer than `max_dist`, with line opacity fading to zero at the limit
    pub fn links(&self, max_dist: f32) -> Vec<Link> {
        let mut links = Vec::new();
        if max_dist <= 0.0 {
            return links;
        }
        for (a, pa) in self.particles.iter().enumerate() {
            for (offset, pb) in self.particles[a + 1..].iter().enumerate() {
                let dist = pa.pos.distance(pb.pos);
                if dist < max_dist {
                    links.push(Link {
                        a,
                        b: a + 1 + offset,
                        opacity: LINK_OPACITY * (1.0 - dist / max_dist),
                    });
                }
            }
        }
        links
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
