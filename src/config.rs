use std::{f32::consts::PI, ops::Range};

use glam::{const_vec3, Vec3};
use rand::Rng;

/// Which of the built-in behaviours to run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Groups wander freely away from the anchor, nudged by a shared wind.
    Drift,
    /// Groups enter along a few fixed lanes with some jitter.
    Templated,
    /// Groups sweep an arc around the anchor while facing the look target.
    Orbit,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Easing {
    InOutSine,
    InSine,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::InOutSine => ease_in_out_sine(t),
            Easing::InSine => ease_in_sine(t),
        }
    }
}

pub fn ease_in_out_sine(t: f32) -> f32 {
    0.5 * (1.0 - (PI * t).cos())
}

pub fn ease_in_sine(t: f32) -> f32 {
    1.0 - (t * PI * 0.5).cos()
}

/// Scale over a group's lifetime: ease in until `fade_in`, hold at 1, ease out from `fade_out`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Envelope {
    pub easing: Easing,
    pub exponent: i32,
    pub fade_in: f32,
    pub fade_out: f32,
}

impl Envelope {
    pub fn scale(&self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        let scale = if p < self.fade_in {
            self.easing.apply(p / self.fade_in).powi(self.exponent)
        } else if p >= self.fade_out {
            self.easing
                .apply((1.0 - p) / (1.0 - self.fade_out))
                .powi(self.exponent)
        } else {
            1.0
        };
        // never hand out -0.0
        if scale > 0.0 {
            scale
        } else {
            0.0
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpawnTemplate {
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnMode {
    /// Offset from the anchor by a noise direction scaled by `distance` and `squish`.
    Free { distance: Range<f32>, squish: Vec3 },
    /// Uniform pick from `templates`, jittered by a noise direction.
    Templates {
        templates: Vec<SpawnTemplate>,
        jitter: f32,
        squish: Vec3,
    },
    /// Fixed arc around the anchor; `squish` only shapes the initial depth offset.
    Orbit { distance: Range<f32>, squish: Vec3 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Motion {
    pub translate: bool,
    pub rotate: bool,
    pub billboard: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindConfig {
    pub interval_ms: f64,
    pub strength: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantConfig {
    pub lifespan_ms: Range<f64>,
    pub spawn: SpawnMode,
    pub envelope: Envelope,
    pub motion: Motion,
    pub position_noise_scale: f64,
    pub velocity_noise_scale: f64,
    pub speed: Range<f32>,
    pub spin: Range<f32>,
    pub child_scale: f32,
    pub wind: Option<WindConfig>,
    /// Live groups allowed before the oldest is evicted. `None` means unbounded.
    pub max_groups: Option<usize>,
}

const SQUISH: Vec3 = const_vec3!([1., 1., 4.]);
const DEFAULT_MAX_GROUPS: usize = 512;

impl VariantConfig {
    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Drift => Self::drift(),
            Variant::Templated => Self::templated(),
            Variant::Orbit => Self::orbit(),
        }
    }

    pub fn drift() -> Self {
        Self {
            lifespan_ms: 7000.0..17000.0,
            spawn: SpawnMode::Free {
                distance: 1.0..3.0,
                squish: SQUISH,
            },
            envelope: Envelope {
                easing: Easing::InOutSine,
                exponent: 3,
                fade_in: 0.25,
                fade_out: 0.75,
            },
            motion: Motion {
                translate: true,
                rotate: true,
                billboard: false,
            },
            position_noise_scale: 0.0006,
            velocity_noise_scale: 0.0004,
            speed: 0.2..0.8,
            spin: 0.1..0.6,
            child_scale: 0.5,
            wind: Some(WindConfig {
                interval_ms: 10_000.0,
                strength: 0.75,
            }),
            max_groups: Some(DEFAULT_MAX_GROUPS),
        }
    }

    pub fn templated() -> Self {
        Self {
            lifespan_ms: 12000.0..22000.0,
            spawn: SpawnMode::Templates {
                templates: vec![
                    SpawnTemplate {
                        position: const_vec3!([-9., -3., 0.]),
                        velocity: const_vec3!([1.2, 0.3, 0.]),
                    },
                    SpawnTemplate {
                        position: const_vec3!([9., -3., 0.]),
                        velocity: const_vec3!([-1.2, 0.3, 0.]),
                    },
                    SpawnTemplate {
                        position: const_vec3!([0., -7., -2.]),
                        velocity: const_vec3!([0., 0.9, 0.2]),
                    },
                    SpawnTemplate {
                        position: const_vec3!([-6., 6., -1.]),
                        velocity: const_vec3!([0.8, -0.6, 0.]),
                    },
                ],
                jitter: 1.5,
                squish: SQUISH,
            },
            envelope: Envelope {
                easing: Easing::InOutSine,
                exponent: 4,
                fade_in: 0.25,
                fade_out: 0.75,
            },
            motion: Motion {
                translate: true,
                rotate: true,
                billboard: false,
            },
            position_noise_scale: 0.0006,
            velocity_noise_scale: 0.0004,
            speed: 0.1..0.4,
            spin: 0.05..0.4,
            child_scale: 0.5,
            wind: None,
            max_groups: Some(DEFAULT_MAX_GROUPS),
        }
    }

    pub fn orbit() -> Self {
        Self {
            lifespan_ms: 12000.0..37000.0,
            spawn: SpawnMode::Orbit {
                distance: 4.0..9.0,
                squish: SQUISH,
            },
            envelope: Envelope {
                easing: Easing::InSine,
                exponent: 1,
                fade_in: 0.1,
                fade_out: 0.9,
            },
            motion: Motion {
                translate: false,
                rotate: false,
                billboard: true,
            },
            position_noise_scale: 0.0006,
            velocity_noise_scale: 0.0006,
            speed: 0.0..0.0,
            spin: 0.0..0.0,
            child_scale: 0.5,
            wind: None,
            max_groups: Some(DEFAULT_MAX_GROUPS),
        }
    }
}

/// Uniform sample that tolerates empty ranges by returning the start.
pub(crate) fn sample_f32<R: Rng + ?Sized>(rng: &mut R, range: &Range<f32>) -> f32 {
    if range.start < range.end {
        rng.gen_range(range.clone())
    } else {
        range.start
    }
}

pub(crate) fn sample_f64<R: Rng + ?Sized>(rng: &mut R, range: &Range<f64>) -> f64 {
    if range.start < range.end {
        rng.gen_range(range.clone())
    } else {
        range.start
    }
}
