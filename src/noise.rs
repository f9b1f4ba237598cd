//! Coherent noise used to pick spawn positions and velocities.
//!
//! Directions come from three samples of 4D simplex noise that share a time coordinate but sit at
//! different spatial offsets, so consecutive calls drift smoothly instead of jumping around.

use glam::{vec3, Vec3};
use log::debug;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::config::WindConfig;

/// Squared length below which a direction is treated as degenerate.
const DEGENERATE_LENGTH_SQUARED: f32 = 1e-12;

const F4: f64 = 0.309_016_994_374_947_45; // (sqrt(5) - 1) / 4
const G4: f64 = 0.138_196_601_125_010_5; // (5 - sqrt(5)) / 20

#[rustfmt::skip]
const GRAD4: [[f64; 4]; 32] = [
    [0., 1., 1., 1.], [0., 1., 1., -1.], [0., 1., -1., 1.], [0., 1., -1., -1.],
    [0., -1., 1., 1.], [0., -1., 1., -1.], [0., -1., -1., 1.], [0., -1., -1., -1.],
    [1., 0., 1., 1.], [1., 0., 1., -1.], [1., 0., -1., 1.], [1., 0., -1., -1.],
    [-1., 0., 1., 1.], [-1., 0., 1., -1.], [-1., 0., -1., 1.], [-1., 0., -1., -1.],
    [1., 1., 0., 1.], [1., 1., 0., -1.], [1., -1., 0., 1.], [1., -1., 0., -1.],
    [-1., 1., 0., 1.], [-1., 1., 0., -1.], [-1., -1., 0., 1.], [-1., -1., 0., -1.],
    [1., 1., 1., 0.], [1., 1., -1., 0.], [1., -1., 1., 0.], [1., -1., -1., 0.],
    [-1., 1., 1., 0.], [-1., 1., -1., 0.], [-1., -1., 1., 0.], [-1., -1., -1., 0.],
];

/// 4D simplex noise over a seeded permutation table. Output lies in [-1, 1].
pub struct Simplex4 {
    perm: [u8; 512],
}

impl Simplex4 {
    pub fn new(seed: u64) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        table.shuffle(&mut Pcg64Mcg::seed_from_u64(seed));

        let mut perm = [0u8; 512];
        for (i, value) in perm.iter_mut().enumerate() {
            *value = table[i & 255];
        }
        Self { perm }
    }

    fn hash(&self, i: usize, j: usize, k: usize, l: usize) -> usize {
        let p = &self.perm;
        p[i + p[j + p[k + p[l] as usize] as usize] as usize] as usize % 32
    }

    pub fn sample(&self, x: f64, y: f64, z: f64, w: f64) -> f64 {
        let s = (x + y + z + w) * F4;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();
        let l = (w + s).floor();
        let t = (i + j + k + l) * G4;

        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);
        let w0 = w - (l - t);

        // Rank each axis to find which simplex of the 24 the point falls in.
        let mut rank = [0u8; 4];
        let d = [x0, y0, z0, w0];
        for a in 0..4 {
            for b in (a + 1)..4 {
                if d[a] > d[b] {
                    rank[a] += 1;
                } else {
                    rank[b] += 1;
                }
            }
        }
        let step = |threshold: u8| -> [usize; 4] {
            [
                (rank[0] >= threshold) as usize,
                (rank[1] >= threshold) as usize,
                (rank[2] >= threshold) as usize,
                (rank[3] >= threshold) as usize,
            ]
        };
        let corners = [[0; 4], step(3), step(2), step(1), [1; 4]];

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let kk = (k as i64 & 255) as usize;
        let ll = (l as i64 & 255) as usize;

        let total: f64 = corners
            .iter()
            .enumerate()
            .map(|(n, c)| {
                let offset = n as f64 * G4;
                let dx = x0 - c[0] as f64 + offset;
                let dy = y0 - c[1] as f64 + offset;
                let dz = z0 - c[2] as f64 + offset;
                let dw = w0 - c[3] as f64 + offset;
                let falloff = 0.6 - dx * dx - dy * dy - dz * dz - dw * dw;
                if falloff < 0.0 {
                    return 0.0;
                }
                let g = GRAD4[self.hash(ii + c[0], jj + c[1], kk + c[2], ll + c[3])];
                let falloff = falloff * falloff;
                falloff * falloff * (g[0] * dx + g[1] * dy + g[2] * dz + g[3] * dw)
            })
            .sum();

        (27.0 * total).clamp(-1.0, 1.0)
    }
}

/// Slowly changing bias added to every direction.
#[derive(Debug, Copy, Clone)]
struct Wind {
    config: WindConfig,
    offset: Vec3,
    next_change_ms: f64,
}

pub struct NoiseSource {
    simplex: Simplex4,
    wind: Option<Wind>,
    rng: Pcg64Mcg,
}

impl NoiseSource {
    pub fn new(seed: u64, wind: Option<WindConfig>) -> Self {
        Self {
            simplex: Simplex4::new(seed),
            wind: wind.map(|config| Wind {
                config,
                offset: Vec3::ZERO,
                next_change_ms: f64::NEG_INFINITY,
            }),
            rng: Pcg64Mcg::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
        }
    }

    /// Unit vector drifting smoothly with `time_ms * noise_scale`.
    pub fn direction(&self, time_ms: f64, noise_scale: f64) -> Vec3 {
        let t = time_ms * noise_scale;
        let raw = vec3(
            self.simplex.sample(1., 0., 0., t) as f32,
            self.simplex.sample(0., 1., 0., t) as f32,
            self.simplex.sample(0., 0., 1., t) as f32,
        );
        normalize_or_up(raw + self.wind_offset())
    }

    pub fn wind_offset(&self) -> Vec3 {
        self.wind.map_or(Vec3::ZERO, |wind| wind.offset)
    }

    /// Re-rolls the wind once its interval has elapsed.
    pub fn advance_wind(&mut self, now_ms: f64) {
        let rng = &mut self.rng;
        if let Some(wind) = self.wind.as_mut() {
            if now_ms < wind.next_change_ms {
                return;
            }
            let heading = vec3(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            wind.offset = normalize_or_up(heading) * wind.config.strength;
            wind.next_change_ms = now_ms + wind.config.interval_ms;
            debug!("Wind changed to {:?}", wind.offset);
        }
    }
}

/// Normalizes `v`, falling back to +Y when it is too short to have a direction.
pub fn normalize_or_up(v: Vec3) -> Vec3 {
    if v.is_finite() && v.length_squared() > DEGENERATE_LENGTH_SQUARED {
        v.normalize()
    } else {
        Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplex_is_deterministic_per_seed() {
        let a = Simplex4::new(42);
        let b = Simplex4::new(42);
        let c = Simplex4::new(43);
        let samples = |n: &Simplex4| -> Vec<f64> {
            (0..32)
                .map(|i| n.sample(0.37 * i as f64, 1.1, -0.5, i as f64 * 0.013))
                .collect()
        };
        assert_eq!(samples(&a), samples(&b));
        assert_ne!(samples(&a), samples(&c));
    }

    #[test]
    fn simplex_stays_in_range() {
        let noise = Simplex4::new(1);
        for i in 0..2000 {
            let f = i as f64 * 0.173;
            let value = noise.sample(f.sin() * 10.0, f * 0.5, -f, f * 0.01);
            assert!((-1.0..=1.0).contains(&value), "{}", value);
        }
    }

    #[test]
    fn direction_is_unit_length() {
        let source = NoiseSource::new(5, None);
        let times = [0.0, 1.0, -250.0, 16.6, 1.0e6, 1.7e12, -3.3e9];
        let scales = [0.0, 0.0006, 0.001, 1.0, 37.5];
        for t in times {
            for s in scales {
                let d = source.direction(t, s);
                assert!((d.length() - 1.0).abs() < 1e-5, "t={} s={} d={:?}", t, s, d);
            }
        }
    }

    #[test]
    fn samples_drift_smoothly_over_time() {
        let noise = Simplex4::new(9);
        let step = 16.0 * 0.0006;
        for frame in 0..600 {
            let t = frame as f64 * step;
            for axis in [[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]] {
                let a = noise.sample(axis[0], axis[1], axis[2], t);
                let b = noise.sample(axis[0], axis[1], axis[2], t + step);
                assert!((a - b).abs() < 0.25, "jump at frame {}: {} -> {}", frame, a, b);
            }
        }
    }

    #[test]
    fn degenerate_vectors_fall_back_to_up() {
        assert_eq!(normalize_or_up(Vec3::ZERO), Vec3::Y);
        assert_eq!(normalize_or_up(vec3(f32::NAN, 0., 0.)), Vec3::Y);
        assert_eq!(normalize_or_up(vec3(0., 0., 2.)), Vec3::Z);
    }

    #[test]
    fn wind_changes_only_on_its_interval() {
        let mut source = NoiseSource::new(
            11,
            Some(WindConfig {
                interval_ms: 10_000.0,
                strength: 0.5,
            }),
        );
        assert_eq!(source.wind_offset(), Vec3::ZERO);

        source.advance_wind(0.0);
        let first = source.wind_offset();
        assert!((first.length() - 0.5).abs() < 1e-5);

        source.advance_wind(9_999.0);
        assert_eq!(source.wind_offset(), first);

        source.advance_wind(10_000.0);
        assert_ne!(source.wind_offset(), first);
    }

    #[test]
    fn wind_bends_directions_towards_its_heading() {
        let wind = WindConfig {
            interval_ms: 10_000.0,
            strength: 0.75,
        };
        let calm = NoiseSource::new(21, None);
        let mut windy = NoiseSource::new(21, Some(wind));
        windy.advance_wind(0.0);
        let heading = windy.wind_offset().normalize();

        let (mut calm_sum, mut windy_sum) = (0.0, 0.0);
        for i in 0..400 {
            let t = i as f64 * 250.0;
            let calm_dot = calm.direction(t, 0.0006).dot(heading);
            let windy_dot = windy.direction(t, 0.0006).dot(heading);
            assert!(windy_dot >= calm_dot - 1e-5, "t={}: {} < {}", t, windy_dot, calm_dot);
            calm_sum += calm_dot;
            windy_sum += windy_dot;
        }
        assert!(windy_sum / 400.0 > calm_sum / 400.0 + 0.2);
    }

    #[test]
    fn calm_source_has_no_wind() {
        let mut source = NoiseSource::new(3, None);
        source.advance_wind(50_000.0);
        assert_eq!(source.wind_offset(), Vec3::ZERO);
    }
}
