use glam::{vec3, Vec3};
use log::debug;
use rand::{seq::SliceRandom, Rng};

use crate::{
    config::{sample_f32, sample_f64, SpawnMode},
    emote::EmoteEvent,
    world::{AnimationWorld, EmoteGroup, GroupId, Quad, SceneRegistry},
};

// Separate time offsets keep velocity and spin from echoing the spawn direction.
const VELOCITY_TIME_OFFSET_MS: f64 = 31_337.0;
const SPIN_TIME_OFFSET_MS: f64 = 73_331.0;
/// Each spawn reads the noise field this far from `now` at most, so groups spawned in the same
/// frame still get their own directions.
const SPAWN_TIME_SPREAD_MS: f64 = 1_000_000.0;

/// Arc position for an orbiting group at `progress`, sweeping 270 degrees around the anchor.
pub fn orbit_position(progress: f32, distance: f32, anchor: Vec3, depth: f32) -> Vec3 {
    let phase = progress * std::f32::consts::PI * 1.5 - std::f32::consts::PI * 0.75;
    vec3(
        phase.sin() * distance + anchor.x,
        phase.cos() * distance + anchor.y,
        depth,
    )
}

/// Local offsets for `count` quads laid out left to right around the group origin.
pub fn layout_offsets(count: usize) -> impl Iterator<Item = Vec3> {
    let half = count as f32 / 2.0;
    (0..count).map(move |index| vec3(index as f32 - half, 0., 0.))
}

impl AnimationWorld {
    /// Creates exactly one group for `event`, registers it, and returns its id.
    pub fn spawn(
        &mut self,
        event: &EmoteEvent,
        now_ms: f64,
        registry: &mut impl SceneRegistry,
    ) -> GroupId {
        let config = &self.config;
        let rng = &mut self.rng;
        let anchor = self.anchor.position;

        let noise_time = now_ms + rng.gen_range(0.0..SPAWN_TIME_SPREAD_MS);
        let jitter = self.noise.direction(noise_time, config.position_noise_scale);
        let lifespan = sample_f64(rng, &config.lifespan_ms);

        let (position, lane_velocity, orbit_distance) = match &config.spawn {
            SpawnMode::Free { distance, squish } => {
                let offset = jitter * sample_f32(rng, distance) * *squish;
                (anchor + offset, Vec3::ZERO, 0.0)
            }
            SpawnMode::Templates {
                templates,
                jitter: amount,
                squish,
            } => match templates.choose(rng) {
                Some(template) => (
                    template.position + jitter * *amount * *squish,
                    template.velocity,
                    0.0,
                ),
                None => (anchor + jitter * *amount * *squish, Vec3::ZERO, 0.0),
            },
            SpawnMode::Orbit { distance, squish } => {
                let distance = sample_f32(rng, distance);
                let depth = (jitter * *squish).z;
                (orbit_position(0.0, distance, anchor, depth), Vec3::ZERO, distance)
            }
        };

        let velocity = if config.motion.translate {
            let heading = self.noise.direction(
                noise_time + VELOCITY_TIME_OFFSET_MS,
                config.velocity_noise_scale,
            );
            heading * sample_f32(rng, &config.speed) + lane_velocity
        } else {
            Vec3::ZERO
        };

        let rotation_velocity = if config.motion.rotate {
            let axis = self
                .noise
                .direction(noise_time + SPIN_TIME_OFFSET_MS, config.velocity_noise_scale);
            axis * sample_f32(rng, &config.spin)
        } else {
            Vec3::ZERO
        };

        let children = event
            .emotes
            .iter()
            .zip(layout_offsets(event.emotes.len()))
            .map(|(image, offset)| Quad {
                image: image.clone(),
                offset,
                facing: None,
            })
            .collect::<Vec<_>>();

        let scale = config.envelope.scale(0.0);
        let child_scale = config.child_scale;

        let id = self.allocate_id();
        let group = EmoteGroup {
            id,
            spawn_time: now_ms,
            lifespan,
            position,
            velocity,
            rotation: Vec3::ZERO,
            rotation_velocity,
            orbit_distance,
            scale,
            child_scale,
            children,
        };
        debug!(
            "Spawned group {} with {} emotes, lifespan {:.0}ms at {:?}",
            id.value(),
            group.children.len(),
            lifespan,
            position
        );
        self.insert(group, registry);
        id
    }
}
