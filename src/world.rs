use glam::{Mat4, Quat, Vec3};
use log::debug;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::{
    config::VariantConfig,
    emote::EmoteImage,
    entity::{euler_rotation, Anchor, Transform},
    noise::NoiseSource,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// One textured quad of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub image: EmoteImage,
    /// Position along the group's local horizontal axis.
    pub offset: Vec3,
    /// World-space orientation when billboarding, otherwise the group's own rotation applies.
    pub facing: Option<Quat>,
}

/// A cluster of quads spawned for one chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct EmoteGroup {
    pub(crate) id: GroupId,
    pub(crate) spawn_time: f64,
    pub(crate) lifespan: f64,
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) rotation: Vec3,
    pub(crate) rotation_velocity: Vec3,
    pub(crate) orbit_distance: f32,
    pub(crate) scale: f32,
    pub(crate) child_scale: f32,
    pub(crate) children: Vec<Quad>,
}

impl EmoteGroup {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn spawn_time(&self) -> f64 {
        self.spawn_time
    }

    pub fn lifespan(&self) -> f64 {
        self.lifespan
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn rotation_velocity(&self) -> Vec3 {
        self.rotation_velocity
    }

    pub fn orbit_distance(&self) -> f32 {
        self.orbit_distance
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn children(&self) -> &[Quad] {
        &self.children
    }

    /// Fraction of the lifespan elapsed at `now_ms`, never negative.
    pub fn progress(&self, now_ms: f64) -> f32 {
        ((now_ms - self.spawn_time) / self.lifespan).max(0.0) as f32
    }

    pub fn is_expired(&self, now_ms: f64) -> bool {
        now_ms - self.spawn_time >= self.lifespan
    }

    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: euler_rotation(self.rotation),
            scale: Vec3::splat(self.scale),
        }
    }

    /// World position of a child's centre.
    pub fn child_position(&self, quad: &Quad) -> Vec3 {
        self.transform()
            .matrix()
            .transform_point3(quad.offset * self.child_scale)
    }

    /// Model matrix per child, in layout order.
    pub fn quad_matrices(&self) -> impl Iterator<Item = (Mat4, &Quad)> + '_ {
        let group = self.transform().matrix();
        let size = self.scale * self.child_scale;
        self.children.iter().map(move |quad| {
            let matrix = match quad.facing {
                Some(facing) => Mat4::from_scale_rotation_translation(
                    Vec3::splat(size),
                    facing,
                    group.transform_point3(quad.offset * self.child_scale),
                ),
                None => {
                    group
                        * Mat4::from_scale(Vec3::splat(self.child_scale))
                        * Mat4::from_translation(quad.offset)
                }
            };
            (matrix, quad)
        })
    }
}

/// Receives the visuals the core adds at spawn and drops at expiry.
pub trait SceneRegistry {
    fn add_visual(&mut self, group: &EmoteGroup);
    fn remove_visual(&mut self, id: GroupId);
}

/// Every live group plus the state needed to spawn and animate them.
pub struct AnimationWorld {
    pub(crate) config: VariantConfig,
    pub(crate) groups: Vec<EmoteGroup>,
    pub(crate) anchor: Anchor,
    pub(crate) noise: NoiseSource,
    pub(crate) rng: Pcg64Mcg,
    next_id: u64,
}

impl AnimationWorld {
    pub fn new(config: VariantConfig, seed: u64) -> Self {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let noise = NoiseSource::new(rng.gen(), config.wind);
        Self {
            config,
            groups: Vec::new(),
            anchor: Anchor::default(),
            noise,
            rng,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.anchor = anchor;
    }

    pub fn noise(&self) -> &NoiseSource {
        &self.noise
    }

    pub fn groups(&self) -> &[EmoteGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&EmoteGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn advance_wind(&mut self, now_ms: f64) {
        self.noise.advance_wind(now_ms);
    }

    pub(crate) fn allocate_id(&mut self) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends `group`, evicting the oldest groups first when at capacity.
    pub(crate) fn insert(&mut self, group: EmoteGroup, registry: &mut impl SceneRegistry) {
        if let Some(max) = self.config.max_groups {
            while !self.groups.is_empty() && self.groups.len() >= max.max(1) {
                let evicted = self.groups.remove(0);
                registry.remove_visual(evicted.id);
                debug!("Evicted group {} at capacity {}", evicted.id.0, max);
            }
        }
        registry.add_visual(&group);
        self.groups.push(group);
    }

    pub(crate) fn remove_at(&mut self, index: usize, registry: &mut impl SceneRegistry) -> GroupId {
        let group = self.groups.remove(index);
        registry.remove_visual(group.id);
        group.id
    }
}
