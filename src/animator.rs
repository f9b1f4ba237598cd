use glam::Vec3;
use log::debug;

use crate::{
    config::SpawnMode,
    entity::{euler_rotation, look_rotation, Transform},
    spawner::orbit_position,
    world::{AnimationWorld, GroupId, SceneRegistry},
};

impl AnimationWorld {
    /// Moves every live group forward by `delta_seconds`, reshapes it for `now_ms`, and retires
    /// the ones whose lifespan has run out. Returns the retired ids.
    pub fn advance(
        &mut self,
        delta_seconds: f32,
        now_ms: f64,
        registry: &mut impl SceneRegistry,
    ) -> Vec<GroupId> {
        let mut removed = Vec::new();
        let motion = self.config.motion;
        let envelope = self.config.envelope;
        let anchor = self.anchor;
        let orbiting = matches!(self.config.spawn, SpawnMode::Orbit { .. });

        // Reverse order keeps indices valid while removing in place.
        for index in (0..self.groups.len()).rev() {
            if self.groups[index].is_expired(now_ms) {
                let id = self.remove_at(index, registry);
                debug!("Group {} expired", id.value());
                removed.push(id);
                continue;
            }

            let group = &mut self.groups[index];
            let progress = group.progress(now_ms);

            if orbiting {
                group.position = orbit_position(
                    progress,
                    group.orbit_distance,
                    anchor.position,
                    group.position.z,
                );
            } else if motion.translate {
                group.position += group.velocity * delta_seconds;
            }

            if motion.rotate {
                group.rotation += group.rotation_velocity * delta_seconds;
            }

            group.scale = envelope.scale(progress);

            if motion.billboard {
                let transform = Transform {
                    position: group.position,
                    rotation: euler_rotation(group.rotation),
                    scale: Vec3::splat(group.scale),
                }
                .matrix();
                let child_scale = group.child_scale;
                for quad in group.children.iter_mut() {
                    let centre = transform.transform_point3(quad.offset * child_scale);
                    quad.facing = Some(look_rotation(anchor.look_target - centre));
                }
            }
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::VariantConfig,
        emote::{EmoteEvent, EmoteId, EmoteImage, EmoteTexture},
        world::testing::RecordingRegistry,
    };

    fn event(count: usize) -> EmoteEvent {
        let texture = Arc::new(EmoteTexture::from_rgba(1, 1, vec![255; 4]).unwrap());
        EmoteEvent::new(
            (0..count)
                .map(|i| EmoteImage {
                    id: EmoteId::new(format!("emote{}", i)),
                    texture: texture.clone(),
                })
                .collect(),
        )
    }

    fn fixed_lifespan(mut config: VariantConfig, lifespan: f64) -> VariantConfig {
        config.lifespan_ms = lifespan..lifespan;
        config
    }

    #[test]
    fn integrates_velocity_and_spin() {
        let mut world = AnimationWorld::new(VariantConfig::drift(), 1);
        let mut registry = RecordingRegistry::default();
        let id = world.spawn(&event(2), 0.0, &mut registry);
        let before = world.group(id).unwrap().clone();

        world.advance(0.5, 1000.0, &mut registry);
        let after = world.group(id).unwrap();

        let expected = before.position() + before.velocity() * 0.5;
        assert!(after.position().distance(expected) < 1e-5);
        let spun = before.rotation() + before.rotation_velocity() * 0.5;
        assert!(after.rotation().distance(spun) < 1e-5);
    }

    #[test]
    fn zero_delta_only_recomputes_scale() {
        let mut world = AnimationWorld::new(VariantConfig::templated(), 2);
        let mut registry = RecordingRegistry::default();
        let id = world.spawn(&event(3), 0.0, &mut registry);

        world.advance(0.016, 1500.0, &mut registry);
        let first = world.group(id).unwrap().clone();
        world.advance(0.0, 1500.0, &mut registry);
        let second = world.group(id).unwrap();

        assert_eq!(first.position(), second.position());
        assert_eq!(first.rotation(), second.rotation());
        assert_eq!(first.scale(), second.scale());
    }

    #[test]
    fn scale_follows_the_envelope() {
        let config = fixed_lifespan(VariantConfig::drift(), 10_000.0);
        let envelope = config.envelope;
        let mut world = AnimationWorld::new(config, 3);
        let mut registry = RecordingRegistry::default();
        let id = world.spawn(&event(1), 0.0, &mut registry);

        for now in [0.0, 1000.0, 2500.0, 5000.0, 7500.0, 9000.0] {
            world.advance(0.0, now, &mut registry);
            let scale = world.group(id).unwrap().scale();
            assert!((scale - envelope.scale(now as f32 / 10_000.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn expired_groups_are_removed_exactly_once() {
        let config = fixed_lifespan(VariantConfig::drift(), 1000.0);
        let mut world = AnimationWorld::new(config, 4);
        let mut registry = RecordingRegistry::default();
        let id = world.spawn(&event(2), 0.0, &mut registry);

        assert!(world.advance(0.016, 999.0, &mut registry).is_empty());
        assert_eq!(world.advance(0.016, 1000.0, &mut registry), [id]);
        assert!(world.advance(0.016, 1100.0, &mut registry).is_empty());

        assert!(world.is_empty());
        assert_eq!(registry.removed, [id]);
        assert!(registry.live.is_empty());
    }

    #[test]
    fn removal_leaves_other_groups_alone() {
        let mut world = AnimationWorld::new(fixed_lifespan(VariantConfig::drift(), 1000.0), 5);
        let mut registry = RecordingRegistry::default();
        let short = world.spawn(&event(1), 0.0, &mut registry);
        let long = world.spawn(&event(1), 600.0, &mut registry);
        world.advance(0.1, 700.0, &mut registry);
        let before = world.group(long).unwrap().clone();

        let removed = world.advance(0.0, 1200.0, &mut registry);

        assert_eq!(removed, [short]);
        let after = world.group(long).unwrap();
        assert_eq!(after.position(), before.position());
        assert_eq!(after.velocity(), before.velocity());
        assert_eq!(after.lifespan(), before.lifespan());
        assert_eq!(after.spawn_time(), before.spawn_time());
    }

    #[test]
    fn orbiting_groups_follow_their_arc() {
        let config = fixed_lifespan(VariantConfig::orbit(), 20_000.0);
        let mut world = AnimationWorld::new(config, 6);
        let mut registry = RecordingRegistry::default();
        let anchor = world.anchor();
        let id = world.spawn(&event(1), 0.0, &mut registry);
        let depth = world.group(id).unwrap().position().z;

        world.advance(0.5, 10_000.0, &mut registry);
        let group = world.group(id).unwrap();

        let top = anchor.position + Vec3::new(0., group.orbit_distance(), 0.);
        assert!(group.position().truncate().distance(top.truncate()) < 1e-4);
        assert_eq!(group.position().z, depth);
    }

    #[test]
    fn billboards_face_the_look_target() {
        let config = fixed_lifespan(VariantConfig::orbit(), 20_000.0);
        let mut world = AnimationWorld::new(config, 7);
        let mut registry = RecordingRegistry::default();
        let anchor = world.anchor();
        let id = world.spawn(&event(3), 0.0, &mut registry);

        world.advance(0.016, 4000.0, &mut registry);
        let group = world.group(id).unwrap();

        for quad in group.children() {
            let facing = quad.facing.expect("billboard facing") * Vec3::Z;
            let towards = (anchor.look_target - group.child_position(quad)).normalize();
            assert!(facing.distance(towards) < 1e-4);
        }
    }

    #[test]
    fn free_groups_keep_the_group_rotation() {
        let mut world = AnimationWorld::new(VariantConfig::drift(), 8);
        let mut registry = RecordingRegistry::default();
        let id = world.spawn(&event(2), 0.0, &mut registry);
        world.advance(0.016, 100.0, &mut registry);
        assert!(world
            .group(id)
            .unwrap()
            .children()
            .iter()
            .all(|quad| quad.facing.is_none()));
    }
}
