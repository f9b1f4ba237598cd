//! Chat emotes rendered as clusters of textured quads that drift, tumble and fade around a
//! backdrop anchor.
//!
//! [`AnimationWorld`] holds every live group. [`AnimationWorld::spawn`] turns an [`EmoteEvent`]
//! into a group, [`AnimationWorld::advance`] moves and retires them, and [`RenderDriver`] runs one
//! advance and one draw per display frame.

pub mod animator;
pub mod config;
pub mod driver;
pub mod emote;
pub mod entity;
pub mod feed;
pub mod noise;
pub mod renderer;
pub mod spawner;
pub mod window;
pub mod world;

pub use config::{Variant, VariantConfig};
pub use driver::{FrameScheduler, Presenter, RenderDriver};
pub use emote::{EmoteEvent, EmoteId, EmoteImage, EmoteTexture, FeedFilter};
pub use world::{AnimationWorld, EmoteGroup, GroupId, SceneRegistry};
