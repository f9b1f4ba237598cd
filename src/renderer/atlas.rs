//! Emote textures live in the layers of one 2D array texture. Layers are reference counted by the
//! groups that show them and go back to the free list once the last such group is removed.

use std::{
    collections::{HashMap, VecDeque},
    num::NonZeroU32,
    sync::Arc,
};

use log::{debug, warn};

use crate::{
    emote::{EmoteId, EmoteTexture},
    world::{EmoteGroup, GroupId, SceneRegistry},
};

pub const LAYER_SIZE: u32 = 64;
pub const LAYER_COUNT: u32 = 256;
pub const ATLAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug)]
struct Slot {
    layer: u32,
    refs: usize,
}

/// Bookkeeping side of the atlas, free of any GPU state.
#[derive(Debug)]
pub struct LayerTable {
    free: VecDeque<u32>,
    slots: HashMap<EmoteId, Slot>,
    groups: HashMap<GroupId, Vec<EmoteId>>,
    pending: Vec<(u32, Arc<EmoteTexture>)>,
}

impl LayerTable {
    pub fn new(capacity: u32) -> Self {
        Self {
            free: (0..capacity).collect(),
            slots: HashMap::new(),
            groups: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn layer_of(&self, id: &EmoteId) -> Option<u32> {
        self.slots.get(id).map(|slot| slot.layer)
    }

    pub fn free_layers(&self) -> usize {
        self.free.len()
    }

    pub fn tracked_groups(&self) -> usize {
        self.groups.len()
    }

    /// Takes a reference on `id`, allocating and queueing an upload the first time it is seen.
    fn retain(&mut self, id: &EmoteId, texture: &Arc<EmoteTexture>) -> bool {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.refs += 1;
            return true;
        }
        match self.free.pop_front() {
            Some(layer) => {
                self.slots.insert(id.clone(), Slot { layer, refs: 1 });
                self.pending.push((layer, texture.clone()));
                debug!("Emote {} assigned to layer {}", id, layer);
                true
            }
            None => {
                warn!("Emote atlas is full, {} will not be drawn", id);
                false
            }
        }
    }

    fn release(&mut self, id: &EmoteId) {
        let layer = match self.slots.get_mut(id) {
            Some(slot) if slot.refs > 1 => {
                slot.refs -= 1;
                return;
            }
            Some(slot) => slot.layer,
            None => return,
        };
        self.slots.remove(id);
        self.pending.retain(|(pending, _)| *pending != layer);
        self.free.push_back(layer);
        debug!("Emote {} released layer {}", id, layer);
    }

    pub fn take_pending(&mut self) -> Vec<(u32, Arc<EmoteTexture>)> {
        std::mem::take(&mut self.pending)
    }
}

impl SceneRegistry for LayerTable {
    fn add_visual(&mut self, group: &EmoteGroup) {
        let held = group
            .children()
            .iter()
            .filter(|quad| self.retain(&quad.image.id, &quad.image.texture))
            .map(|quad| quad.image.id.clone())
            .collect::<Vec<_>>();
        self.groups.insert(group.id(), held);
    }

    fn remove_visual(&mut self, id: GroupId) {
        if let Some(held) = self.groups.remove(&id) {
            for emote in &held {
                self.release(emote);
            }
        }
    }
}

/// Nearest-neighbour resample to a square `size`, used for textures not already layer sized.
pub fn resample(texture: &EmoteTexture, size: u32) -> Vec<u8> {
    if texture.width() == size && texture.height() == size {
        return texture.rgba().to_vec();
    }
    let mut out = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        let src_y = y * texture.height() / size;
        for x in 0..size {
            let src_x = x * texture.width() / size;
            out.extend_from_slice(&texture.pixel(src_x, src_y));
        }
    }
    out
}

pub struct TextureAtlas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    layers: LayerTable,
}

impl TextureAtlas {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Emote Atlas Texture"),
            size: wgpu::Extent3d {
                width: LAYER_SIZE,
                height: LAYER_SIZE,
                depth_or_array_layers: LAYER_COUNT,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ATLAS_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Emote Atlas View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bilinear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            layers: LayerTable::new(LAYER_COUNT),
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn layers(&self) -> &LayerTable {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerTable {
        &mut self.layers
    }

    /// Copies every newly assigned emote into its layer.
    pub fn upload_pending(&mut self, queue: &wgpu::Queue) {
        for (layer, texture) in self.layers.take_pending() {
            let pixels = resample(&texture, LAYER_SIZE);
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                &pixels,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: NonZeroU32::new(4 * LAYER_SIZE),
                    rows_per_image: NonZeroU32::new(LAYER_SIZE),
                },
                wgpu::Extent3d {
                    width: LAYER_SIZE,
                    height: LAYER_SIZE,
                    depth_or_array_layers: 1,
                },
            );
        }
    }
}
