pub mod atlas;
pub mod emote;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    driver::Presenter,
    entity::{Camera, Fog},
    renderer::{
        atlas::TextureAtlas,
        emote::{collect_instances, EmoteRenderer, EmoteRendererBuilder},
    },
    window::{Size, Window},
    world::{AnimationWorld, EmoteGroup, GroupId, SceneRegistry},
};

pub const DEPTH_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Texture extent for a window of `size`; minimised windows still get a 1x1 target.
fn target_extent(size: Size) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    }
}

fn create_depth_view(device: &wgpu::Device, size: Size) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: target_extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

pub struct Renderer {
    surface: wgpu::Surface,
    surface_format: wgpu::TextureFormat,
    size: Size,
    device: wgpu::Device,
    queue: wgpu::Queue,
    depth_view: wgpu::TextureView,
    atlas: TextureAtlas,
    emote_renderer: EmoteRenderer,
    camera: Camera,
    fog: Fog,
}

impl Renderer {
    pub async fn new(window: &impl Window) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No adapter found")?;
        info!("Using adapter {:?}", adapter.get_info());

        let surface_format = surface
            .get_preferred_format(&adapter)
            .context("No preferred format found")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .context("No device found")?;

        let size = window.size();
        Self::configure_surface(&surface, &device, surface_format, size);

        let depth_view = create_depth_view(&device, size);
        let atlas = TextureAtlas::new(&device);
        let emote_renderer = EmoteRendererBuilder::new(&atlas)
            .color_target_format(surface_format)
            .depth_format(DEPTH_TEXTURE_FORMAT)
            .build(&device)?;

        Ok(Self {
            surface,
            surface_format,
            size,
            device,
            queue,
            depth_view,
            atlas,
            emote_renderer,
            camera: Camera {
                aspect_ratio: size.aspect_ratio(),
                ..Default::default()
            },
            fog: Fog::default(),
        })
    }

    fn configure_surface(
        surface: &wgpu::Surface,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: Size,
    ) {
        if size.is_empty() {
            return;
        }
        surface.configure(
            device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: size.width,
                height: size.height,
                present_mode: wgpu::PresentMode::Fifo,
            },
        )
    }

    pub fn resize(&mut self, size: Size) {
        debug!("Resizing surface to {}x{}", size.width, size.height);
        self.size = size;
        Self::configure_surface(&self.surface, &self.device, self.surface_format, size);
        self.depth_view = create_depth_view(&self.device, size);
        self.camera.aspect_ratio = size.aspect_ratio();
    }

    fn clear_color(&self) -> wgpu::Color {
        let c = self.fog.color.as_dvec3();
        wgpu::Color {
            r: c.x,
            g: c.y,
            b: c.z,
            a: 1.0,
        }
    }
}

impl SceneRegistry for Renderer {
    fn add_visual(&mut self, group: &EmoteGroup) {
        self.atlas.layers_mut().add_visual(group);
    }

    fn remove_visual(&mut self, id: GroupId) {
        self.atlas.layers_mut().remove_visual(id);
    }
}

impl Presenter for Renderer {
    fn present(&mut self, world: &AnimationWorld) -> Result<()> {
        if self.size.is_empty() {
            return Ok(());
        }

        self.atlas.upload_pending(&self.queue);
        let instances = collect_instances(world, self.atlas.layers());
        self.emote_renderer.update(
            &self.device,
            &self.queue,
            &self.camera,
            &self.fog,
            &instances,
        );

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface is stale, reconfiguring");
                Self::configure_surface(&self.surface, &self.device, self.surface_format, self.size);
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to get next surface texture"),
        };
        let surface_texture_view = surface_texture.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Emote Command Encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Emote Render Pass"),
                color_attachments: &[wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color()),
                        store: true,
                    },
                }],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: false,
                    }),
                    stencil_ops: None,
                }),
            });
            self.emote_renderer.draw(&mut rpass);
        }

        self.queue.submit(Some(encoder.finish()));
        surface_texture.present();

        Ok(())
    }
}
