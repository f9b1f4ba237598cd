use std::{rc::Rc, time::Instant};

use anyhow::Result;
use log::{debug, info};
use winit::window::Window;

use emote_drift::{
    entity::Anchor,
    renderer::Renderer,
    window::{RedrawScheduler, Size},
    AnimationWorld, EmoteEvent, RenderDriver, VariantConfig,
};

pub struct App {
    window: Rc<Window>,
    world: AnimationWorld,
    driver: RenderDriver<RedrawScheduler>,
    renderer: Renderer,
    started: Instant,
}

impl App {
    pub async fn new(
        window: Window,
        config: VariantConfig,
        anchor: Option<Anchor>,
        seed: u64,
        stats: bool,
    ) -> Result<Self> {
        let window = Rc::new(window);
        let renderer = Renderer::new(window.as_ref()).await?;
        let mut world = AnimationWorld::new(config, seed);
        if let Some(anchor) = anchor {
            world.set_anchor(anchor);
        }
        info!("{:#?}", world.config());
        info!("Anchored at {:?}", world.anchor());
        let driver = RenderDriver::new(RedrawScheduler::new(window.clone())).with_stats(stats);

        Ok(Self {
            window,
            world,
            driver,
            renderer,
            started: Instant::now(),
        })
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    pub fn start(&mut self) {
        self.driver.start();
    }

    pub fn on_emotes(&mut self, event: EmoteEvent) {
        let now = self.now_ms();
        self.world.spawn(&event, now, &mut self.renderer);
    }

    pub fn on_frame(&mut self) {
        let now = self.now_ms();
        let report = self.driver.frame(now, &mut self.world, &mut self.renderer);
        if !report.removed.is_empty() {
            debug!(
                "Retired {} groups, {} live",
                report.removed.len(),
                report.live
            );
        }
    }

    pub fn on_resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.renderer.resize(Size::from(size));
        self.window.request_redraw();
    }
}
