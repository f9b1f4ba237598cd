use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::Vec3;
use log::info;
use pollster::FutureExt as _;
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use emote_drift::{
    entity::Anchor,
    feed::{demo_catalog, DemoFeed},
    EmoteEvent, FeedFilter, Variant, VariantConfig,
};

mod app;

use app::App;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat emotes drifting through a 3D scene", long_about = None)]
struct Cli {
    /// Which animation to run.
    #[arg(short, long, value_enum, default_value_t = Variant::Drift)]
    variant: Variant,
    /// Seed for spawn randomness and noise. Taken from the clock when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Live groups kept before the oldest is evicted.
    #[arg(long)]
    max_groups: Option<usize>,
    /// Backdrop anchor as `x,y,z`; groups spawn and orbit around it.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    anchor: Option<Vec<f32>>,
    /// Never evict groups early.
    #[arg(long, conflicts_with = "max_groups")]
    unbounded: bool,
    /// Log frame timings once per second.
    #[arg(long)]
    stats: bool,
    /// Delay between demo chat messages.
    #[arg(long, default_value_t = 400)]
    demo_interval_ms: u64,
    /// Emotes a single message may contribute.
    #[arg(long, default_value_t = 3)]
    max_emotes: usize,
    /// Repeats of one emote allowed within a message.
    #[arg(long, default_value_t = 1)]
    duplicate_limit: usize,
}

impl Cli {
    fn variant_config(&self) -> VariantConfig {
        let mut config = VariantConfig::preset(self.variant);
        if self.unbounded {
            config.max_groups = None;
        } else if let Some(max) = self.max_groups {
            config.max_groups = Some(max);
        }
        config
    }

    fn anchor(&self) -> Result<Option<Anchor>> {
        match self.anchor.as_deref() {
            None => Ok(None),
            Some(&[x, y, z]) => Ok(Some(Anchor::at(Vec3::new(x, y, z)))),
            Some(values) => bail!("--anchor takes x,y,z, got {} values", values.len()),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let seed = match cli.seed {
        Some(seed) => seed,
        None => SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .context("System clock is before the epoch")?
            .as_millis() as _,
    };
    info!("Seeded RNG with {}", seed);
    info!("Running the {:?} variant", cli.variant);

    let event_loop = EventLoop::<EmoteEvent>::with_user_event();

    let window = WindowBuilder::new()
        .with_title("emote-drift")
        .with_inner_size(LogicalSize::<u32> {
            width: 1280,
            height: 720,
        })
        .build(&event_loop)
        .context("Failed to build window")?;

    let mut app = App::new(
        window,
        cli.variant_config(),
        cli.anchor()?,
        seed,
        cli.stats,
    )
    .block_on()?;

    let filter = FeedFilter {
        duplicate_limit: cli.duplicate_limit,
        maximum: cli.max_emotes,
    };
    let proxy = event_loop.create_proxy();
    DemoFeed::new(demo_catalog()?, filter, seed.wrapping_add(1)).spawn(
        Duration::from_millis(cli.demo_interval_ms),
        move |event| proxy.send_event(event).is_ok(),
    );

    app.start();

    event_loop.run(move |e, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match e {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::Resized(size) => app.on_resize(size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    app.on_resize(*new_inner_size)
                }
                _ => (),
            },
            Event::UserEvent(event) => app.on_emotes(event),
            Event::RedrawRequested(..) => app.on_frame(),
            _ => (),
        }
    });
}
