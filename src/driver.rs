use std::time::Instant;

use anyhow::Result;
use log::{info, warn};

use crate::world::{AnimationWorld, GroupId, SceneRegistry};

/// Host facility that calls back before the next repaint.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Issues the draw for the current state of the world.
pub trait Presenter {
    fn present(&mut self, world: &AnimationWorld) -> Result<()>;
}

/// Wall-clock delta between consecutive frames. The first frame has a delta of zero.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_frame_ms: Option<f64>,
}

impl FrameClock {
    pub fn delta_seconds(&mut self, now_ms: f64) -> f32 {
        let delta_ms = self
            .last_frame_ms
            .map_or(0.0, |last| (now_ms - last).max(0.0));
        self.last_frame_ms = Some(now_ms);
        (delta_ms / 1000.0) as f32
    }
}

/// One second's worth of frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    pub fps: f64,
    /// Time spent advancing and presenting, not waiting for the next frame.
    pub average_work_ms: f64,
    pub longest_work_ms: f64,
}

/// Rolling frame timings, logged once per second of frames.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    frames: u32,
    elapsed_ms: f64,
    work_ms: f64,
    longest_work_ms: f64,
}

impl FrameStats {
    const REPORT_INTERVAL_MS: f64 = 1000.0;

    /// `delta_ms` is the time since the previous frame, `work_ms` the time this frame took.
    pub fn record(&mut self, delta_ms: f64, work_ms: f64) -> Option<StatsSummary> {
        self.frames += 1;
        self.elapsed_ms += delta_ms;
        self.work_ms += work_ms;
        self.longest_work_ms = self.longest_work_ms.max(work_ms);
        if self.elapsed_ms < Self::REPORT_INTERVAL_MS {
            return None;
        }
        let summary = StatsSummary {
            fps: self.frames as f64 * 1000.0 / self.elapsed_ms,
            average_work_ms: self.work_ms / self.frames as f64,
            longest_work_ms: self.longest_work_ms,
        };
        *self = Self::default();
        Some(summary)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub delta_seconds: f32,
    pub removed: Vec<GroupId>,
    pub live: usize,
}

pub struct RenderDriver<S> {
    clock: FrameClock,
    scheduler: S,
    stats: Option<FrameStats>,
}

impl<S: FrameScheduler> RenderDriver<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            clock: FrameClock::default(),
            scheduler,
            stats: None,
        }
    }

    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats = enabled.then(FrameStats::default);
        self
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Kicks off the loop; every later frame is requested by the one before it.
    pub fn start(&mut self) {
        self.scheduler.request_frame();
    }

    pub fn frame<T>(&mut self, now_ms: f64, world: &mut AnimationWorld, target: &mut T) -> FrameReport
    where
        T: SceneRegistry + Presenter,
    {
        self.scheduler.request_frame();

        let delta_seconds = self.clock.delta_seconds(now_ms);
        let work_started = Instant::now();
        world.advance_wind(now_ms);
        let removed = world.advance(delta_seconds, now_ms, target);

        if let Err(e) = target.present(world) {
            warn!("Failed to present frame: {:#}", e);
        }

        if let Some(stats) = self.stats.as_mut() {
            let work_ms = work_started.elapsed().as_secs_f64() * 1000.0;
            if let Some(summary) = stats.record(delta_seconds as f64 * 1000.0, work_ms) {
                info!(
                    "{:.1} fps, {:.2} ms/frame of work (worst {:.2} ms), {} groups",
                    summary.fps,
                    summary.average_work_ms,
                    summary.longest_work_ms,
                    world.len()
                );
            }
        }

        FrameReport {
            delta_seconds,
            removed,
            live: world.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use anyhow::bail;

    use super::*;
    use crate::{
        config::VariantConfig, emote::EmoteEvent, world::testing::RecordingRegistry,
        world::EmoteGroup,
    };

    #[derive(Default, Clone)]
    struct ManualScheduler {
        requests: Rc<Cell<u32>>,
    }

    impl FrameScheduler for ManualScheduler {
        fn request_frame(&mut self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    #[derive(Default)]
    struct Target {
        registry: RecordingRegistry,
        presented: Vec<usize>,
        fail: bool,
    }

    impl SceneRegistry for Target {
        fn add_visual(&mut self, group: &EmoteGroup) {
            self.registry.add_visual(group);
        }

        fn remove_visual(&mut self, id: GroupId) {
            self.registry.remove_visual(id);
        }
    }

    impl Presenter for Target {
        fn present(&mut self, world: &AnimationWorld) -> Result<()> {
            self.presented.push(world.len());
            if self.fail {
                bail!("surface lost");
            }
            Ok(())
        }
    }

    #[test]
    fn clock_reports_wall_clock_deltas() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.delta_seconds(1000.0), 0.0);
        assert!((clock.delta_seconds(1016.0) - 0.016).abs() < 1e-6);
        assert!((clock.delta_seconds(1066.0) - 0.05).abs() < 1e-6);
        assert_eq!(clock.delta_seconds(1000.0), 0.0);
    }

    #[test]
    fn each_frame_schedules_the_next_and_draws_once() {
        let scheduler = ManualScheduler::default();
        let requests = scheduler.requests.clone();
        let mut driver = RenderDriver::new(scheduler);
        let mut world = AnimationWorld::new(VariantConfig::drift(), 1);
        let mut target = Target::default();

        driver.start();
        for frame in 0..5 {
            driver.frame(frame as f64 * 16.0, &mut world, &mut target);
        }

        assert_eq!(requests.get(), 6);
        assert_eq!(target.presented.len(), 5);
    }

    #[test]
    fn late_frames_use_the_real_delta() {
        let mut driver = RenderDriver::new(ManualScheduler::default());
        let mut world = AnimationWorld::new(VariantConfig::drift(), 2);
        let mut target = Target::default();

        driver.frame(0.0, &mut world, &mut target);
        let report = driver.frame(250.0, &mut world, &mut target);

        assert!((report.delta_seconds - 0.25).abs() < 1e-6);
    }

    #[test]
    fn presentation_failures_do_not_stop_the_loop() {
        let mut config = VariantConfig::drift();
        config.lifespan_ms = 100.0..100.0;
        let mut driver = RenderDriver::new(ManualScheduler::default());
        let mut world = AnimationWorld::new(config, 3);
        let mut target = Target {
            fail: true,
            ..Default::default()
        };

        let id = world.spawn(&EmoteEvent::default(), 0.0, &mut target);
        driver.frame(50.0, &mut world, &mut target);
        let report = driver.frame(150.0, &mut world, &mut target);

        assert_eq!(report.removed, [id]);
        assert_eq!(report.live, 0);
        assert_eq!(target.presented, [1, 0]);
    }

    #[test]
    fn frames_re_roll_the_wind_on_its_interval() {
        let mut driver = RenderDriver::new(ManualScheduler::default());
        let mut world = AnimationWorld::new(VariantConfig::drift(), 4);
        let mut target = Target::default();
        assert_eq!(world.noise().wind_offset(), glam::Vec3::ZERO);

        driver.frame(0.0, &mut world, &mut target);
        let first = world.noise().wind_offset();
        assert!(first.length() > 0.1);

        for frame in 1..625 {
            driver.frame(frame as f64 * 16.0, &mut world, &mut target);
            assert_eq!(world.noise().wind_offset(), first, "changed at frame {}", frame);
        }

        driver.frame(10_000.0, &mut world, &mut target);
        assert_ne!(world.noise().wind_offset(), first);
    }

    #[test]
    fn stats_report_once_per_second() {
        let mut stats = FrameStats::default();
        let reports: Vec<_> = (0..120)
            .filter_map(|frame| stats.record(16.0, if frame == 10 { 9.0 } else { 2.0 }))
            .collect();
        assert_eq!(reports.len(), 1);
        let summary = reports[0];
        assert!((summary.fps - 62.5).abs() < 1e-9);
        assert!((summary.average_work_ms - (2.0 * 62.0 + 9.0) / 63.0).abs() < 1e-9);
        assert_eq!(summary.longest_work_ms, 9.0);
    }

    #[test]
    fn stats_time_the_work_not_the_wait() {
        let mut stats = FrameStats::default();
        // vsync bound: long gaps between frames, little work inside them
        let summary = (0..10)
            .find_map(|_| stats.record(100.0, 1.5))
            .expect("a report after one second");
        assert!((summary.fps - 10.0).abs() < 1e-9);
        assert_eq!(summary.average_work_ms, 1.5);
        assert_eq!(summary.longest_work_ms, 1.5);
    }
}
