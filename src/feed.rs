//! Synthetic stand-in for a chat connection: a small catalog of procedurally drawn emotes and a
//! thread that posts random messages built from it.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use glam::{vec2, Vec2};
use log::{debug, info};
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::emote::{EmoteEvent, EmoteId, EmoteImage, EmoteTexture, FeedFilter};

pub const EMOTE_SIZE: u32 = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Shape {
    Disc,
    Ring,
    Diamond,
    Cross,
    Heart,
}

impl Shape {
    const ALL: [Shape; 5] = [
        Shape::Disc,
        Shape::Ring,
        Shape::Diamond,
        Shape::Cross,
        Shape::Heart,
    ];

    fn name(self) -> &'static str {
        match self {
            Shape::Disc => "disc",
            Shape::Ring => "ring",
            Shape::Diamond => "diamond",
            Shape::Cross => "cross",
            Shape::Heart => "heart",
        }
    }

    /// `p` is in [-1, 1] with +y up.
    fn contains(self, p: Vec2) -> bool {
        match self {
            Shape::Disc => p.length() <= 0.8,
            Shape::Ring => (0.5..=0.85).contains(&p.length()),
            Shape::Diamond => p.x.abs() + p.y.abs() <= 0.85,
            Shape::Cross => {
                let (x, y) = (p.x.abs(), p.y.abs());
                (x <= 0.25 && y <= 0.8) || (y <= 0.25 && x <= 0.8)
            }
            Shape::Heart => {
                let q = vec2(p.x, p.y + 0.2) * 1.25;
                let a = q.x * q.x + q.y * q.y - 1.;
                a * a * a - q.x * q.x * q.y * q.y * q.y <= 0.
            }
        }
    }
}

const PALETTE: [(&str, [u8; 3]); 4] = [
    ("gold", [0xf5, 0xc2, 0x42]),
    ("teal", [0x2e, 0xc4, 0xb6]),
    ("rose", [0xe7, 0x1d, 0x59]),
    ("violet", [0x8e, 0x5c, 0xf7]),
];

fn draw(shape: Shape, color: [u8; 3]) -> Result<EmoteTexture> {
    let size = EMOTE_SIZE;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let p = vec2(
                (x as f32 + 0.5) / size as f32 * 2. - 1.,
                1. - (y as f32 + 0.5) / size as f32 * 2.,
            );
            if shape.contains(p) {
                // darker towards the rim
                let shade = 1. - 0.35 * p.length().min(1.);
                rgba.extend(color.iter().map(|c| (*c as f32 * shade) as u8));
                rgba.push(0xff);
            } else {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    EmoteTexture::from_rgba(size, size, rgba)
}

/// Every shape in every palette colour.
pub fn demo_catalog() -> Result<Vec<EmoteImage>> {
    let mut catalog = Vec::with_capacity(Shape::ALL.len() * PALETTE.len());
    for shape in Shape::ALL {
        for (name, color) in PALETTE {
            let texture = draw(shape, color)
                .with_context(|| format!("Failed to draw {} {}", name, shape.name()))?;
            catalog.push(EmoteImage {
                id: EmoteId::new(format!("{}-{}", name, shape.name())),
                texture: Arc::new(texture),
            });
        }
    }
    Ok(catalog)
}

pub struct DemoFeed {
    catalog: Vec<EmoteImage>,
    filter: FeedFilter,
    rng: Pcg64Mcg,
}

impl DemoFeed {
    pub fn new(catalog: Vec<EmoteImage>, filter: FeedFilter, seed: u64) -> Self {
        Self {
            catalog,
            filter,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// A random message of up to one more emote than the filter allows, filtered.
    pub fn next_event(&mut self) -> EmoteEvent {
        if self.catalog.is_empty() {
            return EmoteEvent::default();
        }
        let count = self.rng.gen_range(1..=self.filter.maximum.max(1) + 1);
        let emotes = (0..count)
            .filter_map(|_| self.catalog.choose(&mut self.rng).cloned())
            .collect();
        self.filter.apply(EmoteEvent::new(emotes))
    }

    /// Posts a message every `interval` until `sink` reports the receiver is gone.
    pub fn spawn<F>(mut self, interval: Duration, mut sink: F) -> JoinHandle<()>
    where
        F: FnMut(EmoteEvent) -> bool + Send + 'static,
    {
        info!(
            "Demo feed posting every {}ms from {} emotes",
            interval.as_millis(),
            self.catalog.len()
        );
        thread::spawn(move || loop {
            thread::sleep(interval);
            let event = self.next_event();
            debug!("Demo feed message with {} emotes", event.len());
            if !sink(event) {
                debug!("Demo feed receiver closed");
                break;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn catalog_is_layer_sized_with_transparent_corners() {
        let catalog = demo_catalog().unwrap();
        assert_eq!(catalog.len(), 20);
        for image in &catalog {
            let texture = &image.texture;
            assert_eq!((texture.width(), texture.height()), (EMOTE_SIZE, EMOTE_SIZE));
            assert_eq!(texture.pixel(0, 0)[3], 0);
            assert_eq!(texture.pixel(EMOTE_SIZE - 1, EMOTE_SIZE - 1)[3], 0);
        }
    }

    #[test]
    fn filled_shapes_are_opaque_in_the_middle() {
        for shape in [Shape::Disc, Shape::Diamond, Shape::Cross, Shape::Heart] {
            let texture = draw(shape, [255, 255, 255]).unwrap();
            let centre = EMOTE_SIZE / 2;
            assert_eq!(texture.pixel(centre, centre)[3], 0xff, "{:?}", shape);
        }
        let ring = draw(Shape::Ring, [255, 255, 255]).unwrap();
        assert_eq!(ring.pixel(EMOTE_SIZE / 2, EMOTE_SIZE / 2)[3], 0);
    }

    #[test]
    fn messages_respect_the_filter() {
        let filter = FeedFilter::default();
        let mut feed = DemoFeed::new(demo_catalog().unwrap(), filter, 7);
        for _ in 0..200 {
            let event = feed.next_event();
            assert!((1..=filter.maximum).contains(&event.len()));
            let mut ids: Vec<_> = event.emotes.iter().map(|e| e.id.clone()).collect();
            ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            ids.dedup();
            assert_eq!(ids.len(), event.len());
        }
    }

    #[test]
    fn empty_catalogs_produce_empty_messages() {
        let mut feed = DemoFeed::new(Vec::new(), FeedFilter::default(), 1);
        assert!(feed.next_event().is_empty());
    }

    #[test]
    fn thread_stops_when_the_sink_closes() {
        let (sender, receiver) = mpsc::channel();
        let feed = DemoFeed::new(demo_catalog().unwrap(), FeedFilter::default(), 3);
        let handle = feed.spawn(Duration::from_millis(1), move |event| {
            sender.send(event).is_ok()
        });

        let first = receiver.recv().unwrap();
        assert!(!first.is_empty());
        drop(receiver);
        handle.join().unwrap();
    }
}
