use std::{collections::HashMap, fmt, sync::Arc};

use anyhow::{ensure, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmoteId(String);

impl EmoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Straight RGBA8 pixels, row-major, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct EmoteTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl EmoteTexture {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        ensure!(width > 0 && height > 0, "Empty emote texture {}x{}", width, height);
        let expected = width as usize * height as usize * 4;
        ensure!(
            rgba.len() == expected,
            "Emote texture {}x{} needs {} bytes, got {}",
            width,
            height,
            expected,
            rgba.len()
        );
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}

impl fmt::Debug for EmoteTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmoteTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// One displayable emote: an identity plus the texture drawn for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmoteImage {
    pub id: EmoteId,
    pub texture: Arc<EmoteTexture>,
}

/// The emotes of a single chat message, in message order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmoteEvent {
    pub emotes: Vec<EmoteImage>,
}

impl EmoteEvent {
    pub fn new(emotes: Vec<EmoteImage>) -> Self {
        Self { emotes }
    }

    pub fn len(&self) -> usize {
        self.emotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emotes.is_empty()
    }
}

/// Limits applied to a message before it is spawned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FeedFilter {
    /// How many times the same emote may appear in one message.
    pub duplicate_limit: usize,
    /// How many emotes a message may contribute in total.
    pub maximum: usize,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            duplicate_limit: 1,
            maximum: 3,
        }
    }
}

impl FeedFilter {
    pub fn apply(&self, event: EmoteEvent) -> EmoteEvent {
        let mut seen: HashMap<EmoteId, usize> = HashMap::new();
        let emotes = event
            .emotes
            .into_iter()
            .filter(|emote| {
                let count = seen.entry(emote.id.clone()).or_insert(0);
                *count += 1;
                *count <= self.duplicate_limit
            })
            .take(self.maximum)
            .collect();
        EmoteEvent { emotes }
    }
}
