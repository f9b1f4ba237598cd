use std::rc::Rc;

use crate::driver::FrameScheduler;

pub trait HasSize {
    fn size(&self) -> Size;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Size {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

impl HasSize for winit::window::Window {
    fn size(&self) -> Size {
        self.inner_size().into()
    }
}

pub trait Window: HasSize + raw_window_handle::HasRawWindowHandle {}

impl Window for winit::window::Window {}

/// Schedules frames by asking winit for a redraw, the native equivalent of a repaint callback.
pub struct RedrawScheduler {
    window: Rc<winit::window::Window>,
}

impl RedrawScheduler {
    pub fn new(window: Rc<winit::window::Window>) -> Self {
        Self { window }
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sizes_keep_a_sane_aspect() {
        assert_eq!(Size::default().aspect_ratio(), 1.0);
        let size = Size {
            width: 1280,
            height: 720,
        };
        assert!((size.aspect_ratio() - 16. / 9.).abs() < 1e-6);
        assert!(!size.is_empty());
    }
}
