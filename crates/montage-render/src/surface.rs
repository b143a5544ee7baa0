//! Presentation surface seam.
//!
//! The preview draws through this trait so the same loop runs against a
//! window-backed surface in the app or an offscreen buffer in tests and
//! thumbnails. Reconfiguring may be arbitrarily slow (a real swapchain
//! rebuild); the preview pauses its loop around it.

use montage_core::{FrameBuffer, Result};

/// Where composited frames are drawn.
pub trait PresentSurface: Send {
    /// (Re)configure the drawable area. Called on attach and resize.
    fn configure(&mut self, width: u32, height: u32) -> Result<()>;

    /// Present one finished frame. The frame is fully composited; partial
    /// draws never reach the surface.
    fn present(&mut self, frame: &FrameBuffer) -> Result<()>;

    fn size(&self) -> (u32, u32);
}

/// CPU-memory surface holding the last presented frame.
#[derive(Debug, Default)]
pub struct OffscreenSurface {
    width: u32,
    height: u32,
    last_frame: Option<FrameBuffer>,
    present_count: usize,
}

impl OffscreenSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&FrameBuffer> {
        self.last_frame.as_ref()
    }

    pub fn present_count(&self) -> usize {
        self.present_count
    }
}

impl PresentSurface for OffscreenSurface {
    fn configure(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.last_frame = Some(frame.clone());
        self.present_count += 1;
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
