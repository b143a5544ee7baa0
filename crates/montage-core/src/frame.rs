//! Frame buffers and shared frame handles.
//!
//! Decoded frames are RGBA8 in CPU memory. Ownership is explicit: the frame
//! cache owns its entries and releases them on eviction, while callers get
//! cloned handles backed by the same shared pixel buffer. Releasing a handle
//! is idempotent, so eviction and caller disposal can both run during
//! teardown without a double free.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An RGBA8 video frame in CPU memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Interleaved RGBA pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a black, fully opaque frame.
    pub fn black(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; (width * height * 4) as usize];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Create a frame filled with a solid color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = vec![0u8; (width * height * 4) as usize];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA bytes. Returns `None` when the byte count does not
    /// match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width * height * 4) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Memory used by this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

/// Arc-wrapped frame buffer for shared ownership.
pub type SharedFrameBuffer = Arc<FrameBuffer>;

/// A handle to a decoded frame at a known presentation time.
///
/// Cloning a handle bumps the shared refcount; `release` drops this handle's
/// reference and is safe to call more than once. The pixel memory itself is
/// freed when the last un-released handle goes away.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    /// Presentation time in source seconds.
    pub pts_sec: f64,
    buffer: Option<SharedFrameBuffer>,
}

impl FrameHandle {
    /// Create a handle owning a fresh buffer.
    pub fn new(pts_sec: f64, buffer: FrameBuffer) -> Self {
        Self {
            pts_sec,
            buffer: Some(Arc::new(buffer)),
        }
    }

    /// Create a handle sharing an existing buffer.
    pub fn from_shared(pts_sec: f64, buffer: SharedFrameBuffer) -> Self {
        Self {
            pts_sec,
            buffer: Some(buffer),
        }
    }

    /// Access the pixel buffer, unless this handle was released.
    pub fn buffer(&self) -> Option<&SharedFrameBuffer> {
        self.buffer.as_ref()
    }

    /// Clone the underlying shared buffer into a new handle.
    pub fn clone_handle(&self) -> Option<FrameHandle> {
        self.buffer.as_ref().map(|b| FrameHandle {
            pts_sec: self.pts_sec,
            buffer: Some(Arc::clone(b)),
        })
    }

    /// Drop this handle's reference to the pixel memory. Idempotent.
    pub fn release(&mut self) {
        self.buffer.take();
    }

    /// Whether this handle has been released.
    pub fn is_released(&self) -> bool {
        self.buffer.is_none()
    }

    /// Number of live references to the underlying buffer, 0 if released.
    pub fn ref_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, Arc::strong_count)
    }
}
