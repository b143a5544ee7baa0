//! Render-tick scheduling and coalescing.
//!
//! The preview loop never drives its own timer: after finishing a tick it
//! asks a [`TickScheduler`] for the next one, and the host (a UI frame
//! callback, or a test harness) calls back into [`crate::PreviewRenderer::tick`].
//! [`RenderGate`] keeps ticks from overlapping: a render requested while one
//! is in flight is coalesced into a single pending flag instead of a queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How the render loop asks its host for the next frame callback.
pub trait TickScheduler: Send {
    /// Request one tick. Multiple requests before the tick fires collapse
    /// into one.
    fn request_tick(&mut self);

    /// Cancel a pending tick request, if any.
    fn cancel_tick(&mut self);
}

/// A scheduler the host polls: `take()` returns true at most once per
/// request. The default for tests and headless embedding.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Arc<AtomicBool>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle the host polls from its own loop.
    pub fn handle(&self) -> ManualTickHandle {
        ManualTickHandle {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl TickScheduler for ManualScheduler {
    fn request_tick(&mut self) {
        self.pending.store(true, Ordering::Release);
    }

    fn cancel_tick(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

/// Poll side of a [`ManualScheduler`].
#[derive(Clone)]
pub struct ManualTickHandle {
    pending: Arc<AtomicBool>,
}

impl ManualTickHandle {
    /// Consume a pending tick request. Returns false when none is pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// In-flight guard: a render that starts while another runs is suppressed,
/// and at most one follow-up is remembered.
#[derive(Debug, Default)]
pub struct RenderGate {
    in_flight: bool,
    pending: bool,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to begin a render. Returns false (and records a pending request)
    /// when one is already in flight.
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight {
            self.pending = true;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Finish the in-flight render. Returns true when a request arrived
    /// while rendering, meaning the caller should render once more.
    pub fn finish(&mut self) -> bool {
        self.in_flight = false;
        std::mem::take(&mut self.pending)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}
