//! Montage Render - preview compositing and the render loop
//!
//! Architecture:
//! - `resolve`: which clips (and transitions) are active at a timeline time
//! - `effects`: CPU effect rasterization in clip order
//! - `transition`: blending an outgoing/incoming frame pair
//! - `layout`: aspect-preserving letterbox and alpha-over blits
//! - `compositor`: the deterministic per-instant composite shared with export
//! - `scheduler`: tick scheduling seam and render coalescing
//! - `surface`: presentation surface seam
//! - `preview`: the interactive state machine driving all of the above
//!
//! The timeline model is read-only here; the preview receives sequence
//! snapshots and never mutates them.

pub mod compositor;
pub mod effects;
pub mod layout;
pub mod preview;
pub mod resolve;
pub mod scheduler;
pub mod surface;
pub mod transition;

pub use compositor::{open_sequence_assets, CompositeOutput, Compositor, PipelineSet};
pub use effects::apply_effects;
pub use layout::{fit_rect, letterbox, FitRect};
pub use preview::{PreviewConfig, PreviewEvent, PreviewRenderer, PreviewState};
pub use resolve::{resolve_at, ActiveLayer, LayerContent};
pub use scheduler::{ManualScheduler, ManualTickHandle, RenderGate, TickScheduler};
pub use surface::{OffscreenSurface, PresentSurface};
pub use transition::render_transition;
