//! Montage Timeline - the in-memory editing model
//!
//! Project → Sequence → Track → Clip hierarchy plus effects, transitions,
//! and speed curves, mutated exclusively through reversible commands held by
//! the [`history::History`] engine. The renderer and caches treat this model
//! as read-only; every structural write goes through a command so it can be
//! undone.

pub mod clip;
pub mod command;
pub mod history;
pub mod project;
pub mod speed;
pub mod track;

pub use clip::{Clip, ClipKind, Easing, Effect, EffectKind, TransitionKind, TransitionSpec};
pub use command::{CommandError, EditCommand, RippleScope};
pub use history::{History, HistoryEntry};
pub use project::{EditorSettings, Project, Sequence};
pub use speed::SpeedCurve;
pub use track::{Track, TrackKind};
