//! Integration test crate for the Montage engine.
//!
//! This crate exists solely to hold cross-crate integration tests: the
//! end-to-end scenarios that span the timeline model, the decode and cache
//! layer, the compositor, the audio mixer, and the export pipeline.

#[cfg(test)]
mod support;

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod audio;

#[cfg(test)]
mod render;

#[cfg(test)]
mod export;
