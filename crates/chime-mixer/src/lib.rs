//! # Chime Mixer
//!
//! Playback orchestration above an [`AudioHost`](chime_kernel::AudioHost).
//!
//! This crate provides:
//! - One reusable [`PlaybackHandle`] per (category, asset), cached in a
//!   [`CategoryCache`] for each of Effect, Fx and Music
//! - A three-tier [`VolumeHierarchy`] (master × category × instance)
//! - Tick-driven fades with generation-based cancellation
//! - A single current music track with crossfade handoff
//! - Deferred release of finished, non-pinned resources
//!
//! ## Time
//!
//! Nothing runs on its own. [`AudioSystem::update`] advances the clock, lets
//! the host advance, then runs due fades and releases. A driver calls it at
//! a fixed interval (50 ms is plenty for fades).
//!
//! ## Cancellation
//!
//! Every handle carries two generation counters. Starting a transition bumps
//! the transition generation; stop, pause and play bump the lifetime
//! generation. Queued fades and releases remember the generation they were
//! created under and are discarded once it no longer matches.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod fade;
pub mod handle;
pub mod music;
pub mod reaper;
mod surface;
pub mod system;
pub mod volume;


/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::CategoryCache;
    pub use crate::fade::FadeCompletion;
    pub use crate::handle::{HandleOptions, PlayOptions, PlaybackHandle, PlaybackState};
    pub use crate::system::{AudioSystem, SharedAudioSystem};
    pub use crate::volume::{VolumeHierarchy, VolumeLevels};
}

pub use prelude::*;
