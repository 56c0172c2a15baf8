//! Host audio primitive boundary.
//!
//! The mixer never renders samples itself. Everything that touches an output
//! device goes through [`AudioHost`], which hands out opaque
//! [`ResourceHandle`]s for playable instances of an asset:
//!
//! ```text
//! ┌──────────────┐  create_resource  ┌──────────────┐
//! │ PlaybackHandle│ ───────────────▶ │  AudioHost   │
//! │   (mixer)     │ ◀─────────────── │ (rodio/mem)  │
//! └──────────────┘  ResourceHandle   └──────────────┘
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chime_common::{AssetId, AudioResult};

/// Opaque handle to one host playback resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// Create a handle from a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// Resource handle generator for unique IDs.
#[derive(Debug)]
pub struct HandleGenerator {
    next_id: AtomicU64,
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleGenerator {
    /// Create a new handle generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }

    /// Generate a new unique handle.
    pub fn next(&self) -> ResourceHandle {
        ResourceHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// The host audio primitive: creates, drives and destroys playback resources.
///
/// Control methods are infallible; calls on an unknown handle are ignored.
/// Times are in seconds.
pub trait AudioHost {
    /// Length of the asset in seconds.
    fn duration(&mut self, asset: &AssetId) -> AudioResult<f32>;

    /// Materialize a new, stopped playback resource for the asset.
    fn create_resource(&mut self, asset: &AssetId) -> AudioResult<ResourceHandle>;

    /// Set the output volume (0.0-1.0).
    fn set_volume(&mut self, resource: ResourceHandle, volume: f32);

    /// Set whether playback repeats at the end of the clip.
    fn set_looping(&mut self, resource: ResourceHandle, looping: bool);

    /// Start playback from the beginning of the clip.
    fn play(&mut self, resource: ResourceHandle);

    /// Pause playback, keeping the position.
    fn pause(&mut self, resource: ResourceHandle);

    /// Continue a paused resource from where it stopped.
    fn resume(&mut self, resource: ResourceHandle);

    /// Stop playback and rewind.
    fn stop(&mut self, resource: ResourceHandle);

    /// Whether the resource is currently producing sound.
    fn is_playing(&self, resource: ResourceHandle) -> bool;

    /// Seconds played since the last `play`, excluding paused time.
    fn elapsed(&self, resource: ResourceHandle) -> f32;

    /// Release the resource. The handle must not be used afterwards.
    fn destroy(&mut self, resource: ResourceHandle);

    /// Advance host-side time. Called once per mixer tick.
    fn tick(&mut self, _dt: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_generator() {
        let gen = HandleGenerator::new();
        let h1 = gen.next();
        let h2 = gen.next();
        assert_ne!(h1, h2);
        assert_eq!(h2.raw(), h1.raw() + 1);
    }

    #[test]
    fn test_resource_handle_display() {
        assert_eq!(ResourceHandle::new(7).to_string(), "res#7");
    }
}
