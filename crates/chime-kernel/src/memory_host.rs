//! Deterministic in-memory host.
//!
//! Nothing is rendered: each resource is a play head on a virtual clock that
//! moves only when [`AudioHost::tick`] is called. Non-looping resources stop
//! on their own once the play head reaches the clip length, like a real
//! device would. Used by the mixer tests and for dry runs.

use std::collections::HashMap;

use chime_common::{AssetId, AudioError, AudioResult};
use tracing::debug;

use crate::host::{AudioHost, HandleGenerator, ResourceHandle};

/// Play state of a virtual resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Not playing, play head rewound.
    Stopped,
    /// Play head advancing.
    Playing,
    /// Play head held.
    Paused,
}

#[derive(Debug, Clone)]
struct VirtualResource {
    asset: AssetId,
    duration: f32,
    volume: f32,
    looping: bool,
    state: ResourceState,
    position: f32,
}

/// Virtual audio host with a manual clock.
#[derive(Debug, Default)]
pub struct MemoryHost {
    assets: HashMap<AssetId, f32>,
    resources: HashMap<ResourceHandle, VirtualResource>,
    handles: HandleGenerator,
    clock: f64,
    created: usize,
    destroyed: usize,
}

impl MemoryHost {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset with its length in seconds.
    #[must_use]
    pub fn with_asset(mut self, asset: impl Into<AssetId>, duration: f32) -> Self {
        self.register(asset, duration);
        self
    }

    /// Register an asset with its length in seconds.
    pub fn register(&mut self, asset: impl Into<AssetId>, duration: f32) {
        self.assets.insert(asset.into(), duration.max(0.0));
    }

    /// Seconds elapsed on the virtual clock.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Volume last applied to a resource.
    #[must_use]
    pub fn volume(&self, resource: ResourceHandle) -> Option<f32> {
        self.resources.get(&resource).map(|r| r.volume)
    }

    /// Loop flag of a resource.
    #[must_use]
    pub fn is_looping(&self, resource: ResourceHandle) -> Option<bool> {
        self.resources.get(&resource).map(|r| r.looping)
    }

    /// Play state of a resource.
    #[must_use]
    pub fn state(&self, resource: ResourceHandle) -> Option<ResourceState> {
        self.resources.get(&resource).map(|r| r.state)
    }

    /// Whether the resource still exists.
    #[must_use]
    pub fn is_live(&self, resource: ResourceHandle) -> bool {
        self.resources.contains_key(&resource)
    }

    /// Number of resources currently alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of resources ever created.
    #[must_use]
    pub const fn created_count(&self) -> usize {
        self.created
    }

    /// Number of resources destroyed.
    #[must_use]
    pub const fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Number of live resources currently playing.
    #[must_use]
    pub fn playing_count(&self) -> usize {
        self.resources
            .values()
            .filter(|r| r.state == ResourceState::Playing)
            .count()
    }

    fn with_resource(&mut self, resource: ResourceHandle, f: impl FnOnce(&mut VirtualResource)) {
        if let Some(r) = self.resources.get_mut(&resource) {
            f(r);
        }
    }
}

impl AudioHost for MemoryHost {
    fn duration(&mut self, asset: &AssetId) -> AudioResult<f32> {
        self.assets
            .get(asset)
            .copied()
            .ok_or_else(|| AudioError::unavailable(asset, "not registered with the memory host"))
    }

    fn create_resource(&mut self, asset: &AssetId) -> AudioResult<ResourceHandle> {
        let duration = self.duration(asset)?;
        let handle = self.handles.next();
        self.resources.insert(
            handle,
            VirtualResource {
                asset: asset.clone(),
                duration,
                volume: 1.0,
                looping: false,
                state: ResourceState::Stopped,
                position: 0.0,
            },
        );
        self.created += 1;
        debug!("Created virtual resource {} for {}", handle, asset);
        Ok(handle)
    }

    fn set_volume(&mut self, resource: ResourceHandle, volume: f32) {
        self.with_resource(resource, |r| r.volume = volume.clamp(0.0, 1.0));
    }

    fn set_looping(&mut self, resource: ResourceHandle, looping: bool) {
        self.with_resource(resource, |r| r.looping = looping);
    }

    fn play(&mut self, resource: ResourceHandle) {
        self.with_resource(resource, |r| {
            r.position = 0.0;
            r.state = ResourceState::Playing;
        });
    }

    fn pause(&mut self, resource: ResourceHandle) {
        self.with_resource(resource, |r| {
            if r.state == ResourceState::Playing {
                r.state = ResourceState::Paused;
            }
        });
    }

    fn resume(&mut self, resource: ResourceHandle) {
        self.with_resource(resource, |r| {
            if r.state == ResourceState::Paused {
                r.state = ResourceState::Playing;
            }
        });
    }

    fn stop(&mut self, resource: ResourceHandle) {
        self.with_resource(resource, |r| {
            r.position = 0.0;
            r.state = ResourceState::Stopped;
        });
    }

    fn is_playing(&self, resource: ResourceHandle) -> bool {
        self.state(resource) == Some(ResourceState::Playing)
    }

    fn elapsed(&self, resource: ResourceHandle) -> f32 {
        self.resources.get(&resource).map_or(0.0, |r| r.position)
    }

    fn destroy(&mut self, resource: ResourceHandle) {
        if let Some(r) = self.resources.remove(&resource) {
            self.destroyed += 1;
            debug!("Destroyed virtual resource {} for {}", resource, r.asset);
        }
    }

    fn tick(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.clock += f64::from(dt);

        for r in self.resources.values_mut() {
            if r.state != ResourceState::Playing {
                continue;
            }
            r.position += dt;
            if r.position >= r.duration {
                if r.looping && r.duration > 0.0 {
                    r.position %= r.duration;
                } else {
                    // Natural end: a finished clip reads as stopped at its end.
                    r.position = r.duration;
                    r.state = ResourceState::Stopped;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unregistered_asset_is_unavailable() {
        let mut host = MemoryHost::new();
        let err = host
            .create_resource(&AssetId::new("missing"))
            .expect_err("asset should be unavailable");
        assert!(matches!(err, AudioError::AssetUnavailable { .. }));
        assert_eq!(host.created_count(), 0);
    }

    #[test]
    fn test_natural_end_stops_non_looping() {
        let mut host = MemoryHost::new().with_asset("blip", 1.0);
        let res = host.create_resource(&AssetId::new("blip")).expect("registered asset");
        host.play(res);
        host.tick(0.5);
        assert!(host.is_playing(res));
        assert_relative_eq!(host.elapsed(res), 0.5);

        host.tick(0.6);
        assert!(!host.is_playing(res));
        assert_eq!(host.state(res), Some(ResourceState::Stopped));
    }

    #[test]
    fn test_looping_wraps() {
        let mut host = MemoryHost::new().with_asset("loop", 1.0);
        let res = host.create_resource(&AssetId::new("loop")).expect("registered asset");
        host.set_looping(res, true);
        host.play(res);
        host.tick(2.5);
        assert!(host.is_playing(res));
        assert_relative_eq!(host.elapsed(res), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_pause_holds_position() {
        let mut host = MemoryHost::new().with_asset("voice", 4.0);
        let res = host.create_resource(&AssetId::new("voice")).expect("registered asset");
        host.play(res);
        host.tick(1.0);
        host.pause(res);
        host.tick(5.0);
        assert_eq!(host.state(res), Some(ResourceState::Paused));
        assert_relative_eq!(host.elapsed(res), 1.0);

        host.resume(res);
        host.tick(1.0);
        assert_relative_eq!(host.elapsed(res), 2.0);
    }

    #[test]
    fn test_destroy_counts() {
        let mut host = MemoryHost::new().with_asset("a", 1.0);
        let res = host.create_resource(&AssetId::new("a")).expect("registered asset");
        host.set_volume(res, 3.0);
        assert_eq!(host.volume(res), Some(1.0));

        host.destroy(res);
        host.destroy(res);
        assert_eq!(host.destroyed_count(), 1);
        assert!(!host.is_live(res));
        assert_eq!(host.live_count(), 0);
    }
}
