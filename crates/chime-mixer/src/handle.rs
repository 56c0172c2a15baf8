//! Playback handles.
//!
//! A [`PlaybackHandle`] is the cache-resident state for one asset in one
//! category. It owns at most one host resource, created lazily on the first
//! play and released on stop (unless pinned), by a clear, or by the reaper.
//! Its metadata survives the release, so the handle can be played again.

use chime_common::{AssetId, AudioResult, Category, HandleRef};
use chime_kernel::{AudioHost, ResourceHandle};
use tracing::debug;

use crate::volume::{clamp_unit, VolumeHierarchy};

/// Last transition requested on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Never played, or its resource was released by a clear.
    #[default]
    Idle,
    /// Playing (possibly fading).
    Playing,
    /// Paused, position held.
    Paused,
    /// Stopped explicitly or ended naturally.
    Stopped,
}

/// Settings a handle is created with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleOptions {
    /// Instance volume (0.0 - 1.0).
    pub volume: f32,
    /// Repeat at the end of the clip.
    pub looping: bool,
    /// Keep the host resource after stop.
    pub pinned: bool,
}

impl HandleOptions {
    /// Defaults for a category: full volume, not looping, pinned per category.
    #[must_use]
    pub const fn for_category(category: Category) -> Self {
        Self {
            volume: 1.0,
            looping: false,
            pinned: category.default_pinned(),
        }
    }

    /// Set the instance volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the loop flag.
    #[must_use]
    pub const fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Set the pin flag.
    #[must_use]
    pub const fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

/// Settings for a single play request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Instance volume (0.0 - 1.0).
    pub volume: f32,
    /// Repeat at the end of the clip.
    pub looping: bool,
    /// Fade-in time in seconds.
    pub fade_in: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            looping: false,
            fade_in: 0.0,
        }
    }
}

impl PlayOptions {
    /// Full volume, no loop, no fade.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the loop flag.
    #[must_use]
    pub const fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Set the fade-in time.
    #[must_use]
    pub const fn with_fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = seconds;
        self
    }

    pub(crate) fn handle_options(&self, category: Category) -> HandleOptions {
        HandleOptions::for_category(category)
            .with_volume(self.volume)
            .with_loop(self.looping)
    }
}

/// Where a handle lives: a category cache or the one-shot slab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum HandleKey {
    Cached(HandleRef),
    OneShot(u64),
}

impl std::fmt::Display for HandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached(handle) => write!(f, "{handle}"),
            Self::OneShot(id) => write!(f, "one-shot#{id}"),
        }
    }
}

/// Playback state for one asset within one category.
///
/// Sole owner of its host resource, so it cannot be cloned:
///
/// ```compile_fail
/// fn duplicate<T: Clone>() {}
/// duplicate::<chime_mixer::PlaybackHandle>();
/// ```
#[derive(Debug)]
pub struct PlaybackHandle {
    category: Category,
    asset: AssetId,
    instance_volume: f32,
    looping: bool,
    pinned: bool,
    duration: f32,
    resource: Option<ResourceHandle>,
    lifetime_generation: u64,
    transition_generation: u64,
    fade_gain: f32,
    state: PlaybackState,
}

impl PlaybackHandle {
    /// Create an idle handle. No host resource is created.
    #[must_use]
    pub fn new(category: Category, asset: AssetId, duration: f32, options: HandleOptions) -> Self {
        Self {
            category,
            asset,
            instance_volume: clamp_unit(options.volume),
            looping: options.looping,
            pinned: options.pinned,
            duration: if duration.is_finite() {
                duration.max(0.0)
            } else {
                0.0
            },
            resource: None,
            lifetime_generation: 0,
            transition_generation: 0,
            fade_gain: 1.0,
            state: PlaybackState::Idle,
        }
    }

    /// Owning category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Asset key.
    #[must_use]
    pub const fn asset(&self) -> &AssetId {
        &self.asset
    }

    /// Instance volume (0.0 - 1.0).
    #[must_use]
    pub const fn instance_volume(&self) -> f32 {
        self.instance_volume
    }

    /// Whether playback repeats.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the host resource survives a stop.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Clip length in seconds.
    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    /// Host resource, if one is alive.
    #[must_use]
    pub const fn resource(&self) -> Option<ResourceHandle> {
        self.resource
    }

    /// Whether a host resource is alive.
    #[must_use]
    pub const fn has_resource(&self) -> bool {
        self.resource.is_some()
    }

    /// Last requested transition.
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current fade multiplier (0.0 - 1.0).
    #[must_use]
    pub const fn fade_gain(&self) -> f32 {
        self.fade_gain
    }

    /// Generation guarding the reaper.
    #[must_use]
    pub const fn lifetime_generation(&self) -> u64 {
        self.lifetime_generation
    }

    /// Generation guarding fades.
    #[must_use]
    pub const fn transition_generation(&self) -> u64 {
        self.transition_generation
    }

    /// Volume sent to the host: effective volume times the fade gain.
    #[must_use]
    pub fn output_volume(&self, tiers: &VolumeHierarchy) -> f32 {
        tiers.effective(self.category, self.instance_volume) * self.fade_gain
    }

    /// Whether the host reports the resource as playing.
    pub fn is_playing<H: AudioHost>(&self, host: &H) -> bool {
        self.resource.is_some_and(|r| host.is_playing(r))
    }

    /// Seconds played, or 0 without a resource.
    pub fn elapsed<H: AudioHost>(&self, host: &H) -> f32 {
        self.resource.map_or(0.0, |r| host.elapsed(r))
    }

    pub(crate) fn bump_lifetime(&mut self) -> u64 {
        self.lifetime_generation += 1;
        self.lifetime_generation
    }

    pub(crate) fn bump_transition(&mut self) -> u64 {
        self.transition_generation += 1;
        self.transition_generation
    }

    pub(crate) fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    pub(crate) fn set_fade_gain(&mut self, gain: f32) {
        self.fade_gain = clamp_unit(gain);
    }

    pub(crate) fn set_instance_volume(&mut self, volume: f32) {
        self.instance_volume = clamp_unit(volume);
    }

    pub(crate) fn set_looping_flag(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Reaper applies to this handle.
    pub(crate) const fn is_reapable(&self) -> bool {
        !self.pinned && !self.looping
    }

    /// Create the host resource if absent.
    pub(crate) fn ensure_resource<H: AudioHost>(
        &mut self,
        host: &mut H,
        tiers: &VolumeHierarchy,
    ) -> AudioResult<ResourceHandle> {
        if let Some(resource) = self.resource {
            return Ok(resource);
        }

        let resource = host.create_resource(&self.asset)?;
        host.set_looping(resource, self.looping);
        host.set_volume(resource, self.output_volume(tiers));
        self.resource = Some(resource);
        debug!("{}:{} acquired {}", self.category, self.asset, resource);
        Ok(resource)
    }

    /// Push the current output volume to the host.
    pub(crate) fn apply_volume<H: AudioHost>(&self, host: &mut H, tiers: &VolumeHierarchy) {
        if let Some(resource) = self.resource {
            host.set_volume(resource, self.output_volume(tiers));
        }
    }

    /// Destroy the host resource, keeping the metadata.
    pub(crate) fn release<H: AudioHost>(&mut self, host: &mut H) -> bool {
        let Some(resource) = self.resource.take() else {
            return false;
        };
        host.destroy(resource);
        debug!("{}:{} released {}", self.category, self.asset, resource);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chime_kernel::MemoryHost;

    fn handle(options: HandleOptions) -> PlaybackHandle {
        PlaybackHandle::new(Category::Effect, AssetId::new("hit"), 2.0, options)
    }

    #[test]
    fn test_new_handle_is_idle() {
        let h = handle(HandleOptions::for_category(Category::Effect).with_volume(3.0));
        assert_eq!(h.state(), PlaybackState::Idle);
        assert!(!h.has_resource());
        assert_relative_eq!(h.instance_volume(), 1.0);
        assert!(h.is_reapable());
    }

    #[test]
    fn test_category_defaults() {
        assert!(HandleOptions::for_category(Category::Fx).pinned);
        assert!(!HandleOptions::for_category(Category::Music).pinned);
        let opts = PlayOptions::new().with_loop(true).handle_options(Category::Fx);
        assert!(opts.looping && opts.pinned);
    }

    #[test]
    fn test_resource_lifecycle() {
        let mut host = MemoryHost::new().with_asset("hit", 2.0);
        let tiers = VolumeHierarchy::new();
        let mut h = handle(HandleOptions::for_category(Category::Effect).with_volume(0.5));

        let res = h.ensure_resource(&mut host, &tiers).expect("registered asset");
        assert_eq!(h.ensure_resource(&mut host, &tiers).expect("cached resource"), res);
        assert_eq!(host.created_count(), 1);
        assert_eq!(host.volume(res), Some(0.5));

        h.set_fade_gain(0.5);
        h.apply_volume(&mut host, &tiers);
        assert_eq!(host.volume(res), Some(0.25));

        assert!(h.release(&mut host));
        assert!(!h.release(&mut host));
        assert!(!host.is_live(res));
    }

    #[test]
    fn test_generations_are_monotonic() {
        let mut h = handle(HandleOptions::for_category(Category::Effect));
        assert_eq!(h.bump_lifetime(), 1);
        assert_eq!(h.bump_lifetime(), 2);
        assert_eq!(h.bump_transition(), 1);
        assert_eq!(h.lifetime_generation(), 2);
    }
}
