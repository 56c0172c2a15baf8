//! Per-category convenience surface.
//!
//! Thin wrappers that address a cache by category and asset key. They all
//! route to the handle-addressed operations on [`AudioSystem`].

use chime_common::{AssetId, AudioResult, Category, HandleRef};
use chime_kernel::AudioHost;

use crate::handle::{HandleOptions, PlayOptions, PlaybackHandle};
use crate::system::AudioSystem;

impl<H: AudioHost> AudioSystem<H> {
    // ------------------------------------------------------------------
    // Prepare
    // ------------------------------------------------------------------

    /// Prepare an effect handle with the category defaults.
    pub fn prepare_effect(&mut self, asset: impl Into<AssetId>) -> AudioResult<HandleRef> {
        self.prepare_with(Category::Effect, asset, HandleOptions::for_category(Category::Effect))
    }

    /// Prepare an fx handle with the category defaults.
    pub fn prepare_fx(&mut self, asset: impl Into<AssetId>) -> AudioResult<HandleRef> {
        self.prepare_with(Category::Fx, asset, HandleOptions::for_category(Category::Fx))
    }

    /// Prepare a music handle with the category defaults.
    pub fn prepare_music(&mut self, asset: impl Into<AssetId>) -> AudioResult<HandleRef> {
        self.prepare_with(Category::Music, asset, HandleOptions::for_category(Category::Music))
    }

    // ------------------------------------------------------------------
    // Play
    // ------------------------------------------------------------------

    /// Play an effect. Effects never loop.
    pub fn play_effect(&mut self, asset: impl Into<AssetId>, options: PlayOptions) -> AudioResult<HandleRef> {
        self.play_in(Category::Effect, asset, options.with_loop(false))
    }

    /// Play an fx sound.
    pub fn play_fx(&mut self, asset: impl Into<AssetId>, options: PlayOptions) -> AudioResult<HandleRef> {
        self.play_in(Category::Fx, asset, options)
    }

    /// Play a music track, crossfading from the current one if it is playing.
    pub fn play_music(&mut self, asset: impl Into<AssetId>, options: PlayOptions) -> AudioResult<HandleRef> {
        self.play_in(Category::Music, asset, options)
    }

    // ------------------------------------------------------------------
    // Pause
    // ------------------------------------------------------------------

    /// Pause an effect handle.
    pub fn pause_effect(&mut self, asset: impl Into<AssetId>, fade_out: f32) -> AudioResult<()> {
        self.pause(&HandleRef::new(Category::Effect, asset), fade_out)
    }

    /// Pause an fx handle.
    pub fn pause_fx(&mut self, asset: impl Into<AssetId>, fade_out: f32) -> AudioResult<()> {
        self.pause(&HandleRef::new(Category::Fx, asset), fade_out)
    }

    /// Pause a music handle.
    pub fn pause_music(&mut self, asset: impl Into<AssetId>, fade_out: f32) -> AudioResult<()> {
        self.pause(&HandleRef::new(Category::Music, asset), fade_out)
    }

    /// Pause every playing effect handle. Returns the affected assets.
    pub fn pause_all_effect(&mut self, fade_out: f32) -> Vec<AssetId> {
        self.pause_all_in(Category::Effect, fade_out)
    }

    /// Pause every playing fx handle. Returns the affected assets.
    pub fn pause_all_fx(&mut self, fade_out: f32) -> Vec<AssetId> {
        self.pause_all_in(Category::Fx, fade_out)
    }

    /// Pause every playing music handle. Returns the affected assets.
    pub fn pause_all_music(&mut self, fade_out: f32) -> Vec<AssetId> {
        self.pause_all_in(Category::Music, fade_out)
    }

    // ------------------------------------------------------------------
    // Resume
    // ------------------------------------------------------------------

    /// Resume a paused effect handle.
    pub fn resume_effect(&mut self, asset: impl Into<AssetId>) -> AudioResult<()> {
        self.resume(&HandleRef::new(Category::Effect, asset))
    }

    /// Resume a paused fx handle.
    pub fn resume_fx(&mut self, asset: impl Into<AssetId>) -> AudioResult<()> {
        self.resume(&HandleRef::new(Category::Fx, asset))
    }

    /// Resume a paused music handle.
    pub fn resume_music(&mut self, asset: impl Into<AssetId>) -> AudioResult<()> {
        self.resume(&HandleRef::new(Category::Music, asset))
    }

    /// Resume every paused effect handle. Returns the affected assets.
    pub fn resume_all_effect(&mut self) -> Vec<AssetId> {
        self.resume_all_in(Category::Effect)
    }

    /// Resume every paused fx handle. Returns the affected assets.
    pub fn resume_all_fx(&mut self) -> Vec<AssetId> {
        self.resume_all_in(Category::Fx)
    }

    /// Resume the current music track if it is paused. Returns the affected assets.
    pub fn resume_all_music(&mut self) -> Vec<AssetId> {
        self.resume_all_in(Category::Music)
    }

    // ------------------------------------------------------------------
    // Stop
    // ------------------------------------------------------------------

    /// Stop an effect handle.
    pub fn stop_effect(&mut self, asset: impl Into<AssetId>, fade_out: f32) -> AudioResult<()> {
        self.stop(&HandleRef::new(Category::Effect, asset), fade_out)
    }

    /// Stop an fx handle.
    pub fn stop_fx(&mut self, asset: impl Into<AssetId>, fade_out: f32) -> AudioResult<()> {
        self.stop(&HandleRef::new(Category::Fx, asset), fade_out)
    }

    /// Stop a music handle.
    pub fn stop_music(&mut self, asset: impl Into<AssetId>, fade_out: f32) -> AudioResult<()> {
        self.stop(&HandleRef::new(Category::Music, asset), fade_out)
    }

    /// Stop every playing effect handle. Returns the affected assets.
    pub fn stop_all_effect(&mut self, fade_out: f32) -> Vec<AssetId> {
        self.stop_all_in(Category::Effect, fade_out)
    }

    /// Stop every playing fx handle. Returns the affected assets.
    pub fn stop_all_fx(&mut self, fade_out: f32) -> Vec<AssetId> {
        self.stop_all_in(Category::Fx, fade_out)
    }

    /// Stop every playing music handle. Returns the affected assets.
    pub fn stop_all_music(&mut self, fade_out: f32) -> Vec<AssetId> {
        self.stop_all_in(Category::Music, fade_out)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Prepared effect handle or `NotFound`.
    pub fn get_effect(&self, asset: impl Into<AssetId>) -> AudioResult<&PlaybackHandle> {
        self.get(&HandleRef::new(Category::Effect, asset))
    }

    /// Prepared fx handle or `NotFound`.
    pub fn get_fx(&self, asset: impl Into<AssetId>) -> AudioResult<&PlaybackHandle> {
        self.get(&HandleRef::new(Category::Fx, asset))
    }

    /// Prepared music handle or `NotFound`.
    pub fn get_music(&self, asset: impl Into<AssetId>) -> AudioResult<&PlaybackHandle> {
        self.get(&HandleRef::new(Category::Music, asset))
    }

    /// Prepared effect handle, if any.
    pub fn find_effect(&self, asset: impl Into<AssetId>) -> Option<&PlaybackHandle> {
        self.handle(&HandleRef::new(Category::Effect, asset))
    }

    /// Prepared fx handle, if any.
    pub fn find_fx(&self, asset: impl Into<AssetId>) -> Option<&PlaybackHandle> {
        self.handle(&HandleRef::new(Category::Fx, asset))
    }

    /// Prepared music handle, if any.
    pub fn find_music(&self, asset: impl Into<AssetId>) -> Option<&PlaybackHandle> {
        self.handle(&HandleRef::new(Category::Music, asset))
    }

    // ------------------------------------------------------------------
    // Clear / evict
    // ------------------------------------------------------------------

    /// Release effect resources; entries stay cached.
    pub fn clear_effect(&mut self, include_playing: bool, force: bool) -> Vec<AssetId> {
        self.clear_in(Category::Effect, include_playing, force)
    }

    /// Release fx resources; entries stay cached.
    pub fn clear_fx(&mut self, include_playing: bool, force: bool) -> Vec<AssetId> {
        self.clear_in(Category::Fx, include_playing, force)
    }

    /// Release music resources; entries stay cached.
    pub fn clear_music(&mut self, include_playing: bool, force: bool) -> Vec<AssetId> {
        self.clear_in(Category::Music, include_playing, force)
    }

    /// Remove an effect handle from its cache.
    pub fn evict_effect(&mut self, asset: impl Into<AssetId>) -> bool {
        self.evict(&HandleRef::new(Category::Effect, asset))
    }

    /// Remove an fx handle from its cache.
    pub fn evict_fx(&mut self, asset: impl Into<AssetId>) -> bool {
        self.evict(&HandleRef::new(Category::Fx, asset))
    }

    /// Remove a music handle from its cache.
    pub fn evict_music(&mut self, asset: impl Into<AssetId>) -> bool {
        self.evict(&HandleRef::new(Category::Music, asset))
    }
}
