//! The audio system context.
//!
//! [`AudioSystem`] owns the host, the three category caches, the one-shot
//! slab, the volume tiers, the music coordinator and the fade and reaper
//! queues. Every operation returns immediately; time only moves in
//! [`AudioSystem::update`].
//!
//! # Example
//!
//! ```
//! use chime_kernel::MemoryHost;
//! use chime_mixer::{AudioSystem, PlayOptions};
//!
//! let host = MemoryHost::new().with_asset("theme", 60.0);
//! let mut audio = AudioSystem::new(host);
//! audio.play_music("theme", PlayOptions::new().with_fade_in(2.0))?;
//! audio.update(0.05);
//! assert!(audio.current_music().is_some());
//! # Ok::<(), chime_common::AudioError>(())
//! ```

use std::sync::Arc;

use ahash::AHashMap;
use chime_common::{AssetId, AudioError, AudioResult, Category, HandleRef, TransitionWarning};
use chime_kernel::AudioHost;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::CategoryCache;
use crate::fade::{clamp_fade_time, FadeCompletion, FadeScheduler, FadeTask};
use crate::handle::{HandleKey, HandleOptions, PlayOptions, PlaybackHandle, PlaybackState};
use crate::music::{Handoff, MusicCoordinator};
use crate::reaper::{LifecycleReaper, REARM_MIN_DELAY};
use crate::volume::{VolumeHierarchy, VolumeLevels};

/// An audio system shared between a tick driver and command callers.
pub type SharedAudioSystem<H> = Arc<Mutex<AudioSystem<H>>>;

fn not_found(handle: &HandleRef) -> AudioError {
    AudioError::NotFound {
        category: handle.category,
        asset: handle.asset.clone(),
    }
}

fn music_key(asset: AssetId) -> HandleKey {
    HandleKey::Cached(HandleRef::new(Category::Music, asset))
}

/// Every handle the system owns.
#[derive(Debug)]
struct HandleStore {
    effect: CategoryCache,
    fx: CategoryCache,
    music: CategoryCache,
    one_shots: AHashMap<u64, PlaybackHandle>,
    next_one_shot: u64,
}

impl HandleStore {
    fn new() -> Self {
        Self {
            effect: CategoryCache::new(Category::Effect),
            fx: CategoryCache::new(Category::Fx),
            music: CategoryCache::new(Category::Music),
            one_shots: AHashMap::new(),
            next_one_shot: 0,
        }
    }

    fn cache(&self, category: Category) -> Option<&CategoryCache> {
        match category {
            Category::Effect => Some(&self.effect),
            Category::Fx => Some(&self.fx),
            Category::Music => Some(&self.music),
            Category::OneShot => None,
        }
    }

    fn cache_mut(&mut self, category: Category) -> Option<&mut CategoryCache> {
        match category {
            Category::Effect => Some(&mut self.effect),
            Category::Fx => Some(&mut self.fx),
            Category::Music => Some(&mut self.music),
            Category::OneShot => None,
        }
    }

    fn cached(&self, handle: &HandleRef) -> AudioResult<&PlaybackHandle> {
        self.cache(handle.category)
            .ok_or_else(|| not_found(handle))?
            .get(&handle.asset)
    }

    fn cached_mut(&mut self, handle: &HandleRef) -> AudioResult<&mut PlaybackHandle> {
        self.cache_mut(handle.category)
            .ok_or_else(|| not_found(handle))?
            .get_mut(&handle.asset)
    }

    fn get(&self, key: &HandleKey) -> Option<&PlaybackHandle> {
        match key {
            HandleKey::Cached(handle) => self.cached(handle).ok(),
            HandleKey::OneShot(id) => self.one_shots.get(id),
        }
    }

    fn get_mut(&mut self, key: &HandleKey) -> Option<&mut PlaybackHandle> {
        match key {
            HandleKey::Cached(handle) => self.cached_mut(handle).ok(),
            HandleKey::OneShot(id) => self.one_shots.get_mut(id),
        }
    }

    /// Visit the handles of one category, or every handle for `None`.
    fn for_each_mut(&mut self, category: Option<Category>, mut f: impl FnMut(&mut PlaybackHandle)) {
        match category {
            Some(Category::OneShot) => self.one_shots.values_mut().for_each(f),
            Some(category) => {
                if let Some(cache) = self.cache_mut(category) {
                    cache.iter_mut().for_each(f);
                }
            },
            None => {
                for cache in [&mut self.effect, &mut self.fx, &mut self.music] {
                    cache.iter_mut().for_each(&mut f);
                }
                self.one_shots.values_mut().for_each(f);
            },
        }
    }
}

/// Audio playback orchestration over a host.
#[derive(Debug)]
pub struct AudioSystem<H: AudioHost> {
    host: H,
    volumes: VolumeHierarchy,
    store: HandleStore,
    music: MusicCoordinator,
    fades: FadeScheduler,
    reaper: LifecycleReaper,
    clock: f64,
}

impl<H: AudioHost> AudioSystem<H> {
    /// Create a system with every volume tier at 1.0.
    pub fn new(host: H) -> Self {
        Self::with_volumes(host, VolumeLevels::default())
    }

    /// Create a system with the given volume tiers.
    pub fn with_volumes(host: H, levels: VolumeLevels) -> Self {
        Self {
            host,
            volumes: VolumeHierarchy::from_levels(levels),
            store: HandleStore::new(),
            music: MusicCoordinator::new(),
            fades: FadeScheduler::new(),
            reaper: LifecycleReaper::new(),
            clock: 0.0,
        }
    }

    /// Wrap the system for sharing across threads.
    pub fn shared(self) -> SharedAudioSystem<H> {
        Arc::new(Mutex::new(self))
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host, mutably (asset registration and the like).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Seconds advanced by [`update`](Self::update) so far.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Queued fade tasks.
    pub fn pending_fades(&self) -> usize {
        self.fades.len()
    }

    /// Armed releases.
    pub fn pending_releases(&self) -> usize {
        self.reaper.len()
    }

    /// Untracked one-shots not yet reaped.
    pub fn one_shot_count(&self) -> usize {
        self.store.one_shots.len()
    }

    // ------------------------------------------------------------------
    // Prepare / lookup
    // ------------------------------------------------------------------

    /// Create (or return) the handle for `asset` in `category` without
    /// playing it. An existing handle keeps the options it was created with.
    pub fn prepare_with(
        &mut self,
        category: Category,
        asset: impl Into<AssetId>,
        options: HandleOptions,
    ) -> AudioResult<HandleRef> {
        let asset = asset.into();
        let handle_ref = HandleRef::new(category, asset);
        let cache = self
            .store
            .cache_mut(category)
            .ok_or_else(|| not_found(&handle_ref))?;
        cache.prepare(&mut self.host, &handle_ref.asset, options)?;
        Ok(handle_ref)
    }

    /// Handle for `handle` or `NotFound`.
    pub fn get(&self, handle: &HandleRef) -> AudioResult<&PlaybackHandle> {
        self.store.cached(handle)
    }

    /// Handle for `handle`, if prepared.
    pub fn handle(&self, handle: &HandleRef) -> Option<&PlaybackHandle> {
        self.store.cached(handle).ok()
    }

    /// Cache for a category (`None` for one-shots).
    pub fn cache(&self, category: Category) -> Option<&CategoryCache> {
        self.store.cache(category)
    }

    // ------------------------------------------------------------------
    // Play
    // ------------------------------------------------------------------

    /// Prepare `asset` in `category` if needed, apply `options` and play it.
    pub(crate) fn play_in(
        &mut self,
        category: Category,
        asset: impl Into<AssetId>,
        options: PlayOptions,
    ) -> AudioResult<HandleRef> {
        let handle_ref = self.prepare_with(category, asset, options.handle_options(category))?;

        let handle = self.store.cached_mut(&handle_ref)?;
        handle.set_instance_volume(options.volume);
        handle.set_looping_flag(options.looping);

        self.start(&HandleKey::Cached(handle_ref.clone()), options.fade_in)?;
        Ok(handle_ref)
    }

    /// Play a prepared handle with its current settings.
    pub fn play(&mut self, handle: &HandleRef, fade_in: f32) -> AudioResult<()> {
        self.store.cached(handle)?;
        self.start(&HandleKey::Cached(handle.clone()), fade_in)
    }

    /// Play `asset` once, untracked, at `volume` (scaled by master only).
    ///
    /// The handle never enters a cache; it is dropped when the reaper
    /// releases it at clip end.
    pub fn play_once(&mut self, asset: impl Into<AssetId>, volume: f32) -> AudioResult<()> {
        let asset = asset.into();
        let duration = self.host.duration(&asset)?;

        let id = self.store.next_one_shot;
        self.store.next_one_shot += 1;

        let options = HandleOptions::for_category(Category::OneShot)
            .with_volume(volume)
            .with_loop(false)
            .with_pinned(false);
        self.store.one_shots.insert(
            id,
            PlaybackHandle::new(Category::OneShot, asset, duration, options),
        );

        let key = HandleKey::OneShot(id);
        if let Err(e) = self.start(&key, 0.0) {
            self.store.one_shots.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    fn start(&mut self, key: &HandleKey, fade_in: f32) -> AudioResult<()> {
        let Some(handle) = self.store.get_mut(key) else {
            return Ok(());
        };
        let fade_in = clamp_fade_time(fade_in, handle.duration());
        handle.bump_transition();

        if handle.category() == Category::Music {
            let asset = handle.asset().clone();
            return self.start_music(key, asset, fade_in);
        }
        self.start_direct(key, fade_in)
    }

    /// A current track that has lost its resource does not read as playing,
    /// so it takes the `Switch` path: stopped (a no-op) while the incoming
    /// track plays.
    fn start_music(&mut self, key: &HandleKey, asset: AssetId, fade_in: f32) -> AudioResult<()> {
        let store = &self.store;
        let host = &self.host;
        let plan = self.music.plan(&asset, |current| {
            store.music.find(current).is_some_and(|h| h.is_playing(host))
        });

        match plan {
            Handoff::Direct => {
                self.start_direct(key, fade_in)?;
            },
            Handoff::Switch { outgoing } => {
                self.stop_now(&music_key(outgoing));
                self.start_direct(key, fade_in)?;
            },
            Handoff::Crossfade { outgoing } => {
                self.start_direct(key, fade_in)?;
                let outgoing_key = music_key(outgoing);
                self.begin_fade_out(&outgoing_key, fade_in, FadeCompletion::Stop);
                debug!("Crossfade {} -> {} over {:.2}s", outgoing_key, asset, fade_in);
            },
        }

        self.music.set_current(asset);
        Ok(())
    }

    /// Start host playback. The transition generation has already been
    /// bumped by the caller.
    fn start_direct(&mut self, key: &HandleKey, fade_in: f32) -> AudioResult<()> {
        let now = self.clock;
        let Some(handle) = self.store.get_mut(key) else {
            return Ok(());
        };

        let resource = handle.ensure_resource(&mut self.host, &self.volumes)?;
        self.host.set_looping(resource, handle.is_looping());

        let lifetime = handle.bump_lifetime();
        let transition = handle.transition_generation();

        handle.set_fade_gain(if fade_in > 0.0 { 0.0 } else { 1.0 });
        handle.apply_volume(&mut self.host, &self.volumes);
        self.host.play(resource);
        handle.set_state(PlaybackState::Playing);

        if fade_in > 0.0 {
            self.fades.schedule(FadeTask {
                key: key.clone(),
                generation: transition,
                from: 0.0,
                to: 1.0,
                start: now,
                duration: fade_in,
                completion: FadeCompletion::None,
            });
        }

        if handle.is_reapable() {
            let remaining = (handle.duration() - self.host.elapsed(resource)).max(0.0);
            self.reaper.arm(key.clone(), lifetime, now + f64::from(remaining));
        }

        debug!("Playing {} (fade in {:.2}s)", key, fade_in);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pause / resume / stop / fade
    // ------------------------------------------------------------------

    /// Pause a handle, fading out first when `fade_out > 0`.
    pub fn pause(&mut self, handle: &HandleRef, fade_out: f32) -> AudioResult<()> {
        self.store.cached(handle)?;
        let key = HandleKey::Cached(handle.clone());
        if fade_out > 0.0 {
            self.begin_fade_out(&key, fade_out, FadeCompletion::Pause);
        } else {
            self.pause_now(&key);
        }
        Ok(())
    }

    /// Continue a paused handle.
    ///
    /// Resuming a music track that is not current makes it current and stops
    /// the previous current track.
    pub fn resume(&mut self, handle: &HandleRef) -> AudioResult<()> {
        let paused = self.store.cached(handle)?.state() == PlaybackState::Paused;

        if paused && handle.category == Category::Music && !self.music.is_current(&handle.asset) {
            if let Some(current) = self.music.current().cloned() {
                self.stop_now(&music_key(current));
            }
            self.music.set_current(handle.asset.clone());
        }

        self.resume_now(&HandleKey::Cached(handle.clone()));
        Ok(())
    }

    /// Stop a handle, fading out first when `fade_out > 0`.
    pub fn stop(&mut self, handle: &HandleRef, fade_out: f32) -> AudioResult<()> {
        self.store.cached(handle)?;
        let key = HandleKey::Cached(handle.clone());
        if fade_out > 0.0 {
            self.begin_fade_out(&key, fade_out, FadeCompletion::Stop);
        } else {
            self.stop_now(&key);
        }
        Ok(())
    }

    /// Ramp a handle to silence over `seconds`, then run `on_complete`.
    ///
    /// A later transition on the same handle supersedes the fade and its
    /// completion never runs. No-op without a host resource.
    pub fn fade_out(&mut self, handle: &HandleRef, seconds: f32, on_complete: FadeCompletion) -> AudioResult<()> {
        self.store.cached(handle)?;
        self.begin_fade_out(&HandleKey::Cached(handle.clone()), seconds, on_complete);
        Ok(())
    }

    /// No-op when the handle has no resource to fade.
    fn begin_fade_out(&mut self, key: &HandleKey, seconds: f32, completion: FadeCompletion) {
        let now = self.clock;
        let Some(handle) = self.store.get_mut(key) else {
            return;
        };
        if !handle.has_resource() {
            return;
        }

        let seconds = clamp_fade_time(seconds, handle.duration());
        let generation = handle.bump_transition();
        let from = handle.fade_gain();

        if seconds <= 0.0 {
            handle.set_fade_gain(0.0);
            handle.apply_volume(&mut self.host, &self.volumes);
            self.complete(key, completion);
        } else {
            self.fades.schedule(FadeTask {
                key: key.clone(),
                generation,
                from,
                to: 0.0,
                start: now,
                duration: seconds,
                completion,
            });
            debug!("Fading out {} over {:.2}s", key, seconds);
        }
    }

    fn complete(&mut self, key: &HandleKey, completion: FadeCompletion) {
        match completion {
            FadeCompletion::None => {},
            FadeCompletion::Pause => self.pause_now(key),
            FadeCompletion::Stop => self.stop_now(key),
            FadeCompletion::Call(f) => f(),
        }
    }

    fn pause_now(&mut self, key: &HandleKey) {
        let Some(handle) = self.store.get_mut(key) else {
            return;
        };
        let Some(resource) = handle.resource() else {
            return;
        };
        if handle.state() == PlaybackState::Paused {
            warn!("{}", TransitionWarning::AlreadyPaused(handle.asset().clone()));
            return;
        }

        handle.bump_lifetime();
        handle.bump_transition();
        self.host.pause(resource);
        if handle.state() == PlaybackState::Playing {
            handle.set_state(PlaybackState::Paused);
        }
        debug!("Paused {}", key);
    }

    fn resume_now(&mut self, key: &HandleKey) {
        let now = self.clock;
        let Some(handle) = self.store.get_mut(key) else {
            return;
        };
        let resource = match handle.resource() {
            Some(resource) if handle.state() == PlaybackState::Paused => resource,
            _ => {
                warn!("{}", TransitionWarning::NotPaused(handle.asset().clone()));
                return;
            },
        };

        let lifetime = handle.bump_lifetime();
        handle.bump_transition();
        handle.set_fade_gain(1.0);
        handle.apply_volume(&mut self.host, &self.volumes);
        self.host.resume(resource);
        handle.set_state(PlaybackState::Playing);

        if handle.is_reapable() {
            let remaining = (handle.duration() - self.host.elapsed(resource)).max(0.0);
            self.reaper.arm(key.clone(), lifetime, now + f64::from(remaining));
        }
        debug!("Resumed {}", key);
    }

    fn stop_now(&mut self, key: &HandleKey) {
        let Some(handle) = self.store.get_mut(key) else {
            return;
        };
        let Some(resource) = handle.resource() else {
            return;
        };

        handle.bump_lifetime();
        handle.bump_transition();
        self.host.stop(resource);
        handle.set_state(PlaybackState::Stopped);
        let released = !handle.is_pinned() && handle.release(&mut self.host);

        let asset = handle.asset().clone();
        if handle.category() == Category::Music {
            self.music.clear_if(&asset);
        }
        if let (HandleKey::OneShot(id), true) = (key, released) {
            self.store.one_shots.remove(id);
        }
        debug!("Stopped {}", key);
    }

    // ------------------------------------------------------------------
    // Category-wide operations
    // ------------------------------------------------------------------

    pub(crate) fn pause_all_in(&mut self, category: Category, fade_out: f32) -> Vec<AssetId> {
        let host = &self.host;
        let Some(cache) = self.store.cache(category) else {
            return Vec::new();
        };
        let playing = cache.assets_where(|h| h.is_playing(host));

        for asset in &playing {
            let key = HandleKey::Cached(HandleRef::new(category, asset.clone()));
            if fade_out > 0.0 {
                self.begin_fade_out(&key, fade_out, FadeCompletion::Pause);
            } else {
                self.pause_now(&key);
            }
        }
        playing
    }

    /// Resume paused handles. For music only the current track resumes.
    pub(crate) fn resume_all_in(&mut self, category: Category) -> Vec<AssetId> {
        let music = &self.music;
        let Some(cache) = self.store.cache(category) else {
            return Vec::new();
        };
        let paused = cache.assets_where(|h| {
            h.state() == PlaybackState::Paused
                && h.has_resource()
                && (category != Category::Music || music.is_current(h.asset()))
        });

        for asset in &paused {
            self.resume_now(&HandleKey::Cached(HandleRef::new(category, asset.clone())));
        }
        paused
    }

    pub(crate) fn stop_all_in(&mut self, category: Category, fade_out: f32) -> Vec<AssetId> {
        let host = &self.host;
        let Some(cache) = self.store.cache(category) else {
            return Vec::new();
        };
        let playing = cache.assets_where(|h| h.is_playing(host));

        for asset in &playing {
            let key = HandleKey::Cached(HandleRef::new(category, asset.clone()));
            if fade_out > 0.0 {
                self.begin_fade_out(&key, fade_out, FadeCompletion::Stop);
            } else {
                self.stop_now(&key);
            }
        }
        playing
    }

    pub(crate) fn clear_in(&mut self, category: Category, include_playing: bool, force: bool) -> Vec<AssetId> {
        match self.store.cache_mut(category) {
            Some(cache) => cache.clear(&mut self.host, include_playing, force),
            None => Vec::new(),
        }
    }

    /// Pause every playing handle in every cache.
    pub fn pause_all(&mut self, fade_out: f32) -> Vec<HandleRef> {
        self.across_caches(|system, category| system.pause_all_in(category, fade_out))
    }

    /// Resume every paused handle (music: the current track only).
    pub fn resume_all(&mut self) -> Vec<HandleRef> {
        self.across_caches(Self::resume_all_in)
    }

    /// Stop every playing handle in every cache.
    pub fn stop_all(&mut self, fade_out: f32) -> Vec<HandleRef> {
        self.across_caches(|system, category| system.stop_all_in(category, fade_out))
    }

    /// Release resources in every cache; see [`crate::cache::should_release`].
    pub fn clear_all(&mut self, include_playing: bool, force: bool) -> Vec<HandleRef> {
        self.across_caches(|system, category| system.clear_in(category, include_playing, force))
    }

    fn across_caches(&mut self, mut op: impl FnMut(&mut Self, Category) -> Vec<AssetId>) -> Vec<HandleRef> {
        let mut touched = Vec::new();
        for category in Category::CACHED {
            touched.extend(
                op(self, category)
                    .into_iter()
                    .map(|asset| HandleRef::new(category, asset)),
            );
        }
        touched
    }

    /// Remove a handle from its cache, releasing its resource and cancelling
    /// its pending fades and releases. Returns whether an entry was removed.
    pub fn evict(&mut self, handle: &HandleRef) -> bool {
        let Some(cache) = self.store.cache_mut(handle.category) else {
            return false;
        };
        if cache.evict(&mut self.host, &handle.asset).is_none() {
            return false;
        }

        let key = HandleKey::Cached(handle.clone());
        self.fades.cancel(&key);
        self.reaper.cancel(&key);
        if handle.category == Category::Music {
            self.music.clear_if(&handle.asset);
        }
        true
    }

    // ------------------------------------------------------------------
    // Handle settings
    // ------------------------------------------------------------------

    /// Set a handle's instance volume. No-op without a host resource.
    pub fn set_volume(&mut self, handle: &HandleRef, volume: f32) -> AudioResult<()> {
        let playback = self.store.cached_mut(handle)?;
        if playback.has_resource() {
            playback.set_instance_volume(volume);
            playback.apply_volume(&mut self.host, &self.volumes);
        }
        Ok(())
    }

    /// Set a handle's loop flag. No-op without a host resource.
    pub fn set_looping(&mut self, handle: &HandleRef, looping: bool) -> AudioResult<()> {
        let now = self.clock;
        let playback = self.store.cached_mut(handle)?;
        let Some(resource) = playback.resource() else {
            return Ok(());
        };

        playback.set_looping_flag(looping);
        self.host.set_looping(resource, looping);

        // Losing the loop flag mid-play means the clip now ends on its own.
        if playback.is_reapable() && playback.state() == PlaybackState::Playing {
            let lifetime = playback.bump_lifetime();
            let remaining = (playback.duration() - self.host.elapsed(resource)).max(0.0);
            self.reaper
                .arm(HandleKey::Cached(handle.clone()), lifetime, now + f64::from(remaining));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Volume tiers
    // ------------------------------------------------------------------

    /// Master volume.
    pub fn master_volume(&self) -> f32 {
        self.volumes.master()
    }

    /// Set the master volume and re-apply it to every live resource.
    /// Returns the stored (clamped) value.
    pub fn set_master_volume(&mut self, volume: f32) -> f32 {
        let stored = self.volumes.set_master(volume);
        self.reapply_volumes(None);
        stored
    }

    /// Category tier (1.0 for one-shots).
    pub fn category_volume(&self, category: Category) -> f32 {
        self.volumes.category(category)
    }

    /// Set a category tier and re-apply it to that category's live
    /// resources. Returns the stored value. One-shots have no tier.
    pub fn set_category_volume(&mut self, category: Category, volume: f32) -> f32 {
        match self.volumes.set_category(category, volume) {
            Some(stored) => {
                self.reapply_volumes(Some(category));
                stored
            },
            None => {
                debug!("Ignoring volume for {}: no category tier", category);
                self.volumes.category(category)
            },
        }
    }

    /// Snapshot of every tier.
    pub fn volume_levels(&self) -> VolumeLevels {
        self.volumes.levels()
    }

    /// Replace every tier and re-apply to every live resource.
    pub fn set_volume_levels(&mut self, levels: VolumeLevels) {
        self.volumes = VolumeHierarchy::from_levels(levels);
        self.reapply_volumes(None);
    }

    fn reapply_volumes(&mut self, category: Option<Category>) {
        let host = &mut self.host;
        let volumes = &self.volumes;
        self.store
            .for_each_mut(category, |handle| handle.apply_volume(host, volumes));
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Current music track.
    pub fn current_music(&self) -> Option<&AssetId> {
        self.music.current()
    }

    /// Whether the host reports the handle as playing.
    pub fn is_playing(&self, handle: &HandleRef) -> bool {
        self.handle(handle).is_some_and(|h| h.is_playing(&self.host))
    }

    /// Seconds played by the handle's resource (0 without one).
    pub fn elapsed(&self, handle: &HandleRef) -> f32 {
        self.handle(handle).map_or(0.0, |h| h.elapsed(&self.host))
    }

    /// Volume currently sent to the host for the handle.
    pub fn output_volume(&self, handle: &HandleRef) -> Option<f32> {
        self.handle(handle).map(|h| h.output_volume(&self.volumes))
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance time by `dt` seconds: host first, then fades, then releases.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += f64::from(dt);
        self.host.tick(dt);
        let now = self.clock;

        let store = &mut self.store;
        let host = &mut self.host;
        let volumes = &self.volumes;
        let finished = self.fades.advance(now, |key, generation, gain| {
            let Some(handle) = store.get_mut(key) else {
                return false;
            };
            if handle.transition_generation() != generation || !handle.has_resource() {
                return false;
            }
            handle.set_fade_gain(gain);
            handle.apply_volume(host, volumes);
            true
        });

        for (key, completion) in finished {
            self.complete(&key, completion);
        }

        self.reap(now);
    }

    fn reap(&mut self, now: f64) {
        for task in self.reaper.take_due(now) {
            let Some(handle) = self.store.get_mut(&task.key) else {
                continue;
            };
            if handle.lifetime_generation() != task.generation || !handle.is_reapable() {
                continue;
            }
            let Some(resource) = handle.resource() else {
                continue;
            };

            if self.host.is_playing(resource) {
                let remaining = (handle.duration() - self.host.elapsed(resource)).max(REARM_MIN_DELAY);
                self.reaper.arm(task.key, task.generation, now + f64::from(remaining));
                continue;
            }

            handle.bump_transition();
            handle.release(&mut self.host);
            handle.set_state(PlaybackState::Stopped);
            let asset = handle.asset().clone();

            match &task.key {
                HandleKey::OneShot(id) => {
                    self.store.one_shots.remove(id);
                },
                HandleKey::Cached(handle_ref) => {
                    if handle_ref.category == Category::Music && self.music.clear_if(&asset) {
                        debug!("Current music {} ended", asset);
                    }
                },
            }
            debug!("Reaped {}", task.key);
        }
    }
}
