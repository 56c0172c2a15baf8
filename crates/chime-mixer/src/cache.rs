//! Per-category handle cache.
//!
//! One handle per asset. `prepare` is idempotent: the first caller's options
//! win and later calls get the existing handle back. `clear` only releases
//! host resources; entries leave the cache through `evict`.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use chime_common::{AssetId, AudioError, AudioResult, Category};
use chime_kernel::AudioHost;
use tracing::debug;

use crate::handle::{HandleOptions, PlaybackHandle, PlaybackState};

/// Whether `clear` releases a handle's resource.
#[must_use]
pub const fn should_release(playing: bool, pinned: bool, include_playing: bool, force: bool) -> bool {
    (force || include_playing || !playing) && (force || !pinned)
}

/// Handles of one category keyed by asset.
#[derive(Debug)]
pub struct CategoryCache {
    category: Category,
    handles: AHashMap<AssetId, PlaybackHandle>,
}

impl CategoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            category,
            handles: AHashMap::new(),
        }
    }

    /// Category of every handle in this cache.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Return the handle for `asset`, creating it if absent.
    ///
    /// Creation asks the host for the clip length and fails with
    /// `AssetUnavailable` if it cannot. No resource is created and nothing
    /// plays.
    pub fn prepare<H: AudioHost>(
        &mut self,
        host: &mut H,
        asset: &AssetId,
        options: HandleOptions,
    ) -> AudioResult<&mut PlaybackHandle> {
        match self.handles.entry(asset.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let duration = host.duration(asset)?;
                debug!("Prepared {}:{} ({:.2}s)", self.category, asset, duration);
                Ok(entry.insert(PlaybackHandle::new(
                    self.category,
                    asset.clone(),
                    duration,
                    options,
                )))
            },
        }
    }

    /// Existing handle or `NotFound`.
    pub fn get(&self, asset: &AssetId) -> AudioResult<&PlaybackHandle> {
        self.handles.get(asset).ok_or_else(|| self.not_found(asset))
    }

    /// Existing handle or `NotFound`.
    pub fn get_mut(&mut self, asset: &AssetId) -> AudioResult<&mut PlaybackHandle> {
        let category = self.category;
        self.handles.get_mut(asset).ok_or_else(|| AudioError::NotFound {
            category,
            asset: asset.clone(),
        })
    }

    /// Non-failing lookup.
    #[must_use]
    pub fn find(&self, asset: &AssetId) -> Option<&PlaybackHandle> {
        self.handles.get(asset)
    }

    /// Whether `asset` has a handle.
    #[must_use]
    pub fn contains(&self, asset: &AssetId) -> bool {
        self.handles.contains_key(asset)
    }

    /// Number of handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the cache has no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterate over the handles (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &PlaybackHandle> {
        self.handles.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlaybackHandle> {
        self.handles.values_mut()
    }

    /// Assets whose handle satisfies `pred`.
    pub(crate) fn assets_where(&self, mut pred: impl FnMut(&PlaybackHandle) -> bool) -> Vec<AssetId> {
        self.handles
            .values()
            .filter(|h| pred(h))
            .map(|h| h.asset().clone())
            .collect()
    }

    /// Release host resources per [`should_release`]. Entries stay.
    ///
    /// Returns the released assets.
    pub fn clear<H: AudioHost>(&mut self, host: &mut H, include_playing: bool, force: bool) -> Vec<AssetId> {
        let mut released = Vec::new();
        for handle in self.handles.values_mut() {
            if !handle.has_resource() {
                continue;
            }
            let playing = handle.is_playing(&*host);
            if !should_release(playing, handle.is_pinned(), include_playing, force) {
                continue;
            }
            handle.bump_lifetime();
            handle.bump_transition();
            handle.release(host);
            handle.set_state(PlaybackState::Idle);
            released.push(handle.asset().clone());
        }

        if !released.is_empty() {
            debug!("Cleared {} {} resources", released.len(), self.category);
        }
        released
    }

    /// Remove the entry for `asset`, releasing its resource first.
    pub fn evict<H: AudioHost>(&mut self, host: &mut H, asset: &AssetId) -> Option<PlaybackHandle> {
        let mut handle = self.handles.remove(asset)?;
        handle.bump_lifetime();
        handle.bump_transition();
        handle.release(host);
        handle.set_state(PlaybackState::Idle);
        debug!("Evicted {}:{}", self.category, asset);
        Some(handle)
    }

    fn not_found(&self, asset: &AssetId) -> AudioError {
        AudioError::NotFound {
            category: self.category,
            asset: asset.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_kernel::MemoryHost;

    use crate::volume::VolumeHierarchy;

    fn host() -> MemoryHost {
        MemoryHost::new().with_asset("a", 1.0).with_asset("b", 1.0)
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let mut host = host();
        let mut cache = CategoryCache::new(Category::Effect);
        let id = AssetId::new("a");

        cache
            .prepare(&mut host, &id, HandleOptions::for_category(Category::Effect).with_volume(0.3))
            .expect("registered asset");
        let again = cache
            .prepare(&mut host, &id, HandleOptions::for_category(Category::Effect).with_volume(0.9))
            .expect("existing handle");

        // First writer wins.
        assert!((again.instance_volume() - 0.3).abs() < f32::EPSILON);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_prepare_unavailable_asset() {
        let mut host = host();
        let mut cache = CategoryCache::new(Category::Music);
        let err = cache
            .prepare(&mut host, &AssetId::new("nope"), HandleOptions::for_category(Category::Music))
            .expect_err("unregistered asset");
        assert!(matches!(err, AudioError::AssetUnavailable { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_and_find() {
        let mut host = host();
        let mut cache = CategoryCache::new(Category::Fx);
        let id = AssetId::new("a");
        assert!(cache.find(&id).is_none());
        assert!(matches!(
            cache.get(&id),
            Err(AudioError::NotFound { category: Category::Fx, .. })
        ));

        cache
            .prepare(&mut host, &id, HandleOptions::for_category(Category::Fx))
            .expect("registered asset");
        assert!(cache.get(&id).is_ok());
        assert!(cache.contains(&id));
    }

    #[test]
    fn test_release_predicate() {
        // Idle, unpinned: released by a plain clear.
        assert!(should_release(false, false, false, false));
        // Playing needs include_playing.
        assert!(!should_release(true, false, false, false));
        assert!(should_release(true, false, true, false));
        // Pinned needs force.
        assert!(!should_release(false, true, true, false));
        assert!(should_release(true, true, false, true));
    }

    #[test]
    fn test_clear_keeps_entries() {
        let mut host = host();
        let tiers = VolumeHierarchy::new();
        let mut cache = CategoryCache::new(Category::Effect);
        let id = AssetId::new("a");

        let handle = cache
            .prepare(&mut host, &id, HandleOptions::for_category(Category::Effect))
            .expect("registered asset");
        handle.ensure_resource(&mut host, &tiers).expect("resource");

        let released = cache.clear(&mut host, false, false);
        assert_eq!(released, vec![id.clone()]);
        assert_eq!(cache.len(), 1);
        assert!(!cache.get(&id).expect("entry kept").has_resource());
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn test_evict_releases_and_removes() {
        let mut host = host();
        let tiers = VolumeHierarchy::new();
        let mut cache = CategoryCache::new(Category::Fx);
        let id = AssetId::new("b");

        cache
            .prepare(&mut host, &id, HandleOptions::for_category(Category::Fx))
            .expect("registered asset")
            .ensure_resource(&mut host, &tiers)
            .expect("resource");

        let evicted = cache.evict(&mut host, &id).expect("entry present");
        assert!(!evicted.has_resource());
        assert!(cache.is_empty());
        assert_eq!(host.live_count(), 0);
        assert!(cache.evict(&mut host, &id).is_none());
    }
}
