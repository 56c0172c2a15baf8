//! Identity types for assets, categories and cached handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Opaque, stable key identifying a playable asset.
///
/// Two ids are the same sound iff their keys compare equal. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AssetId(Arc<str>);

impl AssetId {
    /// Creates an asset id from any string-like key.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Creates an asset id from a file path (lossy for non-UTF-8 paths).
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(path.as_ref().to_string_lossy())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.0.as_ref().to_owned()
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Playback class of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Short, frequently triggered sounds (UI clicks, hits).
    Effect,
    /// Long-running background sounds (ambience, loops).
    Fx,
    /// Background music; at most one track is current at a time.
    Music,
    /// Untracked fire-and-forget sounds.
    OneShot,
}

impl Category {
    /// Categories that own a cache and a volume tier.
    pub const CACHED: [Self; 3] = [Self::Effect, Self::Fx, Self::Music];

    /// Whether handles of this category live in a cache.
    #[must_use]
    pub const fn is_cached(self) -> bool {
        !matches!(self, Self::OneShot)
    }

    /// Default pin flag for handles created in this category.
    #[must_use]
    pub const fn default_pinned(self) -> bool {
        matches!(self, Self::Fx)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effect => write!(f, "effect"),
            Self::Fx => write!(f, "fx"),
            Self::Music => write!(f, "music"),
            Self::OneShot => write!(f, "one-shot"),
        }
    }
}

/// Addresses a cached handle: the category cache plus the asset key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleRef {
    /// Owning category.
    pub category: Category,
    /// Asset key within the category cache.
    pub asset: AssetId,
}

impl HandleRef {
    /// Creates a handle reference.
    #[must_use]
    pub fn new(category: Category, asset: impl Into<AssetId>) -> Self {
        Self {
            category,
            asset: asset.into(),
        }
    }
}

impl fmt::Display for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_equality_is_by_key() {
        let a = AssetId::new("sfx/click.wav");
        let b = AssetId::from("sfx/click.wav".to_string());
        assert_eq!(a, b);
        assert_ne!(a, AssetId::new("sfx/clack.wav"));
    }

    #[test]
    fn test_asset_id_from_path() {
        let id = AssetId::from_path(Path::new("music").join("theme.ogg"));
        assert!(id.as_str().ends_with("theme.ogg"));
    }

    #[test]
    fn test_category_defaults() {
        assert!(Category::Fx.default_pinned());
        assert!(!Category::Effect.default_pinned());
        assert!(!Category::Music.default_pinned());
        assert!(!Category::OneShot.is_cached());
        assert!(Category::CACHED.iter().all(|c| c.is_cached()));
    }

    #[test]
    fn test_handle_ref_display() {
        let handle = HandleRef::new(Category::Music, "track1");
        assert_eq!(handle.to_string(), "music:track1");
    }
}
