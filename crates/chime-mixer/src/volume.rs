//! Three-tier volume hierarchy.
//!
//! `effective = instance × category × master`, each factor clamped to
//! `[0, 1]`. One-shots have no category tier and use a factor of 1.0.

use chime_common::Category;
use serde::{Deserialize, Serialize};

/// Clamp a volume into `[0, 1]`. NaN reads as silence.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Serializable snapshot of every volume tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeLevels {
    /// Master volume (0.0 - 1.0)
    pub master: f32,
    /// Effect tier (0.0 - 1.0)
    pub effect: f32,
    /// Fx tier (0.0 - 1.0)
    pub fx: f32,
    /// Music tier (0.0 - 1.0)
    pub music: f32,
}

impl Default for VolumeLevels {
    fn default() -> Self {
        Self {
            master: 1.0,
            effect: 1.0,
            fx: 1.0,
            music: 1.0,
        }
    }
}

impl VolumeLevels {
    /// Clamp every tier into range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            master: clamp_unit(self.master),
            effect: clamp_unit(self.effect),
            fx: clamp_unit(self.fx),
            music: clamp_unit(self.music),
        }
    }
}

/// Master and per-category volume tiers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeHierarchy {
    levels: VolumeLevels,
}

impl VolumeHierarchy {
    /// All tiers at full volume.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a snapshot, clamping each tier.
    #[must_use]
    pub fn from_levels(levels: VolumeLevels) -> Self {
        Self {
            levels: levels.clamped(),
        }
    }

    /// Current tiers.
    #[must_use]
    pub const fn levels(&self) -> VolumeLevels {
        self.levels
    }

    /// Master volume.
    #[must_use]
    pub const fn master(&self) -> f32 {
        self.levels.master
    }

    /// Set the master volume. Returns the stored (clamped) value.
    pub fn set_master(&mut self, volume: f32) -> f32 {
        self.levels.master = clamp_unit(volume);
        self.levels.master
    }

    /// Category tier. One-shots always read 1.0.
    #[must_use]
    pub const fn category(&self, category: Category) -> f32 {
        match category {
            Category::Effect => self.levels.effect,
            Category::Fx => self.levels.fx,
            Category::Music => self.levels.music,
            Category::OneShot => 1.0,
        }
    }

    /// Set a category tier. Returns the stored value, or `None` for
    /// one-shots, which have no tier.
    pub fn set_category(&mut self, category: Category, volume: f32) -> Option<f32> {
        let volume = clamp_unit(volume);
        let slot = match category {
            Category::Effect => &mut self.levels.effect,
            Category::Fx => &mut self.levels.fx,
            Category::Music => &mut self.levels.music,
            Category::OneShot => return None,
        };
        *slot = volume;
        Some(volume)
    }

    /// Effective volume for a handle of `category` at `instance` volume.
    #[must_use]
    pub fn effective(&self, category: Category, instance: f32) -> f32 {
        clamp_unit(instance) * self.category(category) * self.levels.master
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_effective_volume_multiplies_tiers() {
        let mut tiers = VolumeHierarchy::new();
        tiers.set_master(0.5);
        tiers.set_category(Category::Music, 0.8);
        assert_relative_eq!(tiers.effective(Category::Music, 1.0), 0.4);
        assert_relative_eq!(tiers.effective(Category::Effect, 1.0), 0.5);
    }

    #[test]
    fn test_one_shot_has_no_tier() {
        let mut tiers = VolumeHierarchy::new();
        assert_eq!(tiers.set_category(Category::OneShot, 0.2), None);
        tiers.set_master(0.25);
        assert_relative_eq!(tiers.effective(Category::OneShot, 1.0), 0.25);
    }

    #[test]
    fn test_nan_is_silent() {
        assert_eq!(clamp_unit(f32::NAN), 0.0);
    }

    #[test]
    fn test_levels_deserialize_partial() {
        let levels: VolumeLevels = toml::from_str("music = 0.3").expect("valid toml");
        assert_relative_eq!(levels.music, 0.3);
        assert_relative_eq!(levels.master, 1.0);
    }

    proptest! {
        #[test]
        fn prop_tier_writes_are_clamped(v in -10.0f32..10.0) {
            let mut tiers = VolumeHierarchy::new();
            let stored = tiers.set_master(v);
            prop_assert!((0.0..=1.0).contains(&stored));
            prop_assert_eq!(stored, v.clamp(0.0, 1.0));

            for category in Category::CACHED {
                let stored = tiers.set_category(category, v);
                prop_assert_eq!(stored, Some(v.clamp(0.0, 1.0)));
            }
        }

        #[test]
        fn prop_effective_stays_in_range(
            instance in -5.0f32..5.0,
            master in -5.0f32..5.0,
            music in -5.0f32..5.0,
        ) {
            let tiers = VolumeHierarchy::from_levels(VolumeLevels { master, music, ..VolumeLevels::default() });
            let effective = tiers.effective(Category::Music, instance);
            prop_assert!((0.0..=1.0).contains(&effective));
        }
    }
}
