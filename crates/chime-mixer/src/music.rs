//! Music crossfade coordination.
//!
//! At most one music track is current. Playing a different track while the
//! current one is audible hands off with a crossfade: the incoming track
//! fades in while the outgoing one fades out and stops, both over the
//! incoming request's fade time. The new track becomes current immediately.

use chime_common::AssetId;

/// How a music play request is carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// No other track involved: play directly.
    Direct,
    /// Outgoing track is playing: fade it out while the new one fades in.
    Crossfade {
        /// Track being replaced.
        outgoing: AssetId,
    },
    /// Outgoing track is silent: stop it, then play directly.
    Switch {
        /// Track being replaced.
        outgoing: AssetId,
    },
}

/// Tracks the current music and plans handoffs.
#[derive(Debug, Default, Clone)]
pub struct MusicCoordinator {
    current: Option<AssetId>,
}

impl MusicCoordinator {
    /// No current music.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current track, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&AssetId> {
        self.current.as_ref()
    }

    /// Whether `asset` is the current track.
    #[must_use]
    pub fn is_current(&self, asset: &AssetId) -> bool {
        self.current.as_ref() == Some(asset)
    }

    /// Decide how to play `incoming`. `is_playing` is asked about the
    /// current track only when it differs from `incoming`.
    pub fn plan(&self, incoming: &AssetId, is_playing: impl FnOnce(&AssetId) -> bool) -> Handoff {
        match &self.current {
            None => Handoff::Direct,
            Some(current) if current == incoming => Handoff::Direct,
            Some(current) if is_playing(current) => Handoff::Crossfade {
                outgoing: current.clone(),
            },
            Some(current) => Handoff::Switch {
                outgoing: current.clone(),
            },
        }
    }

    /// Make `asset` current.
    pub fn set_current(&mut self, asset: AssetId) {
        self.current = Some(asset);
    }

    /// Forget the current track if it is `asset`. Returns whether it was.
    pub fn clear_if(&mut self, asset: &AssetId) -> bool {
        if self.is_current(asset) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_without_current_is_direct() {
        let coordinator = MusicCoordinator::new();
        assert_eq!(coordinator.plan(&AssetId::new("a"), |_| true), Handoff::Direct);
    }

    #[test]
    fn test_replaying_current_is_direct() {
        let mut coordinator = MusicCoordinator::new();
        coordinator.set_current(AssetId::new("a"));
        let plan = coordinator.plan(&AssetId::new("a"), |_| panic!("not asked for the same track"));
        assert_eq!(plan, Handoff::Direct);
    }

    #[test]
    fn test_plan_depends_on_outgoing_playback() {
        let mut coordinator = MusicCoordinator::new();
        coordinator.set_current(AssetId::new("a"));

        assert_eq!(
            coordinator.plan(&AssetId::new("b"), |_| true),
            Handoff::Crossfade {
                outgoing: AssetId::new("a")
            }
        );
        assert_eq!(
            coordinator.plan(&AssetId::new("b"), |_| false),
            Handoff::Switch {
                outgoing: AssetId::new("a")
            }
        );
    }

    #[test]
    fn test_clear_if_only_matches_current() {
        let mut coordinator = MusicCoordinator::new();
        coordinator.set_current(AssetId::new("a"));
        assert!(!coordinator.clear_if(&AssetId::new("b")));
        assert!(coordinator.clear_if(&AssetId::new("a")));
        assert!(coordinator.current().is_none());
    }
}
