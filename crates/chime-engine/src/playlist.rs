//! Sequential music playback.
//!
//! The playlist watches the current track and starts the next one through
//! the music coordinator when the current track is within the crossfade
//! window of its end, or has stopped.

use chime_common::{AssetId, AudioResult, Category, HandleRef};
use chime_kernel::AudioHost;
use chime_mixer::{AudioSystem, PlayOptions, PlaybackState};
use tracing::info;

/// What a playlist update did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistStep {
    /// The current track keeps playing.
    Playing,
    /// A track was started.
    Started(AssetId),
    /// The last track ended and the playlist does not loop.
    Finished,
}

/// An ordered list of music tracks.
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<AssetId>,
    position: Option<usize>,
    crossfade: f32,
    looping: bool,
    finished: bool,
}

impl Playlist {
    /// Create a playlist. `crossfade` is the overlap between tracks in seconds.
    pub fn new(tracks: Vec<AssetId>, crossfade: f32, looping: bool) -> Self {
        Self {
            tracks,
            position: None,
            crossfade: crossfade.max(0.0),
            looping,
            finished: false,
        }
    }

    /// Tracks in play order.
    pub fn tracks(&self) -> &[AssetId] {
        &self.tracks
    }

    /// Whether the playlist has run out of tracks.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Check the current track and start the next one if it is due.
    ///
    /// Call once per tick, after [`AudioSystem::update`].
    pub fn update<H: AudioHost>(&mut self, audio: &mut AudioSystem<H>) -> AudioResult<PlaylistStep> {
        if self.finished {
            return Ok(PlaylistStep::Finished);
        }
        let Some(index) = self.position else {
            if self.tracks.is_empty() {
                self.finished = true;
                return Ok(PlaylistStep::Finished);
            }
            return self.start(audio, 0, 0.0);
        };

        let asset = self.tracks[index].clone();
        let track = HandleRef::new(Category::Music, asset.clone());
        let playing = audio.is_playing(&track);
        let (duration, state) = audio
            .handle(&track)
            .map_or((0.0, PlaybackState::Stopped), |h| (h.duration(), h.state()));

        if state == PlaybackState::Paused || self.loops_single_track() {
            return Ok(PlaylistStep::Playing);
        }

        let overlap = self.crossfade.min(duration / 2.0);
        let remaining = duration - audio.elapsed(&track);
        if playing && remaining > overlap {
            return Ok(PlaylistStep::Playing);
        }

        match self.next_index(index) {
            Some(next) => self.start(audio, next, if playing { overlap } else { 0.0 }),
            None if playing => Ok(PlaylistStep::Playing),
            None => {
                info!("Playlist finished");
                self.finished = true;
                Ok(PlaylistStep::Finished)
            },
        }
    }

    fn next_index(&self, index: usize) -> Option<usize> {
        if index + 1 < self.tracks.len() {
            Some(index + 1)
        } else if self.looping {
            Some(0)
        } else {
            None
        }
    }

    fn loops_single_track(&self) -> bool {
        self.looping && self.tracks.len() == 1
    }

    fn start<H: AudioHost>(
        &mut self,
        audio: &mut AudioSystem<H>,
        index: usize,
        fade_in: f32,
    ) -> AudioResult<PlaylistStep> {
        let asset = self.tracks[index].clone();
        let options = PlayOptions::new()
            .with_fade_in(fade_in)
            .with_loop(self.loops_single_track());
        audio.play_music(asset.clone(), options)?;

        self.position = Some(index);
        info!(
            "Track {}/{}: {} (fade {:.1}s)",
            index + 1,
            self.tracks.len(),
            asset,
            fade_in
        );
        Ok(PlaylistStep::Started(asset))
    }
}
