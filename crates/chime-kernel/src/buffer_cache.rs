//! Decoded sample buffers, cached per asset.
//!
//! Short clips are decoded once and replayed from memory. Buffers larger
//! than the cacheable size are still handed back to the caller but not kept.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chime_common::AssetId;
use tracing::{debug, warn};

/// Maximum number of cached audio buffers.
pub const MAX_CACHED_BUFFERS: usize = 256;

/// Maximum buffer size for caching in bytes.
pub const MAX_CACHEABLE_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Decoded audio samples for quick playback.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Audio sample data (interleaved f32).
    pub samples: Arc<Vec<f32>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Duration of the audio.
    pub duration: Duration,
}

impl AudioBuffer {
    /// Create a new audio buffer from samples.
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        let duration = if sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
        };

        Self {
            samples: Arc::new(samples),
            sample_rate,
            channels,
            duration,
        }
    }

    /// Get the size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }

    /// Get the duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        self.duration.as_secs_f32()
    }
}

/// Audio buffer cache keyed by asset.
#[derive(Debug)]
pub struct BufferCache {
    buffers: HashMap<AssetId, AudioBuffer>,
    max_buffers: usize,
    max_buffer_size: usize,
    total_size: usize,
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new(MAX_CACHED_BUFFERS, MAX_CACHEABLE_SIZE)
    }
}

impl BufferCache {
    /// Create a new buffer cache with the given limits.
    #[must_use]
    pub fn new(max_buffers: usize, max_buffer_size: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            max_buffers,
            max_buffer_size,
            total_size: 0,
        }
    }

    /// Get a cached buffer.
    #[must_use]
    pub fn get(&self, asset: &AssetId) -> Option<&AudioBuffer> {
        self.buffers.get(asset)
    }

    /// Cache a buffer. Returns `false` when the buffer was not kept.
    pub fn insert(&mut self, asset: AssetId, buffer: AudioBuffer) -> bool {
        if buffer.size_bytes() > self.max_buffer_size {
            debug!(
                "Not caching {} ({} bytes exceeds {})",
                asset,
                buffer.size_bytes(),
                self.max_buffer_size
            );
            return false;
        }

        if !self.buffers.contains_key(&asset) && self.buffers.len() >= self.max_buffers {
            warn!("Audio buffer cache full");
            return false;
        }

        self.total_size += buffer.size_bytes();
        if let Some(old) = self.buffers.insert(asset.clone(), buffer) {
            self.total_size -= old.size_bytes();
        }

        debug!("Cached audio buffer for {}", asset);
        true
    }

    /// Get total cached size in bytes.
    #[must_use]
    pub const fn total_size(&self) -> usize {
        self.total_size
    }

    /// Get number of cached buffers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.buffers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_audio_buffer_duration() {
        // One second of stereo at 100 Hz.
        let buffer = AudioBuffer::new(vec![0.0; 200], 100, 2);
        assert_relative_eq!(buffer.duration_secs(), 1.0);
        assert_eq!(buffer.size_bytes(), 800);
    }

    #[test]
    fn test_zero_sample_rate_has_no_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 16], 0, 1);
        assert_eq!(buffer.duration, Duration::ZERO);
    }

    #[test]
    fn test_buffer_cache_tracks_size() {
        let mut cache = BufferCache::default();
        let id = AssetId::new("click");
        assert!(cache.insert(id.clone(), AudioBuffer::new(vec![0.0; 10], 10, 1)));
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.total_size(), 40);

        // Replacing the entry must not double count.
        assert!(cache.insert(id.clone(), AudioBuffer::new(vec![0.0; 5], 10, 1)));
        assert_eq!(cache.total_size(), 20);
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_buffer_cache_limits() {
        let mut cache = BufferCache::new(1, 64);
        assert!(!cache.insert(AssetId::new("huge"), AudioBuffer::new(vec![0.0; 64], 10, 1)));
        assert!(cache.insert(AssetId::new("a"), AudioBuffer::new(vec![0.0; 4], 10, 1)));
        assert!(!cache.insert(AssetId::new("b"), AudioBuffer::new(vec![0.0; 4], 10, 1)));
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.total_size(), 16);
    }
}
