//! Host backed by rodio.
//!
//! - `AudioDevice`: wrapper around rodio's output stream
//! - `RodioHost`: one `Sink` per playback resource, fed from decoded buffers
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       RodioHost                         │
//! │  ┌───────────────┐  ┌────────────────┐  ┌────────────┐  │
//! │  │  AudioDevice  │──│ SinkSlot[res#] │──│ClipLibrary │  │
//! │  │  (rodio)      │  │  (one per res) │  │ (decoded)  │  │
//! │  └───────────────┘  └────────────────┘  └────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Assets are registered by id with the file that backs them. The first
//! duration lookup or resource creation decodes the file into memory; later
//! duration lookups never decode again.
//!
//! # Example
//!
//! ```ignore
//! use chime_kernel::{AudioHost, RodioHost};
//!
//! let mut host = RodioHost::new_default()?;
//! host.register("theme", "assets/music/theme.mp3");
//! let res = host.create_resource(&"theme".into())?;
//! host.play(res);
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chime_common::{AssetId, AudioError, AudioResult};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, warn};

use crate::buffer_cache::{AudioBuffer, BufferCache, MAX_CACHEABLE_SIZE, MAX_CACHED_BUFFERS};
use crate::host::{AudioHost, HandleGenerator, ResourceHandle};

/// Rodio host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Maximum number of decoded buffers kept in memory.
    pub max_cached_buffers: usize,
    /// Largest decoded buffer (bytes) that is kept in memory.
    pub max_cacheable_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_cached_buffers: MAX_CACHED_BUFFERS,
            max_cacheable_size: MAX_CACHEABLE_SIZE,
        }
    }
}

impl HostConfig {
    /// Set the buffer count limit.
    #[must_use]
    pub const fn with_max_cached_buffers(mut self, max: usize) -> Self {
        self.max_cached_buffers = max;
        self
    }

    /// Set the per-buffer size limit.
    #[must_use]
    pub const fn with_max_cacheable_size(mut self, bytes: usize) -> Self {
        self.max_cacheable_size = bytes;
        self
    }
}

/// Wraps rodio's output stream for audio playback.
pub struct AudioDevice {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    handle: OutputStreamHandle,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice").finish_non_exhaustive()
    }
}

impl AudioDevice {
    /// Create a new audio device using the default output.
    pub fn new() -> AudioResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceInitFailed(e.to_string()))?;

        info!("Audio device initialized");

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Create a new sink for audio playback.
    pub fn create_sink(&self) -> Result<Sink, rodio::PlayError> {
        Sink::try_new(&self.handle)
    }
}

/// Registered asset files and what has been decoded from them.
///
/// Durations are remembered for every decoded asset. Buffers too large for
/// the cache are staged for the next resource instead, so preparing and then
/// playing a long track decodes it once.
#[derive(Debug)]
struct ClipLibrary {
    paths: HashMap<AssetId, PathBuf>,
    buffers: BufferCache,
    durations: HashMap<AssetId, f32>,
    staged: Option<(AssetId, AudioBuffer)>,
    decodes: usize,
}

impl ClipLibrary {
    fn new(config: &HostConfig) -> Self {
        Self {
            paths: HashMap::new(),
            buffers: BufferCache::new(config.max_cached_buffers, config.max_cacheable_size),
            durations: HashMap::new(),
            staged: None,
            decodes: 0,
        }
    }

    fn register(&mut self, asset: AssetId, path: PathBuf) {
        debug!("Registered {} -> {}", asset, path.display());
        self.paths.insert(asset, path);
    }

    fn duration(&mut self, asset: &AssetId) -> AudioResult<f32> {
        if let Some(&duration) = self.durations.get(asset) {
            return Ok(duration);
        }

        let buffer = self.decode(asset)?;
        let duration = buffer.duration_secs();
        if !self.buffers.insert(asset.clone(), buffer.clone()) {
            self.staged = Some((asset.clone(), buffer));
        }
        Ok(duration)
    }

    /// Samples for a new resource.
    fn buffer(&mut self, asset: &AssetId) -> AudioResult<AudioBuffer> {
        if let Some(buffer) = self.buffers.get(asset) {
            return Ok(buffer.clone());
        }
        if let Some((staged, buffer)) = self.staged.take() {
            if &staged == asset {
                return Ok(buffer);
            }
        }

        let buffer = self.decode(asset)?;
        self.buffers.insert(asset.clone(), buffer.clone());
        Ok(buffer)
    }

    fn decode(&mut self, asset: &AssetId) -> AudioResult<AudioBuffer> {
        let path = self
            .paths
            .get(asset)
            .ok_or_else(|| AudioError::unavailable(asset, "no file registered"))?;

        let file = File::open(path).map_err(|e| AudioError::unavailable(asset, e))?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| AudioError::unavailable(asset, e))?;

        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

        let buffer = AudioBuffer::new(samples, sample_rate, channels);
        self.decodes += 1;
        self.durations.insert(asset.clone(), buffer.duration_secs());
        debug!(
            "Decoded {} ({:.2}s, {} Hz, {} ch)",
            asset,
            buffer.duration_secs(),
            sample_rate,
            channels
        );
        Ok(buffer)
    }
}

/// Wall-clock play time, excluding pauses.
#[derive(Debug, Default, Clone, Copy)]
struct PlayClock {
    started: Option<Instant>,
    banked: Duration,
}

impl PlayClock {
    fn restart(&mut self) {
        self.started = Some(Instant::now());
        self.banked = Duration::ZERO;
    }

    fn hold(&mut self) {
        if let Some(started) = self.started.take() {
            self.banked += started.elapsed();
        }
    }

    fn release(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn elapsed(&self) -> Duration {
        self.banked + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

/// One playback resource: a sink plus the clip it plays.
struct SinkSlot {
    asset: AssetId,
    buffer: AudioBuffer,
    sink: Sink,
    volume: f32,
    looping: bool,
    clock: PlayClock,
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSlot")
            .field("asset", &self.asset)
            .field("volume", &self.volume)
            .field("looping", &self.looping)
            .finish_non_exhaustive()
    }
}

/// Audio host rendering through the default rodio output device.
#[derive(Debug)]
pub struct RodioHost {
    device: AudioDevice,
    library: ClipLibrary,
    resources: HashMap<ResourceHandle, SinkSlot>,
    handles: HandleGenerator,
}

impl RodioHost {
    /// Create a host with default configuration.
    pub fn new_default() -> AudioResult<Self> {
        Self::new(HostConfig::default())
    }

    /// Create a host with the given configuration.
    pub fn new(config: HostConfig) -> AudioResult<Self> {
        let device = AudioDevice::new()?;
        Ok(Self {
            device,
            library: ClipLibrary::new(&config),
            resources: HashMap::new(),
            handles: HandleGenerator::new(),
        })
    }

    /// Register the file backing an asset id.
    pub fn register(&mut self, asset: impl Into<AssetId>, path: impl Into<PathBuf>) {
        self.library.register(asset.into(), path.into());
    }

    /// Register a file under an id derived from its path.
    pub fn register_path(&mut self, path: impl AsRef<Path>) -> AssetId {
        let asset = AssetId::from_path(path.as_ref());
        self.register(asset.clone(), path.as_ref());
        asset
    }

    fn with_slot(&mut self, resource: ResourceHandle, f: impl FnOnce(&mut SinkSlot)) {
        if let Some(slot) = self.resources.get_mut(&resource) {
            f(slot);
        }
    }
}

impl AudioHost for RodioHost {
    fn duration(&mut self, asset: &AssetId) -> AudioResult<f32> {
        self.library.duration(asset)
    }

    fn create_resource(&mut self, asset: &AssetId) -> AudioResult<ResourceHandle> {
        let buffer = self.library.buffer(asset)?;
        let sink = self
            .device
            .create_sink()
            .map_err(|e| AudioError::unavailable(asset, e))?;

        let handle = self.handles.next();
        self.resources.insert(
            handle,
            SinkSlot {
                asset: asset.clone(),
                buffer,
                sink,
                volume: 1.0,
                looping: false,
                clock: PlayClock::default(),
            },
        );
        debug!("Created sink {} for {}", handle, asset);
        Ok(handle)
    }

    fn set_volume(&mut self, resource: ResourceHandle, volume: f32) {
        self.with_slot(resource, |slot| {
            slot.volume = volume.clamp(0.0, 1.0);
            slot.sink.set_volume(slot.volume);
        });
    }

    /// Takes effect on the next `play`; rodio cannot re-wrap a queued source.
    fn set_looping(&mut self, resource: ResourceHandle, looping: bool) {
        self.with_slot(resource, |slot| slot.looping = looping);
    }

    fn play(&mut self, resource: ResourceHandle) {
        let Some(slot) = self.resources.get_mut(&resource) else {
            return;
        };

        // A stopped sink cannot be restarted; start over on a fresh one.
        slot.sink.stop();
        match self.device.create_sink() {
            Ok(sink) => slot.sink = sink,
            Err(e) => {
                warn!("Failed to create sink for {}: {}", slot.asset, e);
                return;
            },
        }

        let source = rodio::buffer::SamplesBuffer::new(
            slot.buffer.channels,
            slot.buffer.sample_rate,
            (*slot.buffer.samples).clone(),
        );
        slot.sink.set_volume(slot.volume);
        if slot.looping {
            slot.sink.append(source.repeat_infinite());
        } else {
            slot.sink.append(source);
        }
        slot.sink.play();
        slot.clock.restart();
    }

    fn pause(&mut self, resource: ResourceHandle) {
        self.with_slot(resource, |slot| {
            slot.sink.pause();
            slot.clock.hold();
        });
    }

    fn resume(&mut self, resource: ResourceHandle) {
        self.with_slot(resource, |slot| {
            if slot.sink.is_paused() {
                slot.sink.play();
                slot.clock.release();
            }
        });
    }

    fn stop(&mut self, resource: ResourceHandle) {
        self.with_slot(resource, |slot| {
            slot.sink.stop();
            slot.clock.reset();
        });
    }

    fn is_playing(&self, resource: ResourceHandle) -> bool {
        self.resources
            .get(&resource)
            .is_some_and(|slot| !slot.sink.empty() && !slot.sink.is_paused())
    }

    fn elapsed(&self, resource: ResourceHandle) -> f32 {
        let Some(slot) = self.resources.get(&resource) else {
            return 0.0;
        };
        let elapsed = slot.clock.elapsed().as_secs_f32();
        let length = slot.buffer.duration_secs();
        if slot.looping && length > 0.0 {
            elapsed % length
        } else {
            elapsed.min(length)
        }
    }

    fn destroy(&mut self, resource: ResourceHandle) {
        if let Some(slot) = self.resources.remove(&resource) {
            slot.sink.stop();
            debug!("Destroyed sink {} for {}", resource, slot.asset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    // Note: the device itself needs audio hardware, so only the pieces around it are tested.

    #[test]
    fn test_host_config_builder() {
        let config = HostConfig::default()
            .with_max_cached_buffers(8)
            .with_max_cacheable_size(1024);
        assert_eq!(config.max_cached_buffers, 8);
        assert_eq!(config.max_cacheable_size, 1024);
    }

    /// Write a silent 16-bit mono WAV file.
    fn write_wav(path: &Path, sample_rate: u32, frames: u32) {
        let data_len = frames * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        std::fs::write(path, bytes).expect("Failed to write wav");
    }

    fn library_with_clip(config: &HostConfig) -> (TempDir, ClipLibrary, AssetId) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("theme.wav");
        // Half a second at 8 kHz: 16000 bytes once decoded to f32.
        write_wav(&path, 8000, 4000);

        let mut library = ClipLibrary::new(config);
        let asset = AssetId::new("theme");
        library.register(asset.clone(), path);
        (dir, library, asset)
    }

    #[test]
    fn test_large_clip_decodes_once_for_prepare_and_play() {
        let config = HostConfig::default().with_max_cacheable_size(1024);
        let (_dir, mut library, asset) = library_with_clip(&config);

        assert_relative_eq!(library.duration(&asset).expect("decodable"), 0.5);
        assert_relative_eq!(library.duration(&asset).expect("decodable"), 0.5);
        assert_eq!(library.decodes, 1);
        assert_eq!(library.buffers.count(), 0, "Clip is over the cacheable size");

        let buffer = library.buffer(&asset).expect("decodable");
        assert_eq!(buffer.samples.len(), 4000);
        assert_eq!(library.decodes, 1, "Staged samples feed the first resource");

        // Uncached, so a second resource decodes again; the duration does not.
        library.buffer(&asset).expect("decodable");
        library.duration(&asset).expect("decodable");
        assert_eq!(library.decodes, 2);
    }

    #[test]
    fn test_small_clip_is_cached() {
        let (_dir, mut library, asset) = library_with_clip(&HostConfig::default());

        library.duration(&asset).expect("decodable");
        library.buffer(&asset).expect("decodable");
        library.buffer(&asset).expect("decodable");
        assert_eq!(library.decodes, 1);
        assert_eq!(library.buffers.count(), 1);
        assert_eq!(library.buffers.total_size(), 16000);
    }

    #[test]
    fn test_unregistered_clip_is_unavailable() {
        let mut library = ClipLibrary::new(&HostConfig::default());
        let err = library.duration(&AssetId::new("ghost")).expect_err("nothing registered");
        assert!(matches!(err, AudioError::AssetUnavailable { .. }));
        assert_eq!(library.decodes, 0);
    }

    #[test]
    fn test_play_clock_excludes_pauses() {
        let mut clock = PlayClock::default();
        assert_eq!(clock.elapsed(), Duration::ZERO);

        clock.restart();
        clock.hold();
        let held = clock.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.elapsed(), held);

        clock.release();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed() > held);

        clock.reset();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
