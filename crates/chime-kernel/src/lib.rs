//! # Chime Kernel
//!
//! Host audio primitives for Chime.
//!
//! This crate is the boundary between the mixer and whatever actually renders
//! samples:
//! - [`AudioHost`]: the contract the mixer drives (create, play, pause,
//!   resume, stop, volume, loop, elapsed, destroy)
//! - [`RodioHost`]: renders through rodio's default output device, decoding
//!   registered files into cached sample buffers
//! - [`MemoryHost`]: a deterministic virtual host on a manual clock, for tests
//!   and dry runs

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod buffer_cache;
pub mod host;
pub mod memory_host;
pub mod rodio_host;

pub use buffer_cache::{AudioBuffer, BufferCache, MAX_CACHEABLE_SIZE, MAX_CACHED_BUFFERS};
pub use host::{AudioHost, HandleGenerator, ResourceHandle};
pub use memory_host::{MemoryHost, ResourceState};
pub use rodio_host::{AudioDevice, HostConfig, RodioHost};
