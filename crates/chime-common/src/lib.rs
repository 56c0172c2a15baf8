//! # Chime Common
//!
//! Common types shared by every Chime crate:
//! - Asset identity (`AssetId`) and playback categories
//! - Handle references used to address cached sounds
//! - The error taxonomy and non-fatal transition warnings
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
