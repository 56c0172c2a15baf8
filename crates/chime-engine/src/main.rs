//! # Chime
//!
//! Command-line player for the Chime audio system.
//!
//! Plays the given files in order as a music playlist over the default
//! output device, crossfading between tracks. Volume tiers, tick rate and
//! logging come from `chime.toml`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod playlist;

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use chime_kernel::{AudioHost, HostConfig, RodioHost};
use chime_mixer::AudioSystem;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ChimeConfig;
use crate::playlist::{Playlist, PlaylistStep};

/// Command line.
#[derive(Debug, Parser)]
#[command(name = "chime")]
#[command(version, about = "Play audio files as a crossfading playlist")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,

    /// Audio files to play, in order
    #[arg(required_unless_present = "save_config")]
    tracks: Vec<PathBuf>,
}

/// Install the tracing subscriber. `RUST_LOG` wins over `default_filter`.
fn init_tracing(default_filter: &str) -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in default_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("invalid log directive {directive:?}"))?,
        );
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    Ok(())
}

/// Tick the system at the configured rate until the playlist runs out.
fn run<H: AudioHost>(audio: &mut AudioSystem<H>, playlist: &mut Playlist, config: &ChimeConfig) -> Result<()> {
    let interval = config.tick_interval();
    let mut last = Instant::now();

    while !playlist.is_finished() {
        let now = Instant::now();
        audio.update(now.duration_since(last).as_secs_f32());
        last = now;

        if let PlaylistStep::Started(asset) = playlist.update(audio).context("playlist stopped")? {
            debug!("Now playing {asset}");
        }
        thread::sleep(interval);
    }
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(ChimeConfig::config_path);
    let config = ChimeConfig::load_from(&config_path);

    init_tracing(&config.log_filter)?;

    info!("Chime starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    if args.save_config {
        config
            .save_to(&config_path)
            .with_context(|| format!("failed to save config to {}", config_path.display()))?;
        if args.tracks.is_empty() {
            return Ok(());
        }
    }

    let mut host = RodioHost::new(HostConfig::default()).context("failed to open audio output")?;
    let tracks = args.tracks.iter().map(|path| host.register_path(path)).collect();

    let mut audio = AudioSystem::with_volumes(host, config.volumes);
    let mut playlist = Playlist::new(tracks, config.crossfade_secs, config.loop_playlist);
    info!("Queued {} tracks", playlist.tracks().len());

    run(&mut audio, &mut playlist, &config)?;

    info!("Chime shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tracks_and_config() {
        let args = Args::try_parse_from(["chime", "-c", "my.toml", "a.ogg", "b.mp3"])
            .expect("valid arguments");
        assert_eq!(args.config, Some(PathBuf::from("my.toml")));
        assert_eq!(args.tracks, vec![PathBuf::from("a.ogg"), PathBuf::from("b.mp3")]);
        assert!(!args.save_config);
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(Args::try_parse_from(["chime", "--shuffle", "a.ogg"]).is_err());
        assert!(Args::try_parse_from(["chime", "--config"]).is_err());
    }

    #[test]
    fn test_tracks_required_unless_saving_config() {
        assert!(Args::try_parse_from(["chime"]).is_err());

        let args = Args::try_parse_from(["chime", "--save-config"]).expect("saving needs no tracks");
        assert!(args.save_config);
        assert!(args.tracks.is_empty());
    }

    #[test]
    fn test_args_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
