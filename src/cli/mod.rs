//! CLI argument parsing using clap 4.x derive macros

use std::path::PathBuf;

use clap::Parser;

use obs2vts_core::config::Overrides;

/// Fires VTube Studio animation hotkeys when OBS switches scenes
///
/// Connects to OBS (WebSocket 4.x) and VTube Studio, and maps every
/// scene transition to a hotkey via the `config.yml` lookup table.
/// Flags override the corresponding config file values.
#[derive(Parser, Debug)]
#[command(name = "obs2vts")]
#[command(author, about, long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
pub struct Cli {
    /// VTube Studio host
    #[arg(long)]
    pub vts_host: Option<String>,

    /// VTube Studio port
    #[arg(long)]
    pub vts_port: Option<u16>,

    /// OBS WebSocket host
    #[arg(long)]
    pub obs_host: Option<String>,

    /// OBS WebSocket port
    #[arg(long)]
    pub obs_port: Option<u16>,

    /// OBS WebSocket password
    #[arg(long)]
    pub obs_password: Option<String>,

    /// Path to the config file (created with defaults if missing)
    #[arg(long, default_value = "config.yml")]
    pub config: PathBuf,

    /// Log debug output to the console
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            vts_host: self.vts_host.clone(),
            vts_port: self.vts_port,
            obs_host: self.obs_host.clone(),
            obs_port: self.obs_port,
            obs_password: self.obs_password.clone(),
        }
    }
}
