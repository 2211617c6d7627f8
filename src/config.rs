//! On-disk configuration for the bridge.
//!
//! A single TOML file under `~/.config/notportable/`. Missing or broken
//! configuration is never fatal; the defaults mirror the stock install
//! paths of the three games.

use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::input::mapper::AxisThresholds;

const CONFIG_DIR: &str = ".config/notportable";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// UDP port the controller transmits to.
    pub udp_port: u16,
    /// Base URL of the collector API.
    pub api_base_url: String,

    pub thresholds: AxisThresholds,

    /// Score file locations, one fixed read-only path per game.
    pub neverball_scores: PathBuf,
    pub supertux_savegame: PathBuf,
    pub etracer_highscore: PathBuf,

    /// Side-channel file carrying the last launched SuperTux player name.
    pub supertux_username_file: PathBuf,

    pub neverball_command: String,
    pub supertux_command: String,
    pub etracer_command: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            udp_port: 4200,
            api_base_url: "http://localhost:8000/api".to_string(),
            thresholds: AxisThresholds::default(),
            neverball_scores: home.join(".neverball/Scores/easy.txt"),
            supertux_savegame: home.join(".local/share/supertux2/profile1/world1.stsg"),
            etracer_highscore: home.join(".config/etr/highscore"),
            supertux_username_file: PathBuf::from("/tmp/supertux_username.txt"),
            neverball_command: "/usr/games/neverball".to_string(),
            supertux_command: "/usr/games/supertux2".to_string(),
            etracer_command: "/usr/games/etracer".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Loads the configuration, writing a default file on first run. Any
    /// problem falls back to defaults with a warning.
    pub async fn load_or_default() -> Self {
        let path = config_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Configuration loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Invalid config file {}: {} (using defaults)",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                let config = Self::default();
                if let Err(e) = config.write_to(&path).await {
                    warn!("Could not write default config: {}", e);
                } else {
                    info!("Default configuration written to {}", path.display());
                }
                config
            }
        }
    }

    async fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;
        Ok(())
    }
}

fn config_path() -> PathBuf {
    home_dir().join(CONFIG_DIR).join(CONFIG_FILE)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
