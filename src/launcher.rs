//! Game launching from the foreground menu.
//!
//! Launching blocks the menu until the game exits; the receiver and watcher
//! tasks keep running underneath and pick up the score file once the game
//! writes it.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::scores::Game;

pub struct GameLauncher {
    neverball_command: String,
    supertux_command: String,
    etracer_command: String,
    username_file: PathBuf,
}

impl GameLauncher {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            neverball_command: config.neverball_command.clone(),
            supertux_command: config.supertux_command.clone(),
            etracer_command: config.etracer_command.clone(),
            username_file: config.supertux_username_file.clone(),
        }
    }

    fn command_for(&self, game: Game) -> &str {
        match game {
            Game::Neverball => &self.neverball_command,
            Game::SuperTux => &self.supertux_command,
            Game::Etracer => &self.etracer_command,
        }
    }

    /// Runs the game and waits for it to exit. A missing binary is reported
    /// on the console and is not fatal.
    pub async fn launch(&self, game: Game, username: &str) {
        if game == Game::SuperTux {
            self.save_username(username).await;
        }

        println!("Starting {} (player: {})", game.title(), username);
        match Command::new(self.command_for(game)).status().await {
            Ok(status) => {
                info!("{} exited with {}", game.title(), status);
                println!("{} finished", game.title());
            }
            Err(e) => {
                println!(
                    "Could not start {} ({}): {}",
                    game.title(),
                    self.command_for(game),
                    e
                );
            }
        }
    }

    /// Side-channel write for the one game whose score file carries no
    /// username. Failure is ignored beyond a warning, as the parser falls
    /// back to a placeholder anyway.
    async fn save_username(&self, username: &str) {
        if let Err(e) = tokio::fs::write(&self.username_file, username).await {
            warn!("Could not persist SuperTux username: {}", e);
        }
    }
}
