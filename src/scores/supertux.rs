//! SuperTux savegame grammar.
//!
//! The savegame is nested parenthesized text (s-expressions). One block per
//! finished level carries the statistics we need. The savegame has no
//! player name, so the username comes from a small side-channel file the
//! launcher writes when the game is started.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::anomaly::SharedDetector;
use crate::scores::{Game, PlayRecord, ScoreParser, SuperTuxRecord};

static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\("([^"]+\.stl)"\s+\(perfect\s+[^)]+\)\s+\("statistics"[^)]+\(coins-collected\s+(\d+)\)[^)]+\(secrets-found\s+(\d+)\)[^)]+\(time-needed\s+([\d.]+)\)"#,
    )
    .expect("valid level block regex")
});

/// Fallback when the side-channel file is absent or empty.
pub const DEFAULT_USERNAME: &str = "Player";

#[derive(Debug)]
pub struct SuperTuxParser {
    username_file: PathBuf,
}

impl SuperTuxParser {
    pub fn new(username_file: impl Into<PathBuf>) -> Self {
        Self {
            username_file: username_file.into(),
        }
    }

    /// Name of the last launched player, or the placeholder.
    fn read_username(&self) -> String {
        match std::fs::read_to_string(&self.username_file) {
            Ok(content) => {
                let name = content.trim();
                if name.is_empty() {
                    DEFAULT_USERNAME.to_string()
                } else {
                    name.to_string()
                }
            }
            Err(_) => DEFAULT_USERNAME.to_string(),
        }
    }
}

impl ScoreParser for SuperTuxParser {
    fn game(&self) -> Game {
        Game::SuperTux
    }

    fn parse(&self, content: &str, detector: &SharedDetector) -> Vec<PlayRecord> {
        let username = self.read_username();
        let mut records = Vec::new();

        for caps in LEVEL_RE.captures_iter(content) {
            let level_file = &caps[1];
            let Ok(coins) = caps[2].parse::<i64>() else {
                continue;
            };
            let Ok(secrets) = caps[3].parse::<i64>() else {
                continue;
            };
            let Ok(time) = caps[4].parse::<f64>() else {
                continue;
            };

            let level = level_file
                .strip_suffix(".stl")
                .unwrap_or(level_file)
                .to_string();

            let is_anomaly = detector.check_anomaly();
            records.push(PlayRecord::SuperTux(SuperTuxRecord {
                username: username.clone(),
                level,
                coins,
                secrets,
                time,
                is_anomaly,
            }));
        }

        records
    }
}
