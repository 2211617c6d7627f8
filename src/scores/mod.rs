//! Score-file parsing: one grammar per supported game, all producing
//! normalized [`PlayRecord`]s for the collector.

pub mod etracer;
pub mod neverball;
pub mod supertux;

pub use etracer::EtracerParser;
pub use neverball::NeverballParser;
pub use supertux::SuperTuxParser;

use serde::Serialize;

use crate::anomaly::SharedDetector;

/// The games whose score files we watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Game {
    Neverball,
    SuperTux,
    Etracer,
}

impl Game {
    /// Path segment of the collector endpoint (`POST <base>/<slug>/log`).
    pub fn slug(&self) -> &'static str {
        match self {
            Game::Neverball => "neverball",
            Game::SuperTux => "supertux",
            Game::Etracer => "etr",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Game::Neverball => "Neverball",
            Game::SuperTux => "SuperTux",
            Game::Etracer => "Extreme Tux Racer",
        }
    }
}

/// One normalized play record. Serialized as the collector's JSON body for
/// the matching game, hence the untagged representation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlayRecord {
    Neverball(NeverballRecord),
    SuperTux(SuperTuxRecord),
    Etracer(EtracerRecord),
}

impl PlayRecord {
    pub fn is_anomaly(&self) -> bool {
        match self {
            PlayRecord::Neverball(record) => record.is_anomaly,
            PlayRecord::SuperTux(record) => record.is_anomaly,
            PlayRecord::Etracer(record) => record.is_anomaly,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NeverballRecord {
    pub username: String,
    pub level: u32,
    /// The raw centisecond timer doubles as the ranking score.
    pub score: i64,
    pub coins: i64,
    /// "MM:SS"
    pub time: String,
    pub is_anomaly: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuperTuxRecord {
    pub username: String,
    /// Level file name with the `.stl` extension stripped.
    pub level: String,
    pub coins: i64,
    pub secrets: i64,
    /// Seconds, fractional.
    pub time: f64,
    pub is_anomaly: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EtracerRecord {
    pub username: String,
    pub course: String,
    pub score: i64,
    pub herring: i64,
    /// "MM:SS.ss"
    pub time: String,
    pub is_anomaly: bool,
}

/// One grammar per score-file format. Parsers are stateless apart from the
/// shared detector, which supplies the anomaly flag for each record found.
pub trait ScoreParser: Send + Sync {
    fn game(&self) -> Game;

    /// Extracts every record from the full file content. Malformed lines or
    /// blocks are skipped silently.
    fn parse(&self, content: &str, detector: &SharedDetector) -> Vec<PlayRecord>;
}
