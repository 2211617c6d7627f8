//! Extreme Tux Racer highscore grammar.
//!
//! Line-oriented; a line is a record only when all five bracket tags are
//! present: `[course]`, `[plyr]`, `[pts]`, `[herr]`, `[time]`. The file
//! also carries header and structural lines that match none of them.

use std::sync::LazyLock;

use regex::Regex;

use crate::anomaly::SharedDetector;
use crate::scores::{EtracerRecord, Game, PlayRecord, ScoreParser};

static COURSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[course\]\s+(\S+)").expect("valid course regex"));
static PLYR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[plyr\]\s+(\S+)").expect("valid player regex"));
static PTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[pts\]\s+(\d+)").expect("valid points regex"));
static HERR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[herr\]\s+(\d+)").expect("valid herring regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[time\]\s+([\d.]+)").expect("valid time regex"));

#[derive(Debug, Default)]
pub struct EtracerParser;

impl EtracerParser {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreParser for EtracerParser {
    fn game(&self) -> Game {
        Game::Etracer
    }

    fn parse(&self, content: &str, detector: &SharedDetector) -> Vec<PlayRecord> {
        let mut records = Vec::new();

        for line in content.lines() {
            let (Some(course), Some(player), Some(points), Some(herring), Some(time)) = (
                COURSE_RE.captures(line),
                PLYR_RE.captures(line),
                PTS_RE.captures(line),
                HERR_RE.captures(line),
                TIME_RE.captures(line),
            ) else {
                continue;
            };

            let Ok(score) = points[1].parse::<i64>() else {
                continue;
            };
            let Ok(herring) = herring[1].parse::<i64>() else {
                continue;
            };
            let Ok(time_secs) = time[1].parse::<f64>() else {
                continue;
            };

            let is_anomaly = detector.check_anomaly();
            records.push(PlayRecord::Etracer(EtracerRecord {
                username: player[1].to_string(),
                course: course[1].replace('_', " "),
                score,
                herring,
                time: format_time(time_secs),
                is_anomaly,
            }));
        }

        records
    }
}

/// Fractional seconds to "MM:SS.ss".
fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as i64;
    let remainder = seconds % 60.0;
    format!("{minutes:02}:{remainder:05.2}")
}
