//! Neverball high-score file grammar.
//!
//! Each line is `<time_centis> <coins> <username>`. The file also carries
//! difficulty placeholder rows whose "username" is the difficulty name;
//! those are not play records.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::anomaly::SharedDetector;
use crate::scores::{Game, NeverballRecord, PlayRecord, ScoreParser};

static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(\d+)\s+(\S+)$").expect("valid score line regex"));

/// Placeholder usernames the game writes for its difficulty presets.
const RESERVED_NAMES: [&str; 3] = ["Hard", "Medium", "Easy"];

#[derive(Debug, Default)]
pub struct NeverballParser;

impl NeverballParser {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreParser for NeverballParser {
    fn game(&self) -> Game {
        Game::Neverball
    }

    fn parse(&self, content: &str, detector: &SharedDetector) -> Vec<PlayRecord> {
        let mut records = Vec::new();
        // The game rewrites the whole table, so the same run shows up on
        // several lines; deduplicate within this pass.
        let mut seen: HashSet<(String, i64, i64)> = HashSet::new();

        for line in content.lines() {
            let Some(caps) = LINE_RE.captures(line.trim()) else {
                continue;
            };
            let Ok(time_centis) = caps[1].parse::<i64>() else {
                continue;
            };
            let Ok(coins) = caps[2].parse::<i64>() else {
                continue;
            };
            let username = &caps[3];

            if RESERVED_NAMES.contains(&username) {
                continue;
            }
            if !seen.insert((username.to_string(), time_centis, coins)) {
                continue;
            }

            let is_anomaly = detector.check_anomaly();
            records.push(PlayRecord::Neverball(NeverballRecord {
                username: username.to_string(),
                level: 1,
                score: time_centis,
                coins,
                time: format_time(time_centis),
                is_anomaly,
            }));
        }

        records
    }
}

/// Centisecond timer value to "MM:SS".
fn format_time(centis: i64) -> String {
    let total_secs = centis / 100;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<PlayRecord> {
        NeverballParser::new().parse(content, &SharedDetector::new())
    }

    fn unwrap_neverball(record: &PlayRecord) -> &NeverballRecord {
        match record {
            PlayRecord::Neverball(record) => record,
            other => panic!("expected a Neverball record, got {other:?}"),
        }
    }

    #[test]
    fn duplicated_line_yields_one_record() {
        let records = parse("1234 56 alice\n1234 56 alice\n");
        assert_eq!(records.len(), 1);
        let record = unwrap_neverball(&records[0]);
        assert_eq!(record.username, "alice");
        assert_eq!(record.score, 1234);
        assert_eq!(record.coins, 56);
        assert_eq!(record.time, "00:12");
    }

    #[test]
    fn reserved_placeholder_names_are_skipped() {
        let records = parse("500 10 Easy\n600 20 Medium\n700 30 Hard\n800 40 bob\n");
        assert_eq!(records.len(), 1);
        assert_eq!(unwrap_neverball(&records[0]).username, "bob");
    }

    #[test]
    fn malformed_lines_are_skipped_silently() {
        let records = parse("not a score\n1234 56\n-5 1 carol\n9000 75 dave\n");
        assert_eq!(records.len(), 1);
        assert_eq!(unwrap_neverball(&records[0]).username, "dave");
    }

    #[test]
    fn same_user_with_different_runs_is_kept() {
        let records = parse("1234 56 alice\n1235 56 alice\n1234 57 alice\n");
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn time_formatting_rolls_minutes() {
        let records = parse("6100 0 eve\n");
        assert_eq!(unwrap_neverball(&records[0]).time, "01:01");
    }
}
