//! Polls the score files and pushes changed ones through parse + delivery.
//!
//! No inotify here: the games rewrite their score files wholesale, so a
//! coarse mtime comparison every ten seconds is enough. A changed file is
//! always re-parsed in full; the Neverball parser deduplicates within a
//! pass and the collector deduplicates across passes.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::anomaly::SharedDetector;
use crate::delivery::CollectorClient;
use crate::scores::ScoreParser;

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

enum WatcherCommand {
    ParseAll,
}

struct WatchedFile {
    path: PathBuf,
    parser: Box<dyn ScoreParser>,
    /// Advances only after a successful read-and-parse pass.
    last_modified: SystemTime,
}

/// Handle to the running watcher task.
pub struct WatcherHandle {
    commands: mpsc::Sender<WatcherCommand>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Records the current mtime of every watched path (epoch for absent
    /// files, so they parse as soon as they appear) and spawns the poll
    /// loop.
    pub fn spawn(
        files: Vec<(PathBuf, Box<dyn ScoreParser>)>,
        client: CollectorClient,
        detector: SharedDetector,
        cancel: CancellationToken,
    ) -> Self {
        let mut watcher = LogWatcher::new(files, client, detector);
        let (commands, command_rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            watcher.run(command_rx, cancel).await;
        });

        info!(
            "Score file watcher started ({}s interval)",
            POLL_INTERVAL.as_secs()
        );
        Self { commands, task }
    }

    /// Requests a full re-parse of every score file, ignoring mtimes.
    pub async fn parse_all(&self) {
        if self.commands.send(WatcherCommand::ParseAll).await.is_err() {
            warn!("Watcher task is gone; manual parse ignored");
        }
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

struct LogWatcher {
    files: Vec<WatchedFile>,
    client: CollectorClient,
    detector: SharedDetector,
}

impl LogWatcher {
    fn new(
        files: Vec<(PathBuf, Box<dyn ScoreParser>)>,
        client: CollectorClient,
        detector: SharedDetector,
    ) -> Self {
        let files = files
            .into_iter()
            .map(|(path, parser)| {
                let last_modified =
                    modification_time(&path).unwrap_or(SystemTime::UNIX_EPOCH);
                WatchedFile {
                    path,
                    parser,
                    last_modified,
                }
            })
            .collect();
        Self {
            files,
            client,
            detector,
        }
    }

    async fn run(&mut self, mut commands: mpsc::Receiver<WatcherCommand>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.poll_once().await,
                command = commands.recv() => match command {
                    Some(WatcherCommand::ParseAll) => self.parse_all().await,
                    None => break,
                },
            }
        }

        info!("Watcher loop stopped");
    }

    /// One poll pass: re-parse every file whose mtime moved forward.
    async fn poll_once(&mut self) {
        for file in &mut self.files {
            // Absent file: no data this cycle.
            let Some(modified) = modification_time(&file.path) else {
                continue;
            };
            if modified <= file.last_modified {
                continue;
            }

            let game = file.parser.game();
            debug!("[{}] score file changed", game.slug());

            let content = match tokio::fs::read(&file.path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(
                        "[{}] failed to read {}: {}",
                        game.slug(),
                        file.path.display(),
                        e
                    );
                    continue;
                }
            };
            file.last_modified = modified;

            let records = file.parser.parse(&content, &self.detector);
            if records.is_empty() {
                continue;
            }
            info!("[{}] {} records found", game.slug(), records.len());
            self.client.send_batch(game, &records).await;
        }
    }

    /// Manual full pass over every file regardless of mtimes. Stored mtimes
    /// are left untouched; the collector absorbs the resulting duplicates.
    async fn parse_all(&self) {
        info!("Re-parsing all score files");
        for file in &self.files {
            let Ok(bytes) = tokio::fs::read(&file.path).await else {
                continue;
            };
            let content = String::from_utf8_lossy(&bytes);
            let records = file.parser.parse(&content, &self.detector);
            if !records.is_empty() {
                self.client.send_batch(file.parser.game(), &records).await;
            }
        }
    }
}

fn modification_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::NeverballParser;
    use std::io::Write;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collector_expecting(expected_posts: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/neverball/log"))
            .respond_with(ResponseTemplate::new(200))
            .expect(expected_posts)
            .mount(&server)
            .await;
        server
    }

    fn append_line(path: &Path, line: &str) {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .unwrap();
        writeln!(file, "{line}").unwrap();
        // Make sure the mtime moves even on coarse filesystem clocks.
        let later = SystemTime::now() + Duration::from_secs(2);
        file.set_modified(later).unwrap();
    }

    #[tokio::test]
    async fn new_line_between_polls_is_delivered_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let scores = dir.path().join("easy.txt");
        std::fs::write(&scores, "500 10 Easy\n").unwrap();

        let server = collector_expecting(1).await;
        let client = CollectorClient::new(server.uri()).unwrap();

        let mut watcher = LogWatcher::new(
            vec![(
                scores.clone(),
                Box::new(NeverballParser::new()) as Box<dyn ScoreParser>,
            )],
            client,
            SharedDetector::new(),
        );

        // Nothing has changed since startup.
        watcher.poll_once().await;

        append_line(&scores, "1234 56 alice");
        watcher.poll_once().await;

        // Unchanged file on the following cycle: zero records.
        watcher.poll_once().await;

        server.verify().await;
    }

    #[tokio::test]
    async fn absent_file_is_no_data_until_it_appears() {
        let dir = tempfile::tempdir().unwrap();
        let scores = dir.path().join("easy.txt");

        let server = collector_expecting(1).await;
        let client = CollectorClient::new(server.uri()).unwrap();

        let mut watcher = LogWatcher::new(
            vec![(
                scores.clone(),
                Box::new(NeverballParser::new()) as Box<dyn ScoreParser>,
            )],
            client,
            SharedDetector::new(),
        );

        watcher.poll_once().await;

        std::fs::write(&scores, "800 40 bob\n").unwrap();
        watcher.poll_once().await;

        server.verify().await;
    }

    #[tokio::test]
    async fn manual_parse_all_does_not_advance_mtimes() {
        let dir = tempfile::tempdir().unwrap();
        let scores = dir.path().join("easy.txt");

        let server = collector_expecting(2).await;
        let client = CollectorClient::new(server.uri()).unwrap();

        let mut watcher = LogWatcher::new(
            vec![(
                scores.clone(),
                Box::new(NeverballParser::new()) as Box<dyn ScoreParser>,
            )],
            client,
            SharedDetector::new(),
        );

        append_line_new(&scores, "900 5 carol");
        watcher.parse_all().await;
        // The changed file must still be picked up by the next poll.
        watcher.poll_once().await;

        server.verify().await;
    }

    fn append_line_new(path: &Path, line: &str) {
        std::fs::write(path, format!("{line}\n")).unwrap();
        let later = SystemTime::now() + Duration::from_secs(2);
        let file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.set_modified(later).unwrap();
    }
}
