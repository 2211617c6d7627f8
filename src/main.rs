pub mod anomaly;
pub mod config;
pub mod delivery;
pub mod input;
pub mod launcher;
pub mod scores;
pub mod watcher;

use std::io::Write;
use std::path::PathBuf;

use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::anomaly::SharedDetector;
use crate::config::BridgeConfig;
use crate::delivery::CollectorClient;
use crate::input::emitter::VirtualKeyboard;
use crate::input::receiver::ReceiverHandle;
use crate::launcher::GameLauncher;
use crate::scores::{EtracerParser, Game, NeverballParser, ScoreParser, SuperTuxParser};
use crate::watcher::WatcherHandle;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = BridgeConfig::load_or_default().await;
    let detector = SharedDetector::new();
    let cancel = CancellationToken::new();

    // Needs /dev/uinput access; without it the bridge degrades to
    // input-less operation.
    let keyboard = match VirtualKeyboard::open() {
        Ok(keyboard) => Some(keyboard),
        Err(e) => {
            error!(
                "Virtual keyboard unavailable: {} (root privileges required)",
                e
            );
            None
        }
    };

    let receiver = match ReceiverHandle::spawn(
        config.udp_port,
        config.thresholds,
        keyboard,
        detector.clone(),
        cancel.child_token(),
    ) {
        Ok(handle) => Some(handle),
        Err(e) => {
            // Poller and menu keep operating without controller input.
            error!("Controller input disabled: {}", e);
            None
        }
    };

    let client = CollectorClient::new(config.api_base_url.clone())?;
    let files: Vec<(PathBuf, Box<dyn ScoreParser>)> = vec![
        (
            config.neverball_scores.clone(),
            Box::new(NeverballParser::new()),
        ),
        (
            config.supertux_savegame.clone(),
            Box::new(SuperTuxParser::new(config.supertux_username_file.clone())),
        ),
        (
            config.etracer_highscore.clone(),
            Box::new(EtracerParser::new()),
        ),
    ];
    let watcher = WatcherHandle::spawn(files, client, detector.clone(), cancel.child_token());

    info!("Initial score file parse");
    watcher.parse_all().await;

    let launcher = GameLauncher::new(&config);
    menu_loop(&launcher, &watcher, &detector).await?;

    info!("Shutting down");
    cancel.cancel();
    if let Some(receiver) = receiver {
        receiver.join().await;
    }
    watcher.join().await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();
    Ok(())
}

fn print_menu() {
    println!();
    println!("=== NotPortable ===");
    println!(" [1] Neverball");
    println!(" [2] SuperTux");
    println!(" [3] Extreme Tux Racer");
    println!(" [4] Re-parse score files");
    println!(" [5] Motion detector status");
    println!(" [0] Quit");
}

fn print_detector_status(detector: &SharedDetector) {
    let status = detector.status();
    println!("Motion detector:");
    match status.baseline {
        Some(baseline) => {
            println!(
                "  baseline: pitch={:.1}°, roll={:.1}°",
                baseline.pitch, baseline.roll
            );
            println!(
                "  current:  pitch={:.1}°, roll={:.1}°",
                status.pitch, status.roll
            );
        }
        None => println!(
            "  calibrating: {}/{} samples",
            status.samples_collected,
            anomaly::CALIBRATION_SAMPLES
        ),
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{label}: ");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

/// Foreground loop. Blocks on user input, and on a running game subprocess,
/// while the receiver and watcher tasks run underneath.
async fn menu_loop(
    launcher: &GameLauncher,
    watcher: &WatcherHandle,
    detector: &SharedDetector,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu();

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = prompt(&mut lines, "Select") => line?,
        };
        // Stdin EOF: treat like quit.
        let Some(line) = line else { break };

        let game = match line.trim() {
            "" => continue,
            "0" => break,
            "1" => Game::Neverball,
            "2" => Game::SuperTux,
            "3" => Game::Etracer,
            "4" => {
                watcher.parse_all().await;
                continue;
            }
            "5" => {
                print_detector_status(detector);
                continue;
            }
            other => {
                println!("Unknown selection: {other}");
                continue;
            }
        };

        let Some(entered) = prompt(&mut lines, "Player name").await? else {
            break;
        };
        let username = match entered.trim() {
            "" => "Player",
            name => name,
        };
        launcher.launch(game, username).await;
    }

    Ok(())
}
