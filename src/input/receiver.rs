//! UDP receiver loop: controller datagrams in, virtual key events out.
//!
//! Runs as a dedicated tokio task. The receive wait is bounded to a second
//! so the cancellation token is observed between packets; the timeout is a
//! stop-signal checkpoint, not a processing deadline.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::anomaly::SharedDetector;
use crate::input::emitter::VirtualKeyboard;
use crate::input::frame::ControllerFrame;
use crate::input::mapper::{AxisThresholds, KeyState};

const RECV_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ReceiverError {
    /// The only fatal condition in the input path. The caller logs it and
    /// keeps the rest of the system running without controller input.
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
}

/// Handle to the running receiver task.
pub struct ReceiverHandle {
    task: JoinHandle<()>,
}

impl ReceiverHandle {
    /// Binds the UDP port and spawns the receive loop. A `None` keyboard
    /// disables emission; decoding, mapping and detector updates continue
    /// regardless.
    pub fn spawn(
        port: u16,
        thresholds: AxisThresholds,
        keyboard: Option<VirtualKeyboard>,
        detector: SharedDetector,
        cancel: CancellationToken,
    ) -> Result<Self, ReceiverError> {
        let socket = std::net::UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .and_then(|socket| {
                socket.set_nonblocking(true)?;
                Ok(socket)
            })
            .map_err(|source| ReceiverError::Bind { port, source })?;

        info!("UDP port {} bound, waiting for controller packets", port);

        let task = tokio::spawn(async move {
            receive_loop(socket, thresholds, keyboard, detector, cancel).await;
        });

        Ok(Self { task })
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

async fn receive_loop(
    socket: std::net::UdpSocket,
    thresholds: AxisThresholds,
    mut keyboard: Option<VirtualKeyboard>,
    detector: SharedDetector,
    cancel: CancellationToken,
) {
    let socket = match UdpSocket::from_std(socket) {
        Ok(socket) => socket,
        Err(e) => {
            error!("Failed to register UDP socket with the runtime: {}", e);
            return;
        }
    };

    let mut buf = [0u8; 1024];

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio::time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf)) => result,
        };

        let (len, _addr) = match received {
            // Wait expired with no packet; go around and look at the token.
            Err(_elapsed) => continue,
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                warn!("Receive error: {}", e);
                continue;
            }
        };

        let Some(frame) = ControllerFrame::decode(&buf[..len]) else {
            continue;
        };

        detector.update(frame.pitch, frame.roll);

        let state = KeyState::from_frame(&frame, &thresholds);
        if let Some(keyboard) = keyboard.as_mut() {
            if let Err(e) = keyboard.apply(&state) {
                warn!("Failed to write key events: {}", e);
            }
        }
    }

    info!("Receiver loop stopped");
}
