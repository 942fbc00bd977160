//! Command side of the scanner.
//!
//! The controller task owns the session. Commands arrive over a bounded
//! channel; events leave over the session's own channel. Dropping every
//! [`ScanHandle`] stops any running scan and shuts the controller down,
//! which in turn closes the event channel.
//!
//! A stop takes effect at the next pass of the running scan, so a start sent
//! right after a stop is held until that run returns.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ScanError;
use crate::feed::{Clock, Feed};
use crate::scan::{ScanFlag, ScanMode, ScanSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanCommand {
    StartFullScan,
    StartQuickScan,
    StopScan,
}

/// Cloneable sender for scan commands.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    commands: mpsc::Sender<ScanCommand>,
    flag: ScanFlag,
}

impl ScanHandle {
    pub async fn send(&self, command: ScanCommand) -> Result<(), ScanError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ScanError::ControllerClosed)
    }

    pub fn is_scanning(&self) -> bool {
        self.flag.is_scanning()
    }
}

/// Move `session` onto its own task and return the handle that drives it.
pub fn spawn_controller<F, C>(session: ScanSession<F, C>) -> (ScanHandle, JoinHandle<()>)
where
    F: Feed + 'static,
    C: Clock + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let handle = ScanHandle {
        commands: tx,
        flag: session.stop_handle(),
    };
    let task = tokio::spawn(run_controller(session, rx));
    (handle, task)
}

fn start_mode(command: ScanCommand) -> Option<ScanMode> {
    match command {
        ScanCommand::StartFullScan => Some(ScanMode::Full),
        ScanCommand::StartQuickScan => Some(ScanMode::Quick),
        ScanCommand::StopScan => None,
    }
}

/// A start received while a run is still active is ignored, unless that run
/// has already been asked to stop. Then the last such start is kept and run
/// as soon as the stopping run returns; a later stop discards it.
async fn run_controller<F, C>(mut session: ScanSession<F, C>, mut commands: mpsc::Receiver<ScanCommand>)
where
    F: Feed,
    C: Clock,
{
    let stop = session.stop_handle();
    let mut pending: Option<ScanMode> = None;

    loop {
        let mode = match pending.take() {
            Some(mode) => mode,
            None => match commands.recv().await {
                Some(command) => match start_mode(command) {
                    Some(mode) => mode,
                    None => {
                        debug!("stop requested while idle");
                        continue;
                    }
                },
                None => break,
            },
        };

        let mut closed = false;
        let run = session.run(mode);
        tokio::pin!(run);
        loop {
            tokio::select! {
                outcome = &mut run => {
                    debug!(?outcome, "scan run finished");
                    break;
                }
                command = commands.recv(), if !closed => match command {
                    Some(ScanCommand::StopScan) => {
                        stop.request_stop();
                        pending = None;
                    }
                    Some(other) if !stop.is_scanning() => {
                        debug!(command = ?other, "scan stopping, queued to run next");
                        pending = start_mode(other);
                    }
                    Some(other) => debug!(command = ?other, "scan already in progress, ignoring"),
                    None => {
                        stop.request_stop();
                        pending = None;
                        closed = true;
                    }
                },
            }
        }

        if closed {
            break;
        }
    }

    info!("scan controller shut down");
}
