//! Background parsing worker
//!
//! One [`ParsingTask`] runs per import session. The controller sends it a
//! [`WorkerCommand::StartImport`]; the worker answers with
//! [`WorkerEvent::Started`] straight away, decodes the file on the blocking
//! pool, and finishes with exactly one terminal event: `Finished` with the
//! parsed records, or `Failed` with the reason decoding broke.
//!
//! The worker owns nothing the controller uses; the two sides only exchange
//! owned messages.

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::coerce::records_from_grid;
use super::decode::decode;
use super::intake::IntakeFile;
use super::record::DraftRecord;

/// Message from the controller to the worker
#[derive(Debug)]
pub enum WorkerCommand {
    StartImport { file: IntakeFile },
}

/// Message from the worker to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Import request received, parsing is underway
    Started,
    /// Parsing completed; the records replace the current set
    Finished { records: Vec<DraftRecord> },
    /// Parsing failed; distinct from a file with zero data rows
    Failed { reason: String },
}

impl WorkerEvent {
    /// Whether this event ends an import
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Started)
    }
}

/// Error returned when the worker can no longer take commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerGone;

impl std::fmt::Display for WorkerGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parsing worker has stopped")
    }
}

impl std::error::Error for WorkerGone {}

/// Handle to a running parsing worker
///
/// Dropping the handle aborts the worker; an in-flight decode still finishes
/// on the blocking pool but its result is discarded.
pub struct ParsingTask {
    commands: mpsc::Sender<WorkerCommand>,
    events: mpsc::Receiver<WorkerEvent>,
    handle: JoinHandle<()>,
}

impl ParsingTask {
    /// Spawn a worker on the current tokio runtime
    pub fn spawn() -> Self {
        let (command_tx, command_rx) = mpsc::channel(1);
        let (event_tx, event_rx) = mpsc::channel(8);
        let handle = tokio::spawn(run_worker(command_rx, event_tx));

        log::debug!("Spawned parsing worker");

        Self {
            commands: command_tx,
            events: event_rx,
            handle,
        }
    }

    /// Ask the worker to parse a file
    pub fn start_import(&self, file: IntakeFile) -> Result<(), WorkerGone> {
        self.commands
            .try_send(WorkerCommand::StartImport { file })
            .map_err(|_| WorkerGone)
    }

    /// Wait for the next event; `None` once the worker has stopped
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_next_event(&mut self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the worker, discarding any in-flight parse
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for ParsingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_worker(
    mut commands: mpsc::Receiver<WorkerCommand>,
    events: mpsc::Sender<WorkerEvent>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WorkerCommand::StartImport { file } => {
                if events.send(WorkerEvent::Started).await.is_err() {
                    break;
                }

                let name = file.name.clone();
                let outcome = tokio::task::spawn_blocking(move || parse_spreadsheet(&file)).await;

                let event = match outcome {
                    Ok(Ok(records)) => {
                        log::info!("Parsed {} record(s) from {}", records.len(), name);
                        WorkerEvent::Finished { records }
                    }
                    Ok(Err(e)) => {
                        log::error!("Import of {} failed: {:#}", name, e);
                        WorkerEvent::Failed {
                            reason: format!("{:#}", e),
                        }
                    }
                    Err(e) => {
                        log::error!("Parsing task for {} panicked: {}", name, e);
                        WorkerEvent::Failed {
                            reason: "parsing task panicked".to_string(),
                        }
                    }
                };

                if events.send(event).await.is_err() {
                    break;
                }
            }
        }
    }

    log::debug!("Parsing worker stopped");
}

/// Decode a file and map its rows to draft records
///
/// This is the blocking body of the worker, also usable directly.
pub fn parse_spreadsheet(file: &IntakeFile) -> Result<Vec<DraftRecord>> {
    let grid = decode(file)?;
    log::debug!(
        "Decoded {} with {} row(s) including header",
        file.name,
        grid.rows().len()
    );
    Ok(records_from_grid(&grid))
}
