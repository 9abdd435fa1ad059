//! Ingestion controller
//!
//! Owns the import session and its parsing worker. Files are validated here
//! synchronously; only valid files are dispatched. Worker events are applied
//! in order: `Started` marks the session busy, a terminal event replaces (or
//! clears) the record set and releases the busy flag.

use uuid::Uuid;

use super::intake::{FileValidationError, IntakeFile, validate};
use super::worker::{ParsingTask, WorkerEvent, WorkerGone};
use crate::config::IntakeConfig;
use crate::review::{DeleteOutcome, ReviewError, ReviewGrid};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Parsing,
    Done,
    Error(String),
}

/// What is known about the file behind the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileInfo {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<&IntakeFile> for SourceFileInfo {
    fn from(file: &IntakeFile) -> Self {
        Self {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    pub source_file: Option<SourceFileInfo>,
    pub status: SessionStatus,
    pub grid: ReviewGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    /// No session is open
    NotOpen,
    /// An import is already in flight
    Busy,
    /// No import is in flight and none has completed
    Idle,
    Validation(FileValidationError),
    /// The worker stopped before answering
    WorkerGone,
    /// The worker reported a parse failure
    Failed(String),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::NotOpen => write!(f, "no import session is open"),
            ImportError::Busy => write!(f, "an import is already in progress"),
            ImportError::Idle => write!(f, "no import is in progress"),
            ImportError::Validation(e) => write!(f, "file rejected: {}", e),
            ImportError::WorkerGone => write!(f, "parsing worker has stopped"),
            ImportError::Failed(reason) => write!(f, "import failed: {}", reason),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<FileValidationError> for ImportError {
    fn from(e: FileValidationError) -> Self {
        ImportError::Validation(e)
    }
}

impl From<WorkerGone> for ImportError {
    fn from(_: WorkerGone) -> Self {
        ImportError::WorkerGone
    }
}

pub struct IngestionController {
    config: IntakeConfig,
    session: Option<ImportSession>,
    task: Option<ParsingTask>,
    busy: bool,
}

impl IngestionController {
    pub fn new(config: IntakeConfig) -> Self {
        Self {
            config,
            session: None,
            task: None,
            busy: false,
        }
    }

    /// Start a fresh session with its own worker
    ///
    /// Any previous session and worker are discarded. Must be called from
    /// within a tokio runtime.
    pub fn open(&mut self) {
        self.close();
        self.session = Some(ImportSession::default());
        self.task = Some(ParsingTask::spawn());
        log::debug!("Import session opened");
    }

    /// Abort the worker and discard the session
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.shutdown();
        }
        if self.session.take().is_some() {
            log::debug!("Import session closed");
        }
        self.busy = false;
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn session(&self) -> Option<&ImportSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> Option<&SessionStatus> {
        self.session.as_ref().map(|s| &s.status)
    }

    pub fn grid(&self) -> Option<&ReviewGrid> {
        self.session.as_ref().map(|s| &s.grid)
    }

    pub fn grid_mut(&mut self) -> Option<&mut ReviewGrid> {
        self.session.as_mut().map(|s| &mut s.grid)
    }

    /// Validate a file and hand it to the worker
    pub fn accept_file(&mut self, file: IntakeFile) -> Result<(), ImportError> {
        if self.session.is_none() {
            return Err(ImportError::NotOpen);
        }
        if self.busy {
            log::warn!("Rejected {}: an import is already in progress", file.name);
            return Err(ImportError::Busy);
        }

        if let Err(e) = validate(&file, &self.config) {
            log::warn!("Rejected {}: {}", file.name, e);
            return Err(e.into());
        }

        let info = SourceFileInfo::from(&file);
        let task = self.task.as_ref().ok_or(ImportError::NotOpen)?;
        task.start_import(file)?;

        log::info!("Importing {} ({} bytes)", info.name, info.size);
        self.busy = true;
        if let Some(session) = self.session.as_mut() {
            session.source_file = Some(info);
            session.status = SessionStatus::Parsing;
        }
        Ok(())
    }

    /// Apply one worker event to the session
    pub fn handle_event(&mut self, event: WorkerEvent) {
        let Some(session) = self.session.as_mut() else {
            log::debug!("Dropping worker event for a closed session");
            return;
        };

        match event {
            WorkerEvent::Started => {
                self.busy = true;
                session.status = SessionStatus::Parsing;
            }
            WorkerEvent::Finished { records } => {
                log::info!("Import finished with {} record(s)", records.len());
                session.grid.replace(records);
                session.status = SessionStatus::Done;
                self.busy = false;
            }
            WorkerEvent::Failed { reason } => {
                session.grid.clear();
                session.status = SessionStatus::Error(reason);
                self.busy = false;
            }
        }
    }

    /// Receive the next worker event without applying it
    pub async fn next_event(&mut self) -> Result<WorkerEvent, ImportError> {
        let task = self.task.as_mut().ok_or(ImportError::NotOpen)?;
        match task.next_event().await {
            Some(event) => Ok(event),
            None => {
                self.busy = false;
                Err(ImportError::WorkerGone)
            }
        }
    }

    /// Apply events until the current import ends
    ///
    /// Returns the number of parsed records, or the failure reason. With no
    /// import in flight it returns the last outcome straight away.
    pub async fn wait_for_completion(&mut self) -> Result<usize, ImportError> {
        if self.session.is_none() {
            return Err(ImportError::NotOpen);
        }

        while self.busy {
            let event = self.next_event().await?;
            self.handle_event(event);
        }

        match self.status() {
            Some(SessionStatus::Done) => Ok(self.grid().map_or(0, ReviewGrid::count)),
            Some(SessionStatus::Error(reason)) => Err(ImportError::Failed(reason.clone())),
            Some(_) => Err(ImportError::Idle),
            None => Err(ImportError::NotOpen),
        }
    }

    /// Delete one record; emptying the set returns the session to idle
    pub fn delete_record(&mut self, id: Uuid) -> Result<DeleteOutcome, ReviewError> {
        let Some(session) = self.session.as_mut() else {
            return Err(ReviewError::RecordNotFound(id));
        };

        let outcome = session.grid.delete(id)?;
        if outcome == DeleteOutcome::Emptied {
            log::info!("Last record deleted, session reset");
            session.source_file = None;
            session.status = SessionStatus::Idle;
        }
        Ok(outcome)
    }

    /// End the session after its records were submitted
    pub fn complete_submission(&mut self) {
        log::debug!("Submission complete");
        self.close();
    }
}

impl Drop for IngestionController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::intake::{MIME_CSV, MIME_XLSX};
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    fn controller() -> IngestionController {
        let mut controller = IngestionController::new(IntakeConfig::default());
        controller.open();
        controller
    }

    fn csv(content: &str) -> IntakeFile {
        IntakeFile::new("invoices.csv", MIME_CSV, content.as_bytes().to_vec())
    }

    fn invoice_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let header = ["Invoice No", "Seller Tax Id", "Buyer Tax Id", "Original Amount", "Due Date"];
        for (col, text) in header.iter().enumerate() {
            sheet.write_string(0, col as u16, *text).unwrap();
        }
        sheet.write_string(1, 0, "INV-001").unwrap();
        sheet.write_string(1, 1, "11111111111").unwrap();
        sheet.write_string(1, 2, "22222222222").unwrap();
        sheet.write_string(1, 3, "1000").unwrap();
        let due = ExcelDateTime::from_ymd(2024, 3, 10).unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_datetime_with_format(1, 4, &due, &date_format).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_xlsx_import() {
        let mut c = controller();
        c.accept_file(IntakeFile::new("invoices.xlsx", MIME_XLSX, invoice_workbook()))
            .unwrap();
        assert!(c.is_busy());

        assert_eq!(c.wait_for_completion().await, Ok(1));
        assert!(!c.is_busy());
        assert_eq!(c.status(), Some(&SessionStatus::Done));

        let record = &c.grid().unwrap().records()[0];
        assert_eq!(record.invoice_number, "INV-001");
        assert_eq!(record.sender_identifier, "11111111111");
        assert_eq!(record.receiver_identifier, "22222222222");
        assert_eq!(record.payable_amount, 1000.0);
        assert_eq!(record.payment_due_date, "2024-03-10");
        assert_eq!(record.issue_date, "");
        assert_eq!(record.document_type, 0);
    }

    #[tokio::test]
    async fn test_invalid_file_is_never_dispatched() {
        let mut c = controller();
        let err = c
            .accept_file(IntakeFile::new("notes.pdf", "application/pdf", vec![1, 2, 3]))
            .unwrap_err();

        assert!(matches!(err, ImportError::Validation(_)));
        assert!(!c.is_busy());
        assert_eq!(c.status(), Some(&SessionStatus::Idle));
        assert!(c.session().unwrap().source_file.is_none());
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected() {
        let mut c = IngestionController::new(IntakeConfig {
            max_file_bytes: 4,
            ..IntakeConfig::default()
        });
        c.open();
        assert_eq!(
            c.accept_file(csv("Invoice No\nA\n")),
            Err(ImportError::Validation(FileValidationError::SizeExceeded {
                size: 13,
                limit: 4
            }))
        );
    }

    #[tokio::test]
    async fn test_second_import_while_busy_is_rejected() {
        let mut c = controller();
        c.accept_file(csv("Invoice No\nA\n")).unwrap();
        assert_eq!(c.accept_file(csv("Invoice No\nB\n")), Err(ImportError::Busy));

        assert_eq!(c.wait_for_completion().await, Ok(1));
        assert_eq!(c.grid().unwrap().records()[0].invoice_number, "A");

        c.accept_file(csv("Invoice No\nB\nC\n")).unwrap();
        assert_eq!(c.wait_for_completion().await, Ok(2));
    }

    #[tokio::test]
    async fn test_failure_differs_from_zero_rows() {
        let mut c = controller();
        c.accept_file(csv("Invoice No\n")).unwrap();
        assert_eq!(c.wait_for_completion().await, Ok(0));
        assert_eq!(c.status(), Some(&SessionStatus::Done));

        c.accept_file(IntakeFile::new("bad.xlsx", MIME_XLSX, b"junk".to_vec()))
            .unwrap();
        let err = c.wait_for_completion().await.unwrap_err();
        assert!(matches!(err, ImportError::Failed(_)));
        assert!(matches!(c.status(), Some(SessionStatus::Error(_))));
        assert!(c.grid().unwrap().is_empty());
        assert!(!c.is_busy());
    }

    #[tokio::test]
    async fn test_new_import_replaces_records() {
        let mut c = controller();
        c.accept_file(csv("Invoice No\nA\nB\n")).unwrap();
        c.wait_for_completion().await.unwrap();
        c.accept_file(csv("Invoice No\nC\n")).unwrap();
        c.wait_for_completion().await.unwrap();

        let numbers: Vec<&str> = c
            .grid()
            .unwrap()
            .iter()
            .map(|r| r.invoice_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["C"]);
    }

    #[tokio::test]
    async fn test_deleting_last_record_resets_session() {
        let mut c = controller();
        c.accept_file(csv("Invoice No\nA\n")).unwrap();
        c.wait_for_completion().await.unwrap();

        let id = c.grid().unwrap().records()[0].id;
        assert_eq!(c.delete_record(id), Ok(DeleteOutcome::Emptied));
        assert_eq!(c.status(), Some(&SessionStatus::Idle));
        assert!(c.session().unwrap().source_file.is_none());
    }

    #[tokio::test]
    async fn test_close_discards_session() {
        let mut c = controller();
        c.accept_file(csv("Invoice No\nA\n")).unwrap();
        c.close();

        assert!(!c.is_open());
        assert!(!c.is_busy());
        assert_eq!(c.accept_file(csv("Invoice No\nA\n")), Err(ImportError::NotOpen));
        assert_eq!(c.next_event().await, Err(ImportError::NotOpen));
    }

    #[tokio::test]
    async fn test_wait_without_import_returns_immediately() {
        use std::time::Duration;
        use tokio::time::timeout;

        let mut c = controller();
        let idle = timeout(Duration::from_secs(2), c.wait_for_completion()).await;
        assert_eq!(idle, Ok(Err(ImportError::Idle)));

        c.accept_file(csv("Invoice No\nA\nB\n")).unwrap();
        assert_eq!(c.wait_for_completion().await, Ok(2));
        let again = timeout(Duration::from_secs(2), c.wait_for_completion()).await;
        assert_eq!(again, Ok(Ok(2)));

        c.close();
        assert_eq!(c.wait_for_completion().await, Err(ImportError::NotOpen));
    }

    #[tokio::test]
    async fn test_started_event_marks_busy() {
        let mut c = controller();
        c.handle_event(WorkerEvent::Started);
        assert!(c.is_busy());
        assert_eq!(c.status(), Some(&SessionStatus::Parsing));

        c.handle_event(WorkerEvent::Failed {
            reason: "boom".into(),
        });
        assert!(!c.is_busy());
        assert_eq!(c.status(), Some(&SessionStatus::Error("boom".into())));
    }
}
