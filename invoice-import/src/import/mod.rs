//! Spreadsheet import pipeline
//!
//! intake (validation) → worker (decode, map, coerce) → controller (session state)

pub mod coerce;
pub mod controller;
pub mod decode;
pub mod intake;
pub mod mapping;
pub mod record;
pub mod worker;

pub use controller::{ImportError, ImportSession, IngestionController, SessionStatus, SourceFileInfo};
pub use intake::{FileValidationError, IntakeFile, validate};
pub use mapping::{CanonicalField, FieldKind, FieldMapping, FIELD_MAPPINGS};
pub use record::{DraftRecord, FieldValue, FieldValueError};
pub use worker::{ParsingTask, WorkerCommand, WorkerEvent, parse_spreadsheet};
