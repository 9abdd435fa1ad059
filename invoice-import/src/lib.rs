//! Bulk invoice import from spreadsheets
//!
//! A spreadsheet is validated, parsed on a background worker into draft
//! records, reviewed and edited in memory, then submitted as one batch.

pub mod cli;
pub mod config;
pub mod import;
pub mod review;
pub mod submit;
pub mod template;

pub use config::ImportConfig;
