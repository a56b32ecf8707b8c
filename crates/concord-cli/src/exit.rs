//! Exit codes and error reporting at the process boundary.

use std::process::ExitCode;

use colored::Colorize;
use concord_crypto::HashError;
use concord_ledger::{GuardError, LedgerError};
use concord_merge::MergeError;
use concord_sync::SyncError;
use concord_types::ErrorClass;
use thiserror::Error;

use crate::config::ConfigError;

/// Result of a command that ran to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Success, or the compared inputs match.
    Success,
    /// The inputs were compared and differ.
    Mismatch,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Mismatch => 1,
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.code())
    }
}

/// A failure that carries its own class and the detail lines printed under
/// the error line.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Failure {
    pub class: ErrorClass,
    pub message: String,
    pub details: Vec<String>,
}

impl Failure {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

/// Classify the first recognized error in the chain. Anything unrecognized
/// is treated as an IO failure.
pub fn classify(err: &anyhow::Error) -> ErrorClass {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<Failure>() {
            return e.class;
        }
        if let Some(e) = cause.downcast_ref::<GuardError>() {
            return e.class();
        }
        if let Some(e) = cause.downcast_ref::<LedgerError>() {
            return e.class();
        }
        if let Some(e) = cause.downcast_ref::<SyncError>() {
            return e.class();
        }
        if let Some(e) = cause.downcast_ref::<HashError>() {
            return e.class();
        }
        if let Some(e) = cause.downcast_ref::<MergeError>() {
            return e.class();
        }
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return e.class();
        }
    }
    ErrorClass::Io
}

/// Detail lines printed under the error line.
pub fn details(err: &anyhow::Error) -> Vec<String> {
    if let Some(failure) = err.downcast_ref::<Failure>() {
        return failure.details.clone();
    }
    if let Some(SyncError::MissingFiles(paths) | SyncError::MissingReceipts(paths)) =
        err.downcast_ref::<SyncError>()
    {
        return paths.iter().map(|p| format!("missing: {p}")).collect();
    }
    err.chain()
        .skip(1)
        .map(|cause| format!("caused by: {cause}"))
        .collect()
}

/// Print `ERROR[<class>]: <message>` and its details to stderr, and return
/// the exit code for the error's class.
pub fn report(err: &anyhow::Error) -> ExitCode {
    let class = classify(err);
    eprintln!("{} {err}", format!("ERROR[{}]:", class.tag()).red().bold());
    for line in details(err) {
        eprintln!("  {line}");
    }
    // Class exit codes are 1 or 2.
    ExitCode::from(class.exit_code() as u8)
}
