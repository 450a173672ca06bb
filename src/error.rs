//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for templopt.
///
/// - 0: Success (command completed normally)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found by a scan
/// - 3: Partial success (per-file errors, failed phases or QA failures)
/// - 4: Aborted (a critical pipeline phase failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NoDuplicates = 2,
    PartialSuccess = 3,
    Aborted = 4,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "TO000",
            Self::GeneralError => "TO001",
            Self::NoDuplicates => "TO002",
            Self::PartialSuccess => "TO003",
            Self::Aborted => "TO004",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "TO001")
    pub code: String,
    pub exit_code: i32,
    pub message: String,
    /// Whether a pipeline run was aborted
    pub aborted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    ///
    /// The message carries the whole context chain.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            aborted: exit_code == ExitCode::Aborted,
        }
    }
}
