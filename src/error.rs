//! Application-level error: a user-facing message plus the process exit code.
//!
//! Exit codes:
//! - `2`: usage, configuration or input-file problems
//! - `3`: no price data available for the request
//! - `4`: remote or terminal failures at runtime
//!
//! The analysis core never produces an `AppError`; per-period problems are
//! reported as `analysis::SkipReason` values instead.

use crate::data::FetchError;

pub const EXIT_USAGE: u8 = 2;
pub const EXIT_NO_DATA: u8 = 3;
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// An empty provider response means "no data"; anything else is a runtime failure.
impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Empty { .. } => Self::no_data(e.to_string()),
            _ => Self::runtime(format!("Price download failed: {e}")),
        }
    }
}
