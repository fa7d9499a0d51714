/*!
# Error System for ENC Analyzer

Errors that abort an analysis call. Rude edits are *not* errors: they are
collected as diagnostics and never unwind. What remains here is caller-driven
cancellation and malformed input coming from the external tree producers.
Invariant violations inside the engine panic instead of surfacing as errors.
*/

use std::fmt;
use thiserror::Error;

/// Результат операций анализа
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Ошибки, прерывающие анализ пары деревьев
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Анализ отменён вызывающей стороной; частичный результат не возвращается
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Invalid syntax tree: {0}")]
    InvalidTree(String),

    #[error("Unknown modifier keyword: {0}")]
    UnknownModifier(String),

    /// Активная инструкция не найдена по смещению в старом дереве
    #[error("No statement found at offset {0}")]
    UnknownActiveStatement(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}

/// Severity levels used when rendering diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLevel::Error => write!(f, "ERROR"),
            ErrorLevel::Warning => write!(f, "WARNING"),
            ErrorLevel::Info => write!(f, "INFO"),
        }
    }
}
