/*!
# Core Module

Shared plumbing for the analyzer: error types, cooperative cancellation,
source spans and small file helpers.
*/

pub mod cancel;
pub mod errors;
pub mod fs_utils;
pub mod position;

pub use cancel::CancellationToken;
pub use errors::{AnalysisError, ErrorLevel, Result};
pub use fs_utils::read_text_file;
pub use position::PackedSpan;
