use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::export::ExcelExport::export`].
#[derive(Error, Debug)]
pub enum ExportError {
    /// Building or saving the workbook failed; nothing valid was written.
    #[error("failed to export workbook to {}", path.display())]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while reading an export job description.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("invalid export job: {0}")]
    Json(#[from] serde_json::Error),
}
