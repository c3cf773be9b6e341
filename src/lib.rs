//! Export tabular rows to XLSX with grouped, merged headers and per-column
//! dropdown lists backed by a linked-values sheet.

pub mod address;
pub mod column;
pub mod error;
pub mod export;
pub mod job;
pub mod layout;
pub mod options;
pub mod row;
pub mod sink;

pub use column::{ColumnDescriptor, RawColumn};
pub use error::{ExportError, JobError};
pub use export::ExcelExport;
pub use job::ExportJob;
pub use options::{ExportOptions, ValidationBound};
pub use row::{CellValue, Row};
