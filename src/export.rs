use std::path::Path;

use tracing::info;

use crate::column::{ColumnPlan, ColumnPlanner, RawColumn};
use crate::error::ExportError;
use crate::layout::{LayoutEngine, LayoutPlan};
use crate::options::ExportOptions;
use crate::row::{Row, RowPlanner};
use crate::sink::xlsx::XlsxSink;
use crate::sink::SpreadsheetSink;

/// Exports rows to a two-sheet workbook: the data sheet and the sheet
/// holding dropdown values.
///
/// Columns and rows are normalized once at construction; every call to
/// [`export`](Self::export) builds a fresh document from them.
#[derive(Debug, Clone)]
pub struct ExcelExport {
    columns: ColumnPlan,
    rows: Vec<Row>,
    options: ExportOptions,
}

impl ExcelExport {
    /// Creates a new `ExcelExport`, planning columns and normalizing rows.
    ///
    /// # Arguments
    ///
    /// * `columns` - Bare labels or column descriptors, in input order.
    /// * `data` - Rows of cells; empty rows are handled per `options.ignore_empty_rows`.
    /// * `options` - Layout options.
    pub fn new<C, R>(columns: C, data: R, options: ExportOptions) -> Self
    where
        C: IntoIterator,
        C::Item: Into<RawColumn>,
        R: IntoIterator,
        R::Item: Into<Row>,
    {
        let columns = ColumnPlanner::plan(columns);
        let rows = RowPlanner::normalize(data, options.ignore_empty_rows);
        ExcelExport {
            columns,
            rows,
            options,
        }
    }

    pub fn columns(&self) -> &ColumnPlan {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Layout options that apply after construction, such as sheet names.
    /// `ignore_empty_rows` has already been applied to the rows.
    pub fn options_mut(&mut self) -> &mut ExportOptions {
        &mut self.options
    }

    /// Computes the write plan without touching any document.
    pub fn plan(&self) -> LayoutPlan {
        LayoutEngine::new(&self.columns, &self.rows, &self.options).plan()
    }

    /// Writes an `.xlsx` file at `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        self.export_with(&mut XlsxSink::new(), path)
    }

    /// Emits the plan onto `sink` and saves it to `path`.
    pub fn export_with<S: SpreadsheetSink + ?Sized>(
        &self,
        sink: &mut S,
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let path = path.as_ref();
        let plan = self.plan();
        plan.emit(&mut *sink)
            .and_then(|()| sink.save(path))
            .map_err(|source| ExportError::ExportFailed {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            path = %path.display(),
            columns = self.columns.len(),
            rows = plan.data_row_count,
            "exported workbook"
        );
        Ok(())
    }
}
