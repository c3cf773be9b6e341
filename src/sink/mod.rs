//! Spreadsheet document backends.
//!
//! The layout engine only decides what goes where; a [`SpreadsheetSink`]
//! owns the document and does the encoding.

pub mod recording;
pub mod xlsx;

use std::path::Path;

use anyhow::Result;

use crate::address::{CellRange, CellRef};
use crate::row::CellValue;

/// Handle to a sheet created by [`SpreadsheetSink::add_sheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

/// Fixed cell styles. Every style carries a black hairline border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellStyle {
    /// Merged group header: bold, centered, larger font.
    GroupHeader { font_size: f64 },
    /// Column header: bold and centered.
    Header,
    /// Data cell.
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorStyle {
    Stop,
    Warning,
    Information,
}

/// A list-type data validation rule whose source is a range formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    /// Source range, e.g. `LinkedData!$C$2:$C$4`.
    pub formula: String,
    pub error_style: ValidationErrorStyle,
    pub allow_blank: bool,
    pub show_input_message: bool,
    pub show_dropdown: bool,
    pub prompt_title: Option<String>,
    pub prompt_text: Option<String>,
}

impl ValidationRule {
    /// A dropdown that suggests values without blocking other input.
    pub fn suggestion_list(formula: String) -> Self {
        ValidationRule {
            formula,
            error_style: ValidationErrorStyle::Information,
            allow_blank: false,
            show_input_message: true,
            show_dropdown: true,
            prompt_title: None,
            prompt_text: None,
        }
    }
}

/// Operations the layout needs from a spreadsheet document.
///
/// Cells, columns and rows are 1-based.
pub trait SpreadsheetSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId>;
    fn set_active_sheet(&mut self, sheet: SheetId) -> Result<()>;
    fn set_sheet_hidden(&mut self, sheet: SheetId, hidden: bool) -> Result<()>;
    fn set_cell_value(&mut self, sheet: SheetId, cell: CellRef, value: &CellValue) -> Result<()>;
    fn set_cell_style(&mut self, sheet: SheetId, range: CellRange, style: CellStyle) -> Result<()>;
    fn merge_cells(&mut self, sheet: SheetId, range: CellRange) -> Result<()>;
    fn set_column_auto_size(&mut self, sheet: SheetId, column: u32, enabled: bool) -> Result<()>;
    fn set_column_width(&mut self, sheet: SheetId, column: u32, width: f64) -> Result<()>;
    fn set_row_height(&mut self, sheet: SheetId, row: u32, height: f64) -> Result<()>;
    fn set_data_validation(
        &mut self,
        sheet: SheetId,
        range: CellRange,
        rule: &ValidationRule,
    ) -> Result<()>;
    /// Serializes the document to `path`.
    fn save(&mut self, path: &Path) -> Result<()>;
}
