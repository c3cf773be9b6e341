use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use super::{CellStyle, SheetId, SpreadsheetSink, ValidationRule};
use crate::address::{CellRange, CellRef};
use crate::row::CellValue;

/// One instruction received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    AddSheet(String),
    SetActiveSheet(SheetId),
    SetSheetHidden(SheetId, bool),
    SetCellValue(SheetId, CellRef, CellValue),
    SetCellStyle(SheetId, CellRange, CellStyle),
    MergeCells(SheetId, CellRange),
    SetColumnAutoSize(SheetId, u32, bool),
    SetColumnWidth(SheetId, u32, f64),
    SetRowHeight(SheetId, u32, f64),
    SetDataValidation(SheetId, CellRange, ValidationRule),
    Save(PathBuf),
}

/// An in-memory sink that records every instruction, for inspecting what a
/// layout emits without encoding a file.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    sheets: Vec<String>,
    fail_on_save: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `save` always fails.
    pub fn failing_on_save() -> Self {
        RecordingSink {
            fail_on_save: true,
            ..Default::default()
        }
    }

    pub fn sheet_id(&self, name: &str) -> Option<SheetId> {
        self.sheets.iter().position(|s| s == name).map(SheetId)
    }

    /// Last value written to `cell` (e.g. `"B2"`) on the named sheet.
    pub fn value_at(&self, sheet: &str, cell: &str) -> Option<&CellValue> {
        let id = self.sheet_id(sheet)?;
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::SetCellValue(s, c, value) if *s == id && c.to_string() == cell => Some(value),
            _ => None,
        })
    }

    /// Merged ranges on the named sheet, in `A1:B1` form.
    pub fn merges(&self, sheet: &str) -> Vec<String> {
        let Some(id) = self.sheet_id(sheet) else {
            return Vec::new();
        };
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::MergeCells(s, range) if *s == id => Some(range.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Validation ranges and rules on the named sheet.
    pub fn validations(&self, sheet: &str) -> Vec<(String, &ValidationRule)> {
        let Some(id) = self.sheet_id(sheet) else {
            return Vec::new();
        };
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::SetDataValidation(s, range, rule) if *s == id => {
                    Some((range.to_string(), rule))
                }
                _ => None,
            })
            .collect()
    }

    /// Highest row that received a value on the named sheet.
    pub fn last_row(&self, sheet: &str) -> Option<u32> {
        let id = self.sheet_id(sheet)?;
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::SetCellValue(s, cell, _) if *s == id => Some(cell.row),
                _ => None,
            })
            .max()
    }

    fn check(&self, sheet: SheetId) -> Result<()> {
        if sheet.0 < self.sheets.len() {
            Ok(())
        } else {
            Err(anyhow!("unknown sheet id {}", sheet.0))
        }
    }
}

impl SpreadsheetSink for RecordingSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        if self.sheets.iter().any(|s| s == name) {
            return Err(anyhow!("duplicate sheet name {name:?}"));
        }
        self.sheets.push(name.to_string());
        self.calls.push(SinkCall::AddSheet(name.to_string()));
        Ok(SheetId(self.sheets.len() - 1))
    }

    fn set_active_sheet(&mut self, sheet: SheetId) -> Result<()> {
        self.check(sheet)?;
        self.calls.push(SinkCall::SetActiveSheet(sheet));
        Ok(())
    }

    fn set_sheet_hidden(&mut self, sheet: SheetId, hidden: bool) -> Result<()> {
        self.check(sheet)?;
        self.calls.push(SinkCall::SetSheetHidden(sheet, hidden));
        Ok(())
    }

    fn set_cell_value(&mut self, sheet: SheetId, cell: CellRef, value: &CellValue) -> Result<()> {
        self.check(sheet)?;
        self.calls
            .push(SinkCall::SetCellValue(sheet, cell, value.clone()));
        Ok(())
    }

    fn set_cell_style(&mut self, sheet: SheetId, range: CellRange, style: CellStyle) -> Result<()> {
        self.check(sheet)?;
        self.calls.push(SinkCall::SetCellStyle(sheet, range, style));
        Ok(())
    }

    fn merge_cells(&mut self, sheet: SheetId, range: CellRange) -> Result<()> {
        self.check(sheet)?;
        self.calls.push(SinkCall::MergeCells(sheet, range));
        Ok(())
    }

    fn set_column_auto_size(&mut self, sheet: SheetId, column: u32, enabled: bool) -> Result<()> {
        self.check(sheet)?;
        self.calls
            .push(SinkCall::SetColumnAutoSize(sheet, column, enabled));
        Ok(())
    }

    fn set_column_width(&mut self, sheet: SheetId, column: u32, width: f64) -> Result<()> {
        self.check(sheet)?;
        self.calls.push(SinkCall::SetColumnWidth(sheet, column, width));
        Ok(())
    }

    fn set_row_height(&mut self, sheet: SheetId, row: u32, height: f64) -> Result<()> {
        self.check(sheet)?;
        self.calls.push(SinkCall::SetRowHeight(sheet, row, height));
        Ok(())
    }

    fn set_data_validation(
        &mut self,
        sheet: SheetId,
        range: CellRange,
        rule: &ValidationRule,
    ) -> Result<()> {
        self.check(sheet)?;
        self.calls
            .push(SinkCall::SetDataValidation(sheet, range, rule.clone()));
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        if self.fail_on_save {
            return Err(anyhow!("disk full"));
        }
        self.calls.push(SinkCall::Save(path.to_path_buf()));
        Ok(())
    }
}
