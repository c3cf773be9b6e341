use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rust_xlsxwriter::{
    Color, ColNum, DataValidation, DataValidationErrorStyle, Format, FormatAlign, FormatBorder,
    Formula, RowNum, Workbook, Worksheet,
};
use tempfile::NamedTempFile;
use tracing::info;

use super::{CellStyle, SheetId, SpreadsheetSink, ValidationErrorStyle, ValidationRule};
use crate::address::{CellRange, CellRef};
use crate::row::CellValue;

/// Excel's default column width in character units.
const DEFAULT_COLUMN_WIDTH: f64 = 8.43;

#[derive(Debug, Clone, Default)]
struct CellEntry {
    value: CellValue,
    style: Option<CellStyle>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnState {
    auto_size: bool,
    width: Option<f64>,
}

#[derive(Debug, Default)]
struct SheetState {
    name: String,
    hidden: bool,
    cells: BTreeMap<CellRef, CellEntry>,
    merges: Vec<CellRange>,
    columns: BTreeMap<u32, ColumnState>,
    row_heights: BTreeMap<u32, f64>,
    validations: Vec<(CellRange, ValidationRule)>,
}

/// A [`SpreadsheetSink`] that encodes `.xlsx` files with `rust_xlsxwriter`.
///
/// Instructions are buffered and the workbook is only built on [`save`],
/// because `rust_xlsxwriter` needs a cell's value and format together.
///
/// [`save`]: SpreadsheetSink::save
#[derive(Debug, Default)]
pub struct XlsxSink {
    sheets: Vec<SheetState>,
    active: Option<SheetId>,
}

impl XlsxSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheet_mut(&mut self, sheet: SheetId) -> Result<&mut SheetState> {
        self.sheets
            .get_mut(sheet.0)
            .ok_or_else(|| anyhow!("unknown sheet id {}", sheet.0))
    }

    /// Builds the workbook from the buffered instructions.
    pub fn build_workbook(&self) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        for (index, state) in self.sheets.iter().enumerate() {
            let mut worksheet = Worksheet::new();
            worksheet
                .set_name(&state.name)
                .with_context(|| format!("invalid sheet name {:?}", state.name))?;
            write_sheet(&mut worksheet, state)?;
            if state.hidden {
                worksheet.set_hidden(true);
            }
            if self.active == Some(SheetId(index)) {
                worksheet.set_active(true);
            }
            workbook.push_worksheet(worksheet);
        }
        Ok(workbook)
    }
}

fn xlsx_format(style: CellStyle) -> Format {
    let bordered = Format::new()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::Black);
    let header = bordered
        .clone()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    match style {
        CellStyle::Data => bordered,
        CellStyle::Header => header,
        CellStyle::GroupHeader { font_size } => header.set_font_size(font_size),
    }
}

fn position(cell: CellRef) -> Result<(RowNum, ColNum)> {
    let row = cell
        .row
        .checked_sub(1)
        .ok_or_else(|| anyhow!("row numbers are 1-based, got {}", cell.row))?;
    let col = cell
        .column
        .checked_sub(1)
        .and_then(|c| ColNum::try_from(c).ok())
        .ok_or_else(|| anyhow!("column {} is out of range", cell.column))?;
    Ok((row, col))
}

fn xlsx_validation(rule: &ValidationRule) -> Result<DataValidation> {
    let error_style = match rule.error_style {
        ValidationErrorStyle::Stop => DataValidationErrorStyle::Stop,
        ValidationErrorStyle::Warning => DataValidationErrorStyle::Warning,
        ValidationErrorStyle::Information => DataValidationErrorStyle::Information,
    };
    let mut validation = DataValidation::new()
        .allow_list_formula(Formula::new(&rule.formula))
        .ignore_blank(rule.allow_blank)
        .show_input_message(rule.show_input_message)
        .show_dropdown(rule.show_dropdown)
        .set_error_style(error_style);
    if let Some(title) = &rule.prompt_title {
        validation = validation.set_input_title(title)?;
        if let Some(text) = &rule.prompt_text {
            validation = validation.set_input_message(text)?;
        }
    }
    Ok(validation)
}

fn write_sheet(worksheet: &mut Worksheet, state: &SheetState) -> Result<()> {
    for (&row, &height) in &state.row_heights {
        let (row, _) = position(CellRef::new(1, row))?;
        worksheet.set_row_height(row, height)?;
    }

    for range in &state.merges {
        let (first_row, first_col) = position(range.first)?;
        let (last_row, last_col) = position(range.last)?;
        let format = state
            .cells
            .get(&range.first)
            .and_then(|entry| entry.style)
            .map_or_else(Format::new, xlsx_format);
        worksheet.merge_range(first_row, first_col, last_row, last_col, "", &format)?;
    }

    for (&cell, entry) in &state.cells {
        // Merge covers everything but the top-left cell.
        if state
            .merges
            .iter()
            .any(|range| range.contains(cell) && range.first != cell)
        {
            continue;
        }
        let (row, col) = position(cell)?;
        let format = entry.style.map(xlsx_format);
        match (&entry.value, &format) {
            (CellValue::String(s), Some(f)) => {
                worksheet.write_string_with_format(row, col, s, f)?;
            }
            (CellValue::String(s), None) => {
                worksheet.write_string(row, col, s)?;
            }
            (CellValue::Bool(b), Some(f)) => {
                worksheet.write_boolean_with_format(row, col, *b, f)?;
            }
            (CellValue::Bool(b), None) => {
                worksheet.write_boolean(row, col, *b)?;
            }
            (CellValue::Number(n), Some(f)) => {
                worksheet.write_number_with_format(row, col, *n, f)?;
            }
            (CellValue::Number(n), None) => {
                worksheet.write_number(row, col, *n)?;
            }
            (CellValue::Blank, Some(f)) => {
                worksheet.write_blank(row, col, f)?;
            }
            (CellValue::Blank, None) => {}
        }
    }

    // Autofit measures written data, so it runs after all cells are in place.
    if state.columns.values().any(|c| c.auto_size) {
        worksheet.autofit();
    }
    for (&column, settings) in &state.columns {
        if settings.auto_size {
            continue;
        }
        let (_, col) = position(CellRef::new(column, 1))?;
        worksheet.set_column_width(col, settings.width.unwrap_or(DEFAULT_COLUMN_WIDTH))?;
    }

    for (range, rule) in &state.validations {
        let (first_row, first_col) = position(range.first)?;
        let (last_row, last_col) = position(range.last)?;
        worksheet.add_data_validation(
            first_row,
            first_col,
            last_row,
            last_col,
            &xlsx_validation(rule)?,
        )?;
    }
    Ok(())
}

impl SpreadsheetSink for XlsxSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        self.sheets.push(SheetState {
            name: name.to_string(),
            ..Default::default()
        });
        Ok(SheetId(self.sheets.len() - 1))
    }

    fn set_active_sheet(&mut self, sheet: SheetId) -> Result<()> {
        self.sheet_mut(sheet)?;
        self.active = Some(sheet);
        Ok(())
    }

    fn set_sheet_hidden(&mut self, sheet: SheetId, hidden: bool) -> Result<()> {
        self.sheet_mut(sheet)?.hidden = hidden;
        Ok(())
    }

    fn set_cell_value(&mut self, sheet: SheetId, cell: CellRef, value: &CellValue) -> Result<()> {
        self.sheet_mut(sheet)?
            .cells
            .entry(cell)
            .or_default()
            .value = value.clone();
        Ok(())
    }

    fn set_cell_style(&mut self, sheet: SheetId, range: CellRange, style: CellStyle) -> Result<()> {
        let state = self.sheet_mut(sheet)?;
        for cell in range.cells() {
            state.cells.entry(cell).or_default().style = Some(style);
        }
        Ok(())
    }

    fn merge_cells(&mut self, sheet: SheetId, range: CellRange) -> Result<()> {
        let state = self.sheet_mut(sheet)?;
        if state
            .merges
            .iter()
            .any(|m| m.cells().any(|cell| range.contains(cell)))
        {
            return Err(anyhow!("merge range {range} overlaps an existing merge"));
        }
        state.merges.push(range);
        Ok(())
    }

    fn set_column_auto_size(&mut self, sheet: SheetId, column: u32, enabled: bool) -> Result<()> {
        self.sheet_mut(sheet)?
            .columns
            .entry(column)
            .or_default()
            .auto_size = enabled;
        Ok(())
    }

    fn set_column_width(&mut self, sheet: SheetId, column: u32, width: f64) -> Result<()> {
        let settings = self.sheet_mut(sheet)?.columns.entry(column).or_default();
        settings.auto_size = false;
        settings.width = Some(width);
        Ok(())
    }

    fn set_row_height(&mut self, sheet: SheetId, row: u32, height: f64) -> Result<()> {
        self.sheet_mut(sheet)?.row_heights.insert(row, height);
        Ok(())
    }

    fn set_data_validation(
        &mut self,
        sheet: SheetId,
        range: CellRange,
        rule: &ValidationRule,
    ) -> Result<()> {
        self.sheet_mut(sheet)?
            .validations
            .push((range, rule.clone()));
        Ok(())
    }

    /// Writes into a temporary file next to `path` and renames it into place,
    /// so a failed save never leaves a truncated workbook behind.
    fn save(&mut self, path: &Path) -> Result<()> {
        let buffer = self.build_workbook()?.save_to_buffer()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot create temporary file in {}", dir.display()))?;
        file.write_all(&buffer)?;
        file.as_file().sync_all()?;
        file.persist(path)
            .with_context(|| format!("cannot move workbook into {}", path.display()))?;
        info!(path = %path.display(), bytes = buffer.len(), "workbook written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use umya_spreadsheet::reader::xlsx::read as read_xlsx;

    #[test]
    fn test_xlsx_sink_writes_values_and_merges() -> Result<()> {
        let mut sink = XlsxSink::new();
        let data = sink.add_sheet("Data")?;
        let range = CellRange::row_span(1, 1, 2);
        sink.merge_cells(data, range)?;
        sink.set_cell_value(data, CellRef::new(1, 1), &"Base".into())?;
        sink.set_cell_style(data, range, CellStyle::GroupHeader { font_size: 16.0 })?;
        sink.set_cell_value(data, CellRef::new(1, 2), &CellValue::Number(7.0))?;
        sink.set_cell_value(data, CellRef::new(2, 2), &"seven".into())?;
        sink.set_cell_value(data, CellRef::new(3, 2), &true.into())?;
        sink.set_cell_style(data, CellRange::row_span(2, 1, 3), CellStyle::Data)?;
        sink.set_active_sheet(data)?;

        let dir = TempDir::new()?;
        let path = dir.path().join("sink.xlsx");
        sink.save(&path)?;

        let book = read_xlsx(&path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_name(), "Data");
        assert_eq!(sheet.get_value("A1"), "Base");
        assert_eq!(sheet.get_value("A2"), "7");
        assert_eq!(sheet.get_value("B2"), "seven");
        assert!(sheet.get_value("C2").eq_ignore_ascii_case("true"));
        let merges: Vec<String> = sheet.get_merge_cells().iter().map(|r| r.get_range()).collect();
        assert_eq!(merges, vec!["A1:B1".to_string()]);
        Ok(())
    }

    #[test]
    fn test_xlsx_sink_rejects_overlapping_merges() -> Result<()> {
        let mut sink = XlsxSink::new();
        let data = sink.add_sheet("Data")?;
        sink.merge_cells(data, CellRange::row_span(1, 1, 3))?;
        assert!(sink.merge_cells(data, CellRange::row_span(1, 3, 4)).is_err());
        Ok(())
    }

    #[test]
    fn test_xlsx_sink_unknown_sheet() {
        let mut sink = XlsxSink::new();
        assert!(sink.set_row_height(SheetId(3), 1, 20.0).is_err());
    }

    #[test]
    fn test_failed_save_leaves_no_file() -> Result<()> {
        let mut sink = XlsxSink::new();
        sink.add_sheet("Bad[name]")?;
        let dir = TempDir::new()?;
        let path = dir.path().join("bad.xlsx");
        assert!(sink.save(&path).is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
