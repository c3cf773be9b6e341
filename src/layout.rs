//! Cell placement for the data sheet and the linked-values sheet.
//!
//! [`LayoutEngine::plan`] is a pure computation over planned columns and
//! rows; [`LayoutPlan::emit`] replays the result onto a [`SpreadsheetSink`].

use anyhow::Result;
use tracing::{debug, warn};

use crate::address::{sheet_reference, CellRange, CellRef};
use crate::column::{ColumnPlan, ColumnSpec, WidthMode};
use crate::options::{ExportOptions, ValidationBound};
use crate::row::{CellValue, Row};
use crate::sink::{CellStyle, SheetId, SpreadsheetSink, ValidationRule};

/// First row of the linked-values sheet that holds values (row 1 is the header).
const LINKED_FIRST_ROW: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub cell: CellRef,
    pub value: CellValue,
    pub style: Option<CellStyle>,
}

/// A merged range whose value sits in its top-left cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCell {
    pub range: CellRange,
    pub value: CellValue,
    pub style: CellStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub column: u32,
    pub width: WidthMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWrite {
    pub range: CellRange,
    pub rule: ValidationRule,
}

/// Everything written to one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetPlan {
    pub name: String,
    pub hidden: bool,
    pub row_heights: Vec<(u32, f64)>,
    pub merges: Vec<MergedCell>,
    pub cells: Vec<CellWrite>,
    pub columns: Vec<ColumnLayout>,
    pub validations: Vec<ValidationWrite>,
}

impl SheetPlan {
    fn new(name: &str) -> Self {
        SheetPlan {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn write(&mut self, cell: CellRef, value: CellValue, style: Option<CellStyle>) {
        self.cells.push(CellWrite { cell, value, style });
    }

    /// Value placed at `cell` (e.g. `"C2"`), looking at merges too.
    pub fn value_at(&self, cell: &str) -> Option<&CellValue> {
        self.merges
            .iter()
            .find(|m| m.range.first.to_string() == cell)
            .map(|m| &m.value)
            .or_else(|| {
                self.cells
                    .iter()
                    .rev()
                    .find(|w| w.cell.to_string() == cell)
                    .map(|w| &w.value)
            })
    }

    fn emit<S: SpreadsheetSink + ?Sized>(&self, sink: &mut S) -> Result<SheetId> {
        let sheet = sink.add_sheet(&self.name)?;
        for &(row, height) in &self.row_heights {
            sink.set_row_height(sheet, row, height)?;
        }
        for merged in &self.merges {
            sink.merge_cells(sheet, merged.range)?;
            sink.set_cell_value(sheet, merged.range.first, &merged.value)?;
            sink.set_cell_style(sheet, merged.range, merged.style)?;
        }
        for write in &self.cells {
            sink.set_cell_value(sheet, write.cell, &write.value)?;
            if let Some(style) = write.style {
                sink.set_cell_style(sheet, CellRange::single(write.cell), style)?;
            }
        }
        for column in &self.columns {
            match column.width {
                WidthMode::Auto => sink.set_column_auto_size(sheet, column.column, true)?,
                WidthMode::Fixed(width) => {
                    sink.set_column_width(sheet, column.column, f64::from(width))?
                }
            }
        }
        for validation in &self.validations {
            sink.set_data_validation(sheet, validation.range, &validation.rule)?;
        }
        if self.hidden {
            sink.set_sheet_hidden(sheet, true)?;
        }
        Ok(sheet)
    }
}

/// The full write plan for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub data: SheetPlan,
    pub linked: SheetPlan,
    pub first_data_row: u32,
    pub data_row_count: usize,
}

impl LayoutPlan {
    /// Replays the plan onto `sink`: data sheet first, then the linked sheet,
    /// leaving the data sheet active. Does not save.
    pub fn emit<S: SpreadsheetSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let data = self.data.emit(sink)?;
        self.linked.emit(sink)?;
        sink.set_active_sheet(data)?;
        Ok(())
    }
}

/// Computes the [`LayoutPlan`] for planned columns and normalized rows.
pub struct LayoutEngine<'a> {
    columns: &'a ColumnPlan,
    rows: &'a [Row],
    options: &'a ExportOptions,
}

impl<'a> LayoutEngine<'a> {
    /// Creates a new `LayoutEngine` over already planned input.
    ///
    /// # Arguments
    ///
    /// * `columns` - Output of [`crate::column::ColumnPlanner::plan`].
    /// * `rows` - Output of [`crate::row::RowPlanner::normalize`].
    /// * `options` - Sheet names, grouping and validation bound.
    pub fn new(columns: &'a ColumnPlan, rows: &'a [Row], options: &'a ExportOptions) -> Self {
        LayoutEngine {
            columns,
            rows,
            options,
        }
    }

    pub fn plan(&self) -> LayoutPlan {
        let mut data = SheetPlan::new(&self.options.sheet_name);
        let mut linked = SheetPlan::new(&self.options.linked_sheet_name);
        linked.hidden = self.options.hide_linked_sheet;

        if self.options.with_group {
            self.write_group_headers(&mut data);
        }
        self.write_column_headers(&mut data, self.options.header_row());
        self.write_column_headers(&mut linked, 1);
        self.write_rows(&mut data);

        for column in &self.columns.columns {
            data.columns.push(ColumnLayout {
                column: column.index,
                width: column.width,
            });
            if !column.is_linked() {
                continue;
            }
            let link_to_row = Self::write_domain_values(&mut linked, column);
            linked.columns.push(ColumnLayout {
                column: column.index,
                width: column.width,
            });
            data.validations.push(self.validation_for(column, link_to_row));
        }

        debug!(
            first_data_row = self.options.first_data_row(),
            rows = self.rows.len(),
            validations = data.validations.len(),
            "computed layout"
        );
        LayoutPlan {
            data,
            linked,
            first_data_row: self.options.first_data_row(),
            data_row_count: self.rows.len(),
        }
    }

    /// Row 1: one cell per group, merged across the group's columns.
    fn write_group_headers(&self, sheet: &mut SheetPlan) {
        sheet.row_heights.push((1, self.options.group_row_height));
        let style = CellStyle::GroupHeader {
            font_size: self.options.group_font_size,
        };
        for group in &self.columns.groups {
            let range = CellRange::row_span(1, group.first_index, group.last_index);
            let value = CellValue::from(group.label());
            if range.is_single_cell() {
                sheet.write(range.first, value, Some(style));
            } else {
                sheet.merges.push(MergedCell {
                    range,
                    value,
                    style,
                });
            }
        }
    }

    fn write_column_headers(&self, sheet: &mut SheetPlan, row: u32) {
        for column in &self.columns.columns {
            sheet.write(
                CellRef::new(column.index, row),
                CellValue::from(column.label.as_str()),
                Some(CellStyle::Header),
            );
        }
    }

    /// One sheet row per input row, blank rows included, so positions stay
    /// aligned with the normalized rows.
    fn write_rows(&self, sheet: &mut SheetPlan) {
        let mut row_index = self.options.first_data_row();
        for row in self.rows {
            for column in &self.columns.columns {
                sheet.write(
                    CellRef::new(column.index, row_index),
                    row.cell((column.index - 1) as usize).clone(),
                    Some(CellStyle::Data),
                );
            }
            row_index += 1;
        }
    }

    /// Writes the column's values down from row 2 and returns the last row used.
    fn write_domain_values(sheet: &mut SheetPlan, column: &ColumnSpec) -> u32 {
        let mut row_index = LINKED_FIRST_ROW;
        for value in &column.domain_values {
            sheet.write(
                CellRef::new(column.index, row_index),
                CellValue::from(value.as_str()),
                None,
            );
            row_index += 1;
        }
        row_index - 1
    }

    fn validation_for(&self, column: &ColumnSpec, link_to_row: u32) -> ValidationWrite {
        let source = CellRange::column_span(column.index, LINKED_FIRST_ROW, link_to_row);
        let formula = format!(
            "{}!{}",
            sheet_reference(&self.options.linked_sheet_name),
            source.absolute()
        );
        let mut rule = ValidationRule::suggestion_list(formula);
        if let Some(prompt) = &column.prompt {
            rule.prompt_title = Some(prompt.title.clone());
            rule.prompt_text = prompt.text.clone();
        }
        let first_row = self.options.first_data_row();
        ValidationWrite {
            range: CellRange::column_span(column.index, first_row, self.validation_last_row()),
            rule,
        }
    }

    fn validation_last_row(&self) -> u32 {
        let first_row = self.options.first_data_row();
        match self.options.validation_bound {
            ValidationBound::Fixed(row) if row < first_row => {
                warn!(
                    bound = row,
                    first_row, "validation bound is above the first data row, clamping"
                );
                first_row
            }
            ValidationBound::Fixed(row) => row,
            ValidationBound::LastDataRow => {
                let rows = u32::try_from(self.rows.len()).unwrap_or(u32::MAX);
                first_row.saturating_add(rows).saturating_sub(1).max(first_row)
            }
        }
    }
}
