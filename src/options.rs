use std::fmt;
use std::str::FromStr;

use clap::Args;

/// Last data-sheet row covered by dropdown validation ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationBound {
    /// A fixed row number, regardless of how many rows were exported.
    Fixed(u32),
    /// The last row actually written.
    LastDataRow,
}

impl Default for ValidationBound {
    fn default() -> Self {
        ValidationBound::Fixed(1000)
    }
}

impl fmt::Display for ValidationBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationBound::Fixed(row) => write!(f, "{row}"),
            ValidationBound::LastDataRow => f.write_str("data"),
        }
    }
}

impl FromStr for ValidationBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "data" => Ok(ValidationBound::LastDataRow),
            other => other
                .parse::<u32>()
                .ok()
                .filter(|row| *row >= 1)
                .map(ValidationBound::Fixed)
                .ok_or_else(|| format!("expected a row number or \"data\", got {other:?}")),
        }
    }
}

/// Options controlling the workbook layout.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct ExportOptions {
    /// Write a merged group header row above the column headers
    /// (`--without-group` turns it off).
    #[arg(long = "without-group", action = clap::ArgAction::SetFalse)]
    pub with_group: bool,
    /// Drop empty rows instead of writing them as blank rows.
    #[arg(long, default_value_t = false)]
    pub ignore_empty_rows: bool,
    /// Name of the sheet holding the rows.
    #[arg(long, default_value = "Data")]
    pub sheet_name: String,
    /// Name of the sheet holding dropdown values.
    #[arg(long, default_value = "LinkedData")]
    pub linked_sheet_name: String,
    /// Font size of the group header cells.
    #[arg(long, default_value_t = 16.0)]
    pub group_font_size: f64,
    /// Height of the group header row.
    #[arg(long, default_value_t = 25.0)]
    pub group_row_height: f64,
    /// Last row of dropdown ranges: a row number, or "data" for the last data row.
    #[arg(long, default_value_t = ValidationBound::default())]
    pub validation_bound: ValidationBound,
    /// Hide the sheet holding dropdown values.
    #[arg(long, default_value_t = false)]
    pub hide_linked_sheet: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            with_group: true,
            ignore_empty_rows: false,
            sheet_name: "Data".to_string(),
            linked_sheet_name: "LinkedData".to_string(),
            group_font_size: 16.0,
            group_row_height: 25.0,
            validation_bound: ValidationBound::default(),
            hide_linked_sheet: false,
        }
    }
}

impl ExportOptions {
    /// First row of the header block that holds column labels.
    pub fn header_row(&self) -> u32 {
        if self.with_group {
            2
        } else {
            1
        }
    }

    /// First row written with data.
    pub fn first_data_row(&self) -> u32 {
        self.header_row() + 1
    }
}
