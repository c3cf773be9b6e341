//! Spreadsheet cell addressing.
//!
//! Columns and rows are 1-based throughout this crate, matching the `A1`
//! notation that ends up in merge ranges and validation formulas.

use std::fmt;

use rust_xlsxwriter::utility::quote_sheet_name;

/// Converts a 1-based column index into its letter label (1 -> `A`, 27 -> `AA`).
///
/// The index must be at least 1.
pub fn column_letters(index: u32) -> String {
    debug_assert!(index >= 1, "column index is 1-based");
    let mut letters = String::new();
    let mut n = index;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.insert(0, char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters
}

/// Converts a letter label back into its 1-based column index.
///
/// Returns `None` for an empty label, non-letter characters or an overflow.
/// Lowercase letters are accepted.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Formats a sheet name for use in a formula, quoting it only when needed.
///
/// Names that read as cell references (`A1`, `R1C1`) are quoted too.
pub fn sheet_reference(name: &str) -> String {
    quote_sheet_name(name)
}

/// A single cell, `column` and `row` both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        CellRef { column, row }
    }

    /// Column letters of this cell.
    pub fn letters(&self) -> String {
        column_letters(self.column)
    }

    /// Absolute form, e.g. `$C$2`.
    pub fn absolute(&self) -> String {
        format!("${}${}", self.letters(), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letters(), self.row)
    }
}

/// A rectangular range between two cells, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first: CellRef,
    pub last: CellRef,
}

impl CellRange {
    pub fn new(first: CellRef, last: CellRef) -> Self {
        CellRange { first, last }
    }

    pub fn single(cell: CellRef) -> Self {
        CellRange {
            first: cell,
            last: cell,
        }
    }

    /// A run of rows within one column.
    pub fn column_span(column: u32, first_row: u32, last_row: u32) -> Self {
        CellRange::new(CellRef::new(column, first_row), CellRef::new(column, last_row))
    }

    /// A run of columns within one row.
    pub fn row_span(row: u32, first_column: u32, last_column: u32) -> Self {
        CellRange::new(CellRef::new(first_column, row), CellRef::new(last_column, row))
    }

    pub fn is_single_cell(&self) -> bool {
        self.first == self.last
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.first.column..=self.last.column).contains(&cell.column)
            && (self.first.row..=self.last.row).contains(&cell.row)
    }

    /// Iterates the cells row by row.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.first.row..=self.last.row).flat_map(move |row| {
            (self.first.column..=self.last.column).map(move |column| CellRef::new(column, row))
        })
    }

    /// Absolute form, e.g. `$C$2:$C$4`.
    pub fn absolute(&self) -> String {
        format!("{}:{}", self.first.absolute(), self.last.absolute())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_sequence() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(2), "B");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(53), "BA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(16_384), "XFD");
    }

    #[test]
    fn test_column_index_inverts_letters() {
        for n in 1..=2_000 {
            assert_eq!(column_index(&column_letters(n)), Some(n));
        }
        assert_eq!(column_index("xfd"), Some(16_384));
    }

    #[test]
    fn test_column_index_rejects_malformed() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("ZZZZZZZZZZ"), None);
    }

    #[test]
    fn test_cell_and_range_display() {
        let range = CellRange::column_span(3, 3, 1000);
        assert_eq!(range.to_string(), "C3:C1000");
        assert_eq!(CellRef::new(3, 2).to_string(), "C2");
        assert_eq!(CellRange::column_span(3, 2, 4).absolute(), "$C$2:$C$4");
        assert!(CellRange::single(CellRef::new(1, 1)).is_single_cell());
    }

    #[test]
    fn test_range_cells_and_contains() {
        let range = CellRange::row_span(1, 1, 3);
        let cells: Vec<String> = range.cells().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "C1"]);
        assert!(range.contains(CellRef::new(2, 1)));
        assert!(!range.contains(CellRef::new(2, 2)));
    }

    #[test]
    fn test_sheet_reference_quoting() {
        assert_eq!(sheet_reference("LinkedData"), "LinkedData");
        assert_eq!(sheet_reference("Linked Data"), "'Linked Data'");
        assert_eq!(sheet_reference("Bob's"), "'Bob''s'");
        assert_eq!(sheet_reference("A1"), "'A1'");
        assert_eq!(sheet_reference("R1C1"), "'R1C1'");
    }
}
