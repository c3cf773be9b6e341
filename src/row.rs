use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// A single cell value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Blank,
    Bool(bool),
    Number(f64),
    String(String),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

struct CellValueVisitor;

impl<'de> Visitor<'de> for CellValueVisitor {
    type Value = CellValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a cell value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
        Ok(CellValue::Blank)
    }

    fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
        Ok(CellValue::Blank)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<CellValue, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<CellValue, E> {
        Ok(CellValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
        Ok(CellValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<CellValue, E> {
        Ok(CellValue::String(v))
    }

    // Nested lists and objects have no cell representation.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<CellValue, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(CellValue::Blank)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CellValue, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(CellValue::Blank)
    }
}

/// Accepts any JSON value: scalars map to their cell type, anything else is
/// read as a blank cell, so one odd cell never discards its row.
impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellValueVisitor)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Blank, Into::into)
    }
}

static BLANK: CellValue = CellValue::Blank;

/// An ordered sequence of cells. Its length need not match the column count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Row { cells }
    }

    /// Cell at a 0-based position; positions past the end read as blank.
    pub fn cell(&self, position: usize) -> &CellValue {
        self.cells.get(position).unwrap_or(&BLANK)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl From<Vec<CellValue>> for Row {
    fn from(cells: Vec<CellValue>) -> Self {
        Row { cells }
    }
}

/// Row input as it arrives from loosely typed sources. Anything that is not
/// a list of cells counts as an empty row.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    Cells(Vec<CellValue>),
    Other(IgnoredAny),
}

impl From<RawRow> for Row {
    fn from(raw: RawRow) -> Self {
        match raw {
            RawRow::Cells(cells) => Row { cells },
            RawRow::Other(_) => Row::default(),
        }
    }
}

/// Normalizes raw rows before layout.
pub struct RowPlanner;

impl RowPlanner {
    /// Keeps non-empty rows as they are. Empty rows are kept as explicit blank
    /// rows, or dropped when `ignore_empty_rows` is set. Order is preserved.
    pub fn normalize<I>(rows: I, ignore_empty_rows: bool) -> Vec<Row>
    where
        I: IntoIterator,
        I::Item: Into<Row>,
    {
        let mut dropped = 0usize;
        let normalized: Vec<Row> = rows
            .into_iter()
            .map(Into::into)
            .filter(|row: &Row| {
                let keep = !(row.is_empty() && ignore_empty_rows);
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .collect();
        debug!(rows = normalized.len(), dropped, "normalized rows");
        normalized
    }
}
