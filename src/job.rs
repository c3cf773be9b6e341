use std::io::Read;

use serde::Deserialize;

use crate::column::RawColumn;
use crate::error::JobError;
use crate::export::ExcelExport;
use crate::options::ExportOptions;
use crate::row::RawRow;

fn default_true() -> bool {
    true
}

/// An export described as JSON:
///
/// ```json
/// {
///   "columns": ["N", {"label": "Name", "labelGroup": "Base", "values": ["a", "b"], "size": 20}],
///   "data": [[1, "a"], [], [2, null]],
///   "withGroup": true,
///   "ignoreEmptyRows": false
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub columns: Vec<RawColumn>,
    #[serde(default)]
    pub data: Vec<RawRow>,
    #[serde(default = "default_true")]
    pub with_group: bool,
    #[serde(default)]
    pub ignore_empty_rows: bool,
    pub sheet_name: Option<String>,
    pub linked_sheet_name: Option<String>,
}

impl ExportJob {
    pub fn from_json_str(input: &str) -> Result<Self, JobError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, JobError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Applies the job's settings on top of `options` and builds the export.
    pub fn into_export(self, options: ExportOptions) -> ExcelExport {
        let options = ExportOptions {
            with_group: self.with_group,
            ignore_empty_rows: self.ignore_empty_rows,
            sheet_name: self.sheet_name.unwrap_or(options.sheet_name),
            linked_sheet_name: self
                .linked_sheet_name
                .unwrap_or(options.linked_sheet_name),
            ..options
        };
        ExcelExport::new(self.columns, self.data, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{GroupKey, WidthMode};
    use crate::row::CellValue;

    #[test]
    fn test_job_from_json() {
        let job = ExportJob::from_json_str(
            r#"{
                "columns": [
                    {"label": "N", "labelGroup": "Base"},
                    {"label": "Name", "labelGroup": "Base"},
                    {"label": "Score", "labelGroup": "Rate", "values": ["X", "Y", "Z"], "size": 12},
                    "Note",
                    {}
                ],
                "data": [[1, "Acme", "X"], [], "junk", [2, "Beta", null, "ok"]]
            }"#,
        )
        .unwrap();
        assert!(job.with_group);
        assert!(!job.ignore_empty_rows);

        let export = job.into_export(ExportOptions::default());
        let columns = &export.columns().columns;
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[2].label, "Score");
        assert_eq!(columns[2].domain_values, vec!["X", "Y", "Z"]);
        assert_eq!(columns[3].group, GroupKey::Ungrouped);
        assert_eq!(columns[4].label, "");
        assert_eq!(export.rows().len(), 4);
        assert_eq!(export.rows()[3].cell(2), &CellValue::Blank);

        let plan = export.plan();
        assert_eq!(plan.data.validations[0].rule.formula, "LinkedData!$C$2:$C$4");
        assert_eq!(plan.data.validations[0].range.to_string(), "C3:C1000");
    }

    #[test]
    fn test_job_flags_and_sheet_names() {
        let job = ExportJob::from_reader(
            r#"{"columns": ["A"], "withGroup": false, "ignoreEmptyRows": true,
                "data": [[], [1]], "sheetName": "Rows"}"#
                .as_bytes(),
        )
        .unwrap();
        let export = job.into_export(ExportOptions::default());
        assert!(!export.options().with_group);
        assert_eq!(export.options().sheet_name, "Rows");
        assert_eq!(export.options().linked_sheet_name, "LinkedData");
        assert_eq!(export.rows().len(), 1);
    }

    #[test]
    fn test_job_keeps_rows_with_odd_cells() {
        let job = ExportJob::from_json_str(
            r#"{"columns": ["A", "B", "C"], "data": [[1, true, "keep me"]], "ignoreEmptyRows": true}"#,
        )
        .unwrap();
        let export = job.into_export(ExportOptions::default());
        assert_eq!(export.rows().len(), 1);
        assert_eq!(export.rows()[0].cell(1), &CellValue::Bool(true));
        assert_eq!(export.rows()[0].cell(2), &CellValue::from("keep me"));
    }

    #[test]
    fn test_job_tolerates_mistyped_columns() {
        let job = ExportJob::from_json_str(
            r#"{"columns": [{"label": "x", "size": -5}, {"label": "y", "values": "abc"}, {"label": 7}],
                "data": []}"#,
        )
        .unwrap();
        let export = job.into_export(ExportOptions::default());
        let columns = &export.columns().columns;
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].width, WidthMode::Auto);
        assert!(!columns[1].is_linked());
        assert_eq!(columns[2].label, "7");
    }

    #[test]
    fn test_job_rejects_malformed_json() {
        assert!(matches!(
            ExportJob::from_json_str("{\"columns\": [1, 2]"),
            Err(JobError::Json(_))
        ));
        assert!(ExportJob::from_json_str("{}").is_err());
    }
}
