use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::address::column_letters;

/// Widest column Excel accepts, in character units.
const MAX_COLUMN_WIDTH: f64 = 255.0;

/// A column as supplied by the caller: either a bare header label or a full
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawColumn {
    Label(String),
    Spec(ColumnDescriptor),
}

/// Objects read as descriptors; any other value is taken as a label.
impl<'de> Deserialize<'de> for RawColumn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Object(_) => {
                RawColumn::Spec(ColumnDescriptor::deserialize(value).unwrap_or_default())
            }
            other => RawColumn::Label(lenient_text(&other).unwrap_or_default()),
        })
    }
}

fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(lenient_text(&Value::deserialize(deserializer)?))
}

fn text_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.iter().filter_map(lenient_text).collect()),
        _ => None,
    })
}

/// Numbers and numeric strings, truncated and capped at the Excel maximum.
/// Anything below one means "no fixed width".
fn width<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let width = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(width
        .filter(|w| *w >= 1.0)
        .map(|w| w.min(MAX_COLUMN_WIDTH) as u32))
}

impl From<&str> for RawColumn {
    fn from(label: &str) -> Self {
        RawColumn::Label(label.to_string())
    }
}

impl From<String> for RawColumn {
    fn from(label: String) -> Self {
        RawColumn::Label(label)
    }
}

impl From<ColumnDescriptor> for RawColumn {
    fn from(descriptor: ColumnDescriptor) -> Self {
        RawColumn::Spec(descriptor)
    }
}

/// Record form of a column. Every field is optional; missing or mistyped
/// values fall back to permissive defaults instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnDescriptor {
    /// Header text.
    #[serde(deserialize_with = "text")]
    pub label: Option<String>,
    /// Group header this column sits under.
    #[serde(deserialize_with = "text")]
    pub label_group: Option<String>,
    /// Allowed values; a non-empty list turns the column into a dropdown.
    #[serde(deserialize_with = "text_list")]
    pub values: Option<Vec<String>>,
    /// Fixed column width. Columns without one are auto-sized.
    #[serde(deserialize_with = "width")]
    pub size: Option<u32>,
    /// Title of the input prompt shown for the dropdown.
    #[serde(deserialize_with = "text")]
    pub prompt_title: Option<String>,
    /// Body of the input prompt. Ignored without a title.
    #[serde(deserialize_with = "text")]
    pub prompt: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a new `ColumnDescriptor` with only a header label set.
    ///
    /// # Arguments
    ///
    /// * `label` - The header text of the column.
    pub fn new(label: &str) -> Self {
        ColumnDescriptor {
            label: Some(label.to_string()),
            ..Default::default()
        }
    }

    pub fn group(mut self, group: &str) -> Self {
        self.label_group = Some(group.to_string());
        self
    }

    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn size(mut self, width: u32) -> Self {
        self.size = Some(width);
        self
    }

    pub fn prompt(mut self, title: &str, text: &str) -> Self {
        self.prompt_title = Some(title.to_string());
        self.prompt = Some(text.to_string());
        self
    }
}

/// Key a column is grouped by.
///
/// A missing group and an empty group label both normalize to `Ungrouped`,
/// so they always share one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Ungrouped,
    Named(String),
}

impl GroupKey {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(l) if !l.is_empty() => GroupKey::Named(l.to_string()),
            _ => GroupKey::Ungrouped,
        }
    }

    /// Text written into the group header cell.
    pub fn label(&self) -> &str {
        match self {
            GroupKey::Ungrouped => "",
            GroupKey::Named(label) => label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthMode {
    Fixed(u32),
    Auto,
}

/// Input prompt attached to a dropdown column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPrompt {
    pub title: String,
    pub text: Option<String>,
}

/// A normalized output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// 1-based position among all output columns.
    pub index: u32,
    pub label: String,
    pub group: GroupKey,
    pub domain_values: Vec<String>,
    pub width: WidthMode,
    pub prompt: Option<ValidationPrompt>,
}

impl ColumnSpec {
    fn from_descriptor(index: u32, group: GroupKey, descriptor: ColumnDescriptor) -> Self {
        let width = match descriptor.size {
            Some(w) => WidthMode::Fixed(w),
            None => WidthMode::Auto,
        };
        let prompt = descriptor
            .prompt_title
            .filter(|t| !t.is_empty())
            .map(|title| ValidationPrompt {
                title,
                text: descriptor.prompt.filter(|t| !t.is_empty()),
            });
        ColumnSpec {
            index,
            label: descriptor.label.unwrap_or_default(),
            group,
            domain_values: descriptor.values.unwrap_or_default(),
            width,
            prompt,
        }
    }

    /// Column letters, e.g. `C`.
    pub fn letters(&self) -> String {
        column_letters(self.index)
    }

    /// Whether this column gets a dropdown backed by the linked sheet.
    pub fn is_linked(&self) -> bool {
        !self.domain_values.is_empty()
    }
}

/// A group and the contiguous run of column indices it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub key: GroupKey,
    pub first_index: u32,
    pub last_index: u32,
}

impl ColumnGroup {
    pub fn label(&self) -> &str {
        self.key.label()
    }

    /// Number of columns in the group; always at least one.
    pub fn span(&self) -> usize {
        (self.last_index - self.first_index + 1) as usize
    }
}

/// Planned columns in output order plus their group partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPlan {
    pub columns: Vec<ColumnSpec>,
    pub groups: Vec<ColumnGroup>,
}

impl ColumnPlan {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn linked_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.is_linked())
    }

    /// Columns belonging to `group`, in index order.
    pub fn group_columns(&self, group: &ColumnGroup) -> &[ColumnSpec] {
        let start = (group.first_index - 1) as usize;
        let end = group.last_index as usize;
        &self.columns[start..end]
    }
}

/// Turns raw column input into a [`ColumnPlan`].
pub struct ColumnPlanner;

impl ColumnPlanner {
    /// Groups columns by label in first-seen order (a stable grouping, not a
    /// sort), then numbers them 1..N in that flattened order.
    pub fn plan<I>(columns: I) -> ColumnPlan
    where
        I: IntoIterator,
        I::Item: Into<RawColumn>,
    {
        let mut buckets: Vec<(GroupKey, Vec<ColumnDescriptor>)> = Vec::new();
        for raw in columns {
            let descriptor = match raw.into() {
                RawColumn::Label(label) => ColumnDescriptor {
                    label: Some(label),
                    ..Default::default()
                },
                RawColumn::Spec(descriptor) => descriptor,
            };
            let key = GroupKey::from_label(descriptor.label_group.as_deref());
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(descriptor),
                None => buckets.push((key, vec![descriptor])),
            }
        }

        let mut plan = ColumnPlan::default();
        let mut next_index = 1u32;
        for (key, members) in buckets {
            let first_index = next_index;
            for descriptor in members {
                plan.columns
                    .push(ColumnSpec::from_descriptor(next_index, key.clone(), descriptor));
                next_index += 1;
            }
            plan.groups.push(ColumnGroup {
                key,
                first_index,
                last_index: next_index - 1,
            });
        }

        debug!(
            columns = plan.columns.len(),
            groups = plan.groups.len(),
            linked = plan.linked_columns().count(),
            "planned columns"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(plan: &ColumnPlan) -> Vec<&str> {
        plan.columns.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_plain_labels_form_one_ungrouped_run() {
        let plan = ColumnPlanner::plan(["N", "Name", "Rating"]);
        assert_eq!(labels(&plan), vec!["N", "Name", "Rating"]);
        assert_eq!(
            plan.columns.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].key, GroupKey::Ungrouped);
        assert_eq!(plan.groups[0].span(), 3);
    }

    #[test]
    fn test_interleaved_groups_become_contiguous_in_first_seen_order() {
        let plan = ColumnPlanner::plan(vec![
            RawColumn::from(ColumnDescriptor::new("a1").group("A")),
            ColumnDescriptor::new("b1").group("B").into(),
            ColumnDescriptor::new("a2").group("A").into(),
            "plain".into(),
            ColumnDescriptor::new("b2").group("B").into(),
        ]);
        assert_eq!(labels(&plan), vec!["a1", "a2", "b1", "b2", "plain"]);
        let groups: Vec<(&str, u32, u32)> = plan
            .groups
            .iter()
            .map(|g| (g.label(), g.first_index, g.last_index))
            .collect();
        assert_eq!(groups, vec![("A", 1, 2), ("B", 3, 4), ("", 5, 5)]);
        assert_eq!(
            plan.group_columns(&plan.groups[1])
                .iter()
                .map(|c| c.label.as_str())
                .collect::<Vec<_>>(),
            vec!["b1", "b2"]
        );
    }

    #[test]
    fn test_indices_are_contiguous_and_groups_contiguous() {
        let raw: Vec<RawColumn> = (0..40)
            .map(|i| ColumnDescriptor::new(&format!("c{i}")).group(&format!("g{}", i % 7)).into())
            .collect();
        let plan = ColumnPlanner::plan(raw);
        let indices: Vec<u32> = plan.columns.iter().map(|c| c.index).collect();
        assert_eq!(indices, (1..=40).collect::<Vec<_>>());
        for group in &plan.groups {
            assert!(plan
                .group_columns(group)
                .iter()
                .all(|c| c.group == group.key));
        }
        let covered: usize = plan.groups.iter().map(|g| g.span()).sum();
        assert_eq!(covered, 40);
        assert_eq!(plan.groups[0].label(), "g0");
        assert_eq!(plan.groups[6].label(), "g6");
    }

    #[test]
    fn test_empty_and_missing_group_share_a_bucket() {
        let plan = ColumnPlanner::plan(vec![
            RawColumn::from("x"),
            ColumnDescriptor::new("y").group("").into(),
        ]);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].key, GroupKey::Ungrouped);
    }

    #[test]
    fn test_descriptor_defaults_and_linking() {
        let plan = ColumnPlanner::plan(vec![
            RawColumn::Spec(ColumnDescriptor::default()),
            ColumnDescriptor::new("pick").values(["X", "Y"]).size(30).into(),
            ColumnDescriptor::new("empty").values(Vec::<String>::new()).into(),
        ]);
        let blank = &plan.columns[0];
        assert_eq!(blank.label, "");
        assert_eq!(blank.width, WidthMode::Auto);
        assert!(!blank.is_linked());

        let pick = &plan.columns[1];
        assert!(pick.is_linked());
        assert_eq!(pick.width, WidthMode::Fixed(30));
        assert_eq!(pick.letters(), "B");

        assert!(!plan.columns[2].is_linked());
        assert_eq!(plan.linked_columns().count(), 1);
    }

    #[test]
    fn test_prompt_requires_title() {
        let plan = ColumnPlanner::plan(vec![
            RawColumn::from(ColumnDescriptor::new("a").prompt("Pick", "One of the list")),
            ColumnDescriptor {
                prompt: Some("orphan text".to_string()),
                ..ColumnDescriptor::new("b")
            }
            .into(),
            ColumnDescriptor::new("c").prompt("Title only", "").into(),
        ]);
        assert_eq!(
            plan.columns[0].prompt,
            Some(ValidationPrompt {
                title: "Pick".to_string(),
                text: Some("One of the list".to_string()),
            })
        );
        assert_eq!(plan.columns[1].prompt, None);
        assert_eq!(plan.columns[2].prompt.as_ref().map(|p| p.text.clone()), Some(None));
    }

    #[test]
    fn test_descriptor_from_json() {
        let raw: Vec<RawColumn> = serde_json::from_str(
            r#"["N", {"label": "Pick", "labelGroup": "G", "values": ["X", 2], "size": 20}]"#,
        )
        .unwrap();
        assert_eq!(raw[0], RawColumn::Label("N".to_string()));
        assert_eq!(
            raw[1],
            RawColumn::Spec(ColumnDescriptor::new("Pick").group("G").values(["X", "2"]).size(20))
        );
    }

    #[test]
    fn test_mistyped_size_falls_back_to_auto() {
        let raw: Vec<RawColumn> = serde_json::from_str(
            r#"[{"label": "x", "size": -5}, {"size": "12"}, {"size": 12.7}, {"size": 9000}, {"size": [1]}]"#,
        )
        .unwrap();
        let plan = ColumnPlanner::plan(raw);
        let widths: Vec<WidthMode> = plan.columns.iter().map(|c| c.width).collect();
        assert_eq!(
            widths,
            vec![
                WidthMode::Auto,
                WidthMode::Fixed(12),
                WidthMode::Fixed(12),
                WidthMode::Fixed(255),
                WidthMode::Auto,
            ]
        );
        assert_eq!(plan.columns[0].label, "x");
    }

    #[test]
    fn test_non_list_values_are_ignored() {
        let raw: Vec<RawColumn> =
            serde_json::from_str(r#"[{"label": "x", "values": "abc"}, {"values": {"a": 1}}]"#)
                .unwrap();
        let plan = ColumnPlanner::plan(raw);
        assert_eq!(plan.columns[0].label, "x");
        assert!(plan.linked_columns().next().is_none());
    }

    #[test]
    fn test_non_string_labels_are_stringified() {
        let raw: Vec<RawColumn> = serde_json::from_str(
            r#"[{"label": 7, "labelGroup": 2024}, {"label": null, "labelGroup": {}}, 3, null]"#,
        )
        .unwrap();
        let plan = ColumnPlanner::plan(raw);
        assert_eq!(labels(&plan), vec!["7", "", "3", ""]);
        assert_eq!(plan.groups[0].key, GroupKey::Named("2024".to_string()));
        assert_eq!(plan.groups[1].key, GroupKey::Ungrouped);
        assert_eq!(plan.groups[1].span(), 3);
    }

    #[test]
    fn test_empty_input() {
        let plan = ColumnPlanner::plan(Vec::<RawColumn>::new());
        assert!(plan.is_empty());
        assert!(plan.groups.is_empty());
    }
}
