//! Aggregator: flattens a [`ProjectBundle`] into one table for the cloud sink.
//!
//! Four column groups are laid side by side, aligned on row index:
//!
//! | group          | rows | columns                                   |
//! |----------------|------|-------------------------------------------|
//! | `project_info` | 1    | `id`, `key`, `name`                       |
//! | `roles`        | 1    | one per role name                         |
//! | `versions`     | N    | union of the versions' keys               |
//! | `issues`       | M    | the five issue bundle fields              |
//!
//! The table has `max(1, N, M)` rows and every shorter group is padded with
//! `null`. This is a positional concatenation, not a join: row 2 pairs the third
//! version with the third issue purely by index, and the project/issue nesting is
//! only kept in the unflattened bundle.

use serde_json::{Map, Value};
use tracing::debug;

use crate::bundle::{IssueBundle, ProjectBundle};

/// Column name used for a version whose raw record is not a JSON object.
const SCALAR_VERSION_COLUMN: &str = "value";

const ISSUE_COLUMNS: [&str; 5] = [
    "issue_info",
    "comments",
    "worklogs",
    "changelog",
    "attachments",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnGroup {
    ProjectInfo,
    Roles,
    Versions,
    Issues,
}

impl ColumnGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnGroup::ProjectInfo => "project_info",
            ColumnGroup::Roles => "roles",
            ColumnGroup::Versions => "versions",
            ColumnGroup::Issues => "issues",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub group: ColumnGroup,
    /// Name as written to each row; qualified as `<group>.<name>` on collision.
    pub name: String,
    pub cells: Vec<Value>,
}

/// Column-wise concatenation of a project bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedRecord {
    pub columns: Vec<Column>,
    pub row_count: usize,
}

impl FlattenedRecord {
    /// Rows as ordered field/value mappings, every column present in every row.
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        (0..self.row_count)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| (column.name.clone(), column.cells[row].clone()))
                    .collect()
            })
            .collect()
    }

    /// JSON array of row objects.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.rows())
    }
}

/// Table builder for one group: named columns filled row by row.
struct GroupTable {
    group: ColumnGroup,
    names: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl GroupTable {
    fn new(group: ColumnGroup) -> Self {
        Self {
            group,
            names: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn push_row(&mut self, row: Map<String, Value>) {
        for name in row.keys() {
            if !self.names.contains(name) {
                self.names.push(name.clone());
            }
        }
        self.rows.push(row);
    }
}

/// Flatten a bundle. Pure: the same bundle always yields the same record.
pub fn flatten(bundle: &ProjectBundle) -> FlattenedRecord {
    let groups = [
        project_info_table(bundle),
        roles_table(bundle),
        versions_table(bundle),
        issues_table(&bundle.issues),
    ];
    let row_count = groups.iter().map(|g| g.rows.len()).max().unwrap_or(0);

    let mut columns: Vec<Column> = Vec::new();
    for table in groups {
        for name in &table.names {
            let taken = columns.iter().any(|c| &c.name == name);
            let column_name = if taken {
                format!("{}.{}", table.group.as_str(), name)
            } else {
                name.clone()
            };
            let cells = (0..row_count)
                .map(|row| {
                    table
                        .rows
                        .get(row)
                        .and_then(|r| r.get(name))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect();
            columns.push(Column {
                group: table.group,
                name: column_name,
                cells,
            });
        }
    }

    debug!(
        project_id = %bundle.project_id(),
        rows = row_count,
        columns = columns.len(),
        "Bundle flattened"
    );
    FlattenedRecord { columns, row_count }
}

fn project_info_table(bundle: &ProjectBundle) -> GroupTable {
    let info = &bundle.project_info;
    let mut table = GroupTable::new(ColumnGroup::ProjectInfo);
    let mut row = Map::new();
    row.insert("id".to_owned(), Value::String(info.id.clone()));
    row.insert("key".to_owned(), Value::String(info.key.clone()));
    row.insert("name".to_owned(), Value::String(info.name.clone()));
    table.push_row(row);
    table
}

fn roles_table(bundle: &ProjectBundle) -> GroupTable {
    let mut table = GroupTable::new(ColumnGroup::Roles);
    table.push_row(
        bundle
            .roles
            .iter()
            .map(|(name, url)| (name.clone(), Value::String(url.clone())))
            .collect(),
    );
    table
}

fn versions_table(bundle: &ProjectBundle) -> GroupTable {
    let mut table = GroupTable::new(ColumnGroup::Versions);
    for version in &bundle.versions {
        let row = match &version.raw {
            Some(Value::Object(fields)) => fields.clone(),
            Some(other) => {
                let mut row = Map::new();
                row.insert(SCALAR_VERSION_COLUMN.to_owned(), other.clone());
                row
            }
            None => Map::new(),
        };
        table.push_row(row);
    }
    table
}

fn issues_table(issues: &[IssueBundle]) -> GroupTable {
    let mut table = GroupTable::new(ColumnGroup::Issues);
    table.names = ISSUE_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
    for issue in issues {
        // IssueBundle holds only plain data; conversion cannot fail.
        let row = match issue.to_plain_record() {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        table.rows.push(row);
    }
    table
}
