use crate::client::Submission;
use crate::data::value::Value;
use indexmap::{IndexMap, IndexSet};

/// Flattened tabular projection of a set of submissions. Column order is
/// fixed at construction and preserved by every downstream step.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Dataset { columns, rows }
    }

    pub fn empty() -> Self {
        Dataset {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom. None if the column is unknown.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }
}

/// Flatten submissions into a dataset. Nested objects become dot-path
/// columns (`group.field`), arrays keep their JSON text so no information
/// is dropped. The column set is the union of all fields in first-observed
/// order; fields a row lacks become explicit nulls.
pub fn flatten(submissions: &[Submission]) -> Dataset {
    let mut columns: IndexSet<String> = IndexSet::new();
    let mut flat_rows: Vec<IndexMap<String, Value>> = Vec::with_capacity(submissions.len());

    for submission in submissions {
        let mut flat = IndexMap::new();
        for (key, value) in submission.fields() {
            flatten_into(key, value, &mut flat);
        }
        for key in flat.keys() {
            columns.insert(key.clone());
        }
        flat_rows.push(flat);
    }

    let columns: Vec<String> = columns.into_iter().collect();
    let rows = flat_rows
        .into_iter()
        .map(|mut flat| {
            columns
                .iter()
                .map(|col| flat.swap_remove(col).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Dataset::new(columns, rows)
}

fn flatten_into(prefix: &str, value: &serde_json::Value, out: &mut IndexMap<String, Value>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                let path = format!("{}.{}", prefix, key);
                flatten_into(&path, nested, out);
            }
        }
        serde_json::Value::Array(_) => {
            out.insert(prefix.to_string(), Value::Str(value.to_string()));
        }
        scalar => {
            out.insert(prefix.to_string(), Value::from_scalar(scalar));
        }
    }
}
