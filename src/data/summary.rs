//! Numeric roll-ups of dataset snapshots

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Row count and per-column totals of a dataset snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    /// Number of object rows that were summed
    pub rows: usize,
    /// Sum of every numeric field, keyed by field name
    pub totals: BTreeMap<String, f64>,
}

impl DatasetSummary {
    /// Summarises a JSON payload
    ///
    /// An array is treated as a list of rows. An object wrapping its rows in a
    /// `data` or `results` array is unwrapped; any other object counts as a
    /// single row. Non-object rows and non-numeric fields are skipped.
    pub fn from_payload(payload: &Value) -> Self {
        let mut summary = Self::default();
        match payload {
            Value::Array(rows) => summary.add_rows(rows),
            Value::Object(object) => match wrapped_rows(object) {
                Some(rows) => summary.add_rows(rows),
                None => summary.add_row(object),
            },
            _ => {}
        }
        summary
    }

    fn add_rows(&mut self, rows: &[Value]) {
        for row in rows {
            if let Value::Object(row) = row {
                self.add_row(row);
            }
        }
    }

    fn add_row(&mut self, row: &Map<String, Value>) {
        self.rows += 1;
        for (field, value) in row {
            if let Some(n) = value.as_f64() {
                *self.totals.entry(field.clone()).or_insert(0.0) += n;
            }
        }
    }
}

fn wrapped_rows(object: &Map<String, Value>) -> Option<&Vec<Value>> {
    ["data", "results"]
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_array))
}
