//! Search results
//!
//! Searches answer with column metadata and positional rows. Rows are kept
//! as raw JSON arrays; callers pick cells by column index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One column of a search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchColumn {
    pub name: String,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub report_data_type: Option<String>,
    #[serde(default)]
    pub reference_data: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    #[serde(default)]
    pub columns: Vec<SearchColumn>,
    #[serde(default)]
    pub sorting: Vec<Value>,
    #[serde(default)]
    pub results_available: u64,
    #[serde(default)]
    pub results_returned: u64,
    #[serde(default)]
    pub first_result: u64,
    #[serde(default)]
    pub last_result: u64,
}

/// One page of a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub metadata: SearchMetadata,
    pub results: Vec<Vec<Value>>,
    /// Reference data keyed by reference name, when the service sent any
    pub reference: Option<Value>,
}

impl SearchPage {
    /// Position of `name` among the result columns
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.metadata.columns.iter().position(|column| column.name == name)
    }

    /// Cell `column` of every row
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        let index = self.column_index(column);
        self.results.iter().map(move |row| index.and_then(|i| row.get(i)))
    }

    /// Whether more results exist past this page
    pub fn has_more(&self) -> bool {
        self.metadata.last_result < self.metadata.results_available
    }
}
