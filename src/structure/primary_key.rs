use std::fmt;

use crate::executor::quote_ident;

/// The table's primary key; column order is significant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    columns: Vec<String>,
}

impl PrimaryKey {
    pub(crate) fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Compare against the live key column list (ordered by `Seq_in_index`)
    pub fn matches(&self, live: &[String]) -> bool {
        self.columns.as_slice() == live
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        write!(f, "PRIMARY KEY({})", columns.join(", "))
    }
}
