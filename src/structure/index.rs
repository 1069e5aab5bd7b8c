use std::fmt;

use crate::error::{Result, StructureError};
use crate::executor::quote_ident;

/// Secondary index flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Plain,
    Unique,
    Fulltext,
}

impl IndexKind {
    fn prefix(self) -> &'static str {
        match self {
            IndexKind::Plain => "",
            IndexKind::Unique => "UNIQUE ",
            IndexKind::Fulltext => "FULLTEXT ",
        }
    }
}

/// A secondary index over one or more columns
///
/// The name is the column names joined with `_`, so the same column list always yields the
/// same index name and the diff can match declared and live indexes by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    columns: Vec<String>,
    kind: IndexKind,
}

impl Index {
    /// # Errors
    ///
    /// Returns `StructureError::Declaration` for an empty column list.
    pub fn new<S: AsRef<str>>(kind: IndexKind, columns: &[S]) -> Result<Self> {
        if columns.is_empty() {
            return Err(StructureError::Declaration(
                "An index needs at least one column".to_string(),
            ));
        }
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Ok(Self {
            name: columns.join("_"),
            columns,
            kind,
        })
    }

    /// Index with an explicit name (used for indexes read back from the catalog)
    pub fn named(name: impl Into<String>, kind: IndexKind, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        write!(
            f,
            "{}KEY {} ({})",
            self.kind.prefix(),
            quote_ident(&self.name),
            columns.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_joins_columns() {
        let idx = Index::new(IndexKind::Plain, &["user_id", "role_id"]).unwrap();
        assert_eq!(idx.name(), "user_id_role_id");
        assert_eq!(idx.to_string(), "KEY `user_id_role_id` (`user_id`, `role_id`)");
    }

    #[test]
    fn test_unique_and_fulltext_prefix() {
        let unique = Index::new(IndexKind::Unique, &["email"]).unwrap();
        assert_eq!(unique.to_string(), "UNIQUE KEY `email` (`email`)");

        let fulltext = Index::new(IndexKind::Fulltext, &["title", "body"]).unwrap();
        assert_eq!(fulltext.to_string(), "FULLTEXT KEY `title_body` (`title`, `body`)");
    }

    #[test]
    fn test_empty_index_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            Index::new(IndexKind::Unique, &empty),
            Err(StructureError::Declaration(_))
        ));
    }
}
