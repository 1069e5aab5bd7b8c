//! Live catalog introspection
//!
//! [`CatalogReader`] issues the fixed MySQL introspection queries and turns the loosely typed
//! rows into DTOs. The diff never sees a raw [`Row`].

use std::collections::BTreeMap;

use indexmap::IndexMap;
use sea_query::Value;

use crate::error::{Result, StructureError};
use crate::executor::{quote_ident, Row, SchemaExecutor};
use crate::structure::column::{ColumnDefinition, DefaultClause};
use crate::structure::constraint::{Constraint, ReferentialAction};
use crate::structure::index::{Index, IndexKind};

/// One row of `SHOW FULL COLUMNS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectedColumn {
    pub field: String,
    pub sql_type: String,
    pub collation: Option<String>,
    pub nullable: bool,
    pub default: Option<String>,
    pub extra: String,
}

impl IntrospectedColumn {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            field: required(row, "Field")?,
            sql_type: required(row, "Type")?,
            collation: row.get_string("Collation"),
            nullable: row
                .get_string("Null")
                .map(|n| n.eq_ignore_ascii_case("YES"))
                .unwrap_or(false),
            default: row.get_string("Default"),
            extra: row.get_string("Extra").unwrap_or_default(),
        })
    }

    /// Rebuild the column definition in the same shape a declaration renders to
    pub fn definition(&self) -> ColumnDefinition {
        let extra = self.extra.to_lowercase();
        let default = if extra.contains("auto_increment") {
            DefaultClause::AutoIncrement
        } else {
            match &self.default {
                Some(value) if is_current_timestamp(value) => DefaultClause::CurrentTimestamp {
                    on_update: extra.contains("on update current_timestamp"),
                },
                Some(value) => DefaultClause::Literal {
                    value: value.clone(),
                    allow_null: self.nullable,
                },
                None if self.nullable => DefaultClause::Null,
                None => DefaultClause::NotNull,
            }
        };

        ColumnDefinition {
            name: self.field.clone(),
            sql_type: self.sql_type.clone(),
            collation: self.collation.clone(),
            default,
        }
    }
}

fn is_current_timestamp(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    lowered == "current_timestamp" || lowered == "current_timestamp()"
}

/// A live secondary index, assembled from one catalog row per column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectedKey {
    pub name: String,
    pub unique: bool,
    pub index_type: String,
    /// Column names keyed by `SEQ_IN_INDEX`
    pub columns: BTreeMap<i64, String>,
}

impl IntrospectedKey {
    pub fn to_index(&self) -> Index {
        let kind = if self.unique {
            IndexKind::Unique
        } else if self.index_type.eq_ignore_ascii_case("FULLTEXT") {
            IndexKind::Fulltext
        } else {
            IndexKind::Plain
        };
        Index::named(self.name.clone(), kind, self.columns.values().cloned().collect())
    }
}

/// A live foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectedConstraint {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub delete_rule: String,
    pub update_rule: String,
}

impl IntrospectedConstraint {
    pub fn to_constraint(&self) -> Constraint {
        Constraint {
            name: self.name.clone(),
            column: self.column.clone(),
            referenced_table: self.referenced_table.clone(),
            referenced_column: self.referenced_column.clone(),
            on_delete: ReferentialAction::parse(&self.delete_rule),
            on_update: ReferentialAction::parse(&self.update_rule),
        }
    }
}

/// Engine, default charset and collation of a live table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

/// Snapshot of everything the diff needs about an existing table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveTable {
    pub columns: Vec<IntrospectedColumn>,
    pub primary_key: Vec<String>,
    pub keys: Vec<IntrospectedKey>,
    pub constraints: Vec<IntrospectedConstraint>,
    pub options: TableOptions,
}

impl LiveTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.field == name)
    }
}

/// Runs the catalog queries for one schema
pub struct CatalogReader<'a> {
    executor: &'a dyn SchemaExecutor,
}

impl<'a> CatalogReader<'a> {
    pub fn new(executor: &'a dyn SchemaExecutor) -> Self {
        Self { executor }
    }

    fn schema_param(&self) -> Value {
        Value::String(Some(self.executor.database().to_string()))
    }

    /// `SHOW TABLES LIKE`, with wildcards in the name escaped
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let rows = self.executor.query(
            "SHOW TABLES LIKE ?",
            &[Value::String(Some(escape_like(table)))],
        )?;
        Ok(!rows.is_empty())
    }

    pub fn columns(&self, table: &str) -> Result<Vec<IntrospectedColumn>> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_ident(table));
        self.executor
            .query(&sql, &[])?
            .iter()
            .map(IntrospectedColumn::from_row)
            .collect()
    }

    /// Primary key columns ordered by `Seq_in_index`; empty when there is none
    pub fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SHOW INDEX FROM {} WHERE Key_name = 'PRIMARY'",
            quote_ident(table)
        );
        let mut columns = BTreeMap::new();
        for row in self.executor.query(&sql, &[])? {
            columns.insert(row.get_i64("Seq_in_index").unwrap_or(0), required(&row, "Column_name")?);
        }
        Ok(columns.into_values().collect())
    }

    /// Secondary indexes from `information_schema.STATISTICS`, grouped by index name
    pub fn keys(&self, table: &str) -> Result<Vec<IntrospectedKey>> {
        let rows = self.executor.query(
            "SELECT INDEX_NAME, COLUMN_NAME, SEQ_IN_INDEX, NON_UNIQUE, INDEX_TYPE \
             FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY'",
            &[self.schema_param(), Value::String(Some(table.to_string()))],
        )?;

        let mut keys: IndexMap<String, IntrospectedKey> = IndexMap::new();
        for row in &rows {
            let name = required(row, "INDEX_NAME")?;
            let key = keys.entry(name.clone()).or_insert_with(|| IntrospectedKey {
                name,
                unique: row.get_i64("NON_UNIQUE") == Some(0),
                index_type: row.get_string("INDEX_TYPE").unwrap_or_default(),
                columns: BTreeMap::new(),
            });
            key.columns.insert(
                row.get_i64("SEQ_IN_INDEX").unwrap_or(0),
                required(row, "COLUMN_NAME")?,
            );
        }
        Ok(keys.into_values().collect())
    }

    /// Foreign keys from `REFERENTIAL_CONSTRAINTS` joined with `KEY_COLUMN_USAGE`
    pub fn constraints(&self, table: &str) -> Result<Vec<IntrospectedConstraint>> {
        let rows = self.executor.query(
            "SELECT rc.CONSTRAINT_NAME, kcu.COLUMN_NAME, kcu.REFERENCED_TABLE_NAME, \
             kcu.REFERENCED_COLUMN_NAME, rc.UPDATE_RULE, rc.DELETE_RULE \
             FROM information_schema.REFERENTIAL_CONSTRAINTS rc \
             JOIN information_schema.KEY_COLUMN_USAGE kcu \
             ON kcu.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA \
             AND kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME \
             AND kcu.TABLE_NAME = rc.TABLE_NAME \
             WHERE rc.UNIQUE_CONSTRAINT_SCHEMA = ? AND rc.TABLE_NAME = ?",
            &[self.schema_param(), Value::String(Some(table.to_string()))],
        )?;

        rows.iter()
            .map(|row| {
                Ok(IntrospectedConstraint {
                    name: required(row, "CONSTRAINT_NAME")?,
                    column: required(row, "COLUMN_NAME")?,
                    referenced_table: required(row, "REFERENCED_TABLE_NAME")?,
                    referenced_column: required(row, "REFERENCED_COLUMN_NAME")?,
                    delete_rule: row.get_string("DELETE_RULE").unwrap_or_default(),
                    update_rule: row.get_string("UPDATE_RULE").unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Engine/charset/collation from `information_schema.TABLES`
    pub fn table_options(&self, table: &str) -> Result<TableOptions> {
        let rows = self.executor.query(
            "SELECT t.ENGINE, ccsa.CHARACTER_SET_NAME, t.TABLE_COLLATION \
             FROM information_schema.TABLES t \
             JOIN information_schema.COLLATION_CHARACTER_SET_APPLICABILITY ccsa \
             ON ccsa.COLLATION_NAME = t.TABLE_COLLATION \
             WHERE t.TABLE_SCHEMA = ? AND t.TABLE_NAME = ?",
            &[self.schema_param(), Value::String(Some(table.to_string()))],
        )?;

        Ok(rows
            .first()
            .map(|row| TableOptions {
                engine: row.get_string("ENGINE"),
                charset: row.get_string("CHARACTER_SET_NAME"),
                collation: row.get_string("TABLE_COLLATION"),
            })
            .unwrap_or_default())
    }

    /// `VIEW_DEFINITION` from `information_schema.VIEWS`, `None` when the view is absent
    pub fn view_definition(&self, view: &str) -> Result<Option<String>> {
        let rows = self.executor.query(
            "SELECT VIEW_DEFINITION FROM information_schema.VIEWS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
            &[self.schema_param(), Value::String(Some(view.to_string()))],
        )?;
        Ok(rows
            .first()
            .map(|row| row.get_string("VIEW_DEFINITION").unwrap_or_default()))
    }

    /// Full snapshot of an existing table
    pub fn live_table(&self, table: &str) -> Result<LiveTable> {
        Ok(LiveTable {
            columns: self.columns(table)?,
            primary_key: self.primary_key(table)?,
            keys: self.keys(table)?,
            constraints: self.constraints(table)?,
            options: self.table_options(table)?,
        })
    }
}

fn required(row: &Row, column: &str) -> Result<String> {
    row.get_string(column).ok_or_else(|| {
        StructureError::query(
            format!("<catalog row {column}>"),
            format!("catalog row is missing '{column}'"),
        )
    })
}

/// Escape `%`, `_` and `\` for a `LIKE` pattern
pub(crate) fn escape_like(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockExecutor, MockTable};

    fn column_row(field: &str, ty: &str, null: &str, default: Option<&str>, extra: &str) -> Row {
        Row::new()
            .with("Field", field)
            .with("Type", ty)
            .with("Collation", Value::String(None))
            .with("Null", null)
            .with("Default", Value::String(default.map(str::to_string)))
            .with("Extra", extra)
    }

    #[test]
    fn test_introspected_defaults() {
        let cases = [
            (column_row("id", "int", "NO", None, "auto_increment"), DefaultClause::AutoIncrement),
            (column_row("n", "int", "NO", None, ""), DefaultClause::NotNull),
            (column_row("n", "int", "YES", None, ""), DefaultClause::Null),
            (
                column_row("s", "int", "NO", Some("0"), ""),
                DefaultClause::Literal { value: "0".into(), allow_null: false },
            ),
            (
                column_row("t", "timestamp", "NO", Some("CURRENT_TIMESTAMP"), "DEFAULT_GENERATED on update CURRENT_TIMESTAMP"),
                DefaultClause::CurrentTimestamp { on_update: true },
            ),
            (
                column_row("t", "timestamp", "NO", Some("current_timestamp()"), ""),
                DefaultClause::CurrentTimestamp { on_update: false },
            ),
        ];

        for (row, expected) in cases {
            let col = IntrospectedColumn::from_row(&row).unwrap();
            assert_eq!(col.definition().default, expected, "row {:?}", row);
        }
    }

    #[test]
    fn test_keys_grouped_and_ordered_by_sequence() {
        let executor = MockExecutor::new("shop");
        executor.add_table(
            MockTable::new("user_x_role")
                .with_index("user_id_role_id", "role_id", 2, IndexKind::Unique)
                .with_index("user_id_role_id", "user_id", 1, IndexKind::Unique)
                .with_index("note", "note", 1, IndexKind::Fulltext),
        );

        let keys = CatalogReader::new(&executor).keys("user_x_role").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(
            keys[0].to_index().to_string(),
            "UNIQUE KEY `user_id_role_id` (`user_id`, `role_id`)"
        );
        assert_eq!(keys[1].to_index().to_string(), "FULLTEXT KEY `note` (`note`)");
    }

    #[test]
    fn test_table_exists_escapes_wildcards() {
        let executor = MockExecutor::new("shop");
        executor.add_table(MockTable::new("userAxArole"));
        let reader = CatalogReader::new(&executor);
        assert!(reader.table_exists("userAxArole").unwrap());
        assert!(!reader.table_exists("user_x_role").unwrap());
        assert_eq!(escape_like("a_b%"), "a\\_b\\%");
    }

    #[test]
    fn test_missing_view_definition() {
        let executor = MockExecutor::new("shop");
        assert_eq!(CatalogReader::new(&executor).view_definition("v").unwrap(), None);
    }
}
