//! Column declaration and the rendering shared by CREATE and comparison
//!
//! A column's definition is a pure function of its name, SQL type, collation and default
//! clause. Declared columns and catalog rows are both turned into a [`ColumnDefinition`] and
//! rendered by the same code, so a column created from a declaration reads back equal.

use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::Value;

use crate::error::{Result, StructureError};
use crate::executor::{quote_ident, value_to_plain_string, SchemaExecutor};
use crate::structure::index::IndexKind;

static INT_DISPLAY_WIDTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(tinyint|smallint|mediumint|int|integer|bigint)\((\d+)\)")
        .expect("display width pattern is valid")
});

/// Nullability and default part of a column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultClause {
    /// `NOT NULL`
    NotNull,
    /// `DEFAULT NULL`
    Null,
    /// `[NOT NULL ]DEFAULT <literal>`
    Literal {
        /// Unescaped literal text
        value: String,
        /// Omit `NOT NULL`
        allow_null: bool,
    },
    /// `NOT NULL DEFAULT CURRENT_TIMESTAMP[ ON UPDATE CURRENT_TIMESTAMP]`
    CurrentTimestamp { on_update: bool },
    /// `NOT NULL AUTO_INCREMENT`
    AutoIncrement,
}

impl DefaultClause {
    pub fn render(&self, executor: &dyn SchemaExecutor) -> String {
        match self {
            DefaultClause::NotNull => "NOT NULL".to_string(),
            DefaultClause::Null => "DEFAULT NULL".to_string(),
            DefaultClause::Literal { value, allow_null } => {
                let literal = executor.escape_literal(&Value::String(Some(value.clone())));
                if *allow_null {
                    format!("DEFAULT {literal}")
                } else {
                    format!("NOT NULL DEFAULT {literal}")
                }
            }
            DefaultClause::CurrentTimestamp { on_update: false } => {
                "NOT NULL DEFAULT CURRENT_TIMESTAMP".to_string()
            }
            DefaultClause::CurrentTimestamp { on_update: true } => {
                "NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP".to_string()
            }
            DefaultClause::AutoIncrement => "NOT NULL AUTO_INCREMENT".to_string(),
        }
    }
}

/// A fully resolved column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
    pub collation: Option<String>,
    pub default: DefaultClause,
}

impl ColumnDefinition {
    /// `` `name` type[ COLLATE c] default``, as used in CREATE/ADD/MODIFY/CHANGE
    pub fn render(&self, executor: &dyn SchemaExecutor) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.sql_type);
        if let Some(collation) = &self.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(collation);
        }
        sql.push(' ');
        sql.push_str(&self.default.render(executor));
        sql
    }

    /// Rendering used for comparison: integer display widths dropped (except `tinyint(1)`)
    /// and the type case folded, so MySQL 8 catalogs compare equal to declarations
    pub fn normalized(&self, executor: &dyn SchemaExecutor) -> String {
        ColumnDefinition {
            sql_type: normalize_type(&self.sql_type),
            collation: self.collation.as_ref().map(|c| c.to_lowercase()),
            ..self.clone()
        }
        .render(executor)
    }
}

pub(crate) fn normalize_type(sql_type: &str) -> String {
    let lowered = sql_type.trim().to_lowercase();
    INT_DISPLAY_WIDTH
        .replace_all(&lowered, |caps: &regex::Captures<'_>| {
            if &caps[1] == "tinyint" && &caps[2] == "1" {
                caps[0].to_string()
            } else {
                caps[1].to_string()
            }
        })
        .into_owned()
}

/// Character types report a collation in the catalog
fn is_collatable_type(sql_type: &str) -> bool {
    let lowered = sql_type.trim_start().to_lowercase();
    ["char", "varchar", "tinytext", "text", "mediumtext", "longtext", "enum", "set"]
        .iter()
        .any(|prefix| {
            lowered.starts_with(prefix)
                && !lowered[prefix.len()..].starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// A declared column, created through [`Table::add_column`](crate::Table::add_column)
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    sql_type: Option<String>,
    collatable: bool,
    default: DefaultClause,
    renamed_from: Vec<String>,
    key: Option<IndexKind>,
}

impl Column {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: None,
            collatable: false,
            default: DefaultClause::NotNull,
            renamed_from: Vec::new(),
            key: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> Option<&str> {
        self.sql_type.as_deref()
    }

    pub fn default_clause(&self) -> &DefaultClause {
        &self.default
    }

    /// Old names this column is renamed from
    pub fn renamed_from(&self) -> &[String] {
        &self.renamed_from
    }

    pub(crate) fn key(&self) -> Option<IndexKind> {
        self.key
    }

    pub(crate) fn is_auto_increment(&self) -> bool {
        self.default == DefaultClause::AutoIncrement
    }

    pub(crate) fn is_collatable(&self) -> bool {
        self.collatable
    }

    fn typed(&mut self, sql_type: String, collatable: bool) -> &mut Self {
        self.sql_type = Some(sql_type);
        self.collatable = collatable;
        self
    }

    pub fn int(&mut self) -> &mut Self {
        self.int_sized(11)
    }

    pub fn int_sized(&mut self, size: u32) -> &mut Self {
        self.typed(format!("int({size})"), false)
    }

    pub fn bigint(&mut self) -> &mut Self {
        self.bigint_sized(15)
    }

    pub fn bigint_sized(&mut self, size: u32) -> &mut Self {
        self.typed(format!("bigint({size})"), false)
    }

    /// `tinyint(1)`
    pub fn bool(&mut self) -> &mut Self {
        self.typed("tinyint(1)".to_string(), false)
    }

    pub fn decimal(&mut self, total: u32, decimal: u32) -> &mut Self {
        self.typed(format!("decimal({total},{decimal})"), false)
    }

    pub fn float(&mut self, total: u32, decimal: u32) -> &mut Self {
        self.typed(format!("float({total},{decimal})"), false)
    }

    pub fn varchar(&mut self, size: u32) -> &mut Self {
        self.typed(format!("varchar({size})"), true)
    }

    pub fn char(&mut self, size: u32) -> &mut Self {
        self.typed(format!("char({size})"), true)
    }

    pub fn text(&mut self) -> &mut Self {
        self.typed("text".to_string(), true)
    }

    pub fn datetime(&mut self) -> &mut Self {
        self.typed("datetime".to_string(), false)
    }

    pub fn date(&mut self) -> &mut Self {
        self.typed("date".to_string(), false)
    }

    /// `timestamp` defaulting to `CURRENT_TIMESTAMP`; later default setters are ignored
    pub fn timestamp(&mut self, on_update: bool) -> &mut Self {
        self.default = DefaultClause::CurrentTimestamp { on_update };
        self.typed("timestamp".to_string(), false)
    }

    /// Arbitrary type text, e.g. `mediumtext` or `enum('a','b')`
    pub fn set_type(&mut self, sql_type: impl Into<String>) -> &mut Self {
        let sql_type = sql_type.into();
        let collatable = is_collatable_type(&sql_type);
        self.typed(sql_type, collatable)
    }

    /// Copy the type (and collation behaviour) of another column
    pub fn set_type_from(&mut self, other: &Column) -> &mut Self {
        self.sql_type = other.sql_type.clone();
        self.collatable = other.collatable;
        self
    }

    pub(crate) fn set_type_parts(&mut self, sql_type: String, collatable: bool) -> &mut Self {
        self.typed(sql_type, collatable)
    }

    fn default_locked(&self) -> bool {
        matches!(self.default, DefaultClause::CurrentTimestamp { .. })
    }

    /// `NOT NULL` without a default (the initial state)
    pub fn set_not_null(&mut self) -> &mut Self {
        if !self.default_locked() {
            self.default = DefaultClause::NotNull;
        }
        self
    }

    /// `DEFAULT NULL`
    pub fn set_nullable(&mut self) -> &mut Self {
        if !self.default_locked() {
            self.default = DefaultClause::Null;
        }
        self
    }

    /// `NOT NULL DEFAULT <value>`
    ///
    /// A NULL value behaves like [`set_nullable`](Self::set_nullable) and `false` like
    /// [`set_not_null`](Self::set_not_null).
    pub fn set_default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.set_literal(value.into(), false)
    }

    /// `DEFAULT <value>` on a nullable column
    pub fn set_default_allow_null(&mut self, value: impl Into<Value>) -> &mut Self {
        self.set_literal(value.into(), true)
    }

    fn set_literal(&mut self, value: Value, allow_null: bool) -> &mut Self {
        if self.default_locked() {
            return self;
        }
        if matches!(value, Value::Bool(Some(false))) {
            self.default = DefaultClause::NotNull;
            return self;
        }
        self.default = match value_to_plain_string(&value) {
            Some(value) => DefaultClause::Literal { value, allow_null },
            None => DefaultClause::Null,
        };
        self
    }

    /// `NOT NULL AUTO_INCREMENT`; the owning table starts its counter at 1 unless set
    pub fn set_auto_increment(&mut self) -> &mut Self {
        self.default = DefaultClause::AutoIncrement;
        self
    }

    /// Treat an existing column named `old_name` as this column (emits `CHANGE`)
    pub fn rename_from(&mut self, old_name: impl Into<String>) -> &mut Self {
        self.renamed_from.push(old_name.into());
        self
    }

    pub fn set_unique(&mut self) -> &mut Self {
        self.key = Some(IndexKind::Unique);
        self
    }

    pub fn set_key(&mut self) -> &mut Self {
        self.key = Some(IndexKind::Plain);
        self
    }

    pub fn set_fulltext(&mut self) -> &mut Self {
        self.key = Some(IndexKind::Fulltext);
        self
    }

    /// Resolve against the owning table's collation
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Declaration` if no type was set.
    pub fn definition(&self, table_collation: &str) -> Result<ColumnDefinition> {
        let sql_type = self.sql_type.clone().ok_or_else(|| {
            StructureError::Declaration(format!("Column '{}' has no type", self.name))
        })?;
        Ok(ColumnDefinition {
            name: self.name.clone(),
            sql_type,
            collation: self.collatable.then(|| table_collation.to_string()),
            default: self.default.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    fn render(column: &Column) -> String {
        column
            .definition("utf8mb4_unicode_ci")
            .unwrap()
            .render(&MockExecutor::new("shop"))
    }

    #[test]
    fn test_not_null_is_default() {
        let mut c = Column::new("id");
        c.int();
        assert_eq!(render(&c), "`id` int(11) NOT NULL");
    }

    #[test]
    fn test_text_types_carry_table_collation() {
        let mut c = Column::new("email");
        c.varchar(255).set_nullable();
        assert_eq!(render(&c), "`email` varchar(255) COLLATE utf8mb4_unicode_ci DEFAULT NULL");
    }

    #[test]
    fn test_literal_defaults_are_escaped() {
        let mut c = Column::new("status");
        c.varchar(16).set_default("it's");
        assert!(render(&c).ends_with("NOT NULL DEFAULT 'it\\'s'"));

        let mut n = Column::new("rank");
        n.int().set_default_allow_null(3);
        assert_eq!(render(&n), "`rank` int(11) DEFAULT '3'");
    }

    #[test]
    fn test_false_default_means_not_null() {
        let mut c = Column::new("flag");
        c.int().set_default(false);
        assert_eq!(c.default_clause(), &DefaultClause::NotNull);
        assert_eq!(render(&c), "`flag` int(11) NOT NULL");

        let mut n = Column::new("flag");
        n.int().set_default_allow_null(false);
        assert_eq!(render(&n), "`flag` int(11) NOT NULL");

        let mut t = Column::new("flag");
        t.bool().set_default(true);
        assert_eq!(render(&t), "`flag` tinyint(1) NOT NULL DEFAULT '1'");
    }

    #[test]
    fn test_timestamp_ignores_later_defaults() {
        let mut c = Column::new("updated_at");
        c.timestamp(true).set_default("2020-01-01").set_nullable();
        assert_eq!(
            render(&c),
            "`updated_at` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_auto_increment() {
        let mut c = Column::new("id");
        c.int().set_auto_increment();
        assert!(c.is_auto_increment());
        assert_eq!(render(&c), "`id` int(11) NOT NULL AUTO_INCREMENT");
    }

    #[test]
    fn test_missing_type_is_declaration_error() {
        let c = Column::new("orphan");
        assert!(matches!(c.definition("x"), Err(StructureError::Declaration(_))));
    }

    #[test]
    fn test_normalize_type_strips_display_width() {
        assert_eq!(normalize_type("int(11)"), "int");
        assert_eq!(normalize_type("BIGINT(15) unsigned"), "bigint unsigned");
        assert_eq!(normalize_type("tinyint(1)"), "tinyint(1)");
        assert_eq!(normalize_type("tinyint(4)"), "tinyint");
        assert_eq!(normalize_type("decimal(10,2)"), "decimal(10,2)");
        assert_eq!(normalize_type("varchar(255)"), "varchar(255)");
    }

    #[test]
    fn test_set_type_detects_character_types() {
        let mut c = Column::new("body");
        c.set_type("mediumtext");
        assert!(c.is_collatable());
        c.set_type("enum('a','b')");
        assert!(c.is_collatable());
        c.set_type("settings_blob");
        assert!(!c.is_collatable());
        c.set_type("datetime(3)");
        assert!(!c.is_collatable());
    }

    #[test]
    fn test_set_type_from_copies_collatable() {
        let mut source = Column::new("code");
        source.char(36);
        let mut target = Column::new("code_ref");
        target.set_type_from(&source);
        assert_eq!(target.sql_type(), Some("char(36)"));
        assert!(target.is_collatable());
    }
}
