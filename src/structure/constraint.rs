//! Foreign key constraints
//!
//! Generated constraint names must be identical on every run, otherwise the diff would see a
//! perpetually "missing" constraint. [`constraint_name`] derives them from the table names
//! and columns only.

use std::fmt;

use crate::executor::quote_ident;

/// `ON DELETE` / `ON UPDATE` behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialAction {
    Restrict,
    Cascade,
    SetNull,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
        }
    }

    /// Parse a catalog rule; `NO ACTION` and anything unrecognised become `RESTRICT`
    pub fn parse(rule: &str) -> Self {
        match rule.trim().to_uppercase().as_str() {
            "CASCADE" => ReferentialAction::Cascade,
            "SET NULL" => ReferentialAction::SetNull,
            _ => ReferentialAction::Restrict,
        }
    }
}

/// Tri-state mapping: `Some(false)` restricts, `None` sets NULL, `Some(true)` cascades
impl From<Option<bool>> for ReferentialAction {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(false) => ReferentialAction::Restrict,
            Some(true) => ReferentialAction::Cascade,
            None => ReferentialAction::SetNull,
        }
    }
}

impl From<bool> for ReferentialAction {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Options for [`Table::add_foreign_key`](crate::Table::add_foreign_key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyOptions {
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    /// Overrides the generated constraint name
    pub identifier: Option<String>,
}

impl Default for ForeignKeyOptions {
    fn default() -> Self {
        Self {
            on_delete: ReferentialAction::Cascade,
            on_update: ReferentialAction::Restrict,
            identifier: None,
        }
    }
}

impl ForeignKeyOptions {
    pub fn on_delete(mut self, action: impl Into<ReferentialAction>) -> Self {
        self.on_delete = action.into();
        self
    }

    pub fn on_update(mut self, action: impl Into<ReferentialAction>) -> Self {
        self.on_update = action.into();
        self
    }

    pub fn identifier(mut self, name: impl Into<String>) -> Self {
        self.identifier = Some(name.into());
        self
    }
}

/// What a foreign key needs to know about the table it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub table: String,
    pub column: String,
    pub sql_type: String,
    pub collatable: bool,
}

/// A declared or introspected foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

impl Constraint {
    /// Structural identity used for comparison; the referenced table is compared without a
    /// schema qualifier since the catalog reports bare names
    pub fn signature(&self) -> String {
        Constraint {
            referenced_table: strip_schema(&self.referenced_table).to_string(),
            ..self.clone()
        }
        .to_string()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&self.name),
            quote_ident(&self.column),
            quote_ident(&self.referenced_table),
            quote_ident(&self.referenced_column),
            self.on_delete,
            self.on_update
        )
    }
}

/// Drop a `schema.` qualifier
pub(crate) fn strip_schema(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Shorten a table name: split before capitals, `|` and `_`, keep two characters per token
///
/// ```
/// use tablewright::structure::constraint::abbreviate;
///
/// assert_eq!(abbreviate("user"), "us");
/// assert_eq!(abbreviate("orderItem"), "orIt");
/// assert_eq!(abbreviate("order_item"), "orit");
/// ```
pub fn abbreviate(name: &str) -> String {
    let mut tokens: Vec<String> = vec![String::new()];
    for ch in strip_schema(name).chars() {
        if ch.is_uppercase() || ch == '|' || ch == '_' {
            tokens.push(String::new());
        }
        if ch != '_' {
            if let Some(token) = tokens.last_mut() {
                token.push(ch);
            }
        }
    }
    tokens
        .iter()
        .map(|token| token.chars().take(2).collect::<String>())
        .collect()
}

/// `fk_<abbr(table)>_<column>_<abbr(referenced)>_<referenced column>`
pub fn constraint_name(table: &str, column: &str, referenced_table: &str, referenced_column: &str) -> String {
    format!(
        "fk_{}_{}_{}_{}",
        abbreviate(table),
        column,
        abbreviate(referenced_table),
        referenced_column
    )
}
