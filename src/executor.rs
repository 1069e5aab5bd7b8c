//! `SchemaExecutor` - the database access contract consumed by the convergence engine.
//!
//! The engine never talks to a driver directly. Applications hand it an implementation of
//! [`SchemaExecutor`] wrapping whatever MySQL client they already use; the engine only needs
//! statement execution with `?` placeholders, literal escaping and the current schema name.

use indexmap::IndexMap;
use sea_query::Value;

use crate::error::{Result, StructureError};

/// A single result row, keyed by column label in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value, builder style
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Set a column value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Raw value of a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Column value rendered as plain text, `None` for SQL NULL or a missing column
    pub fn get_string(&self, column: &str) -> Option<String> {
        self.values.get(column).and_then(value_to_plain_string)
    }

    /// Column value as an integer, `None` for NULL, missing or non-numeric values
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get_string(column).and_then(|s| s.trim().parse().ok())
    }

    /// Column labels in select order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Column/value pairs in select order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Trait for executing statements against the target database
///
/// Implementations wrap a single MySQL session. Session state such as
/// `foreign_key_checks` is mutated by the engine, so the same session must serve every call
/// made during one convergence pass.
///
/// # Examples
///
/// ```no_run
/// use tablewright::{Row, SchemaExecutor, StructureError};
/// use sea_query::Value;
///
/// struct MyExecutor;
///
/// impl SchemaExecutor for MyExecutor {
///     fn database(&self) -> &str {
///         "shop"
///     }
///
///     fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StructureError> {
///         // hand over to the driver
///         # let _ = (sql, params);
///         Ok(Vec::new())
///     }
///
///     fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StructureError> {
///         # let _ = (sql, params);
///         Ok(0)
///     }
/// }
/// ```
pub trait SchemaExecutor {
    /// Name of the schema (database) being converged, used in `information_schema` filters
    fn database(&self) -> &str;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Query` if the driver rejects the statement.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Query` if the driver rejects the statement.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Render a value as a MySQL literal
    fn escape_literal(&self, value: &Value) -> String {
        value_to_sql_literal(value)
    }

    /// Re-establish the session
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Query` if the connection cannot be re-established.
    fn reconnect(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: SchemaExecutor + ?Sized> SchemaExecutor for &T {
    fn database(&self) -> &str {
        (**self).database()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn escape_literal(&self, value: &Value) -> String {
        (**self).escape_literal(value)
    }

    fn reconnect(&self) -> Result<()> {
        (**self).reconnect()
    }
}

impl<T: SchemaExecutor + ?Sized> SchemaExecutor for Box<T> {
    fn database(&self) -> &str {
        (**self).database()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn escape_literal(&self, value: &Value) -> String {
        (**self).escape_literal(value)
    }

    fn reconnect(&self) -> Result<()> {
        (**self).reconnect()
    }
}

/// Execute a DDL statement, logging it first
pub(crate) fn run_statement(executor: &dyn SchemaExecutor, sql: &str) -> Result<()> {
    #[cfg(feature = "tracing")]
    let _span = crate::metrics::tracing_helpers::execute_statement_span(sql).entered();

    log::debug!("{sql}");
    let result = executor.execute(sql, &[]);

    #[cfg(feature = "metrics")]
    {
        crate::metrics::METRICS.record_statement();
        if result.is_err() {
            crate::metrics::METRICS.record_statement_error();
        }
    }

    result.map(|_| ())
}

/// Quote an identifier with backticks
///
/// Dotted names (`schema.table`) are quoted per segment.
///
/// ```
/// use tablewright::quote_ident;
///
/// assert_eq!(quote_ident("user"), "`user`");
/// assert_eq!(quote_ident("shop.user"), "`shop`.`user`");
/// ```
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Render a value as plain text (no quoting), `None` for NULL
pub fn value_to_plain_string(value: &Value) -> Option<String> {
    match value {
        Value::Bool(Some(b)) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::TinyInt(Some(i)) => Some(i.to_string()),
        Value::SmallInt(Some(i)) => Some(i.to_string()),
        Value::Int(Some(i)) => Some(i.to_string()),
        Value::BigInt(Some(i)) => Some(i.to_string()),
        Value::TinyUnsigned(Some(u)) => Some(u.to_string()),
        Value::SmallUnsigned(Some(u)) => Some(u.to_string()),
        Value::Unsigned(Some(u)) => Some(u.to_string()),
        Value::BigUnsigned(Some(u)) => Some(u.to_string()),
        Value::Float(Some(f)) => Some(f.to_string()),
        Value::Double(Some(d)) => Some(d.to_string()),
        Value::String(Some(s)) => Some(s.clone()),
        Value::Char(Some(c)) => Some(c.to_string()),
        Value::Bytes(Some(b)) => Some(String::from_utf8_lossy(b).into_owned()),
        Value::Json(Some(j)) => Some(j.to_string()),
        _ => None,
    }
}

/// Render a value as a MySQL literal
///
/// Strings are escaped the way `mysql_real_escape_string` does (backslash escapes), numbers
/// are emitted bare and NULL values become `NULL`.
///
/// ```
/// use sea_query::Value;
/// use tablewright::value_to_sql_literal;
///
/// assert_eq!(value_to_sql_literal(&Value::Int(Some(42))), "42");
/// assert_eq!(value_to_sql_literal(&Value::String(Some("it's".to_string()))), "'it\\'s'");
/// assert_eq!(value_to_sql_literal(&Value::Int(None)), "NULL");
/// ```
pub fn value_to_sql_literal(value: &Value) -> String {
    match value {
        Value::Bool(Some(b)) => if *b { "1" } else { "0" }.to_string(),
        Value::TinyInt(Some(_))
        | Value::SmallInt(Some(_))
        | Value::Int(Some(_))
        | Value::BigInt(Some(_))
        | Value::TinyUnsigned(Some(_))
        | Value::SmallUnsigned(Some(_))
        | Value::Unsigned(Some(_))
        | Value::BigUnsigned(Some(_))
        | Value::Float(Some(_))
        | Value::Double(Some(_)) => value_to_plain_string(value).unwrap_or_else(|| "NULL".to_string()),
        Value::Bytes(Some(b)) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
        other => match value_to_plain_string(other) {
            Some(text) => quote_string(&text),
            None => "NULL".to_string(),
        },
    }
}

/// Quote and escape a string literal for MySQL
pub(crate) fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Substitute `?` placeholders outside quoted sections with escaped literals
///
/// # Errors
///
/// Returns `StructureError::Declaration` when the number of placeholders and values differ.
pub fn inline_parameters(executor: &dyn SchemaExecutor, sql: &str, params: &[Value]) -> Result<String> {
    let mut out = String::with_capacity(sql.len());
    let mut params_iter = params.iter();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    let value = params_iter.next().ok_or_else(|| {
                        StructureError::Declaration(format!(
                            "Query has more placeholders than the {} bound values: {sql}",
                            params.len()
                        ))
                    })?;
                    out.push_str(&executor.escape_literal(value));
                }
                c => out.push(c),
            },
        }
    }

    if params_iter.next().is_some() {
        return Err(StructureError::Declaration(format!(
            "Query has fewer placeholders than the {} bound values: {sql}",
            params.len()
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[test]
    fn test_quote_ident_escapes_backticks() {
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_value_to_sql_literal_variants() {
        assert_eq!(value_to_sql_literal(&Value::Bool(Some(true))), "1");
        assert_eq!(value_to_sql_literal(&Value::Double(Some(1.5))), "1.5");
        assert_eq!(value_to_sql_literal(&Value::String(None)), "NULL");
        assert_eq!(
            value_to_sql_literal(&Value::String(Some("a\\b\n".to_string()))),
            "'a\\\\b\\n'"
        );
        assert_eq!(value_to_sql_literal(&Value::Bytes(Some(vec![0xde, 0xad]))), "X'DEAD'");
    }

    #[test]
    fn test_row_accessors() {
        let row = Row::new()
            .with("Field", "id")
            .with("Default", Value::String(None))
            .with("SEQ_IN_INDEX", 2i64);

        assert_eq!(row.get_string("Field").as_deref(), Some("id"));
        assert_eq!(row.get_string("Default"), None);
        assert_eq!(row.get_string("Missing"), None);
        assert_eq!(row.get_i64("SEQ_IN_INDEX"), Some(2));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["Field", "Default", "SEQ_IN_INDEX"]);
    }

    #[test]
    fn test_inline_parameters_skips_quoted_sections() {
        let executor = MockExecutor::new("shop");
        let sql = inline_parameters(
            &executor,
            "SELECT 'what?' AS q, `a?` FROM t WHERE x = ? AND y = ?",
            &[Value::Int(Some(1)), Value::String(Some("o'k".to_string()))],
        )
        .unwrap();

        assert_eq!(sql, "SELECT 'what?' AS q, `a?` FROM t WHERE x = 1 AND y = 'o\\'k'");
    }

    #[test]
    fn test_inline_parameters_count_mismatch() {
        let executor = MockExecutor::new("shop");
        assert!(inline_parameters(&executor, "SELECT ?", &[]).is_err());
        assert!(inline_parameters(&executor, "SELECT 1", &[Value::Int(Some(1))]).is_err());
    }
}
