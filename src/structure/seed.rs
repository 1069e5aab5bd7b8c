//! Seed data imported right after a table is created
//!
//! Supported sources:
//! - SQL scripts, split into statements on `;` outside quotes and comments
//! - CSV files whose header row names the columns
//! - JSON files holding an object (one row) or an array of objects
//! - literal rows declared with [`Table::add_on_create`](crate::Table::add_on_create)

use std::fs;
use std::path::{Path, PathBuf};

use sea_query::Value;

use crate::error::{Result, StructureError};
use crate::executor::{quote_ident, run_statement, Row, SchemaExecutor};

/// A seed file, dispatched on its extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedFile {
    Script(PathBuf),
    Csv(PathBuf),
    Json(PathBuf),
}

impl SeedFile {
    /// `.csv` and `.json` are parsed as data, anything else runs as an SQL script
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => SeedFile::Csv(path),
            Some("json") => SeedFile::Json(path),
            _ => SeedFile::Script(path),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SeedFile::Script(p) | SeedFile::Csv(p) | SeedFile::Json(p) => p,
        }
    }
}

/// Literal rows inserted on create; the shape picks single or multi-row `INSERT`
#[derive(Debug, Clone, PartialEq)]
pub enum SeedRows {
    Single(Row),
    Many(Vec<Row>),
}

impl From<Row> for SeedRows {
    fn from(row: Row) -> Self {
        SeedRows::Single(row)
    }
}

impl From<Vec<Row>> for SeedRows {
    fn from(rows: Vec<Row>) -> Self {
        SeedRows::Many(rows)
    }
}

/// Import a seed file into `table`, returning the number of statements executed
pub(crate) fn import_file(executor: &dyn SchemaExecutor, table: &str, seed: &SeedFile) -> Result<usize> {
    log::info!("Importing seed data for {table} from {}", seed.path().display());
    match seed {
        SeedFile::Script(path) => {
            let script = fs::read_to_string(path)?;
            let statements = split_script(&script);
            for statement in &statements {
                run_statement(executor, statement)?;
            }
            Ok(statements.len())
        }
        SeedFile::Csv(path) => {
            let rows = read_csv(path)?;
            insert_rows(executor, table, &rows)
        }
        SeedFile::Json(path) => {
            let rows = read_json(path)?;
            insert_rows(executor, table, &rows)
        }
    }
}

/// Insert declared literal rows
pub(crate) fn import_rows(executor: &dyn SchemaExecutor, table: &str, rows: &SeedRows) -> Result<usize> {
    match rows {
        SeedRows::Single(row) => insert_rows(executor, table, std::slice::from_ref(row)),
        SeedRows::Many(rows) => insert_rows(executor, table, rows),
    }
}

fn insert_rows(executor: &dyn SchemaExecutor, table: &str, rows: &[Row]) -> Result<usize> {
    match insert_statement(executor, table, rows)? {
        Some(sql) => {
            run_statement(executor, &sql)?;
            Ok(1)
        }
        None => Ok(0),
    }
}

/// `INSERT INTO t (cols) VALUES (...)[, (...)]`; `None` for no rows
///
/// # Errors
///
/// Returns `StructureError::Seed` when a row lacks a column the first row has.
pub fn insert_statement(executor: &dyn SchemaExecutor, table: &str, rows: &[Row]) -> Result<Option<String>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let columns: Vec<&str> = first.columns().collect();

    let mut tuples = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let values = columns
            .iter()
            .map(|column| {
                row.get(column)
                    .map(|value| executor.escape_literal(value))
                    .ok_or_else(|| {
                        StructureError::Seed(format!(
                            "Row {index} for table {table} has no value for column '{column}'"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        tuples.push(format!("({})", values.join(", ")));
    }

    let columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    Ok(Some(format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        columns.join(", "),
        tuples.join(", ")
    )))
}

fn read_csv(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            // Empty cells load as NULL
            let value = if field.is_empty() {
                Value::String(None)
            } else {
                Value::String(Some(field.to_string()))
            };
            row.set(header, value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn read_json(path: &Path) -> Result<Vec<Row>> {
    let content = fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&content)?;
    match document {
        serde_json::Value::Array(items) => items.iter().map(json_row).collect(),
        object @ serde_json::Value::Object(_) => Ok(vec![json_row(&object)?]),
        _ => Err(StructureError::Seed(format!(
            "{} must hold an object or an array of objects",
            path.display()
        ))),
    }
}

fn json_row(item: &serde_json::Value) -> Result<Row> {
    let object = item
        .as_object()
        .ok_or_else(|| StructureError::Seed(format!("Seed row is not an object: {item}")))?;
    let mut row = Row::new();
    for (column, value) in object {
        row.set(column.clone(), json_value(value));
    }
    Ok(row)
}

fn json_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::String(None),
        serde_json::Value::Bool(b) => Value::Bool(Some(*b)),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::BigInt(Some(i)),
            (None, Some(f)) => Value::Double(Some(f)),
            _ => Value::String(Some(n.to_string())),
        },
        serde_json::Value::String(s) => Value::String(Some(s.clone())),
        nested => Value::Json(Some(Box::new(nested.clone()))),
    }
}

/// Split an SQL script into statements
///
/// `;` ends a statement unless it is inside a quoted string or identifier, a `--`/`#` line
/// comment or a `/* */` block comment. Comments are dropped; empty statements are skipped.
pub fn split_script(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = script.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == '\\' && q != '`' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for c in chars.by_ref() {
                    if previous == '*' && c == '/' {
                        break;
                    }
                    previous = c;
                }
                current.push(' ');
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            c => current.push(c),
        }
    }
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, statement: &str) {
    let trimmed = statement.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use std::io::Write;

    #[test]
    fn test_split_script_respects_quotes_and_comments() {
        let script = "-- header; comment\n\
                      INSERT INTO t VALUES ('a;b');\n\
                      /* block; */ INSERT INTO t VALUES (\"c\\\";d\");\n\
                      # hash; comment\n\
                      ;;\n\
                      UPDATE t SET x = 1";
        let statements = split_script(script);
        assert_eq!(
            statements,
            vec![
                "INSERT INTO t VALUES ('a;b')".to_string(),
                "INSERT INTO t VALUES (\"c\\\";d\")".to_string(),
                "UPDATE t SET x = 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_insert_statement_single_and_many() {
        let executor = MockExecutor::new("shop");
        let one = Row::new().with("id", 1).with("name", "admin");
        let sql = insert_statement(&executor, "role", std::slice::from_ref(&one))
            .unwrap()
            .unwrap();
        assert_eq!(sql, "INSERT INTO `role` (`id`, `name`) VALUES (1, 'admin')");

        let two = Row::new().with("id", 2).with("name", "guest");
        let sql = insert_statement(&executor, "role", &[one, two]).unwrap().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `role` (`id`, `name`) VALUES (1, 'admin'), (2, 'guest')"
        );

        assert_eq!(insert_statement(&executor, "role", &[]).unwrap(), None);
    }

    #[test]
    fn test_insert_statement_rejects_ragged_rows() {
        let executor = MockExecutor::new("shop");
        let rows = [
            Row::new().with("id", 1).with("name", "a"),
            Row::new().with("id", 2),
        ];
        assert!(matches!(
            insert_statement(&executor, "role", &rows),
            Err(StructureError::Seed(_))
        ));
    }

    #[test]
    fn test_import_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,name,note\n1,admin,\n2,guest,hello").unwrap();

        let executor = MockExecutor::new("shop");
        let seed = SeedFile::from_path(file.path());
        assert!(matches!(seed, SeedFile::Csv(_)));
        assert_eq!(import_file(&executor, "role", &seed).unwrap(), 1);
        assert_eq!(
            executor.statements(),
            vec!["INSERT INTO `role` (`id`, `name`, `note`) VALUES ('1', 'admin', NULL), ('2', 'guest', 'hello')".to_string()]
        );
    }

    #[test]
    fn test_import_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"id": 1, "active": true, "name": null}}]"#).unwrap();

        let executor = MockExecutor::new("shop");
        let seed = SeedFile::from_path(file.path());
        import_file(&executor, "flag", &seed).unwrap();
        assert_eq!(
            executor.statements(),
            vec!["INSERT INTO `flag` (`active`, `id`, `name`) VALUES (1, 1, NULL)".to_string()]
        );
    }

    #[test]
    fn test_import_sql_script() {
        let mut file = tempfile::Builder::new().suffix(".sql").tempfile().unwrap();
        writeln!(file, "INSERT INTO role VALUES (1);\nINSERT INTO role VALUES (2);").unwrap();

        let executor = MockExecutor::new("shop");
        assert_eq!(import_file(&executor, "role", &SeedFile::from_path(file.path())).unwrap(), 2);
        assert_eq!(executor.statements().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let executor = MockExecutor::new("shop");
        let seed = SeedFile::from_path("/nonexistent/seed.sql");
        assert!(matches!(import_file(&executor, "t", &seed), Err(StructureError::Io(_))));
    }
}
