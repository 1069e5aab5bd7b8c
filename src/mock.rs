//! In-memory stand-in for a MySQL session
//!
//! [`MockExecutor`] keeps a fake catalog, answers the introspection queries the engine issues
//! and applies the DDL shapes the engine emits (`CREATE TABLE`, `ALTER TABLE`, views) to that
//! catalog. A second convergence pass therefore sees the result of the first, which is what
//! idempotence tests need. Every statement passed to `execute` is recorded.

use std::cell::RefCell;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use sea_query::Value;

use crate::error::{Result, StructureError};
use crate::executor::{Row, SchemaExecutor};
use crate::structure::catalog::{IntrospectedColumn, IntrospectedConstraint, IntrospectedKey, TableOptions};
use crate::structure::index::IndexKind;

/// A table in the fake catalog
#[derive(Debug, Clone, PartialEq)]
pub struct MockTable {
    pub name: String,
    pub columns: Vec<IntrospectedColumn>,
    pub primary_key: Vec<String>,
    pub keys: Vec<IntrospectedKey>,
    pub constraints: Vec<IntrospectedConstraint>,
    pub options: TableOptions,
    pub rows: Vec<Row>,
}

impl MockTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            keys: Vec::new(),
            constraints: Vec::new(),
            options: TableOptions {
                engine: Some("InnoDB".to_string()),
                charset: Some("utf8mb4".to_string()),
                collation: Some("utf8mb4_unicode_ci".to_string()),
            },
            rows: Vec::new(),
        }
    }

    /// `NOT NULL` column without default or collation
    pub fn with_column(self, field: &str, sql_type: &str) -> Self {
        self.with_introspected_column(IntrospectedColumn {
            field: field.to_string(),
            sql_type: sql_type.to_string(),
            collation: None,
            nullable: false,
            default: None,
            extra: String::new(),
        })
    }

    /// Column exactly as `SHOW FULL COLUMNS` would report it
    pub fn with_introspected_column(mut self, column: IntrospectedColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// One `STATISTICS` row; rows sharing `name` form a multi-column index
    pub fn with_index(mut self, name: &str, column: &str, seq: i64, kind: IndexKind) -> Self {
        match self.keys.iter_mut().find(|k| k.name == name) {
            Some(key) => {
                key.columns.insert(seq, column.to_string());
            }
            None => self.keys.push(IntrospectedKey {
                name: name.to_string(),
                unique: kind == IndexKind::Unique,
                index_type: if kind == IndexKind::Fulltext { "FULLTEXT" } else { "BTREE" }.to_string(),
                columns: BTreeMap::from([(seq, column.to_string())]),
            }),
        }
        self
    }

    pub fn with_constraint(mut self, constraint: IntrospectedConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_options(mut self, engine: &str, charset: &str, collation: &str) -> Self {
        self.options = TableOptions {
            engine: Some(engine.to_string()),
            charset: Some(charset.to_string()),
            collation: Some(collation.to_string()),
        };
        self
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }
}

#[derive(Debug, Default)]
struct State {
    tables: IndexMap<String, MockTable>,
    views: IndexMap<String, String>,
    statements: Vec<String>,
    foreign_key_checks: bool,
    fail_on: Vec<String>,
}

/// Fake executor backed by an in-memory catalog
#[derive(Debug)]
pub struct MockExecutor {
    database: String,
    state: RefCell<State>,
}

impl MockExecutor {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: RefCell::new(State {
                foreign_key_checks: true,
                ..State::default()
            }),
        }
    }

    pub fn add_table(&self, table: MockTable) {
        self.state.borrow_mut().tables.insert(table.name.clone(), table);
    }

    pub fn add_view(&self, name: &str, definition: &str) {
        self.state
            .borrow_mut()
            .views
            .insert(name.to_string(), definition.to_string());
    }

    pub fn table(&self, name: &str) -> Option<MockTable> {
        self.state.borrow().tables.get(name).cloned()
    }

    pub fn view(&self, name: &str) -> Option<String> {
        self.state.borrow().views.get(name).cloned()
    }

    /// Make every statement containing `pattern` fail
    pub fn fail_on(&self, pattern: &str) {
        self.state.borrow_mut().fail_on.push(pattern.to_string());
    }

    /// Every statement passed to `execute`, in order
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().statements.clone()
    }

    /// Executed statements other than `SET foreign_key_checks`
    pub fn ddl_statements(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| !s.starts_with("SET foreign_key_checks"))
            .collect()
    }

    pub fn clear_statements(&self) {
        self.state.borrow_mut().statements.clear();
    }

    pub fn foreign_key_checks_enabled(&self) -> bool {
        self.state.borrow().foreign_key_checks
    }

    fn apply(&self, sql: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(rest) = sql.strip_prefix("SET foreign_key_checks = ") {
            state.foreign_key_checks = rest.trim() != "0";
        } else if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            let table = parse_create_table(rest).ok_or_else(|| unsupported(sql))?;
            if !state.tables.contains_key(&table.name) {
                state.tables.insert(table.name.clone(), table);
            }
        } else if let Some(rest) = sql.strip_prefix("ALTER TABLE ") {
            let (name, clauses) = take_ident(rest).ok_or_else(|| unsupported(sql))?;
            let table = state
                .tables
                .get_mut(&name)
                .ok_or_else(|| StructureError::query(sql, format!("Table '{name}' doesn't exist")))?;
            for clause in split_top_level(clauses.trim()) {
                apply_alter_clause(table, &clause).ok_or_else(|| unsupported(sql))?;
            }
        } else if let Some(rest) = sql.strip_prefix("CREATE VIEW ") {
            let (name, body) = take_ident(rest).ok_or_else(|| unsupported(sql))?;
            let definition = body.trim().strip_prefix("AS ").ok_or_else(|| unsupported(sql))?;
            if state.views.contains_key(&name) {
                return Err(StructureError::query(sql, format!("Table '{name}' already exists")));
            }
            state.views.insert(name, definition.trim().to_string());
        } else if let Some(rest) = sql
            .strip_prefix("DROP VIEW IF EXISTS ")
            .or_else(|| sql.strip_prefix("DROP VIEW "))
        {
            let (name, _) = take_ident(rest).ok_or_else(|| unsupported(sql))?;
            state.views.shift_remove(&name);
        }
        Ok(())
    }

    fn table_rows(&self, table: &str, f: impl FnOnce(&MockTable) -> Vec<Row>) -> Vec<Row> {
        self.state.borrow().tables.get(table).map(f).unwrap_or_default()
    }
}

fn unsupported(sql: &str) -> StructureError {
    StructureError::query(sql, "statement shape not understood by MockExecutor")
}

fn string_param(params: &[Value], index: usize) -> String {
    params
        .get(index)
        .and_then(crate::executor::value_to_plain_string)
        .unwrap_or_default()
}

fn opt(value: &Option<String>) -> Value {
    Value::String(value.clone())
}

impl SchemaExecutor for MockExecutor {
    fn database(&self) -> &str {
        &self.database
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if sql.starts_with("SHOW TABLES LIKE") {
            let name = unescape_like(&string_param(params, 0));
            let exists = self.state.borrow().tables.contains_key(&name);
            let label = format!("Tables_in_{}", self.database);
            return Ok(if exists {
                vec![Row::new().with(label, name)]
            } else {
                Vec::new()
            });
        }

        if let Some(rest) = sql.strip_prefix("SHOW FULL COLUMNS FROM ") {
            let (table, _) = take_ident(rest).ok_or_else(|| unsupported(sql))?;
            return Ok(self.table_rows(&table, |t| {
                t.columns
                    .iter()
                    .map(|c| {
                        Row::new()
                            .with("Field", c.field.as_str())
                            .with("Type", c.sql_type.as_str())
                            .with("Collation", opt(&c.collation))
                            .with("Null", if c.nullable { "YES" } else { "NO" })
                            .with("Key", "")
                            .with("Default", opt(&c.default))
                            .with("Extra", c.extra.as_str())
                    })
                    .collect()
            }));
        }

        if let Some(rest) = sql.strip_prefix("SHOW INDEX FROM ") {
            let (table, _) = take_ident(rest).ok_or_else(|| unsupported(sql))?;
            return Ok(self.table_rows(&table, |t| {
                t.primary_key
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        Row::new()
                            .with("Table", t.name.as_str())
                            .with("Key_name", "PRIMARY")
                            .with("Seq_in_index", (i + 1) as i64)
                            .with("Column_name", column.as_str())
                    })
                    .collect()
            }));
        }

        if sql.contains("information_schema.STATISTICS") {
            return Ok(self.table_rows(&string_param(params, 1), |t| {
                t.keys
                    .iter()
                    .flat_map(|k| {
                        k.columns.iter().map(move |(seq, column)| {
                            Row::new()
                                .with("INDEX_NAME", k.name.as_str())
                                .with("COLUMN_NAME", column.as_str())
                                .with("SEQ_IN_INDEX", *seq)
                                .with("NON_UNIQUE", if k.unique { 0i64 } else { 1i64 })
                                .with("INDEX_TYPE", k.index_type.as_str())
                        })
                    })
                    .collect()
            }));
        }

        if sql.contains("information_schema.REFERENTIAL_CONSTRAINTS") {
            return Ok(self.table_rows(&string_param(params, 1), |t| {
                t.constraints
                    .iter()
                    .map(|c| {
                        Row::new()
                            .with("CONSTRAINT_NAME", c.name.as_str())
                            .with("COLUMN_NAME", c.column.as_str())
                            .with("REFERENCED_TABLE_NAME", c.referenced_table.as_str())
                            .with("REFERENCED_COLUMN_NAME", c.referenced_column.as_str())
                            .with("UPDATE_RULE", c.update_rule.as_str())
                            .with("DELETE_RULE", c.delete_rule.as_str())
                    })
                    .collect()
            }));
        }

        if sql.contains("information_schema.TABLES") {
            return Ok(self.table_rows(&string_param(params, 1), |t| {
                vec![Row::new()
                    .with("ENGINE", opt(&t.options.engine))
                    .with("CHARACTER_SET_NAME", opt(&t.options.charset))
                    .with("TABLE_COLLATION", opt(&t.options.collation))]
            }));
        }

        if sql.contains("information_schema.VIEWS") {
            let name = string_param(params, 1);
            return Ok(self
                .state
                .borrow()
                .views
                .get(&name)
                .map(|definition| vec![Row::new().with("VIEW_DEFINITION", definition.as_str())])
                .unwrap_or_default());
        }

        if let Some(rest) = sql.strip_prefix("SELECT * FROM ") {
            let (table, _) = take_ident(rest).ok_or_else(|| unsupported(sql))?;
            return Ok(self.table_rows(&table, |t| t.rows.clone()));
        }

        Ok(Vec::new())
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        {
            let mut state = self.state.borrow_mut();
            state.statements.push(sql.to_string());
            if state.fail_on.iter().any(|pattern| sql.contains(pattern.as_str())) {
                return Err(StructureError::query(sql, "injected failure"));
            }
        }
        self.apply(sql)?;
        Ok(0)
    }
}

fn unescape_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Read a leading backtick-quoted identifier (dotted names keep their last segment)
fn take_ident(input: &str) -> Option<(String, &str)> {
    let mut rest = input.trim_start();
    let mut name;
    loop {
        let body = rest.strip_prefix('`')?;
        let mut ident = String::new();
        let mut end = None;
        let mut chars = body.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '`' {
                if chars.peek().map(|(_, c)| *c) == Some('`') {
                    ident.push('`');
                    chars.next();
                } else {
                    end = Some(i + 1);
                    break;
                }
            } else {
                ident.push(ch);
            }
        }
        rest = &body[end?..];
        name = ident;
        match rest.strip_prefix('.') {
            Some(next) if next.starts_with('`') => rest = next,
            _ => break,
        }
    }
    Some((name, rest))
}

/// Every backtick-quoted identifier in order
fn idents(input: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = input;
    while let Some(pos) = rest.find('`') {
        match take_ident(&rest[pos..]) {
            Some((name, tail)) => {
                found.push(name);
                rest = tail;
            }
            None => break,
        }
    }
    found
}

/// Split on commas outside parentheses, quotes and backticks
fn split_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        current.push(ch);
        match quote {
            Some(q) => {
                if ch == '\\' && q != '`' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    current.pop();
                    parts.push(current.trim().to_string());
                    current.clear();
                }
                _ => {}
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn unquote_literal(literal: &str) -> String {
    let Some(inner) = literal
        .strip_prefix('\'')
        .and_then(|l| l.strip_suffix('\''))
    else {
        return literal.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('Z') => out.push('\u{1a}'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parse `` `name` type[ COLLATE c] <default clause>`` the way MySQL would store it
fn parse_column(definition: &str) -> Option<IntrospectedColumn> {
    let (field, rest) = take_ident(definition)?;
    let rest = rest.trim();
    let clause_at = [" NOT NULL", " DEFAULT "]
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()?;
    let (type_part, clause) = rest.split_at(clause_at);
    let (sql_type, collation) = match type_part.split_once(" COLLATE ") {
        Some((t, c)) => (t.trim().to_string(), Some(c.trim().to_string())),
        None => (type_part.trim().to_string(), None),
    };

    let clause = clause.trim();
    let (nullable, default) = match clause.strip_prefix("NOT NULL") {
        Some(rest) => (false, rest.trim()),
        None => (true, clause),
    };

    let mut extra = String::new();
    let default = if default == "AUTO_INCREMENT" {
        extra.push_str("auto_increment");
        None
    } else if let Some(literal) = default.strip_prefix("DEFAULT ") {
        if literal == "NULL" {
            None
        } else if let Some(ts) = literal.strip_prefix("CURRENT_TIMESTAMP") {
            extra.push_str("DEFAULT_GENERATED");
            if ts.trim() == "ON UPDATE CURRENT_TIMESTAMP" {
                extra.push_str(" on update CURRENT_TIMESTAMP");
            }
            Some("CURRENT_TIMESTAMP".to_string())
        } else {
            Some(unquote_literal(literal))
        }
    } else {
        None
    };

    Some(IntrospectedColumn {
        field,
        sql_type,
        collation,
        nullable,
        default,
        extra,
    })
}

fn parse_key(definition: &str) -> Option<IntrospectedKey> {
    let (kind, rest) = if let Some(rest) = definition.strip_prefix("UNIQUE KEY ") {
        (IndexKind::Unique, rest)
    } else if let Some(rest) = definition.strip_prefix("FULLTEXT KEY ") {
        (IndexKind::Fulltext, rest)
    } else {
        (IndexKind::Plain, definition.strip_prefix("KEY ")?)
    };
    let mut names = idents(rest).into_iter();
    let name = names.next()?;
    Some(IntrospectedKey {
        name,
        unique: kind == IndexKind::Unique,
        index_type: if kind == IndexKind::Fulltext { "FULLTEXT" } else { "BTREE" }.to_string(),
        columns: (1i64..).zip(names).collect(),
    })
}

fn parse_constraint(definition: &str) -> Option<IntrospectedConstraint> {
    let (head, rules) = definition.split_once(" ON DELETE ")?;
    let (delete_rule, update_rule) = rules.split_once(" ON UPDATE ")?;
    let (name, rest) = take_ident(head.strip_prefix("CONSTRAINT ")?)?;
    let (column_part, reference_part) = rest.split_once(" REFERENCES ")?;
    let column = idents(column_part).into_iter().next()?;
    let (referenced_table, rest) = take_ident(reference_part)?;
    let referenced_column = idents(rest).into_iter().next()?;
    Some(IntrospectedConstraint {
        name,
        column,
        referenced_table,
        referenced_column,
        delete_rule: delete_rule.trim().to_string(),
        update_rule: update_rule.trim().to_string(),
    })
}

/// Apply one `CREATE TABLE` element or `ADD` payload
fn add_element(table: &mut MockTable, element: &str) -> Option<()> {
    if element.starts_with('`') {
        table.columns.push(parse_column(element)?);
    } else if let Some(columns) = element.strip_prefix("PRIMARY KEY") {
        table.primary_key = idents(columns);
    } else if element.starts_with("CONSTRAINT ") {
        table.constraints.push(parse_constraint(element)?);
    } else {
        table.keys.push(parse_key(element)?);
    }
    Some(())
}

fn parse_create_table(rest: &str) -> Option<MockTable> {
    let (name, rest) = take_ident(rest)?;
    let body_start = rest.find('(')? + 1;
    let body_end = rest.rfind(')')?;
    let mut table = MockTable::new(name);
    for element in split_top_level(&rest[body_start..body_end]) {
        add_element(&mut table, &element)?;
    }

    let options = &rest[body_end + 1..];
    let option = |key: &str| {
        options
            .split_whitespace()
            .find_map(|token| token.strip_prefix(key))
            .map(str::to_string)
    };
    table.options = TableOptions {
        engine: option("ENGINE="),
        charset: option("CHARSET="),
        collation: option("COLLATE="),
    };
    Some(table)
}

fn apply_alter_clause(table: &mut MockTable, clause: &str) -> Option<()> {
    if let Some(rest) = clause.strip_prefix("CHANGE ") {
        let (old, definition) = take_ident(rest)?;
        let column = parse_column(definition.trim())?;
        for row in &mut table.rows {
            if let Some(value) = row.get(&old).cloned() {
                let mut renamed = Row::new();
                for (k, v) in row.iter() {
                    if k == old {
                        renamed.set(column.field.clone(), value.clone());
                    } else {
                        renamed.set(k, v.clone());
                    }
                }
                *row = renamed;
            }
        }
        let slot = table.columns.iter_mut().find(|c| c.field == old)?;
        *slot = column;
    } else if let Some(rest) = clause.strip_prefix("MODIFY ") {
        let column = parse_column(rest)?;
        let slot = table.columns.iter_mut().find(|c| c.field == column.field)?;
        *slot = column;
    } else if let Some(rest) = clause.strip_prefix("ADD (") {
        for element in split_top_level(rest.strip_suffix(')')?) {
            add_element(table, &element)?;
        }
    } else if let Some(rest) = clause.strip_prefix("ADD ") {
        add_element(table, rest)?;
    } else if let Some(rest) = clause.strip_prefix("DROP FOREIGN KEY ") {
        let (name, _) = take_ident(rest)?;
        table.constraints.retain(|c| c.name != name);
    } else if clause == "DROP PRIMARY KEY" {
        table.primary_key.clear();
    } else if let Some(rest) = clause.strip_prefix("DROP INDEX ") {
        let (name, _) = take_ident(rest)?;
        table.keys.retain(|k| k.name != name);
    } else if let Some(rest) = clause.strip_prefix("DROP ") {
        let (name, _) = take_ident(rest)?;
        table.columns.retain(|c| c.field != name);
        for row in &mut table.rows {
            let kept: Vec<(String, Value)> = row
                .iter()
                .filter(|(k, _)| *k != name)
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            let mut trimmed = Row::new();
            for (k, v) in kept {
                trimmed.set(k, v);
            }
            *row = trimmed;
        }
    } else if let Some(engine) = clause.strip_prefix("ENGINE=") {
        table.options.engine = Some(engine.to_string());
    } else if let Some(charset) = clause.strip_prefix("DEFAULT CHARSET=") {
        table.options.charset = Some(charset.to_string());
    } else if let Some(collation) = clause.strip_prefix("COLLATE=") {
        table.options.collation = Some(collation.to_string());
    } else {
        return None;
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_shapes() {
        let c = parse_column("`email` varchar(255) COLLATE utf8mb4_unicode_ci DEFAULT NULL").unwrap();
        assert_eq!(c.sql_type, "varchar(255)");
        assert_eq!(c.collation.as_deref(), Some("utf8mb4_unicode_ci"));
        assert!(c.nullable);
        assert_eq!(c.default, None);

        let c = parse_column("`name` varchar(8) NOT NULL DEFAULT 'it\\'s'").unwrap();
        assert!(!c.nullable);
        assert_eq!(c.default.as_deref(), Some("it's"));

        let c = parse_column("`id` int(11) NOT NULL AUTO_INCREMENT").unwrap();
        assert_eq!(c.extra, "auto_increment");

        let c = parse_column("`at` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP")
            .unwrap();
        assert_eq!(c.default.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(c.extra, "DEFAULT_GENERATED on update CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_split_top_level_respects_parens() {
        assert_eq!(
            split_top_level("ADD (`a` int, `b` decimal(10,2)), ADD KEY `a_b` (`a`, `b`)"),
            vec![
                "ADD (`a` int, `b` decimal(10,2))".to_string(),
                "ADD KEY `a_b` (`a`, `b`)".to_string()
            ]
        );
    }

    #[test]
    fn test_alter_applies_to_catalog() {
        let executor = MockExecutor::new("shop");
        executor.add_table(
            MockTable::new("user")
                .with_column("id", "int(11)")
                .with_column("name", "text")
                .with_row(Row::new().with("id", 1).with("name", "ann")),
        );
        executor
            .execute(
                "ALTER TABLE `user` CHANGE `name` `full_name` text NOT NULL, ADD UNIQUE KEY `id` (`id`)",
                &[],
            )
            .unwrap();

        let table = executor.table("user").unwrap();
        assert_eq!(table.columns[1].field, "full_name");
        assert_eq!(table.keys[0].to_index().to_string(), "UNIQUE KEY `id` (`id`)");
        assert_eq!(table.rows[0].get_string("full_name").as_deref(), Some("ann"));
    }

    #[test]
    fn test_fail_on_injects_error() {
        let executor = MockExecutor::new("shop");
        executor.fail_on("DROP");
        assert!(executor.execute("DROP VIEW `v`", &[]).is_err());
        assert_eq!(executor.statements(), vec!["DROP VIEW `v`".to_string()]);
    }
}
