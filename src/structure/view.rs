//! Views, replaced wholesale when their definition changes

use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::{MysqlQueryBuilder, SelectStatement, Value};

use crate::error::{Result, StructureError};
use crate::executor::{inline_parameters, quote_ident, run_statement, SchemaExecutor};
use crate::structure::catalog::CatalogReader;

static QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-z_][a-z0-9_$]*\.").expect("qualifier pattern is valid"));

// Character set introducer MySQL prepends to stored literals (`_utf8mb4'x'`)
static INTRODUCER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_[a-z0-9]+\s*$").expect("introducer pattern is valid"));

/// Where a view's SELECT comes from
#[derive(Debug, Clone)]
pub enum ViewQuery {
    /// SQL text with `?` placeholders bound to `params`
    Sql { sql: String, params: Vec<Value> },
    /// A sea-query select rendered for MySQL
    Select(SelectStatement),
}

/// Declared view
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    query: Option<ViewQuery>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define the view with raw SQL; `params` replace `?` placeholders as escaped literals
    pub fn set_query(&mut self, sql: impl Into<String>, params: Vec<Value>) -> &mut Self {
        self.query = Some(ViewQuery::Sql {
            sql: sql.into(),
            params,
        });
        self
    }

    pub fn set_select(&mut self, select: SelectStatement) -> &mut Self {
        self.query = Some(ViewQuery::Select(select));
        self
    }

    /// The SELECT with every parameter inlined
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Declaration` if no query was set or the placeholders do not
    /// match the parameters.
    pub fn definition(&self, executor: &dyn SchemaExecutor) -> Result<String> {
        match &self.query {
            Some(ViewQuery::Sql { sql, params }) => inline_parameters(executor, sql, params),
            Some(ViewQuery::Select(select)) => {
                let (sql, values) = select.build(MysqlQueryBuilder);
                inline_parameters(executor, &sql, &values.0)
            }
            None => Err(StructureError::Declaration(format!(
                "View {} has no query",
                self.name
            ))),
        }
    }

    pub fn create_statement(&self, executor: &dyn SchemaExecutor) -> Result<String> {
        Ok(format!(
            "CREATE VIEW {} AS {}",
            quote_ident(&self.name),
            self.definition(executor)?
        ))
    }

    /// Converge the live view to this declaration
    ///
    /// Returns `true` when the view did not exist and was created. A changed view is dropped
    /// and created again, which returns `false`.
    pub fn check(&self, executor: &dyn SchemaExecutor) -> Result<bool> {
        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::check_view_span(&self.name).entered();

        let definition = self.definition(executor)?;
        let reader = CatalogReader::new(executor);

        match reader.view_definition(&self.name)? {
            Some(live) if normalize_definition(&live) == normalize_definition(&definition) => {
                log::debug!("View {} is up to date", self.name);
                Ok(false)
            }
            Some(_) => {
                log::info!("Replacing view {}", self.name);
                run_statement(executor, &format!("DROP VIEW {}", quote_ident(&self.name)))?;
                run_statement(executor, &self.create_statement(executor)?)?;
                Ok(false)
            }
            None => {
                run_statement(executor, &self.create_statement(executor)?)?;
                log::info!("Created view {}", self.name);
                Ok(true)
            }
        }
    }
}

/// Canonical form used to compare a declared SELECT with the catalog's stored text
///
/// MySQL stores views fully qualified and with explicit aliases
/// (`` select `db`.`t`.`a` AS `a` from `db`.`t` ``), so qualifiers, backticks, redundant
/// `x AS x` aliases, case and whitespace are folded away outside string literals. Literals
/// are compared verbatim.
pub fn normalize_definition(sql: &str) -> String {
    let segments = split_literals(sql);
    let mut tokens: Vec<String> = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let code = match segment {
            Segment::Literal(text) => {
                tokens.push((*text).to_string());
                continue;
            }
            Segment::Code(text) => text.to_lowercase().replace('`', ""),
        };
        let code = match segments.get(i + 1) {
            Some(Segment::Literal(_)) => INTRODUCER.replace(&code, "").into_owned(),
            _ => code,
        };
        let spaced = QUALIFIER
            .replace_all(&code, "")
            .replace('(', " ( ")
            .replace(')', " ) ")
            .replace(',', " , ");
        tokens.extend(spaced.split_whitespace().map(str::to_string));
    }

    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "as" && i + 1 < tokens.len() && kept.last() == Some(&tokens[i + 1].as_str()) {
            i += 2;
            continue;
        }
        kept.push(&tokens[i]);
        i += 1;
    }

    let mut out = String::with_capacity(sql.len());
    let mut previous: Option<&str> = None;
    for token in kept {
        if previous.is_some_and(|p| p != "(") && token != ")" && token != "," {
            out.push(' ');
        }
        out.push_str(token);
        previous = Some(token);
    }
    out
}

enum Segment<'a> {
    Code(&'a str),
    Literal(&'a str),
}

/// Split SQL text into code and quoted literals; quotes stay part of the literal
fn split_literals(sql: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut chars = sql.char_indices().peekable();
    let mut start = 0;
    while let Some((pos, ch)) = chars.next() {
        if ch != '\'' && ch != '"' {
            continue;
        }
        if pos > start {
            segments.push(Segment::Code(&sql[start..pos]));
        }
        let mut end = sql.len();
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                chars.next();
            } else if c == ch {
                if chars.peek().is_some_and(|&(_, n)| n == ch) {
                    chars.next();
                } else {
                    end = i + c.len_utf8();
                    break;
                }
            }
        }
        segments.push(Segment::Literal(&sql[pos..end]));
        start = end;
    }
    if start < sql.len() {
        segments.push(Segment::Code(&sql[start..]));
    }
    segments
}
