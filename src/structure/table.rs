//! Table declaration and convergence
//!
//! A [`Table`] is populated once by its mapper and then converged with [`Table::check`]:
//!
//! - absent table: one `CREATE TABLE IF NOT EXISTS`, seed data, then relation tables
//! - existing table: renames, the column/key/constraint diff (see [`diff`](super::diff)),
//!   relation tables, row migrations, deferred column drops and finally table options
//!
//! Everything runs with `foreign_key_checks` suspended except the `ADD` phase, which runs
//! with checks live so new constraints are validated against existing rows.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::config::StructureConfig;
use crate::error::{Result, StructureError};
use crate::executor::{quote_ident, run_statement, Row, SchemaExecutor};
use crate::structure::catalog::CatalogReader;
use crate::structure::column::{Column, ColumnDefinition};
use crate::structure::constraint::{
    constraint_name, strip_schema, Constraint, ForeignKeyOptions, ReferentialAction, TableReference,
};
use crate::structure::diff::{self, alter_statement, AlterClause};
use crate::structure::guard::ForeignKeyChecksGuard;
use crate::structure::index::{Index, IndexKind};
use crate::structure::primary_key::PrimaryKey;
use crate::structure::seed::{self, SeedFile, SeedRows};

/// Row-level migration run against every row of an existing table
pub type Migration = Box<dyn Fn(&Row, &dyn SchemaExecutor) -> Result<()>>;

/// Declared shape of one table
pub struct Table {
    name: String,
    engine: String,
    charset: String,
    collation: String,
    columns: IndexMap<String, Column>,
    primary_key: Option<PrimaryKey>,
    keys: IndexMap<String, Index>,
    constraints: IndexMap<String, Constraint>,
    relation_tables: Vec<Table>,
    auto_increment: Option<u64>,
    addition: Option<String>,
    seed_file: Option<SeedFile>,
    seed_rows: Option<SeedRows>,
    migrations: Vec<Migration>,
    many_has_many_pattern: String,
}

impl Table {
    /// Table with the default engine, charset and collation
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, &StructureConfig::default())
    }

    /// Table taking its defaults from `config`
    pub fn with_config(name: impl Into<String>, config: &StructureConfig) -> Self {
        Self {
            name: name.into(),
            engine: config.engine.clone(),
            charset: config.charset.clone(),
            collation: config.collation.clone(),
            columns: IndexMap::new(),
            primary_key: None,
            keys: IndexMap::new(),
            constraints: IndexMap::new(),
            relation_tables: Vec::new(),
            auto_increment: None,
            addition: None,
            seed_file: None,
            seed_rows: None,
            migrations: Vec::new(),
            many_has_many_pattern: config.many_has_many_pattern.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn collation(&self) -> &str {
        &self.collation
    }

    pub fn set_engine(&mut self, engine: impl Into<String>) -> &mut Self {
        self.engine = engine.into();
        self
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = charset.into();
        self
    }

    pub fn set_collate(&mut self, collation: impl Into<String>) -> &mut Self {
        self.collation = collation.into();
        self
    }

    /// Start value for `AUTO_INCREMENT` in the CREATE statement
    pub fn set_auto_increment(&mut self, first: u64) -> &mut Self {
        self.auto_increment = Some(first);
        self
    }

    /// Free-form suffix appended verbatim after the table options
    pub fn add(&mut self, addition: impl Into<String>) -> &mut Self {
        self.addition = Some(addition.into());
        self
    }

    /// Declare a column; redeclaring a name replaces the earlier column
    pub fn add_column(&mut self, name: impl Into<String>) -> &mut Column {
        let name = name.into();
        self.columns.insert(name.clone(), Column::new(name.clone()));
        &mut self.columns[&name]
    }

    /// Declare a column and make it the primary key
    pub fn add_primary_key(&mut self, name: impl Into<String>) -> &mut Column {
        let name = name.into();
        self.primary_key = Some(PrimaryKey::new(vec![name.clone()]));
        self.add_column(name)
    }

    /// # Errors
    ///
    /// Returns `StructureError::Declaration` if the list is empty or names a column that is not
    /// declared.
    pub fn set_primary_key<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self> {
        if columns.is_empty() {
            return Err(StructureError::Declaration(format!(
                "Primary key of {} needs a column",
                self.name
            )));
        }
        if let Some(missing) = columns.iter().find(|c| !self.columns.contains_key(c.as_ref())) {
            return Err(StructureError::Declaration(format!(
                "Column '{}' is not defined on {}",
                missing.as_ref(),
                self.name
            )));
        }
        self.primary_key = Some(PrimaryKey::new(
            columns.iter().map(|c| c.as_ref().to_string()).collect(),
        ));
        Ok(self)
    }

    /// Declare a column referencing another table's primary key
    ///
    /// The column copies the referenced key's type, becomes nullable when rows are
    /// `SET NULL` on delete, and gets a plain index.
    pub fn add_foreign_key(
        &mut self,
        name: impl Into<String>,
        reference: &TableReference,
        options: ForeignKeyOptions,
    ) -> &mut Column {
        let name = name.into();
        let constraint = Constraint {
            name: options.identifier.clone().unwrap_or_else(|| {
                constraint_name(&self.name, &name, &reference.table, &reference.column)
            }),
            column: name.clone(),
            referenced_table: reference.table.clone(),
            referenced_column: reference.column.clone(),
            on_delete: options.on_delete,
            on_update: options.on_update,
        };
        self.constraints.insert(constraint.name.clone(), constraint);

        let key = Index::named(name.clone(), IndexKind::Plain, vec![name.clone()]);
        self.keys.insert(key.name().to_string(), key);

        let column = self.add_column(name);
        column.set_type_parts(reference.sql_type.clone(), reference.collatable);
        if options.on_delete == ReferentialAction::SetNull {
            column.set_nullable();
        } else {
            column.set_not_null();
        }
        column
    }

    /// Forget a declared column; an existing live column is dropped on the next check
    pub fn remove_column(&mut self, name: &str) -> &mut Self {
        self.columns.shift_remove(name);
        self
    }

    fn insert_index<S: AsRef<str>>(&mut self, kind: IndexKind, columns: &[S]) -> Result<&mut Self> {
        let index = Index::new(kind, columns)?;
        self.keys.insert(index.name().to_string(), index);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `StructureError::Declaration` for an empty column list.
    pub fn add_key<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self> {
        self.insert_index(IndexKind::Plain, columns)
    }

    /// # Errors
    ///
    /// Returns `StructureError::Declaration` for an empty column list.
    pub fn add_unique<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self> {
        self.insert_index(IndexKind::Unique, columns)
    }

    /// # Errors
    ///
    /// Returns `StructureError::Declaration` for an empty column list.
    pub fn add_fulltext<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self> {
        self.insert_index(IndexKind::Fulltext, columns)
    }

    /// Seed file imported right after the table is created
    pub fn set_default_data_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.seed_file = Some(SeedFile::from_path(path));
        self
    }

    /// Rows inserted right after the table is created
    pub fn add_on_create(&mut self, rows: impl Into<SeedRows>) -> &mut Self {
        self.seed_rows = Some(rows.into());
        self
    }

    /// Callback run for every row when an existing table is converged, before column drops
    pub fn add_migration(
        &mut self,
        migration: impl Fn(&Row, &dyn SchemaExecutor) -> Result<()> + 'static,
    ) -> &mut Self {
        self.migrations.push(Box::new(migration));
        self
    }

    /// Declare a many-to-many join table named after this table and `other`
    pub fn create_relation_table(&mut self, other: &str) -> &mut Table {
        let name = self
            .many_has_many_pattern
            .replacen("%s", &self.name, 1)
            .replacen("%s", strip_schema(other), 1);
        let relation = Table {
            engine: self.engine.clone(),
            charset: self.charset.clone(),
            collation: self.collation.clone(),
            ..Table::with_config(name, &StructureConfig {
                many_has_many_pattern: self.many_has_many_pattern.clone(),
                ..StructureConfig::default()
            })
        };
        self.relation_tables.push(relation);
        let last = self.relation_tables.len() - 1;
        &mut self.relation_tables[last]
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn relation_tables(&self) -> &[Table] {
        &self.relation_tables
    }

    /// Declared indexes, including those set through column shortcuts
    pub fn indexes(&self) -> Vec<Index> {
        let mut keys = self.keys.clone();
        for column in self.columns.values() {
            if let Some(kind) = column.key() {
                let index = Index::named(column.name(), kind, vec![column.name().to_string()]);
                keys.insert(column.name().to_string(), index);
            }
        }
        keys.into_values().collect()
    }

    /// What a foreign key pointing at this table needs
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Declaration` if the table has no primary key or the key
    /// column has no type.
    pub fn reference(&self) -> Result<TableReference> {
        let pk_column = self
            .primary_key
            .as_ref()
            .and_then(|pk| pk.columns().first())
            .ok_or_else(|| {
                StructureError::Declaration(format!(
                    "Table {} has no primary key to reference",
                    self.name
                ))
            })?;
        let column = self.columns.get(pk_column).ok_or_else(|| {
            StructureError::Declaration(format!("Column '{pk_column}' is not defined on {}", self.name))
        })?;
        let sql_type = column.sql_type().ok_or_else(|| {
            StructureError::Declaration(format!("Column '{pk_column}' has no type"))
        })?;
        Ok(TableReference {
            table: self.name.clone(),
            column: pk_column.clone(),
            sql_type: sql_type.to_string(),
            collatable: column.is_collatable(),
        })
    }

    pub(crate) fn column_definitions(&self) -> Result<Vec<ColumnDefinition>> {
        self.columns
            .values()
            .map(|c| c.definition(&self.collation))
            .collect()
    }

    fn effective_auto_increment(&self) -> Option<u64> {
        self.auto_increment.or_else(|| {
            self.columns
                .values()
                .any(Column::is_auto_increment)
                .then_some(1)
        })
    }

    /// The full `CREATE TABLE IF NOT EXISTS` statement
    pub fn create_statement(&self, executor: &dyn SchemaExecutor) -> Result<String> {
        let mut parts: Vec<String> = self
            .column_definitions()?
            .iter()
            .map(|d| d.render(executor))
            .collect();
        if let Some(pk) = &self.primary_key {
            parts.push(pk.to_string());
        }
        parts.extend(self.indexes().iter().map(ToString::to_string));
        parts.extend(self.constraints.values().map(ToString::to_string));

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n) ENGINE={}",
            quote_ident(&self.name),
            parts.join(",\n  "),
            self.engine
        );
        if let Some(first) = self.effective_auto_increment() {
            sql.push_str(&format!(" AUTO_INCREMENT={first}"));
        }
        sql.push_str(&format!(
            " DEFAULT CHARSET={} COLLATE={}",
            self.charset, self.collation
        ));
        if let Some(addition) = &self.addition {
            sql.push(' ');
            sql.push_str(addition);
        }
        Ok(sql)
    }

    /// SHA-256 over the rendered declaration, relation tables and renames included
    pub fn checksum(&self, executor: &dyn SchemaExecutor) -> Result<String> {
        let mut hasher = Sha256::new();
        self.feed_checksum(&mut hasher, executor)?;
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn feed_checksum(&self, hasher: &mut Sha256, executor: &dyn SchemaExecutor) -> Result<()> {
        hasher.update(self.create_statement(executor)?.as_bytes());
        for column in self.columns.values() {
            for old in column.renamed_from() {
                hasher.update(format!("\nrename {old} -> {}", column.name()).as_bytes());
            }
        }
        for relation in &self.relation_tables {
            hasher.update(b"\n--\n");
            relation.feed_checksum(hasher, executor)?;
        }
        Ok(())
    }

    /// Converge the live table to this declaration
    ///
    /// Returns `true` when the table did not exist and was created.
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Query` for the first statement the database rejects; nothing
    /// is rolled back and a later check completes the remaining changes.
    pub fn check(&self, executor: &dyn SchemaExecutor) -> Result<bool> {
        let guard = ForeignKeyChecksGuard::new(executor)?;
        self.converge(&guard)
    }

    pub(crate) fn converge(&self, guard: &ForeignKeyChecksGuard<'_>) -> Result<bool> {
        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::check_table_span(&self.name).entered();

        let executor = guard.executor();
        let reader = CatalogReader::new(executor);

        let created = if reader.table_exists(&self.name)? {
            self.modify(&reader, guard)?;
            false
        } else {
            self.create(guard)?;
            true
        };

        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_table_converged();

        Ok(created)
    }

    fn create(&self, guard: &ForeignKeyChecksGuard<'_>) -> Result<()> {
        let executor = guard.executor();
        run_statement(executor, &self.create_statement(executor)?)?;
        log::info!("Created table {}", self.name);

        if let Some(file) = &self.seed_file {
            seed::import_file(executor, &self.name, file)?;
        }
        if let Some(rows) = &self.seed_rows {
            seed::import_rows(executor, &self.name, rows)?;
        }

        for relation in &self.relation_tables {
            relation.converge(guard)?;
        }
        Ok(())
    }

    fn modify(&self, reader: &CatalogReader<'_>, guard: &ForeignKeyChecksGuard<'_>) -> Result<()> {
        let executor = guard.executor();
        let mut applied = 0usize;

        let live_columns: Vec<String> = reader
            .columns(&self.name)?
            .into_iter()
            .map(|c| c.field)
            .collect();
        for rename in diff::plan_renames(self, &live_columns, executor)? {
            self.alter(executor, std::slice::from_ref(&rename), &mut applied)?;
        }

        let live = reader.live_table(&self.name)?;
        let plan = diff::plan_alter(self, &live, executor)?;

        self.alter(executor, &plan.drop_keys, &mut applied)?;
        self.alter(executor, &plan.modify, &mut applied)?;
        if !plan.add.is_empty() {
            guard.with_checks_enabled(|| self.alter(executor, &plan.add, &mut applied))?;
        }

        for relation in &self.relation_tables {
            relation.converge(guard)?;
        }

        // Each migration sees the rows as left by the previous one
        for (n, migration) in self.migrations.iter().enumerate() {
            let rows = executor.query(&format!("SELECT * FROM {}", quote_ident(&self.name)), &[])?;
            log::info!(
                "Running migration {} of {} over {} row(s) of {}",
                n + 1,
                self.migrations.len(),
                rows.len(),
                self.name
            );
            for row in &rows {
                migration(row, executor)?;
            }
        }

        self.alter(executor, &plan.drop_columns, &mut applied)?;

        for option in diff::plan_table_options(self, &live.options) {
            self.alter(executor, std::slice::from_ref(&option), &mut applied)?;
        }

        if applied == 0 {
            log::debug!("Table {} is up to date", self.name);
        } else {
            log::info!("Table {}: applied {} ALTER statement(s)", self.name, applied);
        }
        Ok(())
    }

    fn alter(&self, executor: &dyn SchemaExecutor, clauses: &[AlterClause], applied: &mut usize) -> Result<()> {
        if let Some(sql) = alter_statement(&self.name, clauses) {
            run_statement(executor, &sql)?;
            *applied += 1;
        }
        Ok(())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("charset", &self.charset)
            .field("collation", &self.collation)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("keys", &self.keys)
            .field("constraints", &self.constraints)
            .field("relation_tables", &self.relation_tables)
            .field("auto_increment", &self.auto_increment)
            .field("addition", &self.addition)
            .field("seed_file", &self.seed_file)
            .field("migrations", &self.migrations.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    fn user_table() -> Table {
        let mut table = Table::new("user");
        table.add_primary_key("id").int().set_auto_increment();
        table.add_column("email").varchar(255).set_unique();
        table
    }

    #[test]
    fn test_create_statement_shape() {
        let executor = MockExecutor::new("shop");
        let sql = user_table().create_statement(&executor).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `user` (\n  \
             `id` int(11) NOT NULL AUTO_INCREMENT,\n  \
             `email` varchar(255) COLLATE utf8mb4_unicode_ci NOT NULL,\n  \
             PRIMARY KEY(`id`),\n  \
             UNIQUE KEY `email` (`email`)\n\
             ) ENGINE=InnoDB AUTO_INCREMENT=1 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
        );
    }

    #[test]
    fn test_explicit_auto_increment_and_addition() {
        let executor = MockExecutor::new("shop");
        let mut table = Table::new("log");
        table.add_column("line").text();
        table.set_auto_increment(100).add("COMMENT='audit'");
        let sql = table.create_statement(&executor).unwrap();
        assert!(sql.ends_with(
            "ENGINE=InnoDB AUTO_INCREMENT=100 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci COMMENT='audit'"
        ));
    }

    #[test]
    fn test_primary_key_requires_declared_column() {
        let mut table = Table::new("user");
        assert!(matches!(
            table.set_primary_key(&["id"]),
            Err(StructureError::Declaration(_))
        ));
        let empty: [&str; 0] = [];
        assert!(table.set_primary_key(&empty).is_err());

        table.add_column("id").int();
        match table.set_primary_key(&["id", "ghost"]) {
            Err(StructureError::Declaration(msg)) => assert!(msg.contains("ghost"), "{msg}"),
            other => panic!("expected declaration error, got {other:?}"),
        }
        assert!(table.primary_key().is_none());
    }

    #[test]
    fn test_foreign_key_declaration() {
        let user = user_table();
        let mut post = Table::new("blogPost");
        post.add_primary_key("id").int().set_auto_increment();
        post.add_foreign_key(
            "author_id",
            &user.reference().unwrap(),
            ForeignKeyOptions::default().on_delete(None::<bool>),
        );

        let column = post.column("author_id").unwrap();
        assert_eq!(column.sql_type(), Some("int(11)"));
        assert_eq!(
            column.default_clause(),
            &crate::structure::column::DefaultClause::Null
        );
        assert_eq!(post.indexes()[0].to_string(), "KEY `author_id` (`author_id`)");

        let constraint = post.constraints().next().unwrap();
        assert_eq!(constraint.name, "fk_blPo_author_id_us_id");
        assert_eq!(constraint.on_delete, ReferentialAction::SetNull);
        assert_eq!(constraint.on_update, ReferentialAction::Restrict);
    }

    #[test]
    fn test_reference_requires_primary_key() {
        let table = Table::new("tag");
        assert!(table.reference().is_err());
    }

    #[test]
    fn test_relation_table_name_strips_schema() {
        let mut user = Table::new("user");
        let relation = user.create_relation_table("shop.role");
        assert_eq!(relation.name(), "user_x_role");
        assert_eq!(user.relation_tables().len(), 1);
    }

    #[test]
    fn test_column_shortcut_overrides_explicit_key() {
        let mut table = Table::new("t");
        table.add_column("code").char(8);
        table.add_key(&["code"]).unwrap();
        table.column_mut("code").unwrap().set_unique();
        let indexes = table.indexes();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].kind(), IndexKind::Unique);
    }

    #[test]
    fn test_checksum_tracks_declaration() {
        let executor = MockExecutor::new("shop");
        let a = user_table().checksum(&executor).unwrap();
        let b = user_table().checksum(&executor).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut changed = user_table();
        changed.add_column("age").int();
        assert_ne!(a, changed.checksum(&executor).unwrap());
    }

    #[test]
    fn test_fresh_create_emits_single_create() {
        let executor = MockExecutor::new("shop");
        let created = user_table().check(&executor).unwrap();
        assert!(created);

        let ddl = executor.ddl_statements();
        assert_eq!(ddl.len(), 1);
        assert!(ddl[0].starts_with("CREATE TABLE IF NOT EXISTS `user`"));
        assert!(ddl[0].contains("PRIMARY KEY(`id`)"));
        assert!(ddl[0].contains("UNIQUE KEY `email` (`email`)"));
        assert!(ddl[0].contains("AUTO_INCREMENT=1"));
        assert!(executor.foreign_key_checks_enabled());
    }

    #[test]
    fn test_second_check_is_idempotent() {
        let executor = MockExecutor::new("shop");
        let table = user_table();
        table.check(&executor).unwrap();
        executor.clear_statements();

        assert!(!table.check(&executor).unwrap());
        assert!(executor.ddl_statements().is_empty(), "{:?}", executor.ddl_statements());
        assert_eq!(
            executor.statements(),
            vec!["SET foreign_key_checks = 0", "SET foreign_key_checks = 1"]
        );
    }
}
