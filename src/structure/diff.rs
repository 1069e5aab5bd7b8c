//! Schema diffing - compare a declared table against its live catalog snapshot.
//!
//! Planning is pure: nothing here talks to the database. [`Table::check`](crate::Table::check)
//! fetches the snapshot, asks for a plan and executes its phases in order:
//!
//! 1. renames (`CHANGE`), so a renamed column is not seen as drop + add
//! 2. one `DROP` for foreign keys, the primary key and indexes, in that order
//! 3. one `MODIFY` for changed columns
//! 4. one `ADD` for new columns, primary key, indexes and constraints
//! 5. one `DROP` for removed columns, after row migrations have run
//! 6. table options, one statement each

use std::collections::HashSet;
use std::fmt;

use crate::error::Result;
use crate::executor::{quote_ident, SchemaExecutor};
use crate::structure::catalog::{LiveTable, TableOptions};
use crate::structure::table::Table;

/// A single `ALTER TABLE` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterClause {
    /// Rename a column, applying the declared definition
    Change { from: String, definition: String },
    DropForeignKey(String),
    DropPrimaryKey,
    DropIndex(String),
    Modify(String),
    /// All new columns in one parenthesised clause
    AddColumns(Vec<String>),
    AddPrimaryKey(String),
    AddIndex(String),
    AddConstraint(String),
    DropColumn(String),
    Engine(String),
    DefaultCharset(String),
    Collate(String),
}

impl fmt::Display for AlterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterClause::Change { from, definition } => {
                write!(f, "CHANGE {} {}", quote_ident(from), definition)
            }
            AlterClause::DropForeignKey(name) => write!(f, "DROP FOREIGN KEY {}", quote_ident(name)),
            AlterClause::DropPrimaryKey => f.write_str("DROP PRIMARY KEY"),
            AlterClause::DropIndex(name) => write!(f, "DROP INDEX {}", quote_ident(name)),
            AlterClause::Modify(definition) => write!(f, "MODIFY {definition}"),
            AlterClause::AddColumns(definitions) => write!(f, "ADD ({})", definitions.join(", ")),
            AlterClause::AddPrimaryKey(pk) | AlterClause::AddIndex(pk) | AlterClause::AddConstraint(pk) => {
                write!(f, "ADD {pk}")
            }
            AlterClause::DropColumn(name) => write!(f, "DROP {}", quote_ident(name)),
            AlterClause::Engine(engine) => write!(f, "ENGINE={engine}"),
            AlterClause::DefaultCharset(charset) => write!(f, "DEFAULT CHARSET={charset}"),
            AlterClause::Collate(collation) => write!(f, "COLLATE={collation}"),
        }
    }
}

/// Column, key and constraint changes for an existing table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterPlan {
    pub drop_keys: Vec<AlterClause>,
    pub modify: Vec<AlterClause>,
    pub add: Vec<AlterClause>,
    pub drop_columns: Vec<AlterClause>,
}

impl AlterPlan {
    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.drop_keys.is_empty()
            && self.modify.is_empty()
            && self.add.is_empty()
            && self.drop_columns.is_empty()
    }

    /// Count total number of clauses.
    pub fn change_count(&self) -> usize {
        self.drop_keys.len() + self.modify.len() + self.add.len() + self.drop_columns.len()
    }
}

/// `ALTER TABLE t c1, c2`; `None` when there is nothing to alter
pub fn alter_statement(table: &str, clauses: &[AlterClause]) -> Option<String> {
    if clauses.is_empty() {
        return None;
    }
    let clauses: Vec<String> = clauses.iter().map(ToString::to_string).collect();
    Some(format!("ALTER TABLE {} {}", quote_ident(table), clauses.join(", ")))
}

/// `CHANGE` clauses for declared renames whose old column exists live
///
/// A rename is skipped when its target column already exists, and each column is renamed at
/// most once even when several old names are listed.
pub fn plan_renames(
    table: &Table,
    live_columns: &[String],
    executor: &dyn SchemaExecutor,
) -> Result<Vec<AlterClause>> {
    let mut live: HashSet<&str> = live_columns.iter().map(String::as_str).collect();
    let mut clauses = Vec::new();

    for column in table.columns() {
        for old_name in column.renamed_from() {
            if !live.contains(old_name.as_str()) {
                continue;
            }
            if live.contains(column.name()) {
                log::warn!(
                    "Not renaming {}.{} to {}: the target column already exists",
                    table.name(),
                    old_name,
                    column.name()
                );
                continue;
            }
            let definition = column.definition(table.collation())?.render(executor);
            clauses.push(AlterClause::Change {
                from: old_name.clone(),
                definition,
            });
            live.remove(old_name.as_str());
            live.insert(column.name());
        }
    }
    Ok(clauses)
}

/// Diff declared columns, primary key, indexes and constraints against the live snapshot
pub fn plan_alter(table: &Table, live: &LiveTable, executor: &dyn SchemaExecutor) -> Result<AlterPlan> {
    let mut plan = AlterPlan::default();

    // Columns
    let declared = table.column_definitions()?;
    let mut to_add: Vec<_> = declared.iter().collect();
    for live_column in &live.columns {
        match declared.iter().find(|d| d.name == live_column.field) {
            Some(definition) => {
                if definition.normalized(executor) != live_column.definition().normalized(executor) {
                    plan.modify.push(AlterClause::Modify(definition.render(executor)));
                }
                to_add.retain(|d| d.name != live_column.field);
            }
            None => plan.drop_columns.push(AlterClause::DropColumn(live_column.field.clone())),
        }
    }
    if !to_add.is_empty() {
        plan.add.push(AlterClause::AddColumns(
            to_add.iter().map(|d| d.render(executor)).collect(),
        ));
    }

    // Primary key
    let pk_matches = match table.primary_key() {
        Some(pk) => pk.matches(&live.primary_key),
        None => live.primary_key.is_empty(),
    };
    let mut drop_primary = false;
    if !pk_matches {
        drop_primary = !live.primary_key.is_empty();
        if let Some(pk) = table.primary_key() {
            plan.add.push(AlterClause::AddPrimaryKey(pk.to_string()));
        }
    }

    // Indexes
    let mut indexes = table.indexes();
    let mut drop_indexes = Vec::new();
    for live_key in &live.keys {
        let live_index = live_key.to_index();
        let rendered = live_index.to_string();
        let before = indexes.len();
        indexes.retain(|i| !(i.name() == live_index.name() && i.to_string() == rendered));
        if indexes.len() == before {
            drop_indexes.push(AlterClause::DropIndex(live_key.name.clone()));
        }
    }
    plan.add.extend(indexes.iter().map(|i| AlterClause::AddIndex(i.to_string())));

    // Constraints
    let mut constraints: Vec<_> = table.constraints().collect();
    let mut drop_constraints = Vec::new();
    for live_fk in &live.constraints {
        let signature = live_fk.to_constraint().signature();
        let before = constraints.len();
        constraints.retain(|c| !(c.name == live_fk.name && c.signature() == signature));
        if constraints.len() == before {
            drop_constraints.push(AlterClause::DropForeignKey(live_fk.name.clone()));
        }
    }
    plan.add.extend(constraints.iter().map(|c| AlterClause::AddConstraint(c.to_string())));

    plan.drop_keys.extend(drop_constraints);
    if drop_primary {
        plan.drop_keys.push(AlterClause::DropPrimaryKey);
    }
    plan.drop_keys.extend(drop_indexes);

    Ok(plan)
}

/// Engine, charset and collation changes; attributes the catalog did not report are skipped
pub fn plan_table_options(table: &Table, live: &TableOptions) -> Vec<AlterClause> {
    let differs = |live: &Option<String>, declared: &str| {
        live.as_deref()
            .map(|l| !l.eq_ignore_ascii_case(declared))
            .unwrap_or(false)
    };

    let mut clauses = Vec::new();
    if differs(&live.engine, table.engine()) {
        clauses.push(AlterClause::Engine(table.engine().to_string()));
    }
    if differs(&live.charset, table.charset()) {
        clauses.push(AlterClause::DefaultCharset(table.charset().to_string()));
    }
    if differs(&live.collation, table.collation()) {
        clauses.push(AlterClause::Collate(table.collation().to_string()));
    }
    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use crate::structure::catalog::{IntrospectedColumn, IntrospectedConstraint, IntrospectedKey};
    use std::collections::BTreeMap;

    fn live_column(field: &str, ty: &str) -> IntrospectedColumn {
        IntrospectedColumn {
            field: field.into(),
            sql_type: ty.into(),
            collation: None,
            nullable: false,
            default: None,
            extra: String::new(),
        }
    }

    fn user_table() -> Table {
        let mut table = Table::new("user");
        table.add_primary_key("id").int().set_auto_increment();
        table.add_column("age").int();
        table
    }

    fn user_live() -> LiveTable {
        let mut id = live_column("id", "int(11)");
        id.extra = "auto_increment".into();
        LiveTable {
            columns: vec![id, live_column("age", "int")],
            primary_key: vec!["id".into()],
            ..LiveTable::default()
        }
    }

    #[test]
    fn test_matching_table_plans_nothing() {
        let executor = MockExecutor::new("shop");
        let plan = plan_alter(&user_table(), &user_live(), &executor).unwrap();
        assert!(plan.is_empty(), "{plan:?}");
    }

    #[test]
    fn test_added_modified_and_dropped_columns() {
        let executor = MockExecutor::new("shop");
        let mut table = user_table();
        table.add_column("score").bigint();
        table.remove_column("age");
        let mut live = user_live();
        live.columns.push(live_column("score", "int(11)"));
        live.columns.push(live_column("legacy", "text"));
        table.add_column("nick").varchar(32);

        let plan = plan_alter(&table, &live, &executor).unwrap();
        assert_eq!(plan.modify, vec![AlterClause::Modify("`score` bigint(15) NOT NULL".into())]);
        assert_eq!(
            plan.drop_columns,
            vec![AlterClause::DropColumn("age".into()), AlterClause::DropColumn("legacy".into())]
        );
        assert_eq!(
            plan.add,
            vec![AlterClause::AddColumns(vec![
                "`nick` varchar(32) COLLATE utf8mb4_unicode_ci NOT NULL".into()
            ])]
        );
    }

    #[test]
    fn test_drop_keys_order_foreign_primary_index() {
        let executor = MockExecutor::new("shop");
        let mut table = Table::new("post");
        table.add_column("a").int();
        table.add_column("b").int();
        table.set_primary_key(&["a", "b"]).unwrap();

        let live = LiveTable {
            columns: vec![live_column("a", "int"), live_column("b", "int")],
            primary_key: vec!["a".into()],
            keys: vec![IntrospectedKey {
                name: "old_idx".into(),
                unique: false,
                index_type: "BTREE".into(),
                columns: BTreeMap::from([(1, "b".to_string())]),
            }],
            constraints: vec![IntrospectedConstraint {
                name: "fk_old".into(),
                column: "b".into(),
                referenced_table: "user".into(),
                referenced_column: "id".into(),
                delete_rule: "CASCADE".into(),
                update_rule: "NO ACTION".into(),
            }],
            ..LiveTable::default()
        };

        let plan = plan_alter(&table, &live, &executor).unwrap();
        assert_eq!(
            alter_statement("post", &plan.drop_keys).unwrap(),
            "ALTER TABLE `post` DROP FOREIGN KEY `fk_old`, DROP PRIMARY KEY, DROP INDEX `old_idx`"
        );
        assert_eq!(
            alter_statement("post", &plan.add).unwrap(),
            "ALTER TABLE `post` ADD PRIMARY KEY(`a`, `b`)"
        );
    }

    #[test]
    fn test_changed_index_is_dropped_and_re_added() {
        let executor = MockExecutor::new("shop");
        let mut table = user_table();
        table.add_unique(&["age"]).unwrap();
        let mut live = user_live();
        live.keys.push(IntrospectedKey {
            name: "age".into(),
            unique: false,
            index_type: "BTREE".into(),
            columns: BTreeMap::from([(1, "age".to_string())]),
        });

        let plan = plan_alter(&table, &live, &executor).unwrap();
        assert_eq!(plan.drop_keys, vec![AlterClause::DropIndex("age".into())]);
        assert_eq!(plan.add, vec![AlterClause::AddIndex("UNIQUE KEY `age` (`age`)".into())]);
    }

    #[test]
    fn test_renames_skip_existing_target() {
        let executor = MockExecutor::new("shop");
        let mut table = Table::new("user");
        table.add_column("full_name").varchar(64).rename_from("name");
        table.add_column("mail").varchar(64).rename_from("email");

        let live = vec!["name".to_string(), "email".to_string(), "mail".to_string()];
        let clauses = plan_renames(&table, &live, &executor).unwrap();
        assert_eq!(
            clauses,
            vec![AlterClause::Change {
                from: "name".into(),
                definition: "`full_name` varchar(64) COLLATE utf8mb4_unicode_ci NOT NULL".into(),
            }]
        );
    }

    #[test]
    fn test_table_options_case_insensitive() {
        let table = Table::new("user");
        let live = TableOptions {
            engine: Some("innodb".into()),
            charset: Some("latin1".into()),
            collation: None,
        };
        assert_eq!(
            plan_table_options(&table, &live),
            vec![AlterClause::DefaultCharset("utf8mb4".into())]
        );
    }
}
