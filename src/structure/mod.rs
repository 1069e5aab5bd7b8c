//! Declared schema and the registry that converges it
//!
//! Mappers are registered with a [`Structure`]. Tables are built lazily on first access, so a
//! mapper can ask for the tables it references while declaring its own foreign keys; the
//! order in which builds complete is the order in which tables converge, which puts
//! referenced tables first. Views converge after every table.

pub mod catalog;
pub mod column;
pub mod constraint;
pub mod diff;
pub mod guard;
pub mod index;
pub mod mapper;
pub mod primary_key;
pub mod seed;
pub mod table;
pub mod view;

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::cache::{Cache, RedisStorage};
use crate::config::{Memoization, StructureConfig};
use crate::error::{Result, StructureError};
use crate::executor::SchemaExecutor;
use guard::ForeignKeyChecksGuard;
use mapper::{table_name, Conventions, TableMapper, ViewMapper};
use table::Table;
use view::View;

const LOADED_KEY: &str = "loaded";
const STRUCTURE_TAG: &str = "structure";

struct Registered<M: ?Sized> {
    label: &'static str,
    mapper: Box<M>,
}

/// What one [`Structure::run`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tables and views whose live state was checked, in convergence order
    pub checked: Vec<String>,
    /// Tables and views that did not exist before
    pub created: Vec<String>,
    /// Tables and views skipped because the memoization store says they are converged
    pub skipped: Vec<String>,
}

/// Registry of table and view mappers
pub struct Structure {
    config: StructureConfig,
    cache: Cache,
    table_mappers: IndexMap<TypeId, Registered<dyn TableMapper>>,
    view_mappers: IndexMap<TypeId, Registered<dyn ViewMapper>>,
    tables: RefCell<IndexMap<TypeId, Rc<Table>>>,
    views: RefCell<IndexMap<TypeId, Rc<View>>>,
    building: RefCell<HashSet<TypeId>>,
}

impl Structure {
    pub fn new(config: StructureConfig, cache: Cache) -> Self {
        Self {
            config,
            cache,
            table_mappers: IndexMap::new(),
            view_mappers: IndexMap::new(),
            tables: RefCell::new(IndexMap::new()),
            views: RefCell::new(IndexMap::new()),
            building: RefCell::new(HashSet::new()),
        }
    }

    /// Registry with the memoization backend `config` selects: Redis when `redis_url` is
    /// set, otherwise an in-process cache
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Cache` if the Redis URL is invalid.
    pub fn from_config(config: StructureConfig) -> Result<Self> {
        let cache = match &config.redis_url {
            Some(url) => Cache::new(Box::new(RedisStorage::open(url)?), &config.cache_namespace),
            None => Cache::in_memory(&config.cache_namespace),
        };
        Ok(Self::new(config, cache))
    }

    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn add_table_mapper<M: TableMapper>(&mut self, mapper: M) -> &mut Self {
        self.table_mappers.insert(
            TypeId::of::<M>(),
            Registered {
                label: type_name::<M>(),
                mapper: Box::new(mapper),
            },
        );
        self
    }

    pub fn add_view_mapper<M: ViewMapper>(&mut self, mapper: M) -> &mut Self {
        self.view_mappers.insert(
            TypeId::of::<M>(),
            Registered {
                label: type_name::<M>(),
                mapper: Box::new(mapper),
            },
        );
        self
    }

    /// Declaration of `M`'s table, built on first access
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Lookup` if `M` is not registered and
    /// `StructureError::Declaration` if building it requires itself.
    pub fn table<M: TableMapper>(&self) -> Result<Rc<Table>> {
        self.table_by_id(TypeId::of::<M>(), type_name::<M>())
    }

    /// Declaration of `M`'s view, built on first access
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Lookup` if `M` is not registered as a view mapper.
    pub fn view<M: ViewMapper>(&self) -> Result<Rc<View>> {
        self.view_by_id(TypeId::of::<M>(), type_name::<M>())
    }

    /// Physical table name `M` maps to
    pub fn table_name<M: TableMapper>(&self) -> Result<String> {
        let entry = self.table_mapper(TypeId::of::<M>(), type_name::<M>())?;
        Ok(self.physical_name(entry.mapper.entity_name(), entry.mapper.table_prefix()))
    }

    /// Storage conventions for `M`
    pub fn conventions<M: TableMapper>(&self) -> Result<Conventions> {
        let table = self.table::<M>()?;
        Ok(Conventions {
            inflector: self.config.inflector(),
            storage_name: table.name().to_string(),
            primary_key: table
                .primary_key()
                .map(|pk| pk.columns().to_vec())
                .unwrap_or_default(),
        })
    }

    /// Forget every memoized convergence so the next run checks everything again
    pub fn clean(&self) -> Result<()> {
        self.cache.clean_tag(STRUCTURE_TAG)
    }

    fn physical_name(&self, entity: &str, prefix: &str) -> String {
        table_name(entity, self.config.inflector(), prefix)
    }

    fn table_mapper(&self, id: TypeId, label: &str) -> Result<&Registered<dyn TableMapper>> {
        self.table_mappers
            .get(&id)
            .ok_or_else(|| StructureError::Lookup(format!("Mapper {label} is not registered as a table mapper")))
    }

    fn table_by_id(&self, id: TypeId, label: &str) -> Result<Rc<Table>> {
        let cached = self.tables.borrow().get(&id).cloned();
        if let Some(table) = cached {
            return Ok(table);
        }

        let entry = self.table_mapper(id, label)?;
        if !self.building.borrow_mut().insert(id) {
            return Err(StructureError::Declaration(format!(
                "Table of {label} depends on itself"
            )));
        }

        let mut table = Table::with_config(
            self.physical_name(entry.mapper.entity_name(), entry.mapper.table_prefix()),
            &self.config,
        );
        let built = entry.mapper.create_table(&mut table, self);
        self.building.borrow_mut().remove(&id);
        built?;

        log::debug!("Built declaration of table {}", table.name());
        let table = Rc::new(table);
        self.tables.borrow_mut().insert(id, Rc::clone(&table));
        Ok(table)
    }

    fn view_by_id(&self, id: TypeId, label: &str) -> Result<Rc<View>> {
        let cached = self.views.borrow().get(&id).cloned();
        if let Some(view) = cached {
            return Ok(view);
        }

        let entry = self
            .view_mappers
            .get(&id)
            .ok_or_else(|| StructureError::Lookup(format!("Mapper {label} is not registered as a view mapper")))?;
        let mut view = View::new(self.physical_name(entry.mapper.entity_name(), entry.mapper.table_prefix()));
        entry.mapper.create_view(&mut view, self)?;

        let view = Rc::new(view);
        self.views.borrow_mut().insert(id, Rc::clone(&view));
        Ok(view)
    }

    /// Converge every registered table, then every registered view
    ///
    /// Does nothing when `auto_manage_db` is off. Convergence already recorded in the
    /// memoization store is skipped: with [`Memoization::Global`] a single flag covers the
    /// whole registry, with [`Memoization::PerTable`] each object is skipped only while its
    /// declaration checksum is unchanged.
    ///
    /// # Errors
    ///
    /// Stops at the first declaration, query or cache error.
    pub fn run(&self, executor: &dyn SchemaExecutor) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        if !self.config.auto_manage_db {
            log::debug!("Automatic schema management is disabled");
            return Ok(summary);
        }

        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::run_structure_span(
            self.table_mappers.len(),
            self.view_mappers.len(),
        )
        .entered();
        let started = Instant::now();

        for (id, entry) in &self.table_mappers {
            self.table_by_id(*id, entry.label)?;
        }
        for (id, entry) in &self.view_mappers {
            self.view_by_id(*id, entry.label)?;
        }
        let tables: Vec<(TypeId, Rc<Table>)> = self
            .tables
            .borrow()
            .iter()
            .map(|(id, table)| (*id, Rc::clone(table)))
            .collect();
        let views: Vec<Rc<View>> = self.views.borrow().values().cloned().collect();

        let global = self.config.memoization == Memoization::Global;
        if global && self.cache.load(LOADED_KEY)?.is_some() {
            log::info!("Schema already converged, skipping structure check");
            summary.skipped.extend(tables.iter().map(|(_, t)| t.name().to_string()));
            summary.skipped.extend(views.iter().map(|v| v.name().to_string()));
            return Ok(summary);
        }

        let mut pending = Vec::new();
        for (id, table) in &tables {
            let memo = self.memo_entry(table.name(), || table.checksum(executor))?;
            if self.is_current(&memo)? {
                log::debug!("Table {} unchanged since last convergence", table.name());
                summary.skipped.push(table.name().to_string());
            } else {
                pending.push((*id, table, memo));
            }
        }

        if !pending.is_empty() {
            let guard = ForeignKeyChecksGuard::new(executor)?;
            for (id, table, memo) in pending {
                if table.converge(&guard)? {
                    summary.created.push(table.name().to_string());
                    if let Some(entry) = self.table_mappers.get(&id) {
                        entry.mapper.on_table_created(executor)?;
                    }
                }
                summary.checked.push(table.name().to_string());
                self.remember(memo)?;
            }
        }

        for view in &views {
            let memo = self.memo_entry(view.name(), || Ok(digest(&view.definition(executor)?)))?;
            if self.is_current(&memo)? {
                summary.skipped.push(view.name().to_string());
                continue;
            }

            if view.check(executor)? {
                summary.created.push(view.name().to_string());
            }
            summary.checked.push(view.name().to_string());
            self.remember(memo)?;
        }

        if global {
            self.cache.save(LOADED_KEY, "1", &[STRUCTURE_TAG])?;
        }

        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_convergence_duration(started.elapsed());
        log::info!(
            "Structure converged in {:?}: {} checked, {} created, {} skipped",
            started.elapsed(),
            summary.checked.len(),
            summary.created.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}

type Memo = Option<(String, String)>;

impl Structure {
    /// Per-object memo key and fingerprint; `None` under global memoization
    fn memo_entry(&self, name: &str, fingerprint: impl FnOnce() -> Result<String>) -> Result<Memo> {
        if self.config.memoization == Memoization::Global {
            return Ok(None);
        }
        Ok(Some((format!("{name}Structure"), fingerprint()?)))
    }

    fn is_current(&self, memo: &Memo) -> Result<bool> {
        match memo {
            Some((key, fingerprint)) => Ok(self.cache.load(key)?.as_deref() == Some(fingerprint.as_str())),
            None => Ok(false),
        }
    }

    fn remember(&self, memo: Memo) -> Result<()> {
        if let Some((key, fingerprint)) = memo {
            self.cache.save(&key, &fingerprint, &[STRUCTURE_TAG])?;
        }
        Ok(())
    }
}

fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use crate::structure::constraint::ForeignKeyOptions;

    struct RoleMapper;
    struct UserMapper;
    struct LoopMapper;

    impl TableMapper for RoleMapper {
        fn entity_name(&self) -> &str {
            "RoleMapper"
        }

        fn create_table(&self, table: &mut Table, _structure: &Structure) -> Result<()> {
            table.add_primary_key("id").int().set_auto_increment();
            table.add_column("name").varchar(50);
            Ok(())
        }
    }

    impl TableMapper for UserMapper {
        fn entity_name(&self) -> &str {
            "UserMapper"
        }

        fn create_table(&self, table: &mut Table, structure: &Structure) -> Result<()> {
            table.add_primary_key("id").int().set_auto_increment();
            let role = structure.table::<RoleMapper>()?;
            table.add_foreign_key("role_id", &role.reference()?, ForeignKeyOptions::default());
            Ok(())
        }
    }

    impl TableMapper for LoopMapper {
        fn entity_name(&self) -> &str {
            "LoopMapper"
        }

        fn create_table(&self, _table: &mut Table, structure: &Structure) -> Result<()> {
            structure.table::<LoopMapper>().map(|_| ())
        }
    }

    fn registry() -> Structure {
        let mut structure = Structure::new(StructureConfig::default(), Cache::in_memory("test"));
        structure.add_table_mapper(UserMapper).add_table_mapper(RoleMapper);
        structure
    }

    #[test]
    fn test_unregistered_mapper_is_lookup_error() {
        let structure = Structure::new(StructureConfig::default(), Cache::in_memory("test"));
        assert!(matches!(
            structure.table::<UserMapper>(),
            Err(StructureError::Lookup(_))
        ));
    }

    #[test]
    fn test_self_dependency_is_declaration_error() {
        let mut structure = Structure::new(StructureConfig::default(), Cache::in_memory("test"));
        structure.add_table_mapper(LoopMapper);
        assert!(matches!(
            structure.table::<LoopMapper>(),
            Err(StructureError::Declaration(_))
        ));
    }

    #[test]
    fn test_tables_are_built_once() {
        let structure = registry();
        let first = structure.table::<RoleMapper>().unwrap();
        let second = structure.table::<RoleMapper>().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_referenced_tables_converge_first() {
        let executor = MockExecutor::new("shop");
        let summary = registry().run(&executor).unwrap();
        assert_eq!(summary.checked, vec!["role".to_string(), "user".to_string()]);
        assert_eq!(summary.created, summary.checked);
        assert!(executor.foreign_key_checks_enabled());
    }

    #[test]
    fn test_conventions() {
        let structure = registry();
        let conventions = structure.conventions::<UserMapper>().unwrap();
        assert_eq!(conventions.storage_name, "user");
        assert_eq!(conventions.primary_key, vec!["id".to_string()]);
        assert_eq!(structure.table_name::<RoleMapper>().unwrap(), "role");
    }

    #[test]
    fn test_disabled_management_runs_nothing() {
        let config = StructureConfig {
            auto_manage_db: false,
            ..StructureConfig::default()
        };
        let mut structure = Structure::new(config, Cache::in_memory("test"));
        structure.add_table_mapper(RoleMapper);
        let executor = MockExecutor::new("shop");
        assert_eq!(structure.run(&executor).unwrap(), RunSummary::default());
        assert!(executor.statements().is_empty());
    }
}
