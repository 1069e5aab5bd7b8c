use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::structure::mapper::Inflector;

/// How the registry remembers that convergence already ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Memoization {
    /// One flag for the whole registry
    Global,
    /// One entry per table, keyed by `<table>Structure` and holding the declaration checksum
    #[default]
    PerTable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructureConfig {
    /// Schema converged by the registry, used to filter `information_schema` lookups
    #[serde(default)]
    pub database: String,
    #[serde(default = "default_true")]
    pub auto_manage_db: bool,
    #[serde(default = "default_true")]
    pub use_camel_case: bool,
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,
    #[serde(default)]
    pub memoization: Memoization,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_collation")]
    pub collation: String,
    #[serde(default = "default_many_has_many_pattern")]
    pub many_has_many_pattern: String,
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_cache_namespace() -> String {
    "ormStructure".to_string()
}

fn default_engine() -> String {
    "InnoDB".to_string()
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_collation() -> String {
    "utf8mb4_unicode_ci".to_string()
}

fn default_many_has_many_pattern() -> String {
    "%s_x_%s".to_string()
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            auto_manage_db: true,
            use_camel_case: true,
            cache_namespace: default_cache_namespace(),
            memoization: Memoization::default(),
            engine: default_engine(),
            charset: default_charset(),
            collation: default_collation(),
            many_has_many_pattern: default_many_has_many_pattern(),
            redis_url: None,
        }
    }
}

impl StructureConfig {
    /// Load the structure configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/config.toml")
    }

    /// Load from an explicit TOML path (optional) plus `TABLEWRIGHT__*` env vars.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("TABLEWRIGHT").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(path).exists() {
                    log::warn!("Failed to load config file {path}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix("TABLEWRIGHT").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        // A missing section means every field keeps its default
        match settings.get::<StructureConfig>("structure") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(StructureConfig::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Structure configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }

    /// Inflector selected by `use_camel_case`
    pub fn inflector(&self) -> Inflector {
        if self.use_camel_case {
            Inflector::CamelCase
        } else {
            Inflector::SnakeCase
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = StructureConfig::default();
        assert!(cfg.auto_manage_db);
        assert_eq!(cfg.cache_namespace, "ormStructure");
        assert_eq!(cfg.memoization, Memoization::PerTable);
        assert_eq!(cfg.many_has_many_pattern, "%s_x_%s");
        assert_eq!(cfg.inflector(), Inflector::CamelCase);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[structure]\ndatabase = \"shop\"\nuse_camel_case = false\nmemoization = \"global\"\nengine = \"MyISAM\""
        )
        .unwrap();

        let cfg = StructureConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.database, "shop");
        assert_eq!(cfg.memoization, Memoization::Global);
        assert_eq!(cfg.engine, "MyISAM");
        assert_eq!(cfg.charset, "utf8mb4");
        assert_eq!(cfg.inflector(), Inflector::SnakeCase);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = StructureConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(cfg.collation, "utf8mb4_unicode_ci");
    }
}
