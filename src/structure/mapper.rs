//! Mapper contracts and table naming
//!
//! A mapper owns one entity's storage. [`TableMapper::create_table`] populates the table
//! declaration; the registry names the table from [`TableMapper::entity_name`] using the
//! configured [`Inflector`].

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StructureError};
use crate::executor::SchemaExecutor;
use crate::structure::table::Table;
use crate::structure::view::View;
use crate::structure::Structure;

/// Case convention for physical table names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inflector {
    /// `UserRoleMapper` → `userRole`
    #[default]
    CamelCase,
    /// `UserRoleMapper` → `user_role`
    SnakeCase,
}

impl FromStr for Inflector {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "camelcase" | "camel" => Ok(Inflector::CamelCase),
            "snakecase" | "snake" => Ok(Inflector::SnakeCase),
            _ => Err(StructureError::Declaration(format!("Unknown inflector '{s}'"))),
        }
    }
}

impl fmt::Display for Inflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inflector::CamelCase => write!(f, "camel_case"),
            Inflector::SnakeCase => write!(f, "snake_case"),
        }
    }
}

/// Physical table name for an entity
///
/// Any path before the last `::` is ignored and a `Mapper` suffix is stripped before the
/// inflector applies; `prefix` is prepended unchanged.
///
/// ```
/// use tablewright::structure::mapper::{table_name, Inflector};
///
/// assert_eq!(table_name("UserRoleMapper", Inflector::CamelCase, ""), "userRole");
/// assert_eq!(table_name("app::UserRoleMapper", Inflector::SnakeCase, "crm_"), "crm_user_role");
/// ```
pub fn table_name(entity: &str, inflector: Inflector, prefix: &str) -> String {
    let short = entity.rsplit("::").next().unwrap_or(entity);
    let base = short.strip_suffix("Mapper").unwrap_or(short);
    let name = match inflector {
        Inflector::CamelCase => lower_first(base),
        Inflector::SnakeCase => underscore(base),
    };
    format!("{prefix}{name}")
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
        previous = Some(ch);
    }
    out
}

/// Storage conventions handed to the ORM mapping layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    pub inflector: Inflector,
    pub storage_name: String,
    pub primary_key: Vec<String>,
}

/// Declares one table
///
/// ```
/// use tablewright::structure::mapper::TableMapper;
/// use tablewright::{Result, Structure, Table};
///
/// struct UserMapper;
///
/// impl TableMapper for UserMapper {
///     fn entity_name(&self) -> &str {
///         "UserMapper"
///     }
///
///     fn create_table(&self, table: &mut Table, _structure: &Structure) -> Result<()> {
///         table.add_primary_key("id").int().set_auto_increment();
///         table.add_column("email").varchar(255).set_unique();
///         Ok(())
///     }
/// }
/// ```
pub trait TableMapper: 'static {
    /// Logical entity name, usually the mapper's type name
    fn entity_name(&self) -> &str;

    fn table_prefix(&self) -> &str {
        ""
    }

    /// Populate the declaration; other tables are reachable through `structure`
    fn create_table(&self, table: &mut Table, structure: &Structure) -> Result<()>;

    /// Called once after the table was newly created by the registry
    fn on_table_created(&self, _executor: &dyn SchemaExecutor) -> Result<()> {
        Ok(())
    }
}

/// Declares one view
pub trait ViewMapper: 'static {
    fn entity_name(&self) -> &str;

    fn table_prefix(&self) -> &str {
        ""
    }

    fn create_view(&self, view: &mut View, structure: &Structure) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_inflection() {
        assert_eq!(table_name("UserMapper", Inflector::CamelCase, ""), "user");
        assert_eq!(table_name("BlogPostMapper", Inflector::CamelCase, ""), "blogPost");
        assert_eq!(table_name("BlogPostMapper", Inflector::SnakeCase, ""), "blog_post");
        assert_eq!(table_name("Log2FaMapper", Inflector::SnakeCase, "x_"), "x_log2_fa");
        assert_eq!(table_name("HTMLPage", Inflector::SnakeCase, ""), "htmlpage");
    }

    #[test]
    fn test_inflector_parse() {
        assert_eq!("camelCase".parse::<Inflector>().unwrap(), Inflector::CamelCase);
        assert_eq!("snake_case".parse::<Inflector>().unwrap(), Inflector::SnakeCase);
        assert!(matches!(
            "kebab".parse::<Inflector>(),
            Err(StructureError::Declaration(_))
        ));
    }
}
