//! Scoped suspension of `foreign_key_checks`

use crate::error::Result;
use crate::executor::{run_statement, SchemaExecutor};

const DISABLE: &str = "SET foreign_key_checks = 0";
const ENABLE: &str = "SET foreign_key_checks = 1";

/// Guard that turns foreign key checks off for the session and back on when dropped
///
/// `foreign_key_checks` is session state. Leaking the disabled state would silently skip FK
/// validation for every later statement on the connection, so the guard restores it on every
/// exit path, including early returns through `?`.
pub struct ForeignKeyChecksGuard<'a> {
    executor: &'a dyn SchemaExecutor,
}

impl<'a> ForeignKeyChecksGuard<'a> {
    /// Disable foreign key checks and create guard
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Query` if the `SET` statement fails.
    pub fn new(executor: &'a dyn SchemaExecutor) -> Result<Self> {
        run_statement(executor, DISABLE)?;
        Ok(Self { executor })
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &'a dyn SchemaExecutor {
        self.executor
    }

    /// Run `f` with checks enabled, then suspend them again
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or of the `SET` statements around it.
    pub fn with_checks_enabled<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        run_statement(self.executor, ENABLE)?;
        let result = f();
        let restored = run_statement(self.executor, DISABLE);
        let value = result?;
        restored?;
        Ok(value)
    }
}

impl<'a> Drop for ForeignKeyChecksGuard<'a> {
    fn drop(&mut self) {
        // Ignore errors during drop - we can't propagate them
        let _ = run_statement(self.executor, ENABLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructureError;
    use crate::mock::MockExecutor;

    #[test]
    fn test_guard_restores_checks_on_drop() {
        let executor = MockExecutor::new("shop");
        {
            let _guard = ForeignKeyChecksGuard::new(&executor).unwrap();
            assert_eq!(executor.statements(), vec![DISABLE.to_string()]);
        }
        assert_eq!(executor.statements(), vec![DISABLE.to_string(), ENABLE.to_string()]);
    }

    #[test]
    fn test_guard_restores_checks_on_error_path() {
        let executor = MockExecutor::new("shop");
        let run = || -> Result<()> {
            let _guard = ForeignKeyChecksGuard::new(&executor)?;
            Err(StructureError::query("ALTER TABLE x", "boom"))
        };
        assert!(run().is_err());
        assert_eq!(executor.statements().last().map(String::as_str), Some(ENABLE));
    }

    #[test]
    fn test_with_checks_enabled_wraps_closure() {
        let executor = MockExecutor::new("shop");
        executor.add_table(crate::mock::MockTable::new("t"));
        let guard = ForeignKeyChecksGuard::new(&executor).unwrap();
        guard
            .with_checks_enabled(|| {
                executor.execute("ALTER TABLE `t` ADD `x` int(11) NOT NULL", &[])?;
                Ok(())
            })
            .unwrap();
        drop(guard);

        assert_eq!(
            executor.statements(),
            vec![
                DISABLE.to_string(),
                ENABLE.to_string(),
                "ALTER TABLE `t` ADD `x` int(11) NOT NULL".to_string(),
                DISABLE.to_string(),
                ENABLE.to_string(),
            ]
        );
    }
}
