//! Migration digest comparator.

use crate::compile::SchemaDigest;

/// What the storage collaborator must do when opening a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDecision {
    /// The stored digest equals the compiled one.
    NoMigrationNeeded,
    /// No digest was stored, or it differs: drop and recreate every table.
    FullRecreate,
}

impl MigrationDecision {
    /// Returns `true` for [`MigrationDecision::FullRecreate`].
    #[must_use]
    pub const fn requires_migration(self) -> bool {
        matches!(self, Self::FullRecreate)
    }
}

/// Compares the persisted digest against the freshly compiled one.
///
/// Plain string equality; the DDL itself is never inspected.
#[must_use]
pub fn compare(stored: Option<&str>, current: &SchemaDigest) -> MigrationDecision {
    match stored {
        Some(stored) if current.matches(stored) => MigrationDecision::NoMigrationNeeded,
        _ => MigrationDecision::FullRecreate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::TableDdl;

    fn digest(sql: &str) -> SchemaDigest {
        SchemaDigest::compute(&[TableDdl {
            table: "T".to_string(),
            create_table: sql.to_string(),
            create_indexes: vec![],
        }])
    }

    #[test]
    fn test_no_prior_digest() {
        let current = digest("CREATE TABLE T (a)");
        assert_eq!(compare(None, &current), MigrationDecision::FullRecreate);
    }

    #[test]
    fn test_equal_digest() {
        let current = digest("CREATE TABLE T (a)");
        let stored = current.to_string();
        assert_eq!(compare(Some(&stored), &current), MigrationDecision::NoMigrationNeeded);
        assert!(!compare(Some(&stored), &current).requires_migration());
    }

    #[test]
    fn test_different_digest() {
        let old = digest("CREATE TABLE T (a)").to_string();
        let current = digest("CREATE TABLE T (a, b)");
        assert_eq!(compare(Some(&old), &current), MigrationDecision::FullRecreate);
    }

    #[test]
    fn test_comparison_is_exact() {
        let current = digest("CREATE TABLE T (a)");
        let lower = current.as_str().to_lowercase();
        assert_eq!(compare(Some(&lower), &current), MigrationDecision::FullRecreate);
        assert_eq!(compare(Some(""), &current), MigrationDecision::FullRecreate);
    }
}
