//! Schema digest.

use core::fmt;

use sha2::{Digest, Sha256};

use super::TableDdl;

/// SHA-256 of the canonical DDL of a whole schema, as 64 uppercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaDigest(String);

impl SchemaDigest {
    /// Hashes the DDL of every table.
    ///
    /// Tables are visited in byte-lexicographic order of their names, so the
    /// order of `tables` does not matter. Each statement is fed to the hasher
    /// followed by `";\n"`.
    #[must_use]
    pub fn compute(tables: &[TableDdl]) -> Self {
        let mut ordered: Vec<&TableDdl> = tables.iter().collect();
        ordered.sort_by(|a, b| a.table.as_bytes().cmp(b.table.as_bytes()));

        let mut hasher = Sha256::new();
        for statement in ordered.iter().flat_map(|t| t.statements()) {
            hasher.update(statement.as_bytes());
            hasher.update(b";\n");
        }
        Self(hex::encode_upper(hasher.finalize()))
    }

    /// The hex text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `stored` is this digest.
    #[must_use]
    pub fn matches(&self, stored: &str) -> bool {
        self.0 == stored
    }
}

impl fmt::Display for SchemaDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SchemaDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
