//! Per-column builder capabilities.

use bitflags::bitflags;

use super::StorageType;

bitflags! {
    /// The comparison and ordering helpers a column exposes.
    ///
    /// Resolved once, during extraction, into a closed set. The derive macro
    /// turns every set flag into a capability trait implementation, so the
    /// generated surface never tests bits at run time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Helpers: u16 {
        /// `column = ?`
        const EQ          = 1;
        /// `column <> ?`
        const NOT_EQ      = 1 << 1;
        /// `column IS NULL`
        const IS_NULL     = 1 << 2;
        /// `column IS NOT NULL`
        const IS_NOT_NULL = 1 << 3;
        /// `column IN (...)`
        const IN          = 1 << 4;
        /// `column NOT IN (...)`
        const NOT_IN      = 1 << 5;
        /// `column < ?`
        const LT          = 1 << 6;
        /// `column <= ?`
        const LE          = 1 << 7;
        /// `column > ?`
        const GT          = 1 << 8;
        /// `column >= ?`
        const GE          = 1 << 9;
        /// `column BETWEEN ? AND ?`
        const BETWEEN     = 1 << 10;
        /// `ORDER BY column ASC`
        const ORDER_ASC   = 1 << 11;
        /// `ORDER BY column DESC`
        const ORDER_DESC  = 1 << 12;

        /// Every condition helper.
        const CONDITIONS = Self::EQ.bits()
            | Self::NOT_EQ.bits()
            | Self::IS_NULL.bits()
            | Self::IS_NOT_NULL.bits()
            | Self::IN.bits()
            | Self::NOT_IN.bits()
            | Self::LT.bits()
            | Self::LE.bits()
            | Self::GT.bits()
            | Self::GE.bits()
            | Self::BETWEEN.bits();
        /// Both ordering helpers.
        const ORDERS = Self::ORDER_ASC.bits() | Self::ORDER_DESC.bits();
        /// Everything.
        const ALL = Self::CONDITIONS.bits() | Self::ORDERS.bits();
    }
}

/// Name of the declaration-only "infer from type" helper setting.
pub const AUTO: &str = "auto";

impl Helpers {
    /// Comparison helpers that make no sense for opaque bytes.
    const RANGE: Self = Self::LT
        .union(Self::LE)
        .union(Self::GT)
        .union(Self::GE)
        .union(Self::BETWEEN);

    /// Looks up a helper by its declaration name.
    ///
    /// Accepts the single-operation names (`eq`, `not_eq`, `is_null`,
    /// `is_not_null`, `in_list`, `not_in_list`, `lt`, `le`, `gt`, `ge`,
    /// `between`, `order_asc`, `order_desc`) and the groups `none`,
    /// `conditions`, `orders` and `all`. Names are case-insensitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let flag = match name.trim().to_ascii_lowercase().as_str() {
            "none" => Self::empty(),
            "eq" => Self::EQ,
            "not_eq" => Self::NOT_EQ,
            "is_null" => Self::IS_NULL,
            "is_not_null" => Self::IS_NOT_NULL,
            "in" | "in_list" => Self::IN,
            "not_in" | "not_in_list" => Self::NOT_IN,
            "lt" => Self::LT,
            "le" => Self::LE,
            "gt" => Self::GT,
            "ge" => Self::GE,
            "between" => Self::BETWEEN,
            "order_asc" => Self::ORDER_ASC,
            "order_desc" => Self::ORDER_DESC,
            "conditions" => Self::CONDITIONS,
            "orders" => Self::ORDERS,
            "all" => Self::ALL,
            _ => return None,
        };
        Some(flag)
    }

    /// The set an `auto` declaration resolves to.
    ///
    /// Blobs get no range comparisons and no ordering; null checks are only
    /// offered on nullable columns.
    #[must_use]
    pub const fn automatic(storage_type: StorageType, nullable: bool) -> Self {
        let mut helpers = match storage_type {
            StorageType::Integer | StorageType::Real | StorageType::Text => Self::ALL,
            StorageType::Blob => Self::CONDITIONS.difference(Self::RANGE),
        };
        if !nullable {
            helpers = helpers.difference(Self::IS_NULL.union(Self::IS_NOT_NULL));
        }
        helpers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_disjoint_and_complete() {
        assert!(Helpers::CONDITIONS.intersection(Helpers::ORDERS).is_empty());
        assert_eq!(Helpers::ALL, Helpers::all());
        assert_eq!(Helpers::CONDITIONS.iter().count(), 11);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Helpers::parse("EQ"), Some(Helpers::EQ));
        assert_eq!(Helpers::parse("in_list"), Some(Helpers::IN));
        assert_eq!(Helpers::parse("orders"), Some(Helpers::ORDERS));
        assert_eq!(Helpers::parse("none"), Some(Helpers::empty()));
        assert_eq!(Helpers::parse(" Not_In_List "), Some(Helpers::NOT_IN));
        assert_eq!(Helpers::parse("like"), None);
    }

    #[test]
    fn test_automatic_for_blob_has_no_ordering() {
        let helpers = Helpers::automatic(StorageType::Blob, true);
        assert!(helpers.contains(Helpers::EQ | Helpers::IN | Helpers::IS_NULL));
        assert!(!helpers.intersects(Helpers::ORDERS));
        assert!(!helpers.contains(Helpers::LT));
        assert!(!helpers.contains(Helpers::BETWEEN));
    }

    #[test]
    fn test_automatic_drops_null_checks_for_required_columns() {
        let helpers = Helpers::automatic(StorageType::Text, false);
        assert!(!helpers.contains(Helpers::IS_NULL));
        assert!(!helpers.contains(Helpers::IS_NOT_NULL));
        assert!(helpers.contains(Helpers::ORDER_DESC | Helpers::BETWEEN));
        assert_eq!(Helpers::automatic(StorageType::Integer, true), Helpers::ALL);
    }
}
