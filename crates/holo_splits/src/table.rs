//! Table identity used to key caches and label planning failures.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

/// Schema-qualified table name, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    schema: String,
    table: String,
}

impl TableKey {
    pub fn new(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.trim().to_ascii_lowercase(),
            table: table.trim().to_ascii_lowercase(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Case-insensitive match against a configured schema and table name.
    pub fn matches(&self, schema: &str, table: &str) -> bool {
        self.schema.eq_ignore_ascii_case(schema.trim())
            && self.table.eq_ignore_ascii_case(table.trim())
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

impl FromStr for TableKey {
    type Err = anyhow::Error;

    /// Parses `schema.table`; exactly two non-empty parts are required.
    fn from_str(raw: &str) -> Result<Self> {
        let parts = raw.trim().split('.').collect::<Vec<_>>();
        if parts.len() != 2 || parts.iter().any(|part| part.trim().is_empty()) {
            return Err(anyhow!("table name `{raw}` must have the form schema.table"));
        }
        Ok(Self::new(parts[0], parts[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_two_parts() {
        let key: TableKey = "TPCH.Orders".parse().expect("parse");
        assert_eq!(key, TableKey::new("tpch", "orders"));
        assert!("orders".parse::<TableKey>().is_err());
        assert!("a.b.c".parse::<TableKey>().is_err());
        assert!("a.".parse::<TableKey>().is_err());
    }

    #[test]
    fn matches_is_case_insensitive() {
        let key = TableKey::new("tpch", "orders");
        assert!(key.matches("TPCH", "Orders"));
        assert!(!key.matches("tpch", "lineitem"));
    }
}
