use crate::model::{
    Column, Constraint, ForeignKey, Function, Index, PrimaryKey, Procedure, Schema, Sequence,
    Table, Trigger, View,
};

pub mod pipeline;
pub mod rows;

pub use pipeline::{MappedDatabase, map_database};

// ---------- errors ----------

/// A non-fatal failure while scanning one unit of the catalog.
///
/// `scope` names the unit, e.g. `"indexes for public.orders"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("query failed for {scope}: {message}")]
    Query { scope: String, message: String },
    #[error("failed to decode row for {scope}: {message}")]
    Decode { scope: String, message: String },
}

impl CatalogError {
    pub fn query(scope: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CatalogError::Query {
            scope: scope.into(),
            message: err.to_string(),
        }
    }

    pub fn decode(scope: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CatalogError::Decode {
            scope: scope.into(),
            message: err.to_string(),
        }
    }

    pub fn scope(&self) -> &str {
        match self {
            CatalogError::Query { scope, .. } | CatalogError::Decode { scope, .. } => scope,
        }
    }
}

// ---------- scan results ----------

/// Result of one catalog scan: whatever could be read plus the errors hit on the way.
#[derive(Debug, Default)]
pub struct Scan<T> {
    pub value: T,
    pub errors: Vec<CatalogError>,
}

impl<T: Default> Scan<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            errors: Vec::new(),
        }
    }

    /// The whole unit failed; nothing is attached.
    pub fn failed(error: CatalogError) -> Self {
        Self {
            value: T::default(),
            errors: vec![error],
        }
    }

    pub fn push_error(&mut self, error: CatalogError) {
        self.errors.push(error);
    }
}

impl<T> Scan<T> {
    /// Move the errors into `sink` and hand back the value.
    pub fn drain_into(self, sink: &mut Vec<CatalogError>) -> T {
        sink.extend(self.errors);
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Scan<U> {
        Scan {
            value: f(self.value),
            errors: self.errors,
        }
    }
}

/// A trigger plus the function its definition executes, if the engine reports one.
#[derive(Debug, Clone)]
pub struct ScannedTrigger {
    pub trigger: Trigger,
    pub executes: Option<String>,
}

// ---------- trait ----------

/// Engine-specific catalog queries behind the shared mapping pipeline.
///
/// Every method scans exactly one unit (the database, one schema, or one
/// table) and never fails outright except `current_database`.
#[async_trait::async_trait]
pub trait CatalogReader: Send {
    async fn current_database(&mut self) -> Result<String, CatalogError>;

    async fn schemas(&mut self) -> Scan<Vec<Schema>>;

    async fn tables(&mut self, schema: &str) -> Scan<Vec<Table>>;

    /// Columns of a table or view, ordered by ordinal position.
    async fn columns(&mut self, schema: &str, relation: &str) -> Scan<Vec<Column>>;

    async fn primary_key(&mut self, schema: &str, table: &Table) -> Scan<Option<PrimaryKey>>;

    async fn indexes(&mut self, schema: &str, table: &Table) -> Scan<Vec<Index>>;

    async fn foreign_keys(&mut self, schema: &str, table: &Table) -> Scan<Vec<ForeignKey>>;

    async fn constraints(&mut self, schema: &str, table: &Table) -> Scan<Vec<Constraint>>;

    async fn views(&mut self, schema: &str) -> Scan<Vec<View>>;

    /// Engines without sequences keep the default.
    async fn sequences(&mut self, _schema: &str) -> Scan<Vec<Sequence>> {
        Scan::ok(Vec::new())
    }

    async fn functions(&mut self, schema: &str) -> Scan<Vec<Function>>;

    async fn procedures(&mut self, schema: &str) -> Scan<Vec<Procedure>>;

    async fn triggers(&mut self, schema: &str, table: &Table) -> Scan<Vec<ScannedTrigger>>;
}

// ---------- dialect helpers ----------

/// Catalog yes/no flags (`information_schema` uses `YES`/`NO`).
pub fn yes_no(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no() {
        assert!(yes_no("YES"));
        assert!(yes_no("yes"));
        assert!(!yes_no("NO"));
        assert!(!yes_no(""));
    }

    #[test]
    fn test_scan_failed_is_empty_with_one_error() {
        let scan: Scan<Vec<Table>> = Scan::failed(CatalogError::query("tables for public", "boom"));
        let mut sink = Vec::new();
        let tables = scan.drain_into(&mut sink);

        assert!(tables.is_empty());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].scope(), "tables for public");
        assert_eq!(sink[0].to_string(), "query failed for tables for public: boom");
    }
}
