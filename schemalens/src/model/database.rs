use std::collections::BTreeMap;

use serde::Serialize;

use super::{Schema, Table};

/// Root of a mapped catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Database {
    name: String,
    #[serde(serialize_with = "super::map_values")]
    schemas: BTreeMap<String, Schema>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.get_mut(name)
    }

    pub fn add_schema(&mut self, mut schema: Schema) {
        schema.set_database(&self.name);
        self.schemas.insert(schema.name().to_string(), schema);
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&Table> {
        self.schemas.get(schema).and_then(|s| s.table(table))
    }

    pub fn table_mut(&mut self, schema: &str, table: &str) -> Option<&mut Table> {
        self.schemas
            .get_mut(schema)
            .and_then(|s| s.table_mut(table))
    }

    /// `(schema, table)` pairs in name order.
    pub fn table_names(&self) -> Vec<(String, String)> {
        self.schemas
            .values()
            .flat_map(|s| {
                s.tables()
                    .keys()
                    .map(|t| (s.name().to_string(), t.clone()))
            })
            .collect()
    }
}
