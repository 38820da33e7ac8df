use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::{Column, Constraint, ForeignKey, Index, PrimaryKey, Trigger};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    name: String,
    #[serde(serialize_with = "super::ordered_columns")]
    columns: BTreeMap<String, Arc<Column>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_key: Option<PrimaryKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    foreign_keys: Vec<ForeignKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    indexes: Vec<Index>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    triggers: Vec<Trigger>,
    #[serde(skip)]
    schema: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            triggers: Vec::new(),
            schema: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub(crate) fn set_schema(&mut self, schema: &str) {
        self.schema = Some(schema.to_string());
    }

    /// `schema.table` when attached to a schema, otherwise the bare name.
    pub fn fully_qualified_name(&self) -> String {
        super::qualify(self.schema.as_deref(), &self.name)
    }

    // ---------- columns ----------

    pub fn columns(&self) -> &BTreeMap<String, Arc<Column>> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Arc<Column>> {
        self.columns.get(name)
    }

    /// Columns sorted by ordinal position.
    pub fn columns_in_order(&self) -> Vec<&Arc<Column>> {
        let mut columns: Vec<&Arc<Column>> = self.columns.values().collect();
        columns.sort_by_key(|c| c.ordinal_position());
        columns
    }

    /// Attach a column, replacing any column with the same name.
    /// Returns the shared handle that keys, indexes and constraints reference.
    pub fn add_column(&mut self, mut column: Column) -> Arc<Column> {
        column.set_table(&self.name);
        let column = Arc::new(column);
        self.columns
            .insert(column.name().to_string(), Arc::clone(&column));
        column
    }

    // ---------- keys ----------

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn set_primary_key(&mut self, mut primary_key: PrimaryKey) {
        primary_key.set_table(&self.name);
        self.primary_key = Some(primary_key);
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn add_foreign_key(&mut self, mut foreign_key: ForeignKey) {
        foreign_key.set_table(&self.name);
        self.foreign_keys.push(foreign_key);
    }

    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns().iter().any(|c| c.name() == column))
    }

    pub fn is_foreign_key_column(&self, column: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.columns().iter().any(|c| c.name() == column))
    }

    // ---------- indexes, constraints, triggers ----------

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn add_index(&mut self, mut index: Index) {
        index.set_table(&self.name);
        self.indexes.push(index);
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn add_constraint(&mut self, mut constraint: Constraint) {
        constraint.set_table(&self.name);
        self.constraints.push(constraint);
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut [Trigger] {
        &mut self.triggers
    }

    pub fn add_trigger(&mut self, mut trigger: Trigger) {
        trigger.set_table(&self.name);
        self.triggers.push(trigger);
    }
}
