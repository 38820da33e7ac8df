use std::collections::BTreeMap;

use serde::Serialize;

use super::{Function, Procedure, Sequence, Table, View};

#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    name: String,
    owner: String,
    #[serde(serialize_with = "super::map_values")]
    tables: BTreeMap<String, Table>,
    #[serde(serialize_with = "super::map_values")]
    views: BTreeMap<String, View>,
    #[serde(serialize_with = "super::map_values")]
    functions: BTreeMap<String, Function>,
    #[serde(serialize_with = "super::map_values")]
    procedures: BTreeMap<String, Procedure>,
    #[serde(serialize_with = "super::map_values")]
    sequences: BTreeMap<String, Sequence>,
    #[serde(skip)]
    database: Option<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
            functions: BTreeMap::new(),
            procedures: BTreeMap::new(),
            sequences: BTreeMap::new(),
            database: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub(crate) fn set_database(&mut self, database: &str) {
        self.database = Some(database.to_string());
    }

    /// `database.schema` when attached to a database.
    pub fn fully_qualified_name(&self) -> String {
        super::qualify(self.database.as_deref(), &self.name)
    }

    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn add_table(&mut self, mut table: Table) {
        table.set_schema(&self.name);
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn views(&self) -> &BTreeMap<String, View> {
        &self.views
    }

    pub fn add_view(&mut self, mut view: View) {
        view.set_schema(&self.name);
        self.views.insert(view.name().to_string(), view);
    }

    pub fn functions(&self) -> &BTreeMap<String, Function> {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn add_function(&mut self, mut function: Function) {
        function.set_schema(&self.name);
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn procedures(&self) -> &BTreeMap<String, Procedure> {
        &self.procedures
    }

    pub fn add_procedure(&mut self, mut procedure: Procedure) {
        procedure.set_schema(&self.name);
        self.procedures
            .insert(procedure.name().to_string(), procedure);
    }

    pub fn sequences(&self) -> &BTreeMap<String, Sequence> {
        &self.sequences
    }

    pub fn add_sequence(&mut self, mut sequence: Sequence) {
        sequence.set_schema(&self.name);
        self.sequences.insert(sequence.name().to_string(), sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sets_schema_back_reference() {
        let mut schema = Schema::new("public", "postgres");
        schema.add_table(Table::new("users"));
        schema.add_view(View::new("active_users", "SELECT 1"));
        schema.add_function(Function::new("now_utc", "..."));
        schema.add_procedure(Procedure::new("cleanup", "..."));
        schema.add_sequence(Sequence::new("users_id_seq", 1, 1));

        assert_eq!(schema.table("users").unwrap().schema(), Some("public"));
        assert_eq!(schema.views()["active_users"].fully_qualified_name(), "public.active_users");
        assert_eq!(schema.functions()["now_utc"].fully_qualified_name(), "public.now_utc");
        assert_eq!(schema.procedures()["cleanup"].schema(), Some("public"));
        assert_eq!(
            schema.sequences()["users_id_seq"].fully_qualified_name(),
            "public.users_id_seq"
        );
        assert_eq!(
            schema.table("users").unwrap().fully_qualified_name(),
            "public.users"
        );
    }

    #[test]
    fn test_add_table_last_write_wins() {
        let mut schema = Schema::new("public", "");
        schema.add_table(Table::new("users"));
        let mut replacement = Table::new("users");
        replacement.add_column(crate::model::Column::new("id", "int", false));
        schema.add_table(replacement);

        assert_eq!(schema.tables().len(), 1);
        assert_eq!(schema.table("users").unwrap().columns().len(), 1);
    }
}
