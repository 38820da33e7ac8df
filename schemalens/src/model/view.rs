use serde::Serialize;

use super::Column;

#[derive(Debug, Clone, Serialize)]
pub struct View {
    name: String,
    definition: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    columns: Vec<Column>,
    #[serde(skip)]
    schema: Option<String>,
}

impl View {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            columns: Vec::new(),
            schema: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn add_column(&mut self, mut column: Column) {
        column.set_table(&self.name);
        self.columns.push(column);
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub(crate) fn set_schema(&mut self, schema: &str) {
        self.schema = Some(schema.to_string());
    }

    pub fn fully_qualified_name(&self) -> String {
        super::qualify(self.schema.as_deref(), &self.name)
    }
}
