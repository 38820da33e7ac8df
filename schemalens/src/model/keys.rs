use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{Column, column_names};

// ---------- primary key ----------

#[derive(Debug, Clone, Serialize)]
pub struct PrimaryKey {
    name: String,
    /// Ordered as the catalog reports key positions.
    #[serde(serialize_with = "column_names")]
    columns: Vec<Arc<Column>>,
    #[serde(skip)]
    table: Option<String>,
}

impl PrimaryKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            table: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn add_column(&mut self, column: Arc<Column>) {
        self.columns.push(column);
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }
}

// ---------- referential actions ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ReferentialAction {
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ReferentialAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse the SQL-standard rule spelling (`information_schema` style).
    /// Underscore spellings such as `SET_NULL` are accepted too.
    pub fn from_rule(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "NO ACTION" => Some(ReferentialAction::NoAction),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------- foreign key ----------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    name: String,
    /// Owning-side columns; shared with the owning table.
    #[serde(serialize_with = "column_names")]
    columns: Vec<Arc<Column>>,
    referenced_schema: String,
    referenced_table: String,
    /// Name-only placeholders, see `Column::placeholder`.
    #[serde(serialize_with = "column_names")]
    referenced_columns: Vec<Arc<Column>>,
    on_delete: ReferentialAction,
    on_update: ReferentialAction,
    #[serde(skip)]
    table: Option<String>,
}

impl ForeignKey {
    pub fn new(name: impl Into<String>, referenced_table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            referenced_schema: String::new(),
            referenced_table: referenced_table.into(),
            referenced_columns: Vec::new(),
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
            table: None,
        }
    }

    pub fn with_referenced_schema(mut self, schema: impl Into<String>) -> Self {
        self.referenced_schema = schema.into();
        self
    }

    pub fn with_actions(
        mut self,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    ) -> Self {
        self.on_delete = on_delete;
        self.on_update = on_update;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn add_column(&mut self, column: Arc<Column>) {
        self.columns.push(column);
    }

    pub fn referenced_schema(&self) -> &str {
        &self.referenced_schema
    }

    pub fn referenced_table(&self) -> &str {
        &self.referenced_table
    }

    pub fn referenced_columns(&self) -> &[Arc<Column>] {
        &self.referenced_columns
    }

    /// Append a placeholder for the referenced column `name`.
    pub fn add_referenced_column(&mut self, name: impl Into<String>) {
        self.referenced_columns
            .push(Arc::new(Column::placeholder(name)));
    }

    pub fn on_delete(&self) -> ReferentialAction {
        self.on_delete
    }

    pub fn on_update(&self) -> ReferentialAction {
        self.on_update
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rule_accepts_standard_spellings() {
        assert_eq!(ReferentialAction::from_rule("CASCADE"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::from_rule("set null"), Some(ReferentialAction::SetNull));
        assert_eq!(
            ReferentialAction::from_rule("SET_DEFAULT"),
            Some(ReferentialAction::SetDefault)
        );
        assert_eq!(ReferentialAction::from_rule(" NO ACTION "), Some(ReferentialAction::NoAction));
        assert_eq!(ReferentialAction::from_rule("RESTRICT"), Some(ReferentialAction::Restrict));
        assert_eq!(ReferentialAction::from_rule("DROP"), None);
    }

    #[test]
    fn test_new_foreign_key_defaults_to_no_action() {
        let fk = ForeignKey::new("fk", "users");
        assert_eq!(fk.on_delete(), ReferentialAction::NoAction);
        assert_eq!(fk.on_update(), ReferentialAction::NoAction);
        assert_eq!(fk.referenced_schema(), "");
    }

    #[test]
    fn test_referenced_columns_are_fresh_placeholders() {
        let mut fk = ForeignKey::new("fk", "users");
        fk.add_referenced_column("id");
        fk.add_referenced_column("id");

        let cols = fk.referenced_columns();
        assert_eq!(cols.len(), 2);
        assert!(
            !Arc::ptr_eq(&cols[0], &cols[1]),
            "Every referenced column must be a separate placeholder"
        );
        assert_eq!(cols[0].data_type(), "");
    }
}
