use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{Column, column_names};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintKind {
    #[serde(rename = "CHECK")]
    Check,
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "NOT NULL")]
    NotNull,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Check => "CHECK",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::NotNull => "NOT NULL",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table-level CHECK, UNIQUE or NOT NULL constraint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    name: String,
    #[serde(rename = "type")]
    kind: ConstraintKind,
    #[serde(serialize_with = "column_names")]
    columns: Vec<Arc<Column>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_expression: Option<String>,
    #[serde(skip)]
    table: Option<String>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: Vec::new(),
            check_expression: None,
            table: None,
        }
    }

    pub fn with_check_expression(mut self, expression: impl Into<String>) -> Self {
        self.check_expression = Some(expression.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn add_column(&mut self, column: Arc<Column>) {
        self.columns.push(column);
    }

    pub fn check_expression(&self) -> Option<&str> {
        self.check_expression.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }
}
