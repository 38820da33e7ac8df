use serde::Serialize;

/// A table or view column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    name: String,
    data_type: String,
    nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
    ordinal_position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    char_max_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    numeric_precision: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    numeric_scale: Option<i32>,
    /// Owning table name, set by `Table::add_column` / `View::add_column`.
    #[serde(skip)]
    table: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            ordinal_position: 0,
            char_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            table: None,
        }
    }

    /// Name-only stand-in for a foreign key's referenced column.
    ///
    /// Placeholders are never linked to the referenced table's real columns.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, "", false)
    }

    pub fn with_default_value(mut self, value: Option<String>) -> Self {
        self.default_value = value;
        self
    }

    pub fn with_ordinal_position(mut self, position: i32) -> Self {
        self.ordinal_position = position;
        self
    }

    pub fn with_char_max_length(mut self, length: Option<i32>) -> Self {
        self.char_max_length = length;
        self
    }

    pub fn with_numeric_precision(mut self, precision: Option<i32>) -> Self {
        self.numeric_precision = precision;
        self
    }

    pub fn with_numeric_scale(mut self, scale: Option<i32>) -> Self {
        self.numeric_scale = scale;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn ordinal_position(&self) -> i32 {
        self.ordinal_position
    }

    pub fn char_max_length(&self) -> Option<i32> {
        self.char_max_length
    }

    pub fn numeric_precision(&self) -> Option<i32> {
        self.numeric_precision
    }

    pub fn numeric_scale(&self) -> Option<i32> {
        self.numeric_scale
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }

    /// `table.column` when the column is attached, otherwise the bare name.
    pub fn fully_qualified_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{table}.{}", self.name),
            None => self.name.clone(),
        }
    }
}
