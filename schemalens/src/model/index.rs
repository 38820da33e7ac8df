use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::{Column, column_names};

/// Access method of an index, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    #[default]
    BTree,
    Hash,
    Gist,
    Gin,
    Brin,
    SpGist,
    FullText,
    Spatial,
    Other(String),
}

impl IndexType {
    /// Normalize an engine's access-method name (`btree`, `BTREE`, `FULLTEXT`, ...).
    pub fn from_catalog(method: &str) -> Self {
        let lower = method.trim().to_ascii_lowercase();
        match lower.as_str() {
            "btree" => IndexType::BTree,
            "hash" => IndexType::Hash,
            "gist" => IndexType::Gist,
            "gin" => IndexType::Gin,
            "brin" => IndexType::Brin,
            "spgist" => IndexType::SpGist,
            "fulltext" => IndexType::FullText,
            "spatial" | "rtree" => IndexType::Spatial,
            _ => IndexType::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IndexType::BTree => "btree",
            IndexType::Hash => "hash",
            IndexType::Gist => "gist",
            IndexType::Gin => "gin",
            IndexType::Brin => "brin",
            IndexType::SpGist => "spgist",
            IndexType::FullText => "fulltext",
            IndexType::Spatial => "spatial",
            IndexType::Other(name) => name,
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IndexType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    name: String,
    #[serde(serialize_with = "column_names")]
    columns: Vec<Arc<Column>>,
    is_unique: bool,
    is_primary: bool,
    index_type: IndexType,
    #[serde(skip)]
    table: Option<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, is_unique: bool) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            is_unique,
            is_primary: false,
            index_type: IndexType::BTree,
            table: None,
        }
    }

    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn with_index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
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

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn index_type(&self) -> &IndexType {
        &self.index_type
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }
}
