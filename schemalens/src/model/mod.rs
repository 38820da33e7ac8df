//! Engine-agnostic schema graph.
//!
//! Parents own their children by value. Every `add_*` call stamps the child
//! with its owner's name, which is what `fully_qualified_name` walks.
//! Table columns are shared as `Arc<Column>` so keys, indexes and constraints
//! point at the very column the table holds.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde::ser::SerializeSeq;

mod column;
mod constraint;
mod database;
mod index;
mod keys;
mod routine;
mod schema;
mod sequence;
mod table;
mod trigger;
mod view;

pub use column::Column;
pub use constraint::{Constraint, ConstraintKind};
pub use database::Database;
pub use index::{Index, IndexType};
pub use keys::{ForeignKey, PrimaryKey, ReferentialAction};
pub use routine::{Function, Parameter, ParameterMode, Procedure};
pub use schema::Schema;
pub use sequence::Sequence;
pub use table::Table;
pub use trigger::{Trigger, TriggerEvent, TriggerGranularity, TriggerTiming};
pub use view::View;

fn qualify(owner: Option<&str>, name: &str) -> String {
    match owner {
        Some(owner) => format!("{owner}.{name}"),
        None => name.to_string(),
    }
}

/// Serialize a column list as its names.
fn column_names<S: Serializer>(columns: &[Arc<Column>], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(columns.len()))?;
    for column in columns {
        seq.serialize_element(column.name())?;
    }
    seq.end()
}

/// Serialize a name-keyed map as a list of its values, in key order.
fn map_values<V: Serialize, S: Serializer>(
    map: &BTreeMap<String, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.values())
}

/// Serialize table columns in ordinal order rather than name order.
fn ordered_columns<S: Serializer>(
    columns: &BTreeMap<String, Arc<Column>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut ordered: Vec<&Arc<Column>> = columns.values().collect();
    ordered.sort_by_key(|c| c.ordinal_position());
    serializer.collect_seq(ordered)
}
