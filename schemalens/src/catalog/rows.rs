//! Flat catalog rows and the grouping that turns them into model objects.
//!
//! Engines decode their result sets into these rows (normalizing dialect
//! codes on the way) and share the grouping logic below. Grouping keeps the
//! order in which the catalog first reported each name, and column names that
//! do not resolve against the table are skipped.

use std::collections::HashMap;
use std::sync::Arc;

use super::ScannedTrigger;
use crate::model::{
    Constraint, ConstraintKind, ForeignKey, Index, IndexType, Parameter, ParameterMode,
    PrimaryKey, ReferentialAction, Table, Trigger, TriggerEvent, TriggerGranularity,
    TriggerTiming,
};

// ---------- row types ----------

/// One column of a named key (primary key or unique constraint).
#[derive(Debug, Clone)]
pub struct KeyColumnRow {
    pub constraint_name: String,
    pub column_name: String,
}

#[derive(Debug, Clone)]
pub struct IndexRow {
    pub index_name: String,
    pub index_type: IndexType,
    pub is_unique: bool,
    pub is_primary: bool,
    pub column_name: String,
}

/// One owning/referenced column pair of a foreign key.
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

#[derive(Debug, Clone)]
pub struct ConstraintRow {
    pub name: String,
    pub kind: ConstraintKind,
    pub check_expression: Option<String>,
    pub column_names: Vec<String>,
}

/// One event of a trigger; engines report a row per event.
#[derive(Debug, Clone)]
pub struct TriggerRow {
    pub name: String,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    pub definition: String,
    pub for_each: TriggerGranularity,
    pub executes: Option<String>,
}

/// A routine parameter keyed by the routine's engine-unique specific name.
#[derive(Debug, Clone)]
pub struct ParameterRow {
    pub specific_name: String,
    pub name: String,
    pub data_type: String,
    pub mode: ParameterMode,
}

// ---------- grouping ----------

fn group_ordered<R, T>(
    rows: &[R],
    key: impl Fn(&R) -> &str,
    mut start: impl FnMut(&R) -> T,
    mut extend: impl FnMut(&mut T, &R),
) -> Vec<T> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<T> = Vec::new();
    for row in rows {
        let idx = *positions.entry(key(row)).or_insert_with(|| {
            groups.push(start(row));
            groups.len() - 1
        });
        extend(&mut groups[idx], row);
    }
    groups
}

/// Build the table's primary key; `None` when the catalog reported no rows.
pub fn build_primary_key(table: &Table, rows: &[KeyColumnRow]) -> Option<PrimaryKey> {
    let first = rows.first()?;
    let mut pk = PrimaryKey::new(first.constraint_name.clone());
    for row in rows {
        if let Some(column) = table.column(&row.column_name) {
            pk.add_column(Arc::clone(column));
        }
    }
    Some(pk)
}

pub fn group_unique_constraints(table: &Table, rows: &[KeyColumnRow]) -> Vec<Constraint> {
    group_ordered(
        rows,
        |r| r.constraint_name.as_str(),
        |r| Constraint::new(r.constraint_name.clone(), ConstraintKind::Unique),
        |c, r| {
            if let Some(column) = table.column(&r.column_name) {
                c.add_column(Arc::clone(column));
            }
        },
    )
}

pub fn group_indexes(table: &Table, rows: &[IndexRow]) -> Vec<Index> {
    group_ordered(
        rows,
        |r| r.index_name.as_str(),
        |r| {
            Index::new(r.index_name.clone(), r.is_unique)
                .with_primary(r.is_primary)
                .with_index_type(r.index_type.clone())
        },
        |idx, r| {
            if let Some(column) = table.column(&r.column_name) {
                idx.add_column(Arc::clone(column));
            }
        },
    )
}

/// Referenced columns always become placeholders. Only the owning side is
/// resolved, so an unknown owning column leaves the referenced list longer.
pub fn group_foreign_keys(table: &Table, rows: &[ForeignKeyRow]) -> Vec<ForeignKey> {
    group_ordered(
        rows,
        |r| r.constraint_name.as_str(),
        |r| {
            ForeignKey::new(r.constraint_name.clone(), r.referenced_table.clone())
                .with_referenced_schema(r.referenced_schema.clone())
                .with_actions(r.on_delete, r.on_update)
        },
        |fk, r| {
            if let Some(column) = table.column(&r.column_name) {
                fk.add_column(Arc::clone(column));
            }
            fk.add_referenced_column(r.referenced_column.clone());
        },
    )
}

pub fn build_constraints(table: &Table, rows: &[ConstraintRow]) -> Vec<Constraint> {
    rows.iter()
        .map(|row| {
            let mut constraint = Constraint::new(row.name.clone(), row.kind);
            if let Some(expr) = &row.check_expression {
                constraint = constraint.with_check_expression(expr.clone());
            }
            for name in &row.column_names {
                if let Some(column) = table.column(name) {
                    constraint.add_column(Arc::clone(column));
                }
            }
            constraint
        })
        .collect()
}

pub fn group_triggers(rows: &[TriggerRow]) -> Vec<ScannedTrigger> {
    group_ordered(
        rows,
        |r| r.name.as_str(),
        |r| ScannedTrigger {
            trigger: Trigger::new(r.name.clone(), r.definition.clone(), r.timing)
                .with_for_each(r.for_each),
            executes: r.executes.clone(),
        },
        |t, r| t.trigger.add_event(r.event),
    )
}

pub fn group_parameters(rows: Vec<ParameterRow>) -> HashMap<String, Vec<Parameter>> {
    let mut grouped: HashMap<String, Vec<Parameter>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.specific_name)
            .or_default()
            .push(Parameter::new(row.name, row.data_type, row.mode));
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn orders() -> Table {
        let mut table = Table::new("orders");
        table.add_column(Column::new("id", "integer", false).with_ordinal_position(1));
        table.add_column(Column::new("user_id", "integer", false).with_ordinal_position(2));
        table.add_column(Column::new("sku", "text", false).with_ordinal_position(3));
        table
    }

    fn key(name: &str, column: &str) -> KeyColumnRow {
        KeyColumnRow {
            constraint_name: name.to_string(),
            column_name: column.to_string(),
        }
    }

    fn index_row(name: &str, column: &str, unique: bool) -> IndexRow {
        IndexRow {
            index_name: name.to_string(),
            index_type: IndexType::BTree,
            is_unique: unique,
            is_primary: false,
            column_name: column.to_string(),
        }
    }

    #[test]
    fn test_primary_key_keeps_catalog_order_and_identity() {
        let table = orders();
        let pk = build_primary_key(&table, &[key("orders_pkey", "sku"), key("orders_pkey", "id")])
            .expect("rows should produce a key");

        let names: Vec<&str> = pk.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["sku", "id"], "Catalog order, not table order");
        assert!(Arc::ptr_eq(&pk.columns()[1], table.column("id").unwrap()));
    }

    #[test]
    fn test_primary_key_none_without_rows() {
        assert!(build_primary_key(&orders(), &[]).is_none());
    }

    #[test]
    fn test_primary_key_skips_unknown_columns() {
        let pk = build_primary_key(&orders(), &[key("pk", "ghost"), key("pk", "id")]).unwrap();
        assert_eq!(pk.columns().len(), 1);
    }

    #[test]
    fn test_group_indexes_by_name_in_first_seen_order() {
        let table = orders();
        let rows = vec![
            index_row("idx_user_sku", "user_id", false),
            index_row("uq_sku", "sku", true),
            index_row("idx_user_sku", "sku", false),
        ];
        let indexes = group_indexes(&table, &rows);

        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name(), "idx_user_sku");
        let cols: Vec<&str> = indexes[0].columns().iter().map(|c| c.name()).collect();
        assert_eq!(cols, vec!["user_id", "sku"]);
        assert!(indexes[1].is_unique());
    }

    fn fk_row(column: &str, referenced: &str) -> ForeignKeyRow {
        ForeignKeyRow {
            constraint_name: "fk_orders_user".to_string(),
            column_name: column.to_string(),
            referenced_schema: "public".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: referenced.to_string(),
            on_delete: ReferentialAction::Cascade,
            on_update: ReferentialAction::NoAction,
        }
    }

    #[test]
    fn test_group_foreign_keys_uses_placeholders() {
        let table = orders();
        let rows = vec![fk_row("user_id", "id")];
        let fks = group_foreign_keys(&table, &rows);

        assert_eq!(fks.len(), 1);
        let fk = &fks[0];
        assert_eq!(fk.referenced_table(), "users");
        assert_eq!(fk.on_delete(), ReferentialAction::Cascade);
        assert!(Arc::ptr_eq(&fk.columns()[0], table.column("user_id").unwrap()));
        let referenced = &fk.referenced_columns()[0];
        assert_eq!(referenced.name(), "id");
        assert_eq!(referenced.data_type(), "", "Placeholder carries only a name");
        assert!(referenced.table().is_none());
    }

    #[test]
    fn test_foreign_key_keeps_referenced_column_when_owner_unknown() {
        let table = orders();
        let fks = group_foreign_keys(&table, &[fk_row("not_visible", "id")]);

        assert_eq!(fks.len(), 1);
        assert!(fks[0].columns().is_empty(), "Unknown owning column is skipped");
        let referenced: Vec<&str> = fks[0].referenced_columns().iter().map(|c| c.name()).collect();
        assert_eq!(referenced, vec!["id"], "Referenced placeholder is still built");
    }

    #[test]
    fn test_unique_constraints_group_columns() {
        let table = orders();
        let constraints = group_unique_constraints(
            &table,
            &[key("uq_user_sku", "user_id"), key("uq_user_sku", "sku")],
        );
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].kind(), ConstraintKind::Unique);
        assert_eq!(constraints[0].columns().len(), 2);
    }

    #[test]
    fn test_build_constraints_keeps_check_expression() {
        let table = orders();
        let constraints = build_constraints(
            &table,
            &[ConstraintRow {
                name: "ck_sku".to_string(),
                kind: ConstraintKind::Check,
                check_expression: Some("(length(sku) > 0)".to_string()),
                column_names: vec!["sku".to_string()],
            }],
        );
        assert_eq!(constraints[0].check_expression(), Some("(length(sku) > 0)"));
        assert!(Arc::ptr_eq(&constraints[0].columns()[0], table.column("sku").unwrap()));
    }

    #[test]
    fn test_group_triggers_accumulates_events() {
        let row = |event| TriggerRow {
            name: "audit_orders".to_string(),
            timing: TriggerTiming::After,
            event,
            definition: "EXECUTE FUNCTION audit()".to_string(),
            for_each: TriggerGranularity::Row,
            executes: Some("audit".to_string()),
        };
        let triggers = group_triggers(&[row(TriggerEvent::Insert), row(TriggerEvent::Update)]);

        assert_eq!(triggers.len(), 1);
        assert_eq!(
            triggers[0].trigger.events(),
            &[TriggerEvent::Insert, TriggerEvent::Update]
        );
        assert_eq!(triggers[0].executes.as_deref(), Some("audit"));
    }

    #[test]
    fn test_group_parameters_by_specific_name() {
        let row = |specific: &str, name: &str| ParameterRow {
            specific_name: specific.to_string(),
            name: name.to_string(),
            data_type: "integer".to_string(),
            mode: ParameterMode::In,
        };
        let grouped = group_parameters(vec![row("f_1", "a"), row("g_2", "x"), row("f_1", "b")]);

        let names: Vec<&str> = grouped["f_1"].iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(grouped["g_2"].len(), 1);
    }
}
