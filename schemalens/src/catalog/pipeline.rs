use super::{CatalogError, CatalogReader};
use crate::model::Database;

/// Outcome of one mapping run: the (possibly partial) graph and every
/// non-fatal error hit while building it.
#[derive(Debug)]
pub struct MappedDatabase {
    pub database: Database,
    pub errors: Vec<CatalogError>,
}

/// Populate a fresh [`Database`] from `catalog`.
///
/// Stages run in dependency order, one schema or table at a time, and each
/// stage only attaches to objects earlier stages created. A failing unit is
/// recorded in `errors` and never stops the others. The only fatal failure is
/// resolving the current database name.
pub async fn map_database<C>(catalog: &mut C) -> Result<MappedDatabase, CatalogError>
where
    C: CatalogReader + ?Sized,
{
    let name = catalog.current_database().await?;
    tracing::debug!(database = %name, "Mapping catalog");

    let mut db = Database::new(name);
    let mut errors = Vec::new();

    map_schemas(catalog, &mut db, &mut errors).await;
    map_tables(catalog, &mut db, &mut errors).await;
    map_columns(catalog, &mut db, &mut errors).await;
    map_primary_keys(catalog, &mut db, &mut errors).await;
    map_indexes(catalog, &mut db, &mut errors).await;
    map_foreign_keys(catalog, &mut db, &mut errors).await;
    map_constraints(catalog, &mut db, &mut errors).await;
    map_views(catalog, &mut db, &mut errors).await;
    map_sequences(catalog, &mut db, &mut errors).await;
    map_functions(catalog, &mut db, &mut errors).await;
    map_procedures(catalog, &mut db, &mut errors).await;
    map_triggers(catalog, &mut db, &mut errors).await;

    tracing::info!(
        database = %db.name(),
        schemas = db.schemas().len(),
        tables = db.table_names().len(),
        errors = errors.len(),
        "Catalog mapped"
    );

    Ok(MappedDatabase {
        database: db,
        errors,
    })
}

fn schema_names(db: &Database) -> Vec<String> {
    db.schemas().keys().cloned().collect()
}

// ---------- schema-scoped stages ----------

async fn map_schemas<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for schema in catalog.schemas().await.drain_into(errors) {
        db.add_schema(schema);
    }
    tracing::debug!(count = db.schemas().len(), "Schemas mapped");
}

async fn map_tables<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for name in schema_names(db) {
        let tables = catalog.tables(&name).await.drain_into(errors);
        tracing::debug!(schema = %name, count = tables.len(), "Tables mapped");
        if let Some(schema) = db.schema_mut(&name) {
            for table in tables {
                schema.add_table(table);
            }
        }
    }
}

async fn map_views<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for name in schema_names(db) {
        let views = catalog.views(&name).await.drain_into(errors);
        tracing::debug!(schema = %name, count = views.len(), "Views mapped");
        for mut view in views {
            for column in catalog.columns(&name, view.name()).await.drain_into(errors) {
                view.add_column(column);
            }
            if let Some(schema) = db.schema_mut(&name) {
                schema.add_view(view);
            }
        }
    }
}

async fn map_sequences<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for name in schema_names(db) {
        let sequences = catalog.sequences(&name).await.drain_into(errors);
        if let Some(schema) = db.schema_mut(&name) {
            for sequence in sequences {
                schema.add_sequence(sequence);
            }
        }
    }
}

async fn map_functions<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for name in schema_names(db) {
        let functions = catalog.functions(&name).await.drain_into(errors);
        tracing::debug!(schema = %name, count = functions.len(), "Functions mapped");
        if let Some(schema) = db.schema_mut(&name) {
            for function in functions {
                schema.add_function(function);
            }
        }
    }
}

async fn map_procedures<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for name in schema_names(db) {
        let procedures = catalog.procedures(&name).await.drain_into(errors);
        if let Some(schema) = db.schema_mut(&name) {
            for procedure in procedures {
                schema.add_procedure(procedure);
            }
        }
    }
}

// ---------- table-scoped stages ----------

async fn map_columns<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for (schema, table) in db.table_names() {
        let columns = catalog.columns(&schema, &table).await.drain_into(errors);
        if let Some(t) = db.table_mut(&schema, &table) {
            for column in columns {
                t.add_column(column);
            }
        }
    }
}

async fn map_primary_keys<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for (schema, table) in db.table_names() {
        let Some(current) = db.table(&schema, &table) else {
            continue;
        };
        let primary_key = catalog.primary_key(&schema, current).await.drain_into(errors);
        if let (Some(pk), Some(t)) = (primary_key, db.table_mut(&schema, &table)) {
            t.set_primary_key(pk);
        }
    }
}

async fn map_indexes<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for (schema, table) in db.table_names() {
        let Some(current) = db.table(&schema, &table) else {
            continue;
        };
        let indexes = catalog.indexes(&schema, current).await.drain_into(errors);
        if let Some(t) = db.table_mut(&schema, &table) {
            for index in indexes {
                t.add_index(index);
            }
        }
    }
}

async fn map_foreign_keys<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for (schema, table) in db.table_names() {
        let Some(current) = db.table(&schema, &table) else {
            continue;
        };
        let foreign_keys = catalog.foreign_keys(&schema, current).await.drain_into(errors);
        if let Some(t) = db.table_mut(&schema, &table) {
            for fk in foreign_keys {
                t.add_foreign_key(fk);
            }
        }
    }
}

async fn map_constraints<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for (schema, table) in db.table_names() {
        let Some(current) = db.table(&schema, &table) else {
            continue;
        };
        let constraints = catalog.constraints(&schema, current).await.drain_into(errors);
        if let Some(t) = db.table_mut(&schema, &table) {
            for constraint in constraints {
                t.add_constraint(constraint);
            }
        }
    }
}

/// Runs after functions are mapped so a trigger can be linked to the
/// function it executes when that function lives in the same schema.
async fn map_triggers<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    db: &mut Database,
    errors: &mut Vec<CatalogError>,
) {
    for (schema, table) in db.table_names() {
        let Some(current) = db.table(&schema, &table) else {
            continue;
        };
        let scanned = catalog.triggers(&schema, current).await.drain_into(errors);

        let mut triggers = Vec::with_capacity(scanned.len());
        for item in scanned {
            let mut trigger = item.trigger;
            if let Some(function) = item.executes {
                let mapped = db
                    .schema(&schema)
                    .is_some_and(|s| s.function(&function).is_some());
                if mapped {
                    trigger.set_function(function);
                }
            }
            triggers.push(trigger);
        }

        if let Some(t) = db.table_mut(&schema, &table) {
            for trigger in triggers {
                t.add_trigger(trigger);
            }
        }
    }
}
