use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

use super::{Adapter, AdapterError, AdapterIdentity};
use crate::catalog::rows::{
    ConstraintRow, ForeignKeyRow, IndexRow, KeyColumnRow, ParameterRow, TriggerRow,
    build_constraints, build_primary_key, group_foreign_keys, group_indexes, group_parameters,
    group_triggers,
};
use crate::catalog::{
    self, CatalogError, CatalogReader, MappedDatabase, Scan, ScannedTrigger, yes_no,
};
use crate::model::{
    Column, Constraint, ConstraintKind, ForeignKey, Function, Index, IndexType, Parameter,
    ParameterMode, PrimaryKey, Procedure, ReferentialAction, Schema, Sequence, Table, TriggerEvent,
    TriggerGranularity, TriggerTiming, View,
};

type DecodeError = Box<dyn std::error::Error + Send + Sync>;

// ---------- adapter ----------

/// PostgreSQL over a single `tokio_postgres` connection.
#[derive(Default)]
pub struct PostgresAdapter {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl PostgresAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parse `conn` as a PostgreSQL URL or `key=value` string.
fn parse_config(conn: &str) -> Result<tokio_postgres::Config, AdapterError> {
    if conn.trim().is_empty() {
        return Err(AdapterError::InvalidConnectionString(
            "empty connection string".to_string(),
        ));
    }
    if conn.contains("@tcp(") {
        return Err(AdapterError::InvalidConnectionString(
            "MySQL-style DSN".to_string(),
        ));
    }
    if let Some((scheme, _)) = conn.split_once("://")
        && !matches!(scheme, "postgres" | "postgresql")
    {
        return Err(AdapterError::InvalidConnectionString(format!(
            "unsupported scheme: {scheme}"
        )));
    }
    conn.parse::<tokio_postgres::Config>()
        .map_err(|e| AdapterError::InvalidConnectionString(e.to_string()))
}

#[async_trait::async_trait]
impl Adapter for PostgresAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity::new("PostgreSQL", "v1")
    }

    fn is_compatible(&self, conn: &str) -> bool {
        parse_config(conn).is_ok()
    }

    async fn connect(&mut self, conn: &str) -> Result<(), AdapterError> {
        let config = parse_config(conn)?;
        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| AdapterError::Connect(Box::new(e)))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("PostgreSQL connection error: {e}");
            }
        });

        self.client = Some(client);
        self.connection = Some(handle);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        let client = self.client.take().ok_or(AdapterError::NotConnected)?;
        // Dropping the last client ends the connection task.
        drop(client);
        if let Some(handle) = self.connection.take() {
            handle.await.map_err(|e| AdapterError::Close(Box::new(e)))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    async fn map_database(&mut self) -> Result<MappedDatabase, AdapterError> {
        let client = match &self.client {
            Some(client) if !client.is_closed() => client,
            _ => return Err(AdapterError::NotConnected),
        };
        let mut reader = PostgresCatalog { client };
        catalog::map_database(&mut reader)
            .await
            .map_err(AdapterError::DatabaseName)
    }
}

// ---------- dialect ----------

/// `pg_constraint.confdeltype` / `confupdtype` codes.
fn referential_action(code: &str) -> ReferentialAction {
    match code {
        "r" => ReferentialAction::Restrict,
        "c" => ReferentialAction::Cascade,
        "n" => ReferentialAction::SetNull,
        "d" => ReferentialAction::SetDefault,
        _ => ReferentialAction::NoAction,
    }
}

/// `pg_constraint.contype` codes for table-level constraints.
fn constraint_kind(code: &str) -> Option<ConstraintKind> {
    match code {
        "c" => Some(ConstraintKind::Check),
        "u" => Some(ConstraintKind::Unique),
        "n" => Some(ConstraintKind::NotNull),
        _ => None,
    }
}

/// Function named by a trigger's action statement, without schema or quotes:
/// `EXECUTE FUNCTION audit.log_change()` -> `log_change`.
fn executed_function(statement: &str) -> Option<String> {
    let upper = statement.to_ascii_uppercase();
    let start = ["EXECUTE FUNCTION", "EXECUTE PROCEDURE"]
        .iter()
        .find_map(|kw| upper.find(kw).map(|i| i + kw.len()))?;
    let call = statement[start..].split('(').next()?.trim();
    let name = call.rsplit('.').next()?.trim().trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}

// ---------- catalog queries ----------

const CURRENT_DATABASE: &str = "SELECT current_database()::text";

const SCHEMAS: &str = "\
    SELECT n.nspname::text, pg_get_userbyid(n.nspowner)::text \
    FROM pg_namespace n \
    WHERE n.nspname NOT IN ('pg_catalog', 'information_schema') \
      AND n.nspname !~ '^pg_toast' \
      AND n.nspname !~ '^pg_temp' \
    ORDER BY n.nspname";

const TABLES: &str = "\
    SELECT table_name::text \
    FROM information_schema.tables \
    WHERE table_schema::text = $1 AND table_type = 'BASE TABLE' \
    ORDER BY table_name";

const COLUMNS: &str = "\
    SELECT column_name::text, data_type::text, is_nullable::text, column_default::text, \
           ordinal_position::int, character_maximum_length::int, \
           numeric_precision::int, numeric_scale::int \
    FROM information_schema.columns \
    WHERE table_schema::text = $1 AND table_name::text = $2 \
    ORDER BY ordinal_position";

const PRIMARY_KEY: &str = "\
    SELECT c.conname::text, a.attname::text \
    FROM pg_constraint c \
    JOIN pg_class t ON t.oid = c.conrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord) \
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
    WHERE c.contype = 'p' AND n.nspname = $1 AND t.relname = $2 \
    ORDER BY k.ord";

const INDEXES: &str = "\
    SELECT i.relname::text, am.amname::text, ix.indisunique, ix.indisprimary, a.attname::text \
    FROM pg_index ix \
    JOIN pg_class t ON t.oid = ix.indrelid \
    JOIN pg_class i ON i.oid = ix.indexrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    JOIN pg_am am ON am.oid = i.relam \
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
    WHERE n.nspname = $1 AND t.relname = $2 \
    ORDER BY i.relname, array_position(ix.indkey::int2[], a.attnum)";

const FOREIGN_KEYS: &str = "\
    SELECT c.conname::text, a.attname::text, rn.nspname::text, rt.relname::text, \
           ra.attname::text, c.confdeltype::text, c.confupdtype::text \
    FROM pg_constraint c \
    JOIN pg_class t ON t.oid = c.conrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    JOIN pg_class rt ON rt.oid = c.confrelid \
    JOIN pg_namespace rn ON rn.oid = rt.relnamespace \
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, refnum, ord) \
    JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum \
    JOIN pg_attribute ra ON ra.attrelid = c.confrelid AND ra.attnum = k.refnum \
    WHERE c.contype = 'f' AND n.nspname = $1 AND t.relname = $2 \
    ORDER BY c.conname, k.ord";

const CONSTRAINTS: &str = "\
    SELECT c.conname::text, c.contype::text, pg_get_constraintdef(c.oid), \
           COALESCE( \
             (SELECT array_agg(a.attname::text ORDER BY array_position(c.conkey, a.attnum)) \
              FROM pg_attribute a \
              WHERE a.attrelid = c.conrelid AND a.attnum = ANY(c.conkey)), \
             '{}') \
    FROM pg_constraint c \
    JOIN pg_class t ON t.oid = c.conrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    WHERE c.contype IN ('c', 'u', 'n') AND n.nspname = $1 AND t.relname = $2 \
    ORDER BY c.conname";

const VIEWS: &str = "\
    SELECT table_name::text, view_definition::text \
    FROM information_schema.views \
    WHERE table_schema::text = $1 \
    ORDER BY table_name";

const SEQUENCES: &str = "\
    SELECT sequencename::text, start_value, increment_by, min_value, max_value, cache_size, cycle \
    FROM pg_sequences \
    WHERE schemaname::text = $1 \
    ORDER BY sequencename";

const ROUTINES: &str = "\
    SELECT p.proname::text, p.proname::text || '_' || p.oid::text, \
           pg_get_functiondef(p.oid), pg_get_function_result(p.oid), l.lanname::text \
    FROM pg_proc p \
    JOIN pg_namespace n ON n.oid = p.pronamespace \
    JOIN pg_language l ON l.oid = p.prolang \
    WHERE n.nspname = $1 AND p.prokind::text = $2 \
    ORDER BY p.proname";

const PARAMETERS: &str = "\
    SELECT specific_name::text, COALESCE(parameter_name, '')::text, data_type::text, \
           parameter_mode::text \
    FROM information_schema.parameters \
    WHERE specific_schema::text = $1 \
    ORDER BY specific_name, ordinal_position";

const TRIGGERS: &str = "\
    SELECT trigger_name::text, action_timing::text, event_manipulation::text, \
           action_statement::text, action_orientation::text \
    FROM information_schema.triggers \
    WHERE event_object_schema::text = $1 AND event_object_table::text = $2 \
    ORDER BY trigger_name, event_manipulation";

// ---------- catalog reader ----------

struct PostgresCatalog<'a> {
    client: &'a Client,
}

impl PostgresCatalog<'_> {
    /// Run `sql` and decode each row; undecodable rows are skipped and reported.
    async fn query<T>(
        &self,
        scope: String,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        decode: impl Fn(&Row) -> Result<T, DecodeError> + Send,
    ) -> Scan<Vec<T>> {
        let rows = match self.client.query(sql, params).await {
            Ok(rows) => rows,
            Err(e) => return Scan::failed(CatalogError::query(scope, e)),
        };
        let mut scan = Scan::ok(Vec::with_capacity(rows.len()));
        for row in &rows {
            match decode(row) {
                Ok(value) => scan.value.push(value),
                Err(e) => scan.push_error(CatalogError::decode(scope.clone(), e)),
            }
        }
        scan
    }

    async fn routines(&self, schema: &str, kind: &str) -> Scan<Vec<RoutineRow>> {
        let label = if kind == "p" { "procedures" } else { "functions" };
        let mut scan = self
            .query(
                format!("{label} for {schema}"),
                ROUTINES,
                &[&schema, &kind],
                |row| {
                    Ok(RoutineRow {
                        name: row.try_get(0)?,
                        specific_name: row.try_get(1)?,
                        definition: row.try_get::<_, Option<String>>(2)?.unwrap_or_default(),
                        return_type: row.try_get::<_, Option<String>>(3)?.unwrap_or_default(),
                        language: row.try_get(4)?,
                        parameters: Vec::new(),
                    })
                },
            )
            .await;

        let params = self
            .query(
                format!("parameters for {schema}"),
                PARAMETERS,
                &[&schema],
                |row| {
                    let mode: Option<String> = row.try_get(3)?;
                    Ok(ParameterRow {
                        specific_name: row.try_get(0)?,
                        name: row.try_get(1)?,
                        data_type: row.try_get(2)?,
                        mode: mode
                            .as_deref()
                            .and_then(ParameterMode::parse)
                            .unwrap_or_default(),
                    })
                },
            )
            .await;
        scan.errors.extend(params.errors);

        let mut by_routine = group_parameters(params.value);
        for routine in &mut scan.value {
            routine.parameters = by_routine.remove(&routine.specific_name).unwrap_or_default();
        }
        scan
    }
}

struct RoutineRow {
    name: String,
    specific_name: String,
    definition: String,
    return_type: String,
    language: String,
    parameters: Vec<Parameter>,
}

#[async_trait::async_trait]
impl CatalogReader for PostgresCatalog<'_> {
    async fn current_database(&mut self) -> Result<String, CatalogError> {
        let row = self
            .client
            .query_one(CURRENT_DATABASE, &[])
            .await
            .map_err(|e| CatalogError::query("current database", e))?;
        row.try_get(0)
            .map_err(|e| CatalogError::decode("current database", e))
    }

    async fn schemas(&mut self) -> Scan<Vec<Schema>> {
        self.query("schemas".to_string(), SCHEMAS, &[], |row| {
            Ok(Schema::new(
                row.try_get::<_, String>(0)?,
                row.try_get::<_, Option<String>>(1)?.unwrap_or_default(),
            ))
        })
        .await
    }

    async fn tables(&mut self, schema: &str) -> Scan<Vec<Table>> {
        self.query(format!("tables for {schema}"), TABLES, &[&schema], |row| {
            Ok(Table::new(row.try_get::<_, String>(0)?))
        })
        .await
    }

    async fn columns(&mut self, schema: &str, relation: &str) -> Scan<Vec<Column>> {
        self.query(
            format!("columns for {schema}.{relation}"),
            COLUMNS,
            &[&schema, &relation],
            |row| {
                let nullable: String = row.try_get(2)?;
                let column_name: String = row.try_get(0)?;
                let data_type: String = row.try_get(1)?;
                Ok(Column::new(column_name, data_type, yes_no(&nullable))
                    .with_default_value(row.try_get(3)?)
                    .with_ordinal_position(row.try_get(4)?)
                    .with_char_max_length(row.try_get(5)?)
                    .with_numeric_precision(row.try_get(6)?)
                    .with_numeric_scale(row.try_get(7)?))
            },
        )
        .await
    }

    async fn primary_key(&mut self, schema: &str, table: &Table) -> Scan<Option<PrimaryKey>> {
        let name = table.name();
        self.query(
            format!("primary key for {schema}.{name}"),
            PRIMARY_KEY,
            &[&schema, &name],
            |row| {
                Ok(KeyColumnRow {
                    constraint_name: row.try_get(0)?,
                    column_name: row.try_get(1)?,
                })
            },
        )
        .await
        .map(|rows| build_primary_key(table, &rows))
    }

    async fn indexes(&mut self, schema: &str, table: &Table) -> Scan<Vec<Index>> {
        let name = table.name();
        self.query(
            format!("indexes for {schema}.{name}"),
            INDEXES,
            &[&schema, &name],
            |row| {
                let method: String = row.try_get(1)?;
                Ok(IndexRow {
                    index_name: row.try_get(0)?,
                    index_type: IndexType::from_catalog(&method),
                    is_unique: row.try_get(2)?,
                    is_primary: row.try_get(3)?,
                    column_name: row.try_get(4)?,
                })
            },
        )
        .await
        .map(|rows| group_indexes(table, &rows))
    }

    async fn foreign_keys(&mut self, schema: &str, table: &Table) -> Scan<Vec<ForeignKey>> {
        let name = table.name();
        self.query(
            format!("foreign keys for {schema}.{name}"),
            FOREIGN_KEYS,
            &[&schema, &name],
            |row| {
                let on_delete: String = row.try_get(5)?;
                let on_update: String = row.try_get(6)?;
                Ok(ForeignKeyRow {
                    constraint_name: row.try_get(0)?,
                    column_name: row.try_get(1)?,
                    referenced_schema: row.try_get(2)?,
                    referenced_table: row.try_get(3)?,
                    referenced_column: row.try_get(4)?,
                    on_delete: referential_action(&on_delete),
                    on_update: referential_action(&on_update),
                })
            },
        )
        .await
        .map(|rows| group_foreign_keys(table, &rows))
    }

    async fn constraints(&mut self, schema: &str, table: &Table) -> Scan<Vec<Constraint>> {
        let name = table.name();
        self.query(
            format!("constraints for {schema}.{name}"),
            CONSTRAINTS,
            &[&schema, &name],
            |row| {
                let code: String = row.try_get(1)?;
                let kind = constraint_kind(&code)
                    .ok_or_else(|| format!("unknown constraint type '{code}'"))?;
                let definition: Option<String> = row.try_get(2)?;
                Ok(ConstraintRow {
                    name: row.try_get(0)?,
                    kind,
                    check_expression: definition.filter(|_| kind == ConstraintKind::Check),
                    column_names: row.try_get(3)?,
                })
            },
        )
        .await
        .map(|rows| build_constraints(table, &rows))
    }

    async fn views(&mut self, schema: &str) -> Scan<Vec<View>> {
        self.query(format!("views for {schema}"), VIEWS, &[&schema], |row| {
            Ok(View::new(
                row.try_get::<_, String>(0)?,
                row.try_get::<_, Option<String>>(1)?.unwrap_or_default(),
            ))
        })
        .await
    }

    async fn sequences(&mut self, schema: &str) -> Scan<Vec<Sequence>> {
        self.query(format!("sequences for {schema}"), SEQUENCES, &[&schema], |row| {
            Ok(Sequence::new(
                row.try_get::<_, String>(0)?,
                row.try_get::<_, Option<i64>>(1)?.unwrap_or(1),
                row.try_get::<_, Option<i64>>(2)?.unwrap_or(1),
            )
            .with_bounds(
                row.try_get::<_, Option<i64>>(3)?.unwrap_or(1),
                row.try_get::<_, Option<i64>>(4)?.unwrap_or(i64::MAX),
            )
            .with_cache(row.try_get::<_, Option<i64>>(5)?.unwrap_or(1))
            .with_cycle(row.try_get::<_, Option<bool>>(6)?.unwrap_or(false)))
        })
        .await
    }

    async fn functions(&mut self, schema: &str) -> Scan<Vec<Function>> {
        self.routines(schema, "f").await.map(|rows| {
            rows.into_iter()
                .map(|r| {
                    let mut function = Function::new(r.name, r.definition)
                        .with_return_type(r.return_type)
                        .with_language(r.language);
                    for parameter in r.parameters {
                        function.add_parameter(parameter);
                    }
                    function
                })
                .collect()
        })
    }

    async fn procedures(&mut self, schema: &str) -> Scan<Vec<Procedure>> {
        self.routines(schema, "p").await.map(|rows| {
            rows.into_iter()
                .map(|r| {
                    let mut procedure =
                        Procedure::new(r.name, r.definition).with_language(r.language);
                    for parameter in r.parameters {
                        procedure.add_parameter(parameter);
                    }
                    procedure
                })
                .collect()
        })
    }

    async fn triggers(&mut self, schema: &str, table: &Table) -> Scan<Vec<ScannedTrigger>> {
        let name = table.name();
        self.query(
            format!("triggers for {schema}.{name}"),
            TRIGGERS,
            &[&schema, &name],
            |row| {
                let timing: String = row.try_get(1)?;
                let event: String = row.try_get(2)?;
                let definition: String = row.try_get(3)?;
                let orientation: String = row.try_get(4)?;
                Ok(TriggerRow {
                    name: row.try_get(0)?,
                    timing: TriggerTiming::parse(&timing)
                        .ok_or_else(|| format!("unknown trigger timing '{timing}'"))?,
                    event: TriggerEvent::parse(&event)
                        .ok_or_else(|| format!("unknown trigger event '{event}'"))?,
                    executes: executed_function(&definition),
                    definition,
                    for_each: TriggerGranularity::parse(&orientation).unwrap_or_default(),
                })
            },
        )
        .await
        .map(|rows| group_triggers(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_postgres_formats() {
        let adapter = PostgresAdapter::new();
        assert!(adapter.is_compatible("postgres://app:pw@localhost:5432/shop"));
        assert!(adapter.is_compatible("postgresql://localhost/shop?sslmode=disable"));
        assert!(adapter.is_compatible("host=localhost user=app dbname=shop"));
    }

    #[test]
    fn test_rejects_other_engines() {
        let adapter = PostgresAdapter::new();
        assert!(!adapter.is_compatible("mysql://root:pw@localhost:3306/shop"));
        assert!(!adapter.is_compatible("root:pw@tcp(localhost:3306)/shop"));
        assert!(!adapter.is_compatible(""));
        assert!(!adapter.is_compatible("definitely not a connection string"));
    }

    #[test]
    fn test_referential_action_codes() {
        assert_eq!(referential_action("a"), ReferentialAction::NoAction);
        assert_eq!(referential_action("r"), ReferentialAction::Restrict);
        assert_eq!(referential_action("c"), ReferentialAction::Cascade);
        assert_eq!(referential_action("n"), ReferentialAction::SetNull);
        assert_eq!(referential_action("d"), ReferentialAction::SetDefault);
    }

    #[test]
    fn test_constraint_kind_codes() {
        assert_eq!(constraint_kind("c"), Some(ConstraintKind::Check));
        assert_eq!(constraint_kind("u"), Some(ConstraintKind::Unique));
        assert_eq!(constraint_kind("n"), Some(ConstraintKind::NotNull));
        assert_eq!(constraint_kind("p"), None, "Primary keys are mapped separately");
    }

    #[test]
    fn test_executed_function() {
        assert_eq!(
            executed_function("EXECUTE FUNCTION audit_log()"),
            Some("audit_log".to_string())
        );
        assert_eq!(
            executed_function("EXECUTE PROCEDURE public.\"touch\"('x')"),
            Some("touch".to_string())
        );
        assert_eq!(executed_function("BEGIN END"), None);
    }

    #[tokio::test]
    async fn test_close_without_connection() {
        let mut adapter = PostgresAdapter::new();
        assert!(!adapter.is_connected());
        assert!(matches!(adapter.close().await, Err(AdapterError::NotConnected)));
        assert!(matches!(
            adapter.map_database().await,
            Err(AdapterError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_string_before_network() {
        let mut adapter = PostgresAdapter::new();
        let err = adapter.connect("mysql://root@localhost/shop").await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidConnectionString(_)));
        assert!(!adapter.is_connected());
    }
}
