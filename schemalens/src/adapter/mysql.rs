//! MySQL / MariaDB adapter.
//!
//! A MySQL "schema" is a database, so only the connection's current database
//! is mapped, as a single schema with an empty owner.

use std::collections::HashSet;
use std::str::FromStr;

use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlRow, MySqlSslMode};
use sqlx::query::Query;
use sqlx::{Connection, MySql, MySqlConnection, Row};

use super::{Adapter, AdapterError, AdapterIdentity};
use crate::catalog::rows::{
    ConstraintRow, ForeignKeyRow, IndexRow, KeyColumnRow, ParameterRow, TriggerRow,
    build_constraints, build_primary_key, group_foreign_keys, group_indexes, group_parameters,
    group_triggers, group_unique_constraints,
};
use crate::catalog::{
    self, CatalogError, CatalogReader, MappedDatabase, Scan, ScannedTrigger, yes_no,
};
use crate::model::{
    Column, Constraint, ConstraintKind, ForeignKey, Function, Index, IndexType, Parameter,
    ParameterMode, PrimaryKey, Procedure, ReferentialAction, Schema, Table, TriggerEvent,
    TriggerGranularity, TriggerTiming, View,
};

type DecodeError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_PORT: u16 = 3306;

// ---------- adapter ----------

#[derive(Default)]
pub struct MySqlAdapter {
    connection: Option<MySqlConnection>,
}

impl MySqlAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parse a `mysql://` / `mariadb://` URL or a Go-style DSN.
fn parse_options(conn: &str) -> Result<MySqlConnectOptions, AdapterError> {
    let conn = conn.trim();
    if conn.is_empty() {
        return Err(AdapterError::InvalidConnectionString(
            "empty connection string".to_string(),
        ));
    }
    match conn.split_once("://") {
        Some(("mysql", rest)) | Some(("mariadb", rest)) => {
            MySqlConnectOptions::from_str(&format!("mysql://{rest}"))
                .map_err(|e| AdapterError::InvalidConnectionString(e.to_string()))
        }
        Some((scheme, _)) => Err(AdapterError::InvalidConnectionString(format!(
            "unsupported scheme: {scheme}"
        ))),
        None => parse_dsn(conn),
    }
}

/// `[user[:password]@][tcp(host[:port])|unix(path)]/dbname[?param=value&...]`
fn parse_dsn(dsn: &str) -> Result<MySqlConnectOptions, AdapterError> {
    let invalid = |msg: &str| AdapterError::InvalidConnectionString(format!("invalid DSN: {msg}"));

    let (path, params) = dsn.split_once('?').unwrap_or((dsn, ""));
    let slash = path
        .rfind('/')
        .ok_or_else(|| invalid("missing the slash separating the database name"))?;
    let (head, database) = (&path[..slash], &path[slash + 1..]);
    if database.chars().any(char::is_whitespace) {
        return Err(invalid("database name contains whitespace"));
    }

    let (userinfo, address) = match head.rfind('@') {
        Some(at) => (Some(&head[..at]), &head[at + 1..]),
        None => (None, head),
    };

    let mut options = MySqlConnectOptions::new();

    if let Some(userinfo) = userinfo {
        let (user, password) = userinfo.split_once(':').unwrap_or((userinfo, ""));
        options = options.username(user);
        if !password.is_empty() {
            options = options.password(password);
        }
    }

    if !address.is_empty() {
        let open = address
            .find('(')
            .ok_or_else(|| invalid("address must be protocol(address)"))?;
        if !address.ends_with(')') {
            return Err(invalid("unterminated address"));
        }
        let protocol = &address[..open];
        let addr = &address[open + 1..address.len() - 1];
        match protocol {
            "tcp" => {
                let (host, port) = match addr.rsplit_once(':') {
                    Some((host, port)) => (
                        host,
                        port.parse::<u16>().map_err(|_| invalid("invalid port"))?,
                    ),
                    None => (addr, DEFAULT_PORT),
                };
                if !host.is_empty() {
                    options = options.host(host);
                }
                options = options.port(port);
            }
            "unix" => options = options.socket(addr),
            other => return Err(invalid(&format!("unknown protocol '{other}'"))),
        }
    }

    if !database.is_empty() {
        options = options.database(database);
    }

    for pair in params.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| invalid("parameter without value"))?;
        match key {
            "charset" => options = options.charset(value),
            "tls" => {
                let mode = match value {
                    "true" => MySqlSslMode::VerifyIdentity,
                    "skip-verify" => MySqlSslMode::Required,
                    "preferred" => MySqlSslMode::Preferred,
                    _ => MySqlSslMode::Disabled,
                };
                options = options.ssl_mode(mode);
            }
            _ => tracing::debug!(parameter = %key, "Ignoring DSN parameter"),
        }
    }

    Ok(options)
}

#[async_trait::async_trait]
impl Adapter for MySqlAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity::new("MySQL", "v1")
    }

    fn is_compatible(&self, conn: &str) -> bool {
        parse_options(conn).is_ok()
    }

    async fn connect(&mut self, conn: &str) -> Result<(), AdapterError> {
        let options = parse_options(conn)?;
        let connection = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| AdapterError::Connect(Box::new(e)))?;
        self.connection = Some(connection);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        let connection = self.connection.take().ok_or(AdapterError::NotConnected)?;
        connection
            .close()
            .await
            .map_err(|e| AdapterError::Close(Box::new(e)))
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn map_database(&mut self) -> Result<MappedDatabase, AdapterError> {
        let conn = self.connection.as_mut().ok_or(AdapterError::NotConnected)?;
        let mut reader = MySqlCatalog { conn };
        catalog::map_database(&mut reader)
            .await
            .map_err(AdapterError::DatabaseName)
    }
}

// ---------- dialect ----------

/// `information_schema` lengths are unsigned 64-bit; LONGTEXT overflows i32.
fn clamp_i32(value: Option<i64>) -> Option<i32> {
    value.map(|v| v.clamp(0, i64::from(i32::MAX)) as i32)
}

/// Table columns named as identifiers in a CHECK clause, in ordinal order.
fn check_clause_columns(clause: &str, table: &Table) -> Vec<String> {
    let tokens: HashSet<&str> = clause
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|t| !t.is_empty())
        .collect();
    table
        .columns_in_order()
        .into_iter()
        .filter(|c| tokens.contains(c.name()))
        .map(|c| c.name().to_string())
        .collect()
}

/// MySQL keeps NOT NULL on the column; surface one constraint per column.
fn not_null_constraints(table: &Table) -> Vec<Constraint> {
    let rows: Vec<ConstraintRow> = table
        .columns_in_order()
        .into_iter()
        .filter(|c| !c.is_nullable())
        .map(|c| ConstraintRow {
            name: format!("{}_{}_not_null", table.name(), c.name()),
            kind: ConstraintKind::NotNull,
            check_expression: None,
            column_names: vec![c.name().to_string()],
        })
        .collect();
    build_constraints(table, &rows)
}

/// CHECK, then UNIQUE, then NOT NULL from column nullability. A failed
/// sub-scan keeps its errors and the others still attach.
fn combine_constraints(
    table: &Table,
    checks: Scan<Vec<ConstraintRow>>,
    unique: Scan<Vec<KeyColumnRow>>,
) -> Scan<Vec<Constraint>> {
    let mut scan = checks.map(|rows| build_constraints(table, &rows));
    scan.errors.extend(unique.errors);
    scan.value.extend(group_unique_constraints(table, &unique.value));
    scan.value.extend(not_null_constraints(table));
    scan
}

// ---------- catalog queries ----------

const CURRENT_DATABASE: &str = "SELECT CAST(DATABASE() AS CHAR)";

const TABLES: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR)
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
"#;

const COLUMNS: &str = r#"
    SELECT
        CAST(COLUMN_NAME AS CHAR),
        CAST(DATA_TYPE AS CHAR),
        CAST(IS_NULLABLE AS CHAR),
        CAST(COLUMN_DEFAULT AS CHAR),
        CAST(ORDINAL_POSITION AS SIGNED),
        CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED),
        CAST(NUMERIC_PRECISION AS SIGNED),
        CAST(NUMERIC_SCALE AS SIGNED)
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const PRIMARY_KEY: &str = r#"
    SELECT CAST(CONSTRAINT_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR)
    FROM information_schema.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
    ORDER BY ORDINAL_POSITION
"#;

const INDEXES: &str = r#"
    SELECT
        CAST(INDEX_NAME AS CHAR),
        CAST(INDEX_TYPE AS CHAR),
        CAST(NON_UNIQUE AS SIGNED),
        CAST(COLUMN_NAME AS CHAR)
    FROM information_schema.STATISTICS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY INDEX_NAME, SEQ_IN_INDEX
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT
        CAST(kcu.CONSTRAINT_NAME AS CHAR),
        CAST(kcu.COLUMN_NAME AS CHAR),
        CAST(kcu.REFERENCED_TABLE_SCHEMA AS CHAR),
        CAST(kcu.REFERENCED_TABLE_NAME AS CHAR),
        CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR),
        CAST(rc.DELETE_RULE AS CHAR),
        CAST(rc.UPDATE_RULE AS CHAR)
    FROM information_schema.KEY_COLUMN_USAGE kcu
    JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
        ON kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
        AND kcu.TABLE_SCHEMA = rc.CONSTRAINT_SCHEMA
        AND kcu.TABLE_NAME = rc.TABLE_NAME
    WHERE kcu.TABLE_SCHEMA = ?
        AND kcu.TABLE_NAME = ?
        AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
    ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

const CHECK_CONSTRAINTS: &str = r#"
    SELECT CAST(cc.CONSTRAINT_NAME AS CHAR), CAST(cc.CHECK_CLAUSE AS CHAR)
    FROM information_schema.CHECK_CONSTRAINTS cc
    JOIN information_schema.TABLE_CONSTRAINTS tc
        ON cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
        AND cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
    WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ? AND tc.CONSTRAINT_TYPE = 'CHECK'
    ORDER BY cc.CONSTRAINT_NAME
"#;

const UNIQUE_CONSTRAINTS: &str = r#"
    SELECT CAST(tc.CONSTRAINT_NAME AS CHAR), CAST(kcu.COLUMN_NAME AS CHAR)
    FROM information_schema.TABLE_CONSTRAINTS tc
    JOIN information_schema.KEY_COLUMN_USAGE kcu
        ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
        AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA
        AND tc.TABLE_NAME = kcu.TABLE_NAME
    WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ? AND tc.CONSTRAINT_TYPE = 'UNIQUE'
    ORDER BY tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

const VIEWS: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR), CAST(VIEW_DEFINITION AS CHAR)
    FROM information_schema.VIEWS
    WHERE TABLE_SCHEMA = ?
    ORDER BY TABLE_NAME
"#;

const ROUTINES: &str = r#"
    SELECT
        CAST(ROUTINE_NAME AS CHAR),
        CAST(SPECIFIC_NAME AS CHAR),
        CAST(ROUTINE_DEFINITION AS CHAR),
        CAST(DTD_IDENTIFIER AS CHAR)
    FROM information_schema.ROUTINES
    WHERE ROUTINE_SCHEMA = ? AND ROUTINE_TYPE = ?
    ORDER BY ROUTINE_NAME
"#;

/// Position 0 is a function's return value, not a parameter.
const PARAMETERS: &str = r#"
    SELECT
        CAST(SPECIFIC_NAME AS CHAR),
        CAST(PARAMETER_NAME AS CHAR),
        CAST(DTD_IDENTIFIER AS CHAR),
        CAST(PARAMETER_MODE AS CHAR)
    FROM information_schema.PARAMETERS
    WHERE SPECIFIC_SCHEMA = ? AND ROUTINE_TYPE = ? AND ORDINAL_POSITION > 0
    ORDER BY SPECIFIC_NAME, ORDINAL_POSITION
"#;

const TRIGGERS: &str = r#"
    SELECT
        CAST(TRIGGER_NAME AS CHAR),
        CAST(ACTION_TIMING AS CHAR),
        CAST(EVENT_MANIPULATION AS CHAR),
        CAST(ACTION_STATEMENT AS CHAR),
        CAST(ACTION_ORIENTATION AS CHAR)
    FROM information_schema.TRIGGERS
    WHERE EVENT_OBJECT_SCHEMA = ? AND EVENT_OBJECT_TABLE = ?
    ORDER BY TRIGGER_NAME, EVENT_MANIPULATION
"#;

// ---------- catalog reader ----------

struct MySqlCatalog<'a> {
    conn: &'a mut MySqlConnection,
}

struct RoutineRow {
    name: String,
    definition: String,
    return_type: String,
    parameters: Vec<Parameter>,
}

impl MySqlCatalog<'_> {
    /// Run `query` and decode each row; undecodable rows are skipped and reported.
    async fn fetch<T>(
        &mut self,
        scope: String,
        query: Query<'_, MySql, MySqlArguments>,
        decode: impl Fn(&MySqlRow) -> Result<T, DecodeError> + Send,
    ) -> Scan<Vec<T>> {
        let rows = match query.fetch_all(&mut *self.conn).await {
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

    async fn routines(&mut self, schema: &str, routine_type: &str) -> Scan<Vec<RoutineRow>> {
        let label = routine_type.to_ascii_lowercase();
        let mut scan = self
            .fetch(
                format!("{label}s for {schema}"),
                sqlx::query(ROUTINES).bind(schema).bind(routine_type),
                |row| {
                    Ok((
                        row.try_get::<String, _>(1)?,
                        RoutineRow {
                            name: row.try_get(0)?,
                            definition: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
                            return_type: row.try_get::<Option<String>, _>(3)?.unwrap_or_default(),
                            parameters: Vec::new(),
                        },
                    ))
                },
            )
            .await;

        let params = self
            .fetch(
                format!("parameters for {schema}"),
                sqlx::query(PARAMETERS).bind(schema).bind(routine_type),
                |row| {
                    let mode: Option<String> = row.try_get(3)?;
                    Ok(ParameterRow {
                        specific_name: row.try_get(0)?,
                        name: row.try_get::<Option<String>, _>(1)?.unwrap_or_default(),
                        data_type: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
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
        scan.map(|rows| {
            rows.into_iter()
                .map(|(specific_name, mut routine)| {
                    routine.parameters = by_routine.remove(&specific_name).unwrap_or_default();
                    routine
                })
                .collect()
        })
    }
}

#[async_trait::async_trait]
impl CatalogReader for MySqlCatalog<'_> {
    async fn current_database(&mut self) -> Result<String, CatalogError> {
        let row = sqlx::query(CURRENT_DATABASE)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| CatalogError::query("current database", e))?;
        row.try_get::<Option<String>, _>(0)
            .map_err(|e| CatalogError::decode("current database", e))?
            .ok_or_else(|| CatalogError::decode("current database", "no database selected"))
    }

    async fn schemas(&mut self) -> Scan<Vec<Schema>> {
        self.fetch("schemas".to_string(), sqlx::query(CURRENT_DATABASE), |row| {
            let name: Option<String> = row.try_get(0)?;
            let name = name.ok_or("no database selected")?;
            Ok(Schema::new(name, ""))
        })
        .await
    }

    async fn tables(&mut self, schema: &str) -> Scan<Vec<Table>> {
        self.fetch(
            format!("tables for {schema}"),
            sqlx::query(TABLES).bind(schema),
            |row| Ok(Table::new(row.try_get::<String, _>(0)?)),
        )
        .await
    }

    async fn columns(&mut self, schema: &str, relation: &str) -> Scan<Vec<Column>> {
        self.fetch(
            format!("columns for {schema}.{relation}"),
            sqlx::query(COLUMNS).bind(schema).bind(relation),
            |row| {
                let nullable: String = row.try_get(2)?;
                let position: i64 = row.try_get(4)?;
                let column_name: String = row.try_get(0)?;
                let data_type: String = row.try_get(1)?;
                Ok(Column::new(column_name, data_type, yes_no(&nullable))
                    .with_default_value(row.try_get(3)?)
                    .with_ordinal_position(clamp_i32(Some(position)).unwrap_or_default())
                    .with_char_max_length(clamp_i32(row.try_get(5)?))
                    .with_numeric_precision(clamp_i32(row.try_get(6)?))
                    .with_numeric_scale(clamp_i32(row.try_get(7)?)))
            },
        )
        .await
    }

    async fn primary_key(&mut self, schema: &str, table: &Table) -> Scan<Option<PrimaryKey>> {
        let name = table.name();
        self.fetch(
            format!("primary key for {schema}.{name}"),
            sqlx::query(PRIMARY_KEY).bind(schema).bind(name),
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
        self.fetch(
            format!("indexes for {schema}.{name}"),
            sqlx::query(INDEXES).bind(schema).bind(name),
            |row| {
                let index_name: String = row.try_get(0)?;
                let method: String = row.try_get(1)?;
                let non_unique: i64 = row.try_get(2)?;
                Ok(IndexRow {
                    is_primary: index_name == "PRIMARY",
                    index_name,
                    index_type: IndexType::from_catalog(&method),
                    is_unique: non_unique == 0,
                    // Functional key parts have no column.
                    column_name: row.try_get::<Option<String>, _>(3)?.unwrap_or_default(),
                })
            },
        )
        .await
        .map(|rows| group_indexes(table, &rows))
    }

    async fn foreign_keys(&mut self, schema: &str, table: &Table) -> Scan<Vec<ForeignKey>> {
        let name = table.name();
        self.fetch(
            format!("foreign keys for {schema}.{name}"),
            sqlx::query(FOREIGN_KEYS).bind(schema).bind(name),
            |row| {
                let on_delete: String = row.try_get(5)?;
                let on_update: String = row.try_get(6)?;
                Ok(ForeignKeyRow {
                    constraint_name: row.try_get(0)?,
                    column_name: row.try_get(1)?,
                    referenced_schema: row.try_get(2)?,
                    referenced_table: row.try_get(3)?,
                    referenced_column: row.try_get(4)?,
                    on_delete: ReferentialAction::from_rule(&on_delete)
                        .ok_or_else(|| format!("unknown delete rule '{on_delete}'"))?,
                    on_update: ReferentialAction::from_rule(&on_update)
                        .ok_or_else(|| format!("unknown update rule '{on_update}'"))?,
                })
            },
        )
        .await
        .map(|rows| group_foreign_keys(table, &rows))
    }

    /// CHECK needs 8.0.16+; see [`combine_constraints`].
    async fn constraints(&mut self, schema: &str, table: &Table) -> Scan<Vec<Constraint>> {
        let name = table.name();

        let checks = self
            .fetch(
                format!("check constraints for {schema}.{name}"),
                sqlx::query(CHECK_CONSTRAINTS).bind(schema).bind(name),
                |row| {
                    let clause: String = row.try_get(1)?;
                    Ok(ConstraintRow {
                        name: row.try_get(0)?,
                        kind: ConstraintKind::Check,
                        column_names: check_clause_columns(&clause, table),
                        check_expression: Some(clause),
                    })
                },
            )
            .await;

        let unique = self
            .fetch(
                format!("unique constraints for {schema}.{name}"),
                sqlx::query(UNIQUE_CONSTRAINTS).bind(schema).bind(name),
                |row| {
                    Ok(KeyColumnRow {
                        constraint_name: row.try_get(0)?,
                        column_name: row.try_get(1)?,
                    })
                },
            )
            .await;

        combine_constraints(table, checks, unique)
    }

    async fn views(&mut self, schema: &str) -> Scan<Vec<View>> {
        self.fetch(
            format!("views for {schema}"),
            sqlx::query(VIEWS).bind(schema),
            |row| {
                Ok(View::new(
                    row.try_get::<String, _>(0)?,
                    row.try_get::<Option<String>, _>(1)?.unwrap_or_default(),
                ))
            },
        )
        .await
    }

    async fn functions(&mut self, schema: &str) -> Scan<Vec<Function>> {
        self.routines(schema, "FUNCTION").await.map(|rows| {
            rows.into_iter()
                .map(|r| {
                    let mut function = Function::new(r.name, r.definition)
                        .with_return_type(r.return_type)
                        .with_language("SQL");
                    for parameter in r.parameters {
                        function.add_parameter(parameter);
                    }
                    function
                })
                .collect()
        })
    }

    async fn procedures(&mut self, schema: &str) -> Scan<Vec<Procedure>> {
        self.routines(schema, "PROCEDURE").await.map(|rows| {
            rows.into_iter()
                .map(|r| {
                    let mut procedure = Procedure::new(r.name, r.definition).with_language("SQL");
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
        self.fetch(
            format!("triggers for {schema}.{name}"),
            sqlx::query(TRIGGERS).bind(schema).bind(name),
            |row| {
                let timing: String = row.try_get(1)?;
                let event: String = row.try_get(2)?;
                let orientation: Option<String> = row.try_get(4)?;
                Ok(TriggerRow {
                    name: row.try_get(0)?,
                    timing: TriggerTiming::parse(&timing)
                        .ok_or_else(|| format!("unknown trigger timing '{timing}'"))?,
                    event: TriggerEvent::parse(&event)
                        .ok_or_else(|| format!("unknown trigger event '{event}'"))?,
                    definition: row.try_get(3)?,
                    for_each: orientation
                        .as_deref()
                        .and_then(TriggerGranularity::parse)
                        .unwrap_or_default(),
                    // MySQL trigger bodies are inline statements.
                    executes: None,
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
    fn test_accepts_mysql_formats() {
        let adapter = MySqlAdapter::new();
        assert!(adapter.is_compatible("mysql://root:pw@localhost:3306/shop"));
        assert!(adapter.is_compatible("mariadb://root@db/shop"));
        assert!(adapter.is_compatible("root:pw@tcp(localhost:3306)/shop?parseTime=true"));
        assert!(adapter.is_compatible("app@tcp(127.0.0.1)/shop"));
        assert!(adapter.is_compatible("app:pw@unix(/var/run/mysqld/mysqld.sock)/shop"));
        assert!(adapter.is_compatible("/shop"));
    }

    #[test]
    fn test_rejects_other_engines() {
        let adapter = MySqlAdapter::new();
        assert!(!adapter.is_compatible("postgres://app:pw@localhost:5432/shop"));
        assert!(!adapter.is_compatible("host=localhost user=app dbname=shop"));
        assert!(!adapter.is_compatible(""));
        assert!(!adapter.is_compatible("definitely not a connection string"));
    }

    #[test]
    fn test_dsn_rejects_bad_address() {
        assert!(parse_dsn("root@tcp(localhost:notaport)/shop").is_err());
        assert!(parse_dsn("root@pipe(x)/shop").is_err());
        assert!(parse_dsn("root@tcp(localhost/shop").is_err());
    }

    #[test]
    fn test_check_clause_columns_match_whole_identifiers() {
        let mut table = Table::new("orders");
        table.add_column(Column::new("qty", "int", false).with_ordinal_position(1));
        table.add_column(Column::new("q", "int", true).with_ordinal_position(2));
        table.add_column(Column::new("price", "decimal", true).with_ordinal_position(3));

        let cols = check_clause_columns("((`qty` > 0) and (`price` >= 0))", &table);
        assert_eq!(cols, vec!["qty", "price"], "'q' is only a substring of 'qty'");
    }

    #[test]
    fn test_not_null_constraints_follow_ordinal_order() {
        let mut table = Table::new("users");
        table.add_column(Column::new("id", "int", false).with_ordinal_position(1));
        table.add_column(Column::new("nick", "varchar", true).with_ordinal_position(2));
        table.add_column(Column::new("email", "varchar", false).with_ordinal_position(3));

        let names: Vec<String> = not_null_constraints(&table)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["users_id_not_null", "users_email_not_null"]);
    }

    fn users_table() -> Table {
        let mut table = Table::new("users");
        table.add_column(Column::new("id", "int", false).with_ordinal_position(1));
        table.add_column(Column::new("email", "varchar", false).with_ordinal_position(2));
        table.add_column(Column::new("age", "int", true).with_ordinal_position(3));
        table
    }

    fn unique_email() -> Scan<Vec<KeyColumnRow>> {
        Scan::ok(vec![KeyColumnRow {
            constraint_name: "users_email_key".to_string(),
            column_name: "email".to_string(),
        }])
    }

    #[test]
    fn test_combine_constraints_orders_check_unique_not_null() {
        let table = users_table();
        let checks = Scan::ok(vec![ConstraintRow {
            name: "users_age_check".to_string(),
            kind: ConstraintKind::Check,
            check_expression: Some("(`age` >= 0)".to_string()),
            column_names: vec!["age".to_string()],
        }]);

        let scan = combine_constraints(&table, checks, unique_email());
        assert!(scan.errors.is_empty());
        let kinds: Vec<ConstraintKind> = scan.value.iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::Check,
                ConstraintKind::Unique,
                ConstraintKind::NotNull,
                ConstraintKind::NotNull,
            ]
        );
        assert_eq!(scan.value[1].columns()[0].name(), "email");
    }

    #[test]
    fn test_combine_constraints_survives_failed_check_scan() {
        let table = users_table();
        let checks = Scan::failed(CatalogError::query(
            "check constraints for shop.users",
            "Table 'information_schema.CHECK_CONSTRAINTS' doesn't exist",
        ));

        let scan = combine_constraints(&table, checks, unique_email());
        assert_eq!(scan.errors.len(), 1, "CHECK failure is reported");
        let names: Vec<&str> = scan.value.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["users_email_key", "users_id_not_null", "users_email_not_null"],
            "UNIQUE and NOT NULL still attach"
        );
    }

    #[test]
    fn test_clamp_i32() {
        assert_eq!(clamp_i32(Some(4_294_967_295)), Some(i32::MAX));
        assert_eq!(clamp_i32(Some(255)), Some(255));
        assert_eq!(clamp_i32(None), None);
    }

    #[tokio::test]
    async fn test_close_without_connection() {
        let mut adapter = MySqlAdapter::new();
        assert!(matches!(adapter.close().await, Err(AdapterError::NotConnected)));
        assert!(matches!(
            adapter.map_database().await,
            Err(AdapterError::NotConnected)
        ));
    }
}
