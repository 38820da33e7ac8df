use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;

use super::{ReportError, ReportWriter, write_file};
use crate::model::{Column, Database, ForeignKey, Schema, Table};

/// Mermaid `erDiagram` of every table, with foreign keys as relationships.
#[derive(Debug, Default, Clone, Copy)]
pub struct MermaidReportWriter;

impl ReportWriter for MermaidReportWriter {
    fn write_report(&self, path: &Path, db: &Database) -> Result<(), ReportError> {
        write_file(path, render(db).as_bytes())
    }

    fn report_keys(&self) -> &'static [&'static str] {
        &["mermaid"]
    }

    fn file_extension(&self) -> &'static str {
        "mmd"
    }

    fn report_name(&self) -> &'static str {
        "Mermaid ERD"
    }
}

pub fn render(db: &Database) -> String {
    let mut out = String::from("erDiagram\n");
    for schema in db.schemas().values() {
        render_schema(&mut out, schema);
    }
    out
}

fn render_schema(out: &mut String, schema: &Schema) {
    for table in schema.tables().values() {
        render_entity(out, table);
    }
    for line in relationships(schema) {
        out.push_str(&line);
        out.push('\n');
    }
}

fn render_entity(out: &mut String, table: &Table) {
    // Writing to a String never fails.
    let _ = writeln!(out, "    {} {{", sanitize(table.name()));
    for column in table.columns_in_order() {
        render_attribute(out, table, column);
    }
    out.push_str("    }\n");
}

fn render_attribute(out: &mut String, table: &Table, column: &Column) {
    let _ = write!(
        out,
        "        {} {}",
        normalize_type(column.data_type()),
        sanitize(column.name())
    );
    let pk = table.is_primary_key_column(column.name());
    let fk = table.is_foreign_key_column(column.name());
    match (pk, fk) {
        (true, true) => out.push_str(" PK \"FK\""),
        (true, false) => out.push_str(" PK"),
        (false, true) => out.push_str(" FK"),
        (false, false) => {}
    }
    out.push('\n');
}

/// One line per distinct `from }o--|| to : "fk"` edge, in table order.
fn relationships(schema: &Schema) -> Vec<String> {
    let mut seen = HashSet::new();
    schema
        .tables()
        .values()
        .flat_map(|table| table.foreign_keys().iter().map(move |fk| relationship(table, fk)))
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

fn relationship(table: &Table, fk: &ForeignKey) -> String {
    format!(
        "    {} }}o--|| {} : \"{}\"",
        sanitize(table.name()),
        sanitize(fk.referenced_table()),
        sanitize(fk.name())
    )
}

/// Mermaid identifiers cannot contain hyphens or spaces.
fn sanitize(name: &str) -> String {
    name.replace(['-', ' '], "_")
}

/// Collapse engine spellings to a short type token usable as a Mermaid word.
fn normalize_type(data_type: &str) -> String {
    let dt = data_type.to_lowercase();
    let short = match dt.as_str() {
        d if d.starts_with("character varying") || d.starts_with("varchar") => "varchar",
        d if d.starts_with("integer") || d == "int" || d == "int4" => "int",
        d if d.starts_with("bigint") || d == "int8" => "bigint",
        d if d.starts_with("smallint") || d == "int2" => "smallint",
        d if d.starts_with("numeric") || d.starts_with("decimal") => "decimal",
        d if d.starts_with("boolean") || d == "bool" => "bool",
        d if d.starts_with("timestamp") => "timestamp",
        "date" => "date",
        "time" => "time",
        "text" => "text",
        d if d.starts_with("uuid") => "uuid",
        d if d.starts_with("json") => "json",
        d => return sanitize(d.split('(').next().unwrap_or(d).trim()),
    };
    short.to_string()
}
