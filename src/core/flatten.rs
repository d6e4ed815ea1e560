//! Purpose: Flatten the payload column of in-memory TSV text into one column per key.
//! Exports: `FlattenConfig`, `ErrorPolicy`, `KeyPolicy`, `Flattened`, `SkippedRow`, `flatten_str`.
//! Role: Core pipeline; the first data row (template row) fixes added columns and order.
//! Invariants: Every row, the template included, is decoded again; values follow its own key order.
//! Invariants: `KeyPolicy::Trust` assumes rows share template keys; `Strict` checks it.
use serde::Serialize;
use tracing::{debug, warn};

use super::error::{Error, ErrorKind};
use super::payload::{Payload, decode_cell, render_value};
use super::table::{Row, Table, push_line};

/// What to do when a data row after the template row cannot be flattened.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ErrorPolicy {
    #[default]
    Stop,
    Skip,
}

/// Whether each row's payload keys are checked against the template row.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum KeyPolicy {
    #[default]
    Trust,
    Strict,
}

#[derive(Clone, Debug)]
pub struct FlattenConfig {
    pub field: String,
    pub errors: ErrorPolicy,
    pub keys: KeyPolicy,
}

impl FlattenConfig {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            errors: ErrorPolicy::default(),
            keys: KeyPolicy::default(),
        }
    }

    pub fn with_errors(mut self, errors: ErrorPolicy) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_keys(mut self, keys: KeyPolicy) -> Self {
        self.keys = keys;
        self
    }
}

/// A data row dropped under `ErrorPolicy::Skip`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub kind: String,
    pub message: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Flattened {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub added_columns: Vec<String>,
    pub rows_in: usize,
    pub skipped: Vec<SkippedRow>,
}

impl Flattened {
    /// Serialize as TSV: header line, then one line per row.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, &self.header);
        for row in &self.rows {
            push_line(&mut out, row);
        }
        out
    }
}

pub fn flatten_str(text: &str, config: &FlattenConfig) -> Result<Flattened, Error> {
    let table = Table::parse(text)?;
    flatten_table(table, config)
}

pub fn flatten_table(table: Table, config: &FlattenConfig) -> Result<Flattened, Error> {
    let field = config.field.as_str();
    let index = table.column(field).ok_or_else(|| {
        Error::new(ErrorKind::Schema)
            .with_message(format!("column `{field}` not found in header"))
            .with_hint(format!("Header columns: {}.", table.header.join(", ")))
            .with_row(1)
            .with_field(field)
    })?;
    debug!(field, index, "located payload column");

    let template = table.rows.first().ok_or_else(|| {
        Error::new(ErrorKind::Schema)
            .with_message("input has a header but no data rows")
            .with_hint("The first data row defines the added columns; add at least one row.")
            .with_row(1)
    })?;
    let template_keys: Vec<String> = decode_row(template, index, field)?
        .keys()
        .cloned()
        .collect();
    debug!(row = template.line, keys = template_keys.len(), "decoded template row");

    let mut header = table.header.clone();
    header.remove(index);
    for key in &template_keys {
        if header.contains(key) {
            return Err(Error::new(ErrorKind::Schema)
                .with_message(format!("payload key `{key}` collides with an existing column"))
                .with_hint("Rename the column or the payload key so output columns stay unique.")
                .with_row(template.line)
                .with_field(key.clone()));
        }
    }
    header.extend(template_keys.iter().cloned());

    let template_line = template.line;
    let rows_in = table.rows.len();
    let mut rows = Vec::with_capacity(rows_in);
    let mut skipped = Vec::new();
    for row in table.rows {
        let line = row.line;
        match flatten_row(row, index, &template_keys, header.len(), config) {
            Ok(out) => rows.push(out),
            Err(err) if config.errors == ErrorPolicy::Skip && line != template_line => {
                let message = err.message().unwrap_or("row could not be flattened");
                debug!(row = line, kind = ?err.kind(), "skipping row: {message}");
                skipped.push(SkippedRow {
                    row: line,
                    kind: format!("{:?}", err.kind()),
                    message: message.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Flattened {
        header,
        rows,
        added_columns: template_keys,
        rows_in,
        skipped,
    })
}

fn decode_row(row: &Row, index: usize, field: &str) -> Result<Payload, Error> {
    let cell = row.fields.get(index).ok_or_else(|| {
        Error::new(ErrorKind::Decode)
            .with_message(format!(
                "row has {} fields; payload column is field {}",
                row.fields.len(),
                index + 1
            ))
            .with_row(row.line)
            .with_field(field)
    })?;
    decode_cell(cell).map_err(|err| err.with_row(row.line).with_field(field))
}

fn flatten_row(
    mut row: Row,
    index: usize,
    template_keys: &[String],
    width: usize,
    config: &FlattenConfig,
) -> Result<Vec<String>, Error> {
    let field = config.field.as_str();
    let payload = decode_row(&row, index, field)?;

    if config.keys == KeyPolicy::Strict {
        check_keys(&row, &payload, template_keys, field)?;
    }

    let mut fields = std::mem::take(&mut row.fields);
    fields.remove(index);
    fields.extend(payload.values().map(render_value));

    if fields.len() != width {
        if config.keys == KeyPolicy::Strict {
            return Err(Error::new(ErrorKind::Schema)
                .with_message(format!(
                    "row flattens to {} fields; header has {width}",
                    fields.len()
                ))
                .with_row(row.line));
        }
        warn!(
            row = row.line,
            fields = fields.len(),
            width,
            "row width differs from header"
        );
    }
    Ok(fields)
}

fn check_keys(
    row: &Row,
    payload: &Payload,
    template_keys: &[String],
    field: &str,
) -> Result<(), Error> {
    let matches = payload.len() == template_keys.len()
        && payload.keys().zip(template_keys).all(|(a, b)| a == b);
    if matches {
        return Ok(());
    }
    let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
    Err(Error::new(ErrorKind::Schema)
        .with_message(format!(
            "payload keys [{}] differ from template keys [{}]",
            keys.join(", "),
            template_keys.join(", ")
        ))
        .with_row(row.line)
        .with_field(field))
}
