//! Purpose: Model tab-separated text as a header line plus numbered data rows.
//! Exports: `Table`, `Row`, `split_fields`, `push_line`, `DELIMITER`.
//! Role: Parse and serialize boundary for the flattener; no quoting or escaping.
//! Invariants: Lines split on `\n` with a trailing `\r` dropped; fields split on `\t`.
//! Invariants: Fields are never trimmed; header names are unique.
use std::collections::HashSet;

use super::error::{Error, ErrorKind};

pub const DELIMITER: char = '\t';

/// One data row, tagged with its 1-based line number in the source text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut lines = text.lines();
        let header_line = lines.next().ok_or_else(|| {
            Error::new(ErrorKind::Schema)
                .with_message("input is empty; expected a header line")
                .with_row(1)
        })?;
        let header = split_fields(header_line);
        ensure_unique(&header)?;

        let rows = lines
            .enumerate()
            .map(|(idx, line)| Row {
                line: idx + 2,
                fields: split_fields(line),
            })
            .collect();

        Ok(Self { header, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|field| field == name)
    }
}

pub fn split_fields(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(str::to_string).collect()
}

fn ensure_unique(header: &[String]) -> Result<(), Error> {
    let mut seen = HashSet::with_capacity(header.len());
    for name in header {
        if !seen.insert(name.as_str()) {
            return Err(Error::new(ErrorKind::Schema)
                .with_message(format!("duplicate column name `{name}` in header"))
                .with_row(1)
                .with_field(name.clone()));
        }
    }
    Ok(())
}

/// Append `fields` to `out` as one tab-joined, newline-terminated line.
pub fn push_line<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(DELIMITER);
        }
        out.push_str(field.as_ref());
    }
    out.push('\n');
}
