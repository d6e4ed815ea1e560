//! Purpose: Path-level entry point that reads, flattens, and atomically writes.
//! Exports: `FlattenOptions`, `FlattenReport`, `flatten_file`.
//! Role: Thin I/O shell around `core::flatten`; the CLI calls only this.
//! Invariants: The input file is never modified.
//! Invariants: The output file is written only after every row succeeded.
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::core::error::{Error, ErrorKind};
use crate::core::files::{read_input, write_atomic};
use crate::core::flatten::{FlattenConfig, SkippedRow, flatten_str};

#[derive(Clone, Debug)]
pub struct FlattenOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: FlattenConfig,
}

impl FlattenOptions {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            config: FlattenConfig::new(field),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FlattenReport {
    pub input: String,
    pub output: String,
    pub field: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns: usize,
    pub added_columns: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

pub fn flatten_file(options: &FlattenOptions) -> Result<FlattenReport, Error> {
    ensure_distinct(&options.input, &options.output)?;

    let text = read_input(&options.input)?;
    let flattened =
        flatten_str(&text, &options.config).map_err(|err| err.or_path(&options.input))?;
    write_atomic(&options.output, &flattened.to_tsv())?;

    let report = FlattenReport {
        input: options.input.display().to_string(),
        output: options.output.display().to_string(),
        field: options.config.field.clone(),
        rows_in: flattened.rows_in,
        rows_out: flattened.rows.len(),
        columns: flattened.header.len(),
        added_columns: flattened.added_columns,
        skipped: flattened.skipped,
    };
    info!(
        input = %report.input,
        output = %report.output,
        rows = report.rows_out,
        skipped = report.skipped.len(),
        "flattened"
    );
    Ok(report)
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<(), Error> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("output path is the same file as the input")
            .with_hint("Choose a different --output; the input is never overwritten.")
            .with_path(output));
    }
    Ok(())
}
