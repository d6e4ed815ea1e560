//! Purpose: `unjson` CLI entry point.
//! Role: Binary crate root; parses args, runs one flatten, emits a JSON summary on stdout.
//! Invariants: Stdout carries only the one-line run summary.
//! Invariants: Errors and notices go to stderr (human text on a TTY, JSON otherwise).
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use unjson::api::{
    Error, ErrorKind, ErrorPolicy, FlattenConfig, FlattenOptions, FlattenReport, KeyPolicy,
    default_output_path, flatten_file, to_exit_code,
};
use unjson::notice::{Notice, notice_json};

/// Column written by the game-simulation aggregator.
const DEFAULT_FIELD: &str = "game_sim_settings";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `unjson --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    execute(cli)
        .map_err(add_default_hint)
        .map_err(|err| (err, color_mode))
}

fn execute(cli: Cli) -> Result<RunOutcome, Error> {
    let options = cli.options()?;
    let report = flatten_file(&options)?;
    for skipped in &report.skipped {
        emit_notice(&Notice::skipped(&report.input, skipped), cli.color);
    }
    emit_summary(&report)?;
    Ok(RunOutcome::ok())
}

#[derive(Parser)]
#[command(
    name = "unjson",
    version,
    about = "Flatten a double-encoded JSON column of a TSV file into one column per key",
    long_about = None,
    before_help = r#"The payload column holds a JSON string whose contents are a JSON object.
The first data row decides the new columns and their order; the payload
column itself is dropped. The output is written only if every row succeeds."#,
    after_help = r#"EXAMPLES
  $ unjson aggregated.tsv                      # writes aggregated.unjson.tsv
  $ unjson runs.tsv -o flat.tsv -f settings
  $ unjson runs.tsv --strict-keys -e skip      # drop rows whose keys differ

EXIT CODES
  0 ok, 2 usage, 3 not found, 4 permission, 5 i/o, 6 schema, 7 decode"#
)]
struct Cli {
    #[arg(help = "TSV file to read", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[arg(
        short,
        long,
        help = "Output TSV path (default: <input stem>.unjson.<ext> next to the input)",
        value_hint = ValueHint::FilePath
    )]
    output: Option<PathBuf>,
    #[arg(
        short,
        long,
        default_value = DEFAULT_FIELD,
        help = "Header name of the double-encoded JSON column"
    )]
    field: String,
    #[arg(
        long,
        help = "Require every row's payload keys to match the first row's, in order"
    )]
    strict_keys: bool,
    #[arg(
        short = 'e',
        long = "errors",
        default_value = "stop",
        value_enum,
        help = "On a bad row after the first: stop the run, or skip the row with a notice"
    )]
    errors: ErrorPolicyCli,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
}

impl Cli {
    fn options(&self) -> Result<FlattenOptions, Error> {
        let output = match &self.output {
            Some(path) => path.clone(),
            None => default_output_path(&self.input)?,
        };
        let keys = if self.strict_keys {
            KeyPolicy::Strict
        } else {
            KeyPolicy::Trust
        };
        Ok(FlattenOptions {
            input: self.input.clone(),
            output,
            config: FlattenConfig::new(self.field.clone())
                .with_errors(self.errors.into())
                .with_keys(keys),
        })
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ErrorPolicyCli {
    Stop,
    Skip,
}

impl From<ErrorPolicyCli> for ErrorPolicy {
    fn from(value: ErrorPolicyCli) -> Self {
        match value {
            ErrorPolicyCli::Stop => ErrorPolicy::Stop,
            ErrorPolicyCli::Skip => ErrorPolicy::Skip,
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn add_default_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound => err.with_hint("Check the input path; the file does not exist."),
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check file and directory permissions.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        ErrorKind::Decode => err.with_hint(
            "Each payload cell must be a JSON string containing a JSON object. Use -e skip to drop bad rows.",
        ),
        ErrorKind::Schema => err.with_hint("Check the header line and the --field name."),
        ErrorKind::Internal => {
            err.with_hint("Unexpected internal error. Re-run with RUST_LOG=debug for details.")
        }
        ErrorKind::Usage => err,
    }
}

fn emit_summary(report: &FlattenReport) -> Result<(), Error> {
    let json = serde_json::to_string(report).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode run summary")
            .with_source(err)
    })?;
    println!("{json}");
    Ok(())
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} skipped row {}: {}", notice.row, notice.message);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Schema => "schema error".to_string(),
        ErrorKind::Decode => "decode error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(row) = err.row() {
        lines.push(format!(
            "{} {row}",
            colorize_label("row:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(field) = err.field() {
        lines.push(format!(
            "{} {field}",
            colorize_label("field:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, add_default_hint, error_json, error_text};
    use clap::Parser;
    use std::path::PathBuf;
    use unjson::api::{Error, ErrorKind, ErrorPolicy, KeyPolicy};

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Usage).with_message("bad input");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(plain.contains("error:"));
        assert!(!plain.contains("\u{1b}["));
    }

    #[test]
    fn error_json_carries_row_and_field() {
        let err = Error::new(ErrorKind::Decode)
            .with_message("payload cell is not valid JSON")
            .with_path("aggregated.tsv")
            .with_row(3)
            .with_field("game_sim_settings");
        let value = error_json(&add_default_hint(err));
        let inner = &value["error"];
        assert_eq!(inner["kind"], "Decode");
        assert_eq!(inner["row"], 3);
        assert_eq!(inner["field"], "game_sim_settings");
        assert_eq!(inner["path"], "aggregated.tsv");
        assert!(inner["hint"].as_str().unwrap().contains("-e skip"));
    }

    #[test]
    fn default_hint_keeps_existing_hint() {
        let err = Error::new(ErrorKind::Schema).with_hint("custom");
        assert_eq!(add_default_hint(err).hint(), Some("custom"));
    }

    #[test]
    fn cli_defaults_derive_output_and_field() {
        let cli = Cli::try_parse_from(["unjson", "runs/aggregated.tsv"]).expect("parse");
        let options = cli.options().expect("options");
        assert_eq!(options.output, PathBuf::from("runs/aggregated.unjson.tsv"));
        assert_eq!(options.config.field, "game_sim_settings");
        assert_eq!(options.config.errors, ErrorPolicy::Stop);
        assert_eq!(options.config.keys, KeyPolicy::Trust);
    }

    #[test]
    fn cli_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "unjson",
            "in.tsv",
            "-o",
            "out.tsv",
            "-f",
            "settings",
            "--strict-keys",
            "-e",
            "skip",
        ])
        .expect("parse");
        let options = cli.options().expect("options");
        assert_eq!(options.output, PathBuf::from("out.tsv"));
        assert_eq!(options.config.field, "settings");
        assert_eq!(options.config.errors, ErrorPolicy::Skip);
        assert_eq!(options.config.keys, KeyPolicy::Strict);
    }
}
