//! Purpose: Define the stable public Rust API boundary for unjson.
//! Exports: Flattening entry points, configuration, and error types.
//! Role: Public, additive-only surface used by the CLI and integration tests.
//! Invariants: Callers reach core types through this module only.

mod file;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::flatten::{
    ErrorPolicy, FlattenConfig, Flattened, KeyPolicy, SkippedRow, flatten_str,
};
pub use crate::core::files::default_output_path;
pub use file::{FlattenOptions, FlattenReport, flatten_file};
