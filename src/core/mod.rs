// Core modules implementing TSV modelling, payload decoding, and flattening.
pub mod error;
pub mod files;
pub mod flatten;
pub mod payload;
pub mod table;
