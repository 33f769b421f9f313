//! Persist aggregated sweep results for the plotting scripts.

pub mod csv;

pub use self::csv::{MULT_SCHEMA, SOLO_SCHEMA, write_results};
