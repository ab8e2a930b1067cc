//! Shared models and utilities for the mimtools workspace.
//!
//! This crate holds the plain data types that flow between the sequence store
//! and the analysis crates: domain hits from HMM annotation, binding records
//! from the mimic pipeline, and the per-sequence domain map consumed by the
//! intersection engine. It also carries the small file utilities shared by
//! the other crates.

pub mod errors;
pub mod models;
pub mod utils;
