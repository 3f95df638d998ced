//! Result reporting
//!
//! - `text`: console progress, per-round results and the run summary
//! - `json`: machine-readable run summary

pub mod json;
pub mod text;
