//! Report output formatting
//!
//! - `text`: one `%g`-formatted line per dataset on stdout
//! - `json`: all reports of a run in one JSON file

pub mod json;
pub mod text;
