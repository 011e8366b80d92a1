//! Configuration loader and schema types.
//!
//! Settings come from struct defaults, an optional TOML file and `SEGUE__`
//! environment variables, in increasing order of precedence.

mod load;
mod schema;

pub use load::{default_config_path, default_log_path, resolve_config_path};
pub use schema::*;
