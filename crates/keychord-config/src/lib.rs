//! Configuration parsing for keychord
//!
//! This crate handles parsing KDL configuration files: engine tuning, the
//! host's native binding catalog and the combinations owners declare.

mod error;
mod keys;
mod model;
mod parser;

pub use error::ConfigError;
pub use keys::{key_name, resolve_key};
pub use model::*;
pub use parser::{parse_config, parse_config_str};
