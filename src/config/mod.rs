//! Configuration parsing and types.
//!
//! - `types` - `FleetConfig` and its sections
//! - `duration` - human-readable durations ("15s", "500ms")
//! - `parser` - locating and loading `fleet.yaml`
//! - `validation` - config validation

mod duration;
mod parser;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use types::*;
