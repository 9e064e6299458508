//! Loading stack declarations from TOML and resolving their parameters.
//!
//! Interpolation itself is pure and lives in `berth_core::params`; this crate owns the I/O around it:
//! reading files, parsing `name=value` overrides and looking up environment variables.

mod error;
pub use error::ConfigError;

mod overrides;
pub use overrides::{Overrides, parse_override};

mod loader;
pub use loader::{EnvLookup, LoadedDeclaration, Loader};
