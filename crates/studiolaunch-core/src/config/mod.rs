//! Unified configuration layer.
//!
//! Every environment read goes through an [`EnvSnapshot`]; launcher code works on
//! the resolved [`LaunchConfig`] instead of calling `std::env::var` ad hoc.
//!
//! - `loader`: `EnvSnapshot`, `.env` merging, `env_or` / `env_optional` / `env_bool` helpers
//! - `schema`: `LaunchConfig`, `ObservabilityConfig`
//! - `env_keys`: key constants, both consumed and produced

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{parse_dotenv, EnvSnapshot};
pub use schema::{LaunchConfig, LaunchOverrides, ObservabilityConfig};
