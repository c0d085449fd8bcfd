//! Configuration loading
//!
//! Builds an `accountlink_domain::Config` from environment variables or a
//! TOML/JSON file.

pub mod loader;

// Re-export commonly used items
pub use loader::{find_config_file, load, load_from_env, load_from_file};
