/// Startup configuration and storage locations.
pub mod config;
/// Namespaces, preset kinds and output formats.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
