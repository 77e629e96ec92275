//! Named transforms and the registry that resolves them.

/// Stock image and label presets.
pub mod builtin;
/// Preset traits, name normalization and the registry.
pub mod registry;
