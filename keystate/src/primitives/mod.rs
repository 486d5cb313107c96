/// Global, set-once configuration for the library.
pub mod config;

/// Bridges the `log` facade to a logger provided by the host platform.
pub mod logger;
