/// Database configuration and connection management
pub mod database;

/// Application settings loading from costing.toml
pub mod settings;
