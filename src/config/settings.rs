//! Application settings loading from costing.toml
//!
//! This module provides functionality to load engine settings from a TOML
//! configuration file: the database URL and an initial hourly labor rate for
//! workspaces that have not set one yet. Everything is optional; environment
//! variables win over the file for the database URL.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire costing.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Settings {
    /// Database connection string (e.g., `"sqlite://data/foodcost.sqlite"`)
    pub database_url: Option<String>,
    /// Hourly labor rate applied when the workspace has none stored yet
    pub labor_cost_per_hour: Option<Decimal>,
}

/// Loads engine settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read settings file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse costing.toml: {e}"),
    })
}

/// Loads engine settings from the default location (./costing.toml).
///
/// A missing file is not an error: the engine runs fine on defaults, with the
/// database URL taken from the environment.
pub fn load_default_settings() -> Result<Settings> {
    if Path::new("costing.toml").exists() {
        load_settings("costing.toml")
    } else {
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            database_url = "sqlite::memory:"
            labor_cost_per_hour = "25.50"
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(
            settings.labor_cost_per_hour,
            Some(Decimal::new(2550, 2)) // 25.50
        );
    }

    #[test]
    fn test_parse_empty_settings() {
        let settings: Settings = toml::from_str("").unwrap();
        assert!(settings.database_url.is_none());
        assert!(settings.labor_cost_per_hour.is_none());
    }
}
