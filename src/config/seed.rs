//! Reference data loading from seed.toml
//!
//! This module provides functionality to load the initial vaccines and branches
//! from a TOML file. The records defined there are upserted by name into the
//! database on first run; see [`crate::core::seed`].

use crate::entities::ScheduleBlock;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_SEED_FILE: &str = "seed.toml";

/// Configuration structure representing the entire seed.toml file
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    /// Vaccines to seed
    #[serde(default)]
    pub vaccines: Vec<VaccineSeed>,
    /// Branches to seed
    #[serde(default)]
    pub branches: Vec<BranchSeed>,
}

/// Seed entry for a single vaccine
#[derive(Debug, Deserialize, Clone)]
pub struct VaccineSeed {
    /// Unique vaccine name, used as the upsert key
    pub name: String,
    /// Doses in the primary series
    pub primary_series_doses: Option<i32>,
    /// Years between routine repeats
    pub recurrence_interval_years: Option<f64>,
    /// Years between boosters
    pub booster_interval_years: Option<f64>,
    /// Price per dose
    #[serde(default)]
    pub price_per_dose: f64,
    /// Route code, defaults to `IM`
    pub administration_route: Option<String>,
    /// Manufacturer
    #[serde(default)]
    pub manufacturer: String,
    /// Minimum age in years
    pub age_min: Option<f64>,
    /// Maximum age in years
    pub age_max: Option<f64>,
    /// Contraindications
    #[serde(default)]
    pub contraindications: Vec<String>,
    /// Side effects
    #[serde(default)]
    pub side_effects: Vec<String>,
    /// Notes
    #[serde(default)]
    pub notes: String,
}

/// Seed entry for a single branch
#[derive(Debug, Deserialize, Clone)]
pub struct BranchSeed {
    /// Branch name, used as the upsert key
    pub name: String,
    /// Street address
    pub address: String,
    /// Postal code
    pub postcode: String,
    /// Phone number
    pub phone: String,
    /// Email
    pub email: String,
    /// Weekly schedule
    #[serde(default)]
    pub opening_hours: Vec<ScheduleBlock>,
    /// Picture path or URL
    pub image_url: Option<String>,
}

/// Loads seed data from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_seed<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed file {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(Error::from)
}

/// Path of the seed file: `SEED_FILE` or `./seed.toml`.
#[must_use]
pub fn seed_file_path() -> String {
    std::env::var("SEED_FILE").unwrap_or_else(|_| DEFAULT_SEED_FILE.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_seed_config() {
        let toml_str = r#"
            [[vaccines]]
            name = "Hepatitis B"
            primary_series_doses = 3
            price_per_dose = 32.0
            administration_route = "IM"
            age_min = 0
            contraindications = ["Allergy to yeast"]
            side_effects = ["Soreness", "Fatigue"]

            [[vaccines]]
            name = "Influenza (Inactivated)"
            recurrence_interval_years = 1.0
            price_per_dose = 20.0

            [[branches]]
            name = "Harbour Street Clinic"
            address = "12 Harbour Street, Portside"
            postcode = "PS1 4AB"
            phone = "01234 567890"
            email = "harbour@example.org"

            [[branches.opening_hours]]
            days = "Mon-Fri"
            open = "09:00"
            close = "17:00"

            [[branches.opening_hours]]
            days = "Sat"
            open = "10:00"
            close = "13:00"
        "#;

        let config: SeedConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.vaccines.len(), 2);
        assert_eq!(config.vaccines[0].primary_series_doses, Some(3));
        assert_eq!(config.vaccines[0].age_min, Some(0.0));
        assert_eq!(config.vaccines[0].side_effects.len(), 2);
        assert!(config.vaccines[1].administration_route.is_none());
        assert!(config.vaccines[1].contraindications.is_empty());

        assert_eq!(config.branches.len(), 1);
        let hours = &config.branches[0].opening_hours;
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[1], ScheduleBlock::new("Sat", "10:00", "13:00"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = load_seed("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
