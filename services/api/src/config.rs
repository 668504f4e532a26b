//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use rust_decimal::Decimal;
use tracing::Level;

use family_finance_core::projection::{MonthEndPolicy, ProjectionSettings};
use family_finance_core::summary::{IncomeAssumption, IncomeAssumptions};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub projection: ProjectionSettings,
    pub income_assumptions: IncomeAssumptions,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Projection Settings ---
        let window_days = parse_var("UPCOMING_WINDOW_DAYS", 30)?;
        let max_items = parse_var("UPCOMING_MAX_ITEMS", 10)?;
        let month_end = month_end_policy_from_env()?;
        let projection = ProjectionSettings {
            window_days,
            max_items,
            month_end,
        };

        // --- Load Income Assumptions ---
        let income_assumptions = match std::env::var("INCOME_ASSUMPTIONS") {
            Ok(raw) => parse_income_assumptions(&raw)?,
            Err(_) => IncomeAssumptions::household_defaults(),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            projection,
            income_assumptions,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' cannot be parsed", raw))
        }),
        Err(_) => Ok(default),
    }
}

fn month_end_policy_from_env() -> Result<MonthEndPolicy, ConfigError> {
    let raw = std::env::var("MONTH_END_POLICY").unwrap_or_else(|_| "overflow".to_string());
    match raw.to_lowercase().as_str() {
        "overflow" => Ok(MonthEndPolicy::Overflow),
        "clamp" => Ok(MonthEndPolicy::Clamp),
        _ => Err(ConfigError::InvalidValue(
            "MONTH_END_POLICY".to_string(),
            format!("'{}' is neither 'overflow' nor 'clamp'", raw),
        )),
    }
}

/// Parses a `source=amount` comma list, e.g.
/// `Social Security=1900,401k/IRA=0`.
fn parse_income_assumptions(raw: &str) -> Result<IncomeAssumptions, ConfigError> {
    let mut entries = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (source, amount_str) = part.split_once('=').ok_or_else(|| {
            ConfigError::InvalidValue(
                "INCOME_ASSUMPTIONS".to_string(),
                format!("'{}' is not a 'source=amount' pair", part),
            )
        })?;
        let amount = amount_str.trim().parse::<Decimal>().map_err(|_| {
            ConfigError::InvalidValue(
                "INCOME_ASSUMPTIONS".to_string(),
                format!("'{}' is not a decimal amount", amount_str),
            )
        })?;
        entries.push(IncomeAssumption {
            source: source.trim().to_string(),
            amount,
        });
    }
    Ok(IncomeAssumptions::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_assumptions_parse_from_comma_list() {
        let assumptions =
            parse_income_assumptions("Social Security=1900, 401k/IRA=0").unwrap();
        let entries = assumptions.entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, "Social Security");
        assert_eq!(entries[0].amount, Decimal::new(1900, 0));
        assert_eq!(entries[1].source, "401k/IRA");
        assert_eq!(entries[1].amount, Decimal::ZERO);
    }

    #[test]
    fn malformed_income_assumptions_are_rejected() {
        assert!(parse_income_assumptions("Social Security").is_err());
        assert!(parse_income_assumptions("Pension=lots").is_err());
    }
}
