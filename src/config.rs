// Configuration de l'application (variables d'environnement + .env)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Bande de variation (en %) appliquée à chaque tick de simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationBand {
    pub min_percent: Decimal,
    pub max_percent: Decimal,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub price_update_interval: Duration,
    pub variation: VariationBand,
    pub stream_interval: Duration,
    pub stream_buffer: usize,
    pub notification_timeout: Duration,
    pub default_balance: Decimal,
    pub seed_on_startup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://crypto_tracker.db?mode=rwc".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            price_update_interval: Duration::from_secs(5),
            variation: VariationBand {
                min_percent: Decimal::new(5, 1),
                max_percent: Decimal::new(20, 1),
            },
            stream_interval: Duration::from_secs(1),
            stream_buffer: 16,
            notification_timeout: Duration::from_millis(2000),
            default_balance: Decimal::new(10000, 0),
            seed_on_startup: false,
        }
    }
}

fn read_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

impl Settings {
    /// Charge .env puis lit chaque variable (valeur par défaut si absente)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Settings::default();

        let settings = Settings {
            database_url: read_var("DATABASE_URL", defaults.database_url)?,
            host: read_var("HOST", defaults.host)?,
            port: read_var("PORT", defaults.port)?,
            price_update_interval: Duration::from_secs(read_var("PRICE_UPDATE_INTERVAL", 5u64)?),
            variation: VariationBand {
                min_percent: read_var("PRICE_VARIATION_MIN", defaults.variation.min_percent)?,
                max_percent: read_var("PRICE_VARIATION_MAX", defaults.variation.max_percent)?,
            },
            stream_interval: Duration::from_secs(read_var("MARKET_STREAM_INTERVAL", 1u64)?),
            stream_buffer: read_var("MARKET_STREAM_BUFFER", defaults.stream_buffer)?,
            notification_timeout: Duration::from_millis(read_var("NOTIFICATION_TIMEOUT_MS", 2000u64)?),
            default_balance: read_var("DEFAULT_BALANCE", defaults.default_balance)?,
            seed_on_startup: read_var("SEED_ON_STARTUP", defaults.seed_on_startup)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price_update_interval.is_zero() || self.stream_interval.is_zero() {
            return Err(ConfigError::Invalid("intervals must be greater than 0".into()));
        }

        let VariationBand { min_percent, max_percent } = self.variation;
        if min_percent <= Decimal::ZERO || min_percent > max_percent || max_percent >= Decimal::ONE_HUNDRED {
            return Err(ConfigError::Invalid(format!(
                "price variation band must satisfy 0 < min <= max < 100 (got {}..{})",
                min_percent, max_percent
            )));
        }

        if self.stream_buffer == 0 {
            return Err(ConfigError::Invalid("MARKET_STREAM_BUFFER must be at least 1".into()));
        }

        if self.default_balance < Decimal::ZERO {
            return Err(ConfigError::Invalid("DEFAULT_BALANCE cannot be negative".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.variation.min_percent, dec!(0.5));
        assert_eq!(settings.variation.max_percent, dec!(2.0));
        assert_eq!(settings.price_update_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_inverted_band_is_rejected() {
        let settings = Settings {
            variation: VariationBand { min_percent: dec!(3), max_percent: dec!(1) },
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let settings = Settings {
            price_update_interval: Duration::ZERO,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
