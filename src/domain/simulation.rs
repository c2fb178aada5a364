// Simulation parameters and their validation
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TICK_INTERVAL_SECONDS: f64 = 5.0;
pub const DEFAULT_VOLATILITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid interval.")]
    InvalidInterval,
    #[error("Volatility must be 0–1.")]
    InvalidVolatility,
}

impl ConfigError {
    /// Name of the rejected input field.
    pub fn field(self) -> &'static str {
        match self {
            ConfigError::InvalidInterval => "interval",
            ConfigError::InvalidVolatility => "volatility",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationConfig {
    tick_interval_seconds: f64,
    volatility: f64,
}

impl SimulationConfig {
    /// Validates the interval first, then the volatility.
    pub fn new(tick_interval_seconds: f64, volatility: f64) -> Result<Self, ConfigError> {
        check_interval(tick_interval_seconds)?;
        if !(0.0..=1.0).contains(&volatility) {
            return Err(ConfigError::InvalidVolatility);
        }

        Ok(Self {
            tick_interval_seconds,
            volatility,
        })
    }

    /// Parses the raw text of the interval and volatility input fields.
    ///
    /// Each field is read up to the end of its leading number, so `"10s"` is 10.
    pub fn parse(interval: &str, volatility: &str) -> Result<Self, ConfigError> {
        let interval = parse_field(interval).ok_or(ConfigError::InvalidInterval)?;
        // Interval errors win even when both fields are bad.
        check_interval(interval)?;
        let volatility = parse_field(volatility).ok_or(ConfigError::InvalidVolatility)?;
        Self::new(interval, volatility)
    }

    pub fn tick_interval_seconds(&self) -> f64 {
        self.tick_interval_seconds
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_seconds)
    }
}

/// The interval has to be a positive real that still yields a non-zero timer period.
fn check_interval(seconds: f64) -> Result<(), ConfigError> {
    let valid = seconds.is_finite()
        && seconds > 0.0
        && Duration::try_from_secs_f64(seconds).is_ok_and(|period| !period.is_zero());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidInterval)
    }
}

fn parse_field(text: &str) -> Option<f64> {
    numeric_prefix(text.trim_start()).parse().ok()
}

/// Longest leading decimal literal: sign, digits, fraction, then an exponent if complete.
fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut end = digits_from(start);
    let mut mantissa_digits = end - start;
    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits_from(end + 1);
        mantissa_digits += fraction_end - end - 1;
        end = fraction_end;
    }
    if mantissa_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_end = digits_from(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }
    &text[..end]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: DEFAULT_TICK_INTERVAL_SECONDS,
            volatility: DEFAULT_VOLATILITY,
        }
    }
}
