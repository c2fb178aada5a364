use crate::application::session_registry::SessionDefaults;
use crate::domain::lot::{LotLayout, RowId};
use crate::domain::simulation::SimulationConfig;
use anyhow::Context;
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub lot: LotSettings,
    pub simulation: SimulationSettings,
    pub sessions: SessionSettings,
    pub presentation: PresentationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LotSettings {
    pub capacity: u32,
    pub handicap_row: String,
    pub electric_vehicle_row: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSettings {
    pub tick_interval_seconds: f64,
    pub volatility: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub max_sessions: usize,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresentationSettings {
    /// How long the front end shows a status message before clearing it.
    pub status_clear_ms: u64,
}

/// Defaults, then `config/parking.*` if present, then `PARKING__*` environment variables.
pub fn settings_builder() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    let builder = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("lot.capacity", 50_i64)?
        .set_default("lot.handicap_row", "Y")?
        .set_default("lot.electric_vehicle_row", "Z")?
        .set_default("simulation.tick_interval_seconds", 5.0)?
        .set_default("simulation.volatility", 0.9)?
        .set_default("sessions.max_sessions", 64_i64)?
        .set_default("sessions.idle_timeout_seconds", 900_i64)?
        .set_default("presentation.status_clear_ms", 2000_i64)?
        .add_source(config::File::with_name("config/parking").required(false))
        .add_source(
            config::Environment::with_prefix("PARKING")
                .prefix_separator("__")
                .separator("__"),
        );

    Ok(builder)
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = settings_builder()?
        .build()
        .context("Failed to read parking configuration")?;

    Ok(settings.try_deserialize()?)
}

impl Settings {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid server.bind address {:?}", self.server.bind))
    }

    /// Validated layout and simulation parameters for new sessions.
    pub fn session_defaults(&self) -> anyhow::Result<SessionDefaults> {
        let handicap = RowId::try_from(self.lot.handicap_row.as_str())
            .context("Invalid lot.handicap_row")?;
        let electric_vehicle = RowId::try_from(self.lot.electric_vehicle_row.as_str())
            .context("Invalid lot.electric_vehicle_row")?;
        let layout = LotLayout::standard(self.lot.capacity, handicap, electric_vehicle)
            .context("Invalid lot layout")?;

        let simulation = SimulationConfig::new(
            self.simulation.tick_interval_seconds,
            self.simulation.volatility,
        )
        .context("Invalid default simulation settings")?;

        anyhow::ensure!(
            self.sessions.max_sessions > 0,
            "sessions.max_sessions must be at least 1"
        );
        anyhow::ensure!(
            self.sessions.idle_timeout_seconds > 0,
            "sessions.idle_timeout_seconds must be at least 1"
        );

        Ok(SessionDefaults {
            layout,
            simulation,
            seed: self.simulation.seed,
            max_sessions: self.sessions.max_sessions,
            idle_timeout: Duration::from_secs(self.sessions.idle_timeout_seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn settings_from(toml: &str) -> Settings {
        settings_builder()
            .unwrap()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from("");
        assert_eq!(settings.bind_addr().unwrap().port(), 8080);
        assert_eq!(settings.presentation.status_clear_ms, 2000);
        assert_eq!(settings.simulation.seed, None);

        let defaults = settings.session_defaults().unwrap();
        assert_eq!(defaults.layout, LotLayout::default());
        assert_eq!(defaults.simulation, SimulationConfig::default());
        assert_eq!(defaults.max_sessions, 64);
        assert_eq!(defaults.idle_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_file_overrides() {
        let settings = settings_from(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [lot]
            capacity = 20
            handicap_row = "a"
            electric_vehicle_row = "B"

            [simulation]
            tick_interval_seconds = 1.5
            volatility = 0.3
            seed = 42

            [sessions]
            max_sessions = 4
            idle_timeout_seconds = 30
            "#,
        );

        assert_eq!(settings.bind_addr().unwrap().port(), 9000);
        let defaults = settings.session_defaults().unwrap();
        assert_eq!(defaults.layout.capacity(), 20);
        assert_eq!(defaults.layout.total_spaces(), 520);
        assert_eq!(defaults.simulation.tick_interval_seconds(), 1.5);
        assert_eq!(defaults.seed, Some(42));
        assert_eq!(defaults.max_sessions, 4);
        assert_eq!(defaults.idle_timeout, Duration::from_secs(30));
        assert!(defaults.layout.is_special(RowId::new('A').unwrap()));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let same_rows = settings_from("[lot]\nhandicap_row = \"Z\"");
        assert!(same_rows.session_defaults().is_err());

        let bad_row = settings_from("[lot]\nhandicap_row = \"7\"");
        assert!(bad_row.session_defaults().is_err());

        let bad_volatility = settings_from("[simulation]\nvolatility = 2.0");
        assert!(bad_volatility.session_defaults().is_err());

        let oversized_lot = settings_from("[lot]\ncapacity = 4000000000");
        assert!(oversized_lot.session_defaults().is_err());

        let no_sessions = settings_from("[sessions]\nmax_sessions = 0");
        assert!(no_sessions.session_defaults().is_err());

        let bad_bind = settings_from("[server]\nbind = \"nowhere\"");
        assert!(bad_bind.bind_addr().is_err());
    }
}
