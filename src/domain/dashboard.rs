// Dashboard state - per-row occupancy and the random walk that drives it
use super::lot::{LotLayout, RowId, RowState};
use super::simulation::{ConfigError, SimulationConfig};
use rand::Rng;

const STANDARD_BASE_RATE: f64 = 0.4;
const SPECIAL_BASE_RATE: f64 = 0.6;
const INITIAL_VARIABILITY: f64 = 0.3;
const INITIAL_CENTERING_OFFSET: f64 = 0.15;
const MIN_INITIAL_RATE: f64 = 0.05;
const MAX_INITIAL_RATE: f64 = 0.95;
/// Fraction of a row's capacity that full volatility can move it per tick.
const DRIFT_SCALE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    layout: LotLayout,
    rows: Vec<RowState>,
    announcement: String,
    config: SimulationConfig,
    ticks: u64,
}

impl DashboardState {
    /// Seeds every row with a randomized starting occupancy.
    pub fn initialize<R: Rng + ?Sized>(layout: LotLayout, rng: &mut R) -> Self {
        let capacity = layout.capacity();
        let rows = layout
            .rows()
            .iter()
            .map(|row| {
                let base = if layout.is_special(*row) {
                    SPECIAL_BASE_RATE
                } else {
                    STANDARD_BASE_RATE
                };
                let variability = rng.random::<f64>() * INITIAL_VARIABILITY;
                let rate = (base + variability - INITIAL_CENTERING_OFFSET)
                    .clamp(MIN_INITIAL_RATE, MAX_INITIAL_RATE);
                RowState::new(capacity, (capacity as f64 * rate).round() as u32)
            })
            .collect();

        Self {
            layout,
            rows,
            announcement: String::new(),
            config: SimulationConfig::default(),
            ticks: 0,
        }
    }

    /// Builds a state with explicit occupancies, clamped to capacity.
    pub fn with_occupancy(layout: LotLayout, occupied: impl Fn(RowId) -> u32) -> Self {
        let capacity = layout.capacity();
        let rows = layout
            .rows()
            .iter()
            .map(|row| RowState::new(capacity, occupied(*row)))
            .collect();

        Self {
            layout,
            rows,
            announcement: String::new(),
            config: SimulationConfig::default(),
            ticks: 0,
        }
    }

    /// Advances every row by one step of the random walk.
    ///
    /// One uniform draw is taken per row in layout order. All next values are
    /// computed from the pre-tick occupancies before any row is written.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let volatility = self.config.volatility();
        let next: Vec<u32> = self
            .rows
            .iter()
            .map(|row| step_occupancy(row.occupied, row.capacity, volatility, rng.random()))
            .collect();

        for (row, occupied) in self.rows.iter_mut().zip(next) {
            row.occupied = occupied;
        }
        self.ticks += 1;
    }

    /// Parses and applies new simulation parameters; on error the current config is kept.
    pub fn update_config(
        &mut self,
        interval: &str,
        volatility: &str,
    ) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig::parse(interval, volatility)?;
        self.config = config;
        Ok(config)
    }

    pub fn set_config(&mut self, config: SimulationConfig) {
        self.config = config;
    }

    pub fn set_announcement(&mut self, text: &str) {
        self.announcement = text.trim().to_string();
    }

    pub fn layout(&self) -> &LotLayout {
        &self.layout
    }

    /// Rows paired with their ids, in layout order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &RowState)> {
        self.layout.rows().iter().copied().zip(self.rows.iter())
    }

    pub fn row(&self, id: RowId) -> Option<&RowState> {
        self.layout
            .rows()
            .iter()
            .position(|row| *row == id)
            .map(|idx| &self.rows[idx])
    }

    pub fn announcement(&self) -> &str {
        &self.announcement
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn total_occupied(&self) -> u32 {
        self.rows.iter().map(|row| row.occupied).sum()
    }
}

/// One random-walk step for a single row. `draw` is a uniform value in `[0, 1)`.
pub fn step_occupancy(current: u32, capacity: u32, volatility: f64, draw: f64) -> u32 {
    let drift = (draw - 0.5) * (capacity as f64 * volatility * DRIFT_SCALE);
    let next = (current as f64 + drift).round();
    next.clamp(0.0, capacity as f64) as u32
}
