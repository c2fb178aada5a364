// Snapshot of a session's state, handed to the persistence collaborator
use super::dashboard::DashboardState;
use super::lot::{RowCategory, RowId};
use super::simulation::SimulationConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub session_id: String,
    pub captured_at: DateTime<Utc>,
    pub tick: u64,
    pub announcement: String,
    pub simulation: SimulationConfig,
    pub rows: Vec<RowSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSnapshot {
    pub row: RowId,
    pub category: RowCategory,
    pub capacity: u32,
    pub occupied: u32,
}

impl DashboardSnapshot {
    pub fn capture(session_id: &str, state: &DashboardState, captured_at: DateTime<Utc>) -> Self {
        let rows = state
            .rows()
            .map(|(row, data)| RowSnapshot {
                row,
                category: state.layout().category(row),
                capacity: data.capacity,
                occupied: data.occupied,
            })
            .collect();

        Self {
            session_id: session_id.to_string(),
            captured_at,
            tick: state.ticks(),
            announcement: state.announcement().to_string(),
            simulation: *state.config(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::LotLayout;

    #[test]
    fn test_capture_serializes_rows() {
        let mut state = DashboardState::with_occupancy(LotLayout::default(), |_| 12);
        state.set_announcement("Row C repaving");
        let snapshot = DashboardSnapshot::capture("s-1", &state, Utc::now());

        assert_eq!(snapshot.rows.len(), 26);
        assert_eq!(snapshot.tick, 0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["announcement"], "Row C repaving");
        assert_eq!(json["rows"][0]["row"], "A");
        assert_eq!(json["rows"][0]["occupied"], 12);
        assert_eq!(json["rows"][25]["category"], "electric_vehicle");
        assert_eq!(json["simulation"]["volatility"], 0.9);
    }
}
