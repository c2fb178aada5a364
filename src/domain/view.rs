// Dashboard view - read-only projection of the dashboard state
use super::dashboard::DashboardState;
use super::lot::{RowCategory, RowId};
use super::simulation::SimulationConfig;
use serde::Serialize;

pub const BASE_SUBTITLE: &str = "Live status of the simulated parking lot";
const SUBTITLE_DELIMITER: &str = " — ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub subtitle: String,
    pub total_spaces: u32,
    pub total_occupied: u32,
    pub total_vacant: u32,
    pub utilization_percent: u32,
    pub rows: Vec<RowView>,
    pub special_rows: Vec<SpecialRowSummary>,
    pub simulation: SimulationConfig,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub row: RowId,
    pub category: RowCategory,
    pub badge: Option<&'static str>,
    pub capacity: u32,
    pub occupied: u32,
    pub vacant: u32,
    pub utilization_percent: u32,
}

/// Dedicated counter for a handicap or EV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialRowSummary {
    pub category: RowCategory,
    pub row: RowId,
    pub capacity: u32,
    pub occupied: u32,
}

impl DashboardView {
    pub fn derive(state: &DashboardState) -> Self {
        let layout = state.layout();
        let total_spaces = layout.total_spaces();
        let total_occupied = state.total_occupied();

        let rows = state
            .rows()
            .map(|(row, data)| {
                let category = layout.category(row);
                RowView {
                    row,
                    category,
                    badge: category.badge(),
                    capacity: data.capacity,
                    occupied: data.occupied,
                    vacant: data.vacant(),
                    utilization_percent: data.utilization_percent(),
                }
            })
            .collect();

        let special_rows = layout
            .special_rows()
            .into_iter()
            .filter_map(|(category, row)| {
                state.row(row).map(|data| SpecialRowSummary {
                    category,
                    row,
                    capacity: data.capacity,
                    occupied: data.occupied,
                })
            })
            .collect();

        Self {
            subtitle: subtitle(state.announcement()),
            total_spaces,
            total_occupied,
            total_vacant: total_spaces - total_occupied,
            utilization_percent: (100.0 * total_occupied as f64 / total_spaces as f64).round()
                as u32,
            rows,
            special_rows,
            simulation: *state.config(),
            tick: state.ticks(),
        }
    }

    pub fn special(&self, category: RowCategory) -> Option<&SpecialRowSummary> {
        self.special_rows.iter().find(|s| s.category == category)
    }
}

fn subtitle(announcement: &str) -> String {
    if announcement.is_empty() {
        format!("{BASE_SUBTITLE}.")
    } else {
        format!("{BASE_SUBTITLE}{SUBTITLE_DELIMITER}{announcement}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::LotLayout;

    fn fixed_state() -> DashboardState {
        let layout = LotLayout::default();
        let special: Vec<RowId> = layout.special_rows().into_iter().map(|(_, row)| row).collect();
        DashboardState::with_occupancy(layout, |row| if special.contains(&row) { 40 } else { 20 })
    }

    #[test]
    fn test_derive_totals_and_utilization() {
        let view = DashboardView::derive(&fixed_state());

        assert_eq!(view.total_spaces, 1300);
        assert_eq!(view.total_occupied, 2 * 40 + 24 * 20);
        assert_eq!(view.total_vacant, 1300 - 560);
        assert_eq!(view.utilization_percent, 43);
        assert_eq!(view.rows.len(), 26);

        for row in &view.rows {
            if row.category.is_special() {
                assert_eq!(row.utilization_percent, 80);
                assert_eq!(row.vacant, 10);
            } else {
                assert_eq!(row.utilization_percent, 40);
                assert_eq!(row.vacant, 30);
                assert_eq!(row.badge, None);
            }
        }
    }

    #[test]
    fn test_derive_special_summary() {
        let view = DashboardView::derive(&fixed_state());

        let handicap = view.special(RowCategory::Handicap).unwrap();
        assert_eq!(handicap.row.letter(), 'Y');
        assert_eq!((handicap.capacity, handicap.occupied), (50, 40));

        let electric = view.special(RowCategory::ElectricVehicle).unwrap();
        assert_eq!(electric.row.letter(), 'Z');
        assert_eq!((electric.capacity, electric.occupied), (50, 40));

        assert!(view.special(RowCategory::Standard).is_none());
        assert_eq!(view.rows[24].badge, Some("Handicap"));
        assert_eq!(view.rows[25].badge, Some("EV"));
    }

    #[test]
    fn test_subtitle_follows_announcement() {
        let mut state = fixed_state();
        assert_eq!(
            DashboardView::derive(&state).subtitle,
            "Live status of the simulated parking lot."
        );

        state.set_announcement("  Lot closing early  ");
        let subtitle = DashboardView::derive(&state).subtitle;
        assert!(subtitle.contains("Lot closing early"));
        assert!(!subtitle.contains("  Lot closing early"));
        assert!(subtitle.ends_with("Lot closing early"));
        assert_eq!(
            subtitle,
            "Live status of the simulated parking lot — Lot closing early"
        );

        state.set_announcement("");
        assert_eq!(
            DashboardView::derive(&state).subtitle,
            "Live status of the simulated parking lot."
        );
    }

    #[test]
    fn test_derive_does_not_mutate() {
        let state = fixed_state();
        let before = state.clone();
        let first = DashboardView::derive(&state);
        let second = DashboardView::derive(&state);
        assert_eq!(first, second);
        assert_eq!(state, before);
    }
}
