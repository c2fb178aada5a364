// Parking lot layout domain model
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_ROW_CAPACITY: u32 = 50;

/// One lettered row of the lot, `A` through `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RowId(char);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("row id must be a single letter A-Z, got {0:?}")]
pub struct InvalidRowId(pub String);

impl RowId {
    pub fn new(letter: char) -> Option<Self> {
        let letter = letter.to_ascii_uppercase();
        letter.is_ascii_uppercase().then_some(Self(letter))
    }

    /// All 26 rows in display order.
    pub fn all() -> impl Iterator<Item = RowId> {
        ('A'..='Z').map(RowId)
    }

    pub fn letter(self) -> char {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for RowId {
    type Error = InvalidRowId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => RowId::new(c).ok_or_else(|| InvalidRowId(value.to_string())),
            _ => Err(InvalidRowId(value.to_string())),
        }
    }
}

impl TryFrom<String> for RowId {
    type Error = InvalidRowId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RowId::try_from(value.as_str())
    }
}

impl From<RowId> for String {
    fn from(row: RowId) -> Self {
        row.0.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCategory {
    Standard,
    Handicap,
    ElectricVehicle,
}

impl RowCategory {
    pub fn is_special(self) -> bool {
        self != RowCategory::Standard
    }

    /// Short badge text shown next to the row letter.
    pub fn badge(self) -> Option<&'static str> {
        match self {
            RowCategory::Standard => None,
            RowCategory::Handicap => Some("Handicap"),
            RowCategory::ElectricVehicle => Some("EV"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowState {
    pub capacity: u32,
    pub occupied: u32,
}

impl RowState {
    /// Builds a row, clamping `occupied` into `[0, capacity]`.
    pub fn new(capacity: u32, occupied: u32) -> Self {
        Self {
            capacity,
            occupied: occupied.min(capacity),
        }
    }

    pub fn vacant(&self) -> u32 {
        self.capacity - self.occupied
    }

    pub fn utilization_percent(&self) -> u32 {
        (100.0 * self.occupied as f64 / self.capacity as f64).round() as u32
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("row capacity must be positive")]
    ZeroCapacity,
    #[error("lot must contain at least one row")]
    NoRows,
    #[error("row {0} appears more than once")]
    DuplicateRow(RowId),
    #[error("special row {0} is not part of the lot")]
    UnknownSpecialRow(RowId),
    #[error("{rows} rows of {capacity} spaces exceed the supported lot size")]
    CapacityTooLarge { rows: usize, capacity: u32 },
}

/// Rows, shared capacity, and special-row designations of a lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotLayout {
    rows: Vec<RowId>,
    capacity: u32,
    special: BTreeMap<RowId, RowCategory>,
}

impl LotLayout {
    pub fn new(
        rows: Vec<RowId>,
        capacity: u32,
        special: BTreeMap<RowId, RowCategory>,
    ) -> Result<Self, LayoutError> {
        if capacity == 0 {
            return Err(LayoutError::ZeroCapacity);
        }
        if rows.is_empty() {
            return Err(LayoutError::NoRows);
        }
        for (i, row) in rows.iter().enumerate() {
            if rows[..i].contains(row) {
                return Err(LayoutError::DuplicateRow(*row));
            }
        }
        if let Some(row) = special.keys().find(|row| !rows.contains(row)) {
            return Err(LayoutError::UnknownSpecialRow(*row));
        }
        // Totals are summed in u32, so the whole lot has to fit.
        let total = u32::try_from(rows.len())
            .ok()
            .and_then(|count| count.checked_mul(capacity));
        if total.is_none() {
            return Err(LayoutError::CapacityTooLarge {
                rows: rows.len(),
                capacity,
            });
        }

        // Standard is the implicit category, don't store it.
        let special = special
            .into_iter()
            .filter(|(_, category)| category.is_special())
            .collect();

        Ok(Self {
            rows,
            capacity,
            special,
        })
    }

    /// A-Z rows with the given capacity, `handicap` and `electric_vehicle` rows marked.
    pub fn standard(
        capacity: u32,
        handicap: RowId,
        electric_vehicle: RowId,
    ) -> Result<Self, LayoutError> {
        let mut special = BTreeMap::new();
        special.insert(handicap, RowCategory::Handicap);
        if special.insert(electric_vehicle, RowCategory::ElectricVehicle).is_some() {
            return Err(LayoutError::DuplicateRow(electric_vehicle));
        }
        Self::new(RowId::all().collect(), capacity, special)
    }

    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn category(&self, row: RowId) -> RowCategory {
        self.special
            .get(&row)
            .copied()
            .unwrap_or(RowCategory::Standard)
    }

    pub fn is_special(&self, row: RowId) -> bool {
        self.category(row).is_special()
    }

    /// Special rows in category order (handicap before EV).
    pub fn special_rows(&self) -> Vec<(RowCategory, RowId)> {
        let mut rows: Vec<_> = self
            .special
            .iter()
            .map(|(row, category)| (*category, *row))
            .collect();
        rows.sort();
        rows
    }

    pub fn total_spaces(&self) -> u32 {
        self.rows.len() as u32 * self.capacity
    }
}

impl Default for LotLayout {
    fn default() -> Self {
        let mut special = BTreeMap::new();
        special.insert(RowId('Y'), RowCategory::Handicap);
        special.insert(RowId('Z'), RowCategory::ElectricVehicle);
        Self {
            rows: RowId::all().collect(),
            capacity: DEFAULT_ROW_CAPACITY,
            special,
        }
    }
}
