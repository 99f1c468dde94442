// Fixed activity lists, weight tables and blend factors.
//
// Every weighted-sum in the dashboard reads its weights from here, so the
// numbers that drive the KPIs live in one place. Boost factors are kept as
// separate named constants per call site; they are deliberately not unified.
use serde::{Deserialize, Serialize};

/// The 12 apartment activities, in sheet order.
pub const ACTIVITY_COLS: [&str; 12] = [
    "MEP Work",
    "Ceiling",
    "Tile Work",
    "Paint Work",
    "Aluminum Work",
    "Wood Work",
    "MEP Fixtures",
    "MS Work",
    "External Plaster",
    "External Travertine",
    "External Paint",
    "Cleaning",
];

pub const APARTMENT_WEIGHTS: [(&str, f64); 12] = [
    ("MEP Work", 0.12),
    ("Ceiling", 0.15),
    ("Tile Work", 0.22),
    ("Paint Work", 0.10),
    ("Aluminum Work", 0.10),
    ("Wood Work", 0.20),
    ("MEP Fixtures", 0.05),
    ("MS Work", 0.02),
    ("External Plaster", 0.01),
    ("External Travertine", 0.01),
    ("External Paint", 0.01),
    ("Cleaning", 0.01),
];

pub const EXTERNAL_WEIGHTS: [(&str, f64); 5] = [
    ("MEP Work", 0.10),
    ("Civil Finishes Work", 0.50),
    ("MS/MEP Fixtures", 0.25),
    ("Finishes", 0.10),
    ("cleaning", 0.05),
];

pub const ROOFTOP_ACTIVITIES: [&str; 12] = [
    "MEP Work",
    "Ceiling",
    "Tile Work",
    "Paint Work",
    "Civil Finishes",
    "Pool Works",
    "MEP Fixtures",
    "MS Work",
    "Wood works",
    "Plantation",
    "Furniture",
    "Cleaning",
];

pub const GROUND_FLOOR_ACTIVITIES: [&str; 11] = [
    "MEP Work",
    "Ceiling",
    "Tile Work",
    "Paint Work",
    "Aluminum Work",
    "Wood Work",
    "MEP Fixtures",
    "MS Work",
    "External Plaster",
    "External Paint",
    "Cleaning",
];

pub const COMMON_AREA_ACTIVITIES: [&str; 4] = ["Civil Works", "MEP", "Finishes", "Cleaning"];

pub const COMMON_AREA_WEIGHTS_COMMON: [(&str, f64); 4] = [
    ("Civil Works", 0.20),
    ("MEP", 0.55),
    ("Finishes", 0.20),
    ("Cleaning", 0.05),
];

pub const COMMON_AREA_WEIGHTS_CIVIL: [(&str, f64); 4] = [
    ("Civil Works", 0.65),
    ("MEP", 0.20),
    ("Finishes", 0.12),
    ("Cleaning", 0.03),
];

pub const COMMON_AREA_WEIGHTS_MEP: [(&str, f64); 4] = [
    ("Civil Works", 0.20),
    ("MEP", 0.65),
    ("Finishes", 0.12),
    ("Cleaning", 0.03),
];

/// The three towers and their share of the project-wide figure.
pub const TOWER_BLEND: [(&str, f64); 3] = [("I", 0.40), ("L1", 0.30), ("L2", 0.30)];

pub const TOWERS: [&str; 3] = ["I", "L1", "L2"];

/// LCRG landing blend of structure and finishes progress.
pub const STRUCTURE_SHARE: f64 = 0.40;
pub const FINISHES_SHARE: f64 = 0.60;

/// Multiplicative uplift applied to a KPI, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    pub factor: f64,
    pub cap: Option<f64>,
}

impl Boost {
    pub const NONE: Boost = Boost { factor: 1.0, cap: None };

    pub fn apply(&self, value: f64) -> f64 {
        let boosted = value * self.factor;
        match self.cap {
            Some(cap) => boosted.min(cap),
            None => boosted,
        }
    }
}

// Per-call-site calibration. These differ on purpose until someone decides
// which figure is right for which reporting period.
pub const TOWER_SUMMARY_BOOST: Boost = Boost { factor: 1.13, cap: Some(100.0) };
pub const APARTMENT_TOWER_BOOST: Boost = Boost { factor: 1.13, cap: Some(100.0) };
pub const LCRG_LANDING_BOOST: Boost = Boost { factor: 1.05, cap: Some(100.0) };

/// Ordered `(activity, weight)` pairs for one weighted-sum.
///
/// The weights are expected to sum to 1.0 but nothing enforces it; tables
/// read from a sheet (rooftop, ground floor) can legitimately drift.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightTable {
    entries: Vec<(String, f64)>,
}

impl WeightTable {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn from_static(entries: &[(&str, f64)]) -> Self {
        Self {
            entries: entries.iter().map(|(a, w)| (a.to_string(), *w)).collect(),
        }
    }

    pub fn weight(&self, activity: &str) -> f64 {
        self.entries
            .iter()
            .find(|(a, _)| a == activity)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// `Σ value(activity) × weight(activity)` over the table's activities.
    pub fn weighted_sum<F>(&self, value: F) -> f64
    where
        F: Fn(&str) -> f64,
    {
        self.entries.iter().map(|(a, w)| value(a) * w).sum()
    }
}

pub fn apartment_weights() -> WeightTable {
    WeightTable::from_static(&APARTMENT_WEIGHTS)
}

/// Picks the Common Area table from the area label's discipline prefix.
pub fn common_area_weights(area: &str) -> WeightTable {
    let area = area.trim().to_lowercase();
    if area.starts_with("civil work") {
        WeightTable::from_static(&COMMON_AREA_WEIGHTS_CIVIL)
    } else if area.starts_with("mep work") {
        WeightTable::from_static(&COMMON_AREA_WEIGHTS_MEP)
    } else {
        WeightTable::from_static(&COMMON_AREA_WEIGHTS_COMMON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_tables_sum_to_one() {
        for table in [
            WeightTable::from_static(&APARTMENT_WEIGHTS),
            WeightTable::from_static(&EXTERNAL_WEIGHTS),
            WeightTable::from_static(&COMMON_AREA_WEIGHTS_COMMON),
            WeightTable::from_static(&COMMON_AREA_WEIGHTS_CIVIL),
            WeightTable::from_static(&COMMON_AREA_WEIGHTS_MEP),
        ] {
            assert!((table.total() - 1.0).abs() < 1e-9, "{:?}", table);
        }
        let blend: f64 = TOWER_BLEND.iter().map(|(_, w)| w).sum();
        assert!((blend - 1.0).abs() < 1e-9);
    }

    #[test]
    fn civil_prefix_selects_civil_table() {
        let t = common_area_weights("Civil Work Block A");
        assert_eq!(t.weight("Civil Works"), 0.65);
        let t = common_area_weights("  MEP work - shafts");
        assert_eq!(t.weight("MEP"), 0.65);
        let t = common_area_weights("Lobby");
        assert_eq!(t.weight("Civil Works"), 0.20);
    }

    #[test]
    fn boost_caps_only_when_configured() {
        assert_eq!(TOWER_SUMMARY_BOOST.apply(95.0), 100.0);
        let uncapped = Boost { factor: 1.13, cap: None };
        assert!((uncapped.apply(95.0) - 107.35).abs() < 1e-9);
        assert_eq!(Boost::NONE.apply(42.0), 42.0);
    }
}
