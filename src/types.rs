use crate::weights::ACTIVITY_COLS;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// One workbook cell after it has left calamine.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Number(f64),
    Text(String),
    Empty,
}

impl SheetCell {
    pub fn text(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() {
            SheetCell::Empty
        } else {
            SheetCell::Text(t.to_string())
        }
    }

    /// Render the cell the way a label column expects it (`3.0` prints as `3`).
    pub fn as_label(&self) -> String {
        match self {
            SheetCell::Number(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    format!("{}", f)
                }
            }
            SheetCell::Text(s) => s.trim().to_string(),
            SheetCell::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SheetCell::Empty)
    }
}

/// Whether a numeric value came from the sheet or was filled in for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellOutcome {
    Parsed(f64),
    Defaulted,
}

impl CellOutcome {
    pub fn value(self) -> f64 {
        match self {
            CellOutcome::Parsed(v) => v,
            CellOutcome::Defaulted => 0.0,
        }
    }

    pub fn is_defaulted(self) -> bool {
        matches!(self, CellOutcome::Defaulted)
    }
}

/// A non-apartment progress domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    External,
    Rooftop,
    GroundFloor,
    CommonArea,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::External,
        Section::Rooftop,
        Section::GroundFloor,
        Section::CommonArea,
    ];

    pub fn sheet_name(self) -> &'static str {
        match self {
            Section::External => "External Development",
            Section::Rooftop => "Roof top",
            Section::GroundFloor => "Ground Floor",
            Section::CommonArea => "Common Area",
        }
    }

    /// Directory name under the photo root, also used in report file names.
    pub fn dir_name(self) -> &'static str {
        match self {
            Section::External => "External",
            Section::Rooftop => "Rooftop",
            Section::GroundFloor => "GroundFloor",
            Section::CommonArea => "CommonArea",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::External => "External Development",
            Section::Rooftop => "Rooftop",
            Section::GroundFloor => "Ground Floor",
            Section::CommonArea => "Common Area",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentRecord {
    pub tower: String,
    pub apartment_no: i64,
    pub floor: i32,
    /// Completion fractions in [0, 1], indexed like `ACTIVITY_COLS`.
    pub activities: [f64; 12],
}

impl ApartmentRecord {
    pub fn activity(&self, name: &str) -> f64 {
        ACTIVITY_COLS
            .iter()
            .position(|a| *a == name)
            .map(|i| self.activities[i])
            .unwrap_or(0.0)
    }
}

static EMPTY_CELL: SheetCell = SheetCell::Empty;

/// A raw row of a section sheet, before any weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub tower: String,
    pub area: String,
    pub cells: Vec<(String, SheetCell)>,
}

impl SectionRow {
    /// Header lookup: exact first, then case-insensitive.
    pub fn cell(&self, column: &str) -> &SheetCell {
        self.cells
            .iter()
            .find(|(h, _)| h == column)
            .or_else(|| self.cells.iter().find(|(h, _)| h.eq_ignore_ascii_case(column)))
            .map(|(_, c)| c)
            .unwrap_or(&EMPTY_CELL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionSheet {
    pub section: Section,
    pub headers: Vec<String>,
    pub rows: Vec<SectionRow>,
}

/// How a section row takes part in aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    Item,
    Summary,
    Weight,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub tower: String,
    pub area: String,
    pub role: RowRole,
    /// Activity percentages on a 0–100 scale, in the section's activity order.
    pub activities: Vec<(String, f64)>,
    pub progress: f64,
}

/// A row of the LCRG landing sheet; every figure on a 0–100 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct LcrgRow {
    pub tower: String,
    pub area: String,
    pub components: Vec<(String, f64)>,
    pub progress: f64,
    pub structure: Option<f64>,
    pub finishes: Option<f64>,
}

impl LcrgRow {
    pub fn is_lcrg(&self) -> bool {
        self.area.to_lowercase().contains("lcrg")
    }
}

/// Sidebar-style filters; `None` means "All".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub tower: Option<String>,
    pub floor: Option<i32>,
    pub apartment: Option<i64>,
    pub activity: Option<String>,
}

impl Filters {
    pub fn matches(&self, r: &ApartmentRecord) -> bool {
        self.tower.as_deref().map_or(true, |t| r.tower == t)
            && self.floor.map_or(true, |f| r.floor == f)
            && self.apartment.map_or(true, |a| r.apartment_no == a)
    }

    pub fn matches_activity(&self, activity: &str) -> bool {
        match self.activity.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => activity.to_lowercase().contains(&q.to_lowercase()),
            _ => true,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ActivityComparisonRow {
    #[serde(rename = "Activity")]
    #[tabled(rename = "Activity")]
    pub activity: String,
    #[serde(rename = "Apt %")]
    #[tabled(rename = "Apt %")]
    pub apartment: String,
    #[serde(rename = "Floor %")]
    #[tabled(rename = "Floor %")]
    pub floor: String,
    #[serde(rename = "Tower %")]
    #[tabled(rename = "Tower %")]
    pub tower: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub band: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TowerKpiRow {
    #[serde(rename = "Scope")]
    #[tabled(rename = "Scope")]
    pub scope: String,
    #[serde(rename = "Progress %")]
    #[tabled(rename = "Progress %")]
    pub progress: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub band: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PhotoRow {
    #[serde(rename = "Folder")]
    #[tabled(rename = "Folder")]
    pub folder: String,
    #[serde(rename = "File")]
    #[tabled(rename = "File")]
    pub file: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DomainKpis {
    pub i: f64,
    pub l1: f64,
    pub l2: f64,
    pub project: f64,
}

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub generated_at: String,
    pub report_date: String,
    pub lcrg_overall: f64,
    pub apartments: DomainKpis,
    pub external_development: DomainKpis,
    pub rooftop: DomainKpis,
    pub ground_floor: DomainKpis,
    pub common_area: DomainKpis,
    pub apartments_loaded: usize,
    pub rows_dropped: usize,
    pub cells_defaulted: usize,
}
