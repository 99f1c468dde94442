// Section progress (External, Rooftop, Ground Floor, Common Area).
//
// All four sections share one shape: classify rows, clean activity cells onto
// a 0–100 scale, take a weighted sum per row, overwrite summary rows with the
// mean of their tower's items, then blend the towers. `SectionSpec` carries the
// parts that differ.
use crate::aggregate::TowerProgress;
use crate::types::{RowRole, Section, SectionRecord, SectionRow, SectionSheet};
use crate::util::{average, clean_percent_cell, clean_weight_cell, round2};
use crate::weights::{
    common_area_weights, WeightTable, COMMON_AREA_ACTIVITIES, EXTERNAL_WEIGHTS,
    GROUND_FLOOR_ACTIVITIES, ROOFTOP_ACTIVITIES,
};
use log::debug;
use std::collections::HashMap;

/// Where a row's weights come from.
#[derive(Debug, Clone)]
pub enum WeightSource {
    /// One table for every row.
    Fixed(WeightTable),
    /// Chosen per row from the area label's discipline prefix.
    ByAreaPrefix,
    /// Each tower has its own weight row in the sheet.
    PerTowerRow,
    /// The first row of the sheet holds the weights for every tower.
    FirstRow,
}

/// Decides the role of a row from its position and area label.
pub type RowClassifier = fn(usize, &SectionRow) -> RowRole;

#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub section: Section,
    pub activities: Vec<&'static str>,
    pub weights: WeightSource,
    pub classify: RowClassifier,
    /// Order rows tower by tower with summary rows first.
    pub summary_first: bool,
}

fn has_tower(row: &SectionRow) -> bool {
    let t = row.tower.trim();
    !t.is_empty() && !t.eq_ignore_ascii_case("nan")
}

fn classify_external(_: usize, row: &SectionRow) -> RowRole {
    if !has_tower(row) {
        RowRole::Ignored
    } else if row.area.starts_with("External Development") {
        RowRole::Summary
    } else {
        RowRole::Item
    }
}

fn classify_rooftop(_: usize, row: &SectionRow) -> RowRole {
    let area = row.area.to_lowercase();
    if !has_tower(row) {
        RowRole::Ignored
    } else if area.contains("tower progress") {
        RowRole::Weight
    } else if area.contains("roof top") {
        RowRole::Item
    } else {
        RowRole::Ignored
    }
}

fn classify_ground_floor(index: usize, row: &SectionRow) -> RowRole {
    let area = row.area.to_lowercase();
    if index == 0 {
        RowRole::Weight
    } else if !has_tower(row) || matches!(area.as_str(), "i tower" | "l1 tower" | "l2 tower") {
        RowRole::Ignored
    } else if area.starts_with("ground floor") {
        RowRole::Summary
    } else {
        RowRole::Item
    }
}

fn classify_common_area(_: usize, row: &SectionRow) -> RowRole {
    let area = row.area.to_lowercase();
    if !has_tower(row) || area == "none" || area.is_empty() {
        RowRole::Ignored
    } else if area.contains("tower progress") {
        RowRole::Summary
    } else {
        RowRole::Item
    }
}

impl SectionSpec {
    pub fn external() -> Self {
        Self {
            section: Section::External,
            activities: EXTERNAL_WEIGHTS.iter().map(|(a, _)| *a).collect(),
            weights: WeightSource::Fixed(WeightTable::from_static(&EXTERNAL_WEIGHTS)),
            classify: classify_external,
            summary_first: true,
        }
    }

    pub fn rooftop() -> Self {
        Self {
            section: Section::Rooftop,
            activities: ROOFTOP_ACTIVITIES.to_vec(),
            weights: WeightSource::PerTowerRow,
            classify: classify_rooftop,
            summary_first: false,
        }
    }

    pub fn ground_floor() -> Self {
        Self {
            section: Section::GroundFloor,
            activities: GROUND_FLOOR_ACTIVITIES.to_vec(),
            weights: WeightSource::FirstRow,
            classify: classify_ground_floor,
            summary_first: false,
        }
    }

    pub fn common_area() -> Self {
        Self {
            section: Section::CommonArea,
            activities: COMMON_AREA_ACTIVITIES.to_vec(),
            weights: WeightSource::ByAreaPrefix,
            classify: classify_common_area,
            summary_first: false,
        }
    }

    pub fn for_section(section: Section) -> Self {
        match section {
            Section::External => Self::external(),
            Section::Rooftop => Self::rooftop(),
            Section::GroundFloor => Self::ground_floor(),
            Section::CommonArea => Self::common_area(),
        }
    }

    fn weight_table_from_row(&self, row: &SectionRow) -> WeightTable {
        WeightTable::new(
            self.activities
                .iter()
                .map(|a| (a.to_string(), clean_weight_cell(row.cell(a)).value()))
                .collect(),
        )
    }
}

/// Result of aggregating one section sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionAggregate {
    pub section: Section,
    pub activities: Vec<String>,
    /// Item and summary rows in display order.
    pub rows: Vec<SectionRecord>,
    pub towers: TowerProgress,
    pub project: f64,
    pub defaulted_cells: usize,
}

impl SectionAggregate {
    pub fn tower_rows<'a>(&'a self, tower: &'a str) -> impl Iterator<Item = &'a SectionRecord> + 'a {
        self.rows.iter().filter(move |r| r.tower == tower)
    }

    /// Progress of the tower's own rows: items, or summaries when a tower has no items.
    pub fn tower_value(&self, tower: &str) -> f64 {
        tower_kpi(&self.rows, tower)
    }
}

fn tower_kpi(rows: &[SectionRecord], tower: &str) -> f64 {
    let items: Vec<f64> = rows
        .iter()
        .filter(|r| r.tower == tower && r.role == RowRole::Item)
        .map(|r| r.progress)
        .collect();
    if !items.is_empty() {
        return average(&items);
    }
    let summaries: Vec<f64> = rows
        .iter()
        .filter(|r| r.tower == tower && r.role == RowRole::Summary)
        .map(|r| r.progress)
        .collect();
    average(&summaries)
}

/// Run the section pipeline over one sheet.
pub fn aggregate(spec: &SectionSpec, sheet: &SectionSheet) -> SectionAggregate {
    let roles: Vec<RowRole> = sheet
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| (spec.classify)(i, r))
        .collect();

    // Resolve weights up front; rows never see a half-built table.
    let mut per_tower: HashMap<String, WeightTable> = HashMap::new();
    let mut shared: Option<WeightTable> = None;
    for (row, role) in sheet.rows.iter().zip(&roles) {
        if *role != RowRole::Weight {
            continue;
        }
        match spec.weights {
            WeightSource::PerTowerRow => {
                per_tower
                    .entry(row.tower.trim().to_string())
                    .or_insert_with(|| spec.weight_table_from_row(row));
            }
            WeightSource::FirstRow => {
                shared.get_or_insert_with(|| spec.weight_table_from_row(row));
            }
            WeightSource::Fixed(_) | WeightSource::ByAreaPrefix => {}
        }
    }

    let mut defaulted_cells = 0usize;
    let mut rows: Vec<(usize, SectionRecord)> = Vec::new();
    for (idx, (row, role)) in sheet.rows.iter().zip(&roles).enumerate() {
        if !matches!(role, RowRole::Item | RowRole::Summary) {
            continue;
        }
        let activities: Vec<(String, f64)> = spec
            .activities
            .iter()
            .map(|a| {
                let outcome = clean_percent_cell(row.cell(a));
                if outcome.is_defaulted() {
                    defaulted_cells += 1;
                }
                (a.to_string(), outcome.value())
            })
            .collect();

        let tower = row.tower.trim().to_string();
        let table = match &spec.weights {
            WeightSource::Fixed(t) => t.clone(),
            WeightSource::ByAreaPrefix => common_area_weights(&row.area),
            WeightSource::PerTowerRow => per_tower.get(&tower).cloned().unwrap_or_default(),
            WeightSource::FirstRow => shared.clone().unwrap_or_default(),
        };
        let progress = round2(table.weighted_sum(|name| {
            activities
                .iter()
                .find(|(a, _)| a == name)
                .map(|(_, v)| *v)
                .unwrap_or(0.0)
        }));

        rows.push((
            idx,
            SectionRecord {
                tower,
                area: row.area.trim().to_string(),
                role: *role,
                activities,
                progress,
            },
        ));
    }

    overwrite_summaries(&mut rows);

    if spec.summary_first {
        rows.sort_by(|(ia, a), (ib, b)| {
            a.tower
                .cmp(&b.tower)
                .then_with(|| (a.role != RowRole::Summary).cmp(&(b.role != RowRole::Summary)))
                .then_with(|| a.area.cmp(&b.area))
                .then_with(|| ia.cmp(ib))
        });
    }
    let rows: Vec<SectionRecord> = rows.into_iter().map(|(_, r)| r).collect();

    let towers = TowerProgress::from_lookup(|t| Some(tower_kpi(&rows, t)));
    debug!(
        "{}: {} rows, towers I={:.2} L1={:.2} L2={:.2}",
        spec.section,
        rows.len(),
        towers.i,
        towers.l1,
        towers.l2
    );
    SectionAggregate {
        section: spec.section,
        activities: spec.activities.iter().map(|a| a.to_string()).collect(),
        project: towers.project(),
        towers,
        rows,
        defaulted_cells,
    }
}

/// Replace each summary row's progress with the mean of its tower's items.
///
/// A tower without item rows keeps its summary's own weighted value.
fn overwrite_summaries(rows: &mut [(usize, SectionRecord)]) {
    let mut item_progress: HashMap<String, Vec<f64>> = HashMap::new();
    for (_, r) in rows.iter() {
        if r.role == RowRole::Item {
            item_progress.entry(r.tower.clone()).or_default().push(r.progress);
        }
    }
    for (_, r) in rows.iter_mut() {
        if r.role != RowRole::Summary {
            continue;
        }
        if let Some(items) = item_progress.get(&r.tower) {
            r.progress = round2(average(items));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SheetCell;

    fn row(tower: &str, area: &str, cells: &[(&str, SheetCell)]) -> SectionRow {
        SectionRow {
            tower: tower.to_string(),
            area: area.to_string(),
            cells: cells.iter().map(|(h, c)| (h.to_string(), c.clone())).collect(),
        }
    }

    fn sheet(section: Section, rows: Vec<SectionRow>) -> SectionSheet {
        SectionSheet {
            section,
            headers: vec![],
            rows,
        }
    }

    fn n(v: f64) -> SheetCell {
        SheetCell::Number(v)
    }

    #[test]
    fn external_summary_is_mean_of_items() {
        let s = sheet(
            Section::External,
            vec![
                row("I", "External Development I", &[("MEP Work", n(1.0))]),
                row("I", "Boundary wall", &[("Civil Finishes Work", n(1.0))]),
                row("I", "Landscaping", &[("MS/MEP Fixtures", n(0.5))]),
                row("L1", "Road", &[("cleaning", SheetCell::text("100%"))]),
                row("", "Notes", &[]),
            ],
        );
        let agg = aggregate(&SectionSpec::external(), &s);
        assert_eq!(agg.rows.len(), 4);
        // Summary first within tower I.
        assert_eq!(agg.rows[0].role, RowRole::Summary);
        assert_eq!(agg.rows[0].area, "External Development I");
        // Items: 50.0 and 12.5
        assert!((agg.rows[0].progress - 31.25).abs() < 0.01);
        assert!((agg.towers.i - 31.25).abs() < 0.01);
        assert!((agg.towers.l1 - 5.0).abs() < 0.01);
        assert_eq!(agg.towers.l2, 0.0);
        assert!((agg.project - (31.25 * 0.4 + 5.0 * 0.3)).abs() < 0.01);
    }

    #[test]
    fn common_area_picks_weights_by_discipline() {
        let cells = [("Civil Works", n(1.0))];
        let s = sheet(
            Section::CommonArea,
            vec![
                row("I", "Civil Work Block A", &cells),
                row("I", "Lobby", &cells),
                row("I", "I Tower Progress", &cells),
            ],
        );
        let agg = aggregate(&SectionSpec::common_area(), &s);
        assert_eq!(agg.rows[0].progress, 65.0);
        assert_eq!(agg.rows[1].progress, 20.0);
        assert_eq!(agg.rows[2].role, RowRole::Summary);
        assert_eq!(agg.rows[2].progress, 42.5);
        assert_eq!(agg.towers.i, 42.5);
    }

    #[test]
    fn rooftop_uses_each_towers_weight_row() {
        let s = sheet(
            Section::Rooftop,
            vec![
                row("I", "I Tower Progress", &[("Pool Works", n(0.5)), ("Cleaning", n(0.5))]),
                row("L1", "L1 Tower Progress", &[("Pool Works", n(1.0))]),
                row("I", "Roof Top I", &[("Pool Works", n(1.0)), ("Cleaning", n(0.5))]),
                row("L1", "Roof Top L1", &[("Pool Works", n(0.4))]),
                row("L1", "Parapet", &[("Pool Works", n(1.0))]),
            ],
        );
        let agg = aggregate(&SectionSpec::rooftop(), &s);
        assert_eq!(agg.rows.len(), 2);
        assert_eq!(agg.towers.i, 75.0);
        assert_eq!(agg.towers.l1, 40.0);
    }

    #[test]
    fn ground_floor_reads_weights_from_first_row() {
        let s = sheet(
            Section::GroundFloor,
            vec![
                row("", "Weightage", &[("MEP Work", n(0.6)), ("Ceiling", SheetCell::text("40%"))]),
                row("I", "I Tower", &[("MEP Work", n(1.0))]),
                row("I", "Ground Floor I", &[]),
                row("I", "Lobby", &[("MEP Work", n(1.0)), ("Ceiling", n(0.5))]),
                row("I", "Shops", &[("MEP Work", SheetCell::text("bad"))]),
            ],
        );
        let agg = aggregate(&SectionSpec::ground_floor(), &s);
        let roles: Vec<RowRole> = agg.rows.iter().map(|r| r.role).collect();
        assert_eq!(roles, vec![RowRole::Summary, RowRole::Item, RowRole::Item]);
        assert_eq!(agg.rows[1].progress, 80.0);
        assert_eq!(agg.rows[2].progress, 0.0);
        assert_eq!(agg.rows[0].progress, 40.0);
        assert_eq!(agg.towers.i, 40.0);
        assert!(agg.defaulted_cells > 0);
    }

    #[test]
    fn ground_floor_percent_weight_is_a_fraction() {
        let s = sheet(
            Section::GroundFloor,
            vec![
                row("", "Weightage", &[("MEP Work", SheetCell::text("40%"))]),
                row("L1", "Lobby", &[("MEP Work", n(1.0))]),
            ],
        );
        let agg = aggregate(&SectionSpec::ground_floor(), &s);
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].progress, 40.0);
        assert_eq!(agg.towers.l1, 40.0);
    }

    #[test]
    fn empty_sheet_gives_zeros() {
        let agg = aggregate(&SectionSpec::common_area(), &sheet(Section::CommonArea, vec![]));
        assert!(agg.rows.is_empty());
        assert_eq!(agg.project, 0.0);
        assert!(!agg.project.is_nan());
    }
}
