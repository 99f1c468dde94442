// Workbook loading.
//
// calamine does the file parsing; everything here is about turning loosely
// maintained sheets into typed records. Missing sheets or required columns are
// fatal. Bad individual cells are defaulted and counted in `LoadReport`.
use crate::error::{DashboardError, Result};
use crate::types::{ApartmentRecord, CellOutcome, LcrgRow, Section, SectionRow, SectionSheet, SheetCell};
use crate::util::{clean_percent_cell, extract_leading_int, normalize_fraction_column, parse_number};
use crate::weights::ACTIVITY_COLS;
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info};
use std::path::Path;

/// A sheet split into a header row and data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
}

impl SheetTable {
    /// Treat the first row as the header row.
    pub fn from_rows(name: &str, rows: Vec<Vec<SheetCell>>) -> Self {
        Self::with_header_row(name, rows, 0)
    }

    /// Use `header_idx` as the header row; rows above it are discarded.
    ///
    /// Blank header cells get pandas-style `Unnamed: N` names so they can
    /// be recognised and skipped later.
    pub fn with_header_row(name: &str, rows: Vec<Vec<SheetCell>>, header_idx: usize) -> Self {
        let mut iter = rows.into_iter().skip(header_idx);
        let headers = iter
            .next()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let label = c.as_label();
                if label.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    label
                }
            })
            .collect();
        let rows = iter
            .filter(|r| r.iter().any(|c| !c.is_empty()))
            .collect();
        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Column index by header; exact match first, then case-insensitive.
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    /// Headers that carry data, i.e. not the `Unnamed` placeholders.
    pub fn named_headers(&self) -> impl Iterator<Item = (usize, &String)> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.to_lowercase().starts_with("unnamed"))
    }

    fn require(&self, columns: &[&str]) -> Result<Vec<usize>> {
        let mut found = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for c in columns {
            match self.column(c) {
                Some(i) => found.push(i),
                None => missing.push(c.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(DashboardError::MissingColumns {
                sheet: self.name.clone(),
                columns: missing,
            })
        }
    }
}

fn cell_at(row: &[SheetCell], idx: usize) -> &SheetCell {
    static EMPTY: SheetCell = SheetCell::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

/// Convert a calamine cell into our own cell type.
pub fn cell_from_data(d: &Data) -> SheetCell {
    match d {
        Data::Float(f) => SheetCell::Number(*f),
        Data::Int(i) => SheetCell::Number(*i as f64),
        Data::Bool(b) => SheetCell::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => SheetCell::text(s),
        Data::DateTime(dt) => SheetCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => SheetCell::text(s),
        Data::Empty | Data::Error(_) => SheetCell::Empty,
    }
}

/// Names of every sheet in a workbook.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names().to_owned())
}

/// Read one sheet as raw rows of cells.
pub fn read_sheet_rows(path: &Path, sheet: &str) -> Result<Vec<Vec<SheetCell>>> {
    let mut workbook = open_workbook_auto(path)?;
    let name = workbook
        .sheet_names()
        .iter()
        .find(|n| n.trim() == sheet.trim())
        .cloned()
        .ok_or_else(|| DashboardError::MissingSheet {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        })?;
    let range = workbook.worksheet_range(&name)?;
    let rows: Vec<Vec<SheetCell>> = range
        .rows()
        .map(|r| r.iter().map(cell_from_data).collect())
        .collect();
    debug!("Read {} raw rows from '{}'", rows.len(), name);
    Ok(rows)
}

/// Read one sheet with its first row as header.
pub fn read_sheet(path: &Path, sheet: &str) -> Result<SheetTable> {
    let rows = read_sheet_rows(path, sheet)?;
    Ok(SheetTable::from_rows(sheet, rows))
}

/// What happened while loading the apartment sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub apartment_rows: usize,
    pub dropped_rows: usize,
    pub defaulted_cells: usize,
    pub rescaled_columns: Vec<String>,
    pub missing_activity_columns: Vec<String>,
}

/// Build apartment records from the "Apartment Progress" sheet.
///
/// - Rows with a non-numeric `Apartment No` are dropped.
/// - `Floor` keeps the first integer of its label, or 0.
/// - Each activity column is coerced to numbers, then rescaled to fractions
///   as a whole column when its maximum exceeds 1.5.
/// - Absent activity columns are a constant 0.
pub fn load_apartments(table: &SheetTable) -> Result<(Vec<ApartmentRecord>, LoadReport)> {
    let idx = table.require(&["Tower", "Floor", "Apartment No"])?;
    let (tower_i, floor_i, apt_i) = (idx[0], idx[1], idx[2]);
    let mut report = LoadReport::default();

    let mut kept: Vec<&Vec<SheetCell>> = Vec::new();
    let mut apt_numbers: Vec<i64> = Vec::new();
    for row in &table.rows {
        match parse_number(cell_at(row, apt_i)) {
            CellOutcome::Parsed(v) => {
                apt_numbers.push(v.trunc() as i64);
                kept.push(row);
            }
            CellOutcome::Defaulted => report.dropped_rows += 1,
        }
    }

    // Column-wise so the scale heuristic sees the whole column.
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(ACTIVITY_COLS.len());
    for activity in ACTIVITY_COLS {
        let Some(ci) = table.column(activity) else {
            report.missing_activity_columns.push(activity.to_string());
            columns.push(vec![0.0; kept.len()]);
            continue;
        };
        let mut values: Vec<f64> = kept
            .iter()
            .map(|row| {
                let outcome = parse_number(cell_at(row, ci));
                if outcome.is_defaulted() {
                    report.defaulted_cells += 1;
                }
                outcome.value()
            })
            .collect();
        if normalize_fraction_column(&mut values) {
            report.rescaled_columns.push(activity.to_string());
        }
        columns.push(values);
    }

    let records: Vec<ApartmentRecord> = kept
        .iter()
        .enumerate()
        .map(|(ri, row)| {
            let mut activities = [0.0; 12];
            for (ai, col) in columns.iter().enumerate() {
                activities[ai] = col[ri];
            }
            let floor_label = cell_at(row, floor_i).as_label();
            ApartmentRecord {
                tower: cell_at(row, tower_i).as_label(),
                apartment_no: apt_numbers[ri],
                floor: extract_leading_int(&floor_label).unwrap_or(0) as i32,
                activities,
            }
        })
        .collect();

    report.apartment_rows = records.len();
    info!(
        "Apartment sheet: {} rows kept, {} dropped, {} cells defaulted",
        report.apartment_rows, report.dropped_rows, report.defaulted_cells
    );
    Ok((records, report))
}

/// Keep the rows of a section sheet with their labelled cells.
///
/// Rows are not filtered here: which rows are items, summaries or weights is
/// the aggregation's call.
pub fn load_section(section: Section, table: &SheetTable) -> Result<SectionSheet> {
    let idx = table.require(&["Tower", "Area"])?;
    let (tower_i, area_i) = (idx[0], idx[1]);
    let named: Vec<(usize, String)> = table
        .named_headers()
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| SectionRow {
            tower: cell_at(row, tower_i).as_label(),
            area: cell_at(row, area_i).as_label(),
            cells: named
                .iter()
                .map(|(i, h)| (h.clone(), cell_at(row, *i).clone()))
                .collect(),
        })
        .collect::<Vec<_>>();

    debug!("{} sheet: {} rows", section, rows.len());
    Ok(SectionSheet {
        section,
        headers: named.into_iter().map(|(_, h)| h).collect(),
        rows,
    })
}

/// Component columns of the LCRG sheet, stored as fractions.
pub const LCRG_COMPONENTS: [&str; 6] = [
    "Apartment Progress",
    "External development",
    "Ground Floor",
    "Roof Top",
    "Common Area",
    "Cleaning",
];

/// Load the LCRG landing sheet. The weightage row is display-only and dropped.
///
/// Returns the rows and the number of cells that had to be defaulted.
pub fn load_lcrg(table: &SheetTable) -> Result<(Vec<LcrgRow>, usize)> {
    let idx = table.require(&["Area", "Progress %"])?;
    let (area_i, progress_i) = (idx[0], idx[1]);
    let tower_i = table.column("Tower");
    let structure_i = table.column("Structure");
    let finishes_i = table.column("Finishes");
    let components: Vec<(&str, usize)> = LCRG_COMPONENTS
        .iter()
        .filter_map(|c| table.column(c).map(|i| (*c, i)))
        .collect();

    let mut defaulted = 0usize;
    let mut percent = |cell: &SheetCell| {
        let outcome = clean_percent_cell(cell);
        if outcome.is_defaulted() {
            defaulted += 1;
        }
        outcome.value()
    };

    let mut rows = Vec::new();
    for row in &table.rows {
        let area = cell_at(row, area_i).as_label();
        if area.to_lowercase().contains("weight") {
            continue;
        }
        let component_values = components
            .iter()
            .map(|(name, i)| (name.to_string(), percent(cell_at(row, *i))))
            .collect();
        let progress = percent(cell_at(row, progress_i));
        let structure = structure_i
            .map(|i| cell_at(row, i))
            .filter(|c| !c.is_empty())
            .map(|c| clean_percent_cell(c).value());
        let finishes = finishes_i
            .map(|i| cell_at(row, i))
            .filter(|c| !c.is_empty())
            .map(|c| clean_percent_cell(c).value());
        rows.push(LcrgRow {
            tower: tower_i.map(|i| cell_at(row, i).as_label()).unwrap_or_default(),
            area,
            components: component_values,
            progress,
            structure,
            finishes,
        });
    }
    Ok((rows, defaulted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> SheetCell {
        SheetCell::text(s)
    }
    fn n(v: f64) -> SheetCell {
        SheetCell::Number(v)
    }

    #[test]
    fn apartments_drop_bad_numbers_and_rescale_columns() {
        let table = SheetTable::from_rows(
            "Apartment Progress",
            vec![
                vec![t("Tower "), t(" Floor"), t("Apartment No"), t("MEP Work"), t("Ceiling"), SheetCell::Empty],
                vec![t(" I "), t("Floor 03"), n(101.0), n(50.0), n(0.4), t("junk")],
                vec![t("I"), t("Floor 03"), t("Total"), n(100.0), n(1.0), SheetCell::Empty],
                vec![t("L1"), t("Ground"), t("205"), n(100.0), t("oops"), SheetCell::Empty],
            ],
        );
        let (records, report) = load_apartments(&table).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(records[0].tower, "I");
        assert_eq!(records[0].floor, 3);
        assert_eq!(records[0].apartment_no, 101);
        assert_eq!(records[1].floor, 0);
        assert_eq!(records[1].apartment_no, 205);
        // MEP Work was on a 0-100 scale, Ceiling already fractional.
        assert_eq!(records[0].activity("MEP Work"), 0.5);
        assert_eq!(records[1].activity("MEP Work"), 1.0);
        assert_eq!(records[0].activity("Ceiling"), 0.4);
        assert_eq!(records[1].activity("Ceiling"), 0.0);
        assert_eq!(report.rescaled_columns, vec!["MEP Work".to_string()]);
        assert_eq!(report.defaulted_cells, 1);
        assert!(report.missing_activity_columns.contains(&"Tile Work".to_string()));
        assert_eq!(records[0].activity("Tile Work"), 0.0);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let table = SheetTable::from_rows(
            "Apartment Progress",
            vec![vec![t("Tower"), t("MEP Work")], vec![t("I"), n(0.5)]],
        );
        let err = load_apartments(&table).unwrap_err();
        assert!(err.is_fatal_load());
        match err {
            DashboardError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["Floor".to_string(), "Apartment No".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lcrg_sheet_drops_weight_row() {
        let table = SheetTable::from_rows(
            "LCRG Progress",
            vec![
                vec![t("Tower"), t("Area"), t("Apartment Progress"), t("Progress %"), t("Unnamed: 9")],
                vec![SheetCell::Empty, t("Weightage"), n(0.6), n(1.0), SheetCell::Empty],
                vec![t("I"), t("I Tower"), n(0.5), n(0.42), SheetCell::Empty],
                vec![SheetCell::Empty, t("LCRG Overall"), n(0.45), t("40%"), SheetCell::Empty],
            ],
        );
        let (rows, defaulted) = load_lcrg(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(defaulted, 0);
        assert_eq!(rows[0].components, vec![("Apartment Progress".to_string(), 50.0)]);
        assert!((rows[0].progress - 42.0).abs() < 1e-9);
        assert!(rows[1].is_lcrg());
        assert_eq!(rows[1].progress, 40.0);
        assert_eq!(rows[1].structure, None);
    }

    #[test]
    fn section_sheet_skips_unnamed_columns() {
        let table = SheetTable::from_rows(
            "Common Area",
            vec![
                vec![t("Tower"), t("Area"), SheetCell::Empty, t("MEP")],
                vec![t("I"), t("Lobby"), n(9.0), n(0.5)],
            ],
        );
        let sheet = load_section(Section::CommonArea, &table).unwrap();
        assert_eq!(sheet.headers, vec!["Tower", "Area", "MEP"]);
        assert_eq!(sheet.rows[0].cell("mep"), &n(0.5));
        assert_eq!(sheet.rows[0].cell("Unnamed: 2"), &SheetCell::Empty);
    }
}
