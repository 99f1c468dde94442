// One immutable load of the progress workbook.
//
// Views receive `&Snapshot`; reloading builds a fresh one and swaps the
// `Arc` held by the controller. Nothing in here is mutated after `load`.
use crate::config::{DashboardConfig, SHEET_APARTMENTS, SHEET_LCRG};
use crate::error::Result;
use crate::loader::{load_apartments, load_lcrg, load_section, read_sheet, LoadReport, SheetTable};
use crate::sections::{aggregate, SectionAggregate, SectionSpec};
use crate::types::{ApartmentRecord, LcrgRow, Section, SectionSheet};
use chrono::{DateTime, Local};
use log::info;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub apartments: Vec<ApartmentRecord>,
    pub sections: BTreeMap<Section, SectionAggregate>,
    pub lcrg: Vec<LcrgRow>,
    pub report: LoadReport,
    pub lcrg_defaulted: usize,
    pub loaded_at: DateTime<Local>,
}

impl Snapshot {
    /// Read every sheet of the progress workbook. Any missing sheet or
    /// required column aborts the whole load.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let path = config.progress_workbook.as_path();
        info!("Loading progress workbook {}", path.display());
        let lcrg = read_sheet(path, SHEET_LCRG)?;
        let apartments = read_sheet(path, SHEET_APARTMENTS)?;
        let mut sections = Vec::with_capacity(Section::ALL.len());
        for section in Section::ALL {
            sections.push((section, read_sheet(path, section.sheet_name())?));
        }
        Self::from_tables(&lcrg, &apartments, &sections)
    }

    /// Build a snapshot from already-read sheets. Sections not supplied are
    /// aggregated from an empty sheet.
    pub fn from_tables(
        lcrg: &SheetTable,
        apartments: &SheetTable,
        sections: &[(Section, SheetTable)],
    ) -> Result<Self> {
        let (apartment_records, report) = load_apartments(apartments)?;
        let (lcrg_rows, lcrg_defaulted) = load_lcrg(lcrg)?;

        let mut aggregates = BTreeMap::new();
        for section in Section::ALL {
            let spec = SectionSpec::for_section(section);
            let agg = match sections.iter().find(|(s, _)| *s == section) {
                Some((_, table)) => aggregate(&spec, &load_section(section, table)?),
                None => aggregate(
                    &spec,
                    &SectionSheet {
                        section,
                        headers: Vec::new(),
                        rows: Vec::new(),
                    },
                ),
            };
            info!(
                "{}: {} row(s), project {:.2}%, {} defaulted cell(s)",
                section,
                agg.rows.len(),
                agg.project,
                agg.defaulted_cells
            );
            aggregates.insert(section, agg);
        }

        Ok(Self {
            apartments: apartment_records,
            sections: aggregates,
            lcrg: lcrg_rows,
            report,
            lcrg_defaulted,
            loaded_at: Local::now(),
        })
    }

    pub fn section(&self, section: Section) -> Option<&SectionAggregate> {
        self.sections.get(&section)
    }

    /// Distinct tower labels, sorted.
    pub fn towers(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.apartments.iter().map(|r| r.tower.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct floors, optionally within one tower.
    pub fn floors(&self, tower: Option<&str>) -> Vec<i32> {
        let set: BTreeSet<i32> = self
            .apartments
            .iter()
            .filter(|r| tower.map_or(true, |t| r.tower == t))
            .map(|r| r.floor)
            .collect();
        set.into_iter().collect()
    }

    /// Distinct apartment numbers within the tower/floor selection.
    pub fn apartment_numbers(&self, tower: Option<&str>, floor: Option<i32>) -> Vec<i64> {
        let set: BTreeSet<i64> = self
            .apartments
            .iter()
            .filter(|r| tower.map_or(true, |t| r.tower == t))
            .filter(|r| floor.map_or(true, |f| r.floor == f))
            .map(|r| r.apartment_no)
            .collect();
        set.into_iter().collect()
    }

    /// Defaulted cells across every sheet.
    pub fn cells_defaulted(&self) -> usize {
        self.report.defaulted_cells
            + self.lcrg_defaulted
            + self
                .sections
                .values()
                .map(|s| s.defaulted_cells)
                .sum::<usize>()
    }
}
