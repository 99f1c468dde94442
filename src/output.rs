use crate::error::Result;
use crate::reports::GeneratedPdf;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// A table whose columns are only known at runtime (section sheets,
/// cash-flow sheets, the LCRG table).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

pub fn write_grid_csv(path: &Path, grid: &Grid) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&grid.headers)?;
    for row in &grid.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Write a generated report into `dir`, returning the full path.
pub fn write_pdf(dir: &Path, pdf: &GeneratedPdf) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&pdf.file_name);
    fs::write(&path, &pdf.bytes)?;
    Ok(path)
}

pub fn table_string<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn grid_string(grid: &Grid, max_rows: usize) -> String {
    if grid.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(grid.headers.iter().cloned());
    for row in grid.rows.iter().take(max_rows) {
        builder.push_record(row.iter().cloned());
    }
    let mut s = builder.build().with(Style::markdown()).to_string();
    if grid.rows.len() > max_rows {
        s.push_str(&format!("\n... {} more row(s)", grid.rows.len() - max_rows));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_csv_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("grid.csv");
        let mut grid = Grid::new(vec!["Tower".into(), "Progress %".into()]);
        grid.push(vec!["I".into(), "42.50%".into()]);
        write_grid_csv(&path, &grid).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.get(1), Some("Progress %"));
        let first = rdr.records().next().unwrap().unwrap();
        assert_eq!(first.get(0), Some("I"));
    }

    #[test]
    fn grid_string_truncates() {
        let mut grid = Grid::new(vec!["A".into()]);
        for i in 0..5 {
            grid.push(vec![i.to_string()]);
        }
        let s = grid_string(&grid, 2);
        assert!(s.contains("3 more row(s)"));
        assert_eq!(grid_string(&Grid::default(), 2), "(no rows)");
    }
}
