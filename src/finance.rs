// Cash-flow and site-documentation workbooks.
//
// Neither workbook has its header on the first row; the header row is found by
// scanning for characteristic labels. Sheets without a recognisable header are
// skipped for cash flow. For site documentation they are an error.
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::loader::{read_sheet_rows, sheet_names, SheetTable};
use crate::types::SheetCell;
use crate::util::{format_number, normalize_header};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

static NAME_TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_\-]+").expect("static regex"));

/// Index of the first row for which `is_header` holds on its normalized labels.
pub fn locate_header_row<F>(rows: &[Vec<SheetCell>], is_header: F) -> Option<usize>
where
    F: Fn(&[String]) -> bool,
{
    rows.iter().position(|row| {
        let labels: Vec<String> = row
            .iter()
            .map(|c| normalize_header(&c.as_label()))
            .filter(|l| !l.is_empty())
            .collect();
        !labels.is_empty() && is_header(&labels)
    })
}

/// Cash-flow header: some cell mentions "area".
pub fn is_cash_flow_header(labels: &[String]) -> bool {
    labels.iter().any(|l| l.contains("area"))
}

/// Site-documentation header: an "Sr"-style serial column and an "IR Status" column.
pub fn is_site_docs_header(labels: &[String]) -> bool {
    let has_sr = labels.iter().any(|l| l.starts_with("sr"));
    let has_ir = labels.iter().any(|l| l.contains("irstatus"));
    has_sr && has_ir
}

/// Cash-flow sheets hold a per-tower "summary" or "finishes" table.
fn is_cash_flow_sheet(name: &str, tower: Option<&str>) -> bool {
    let lower = name.to_lowercase();
    if !(lower.contains("summary") || lower.contains("finishes")) {
        return false;
    }
    match tower {
        None => true,
        Some(t) => NAME_TOKENS
            .split(name.trim())
            .any(|tok| tok.eq_ignore_ascii_case(t.trim())),
    }
}

/// Load every cash-flow sheet, optionally for one tower only.
pub fn load_cash_flow(path: &Path, tower: Option<&str>) -> Result<Vec<SheetTable>> {
    let mut tables = Vec::new();
    for name in sheet_names(path)? {
        if !is_cash_flow_sheet(&name, tower) {
            continue;
        }
        let rows = read_sheet_rows(path, &name)?;
        match locate_header_row(&rows, is_cash_flow_header) {
            Some(idx) => tables.push(SheetTable::with_header_row(&name, rows, idx)),
            None => warn!("No 'Area' header row in cash-flow sheet '{}'; skipped", name),
        }
    }
    info!("Loaded {} cash-flow sheet(s) from {}", tables.len(), path.display());
    Ok(tables)
}

/// Load the site-documentation register from the first sheet with a matching header.
pub fn load_site_documents(path: &Path) -> Result<SheetTable> {
    let names = sheet_names(path)?;
    for name in &names {
        let rows = read_sheet_rows(path, name)?;
        if let Some(idx) = locate_header_row(&rows, is_site_docs_header) {
            let table = SheetTable::with_header_row(name, rows, idx);
            info!("Loaded {} site document row(s) from '{}'", table.rows.len(), name);
            return Ok(table);
        }
    }
    Err(DashboardError::MissingColumns {
        sheet: names.first().cloned().unwrap_or_default(),
        columns: vec!["Sr".to_string(), "IR Status".to_string()],
    })
}

/// Number of documents per IR status, empty statuses counted as "Pending".
pub fn ir_status_counts(table: &SheetTable) -> Vec<(String, usize)> {
    let Some(col) = table
        .headers
        .iter()
        .position(|h| normalize_header(h).contains("irstatus"))
    else {
        return Vec::new();
    };
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in &table.rows {
        let label = row.get(col).map(|c| c.as_label()).unwrap_or_default();
        let label = if label.is_empty() { "Pending".to_string() } else { label };
        *counts.entry(label).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Display form of a sheet row: numbers with thousands separators.
pub fn display_row(row: &[SheetCell], width: usize) -> Vec<String> {
    (0..width)
        .map(|i| match row.get(i) {
            Some(SheetCell::Number(v)) => format_number(*v, 2),
            Some(SheetCell::Text(s)) => s.clone(),
            _ => String::new(),
        })
        .collect()
}

/// Gate for the financial view.
///
/// With no password configured the view stays locked.
pub fn check_password(config: &DashboardConfig, attempt: &str) -> Result<()> {
    match config.finance_password.as_deref() {
        Some(expected) if !expected.is_empty() && expected == attempt => Ok(()),
        Some(_) => Err(DashboardError::AccessDenied("incorrect finance password".into())),
        None => Err(DashboardError::AccessDenied("no finance password configured".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<SheetCell> {
        cells.iter().map(|c| SheetCell::text(c)).collect()
    }

    #[test]
    fn cash_flow_header_found_below_title_rows() {
        let rows = vec![
            row(&["LAKE CITY ROOF GARDENS"]),
            row(&["Cash Flow - I Tower"]),
            row(&[]),
            row(&["Sr", "Area Description", "Budget", "Paid"]),
            vec![
                SheetCell::Number(1.0),
                SheetCell::text("Lobby"),
                SheetCell::Number(1500000.0),
                SheetCell::Number(250000.5),
            ],
        ];
        let idx = locate_header_row(&rows, is_cash_flow_header);
        assert_eq!(idx, Some(3));
        let table = SheetTable::with_header_row("I Summary", rows, 3);
        assert_eq!(table.headers[1], "Area Description");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(display_row(&table.rows[0], 4)[2], "1,500,000.00");
    }

    #[test]
    fn site_docs_header_needs_both_labels() {
        let rows = vec![
            row(&["Sr. No", "Description"]),
            row(&["Sr. No", "Description", "IR Status"]),
        ];
        assert_eq!(locate_header_row(&rows, is_site_docs_header), Some(1));
        assert_eq!(locate_header_row(&rows[..1], is_site_docs_header), None);
    }

    #[test]
    fn cash_flow_sheet_selection() {
        assert!(is_cash_flow_sheet("I Tower Summary", Some("I")));
        assert!(is_cash_flow_sheet("L1_Finishes", Some("l1")));
        assert!(!is_cash_flow_sheet("L1_Finishes", Some("I")));
        assert!(!is_cash_flow_sheet("Notes", None));
    }

    #[test]
    fn status_counts() {
        let table = SheetTable::from_rows(
            "Docs",
            vec![
                row(&["Sr", "Title", "IR Status"]),
                row(&["1", "Slab", "Approved"]),
                row(&["2", "Wall", ""]),
                row(&["3", "Roof", "Approved"]),
            ],
        );
        assert_eq!(
            ir_status_counts(&table),
            vec![("Approved".to_string(), 2), ("Pending".to_string(), 1)]
        );
    }

    #[test]
    fn password_gate() {
        let mut config = DashboardConfig::default();
        assert!(matches!(
            check_password(&config, "anything"),
            Err(DashboardError::AccessDenied(_))
        ));
        config.finance_password = Some("s3cret".into());
        assert!(check_password(&config, "s3cret").is_ok());
        assert!(check_password(&config, "guess").is_err());
    }
}
