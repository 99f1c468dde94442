// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" spreadsheet/number/date handling so
// the rest of the code can assume clean, typed values.
use crate::types::{CellOutcome, SheetCell};
use chrono::{Datelike, Local, NaiveDate};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("static regex"));

/// Parse a cell into a plain number while being forgiving about formatting
/// issues that are common in hand-maintained workbooks.
///
/// - Numeric cells pass through untouched.
/// - Text is trimmed; a trailing `%` and thousands separators are stripped.
/// - Anything that still does not parse (or an empty cell) is `Defaulted`.
pub fn parse_number(cell: &SheetCell) -> CellOutcome {
    match cell {
        SheetCell::Number(v) if v.is_finite() => CellOutcome::Parsed(*v),
        SheetCell::Number(_) | SheetCell::Empty => CellOutcome::Defaulted,
        SheetCell::Text(s) => {
            let s = s.trim().trim_end_matches('%').trim().replace(',', "");
            match s.parse::<f64>() {
                Ok(v) if v.is_finite() => CellOutcome::Parsed(v),
                _ => CellOutcome::Defaulted,
            }
        }
    }
}

/// Bring an activity cell onto the 0–100 scale used by the section views.
///
/// Text written with a percent sign (`"45%"`) is already a percentage.
/// Everything else is read as a fraction, which is how the workbook stores
/// formatted percentage cells, and multiplied by 100.
pub fn clean_percent_cell(cell: &SheetCell) -> CellOutcome {
    let explicit_percent = matches!(cell, SheetCell::Text(s) if s.trim().ends_with('%'));
    match parse_number(cell) {
        CellOutcome::Parsed(v) if explicit_percent => CellOutcome::Parsed(v),
        CellOutcome::Parsed(v) => CellOutcome::Parsed(v * 100.0),
        CellOutcome::Defaulted => CellOutcome::Defaulted,
    }
}

/// Weight cells are fractions; `"12%"` is read as `0.12`.
pub fn clean_weight_cell(cell: &SheetCell) -> CellOutcome {
    let explicit_percent = matches!(cell, SheetCell::Text(s) if s.trim().ends_with('%'));
    match parse_number(cell) {
        CellOutcome::Parsed(v) if explicit_percent => CellOutcome::Parsed(v / 100.0),
        other => other,
    }
}

/// Per-column percentage heuristic: a column whose maximum exceeds 1.5 is
/// taken to be on a 0–100 scale and divided down to fractions.
///
/// Returns `true` when the column was rescaled. Running it again on an
/// already-normalized column is a no-op.
pub fn normalize_fraction_column(values: &mut [f64]) -> bool {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 1.5 {
        for v in values.iter_mut() {
            *v /= 100.0;
        }
        true
    } else {
        false
    }
}

/// First run of digits in a free-text label (`"Floor 03"` -> 3).
pub fn extract_leading_int(s: &str) -> Option<i64> {
    FIRST_INT
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Tables receive a mix of fractions and percentages; anything at or below 1
/// is treated as a fraction.
pub fn display_percent(v: f64) -> f64 {
    if v <= 1.0 {
        v * 100.0
    } else {
        v
    }
}

pub fn format_percent(v: f64) -> String {
    format!("{:.2}%", v)
}

/// Traffic-light band used wherever the dashboard colours a progress figure.
pub fn progress_band(v: f64) -> &'static str {
    if v < 40.0 {
        "Low"
    } else if v < 70.0 {
        "Medium"
    } else {
        "High"
    }
}

/// Normalize a header for fuzzy matching: lowercase, whitespace removed.
pub fn normalize_header(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// The Friday before `today`; on a Friday this is the previous week's Friday.
pub fn previous_friday(today: NaiveDate) -> NaiveDate {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let mut days_since_friday = (weekday - 4).rem_euclid(7);
    if days_since_friday == 0 {
        days_since_friday = 7;
    }
    today - chrono::Duration::days(days_since_friday)
}

/// Report date printed on every page and header, e.g. `10 October 2026`.
pub fn report_date() -> String {
    previous_friday(Local::now().date_naive())
        .format("%d %B %Y")
        .to_string()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_cells_land_on_0_100() {
        assert_eq!(clean_percent_cell(&SheetCell::Number(0.45)), CellOutcome::Parsed(45.0));
        assert_eq!(clean_percent_cell(&SheetCell::text("45%")), CellOutcome::Parsed(45.0));
        assert_eq!(clean_percent_cell(&SheetCell::text(" 0.5 ")), CellOutcome::Parsed(50.0));
        assert_eq!(clean_percent_cell(&SheetCell::text("n/a")), CellOutcome::Defaulted);
        assert_eq!(clean_percent_cell(&SheetCell::Empty), CellOutcome::Defaulted);
    }

    #[test]
    fn weight_cells_are_fractions() {
        assert_eq!(clean_weight_cell(&SheetCell::Number(0.12)), CellOutcome::Parsed(0.12));
        assert_eq!(clean_weight_cell(&SheetCell::text("12%")), CellOutcome::Parsed(0.12));
    }

    #[test]
    fn normalization_is_idempotent_on_fractions() {
        let mut col = vec![0.0, 0.5, 1.0, 1.2];
        let before = col.clone();
        assert!(!normalize_fraction_column(&mut col));
        assert_eq!(col, before);

        let mut pct = vec![0.0, 50.0, 100.0];
        assert!(normalize_fraction_column(&mut pct));
        assert_eq!(pct, vec![0.0, 0.5, 1.0]);
        assert!(!normalize_fraction_column(&mut pct));
        assert_eq!(pct, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn floor_labels() {
        assert_eq!(extract_leading_int("Floor 03"), Some(3));
        assert_eq!(extract_leading_int("12th"), Some(12));
        assert_eq!(extract_leading_int("Ground"), None);
    }

    #[test]
    fn empty_average_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[10.0, 20.0]), 15.0);
    }

    #[test]
    fn previous_friday_skips_today() {
        let fri = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(previous_friday(fri), NaiveDate::from_ymd_opt(2026, 10, 9).unwrap());
        let sun = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(previous_friday(sun), fri);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(display_percent(0.5), 50.0);
        assert_eq!(display_percent(45.0), 45.0);
        assert_eq!(progress_band(39.9), "Low");
        assert_eq!(progress_band(69.9), "Medium");
        assert_eq!(progress_band(70.0), "High");
    }
}
