// Runtime configuration.
//
// Defaults reproduce the fixed file layout the dashboard has always used. An
// optional `dashboard.json` next to the binary can override any field, and a
// handful of environment variables override the paths that differ per machine.
use crate::error::Result;
use crate::weights::{Boost, APARTMENT_TOWER_BOOST, LCRG_LANDING_BOOST, TOWER_SUMMARY_BOOST};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "dashboard.json";

pub const PROGRESS_WORKBOOK: &str = "Apartment_Progress_Weighted-Progress_App_ITowerAvg_AppView_v5.xlsx";
pub const CASH_FLOW_WORKBOOK: &str = "Cash_Flow.xlsx";
pub const SITE_DOCS_WORKBOOK: &str = "Site_Documentation.xlsx";

pub const SHEET_LCRG: &str = "LCRG Progress";
pub const SHEET_APARTMENTS: &str = "Apartment Progress";

/// Independently tunable KPI uplifts, one per call site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    pub tower_summary: Boost,
    pub apartment_tower: Boost,
    pub lcrg_landing: Boost,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            tower_summary: TOWER_SUMMARY_BOOST,
            apartment_tower: APARTMENT_TOWER_BOOST,
            lcrg_landing: LCRG_LANDING_BOOST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub progress_workbook: PathBuf,
    pub cash_flow_workbook: PathBuf,
    pub site_docs_workbook: PathBuf,
    pub photo_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logo_left: PathBuf,
    pub logo_right: PathBuf,
    pub prepared_by: String,
    pub project_name: String,
    /// Shared password for the financial view; `None` keeps it locked.
    pub finance_password: Option<String>,
    pub boosts: BoostConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            progress_workbook: PathBuf::from(PROGRESS_WORKBOOK),
            cash_flow_workbook: PathBuf::from(CASH_FLOW_WORKBOOK),
            site_docs_workbook: PathBuf::from(SITE_DOCS_WORKBOOK),
            photo_dir: PathBuf::from("uploaded_photos"),
            output_dir: PathBuf::from("reports"),
            logo_left: PathBuf::from("assets/lakecity_logo.png"),
            logo_right: PathBuf::from("assets/unison_logo.png"),
            prepared_by: "Project Controls".to_string(),
            project_name: "Lake City Roof Gardens".to_string(),
            finance_password: None,
            boosts: BoostConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Read the config file if it exists, otherwise fall back to defaults.
    ///
    /// A file that exists but does not parse is an error rather than a silent
    /// default, so a typo in a boost factor cannot go unnoticed.
    pub fn load(path: &Path) -> Result<Self> {
        let cfg = if path.is_file() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            DashboardConfig::default()
        };
        Ok(cfg.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("LCRG_PHOTO_DIR") {
            self.photo_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("LCRG_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(pw) = std::env::var("LCRG_FINANCE_PASSWORD") {
            if !pw.is_empty() {
                self.finance_password = Some(pw);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{ "prepared_by": "QS Team", "boosts": { "tower_summary": { "factor": 1.05, "cap": null } } }"#,
        )
        .unwrap();
        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.prepared_by, "QS Team");
        assert_eq!(cfg.boosts.tower_summary.factor, 1.05);
        assert_eq!(cfg.boosts.tower_summary.cap, None);
        assert_eq!(cfg.boosts.apartment_tower, APARTMENT_TOWER_BOOST);
        assert_eq!(cfg.progress_workbook, PathBuf::from(PROGRESS_WORKBOOK));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(DashboardConfig::load(&path).is_err());
    }
}
