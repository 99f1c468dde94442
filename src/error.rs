use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Sheet '{sheet}' not found in {}", path.display())]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("Sheet '{sheet}' is missing required column(s): {}", columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl DashboardError {
    /// Load failures stop the dashboard; everything else is reported and skipped.
    pub fn is_fatal_load(&self) -> bool {
        matches!(
            self,
            DashboardError::Workbook(_)
                | DashboardError::MissingSheet { .. }
                | DashboardError::MissingColumns { .. }
        )
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, DashboardError>;
