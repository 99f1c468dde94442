//! Progress dashboard for the Lake City Roof Gardens towers (I, L1, L2).
//!
//! Workbook sheets are loaded into an immutable [`snapshot::Snapshot`], rolled
//! up into apartment/floor/tower/project percentages, and rendered as terminal
//! tables, CSV/JSON exports and PDF reports. Site photos live in a
//! directory-per-key store behind [`photos::PhotoStore`].
pub mod aggregate;
pub mod config;
pub mod error;
pub mod finance;
pub mod loader;
pub mod output;
pub mod pdf;
pub mod photos;
pub mod reports;
pub mod sections;
pub mod snapshot;
pub mod types;
pub mod util;
pub mod views;
pub mod weights;

pub use error::{DashboardError, Result};
