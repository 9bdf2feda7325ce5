//! Itinerary report generation
//!
//! Turns a finished TripPlan (and optionally the request that produced it)
//! into a paginated PDF. Layout never fails: an empty plan simply yields a
//! report with its empty sections left out. Only rendering and writing the
//! file can error.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{TripPlan, TripRequest};

mod format;
mod layout;
mod pdf;

pub use format::{DEFAULT_CURRENCY, format_duration, format_price, format_stops, report_filename};
pub use layout::{Element, Page, Paginator, Report, ReportOptions, layout, stamp_footers};
pub use pdf::render;

/// Errors from producing a report file
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered report ready to be saved
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub filename: String,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

/// Lay out and render a report as of `generated`
pub fn generate_at(
    plan: &TripPlan,
    request: Option<&TripRequest>,
    options: &ReportOptions,
    generated: NaiveDateTime,
) -> Result<GeneratedReport, ReportError> {
    let report = layout(plan, request, options, generated);
    let bytes = render(&report)?;
    Ok(GeneratedReport {
        filename: report.filename,
        page_count: report.pages.len(),
        bytes,
    })
}

/// Lay out and render a report stamped with the current local time
pub fn generate(
    plan: &TripPlan,
    request: Option<&TripRequest>,
    options: &ReportOptions,
) -> Result<GeneratedReport, ReportError> {
    generate_at(plan, request, options, Local::now().naive_local())
}

/// Generate a report and write it to disk
///
/// `target` may be a directory (the derived filename is used inside it) or
/// a file path.
pub fn write_report(
    plan: &TripPlan,
    request: Option<&TripRequest>,
    options: &ReportOptions,
    target: &Path,
) -> Result<PathBuf, ReportError> {
    debug!(target = %target.display(), "write_report: called");
    let report = generate(plan, request, options)?;

    let path = if target.is_dir() {
        target.join(&report.filename)
    } else {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        target.to_path_buf()
    };

    std::fs::write(&path, &report.bytes)?;
    info!(path = %path.display(), pages = report.page_count, "write_report: report written");
    Ok(path)
}
