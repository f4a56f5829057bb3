// src/export/logic.rs

use crate::core::report::period_utc_bounds;
use crate::db::pool::DbPool;
use crate::db::{daily_stats, pairs};
use crate::errors::{AppError, AppResult};
use crate::export::fs_utils::ensure_writable;
use crate::export::json_csv::{export_csv, export_json};
use crate::export::model::{PairExport, StatExport};
use crate::export::range::parse_range;
use crate::export::{ExportFormat, ExportTarget};
use crate::ui::messages::warning;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::path::Path;

/// Bounds used when no range is given.
fn unbounded() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
    )
}

/// High-level export logic.
pub struct ExportLogic;

pub struct ExportRequest<'a> {
    pub target: ExportTarget,
    pub format: ExportFormat,
    pub file: &'a str,
    /// `None`, `all`, or a period expression (see `utils::date::resolve_period`).
    pub range: Option<&'a str>,
    pub user: Option<&'a str>,
    pub force: bool,
}

impl ExportLogic {
    /// Write pairs or daily stats to `req.file`. Returns the number of rows.
    ///
    /// Pair ranges are local dates in `tz`.
    pub fn export(pool: &DbPool, req: &ExportRequest, tz: &Tz) -> AppResult<usize> {
        let path = Path::new(req.file);

        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "Output file path must be absolute: {}",
                req.file
            )));
        }

        let (from, to) = parse_range(req.range)?.unwrap_or_else(unbounded);

        ensure_writable(path, req.force)?;

        match req.target {
            ExportTarget::Pairs => {
                let (start, end) = period_utc_bounds(tz, from, to);
                let rows: Vec<PairExport> = pairs::load_pairs(&pool.conn, req.user, &start, &end)?
                    .iter()
                    .map(PairExport::from)
                    .collect();
                write_rows(&rows, req.format, path)
            }
            ExportTarget::Stats => {
                let rows: Vec<StatExport> =
                    daily_stats::load_daily_stats(&pool.conn, req.user, from, to)?
                        .iter()
                        .map(StatExport::from)
                        .collect();
                write_rows(&rows, req.format, path)
            }
        }
    }
}

fn write_rows<T: Serialize>(rows: &[T], format: ExportFormat, path: &Path) -> AppResult<usize> {
    if rows.is_empty() {
        warning("No rows found for the selected range; writing an empty file.");
    }

    match format {
        ExportFormat::Csv => export_csv(rows, path)?,
        ExportFormat::Json => export_json(rows, path)?,
    }

    Ok(rows.len())
}
