// Export of cleaned registers as JSON files
//
// Writes the artifacts a reviewer downloads for one register page:
// metadata.json, monthly.json, totals.json and report.json (alignment report
// plus warnings). Each file is written to a temp file in the target directory
// and renamed into place.
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::register::AlignmentReport;
use crate::services::{CleanedRegister, CleaningError};

pub const METADATA_FILE: &str = "metadata.json";
pub const MONTHLY_FILE: &str = "monthly.json";
pub const TOTALS_FILE: &str = "totals.json";
pub const REPORT_FILE: &str = "report.json";

/// Paths of the files written for one register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub metadata: PathBuf,
    pub monthly: PathBuf,
    pub totals: PathBuf,
    pub report: PathBuf,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    tables_version: &'a str,
    generated_at: String,
    report: &'a AlignmentReport,
    warnings: &'a [String],
}

/// Write all export files for `cleaned` into `dir`, creating it if needed
pub fn write_exports(cleaned: &CleanedRegister, dir: &Path) -> Result<ExportedFiles, CleaningError> {
    fs::create_dir_all(dir)?;

    let metadata = dir.join(METADATA_FILE);
    match &cleaned.metadata {
        Some(meta) => write_json_atomic(&metadata, meta)?,
        None => write_json_atomic(&metadata, &serde_json::Map::new())?,
    }

    let monthly = dir.join(MONTHLY_FILE);
    write_json_atomic(&monthly, &cleaned.monthly)?;

    let totals = dir.join(TOTALS_FILE);
    write_json_atomic(&totals, &cleaned.totals)?;

    let report = dir.join(REPORT_FILE);
    write_json_atomic(
        &report,
        &ReportFile {
            tables_version: &cleaned.tables_version,
            generated_at: cleaned.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            report: &cleaned.report,
            warnings: &cleaned.warnings,
        },
    )?;

    debug!("Wrote register exports to {}", dir.display());

    Ok(ExportedFiles {
        metadata,
        monthly,
        totals,
        report,
    })
}

/// Pretty-print `value` to `path` via a temp file in the same directory
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CleaningError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    file.persist(path).map_err(|e| CleaningError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_write_json_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "stale").unwrap();

        write_json_atomic(&path, &serde_json::json!({"Totals": []})).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({"Totals": []}));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
