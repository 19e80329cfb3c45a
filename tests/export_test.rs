// Tests for writing cleaned registers to disk

use rainfall_register::export::{write_exports, MONTHLY_FILE, REPORT_FILE, TOTALS_FILE};
use rainfall_register::services::{RawRegisterDocument, RegisterCleaningService};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn cleaned_register() -> rainfall_register::services::CleanedRegister {
    let document: RawRegisterDocument = serde_json::from_value(json!({
        "metadata": {"StationNumber": "77", "Location": "Kells"},
        "monthly": {"rainfall": [
            {"Year": 1890, "rainfall": [{"Month": "Jan", "rainfall": "2.5"}]},
            {"Year": 1891, "rainfall": []}
        ]},
        "totals": {"Totals": ["2.5"]}
    }))
    .unwrap();
    RegisterCleaningService::default().clean(&document)
}

#[test]
fn test_write_exports_creates_all_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("page-001");

    let files = write_exports(&cleaned_register(), &target).unwrap();

    assert_eq!(files.monthly, target.join(MONTHLY_FILE));
    for path in [&files.metadata, &files.monthly, &files.totals, &files.report] {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert_eq!(fs::read_dir(&target).unwrap().count(), 4);
}

#[test]
fn test_exported_tables_use_missing_marker() {
    let dir = tempfile::tempdir().unwrap();
    write_exports(&cleaned_register(), dir.path()).unwrap();

    let monthly = read_json(&dir.path().join(MONTHLY_FILE));
    assert_eq!(monthly["rainfall"][0]["rainfall"][0]["rainfall"], json!(2.5));
    assert_eq!(monthly["rainfall"][0]["rainfall"][1]["rainfall"], json!("-"));
    assert_eq!(monthly["rainfall"][1]["rainfall"].as_array().unwrap().len(), 12);

    let totals = read_json(&dir.path().join(TOTALS_FILE));
    assert_eq!(
        totals,
        json!({"Totals": [{"Year": 1890, "Total": 2.5}, {"Year": 1891, "Total": "-"}]})
    );
}

#[test]
fn test_report_file_carries_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let cleaned = cleaned_register();
    write_exports(&cleaned, dir.path()).unwrap();

    let report = read_json(&dir.path().join(REPORT_FILE));
    assert_eq!(report["tables_version"], json!(cleaned.tables_version));
    assert_eq!(report["report"]["matched_by_value"], json!(1));
    assert!(report["generated_at"].as_str().unwrap().ends_with(" UTC"));

    let warnings = report["warnings"].as_array().unwrap();
    assert!(warnings.contains(&json!("No total for years: 1891")));
    assert!(warnings
        .iter()
        .any(|w| w.as_str().unwrap().starts_with("Station metadata is missing: County")));
}
