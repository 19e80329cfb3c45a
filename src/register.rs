// Rainfall register cleaning core
//
// Turns the three noisy fragments an extractor produces for a scanned
// rainfall register page (station metadata, a year x month grid and a list of
// annual totals) into one consistent dataset:
// - value_normalizer: one OCR token -> value or missing
// - monthly_table: sparse grid -> twelve months per year, years ascending
// - totals_aligner: unordered totals -> one total per year

pub mod metadata;
pub mod models;
pub mod monthly_table;
pub mod tables;
pub mod totals_aligner;
pub mod value_normalizer;

pub use metadata::{MetadataField, RawMetadataDocument, RawStationMetadata, StationMetadata};
pub use models::{
    Month, MonthEntry, MonthlyTable, RawMonthEntry, RawMonthlyDocument, RawTotalsDocument,
    RawYearBlock, Rainfall, Token, TotalEntry, TotalsTable, YearBlock, MISSING_MARKER,
};
pub use monthly_table::{MonthlyTableBuilder, UnrecognizedMonth};
pub use tables::{MonthCatalog, OcrRules, RegisterTables, STANDARD_TABLES_VERSION};
pub use totals_aligner::{AlignmentReport, Tolerance, ToleranceError, TotalsAligner, TotalsAlignment};
pub use value_normalizer::{normalize_value, ValueNormalizer};
