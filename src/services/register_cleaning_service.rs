use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::register::{
    AlignmentReport, MetadataField, MonthlyTable, MonthlyTableBuilder, RawMetadataDocument,
    RawMonthlyDocument, RawTotalsDocument, RegisterTables, StationMetadata, Tolerance,
    TotalsAligner, TotalsTable, UnrecognizedMonth, ValueNormalizer,
};

/// Error types for register cleaning operations
#[derive(Debug, thiserror::Error)]
pub enum CleaningError {
    #[error("Malformed register document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cleaning task failed: {0}")]
    Task(String),
}

/// The three extracted fragments for one register page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawRegisterDocument {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Option<RawMetadataDocument>,
    pub monthly: RawMonthlyDocument,
    #[serde(default)]
    pub totals: RawTotalsDocument,
    /// Years the page is known to cover; replaces year discovery when set
    #[serde(default)]
    pub expected_years: Option<Vec<i32>>,
}

/// Cleaned, aligned dataset for one register page
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CleanedRegister {
    pub metadata: Option<StationMetadata>,
    pub monthly: MonthlyTable,
    pub totals: TotalsTable,
    pub report: AlignmentReport,
    pub warnings: Vec<String>,
    pub tables_version: String,
    pub generated_at: DateTime<Utc>,
}

/// Runs the full cleaning pipeline for register documents
#[derive(Debug, Clone, Default)]
pub struct RegisterCleaningService {
    builder: MonthlyTableBuilder,
    aligner: TotalsAligner,
    tables_version: String,
}

impl RegisterCleaningService {
    pub fn new(tables: RegisterTables, tolerance: Tolerance) -> Self {
        Self {
            builder: MonthlyTableBuilder::new(&tables),
            aligner: TotalsAligner::new(ValueNormalizer::new(tables.ocr.clone()), tolerance),
            tables_version: tables.version,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.register_tables(), config.totals_tolerance)
    }

    pub fn normalizer(&self) -> &ValueNormalizer {
        self.builder.normalizer()
    }

    /// Clean one document
    ///
    /// 1. Normalizes the station metadata
    /// 2. Builds the twelve-month table
    /// 3. Aligns the totals against the table's monthly sums
    /// 4. Turns anything suspicious into warnings
    #[instrument(skip_all, fields(years = document.monthly.years.len(), totals = document.totals.totals.len()))]
    pub fn clean(&self, document: &RawRegisterDocument) -> CleanedRegister {
        let metadata = document.metadata.as_ref().map(StationMetadata::from);

        let monthly = self
            .builder
            .build(&document.monthly.years, document.expected_years.as_deref());
        let alignment = self.aligner.align(&document.totals.totals, Some(&monthly));

        let unrecognized = self.builder.unrecognized_months(&document.monthly.years);
        let warnings = build_warnings(metadata.as_ref(), &unrecognized, &alignment.report);
        for warning in &warnings {
            warn!("{}", warning);
        }

        info!(
            "Cleaned register: {} years, {}/{} totals aligned ({} by value, {} by position)",
            monthly.len(),
            alignment.totals.present_count(),
            alignment.totals.entries.len(),
            alignment.report.matched_by_value,
            alignment.report.assigned_by_position
        );

        CleanedRegister {
            metadata,
            monthly,
            totals: alignment.totals,
            report: alignment.report,
            warnings,
            tables_version: self.tables_version.clone(),
            generated_at: Utc::now(),
        }
    }

    /// Parse and clean a JSON document; a wrong container shape fails fast
    pub fn clean_json(&self, json: &str) -> Result<CleanedRegister, CleaningError> {
        let document: RawRegisterDocument = serde_json::from_str(json)?;
        Ok(self.clean(&document))
    }

    /// Clean many documents on the blocking pool, `concurrency` at a time
    ///
    /// Results come back in input order, keyed by the caller's label.
    pub async fn clean_batch(
        &self,
        documents: Vec<(String, RawRegisterDocument)>,
        concurrency: usize,
    ) -> Vec<(String, Result<CleanedRegister, CleaningError>)> {
        self.clean_batch_with_progress(documents, concurrency, |_, _| {})
            .await
    }

    /// `clean_batch`, calling `on_finished` as each document completes
    ///
    /// Callbacks arrive in completion order, not input order.
    pub async fn clean_batch_with_progress<F>(
        &self,
        documents: Vec<(String, RawRegisterDocument)>,
        concurrency: usize,
        on_finished: F,
    ) -> Vec<(String, Result<CleanedRegister, CleaningError>)>
    where
        F: Fn(&str, &Result<CleanedRegister, CleaningError>),
    {
        info!(
            "Cleaning {} documents with concurrency {}",
            documents.len(),
            concurrency
        );

        let mut results: Vec<_> = stream::iter(documents.into_iter().enumerate())
            .map(|(index, (label, document))| {
                let service = self.clone();
                async move {
                    let result = tokio::task::spawn_blocking(move || service.clean(&document))
                        .await
                        .map_err(|e| CleaningError::Task(e.to_string()));
                    debug!("Finished document {} ({})", index, label);
                    (index, label, result)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .inspect(|(_, label, result)| on_finished(label, result))
            .collect()
            .await;

        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, label, result)| (label, result))
            .collect()
    }
}

/// Human-readable warnings for the caller; extraction drift shows up here
fn build_warnings(
    metadata: Option<&StationMetadata>,
    unrecognized: &[UnrecognizedMonth],
    report: &AlignmentReport,
) -> Vec<String> {
    let mut warnings = Vec::new();

    match metadata {
        Some(meta) => {
            let missing: Vec<&str> = meta
                .missing_fields()
                .into_iter()
                .map(MetadataField::label)
                .collect();
            if !missing.is_empty() {
                warnings.push(format!("Station metadata is missing: {}", missing.join(", ")));
            }
        }
        None => warnings.push("No station metadata was supplied".to_string()),
    }

    for month in unrecognized {
        let year = month
            .year
            .map_or_else(|| "unknown year".to_string(), |y| y.to_string());
        warnings.push(format!(
            "Unrecognized month label {:?} in {}",
            month.label.as_deref().unwrap_or(""),
            year
        ));
    }

    if report.synthetic_years {
        warnings.push("Monthly table is empty; totals are numbered by reading order".to_string());
    }

    if report.assigned_by_position > 0 && !report.synthetic_years {
        warnings.push(format!(
            "{} totals matched no monthly sum and were placed by reading order",
            report.assigned_by_position
        ));
    }

    if !report.discarded_totals.is_empty() {
        let values: Vec<String> = report.discarded_totals.iter().map(|v| format!("{v:.2}")).collect();
        warnings.push(format!(
            "More totals than years; discarded: {}",
            values.join(", ")
        ));
    }

    if !report.years_without_total.is_empty() && !report.synthetic_years {
        let years: Vec<String> = report.years_without_total.iter().map(|y| y.to_string()).collect();
        warnings.push(format!("No total for years: {}", years.join(", ")));
    }

    warnings
}
