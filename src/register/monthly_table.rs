/// Monthly table builder
///
/// Reshapes the extractor's sparse year/month grid into the canonical table:
/// every working year present, twelve months each in calendar order, every
/// value passed through the normalizer. No cross-checking happens here.
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::register::models::{
    MonthEntry, Month, MonthlyTable, RawYearBlock, Rainfall, Token, YearBlock,
};
use crate::register::tables::{MonthCatalog, RegisterTables};
use crate::register::value_normalizer::ValueNormalizer;

/// A month label in the raw grid that the catalog could not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedMonth {
    pub year: Option<i32>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MonthlyTableBuilder {
    normalizer: ValueNormalizer,
    months: MonthCatalog,
}

impl MonthlyTableBuilder {
    pub fn new(tables: &RegisterTables) -> Self {
        Self {
            normalizer: ValueNormalizer::new(tables.ocr.clone()),
            months: tables.months.clone(),
        }
    }

    pub fn normalizer(&self) -> &ValueNormalizer {
        &self.normalizer
    }

    /// Build the canonical table
    ///
    /// With `explicit_years` the output follows that list exactly as given
    /// (order included). Otherwise the years are the distinct integer years
    /// found in `raw_years`, ascending.
    pub fn build(&self, raw_years: &[RawYearBlock], explicit_years: Option<&[i32]>) -> MonthlyTable {
        let working_years = match explicit_years {
            Some(years) => years.to_vec(),
            None => discover_years(raw_years),
        };

        debug!(
            "Building monthly table for {} years from {} raw blocks",
            working_years.len(),
            raw_years.len()
        );

        let years = working_years
            .into_iter()
            .map(|year| {
                // First block wins when the extractor repeats a year
                let block = raw_years.iter().find(|b| b.year == Some(year));
                if block.is_none() {
                    debug!("Year {} has no raw block, filling with missing", year);
                }
                self.build_year(year, block)
            })
            .collect();

        MonthlyTable::new(years)
    }

    /// Raw month labels that do not map onto a calendar month
    pub fn unrecognized_months(&self, raw_years: &[RawYearBlock]) -> Vec<UnrecognizedMonth> {
        raw_years
            .iter()
            .flat_map(|block| {
                block
                    .months
                    .iter()
                    .filter(|entry| {
                        entry
                            .month
                            .as_deref()
                            .and_then(|label| self.months.resolve(label))
                            .is_none()
                    })
                    .map(|entry| UnrecognizedMonth {
                        year: block.year,
                        label: entry.month.clone(),
                    })
            })
            .collect()
    }

    fn build_year(&self, year: i32, block: Option<&RawYearBlock>) -> YearBlock {
        let Some(block) = block else {
            return YearBlock::empty(year);
        };

        // Later entries for the same month override earlier ones
        let lookup: BTreeMap<Month, &Token> = block
            .months
            .iter()
            .filter_map(|entry| {
                let month = entry
                    .month
                    .as_deref()
                    .and_then(|label| self.months.resolve(label))?;
                Some((month, &entry.token))
            })
            .collect();

        YearBlock {
            year,
            months: Month::ALL.map(|month| MonthEntry {
                month,
                value: lookup
                    .get(&month)
                    .map_or(Rainfall::Missing, |token| self.normalizer.normalize_token(token)),
            }),
        }
    }
}

/// Distinct integer years in the raw grid, ascending
pub fn discover_years(raw_years: &[RawYearBlock]) -> Vec<i32> {
    raw_years
        .iter()
        .filter_map(|b| b.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
