/// Annual totals aligner
///
/// The extractor reads the totals row left to right, and that order does not
/// always follow the year order of the monthly grid (rows get skipped,
/// swapped or repeated). Alignment runs in two phases:
///
/// 1. Value match: each total, in reading order, goes to the unassigned year
///    whose monthly sum is closest, if that sum is within tolerance.
/// 2. Reading order: totals that matched nothing fill the remaining years
///    left to right. Surplus totals are discarded, surplus years stay missing.
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::register::models::{MonthlyTable, Rainfall, Token, TotalEntry, TotalsTable};
use crate::register::value_normalizer::ValueNormalizer;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ToleranceError {
    #[error("Absolute tolerance must be a finite, non-negative number (got {0})")]
    InvalidAbsolute(f64),

    #[error("Relative tolerance must be a finite, non-negative number (got {0})")]
    InvalidRelative(f64),
}

/// How close a total must be to a year's monthly sum to count as a match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    abs: f64,
    rel: f64,
}

impl Tolerance {
    pub const DEFAULT_ABS: f64 = 0.5;
    pub const DEFAULT_REL: f64 = 0.05;

    pub fn new(abs: f64, rel: f64) -> Result<Self, ToleranceError> {
        if !abs.is_finite() || abs < 0.0 {
            return Err(ToleranceError::InvalidAbsolute(abs));
        }
        if !rel.is_finite() || rel < 0.0 {
            return Err(ToleranceError::InvalidRelative(rel));
        }
        Ok(Self { abs, rel })
    }

    pub fn abs(&self) -> f64 {
        self.abs
    }

    pub fn rel(&self) -> f64 {
        self.rel
    }

    /// Accept when within the absolute tolerance, or within the relative one
    /// measured against the sum (against the total when the sum is zero)
    fn accepts(&self, diff: f64, sum: f64, total: f64) -> bool {
        if diff <= self.abs {
            return true;
        }
        let base = if sum != 0.0 { sum } else { total };
        base != 0.0 && diff / base.abs() <= self.rel
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs: Self::DEFAULT_ABS,
            rel: Self::DEFAULT_REL,
        }
    }
}

/// What the aligner had to do to produce its table
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AlignmentReport {
    /// Totals placed by matching a monthly sum
    pub matched_by_value: usize,
    /// Totals placed by reading order
    pub assigned_by_position: usize,
    /// Raw totals that normalized to missing
    pub unreadable_totals: usize,
    /// Totals left over once every year had one, in reading order
    pub discarded_totals: Vec<f64>,
    /// Years that ended up without a total
    pub years_without_total: Vec<i32>,
    /// No monthly table was available; years are 1..N placeholders
    pub synthetic_years: bool,
}

impl AlignmentReport {
    /// True when totals and years did not line up one-to-one
    pub fn has_count_mismatch(&self) -> bool {
        !self.discarded_totals.is_empty() || !self.years_without_total.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalsAlignment {
    pub totals: TotalsTable,
    pub report: AlignmentReport,
}

#[derive(Debug, Clone, Default)]
pub struct TotalsAligner {
    normalizer: ValueNormalizer,
    tolerance: Tolerance,
}

/// A year eligible for value matching
struct Candidate {
    slot: usize,
    year: i32,
    sum: f64,
}

impl TotalsAligner {
    pub fn new(normalizer: ValueNormalizer, tolerance: Tolerance) -> Self {
        Self {
            normalizer,
            tolerance,
        }
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Align raw totals (reading order) onto the years of `monthly`
    #[instrument(skip_all, fields(totals = raw_totals.len()))]
    pub fn align(&self, raw_totals: &[Token], monthly: Option<&MonthlyTable>) -> TotalsAlignment {
        let normalized: Vec<Rainfall> = raw_totals
            .iter()
            .map(|t| self.normalizer.normalize_token(t))
            .collect();
        let unreadable_totals = normalized.iter().filter(|t| t.is_missing()).count();

        let table = match monthly {
            Some(table) if !table.is_empty() => table,
            _ => return Self::align_without_years(normalized, unreadable_totals),
        };

        let mut slots = vec![Rainfall::Missing; table.len()];
        let mut assigned = vec![false; table.len()];
        let mut placed = vec![false; normalized.len()];

        let mut candidates: Vec<Candidate> = table
            .years
            .iter()
            .enumerate()
            .filter_map(|(slot, block)| {
                block.sum().map(|sum| Candidate {
                    slot,
                    year: block.year,
                    sum,
                })
            })
            .collect();
        candidates.sort_by_key(|c| (c.year, c.slot));

        // Phase 1: nearest monthly sum within tolerance
        let mut matched_by_value = 0;
        for (index, total) in normalized.iter().enumerate() {
            let Some(value) = total.value() else {
                continue;
            };

            let mut best: Option<(&Candidate, f64)> = None;
            for candidate in candidates.iter().filter(|c| !assigned[c.slot]) {
                let diff = (candidate.sum - value).abs();
                // Strict comparison keeps the earliest year on ties
                if best.map_or(true, |(_, best_diff)| diff < best_diff) {
                    best = Some((candidate, diff));
                }
            }

            match best {
                Some((candidate, diff)) if self.tolerance.accepts(diff, candidate.sum, value) => {
                    debug!(
                        "Total {} matched year {} (monthly sum {}, diff {:.2})",
                        value, candidate.year, candidate.sum, diff
                    );
                    slots[candidate.slot] = *total;
                    assigned[candidate.slot] = true;
                    placed[index] = true;
                    matched_by_value += 1;
                }
                Some((candidate, diff)) => {
                    debug!(
                        "Total {} closest to year {} but diff {:.2} is outside tolerance",
                        value, candidate.year, diff
                    );
                }
                None => debug!("Total {} has no open candidate year", value),
            }
        }

        // Phase 2: reading order onto the remaining years
        let unplaced: Vec<Rainfall> = normalized
            .iter()
            .zip(&placed)
            .filter(|(total, placed)| !total.is_missing() && !**placed)
            .map(|(total, _)| *total)
            .collect();

        let mut open_slots: Vec<usize> = (0..table.len()).filter(|&slot| !assigned[slot]).collect();
        open_slots.sort_by_key(|&slot| (table.years[slot].year, slot));

        let assigned_by_position = unplaced.len().min(open_slots.len());
        for (&slot, total) in open_slots.iter().zip(&unplaced) {
            debug!(
                "Total {} assigned to year {} by reading order",
                total, table.years[slot].year
            );
            slots[slot] = *total;
        }

        let discarded_totals: Vec<f64> = unplaced[assigned_by_position..]
            .iter()
            .filter_map(|t| t.value())
            .collect();
        if !discarded_totals.is_empty() {
            debug!("Discarding {} surplus totals", discarded_totals.len());
        }

        let entries: Vec<TotalEntry> = table
            .years
            .iter()
            .zip(slots)
            .map(|(block, total)| TotalEntry {
                year: block.year,
                total,
            })
            .collect();

        let years_without_total = entries
            .iter()
            .filter(|e| e.total.is_missing())
            .map(|e| e.year)
            .collect();

        TotalsAlignment {
            totals: TotalsTable { entries },
            report: AlignmentReport {
                matched_by_value,
                assigned_by_position,
                unreadable_totals,
                discarded_totals,
                years_without_total,
                synthetic_years: false,
            },
        }
    }

    /// No year axis: number totals 1..N in reading order
    fn align_without_years(normalized: Vec<Rainfall>, unreadable_totals: usize) -> TotalsAlignment {
        let assigned_by_position = normalized.len() - unreadable_totals;
        let entries = (1..)
            .zip(normalized)
            .map(|(year, total)| TotalEntry { year, total })
            .collect();

        TotalsAlignment {
            totals: TotalsTable { entries },
            report: AlignmentReport {
                assigned_by_position,
                unreadable_totals,
                synthetic_years: true,
                ..AlignmentReport::default()
            },
        }
    }
}
