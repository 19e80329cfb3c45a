/// Versioned lookup tables used by the cleaning components
///
/// Month labels and OCR substitution rules differ between registers and
/// locales, so they are passed into the normalizer and table builder rather
/// than baked into them. `RegisterTables::standard()` covers the English
/// registers the extractor prompts are written for.
use std::collections::BTreeMap;

use crate::register::models::Month;

pub const STANDARD_TABLES_VERSION: &str = "standard-v1";

/// Maps the month labels found in extracted grids onto canonical months
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCatalog {
    aliases: BTreeMap<String, Month>,
}

impl MonthCatalog {
    /// Full names, three-letter abbreviations and "Sept"
    pub fn standard() -> Self {
        let catalog = Month::ALL.iter().fold(Self::empty(), |catalog, &month| {
            catalog
                .with_alias(month.name(), month)
                .with_alias(month.abbreviation(), month)
        });
        catalog.with_alias("Sept", Month::September)
    }

    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// Register an additional label, e.g. a localized month name
    pub fn with_alias(mut self, label: &str, month: Month) -> Self {
        self.aliases.insert(Self::key(label), month);
        self
    }

    /// Resolve a raw label; case-insensitive, ignores surrounding whitespace
    /// and a trailing period ("Jan." -> January)
    pub fn resolve(&self, label: &str) -> Option<Month> {
        self.aliases.get(&Self::key(label)).copied()
    }

    fn key(label: &str) -> String {
        label.trim().trim_end_matches('.').trim().to_lowercase()
    }
}

impl Default for MonthCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Character-level repair rules for OCR'd numeric tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrRules {
    /// Whole-token placeholders meaning "no value"
    pub placeholders: Vec<String>,
    /// Letters commonly misread for digits
    pub letter_substitutions: Vec<(char, char)>,
    /// Characters read in place of a decimal point
    pub decimal_separators: Vec<char>,
    /// Treat an exact zero as missing
    pub zero_is_missing: bool,
}

impl OcrRules {
    pub fn standard() -> Self {
        Self {
            placeholders: vec!["-".to_string(), "\u{2013}".to_string(), "\u{2014}".to_string()],
            letter_substitutions: vec![('O', '0'), ('o', '0'), ('l', '1'), ('I', '1')],
            decimal_separators: vec!['-', ':', '\'', ',', '_'],
            zero_is_missing: true,
        }
    }
}

impl Default for OcrRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Complete lookup configuration for one register family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTables {
    pub version: String,
    pub months: MonthCatalog,
    pub ocr: OcrRules,
}

impl RegisterTables {
    pub fn standard() -> Self {
        Self {
            version: STANDARD_TABLES_VERSION.to_string(),
            months: MonthCatalog::standard(),
            ocr: OcrRules::standard(),
        }
    }

    /// Same tables, with exact zeros kept as real values
    pub fn keeping_zero(mut self) -> Self {
        self.ocr.zero_is_missing = false;
        self
    }
}

impl Default for RegisterTables {
    fn default() -> Self {
        Self::standard()
    }
}
