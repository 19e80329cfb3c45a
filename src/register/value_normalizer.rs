/// OCR token normalizer
///
/// Converts one extracted token into a two-decimal value or `Rainfall::Missing`.
/// Never fails: anything that cannot be repaired into a number is missing.
use tracing::trace;

use crate::register::models::{round2, Rainfall, Token};
use crate::register::tables::OcrRules;

#[derive(Debug, Clone, Default)]
pub struct ValueNormalizer {
    rules: OcrRules,
}

impl ValueNormalizer {
    pub fn new(rules: OcrRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &OcrRules {
        &self.rules
    }

    pub fn normalize_token(&self, token: &Token) -> Rainfall {
        self.normalize(token.as_deref())
    }

    /// Normalize a raw token
    ///
    /// Examples (standard rules):
    /// - `"O.66"` -> 0.66 (letter O read for zero)
    /// - `"444"` -> 4.44 (decimal point lost)
    /// - `"3,25"` -> 3.25
    /// - `".5,"` -> 0.5
    /// - `"-"`, `""`, `"abc"`, `"0.00"` -> missing
    pub fn normalize(&self, token: Option<&str>) -> Rainfall {
        let Some(raw) = token else {
            return Rainfall::Missing;
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() || self.rules.placeholders.iter().any(|p| p == trimmed) {
            return Rainfall::Missing;
        }

        let Some(cleaned) = self.repair(trimmed) else {
            trace!("Token {:?} has no digits left after repair", raw);
            return Rainfall::Missing;
        };

        let parsed = match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                trace!("Token {:?} repaired to unparsable {:?}", raw, cleaned);
                return Rainfall::Missing;
            }
        };

        let rounded = round2(parsed);
        if rounded == 0.0 && self.rules.zero_is_missing {
            return Rainfall::Missing;
        }

        Rainfall::Value(rounded)
    }

    /// Character-level repair; returns digits with at most one '.'
    fn repair(&self, token: &str) -> Option<String> {
        let cleaned: String = token
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| self.substitute(c))
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        if cleaned.is_empty() {
            return None;
        }

        // Anything after a second '.' is noise
        let mut cleaned = if cleaned.matches('.').count() > 1 {
            let mut segments = cleaned.splitn(3, '.');
            let whole = segments.next().unwrap_or_default();
            let fraction = segments.next().unwrap_or_default();
            format!("{whole}.{fraction}")
        } else {
            cleaned
        };

        // Lost decimal point: "444" is 4.44 in this register's value range
        if !cleaned.contains('.') && cleaned.len() >= 3 {
            cleaned.insert(1, '.');
        }

        if cleaned.starts_with('.') {
            cleaned.insert(0, '0');
        }

        if cleaned.ends_with('.') {
            cleaned.pop();
        }

        Some(cleaned)
    }

    fn substitute(&self, c: char) -> char {
        if let Some(&(_, digit)) = self
            .rules
            .letter_substitutions
            .iter()
            .find(|(letter, _)| *letter == c)
        {
            return digit;
        }
        if self.rules.decimal_separators.contains(&c) {
            return '.';
        }
        c
    }
}

/// Normalize with the standard OCR rules
pub fn normalize_value(token: &str) -> Rainfall {
    ValueNormalizer::default().normalize(Some(token))
}
