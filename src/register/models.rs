/// Register data model
///
/// Raw records mirror what the extractor emits (loose field casing, tokens that
/// may be strings, numbers or null). Cleaned records are the canonical shapes
/// served to the rendering and export layers.
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use utoipa::ToSchema;

/// Serialized form of a missing value
pub const MISSING_MARKER: &str = "-";

/// A cleaned rainfall value: two-decimal number or an explicit missing marker
///
/// Serializes as a JSON number, or as `"-"` when missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rainfall {
    Value(f64),
    Missing,
}

impl Rainfall {
    pub fn value(self) -> Option<f64> {
        match self {
            Rainfall::Value(v) => Some(v),
            Rainfall::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Rainfall::Missing)
    }

    /// Text form used for display and re-normalization
    ///
    /// Values always carry two decimals so that feeding the token back through
    /// the normalizer yields the same value ("1.00", never "1").
    pub fn to_token(self) -> String {
        match self {
            Rainfall::Value(v) => format!("{v:.2}"),
            Rainfall::Missing => MISSING_MARKER.to_string(),
        }
    }
}

impl fmt::Display for Rainfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl Serialize for Rainfall {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rainfall::Value(v) => serializer.serialize_f64(*v),
            Rainfall::Missing => serializer.serialize_str(MISSING_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for Rainfall {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RainfallVisitor;

        impl<'de> Visitor<'de> for RainfallVisitor {
            type Value = Rainfall;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number or the missing marker \"-\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Rainfall, E> {
                Ok(Rainfall::Value(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rainfall, E> {
                Ok(Rainfall::Value(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rainfall, E> {
                Ok(Rainfall::Value(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Rainfall, E> {
                let trimmed = v.trim();
                if trimmed == MISSING_MARKER || trimmed.is_empty() {
                    return Ok(Rainfall::Missing);
                }
                trimmed
                    .parse::<f64>()
                    .map(Rainfall::Value)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Rainfall, E> {
                Ok(Rainfall::Missing)
            }

            fn visit_none<E: de::Error>(self) -> Result<Rainfall, E> {
                Ok(Rainfall::Missing)
            }
        }

        deserializer.deserialize_any(RainfallVisitor)
    }
}

/// Calendar month, in canonical register order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Three-letter label ("Jan", "Feb", ...)
    pub fn abbreviation(self) -> &'static str {
        &self.name()[..3]
    }

    /// 1-based month number
    pub fn number(self) -> u32 {
        self as u32 + 1
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthEntry {
    #[serde(rename = "Month")]
    pub month: Month,
    #[serde(rename = "rainfall")]
    #[schema(value_type = Object)]
    pub value: Rainfall,
}

/// One register year with all twelve months in calendar order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct YearBlock {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "rainfall")]
    #[schema(value_type = Vec<MonthEntry>)]
    pub months: [MonthEntry; 12],
}

impl YearBlock {
    /// Year with every month missing
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            months: Month::ALL.map(|month| MonthEntry {
                month,
                value: Rainfall::Missing,
            }),
        }
    }

    pub fn value(&self, month: Month) -> Rainfall {
        self.months[month as usize].value
    }

    pub fn present_months(&self) -> usize {
        self.months.iter().filter(|m| !m.value.is_missing()).count()
    }

    /// Sum of the non-missing months rounded to two decimals
    ///
    /// `None` when every month is missing.
    pub fn sum(&self) -> Option<f64> {
        let mut present = self.months.iter().filter_map(|m| m.value.value()).peekable();
        present.peek()?;
        Some(round2(present.sum()))
    }
}

/// Canonical monthly grid, one block per year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTable {
    #[serde(rename = "rainfall")]
    pub years: Vec<YearBlock>,
}

impl MonthlyTable {
    pub fn new(years: Vec<YearBlock>) -> Self {
        Self { years }
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn year_list(&self) -> Vec<i32> {
        self.years.iter().map(|b| b.year).collect()
    }

    pub fn get(&self, year: i32) -> Option<&YearBlock> {
        self.years.iter().find(|b| b.year == year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TotalEntry {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Total")]
    #[schema(value_type = Object)]
    pub total: Rainfall,
}

/// Annual totals aligned with a monthly table's years
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TotalsTable {
    #[serde(rename = "Totals")]
    pub entries: Vec<TotalEntry>,
}

impl TotalsTable {
    pub fn total_for(&self, year: i32) -> Option<Rainfall> {
        self.entries.iter().find(|e| e.year == year).map(|e| e.total)
    }

    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.total.is_missing()).count()
    }
}

/// Raw extracted text for one cell or total
///
/// Extractors emit strings most of the time but occasionally numbers or
/// `null`; all three are accepted and kept as text. Any other JSON shape is a
/// malformed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Token(pub Option<String>);

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Token(Some(text.into()))
    }

    pub fn absent() -> Self {
        Token(None)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::new(value)
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokenVisitor;

        impl<'de> Visitor<'de> for TokenVisitor {
            type Value = Token;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, a number or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Token, E> {
                Ok(Token::new(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Token, E> {
                Ok(Token(Some(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Token, E> {
                // Keep the point on integral floats: "123" would read as 1.23
                let text = if v.fract() == 0.0 {
                    format!("{v:.1}")
                } else {
                    v.to_string()
                };
                Ok(Token(Some(text)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Token, E> {
                Ok(Token(Some(v.to_string())))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Token, E> {
                Ok(Token(Some(v.to_string())))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Token, E> {
                Ok(Token::absent())
            }

            fn visit_none<E: de::Error>(self) -> Result<Token, E> {
                Ok(Token::absent())
            }

            fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Token, D::Error> {
                deserializer.deserialize_any(TokenVisitor)
            }
        }

        deserializer.deserialize_any(TokenVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawMonthEntry {
    #[serde(rename = "Month", alias = "month", default)]
    pub month: Option<String>,
    #[serde(rename = "rainfall", alias = "Rainfall", alias = "value", default)]
    pub token: Token,
}

/// One year of the extractor's monthly grid, possibly incomplete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawYearBlock {
    /// Only integer years take part in year discovery
    #[serde(rename = "Year", alias = "year", default, deserialize_with = "integer_year")]
    pub year: Option<i32>,
    #[serde(
        rename = "rainfall",
        alias = "Rainfall",
        alias = "months",
        default,
        deserialize_with = "vec_or_null"
    )]
    pub months: Vec<RawMonthEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawMonthlyDocument {
    #[serde(rename = "rainfall", alias = "Rainfall", default, deserialize_with = "vec_or_null")]
    pub years: Vec<RawYearBlock>,
}

/// Annual totals in the order the extractor read them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawTotalsDocument {
    #[serde(rename = "Totals", alias = "totals", default, deserialize_with = "vec_or_null")]
    pub totals: Vec<Token>,
}

fn integer_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_i64().and_then(|y| i32::try_from(y).ok()))
}

fn vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Two-decimal rounding, exact halves to even
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
