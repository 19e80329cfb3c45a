/// Station metadata normalization
///
/// The metadata block is free-form header text the extractor splits into
/// fields. Cleaning is limited to trimming, dropping empty values and pulling
/// the station number out of surrounding text; `missing_fields` reports what
/// the header did not yield.
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::register::models::{Token, MISSING_MARKER};
use crate::utils::extract_station_number;

/// Header fields shown on the cleaned report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    StationNumber,
    Location,
    County,
    RiverBasin,
    GaugeType,
    Observer,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::StationNumber,
        MetadataField::Location,
        MetadataField::County,
        MetadataField::RiverBasin,
        MetadataField::GaugeType,
        MetadataField::Observer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetadataField::StationNumber => "Station Number",
            MetadataField::Location => "Location",
            MetadataField::County => "County",
            MetadataField::RiverBasin => "River Basin",
            MetadataField::GaugeType => "Type of Gauge",
            MetadataField::Observer => "Observer",
        }
    }
}

/// Metadata fields as the extractor emits them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStationMetadata {
    #[serde(rename = "StationNumber", alias = "station_number", default)]
    pub station_number: Token,
    #[serde(rename = "Location", alias = "location", default)]
    pub location: Token,
    #[serde(rename = "County", alias = "county", default)]
    pub county: Token,
    #[serde(rename = "River_basin", alias = "RiverBasin", alias = "river_basin", default)]
    pub river_basin: Token,
    #[serde(rename = "Type_of_gauge", alias = "TypeOfGauge", alias = "type_of_gauge", default)]
    pub type_of_gauge: Token,
    #[serde(rename = "Observer", alias = "observer", default)]
    pub observer: Token,
    #[serde(rename = "Year", alias = "year", default)]
    pub year: Token,
}

/// The metadata block is either nested under `station` or flat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMetadataDocument {
    Nested { station: RawStationMetadata },
    Flat(RawStationMetadata),
}

impl RawMetadataDocument {
    pub fn fields(&self) -> &RawStationMetadata {
        match self {
            RawMetadataDocument::Nested { station } => station,
            RawMetadataDocument::Flat(fields) => fields,
        }
    }
}

/// Cleaned station metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationMetadata {
    #[serde(rename = "StationNumber")]
    pub station_number: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "County")]
    pub county: Option<String>,
    #[serde(rename = "River_basin")]
    pub river_basin: Option<String>,
    #[serde(rename = "Type_of_gauge")]
    pub gauge_type: Option<String>,
    #[serde(rename = "Observer")]
    pub observer: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
}

impl StationMetadata {
    pub fn from_raw(raw: &RawStationMetadata) -> Self {
        let station_number = text(&raw.station_number).and_then(|s| {
            extract_station_number(&s)
                .map_err(|e| debug!("Station number {:?} not usable: {}", s, e))
                .ok()
        });

        let year = text(&raw.year).and_then(|s| s.parse::<i32>().ok());

        Self {
            station_number,
            location: text(&raw.location),
            county: text(&raw.county),
            river_basin: text(&raw.river_basin),
            gauge_type: text(&raw.type_of_gauge),
            observer: text(&raw.observer),
            year,
        }
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        match field {
            MetadataField::StationNumber => self.station_number.as_deref(),
            MetadataField::Location => self.location.as_deref(),
            MetadataField::County => self.county.as_deref(),
            MetadataField::RiverBasin => self.river_basin.as_deref(),
            MetadataField::GaugeType => self.gauge_type.as_deref(),
            MetadataField::Observer => self.observer.as_deref(),
        }
    }

    /// Value for the report, `"-"` when absent
    pub fn display_value(&self, field: MetadataField) -> &str {
        self.get(field).unwrap_or(MISSING_MARKER)
    }

    pub fn missing_fields(&self) -> Vec<MetadataField> {
        MetadataField::ALL
            .into_iter()
            .filter(|&field| self.get(field).is_none())
            .collect()
    }
}

impl From<&RawMetadataDocument> for StationMetadata {
    fn from(raw: &RawMetadataDocument) -> Self {
        StationMetadata::from_raw(raw.fields())
    }
}

fn text(token: &Token) -> Option<String> {
    token
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != MISSING_MARKER)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_station_block() {
        let raw: RawMetadataDocument = serde_json::from_value(json!({
            "station": {
                "StationNumber": 1234,
                "Location": "  Aberdare, Mardy ",
                "County": "Glamorgan",
                "River_basin": null,
                "Type_of_gauge": "",
                "Observer": "J. Jones"
            }
        }))
        .unwrap();

        let meta = StationMetadata::from(&raw);
        assert_eq!(meta.station_number.as_deref(), Some("1234"));
        assert_eq!(meta.location.as_deref(), Some("Aberdare, Mardy"));
        assert_eq!(meta.river_basin, None);
        assert_eq!(meta.gauge_type, None);
        assert_eq!(
            meta.missing_fields(),
            vec![MetadataField::RiverBasin, MetadataField::GaugeType]
        );
    }

    #[test]
    fn test_flat_block_with_year() {
        let raw: RawMetadataDocument = serde_json::from_value(json!({
            "Year": 1890,
            "StationNumber": "No. 58",
            "Location": "Glansychan"
        }))
        .unwrap();

        let meta = StationMetadata::from(&raw);
        assert_eq!(meta.year, Some(1890));
        assert_eq!(meta.station_number.as_deref(), Some("58"));
        assert_eq!(meta.display_value(MetadataField::Observer), "-");
        assert_eq!(meta.display_value(MetadataField::Location), "Glansychan");
    }

    #[test]
    fn test_unusable_station_number_dropped() {
        let raw = RawStationMetadata {
            station_number: Token::new("unknown"),
            ..RawStationMetadata::default()
        };
        assert_eq!(StationMetadata::from_raw(&raw).station_number, None);
    }
}
