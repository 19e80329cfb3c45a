/// Shared utility functions for register cleaning
use regex::Regex;

/// Extract the station number from OCR'd metadata text
///
/// Register headers carry the station number with surrounding text such as
/// "No. 1234" or "1234 (old 987)". The first run of digits is the number;
/// letters commonly misread for digits are repaired first when they sit next
/// to digits ("12O4" -> "1204").
///
/// # Examples
///
/// ```
/// use rainfall_register::utils::extract_station_number;
///
/// assert_eq!(extract_station_number("1234").unwrap(), "1234");
/// assert_eq!(extract_station_number("No. 1234").unwrap(), "1234");
/// assert_eq!(extract_station_number("12O4").unwrap(), "1204");
/// assert!(extract_station_number("unknown").is_err());
/// ```
pub fn extract_station_number(value: &str) -> Result<String, &'static str> {
    let token_re = Regex::new(r"[0-9OolI]*[0-9][0-9OolI]*").map_err(|_| "Invalid pattern")?;

    token_re
        .find(value)
        .map(|m| {
            m.as_str()
                .chars()
                .map(|c| match c {
                    'O' | 'o' => '0',
                    'l' | 'I' => '1',
                    other => other,
                })
                .collect()
        })
        .ok_or("No station number found")
}
