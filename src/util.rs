// Utility helpers for parsing, display names and number formatting.
//
// This module centralizes the "dirty" number/date/name handling so the
// normalizer and the renderers can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Known mis-decoded (or ASCII-folded) country names published upstream,
/// mapped to their proper display form.
static COUNTRY_NAME_FIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Cote_dIvoire", "Côte d'Ivoire"),
        ("CÃ´te_dIvoire", "Côte d'Ivoire"),
        ("CÃ´te_d'Ivoire", "Côte d'Ivoire"),
        ("CuraÃ§ao", "Curaçao"),
        ("RÃ©union", "Réunion"),
        ("SÃ£o_TomÃ©_and_PrÃ­ncipe", "São Tomé and Príncipe"),
    ])
});

/// Parse an integer count while being forgiving about the formatting issues
/// common in spreadsheet and JSON exports.
///
/// - Blank or missing input yields `Ok(None)`.
/// - Thousands separators like `","` are stripped.
/// - Whole floats (`"12.0"`) are accepted; `"1.9"` is not.
/// - Anything else is reported back as an error message.
pub fn parse_count(s: Option<&str>) -> Result<Option<i64>, String> {
    let Some(raw) = s else {
        return Ok(None);
    };
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let s = s.replace(',', "");
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Ok(Some(v as i64))
        }
        _ => Err(format!("`{}` is not a number", raw.trim())),
    }
}

// Upstream publishes `DD/MM/YYYY`; older exports used ISO dates or
// `YYYY/MM/DD`.
const REPORT_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%Y/%m/%d"];

pub fn parse_report_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    REPORT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Apply the fixed correction table, then turn upstream's underscores into
/// spaces. Running it on an already corrected name is a no-op.
pub fn correct_country_name(raw: &str) -> String {
    let raw = raw.trim();
    let fixed = COUNTRY_NAME_FIXES.get(raw).copied().unwrap_or(raw);
    fixed.replace('_', " ")
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format`, used for counts in console tables
    // and on the rendered pages (e.g. `9,855`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_handles_blank_and_separators() {
        assert_eq!(parse_count(None), Ok(None));
        assert_eq!(parse_count(Some("   ")), Ok(None));
        assert_eq!(parse_count(Some("1,234")), Ok(Some(1234)));
        assert_eq!(parse_count(Some(" -5 ")), Ok(Some(-5)));
        assert_eq!(parse_count(Some("12.0")), Ok(Some(12)));
    }

    #[test]
    fn parse_count_rejects_text_and_fractions() {
        assert!(parse_count(Some("n/a")).is_err());
        assert!(parse_count(Some("1.9")).is_err());
        assert!(parse_count(Some("-0.5")).is_err());
    }

    #[test]
    fn report_dates_accept_known_layouts() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 2);
        assert_eq!(parse_report_date("02/03/2020"), expected);
        assert_eq!(parse_report_date("2020-03-02"), expected);
        assert_eq!(parse_report_date(" 2020/03/02 "), expected);
        assert_eq!(parse_report_date("2020-02-30"), None);
        assert_eq!(parse_report_date("March 2nd"), None);
    }

    #[test]
    fn country_names_are_corrected_once() {
        assert_eq!(correct_country_name("Cote_dIvoire"), "Côte d'Ivoire");
        assert_eq!(correct_country_name("CuraÃ§ao"), "Curaçao");
        assert_eq!(correct_country_name("United_Kingdom"), "United Kingdom");
        let once = correct_country_name("Cote_dIvoire");
        assert_eq!(correct_country_name(&once), once);
    }

    #[test]
    fn format_int_uses_thousands_separators() {
        assert_eq!(format_int(9855u64), "9,855");
        assert_eq!(format_date(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()), "2020-03-01");
    }
}
