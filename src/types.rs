use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::error::MalformedRow;

/// Key of the synthetic per-date worldwide aggregate.
pub const WORLDWIDE_CODE: &str = "ww";
pub const WORLDWIDE_NAME: &str = "Worldwide";
/// Reserved for the grand total counter; never a country.
pub const TOTAL_KEY: &str = "total";

/// One input row, in either of the two shapes the upstream exports use.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Record-of-fields row (JSON object).
    Keyed(Map<String, Value>),
    /// Fixed-position row (spreadsheet/CSV line, or JSON array).
    Positional(Vec<String>),
}

impl TryFrom<Value> for RawRow {
    type Error = MalformedRow;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(RawRow::Keyed(map)),
            Value::Array(cells) => cells
                .into_iter()
                .map(|cell| match cell {
                    Value::Null => Ok(String::new()),
                    Value::String(s) => Ok(s),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                        Err(MalformedRow::new("positional cell is not a scalar"))
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(RawRow::Positional),
            other => Err(MalformedRow::new(format!(
                "unsupported row shape: {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What to do with negative case/death counts published as corrections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SignPolicy {
    /// Flip the sign (`-5` becomes `5`).
    #[default]
    Absolute,
    /// Replace negatives with zero.
    Clamp,
    /// Fail the row as malformed.
    Reject,
}

/// One country's counts on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRecord {
    pub country_code: String,
    pub country_name: String,
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
    pub population: u64,
}

impl DailyRecord {
    pub(crate) fn zeroed(code: &str, name: &str, date: NaiveDate) -> Self {
        Self {
            country_code: code.to_string(),
            country_name: name.to_string(),
            date,
            cases: 0,
            deaths: 0,
            population: 0,
        }
    }
}

/// Running totals for one country up to and including `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativeRecord {
    pub country_code: String,
    pub country_name: String,
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
    pub population: u64,
}

/// Grand sum over every processed row. Scalar, not date-keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub rows: u64,
    pub cases: u64,
    pub deaths: u64,
    pub population: u64,
}

/// Date-ordered view handed to the renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
    pub population: u64,
    pub country_name: String,
}

/// country code -> date -> daily record, plus the synthetic `ww` entry and
/// the grand total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySeries {
    pub(crate) countries: BTreeMap<String, BTreeMap<NaiveDate, DailyRecord>>,
    pub(crate) total: Totals,
}

impl DailySeries {
    pub(crate) fn empty() -> Self {
        let mut countries = BTreeMap::new();
        countries.insert(WORLDWIDE_CODE.to_string(), BTreeMap::new());
        Self {
            countries,
            total: Totals::default(),
        }
    }

    pub fn total(&self) -> Totals {
        self.total
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    pub fn country(&self, code: &str) -> Option<&BTreeMap<NaiveDate, DailyRecord>> {
        self.countries.get(code)
    }

    /// Display name of a country, taken from its earliest record.
    pub fn name_of(&self, code: &str) -> Option<&str> {
        if code == WORLDWIDE_CODE {
            return Some(WORLDWIDE_NAME);
        }
        self.countries
            .get(code)?
            .values()
            .next()
            .map(|r| r.country_name.as_str())
    }

    /// `(code, name)` pairs for every country, worldwide included.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.codes()
            .filter_map(|code| Some((code.to_string(), self.name_of(code)?.to_string())))
            .collect()
    }

    pub fn points(&self, code: &str) -> Vec<SeriesPoint> {
        self.countries
            .get(code)
            .map(|days| {
                days.values()
                    .map(|r| SeriesPoint {
                        date: r.date,
                        cases: r.cases,
                        deaths: r.deaths,
                        population: r.population,
                        country_name: r.country_name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// country code -> date -> running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativeSeries {
    pub(crate) countries: BTreeMap<String, BTreeMap<NaiveDate, CumulativeRecord>>,
}

impl CumulativeSeries {
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    pub fn country(&self, code: &str) -> Option<&BTreeMap<NaiveDate, CumulativeRecord>> {
        self.countries.get(code)
    }

    /// Last running-total record of a country, if it has any dates.
    pub fn latest(&self, code: &str) -> Option<&CumulativeRecord> {
        self.countries.get(code)?.values().next_back()
    }

    pub fn points(&self, code: &str) -> Vec<SeriesPoint> {
        self.countries
            .get(code)
            .map(|days| {
                days.values()
                    .map(|r| SeriesPoint {
                        date: r.date,
                        cases: r.cases,
                        deaths: r.deaths,
                        population: r.population,
                        country_name: r.country_name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub code: String,
    pub name: String,
}

/// Countries sharing the same uppercased first letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocGroup {
    pub letter: String,
    pub entries: Vec<TocEntry>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountrySummaryRow {
    #[serde(rename = "Code")]
    #[tabled(rename = "Code")]
    pub code: String,
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "LastDate")]
    #[tabled(rename = "LastDate")]
    pub last_date: String,
    #[serde(rename = "TotalCases")]
    #[tabled(rename = "TotalCases")]
    pub total_cases: String,
    #[serde(rename = "TotalDeaths")]
    #[tabled(rename = "TotalDeaths")]
    pub total_deaths: String,
    #[serde(rename = "FatalityPct")]
    #[tabled(rename = "FatalityPct")]
    pub fatality_pct: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SummaryStats {
    pub total_rows: u64,
    pub total_countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub total_population: u64,
}
