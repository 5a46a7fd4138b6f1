// Record normalizer: one raw row in, one canonical `DailyRecord` out.
//
// Both row shapes are first flattened into `RowFields` (optional text per
// field) so that every check below runs through a single validation path.
use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::MalformedRow;
use crate::types::{DailyRecord, RawRow, SignPolicy};
use crate::util::{correct_country_name, parse_count, parse_report_date};

// Field names seen across the historical dataset layouts. Matched
// case-insensitively, first hit wins.
const DAY_KEYS: &[&str] = &["day"];
const MONTH_KEYS: &[&str] = &["month"];
const YEAR_KEYS: &[&str] = &["year"];
const REPORT_DATE_KEYS: &[&str] = &["dateRep", "date"];
const CASES_KEYS: &[&str] = &["cases", "newCases"];
const DEATHS_KEYS: &[&str] = &["deaths", "newDeaths"];
const NAME_KEYS: &[&str] = &["countriesAndTerritories", "countryName", "country", "name"];
const CODE_KEYS: &[&str] = &["geoId", "countryCode", "geo_id", "code"];
const POPULATION_KEYS: &[&str] = &["popData2019", "popData2020", "popData2018", "population"];

// Positional layout: dateRep, day, month, year, cases, deaths,
// countriesAndTerritories, geoId, countryterritoryCode, popData, ...
const POS_REPORT_DATE: usize = 0;
const POS_DAY: usize = 1;
const POS_MONTH: usize = 2;
const POS_YEAR: usize = 3;
const POS_CASES: usize = 4;
const POS_DEATHS: usize = 5;
const POS_NAME: usize = 6;
const POS_CODE: usize = 7;
const POS_POPULATION: usize = 9;

const INDEX_PAGE: &str = "index";

#[derive(Debug, Default)]
struct RowFields {
    report_date: Option<String>,
    day: Option<String>,
    month: Option<String>,
    year: Option<String>,
    cases: Option<String>,
    deaths: Option<String>,
    name: Option<String>,
    code: Option<String>,
    population: Option<String>,
}

/// Normalize one raw row.
///
/// Cases and deaths go through `policy`; a negative population is always
/// taken by magnitude. Missing or blank counts become zero. The date is
/// composed from day/month/year, falling back to the report date when the
/// parts are absent. Codes become file names, so they are restricted to
/// `[a-z0-9_-]` and may not be `index`.
pub fn normalize(row: &RawRow, policy: SignPolicy) -> Result<DailyRecord, MalformedRow> {
    let fields = match row {
        RawRow::Keyed(map) => keyed_fields(map)?,
        RawRow::Positional(cells) => positional_fields(cells)?,
    };
    validate(fields, policy)
}

fn keyed_fields(map: &Map<String, Value>) -> Result<RowFields, MalformedRow> {
    Ok(RowFields {
        report_date: lookup(map, REPORT_DATE_KEYS)?,
        day: lookup(map, DAY_KEYS)?,
        month: lookup(map, MONTH_KEYS)?,
        year: lookup(map, YEAR_KEYS)?,
        cases: lookup(map, CASES_KEYS)?,
        deaths: lookup(map, DEATHS_KEYS)?,
        name: lookup(map, NAME_KEYS)?,
        code: lookup(map, CODE_KEYS)?,
        population: lookup(map, POPULATION_KEYS)?,
    })
}

fn lookup(map: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, MalformedRow> {
    let hit = keys
        .iter()
        .find_map(|key| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)));
    match hit {
        None => Ok(None),
        Some((_, Value::Null)) => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((_, Value::Number(n))) => Ok(Some(n.to_string())),
        Some((k, _)) => Err(MalformedRow::new(format!("field `{k}` is not a scalar"))),
    }
}

fn positional_fields(cells: &[String]) -> Result<RowFields, MalformedRow> {
    if cells.len() <= POS_CODE {
        return Err(MalformedRow::new(format!(
            "expected at least {} columns, found {}",
            POS_CODE + 1,
            cells.len()
        )));
    }
    let cell = |i: usize| cells.get(i).cloned();
    Ok(RowFields {
        report_date: cell(POS_REPORT_DATE),
        day: cell(POS_DAY),
        month: cell(POS_MONTH),
        year: cell(POS_YEAR),
        cases: cell(POS_CASES),
        deaths: cell(POS_DEATHS),
        name: cell(POS_NAME),
        code: cell(POS_CODE),
        population: cell(POS_POPULATION),
    })
}

fn validate(f: RowFields, policy: SignPolicy) -> Result<DailyRecord, MalformedRow> {
    let date = compose_date(&f)?;

    let code = f
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MalformedRow::new("missing country code"))?
        .to_lowercase();
    check_code(&code)?;
    let name = f
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MalformedRow::new(format!("missing country name for `{code}`")))?;

    Ok(DailyRecord {
        country_name: correct_country_name(name),
        country_code: code,
        date,
        cases: count("cases", f.cases.as_deref(), policy)?,
        deaths: count("deaths", f.deaths.as_deref(), policy)?,
        population: population(f.population.as_deref())?,
    })
}

fn check_code(code: &str) -> Result<(), MalformedRow> {
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-';
    if !code.chars().all(allowed) {
        return Err(MalformedRow::new(format!(
            "country code `{code}` may only use a-z, 0-9, `_` and `-`"
        )));
    }
    if code == INDEX_PAGE {
        return Err(MalformedRow::new("country code `index` clashes with the index page"));
    }
    Ok(())
}

fn compose_date(f: &RowFields) -> Result<NaiveDate, MalformedRow> {
    let part = |name: &str, v: Option<&str>| {
        parse_count(v).map_err(|e| MalformedRow::new(format!("{name}: {e}")))
    };
    let day = part("day", f.day.as_deref())?;
    let month = part("month", f.month.as_deref())?;
    let year = part("year", f.year.as_deref())?;

    match (day, month, year) {
        (Some(d), Some(m), Some(y)) => {
            let date = u32::try_from(d).ok().zip(u32::try_from(m).ok()).and_then(|(d, m)| {
                i32::try_from(y)
                    .ok()
                    .and_then(|y| NaiveDate::from_ymd_opt(y, m, d))
            });
            date.ok_or_else(|| MalformedRow::new(format!("{y}-{m}-{d} is not a calendar date")))
        }
        (None, None, None) => f
            .report_date
            .as_deref()
            .and_then(parse_report_date)
            .ok_or_else(|| MalformedRow::new("missing day/month/year")),
        _ => Err(MalformedRow::new("incomplete day/month/year")),
    }
}

// The sign policy does not apply to population.
fn population(raw: Option<&str>) -> Result<u64, MalformedRow> {
    let v = parse_count(raw)
        .map_err(|e| MalformedRow::new(format!("population: {e}")))?
        .unwrap_or(0);
    Ok(v.unsigned_abs())
}

fn count(field: &str, raw: Option<&str>, policy: SignPolicy) -> Result<u64, MalformedRow> {
    let v = parse_count(raw)
        .map_err(|e| MalformedRow::new(format!("{field}: {e}")))?
        .unwrap_or(0);
    if v >= 0 {
        return Ok(v.unsigned_abs());
    }
    match policy {
        SignPolicy::Absolute => Ok(v.unsigned_abs()),
        SignPolicy::Clamp => Ok(0),
        SignPolicy::Reject => Err(MalformedRow::new(format!("{field} is negative ({v})"))),
    }
}
