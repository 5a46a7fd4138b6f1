use crate::types::{
    CountrySummaryRow, CumulativeSeries, DailySeries, SummaryStats, WORLDWIDE_CODE,
};
use crate::util::{format_date, format_int};
use std::cmp::Ordering;

/// Latest running totals per country, highest cumulative cases first.
///
/// The worldwide aggregate is left out; it is reported by `generate_summary`.
pub fn country_ranking(cumul: &CumulativeSeries) -> Vec<CountrySummaryRow> {
    let mut latest: Vec<_> = cumul
        .codes()
        .filter(|code| *code != WORLDWIDE_CODE)
        .filter_map(|code| cumul.latest(code))
        .collect();
    latest.sort_by(|a, b| match b.cases.cmp(&a.cases) {
        Ordering::Equal => a.country_code.cmp(&b.country_code),
        other => other,
    });
    latest
        .into_iter()
        .map(|r| {
            let fatality = if r.cases == 0 {
                0.0
            } else {
                r.deaths as f64 / r.cases as f64 * 100.0
            };
            CountrySummaryRow {
                code: r.country_code.clone(),
                country: r.country_name.clone(),
                last_date: format_date(r.date),
                total_cases: format_int(r.cases),
                total_deaths: format_int(r.deaths),
                fatality_pct: format!("{:.2}", fatality),
            }
        })
        .collect()
}

pub fn generate_summary(daily: &DailySeries) -> SummaryStats {
    let dates = daily
        .country(WORLDWIDE_CODE)
        .map(|ww| (ww.keys().next().copied(), ww.keys().next_back().copied()))
        .unwrap_or((None, None));
    let total = daily.total();
    SummaryStats {
        total_rows: total.rows,
        total_countries: daily.codes().filter(|c| *c != WORLDWIDE_CODE).count(),
        first_date: dates.0,
        last_date: dates.1,
        total_cases: total.cases,
        total_deaths: total.deaths,
        total_population: total.population,
    }
}
