// Aggregation core: daily series with the worldwide aggregate and grand
// total, and the cumulative series derived from it.
use std::collections::BTreeMap;

use crate::error::DataError;
use crate::types::{
    CumulativeRecord, CumulativeSeries, DailyRecord, DailySeries, WORLDWIDE_CODE, WORLDWIDE_NAME,
    TOTAL_KEY,
};

pub fn is_reserved_code(code: &str) -> bool {
    code.eq_ignore_ascii_case(WORLDWIDE_CODE) || code.eq_ignore_ascii_case(TOTAL_KEY)
}

/// Fold records, in input order, into a new daily series.
///
/// The first record seen for a (country, date) key is kept and later ones
/// are dropped, but every record is added to the worldwide slot for its
/// date and to the grand total. Reserved codes are rejected before any
/// folding happens.
pub fn aggregate(records: &[DailyRecord]) -> Result<DailySeries, DataError> {
    if let Some((idx, r)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| is_reserved_code(&r.country_code))
    {
        return Err(DataError::ReservedKey {
            row: idx + 1,
            code: r.country_code.clone(),
        });
    }
    records
        .iter()
        .enumerate()
        .try_fold(DailySeries::empty(), |mut series, (idx, r)| {
            series.absorb(r, idx + 1)?;
            Ok(series)
        })
}

impl DailySeries {
    /// Every sum is checked before anything is stored, so a failed row
    /// leaves the series as it was.
    fn absorb(&mut self, r: &DailyRecord, row: usize) -> Result<(), DataError> {
        let add = |field: &'static str, a: u64, b: u64| {
            a.checked_add(b).ok_or(DataError::Overflow { row, field })
        };

        let (ww_cases, ww_deaths, ww_population) = self
            .countries
            .get(WORLDWIDE_CODE)
            .and_then(|days| days.get(&r.date))
            .map_or((0, 0, 0), |w| (w.cases, w.deaths, w.population));
        let ww_cases = add("cases", ww_cases, r.cases)?;
        let ww_deaths = add("deaths", ww_deaths, r.deaths)?;
        let ww_population = add("population", ww_population, r.population)?;

        let total_cases = add("cases", self.total.cases, r.cases)?;
        let total_deaths = add("deaths", self.total.deaths, r.deaths)?;
        let total_population = add("population", self.total.population, r.population)?;

        self.countries
            .entry(r.country_code.clone())
            .or_default()
            .entry(r.date)
            .or_insert_with(|| r.clone());

        let ww = self
            .countries
            .entry(WORLDWIDE_CODE.to_string())
            .or_default()
            .entry(r.date)
            .or_insert_with(|| DailyRecord::zeroed(WORLDWIDE_CODE, WORLDWIDE_NAME, r.date));
        ww.cases = ww_cases;
        ww.deaths = ww_deaths;
        ww.population = ww_population;

        self.total.rows += 1;
        self.total.cases = total_cases;
        self.total.deaths = total_deaths;
        self.total.population = total_population;
        Ok(())
    }
}

/// Running totals per country in ascending date order. The grand total is
/// scalar and has no counterpart here.
pub fn derive(series: &DailySeries) -> Result<CumulativeSeries, DataError> {
    let mut countries = BTreeMap::new();
    for (code, days) in &series.countries {
        let (mut cases, mut deaths, mut population) = (0u64, 0u64, 0u64);
        let mut running = BTreeMap::new();
        for (date, r) in days {
            let add = |field: &'static str, a: u64, b: u64| {
                a.checked_add(b).ok_or_else(|| DataError::CumulativeOverflow {
                    code: code.clone(),
                    date: *date,
                    field,
                })
            };
            cases = add("cases", cases, r.cases)?;
            deaths = add("deaths", deaths, r.deaths)?;
            population = add("population", population, r.population)?;
            let record = CumulativeRecord {
                country_code: r.country_code.clone(),
                country_name: r.country_name.clone(),
                date: *date,
                cases,
                deaths,
                population,
            };
            running.insert(*date, record);
        }
        countries.insert(code.clone(), running);
    }
    Ok(CumulativeSeries { countries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn rec(code: &str, name: &str, d: u32, cases: u64, deaths: u64) -> DailyRecord {
        DailyRecord {
            country_code: code.to_string(),
            country_name: name.to_string(),
            date: day(d),
            cases,
            deaths,
            population: 0,
        }
    }

    fn sample() -> Vec<DailyRecord> {
        vec![
            rec("fr", "France", 1, 10, 1),
            rec("de", "Germany", 1, 4, 0),
            rec("fr", "France", 2, 20, 2),
            rec("es", "Spain", 2, 7, 1),
            rec("de", "Germany", 3, 9, 3),
        ]
    }

    #[test]
    fn two_day_scenario() {
        let records = vec![rec("fr", "France", 1, 10, 1), rec("fr", "France", 2, 20, 2)];
        let daily = aggregate(&records).unwrap();
        let fr = daily.country("fr").unwrap();
        assert_eq!(fr[&day(1)].cases, 10);
        assert_eq!(fr[&day(2)].cases, 20);

        let ww = daily.country(WORLDWIDE_CODE).unwrap();
        assert_eq!(ww[&day(1)].cases, 10);
        assert_eq!(ww[&day(2)].cases, 20);
        assert_eq!(ww[&day(2)].country_name, "Worldwide");

        let cumul = derive(&daily).unwrap();
        let fr = cumul.country("fr").unwrap();
        assert_eq!(fr[&day(1)].cases, 10);
        assert_eq!(fr[&day(2)].cases, 30);
        assert_eq!(fr[&day(2)].deaths, 3);
    }

    #[test]
    fn first_write_wins_but_worldwide_adds_everything() {
        let records = vec![rec("fr", "France", 1, 10, 1), rec("fr", "France", 1, 99, 9)];
        let daily = aggregate(&records).unwrap();
        assert_eq!(daily.country("fr").unwrap()[&day(1)].cases, 10);
        assert_eq!(daily.country(WORLDWIDE_CODE).unwrap()[&day(1)].cases, 109);
        assert_eq!(daily.total().rows, 2);
        assert_eq!(daily.total().cases, 109);
        assert_eq!(daily.total().deaths, 10);
    }

    #[test]
    fn worldwide_is_the_sum_of_countries_per_date() {
        let daily = aggregate(&sample()).unwrap();
        let ww = daily.country(WORLDWIDE_CODE).unwrap();
        for (date, w) in ww {
            let sum: u64 = daily
                .codes()
                .filter(|c| *c != WORLDWIDE_CODE)
                .filter_map(|c| daily.country(c).unwrap().get(date))
                .map(|r| r.cases)
                .sum();
            assert_eq!(w.cases, sum, "date {date}");
        }
        assert_eq!(daily.total().cases, 50);
    }

    #[test]
    fn cumulative_counts_never_decrease() {
        let cumul = derive(&aggregate(&sample()).unwrap()).unwrap();
        for code in cumul.codes() {
            let values: Vec<u64> = cumul.country(code).unwrap().values().map(|r| r.cases).collect();
            assert!(values.windows(2).all(|w| w[0] <= w[1]), "{code}: {values:?}");
        }
        assert_eq!(cumul.latest(WORLDWIDE_CODE).unwrap().cases, 50);
    }

    #[test]
    fn reruns_are_identical() {
        let first = aggregate(&sample()).unwrap();
        let second = aggregate(&sample()).unwrap();
        assert_eq!(first, second);
        let (first, second) = (derive(&first).unwrap(), derive(&second).unwrap());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    fn with_population(mut r: DailyRecord, population: u64) -> DailyRecord {
        r.population = population;
        r
    }

    #[test]
    fn worldwide_adds_deaths_and_population() {
        let records = vec![
            with_population(rec("fr", "France", 1, 10, 1), 67_000_000),
            with_population(rec("de", "Germany", 1, 4, 2), 83_000_000),
            with_population(rec("fr", "France", 2, 20, 3), 67_000_000),
        ];
        let daily = aggregate(&records).unwrap();
        let ww = daily.country(WORLDWIDE_CODE).unwrap();
        assert_eq!(ww[&day(1)].deaths, 3);
        assert_eq!(ww[&day(1)].population, 150_000_000);
        assert_eq!(ww[&day(2)].deaths, 3);
        assert_eq!(ww[&day(2)].population, 67_000_000);
        assert_eq!(daily.total().deaths, 6);
        assert_eq!(daily.total().population, 217_000_000);

        let cumul = derive(&daily).unwrap();
        let fr = cumul.country("fr").unwrap();
        assert_eq!(fr[&day(2)].deaths, 4);
        assert_eq!(fr[&day(2)].population, 134_000_000);
        let ww = cumul.country(WORLDWIDE_CODE).unwrap();
        assert_eq!(ww[&day(1)].population, 150_000_000);
        assert_eq!(ww[&day(2)].population, 217_000_000);
        assert_eq!(ww[&day(2)].deaths, 6);
    }

    #[test]
    fn aggregate_overflow_is_an_error() {
        let huge = i64::MAX as u64;
        let records = vec![
            rec("fr", "France", 1, huge, 0),
            rec("de", "Germany", 1, huge, 0),
            rec("es", "Spain", 1, huge, 0),
        ];
        match aggregate(&records) {
            Err(DataError::Overflow { row, field }) => {
                assert_eq!(row, 3);
                assert_eq!(field, "cases");
            }
            other => panic!("expected Overflow, got {other:?}"),
        }

        let records = vec![
            with_population(rec("fr", "France", 1, 0, 0), u64::MAX),
            with_population(rec("fr", "France", 2, 0, 0), 1),
        ];
        assert!(matches!(
            aggregate(&records),
            Err(DataError::Overflow { row: 2, field: "population" })
        ));
    }

    #[test]
    fn cumulative_overflow_is_an_error() {
        let mut daily = DailySeries::empty();
        let fr = daily.countries.entry("fr".to_string()).or_default();
        fr.insert(day(1), rec("fr", "France", 1, u64::MAX, 0));
        fr.insert(day(2), rec("fr", "France", 2, 1, 0));
        match derive(&daily) {
            Err(DataError::CumulativeOverflow { code, date, field }) => {
                assert_eq!(code, "fr");
                assert_eq!(date, day(2));
                assert_eq!(field, "cases");
            }
            other => panic!("expected CumulativeOverflow, got {other:?}"),
        }
    }

    #[test]
    fn reserved_codes_abort_aggregation() {
        for code in ["WW", "ww", "Total"] {
            let records = vec![rec("fr", "France", 1, 10, 1), rec(code, "Bogus", 1, 5, 0)];
            match aggregate(&records) {
                Err(DataError::ReservedKey { row, code: c }) => {
                    assert_eq!(row, 2);
                    assert_eq!(c, code);
                }
                other => panic!("expected ReservedKey, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_input_still_has_worldwide() {
        let daily = aggregate(&[]).unwrap();
        assert_eq!(daily.codes().collect::<Vec<_>>(), vec![WORLDWIDE_CODE]);
        assert_eq!(daily.name_of(WORLDWIDE_CODE), Some("Worldwide"));
        assert!(derive(&daily).unwrap().country(WORLDWIDE_CODE).unwrap().is_empty());
    }
}
