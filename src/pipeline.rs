// One batch run: fetch if changed, normalize, aggregate, derive, render.
use anyhow::Context;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::DataError;
use crate::fetch::{Fetch, FetchOutcome, SnapshotStore};
use crate::loader::load_file;
use crate::output::{write_csv, write_json};
use crate::render::{CountryPage, Render};
use crate::reports::{country_ranking, generate_summary};
use crate::series::{aggregate, derive};
use crate::toc::build_toc;
use crate::types::{CountrySummaryRow, CumulativeSeries, DailyRecord, DailySeries, SummaryStats};

pub const SUMMARY_FILE: &str = "summary.json";
pub const RANKING_FILE: &str = "countries.csv";

#[derive(Debug)]
pub enum RunStatus {
    /// Upstream unchanged (or unreachable); nothing was written.
    UpToDate,
    Regenerated(RunReport),
}

#[derive(Debug)]
pub struct RunReport {
    pub source: PathBuf,
    pub summary: SummaryStats,
    pub ranking: Vec<CountrySummaryRow>,
    pub pages: usize,
    /// Country codes whose page could not be rendered.
    pub failed: Vec<String>,
}

/// Aggregate and derive both series. Nothing past this point mutates them.
pub fn build_series(
    records: &[DailyRecord],
) -> Result<(DailySeries, CumulativeSeries), DataError> {
    let daily = aggregate(records)?;
    let cumulative = derive(&daily)?;
    Ok((daily, cumulative))
}

/// Decide which snapshot to process, if any.
///
/// A local `input` always wins. Otherwise the dataset is downloaded and
/// stored when it changed; with `force`, the newest stored snapshot is used
/// even if upstream did not change or could not be reached.
pub fn resolve_source(
    config: &Config,
    fetcher: &dyn Fetch,
    today: NaiveDate,
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(input) = &config.input {
        return Ok(Some(input.clone()));
    }

    let store = SnapshotStore::new(&config.data_dir);
    let prior = store
        .prior_checksum()
        .with_context(|| format!("reading checksum in {}", config.data_dir.display()))?;

    match fetcher.fetch(&config.url, prior.as_deref()) {
        Ok(FetchOutcome::Changed { bytes, checksum }) => {
            let ext = config.format.resolve(&bytes).extension();
            let path = store
                .save(today, ext, &bytes, &checksum)
                .with_context(|| format!("saving snapshot in {}", config.data_dir.display()))?;
            info!(path = %path.display(), %checksum, "stored new snapshot");
            return Ok(Some(path));
        }
        Ok(FetchOutcome::Unchanged) => info!(url = %config.url, "upstream unchanged"),
        Err(e) => warn!(url = %config.url, error = %e, "download failed"),
    }

    if config.force {
        let latest = store.latest()?;
        if latest.is_none() {
            warn!(dir = %config.data_dir.display(), "forced run but no snapshot is stored");
        }
        return Ok(latest);
    }
    Ok(None)
}

/// Render every country; a failing page is logged and counted, the others
/// still get written.
pub fn render_all(
    daily: &DailySeries,
    cumulative: &CumulativeSeries,
    renderer: &dyn Render,
) -> (usize, Vec<String>) {
    let mut pages = 0;
    let mut failed = Vec::new();
    for code in daily.codes() {
        let name = daily.name_of(code).unwrap_or(code);
        let page = CountryPage {
            code,
            name,
            daily: daily.points(code),
            cumulative: cumulative.points(code),
        };
        match renderer.render_country(&page) {
            Ok(_) => pages += 1,
            Err(e) => {
                error!(code, error = %e, "failed to render country page");
                failed.push(code.to_string());
            }
        }
    }
    (pages, failed)
}

pub fn regenerate(
    config: &Config,
    source: &Path,
    renderer: &dyn Render,
    updated: &str,
) -> anyhow::Result<RunReport> {
    let (records, load_report) = load_file(source, config.format, config.sign_policy)
        .with_context(|| format!("loading {}", source.display()))?;
    info!(
        rows = load_report.total_rows,
        format = ?load_report.format,
        source = %source.display(),
        "dataset loaded"
    );

    let (daily, cumulative) = build_series(&records)?;
    let total = daily.total();
    info!(
        countries = daily.codes().count(),
        cases = total.cases,
        deaths = total.deaths,
        "series built"
    );

    let (pages, mut failed) = render_all(&daily, &cumulative, renderer);
    let toc = build_toc(daily.entries());
    if let Err(e) = renderer.render_index(&toc, updated) {
        error!(error = %e, "failed to render index page");
        failed.push("index".to_string());
    }

    let summary = generate_summary(&daily);
    let ranking = country_ranking(&cumulative);
    write_json(&config.out_dir.join(SUMMARY_FILE), &summary)?;
    write_csv(&config.out_dir.join(RANKING_FILE), &ranking)?;

    Ok(RunReport {
        source: source.to_path_buf(),
        summary,
        ranking,
        pages,
        failed,
    })
}

pub fn run(
    config: &Config,
    fetcher: &dyn Fetch,
    renderer: &dyn Render,
    today: NaiveDate,
    updated: &str,
) -> anyhow::Result<RunStatus> {
    match resolve_source(config, fetcher, today)? {
        Some(source) => Ok(RunStatus::Regenerated(regenerate(
            config, &source, renderer, updated,
        )?)),
        None => Ok(RunStatus::UpToDate),
    }
}
