// Entry point and high-level CLI flow.
//
// Meant to run from cron:
// - download the dataset and stop early when it has not changed,
// - otherwise rebuild every country page, the index and the run reports,
// - print a short summary and a preview of the most affected countries.
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use covid19_report::config::{Config, DEFAULT_DATA_DIR, DEFAULT_OUT_DIR, DEFAULT_URL};
use covid19_report::fetch::HttpFetcher;
use covid19_report::loader::InputFormat;
use covid19_report::output;
use covid19_report::pipeline::{self, RunReport, RunStatus};
use covid19_report::render::StaticSite;
use covid19_report::types::SignPolicy;
use covid19_report::util::{format_date, format_int};

#[derive(Parser)]
#[command(name = "covid19_report")]
#[command(about = "Render per-country COVID-19 charts and pages from the ECDC dataset", long_about = None)]
struct Cli {
    /// Dataset URL
    #[arg(long, env = "COVID19_URL", default_value = DEFAULT_URL)]
    url: String,
    /// Where downloaded snapshots and their checksum are kept
    #[arg(long, env = "COVID19_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Where the site is written
    #[arg(long, env = "COVID19_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,
    /// Use a local dataset instead of downloading
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,
    /// How negative case/death corrections are handled
    #[arg(long, value_enum, default_value_t = SignPolicy::Absolute)]
    sign_policy: SignPolicy,
    /// Regenerate even if the dataset did not change
    #[arg(short, long)]
    force: bool,
    /// Rows shown in the console preview
    #[arg(long, default_value_t = 10)]
    preview: usize,
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            url: cli.url,
            data_dir: cli.data_dir,
            out_dir: cli.out_dir,
            input: cli.input,
            format: cli.format,
            sign_policy: cli.sign_policy,
            force: cli.force,
            preview: cli.preview,
            timeout: Duration::from_secs(cli.timeout_secs),
        }
    }
}

/// Print the run summary and the top countries, in the same markdown table
/// style as the exported CSV.
fn print_report(report: &RunReport, preview: usize) {
    let s = &report.summary;
    println!(
        "Processed {} rows from {} ({} countries).",
        format_int(s.total_rows),
        report.source.display(),
        format_int(s.total_countries)
    );
    if let (Some(first), Some(last)) = (s.first_date, s.last_date) {
        println!("Period: {} to {}", format_date(first), format_date(last));
    }
    println!(
        "Worldwide: {} cases, {} deaths\n",
        format_int(s.total_cases),
        format_int(s.total_deaths)
    );
    println!("Top {} countries by total cases\n", preview);
    output::preview_table_rows(&report.ranking, preview);
    println!("{} pages written.", format_int(report.pages));
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match handle_run(Cli::parse().into()) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn handle_run(config: Config) -> anyhow::Result<ExitCode> {
    let fetcher = HttpFetcher::new(config.timeout).context("setting up the downloader")?;
    let site = StaticSite::new(&config.out_dir);
    let now = Local::now();
    let updated = now.format("%A %d %B - %H:%M:%S").to_string();

    match pipeline::run(&config, &fetcher, &site, now.date_naive(), &updated)? {
        RunStatus::UpToDate => {
            println!("Data already up-to-date, quitting.");
            Ok(ExitCode::SUCCESS)
        }
        RunStatus::Regenerated(report) => {
            print_report(&report, config.preview);
            if report.failed.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Failed to render: {}", report.failed.join(", "));
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
