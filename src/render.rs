// Static site renderer: per-country pages with their charts, and the index.
use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;

use crate::chart::{bar_chart_svg, TREND_WINDOW};
use crate::output::write_atomic;
use crate::types::{SeriesPoint, TocGroup, WORLDWIDE_CODE};
use crate::util::{format_date, format_int};

const CHART_DIR: &str = "charts";
const CASES_COLOR: &str = "#2563eb";
const DEATHS_COLOR: &str = "#dc2626";

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:900px;color:#111827}\
h1{font-weight:600}img{max-width:100%;display:block;margin:1em 0}\
ul.toc{list-style:none;padding:0;columns:3}table{border-collapse:collapse}\
td,th{padding:2px 10px;text-align:right}";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a renderer needs to know about one country.
#[derive(Debug, Clone)]
pub struct CountryPage<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub daily: Vec<SeriesPoint>,
    pub cumulative: Vec<SeriesPoint>,
}

impl CountryPage<'_> {
    /// "COVID-19 Worldwide" for the aggregate, "COVID-19 for France" otherwise.
    pub fn title(&self) -> String {
        if self.code == WORLDWIDE_CODE {
            format!("COVID-19 {}", self.name)
        } else {
            format!("COVID-19 for {}", self.name)
        }
    }
}

pub trait Render {
    /// Render one country; returns the page path.
    fn render_country(&self, page: &CountryPage<'_>) -> Result<PathBuf, RenderError>;

    fn render_index(&self, toc: &[TocGroup], updated: &str) -> Result<PathBuf, RenderError>;
}

pub struct StaticSite {
    out_dir: PathBuf,
}

impl StaticSite {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn write(&self, rel: &str, content: &str) -> Result<PathBuf, RenderError> {
        let path = self.out_dir.join(rel);
        write_atomic(&path, content.as_bytes()).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Write one chart and return its path relative to the output directory.
    fn chart(
        &self,
        code: &str,
        kind: &str,
        title: &str,
        points: &[SeriesPoint],
        pick: fn(&SeriesPoint) -> u64,
        color: &str,
    ) -> Result<String, RenderError> {
        let values: Vec<_> = points.iter().map(|p| (p.date, pick(p))).collect();
        let rel = format!("{CHART_DIR}/{code}-{kind}.svg");
        self.write(&rel, &bar_chart_svg(title, &values, color))?;
        Ok(rel)
    }
}

impl Render for StaticSite {
    fn render_country(&self, page: &CountryPage<'_>) -> Result<PathBuf, RenderError> {
        let (code, daily, cumul) = (page.code, &page.daily, &page.cumulative);
        let charts = [
            self.chart(code, "daily-cases", "Daily cases", daily, |p| p.cases, CASES_COLOR)?,
            self.chart(code, "daily-deaths", "Daily deaths", daily, |p| p.deaths, DEATHS_COLOR)?,
            self.chart(code, "cumulative-cases", "Total cases", cumul, |p| p.cases, CASES_COLOR)?,
            self.chart(
                code,
                "cumulative-deaths",
                "Total deaths",
                cumul,
                |p| p.deaths,
                DEATHS_COLOR,
            )?,
        ];
        let html = country_html(page, &charts);
        self.write(&format!("{}.html", page.code), &html)
    }

    fn render_index(&self, toc: &[TocGroup], updated: &str) -> Result<PathBuf, RenderError> {
        self.write("index.html", &index_html(toc, updated))
    }
}

fn head(out: &mut String, title: &str) {
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html lang=\"en\"><head><meta charset=\"utf-8\">");
    let _ = writeln!(
        out,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
    );
    let _ = writeln!(out, "<title>{}</title>", html_escape::encode_text(title));
    let _ = writeln!(out, "<style>{STYLE}</style></head><body>");
}

pub fn country_html(page: &CountryPage<'_>, charts: &[String]) -> String {
    let title = page.title();
    let mut out = String::new();
    head(&mut out, &title);
    let _ = writeln!(out, "<p><a href=\"index.html\">&larr; All countries</a></p>");
    let _ = writeln!(out, "<h1>{}</h1>", html_escape::encode_text(&title));

    if let Some(last) = page.cumulative.last() {
        let _ = writeln!(
            out,
            "<p>{} cases and {} deaths as of {}.</p>",
            format_int(last.cases),
            format_int(last.deaths),
            format_date(last.date)
        );
    } else {
        let _ = writeln!(out, "<p>No data reported.</p>");
    }
    let _ = writeln!(
        out,
        "<p>Bars show reported values; the line is a {TREND_WINDOW}-day moving average.</p>"
    );
    for chart in charts {
        let _ = writeln!(
            out,
            "<img src=\"{}\" alt=\"\">",
            html_escape::encode_double_quoted_attribute(chart)
        );
    }

    let _ = writeln!(out, "<h2>Last {TREND_WINDOW} days</h2>");
    let _ = writeln!(
        out,
        "<table><tr><th>Date</th><th>Cases</th><th>Deaths</th></tr>"
    );
    let start = page.daily.len().saturating_sub(TREND_WINDOW);
    for p in page.daily[start..].iter().rev() {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            format_date(p.date),
            format_int(p.cases),
            format_int(p.deaths)
        );
    }
    let _ = writeln!(out, "</table>");
    let _ = writeln!(out, "</body></html>");
    out
}

pub fn index_html(toc: &[TocGroup], updated: &str) -> String {
    let mut out = String::new();
    head(&mut out, "COVID-19 by country");
    let _ = writeln!(out, "<h1>COVID-19 by country</h1>");
    let _ = writeln!(out, "<p>Updated {}</p>", html_escape::encode_text(updated));
    for group in toc {
        let letter = html_escape::encode_text(&group.letter);
        let _ = writeln!(out, "<h2 id=\"{letter}\">{letter}</h2>");
        let _ = writeln!(out, "<ul class=\"toc\">");
        for entry in &group.entries {
            let _ = writeln!(
                out,
                "<li><a href=\"{}.html\">{}</a></li>",
                html_escape::encode_double_quoted_attribute(&entry.code),
                html_escape::encode_text(&entry.name)
            );
        }
        let _ = writeln!(out, "</ul>");
    }
    let _ = writeln!(out, "</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TocEntry;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn points(values: &[u64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint {
                date: NaiveDate::from_ymd_opt(2020, 3, i as u32 + 1).unwrap(),
                cases: *v,
                deaths: v / 10,
                population: 0,
                country_name: "France".to_string(),
            })
            .collect()
    }

    #[test]
    fn titles_distinguish_worldwide() {
        let fr = CountryPage {
            code: "fr",
            name: "France",
            daily: vec![],
            cumulative: vec![],
        };
        let ww = CountryPage {
            code: "ww",
            name: "Worldwide",
            ..fr.clone()
        };
        assert_eq!(fr.title(), "COVID-19 for France");
        assert_eq!(ww.title(), "COVID-19 Worldwide");
    }

    #[test]
    fn country_page_and_charts_are_written() {
        let dir = tempdir().unwrap();
        let site = StaticSite::new(dir.path());
        let page = CountryPage {
            code: "fr",
            name: "France",
            daily: points(&[10, 20, 1200]),
            cumulative: points(&[10, 30, 1230]),
        };
        let path = site.render_country(&page).unwrap();
        assert_eq!(path, dir.path().join("fr.html"));

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<title>COVID-19 for France</title>"));
        assert!(html.contains("1,230 cases and 123 deaths as of 2020-03-03"));
        assert!(html.contains("charts/fr-daily-cases.svg"));
        for kind in ["daily-cases", "daily-deaths", "cumulative-cases", "cumulative-deaths"] {
            assert!(dir.path().join(CHART_DIR).join(format!("fr-{kind}.svg")).exists());
        }
    }

    #[test]
    fn index_links_every_entry_under_its_letter() {
        let toc = vec![TocGroup {
            letter: "C".to_string(),
            entries: vec![TocEntry { code: "ci".to_string(), name: "Côte d'Ivoire".to_string() }],
        }];
        let html = index_html(&toc, "Monday 02 March - 10:00:00");
        assert!(html.contains("<h2 id=\"C\">C</h2>"));
        assert!(html.contains("<a href=\"ci.html\">Côte d'Ivoire</a>"));
        assert!(html.contains("Updated Monday 02 March - 10:00:00"));
    }
}
