// SVG bar charts for the country pages.
//
// One bar per date, with a trailing moving-average line drawn on top.
use chrono::NaiveDate;
use std::fmt::Write;

use crate::util::{format_date, format_int};

/// Window of the trend line, in days.
pub const TREND_WINDOW: usize = 7;

const WIDTH: usize = 860;
const HEIGHT: usize = 320;
const MARGIN: usize = 50;

/// Trailing average over `window` values ending at each index; `None` until
/// the window is full.
pub fn moving_average(values: &[u64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut sum = 0u128;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            sum += u128::from(*v);
            if i >= window {
                sum -= u128::from(values[i - window]);
            }
            (i + 1 >= window).then(|| sum as f64 / window as f64)
        })
        .collect()
}

pub fn bar_chart_svg(title: &str, values: &[(NaiveDate, u64)], color: &str) -> String {
    let chart_width = (WIDTH - 2 * MARGIN) as f64;
    let chart_height = (HEIGHT - 2 * MARGIN) as f64;
    let title = html_escape::encode_text(title);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" style="background:white">"##
    );
    let _ = writeln!(
        svg,
        r##"  <text x="{}" y="24" text-anchor="middle" font-size="15" font-weight="600" fill="#374151">{}</text>"##,
        WIDTH / 2,
        title
    );
    let _ = writeln!(
        svg,
        r##"  <line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="#e5e7eb" stroke-width="2"/>"##,
        m = MARGIN,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN
    );

    if values.is_empty() {
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{}" text-anchor="middle" font-size="12" fill="#6b7280">No data</text>"##,
            WIDTH / 2,
            HEIGHT / 2
        );
        svg.push_str("</svg>\n");
        return svg;
    }

    let max = values.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1) as f64;
    let bar_width = chart_width / values.len() as f64;
    let y_of = |v: f64| MARGIN as f64 + chart_height - (v / max) * chart_height;

    for (i, (date, v)) in values.iter().enumerate() {
        if *v == 0 {
            continue;
        }
        let x = MARGIN as f64 + i as f64 * bar_width;
        let y = y_of(*v as f64);
        let _ = writeln!(
            svg,
            r##"  <rect x="{:.1}" y="{:.1}" width="{:.2}" height="{:.1}" fill="{}" opacity="0.8"><title>{}: {}</title></rect>"##,
            x,
            y,
            (bar_width * 0.9).max(0.5),
            MARGIN as f64 + chart_height - y,
            color,
            format_date(*date),
            format_int(*v)
        );
    }

    let raw: Vec<u64> = values.iter().map(|(_, v)| *v).collect();
    let trend: Vec<String> = moving_average(&raw, TREND_WINDOW)
        .iter()
        .enumerate()
        .filter_map(|(i, avg)| {
            avg.map(|a| {
                let x = MARGIN as f64 + (i as f64 + 0.5) * bar_width;
                format!("{:.1},{:.1}", x, y_of(a))
            })
        })
        .collect();
    if trend.len() > 1 {
        let _ = writeln!(
            svg,
            r##"  <polyline points="{}" fill="none" stroke="#111827" stroke-width="1.5"/>"##,
            trend.join(" ")
        );
    }

    let first = values.first().map(|(d, _)| format_date(*d)).unwrap_or_default();
    let last = values.last().map(|(d, _)| format_date(*d)).unwrap_or_default();
    let _ = writeln!(
        svg,
        r##"  <text x="{}" y="{}" font-size="11" fill="#6b7280">{}</text>"##,
        MARGIN,
        HEIGHT - MARGIN + 18,
        first
    );
    let _ = writeln!(
        svg,
        r##"  <text x="{}" y="{}" text-anchor="end" font-size="11" fill="#6b7280">{}</text>"##,
        WIDTH - MARGIN,
        HEIGHT - MARGIN + 18,
        last
    );
    let _ = writeln!(
        svg,
        r##"  <text x="{}" y="{}" text-anchor="end" font-size="11" fill="#6b7280">{}</text>"##,
        MARGIN - 4,
        MARGIN + 4,
        format_int(max as u64)
    );
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_waits_for_full_window() {
        let avg = moving_average(&[1, 2, 3, 4, 5], 3);
        assert_eq!(avg, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert!(moving_average(&[1, 2], 0).iter().all(Option::is_none));
    }

    #[test]
    fn moving_average_of_huge_counts_does_not_wrap() {
        let avg = moving_average(&[u64::MAX, u64::MAX, 0], 2);
        assert_eq!(avg[1], Some(u64::MAX as f64));
        assert_eq!(avg[2], Some(u64::MAX as f64 / 2.0));
    }

    #[test]
    fn chart_has_one_bar_per_nonzero_day() {
        let values: Vec<(NaiveDate, u64)> = (1..=10)
            .map(|d| {
                let v = if d == 5 { 0 } else { d as u64 };
                (NaiveDate::from_ymd_opt(2020, 3, d).unwrap(), v)
            })
            .collect();
        let svg = bar_chart_svg("Daily cases <France>", &values, "#2563eb");
        assert_eq!(svg.matches("<rect").count(), 9);
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("Daily cases &lt;France&gt;"));
        assert!(svg.contains("2020-03-10"));
    }

    #[test]
    fn empty_chart_is_still_valid_svg() {
        let svg = bar_chart_svg("Nothing", &[], "#000");
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("No data"));
    }
}
