//! Static COVID-19 report generator.
//!
//! Raw upstream rows are normalized into daily records, folded into a daily
//! series (with a worldwide aggregate and a grand total), turned into running
//! totals, and rendered as one page per country plus an index.
pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod reports;
pub mod series;
pub mod toc;
pub mod types;
pub mod util;
