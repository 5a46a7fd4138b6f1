use std::path::PathBuf;
use std::time::Duration;

use crate::loader::InputFormat;
use crate::types::SignPolicy;

pub const DEFAULT_URL: &str = "https://opendata.ecdc.europa.eu/covid19/casedistribution/json/";
pub const DEFAULT_DATA_DIR: &str = "json";
pub const DEFAULT_OUT_DIR: &str = "html";

/// Settings for one run, resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    /// Downloaded snapshots and their checksum.
    pub data_dir: PathBuf,
    /// Rendered site and run reports.
    pub out_dir: PathBuf,
    /// Local dataset to use instead of downloading.
    pub input: Option<PathBuf>,
    pub format: InputFormat,
    pub sign_policy: SignPolicy,
    /// Regenerate even when upstream has not changed.
    pub force: bool,
    /// Rows of the console preview table.
    pub preview: usize,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            input: None,
            format: InputFormat::Auto,
            sign_policy: SignPolicy::Absolute,
            force: false,
            preview: 10,
            timeout: Duration::from_secs(60),
        }
    }
}
