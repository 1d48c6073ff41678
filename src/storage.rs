use crate::calendar::{WeekStart, MAX_MONTHS};
use crate::model::{EntriesByDate, RawEntry};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: Option<PathBuf>,
    pub week_start: WeekStart,
    pub max_months: usize,
    pub scroll_threshold_rows: u16,
    pub scroll_step_rows: u16,
    pub throttle_ms: u64,
    pub page_fraction: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: None,
            week_start: WeekStart::Sunday,
            max_months: MAX_MONTHS,
            scroll_threshold_rows: 6,
            scroll_step_rows: 6,
            throttle_ms: 16,
            page_fraction: 0.8,
        }
    }
}

impl Config {
    /// Replaces values the calendar cannot work with by their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Config::default();
        if self.max_months < 3 {
            tracing::warn!(max_months = self.max_months, "max_months below 3, using 3");
            self.max_months = 3;
        }
        if !(self.page_fraction > 0.0 && self.page_fraction <= 1.0) {
            tracing::warn!(page_fraction = self.page_fraction, "page_fraction out of range, using default");
            self.page_fraction = defaults.page_fraction;
        }
        if self.scroll_step_rows == 0 {
            self.scroll_step_rows = defaults.scroll_step_rows;
        }
        self
    }
}

/// Entries that survived loading, plus a label for each skipped record
/// (its raw date, or its position when the record itself was malformed).
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub entries: EntriesByDate,
    pub skipped: Vec<String>,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "daybook").context("locating application directories")
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.yml"))
}

pub fn log_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn data_path(config: &Config) -> Result<PathBuf> {
    match &config.data {
        Some(path) => Ok(path.clone()),
        None => Ok(project_dirs()?.data_dir().join("journal.json")),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config: Config = serde_yaml::from_str(&data).context("parsing config file")?;
    Ok(config.sanitized())
}

/// Writes the default config unless one already exists.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(&Config::default()).context("serializing config")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(true)
}

/// Loads a JSON (or `.yml`/`.yaml`) array of entry records.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let (records, mut skipped) = match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => {
            let values: Vec<serde_yaml::Value> =
                serde_yaml::from_str(&data).context("parsing dataset as YAML")?;
            decode_records(values, |v| serde_yaml::from_value(v).map_err(|e| e.to_string()))
        }
        _ => {
            let values: Vec<serde_json::Value> =
                serde_json::from_str(&data).context("parsing dataset as JSON")?;
            decode_records(values, |v| serde_json::from_value(v).map_err(|e| e.to_string()))
        }
    };
    let total = records.len() + skipped.len();
    let (entries, bad_dates) = EntriesByDate::from_records(records);
    skipped.extend(bad_dates);
    tracing::info!(
        path = %path.display(),
        total,
        skipped = skipped.len(),
        "loaded dataset"
    );
    Ok(Dataset { entries, skipped })
}

/// Decodes records one at a time so a malformed record only loses itself.
fn decode_records<V>(
    values: Vec<V>,
    decode: impl Fn(V) -> Result<RawEntry, String>,
) -> (Vec<RawEntry>, Vec<String>) {
    let mut records = Vec::with_capacity(values.len());
    let mut rejected = Vec::new();
    for (position, value) in values.into_iter().enumerate() {
        match decode(value) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(record = position + 1, error = %err, "skipping malformed entry");
                rejected.push(format!("record {}", position + 1));
            }
        }
    }
    (records, rejected)
}
