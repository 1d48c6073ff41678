use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `yyyy-MM-dd` day key. Lexicographic order equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DateKey(String);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateKeyError {
    #[error("empty date")]
    Empty,
    #[error("unrecognized date: {0}")]
    Unrecognized(String),
}

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        DateKey(date.format(KEY_FORMAT).to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, DateKeyError> {
        normalize_date(raw).map(DateKey::from_date)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, KEY_FORMAT).ok()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts `dd/MM/yyyy` first, then ISO dates, ISO date-times and RFC 3339 timestamps.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, DateKeyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateKeyError::Empty);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, KEY_FORMAT) {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    Err(DateKeyError::Unrecognized(trimmed.to_string()))
}

/// A dataset record as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    pub date: String,
    pub rating: u8,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub date: DateKey,
    pub rating: u8,
    pub img_url: String,
    pub description: String,
    pub categories: Vec<String>,
}

impl RawEntry {
    pub fn normalize(self) -> Result<Entry, DateKeyError> {
        let date = DateKey::parse(&self.date)?;
        Ok(Entry {
            date,
            rating: self.rating,
            img_url: self.img_url,
            description: self.description,
            categories: self.categories,
        })
    }
}

impl Entry {
    pub fn first_category(&self) -> Option<&str> {
        self.categories.first().map(|c| c.as_str())
    }
}

/// Entries grouped by day, in dataset order within a day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntriesByDate {
    days: BTreeMap<DateKey, Vec<Entry>>,
}

impl EntriesByDate {
    /// Groups normalized records, returning the raw dates that could not be parsed.
    pub fn from_records(records: Vec<RawEntry>) -> (Self, Vec<String>) {
        let mut grouped = EntriesByDate::default();
        let mut rejected = Vec::new();
        for record in records {
            let raw_date = record.date.clone();
            match record.normalize() {
                Ok(entry) => grouped.insert(entry),
                Err(err) => {
                    tracing::warn!(date = %raw_date, error = %err, "skipping entry with invalid date");
                    rejected.push(raw_date);
                }
            }
        }
        (grouped, rejected)
    }

    pub fn insert(&mut self, entry: Entry) {
        self.days.entry(entry.date.clone()).or_default().push(entry);
    }

    pub fn get(&self, key: &DateKey) -> &[Entry] {
        self.days.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateKey, &[Entry])> {
        self.days.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.days.values().map(|v| v.len()).sum()
    }
}

impl From<BTreeMap<DateKey, Vec<Entry>>> for EntriesByDate {
    fn from(days: BTreeMap<DateKey, Vec<Entry>>) -> Self {
        EntriesByDate { days }
    }
}

#[cfg(test)]
pub(crate) fn sample_entry(date: &str, rating: u8, description: &str) -> Entry {
    Entry {
        date: DateKey(date.to_string()),
        rating,
        img_url: format!("https://img.example/{date}.jpg"),
        description: description.to_string(),
        categories: vec!["Travel".into(), "Food".into()],
    }
}
