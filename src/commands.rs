use crate::calendar::{month_cells, MonthRef, WeekStart};
use crate::clock::{Clock, SystemClock};
use crate::index::EntryIndex;
use crate::model::{DateKey, EntriesByDate, Entry};
use crate::storage::{
    data_path, default_config_path, init_config, load_config, load_dataset, Config, Dataset,
};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::Datelike;
use std::fmt::Write as _;
use std::path::PathBuf;

pub fn init(config: Option<PathBuf>) -> Result<()> {
    let path = resolve_config_path(config)?;
    if init_config(&path)? {
        println!("Wrote default config to {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

pub fn list(config: Option<PathBuf>, data: Option<PathBuf>, month: Option<String>) -> Result<()> {
    let session = load_session(config, data)?;
    let filter = month.as_deref().map(parse_month).transpose()?;
    let index = EntryIndex::build(&session.dataset.entries);
    let mut shown = 0;
    let mut current: Option<&DateKey> = None;
    for entry in index.entries() {
        if let Some(month) = filter {
            if !entry.date.date().map_or(false, |d| month.contains(d)) {
                continue;
            }
        }
        if current != Some(&entry.date) {
            println!("{}", entry.date);
            current = Some(&entry.date);
        }
        print_entry(entry);
        shown += 1;
    }
    if shown == 0 {
        println!("(no entries)");
    }
    if !session.dataset.skipped.is_empty() {
        println!(
            "{} entries skipped: {}",
            session.dataset.skipped.len(),
            session.dataset.skipped.join(", ")
        );
    }
    Ok(())
}

pub fn month(config: Option<PathBuf>, data: Option<PathBuf>, month: Option<String>) -> Result<()> {
    let session = load_session(config, data)?;
    let target = match month {
        Some(raw) => parse_month(&raw)?,
        None => MonthRef::containing(SystemClock.today()),
    };
    print!(
        "{}",
        render_month_text(target, session.config.week_start, &session.dataset.entries)
    );
    Ok(())
}

pub fn tui(config: Option<PathBuf>, data: Option<PathBuf>) -> Result<()> {
    let session = load_session(config, data)?;
    ui::run(session.config, session.data_path, session.dataset)
}

struct Session {
    config: Config,
    data_path: PathBuf,
    dataset: Dataset,
}

fn resolve_config_path(config: Option<PathBuf>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path),
        None => default_config_path(),
    }
}

fn load_session(config: Option<PathBuf>, data: Option<PathBuf>) -> Result<Session> {
    let config_path = resolve_config_path(config)?;
    let mut config = load_config(&config_path)?;
    if let Some(path) = data {
        config.data = Some(path);
    }
    let data_path = data_path(&config)?;
    let dataset = load_dataset(&data_path)
        .with_context(|| format!("loading entries from {}", data_path.display()))?;
    Ok(Session {
        config,
        data_path,
        dataset,
    })
}

fn parse_month(raw: &str) -> Result<MonthRef> {
    let invalid = || anyhow!("invalid month (use YYYY-MM): {}", raw);
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: i32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    MonthRef::new(year, month - 1).ok_or_else(invalid)
}

fn render_month_text(month: MonthRef, week_start: WeekStart, entries: &EntriesByDate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:^28}", month.label());
    for label in week_start.labels() {
        let _ = write!(out, "{:>3} ", label);
    }
    out.push('\n');
    for week in month_cells(month, week_start).chunks(7) {
        for cell in week {
            if cell.is_other_month {
                out.push_str("    ");
                continue;
            }
            let marker = if entries.get(&cell.key).is_empty() {
                ' '
            } else {
                '*'
            };
            let _ = write!(out, " {:>2}{}", cell.date.day(), marker);
        }
        out.push('\n');
    }
    out
}

fn print_entry(entry: &Entry) {
    let category = entry
        .first_category()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    println!("  {}{} {}", ui::stars(entry.rating), category, entry.description);
    if !entry.img_url.is_empty() {
        println!("    image: {}", entry.img_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_entry;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_year_month() {
        assert_eq!(parse_month("2024-03").unwrap(), MonthRef::new(2024, 2).unwrap());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("March").is_err());
        assert!(parse_month("2024-00").is_err());
        assert_eq!(parse_month(" 1999-12 ").unwrap(), MonthRef::new(1999, 11).unwrap());
    }

    #[test]
    fn month_text_marks_days_with_entries() {
        let mut entries = EntriesByDate::default();
        entries.insert(sample_entry("2024-03-15", 4, "walk"));
        let text = render_month_text(MonthRef::new(2024, 2).unwrap(), WeekStart::Sunday, &entries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].trim(), "March 2024");
        assert_eq!(lines[1], "  S   M   T   W   T   F   S ");
        // Six weeks: March 2024 starts on a Friday.
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[2], "                      1   2 ");
        assert!(lines[4].contains("15*"));
        assert!(!lines[4].contains("14*"));
    }
}
