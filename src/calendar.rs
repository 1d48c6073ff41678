use crate::model::DateKey;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_MONTHS: usize = 9;
const MIN_MONTHS: usize = 3;

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthRef(NaiveDate);

impl MonthRef {
    /// `month` is zero-based and may lie outside 0..=11; it is resolved with calendar arithmetic.
    pub fn new(year: i32, month: i32) -> Option<Self> {
        let base = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let shifted = if month >= 0 {
            base.checked_add_months(Months::new(month as u32))
        } else {
            base.checked_sub_months(Months::new(month.unsigned_abs()))
        }?;
        Some(MonthRef(shifted))
    }

    pub fn containing(date: NaiveDate) -> Self {
        MonthRef(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Zero-based month index.
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn pred(&self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(MonthRef)
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(MonthRef)
    }

    pub fn days(&self) -> u32 {
        match self.succ() {
            Some(next) => (next.0 - self.0).num_days() as u32,
            None => 31,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month0() == self.month0()
    }

    pub fn label(&self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn offset(&self, weekday: Weekday) -> u32 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday(),
            WeekStart::Monday => weekday.num_days_from_monday(),
        }
    }

    pub fn labels(&self) -> [&'static str; 7] {
        match self {
            WeekStart::Sunday => ["S", "M", "T", "W", "T", "F", "S"],
            WeekStart::Monday => ["M", "T", "W", "T", "F", "S", "S"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub key: DateKey,
    pub is_other_month: bool,
}

impl DayCell {
    fn new(date: NaiveDate, is_other_month: bool) -> Self {
        DayCell {
            date,
            key: DateKey::from_date(date),
            is_other_month,
        }
    }
}

/// Day cells for `month`, padded with neighbouring days to whole weeks.
pub fn month_cells(month: MonthRef, week_start: WeekStart) -> Vec<DayCell> {
    let first = month.first_day();
    let lead = week_start.offset(first.weekday()) as u64;
    let days = month.days() as u64;
    let mut cells = Vec::with_capacity(42);

    for back in (1..=lead).rev() {
        if let Some(date) = first.checked_sub_days(Days::new(back)) {
            cells.push(DayCell::new(date, true));
        }
    }
    for offset in 0..days {
        if let Some(date) = first.checked_add_days(Days::new(offset)) {
            cells.push(DayCell::new(date, false));
        }
    }
    let mut trailing = 0;
    while cells.len() % 7 != 0 {
        match first.checked_add_days(Days::new(days + trailing)) {
            Some(date) => cells.push(DayCell::new(date, true)),
            None => break,
        }
        trailing += 1;
    }
    cells
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Front,
    Back,
}

/// Result of growing a [`MonthWindow`] by one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub window: MonthWindow,
    pub edge: Edge,
    pub added: MonthRef,
    pub dropped: Vec<MonthRef>,
}

/// Contiguous ascending run of mounted months, at most `max` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
    months: Vec<MonthRef>,
    max: usize,
}

impl MonthWindow {
    /// `[previous, center, next]`, bounded to `max` (at least three).
    pub fn around(center: MonthRef, max: usize) -> Self {
        let mut months = Vec::with_capacity(3);
        months.extend(center.pred());
        months.push(center);
        months.extend(center.succ());
        MonthWindow {
            months,
            max: max.max(MIN_MONTHS),
        }
    }

    pub fn months(&self) -> &[MonthRef] {
        &self.months
    }

    pub fn first(&self) -> MonthRef {
        self.months[0]
    }

    pub fn last(&self) -> MonthRef {
        self.months[self.months.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn contains(&self, month: MonthRef) -> bool {
        self.months.binary_search(&month).is_ok()
    }

    pub fn prepend(&self) -> Option<Extension> {
        self.extend_to(self.first().pred()?)
    }

    pub fn append(&self) -> Option<Extension> {
        self.extend_to(self.last().succ()?)
    }

    /// Grows toward `target` when it is the month adjacent to either edge.
    /// Already-mounted or non-adjacent targets are no-ops.
    pub fn extend_to(&self, target: MonthRef) -> Option<Extension> {
        if self.contains(target) {
            return None;
        }
        if self.first().pred() == Some(target) {
            let mut months = Vec::with_capacity(self.months.len() + 1);
            months.push(target);
            months.extend_from_slice(&self.months);
            let dropped = if months.len() > self.max {
                months.split_off(self.max)
            } else {
                Vec::new()
            };
            return Some(Extension {
                window: MonthWindow {
                    months,
                    max: self.max,
                },
                edge: Edge::Front,
                added: target,
                dropped,
            });
        }
        if self.last().succ() == Some(target) {
            let mut months = self.months.clone();
            months.push(target);
            let excess = months.len().saturating_sub(self.max);
            let dropped: Vec<MonthRef> = months.drain(..excess).collect();
            return Some(Extension {
                window: MonthWindow {
                    months,
                    max: self.max,
                },
                edge: Edge::Back,
                added: target,
                dropped,
            });
        }
        None
    }

    pub fn is_contiguous(&self) -> bool {
        self.months.windows(2).all(|pair| pair[0].succ() == Some(pair[1]))
    }
}
