use crate::calendar::{Extension, MonthRef, MonthWindow};
use chrono::NaiveDate;
use std::time::{Duration, Instant};

pub const SCROLL_THRESHOLD: f32 = 200.0;
pub const THROTTLE_INTERVAL: Duration = Duration::from_millis(16);

/// Measured box of a month section, relative to the viewport's top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(top: f32, height: f32, width: f32) -> Self {
        Bounds {
            top,
            bottom: top + height,
            width,
            height,
        }
    }

    /// Rows (or pixels) of the section inside the viewport; a collapsed section shows none.
    pub fn visible_height(&self, viewport_height: f32) -> f32 {
        if self.width <= 0.0 {
            return 0.0;
        }
        self.bottom.min(viewport_height) - self.top.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub client_height: f32,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> f32 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}

/// Measurement capability supplied by whatever hosts the calendar.
pub trait Viewport {
    /// `None` while the scroll container is detached or not yet laid out.
    fn metrics(&self) -> Option<ScrollMetrics>;
    fn measure(&self, month: MonthRef) -> Option<Bounds>;
}

/// Picks the candidate with the greatest visible height. Ties keep the earlier one.
pub fn most_visible<T>(
    candidates: impl IntoIterator<Item = (T, Bounds)>,
    viewport_height: f32,
) -> Option<T> {
    let mut best = None;
    let mut best_area = 0.0;
    for (item, bounds) in candidates {
        let visible = bounds.visible_height(viewport_height);
        if visible > best_area {
            best_area = visible;
            best = Some(item);
        }
    }
    best
}

/// Leading-edge throttle: the first event after the interval elapses is processed,
/// the rest of the burst is dropped.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
    dropped: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last: None,
            dropped: false,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        if self.window_open(now) {
            self.last = Some(now);
            self.dropped = false;
            true
        } else {
            self.dropped = true;
            false
        }
    }

    /// Admits one deferred event if something was dropped and the window has reopened.
    pub fn take_trailing(&mut self, now: Instant) -> bool {
        if self.dropped && self.window_open(now) {
            self.last = Some(now);
            self.dropped = false;
            true
        } else {
            false
        }
    }

    fn window_open(&self, now: Instant) -> bool {
        match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    pub threshold: f32,
    pub throttle: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        ScrollConfig {
            threshold: SCROLL_THRESHOLD,
            throttle: THROTTLE_INTERVAL,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ScrollOutcome {
    pub processed: bool,
    pub extensions: Vec<Extension>,
    pub label_changed: bool,
}

/// Owns the month window and the "current month" label, driven by scroll events.
pub struct ScrollController {
    window: MonthWindow,
    label: MonthRef,
    throttle: Throttle,
    threshold: f32,
}

impl ScrollController {
    pub fn new(today: NaiveDate, max_months: usize, config: ScrollConfig) -> Self {
        let current = MonthRef::containing(today);
        ScrollController {
            window: MonthWindow::around(current, max_months),
            label: current,
            throttle: Throttle::new(config.throttle),
            threshold: config.threshold,
        }
    }

    pub fn window(&self) -> &MonthWindow {
        &self.window
    }

    pub fn label(&self) -> MonthRef {
        self.label
    }

    pub fn on_scroll(&mut self, now: Instant, viewport: &dyn Viewport) -> ScrollOutcome {
        if !self.throttle.admit(now) {
            return ScrollOutcome::default();
        }
        self.process(viewport)
    }

    /// Reprocesses the latest position when the last burst ended with a dropped event.
    pub fn on_idle(&mut self, now: Instant, viewport: &dyn Viewport) -> ScrollOutcome {
        if !self.throttle.take_trailing(now) {
            return ScrollOutcome::default();
        }
        self.process(viewport)
    }

    /// Grows the window toward `target` if it is adjacent and not yet mounted.
    pub fn extend_to(&mut self, target: MonthRef) -> Option<Extension> {
        self.grow(|window| window.extend_to(target))
    }

    fn grow(&mut self, step: impl FnOnce(&MonthWindow) -> Option<Extension>) -> Option<Extension> {
        let ext = step(&self.window)?;
        tracing::debug!(
            added = %ext.added,
            edge = ?ext.edge,
            dropped = ext.dropped.len(),
            max = self.window.max(),
            "month window grew"
        );
        self.window = ext.window.clone();
        debug_assert!(self.window.is_contiguous());
        Some(ext)
    }

    fn process(&mut self, viewport: &dyn Viewport) -> ScrollOutcome {
        let Some(metrics) = viewport.metrics() else {
            return ScrollOutcome::default();
        };
        let mut outcome = ScrollOutcome {
            processed: true,
            ..ScrollOutcome::default()
        };
        if metrics.scroll_top < self.threshold {
            outcome.extensions.extend(self.grow(MonthWindow::prepend));
        }
        // A prepend that trimmed the back already moved the bottom edge.
        let back_intact = outcome.extensions.iter().all(|ext| ext.dropped.is_empty());
        if back_intact && metrics.distance_to_bottom() < self.threshold {
            outcome.extensions.extend(self.grow(MonthWindow::append));
        }
        outcome.label_changed = self.update_label(viewport, metrics.client_height);
        outcome
    }

    fn update_label(&mut self, viewport: &dyn Viewport, viewport_height: f32) -> bool {
        let candidates = self
            .window
            .months()
            .iter()
            .filter_map(|&month| viewport.measure(month).map(|b| (month, b)));
        match most_visible(candidates, viewport_height) {
            Some(best) if best != self.label => {
                self.label = best;
                true
            }
            _ => false,
        }
    }
}
