use crate::model::Entry;
use std::rc::Rc;

/// Sizing rules for the card strip. `Default` is tuned for pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselMetrics {
    pub peek_ratio: f32,
    pub min_peek: f32,
    pub max_peek: f32,
    pub min_card_width: f32,
    pub gap: f32,
    /// Horizontal travel that counts as a swipe.
    pub swipe_delta: f32,
}

impl Default for CarouselMetrics {
    fn default() -> Self {
        CarouselMetrics {
            peek_ratio: 0.15,
            min_peek: 32.0,
            max_peek: 80.0,
            min_card_width: 280.0,
            gap: 12.0,
            swipe_delta: 10.0,
        }
    }
}

impl CarouselMetrics {
    /// Same proportions measured in terminal columns.
    pub fn terminal() -> Self {
        CarouselMetrics {
            peek_ratio: 0.15,
            min_peek: 4.0,
            max_peek: 12.0,
            min_card_width: 24.0,
            gap: 2.0,
            swipe_delta: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselGeometry {
    pub viewport_width: f32,
    pub peek: f32,
    pub card_width: f32,
    pub gap: f32,
}

impl CarouselGeometry {
    pub fn compute(viewport_width: f32, metrics: &CarouselMetrics) -> Self {
        let peek = (viewport_width * metrics.peek_ratio)
            .round()
            .clamp(metrics.min_peek, metrics.max_peek);
        let card_width = metrics.min_card_width.max(viewport_width - 2.0 * peek);
        CarouselGeometry {
            viewport_width,
            peek,
            card_width,
            gap: metrics.gap,
        }
    }

    pub fn stride(&self) -> f32 {
        self.card_width + self.gap
    }

    pub fn active_center(&self, active: usize) -> f32 {
        active as f32 * self.stride() + self.card_width / 2.0
    }

    /// Track shift that puts the active card's center on the viewport's center.
    pub fn translation(&self, active: usize) -> f32 {
        -(self.active_center(active) - self.viewport_width / 2.0)
    }

    /// Left and right edges of card `index`, in viewport coordinates.
    pub fn card_span(&self, index: usize, active: usize) -> (f32, f32) {
        let left = index as f32 * self.stride() + self.translation(active);
        (left, left + self.card_width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselInput {
    SwipeLeft,
    SwipeRight,
    ArrowLeft,
    ArrowRight,
    Select(usize),
    Escape,
    CloseButton,
    OverlayClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Close,
}

/// Open carousel over the flattened entry list. There is no empty carousel.
#[derive(Debug, Clone)]
pub struct Carousel {
    entries: Rc<[Entry]>,
    active: usize,
}

impl Carousel {
    pub fn open(entries: Rc<[Entry]>, start: usize) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let active = start.min(entries.len() - 1);
        Some(Carousel { entries, active })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_entry(&self) -> &Entry {
        &self.entries[self.active]
    }

    pub fn can_go_prev(&self) -> bool {
        self.active > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.active + 1 < self.entries.len()
    }

    pub fn prev(&mut self) -> bool {
        if self.can_go_prev() {
            self.active -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        if self.can_go_next() {
            self.active += 1;
            true
        } else {
            false
        }
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.entries.len() && index != self.active {
            self.active = index;
            true
        } else {
            false
        }
    }

    pub fn handle(&mut self, input: CarouselInput) -> Transition {
        match input {
            CarouselInput::SwipeLeft | CarouselInput::ArrowRight => {
                self.next();
            }
            CarouselInput::SwipeRight | CarouselInput::ArrowLeft => {
                self.prev();
            }
            CarouselInput::Select(index) => {
                self.select(index);
            }
            CarouselInput::Escape | CarouselInput::CloseButton | CarouselInput::OverlayClick => {
                return Transition::Close;
            }
        }
        Transition::Stay
    }
}

/// Turns a press/release pair into a swipe when the horizontal travel is large enough.
#[derive(Debug, Clone, Default)]
pub struct SwipeTracker {
    start: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Swipe(CarouselInput),
    Tap { x: f32, y: f32 },
}

impl SwipeTracker {
    pub fn press(&mut self, x: f32, y: f32) {
        self.start = Some((x, y));
    }

    pub fn release(&mut self, x: f32, delta: f32) -> Option<Gesture> {
        let (sx, sy) = self.start.take()?;
        let dx = x - sx;
        if dx <= -delta {
            Some(Gesture::Swipe(CarouselInput::SwipeLeft))
        } else if dx >= delta {
            Some(Gesture::Swipe(CarouselInput::SwipeRight))
        } else {
            Some(Gesture::Tap { x: sx, y: sy })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_entry;
    use pretty_assertions::assert_eq;

    fn entries(n: usize) -> Rc<[Entry]> {
        (0..n)
            .map(|i| sample_entry("2024-03-15", 3, &format!("card {i}")))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn centers_active_card() {
        let geometry = CarouselGeometry::compute(400.0, &CarouselMetrics::default());
        assert_eq!(geometry.peek, 60.0);
        assert_eq!(geometry.card_width, 280.0);
        assert_eq!(geometry.stride(), 292.0);
        assert_eq!(geometry.active_center(2), 724.0);
        assert_eq!(geometry.translation(2), -524.0);
        let (left, right) = geometry.card_span(2, 2);
        assert_eq!((left, right), (60.0, 340.0));
    }

    #[test]
    fn peek_is_clamped() {
        let narrow = CarouselGeometry::compute(100.0, &CarouselMetrics::default());
        assert_eq!(narrow.peek, 32.0);
        assert_eq!(narrow.card_width, 280.0);
        let wide = CarouselGeometry::compute(1200.0, &CarouselMetrics::default());
        assert_eq!(wide.peek, 80.0);
        assert_eq!(wide.card_width, 1040.0);
    }

    #[test]
    fn terminal_preset_leaves_peeks() {
        let geometry = CarouselGeometry::compute(80.0, &CarouselMetrics::terminal());
        assert_eq!(geometry.peek, 12.0);
        assert_eq!(geometry.card_width, 56.0);
        let (left, _) = geometry.card_span(1, 1);
        assert_eq!(left, 12.0);
        let (_, prev_right) = geometry.card_span(0, 1);
        assert_eq!(prev_right, 10.0);
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut carousel = Carousel::open(entries(5), 0).unwrap();
        assert!(!carousel.prev());
        assert_eq!(carousel.active(), 0);
        let moves = [1i32, 1, 1, 1, 1, 1, -1, 1, 1, -1, -1, -1, -1, -1, -1, -1];
        for step in moves {
            if step > 0 {
                carousel.handle(CarouselInput::ArrowRight);
            } else {
                carousel.handle(CarouselInput::SwipeRight);
            }
            assert!(carousel.active() < 5);
        }
        assert_eq!(carousel.active(), 0);
        for _ in 0..10 {
            carousel.handle(CarouselInput::SwipeLeft);
        }
        assert_eq!(carousel.active(), 4);
        assert!(!carousel.can_go_next());
        assert!(carousel.can_go_prev());
    }

    #[test]
    fn select_jumps_and_ignores_out_of_range() {
        let mut carousel = Carousel::open(entries(3), 1).unwrap();
        assert_eq!(carousel.handle(CarouselInput::Select(2)), Transition::Stay);
        assert_eq!(carousel.active(), 2);
        carousel.handle(CarouselInput::Select(9));
        assert_eq!(carousel.active(), 2);
    }

    #[test]
    fn close_inputs_close() {
        let mut carousel = Carousel::open(entries(2), 0).unwrap();
        for input in [
            CarouselInput::Escape,
            CarouselInput::CloseButton,
            CarouselInput::OverlayClick,
        ] {
            assert_eq!(carousel.handle(input), Transition::Close);
        }
    }

    #[test]
    fn empty_list_never_opens() {
        assert!(Carousel::open(entries(0), 0).is_none());
        assert_eq!(Carousel::open(entries(2), 7).unwrap().active(), 1);
    }

    #[test]
    fn swipe_needs_enough_travel() {
        let mut tracker = SwipeTracker::default();
        tracker.press(20.0, 5.0);
        assert_eq!(
            tracker.release(10.0, 3.0),
            Some(Gesture::Swipe(CarouselInput::SwipeLeft))
        );
        tracker.press(20.0, 5.0);
        assert_eq!(
            tracker.release(21.0, 3.0),
            Some(Gesture::Tap { x: 20.0, y: 5.0 })
        );
        assert_eq!(tracker.release(40.0, 3.0), None);
    }
}
