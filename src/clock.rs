use chrono::{Local, NaiveDate};
use std::time::Instant;

/// Source of "now" for both the calendar date and event timing.
pub trait Clock {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;

#[cfg(test)]
mod fixed {
    use super::Clock;
    use chrono::NaiveDate;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    /// Clock pinned to a date whose instant only moves when advanced.
    /// Clones share the same instant.
    #[derive(Clone)]
    pub struct FixedClock {
        today: NaiveDate,
        now: Rc<Cell<Instant>>,
    }

    impl FixedClock {
        pub fn new(today: NaiveDate) -> Self {
            FixedClock {
                today,
                now: Rc::new(Cell::new(Instant::now())),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.today
        }

        fn now(&self) -> Instant {
            self.now.get()
        }
    }
}
