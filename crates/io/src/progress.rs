//!
//! Prints progress information for long running procedures, such as the
//! exploration of a state space, without flooding the log.
//!

use std::cell::Cell;
use std::time::Duration;
use std::time::Instant;

/// Calls the message function at most once per interval.
pub struct TimeProgress<T> {
    interval: Duration,
    last_update: Cell<Instant>,
    message: Box<dyn Fn(T)>,
}

impl<T> TimeProgress<T> {
    /// Creates a progress tracker that prints at most every `interval_seconds`.
    pub fn new(message: impl Fn(T) + 'static, interval_seconds: u64) -> TimeProgress<T> {
        TimeProgress {
            message: Box::new(message),
            interval: Duration::from_secs(interval_seconds),
            last_update: Cell::new(Instant::now()),
        }
    }

    /// Prints the message for the given object if the interval has passed since the last message.
    pub fn print(&self, object: T) {
        let now = Instant::now();
        if now.duration_since(self.last_update.get()) >= self.interval {
            (self.message)(object);
            self.last_update.set(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_time_progress_zero_interval() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let progress = TimeProgress::new(move |step: usize| counter.set(counter.get() + step), 0);

        progress.print(1);
        progress.print(2);
        assert_eq!(count.get(), 3);
    }
}
