use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::quantity::voltage::Volts;

/// Samples needed before the slope is trusted.
pub const WINDOW_LEN: usize = 15;

/// Rolling window of the most recent voltage samples, FIFO-evicted.
#[derive(Default)]
pub struct VoltageWindow {
    samples: VecDeque<(DateTime<Local>, Volts)>,
}

impl VoltageWindow {
    pub fn push(&mut self, at: DateTime<Local>, voltage: Volts) {
        self.samples.push_back((at, voltage));
        if self.samples.len() > WINDOW_LEN {
            self.samples.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Least-squares voltage slope in volts per second.
    ///
    /// `None` until the window is full, and on a degenerate time axis. Time is
    /// re-zeroed on the first sample in the window to keep the arithmetic away
    /// from large absolute timestamps.
    #[must_use]
    pub fn slope(&self) -> Option<f64> {
        if self.len() < WINDOW_LEN {
            return None;
        }
        let first = self.samples.front()?.0;

        let mut time_mean = 0.0;
        let mut voltage_mean = 0.0;
        for (index, (at, voltage)) in self.samples.iter().enumerate() {
            let time = (*at - first).as_seconds_f64();
            #[expect(clippy::cast_precision_loss)]
            let count = (index + 1) as f64;
            time_mean += (time - time_mean) / count;
            voltage_mean += (voltage.0 - voltage_mean) / count;
        }

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (at, voltage) in &self.samples {
            let time = (*at - first).as_seconds_f64();
            numerator += (time - time_mean) * (voltage.0 - voltage_mean);
            denominator += (time - time_mean) * (time - time_mean);
        }

        (denominator != 0.0).then(|| numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::TimeDelta;

    use super::*;

    fn at(seconds: i64) -> DateTime<Local> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap().with_timezone(&Local)
            + TimeDelta::seconds(seconds)
    }

    #[test]
    fn test_underfilled_window_has_no_slope() {
        let mut window = VoltageWindow::default();
        for index in 0..(WINDOW_LEN - 1) {
            window.push(at(index as i64), Volts(25.0));
        }
        assert_eq!(window.slope(), None);
    }

    #[test]
    fn test_perfect_line() {
        let mut window = VoltageWindow::default();
        for index in 0..WINDOW_LEN {
            let time = index as i64 * 5;
            window.push(at(time), Volts(2.0 + 0.01 * time as f64));
        }
        assert_relative_eq!(window.slope().unwrap(), 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_identical_timestamps_are_degenerate() {
        let mut window = VoltageWindow::default();
        for index in 0..WINDOW_LEN {
            window.push(at(0), Volts(25.0 + index as f64));
        }
        assert_eq!(window.slope(), None);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = VoltageWindow::default();
        for index in 0..(WINDOW_LEN + 10) {
            window.push(at(index as i64), Volts(25.0));
        }
        assert_eq!(window.len(), WINDOW_LEN);
    }
}
