// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::v2::InputPin;
use tracing::{debug, warn};

use super::edge::EdgeDetector;

/// Polls the trigger lines and decides when to capture an image.
pub(crate) struct CaptureScheduler<P, const N: usize> {
    pins: [P; N],
    detector: EdgeDetector<N>,
    poll_interval: Duration,
}

impl<P, const N: usize> CaptureScheduler<P, N>
where
    P: InputPin,
    P::Error: fmt::Debug,
{
    pub(crate) fn new(pins: [P; N], poll_interval: Duration) -> Self {
        Self {
            pins,
            detector: EdgeDetector::new(),
            poll_interval,
        }
    }

    /// Sample every line once, returning `true` when a capture should happen.
    ///
    /// A line that can't be read keeps the level it had on the previous poll.
    pub(crate) fn poll(&mut self) -> bool {
        let mut levels = self.detector.levels();
        for (index, pin) in self.pins.iter().enumerate() {
            match pin.is_high() {
                Ok(level) => levels[index] = level,
                Err(err) => warn!(line = index, error = ?err, "Unable to read trigger line"),
            }
        }
        let triggered = self.detector.update(levels);
        if triggered {
            debug!(?levels, "Trigger line went high");
        }
        triggered
    }

    /// Poll forever, calling `capture` after every rising edge.
    ///
    /// `capture` runs to completion before the lines are polled again, so edges that come and go
    /// while it is running are missed.
    pub(crate) fn run<F: FnMut()>(&mut self, mut capture: F) -> ! {
        loop {
            if self.poll() {
                capture();
            }
            thread::sleep(self.poll_interval);
        }
    }
}
