use crate::{CLOCK_WINDOW, SKIPPED_PEAKS, ZERO_BIT_FACTOR};
use std::collections::VecDeque;

/// Clock recovery tunables
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Leading distances discarded before clocking starts
    pub skipped_peaks: usize,
    /// A distance longer than this many clock units is a 0 bit
    pub zero_bit_factor: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            skipped_peaks: SKIPPED_PEAKS,
            zero_bit_factor: ZERO_BIT_FACTOR,
        }
    }
}

/// F2F bit recovery from inter-peak distances
///
/// A 0 cell holds one long interval and a 1 cell two short ones. The clock
/// is a rolling mean of the last `CLOCK_WINDOW` half-cell estimates, so it
/// follows a swipe that speeds up or slows down.
pub struct ClockRecovery<I: Iterator<Item = usize>> {
    distances: I,
    lookahead: VecDeque<usize>,
    clocks: VecDeque<f64>,
    config: ClockConfig,
    started: bool,
}

impl<I: Iterator<Item = usize>> ClockRecovery<I> {
    pub fn new(distances: I) -> Self {
        Self::with_config(distances, ClockConfig::default())
    }

    pub fn with_config(distances: I, config: ClockConfig) -> Self {
        Self {
            distances,
            lookahead: VecDeque::with_capacity(CLOCK_WINDOW),
            clocks: VecDeque::with_capacity(CLOCK_WINDOW + 1),
            config,
            started: false,
        }
    }

    /// Current clock estimate in samples per half cell
    pub fn clock(&self) -> Option<f64> {
        if self.clocks.is_empty() {
            return None;
        }
        Some(self.clocks.iter().sum::<f64>() / self.clocks.len() as f64)
    }

    // The runway before the start sentinel is all zeros, one full cell per
    // distance, so the first distances seed the clock at half their length.
    // They are only peeked; classification starts from the first of them.
    fn start(&mut self) {
        self.distances.by_ref().take(self.config.skipped_peaks).for_each(drop);
        self.fill(CLOCK_WINDOW);
        self.clocks = self.lookahead.iter().map(|&d| d as f64 / 2.0).collect();
        self.started = true;
    }

    fn fill(&mut self, wanted: usize) -> bool {
        while self.lookahead.len() < wanted {
            match self.distances.next() {
                Some(distance) => self.lookahead.push_back(distance),
                None => return false,
            }
        }
        true
    }
}

impl<I: Iterator<Item = usize>> Iterator for ClockRecovery<I> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if !self.started {
            self.start();
        }
        if !self.fill(2) {
            return None;
        }

        let clock = self.clock()?;
        let peak = self.lookahead.pop_front()? as f64;

        let bit = if peak > self.config.zero_bit_factor * clock {
            self.clocks.push_back(peak / 2.0);
            0
        } else {
            self.lookahead.pop_front();
            self.clocks.push_back(peak);
            1
        };
        self.clocks.pop_front();

        Some(bit)
    }
}
