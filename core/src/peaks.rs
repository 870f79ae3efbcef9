use crate::level::peak_to_peak;
use crate::{FIRST_PEAK_FACTOR, FIRST_PEAK_SAMPLES, SECOND_PEAK_FACTOR};

/// Peak detection tunables
#[derive(Debug, Clone)]
pub struct PeakConfig {
    /// Leading samples whose peak-to-peak sets the initial threshold
    pub first_peak_samples: usize,
    /// Fraction of that peak-to-peak used as the initial threshold
    pub first_peak_factor: f64,
    /// Fraction of each found peak used as the threshold for the next one
    pub second_peak_factor: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            first_peak_samples: FIRST_PEAK_SAMPLES,
            first_peak_factor: FIRST_PEAK_FACTOR,
            second_peak_factor: SECOND_PEAK_FACTOR,
        }
    }
}

/// A flux transition pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    /// First sample past the run that crossed the threshold
    pub index: usize,
    /// Largest excursion in the run, signed by polarity
    pub amplitude: i32,
}

/// Alternating-polarity pulses found in a single forward scan
pub struct Peaks<'a> {
    samples: &'a [i16],
    position: usize,
    threshold: f64,
    sign: i32,
    decay: f64,
}

impl<'a> Peaks<'a> {
    pub fn new(samples: &'a [i16], config: &PeakConfig) -> Self {
        let head = &samples[..config.first_peak_samples.min(samples.len())];
        Self {
            samples,
            position: 0,
            threshold: peak_to_peak(head) as f64 * config.first_peak_factor,
            sign: 1,
            decay: config.second_peak_factor,
        }
    }
}

impl Iterator for Peaks<'_> {
    type Item = Peak;

    fn next(&mut self) -> Option<Peak> {
        while self.position < self.samples.len() {
            let mut peak = 0;
            while let Some(&sample) = self.samples.get(self.position) {
                let value = sample as i32 * self.sign;
                if value as f64 <= self.threshold {
                    break;
                }
                peak = peak.max(value);
                self.position += 1;
            }

            let index = self.position;
            self.position += 1;

            if peak > 0 {
                let found = Peak {
                    index,
                    amplitude: peak * self.sign,
                };
                self.sign = -self.sign;
                self.threshold = peak as f64 * self.decay;
                return Some(found);
            }
        }
        None
    }
}

/// Sample distances between successive peaks of a swipe
///
/// The first peak only anchors the measurement, so N peaks yield N - 1
/// distances.
pub struct PeakExtractor<'a> {
    peaks: Peaks<'a>,
    last: Option<usize>,
}

impl<'a> PeakExtractor<'a> {
    pub fn new(samples: &'a [i16]) -> Self {
        Self::with_config(samples, &PeakConfig::default())
    }

    pub fn with_config(samples: &'a [i16], config: &PeakConfig) -> Self {
        Self {
            peaks: Peaks::new(samples, config),
            last: None,
        }
    }
}

impl Iterator for PeakExtractor<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        for peak in self.peaks.by_ref() {
            let previous = self.last.replace(peak.index);
            if let Some(previous) = previous {
                return Some(peak.index - previous);
            }
        }
        None
    }
}
