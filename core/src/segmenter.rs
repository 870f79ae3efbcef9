use crate::error::{DecodeError, Result};
use crate::level::{apply_bias, average, peak_to_peak};
use crate::source::SampleSource;
use crate::{
    BASELINE_SEED, BASELINE_WINDOW, CHUNK_SAMPLES, MAX_SWIPE_SAMPLES, THRESHOLD_FACTOR,
    TRIM_BLOCK_SAMPLES, TRIM_PROBE_SAMPLES,
};
use log::debug;
use std::collections::VecDeque;

/// Tunables for swipe detection
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Samples pulled from the source per capture step
    pub chunk_samples: usize,
    /// A chunk is active when its power exceeds baseline mean times this factor
    pub threshold_factor: f64,
    /// Samples dropped per trimming step
    pub trim_block: usize,
    /// Window measured at each edge while trimming
    pub trim_probe: usize,
    /// Upper bound on a buffered swipe
    pub max_swipe_samples: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_samples: CHUNK_SAMPLES,
            threshold_factor: THRESHOLD_FACTOR,
            trim_block: TRIM_BLOCK_SAMPLES,
            trim_probe: TRIM_PROBE_SAMPLES,
            max_swipe_samples: MAX_SWIPE_SAMPLES,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_samples == 0 {
            return Err(DecodeError::InvalidConfig("chunk_samples must be positive".into()));
        }
        if !self.threshold_factor.is_finite() || self.threshold_factor <= 0.0 {
            return Err(DecodeError::InvalidConfig(format!(
                "threshold_factor must be a positive number, got {}",
                self.threshold_factor
            )));
        }
        if self.trim_block == 0 || self.trim_probe < self.trim_block {
            return Err(DecodeError::InvalidConfig(format!(
                "trim_probe ({}) must be at least trim_block ({}) and both positive",
                self.trim_probe, self.trim_block
            )));
        }
        if self.max_swipe_samples < self.chunk_samples * 2 {
            return Err(DecodeError::InvalidConfig(format!(
                "max_swipe_samples ({}) must hold at least two chunks of {}",
                self.max_swipe_samples, self.chunk_samples
            )));
        }
        Ok(())
    }
}

/// Bias-corrected samples covering exactly one swipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeBuffer {
    samples: Vec<i16>,
}

impl SwipeBuffer {
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

/// Energy-based swipe detector over a chunked sample source
///
/// Keeps a rolling window of idle chunk powers as the noise floor and a
/// running DC bias estimate. Both live as long as the segmenter, so one
/// instance should serve every swipe read from the same device.
pub struct SwipeSegmenter<S: SampleSource> {
    source: S,
    config: SegmenterConfig,
    baselines: VecDeque<i32>,
    bias: i32,
    previous: Vec<i16>,
    exhausted: bool,
}

impl<S: SampleSource> SwipeSegmenter<S> {
    pub fn new(source: S) -> Self {
        Self::build(source, SegmenterConfig::default())
    }

    pub fn with_config(source: S, config: SegmenterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(source, config))
    }

    fn build(source: S, config: SegmenterConfig) -> Self {
        Self {
            source,
            config,
            baselines: VecDeque::from(vec![BASELINE_SEED; BASELINE_WINDOW]),
            bias: 0,
            previous: Vec::new(),
            exhausted: false,
        }
    }

    /// Current DC correction added to every incoming sample
    pub fn bias(&self) -> i32 {
        self.bias
    }

    /// Power above which a chunk counts as part of a swipe
    pub fn threshold(&self) -> f64 {
        let sum: i64 = self.baselines.iter().map(|&p| p as i64).sum();
        sum as f64 / self.baselines.len() as f64 * self.config.threshold_factor
    }

    /// Pull chunks until a swipe is captured.
    ///
    /// Blocks on the source. Returns `Ok(None)` once a finite source runs
    /// dry without completing a swipe.
    pub fn next_swipe(&mut self) -> Result<Option<SwipeBuffer>> {
        loop {
            if self.exhausted {
                return Ok(None);
            }

            let (mut data, mut power) = self.read_chunk()?;
            if data.is_empty() {
                return Ok(None);
            }

            let threshold = self.threshold();
            debug!("chunk power {} threshold {:.1}", power, threshold);

            let mut chunks: Vec<Vec<i16>> = Vec::new();
            let mut buffered = 0;
            while power as f64 > threshold {
                debug!("chunk power {} threshold {:.1} *", power, threshold);
                buffered += data.len();
                if buffered > self.config.max_swipe_samples {
                    // The next swipe must not be padded with audio from before this one
                    self.previous.clear();
                    return Err(DecodeError::SwipeTooLong {
                        samples: buffered,
                        limit: self.config.max_swipe_samples,
                    });
                }
                chunks.push(data);
                (data, power) = self.read_chunk()?;
            }

            if chunks.len() > 1 {
                let mut samples =
                    Vec::with_capacity(self.previous.len() + buffered + data.len());
                samples.append(&mut self.previous);
                for chunk in &chunks {
                    samples.extend_from_slice(chunk);
                }
                samples.extend_from_slice(&data);
                self.previous = data;

                self.trim(&mut samples, threshold / 2.0);
                let mean = average(&samples);
                apply_bias(&mut samples, -mean);
                debug!(
                    "swipe captured: {} active chunks, {} samples after trimming",
                    chunks.len(),
                    samples.len()
                );
                return Ok(Some(SwipeBuffer { samples }));
            }

            if data.is_empty() {
                return Ok(None);
            }

            // Only idle chunks feed the noise floor and the bias estimate
            self.bias -= average(&data);
            self.baselines.pop_front();
            self.baselines.push_back(power);
            self.previous = data;
        }
    }

    fn read_chunk(&mut self) -> Result<(Vec<i16>, i32)> {
        let mut data = self.source.read(self.config.chunk_samples)?;
        if data.is_empty() {
            self.exhausted = true;
        }
        apply_bias(&mut data, self.bias);
        let power = peak_to_peak(&data);
        Ok((data, power))
    }

    /// Drop quiet blocks from both edges until the probe window sees signal
    fn trim(&self, samples: &mut Vec<i16>, floor: f64) {
        let block = self.config.trim_block;
        let probe = self.config.trim_probe;

        let mut start = 0;
        let mut end = samples.len();
        while end - start > block
            && (peak_to_peak(&samples[start..(start + probe).min(end)]) as f64) < floor
        {
            start += block;
        }
        while end - start > block
            && (peak_to_peak(&samples[end.saturating_sub(probe).max(start)..end]) as f64) < floor
        {
            end -= block;
        }

        samples.truncate(end);
        samples.drain(..start);
    }
}
