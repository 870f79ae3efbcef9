use crate::clock::{ClockConfig, ClockRecovery};
use crate::error::Result;
use crate::framing::FramingStop;
use crate::peaks::{PeakConfig, PeakExtractor};
use crate::segmenter::{SwipeBuffer, SwipeSegmenter};
use crate::source::SampleSource;
use crate::track::{Orientation, TrackDecoder};
use log::debug;

#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    pub peaks: PeakConfig,
    pub clock: ClockConfig,
}

/// Outcome of one decode attempt together with per-stage diagnostics
#[derive(Debug, Clone)]
pub struct DecodeReport {
    pub result: Result<String>,
    /// Direction the record was read in, when a start sentinel was found
    pub orientation: Option<Orientation>,
    pub peaks: usize,
    pub bits: usize,
    pub groups: usize,
    /// How framing ended; `malformed()` on it gives the MalformedByte diagnostic
    pub framing: Option<FramingStop>,
}

/// Runs peak extraction, clock recovery, framing and track decoding over
/// a captured swipe
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Decode a mono 16-bit buffer holding one swipe
    pub fn decode(&self, samples: &[i16]) -> Result<String> {
        self.decode_report(samples).result
    }

    pub fn decode_swipe(&self, swipe: &SwipeBuffer) -> Result<String> {
        self.decode(swipe.samples())
    }

    /// Wait for the next swipe on the segmenter's source and decode it.
    /// `Ok(None)` means the source ended first.
    pub fn read_card<S: SampleSource>(
        &self,
        segmenter: &mut SwipeSegmenter<S>,
    ) -> Result<Option<DecodeReport>> {
        Ok(segmenter
            .next_swipe()?
            .map(|swipe| self.decode_report(swipe.samples())))
    }

    pub fn decode_report(&self, samples: &[i16]) -> DecodeReport {
        let mut peaks = 0;
        let bits: Vec<u8> = ClockRecovery::with_config(
            PeakExtractor::with_config(samples, &self.config.peaks).inspect(|_| peaks += 1),
            self.config.clock.clone(),
        )
        .collect();
        debug!("{} peak distances, bits: {:?}", peaks, bits);

        let bit_count = bits.len();
        let attempt = TrackDecoder::new(bits).decode_attempt();
        debug!("{} groups framed reading {:?}", attempt.groups, attempt.orientation);

        DecodeReport {
            orientation: attempt.found_start().then_some(attempt.orientation),
            result: attempt.result,
            peaks,
            bits: bit_count,
            groups: attempt.groups,
            framing: attempt.framing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_silence_has_no_bits() {
        let report = Decoder::new().decode_report(&vec![0i16; 20_000]);
        assert_eq!(report.result, Err(DecodeError::NoBits));
        assert_eq!(report.peaks, 0);
        assert_eq!(report.bits, 0);
        assert_eq!(report.framing, None);
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(Decoder::new().decode(&[]), Err(DecodeError::NoBits));
    }
}
