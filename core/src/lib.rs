//! Magnetic stripe card decoder working from swipe audio
//!
//! A card reader wired into a microphone jack produces one pulse per flux
//! reversal. Bits are F2F (Aiken biphase) encoded, so they are recovered from
//! the spacing between pulses alone, then framed into 5-bit BCD characters
//! checked by odd parity and a longitudinal redundancy check.

pub mod error;
pub mod level;
pub mod source;
pub mod segmenter;
pub mod peaks;
pub mod clock;
pub mod framing;
pub mod track;
pub mod decoder;
pub mod encoder;

pub use clock::{ClockConfig, ClockRecovery};
pub use decoder::{DecodeReport, Decoder, DecoderConfig};
pub use encoder::{Encoder, EncoderConfig};
pub use error::{DecodeError, Result};
pub use framing::{ByteFramer, ByteGroup, FramingStop};
pub use peaks::{PeakConfig, PeakExtractor};
pub use segmenter::{SegmenterConfig, SwipeBuffer, SwipeSegmenter};
pub use source::{BufferSource, ReaderSource, SampleSource};
pub use track::{Attempt, Orientation, TrackDecoder};

// Audio format
pub const SAMPLE_RATE: usize = 44100;
pub const CHANNELS: u16 = 1;

// Swipe segmentation
pub const CHUNK_SAMPLES: usize = 10000;
pub const BASELINE_WINDOW: usize = 4;
pub const BASELINE_SEED: i32 = 1 << 15; // warm-up chunks can never trigger
pub const THRESHOLD_FACTOR: f64 = 3.5;
pub const TRIM_BLOCK_SAMPLES: usize = 1000;
pub const TRIM_PROBE_SAMPLES: usize = 3000;
pub const MAX_SWIPE_SAMPLES: usize = SAMPLE_RATE * 10; // 10 s of continuous activity

// Peak extraction
pub const FIRST_PEAK_SAMPLES: usize = 1000;
pub const FIRST_PEAK_FACTOR: f64 = 0.8;
pub const SECOND_PEAK_FACTOR: f64 = 0.5;

// Clock recovery
pub const SKIPPED_PEAKS: usize = 5;
pub const CLOCK_WINDOW: usize = 4;
pub const ZERO_BIT_FACTOR: f64 = 1.5;

// BCD track framing
pub const GROUP_WIDTH: usize = 5;
pub const DATA_BITS: usize = GROUP_WIDTH - 1;
pub const START_SENTINEL: char = ';';
pub const END_SENTINEL: char = '?';
pub const BCD_OFFSET: u8 = b'0';
