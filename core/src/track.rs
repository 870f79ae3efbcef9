use crate::error::{DecodeError, Result};
use crate::framing::{ByteFramer, ByteGroup, FramingStop};
use crate::{END_SENTINEL, START_SENTINEL};
use log::debug;

/// Direction the stripe passed the read head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    /// Card swiped backwards: the bit stream arrives last bit first
    Reverse,
}

/// Lazily decoded characters of one track record
///
/// Yields the characters between the sentinels. A malformed record ends
/// with a single `Err` item; a complete one whose LRC matches simply ends.
pub struct Characters<I: Iterator<Item = ByteGroup>> {
    groups: I,
    lrc: Option<ByteGroup>,
    seen: String,
    done: bool,
}

impl<I: Iterator<Item = ByteGroup>> Characters<I> {
    pub fn new(groups: I) -> Self {
        Self {
            groups,
            lrc: None,
            seen: String::new(),
            done: false,
        }
    }

    fn fail(&mut self, err: DecodeError) -> Option<Result<char>> {
        debug!("Chars: {}", self.seen);
        self.done = true;
        Some(Err(err))
    }

    // Called on the end sentinel: the group after it is the literal LRC
    fn check_lrc(&mut self, lrc: ByteGroup) -> Option<Result<char>> {
        let expected = lrc.with_odd_parity();
        match self.groups.next() {
            None => self.fail(DecodeError::NoEndSentinel),
            Some(found) if found != expected => self.fail(DecodeError::BadLrc {
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            Some(_) => {
                self.done = true;
                None
            }
        }
    }
}

impl<I: Iterator<Item = ByteGroup>> Iterator for Characters<I> {
    type Item = Result<char>;

    fn next(&mut self) -> Option<Result<char>> {
        if self.done {
            return None;
        }

        let mut lrc = match self.lrc {
            Some(lrc) => lrc,
            None => match self.groups.next() {
                Some(start) if start.to_char() == START_SENTINEL => {
                    self.seen.push(START_SENTINEL);
                    start
                }
                _ => return self.fail(DecodeError::NoStartSentinel),
            },
        };

        let Some(group) = self.groups.next() else {
            return self.fail(DecodeError::NoEndSentinel);
        };
        let c = group.to_char();
        self.seen.push(c);
        lrc.accumulate(&group);
        self.lrc = Some(lrc);

        if c == END_SENTINEL {
            return self.check_lrc(lrc);
        }
        Some(Ok(c))
    }
}

/// One framing and decoding pass over the bit stream in a fixed direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub orientation: Orientation,
    pub result: Result<String>,
    /// Groups that passed framing
    pub groups: usize,
    pub framing: Option<FramingStop>,
}

impl Attempt {
    /// Whether this pass got as far as the start sentinel
    pub fn found_start(&self) -> bool {
        !matches!(
            self.result,
            Err(DecodeError::NoBits) | Err(DecodeError::NoStartSentinel)
        )
    }
}

/// Turns the recovered bits of a swipe into the track string
///
/// Each direction is framed from scratch. Leading zeros are only stripped
/// after the stream is put in reading order, so the runway and never the
/// end of the record is what gets skipped.
pub struct TrackDecoder {
    bits: Vec<u8>,
}

impl TrackDecoder {
    pub fn new(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    pub fn attempt(&self, orientation: Orientation) -> Attempt {
        let (groups, framing) = match orientation {
            Orientation::Forward => frame(self.bits.iter().copied()),
            Orientation::Reverse => frame(self.bits.iter().rev().copied()),
        };
        if let Some(malformed) = framing.as_ref().and_then(FramingStop::malformed) {
            debug!("{:?}: {}", orientation, malformed);
        }

        let (result, groups) = match groups {
            Ok(groups) => (Characters::new(groups.iter().copied()).collect(), groups.len()),
            Err(err) => (Err(err), 0),
        };
        Attempt {
            orientation,
            result,
            groups,
            framing,
        }
    }

    /// Decode the whole record in one direction
    pub fn attempt_decode(&self, orientation: Orientation) -> Result<String> {
        self.attempt(orientation).result
    }

    /// Forward pass, then a reverse pass when the forward one found no start
    /// sentinel
    pub fn decode_attempt(&self) -> Attempt {
        let forward = self.attempt(Orientation::Forward);
        if forward.result != Err(DecodeError::NoStartSentinel) {
            return forward;
        }
        debug!("No start sentinel forward, trying reversed");
        self.attempt(Orientation::Reverse)
    }

    pub fn decode_oriented(&self) -> Result<(String, Orientation)> {
        let attempt = self.decode_attempt();
        attempt.result.map(|track| (track, attempt.orientation))
    }

    pub fn decode(&self) -> Result<String> {
        self.decode_attempt().result
    }
}

fn frame<I: Iterator<Item = u8>>(bits: I) -> (Result<Vec<ByteGroup>>, Option<FramingStop>) {
    let mut framer = ByteFramer::new(bits);
    let groups = framer.by_ref().collect::<Result<Vec<ByteGroup>>>();
    (groups, framer.stop().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(chars: &str) -> Vec<ByteGroup> {
        chars.chars().map(|c| ByteGroup::from_char(c).unwrap()).collect()
    }

    fn bits(groups: &[ByteGroup]) -> Vec<u8> {
        groups.iter().flat_map(|group| group.bits()).collect()
    }

    /// Zero runway on both sides of a record, as a swipe produces
    fn swipe(groups: &[ByteGroup]) -> Vec<u8> {
        let mut stream = vec![0; 12];
        stream.extend(bits(groups));
        stream.extend([0; 12]);
        stream
    }

    /// ";12?" followed by its hand-computed LRC
    fn record_12() -> Vec<ByteGroup> {
        let mut record = vec![
            ByteGroup::new([1, 1, 0, 1, 0]),
            ByteGroup::new([1, 0, 0, 0, 0]),
            ByteGroup::new([0, 1, 0, 0, 0]),
            ByteGroup::new([1, 1, 1, 1, 1]),
        ];
        // 1101 ^ 1000 ^ 0100 ^ 1111 = 1110, three ones so parity 0
        record.push(ByteGroup::new([1, 1, 1, 0, 0]));
        record
    }

    fn decoder(groups: &[ByteGroup]) -> TrackDecoder {
        TrackDecoder::new(swipe(groups))
    }

    #[test]
    fn test_decode_short_record() {
        let attempt = decoder(&record_12()).decode_attempt();
        assert_eq!(attempt.result, Ok("12".to_string()));
        assert_eq!(attempt.orientation, Orientation::Forward);
        assert_eq!(attempt.groups, 5);
        assert_eq!(attempt.framing, Some(FramingStop::TrailingZeros { bits: 12 }));
    }

    #[test]
    fn test_decode_reversed_record() {
        // The LRC ends in a 0 parity bit, which leads the reversed stream
        let mut stream = swipe(&record_12());
        stream.reverse();
        let decoder = TrackDecoder::new(stream);

        assert_eq!(
            decoder.attempt_decode(Orientation::Forward),
            Err(DecodeError::NoStartSentinel)
        );
        assert_eq!(
            decoder.decode_oriented().unwrap(),
            ("12".to_string(), Orientation::Reverse)
        );
    }

    #[test]
    fn test_reversed_records_with_zero_lrc_parity() {
        for data in ["", "0", "5", "987", "12", "1234"] {
            let mut record = groups(&format!(";{}?", data));
            let mut lrc = record[0];
            for group in &record[1..] {
                lrc.accumulate(group);
            }
            record.push(lrc.with_odd_parity());

            let mut stream = swipe(&record);
            stream.reverse();
            assert_eq!(
                TrackDecoder::new(stream).decode_oriented(),
                Ok((data.to_string(), Orientation::Reverse)),
                "record {:?}",
                data
            );
        }
    }

    #[test]
    fn test_any_flipped_data_bit_breaks_lrc() {
        for position in 1..=2 {
            for bit in 0..4 {
                let mut record = record_12();
                let mut flipped = record[position].bits();
                flipped[bit] ^= 1;
                // Parity is refreshed so framing accepts the group
                record[position] = ByteGroup::new(flipped).with_odd_parity();

                match decoder(&record).decode() {
                    Err(DecodeError::BadLrc { .. }) => {}
                    other => panic!("char {} bit {}: expected BadLrc, got {:?}", position, bit, other),
                }
            }
        }
    }

    #[test]
    fn test_bad_lrc_reports_groups() {
        let mut record = record_12();
        record[4] = ByteGroup::new([0, 0, 0, 0, 1]);

        assert_eq!(
            decoder(&record).decode(),
            Err(DecodeError::BadLrc {
                expected: "11100".into(),
                found: "00001".into(),
            })
        );
    }

    #[test]
    fn test_prefix_is_yielded_before_failure() {
        let mut record = record_12();
        record[4] = ByteGroup::new([0, 0, 0, 0, 1]);

        let items: Vec<Result<char>> = Characters::new(record.into_iter()).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Ok('1'));
        assert_eq!(items[1], Ok('2'));
        assert!(matches!(items[2], Err(DecodeError::BadLrc { .. })));
    }

    #[test]
    fn test_missing_end_sentinel() {
        assert_eq!(
            decoder(&groups(";1234")).decode(),
            Err(DecodeError::NoEndSentinel)
        );
    }

    #[test]
    fn test_missing_lrc_after_end_sentinel() {
        assert_eq!(
            decoder(&groups(";12?")).decode(),
            Err(DecodeError::NoEndSentinel)
        );
    }

    #[test]
    fn test_no_start_sentinel_either_way() {
        let attempt = decoder(&groups("1234?")).decode_attempt();
        assert_eq!(attempt.result, Err(DecodeError::NoStartSentinel));
        assert_eq!(attempt.orientation, Orientation::Reverse);
        assert!(!attempt.found_start());
    }

    #[test]
    fn test_no_bits() {
        let attempt = TrackDecoder::new(vec![0; 30]).decode_attempt();
        assert_eq!(attempt.result, Err(DecodeError::NoBits));
        assert_eq!(attempt.orientation, Orientation::Forward);
        assert_eq!(TrackDecoder::new(Vec::new()).decode(), Err(DecodeError::NoBits));
    }

    #[test]
    fn test_empty_record() {
        // ";?" with LRC 1101 ^ 1111 = 0010, parity 0
        let mut record = groups(";?");
        record.push(ByteGroup::new([0, 0, 1, 0, 0]));
        assert_eq!(decoder(&record).decode(), Ok(String::new()));
    }
}
