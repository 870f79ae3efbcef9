use crate::error::{DecodeError, Result};
use crate::{BCD_OFFSET, DATA_BITS, GROUP_WIDTH};
use log::debug;
use std::fmt;

/// Four data bits, least significant first, followed by an odd parity bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteGroup([u8; GROUP_WIDTH]);

impl ByteGroup {
    pub fn new(bits: [u8; GROUP_WIDTH]) -> Self {
        Self(bits.map(|bit| bit & 1))
    }

    /// Group for a BCD character ('0' through '?'), parity filled in
    pub fn from_char(c: char) -> Option<Self> {
        let value = (c as u32).checked_sub(BCD_OFFSET as u32)?;
        if value > 0x0f {
            return None;
        }
        let mut bits = [0u8; GROUP_WIDTH];
        for (i, bit) in bits.iter_mut().take(DATA_BITS).enumerate() {
            *bit = ((value >> i) & 1) as u8;
        }
        Some(Self(bits).with_odd_parity())
    }

    pub fn bits(&self) -> [u8; GROUP_WIDTH] {
        self.0
    }

    pub fn has_odd_parity(&self) -> bool {
        self.0.iter().sum::<u8>() % 2 == 1
    }

    /// Data bits read as a binary number
    pub fn value(&self) -> u8 {
        self.0[..DATA_BITS]
            .iter()
            .rev()
            .fold(0, |acc, &bit| (acc << 1) | bit)
    }

    pub fn to_char(&self) -> char {
        (self.value() + BCD_OFFSET) as char
    }

    /// Fold another group's data bits in, column by column, mod 2
    pub fn accumulate(&mut self, other: &ByteGroup) {
        for i in 0..DATA_BITS {
            self.0[i] ^= other.0[i];
        }
    }

    /// Set the parity bit so the group sums to an odd number
    pub fn with_odd_parity(mut self) -> Self {
        let ones: u8 = self.0[..DATA_BITS].iter().sum();
        self.0[DATA_BITS] = (1 + ones) % 2;
        self
    }
}

impl fmt::Display for ByteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.0 {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Why framing ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingStop {
    /// Bits ran out exactly on a group boundary
    Exhausted,
    /// Only zeros were left: the runway after the record
    TrailingZeros { bits: usize },
    /// Fewer than a full group of bits was left
    ShortGroup { bits: Vec<u8> },
    /// A full group failed odd parity; everything after it was dropped
    BadParity { group: ByteGroup, remaining: usize },
}

impl FramingStop {
    /// Malformed-byte diagnostic, `None` for a clean end
    pub fn malformed(&self) -> Option<DecodeError> {
        match self {
            FramingStop::Exhausted | FramingStop::TrailingZeros { .. } => None,
            FramingStop::ShortGroup { bits } => Some(DecodeError::MalformedByte {
                group: bits.iter().map(|b| b.to_string()).collect(),
                remaining: 0,
            }),
            FramingStop::BadParity { group, remaining } => Some(DecodeError::MalformedByte {
                group: group.to_string(),
                remaining: *remaining,
            }),
        }
    }
}

enum State {
    Start,
    Framing,
    Done,
}

/// Splits a bit stream into parity-checked 5-bit groups
///
/// Leading zeros (the gap before the start sentinel) are skipped. Framing
/// stops at the first short or even-parity group; nothing after it is
/// emitted. An input with no 1 bit at all yields a single `NoBits` error.
pub struct ByteFramer<I: Iterator<Item = u8>> {
    bits: I,
    state: State,
    stop: Option<FramingStop>,
}

impl<I: Iterator<Item = u8>> ByteFramer<I> {
    pub fn new(bits: I) -> Self {
        Self {
            bits,
            state: State::Start,
            stop: None,
        }
    }

    /// Set once the framer has returned `None`
    pub fn stop(&self) -> Option<&FramingStop> {
        self.stop.as_ref()
    }

    fn take_group(&mut self, first: Option<u8>) -> Option<ByteGroup> {
        let mut bits = Vec::with_capacity(GROUP_WIDTH);
        bits.extend(first);
        bits.extend(self.bits.by_ref().take(GROUP_WIDTH - bits.len()));

        let bits = match <[u8; GROUP_WIDTH]>::try_from(bits) {
            Ok(bits) => bits,
            Err(tail) if tail.is_empty() => {
                self.finish(FramingStop::Exhausted);
                return None;
            }
            Err(tail) => {
                debug!("End of bits: {} left", tail.len());
                self.finish(FramingStop::ShortGroup { bits: tail });
                return None;
            }
        };
        let group = ByteGroup::new(bits);
        if group.has_odd_parity() {
            return Some(group);
        }

        let (remaining, ones) = self
            .bits
            .by_ref()
            .fold((0, 0), |(n, ones), bit| (n + 1, ones + usize::from(bit != 0)));
        if ones == 0 && group.bits() == [0; GROUP_WIDTH] {
            self.finish(FramingStop::TrailingZeros {
                bits: GROUP_WIDTH + remaining,
            });
            return None;
        }

        debug!(
            "End of bits: checksum failed ({}), {} bits left",
            group, remaining
        );
        self.finish(FramingStop::BadParity { group, remaining });
        None
    }

    fn finish(&mut self, stop: FramingStop) {
        self.state = State::Done;
        self.stop = Some(stop);
    }
}

impl<I: Iterator<Item = u8>> Iterator for ByteFramer<I> {
    type Item = Result<ByteGroup>;

    fn next(&mut self) -> Option<Result<ByteGroup>> {
        let first = match self.state {
            State::Done => return None,
            State::Start => {
                let Some(first) = self.bits.by_ref().find(|&bit| bit != 0) else {
                    self.state = State::Done;
                    return Some(Err(DecodeError::NoBits));
                };
                self.state = State::Framing;
                Some(first)
            }
            State::Framing => None,
        };

        self.take_group(first).map(Ok)
    }
}
