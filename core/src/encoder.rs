use crate::error::{DecodeError, Result};
use crate::framing::ByteGroup;
use crate::{END_SENTINEL, START_SENTINEL};

/// Shape of a synthetic swipe
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Length of one bit cell
    pub samples_per_bit: usize,
    /// Peak height of each flux transition pulse
    pub amplitude: i16,
    /// Samples on each side of a pulse centre that carry signal
    pub pulse_half_width: usize,
    /// Zero bits written before the start sentinel and after the LRC
    pub runway_bits: usize,
    /// Silence before the first transition
    pub lead_in: usize,
    /// Silence after the last transition
    pub lead_out: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            samples_per_bit: 100,
            amplitude: 10000,
            pulse_half_width: 6,
            runway_bits: 40,
            lead_in: 2000,
            lead_out: 2000,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        // Mid-cell pulses of a 1 bit must not overlap their neighbours
        if self.samples_per_bit <= 4 * self.pulse_half_width {
            return Err(DecodeError::InvalidConfig(format!(
                "samples_per_bit ({}) must exceed four pulse half-widths ({})",
                self.samples_per_bit, self.pulse_half_width
            )));
        }
        if self.amplitude <= 0 {
            return Err(DecodeError::InvalidConfig("amplitude must be positive".into()));
        }
        if self.lead_in <= self.pulse_half_width || self.lead_out <= self.pulse_half_width {
            return Err(DecodeError::InvalidConfig(
                "lead-in and lead-out must be wider than a pulse".into(),
            ));
        }
        Ok(())
    }
}

/// Synthesises the audio a reader would produce for a BCD track
///
/// The inverse of the decode pipeline, used to exercise it end to end.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Frame track data as ';' + data + '?' + LRC
    pub fn encode_groups(data: &str) -> Result<Vec<ByteGroup>> {
        let mut groups = Vec::with_capacity(data.len() + 3);
        groups.extend(ByteGroup::from_char(START_SENTINEL));
        for c in data.chars() {
            if c == START_SENTINEL || c == END_SENTINEL {
                return Err(DecodeError::InvalidInput(format!(
                    "sentinel {:?} inside track data",
                    c
                )));
            }
            let group = ByteGroup::from_char(c).ok_or_else(|| {
                DecodeError::InvalidInput(format!("{:?} has no BCD encoding", c))
            })?;
            groups.push(group);
        }
        groups.extend(ByteGroup::from_char(END_SENTINEL));

        let mut lrc = groups[0];
        for group in &groups[1..] {
            lrc.accumulate(group);
        }
        groups.push(lrc.with_odd_parity());
        Ok(groups)
    }

    /// Bit stream of a full swipe, runway zeros included
    pub fn encode_bits(&self, data: &str) -> Result<Vec<u8>> {
        let runway = std::iter::repeat(0u8).take(self.config.runway_bits);
        let record = Self::encode_groups(data)?;

        Ok(runway
            .clone()
            .chain(record.iter().flat_map(|group| group.bits()))
            .chain(runway)
            .collect())
    }

    pub fn encode(&self, data: &str) -> Result<Vec<i16>> {
        Ok(self.modulate(&self.encode_bits(data)?))
    }

    /// F2F modulation: a transition at every cell boundary plus one at the
    /// middle of each 1 cell, rendered as alternating triangular pulses
    pub fn modulate(&self, bits: &[u8]) -> Vec<i16> {
        let cfg = &self.config;
        let mut transitions = Vec::with_capacity(bits.len() * 2 + 1);
        let mut position = cfg.lead_in;
        for &bit in bits {
            transitions.push(position);
            if bit != 0 {
                transitions.push(position + cfg.samples_per_bit / 2);
            }
            position += cfg.samples_per_bit;
        }
        transitions.push(position);

        let mut samples = vec![0i16; position + cfg.lead_out];
        let width = cfg.pulse_half_width as i32 + 1;
        for (n, &centre) in transitions.iter().enumerate() {
            let sign = if n % 2 == 0 { 1 } else { -1 };
            for k in -(width - 1)..width {
                let value = sign * cfg.amplitude as i32 * (width - k.abs()) / width;
                let index = (centre as i32 + k) as usize;
                samples[index] = value as i16;
            }
        }
        samples
    }
}
