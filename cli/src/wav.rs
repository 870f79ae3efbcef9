//! WAV input/output for the command line front end

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use magswipe_core::{CHANNELS, SAMPLE_RATE};
use std::io::{Read, Seek, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("Failed to read WAV: {0}")]
    Hound(#[from] hound::Error),

    #[error("Unsupported WAV format: {bits}-bit {format:?}")]
    Unsupported { bits: u16, format: SampleFormat },

    #[error("WAV file has no channels")]
    NoChannels,
}

/// Load a WAV stream as mono 16-bit PCM at `SAMPLE_RATE`
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<i16>, WavError> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();
    log::info!(
        "Read WAV: {} Hz, {} channels, {} bits",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|s| (s as i16) << 8))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ (24 | 32)) => reader
            .samples::<i32>()
            .map(|s| s.map(|s| (s >> (bits - 16)) as i16))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()?,
        (format, bits) => return Err(WavError::Unsupported { bits, format }),
    };

    let mono = downmix(&interleaved, spec.channels)?;
    Ok(resample(&mono, spec.sample_rate as usize, SAMPLE_RATE))
}

/// Write mono 16-bit PCM at `SAMPLE_RATE`
pub fn write_samples<W: Write + Seek>(writer: W, samples: &[i16]) -> Result<(), WavError> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::new(writer, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Average interleaved channels into one
fn downmix(samples: &[i16], channels: u16) -> Result<Vec<i16>, WavError> {
    match channels {
        0 => Err(WavError::NoChannels),
        1 => Ok(samples.to_vec()),
        n => Ok(samples
            .chunks_exact(n as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / n as i32) as i16
            })
            .collect()),
    }
}

/// Linear interpolation resampling
fn resample(samples: &[i16], from_rate: usize, to_rate: usize) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_length = (samples.len() as f64 / ratio).ceil() as usize;

    (0..new_length)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let index = source_pos.floor() as usize;
            let fraction = source_pos - index as f64;

            match (samples.get(index), samples.get(index + 1)) {
                (Some(&left), Some(&right)) => {
                    (left as f64 + (right as f64 - left as f64) * fraction) as i16
                }
                (Some(&left), None) => left,
                _ => samples[samples.len() - 1],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_wav(spec: WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    fn spec(sample_rate: u32, channels: u16) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    #[test]
    fn test_mono_at_native_rate_is_unchanged() {
        let input = vec![100i16, -200, 300, -400];
        let wav = make_wav(spec(44100, 1), &input);
        assert_eq!(read_samples(Cursor::new(wav)).unwrap(), input);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let wav = make_wav(spec(44100, 2), &[100, 200, -300, -500]);
        assert_eq!(read_samples(Cursor::new(wav)).unwrap(), vec![150, -400]);
    }

    #[test]
    fn test_48khz_is_resampled() {
        let wav = make_wav(spec(48000, 1), &vec![1000i16; 48000]);
        let samples = read_samples(Cursor::new(wav)).unwrap();

        assert!(samples.len() >= 44000 && samples.len() <= 44200);
        assert!(samples.iter().all(|&s| s == 1000));
    }

    #[test]
    fn test_write_then_read() {
        let mut cursor = Cursor::new(Vec::new());
        write_samples(&mut cursor, &[1, 2, 3, -4]).unwrap();

        let samples = read_samples(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(samples, vec![1, 2, 3, -4]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = read_samples(Cursor::new(b"not a wav file".to_vec()));
        assert!(matches!(result, Err(WavError::Hound(_))));
    }
}
