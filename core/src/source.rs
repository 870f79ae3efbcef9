use crate::error::Result;
use std::io::{ErrorKind, Read};

/// Pull-based source of mono signed 16-bit PCM at `SAMPLE_RATE`
///
/// `read` blocks until up to `n` samples are available. An empty vector
/// means the stream has ended.
pub trait SampleSource {
    fn read(&mut self, n: usize) -> Result<Vec<i16>>;
}

/// Complete in-memory recording handed out chunk by chunk
pub struct BufferSource {
    samples: Vec<i16>,
    position: usize,
}

impl BufferSource {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl SampleSource for BufferSource {
    fn read(&mut self, n: usize) -> Result<Vec<i16>> {
        let end = (self.position + n).min(self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }
}

/// Live source decoding little-endian s16 mono from a byte stream
///
/// Typical inputs are stdin or a pipe from a capture tool such as
/// `arecord -f S16_LE -r 44100 -c 1`.
pub struct ReaderSource<R: Read> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: Read> SampleSource for ReaderSource<R> {
    fn read(&mut self, n: usize) -> Result<Vec<i16>> {
        self.buf.resize(n * 2, 0);

        // Fill as much of the request as the stream gives before EOF
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // A dangling odd byte at EOF cannot form a sample
        Ok(self.buf[..filled - filled % 2]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}
