//! Signal level helpers for 16-bit PCM

/// Peak-to-peak amplitude (max - min) of a block, 0 for an empty block
pub fn peak_to_peak(samples: &[i16]) -> i32 {
    let mut iter = samples.iter().copied();
    let Some(first) = iter.next() else {
        return 0;
    };
    let (min, max) = iter.fold((first, first), |(min, max), s| (min.min(s), max.max(s)));
    max as i32 - min as i32
}

/// Integer mean of a block, truncated toward zero
pub fn average(samples: &[i16]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: i64 = samples.iter().map(|&s| s as i64).sum();
    (sum / samples.len() as i64) as i32
}

/// Add a constant bias to every sample, saturating at the i16 range
pub fn apply_bias(samples: &mut [i16], bias: i32) {
    if bias == 0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample = (*sample as i32 + bias).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
}
