//! Ready-made [`Signal`] implementations over borrowed sample storage.

use mf_core::error::{FeatureError, Result};
use mf_core::signal::Signal;

use crate::dsp;

fn check_range(offset: usize, len: usize, total: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= total => Ok(()),
        _ => {
            log::error!("Read of {len} samples at {offset} exceeds signal length {total}");
            Err(FeatureError::invalid(format!(
                "read [{offset}, +{len}) past signal length {total}"
            )))
        }
    }
}

/// Signal over an in-memory `f32` waveform.
///
/// # Example
/// ```
/// use mf_core::signal::Signal;
/// use mf_feature::source::SliceSignal;
/// let samples = [0.0, 0.5, 1.0, 0.5];
/// let mut signal = SliceSignal::new(&samples);
/// let mut out = [0.0; 2];
/// signal.read(1, &mut out).unwrap();
/// assert_eq!(out, [0.5, 1.0]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SliceSignal<'a> {
    samples: &'a [f32],
}

impl<'a> SliceSignal<'a> {
    #[must_use]
    pub fn new(samples: &'a [f32]) -> Self {
        Self { samples }
    }
}

impl Signal for SliceSignal<'_> {
    fn total_length(&self) -> usize {
        self.samples.len()
    }

    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        check_range(offset, out.len(), self.samples.len())?;
        out.copy_from_slice(&self.samples[offset..offset + out.len()]);
        Ok(out.len())
    }
}

/// Signal over 16-bit PCM, converted to `[-1, 1)` as it is read.
#[derive(Debug, Clone, Copy)]
pub struct PcmSignal<'a> {
    samples: &'a [i16],
}

impl<'a> PcmSignal<'a> {
    #[must_use]
    pub fn new(samples: &'a [i16]) -> Self {
        Self { samples }
    }
}

impl Signal for PcmSignal<'_> {
    fn total_length(&self) -> usize {
        self.samples.len()
    }

    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        check_range(offset, out.len(), self.samples.len())?;
        dsp::int16_to_float(&self.samples[offset..offset + out.len()], out)?;
        Ok(out.len())
    }
}

/// Signal backed by a pull callback, for sources that are not a slice
/// (ring buffers, flash, files read on demand).
///
/// # Example
/// ```
/// use mf_core::signal::Signal;
/// use mf_feature::source::FnSignal;
/// let mut signal = FnSignal::new(100, |offset, out: &mut [f32]| {
///     out.fill(offset as f32);
///     Ok(out.len())
/// });
/// let mut out = [0.0; 4];
/// assert_eq!(signal.read(7, &mut out).unwrap(), 4);
/// assert_eq!(out, [7.0; 4]);
/// ```
pub struct FnSignal<F> {
    total_length: usize,
    pull: F,
}

impl<F> FnSignal<F>
where
    F: FnMut(usize, &mut [f32]) -> Result<usize>,
{
    pub fn new(total_length: usize, pull: F) -> Self {
        Self { total_length, pull }
    }
}

impl<F> Signal for FnSignal<F>
where
    F: FnMut(usize, &mut [f32]) -> Result<usize>,
{
    fn total_length(&self) -> usize {
        self.total_length
    }

    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        (self.pull)(offset, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_signal_rejects_out_of_range() {
        let samples = [1.0f32; 8];
        let mut signal = SliceSignal::new(&samples);
        let mut out = [0.0; 4];
        assert_eq!(signal.read(4, &mut out).unwrap(), 4);
        assert_eq!(signal.read(5, &mut out).unwrap_err().code(), 10);
        assert!(signal.read(usize::MAX, &mut out).is_err());
    }

    #[test]
    fn pcm_signal_scales_samples() {
        let samples = [0i16, 16384, -32768, 8192];
        let mut signal = PcmSignal::new(&samples);
        assert_eq!(signal.total_length(), 4);
        let mut out = [0.0; 3];
        signal.read(1, &mut out).unwrap();
        assert_eq!(out, [0.5, -1.0, 0.25]);
    }

    #[test]
    fn fn_signal_propagates_errors() {
        let mut signal = FnSignal::new(16, |_, _: &mut [f32]| Err(FeatureError::Io("flash".into())));
        let mut out = [0.0; 2];
        assert_eq!(signal.read(0, &mut out).unwrap_err().code(), 8);
    }
}
