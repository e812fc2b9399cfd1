//! Framing, pre-emphasis and power spectrum.

use mf_core::error::{FeatureError, Result};
use mf_core::signal::Signal;

use crate::dsp::RealFft;

/// Frame layout of a signal: geometry plus the start offset of each frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramesInfo {
    /// Samples per frame.
    pub frame_length: usize,
    /// Samples between the starts of two successive frames.
    pub frame_stride: usize,
    /// Number of frames.
    pub frame_nums: usize,
    /// One past the last sample covered by the last frame.
    pub end_offset: usize,
    /// Start offset of every frame, empty until [`stack_frames`] fills it.
    pub frame_offsets: Vec<usize>,
}

/// Round up, unless `v` sits less than 0.001 above an integer.
///
/// `frame_length_s` is a float and can be off by a little bit, e.g.
/// `0.018` is stored as `0.018000011`.
fn ceil_unless_very_close_to_floor(v: f32) -> f32 {
    let floor = v.floor();
    if v > floor && v - floor < 0.001 {
        floor
    } else {
        v.ceil()
    }
}

/// Compute the frame geometry for a signal of `signal_length` samples.
///
/// `frame_offsets` is left empty; this is the allocation-free half used by
/// the buffer size calculators.
///
/// # Errors
/// `InvalidArgument` if the frame length or stride rounds to zero samples.
///
/// # Example
/// ```
/// use mf_feature::processing::calc_stack_frames_info;
/// let info = calc_stack_frames_info(16000, 16000, 0.03, 0.02, true).unwrap();
/// assert_eq!((info.frame_length, info.frame_stride), (480, 320));
/// assert_eq!((info.frame_nums, info.end_offset), (50, 16160));
/// ```
pub fn calc_stack_frames_info(
    signal_length: usize,
    frequency: u32,
    frame_length_s: f32,
    frame_stride_s: f32,
    zero_padding: bool,
) -> Result<FramesInfo> {
    let length = ceil_unless_very_close_to_floor(frequency as f32 * frame_length_s);
    let stride = ceil_unless_very_close_to_floor(frequency as f32 * frame_stride_s);
    if length.is_nan() || stride.is_nan() || length < 1.0 || stride < 1.0 {
        log::error!(
            "Frame length {frame_length_s}s / stride {frame_stride_s}s at {frequency} Hz is under one sample"
        );
        return Err(FeatureError::invalid(format!(
            "frame length ({length}) and stride ({stride}) must be at least one sample"
        )));
    }
    let frame_length = length as usize;
    let frame_stride = stride as usize;

    let overlap = frame_length as i64 - frame_stride as i64;
    let span = (signal_length as i64 - overlap) as f32 / frame_stride as f32;
    let frame_nums = if zero_padding { span.ceil() } else { span.floor() }.max(0.0) as usize;
    let end_offset = (frame_nums as i64 * frame_stride as i64 + overlap).max(0) as usize;

    log::debug!(
        "Framing {signal_length} samples: length={frame_length} stride={frame_stride} frames={frame_nums} end={end_offset}"
    );

    Ok(FramesInfo {
        frame_length,
        frame_stride,
        frame_nums,
        end_offset,
        frame_offsets: Vec::new(),
    })
}

/// Frame a signal into (possibly overlapping) frames.
///
/// With `zero_padding`, a trailing partial frame is kept instead of dropped.
///
/// # Errors
/// Errors of [`calc_stack_frames_info`]; `NoMemory` if the offset table
/// cannot be reserved; `InvalidArgument` if the signal holds no frame or
/// cannot hold the computed number of frame starts.
///
/// # Example
/// ```
/// use mf_feature::processing::stack_frames;
/// use mf_feature::source::SliceSignal;
/// let samples = vec![0.0f32; 16000];
/// let info = stack_frames(&SliceSignal::new(&samples), 16000, 0.02, 0.01, false).unwrap();
/// assert_eq!(info.frame_nums, 99);
/// assert_eq!(info.frame_offsets[98], 98 * 160);
/// ```
pub fn stack_frames<S: Signal + ?Sized>(
    signal: &S,
    frequency: u32,
    frame_length_s: f32,
    frame_stride_s: f32,
    zero_padding: bool,
) -> Result<FramesInfo> {
    let total = signal.total_length();
    let mut info = calc_stack_frames_info(
        total,
        frequency,
        frame_length_s,
        frame_stride_s,
        zero_padding,
    )
    .inspect_err(|_| log::error!("Calculate stack frame info failed."))?;
    if info.frame_nums == 0 {
        log::error!(
            "Signal of {total} samples is shorter than one {}-sample frame.",
            info.frame_length
        );
        return Err(FeatureError::invalid(format!(
            "signal of {total} samples holds no full frame"
        )));
    }

    let mut offsets = Vec::new();
    offsets.try_reserve_exact(info.frame_nums).map_err(|e| {
        log::error!("Alloc frame offsets ({} entries) failed: {e}", info.frame_nums);
        FeatureError::NoMemory(format!("{} frame offsets: {e}", info.frame_nums))
    })?;
    offsets.extend(
        (0..total)
            .step_by(info.frame_stride)
            .take(info.frame_nums),
    );

    if offsets.len() < info.frame_nums {
        log::error!(
            "Only {} of {} frames start inside a {total}-sample signal",
            offsets.len(),
            info.frame_nums
        );
        return Err(FeatureError::invalid(format!(
            "{} frames requested but only {} fit in {total} samples",
            info.frame_nums,
            offsets.len()
        )));
    }

    info.frame_offsets = offsets;
    Ok(info)
}

/// Release the offset table of `frames_info`, keeping its geometry.
pub fn stack_frames_info_free(frames_info: &mut FramesInfo) {
    frames_info.frame_offsets = Vec::new();
}

/// Pre-emphasise a buffer in place: `y[i] = x[i] - cof * x[i - 1]`.
///
/// The first sample wraps around and uses the buffer's last sample.
///
/// # Errors
/// `InvalidArgument` on an empty buffer.
///
/// # Example
/// ```
/// use mf_feature::processing::pre_emphasise;
/// let mut x = [1.0, 2.0, 4.0];
/// pre_emphasise(&mut x, 0.5).unwrap();
/// assert_eq!(x, [-1.0, 1.5, 3.0]);
/// ```
pub fn pre_emphasise(signal: &mut [f32], cof: f32) -> Result<()> {
    let Some(&end) = signal.last() else {
        return Err(FeatureError::invalid("cannot pre-emphasise an empty buffer"));
    };
    for i in (1..signal.len()).rev() {
        signal[i] -= signal[i - 1] * cof;
    }
    signal[0] -= end * cof;
    Ok(())
}

/// Lazy pre-emphasis over a [`Signal`].
///
/// Frames pulled through it are filtered exactly as if [`pre_emphasise`]
/// had run over the whole waveform first: each frame's first sample uses
/// the sample just before it, or the signal's last sample at offset 0.
///
/// # Example
/// ```
/// use mf_core::signal::Signal;
/// use mf_feature::processing::PreEmphasis;
/// use mf_feature::source::SliceSignal;
///
/// let samples = [1.0, 2.0, 4.0, 8.0];
/// let mut source = SliceSignal::new(&samples);
/// let mut emph = PreEmphasis::new(&mut source, 0.5).unwrap();
/// let mut frame = [0.0; 2];
/// emph.get_data(2, &mut frame).unwrap();
/// assert_eq!(frame, [3.0, 6.0]);
/// ```
pub struct PreEmphasis<'a, S: Signal + ?Sized> {
    signal: &'a mut S,
    cof: f32,
    prev_sample: f32,
    last_sample: f32,
}

impl<'a, S: Signal + ?Sized> PreEmphasis<'a, S> {
    /// Wrap `signal`, eagerly reading its last sample for the wraparound term.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty signal; the underlying read error if the
    /// last sample cannot be fetched.
    pub fn new(signal: &'a mut S, cof: f32) -> Result<Self> {
        let total = signal.total_length();
        if total == 0 {
            log::error!("Cannot pre-emphasise an empty signal.");
            return Err(FeatureError::invalid("signal is empty"));
        }
        let mut last = [0.0f32];
        let got = signal
            .read(total - 1, &mut last)
            .inspect_err(|e| log::error!("Get last sample failed: {e}"))?;
        if got != 1 {
            log::error!("Get last sample failed: read returned {got}.");
            return Err(FeatureError::Generic(format!(
                "last sample read returned {got} samples"
            )));
        }
        Ok(Self {
            signal,
            cof,
            prev_sample: 0.0,
            last_sample: last[0],
        })
    }

    /// Fill `out` with pre-emphasised samples starting at `offset`.
    ///
    /// Returns the number of samples produced, always `out.len()`.
    ///
    /// # Errors
    /// `InvalidArgument` if `out` is empty or the range exceeds the signal;
    /// `Generic` on a short read; any error of the underlying signal.
    pub fn get_data(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        let length = out.len();
        let total = self.signal.total_length();
        if length == 0 || offset.checked_add(length).is_none_or(|end| end > total) {
            log::error!(
                "Offset ({offset}) + length ({length}) is larger than signal length ({total})."
            );
            return Err(FeatureError::invalid(format!(
                "cannot read {length} samples at {offset} from {total}"
            )));
        }

        let got = self
            .signal
            .read(offset, out)
            .inspect_err(|e| log::error!("Get signal data failed: {e}"))?;
        if got != length {
            log::error!("Get signal data failed: {got} of {length} samples.");
            return Err(FeatureError::Generic(format!(
                "short read: {got} of {length} samples at {offset}"
            )));
        }

        for i in (1..length).rev() {
            out[i] -= self.cof * out[i - 1];
        }

        if offset == 0 {
            out[0] -= self.cof * self.last_sample;
        } else {
            let mut prev = [0.0f32];
            let got = self
                .signal
                .read(offset - 1, &mut prev)
                .inspect_err(|e| log::error!("Get prev signal data failed: {e}"))?;
            if got != 1 {
                log::error!("Get prev signal data failed: read returned {got}.");
                return Err(FeatureError::Generic(format!(
                    "previous sample read returned {got} samples"
                )));
            }
            self.prev_sample = prev[0];
            out[0] -= self.cof * self.prev_sample;
        }

        Ok(length)
    }
}

impl<S: Signal + ?Sized> Signal for PreEmphasis<'_, S> {
    fn total_length(&self) -> usize {
        self.signal.total_length()
    }

    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        self.get_data(offset, out)
    }
}

/// Power spectrum of one frame: `|FFT(frame)|² / fft_len`.
///
/// # Errors
/// `InvalidArgument` if `out.len() != fft_len / 2 + 1` or `fft_len == 0`.
pub fn power_spectrum(frame: &[f32], out: &mut [f32], fft_len: usize) -> Result<()> {
    let mut fft = RealFft::new(fft_len)?;
    power_spectrum_with(&mut fft, frame, out)
}

/// [`power_spectrum`] on an already planned FFT.
///
/// # Errors
/// `InvalidArgument` if `out.len()` does not match the FFT's bin count.
pub fn power_spectrum_with(fft: &mut RealFft, frame: &[f32], out: &mut [f32]) -> Result<()> {
    fft.magnitude(frame, out)?;
    let scale = 1.0 / f64::from(fft.fft_len() as f32);
    for v in out.iter_mut() {
        let m = f64::from(*v);
        *v = (scale * m * m) as f32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FnSignal, SliceSignal};

    const REL_ERROR: f32 = 1.0e-3;
    const COEFFICIENT: f32 = 0.98;

    fn waveform(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| ((i as f32) * 0.13).sin() * 0.4 + ((i * 31) % 17) as f32 * 0.005 - 0.04)
            .collect()
    }

    #[test]
    fn rounding_floors_only_near_integers() {
        assert_eq!(ceil_unless_very_close_to_floor(288.0), 288.0);
        assert_eq!(ceil_unless_very_close_to_floor(288.000_5), 288.0);
        assert_eq!(ceil_unless_very_close_to_floor(288.2), 289.0);
        assert_eq!(ceil_unless_very_close_to_floor(287.999), 288.0);
    }

    #[test]
    fn stack_frames_table() {
        #[rustfmt::skip]
        let cases = [
            (0.02, 0.02, false, 320, 320, 50, 16000),
            (0.02, 0.02, true, 320, 320, 50, 16000),
            (0.02, 0.01, false, 320, 160, 99, 16000),
            (0.02, 0.01, true, 320, 160, 99, 16000),
            (0.03, 0.01, false, 480, 160, 98, 16000),
            (0.03, 0.01, true, 480, 160, 98, 16000),
            (0.03, 0.02, false, 480, 320, 49, 15840),
            (0.03, 0.02, true, 480, 320, 50, 16160),
        ];
        let samples = vec![0.0f32; 16000];
        let signal = SliceSignal::new(&samples);
        for (len_s, stride_s, pad, length, stride, nums, end) in cases {
            let info = stack_frames(&signal, 16000, len_s, stride_s, pad).unwrap();
            assert_eq!(info.frame_length, length);
            assert_eq!(info.frame_stride, stride);
            assert_eq!(info.frame_nums, nums, "{len_s}/{stride_s} pad={pad}");
            assert_eq!(info.end_offset, end);
            assert_eq!(info.frame_offsets.len(), nums);
            for w in info.frame_offsets.windows(2) {
                assert_eq!(w[1] - w[0], stride);
            }
            assert_eq!(info.frame_offsets[0], 0);
            assert_eq!(info.frame_offsets[nums - 1] + length, end);
        }
    }

    #[test]
    fn stack_frames_refuses_underfilled_table() {
        // 1-sample frames every 5 samples: zero padding asks for 3 starts in 10 samples
        let samples = [0.0f32; 10];
        let signal = SliceSignal::new(&samples);
        let info = calc_stack_frames_info(10, 1000, 0.001, 0.005, true).unwrap();
        assert_eq!(info.frame_nums, 3);
        let err = stack_frames(&signal, 1000, 0.001, 0.005, true).unwrap_err();
        assert_eq!(err.code(), 10);
        assert_eq!(stack_frames(&signal, 1000, 0.001, 0.005, false).unwrap().frame_nums, 2);
    }

    #[test]
    fn frames_info_rejects_sub_sample_geometry() {
        assert!(calc_stack_frames_info(16000, 16000, 0.02, 0.0, false).is_err());
        assert!(calc_stack_frames_info(16000, 16000, 0.0, 0.01, false).is_err());
        let short = calc_stack_frames_info(100, 16000, 0.02, 0.02, false).unwrap();
        assert_eq!(short.frame_nums, 0);
        let samples = [0.0f32; 100];
        let err = stack_frames(&SliceSignal::new(&samples), 16000, 0.02, 0.02, false).unwrap_err();
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn free_releases_offsets_only() {
        let samples = vec![0.0f32; 16000];
        let mut info = stack_frames(&SliceSignal::new(&samples), 16000, 0.02, 0.02, false).unwrap();
        stack_frames_info_free(&mut info);
        assert!(info.frame_offsets.is_empty());
        assert_eq!(info.frame_nums, 50);
    }

    #[test]
    fn pre_emphasise_matches_recurrence() {
        let x = waveform(480);
        let mut y = x.clone();
        pre_emphasise(&mut y, COEFFICIENT).unwrap();
        assert!((y[0] - (x[0] - COEFFICIENT * x[479])).abs() < 1e-6);
        for i in 1..480 {
            assert!((y[i] - (x[i] - COEFFICIENT * x[i - 1])).abs() < 1e-6);
        }
        assert!(pre_emphasise(&mut [0.0f32; 0], COEFFICIENT).is_err());
    }

    #[test]
    fn lazy_pre_emphasis_matches_bulk() {
        let x = waveform(480);
        let mut expect = x.clone();
        pre_emphasise(&mut expect, COEFFICIENT).unwrap();

        let mut source = SliceSignal::new(&x);
        let mut emph = PreEmphasis::new(&mut source, COEFFICIENT).unwrap();
        let mut out = vec![0.0f32; 480];
        for chunk_start in (0..480).step_by(10) {
            let got = emph
                .get_data(chunk_start, &mut out[chunk_start..chunk_start + 10])
                .unwrap();
            assert_eq!(got, 10);
        }
        for (i, (a, b)) in out.iter().zip(&expect).enumerate() {
            assert!((a - b).abs() < REL_ERROR, "sample {i}: {a} vs {b}");
        }
    }

    #[test]
    fn lazy_pre_emphasis_rejects_out_of_range() {
        let x = waveform(32);
        let mut source = SliceSignal::new(&x);
        let mut emph = PreEmphasis::new(&mut source, COEFFICIENT).unwrap();
        let mut out = [0.0f32; 8];
        assert_eq!(emph.get_data(25, &mut out).unwrap_err().code(), 10);
        assert_eq!(emph.get_data(0, &mut [0.0f32; 0]).unwrap_err().code(), 10);
        assert_eq!(emph.read(24, &mut out).unwrap(), 8);
    }

    #[test]
    fn pre_emphasis_surfaces_source_failures() {
        let mut empty = SliceSignal::new(&[0.0f32; 0]);
        assert!(PreEmphasis::new(&mut empty, COEFFICIENT).is_err());

        let mut broken = FnSignal::new(64, |_, _: &mut [f32]| Err(FeatureError::Io("bus".into())));
        let err = PreEmphasis::new(&mut broken, COEFFICIENT).err().unwrap();
        assert_eq!(err.code(), 8);

        let mut short = FnSignal::new(64, |offset, out: &mut [f32]| {
            out.fill(1.0);
            Ok(if offset == 63 { 1 } else { out.len() - 1 })
        });
        let mut emph = PreEmphasis::new(&mut short, COEFFICIENT).unwrap();
        let mut out = [0.0f32; 4];
        assert_eq!(emph.get_data(8, &mut out).unwrap_err().code(), 1);
    }

    #[test]
    fn power_spectrum_is_scaled_square_magnitude() {
        let frame = waveform(480);
        let mut mag = vec![0.0f32; 129];
        crate::dsp::rfft(&frame, &mut mag, 256).unwrap();
        let mut power = vec![0.0f32; 129];
        power_spectrum(&frame, &mut power, 256).unwrap();
        for (m, p) in mag.iter().zip(&power) {
            let want = m * m / 256.0;
            assert!((p - want).abs() <= REL_ERROR * want.max(1.0));
        }
        assert!(power_spectrum(&frame, &mut power[..128], 256).is_err());
    }
}
