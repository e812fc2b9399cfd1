//! Linear algebra and spectral kernels: sums, matrix products, logarithms,
//! evenly spaced sequences, real FFT and FFT-based DCT-II.

use std::f64::consts::PI;
use std::sync::Arc;

use mf_core::error::{FeatureError, Result};
use mf_core::matrix::{Matrix, zeroed_buffer};
use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};

/// Normalization applied by [`dct2`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DctNorm {
    /// Unscaled DCT-II (`2 * sum(x[n] * cos(..))`).
    #[default]
    None,
    /// Orthonormal scaling: `sqrt(1/4N)` on index 0, `sqrt(1/2N)` elsewhere.
    Ortho,
}

/// Sum of a slice, accumulated left to right in `f32`.
#[must_use]
pub fn sum(input: &[f32]) -> f32 {
    let mut acc = 0.0f32;
    for &v in input {
        acc += v;
    }
    acc
}

/// Matrix product `out = a · b` for `a` (M×N), `b` (N×K), `out` (M×K).
///
/// # Errors
/// `InvalidArgument` if the shapes are not compatible.
///
/// # Example
/// ```
/// use mf_core::matrix::Matrix;
/// use mf_feature::dsp;
/// let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let b = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
/// let mut out = Matrix::new(2, 2).unwrap();
/// dsp::dot(&a, &b, &mut out).unwrap();
/// assert_eq!(out.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
/// ```
pub fn dot(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<()> {
    if a.cols() != b.rows() || a.rows() != out.rows() || b.cols() != out.cols() {
        log::error!(
            "Matrix product shape mismatch: {} · {} -> {}",
            a.size(),
            b.size(),
            out.size()
        );
        return Err(FeatureError::invalid(format!(
            "cannot multiply {} by {} into {}",
            a.size(),
            b.size(),
            out.size()
        )));
    }

    out.fill_zero();
    for (i, row) in a.rows_iter().enumerate() {
        dot_by_row(i, row, b, out)?;
    }
    Ok(())
}

/// Multiply one row vector (1×N) by `b` (N×K) and store it as row
/// `row_index` of `out`, without materializing the full left-hand matrix.
///
/// # Errors
/// `InvalidArgument` if `row.len() != b.rows()`, `b.cols() != out.cols()` or
/// `row_index` is outside `out`.
pub fn dot_by_row(row_index: usize, row: &[f32], b: &Matrix, out: &mut Matrix) -> Result<()> {
    if row.len() != b.rows() || b.cols() != out.cols() || row_index >= out.rows() {
        log::error!(
            "Row product shape mismatch: row {row_index} (1x{}) · {} -> {}",
            row.len(),
            b.size(),
            out.size()
        );
        return Err(FeatureError::invalid(format!(
            "cannot multiply 1x{} by {} into row {row_index} of {}",
            row.len(),
            b.size(),
            out.size()
        )));
    }

    let b_data = b.as_slice();
    let k = b.cols();
    let dst = out.row_mut(row_index);
    for (i, slot) in dst.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (j, &x) in row.iter().enumerate() {
            acc += x * b_data[j * k + i];
        }
        *slot = acc;
    }
    Ok(())
}

/// Convert 16-bit PCM to `f32` in `[-1, 1)`.
///
/// # Errors
/// `InvalidArgument` if the slices differ in length.
///
/// # Example
/// ```
/// use mf_feature::dsp::int16_to_float;
/// let mut out = [0.0f32; 3];
/// int16_to_float(&[i16::MIN, 0, 16384], &mut out).unwrap();
/// assert_eq!(out, [-1.0, 0.0, 0.5]);
/// ```
pub fn int16_to_float(src: &[i16], dst: &mut [f32]) -> Result<()> {
    if src.len() != dst.len() {
        return Err(FeatureError::invalid(format!(
            "int16 source has {} samples, destination {}",
            src.len(),
            dst.len()
        )));
    }
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = f32::from(s) / 32768.0;
    }
    Ok(())
}

/// Natural logarithm.
#[inline]
#[must_use]
pub fn log(a: f32) -> f32 {
    a.ln()
}

/// Base-2 logarithm.
#[inline]
#[must_use]
pub fn log2(a: f32) -> f32 {
    a.log2()
}

/// Base-10 logarithm, derived from [`log2`] so both agree on rounding.
#[inline]
#[must_use]
pub fn log10(a: f32) -> f32 {
    log2(a) * std::f32::consts::LOG10_2
}

/// In-place natural logarithm of every element.
pub fn mat_log(matrix: &mut Matrix) {
    matrix.as_mut_slice().iter_mut().for_each(|v| *v = log(*v));
}

/// In-place base-2 logarithm of every element.
pub fn mat_log2(matrix: &mut Matrix) {
    matrix.as_mut_slice().iter_mut().for_each(|v| *v = log2(*v));
}

/// In-place base-10 logarithm of every element.
pub fn mat_log10(matrix: &mut Matrix) {
    matrix.as_mut_slice().iter_mut().for_each(|v| *v = log10(*v));
}

/// Element types [`linspace`] can generate.
///
/// Floats step by `(stop - start) / (num - 1)`; integers use the truncated
/// integer step.
pub trait Linspace: Copy {
    #[doc(hidden)]
    fn fill(start: Self, stop: Self, out: &mut [Self]);
}

impl Linspace for f32 {
    fn fill(start: Self, stop: Self, out: &mut [Self]) {
        let step = (stop - start) / (out.len() - 1) as f32;
        for (ix, slot) in out.iter_mut().enumerate() {
            *slot = start + ix as f32 * step;
        }
    }
}

macro_rules! impl_int_linspace {
    ($($t:ty),*) => {$(
        impl Linspace for $t {
            fn fill(start: Self, stop: Self, out: &mut [Self]) {
                let step = (i64::from(stop) - i64::from(start)) / (out.len() as i64 - 1);
                for (ix, slot) in out.iter_mut().enumerate() {
                    *slot = (i64::from(start) + ix as i64 * step) as $t;
                }
            }
        }
    )*};
}

impl_int_linspace!(i16, i32);

/// Fill `out` with `out.len()` evenly spaced values from `start` to `stop`
/// inclusive. The last element is always exactly `stop`; a single element
/// is `start`.
///
/// # Errors
/// `InvalidArgument` if `out` is empty.
///
/// # Example
/// ```
/// use mf_feature::dsp::linspace;
/// let mut f = [0.0f32; 5];
/// linspace(0.0, 1.0, &mut f).unwrap();
/// assert_eq!(f, [0.0, 0.25, 0.5, 0.75, 1.0]);
///
/// let mut i = [0i16; 6];
/// linspace(0, 10, &mut i).unwrap();
/// assert_eq!(i, [0, 2, 4, 6, 8, 10]);
/// ```
pub fn linspace<T: Linspace>(start: T, stop: T, out: &mut [T]) -> Result<()> {
    match out.len() {
        0 => Err(FeatureError::invalid("linspace needs at least one point")),
        1 => {
            out[0] = start;
            Ok(())
        }
        n => {
            T::fill(start, stop, out);
            out[n - 1] = stop;
            Ok(())
        }
    }
}

/// Planned real-input FFT of a fixed length with its own buffers.
///
/// One instance serves every frame of a signal. Input longer than `fft_len`
/// is cropped, shorter input is zero-padded.
///
/// # Example
/// ```
/// use mf_feature::dsp::RealFft;
/// let mut fft = RealFft::new(8).unwrap();
/// let mut mag = [0.0f32; 5];
/// fft.magnitude(&[1.0; 8], &mut mag).unwrap();
/// assert!((mag[0] - 8.0).abs() < 1e-5);
/// assert!(mag[1..].iter().all(|m| m.abs() < 1e-5));
/// ```
pub struct RealFft {
    fft_len: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl RealFft {
    /// Plan a forward real FFT of length `fft_len`.
    ///
    /// # Errors
    /// `InvalidArgument` for a zero length, `NoMemory` if a buffer cannot be
    /// reserved.
    pub fn new(fft_len: usize) -> Result<Self> {
        if fft_len == 0 {
            log::error!("FFT length must be > 0");
            return Err(FeatureError::invalid("FFT length must be > 0"));
        }
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(fft_len);
        let input = zeroed_buffer(fft_len)?;
        let spectrum = zeroed_complex(fft_len / 2 + 1)?;
        let scratch = zeroed_complex(plan.get_scratch_len())?;
        Ok(Self {
            fft_len,
            plan,
            input,
            spectrum,
            scratch,
        })
    }

    #[must_use]
    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Number of output bins, `fft_len / 2 + 1`.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.fft_len / 2 + 1
    }

    /// Transform `src` and return the complex half spectrum.
    ///
    /// # Errors
    /// `Generic` if the FFT kernel rejects its buffers.
    pub fn transform(&mut self, src: &[f32]) -> Result<&[Complex32]> {
        let n = src.len().min(self.fft_len);
        self.input[..n].copy_from_slice(&src[..n]);
        self.input[n..].fill(0.0);
        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| {
                log::error!("Real FFT of length {} failed: {e}", self.fft_len);
                FeatureError::Generic(format!("real FFT failed: {e}"))
            })?;
        Ok(&self.spectrum)
    }

    /// Magnitude spectrum of `src` into `out`.
    ///
    /// # Errors
    /// `InvalidArgument` if `out.len() != fft_len / 2 + 1`.
    pub fn magnitude(&mut self, src: &[f32], out: &mut [f32]) -> Result<()> {
        let bins = self.num_bins();
        if out.len() != bins {
            log::error!(
                "The output buffer length ({}) mismatch, should be {bins}",
                out.len()
            );
            return Err(FeatureError::invalid(format!(
                "rfft output has {} bins, expected {bins}",
                out.len()
            )));
        }
        let spectrum = self.transform(src)?;
        for (o, c) in out.iter_mut().zip(spectrum) {
            let (re, im) = (f64::from(c.re), f64::from(c.im));
            *o = (re * re + im * im).sqrt() as f32;
        }
        Ok(())
    }
}

/// One-shot magnitude FFT of a real signal.
///
/// `out` must hold exactly `fft_len / 2 + 1` bins. `src` is cropped to
/// `fft_len` samples if longer, zero-padded if shorter.
///
/// # Errors
/// `InvalidArgument` on a bad output length or zero `fft_len`.
pub fn rfft(src: &[f32], out: &mut [f32], fft_len: usize) -> Result<()> {
    if fft_len > 0 && out.len() != fft_len / 2 + 1 {
        log::error!(
            "The output buffer length ({}) mismatch, should be {}",
            out.len(),
            fft_len / 2 + 1
        );
        return Err(FeatureError::invalid(format!(
            "rfft output has {} bins, expected {}",
            out.len(),
            fft_len / 2 + 1
        )));
    }
    RealFft::new(fft_len)?.magnitude(src, out)
}

/// DCT-II of every row of `mat`, in place.
///
/// Each row of length N is reordered as even samples ascending then odd
/// samples descending, passed through a real FFT, and rotated by
/// `exp(-i·πk/2N)`. Bins above N/2 come from the conjugate-symmetric half.
///
/// # Errors
/// `NoMemory` if the scratch buffers cannot be reserved.
///
/// # Example
/// ```
/// use mf_core::matrix::Matrix;
/// use mf_feature::dsp::{dct2, DctNorm};
/// let mut mat = Matrix::from_vec(1, 4, vec![1.0; 4]).unwrap();
/// dct2(&mut mat, DctNorm::None).unwrap();
/// assert!((mat.get(0, 0) - 8.0).abs() < 1e-5);
/// assert!(mat.row(0)[1..].iter().all(|v| v.abs() < 1e-5));
/// ```
pub fn dct2(mat: &mut Matrix, norm: DctNorm) -> Result<()> {
    let n = mat.cols();
    let mut fft = RealFft::new(n)?;
    let mut reordered = zeroed_buffer(n)?;
    let half = n / 2;

    for (r, row) in mat.rows_iter_mut().enumerate() {
        for i in 0..half {
            reordered[i] = row[2 * i];
            reordered[n - 1 - i] = row[2 * i + 1];
        }
        if n % 2 == 1 {
            reordered[half] = row[n - 1];
        }

        let spectrum = fft.transform(&reordered).inspect_err(|_| {
            log::error!("DCT2 row {r} failed.");
        })?;

        for (k, out) in row.iter_mut().enumerate() {
            let c = if k <= half {
                spectrum[k]
            } else {
                spectrum[n - k].conj()
            };
            let theta = k as f64 * PI / (2 * n) as f64;
            let v = f64::from(c.re) * theta.cos() + f64::from(c.im) * theta.sin();
            *out = v as f32 * 2.0;
        }

        if norm == DctNorm::Ortho {
            row[0] *= (1.0 / (4 * n) as f32).sqrt();
            let scale = (1.0 / (2 * n) as f32).sqrt();
            row[1..].iter_mut().for_each(|v| *v *= scale);
        }
    }
    Ok(())
}

fn zeroed_complex(len: usize) -> Result<Vec<Complex32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        log::error!("Allocate complex buffer of {len} bins failed: {e}");
        FeatureError::NoMemory(format!("{len} complex bins: {e}"))
    })?;
    buf.resize(len, Complex32::new(0.0, 0.0));
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REL_ERROR: f32 = 1.0e-3;

    fn naive_dft_magnitude(src: &[f32], fft_len: usize) -> Vec<f64> {
        (0..=fft_len / 2)
            .map(|k| {
                let (mut re, mut im) = (0.0f64, 0.0f64);
                for (n, &x) in src.iter().take(fft_len).enumerate() {
                    let w = -2.0 * PI * (k * n) as f64 / fft_len as f64;
                    re += f64::from(x) * w.cos();
                    im += f64::from(x) * w.sin();
                }
                (re * re + im * im).sqrt()
            })
            .collect()
    }

    fn naive_dct2(x: &[f32]) -> Vec<f64> {
        let n = x.len();
        (0..n)
            .map(|k| {
                2.0 * x
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        f64::from(v) * (PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64).cos()
                    })
                    .sum::<f64>()
            })
            .collect()
    }

    fn test_signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32;
                (t * 0.31).sin() * 0.6 + (t * 0.047).cos() * 0.3 + ((i * 7919) % 13) as f32 * 0.01
            })
            .collect()
    }

    #[test]
    fn sum_accumulates() {
        let values = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 0.0, 0.0, 0.0];
        assert!((sum(&values) - 10.5).abs() < REL_ERROR);
        assert_eq!(sum(&[]), 0.0);
    }

    #[test]
    fn dot_matches_reference_product() {
        let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut out = Matrix::new(2, 2).unwrap();
        dot(&a, &b, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn dot_rejects_shape_mismatch() {
        let a = Matrix::new(2, 3).unwrap();
        let b = Matrix::new(2, 2).unwrap();
        let mut out = Matrix::new(2, 2).unwrap();
        assert_eq!(dot(&a, &b, &mut out).unwrap_err().code(), 10);

        let b = Matrix::new(3, 2).unwrap();
        let mut wrong_out = Matrix::new(3, 2).unwrap();
        assert!(dot(&a, &b, &mut wrong_out).is_err());
    }

    #[test]
    fn dot_by_row_writes_single_row() {
        let b = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut out = Matrix::new(2, 2).unwrap();
        dot_by_row(1, &[4.0, 5.0, 6.0], &b, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0.0, 0.0, 139.0, 154.0]);
        assert!(dot_by_row(2, &[4.0, 5.0, 6.0], &b, &mut out).is_err());
        assert!(dot_by_row(0, &[4.0, 5.0], &b, &mut out).is_err());
    }

    #[test]
    fn int16_conversion_scales_and_checks_len() {
        let mut out = [0.0f32; 4];
        int16_to_float(&[0, 32767, -32768, -16384], &mut out).unwrap();
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.999_969_5).abs() < 1e-6);
        assert_eq!(out[2], -1.0);
        assert_eq!(out[3], -0.5);
        assert!(int16_to_float(&[1, 2], &mut out).is_err());
    }

    #[test]
    fn logarithms() {
        let e = std::f32::consts::E;
        for (x, expect) in [(1.0, 0.0), (e, 1.0), (e * e, 2.0), (e * e * e, 3.0)] {
            assert!((log(x) - expect).abs() < REL_ERROR, "ln({x})");
        }
        for (i, x) in [1.0, 2.0, 4.0, 8.0, 16.0].into_iter().enumerate() {
            assert!((log2(x) - i as f32).abs() < REL_ERROR, "log2({x})");
        }
        for (i, x) in [1.0, 10.0, 100.0, 1000.0, 10000.0].into_iter().enumerate() {
            assert!((log10(x) - i as f32).abs() < REL_ERROR, "log10({x})");
        }
    }

    #[test]
    fn matrix_logarithms_in_place() {
        let e = f64::from(std::f32::consts::E);
        let data = (0..5).map(|i| e.powi(i) as f32).collect();
        let mut mat = Matrix::from_vec(1, 5, data).unwrap();
        mat_log(&mut mat);
        for (i, v) in mat.as_slice().iter().enumerate() {
            assert!((v - i as f32).abs() < REL_ERROR);
        }

        let mut mat = Matrix::from_vec(1, 3, vec![1.0, 10.0, 100.0]).unwrap();
        mat_log10(&mut mat);
        assert!((mat.get(0, 2) - 2.0).abs() < REL_ERROR);

        let mut mat = Matrix::from_vec(1, 2, vec![8.0, 0.0]).unwrap();
        mat_log2(&mut mat);
        assert!((mat.get(0, 0) - 3.0).abs() < REL_ERROR);
        assert_eq!(mat.get(0, 1), f32::NEG_INFINITY);
    }

    #[test]
    fn linspace_float_single_and_endpoint() {
        let mut one = [0.0f32; 1];
        linspace(3.5, 9.0, &mut one).unwrap();
        assert_eq!(one[0], 3.5);

        let mut out = [0.0f32; 34];
        linspace(0.0, 2840.5, &mut out).unwrap();
        assert_eq!(out[33], 2840.5);
        let step = out[1] - out[0];
        for w in out[..33].windows(2) {
            assert!(((w[1] - w[0]) - step).abs() < 1e-3);
        }

        assert!(linspace::<f32>(0.0, 1.0, &mut []).is_err());
    }

    #[test]
    fn linspace_integer_truncates_step() {
        let mut out = [0i32; 6];
        linspace(0, 100_000, &mut out).unwrap();
        assert_eq!(out, [0, 20000, 40000, 60000, 80000, 100_000]);

        let mut out = [0i16; 4];
        linspace(0, 10, &mut out).unwrap();
        assert_eq!(out, [0, 3, 6, 10]);

        let mut out = [0i16; 3];
        linspace(10, -10, &mut out).unwrap();
        assert_eq!(out, [10, 0, -10]);
    }

    #[test]
    fn rfft_matches_direct_dft() {
        let src = test_signal(480);
        let mut out = vec![0.0f32; 129];
        rfft(&src, &mut out, 256).unwrap();
        let expect = naive_dft_magnitude(&src, 256);
        for (k, (&got, &want)) in out.iter().zip(&expect).enumerate() {
            let tol = f64::from(REL_ERROR) * want.abs().max(1.0);
            assert!((f64::from(got) - want).abs() < tol, "bin {k}: {got} vs {want}");
        }
    }

    #[test]
    fn rfft_zero_pads_short_input() {
        let src = test_signal(100);
        let mut out = vec![0.0f32; 129];
        rfft(&src, &mut out, 256).unwrap();
        let expect = naive_dft_magnitude(&src, 256);
        for (&got, &want) in out.iter().zip(&expect) {
            assert!((f64::from(got) - want).abs() < 1e-3 * want.abs().max(1.0));
        }
    }

    #[test]
    fn rfft_rejects_wrong_output_len() {
        let mut out = vec![0.0f32; 128];
        let err = rfft(&[0.0; 256], &mut out, 256).unwrap_err();
        assert_eq!(err.code(), 10);
        assert!(rfft(&[0.0; 4], &mut [], 0).is_err());
    }

    #[test]
    fn dct2_matches_direct_formula_even_and_odd() {
        for n in [32usize, 13, 2] {
            let row = test_signal(n);
            let mut mat = Matrix::from_vec(2, n, [row.clone(), row.clone()].concat()).unwrap();
            dct2(&mut mat, DctNorm::None).unwrap();
            let expect = naive_dct2(&row);
            for r in 0..2 {
                for (k, &want) in expect.iter().enumerate() {
                    let got = f64::from(mat.get(r, k));
                    assert!(
                        (got - want).abs() < 1e-3 * want.abs().max(1.0),
                        "n={n} k={k}: {got} vs {want}"
                    );
                }
            }
        }
    }

    #[test]
    fn dct2_ortho_preserves_energy() {
        let row = test_signal(32);
        let energy: f32 = row.iter().map(|v| v * v).sum();
        let mut mat = Matrix::from_vec(1, 32, row).unwrap();
        dct2(&mut mat, DctNorm::Ortho).unwrap();
        let out_energy: f32 = mat.as_slice().iter().map(|v| v * v).sum();
        assert!((energy - out_energy).abs() < REL_ERROR * energy);
    }
}
