//! Mel scale conversion, zero guard before logarithms, triangular windows.

use mf_core::matrix::Matrix;

use crate::dsp;

/// Hz to Mel scale conversion (natural-log form, `1127 · ln(1 + f/700)`).
///
/// # Example
/// ```
/// use mf_feature::functions::frequency_to_mel;
/// assert!((frequency_to_mel(1000.0) - 999.99).abs() < 0.01);
/// ```
#[inline]
#[must_use]
pub fn frequency_to_mel(hz: f32) -> f32 {
    1127.0 * dsp::log(1.0 + hz / 700.0)
}

/// Mel to Hz conversion. Inverse of [`frequency_to_mel`] up to rounding.
#[inline]
#[must_use]
pub fn mel_to_frequency(mel: f32) -> f32 {
    700.0 * ((mel / 1127.0).exp() - 1.0)
}

/// Replace exact zeros with `f32::EPSILON` so a later logarithm stays finite.
///
/// Non-zero values are left bit-identical.
///
/// # Example
/// ```
/// use mf_feature::functions::zero_handling;
/// let mut v = [0.1, 0.0, 2.0];
/// zero_handling(&mut v);
/// assert_eq!(v, [0.1, f32::EPSILON, 2.0]);
/// ```
pub fn zero_handling(input: &mut [f32]) {
    for v in input.iter_mut().filter(|v| **v == 0.0) {
        *v = f32::EPSILON;
    }
}

/// [`zero_handling`] over every element of a matrix.
pub fn zero_handling_mat(input: &mut Matrix) {
    zero_handling(input.as_mut_slice());
}

/// Shape `x` into a triangular window over `[left, right]` peaking at `middle`.
///
/// Each point becomes `(x - left) / (middle - left)` on the rising edge
/// (`left < x <= middle`), `(right - x) / (right - middle)` on the falling
/// edge (`middle <= x < right`), and zero elsewhere. The falling edge wins
/// at `x == middle`, where both give 1.
///
/// # Example
/// ```
/// use mf_feature::functions::triangle;
/// let mut x = [2.0, 3.0, 4.0, 5.0, 6.0];
/// triangle(&mut x, 2, 4, 6);
/// assert_eq!(x, [0.0, 0.5, 1.0, 0.5, 0.0]);
/// ```
pub fn triangle(x: &mut [f32], left: i32, middle: i32, right: i32) {
    let (l, m, r) = (left as f32, middle as f32, right as f32);
    for v in x.iter_mut() {
        let p = *v;
        let mut w = 0.0;
        if p > l && p <= m {
            w = (p - l) / (m - l);
        }
        if p < r && m <= p {
            w = (r - p) / (r - m);
        }
        *v = w;
    }
}
