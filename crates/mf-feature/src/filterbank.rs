//! Mel filterbank builder.

use mf_core::error::{FeatureError, Result};
use mf_core::matrix::{Matrix, zeroed_buffer};

use crate::dsp;
use crate::functions::{frequency_to_mel, mel_to_frequency, triangle};

/// Fill `filterbanks` with `num_filter` triangular Mel-spaced filters over the
/// `num_fft / 2 + 1` FFT bins.
///
/// The caller allocates the matrix as `num_filter × (num_fft / 2 + 1)`. Each
/// filter is one row; with `transposed`, filter `i` is written as column `i`
/// and the matrix ends up `(num_fft / 2 + 1) × num_filter`, ready to be
/// right-multiplied by a power spectrum row.
///
/// # Errors
/// `InvalidArgument` on a shape mismatch, a zero sampling frequency,
/// `low_freq > high_freq`, or a band edge mapping past the last FFT bin.
/// `NoMemory` if a scratch buffer cannot be reserved.
///
/// # Example
/// ```
/// use mf_core::matrix::Matrix;
/// use mf_feature::filterbank::filterbanks;
/// let mut fb = Matrix::new(32, 129).unwrap();
/// filterbanks(&mut fb, 32, 256, 16000, 0, 8000, true).unwrap();
/// assert_eq!((fb.rows(), fb.cols()), (129, 32));
/// ```
pub fn filterbanks(
    filterbanks: &mut Matrix,
    num_filter: usize,
    num_fft: usize,
    sampling_freq: u32,
    low_freq: u32,
    high_freq: u32,
    transposed: bool,
) -> Result<()> {
    let coefficients = num_fft / 2 + 1;
    if filterbanks.rows() != num_filter || filterbanks.cols() != coefficients {
        log::error!(
            "The filterbanks matrix shape mismatch: {} instead of {num_filter}x{coefficients}",
            filterbanks.size()
        );
        return Err(FeatureError::invalid(format!(
            "filterbanks is {}, expected {num_filter}x{coefficients}",
            filterbanks.size()
        )));
    }
    if sampling_freq == 0 || low_freq > high_freq {
        log::error!("Bad band edges: {low_freq}..{high_freq} Hz at {sampling_freq} Hz");
        return Err(FeatureError::invalid(format!(
            "band {low_freq}..{high_freq} Hz invalid at {sampling_freq} Hz"
        )));
    }

    filterbanks.fill_zero();

    // num_filter filtres => num_filter + 2 points
    let num_points = num_filter + 2;
    let mut mels = zeroed_buffer(num_points)?;
    dsp::linspace(
        frequency_to_mel(low_freq as f32),
        frequency_to_mel(high_freq as f32),
        &mut mels,
    )?;

    let (low, high) = (low_freq as f32, high_freq as f32);
    let mut freq_index = Vec::new();
    freq_index.try_reserve_exact(num_points).map_err(|e| {
        log::error!("Alloc {num_points} filterbank edges failed: {e}");
        FeatureError::NoMemory(format!("{num_points} filterbank edges: {e}"))
    })?;
    for &mel in &mels {
        let freq = mel_to_frequency(mel).clamp(low, high);
        let index = ((num_fft + 1) as f32 * freq / sampling_freq as f32).floor() as usize;
        if index >= coefficients {
            log::error!("Band edge {freq} Hz maps to bin {index}, past {coefficients} bins");
            return Err(FeatureError::invalid(format!(
                "{freq} Hz lies beyond the {coefficients} FFT bins"
            )));
        }
        freq_index.push(index);
    }

    let mut filter = zeroed_buffer(coefficients)?;
    let data = filterbanks.as_mut_slice();
    for (i, edges) in freq_index.windows(3).enumerate() {
        let (left, middle, right) = (edges[0], edges[1], edges[2]);
        let window = &mut filter[..=right - left];
        dsp::linspace(left as f32, right as f32, window)?;
        triangle(window, left as i32, middle as i32, right as i32);

        for (j, &w) in window.iter().enumerate() {
            let index = if transposed {
                (left + j) * num_filter + i
            } else {
                i * coefficients + left + j
            };
            data[index] = w;
        }
    }

    if transposed {
        filterbanks.reshape(coefficients, num_filter)?;
    }

    log::debug!(
        "Filterbank {} ({num_filter} filters, {low_freq}..{high_freq} Hz, transposed={transposed})",
        filterbanks.size()
    );
    Ok(())
}
