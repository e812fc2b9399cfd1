//! Mel filterbank energies (MFE) and Mel-Frequency Cepstral Coefficients (MFCC).
//!
//! Two-phase API: size the output with `calc_*_buff_size`, allocate a
//! [`Matrix`] of exactly that shape, then call [`mfe`] or [`mfcc`]. Frames are
//! never zero-padded, a trailing partial frame is dropped.

use mf_core::config::FeatureConfig;
use mf_core::error::{FeatureError, Result};
use mf_core::matrix::{MatSize, Matrix, zeroed_buffer};
use mf_core::signal::Signal;

use crate::dsp::{self, DctNorm, RealFft};
use crate::filterbank::filterbanks;
use crate::functions::zero_handling_mat;
use crate::processing::{self, FramesInfo, PreEmphasis};

fn frames_info(signal_length: usize, config: &FeatureConfig) -> Result<FramesInfo> {
    processing::calc_stack_frames_info(
        signal_length,
        config.sampling_freq,
        config.frame_length_s,
        config.frame_stride_s,
        false,
    )
    .inspect_err(|_| log::error!("Calculate stack frame info failed."))
}

/// Shape of the MFE feature matrix for a signal of `signal_length` samples:
/// `frame_nums × num_filter`. The energies matrix is `frame_nums × 1`.
///
/// # Errors
/// `InvalidArgument` if the framing parameters round to zero samples.
///
/// # Example
/// ```
/// use mf_core::config::FeatureConfig;
/// use mf_feature::mfcc::calc_mfe_buff_size;
/// let size = calc_mfe_buff_size(16000, &FeatureConfig::default()).unwrap();
/// assert_eq!((size.rows, size.cols), (50, 32));
/// ```
pub fn calc_mfe_buff_size(signal_length: usize, config: &FeatureConfig) -> Result<MatSize> {
    let info = frames_info(signal_length, config)?;
    Ok(MatSize {
        rows: info.frame_nums,
        cols: config.num_filter,
    })
}

/// Shape of the MFCC feature matrix: `frame_nums × num_cepstral`.
///
/// # Errors
/// Same as [`calc_mfe_buff_size`].
pub fn calc_mfcc_buff_size(signal_length: usize, config: &FeatureConfig) -> Result<MatSize> {
    let info = frames_info(signal_length, config)?;
    Ok(MatSize {
        rows: info.frame_nums,
        cols: config.num_cepstral,
    })
}

fn check_shape(name: &str, mat: &Matrix, rows: usize, cols: usize) -> Result<()> {
    if mat.rows() == rows && mat.cols() == cols {
        return Ok(());
    }
    log::error!(
        "The matrix of {name} size mismatch: {} instead of {rows}x{cols}",
        mat.size()
    );
    Err(FeatureError::invalid(format!(
        "{name} is {}, expected {rows}x{cols}",
        mat.size()
    )))
}

fn do_mfe<S: Signal + ?Sized>(
    features: &mut Matrix,
    energies: &mut Matrix,
    signal: &mut S,
    filterbank: &Matrix,
    frames: &FramesInfo,
    config: &FeatureConfig,
) -> Result<()> {
    let mut frame = zeroed_buffer(frames.frame_length)?;
    let mut spectrum = zeroed_buffer(config.num_bins())?;
    let mut fft = RealFft::new(config.num_fft)?;
    let mut pre_emph = PreEmphasis::new(signal, config.preemph_cof)?;

    for (f, &offset) in frames.frame_offsets.iter().enumerate() {
        pre_emph
            .get_data(offset, &mut frame)
            .inspect_err(|_| log::error!("Read frame {f} from the signal failed."))?;

        processing::power_spectrum_with(&mut fft, &frame, &mut spectrum)
            .inspect_err(|_| log::error!("Compute the power spectrum of frame {f} failed."))?;

        energies.set(f, 0, dsp::sum(&spectrum));

        dsp::dot_by_row(f, &spectrum, filterbank, features)
            .inspect_err(|_| log::error!("Compute the mel filterbanks of frame {f} failed."))?;
    }
    Ok(())
}

/// Compute Mel-filterbank energy features of `signal`.
///
/// `features` must be `frame_nums × num_filter` and `energies`
/// `frame_nums × 1` (see [`calc_mfe_buff_size`]). Row `f` of `features` holds
/// the filterbank energies of frame `f`; `energies[f]` its total power.
/// Exact zeros in both outputs are replaced by `f32::EPSILON`.
///
/// # Errors
/// `InvalidArgument` on a bad configuration, a signal shorter than one frame,
/// or an output shape mismatch, all detected before the signal is read.
/// Read failures of `signal` are propagated.
///
/// # Example
/// ```
/// use mf_core::config::FeatureConfig;
/// use mf_core::matrix::Matrix;
/// use mf_feature::mfcc::{calc_mfe_buff_size, mfe};
/// use mf_feature::source::SliceSignal;
///
/// let config = FeatureConfig::default();
/// let samples: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.05).sin()).collect();
/// let size = calc_mfe_buff_size(samples.len(), &config).unwrap();
/// let mut features = Matrix::with_size(size).unwrap();
/// let mut energies = Matrix::new(size.rows, 1).unwrap();
/// mfe(&mut features, &mut energies, &mut SliceSignal::new(&samples), &config).unwrap();
/// assert!(energies.as_slice().iter().all(|&e| e > 0.0));
/// ```
pub fn mfe<S: Signal + ?Sized>(
    features: &mut Matrix,
    energies: &mut Matrix,
    signal: &mut S,
    config: &FeatureConfig,
) -> Result<()> {
    config.validate()?;

    let frames = processing::stack_frames(
        &*signal,
        config.sampling_freq,
        config.frame_length_s,
        config.frame_stride_s,
        false,
    )
    .inspect_err(|_| log::error!("Frame a signal into overlapping frames failed."))?;

    check_shape("features", features, frames.frame_nums, config.num_filter)?;
    check_shape("energies", energies, frames.frame_nums, 1)?;

    let mut filterbank = Matrix::new(config.num_filter, config.num_bins())?;
    filterbanks(
        &mut filterbank,
        config.num_filter,
        config.num_fft,
        config.sampling_freq,
        config.low_freq,
        config.high_freq(),
        true,
    )
    .inspect_err(|_| log::error!("Compute the Mel-filterbanks failed."))?;

    do_mfe(features, energies, signal, &filterbank, &frames, config)?;

    zero_handling_mat(energies);
    zero_handling_mat(features);
    log::debug!("MFE {} computed", features.size());
    Ok(())
}

/// Compute MFCC features of `signal` into `features` (`frame_nums ×
/// num_cepstral`, see [`calc_mfcc_buff_size`]).
///
/// Log filterbank energies go through an orthonormal DCT-II and the first
/// `num_cepstral` coefficients are kept. With `dc_elimination`, coefficient 0
/// is replaced by the log of the frame energy.
///
/// # Errors
/// As [`mfe`]; also `InvalidArgument` if `num_cepstral > num_filter`.
pub fn mfcc<S: Signal + ?Sized>(
    features: &mut Matrix,
    signal: &mut S,
    config: &FeatureConfig,
) -> Result<()> {
    config.validate()?;
    config.validate_cepstral()?;

    let mfe_size = calc_mfe_buff_size(signal.total_length(), config)?;
    check_shape("features", features, mfe_size.rows, config.num_cepstral)?;

    let mut mfe_energies = Matrix::new(mfe_size.rows, 1)?;
    let mut mfe_features = Matrix::with_size(mfe_size)?;

    mfe(&mut mfe_features, &mut mfe_energies, signal, config)
        .inspect_err(|_| log::error!("Compute Mel-filterbank energy features failed."))?;

    dsp::mat_log(&mut mfe_features);
    dsp::dct2(&mut mfe_features, DctNorm::Ortho)
        .inspect_err(|_| log::error!("Discrete Cosine Transform failed."))?;

    if config.dc_elimination {
        for (row, &energy) in mfe_features
            .rows_iter_mut()
            .zip(mfe_energies.as_slice())
        {
            row[0] = dsp::log(energy);
        }
    }

    let num_cepstral = config.num_cepstral;
    for (dst, src) in features.rows_iter_mut().zip(mfe_features.rows_iter()) {
        dst.copy_from_slice(&src[..num_cepstral]);
    }
    log::debug!("MFCC {} computed", features.size());
    Ok(())
}
