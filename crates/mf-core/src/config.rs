use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Parameters of the MFE/MFCC pipeline.
///
/// Every field has a default tuned for 16 kHz keyword-spotting input, so a
/// TOML file only needs the keys it overrides.
///
/// # Example
/// ```
/// use mf_core::config::FeatureConfig;
/// let config: FeatureConfig = toml::from_str("num_cepstral = 10").unwrap();
/// assert_eq!(config.num_cepstral, 10);
/// assert_eq!(config.num_filter, 32);
/// assert_eq!(config.high_freq(), 8000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Sampling frequency of the signal in Hz.
    pub sampling_freq: u32,
    /// Frame length in seconds.
    pub frame_length_s: f32,
    /// Step between successive frames in seconds.
    pub frame_stride_s: f32,
    /// Number of triangular filters in the mel filterbank.
    pub num_filter: usize,
    /// FFT length; frames are cropped or zero-padded to it.
    pub num_fft: usize,
    /// Number of cepstral coefficients kept per frame.
    pub num_cepstral: usize,
    /// Lowest band edge of the mel filters in Hz.
    pub low_freq: u32,
    /// Highest band edge in Hz. `None` means half the sampling frequency.
    pub high_freq: Option<u32>,
    /// Pre-emphasis coefficient. 0 disables the filter.
    pub preemph_cof: f32,
    /// Replace the first cepstral coefficient with the log frame energy.
    pub dc_elimination: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sampling_freq: 16000,
            frame_length_s: 0.02,
            frame_stride_s: 0.02,
            num_filter: 32,
            num_fft: 256,
            num_cepstral: 13,
            low_freq: 0,
            high_freq: None,
            preemph_cof: 0.98,
            dc_elimination: true,
        }
    }
}

impl FeatureConfig {
    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded feature config from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Effective upper band edge in Hz.
    #[must_use]
    pub fn high_freq(&self) -> u32 {
        self.high_freq.unwrap_or(self.sampling_freq / 2)
    }

    /// Number of FFT bins produced per frame (`num_fft / 2 + 1`).
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.num_fft / 2 + 1
    }

    /// Check the framing, filterbank and pre-emphasis parameters shared by
    /// MFE and MFCC before any buffer is sized from them.
    ///
    /// `num_cepstral` is not looked at here, see [`validate_cepstral`](Self::validate_cepstral).
    ///
    /// # Errors
    /// `InvalidArgument` naming the first offending parameter.
    ///
    /// # Example
    /// ```
    /// use mf_core::config::FeatureConfig;
    /// let mut config = FeatureConfig::default();
    /// assert!(config.validate().is_ok());
    /// config.num_fft = 255;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> std::result::Result<(), FeatureError> {
        let fail = |msg: String| {
            log::error!("Invalid feature config: {msg}");
            Err(FeatureError::InvalidArgument(msg))
        };
        if self.sampling_freq == 0 {
            return fail("sampling_freq must be > 0".into());
        }
        let non_positive = |v: f32| v.is_nan() || v <= 0.0;
        if non_positive(self.frame_length_s) || non_positive(self.frame_stride_s) {
            return fail(format!(
                "frame length/stride must be > 0 s, got {}/{}",
                self.frame_length_s, self.frame_stride_s
            ));
        }
        if self.num_filter == 0 || self.num_fft == 0 {
            return fail(format!(
                "num_filter ({}) and num_fft ({}) must be > 0",
                self.num_filter, self.num_fft
            ));
        }
        if self.num_fft % 2 != 0 {
            return fail(format!("num_fft ({}) must be even", self.num_fft));
        }
        if self.low_freq > self.high_freq() {
            return fail(format!(
                "low_freq ({}) is above high_freq ({})",
                self.low_freq,
                self.high_freq()
            ));
        }
        if !self.preemph_cof.is_finite() {
            return fail(format!("preemph_cof must be finite, got {}", self.preemph_cof));
        }
        Ok(())
    }

    /// Check `num_cepstral` against the filterbank size. Only MFCC keeps
    /// cepstral coefficients.
    ///
    /// # Errors
    /// `InvalidArgument` unless `1 <= num_cepstral <= num_filter`.
    ///
    /// # Example
    /// ```
    /// use mf_core::config::FeatureConfig;
    /// let mut config = FeatureConfig::default();
    /// config.num_filter = 10;
    /// assert!(config.validate().is_ok());
    /// assert!(config.validate_cepstral().is_err());
    /// ```
    pub fn validate_cepstral(&self) -> std::result::Result<(), FeatureError> {
        if self.num_cepstral == 0 || self.num_cepstral > self.num_filter {
            let msg = format!(
                "num_cepstral ({}) must be within 1..={}",
                self.num_cepstral, self.num_filter
            );
            log::error!("Invalid feature config: {msg}");
            return Err(FeatureError::InvalidArgument(msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: FeatureConfig = toml::from_str("").unwrap();
        assert_eq!(config, FeatureConfig::default());
        assert_eq!(config.num_bins(), 129);
    }

    #[test]
    fn explicit_high_freq_overrides_nyquist() {
        let config: FeatureConfig =
            toml::from_str("sampling_freq = 8000\nhigh_freq = 3000").unwrap();
        assert_eq!(config.high_freq(), 3000);
        let config: FeatureConfig = toml::from_str("sampling_freq = 8000").unwrap();
        assert_eq!(config.high_freq(), 4000);
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let base = FeatureConfig::default();
        let cases = [
            FeatureConfig {
                sampling_freq: 0,
                ..base.clone()
            },
            FeatureConfig {
                frame_stride_s: 0.0,
                ..base.clone()
            },
            FeatureConfig {
                num_fft: 0,
                ..base.clone()
            },
            FeatureConfig {
                low_freq: 9000,
                ..base.clone()
            },
            FeatureConfig {
                preemph_cof: f32::NAN,
                ..base.clone()
            },
            FeatureConfig {
                num_fft: 257,
                ..base.clone()
            },
        ];
        for config in cases {
            assert_eq!(config.validate().unwrap_err().code(), 10, "{config:?}");
        }
    }

    #[test]
    fn cepstral_count_is_checked_separately() {
        let mut config = FeatureConfig {
            num_filter: 10,
            ..FeatureConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.validate_cepstral().unwrap_err().code(), 10);
        config.num_cepstral = 0;
        assert!(config.validate_cepstral().is_err());
        config.num_cepstral = 10;
        assert!(config.validate_cepstral().is_ok());
    }

    #[test]
    fn load_reads_toml_file() {
        let path = std::env::temp_dir().join(format!("mf-core-config-{}.toml", std::process::id()));
        std::fs::write(&path, "num_filter = 40\npreemph_cof = 0.97\n").unwrap();
        let config = FeatureConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.num_filter, 40);
        assert!((config.preemph_cof - 0.97).abs() < 1e-6);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FeatureConfig::load(Path::new("/nonexistent/melfeat.toml")).unwrap_err();
        assert!(err.to_string().contains("Cannot read config"));
    }
}
