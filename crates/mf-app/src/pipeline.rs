use std::fs::File;
use std::io::{self, BufWriter};

use anyhow::{Context, Result, bail};
use mf_core::config::FeatureConfig;
use mf_core::matrix::Matrix;
use mf_feature::mfcc::{calc_mfcc_buff_size, calc_mfe_buff_size, mfcc, mfe};
use mf_feature::source::SliceSignal;

use crate::cli::{Cli, Mode};
use crate::decode;
use crate::output;

/// Features of one file, ready to be written.
#[derive(Debug)]
pub struct Extracted {
    pub features: Matrix,
    /// Per-frame energy, MFE mode only.
    pub energies: Option<Matrix>,
}

/// Load the configuration named on the command line (or the defaults) and
/// apply the command-line overrides on top.
///
/// # Errors
/// Returns an error if the config file cannot be read or parsed.
pub fn load_config(cli: &Cli) -> Result<FeatureConfig> {
    let mut config = match &cli.config {
        Some(path) => FeatureConfig::load(path)?,
        None => FeatureConfig::default(),
    };
    if let Some(n) = cli.num_cepstral {
        config.num_cepstral = n;
    }
    if let Some(n) = cli.num_filter {
        config.num_filter = n;
    }
    if let Some(n) = cli.num_fft {
        config.num_fft = n;
    }
    if let Some(cof) = cli.preemph {
        config.preemph_cof = cof;
    }
    Ok(config)
}

/// Run the two-phase extraction on an in-memory waveform.
///
/// # Errors
/// Returns an error if the waveform holds no full frame or a pipeline stage
/// fails.
pub fn extract(samples: &[f32], config: &FeatureConfig, mode: Mode) -> Result<Extracted> {
    let mut signal = SliceSignal::new(samples);
    match mode {
        Mode::Mfe => {
            let size = calc_mfe_buff_size(samples.len(), config)?;
            if size.is_empty() {
                bail!(
                    "{} samples at {} Hz is shorter than one frame",
                    samples.len(),
                    config.sampling_freq
                );
            }
            let mut features = Matrix::with_size(size)?;
            let mut energies = Matrix::new(size.rows, 1)?;
            mfe(&mut features, &mut energies, &mut signal, config).context("MFE extraction failed")?;
            Ok(Extracted {
                features,
                energies: Some(energies),
            })
        }
        Mode::Mfcc => {
            let size = calc_mfcc_buff_size(samples.len(), config)?;
            if size.is_empty() {
                bail!(
                    "{} samples at {} Hz is shorter than one frame",
                    samples.len(),
                    config.sampling_freq
                );
            }
            let mut features = Matrix::with_size(size)?;
            mfcc(&mut features, &mut signal, config).context("MFCC extraction failed")?;
            Ok(Extracted {
                features,
                energies: None,
            })
        }
    }
}

/// Validate `config` for `mode`. The cepstral count only matters for MFCC.
///
/// # Errors
/// Returns an error naming the first invalid parameter.
pub fn check_config(config: &FeatureConfig, mode: Mode) -> Result<()> {
    config.validate().context("Invalid feature parameters")?;
    if mode == Mode::Mfcc {
        config
            .validate_cepstral()
            .context("Invalid MFCC parameters")?;
    }
    Ok(())
}

/// Decode, extract, write.
///
/// # Errors
/// Returns an error if any stage fails.
pub fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    let audio = decode::decode_file(&cli.input)?;

    if audio.sample_rate != config.sampling_freq {
        log::warn!(
            "{} is sampled at {} Hz, overriding configured {} Hz",
            cli.input.display(),
            audio.sample_rate,
            config.sampling_freq
        );
        config.sampling_freq = audio.sample_rate;
    }
    check_config(&config, cli.mode)?;

    let extracted = extract(&audio.samples, &config, cli.mode)?;
    log::info!(
        "{:?}: {} frames x {} features",
        cli.mode,
        extracted.features.rows(),
        extracted.features.cols()
    );

    let prefix = match cli.mode {
        Mode::Mfe => "mfe",
        Mode::Mfcc => "mfcc",
    };
    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            output::write_csv(
                BufWriter::new(file),
                prefix,
                &extracted.features,
                extracted.energies.as_ref(),
            )
            .with_context(|| format!("Cannot write {}", path.display()))?;
            log::info!("Features written to {}", path.display());
        }
        None => output::write_csv(
            io::stdout().lock(),
            prefix,
            &extracted.features,
            extracted.energies.as_ref(),
        )
        .context("Cannot write to stdout")?,
    }
    Ok(())
}
