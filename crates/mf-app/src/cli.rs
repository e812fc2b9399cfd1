use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Feature set written to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Mel filterbank energies, plus the total energy of each frame.
    Mfe,
    /// Mel-frequency cepstral coefficients.
    Mfcc,
}

/// melfeat: MFE / MFCC features from an audio file.
#[derive(Parser, Debug)]
#[command(name = "melfeat", version, about)]
pub struct Cli {
    /// Audio file to analyse (wav, flac, mp3, ogg, m4a, mkv).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Feature configuration (TOML). Defaults apply to missing keys.
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Features to extract.
    #[arg(short, long, value_enum, default_value_t = Mode::Mfcc)]
    pub mode: Mode,

    /// CSV destination. Standard output if absent.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Override the number of cepstral coefficients.
    #[arg(long)]
    pub num_cepstral: Option<usize>,

    /// Override the number of Mel filters.
    #[arg(long)]
    pub num_filter: Option<usize>,

    /// Override the FFT length.
    #[arg(long)]
    pub num_fft: Option<usize>,

    /// Override the pre-emphasis coefficient (0 disables it).
    #[arg(long)]
    pub preemph: Option<f32>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    pub verbose: bool,
}
