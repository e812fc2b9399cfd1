//! MFE/MFCC feature extraction over pull-based signals.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`dsp`] | sums, matrix products, logarithms, linspace, real FFT, DCT-II |
//! | [`functions`] | Mel scale, zero guard, triangular windows |
//! | [`processing`] | framing, pre-emphasis, power spectrum |
//! | [`filterbank`] | Mel filterbank builder |
//! | [`mfcc`] | MFE and MFCC assemblers with their size calculators |
//! | [`source`] | [`Signal`](mf_core::Signal) adapters over slices and callbacks |

pub mod dsp;
pub mod filterbank;
pub mod functions;
pub mod mfcc;
pub mod processing;
pub mod source;
