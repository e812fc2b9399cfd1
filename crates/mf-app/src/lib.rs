//! melfeat command-line front end: decode an audio file, extract MFE or MFCC
//! features, write them as CSV.

pub mod cli;
pub mod decode;
pub mod output;
pub mod pipeline;
