//! Random linear network coding over GF(2) and GF(2^8).
//!
//! Full-vector RLNC: every payload carries its coding coefficients in front
//! of the coded symbol, so a [`Decoder`] can also recode what it holds
//! without first decoding the generation.
//!
//! # Modules
//!
//! - [`gf256`]: field arithmetic (log/exp tables)
//! - `params`: field, scheme and generation geometry
//! - `encoder` / `decoder`: coders and the factories that build them

pub mod gf256;

mod decoder;
mod encoder;
mod params;

use thiserror::Error;

pub use decoder::{Decoder, DecoderFactory};
pub use encoder::{Encoder, EncoderFactory};
pub use params::{CodeParams, CodingScheme, Field};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("generation must contain at least one symbol")]
    ZeroSymbols,
    #[error("symbol size must be non-zero")]
    ZeroSymbolSize,
    #[error("block size mismatch: expected {expected} bytes, got {actual}")]
    BlockSize { expected: usize, actual: usize },
    #[error("payload too short: need {needed} bytes, got {actual}")]
    PayloadTooShort { needed: usize, actual: usize },
    #[error("output buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("nothing to code: rank is zero")]
    RankZero,
}
