use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{CodeParams, CodecError, gf256};

/// Builds [`Encoder`]s for one set of [`CodeParams`].
#[derive(Clone, Debug)]
pub struct EncoderFactory {
    params: CodeParams,
}

impl EncoderFactory {
    pub fn new(params: CodeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CodeParams {
        &self.params
    }

    pub fn build(&self) -> Encoder {
        Encoder::new(self.params)
    }
}

/// Full-vector RLNC encoder over a constant source block.
pub struct Encoder {
    params: CodeParams,
    block: Vec<u8>,
    rank: usize,
    rng: StdRng,
}

impl Encoder {
    pub fn new(params: CodeParams) -> Self {
        Self {
            params,
            block: vec![0; params.block_size()],
            rank: 0,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn params(&self) -> &CodeParams {
        &self.params
    }

    pub fn block_size(&self) -> usize {
        self.params.block_size()
    }

    pub fn symbol_size(&self) -> usize {
        self.params.symbol_size
    }

    pub fn symbols(&self) -> usize {
        self.params.symbols
    }

    pub fn payload_size(&self) -> usize {
        self.params.payload_size()
    }

    /// Zero until the source block is installed, then the generation size.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The source block the encoder combines from.
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Install the source block. `data` must be exactly one block long.
    pub fn set_const_symbols(&mut self, data: &[u8]) -> Result<(), CodecError> {
        if data.len() != self.block.len() {
            return Err(CodecError::BlockSize {
                expected: self.block.len(),
                actual: data.len(),
            });
        }
        self.block.copy_from_slice(data);
        self.rank = self.params.symbols;
        Ok(())
    }

    /// Write one coded payload into `out`, returning the bytes written.
    pub fn write_payload(&mut self, out: &mut [u8]) -> Result<usize, CodecError> {
        let size = self.payload_size();
        if out.len() < size {
            return Err(CodecError::BufferTooSmall {
                needed: size,
                actual: out.len(),
            });
        }
        if self.rank == 0 {
            return Err(CodecError::RankZero);
        }

        let (coefficients, rest) = out[..size].split_at_mut(self.params.symbols);
        self.params.field.random_vector(&mut self.rng, coefficients);

        let symbol = &mut rest[..self.params.symbol_size];
        symbol.fill(0);
        for (c, source) in coefficients
            .iter()
            .zip(self.block.chunks_exact(self.params.symbol_size))
        {
            gf256::mul_add(symbol, source, *c);
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;

    fn params() -> CodeParams {
        CodeParams::new(Field::Binary8, 4, 8).unwrap()
    }

    #[test]
    fn rank_follows_source_block() {
        let mut encoder = EncoderFactory::new(params()).build();
        assert_eq!(encoder.rank(), 0);

        let mut out = vec![0u8; encoder.payload_size()];
        assert!(matches!(
            encoder.write_payload(&mut out),
            Err(CodecError::RankZero)
        ));

        encoder.set_const_symbols(&[3u8; 32]).unwrap();
        assert_eq!(encoder.rank(), 4);
        assert_eq!(encoder.write_payload(&mut out).unwrap(), 12);
    }

    #[test]
    fn rejects_wrong_block_length() {
        let mut encoder = Encoder::new(params());
        let err = encoder.set_const_symbols(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::BlockSize {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn payload_is_combination_of_source_symbols() {
        let mut encoder = Encoder::new(params());
        let data: Vec<u8> = (0..32).collect();
        encoder.set_const_symbols(&data).unwrap();

        let mut out = vec![0u8; encoder.payload_size()];
        encoder.write_payload(&mut out).unwrap();

        let (coefficients, symbol) = out.split_at(4);
        let mut expected = vec![0u8; 8];
        for (c, source) in coefficients.iter().zip(data.chunks_exact(8)) {
            gf256::mul_add(&mut expected, source, *c);
        }
        assert_eq!(symbol, expected.as_slice());
    }
}
