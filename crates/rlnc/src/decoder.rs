use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{CodeParams, CodecError, gf256};

/// Builds [`Decoder`]s for one set of [`CodeParams`].
#[derive(Clone, Debug)]
pub struct DecoderFactory {
    params: CodeParams,
}

impl DecoderFactory {
    pub fn new(params: CodeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CodeParams {
        &self.params
    }

    pub fn build(&self) -> Decoder {
        Decoder::new(self.params)
    }
}

/// Full-vector RLNC decoder that can also recode what it holds.
///
/// Rows are kept in reduced row-echelon form with the pivot of row `i` in
/// column `i`, so once the rank reaches the generation size the coefficient
/// matrix is the identity and [`Decoder::block`] holds the source symbols.
pub struct Decoder {
    params: CodeParams,
    coefficients: Vec<u8>,
    block: Vec<u8>,
    pivots: Vec<bool>,
    rank: usize,
    scratch_coefficients: Vec<u8>,
    scratch_symbol: Vec<u8>,
    rng: StdRng,
}

impl Decoder {
    pub fn new(params: CodeParams) -> Self {
        Self {
            params,
            coefficients: vec![0; params.symbols * params.symbols],
            block: vec![0; params.block_size()],
            pivots: vec![false; params.symbols],
            rank: 0,
            scratch_coefficients: vec![0; params.symbols],
            scratch_symbol: vec![0; params.symbol_size],
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

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_complete(&self) -> bool {
        self.rank == self.params.symbols
    }

    /// Decoded block. Only meaningful once [`Decoder::is_complete`].
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Absorb one coded payload. Returns `true` if it raised the rank.
    pub fn read_payload(&mut self, payload: &[u8]) -> Result<bool, CodecError> {
        let n = self.params.symbols;
        let s = self.params.symbol_size;
        if payload.len() < n + s {
            return Err(CodecError::PayloadTooShort {
                needed: n + s,
                actual: payload.len(),
            });
        }
        if self.is_complete() {
            return Ok(false);
        }

        let mut c = std::mem::take(&mut self.scratch_coefficients);
        let mut d = std::mem::take(&mut self.scratch_symbol);
        c.copy_from_slice(&payload[..n]);
        d.copy_from_slice(&payload[n..n + s]);

        // Forward: cancel every column we already have a pivot for.
        for i in 0..n {
            if self.pivots[i] && c[i] != 0 {
                let f = c[i];
                gf256::mul_add(&mut c, &self.coefficients[i * n..(i + 1) * n], f);
                gf256::mul_add(&mut d, &self.block[i * s..(i + 1) * s], f);
            }
        }

        let innovative = match c.iter().position(|&x| x != 0) {
            None => false,
            Some(p) => {
                let inv = gf256::inv(c[p]);
                gf256::scale(&mut c, inv);
                gf256::scale(&mut d, inv);

                // Backward: clear column `p` from the rows already held.
                for i in 0..n {
                    let f = self.coefficients[i * n + p];
                    if self.pivots[i] && f != 0 {
                        gf256::mul_add(&mut self.coefficients[i * n..(i + 1) * n], &c, f);
                        gf256::mul_add(&mut self.block[i * s..(i + 1) * s], &d, f);
                    }
                }

                self.coefficients[p * n..(p + 1) * n].copy_from_slice(&c);
                self.block[p * s..(p + 1) * s].copy_from_slice(&d);
                self.pivots[p] = true;
                self.rank += 1;
                true
            }
        };

        self.scratch_coefficients = c;
        self.scratch_symbol = d;
        Ok(innovative)
    }

    /// Recode: write a random combination of the rows held so far.
    pub fn write_payload(&mut self, out: &mut [u8]) -> Result<usize, CodecError> {
        let n = self.params.symbols;
        let s = self.params.symbol_size;
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

        let (coefficients, rest) = out[..size].split_at_mut(n);
        let symbol = &mut rest[..s];
        coefficients.fill(0);
        symbol.fill(0);

        let mut weights = std::mem::take(&mut self.scratch_coefficients);
        self.params.field.random_vector(&mut self.rng, &mut weights[..self.rank]);
        let mut held = 0;
        for i in (0..n).filter(|&i| self.pivots[i]) {
            let w = weights[held];
            held += 1;
            gf256::mul_add(coefficients, &self.coefficients[i * n..(i + 1) * n], w);
            gf256::mul_add(symbol, &self.block[i * s..(i + 1) * s], w);
        }
        self.scratch_coefficients = weights;
        Ok(size)
    }
}
