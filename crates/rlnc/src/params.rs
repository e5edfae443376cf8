use std::fmt;

use rand::Rng;

use crate::CodecError;

/// Finite field the coding coefficients are drawn from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Field {
    /// GF(2): coefficients are 0 or 1, combinations are plain XOR.
    Binary,
    /// GF(2^8): one byte per coefficient.
    #[default]
    Binary8,
}

impl Field {
    /// Draw one random coefficient.
    pub(crate) fn random_coefficient<R: Rng>(self, rng: &mut R) -> u8 {
        match self {
            Field::Binary => rng.random::<bool>() as u8,
            Field::Binary8 => rng.random::<u8>(),
        }
    }

    /// Fill `coefficients` with a random vector that is not all zero.
    pub(crate) fn random_vector<R: Rng>(self, rng: &mut R, coefficients: &mut [u8]) {
        loop {
            for c in coefficients.iter_mut() {
                *c = self.random_coefficient(rng);
            }
            if coefficients.iter().any(|&c| c != 0) || coefficients.is_empty() {
                return;
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Binary => write!(f, "binary"),
            Field::Binary8 => write!(f, "binary8"),
        }
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Field::Binary),
            "binary8" => Ok(Field::Binary8),
            _ => Err(format!("invalid field '{}': use binary or binary8", s)),
        }
    }
}

/// Layout of the coefficient header carried by every payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CodingScheme {
    /// The full coding vector (one byte per symbol) precedes the coded symbol.
    #[default]
    FullVector,
}

/// Parameters shared by every encoder and decoder of one generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeParams {
    pub scheme: CodingScheme,
    pub field: Field,
    /// Generation size: number of symbols coded together.
    pub symbols: usize,
    /// Size of one symbol in bytes.
    pub symbol_size: usize,
}

impl CodeParams {
    pub fn new(field: Field, symbols: usize, symbol_size: usize) -> Result<Self, CodecError> {
        if symbols == 0 {
            return Err(CodecError::ZeroSymbols);
        }
        if symbol_size == 0 {
            return Err(CodecError::ZeroSymbolSize);
        }
        Ok(Self {
            scheme: CodingScheme::FullVector,
            field,
            symbols,
            symbol_size,
        })
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.symbols * self.symbol_size
    }

    /// Coefficient header plus one coded symbol.
    #[inline]
    pub fn payload_size(&self) -> usize {
        match self.scheme {
            CodingScheme::FullVector => self.symbols + self.symbol_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn rejects_empty_generations() {
        assert!(matches!(
            CodeParams::new(Field::Binary8, 0, 100),
            Err(CodecError::ZeroSymbols)
        ));
        assert!(matches!(
            CodeParams::new(Field::Binary8, 10, 0),
            Err(CodecError::ZeroSymbolSize)
        ));
    }

    #[test]
    fn full_vector_sizes() {
        let params = CodeParams::new(Field::Binary8, 10, 100).unwrap();
        assert_eq!(params.block_size(), 1000);
        assert_eq!(params.payload_size(), 110);
    }

    #[test]
    fn binary_vectors_stay_in_subfield() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut coefficients = [0u8; 16];
        for _ in 0..50 {
            Field::Binary.random_vector(&mut rng, &mut coefficients);
            assert!(coefficients.iter().all(|&c| c <= 1));
            assert!(coefficients.iter().any(|&c| c == 1));
        }
    }

    #[test]
    fn field_from_str() {
        assert_eq!("binary".parse::<Field>().unwrap(), Field::Binary);
        assert_eq!("binary8".parse::<Field>().unwrap(), Field::Binary8);
        assert!("binary16".parse::<Field>().is_err());
    }
}
