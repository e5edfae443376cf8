//! The codec seam.
//!
//! Nodes only see these traits; [`rlnc`] provides the implementation the
//! simulator uses. An encoder codes from a constant block, a decoder absorbs
//! payloads and can recode what it holds.

pub use rlnc::{CodeParams, CodecError, CodingScheme, Field};

pub trait Coder: Send + 'static {
    fn block_size(&self) -> usize;
    fn symbol_size(&self) -> usize;
    fn payload_size(&self) -> usize;
    fn rank(&self) -> usize;
    /// Write one coded payload, returning the bytes written.
    fn write_payload(&mut self, out: &mut [u8]) -> Result<usize, CodecError>;
    /// The coder's block storage: source data for an encoder, decoded data
    /// (once complete) for a decoder.
    fn block(&self) -> &[u8];
}

pub trait SymbolEncoder: Coder {
    fn set_const_symbols(&mut self, data: &[u8]) -> Result<(), CodecError>;
}

pub trait SymbolDecoder: Coder {
    fn read_payload(&mut self, payload: &[u8]) -> Result<(), CodecError>;
    fn is_complete(&self) -> bool;
}

/// Builds codec instances; the role is fixed by the factory type.
pub trait CodecFactory: Send + Sync {
    type Codec;

    fn build(&self) -> Self::Codec;
}

impl Coder for rlnc::Encoder {
    fn block_size(&self) -> usize {
        rlnc::Encoder::block_size(self)
    }

    fn symbol_size(&self) -> usize {
        rlnc::Encoder::symbol_size(self)
    }

    fn payload_size(&self) -> usize {
        rlnc::Encoder::payload_size(self)
    }

    fn rank(&self) -> usize {
        rlnc::Encoder::rank(self)
    }

    fn write_payload(&mut self, out: &mut [u8]) -> Result<usize, CodecError> {
        rlnc::Encoder::write_payload(self, out)
    }

    fn block(&self) -> &[u8] {
        rlnc::Encoder::block(self)
    }
}

impl SymbolEncoder for rlnc::Encoder {
    fn set_const_symbols(&mut self, data: &[u8]) -> Result<(), CodecError> {
        rlnc::Encoder::set_const_symbols(self, data)
    }
}

impl Coder for rlnc::Decoder {
    fn block_size(&self) -> usize {
        rlnc::Decoder::block_size(self)
    }

    fn symbol_size(&self) -> usize {
        rlnc::Decoder::symbol_size(self)
    }

    fn payload_size(&self) -> usize {
        rlnc::Decoder::payload_size(self)
    }

    fn rank(&self) -> usize {
        rlnc::Decoder::rank(self)
    }

    fn write_payload(&mut self, out: &mut [u8]) -> Result<usize, CodecError> {
        rlnc::Decoder::write_payload(self, out)
    }

    fn block(&self) -> &[u8] {
        rlnc::Decoder::block(self)
    }
}

impl SymbolDecoder for rlnc::Decoder {
    fn read_payload(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        rlnc::Decoder::read_payload(self, payload).map(|_| ())
    }

    fn is_complete(&self) -> bool {
        rlnc::Decoder::is_complete(self)
    }
}

impl CodecFactory for rlnc::EncoderFactory {
    type Codec = rlnc::Encoder;

    fn build(&self) -> rlnc::Encoder {
        rlnc::EncoderFactory::build(self)
    }
}

impl CodecFactory for rlnc::DecoderFactory {
    type Codec = rlnc::Decoder;

    fn build(&self) -> rlnc::Decoder {
        rlnc::DecoderFactory::build(self)
    }
}

/// The codec a node currently owns.
pub(crate) enum NodeCodec {
    Encoder(Box<dyn SymbolEncoder>),
    Decoder(Box<dyn SymbolDecoder>),
}

impl NodeCodec {
    pub(crate) fn payload_size(&self) -> usize {
        match self {
            NodeCodec::Encoder(c) => c.payload_size(),
            NodeCodec::Decoder(c) => c.payload_size(),
        }
    }

    pub(crate) fn block_size(&self) -> usize {
        match self {
            NodeCodec::Encoder(c) => c.block_size(),
            NodeCodec::Decoder(c) => c.block_size(),
        }
    }

    pub(crate) fn rank(&self) -> usize {
        match self {
            NodeCodec::Encoder(c) => c.rank(),
            NodeCodec::Decoder(c) => c.rank(),
        }
    }

    pub(crate) fn write_payload(&mut self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            NodeCodec::Encoder(c) => c.write_payload(out),
            NodeCodec::Decoder(c) => c.write_payload(out),
        }
    }

    pub(crate) fn block(&self) -> &[u8] {
        match self {
            NodeCodec::Encoder(c) => c.block(),
            NodeCodec::Decoder(c) => c.block(),
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        match self {
            NodeCodec::Encoder(_) => false,
            NodeCodec::Decoder(c) => c.is_complete(),
        }
    }
}

/// Generation parameters to both factories at once.
pub fn factories(params: CodeParams) -> (rlnc::EncoderFactory, rlnc::DecoderFactory) {
    (
        rlnc::EncoderFactory::new(params),
        rlnc::DecoderFactory::new(params),
    )
}
