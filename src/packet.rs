//! Coded payload plus the one-byte origin tag of the node that emitted it.

/// Identifier a node stamps on every payload it sends.
pub type NodeId = u8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    /// Wrap `payload` and append `origin` as the trailing byte.
    pub fn tagged(mut payload: Vec<u8>, origin: NodeId) -> Self {
        payload.push(origin);
        Self { bytes: payload }
    }

    /// The coded payload without the origin tag.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    pub fn origin(&self) -> NodeId {
        self.bytes[self.bytes.len() - 1]
    }

    /// Length on the wire, tag included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_is_appended() {
        let packet = Packet::tagged(vec![1, 2, 3], 7);
        assert_eq!(packet.payload(), &[1, 2, 3]);
        assert_eq!(packet.origin(), 7);
        assert_eq!(packet.len(), 4);
    }

    #[test]
    fn test_empty_payload_keeps_tag() {
        let packet = Packet::tagged(Vec::new(), 2);
        assert!(packet.is_empty());
        assert_eq!(packet.origin(), 2);
    }
}
