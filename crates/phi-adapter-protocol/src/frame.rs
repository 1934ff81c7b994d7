//! Binary frame header codec.
//!
//! Every message on the sidecar socket is a fixed header followed by a UTF-8
//! JSON payload:
//!
//! ```text
//! +-------+---------+------+-------+-------------+---------------+---------+
//! | magic | version | type | flags | payloadSize | correlationId | payload |
//! |  4 B  |  u16 LE |  u8  |  u8   |   u32 LE    |    u64 LE     |  N B    |
//! +-------+---------+------+-------+-------------+---------------+---------+
//! ```
//!
//! All integers are little-endian and the header is tightly packed, so the
//! wire header is exactly [`FRAME_HEADER_LEN`] bytes. Packing and unpacking
//! use explicit per-field reads and writes; no layout tricks.

use crate::types::CorrelationId;

/// Leading magic bytes of every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"PHIA";

/// The single supported protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Human-readable protocol label.
pub const PROTOCOL_LABEL: &str = "phicore.adapter.v1";

/// Size of the wire header in bytes.
pub const FRAME_HEADER_LEN: usize = 20;

/// Frame type discriminator carried in the header `type` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Hello = 1,
    Heartbeat = 2,
    Request = 3,
    Response = 4,
    Event = 5,
    Error = 6,
    Goodbye = 7,
}

impl MessageType {
    /// Maps a raw header byte back to a message type.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Hello),
            2 => Some(Self::Heartbeat),
            3 => Some(Self::Request),
            4 => Some(Self::Response),
            5 => Some(Self::Event),
            6 => Some(Self::Error),
            7 => Some(Self::Goodbye),
            _ => None,
        }
    }
}

/// Fixed-layout frame header.
///
/// `message_type` is kept as the raw wire byte; use [`FrameHeader::kind`] for
/// the typed view. Senders must not trust `payload_size` from callers: the
/// transport rewrites it from the actual payload span before transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub message_type: u8,
    pub flags: u8,
    pub payload_size: u32,
    pub correlation_id: CorrelationId,
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self {
            magic: FRAME_MAGIC,
            version: PROTOCOL_VERSION,
            message_type: MessageType::Event as u8,
            flags: 0,
            payload_size: 0,
            correlation_id: 0,
        }
    }
}

impl FrameHeader {
    /// Builds a header for an outbound frame. `payload_size` stays zero; the
    /// transport fills it in from the payload it is handed.
    pub fn new(kind: MessageType, correlation_id: CorrelationId) -> Self {
        Self {
            message_type: kind as u8,
            correlation_id,
            ..Self::default()
        }
    }

    /// Typed view of the raw `message_type` byte.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::from_u8(self.message_type)
    }

    /// True when magic and version match the supported protocol.
    pub fn is_valid(&self) -> bool {
        self.magic == FRAME_MAGIC && self.version == PROTOCOL_VERSION
    }

    /// Serializes the header into its wire form.
    pub fn pack(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut out = [0u8; FRAME_HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic);
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6] = self.message_type;
        out[7] = self.flags;
        out[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        out[12..20].copy_from_slice(&self.correlation_id.to_le_bytes());
        out
    }

    /// Reads a header back from its wire form without validating it; callers
    /// check [`FrameHeader::is_valid`] before trusting the rest.
    pub fn unpack(bytes: &[u8; FRAME_HEADER_LEN]) -> Self {
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: u16::from_le_bytes([bytes[4], bytes[5]]),
            message_type: bytes[6],
            flags: bytes[7],
            payload_size: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            correlation_id: u64::from_le_bytes([
                bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18],
                bytes[19],
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_header_is_valid() {
        let header = FrameHeader::default();
        assert!(header.is_valid());
        assert_eq!(header.kind(), Some(MessageType::Event));
        assert_eq!(header.payload_size, 0);
        assert_eq!(header.correlation_id, 0);
    }

    #[test]
    fn pack_unpack_roundtrip_every_message_type() {
        for kind in [
            MessageType::Hello,
            MessageType::Heartbeat,
            MessageType::Request,
            MessageType::Response,
            MessageType::Event,
            MessageType::Error,
            MessageType::Goodbye,
        ] {
            let mut header = FrameHeader::new(kind, 0xDEAD_BEEF_0042_1234);
            header.payload_size = 4096;
            let bytes = header.pack();
            assert_eq!(bytes.len(), FRAME_HEADER_LEN);
            let back = FrameHeader::unpack(&bytes);
            assert_eq!(back, header);
            assert_eq!(back.kind(), Some(kind));
        }
    }

    #[test]
    fn unpack_then_pack_preserves_bytes() {
        // Header round-trip over raw bytes, including unknown type values.
        let mut bytes = [0u8; FRAME_HEADER_LEN];
        bytes[0..4].copy_from_slice(b"PHIA");
        bytes[4] = 1;
        bytes[6] = 42; // unknown message type survives the round-trip
        bytes[8..12].copy_from_slice(&7u32.to_le_bytes());
        bytes[12..20].copy_from_slice(&99u64.to_le_bytes());

        let header = FrameHeader::unpack(&bytes);
        assert_eq!(header.pack(), bytes);
        assert_eq!(header.kind(), None);
        assert_eq!(header.payload_size, 7);
        assert_eq!(header.correlation_id, 99);
    }

    #[test]
    fn wire_layout_is_little_endian() {
        let mut header = FrameHeader::new(MessageType::Request, 0x0102_0304_0506_0708);
        header.payload_size = 0x0A0B_0C0D;
        let bytes = header.pack();

        assert_eq!(&bytes[0..4], b"PHIA");
        assert_eq!(bytes[4..6], [0x01, 0x00]);
        assert_eq!(bytes[6], MessageType::Request as u8);
        assert_eq!(bytes[7], 0);
        assert_eq!(bytes[8..12], [0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(
            bytes[12..20],
            [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn bad_magic_is_invalid() {
        let mut header = FrameHeader::default();
        header.magic = *b"XXXX";
        assert!(!header.is_valid());
    }

    #[test]
    fn unsupported_version_is_invalid() {
        let mut header = FrameHeader::default();
        header.version = 2;
        assert!(!header.is_valid());
    }

    #[test]
    fn message_type_from_u8_rejects_out_of_range() {
        assert_eq!(MessageType::from_u8(0), None);
        assert_eq!(MessageType::from_u8(8), None);
        assert_eq!(MessageType::from_u8(255), None);
    }
}
