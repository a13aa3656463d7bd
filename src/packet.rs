//! Wire framing and the Internet checksum.
//!
//! Three logical packet kinds share one wire layout, distinguished solely by
//! `len`: ACK (8 bytes), EOF (12 bytes, no payload), DATA (13-512 bytes).
//! All multi-byte integers are network byte order.

use std::fmt;

/// Header length of an ACK packet: `cksum` + `len` + `ackno`.
pub const ACK_LEN: usize = 8;
/// Header length of an EOF packet: ACK header plus `seqno`.
pub const EOF_LEN: usize = 12;
/// Largest payload a DATA packet may carry.
pub const MAX_PAYLOAD_LEN: usize = 500;
/// Largest packet that may appear on the wire.
pub const MAX_PACKET_LEN: usize = EOF_LEN + MAX_PAYLOAD_LEN;

/// A decoded, owned packet. The payload is a length-tagged `Vec<u8>`, never a
/// fixed 500-byte array read past its actual length.
#[derive(Clone, PartialEq, Eq)]
pub enum Packet {
    Ack { ackno: u32 },
    Eof { ackno: u32, seqno: u32 },
    Data { ackno: u32, seqno: u32, payload: Vec<u8> },
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Ack { ackno } => f.debug_struct("Ack").field("ackno", ackno).finish(),
            Packet::Eof { ackno, seqno } => f
                .debug_struct("Eof")
                .field("ackno", ackno)
                .field("seqno", seqno)
                .finish(),
            Packet::Data {
                ackno,
                seqno,
                payload,
            } => f
                .debug_struct("Data")
                .field("ackno", ackno)
                .field("seqno", seqno)
                .field("len", &payload.len())
                .finish(),
        }
    }
}

impl Packet {
    pub fn ackno(&self) -> u32 {
        match *self {
            Packet::Ack { ackno } => ackno,
            Packet::Eof { ackno, .. } => ackno,
            Packet::Data { ackno, .. } => ackno,
        }
    }

    /// `None` for ACK, which carries no sequence number on the wire.
    pub fn seqno(&self) -> Option<u32> {
        match *self {
            Packet::Ack { .. } => None,
            Packet::Eof { seqno, .. } => Some(seqno),
            Packet::Data { seqno, .. } => Some(seqno),
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Packet::Data { payload, .. } => payload,
            _ => &[],
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Packet::Eof { .. })
    }

    /// Total wire length this packet will encode to.
    pub fn wire_len(&self) -> u16 {
        match self {
            Packet::Ack { .. } => ACK_LEN as u16,
            Packet::Eof { .. } => EOF_LEN as u16,
            Packet::Data { payload, .. } => (EOF_LEN + payload.len()) as u16,
        }
    }

    /// Produces a copy of `self` with `ackno` replaced. Used to refresh the
    /// cumulative ack carried on a packet about to be (re)transmitted.
    pub fn with_ackno(&self, ackno: u32) -> Packet {
        match self.clone() {
            Packet::Ack { .. } => Packet::Ack { ackno },
            Packet::Eof { seqno, .. } => Packet::Eof { ackno, seqno },
            Packet::Data { seqno, payload, .. } => Packet::Data {
                ackno,
                seqno,
                payload,
            },
        }
    }

    /// Serializes the packet: fields in network byte order, `cksum` computed
    /// over the whole packet with the checksum field logically zeroed.
    pub fn encode(&self) -> Vec<u8> {
        let len = self.wire_len();
        let mut buf = Vec::with_capacity(len as usize);

        buf.extend_from_slice(&0u16.to_be_bytes()); // cksum placeholder
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.ackno().to_be_bytes());
        if let Some(seqno) = self.seqno() {
            buf.extend_from_slice(&seqno.to_be_bytes());
        }
        buf.extend_from_slice(self.payload());

        debug_assert_eq!(buf.len(), len as usize);

        let cksum = internet_checksum(&buf);
        buf[0..2].copy_from_slice(&cksum.to_be_bytes());
        buf
    }

    /// Validates framing and checksum, then classifies the packet.
    ///
    /// Fails (`None`) when `bytes.len() < 8`, `> 512`, the encoded `len`
    /// field disagrees with the actual byte count, or the checksum (computed
    /// with `cksum` zeroed) doesn't match what was transmitted. No state is
    /// touched and nothing is logged here beyond a `trace!`; callers decide
    /// whether a drop is worth a `warn!`.
    pub fn decode_and_validate(bytes: &[u8]) -> Option<Packet> {
        let n = bytes.len();
        if n < ACK_LEN || n > MAX_PACKET_LEN {
            log::trace!("packet of {n} bytes outside [{ACK_LEN}, {MAX_PACKET_LEN}]");
            return None;
        }

        let wire_cksum = u16::from_be_bytes([bytes[0], bytes[1]]);
        let wire_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if wire_len != n {
            log::trace!("packet len field {wire_len} disagrees with received {n} bytes");
            return None;
        }

        let mut zeroed = bytes.to_vec();
        zeroed[0] = 0;
        zeroed[1] = 0;
        if internet_checksum(&zeroed) != wire_cksum {
            log::trace!("checksum mismatch on {n}-byte packet");
            return None;
        }

        let ackno = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        if n == ACK_LEN {
            return Some(Packet::Ack { ackno });
        }

        if n < EOF_LEN {
            log::trace!("packet of {n} bytes too short to carry a seqno");
            return None;
        }
        let seqno = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        if n == EOF_LEN {
            return Some(Packet::Eof { ackno, seqno });
        }

        Some(Packet::Data {
            ackno,
            seqno,
            payload: bytes[EOF_LEN..].to_vec(),
        })
    }
}

/// Internet checksum (RFC 1071): 16-bit one's-complement sum of 16-bit
/// words, carries folded back in, then one's-complemented. The caller is
/// responsible for presenting a view with the `cksum` field already zeroed.
pub fn internet_checksum(bytes: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = bytes.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let [last] = *chunks.remainder() {
        sum += (last as u32) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
