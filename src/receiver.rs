//! Reordering receiver. Deduplicates, buffers out-of-order DATA/EOF
//! packets, and delivers a contiguous prefix to the application as soon as
//! the output buffer has room. The receive window is fixed; there is no
//! shrink/grow flow control here.

use std::collections::BTreeMap;

use crate::connection::Connection;
use crate::packet::Packet;
use crate::seq::{seq_ge, seq_lt};

/// Owns `recv_next_expected`, `recv_buffer`, `send_ackno`, and `recv_eof`.
pub struct Receiver {
    window_size: u32,
    recv_next_expected: u32,
    recv_buffer: BTreeMap<u32, Packet>,
    send_ackno: u32,
    recv_eof: bool,
}

impl Receiver {
    pub fn new(window_size: u32) -> Self {
        Receiver {
            window_size,
            recv_next_expected: 1,
            recv_buffer: BTreeMap::new(),
            send_ackno: 1,
            recv_eof: false,
        }
    }

    pub fn send_ackno(&self) -> u32 {
        self.send_ackno
    }

    pub fn recv_eof(&self) -> bool {
        self.recv_eof
    }

    /// Nothing left buffered and the peer's EOF has already been delivered.
    pub fn all_output_written(&self) -> bool {
        self.recv_buffer.is_empty() && self.recv_eof
    }

    /// Handles one DATA or EOF packet already classified by framing.
    /// Returns `true` if the caller owes the peer a cumulative ACK. Every
    /// case does except a silently-dropped out-of-window packet; duplicates
    /// re-ack so a lost prior ACK can be recovered.
    pub fn on_data_or_eof(&mut self, pkt: Packet) -> bool {
        let seqno = pkt.seqno().expect("DATA/EOF carries a seqno");

        if seq_lt(seqno, self.recv_next_expected) {
            log::trace!("duplicate seqno {seqno}, already delivered; re-acking");
            return true;
        }

        if seq_ge(seqno, self.recv_next_expected.wrapping_add(self.window_size)) {
            log::trace!("seqno {seqno} outside receive window, dropping");
            return false;
        }

        if self.recv_buffer.contains_key(&seqno) {
            log::trace!("duplicate seqno {seqno}, already buffered; re-acking");
            return true;
        }

        self.recv_buffer.insert(seqno, pkt);
        self.recompute_send_ackno();
        true
    }

    /// Walks the contiguous prefix starting at `recv_next_expected` and sets
    /// `send_ackno` to the first gap (or past the whole buffer if it's all
    /// contiguous). `contains_key` probing rather than sorted iteration
    /// keeps this correct even when the buffer straddles the u32 wraparound
    /// boundary, where raw numeric key order would lie about adjacency.
    fn recompute_send_ackno(&mut self) {
        let mut expected = self.recv_next_expected;
        while self.recv_buffer.contains_key(&expected) {
            expected = expected.wrapping_add(1);
        }
        self.send_ackno = expected;
    }

    /// Delivers as much of the contiguous prefix as the output side can
    /// currently accept. Stops on a seqno gap, an empty buffer, or
    /// insufficient `output_space`. Never a partial write.
    pub fn try_deliver<C: Connection>(&mut self, conn: &mut C) {
        loop {
            let Some(pkt) = self.recv_buffer.get(&self.recv_next_expected) else {
                break;
            };

            let payload = pkt.payload();
            if conn.output_space() < payload.len() {
                break;
            }

            let is_eof = pkt.is_eof();
            if !payload.is_empty() {
                if let Err(e) = conn.write_output(payload) {
                    log::warn!("write_output failed: {e}; leaving packet buffered");
                    break;
                }
            }

            self.recv_buffer.remove(&self.recv_next_expected);
            self.recv_next_expected = self.recv_next_expected.wrapping_add(1);
            if is_eof {
                self.recv_eof = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ChannelConnection;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn conn() -> ChannelConnection {
        ChannelConnection::new(Rc::new(RefCell::new(VecDeque::new())))
    }

    fn data(seqno: u32, payload: &[u8]) -> Packet {
        Packet::Data {
            ackno: 0,
            seqno,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn in_order_delivery() {
        let mut r = Receiver::new(4);
        let mut c = conn();

        r.on_data_or_eof(data(1, b"hi"));
        assert_eq!(r.send_ackno(), 2);
        r.try_deliver(&mut c);
        assert_eq!(c.delivered, b"hi");
    }

    #[test]
    fn reordering_buffers_then_delivers_in_order() {
        let mut r = Receiver::new(4);
        let mut c = conn();

        r.on_data_or_eof(data(3, b"p3"));
        assert_eq!(r.send_ackno(), 1); // gap at 1: ack stays put
        r.on_data_or_eof(data(1, b"p1"));
        assert_eq!(r.send_ackno(), 2); // 1 delivered-eligible, 2 and 3 still gapped/contig check
        r.on_data_or_eof(data(2, b"p2"));
        assert_eq!(r.send_ackno(), 4); // now 1,2,3 contiguous

        r.try_deliver(&mut c);
        assert_eq!(c.delivered, b"p1p2p3");
    }

    #[test]
    fn duplicate_data_delivers_once() {
        let mut r = Receiver::new(4);
        let mut c = conn();

        r.on_data_or_eof(data(1, b"hi"));
        r.try_deliver(&mut c);
        r.on_data_or_eof(data(1, b"hi")); // spurious duplicate, already delivered
        r.try_deliver(&mut c);

        assert_eq!(c.delivered, b"hi");
    }

    #[test]
    fn out_of_window_packet_is_dropped() {
        let mut r = Receiver::new(2);
        let before = r.send_ackno();
        r.on_data_or_eof(data(10, b"late"));
        assert_eq!(r.send_ackno(), before);
    }

    #[test]
    fn partial_write_is_never_attempted() {
        let mut r = Receiver::new(4);
        let mut c = conn();
        c.space = 1; // smaller than the 2-byte payload below

        r.on_data_or_eof(data(1, b"hi"));
        r.try_deliver(&mut c);
        assert!(c.delivered.is_empty());

        c.space = 2;
        r.try_deliver(&mut c);
        assert_eq!(c.delivered, b"hi");
    }

    #[test]
    fn eof_is_delivered_and_consumes_a_seqno_slot() {
        let mut r = Receiver::new(4);
        let mut c = conn();

        r.on_data_or_eof(data(1, b"hi"));
        r.on_data_or_eof(Packet::Eof { ackno: 0, seqno: 2 });
        r.try_deliver(&mut c);

        assert_eq!(c.delivered, b"hi");
        assert!(r.recv_eof());
        assert!(r.all_output_written());
    }
}
