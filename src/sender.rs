//! Sliding-window sender. Chunks application bytes into DATA packets,
//! tracks what's in flight, and generates the session's single EOF packet
//! once local input drains.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::connection::{Connection, ReadOutcome};
use crate::packet::{Packet, MAX_PAYLOAD_LEN};
use crate::seq::seq_lt;

struct InFlight {
    packet: Packet,
    last_retransmit: Instant,
}

/// Owns `send_window_base`, `next_send_seqno`, and `send_buffer`.
pub struct Sender {
    window_size: u32,
    send_window_base: u32,
    next_send_seqno: u32,
    send_buffer: BTreeMap<u32, InFlight>,
    read_eof: bool,
    eof_sent_seqno: Option<u32>,
}

impl Sender {
    pub fn new(window_size: u32) -> Self {
        Sender {
            window_size,
            send_window_base: 1,
            next_send_seqno: 1,
            send_buffer: BTreeMap::new(),
            read_eof: false,
            eof_sent_seqno: None,
        }
    }

    pub fn read_eof(&self) -> bool {
        self.read_eof
    }

    /// Our EOF has been generated and every outbound packet, including it,
    /// has been acknowledged.
    pub fn all_sent_acked(&self) -> bool {
        self.read_eof && self.send_buffer.is_empty()
    }

    fn window_has_room(&self) -> bool {
        self.next_send_seqno.wrapping_sub(self.send_window_base) < self.window_size
    }

    fn transmit_new<C: Connection>(&mut self, conn: &mut C, packet: Packet, now: Instant) {
        let seqno = packet.seqno().expect("DATA/EOF carries a seqno");
        let bytes = packet.encode();
        if let Err(e) = conn.send_packet(&bytes) {
            log::warn!("send_packet failed for seqno {seqno}: {e}; will retry from the timer");
        }
        self.send_buffer.insert(
            seqno,
            InFlight {
                packet,
                last_retransmit: now,
            },
        );
        self.next_send_seqno = self.next_send_seqno.wrapping_add(1);
    }

    /// Drains as much of the application's input as the window allows,
    /// packetizing it into DATA packets and, on EOF, a trailing EOF packet.
    /// `send_ackno` is the cumulative ack to stamp on outgoing packets.
    pub fn on_readable<C: Connection>(&mut self, conn: &mut C, now: Instant, send_ackno: u32) {
        while self.window_has_room() && !self.read_eof {
            let mut buf = [0u8; MAX_PAYLOAD_LEN];
            let outcome = match conn.read_input(&mut buf) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("read_input failed: {e}");
                    break;
                }
            };

            match outcome {
                ReadOutcome::Data(0) | ReadOutcome::NoData => break,
                ReadOutcome::Data(n) => {
                    let seqno = self.next_send_seqno;
                    let packet = Packet::Data {
                        ackno: send_ackno,
                        seqno,
                        payload: buf[..n].to_vec(),
                    };
                    self.transmit_new(conn, packet, now);
                }
                ReadOutcome::Eof => {
                    self.read_eof = true;
                    let seqno = self.next_send_seqno;
                    let packet = Packet::Eof {
                        ackno: send_ackno,
                        seqno,
                    };
                    self.transmit_new(conn, packet, now);
                    self.eof_sent_seqno = Some(seqno);
                }
            }
        }
    }

    /// Evicts everything acknowledged and advances the window base. Returns
    /// `true` if an eviction actually happened, so the caller knows it's
    /// worth re-invoking `on_readable` (the window may have opened up).
    pub fn on_ack(&mut self, ackno: u32) -> bool {
        let before = self.send_buffer.len();
        self.send_buffer.retain(|&seqno, _| !seq_lt(seqno, ackno));
        if seq_lt(self.send_window_base, ackno) {
            self.send_window_base = ackno;
        }
        self.send_buffer.len() != before
    }

    /// Rescans unacked packets and resends every one that's expired.
    pub fn retransmit_expired<C: Connection>(
        &mut self,
        conn: &mut C,
        now: Instant,
        timeout_ms: u64,
        send_ackno: u32,
    ) {
        for entry in self.send_buffer.values_mut() {
            if now.duration_since(entry.last_retransmit).as_millis() as u64 <= timeout_ms {
                continue;
            }

            entry.packet = entry.packet.with_ackno(send_ackno);
            let bytes = entry.packet.encode();
            if let Err(e) = conn.send_packet(&bytes) {
                log::warn!("retransmit failed: {e}; will retry next tick");
            }
            entry.last_retransmit = now;
        }
    }
}
