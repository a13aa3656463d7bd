//! The per-peer-pair session: owns the sender, the receiver, and the
//! termination FSM, and is the only thing the registry/dispatcher talks to.

use std::time::Instant;

use crate::config::Config;
use crate::connection::Connection;
use crate::packet::Packet;
use crate::receiver::Receiver;
use crate::sender::Sender;

pub struct Session<C: Connection> {
    connection: C,
    sender: Sender,
    receiver: Receiver,
    timeout_ms: u64,
}

impl<C: Connection> Session<C> {
    pub fn new(connection: C, config: Config) -> Self {
        Session {
            connection,
            sender: Sender::new(config.window),
            receiver: Receiver::new(config.window),
            timeout_ms: config.timeout_ms,
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// `Sender::all_sent_acked` already folds in `read_eof`;
    /// `Receiver::all_output_written` already folds in `recv_eof`.
    pub fn is_done(&self) -> bool {
        self.sender.all_sent_acked() && self.receiver.all_output_written()
    }

    /// Application input became readable (or is worth polling again because
    /// the window may have opened up).
    pub fn on_readable(&mut self, now: Instant) {
        let ackno = self.receiver.send_ackno();
        self.sender.on_readable(&mut self.connection, now, ackno);
    }

    /// A datagram arrived from the peer.
    pub fn on_packet(&mut self, now: Instant, bytes: &[u8]) {
        let Some(pkt) = Packet::decode_and_validate(bytes) else {
            log::warn!(
                "dropping corrupt or malformed packet ({} bytes received)",
                bytes.len()
            );
            return;
        };

        match pkt {
            Packet::Ack { ackno } => {
                if self.sender.on_ack(ackno) {
                    self.on_readable(now);
                }
            }
            Packet::Eof { .. } | Packet::Data { .. } => {
                if self.receiver.on_data_or_eof(pkt) {
                    self.send_ack();
                }
                self.try_deliver();
            }
        }
    }

    fn send_ack(&mut self) {
        let bytes = Packet::Ack {
            ackno: self.receiver.send_ackno(),
        }
        .encode();
        if let Err(e) = self.connection.send_packet(&bytes) {
            log::warn!("failed to send ACK: {e}");
        }
    }

    fn try_deliver(&mut self) {
        self.receiver.try_deliver(&mut self.connection);
    }

    /// Driven every `timer_ms` by the dispatcher. Retries delivery (output
    /// space may have drained since the last tick), resends expired unacked
    /// packets, and reports whether the session has fully terminated and
    /// should be torn down.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        self.try_deliver();

        let ackno = self.receiver.send_ackno();
        self.sender
            .retransmit_expired(&mut self.connection, now, self.timeout_ms, ackno);

        if self.is_done() {
            log::info!("session fully drained, tearing down");
            self.connection.destroy();
            true
        } else {
            false
        }
    }
}
