//! The datagram I/O substrate the core consumes. Everything in here is an
//! external collaborator, not part of the protocol engine: a real
//! dispatcher wires a `Session` to a UDP socket and the process's stdio; a
//! test wires it to an in-memory channel.

use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::cell::RefCell;

use crate::packet::MAX_PAYLOAD_LEN;

/// Outcome of a single `read_input` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were copied into the caller's buffer.
    Data(usize),
    /// No data is available right now; try again later.
    NoData,
    /// Local input has reached end of stream.
    Eof,
}

/// The narrow interface `Sender`/`Receiver`/`Session` drive against. All
/// methods are non-blocking and must return immediately.
pub trait Connection {
    /// Transmit one datagram. Returns the byte count sent on success.
    fn send_packet(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Fill up to `buf.len()` bytes of application input.
    fn read_input(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;

    /// Write ordered bytes to the application's output. The core only calls
    /// this when `output_space() >= buf.len()`. Partial writes never happen
    /// from this side.
    fn write_output(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Bytes currently writable without blocking.
    fn output_space(&self) -> usize;

    /// Release the substrate. Called exactly once, by the termination FSM.
    fn destroy(&mut self);
}

/// A back-to-back in-process pair of connections sharing one input queue,
/// one datagram queue, and one output queue apiece. Enough to drive two
/// `Session`s against each other in tests without a real socket.
#[derive(Debug, Default)]
pub struct ChannelConnection {
    /// Bytes the application has queued to send; drained by `read_input`.
    pub input: VecDeque<u8>,
    /// `true` once all of `input` has been handed out and no more will come.
    pub input_eof: bool,
    /// Datagrams sent via `send_packet`, destined for the peer.
    pub outbox: Rc<RefCell<VecDeque<Vec<u8>>>>,
    /// Bytes delivered via `write_output`, in order.
    pub delivered: Vec<u8>,
    /// Simulated receiver backpressure; `usize::MAX` means unlimited.
    pub space: usize,
    pub destroyed: bool,
}

impl ChannelConnection {
    pub fn new(outbox: Rc<RefCell<VecDeque<Vec<u8>>>>) -> Self {
        ChannelConnection {
            input: VecDeque::new(),
            input_eof: false,
            outbox,
            delivered: Vec::new(),
            space: usize::MAX,
            destroyed: false,
        }
    }

    /// Queues application bytes followed by EOF, as if the app wrote `data`
    /// and then closed its write half.
    pub fn queue_input(&mut self, data: &[u8]) {
        self.input.extend(data.iter().copied());
        self.input_eof = true;
    }

    /// Pops the next datagram sent to the peer, if any.
    pub fn take_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbox.borrow_mut().pop_front()
    }
}

impl Connection for ChannelConnection {
    fn send_packet(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let len = bytes.len();
        self.outbox.borrow_mut().push_back(bytes.to_vec());
        Ok(len)
    }

    fn read_input(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if self.input.is_empty() {
            return Ok(if self.input_eof {
                ReadOutcome::Eof
            } else {
                ReadOutcome::NoData
            });
        }

        let n = buf.len().min(self.input.len()).min(MAX_PAYLOAD_LEN);
        for slot in buf.iter_mut().take(n) {
            *slot = self.input.pop_front().unwrap();
        }
        Ok(ReadOutcome::Data(n))
    }

    fn write_output(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.delivered.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn output_space(&self) -> usize {
        self.space
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }
}
