//! A minimal UDP-backed dispatcher: binds `SessionRegistry` to a real
//! `std::net::UdpSocket` and an echo-shaped application. Kept in the same
//! crate so the core is exercisable end to end without a standalone binary.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::{SocketAddr, UdpSocket};
use std::os::fd::AsRawFd;
use std::rc::Rc;
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags};

use crate::config::Config;
use crate::connection::{Connection, ReadOutcome};
use crate::error::Error;
use crate::packet::MAX_PACKET_LEN;
use crate::registry::SessionRegistry;
use crate::session::Session;

/// A `Connection` that echoes: every byte `write_output` delivers is queued
/// back up for `read_input`, and datagrams go out over a shared UDP socket
/// to a fixed peer. Good enough for the reference `echo-server`/
/// `echo-client` binaries and for smoke-testing the dispatcher end to end.
pub struct UdpEchoConnection {
    socket: Rc<UdpSocket>,
    peer: SocketAddr,
    echo: Rc<RefCell<VecDeque<u8>>>,
    local_eof: bool,
}

impl UdpEchoConnection {
    pub fn new(socket: Rc<UdpSocket>, peer: SocketAddr) -> Self {
        UdpEchoConnection {
            socket,
            peer,
            echo: Rc::new(RefCell::new(VecDeque::new())),
            local_eof: false,
        }
    }

    /// Schedules local input for `read_input` to hand out, e.g. bytes typed
    /// by an operator. `eof` marks that nothing more will ever be queued.
    pub fn feed_local_input(&mut self, data: &[u8], eof: bool) {
        self.echo.borrow_mut().extend(data.iter().copied());
        self.local_eof = self.local_eof || eof;
    }
}

impl Connection for UdpEchoConnection {
    fn send_packet(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.socket.send_to(bytes, self.peer)
    }

    fn read_input(&mut self, buf: &mut [u8]) -> std::io::Result<ReadOutcome> {
        let mut echo = self.echo.borrow_mut();
        if echo.is_empty() {
            return Ok(if self.local_eof {
                ReadOutcome::Eof
            } else {
                ReadOutcome::NoData
            });
        }
        let n = buf.len().min(echo.len());
        for slot in buf.iter_mut().take(n) {
            *slot = echo.pop_front().unwrap();
        }
        Ok(ReadOutcome::Data(n))
    }

    fn write_output(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.echo.borrow_mut().extend(buf.iter().copied());
        Ok(buf.len())
    }

    fn output_space(&self) -> usize {
        usize::MAX
    }

    fn destroy(&mut self) {}
}

/// Owns the socket and the registry, and runs the poll/tick loop. `register`
/// is how a caller (the dispatcher's own client, in the demo binaries)
/// creates sessions; the core itself never creates sessions.
pub struct UdpDispatcher {
    socket: Rc<UdpSocket>,
    registry: SessionRegistry<SocketAddr, UdpEchoConnection>,
    timer: Duration,
}

impl UdpDispatcher {
    pub fn bind(addr: SocketAddr, timer_ms: u64) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(UdpDispatcher {
            socket: Rc::new(socket),
            registry: SessionRegistry::new(),
            timer: Duration::from_millis(timer_ms),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn register(&mut self, peer: SocketAddr, config: Config) -> Result<(), Error> {
        let conn = UdpEchoConnection::new(self.socket.clone(), peer);
        self.registry.insert(peer, Session::new(conn, config))
    }

    pub fn feed_local_input(&mut self, peer: &SocketAddr, data: &[u8], eof: bool) {
        if let Some(session) = self.registry.get_mut(peer) {
            session.connection_mut().feed_local_input(data, eof);
            session.on_readable(Instant::now());
        }
    }

    /// Blocks until a datagram arrives or `timer` elapses, then routes the
    /// datagram (if any) and runs one registry-wide tick. Callers loop this.
    pub fn poll_once(&mut self) -> std::io::Result<()> {
        let mut pfd = [PollFd::new(self.socket.as_raw_fd(), PollFlags::POLLIN)];
        let timeout_ms = self.timer.as_millis().min(i32::MAX as u128) as i32;
        let ready = poll(&mut pfd, timeout_ms)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        if ready > 0 {
            let mut buf = [0u8; MAX_PACKET_LEN];
            if let Ok((n, peer)) = self.socket.recv_from(&mut buf) {
                let now = Instant::now();
                if let Some(session) = self.registry.get_mut(&peer) {
                    session.on_packet(now, &buf[..n]);
                } else {
                    log::trace!("datagram from unregistered peer {peer}, dropping");
                }
            }
        }

        self.registry.tick_all(Instant::now());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
