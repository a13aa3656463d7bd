//! End-to-end scenarios driven by two `Session`s wired back to back over an
//! in-memory channel connection: reordering, pipelined sends under a
//! bounded window, and recovery from a corrupted packet.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use reliable_transport::{ChannelConnection, Config, Session};

fn wired_pair(window: u32, timer_ms: u64, timeout_ms: u64) -> (Session<ChannelConnection>, Session<ChannelConnection>) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
    let config = Config::new(window, timer_ms, timeout_ms).unwrap();

    let a = Session::new(ChannelConnection::new(a_to_b), config);
    let b = Session::new(ChannelConnection::new(b_to_a), config);
    (a, b)
}

/// Shuttles datagrams between two sessions until neither produces any more,
/// driving the back-and-forth an ACK/DATA exchange needs to settle.
fn pump(a: &mut Session<ChannelConnection>, b: &mut Session<ChannelConnection>, now: Instant) {
    loop {
        let mut moved = false;
        while let Some(bytes) = a.connection_mut().take_outbound() {
            b.on_packet(now, &bytes);
            moved = true;
        }
        while let Some(bytes) = b.connection_mut().take_outbound() {
            a.on_packet(now, &bytes);
            moved = true;
        }
        if !moved {
            break;
        }
    }
}

#[test]
fn s2_reordering_delivers_in_order() {
    let (mut a, mut b) = wired_pair(8, 10, 500);
    let now = Instant::now();

    // Send three DATA packets from a's sender directly, out of order, to
    // exercise b's reordering without relying on a's internal pacing.
    a.connection_mut().queue_input(b"p1p2p3");
    b.connection_mut().queue_input(b""); // b has nothing to say of its own
    a.on_readable(now); // window=8 is plenty: one packet holds all 6 bytes + EOF
    b.on_readable(now);

    let mut sent: Vec<Vec<u8>> = Vec::new();
    while let Some(bytes) = a.connection_mut().take_outbound() {
        sent.push(bytes);
    }
    assert_eq!(sent.len(), 2); // one DATA packet (all 6 bytes fit) + EOF

    // Deliver the EOF before the DATA to force b to buffer it.
    b.on_packet(now, &sent[1]);
    b.on_packet(now, &sent[0]);

    assert_eq!(b.connection().delivered, b"p1p2p3");
    pump(&mut a, &mut b, now);
    assert!(a.is_done());
    assert!(b.is_done());
}

#[test]
fn s2_reordering_across_three_packets() {
    // Force three separate DATA packets (window=1 serializes each send/ack
    // round) so reordering is exercised packet-by-packet like spec's S2.
    let (mut a, mut b) = wired_pair(1, 10, 500);
    let now = Instant::now();

    // ChannelConnection::read_input drains everything queued in one call, so
    // queue one chunk per on_readable call to force three separate packets.
    for chunk in [&b"p1"[..], &b"p2"[..], &b"p3"[..]] {
        a.connection_mut().input.extend(chunk.iter());
        a.on_readable(now);
        // Drain the ack round-trip so the window reopens for the next chunk.
        pump(&mut a, &mut b, now);
    }
    a.connection_mut().input_eof = true;
    a.on_readable(now);
    pump(&mut a, &mut b, now);

    assert_eq!(b.connection().delivered, b"p1p2p3");
}

#[test]
fn s5_window_3_pipelining_keeps_unacked_bounded() {
    let (mut a, mut b) = wired_pair(3, 10, 500);
    let now = Instant::now();

    // Queue and send one byte at a time without draining acks in between,
    // so packets pile up in flight instead of collapsing into one DATA
    // packet the way a single bulk read would.
    for byte in 0..10u8 {
        a.connection_mut().input.push_back(byte);
        a.on_readable(now);

        // At most `window` packets may be unacked at any time.
        let in_flight = a.connection().outbox.borrow().len();
        assert!(in_flight <= 3, "window=3 must cap in-flight packets, got {in_flight}");

        if in_flight == 3 {
            pump(&mut a, &mut b, now); // free up window space for the rest
        }
    }

    a.connection_mut().input_eof = true;
    a.on_readable(now);
    pump(&mut a, &mut b, now);

    assert_eq!(b.connection().delivered, (0..10u8).collect::<Vec<_>>());
}

#[test]
fn s6_corruption_is_dropped_then_recovered_by_retransmit() {
    let (mut a, mut b) = wired_pair(4, 10, 50);
    let t0 = Instant::now();

    a.connection_mut().queue_input(b"hi");
    a.on_readable(t0);

    let mut corrupted = a.connection_mut().take_outbound().unwrap();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01; // flip a payload bit; checksum now fails

    b.on_packet(t0, &corrupted);
    assert!(b.connection().delivered.is_empty());
    assert!(b.connection_mut().take_outbound().is_none()); // no ACK for a corrupt packet

    // After timeout, a retransmits the same (uncorrupted) packet.
    assert!(!a.on_tick(t0 + Duration::from_millis(100)));
    let resent = a.connection_mut().take_outbound().unwrap();
    b.on_packet(t0, &resent);

    assert_eq!(b.connection().delivered, b"hi");
}

#[test]
fn boundary_payload_sizes_1_and_500() {
    for size in [1usize, 500] {
        let (mut a, mut b) = wired_pair(4, 10, 500);
        let now = Instant::now();
        let payload = vec![0x42u8; size];
        a.connection_mut().queue_input(&payload);
        a.on_readable(now);
        pump(&mut a, &mut b, now);
        assert_eq!(b.connection().delivered, payload);
    }
}

#[test]
fn boundary_window_size_1() {
    let (mut a, mut b) = wired_pair(1, 10, 500);
    let now = Instant::now();
    a.connection_mut().queue_input(b"ok");
    b.connection_mut().queue_input(b""); // b has nothing to say of its own
    a.on_readable(now);
    b.on_readable(now);
    pump(&mut a, &mut b, now);
    assert_eq!(b.connection().delivered, b"ok");
    assert!(a.is_done());
    assert!(b.is_done());
}
