use std::env;
use std::io::{self, Read};
use std::net::SocketAddr;

use reliable_transport::config::Config;
use reliable_transport::dispatcher::UdpDispatcher;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let local: SocketAddr = env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:0".to_string())
        .parse()
        .expect("invalid local address");
    let peer: SocketAddr = env::args()
        .nth(2)
        .expect("usage: client <local addr> <peer addr>")
        .parse()
        .expect("invalid peer address");

    let mut dispatcher = UdpDispatcher::bind(local, 100)?;
    let config = Config::new(16, 100, 500).expect("valid config");
    dispatcher.register(peer, config).expect("register session");

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    dispatcher.feed_local_input(&peer, &input, true);

    println!(">>> sending {} bytes to {peer}", input.len());

    while !dispatcher.is_empty() {
        dispatcher.poll_once()?;
    }

    println!(">>> session closed");
    Ok(())
}
