//! Per-session configuration, consumed at session creation. Parsing it from
//! a CLI or config file is a dispatcher concern and lives outside this
//! crate; this module only validates the values once they arrive.

use crate::Error;

/// `window`, `timer`, and `timeout` for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Send/receive window size, in packets.
    pub window: u32,
    /// Tick period, in milliseconds.
    pub timer_ms: u64,
    /// Retransmission timeout, in milliseconds.
    pub timeout_ms: u64,
}

impl Config {
    pub fn new(window: u32, timer_ms: u64, timeout_ms: u64) -> Result<Config, Error> {
        if window == 0 {
            return Err(Error::InvalidConfig("window must be positive"));
        }
        if timer_ms == 0 {
            return Err(Error::InvalidConfig("timer must be positive"));
        }
        if timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeout must be positive"));
        }
        if timeout_ms <= timer_ms {
            log::warn!(
                "timeout_ms ({timeout_ms}) should exceed timer_ms ({timer_ms}); a tick-driven \
                 retransmission scan can't observe expiry finer than the tick period"
            );
        }

        Ok(Config {
            window,
            timer_ms,
            timeout_ms,
        })
    }
}
