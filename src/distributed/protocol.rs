//! Wire protocol between the server and client nodes
//!
//! Messages are plain text, one message per UDP datagram, with no framing,
//! length prefix or terminator. Commands are case-sensitive and matched either
//! exactly or by prefix:
//!
//! ```text
//! Client                          Server
//!   |                               |
//!   |------ RUN_TIMES:<n> --------->|
//!   |                               |  basic phase (server only)
//!   |<-------- BASIC_DONE ----------|
//!   |--------- BASIC_DONE --------->|
//!   |                               |  accelerated phase (both)
//!   |------ RESULT_SUM:<f> -------->|
//!   |------ RESULT_MAX:<f> -------->|
//!   |------ RESULTS_READY --------->|
//!   |                               |  merge, next round
//! ```
//!
//! Anything that does not parse as one of these is kept as free text, logged
//! by the receiver and otherwise ignored.
//!
//! Delivery is best effort: nothing is acknowledged or retransmitted.

use crate::config::validator::validate_round_count;
use anyhow::{Context, Result};
use std::fmt;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Largest datagram the listener accepts
pub const MAX_DATAGRAM: usize = 256;

pub const RUN_TIMES_PREFIX: &str = "RUN_TIMES:";
pub const BASIC_DONE: &str = "BASIC_DONE";
pub const RESULT_SUM_PREFIX: &str = "RESULT_SUM:";
pub const RESULT_MAX_PREFIX: &str = "RESULT_MAX:";
pub const RESULTS_READY: &str = "RESULTS_READY";

/// Protocol message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Round count chosen by the client operator (Client → Server)
    RunTimes(u32),

    /// Basic phase complete (Server → Client) or acknowledged (Client → Server)
    BasicDone,

    /// Client's partial sum for the accelerated phase (Client → Server)
    ResultSum(f32),

    /// Client's partial max for the accelerated phase (Client → Server)
    ResultMax(f32),

    /// All client results for the round have been sent (Client → Server)
    ResultsReady,

    /// Anything else
    Text(String),
}

impl Message {
    /// Wire representation
    pub fn encode(&self) -> String {
        match self {
            Message::RunTimes(rounds) => format!("{}{}", RUN_TIMES_PREFIX, rounds),
            Message::BasicDone => BASIC_DONE.to_string(),
            // Shortest round-trip form; also readable by C's atof
            Message::ResultSum(sum) => format!("{}{}", RESULT_SUM_PREFIX, sum),
            Message::ResultMax(max) => format!("{}{}", RESULT_MAX_PREFIX, max),
            Message::ResultsReady => RESULTS_READY.to_string(),
            Message::Text(text) => text.clone(),
        }
    }

    /// Parse one datagram
    ///
    /// Never fails: unknown commands and malformed payloads come back as
    /// [`Message::Text`].
    pub fn decode(datagram: &[u8]) -> Message {
        let text = String::from_utf8_lossy(datagram);

        if text == BASIC_DONE {
            return Message::BasicDone;
        }
        if text == RESULTS_READY {
            return Message::ResultsReady;
        }
        if let Some(payload) = text.strip_prefix(RUN_TIMES_PREFIX) {
            if let Ok(rounds) = payload.trim().parse::<u32>() {
                if validate_round_count(rounds).is_ok() {
                    return Message::RunTimes(rounds);
                }
            }
        } else if let Some(payload) = text.strip_prefix(RESULT_SUM_PREFIX) {
            if let Ok(sum) = payload.trim().parse::<f32>() {
                return Message::ResultSum(sum);
            }
        } else if let Some(payload) = text.strip_prefix(RESULT_MAX_PREFIX) {
            if let Ok(max) = payload.trim().parse::<f32>() {
                return Message::ResultMax(max);
            }
        }

        Message::Text(text.into_owned())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Send one message as one datagram
pub async fn send_message(socket: &UdpSocket, peer: SocketAddr, msg: &Message) -> Result<()> {
    let encoded = msg.encode();
    socket
        .send_to(encoded.as_bytes(), peer)
        .await
        .with_context(|| format!("Failed to send '{}' to {}", encoded, peer))?;

    log::debug!("Sent '{}' to {}", encoded, peer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_wire_literals() {
        assert_eq!(Message::RunTimes(3).encode(), "RUN_TIMES:3");
        assert_eq!(Message::BasicDone.encode(), "BASIC_DONE");
        assert_eq!(Message::ResultsReady.encode(), "RESULTS_READY");
        assert_eq!(Message::ResultSum(1.5).encode(), "RESULT_SUM:1.5");
        assert_eq!(Message::ResultMax(-2.25).encode(), "RESULT_MAX:-2.25");
    }

    #[test]
    fn test_decode_commands() {
        assert_eq!(Message::decode(b"RUN_TIMES:3"), Message::RunTimes(3));
        assert_eq!(Message::decode(b"BASIC_DONE"), Message::BasicDone);
        assert_eq!(Message::decode(b"RESULTS_READY"), Message::ResultsReady);
        assert_eq!(Message::decode(b"RESULT_SUM:123.456"), Message::ResultSum(123.456));
        assert_eq!(Message::decode(b"RESULT_MAX:9.010913"), Message::ResultMax(9.010913));
    }

    #[test]
    fn test_decode_c_style_floats() {
        // printf("%f") output from a C peer
        assert_eq!(Message::decode(b"RESULT_SUM:1234567.000000"), Message::ResultSum(1234567.0));
    }

    #[test]
    fn test_float_payloads_survive_the_wire() {
        for value in [0.1f32, 9.010913, 1.0e-7, 123456.79, f32::NEG_INFINITY] {
            let wire = Message::ResultMax(value).encode();
            assert_eq!(Message::decode(wire.as_bytes()), Message::ResultMax(value));
        }
    }

    #[test]
    fn test_exact_match_is_case_sensitive() {
        assert_eq!(Message::decode(b"basic_done"), Message::Text("basic_done".into()));
        assert_eq!(Message::decode(b"BASIC_DONE!"), Message::Text("BASIC_DONE!".into()));
        assert_eq!(Message::decode(b"RESULTS_READY "), Message::Text("RESULTS_READY ".into()));
    }

    #[test]
    fn test_malformed_payloads_are_text() {
        assert_eq!(Message::decode(b"RUN_TIMES:abc"), Message::Text("RUN_TIMES:abc".into()));
        assert_eq!(Message::decode(b"RUN_TIMES:0"), Message::Text("RUN_TIMES:0".into()));
        assert_eq!(Message::decode(b"RUN_TIMES:-4"), Message::Text("RUN_TIMES:-4".into()));
        assert_eq!(
            Message::decode(b"RUN_TIMES:4000000000"),
            Message::Text("RUN_TIMES:4000000000".into())
        );
        assert_eq!(Message::decode(b"RESULT_SUM:"), Message::Text("RESULT_SUM:".into()));
    }

    #[test]
    fn test_free_text() {
        assert_eq!(Message::decode(b"hello"), Message::Text("hello".into()));
        assert_eq!(Message::Text("hello".into()).to_string(), "hello");
    }
}
