//! Shared state between the datagram listener and the round loop
//!
//! The listener task is the only writer: it decodes every datagram and folds
//! it into [`MailboxState`]. The round loop only reads, blocking in
//! [`Mailbox::wait_for`] until a predicate over the state holds.
//!
//! Phase signals are counters rather than flags. Before sending the message
//! that triggers the peer's next signal, the round loop takes a [`Baseline`]
//! of the counters and then waits for a count above it. A signal that arrives
//! before the wait starts cannot be lost, and duplicates delivered before the
//! baseline is taken are absorbed by it.

use super::protocol::{Message, MAX_DATAGRAM};
use crate::stats::ScalarResults;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Errors from waiting on the peer
#[derive(Debug, Error)]
pub enum WaitError {
    /// No matching datagram arrived before the deadline
    #[error("timed out after {after:?} waiting for {what}")]
    TimedOut { what: &'static str, after: Duration },

    /// The mailbox was dropped while waiting
    #[error("mailbox closed while waiting for {what}")]
    Closed { what: &'static str },
}

/// Everything the listener has learned from the peer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailboxState {
    /// Round count sent by the client
    pub round_count: Option<u32>,
    /// Address of the first peer that sent us a datagram
    pub peer_addr: Option<SocketAddr>,
    /// Number of `BASIC_DONE` signals received
    pub basic_done: u64,
    /// Number of `RESULTS_READY` signals received
    pub results_ready: u64,
    /// Number of `RESULT_SUM` values received
    pub sum_updates: u64,
    /// Number of `RESULT_MAX` values received
    pub max_updates: u64,
    /// Latest peer sum
    pub peer_sum: f32,
    /// Latest peer max
    pub peer_max: f32,
}

impl MailboxState {
    /// Round count and the address to answer, once both are known
    pub fn session(&self) -> Option<(u32, SocketAddr)> {
        self.round_count.zip(self.peer_addr)
    }

    /// Counters as consumed so far
    pub fn baseline(&self) -> Baseline {
        Baseline {
            basic_done: self.basic_done,
            results_ready: self.results_ready,
            sum_updates: self.sum_updates,
            max_updates: self.max_updates,
        }
    }

    /// Whether a `BASIC_DONE` arrived after `baseline` was taken
    pub fn basic_done_since(&self, baseline: &Baseline) -> bool {
        self.basic_done > baseline.basic_done
    }

    /// Peer results, once the ready signal and both values arrived after `baseline`
    pub fn results_since(&self, baseline: &Baseline) -> Option<ScalarResults> {
        (self.results_ready > baseline.results_ready
            && self.sum_updates > baseline.sum_updates
            && self.max_updates > baseline.max_updates)
            .then_some(ScalarResults {
                sum: self.peer_sum,
                max: self.peer_max,
            })
    }

    fn apply(&mut self, message: &Message) {
        match *message {
            Message::RunTimes(rounds) => self.round_count = Some(rounds),
            Message::BasicDone => self.basic_done += 1,
            Message::ResultSum(sum) => {
                self.peer_sum = sum;
                self.sum_updates += 1;
            }
            Message::ResultMax(max) => {
                self.peer_max = max;
                self.max_updates += 1;
            }
            Message::ResultsReady => self.results_ready += 1,
            Message::Text(_) => {}
        }
    }
}

/// Signal counts the round loop has already accounted for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baseline {
    basic_done: u64,
    results_ready: u64,
    sum_updates: u64,
    max_updates: u64,
}

/// Synchronized mailbox owned by a coordinator
#[derive(Debug)]
pub struct Mailbox {
    state: watch::Sender<MailboxState>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub fn new() -> Self {
        let (state, _) = watch::channel(MailboxState::default());
        Self { state }
    }

    /// Fold one received message into the state
    pub fn deliver(&self, message: &Message, from: SocketAddr) {
        self.state.send_modify(|state| {
            if state.peer_addr.is_none() {
                log::info!("Learned peer address {}", from);
                state.peer_addr = Some(from);
            }
            state.apply(message);
        });
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> MailboxState {
        self.state.borrow().clone()
    }

    /// Block until `select` returns `Some`, optionally bounded by `deadline`
    ///
    /// `what` names the awaited event in timeout errors.
    pub async fn wait_for<T, F>(
        &self,
        what: &'static str,
        deadline: Option<Duration>,
        mut select: F,
    ) -> Result<T, WaitError>
    where
        F: FnMut(&MailboxState) -> Option<T>,
    {
        let mut rx = self.state.subscribe();
        let mut found = None;

        {
            let wait = rx.wait_for(|state| {
                found = select(state);
                found.is_some()
            });

            let outcome = match deadline {
                Some(after) => tokio::time::timeout(after, wait)
                    .await
                    .map_err(|_| WaitError::TimedOut { what, after })?,
                None => wait.await,
            };
            outcome.map_err(|_| WaitError::Closed { what })?;
        }

        found.ok_or(WaitError::Closed { what })
    }
}

/// Spawn the background receive loop
///
/// The task runs until aborted through the returned handle.
pub fn spawn_listener(socket: Arc<UdpSocket>, mailbox: Arc<Mailbox>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    let message = Message::decode(&buf[..len]);
                    match message {
                        Message::Text(ref text) => log::info!("[Peer {}]: {}", from, text),
                        ref known => log::debug!("Received '{}' from {}", known, from),
                    }
                    mailbox.deliver(&message, from);
                }
                Err(e) => {
                    log::warn!("Failed to receive datagram: {}", e);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    #[test]
    fn test_first_peer_address_is_kept() {
        let mailbox = Mailbox::new();
        let other: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        mailbox.deliver(&Message::Text("hi".into()), addr());
        mailbox.deliver(&Message::BasicDone, other);

        assert_eq!(mailbox.snapshot().peer_addr, Some(addr()));
    }

    #[test]
    fn test_text_changes_nothing_but_peer() {
        let mailbox = Mailbox::new();
        mailbox.deliver(&Message::Text("RUN_TIMES:abc".into()), addr());

        let state = mailbox.snapshot();
        assert_eq!(state.round_count, None);
        assert_eq!(
            MailboxState {
                peer_addr: None,
                ..state
            },
            MailboxState::default()
        );
    }

    #[test]
    fn test_results_need_all_three_messages() {
        let mailbox = Mailbox::new();
        let baseline = mailbox.snapshot().baseline();
        mailbox.deliver(&Message::ResultsReady, addr());
        mailbox.deliver(&Message::ResultSum(10.0), addr());
        assert_eq!(mailbox.snapshot().results_since(&baseline), None);

        mailbox.deliver(&Message::ResultMax(2.0), addr());
        let state = mailbox.snapshot();
        assert_eq!(
            state.results_since(&baseline),
            Some(ScalarResults { sum: 10.0, max: 2.0 })
        );
        assert_eq!(state.results_since(&state.baseline()), None);
    }

    #[test]
    fn test_duplicates_before_baseline_are_absorbed() {
        let mailbox = Mailbox::new();
        mailbox.deliver(&Message::BasicDone, addr());
        mailbox.deliver(&Message::BasicDone, addr());
        mailbox.deliver(&Message::ResultSum(1.0), addr());
        mailbox.deliver(&Message::ResultMax(1.0), addr());
        mailbox.deliver(&Message::ResultsReady, addr());
        mailbox.deliver(&Message::ResultsReady, addr());

        let baseline = mailbox.snapshot().baseline();
        let state = mailbox.snapshot();
        assert!(!state.basic_done_since(&baseline));
        assert_eq!(state.results_since(&baseline), None);

        mailbox.deliver(&Message::BasicDone, addr());
        assert!(mailbox.snapshot().basic_done_since(&baseline));
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_satisfied() {
        let mailbox = Mailbox::new();
        mailbox.deliver(&Message::RunTimes(3), addr());

        let session = mailbox
            .wait_for("round count", Some(Duration::from_secs(1)), |s| s.session())
            .await
            .unwrap();
        assert_eq!(session, (3, addr()));
    }

    #[tokio::test]
    async fn test_wait_wakes_on_delivery() {
        let mailbox = Arc::new(Mailbox::new());
        mailbox.deliver(&Message::BasicDone, addr());
        let baseline = mailbox.snapshot().baseline();

        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move {
                mailbox
                    .wait_for("basic ack", Some(Duration::from_secs(5)), |s| {
                        s.basic_done_since(&baseline).then_some(())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        mailbox.deliver(&Message::BasicDone, addr());
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let mailbox = Mailbox::new();
        let err = mailbox
            .wait_for("client results", Some(Duration::from_millis(30)), |s| {
                s.results_since(&Baseline::default())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::TimedOut { what: "client results", .. }));
    }

    #[tokio::test]
    async fn test_listener_feeds_mailbox() {
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mailbox = Arc::new(Mailbox::new());
        let listener = spawn_listener(Arc::clone(&server), Arc::clone(&mailbox));

        let server_addr = server.local_addr().unwrap();
        client.send_to(b"RUN_TIMES:3", server_addr).await.unwrap();

        let (rounds, peer) = mailbox
            .wait_for("round count", Some(Duration::from_secs(5)), |s| s.session())
            .await
            .unwrap();
        assert_eq!(rounds, 3);
        assert_eq!(peer, client.local_addr().unwrap());

        listener.abort();
    }
}
