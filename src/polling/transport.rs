//! Long-poll hold loop for `/meta/connect` requests.

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{QueuedMessage, Session};
use crate::error::BrokerError;

/// How a long poll resolved.
#[derive(Debug)]
pub enum PollOutcome {
    /// The session's queue produced payloads; they are drained in FIFO
    /// order.
    Delivered(Vec<QueuedMessage>),
    /// The hold duration elapsed with nothing queued. This is a normal
    /// outcome, answered with a successful empty response.
    Timeout,
    /// The session was disconnected or swept while the poll was parked.
    SessionEnded,
}

/// Parks `/meta/connect` requests until data arrives or a deadline
/// passes.
///
/// The transport suspends exactly here and nowhere else: registry and
/// router mutations stay synchronous and short, while each pending
/// connect is one parked future keyed by its session. A publish wakes
/// the future through the session's [`Session::wakeup`] primitive.
#[derive(Debug, Clone, Copy)]
pub struct LongPollingTransport {
    hold_timeout: Duration,
}

impl LongPollingTransport {
    /// Creates a transport holding polls for at most `hold_timeout`.
    #[must_use]
    pub fn new(hold_timeout: Duration) -> Self {
        Self { hold_timeout }
    }

    /// Returns the maximum hold duration.
    #[must_use]
    pub fn hold_timeout(&self) -> Duration {
        self.hold_timeout
    }

    /// Blocks until the session has queued payloads, the session ends,
    /// or the hold deadline passes.
    ///
    /// `requested` is the client's `advice.timeout`; it is honored only
    /// up to the configured hold timeout, so a client cannot pin a
    /// request open indefinitely. The session's activity stamp is
    /// refreshed on entry and on exit.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DuplicateConnect`] if another poll for
    /// the same session is already pending.
    pub async fn await_messages(
        &self,
        session: &Session,
        requested: Option<Duration>,
    ) -> Result<PollOutcome, BrokerError> {
        let hold = requested.map_or(self.hold_timeout, |r| r.min(self.hold_timeout));

        let _gate = session
            .try_begin_connect()
            .ok_or(BrokerError::DuplicateConnect(session.client_id()))?;

        session.touch(Instant::now()).await;
        let deadline = Instant::now() + hold;

        let outcome = loop {
            if session.is_closed().await {
                break PollOutcome::SessionEnded;
            }
            let queued = session.drain().await;
            if !queued.is_empty() {
                break PollOutcome::Delivered(queued);
            }
            if Instant::now() >= deadline {
                break PollOutcome::Timeout;
            }
            // A permit stored by enqueue or mark_closed completes this
            // immediately, so nothing queued between the drain above
            // and this await is missed.
            if tokio::time::timeout_at(deadline, session.wakeup().notified())
                .await
                .is_err()
            {
                break PollOutcome::Timeout;
            }
        };

        session.touch(Instant::now()).await;
        Ok(outcome)
    }
}
