//! Confirmation polling for submitted transactions and new blockchains.

use crate::{
    ids::Id,
    rpc::{BlockchainStatus, PlatformApi, RpcError, TxStatus},
};
use std::{future::Future, time::Duration};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default wait between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How a poll loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe reported a terminal value.
    Done(T),
    /// The deadline passed first.
    TimedOut,
    /// The cancellation token fired first.
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            PollOutcome::Done(v) => Some(v),
            PollOutcome::TimedOut | PollOutcome::Cancelled => None,
        }
    }
}

/// Polls the node at a fixed interval until a probe succeeds, a deadline
/// passes, or it is cancelled.
///
/// Each iteration waits first and then probes, so a freshly submitted
/// transaction gets one interval to propagate.
#[derive(Clone, Debug)]
pub struct Checker {
    interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Checker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound every poll loop by `timeout`, measured from its start.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `probe` once per interval until it yields a value.
    pub async fn poll_until<T, E, F, Fut>(&self, mut probe: F) -> Result<PollOutcome<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                _ = wait_for(deadline) => return Ok(PollOutcome::TimedOut),
                _ = sleep(self.interval) => {}
            }
            if let Some(value) = probe().await? {
                return Ok(PollOutcome::Done(value));
            }
        }
    }

    /// Wait until `tx_id` reaches a terminal status.
    pub async fn poll_tx<A>(&self, api: &A, tx_id: Id) -> Result<PollOutcome<TxStatus>, RpcError>
    where
        A: PlatformApi + ?Sized,
    {
        self.poll_until(|| async move {
            let status = api.tx_status(tx_id).await?;
            debug!(%tx_id, %status, "polled transaction status");
            Ok::<_, RpcError>(status.is_terminal().then_some(status))
        })
        .await
    }

    /// Wait until `blockchain_id` reports `target`.
    pub async fn poll_blockchain<A>(
        &self,
        api: &A,
        blockchain_id: Id,
        target: BlockchainStatus,
    ) -> Result<PollOutcome<BlockchainStatus>, RpcError>
    where
        A: PlatformApi + ?Sized,
    {
        self.poll_until(|| async move {
            let status = api.blockchain_status(blockchain_id).await?;
            debug!(%blockchain_id, %status, "polled blockchain status");
            Ok::<_, RpcError>((status == target).then_some(status))
        })
        .await
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
