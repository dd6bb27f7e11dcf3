//! Background history fetches.
//!
//! A [`Refresher`] spawns fetches on a tokio runtime and hands results back
//! to the render loop over a channel. Each fetch carries a generation
//! number; starting a new one cancels the previous fetch, and results from
//! older generations are dropped on receipt.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use weft_core::WorkflowExecution;
use weft_history::{CorrelatedEvent, FetchError, HistoryProvider, fetch_history};

/// Outcome of one fetch
#[derive(Debug)]
pub struct FetchResult {
    /// Generation the fetch was started under
    pub generation: u64,
    /// Events, or why there are none
    pub outcome: Result<Vec<CorrelatedEvent>, FetchError>,
}

/// Owner of the in-flight history fetch
pub struct Refresher {
    runtime: Handle,
    provider: Arc<dyn HistoryProvider>,
    execution: WorkflowExecution,
    timeout: Duration,
    tx: mpsc::UnboundedSender<FetchResult>,
    rx: mpsc::UnboundedReceiver<FetchResult>,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl Refresher {
    /// Create a refresher; nothing is fetched until [`Refresher::start`]
    #[must_use]
    pub fn new(
        runtime: Handle,
        provider: Arc<dyn HistoryProvider>,
        execution: WorkflowExecution,
        timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            provider,
            execution,
            timeout,
            tx,
            rx,
            generation: 0,
            in_flight: None,
        }
    }

    /// Start a fetch, cancelling any in-flight one. Returns its generation.
    pub fn start(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();

        let provider = Arc::clone(&self.provider);
        let execution = self.execution.clone();
        let timeout = self.timeout;
        let tx = self.tx.clone();
        let cancel = token.clone();
        self.runtime.spawn(async move {
            let outcome = fetch_history(provider.as_ref(), &execution, timeout, &cancel).await;
            // the receiver is gone once the app has quit
            let _ = tx.send(FetchResult { generation, outcome });
        });

        tracing::debug!(generation, execution = %self.execution, "refresh started");
        self.in_flight = Some(token);
        generation
    }

    /// Cancel the in-flight fetch, if any
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            tracing::debug!(generation = self.generation, "refresh cancelled");
            token.cancel();
        }
    }

    /// Whether a fetch is in flight
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Generation of the latest fetch
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Where histories come from
    #[must_use]
    pub fn source(&self) -> String {
        self.provider.describe()
    }

    /// Latest-generation result, if one has arrived. Never blocks.
    pub fn poll(&mut self) -> Option<FetchResult> {
        while let Ok(result) = self.rx.try_recv() {
            if let Some(current) = self.accept(result) {
                return Some(current);
            }
        }
        None
    }

    /// Wait for the next latest-generation result
    pub async fn next(&mut self) -> Option<FetchResult> {
        while let Some(result) = self.rx.recv().await {
            if let Some(current) = self.accept(result) {
                return Some(current);
            }
        }
        None
    }

    fn accept(&mut self, result: FetchResult) -> Option<FetchResult> {
        if result.generation != self.generation {
            tracing::debug!(
                generation = result.generation,
                current = self.generation,
                "dropping stale fetch result"
            );
            return None;
        }
        self.in_flight = None;
        Some(result)
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.cancel();
    }
}
