//! Analysis Session Handle
//!
//! Wires one run's channels together: spawns the orchestrator onto the
//! runtime, hands the caller the event stream, the approve/stop API, and
//! the terminal `RunSummary`. Dropping the session unhooks the event
//! receiver, which the run observes as cancellation.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::constants::stream;
use crate::types::{AnalysisEvent, LensError, PriorityTier, Result, RunSummary};

use super::{ApprovalDecision, ApprovalSignal, Orchestrator, StartRequest};

pub struct AnalysisSession {
    events: mpsc::Receiver<AnalysisEvent>,
    approvals: mpsc::Sender<ApprovalSignal>,
    handle: JoinHandle<Result<RunSummary>>,
}

impl AnalysisSession {
    /// Spawn a run and return its handle.
    pub fn start(orchestrator: Arc<Orchestrator>, request: StartRequest) -> Self {
        let (event_tx, event_rx) = mpsc::channel(stream::EVENT_CHANNEL_CAPACITY);
        let (approval_tx, approval_rx) = mpsc::channel(4);

        let handle =
            tokio::spawn(async move { orchestrator.run(request, event_tx, approval_rx).await });

        Self {
            events: event_rx,
            approvals: approval_tx,
            handle,
        }
    }

    /// Next event from the run, or None once the stream has closed.
    pub async fn next_event(&mut self) -> Option<AnalysisEvent> {
        self.events.recv().await
    }

    /// Approve advancing past `tier`. Returns false if the run is already
    /// gone.
    pub async fn approve(&self, tier: PriorityTier) -> bool {
        self.approvals
            .send(ApprovalSignal {
                tier,
                decision: ApprovalDecision::Approve,
            })
            .await
            .is_ok()
    }

    /// Stop the run after `tier`; later tiers are skipped, not run.
    pub async fn stop(&self, tier: PriorityTier) -> bool {
        self.approvals
            .send(ApprovalSignal {
                tier,
                decision: ApprovalDecision::Stop,
            })
            .await
            .is_ok()
    }

    /// Wait for the run to terminate and return its summary.
    ///
    /// Remaining events are drained first so the run is never blocked on a
    /// full channel while finishing.
    pub async fn join(mut self) -> Result<RunSummary> {
        while self.events.recv().await.is_some() {}
        self.handle
            .await
            .map_err(|e| LensError::Internal(format!("run task failed: {}", e)))?
    }

    /// Abandon the run immediately without waiting for a terminal event.
    pub fn abort(&self) {
        self.handle.abort();
    }
}
