//! Suspend/resume gate for breakpoint and wait pauses.

use tokio::sync::oneshot;
use webpilot_protocols::PauseReason;

/// How a pause was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseDecision {
    /// Continue; a pre-dispatch pause runs the node.
    Resume,
    /// Continue without dispatching the paused node.
    Skip,
}

/// Holds at most one pending pause.
///
/// The traversal task arms the controller and awaits the returned receiver.
/// The first `release` consumes the sender, so each pause resumes exactly
/// once and later releases are no-ops.
#[derive(Debug, Default)]
pub struct PauseController {
    pending: Option<PendingPause>,
}

#[derive(Debug)]
struct PendingPause {
    node_id: String,
    reason: PauseReason,
    sender: oneshot::Sender<PauseDecision>,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pause and return the receiver the traversal awaits.
    ///
    /// Arming while a pause is pending replaces it; the old waiter sees its
    /// channel closed.
    pub fn arm(&mut self, node_id: impl Into<String>, reason: PauseReason) -> oneshot::Receiver<PauseDecision> {
        let (sender, receiver) = oneshot::channel();
        self.pending = Some(PendingPause {
            node_id: node_id.into(),
            reason,
            sender,
        });
        receiver
    }

    /// Release the pending pause. Returns `false` when nothing was pending.
    pub fn release(&mut self, decision: PauseDecision) -> bool {
        match self.pending.take() {
            Some(pending) => {
                // The waiter may already be gone after a stop.
                let _ = pending.sender.send(decision);
                true
            }
            None => false,
        }
    }

    /// Drop any pending pause without a decision.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn is_paused(&self) -> bool {
        self.pending.is_some()
    }

    pub fn paused_node(&self) -> Option<(&str, PauseReason)> {
        self.pending
            .as_ref()
            .map(|p| (p.node_id.as_str(), p.reason))
    }
}
