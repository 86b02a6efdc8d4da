use serde::Serialize;
use tokio::sync::mpsc;

/// One progress event per finished candidate. The runner pushes these
/// through an unbounded channel and never waits on the receiver.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub current_algorithm: String,
}

pub type ProgressSender = mpsc::UnboundedSender<Progress>;

pub(crate) fn emit(sender: Option<&ProgressSender>, event: Progress) {
    if let Some(sender) = sender {
        // A dropped receiver is the orchestrator's business, not ours.
        let _ = sender.send(event);
    }
}
