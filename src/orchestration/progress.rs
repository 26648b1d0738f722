//! Progress delivery from a running batch to its caller.

use tokio::sync::mpsc;

use crate::models::ProgressEvent;

pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Non-blocking sink for [`ProgressEvent`]s
///
/// Sending never waits. Once the receiver is dropped, events are discarded
/// and the batch carries on.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    inner: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSender {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            inner: Some(sender),
        }
    }

    /// A sender that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, ProgressReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.inner {
            let _ = sender.send(event);
        }
    }
}
