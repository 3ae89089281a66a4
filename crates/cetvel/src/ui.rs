//! Notifications for the presentation layer.

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Offer to turn on depth-based occlusion.
    SuggestOcclusion,
    /// A user-facing error message.
    Error(String),
}

/// Fire-and-forget sender of [`UiEvent`]s.
#[derive(Debug, Clone)]
pub struct UiSink {
    tx: Sender<UiEvent>,
}

impl UiSink {
    pub fn send(&self, event: UiEvent) {
        if let Err(err) = self.tx.send(event) {
            log::debug!("No UI listening, dropped {:?}", err.into_inner());
        }
    }
}

pub fn ui_channel() -> (UiSink, Receiver<UiEvent>) {
    let (tx, rx) = unbounded();
    (UiSink { tx }, rx)
}
