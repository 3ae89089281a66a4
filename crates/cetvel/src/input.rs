//! Tap delivery from the input thread to the render thread.

use crate::tracking::Tap;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Bounded FIFO of pending taps, drained one per frame by the render thread.
pub struct TapQueue {
    tx: Sender<Tap>,
    rx: Receiver<Tap>,
}

/// Producer side of a [`TapQueue`]; cheap to clone and `Send`.
#[derive(Clone)]
pub struct TapSender {
    tx: Sender<Tap>,
}

impl TapQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx }
    }

    pub fn sender(&self) -> TapSender {
        TapSender {
            tx: self.tx.clone(),
        }
    }

    /// Oldest pending tap, if any. Later taps stay queued for later frames.
    pub fn poll(&self) -> Option<Tap> {
        self.rx.try_recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl TapSender {
    /// Queue a tap. Returns `false` when the queue is full and the tap was dropped.
    pub fn on_tap(&self, x: f32, y: f32) -> bool {
        match self.tx.try_send(Tap { x, y }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Tap queue full, dropping tap at ({x}, {y})");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tap_per_poll_in_arrival_order() {
        let queue = TapQueue::new(4);
        let input = queue.sender();
        assert!(input.on_tap(1.0, 1.0));
        assert!(input.on_tap(2.0, 2.0));

        assert_eq!(queue.poll(), Some(Tap { x: 1.0, y: 1.0 }));
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.poll(), Some(Tap { x: 2.0, y: 2.0 }));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn overflow_is_dropped() {
        let queue = TapQueue::new(1);
        let input = queue.sender();
        assert!(input.on_tap(0.0, 0.0));
        assert!(!input.on_tap(5.0, 5.0));
        assert_eq!(queue.poll(), Some(Tap { x: 0.0, y: 0.0 }));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn taps_cross_threads() {
        let queue = TapQueue::new(8);
        let input = queue.sender();
        std::thread::spawn(move || {
            input.on_tap(3.0, 4.0);
        })
        .join()
        .unwrap();
        assert_eq!(queue.poll(), Some(Tap { x: 3.0, y: 4.0 }));
    }
}
