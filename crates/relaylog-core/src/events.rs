//! Change notification primitives.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Emitter<T>                                                     │
//! │  └── subscribers: Vec<mpsc::UnboundedSender<T>>                 │
//! │      └── every emission reaches every live subscriber, in order │
//! │                                                                 │
//! │  ReplayEmitter<T>                                               │
//! │  ├── last: Option<T>   (single-slot cache)                      │
//! │  └── new subscribers receive `last` first, then live events     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is lossless: mirrored state must converge, so a slow
//! subscriber queues events instead of lagging past them. Closed
//! subscribers are pruned on the next emission.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Ordered stream of events from one emitter
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    /// Wait for the next event; `None` once the emitter is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Fan-out emitter
pub struct Emitter<T> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone + Send + 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> EventStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        EventStream { rx }
    }

    pub fn emit(&self, event: T) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl<T: Clone + Send + 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct ReplayState<T> {
    last: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

/// Emitter that replays its most recent event to late subscribers
pub struct ReplayEmitter<T> {
    state: Mutex<ReplayState<T>>,
}

impl<T: Clone + Send + 'static> ReplayEmitter<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReplayState {
                last: None,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Subscribe; the cached value (if any) is the first item delivered
    pub fn subscribe(&self) -> EventStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        if let Some(last) = &state.last {
            let _ = tx.send(last.clone());
        }
        state.subscribers.push(tx);
        EventStream { rx }
    }

    pub fn emit(&self, event: T) {
        let mut state = self.state.lock();
        state
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        state.last = Some(event);
    }

    pub fn last(&self) -> Option<T> {
        self.state.lock().last.clone()
    }
}

impl<T: Clone + Send + 'static> Default for ReplayEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
