//! One-shot layout-completed subscriptions
//!
//! A subscription is a future resolving to the instant the surface reported
//! layout completion for a node. The surface keeps the matching
//! [`LayoutNotifier`] and consumes it when it fires, so every listener fires
//! at most once. Dropping the [`LayoutSubscription`] is the same as
//! unsubscribing: the notifier reports itself cancelled and the surface drops
//! it on its next pass.

use futures::channel::oneshot;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use strato_bench_core::{NodeHandle, SurfaceError, SurfaceResult};

/// Identifies a subscription within one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Create a connected notifier/subscription pair for `node`.
pub fn channel(id: SubscriptionId, node: NodeHandle) -> (LayoutNotifier, LayoutSubscription) {
    let (sender, receiver) = oneshot::channel();
    (
        LayoutNotifier { id, sender },
        LayoutSubscription { id, node, receiver },
    )
}

/// Surface-side half of a subscription.
#[derive(Debug)]
pub struct LayoutNotifier {
    id: SubscriptionId,
    sender: oneshot::Sender<Instant>,
}

impl LayoutNotifier {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the subscriber has gone away.
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_canceled()
    }

    /// Deliver the completion instant. Returns `false` if nobody was listening.
    pub fn notify(self, completed_at: Instant) -> bool {
        self.sender.send(completed_at).is_ok()
    }
}

/// Harness-side half of a subscription.
#[derive(Debug)]
pub struct LayoutSubscription {
    id: SubscriptionId,
    node: NodeHandle,
    receiver: oneshot::Receiver<Instant>,
}

impl LayoutSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    /// Take the completion instant if the surface already fired, without waiting.
    pub fn try_take(&mut self) -> Option<Instant> {
        self.receiver.try_recv().ok().flatten()
    }
}

impl Future for LayoutSubscription {
    type Output = SurfaceResult<Instant>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| SurfaceError::SubscriptionCancelled))
    }
}
