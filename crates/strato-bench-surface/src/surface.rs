//! The layout surface abstraction
//!
//! A layout surface owns a tree of positioned nodes and lays it out
//! asynchronously. Mutations only schedule work. The layout itself happens in
//! [`LayoutSurface::layout_pass`], which the surface's frame loop (see
//! [`crate::FrameDriver`]) calls when [`LayoutSurface::needs_layout`] reports
//! pending changes. After each pass the surface fires the one-shot
//! subscriptions of every node whose computed frame changed.

use std::time::{Duration, Instant};
use strato_bench_core::{Geometry, NodeHandle, NodeProps, SurfaceResult};

use crate::subscription::{LayoutSubscription, SubscriptionId};

/// Summary of one layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutPass {
    /// Nodes reachable from the root during the pass
    pub nodes_visited: usize,
    /// Nodes whose computed frame changed
    pub nodes_changed: usize,
    /// Subscriptions fired
    pub notifications: usize,
    /// Wall time of the pass
    pub duration: Duration,
}

/// Trait for layout engines the harness can benchmark.
///
/// Tree-building and mutation methods are called by the harness. The
/// `needs_layout`/`layout_pass` pair is called by the surface's frame loop.
pub trait LayoutSurface {
    /// Create a detached node.
    fn create_node(&mut self, props: NodeProps) -> SurfaceResult<NodeHandle>;

    /// Append `child` to `parent`'s children.
    ///
    /// # Errors
    ///
    /// `SurfaceError::AlreadyAttached` if `child` already has a parent or is the root.
    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> SurfaceResult<()>;

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> SurfaceResult<()>;

    /// Make `root` the node laid out by each pass.
    fn attach_root(&mut self, root: NodeHandle) -> SurfaceResult<()>;

    /// Children of `node`, in order.
    fn children(&self, node: NodeHandle) -> SurfaceResult<&[NodeHandle]>;

    /// Requested geometry of `node` (not its computed frame).
    fn geometry(&self, node: NodeHandle) -> SurfaceResult<Geometry>;

    /// Replace the requested geometry of `node` and schedule a layout.
    fn set_geometry(&mut self, node: NodeHandle, geometry: Geometry) -> SurfaceResult<()>;

    /// Subscribe to the next layout pass that changes `node`'s computed frame.
    fn on_layout_complete(&mut self, node: NodeHandle) -> SurfaceResult<LayoutSubscription>;

    /// Remove a subscription before it fires. Returns `false` if it had
    /// already fired or was never registered on `node`.
    fn off_layout_complete(&mut self, node: NodeHandle, id: SubscriptionId) -> SurfaceResult<bool>;

    /// Whether a mutation is waiting for a layout pass.
    fn needs_layout(&self) -> bool;

    /// Lay out the tree and fire subscriptions of changed nodes.
    fn layout_pass(&mut self) -> SurfaceResult<LayoutPass>;

    /// Clock used for timestamps. Completion instants come from the same clock.
    fn now(&self) -> Instant {
        Instant::now()
    }
}
