//! Taffy-backed layout surface
//!
//! Nodes live in an arena of records indexed by [`NodeHandle`]. Each record
//! mirrors one node of an internal Taffy tree. Parent/child links are stored
//! as handles, so no record owns another.
//!
//! # Style mapping
//!
//! | Node property | Taffy style |
//! |---------------|-------------|
//! | `left`, `top` | `inset.left`, `inset.top` |
//! | `Sizing::Fixed` | `size = length(width, height)` |
//! | `Sizing::Fill` | `size = 100%` of the parent |
//! | `Sizing::Content` | `size = auto`, children become in-flow |
//!
//! Children of a `Content` node are positioned `Relative` so they contribute
//! to its size. All other nodes are `Absolute`.
//!
//! # Change detection
//!
//! Every pass walks the tree from the root in depth-first pre-order and
//! compares each node's computed frame with the one from the previous pass.
//! Subscriptions fire only for nodes whose frame changed, each with the
//! instant the walk reached that node.

use smallvec::SmallVec;
use std::time::Instant;
use strato_bench_core::{Color, Geometry, NodeHandle, NodeProps, Sizing, SurfaceError, SurfaceResult};
use taffy::prelude::*;

use crate::subscription::{self, LayoutNotifier, LayoutSubscription, SubscriptionId};
use crate::surface::{LayoutPass, LayoutSurface};

fn taffy_error(err: taffy::TaffyError) -> SurfaceError {
    SurfaceError::ComputationFailed {
        reason: format!("{:?}", err),
    }
}

/// One node of the arena.
#[derive(Debug)]
struct NodeRecord {
    taffy: NodeId,
    geometry: Geometry,
    sizing: Sizing,
    color: Color,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    /// Positioned in its parent's flow (parent is content-sized).
    in_flow: bool,
    /// Frame computed by the last pass that reached this node.
    computed: Option<Geometry>,
    listeners: SmallVec<[LayoutNotifier; 1]>,
}

impl NodeRecord {
    fn style(&self) -> Style {
        node_style(self.geometry, self.sizing, self.in_flow)
    }
}

fn node_style(geometry: Geometry, sizing: Sizing, in_flow: bool) -> Style {
    let size = match sizing {
        Sizing::Fixed => Size {
            width: length(geometry.width),
            height: length(geometry.height),
        },
        Sizing::Fill => Size {
            width: percent(1.0_f32),
            height: percent(1.0_f32),
        },
        Sizing::Content => Size {
            width: auto(),
            height: auto(),
        },
    };

    Style {
        position: if in_flow {
            Position::Relative
        } else {
            Position::Absolute
        },
        inset: Rect {
            left: length(geometry.left),
            top: length(geometry.top),
            right: auto(),
            bottom: auto(),
        },
        size,
        ..Default::default()
    }
}

/// Layout surface hosting its node tree in a Taffy tree.
///
/// # Thread Safety
///
/// NOT thread-safe. Share it within one task through a `RefCell`.
pub struct TaffySurface {
    tree: TaffyTree<()>,
    nodes: Vec<NodeRecord>,
    root: Option<NodeHandle>,
    dirty: bool,
    next_subscription: u64,
    passes: u64,
}

impl TaffySurface {
    pub fn new() -> Self {
        Self {
            tree: TaffyTree::new(),
            nodes: Vec::new(),
            root: None,
            dirty: false,
            next_subscription: 0,
            passes: 0,
        }
    }

    /// Number of nodes ever created.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of completed layout passes.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    /// Frame computed for `node` by the most recent pass that reached it.
    pub fn computed_frame(&self, node: NodeHandle) -> SurfaceResult<Option<Geometry>> {
        Ok(self.record(node)?.computed)
    }

    pub fn color(&self, node: NodeHandle) -> SurfaceResult<Color> {
        Ok(self.record(node)?.color)
    }

    pub fn parent(&self, node: NodeHandle) -> SurfaceResult<Option<NodeHandle>> {
        Ok(self.record(node)?.parent)
    }

    /// Subscriptions still waiting to fire, ignoring cancelled ones.
    pub fn pending_listeners(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|record| record.listeners.iter())
            .filter(|listener| !listener.is_cancelled())
            .count()
    }

    /// Subscriptions held by the surface, including cancelled ones not yet pruned.
    pub fn stored_listeners(&self) -> usize {
        self.nodes.iter().map(|record| record.listeners.len()).sum()
    }

    fn record(&self, node: NodeHandle) -> SurfaceResult<&NodeRecord> {
        self.nodes
            .get(node.index())
            .ok_or(SurfaceError::UnknownNode(node))
    }

    fn record_mut(&mut self, node: NodeHandle) -> SurfaceResult<&mut NodeRecord> {
        self.nodes
            .get_mut(node.index())
            .ok_or(SurfaceError::UnknownNode(node))
    }

    /// Push the record's current style into the Taffy tree.
    fn sync_style(&mut self, node: NodeHandle) -> SurfaceResult<()> {
        let record = self.record(node)?;
        let (taffy_node, style) = (record.taffy, record.style());
        self.tree.set_style(taffy_node, style).map_err(taffy_error)?;
        self.dirty = true;
        Ok(())
    }

    fn is_ancestor(&self, candidate: NodeHandle, node: NodeHandle) -> SurfaceResult<bool> {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == candidate {
                return Ok(true);
            }
            current = self.record(handle)?.parent;
        }
        Ok(false)
    }
}

impl Default for TaffySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaffySurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaffySurface")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("dirty", &self.dirty)
            .field("passes", &self.passes)
            .finish()
    }
}

impl LayoutSurface for TaffySurface {
    fn create_node(&mut self, props: NodeProps) -> SurfaceResult<NodeHandle> {
        props.geometry.validate()?;

        let taffy = self
            .tree
            .new_leaf(node_style(props.geometry, props.sizing, false))
            .map_err(taffy_error)?;
        let record = NodeRecord {
            taffy,
            geometry: props.geometry,
            sizing: props.sizing,
            color: props.color,
            parent: None,
            children: Vec::new(),
            in_flow: false,
            computed: None,
            listeners: SmallVec::new(),
        };

        let handle = NodeHandle::new(self.nodes.len());
        self.nodes.push(record);
        Ok(handle)
    }

    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> SurfaceResult<()> {
        let parent_record = self.record(parent)?;
        let (parent_taffy, parent_sizing) = (parent_record.taffy, parent_record.sizing);
        let child_record = self.record(child)?;
        let child_taffy = child_record.taffy;
        if child_record.parent.is_some() || self.root == Some(child) {
            return Err(SurfaceError::AlreadyAttached { child });
        }
        if self.is_ancestor(child, parent)? {
            return Err(SurfaceError::WouldCycle { parent, child });
        }

        self.tree
            .add_child(parent_taffy, child_taffy)
            .map_err(taffy_error)?;

        self.record_mut(parent)?.children.push(child);
        let child_record = self.record_mut(child)?;
        child_record.parent = Some(parent);
        child_record.in_flow = parent_sizing == Sizing::Content;
        self.sync_style(child)
    }

    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> SurfaceResult<()> {
        let parent_taffy = self.record(parent)?.taffy;
        let child_record = self.record(child)?;
        let child_taffy = child_record.taffy;
        if child_record.parent != Some(parent) {
            return Err(SurfaceError::NotAChild { parent, child });
        }

        self.tree
            .remove_child(parent_taffy, child_taffy)
            .map_err(taffy_error)?;

        self.record_mut(parent)?.children.retain(|c| *c != child);
        let child_record = self.record_mut(child)?;
        child_record.parent = None;
        child_record.in_flow = false;
        child_record.computed = None;
        self.sync_style(child)
    }

    fn attach_root(&mut self, root: NodeHandle) -> SurfaceResult<()> {
        if self.record(root)?.parent.is_some() {
            return Err(SurfaceError::AlreadyAttached { child: root });
        }
        self.root = Some(root);
        self.dirty = true;
        tracing::debug!("Attached root {} ({} nodes)", root, self.nodes.len());
        Ok(())
    }

    fn children(&self, node: NodeHandle) -> SurfaceResult<&[NodeHandle]> {
        Ok(&self.record(node)?.children)
    }

    fn geometry(&self, node: NodeHandle) -> SurfaceResult<Geometry> {
        Ok(self.record(node)?.geometry)
    }

    fn set_geometry(&mut self, node: NodeHandle, geometry: Geometry) -> SurfaceResult<()> {
        geometry.validate()?;
        let record = self.record_mut(node)?;
        if record.geometry == geometry {
            return Ok(());
        }
        record.geometry = geometry;
        self.sync_style(node)
    }

    fn on_layout_complete(&mut self, node: NodeHandle) -> SurfaceResult<LayoutSubscription> {
        let id = SubscriptionId::new(self.next_subscription);
        let record = self.record_mut(node)?;
        let (notifier, subscription) = subscription::channel(id, node);
        record.listeners.push(notifier);
        self.next_subscription += 1;
        Ok(subscription)
    }

    fn off_layout_complete(&mut self, node: NodeHandle, id: SubscriptionId) -> SurfaceResult<bool> {
        let record = self.record_mut(node)?;
        let before = record.listeners.len();
        record.listeners.retain(|listener| listener.id() != id);
        Ok(record.listeners.len() != before)
    }

    fn needs_layout(&self) -> bool {
        self.dirty && self.root.is_some()
    }

    fn layout_pass(&mut self) -> SurfaceResult<LayoutPass> {
        let started = Instant::now();
        let root = self.root.ok_or(SurfaceError::NotAttached)?;
        let root_record = self.record(root)?;
        let root_taffy = root_record.taffy;
        let available_space = Size {
            width: AvailableSpace::Definite(root_record.geometry.width),
            height: AvailableSpace::Definite(root_record.geometry.height),
        };

        self.tree
            .compute_layout(root_taffy, available_space)
            .map_err(taffy_error)?;

        let mut pass = LayoutPass::default();
        let Self { tree, nodes, .. } = self;
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let record = &mut nodes[handle.index()];
            let layout = tree.layout(record.taffy).map_err(taffy_error)?;
            let frame = Geometry::new(
                layout.location.x,
                layout.location.y,
                layout.size.width,
                layout.size.height,
            );
            frame.validate().map_err(|_| SurfaceError::ComputationFailed {
                reason: format!("non-finite frame for node {}", handle),
            })?;

            pass.nodes_visited += 1;
            if record.computed != Some(frame) {
                record.computed = Some(frame);
                pass.nodes_changed += 1;
                if !record.listeners.is_empty() {
                    let completed_at = Instant::now();
                    for listener in record.listeners.drain(..) {
                        if listener.notify(completed_at) {
                            pass.notifications += 1;
                        }
                    }
                }
            }
            stack.extend(record.children.iter().rev().copied());
        }

        // Drop listeners whose subscribers went away, reachable or not
        for record in nodes.iter_mut() {
            record.listeners.retain(|listener| !listener.is_cancelled());
        }

        self.dirty = false;
        self.passes += 1;
        pass.duration = started.elapsed();
        tracing::trace!(
            "Layout pass {}: visited={}, changed={}, notified={}, took {:?}",
            self.passes,
            pass.nodes_visited,
            pass.nodes_changed,
            pass.notifications,
            pass.duration
        );
        Ok(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use strato_bench_core::Area;

    fn fixed(left: f32, top: f32, size: f32) -> NodeProps {
        NodeProps::new(Geometry::new(left, top, size, size))
    }

    fn surface_with_root() -> (TaffySurface, NodeHandle) {
        let mut surface = TaffySurface::new();
        let root = surface
            .create_node(NodeProps::new(Geometry::from_area(Area::new(400.0, 300.0))))
            .unwrap();
        surface.attach_root(root).unwrap();
        (surface, root)
    }

    #[test]
    fn test_new_surface_is_idle() {
        let surface = TaffySurface::new();
        assert_eq!(surface.node_count(), 0);
        assert!(!surface.needs_layout());
        assert_eq!(surface.pass_count(), 0);
    }

    #[test]
    fn test_layout_pass_without_root_fails() {
        let mut surface = TaffySurface::new();
        assert_eq!(surface.layout_pass(), Err(SurfaceError::NotAttached));
    }

    #[test]
    fn test_absolute_children_are_placed_at_inset() {
        let (mut surface, root) = surface_with_root();
        let child = surface.create_node(fixed(30.0, 40.0, 20.0)).unwrap();
        surface.add_child(root, child).unwrap();

        let pass = surface.layout_pass().unwrap();
        assert_eq!(pass.nodes_visited, 2);
        assert_eq!(pass.nodes_changed, 2);
        assert_eq!(
            surface.computed_frame(child).unwrap(),
            Some(Geometry::new(30.0, 40.0, 20.0, 20.0))
        );
        assert!(!surface.needs_layout());
    }

    #[test]
    fn test_fill_children_track_parent_size() {
        let (mut surface, root) = surface_with_root();
        let fill = surface
            .create_node(fixed(0.0, 0.0, 10.0).sizing(Sizing::Fill))
            .unwrap();
        surface.add_child(root, fill).unwrap();
        surface.layout_pass().unwrap();
        assert_eq!(
            surface.computed_frame(fill).unwrap().map(|g| (g.width, g.height)),
            Some((400.0, 300.0))
        );

        let grown = surface.geometry(root).unwrap().resized_by(5.0);
        surface.set_geometry(root, grown).unwrap();
        let pass = surface.layout_pass().unwrap();
        assert_eq!(pass.nodes_changed, 2);
        assert_eq!(
            surface.computed_frame(fill).unwrap().map(|g| (g.width, g.height)),
            Some((405.0, 305.0))
        );
    }

    #[test]
    fn test_content_parent_wraps_children() {
        let (mut surface, root) = surface_with_root();
        let wrapper = surface
            .create_node(fixed(0.0, 0.0, 0.0).sizing(Sizing::Content))
            .unwrap();
        surface.add_child(root, wrapper).unwrap();
        for _ in 0..3 {
            let leaf = surface.create_node(fixed(0.0, 0.0, 10.0)).unwrap();
            surface.add_child(wrapper, leaf).unwrap();
        }
        surface.layout_pass().unwrap();

        let frame = surface.computed_frame(wrapper).unwrap().unwrap();
        assert_eq!(frame.width, 30.0);
        assert_eq!(frame.height, 10.0);
    }

    #[test]
    fn test_subscription_fires_once_for_changed_node() {
        let (mut surface, root) = surface_with_root();
        let moved = surface.create_node(fixed(10.0, 10.0, 20.0)).unwrap();
        let still = surface.create_node(fixed(50.0, 50.0, 20.0)).unwrap();
        surface.add_child(root, moved).unwrap();
        surface.add_child(root, still).unwrap();
        surface.layout_pass().unwrap();

        let moved_sub = surface.on_layout_complete(moved).unwrap();
        let mut still_sub = surface.on_layout_complete(still).unwrap();
        let before = Instant::now();
        surface
            .set_geometry(moved, Geometry::new(25.0, 10.0, 20.0, 20.0))
            .unwrap();
        assert!(surface.needs_layout());

        let pass = surface.layout_pass().unwrap();
        assert_eq!(pass.nodes_changed, 1);
        assert_eq!(pass.notifications, 1);

        let fired = moved_sub.now_or_never().unwrap().unwrap();
        assert!(fired >= before);
        assert!(still_sub.try_take().is_none());
        assert_eq!(surface.pending_listeners(), 1);
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let (mut surface, root) = surface_with_root();
        let child = surface.create_node(fixed(0.0, 0.0, 20.0)).unwrap();
        surface.add_child(root, child).unwrap();
        surface.layout_pass().unwrap();

        let subscription = surface.on_layout_complete(child).unwrap();
        assert_eq!(surface.stored_listeners(), 1);
        drop(subscription);
        assert_eq!(surface.pending_listeners(), 0);

        surface.set_geometry(root, Geometry::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        surface.layout_pass().unwrap();
        assert_eq!(surface.stored_listeners(), 0);
    }

    #[test]
    fn test_off_layout_complete() {
        let (mut surface, root) = surface_with_root();
        let subscription = surface.on_layout_complete(root).unwrap();
        assert!(surface.off_layout_complete(root, subscription.id()).unwrap());
        assert!(!surface.off_layout_complete(root, subscription.id()).unwrap());
        assert_eq!(
            subscription.now_or_never(),
            Some(Err(SurfaceError::SubscriptionCancelled))
        );
    }

    #[test]
    fn test_detached_nodes_are_not_laid_out() {
        let (mut surface, root) = surface_with_root();
        let child = surface.create_node(fixed(0.0, 0.0, 20.0)).unwrap();
        surface.add_child(root, child).unwrap();
        surface.layout_pass().unwrap();

        surface.remove_child(root, child).unwrap();
        assert!(surface.children(root).unwrap().is_empty());
        let mut subscription = surface.on_layout_complete(child).unwrap();
        surface.layout_pass().unwrap();
        assert!(subscription.try_take().is_none());
        assert_eq!(surface.computed_frame(child).unwrap(), None);
    }

    #[test]
    fn test_tree_shape_errors() {
        let (mut surface, root) = surface_with_root();
        let a = surface.create_node(fixed(0.0, 0.0, 20.0)).unwrap();
        let b = surface.create_node(fixed(0.0, 0.0, 20.0)).unwrap();
        surface.add_child(a, b).unwrap();

        assert_eq!(
            surface.add_child(root, b),
            Err(SurfaceError::AlreadyAttached { child: b })
        );
        assert_eq!(
            surface.add_child(b, a),
            Err(SurfaceError::WouldCycle { parent: b, child: a })
        );
        assert_eq!(
            surface.add_child(a, root),
            Err(SurfaceError::AlreadyAttached { child: root })
        );
        assert_eq!(
            surface.remove_child(root, b),
            Err(SurfaceError::NotAChild { parent: root, child: b })
        );
        assert_eq!(
            surface.geometry(NodeHandle::new(99)),
            Err(SurfaceError::UnknownNode(NodeHandle::new(99)))
        );
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let (mut surface, root) = surface_with_root();
        let result = surface.set_geometry(root, Geometry::new(0.0, 0.0, -1.0, 5.0));
        assert!(matches!(result, Err(SurfaceError::InvalidGeometry { .. })));
        assert!(surface
            .create_node(fixed(f32::NAN, 0.0, 1.0))
            .is_err());
    }
}
