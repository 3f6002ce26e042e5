//! Integration tests for the Taffy surface driven by its frame loop

use futures::future::join_all;
use std::cell::RefCell;
use std::time::{Duration, Instant};
use strato_bench_core::{Geometry, NodeHandle, NodeProps, Sizing, SurfaceError};
use strato_bench_surface::{FrameDriver, LayoutSurface, TaffySurface};

fn build_flat(count: usize) -> (TaffySurface, NodeHandle, Vec<NodeHandle>) {
    let mut surface = TaffySurface::new();
    let root = surface
        .create_node(NodeProps::new(Geometry::new(0.0, 0.0, 720.0, 1280.0)))
        .unwrap();
    let leaves: Vec<_> = (0..count)
        .map(|i| {
            let leaf = surface
                .create_node(NodeProps::new(Geometry::new(i as f32, i as f32, 20.0, 20.0)))
                .unwrap();
            surface.add_child(root, leaf).unwrap();
            leaf
        })
        .collect();
    surface.attach_root(root).unwrap();
    (surface, root, leaves)
}

#[tokio::test]
async fn test_mutations_are_reported_after_a_frame() {
    let (mut surface, _root, leaves) = build_flat(50);
    surface.layout_pass().unwrap();

    let issued = Instant::now();
    let mut subscriptions = Vec::new();
    for leaf in &leaves[..10] {
        let moved = surface.geometry(*leaf).unwrap().shifted_floor(15.5, -3.2);
        surface.set_geometry(*leaf, moved).unwrap();
        subscriptions.push(surface.on_layout_complete(*leaf).unwrap());
    }
    // Untouched nodes never fire
    let quiet = surface.on_layout_complete(leaves[40]).unwrap();
    let surface = RefCell::new(surface);

    let driver = FrameDriver::new(Duration::from_millis(2));
    let fired = tokio::select! {
        result = driver.run(&surface) => panic!("driver stopped: {:?}", result),
        fired = join_all(subscriptions) => fired,
    };

    assert_eq!(fired.len(), 10);
    for completed_at in fired {
        assert!(completed_at.unwrap() >= issued);
    }

    let surface = surface.into_inner();
    assert_eq!(surface.pending_listeners(), 1);
    drop(quiet);
    assert_eq!(surface.pending_listeners(), 0);
    assert_eq!(
        surface.computed_frame(leaves[0]).unwrap(),
        Some(Geometry::new(15.0, -4.0, 20.0, 20.0))
    );
}

#[tokio::test]
async fn test_fill_subtree_follows_root_resize() {
    let mut surface = TaffySurface::new();
    let root = surface
        .create_node(NodeProps::new(Geometry::new(0.0, 0.0, 100.0, 100.0)))
        .unwrap();
    let fill = surface
        .create_node(NodeProps::new(Geometry::new(10.0, 10.0, 0.0, 0.0)).sizing(Sizing::Fill))
        .unwrap();
    surface.add_child(root, fill).unwrap();
    surface.attach_root(root).unwrap();
    surface.layout_pass().unwrap();

    let resized = surface.geometry(root).unwrap().resized_by(-5.0);
    surface.set_geometry(root, resized).unwrap();
    let subscription = surface.on_layout_complete(fill).unwrap();
    let surface = RefCell::new(surface);

    let driver = FrameDriver::new(Duration::from_millis(2));
    tokio::select! {
        result = driver.run(&surface) => panic!("driver stopped: {:?}", result),
        fired = subscription => assert!(fired.is_ok()),
    }

    let frame = surface.borrow().computed_frame(fill).unwrap().unwrap();
    assert_eq!((frame.width, frame.height), (95.0, 95.0));
}

#[test]
fn test_unknown_handles_are_rejected_everywhere() {
    let (mut surface, root, _) = build_flat(1);
    let ghost = NodeHandle::new(1_000);

    assert_eq!(
        surface.add_child(root, ghost),
        Err(SurfaceError::UnknownNode(ghost))
    );
    assert_eq!(
        surface.on_layout_complete(ghost).err(),
        Some(SurfaceError::UnknownNode(ghost))
    );
    assert_eq!(
        surface.set_geometry(ghost, Geometry::default()),
        Err(SurfaceError::UnknownNode(ghost))
    );
    assert!(surface.children(ghost).is_err());
}
