//! Test tree generation
//!
//! Every generated tree has the same frame: a root covering the whole area,
//! one container inset by [`CONTAINER_INSET`] at the root's origin, and the
//! test nodes below the container. Only test nodes are sampling candidates.

use rand::Rng;
use strato_bench_core::{
    Area, BenchConfig, Color, Geometry, NodeHandle, NodeProps, Sizing, SurfaceResult, TreeShape,
};
use strato_bench_surface::LayoutSurface;

pub use strato_bench_core::config::CONTAINER_INSET;

const FLAT_COLOR_STEP: u8 = 15;
const TREE_COLOR_STEP: u8 = 5;

/// Handles of a generated tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTree {
    pub root: NodeHandle,
    pub container: NodeHandle,
    /// Test nodes in creation order
    pub candidates: Vec<NodeHandle>,
}

impl GeneratedTree {
    /// All nodes, including the root and the container.
    pub fn node_count(&self) -> usize {
        self.candidates.len() + 2
    }
}

/// Cosmetic colour sequence. Wraps around the red channel.
#[derive(Debug, Clone)]
struct ColorRamp {
    step: u8,
    value: u8,
}

impl ColorRamp {
    fn new(step: u8) -> Self {
        Self { step, value: 0 }
    }

    fn next(&mut self) -> Color {
        let color = Color::rgb(self.value, 0, 255 - self.value);
        self.value = self.value.wrapping_add(self.step);
        color
    }
}

/// Generate the tree described by `config` and attach its root.
pub fn generate<S, R>(surface: &mut S, config: &BenchConfig, rng: &mut R) -> SurfaceResult<GeneratedTree>
where
    S: LayoutSurface + ?Sized,
    R: Rng + ?Sized,
{
    match config.shape {
        TreeShape::Flat { count, leaf_size } => {
            build_flat(surface, count, leaf_size, config.sizing, config.area, rng)
        }
        TreeShape::Tree { levels, branching } => {
            build_tree(surface, levels, branching, config.sizing, config.area, rng)
        }
    }
}

/// Root and container shared by every shape. The root is not attached yet.
fn build_frame<S>(surface: &mut S, sizing: Sizing, area: Area) -> SurfaceResult<(NodeHandle, NodeHandle, Area)>
where
    S: LayoutSurface + ?Sized,
{
    let root = surface.create_node(NodeProps::new(Geometry::from_area(area)).color(Color::WHITE))?;
    let inner = area.inset(CONTAINER_INSET);
    let container = surface.create_node(
        NodeProps::new(Geometry::from_area(inner))
            .sizing(sizing)
            .color(Color::WHITE),
    )?;
    surface.add_child(root, container)?;
    Ok((root, container, inner))
}

/// Random position that keeps a child of `child` extent inside `parent`.
fn place<R: Rng + ?Sized>(rng: &mut R, parent: f32, child: f32) -> f32 {
    (rng.random::<f32>() * (parent - child)).floor()
}

/// `count` same-sized leaves scattered inside one container.
pub fn build_flat<S, R>(
    surface: &mut S,
    count: usize,
    leaf_size: f32,
    sizing: Sizing,
    area: Area,
    rng: &mut R,
) -> SurfaceResult<GeneratedTree>
where
    S: LayoutSurface + ?Sized,
    R: Rng + ?Sized,
{
    let (root, container, inner) = build_frame(surface, sizing, area)?;
    let mut ramp = ColorRamp::new(FLAT_COLOR_STEP);
    let mut candidates = Vec::with_capacity(count);

    for _ in 0..count {
        let geometry = Geometry::new(
            place(rng, inner.width, leaf_size),
            place(rng, inner.height, leaf_size),
            leaf_size,
            leaf_size,
        );
        let leaf = surface.create_node(NodeProps::new(geometry).color(ramp.next()))?;
        surface.add_child(container, leaf)?;
        candidates.push(leaf);
    }

    surface.attach_root(root)?;
    tracing::debug!("Generated flat tree with {} leaves", candidates.len());
    Ok(GeneratedTree {
        root,
        container,
        candidates,
    })
}

/// Balanced tree of `branching^1 + ... + branching^levels` test nodes.
///
/// Each child gets `1 / sqrt(branching)` of its parent's extent per
/// dimension, so the children of one parent cover roughly its area.
pub fn build_tree<S, R>(
    surface: &mut S,
    levels: u32,
    branching: u32,
    sizing: Sizing,
    area: Area,
    rng: &mut R,
) -> SurfaceResult<GeneratedTree>
where
    S: LayoutSurface + ?Sized,
    R: Rng + ?Sized,
{
    let (root, container, inner) = build_frame(surface, sizing, area)?;
    let mut ramp = ColorRamp::new(TREE_COLOR_STEP);
    let mut candidates = Vec::new();
    let shrink = (branching as f32).sqrt();

    // (parent, parent extent, levels left below parent)
    let mut pending = vec![(container, inner, levels)];
    while let Some((parent, extent, remaining)) = pending.pop() {
        if remaining == 0 {
            continue;
        }
        let child_extent = Area::new(extent.width / shrink, extent.height / shrink);
        let child_sizing = if remaining > 1 { sizing } else { Sizing::Fixed };

        for _ in 0..branching {
            let geometry = Geometry::new(
                place(rng, extent.width, child_extent.width),
                place(rng, extent.height, child_extent.height),
                child_extent.width,
                child_extent.height,
            );
            let child = surface.create_node(
                NodeProps::new(geometry)
                    .sizing(child_sizing)
                    .color(ramp.next()),
            )?;
            surface.add_child(parent, child)?;
            candidates.push(child);
            pending.push((child, child_extent, remaining - 1));
        }
    }

    surface.attach_root(root)?;
    tracing::debug!(
        "Generated tree with {} levels x {} children ({} test nodes)",
        levels,
        branching,
        candidates.len()
    );
    Ok(GeneratedTree {
        root,
        container,
        candidates,
    })
}
