//! Round mutations
//!
//! Each round toggles the root size by `±root_offset` and shifts every
//! selected node by a random offset. Mutations only mark the surface dirty.
//! The surface picks them up on its next frame.

use rand::Rng;
use std::time::Instant;
use strato_bench_core::{BenchConfig, NodeHandle, SurfaceResult};
use strato_bench_surface::LayoutSurface;

use crate::selector::Selection;

/// Random shift with magnitude in `[min, min + spread)` and the given sign.
pub fn offset_delta<R: Rng + ?Sized>(rng: &mut R, min: f32, spread: f32, sign: f32) -> f32 {
    sign * (rng.random::<f32>() * spread + min)
}

#[derive(Debug, Clone)]
pub struct Mutator {
    offset_min: f32,
    offset_spread: f32,
    /// Signed amount added to the root size on the next round
    root_offset: f32,
}

impl Mutator {
    pub fn new(offset_min: f32, offset_spread: f32, root_offset: f32) -> Self {
        Self {
            offset_min,
            offset_spread,
            // First round shrinks the root
            root_offset: -root_offset.abs(),
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(config.offset_min, config.offset_spread, config.root_offset)
    }

    /// Root size change the next round will apply.
    pub fn next_root_offset(&self) -> f32 {
        self.root_offset
    }

    /// Issue one round of mutations. Returns the mutation-issue instant.
    pub fn apply<S, R>(
        &mut self,
        surface: &mut S,
        root: NodeHandle,
        selection: &Selection,
        rng: &mut R,
    ) -> SurfaceResult<Instant>
    where
        S: LayoutSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let start = surface.now();

        let resized = surface.geometry(root)?.resized_by(self.root_offset);
        surface.set_geometry(root, resized)?;
        self.root_offset = -self.root_offset;

        for node in &selection.to_change {
            let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let dx = offset_delta(rng, self.offset_min, self.offset_spread, sign);
            let dy = offset_delta(rng, self.offset_min, self.offset_spread, sign);
            let moved = surface.geometry(*node)?.shifted_floor(dx, dy);
            surface.set_geometry(*node, moved)?;
        }

        Ok(start)
    }
}
