//! Frame loop for layout surfaces

use std::cell::RefCell;
use std::time::Duration;
use strato_bench_core::{SurfaceConfig, SurfaceResult};
use tokio::time::{self, MissedTickBehavior};

use crate::surface::LayoutSurface;

/// Runs layout passes on a fixed frame interval.
///
/// The driver shares the surface with the harness through a `RefCell`. It
/// borrows the surface only for the duration of a single pass and never
/// across an await point.
#[derive(Debug, Clone, Copy)]
pub struct FrameDriver {
    interval: Duration,
}

impl FrameDriver {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &SurfaceConfig) -> Self {
        Self::new(config.frame_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a pass on every frame that has pending mutations.
    ///
    /// Never returns `Ok`. The future is meant to be raced against the work
    /// that depends on it and dropped when that work finishes.
    pub async fn run<S: LayoutSurface>(&self, surface: &RefCell<S>) -> SurfaceResult<()> {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames: u64 = 0;

        loop {
            ticker.tick().await;
            frames += 1;

            let mut guard = surface.borrow_mut();
            if !guard.needs_layout() {
                continue;
            }
            match guard.layout_pass() {
                Ok(pass) => {
                    tracing::trace!(
                        "Frame {}: {} nodes changed, {} notified",
                        frames,
                        pass.nodes_changed,
                        pass.notifications
                    );
                }
                Err(e) => {
                    tracing::error!("Layout pass failed on frame {}: {}", frames, e);
                    return Err(e);
                }
            }
        }
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::from_config(&SurfaceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LayoutSurface, TaffySurface};
    use strato_bench_core::{Geometry, NodeProps, SurfaceError};

    #[tokio::test]
    async fn test_driver_fires_subscriptions() {
        let mut surface = TaffySurface::new();
        let root = surface
            .create_node(NodeProps::new(Geometry::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        surface.attach_root(root).unwrap();
        let subscription = surface.on_layout_complete(root).unwrap();
        let surface = RefCell::new(surface);

        let driver = FrameDriver::new(Duration::from_millis(1));
        tokio::select! {
            result = driver.run(&surface) => panic!("driver stopped: {:?}", result),
            fired = subscription => assert!(fired.is_ok()),
        }
        assert_eq!(surface.borrow().pass_count(), 1);
    }

    #[tokio::test]
    async fn test_driver_propagates_pass_errors() {
        struct Broken;

        impl LayoutSurface for Broken {
            fn create_node(&mut self, _: NodeProps) -> SurfaceResult<strato_bench_core::NodeHandle> {
                Err(SurfaceError::NotAttached)
            }
            fn add_child(
                &mut self,
                _: strato_bench_core::NodeHandle,
                _: strato_bench_core::NodeHandle,
            ) -> SurfaceResult<()> {
                Ok(())
            }
            fn remove_child(
                &mut self,
                _: strato_bench_core::NodeHandle,
                _: strato_bench_core::NodeHandle,
            ) -> SurfaceResult<()> {
                Ok(())
            }
            fn attach_root(&mut self, _: strato_bench_core::NodeHandle) -> SurfaceResult<()> {
                Ok(())
            }
            fn children(
                &self,
                _: strato_bench_core::NodeHandle,
            ) -> SurfaceResult<&[strato_bench_core::NodeHandle]> {
                Ok(&[])
            }
            fn geometry(&self, _: strato_bench_core::NodeHandle) -> SurfaceResult<Geometry> {
                Ok(Geometry::default())
            }
            fn set_geometry(
                &mut self,
                _: strato_bench_core::NodeHandle,
                _: Geometry,
            ) -> SurfaceResult<()> {
                Ok(())
            }
            fn on_layout_complete(
                &mut self,
                _: strato_bench_core::NodeHandle,
            ) -> SurfaceResult<crate::LayoutSubscription> {
                Err(SurfaceError::NotAttached)
            }
            fn off_layout_complete(
                &mut self,
                _: strato_bench_core::NodeHandle,
                _: crate::SubscriptionId,
            ) -> SurfaceResult<bool> {
                Ok(false)
            }
            fn needs_layout(&self) -> bool {
                true
            }
            fn layout_pass(&mut self) -> SurfaceResult<crate::LayoutPass> {
                Err(SurfaceError::ComputationFailed {
                    reason: "broken".to_string(),
                })
            }
        }

        let surface = RefCell::new(Broken);
        let result = FrameDriver::new(Duration::from_millis(1)).run(&surface).await;
        assert!(matches!(result, Err(SurfaceError::ComputationFailed { .. })));
    }
}
