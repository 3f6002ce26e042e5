//! Layout surfaces for the Strato layout benchmark suite
//!
//! A [`LayoutSurface`] hosts a tree of positioned nodes, computes layout
//! asynchronously and reports layout completion per node through one-shot
//! [`LayoutSubscription`]s. [`TaffySurface`] is the Taffy-backed
//! implementation and [`FrameDriver`] is the frame loop that runs its passes.

pub mod driver;
pub mod subscription;
pub mod surface;
pub mod taffy_surface;

pub use driver::FrameDriver;
pub use subscription::{LayoutNotifier, LayoutSubscription, SubscriptionId};
pub use surface::{LayoutPass, LayoutSurface};
pub use taffy_surface::TaffySurface;
