//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - headless (surface-less) contexts for offscreen rendering and CI

mod gpu;
mod headless;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use headless::{HeadlessGpu, OffscreenTarget};
