//! Rendering layer.
//!
//! Renderer-facing context types, texture resources, and the batched
//! refraction renderer.

mod ctx;
mod framebuffer;
mod texture;

pub mod refract;

pub use ctx::{RenderCtx, RenderTarget};
pub use framebuffer::FrameCapture;
pub use texture::{Texture, TextureSink};
