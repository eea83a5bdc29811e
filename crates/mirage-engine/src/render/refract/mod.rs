//! Batched refraction sprite renderer.
//!
//! Draws a fixed-capacity set of textured rects in a single indexed draw
//! call. Each fragment can displace, stretch, and mirror a sample of the
//! current framebuffer snapshot according to a refraction map (see
//! [`channel`] for the byte protocol).
//!
//! The CPU side keeps a staging copy of the vertex buffer so that edits to a
//! few rects upload only the affected byte range.

mod batch;
mod descriptor;
mod encode;

pub mod channel;

pub use batch::{BatchError, FrameInputs, RefractBatch};
pub use descriptor::RectSprite;
pub use encode::RectVertex;
