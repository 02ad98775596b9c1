//! Render backend module
//!
//! The engine records GPU work as opaque "jobs" through the
//! `RenderBackend` trait and submits them in scheduler order. Backend
//! implementations own the real API objects; the engine only holds ids.

mod backend;
mod mock;

pub use backend::{
    CommandBufferId, CullMode, DepthMode, DrawCommand, JobDescriptor, JobId,
    RasterOrigin, RenderBackend, ShaderDescriptor, ShaderId, TextureDescriptor,
    TextureFormat, TextureId,
};
pub use mock::{MockBackend, MockEvent};
