/// RenderBackend — the GPU job seam.
///
/// A job is a pre-created render pass the engine fills with draws each
/// frame (`begin_job` / `draw` / `end_job`) and hands to the GPU with
/// `submit`. The schedulers guarantee submission order; the backend is
/// free to record jobs on any thread.

use crate::error::Result;

/// Opaque handle to a backend texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Opaque handle to a backend shader variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Opaque handle to a recorded GPU job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u32);

/// Per-frame command buffer slot, owned by the caller's frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u32);

/// Depth range convention of the backend's clip space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    ZeroToOne,
    NegativeOneToOne,
}

/// Where the backend puts the raster origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterOrigin {
    UpperLeft,
    LowerLeft,
}

/// Depth texture formats used by the shadow passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Depth16,
    Depth24,
    Depth32F,
}

/// Rasterizer face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    Back,
    None,
}

/// Description of a (possibly layered) texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Array layers (> 1 for cascade arrays)
    pub layers: u32,
    pub format: TextureFormat,
}

/// Description of a shader variant.
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    pub name: String,
    /// Preprocessor defines selecting the variant
    pub defines: Vec<String>,
}

/// Description of a render job (one render pass).
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub name: String,
    /// Depth attachment and array layer, if the job renders depth
    pub depth_target: Option<(TextureId, u32)>,
}

/// A single draw recorded into a job.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub shader: ShaderId,
    pub cull_mode: CullMode,
    /// Push constant bytes (matrices packed with bytemuck)
    pub constants: Vec<u8>,
}

/// Backend factory and recording interface.
///
/// Creation methods can fail and return `Result`; recording methods are
/// infallible by contract (a backend that cannot record has already
/// failed creation).
pub trait RenderBackend: Send + Sync {
    /// Clip-space depth convention (feeds the shadow bias matrix)
    fn depth_mode(&self) -> DepthMode;

    /// Raster origin convention (feeds the shadow bias matrix)
    fn raster_origin(&self) -> RasterOrigin;

    fn create_texture(&self, desc: &TextureDescriptor) -> Result<TextureId>;

    fn create_shader(&self, desc: &ShaderDescriptor) -> Result<ShaderId>;

    fn create_job(&self, desc: &JobDescriptor) -> Result<JobId>;

    /// Start re-recording a job into a frame's command buffer.
    fn begin_job(&self, job: JobId, command_buffer: CommandBufferId);

    /// Record one draw into an open job.
    fn draw(&self, job: JobId, draw: &DrawCommand);

    /// Finish recording a job.
    fn end_job(&self, job: JobId);

    /// Hand a recorded job to the GPU. Submission order is the
    /// scheduler's contract; the backend must preserve it.
    fn submit(&self, job: JobId);
}
