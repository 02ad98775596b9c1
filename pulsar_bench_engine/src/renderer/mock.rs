/// MockBackend — a recording backend for tests.
///
/// Creation returns sequential ids, recording appends events, nothing
/// touches a GPU. Tests assert on the recorded event stream, most often
/// the submission order.

use parking_lot::Mutex;
use crate::error::Result;
use super::backend::{
    CommandBufferId, DepthMode, DrawCommand, JobDescriptor, JobId, RasterOrigin,
    RenderBackend, ShaderDescriptor, ShaderId, TextureDescriptor, TextureId,
};

/// One recorded backend call.
#[derive(Debug, Clone)]
pub enum MockEvent {
    Begin(JobId, CommandBufferId),
    Draw(JobId, DrawCommand),
    End(JobId),
    Submit(JobId),
}

#[derive(Default)]
struct MockState {
    textures: Vec<TextureDescriptor>,
    shaders: Vec<ShaderDescriptor>,
    jobs: Vec<JobDescriptor>,
    events: Vec<MockEvent>,
}

/// Recording backend. Cheap to share behind an `Arc`.
pub struct MockBackend {
    depth_mode: DepthMode,
    raster_origin: RasterOrigin,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_caps(DepthMode::ZeroToOne, RasterOrigin::UpperLeft)
    }

    pub fn with_caps(depth_mode: DepthMode, raster_origin: RasterOrigin) -> Self {
        Self {
            depth_mode,
            raster_origin,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Jobs submitted so far, in submission order.
    pub fn submissions(&self) -> Vec<JobId> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Submit(job) => Some(*job),
                _ => None,
            })
            .collect()
    }

    /// Draws recorded into one job, in recording order.
    pub fn draws(&self, job: JobId) -> Vec<DrawCommand> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Draw(j, draw) if *j == job => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Full event stream.
    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().events.clone()
    }

    pub fn texture_descriptor(&self, id: TextureId) -> Option<TextureDescriptor> {
        self.state.lock().textures.get(id.0 as usize).cloned()
    }

    pub fn shader_descriptor(&self, id: ShaderId) -> Option<ShaderDescriptor> {
        self.state.lock().shaders.get(id.0 as usize).cloned()
    }

    pub fn job_descriptor(&self, id: JobId) -> Option<JobDescriptor> {
        self.state.lock().jobs.get(id.0 as usize).cloned()
    }

    pub fn texture_count(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn shader_count(&self) -> usize {
        self.state.lock().shaders.len()
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Drop recorded events (keeps created resources).
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for MockBackend {
    fn depth_mode(&self) -> DepthMode {
        self.depth_mode
    }

    fn raster_origin(&self) -> RasterOrigin {
        self.raster_origin
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> Result<TextureId> {
        let mut state = self.state.lock();
        let index = state.textures.len() as u32;
        state.textures.push(desc.clone());
        Ok(TextureId(index))
    }

    fn create_shader(&self, desc: &ShaderDescriptor) -> Result<ShaderId> {
        let mut state = self.state.lock();
        let index = state.shaders.len() as u32;
        state.shaders.push(desc.clone());
        Ok(ShaderId(index))
    }

    fn create_job(&self, desc: &JobDescriptor) -> Result<JobId> {
        let mut state = self.state.lock();
        let index = state.jobs.len() as u32;
        state.jobs.push(desc.clone());
        Ok(JobId(index))
    }

    fn begin_job(&self, job: JobId, command_buffer: CommandBufferId) {
        self.state.lock().events.push(MockEvent::Begin(job, command_buffer));
    }

    fn draw(&self, job: JobId, draw: &DrawCommand) {
        self.state.lock().events.push(MockEvent::Draw(job, draw.clone()));
    }

    fn end_job(&self, job: JobId) {
        self.state.lock().events.push(MockEvent::End(job));
    }

    fn submit(&self, job: JobId) {
        self.state.lock().events.push(MockEvent::Submit(job));
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
