/*!
# Pulsar Bench Engine

Core scene-processing engine of the Pulsar GPU benchmark.

This crate implements the CPU side of a frame: room/portal visibility
determination, cascaded shadow map fitting, and an ordered task
scheduler that keeps GPU job submission deterministic across execution
strategies. GPU work goes through the `RenderBackend` trait; backends
own the real API objects and the engine only holds ids.

## Architecture

- **Scheduler**: ordered frame tasks, single-threaded or worker-pool execution
- **FrustumCull**: portal traversal, PVS pruning, mesh bucketing and sorting
- **CascadedShadowMap**: frustum slicing and light camera fitting
- **SceneGraph**: rooms, portals, meshes, actors, lights, probes
- **RenderBackend**: the seam a real GPU backend implements

Benchmark scenes drive these pieces directly; nothing here owns a window
or a swapchain.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod camera;
pub mod cull;
pub mod renderer;
pub mod scene;
pub mod scheduler;
pub mod shadow;
pub mod utils;

// Main pulsar namespace module
pub mod pulsar {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Visibility sub-module
    pub mod cull {
        pub use crate::cull::*;
    }

    // Render backend sub-module
    pub mod render {
        pub use crate::renderer::*;
    }

    // Scheduling sub-module
    pub mod scheduler {
        pub use crate::scheduler::*;
    }

    // Shadow mapping sub-module
    pub mod shadow {
        pub use crate::shadow::*;
    }
}

// Re-export math library at crate root
pub use glam;
