/// CullInstancePool — bounded id pool for FrustumCull instances.
///
/// Stamp storage is addressed by instance id, so ids must stay below
/// `MAX_CULL_INSTANCES`. Dropping a FrustumCull returns its id to the
/// pool; exceeding the limit is a programming error and panics. Tests
/// create a fresh pool each, so no global state orders them.

use std::sync::Arc;
use parking_lot::Mutex;
use crate::engine_error;
use crate::utils::SlotAllocator;

/// Upper bound on concurrently live cull instances per pool.
pub const MAX_CULL_INSTANCES: usize = 64;

/// Shareable handle to a pool of cull instance ids.
#[derive(Clone)]
pub struct CullInstancePool {
    slots: Arc<Mutex<SlotAllocator>>,
}

impl CullInstancePool {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(SlotAllocator::new())),
        }
    }

    /// Number of currently live instances.
    pub fn live_instances(&self) -> usize {
        self.slots.lock().len() as usize
    }

    /// Take an id.
    ///
    /// # Panics
    ///
    /// When `MAX_CULL_INSTANCES` instances are already live.
    pub(crate) fn acquire(&self) -> u32 {
        let mut slots = self.slots.lock();
        if slots.len() as usize >= MAX_CULL_INSTANCES {
            engine_error!(
                "pulsar::CullInstancePool",
                "cull instance limit ({}) exceeded",
                MAX_CULL_INSTANCES
            );
            panic!("cull instance pool exhausted");
        }
        slots.alloc()
    }

    /// Return an id for reuse.
    pub(crate) fn release(&self, id: u32) {
        self.slots.lock().free(id);
    }
}

impl Default for CullInstancePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "instance_pool_tests.rs"]
mod tests;
