use crate::errors::BufferPoolError;
use crate::macros::static_assert;

/// The size (in bytes) of a page in the buffer pool
pub const PAGE_SIZE: usize = 4096;

/// The number of frames in the buffer pool.
/// The more frames, the more pages we can cache in memory. Increasing this value
/// will generally improve performance, but will also increase memory usage.
pub const BUFFER_POOL_N_FRAMES: usize = 69;

/// Used by the logger to shorten module paths
pub const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");

static_assert!(PAGE_SIZE % 8 == 0);
static_assert!(BUFFER_POOL_N_FRAMES > 0, "the default pool must have frames");

/// Construction parameters of a single buffer pool instance.
///
/// `num_instances` and `instance_index` only matter when several instances share
/// one disk: each instance then allocates page ids congruent to its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    pub pool_size: usize,
    pub num_instances: u32,
    pub instance_index: u32,
}

impl BufferPoolConfig {
    pub fn new(pool_size: usize) -> Self {
        BufferPoolConfig {
            pool_size,
            num_instances: 1,
            instance_index: 0,
        }
    }

    pub fn partitioned(pool_size: usize, num_instances: u32, instance_index: u32) -> Self {
        BufferPoolConfig {
            pool_size,
            num_instances,
            instance_index,
        }
    }

    pub fn validate(&self) -> Result<(), BufferPoolError> {
        if self.pool_size == 0 {
            return Err(BufferPoolError::InvalidConfig(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if self.num_instances == 0 {
            return Err(BufferPoolError::InvalidConfig(
                "num_instances must be at least 1".to_string(),
            ));
        }
        if self.instance_index >= self.num_instances {
            return Err(BufferPoolError::InvalidConfig(format!(
                "instance_index={} out of range for num_instances={}",
                self.instance_index, self.num_instances
            )));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        BufferPoolConfig::new(BUFFER_POOL_N_FRAMES)
    }
}
