use std::sync::atomic::{AtomicUsize, Ordering};

use super::buffer_pool::BufferPoolManager;
use super::frame::PageHandle;
use crate::config::BufferPoolConfig;
use crate::errors::BufferPoolError;
use crate::storage::disk::{DiskBackend, SharedDisk};
use crate::storage::page::PageId;

/// Several buffer pool instances in front of one disk.
///
/// Page `p` always lives in instance `p % num_instances`, which is also the only
/// instance that allocates it. Each instance has its own lock, so operations on
/// pages of different instances do not wait for each other.
pub struct ParallelBufferPool {
    instances: Vec<BufferPoolManager>,
    /// Where the next `new_page` starts looking for room.
    next_instance: AtomicUsize,
}

impl ParallelBufferPool {
    pub fn new<D>(num_instances: u32, pool_size: usize, disk: D) -> Result<Self, BufferPoolError>
    where
        D: DiskBackend + Send + 'static,
    {
        let disk = SharedDisk::new(disk);
        let instances = (0..num_instances)
            .map(|index| {
                let config = BufferPoolConfig::partitioned(pool_size, num_instances, index);
                BufferPoolManager::new(config, disk.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        if instances.is_empty() {
            return Err(BufferPoolError::InvalidConfig(
                "num_instances must be at least 1".to_string(),
            ));
        }

        Ok(ParallelBufferPool {
            instances,
            next_instance: AtomicUsize::new(0),
        })
    }

    /// Asks every instance once, round robin, for a new page.
    pub fn new_page(&self) -> Result<PageHandle<'_>, BufferPoolError> {
        let n = self.instances.len();
        let start = self.next_instance.fetch_add(1, Ordering::Relaxed) % n;

        for offset in 0..n {
            match self.instances[(start + offset) % n].new_page() {
                Err(BufferPoolError::PoolExhausted) => continue,
                result => return result,
            }
        }

        log::debug!("every instance of the parallel buffer pool is full");
        Err(BufferPoolError::PoolExhausted)
    }

    pub fn fetch_page(&self, page_id: PageId) -> Result<PageHandle<'_>, BufferPoolError> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        self.instance_for(page_id).flush_page(page_id)
    }

    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        self.instance_for(page_id).delete_page(page_id)
    }

    /// Flushes every instance, returning the first failure.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let mut first_error = None;
        for instance in &self.instances {
            if let Err(err) = instance.flush_all_pages() {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The total number of frames across instances
    pub fn pool_size(&self) -> usize {
        self.instances.iter().map(BufferPoolManager::pool_size).sum()
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn instance_for(&self, page_id: PageId) -> &BufferPoolManager {
        &self.instances[page_id as usize % self.instances.len()]
    }
}
