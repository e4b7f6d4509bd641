mod config;
mod errors;
mod macros;

// For submodules I only expose the public API to the parent module

pub mod shared {
    pub mod logger;
}

pub mod storage {
    mod page;

    pub mod disk {
        mod disk_manager;
        #[cfg(test)]
        pub(crate) mod recording_disk;

        pub use disk_manager::{DiskBackend, DiskManager, SharedDisk};
    }

    pub mod buffer {
        mod buffer_pool;
        mod eviction;
        mod frame;
        mod lru_eviction;
        mod page_allocator;
        mod parallel_buffer_pool;

        pub use buffer_pool::BufferPoolManager;
        pub use eviction::EvictionPolicy;
        pub use frame::{FrameId, PageHandle};
        pub use lru_eviction::LruEvictionPolicy;
        pub use page_allocator::PageIdAllocator;
        pub use parallel_buffer_pool::ParallelBufferPool;
    }

    pub use buffer::{BufferPoolManager, PageHandle, ParallelBufferPool};
    pub use disk::{DiskBackend, DiskManager, SharedDisk};
    pub use page::{PageId, INVALID_PAGE_ID};
}

pub use config::{BufferPoolConfig, BUFFER_POOL_N_FRAMES, PAGE_SIZE};
pub use errors::BufferPoolError;
