use crate::errors::BufferPoolError;
use crate::storage::page::{PageId, INVALID_PAGE_ID};

/// Hands out page ids `instance_index, instance_index + n, instance_index + 2n, ...`
/// so that `n` buffer pools sharing one disk never allocate the same id.
#[derive(Debug)]
pub struct PageIdAllocator {
    next_page_id: Option<PageId>,
    num_instances: u32,
    instance_index: u32,
    deallocated: u64,
}

impl PageIdAllocator {
    pub fn new(num_instances: u32, instance_index: u32) -> Self {
        assert!(num_instances > 0, "num_instances must be greater than 0");
        assert!(
            instance_index < num_instances,
            "instance_index must be lower than num_instances"
        );
        PageIdAllocator {
            next_page_id: Some(instance_index),
            num_instances,
            instance_index,
            deallocated: 0,
        }
    }

    pub fn allocate(&mut self) -> Result<PageId, BufferPoolError> {
        let page_id = self
            .next_page_id
            .filter(|id| *id != INVALID_PAGE_ID)
            .ok_or(BufferPoolError::PageIdsExhausted)?;
        self.next_page_id = page_id.checked_add(self.num_instances);

        debug_assert!(self.owns(page_id), "allocated page ids map back to this instance");
        Ok(page_id)
    }

    /// Page ids are never reused, this only keeps count.
    pub fn deallocate(&mut self, page_id: PageId) {
        log::trace!("deallocating page_id={page_id}");
        self.deallocated += 1;
    }

    pub fn owns(&self, page_id: PageId) -> bool {
        page_id % self.num_instances == self.instance_index
    }

    pub fn deallocated(&self) -> u64 {
        self.deallocated
    }
}
