use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::buffer_pool::BufferPoolManager;
use crate::config::PAGE_SIZE;
use crate::errors::BufferPoolError;
use crate::storage::page::{PageId, INVALID_PAGE_ID};

/// The Buffer Pool frame id for internal use only. It is not associated with the page id.
pub type FrameId = usize;

/// The bytes of one frame. Heap allocated, of size PAGE_SIZE.
///
/// It is only guaranteed to contain valid page data while the frame's header
/// holds a valid page id.
pub struct Frame {
    data: RwLock<Box<[u8]>>,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            data: RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice()),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

/// Frame metadata. Only read or written with the buffer pool lock held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub page_id: PageId,
    /// How many handles are accessing this page. A page can only be evicted if pin_count is 0.
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl FrameHeader {
    pub fn empty() -> Self {
        FrameHeader {
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            is_dirty: false,
        }
    }

    pub fn reset(&mut self) {
        *self = FrameHeader::empty();
    }
}

/// One pin on a resident page.
///
/// The page stays in memory for as long as the handle lives. Dropping the handle
/// unpins the page, marking it dirty if it was written through this handle.
/// Do not call into the buffer pool while holding a guard returned by
/// [`PageHandle::read`] or [`PageHandle::write`].
pub struct PageHandle<'a> {
    pool: &'a BufferPoolManager,
    page_id: PageId,
    frame_id: FrameId,
    is_dirty: bool,
    released: bool,
}

impl<'a> PageHandle<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, page_id: PageId, frame_id: FrameId) -> Self {
        PageHandle {
            pool,
            page_id,
            frame_id,
            is_dirty: false,
            released: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.pool.frame(self.frame_id).read()
    }

    /// Exclusive access to the page bytes. The page will be unpinned as dirty.
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.is_dirty = true;
        self.pool.frame(self.frame_id).write()
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Unpins the page now and reports whether the unpin was accepted.
    pub fn release(mut self) -> Result<(), BufferPoolError> {
        self.released = true;
        self.pool.unpin_page(self.page_id, self.is_dirty)
    }
}

impl fmt::Debug for PageHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .field("is_dirty", &self.is_dirty)
            .finish()
    }
}

impl Drop for PageHandle<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.pool.unpin_page(self.page_id, self.is_dirty) {
            log::error!("dropping handle of page_id={}: {err}", self.page_id);
        }
    }
}
