use super::eviction::EvictionPolicy;
use super::frame::{Frame, FrameHeader, FrameId, PageHandle};
use super::lru_eviction::LruEvictionPolicy;
use super::page_allocator::PageIdAllocator;
use crate::config::BufferPoolConfig;
use crate::errors::BufferPoolError;
use crate::storage::disk::DiskBackend;
use crate::storage::page::{PageId, INVALID_PAGE_ID, THE_EMPTY_PAGE};

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Everything the pool lock protects.
struct PoolState {
    /// Metadata of every frame, indexed by frame id.
    frame_table: Vec<FrameHeader>,
    /// Maps page id to buffer pool frame id. Only resident pages have an entry.
    page_directory: HashMap<PageId, FrameId>,
    /// Frames holding no page. Getting a free frame is O(1).
    free_list: VecDeque<FrameId>,
    allocator: PageIdAllocator,
    disk: Box<dyn DiskBackend + Send>,
}

/// # Design principles
///
/// - One lock: every operation runs to completion under the pool lock, disk I/O included.
/// - The pool owns the pin counts. The eviction policy only learns when a frame
///   becomes evictable or stops being evictable.
/// - Callers never see frames, only [`PageHandle`]s. Dropping a handle is how a page
///   gets unpinned.
///
/// Lock order is pool -> eviction policy, pool -> frame bytes, pool -> disk.
pub struct BufferPoolManager {
    /// The size of the buffer pool in number of frames
    pool_size: usize,
    /// The bytes of every frame. Locked individually so pinned pages can be used
    /// without holding the pool lock.
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    /// The eviction policy to use when the buffer pool is full.
    eviction_policy: Box<dyn EvictionPolicy + Send + Sync>,
}

impl BufferPoolManager {
    /// Creates a buffer pool with an LRU eviction policy
    pub fn new<D>(config: BufferPoolConfig, disk: D) -> Result<Self, BufferPoolError>
    where
        D: DiskBackend + Send + 'static,
    {
        let policy = LruEvictionPolicy::new(config.pool_size);
        Self::with_policy(config, disk, policy)
    }

    pub fn with_policy<D, P>(
        config: BufferPoolConfig,
        disk: D,
        eviction_policy: P,
    ) -> Result<Self, BufferPoolError>
    where
        D: DiskBackend + Send + 'static,
        P: EvictionPolicy + Send + Sync + 'static,
    {
        config.validate()?;
        let pool_size = config.pool_size;

        log::debug!(
            "allocating buffer pool of {pool_size} frames (instance {} of {})",
            config.instance_index,
            config.num_instances
        );
        let frames = (0..pool_size).map(|_| Frame::new()).collect();

        let state = PoolState {
            frame_table: vec![FrameHeader::empty(); pool_size],
            page_directory: HashMap::with_capacity(pool_size),
            free_list: (0..pool_size).collect(),
            allocator: PageIdAllocator::new(config.num_instances, config.instance_index),
            disk: Box::new(disk),
        };

        Ok(BufferPoolManager {
            pool_size,
            frames,
            state: Mutex::new(state),
            eviction_policy: Box::new(eviction_policy),
        })
    }

    /// Allocates a fresh zeroed page and returns it pinned.
    ///
    /// Fails with `PoolExhausted` when every frame is pinned. A failed call does not
    /// consume a page id.
    pub fn new_page(&self) -> Result<PageHandle<'_>, BufferPoolError> {
        let mut state = self.lock();
        let frame_id = self.acquire_frame(&mut state)?;

        let page_id = match state.allocator.allocate() {
            Ok(page_id) => page_id,
            Err(err) => {
                state.free_list.push_front(frame_id);
                return Err(err);
            }
        };

        self.frames[frame_id].write().copy_from_slice(&THE_EMPTY_PAGE);
        state.frame_table[frame_id] = FrameHeader {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
        state.page_directory.insert(page_id, frame_id);
        self.eviction_policy.mark_ineligible(frame_id);

        log::trace!("new page_id={page_id} in frame_id={frame_id}");
        Ok(PageHandle::new(self, page_id, frame_id))
    }

    /// Returns the page pinned, reading it from disk if it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageHandle<'_>, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId);
        }

        let mut state = self.lock();

        if let Some(&frame_id) = state.page_directory.get(&page_id) {
            log::trace!("found page_id={page_id} in frame_id={frame_id}");
            state.frame_table[frame_id].pin_count += 1;
            self.eviction_policy.mark_ineligible(frame_id);
            return Ok(PageHandle::new(self, page_id, frame_id));
        }

        log::trace!("page_id={page_id} not found in buffer pool. Fetching from disk");
        let frame_id = self.acquire_frame(&mut state)?;

        {
            let mut data = self.frames[frame_id].write();
            if let Err(err) = state.disk.read_page(page_id, &mut data[..]) {
                log::warn!("reading page_id={page_id} failed: {err}");
                state.free_list.push_front(frame_id);
                return Err(err.into());
            }
        }

        state.frame_table[frame_id] = FrameHeader {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
        state.page_directory.insert(page_id, frame_id);
        self.eviction_policy.mark_ineligible(frame_id);

        log::trace!("loaded page_id={page_id} into frame_id={frame_id}");
        Ok(PageHandle::new(self, page_id, frame_id))
    }

    /// Drops one pin. `is_dirty` is sticky: a dirty page stays dirty until flushed.
    pub(crate) fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        let mut state = self.lock();
        let frame_id = *state
            .page_directory
            .get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;

        let header = &mut state.frame_table[frame_id];
        if header.pin_count == 0 {
            return Err(BufferPoolError::PageNotPinned(page_id));
        }

        header.is_dirty |= is_dirty;
        header.pin_count -= 1;
        if header.pin_count == 0 {
            self.eviction_policy.mark_eligible(frame_id);
        }
        Ok(())
    }

    /// Writes the page to disk if it is dirty. Flushing a clean page is a no-op.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId);
        }

        let mut state = self.lock();
        let frame_id = *state
            .page_directory
            .get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;

        self.flush_frame(&mut state, frame_id)?;
        Ok(())
    }

    /// Writes every dirty resident page to disk.
    ///
    /// Every page is attempted even if some writes fail; the first failure is returned.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let mut state = self.lock();
        let mut first_error = None;

        for frame_id in 0..self.pool_size {
            let header = state.frame_table[frame_id];
            if header.page_id == INVALID_PAGE_ID || !header.is_dirty {
                continue;
            }
            if let Err(err) = self.flush_frame(&mut state, frame_id) {
                log::warn!("flushing page_id={} failed: {err}", header.page_id);
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

    /// Removes the page from the buffer pool. Deleting a page that is not resident
    /// succeeds. A pinned page cannot be deleted.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.lock();
        state.allocator.deallocate(page_id);

        let Some(&frame_id) = state.page_directory.get(&page_id) else {
            return Ok(());
        };
        if state.frame_table[frame_id].pin_count != 0 {
            return Err(BufferPoolError::PagePinned(page_id));
        }

        // The bytes are left as they are, they are cleared when the frame is reused.
        state.frame_table[frame_id].reset();
        state.page_directory.remove(&page_id);
        state.free_list.push_front(frame_id);
        self.eviction_policy.forget(frame_id);

        log::trace!("deleted page_id={page_id}, frame_id={frame_id} is free");
        Ok(())
    }

    /// Takes a frame from the free list, or evicts one. The returned frame is
    /// unmapped and clean.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.eviction_policy.select_victim() else {
            log::debug!("buffer pool is full. All {} frames are pinned", self.pool_size);
            return Err(BufferPoolError::PoolExhausted);
        };

        let victim = state.frame_table[frame_id];
        debug_assert_eq!(victim.pin_count, 0, "evicted a pinned frame");
        log::trace!("evicting page_id={} from frame_id={frame_id}", victim.page_id);

        if victim.is_dirty {
            let written = {
                let data = self.frames[frame_id].read();
                state.disk.write_page(victim.page_id, &data[..])
            };
            if let Err(err) = written {
                log::warn!("writing back page_id={} failed: {err}", victim.page_id);
                // Still resident and unpinned
                self.eviction_policy.mark_eligible(frame_id);
                return Err(err.into());
            }
        }

        state.page_directory.remove(&victim.page_id);
        state.frame_table[frame_id].reset();
        Ok(frame_id)
    }

    /// Returns whether a write happened.
    fn flush_frame(&self, state: &mut PoolState, frame_id: FrameId) -> Result<bool, BufferPoolError> {
        let header = state.frame_table[frame_id];
        if !header.is_dirty {
            return Ok(false);
        }

        {
            let data = self.frames[frame_id].read();
            state.disk.write_page(header.page_id, &data[..])?;
        }
        state.frame_table[frame_id].is_dirty = false;

        log::trace!("flushed page_id={} from frame_id={frame_id}", header.page_id);
        Ok(true)
    }

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id]
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The size of the buffer pool in number of frames
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.lock().free_list.len()
    }

    pub fn resident_page_count(&self) -> usize {
        self.lock().page_directory.len()
    }

    pub fn evictable_frame_count(&self) -> usize {
        let _state = self.lock();
        self.eviction_policy.size()
    }

    /// The pin count of a resident page, None if the page is not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.lock();
        let frame_id = *state.page_directory.get(&page_id)?;
        Some(state.frame_table[frame_id].pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.lock();
        let frame_id = *state.page_directory.get(&page_id)?;
        Some(state.frame_table[frame_id].is_dirty)
    }
}

#[cfg(test)]
impl BufferPoolManager {
    /// Panics if the pool bookkeeping is inconsistent.
    pub(crate) fn check_invariants(&self) {
        let state = self.lock();

        assert_eq!(
            state.free_list.len() + state.page_directory.len(),
            self.pool_size,
            "every frame is either free or holds a page"
        );

        for &frame_id in state.free_list.iter() {
            assert_eq!(state.frame_table[frame_id].page_id, INVALID_PAGE_ID);
            assert!(!self.eviction_policy.is_eligible(frame_id));
        }

        let mut evictable = 0;
        for (&page_id, &frame_id) in state.page_directory.iter() {
            let header = state.frame_table[frame_id];
            assert_eq!(header.page_id, page_id, "directory points to the wrong frame");
            assert!(!state.free_list.contains(&frame_id));
            assert_eq!(
                header.pin_count == 0,
                self.eviction_policy.is_eligible(frame_id),
                "page_id={page_id} pin_count={} disagrees with the eviction policy",
                header.pin_count
            );
            if header.pin_count == 0 {
                evictable += 1;
            }
        }
        assert_eq!(evictable, self.eviction_policy.size());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_SIZE;
    use crate::shared::logger::setup_logger;
    use crate::storage::disk::recording_disk::RecordingDisk;
    use crate::storage::disk::{DiskManager, SharedDisk};
    use std::io::Cursor;

    fn recording_pool(pool_size: usize) -> (BufferPoolManager, SharedDisk<RecordingDisk>) {
        setup_logger();
        let disk = SharedDisk::new(RecordingDisk::default());
        let bpm = BufferPoolManager::new(BufferPoolConfig::new(pool_size), disk.clone()).unwrap();
        (bpm, disk)
    }

    #[test]
    fn test_pool_of_two() {
        let (bpm, disk) = recording_pool(2);

        let page0 = bpm.new_page().unwrap();
        let page1 = bpm.new_page().unwrap();
        assert_eq!(page0.page_id(), 0);
        assert_eq!(page1.page_id(), 1);

        assert!(matches!(bpm.new_page(), Err(BufferPoolError::PoolExhausted)));
        bpm.check_invariants();

        page0.release().unwrap();

        // Reuses the frame of page 0. Page 0 was clean so nothing is written.
        let page2 = bpm.new_page().unwrap();
        assert_eq!(page2.page_id(), 2, "a failed new_page does not consume an id");
        assert_eq!(page2.frame_id(), 0);
        assert_eq!(bpm.pin_count(0), None);
        assert!(disk.with(|disk| disk.writes.is_empty()));

        drop(page1);
        drop(page2);
        bpm.check_invariants();
    }

    #[test]
    fn test_no_eviction_under_pin() {
        let (bpm, _disk) = recording_pool(3);

        let pinned = bpm.new_page().unwrap();
        for _ in 0..10 {
            // The two other frames keep being recycled
            let a = bpm.new_page().unwrap();
            let b = bpm.new_page().unwrap();
            assert!(matches!(bpm.new_page(), Err(BufferPoolError::PoolExhausted)));
            drop(a);
            drop(b);
        }

        assert_eq!(bpm.pin_count(pinned.page_id()), Some(1));
        bpm.check_invariants();
    }

    #[test]
    fn test_lru_victim_order() {
        let (bpm, _disk) = recording_pool(3);

        let a = bpm.new_page().unwrap();
        let b = bpm.new_page().unwrap();
        let c = bpm.new_page().unwrap();
        let (a_id, b_id, c_id) = (a.page_id(), b.page_id(), c.page_id());

        // Unpinned in order C, A, B
        drop(c);
        drop(a);
        drop(b);
        assert_eq!(bpm.evictable_frame_count(), 3);

        let _d = bpm.new_page().unwrap();
        assert_eq!(bpm.pin_count(c_id), None);
        assert_eq!(bpm.pin_count(a_id), Some(0));
        assert_eq!(bpm.pin_count(b_id), Some(0));

        let _e = bpm.new_page().unwrap();
        assert_eq!(bpm.pin_count(a_id), None);
        assert_eq!(bpm.pin_count(b_id), Some(0));

        let _f = bpm.new_page().unwrap();
        assert_eq!(bpm.pin_count(b_id), None);
        assert_eq!(bpm.evictable_frame_count(), 0);
        bpm.check_invariants();
    }

    #[test]
    fn test_repin_refreshes_recency() {
        let (bpm, _disk) = recording_pool(2);

        let a_id = bpm.new_page().unwrap().page_id();
        let b_id = bpm.new_page().unwrap().page_id();

        // A is used again, so B has been unpinned the longest
        drop(bpm.fetch_page(a_id).unwrap());

        let _c = bpm.new_page().unwrap();
        assert_eq!(bpm.pin_count(b_id), None);
        assert_eq!(bpm.pin_count(a_id), Some(0));
    }

    #[test]
    fn test_dirty_write_back() {
        let (bpm, disk) = recording_pool(1);

        let mut page = bpm.new_page().unwrap();
        let page_id = page.page_id();
        let data = b"A test string.";
        page.write()[0..data.len()].copy_from_slice(data);
        drop(page);
        assert_eq!(bpm.is_dirty(page_id), Some(true));

        // Evicts the dirty page
        let other = bpm.new_page().unwrap();
        assert_ne!(other.page_id(), page_id);

        disk.with(|disk| {
            assert_eq!(disk.writes.len(), 1);
            let (written_id, written) = &disk.writes[0];
            assert_eq!(*written_id, page_id);
            assert_eq!(&written[0..data.len()], data);
            assert!(written[data.len()..].iter().all(|b| *b == 0));
        });

        // The new page starts zeroed even though the frame held data
        assert!(other.read().iter().all(|b| *b == 0));
        drop(other);

        // Reading the page back brings the written bytes in
        let page = bpm.fetch_page(page_id).unwrap();
        assert_eq!(&page.read()[0..data.len()], data);
        assert_eq!(bpm.is_dirty(page_id), Some(false));
        drop(page);

        // The other page was never written to, evicting it costs nothing
        assert_eq!(disk.with(|disk| disk.writes.len()), 1);
    }

    #[test]
    fn test_fetch_resident_page() {
        let (bpm, disk) = recording_pool(4);

        let page_id = bpm.new_page().unwrap().page_id();

        let first = bpm.fetch_page(page_id).unwrap();
        let second = bpm.fetch_page(page_id).unwrap();
        assert_eq!(first.frame_id(), second.frame_id());
        assert_eq!(bpm.pin_count(page_id), Some(2));
        assert_eq!(bpm.evictable_frame_count(), 0);

        drop(first);
        assert_eq!(bpm.pin_count(page_id), Some(1));
        assert_eq!(bpm.evictable_frame_count(), 0);
        drop(second);
        assert_eq!(bpm.pin_count(page_id), Some(0));
        assert_eq!(bpm.evictable_frame_count(), 1);

        // Resident pages are never read from disk
        assert!(disk.with(|disk| disk.reads.is_empty()));
        bpm.check_invariants();
    }

    #[test]
    fn test_fetch_from_disk() {
        let (bpm, disk) = recording_pool(2);
        disk.with(|disk| {
            disk.pages.insert(7, vec![7u8; PAGE_SIZE]);
        });

        let page = bpm.fetch_page(7).unwrap();
        assert!(page.read().iter().all(|b| *b == 7));
        assert_eq!(bpm.pin_count(7), Some(1));
        assert_eq!(disk.with(|disk| disk.reads.clone()), vec![7]);

        assert!(matches!(
            bpm.fetch_page(INVALID_PAGE_ID),
            Err(BufferPoolError::InvalidPageId)
        ));

        // A fetch also fails when everything is pinned
        let _other = bpm.new_page().unwrap();
        assert!(matches!(bpm.fetch_page(9), Err(BufferPoolError::PoolExhausted)));
        bpm.check_invariants();
    }

    #[test]
    fn test_unpin_errors() {
        let (bpm, _disk) = recording_pool(2);

        assert!(matches!(
            bpm.unpin_page(42, false),
            Err(BufferPoolError::PageNotFound(42))
        ));

        let page = bpm.new_page().unwrap();
        let page_id = page.page_id();
        page.release().unwrap();

        assert!(matches!(
            bpm.unpin_page(page_id, true),
            Err(BufferPoolError::PageNotPinned(id)) if id == page_id
        ));
        // A failed unpin does not touch the dirty flag
        assert_eq!(bpm.is_dirty(page_id), Some(false));
        bpm.check_invariants();
    }

    #[test]
    fn test_dirty_flag_is_sticky() {
        let (bpm, _disk) = recording_pool(2);

        let mut writer = bpm.new_page().unwrap();
        let page_id = writer.page_id();
        let reader = bpm.fetch_page(page_id).unwrap();

        writer.mark_dirty();
        drop(writer);
        drop(reader);

        assert_eq!(bpm.is_dirty(page_id), Some(true));
    }

    #[test]
    fn test_flush_page() {
        let (bpm, disk) = recording_pool(2);

        assert!(matches!(
            bpm.flush_page(INVALID_PAGE_ID),
            Err(BufferPoolError::InvalidPageId)
        ));
        assert!(matches!(
            bpm.flush_page(3),
            Err(BufferPoolError::PageNotFound(3))
        ));

        let mut page = bpm.new_page().unwrap();
        let page_id = page.page_id();

        // Clean pages are not written
        bpm.flush_page(page_id).unwrap();
        assert!(disk.with(|disk| disk.writes.is_empty()));

        page.write()[0] = 42;
        page.release().unwrap();

        bpm.flush_page(page_id).unwrap();
        assert_eq!(bpm.is_dirty(page_id), Some(false));
        bpm.flush_page(page_id).unwrap();

        disk.with(|disk| {
            assert_eq!(disk.writes_of(page_id), 1);
            assert_eq!(disk.pages[&page_id][0], 42);
        });
    }

    #[test]
    fn test_flush_all_pages() {
        let (bpm, disk) = recording_pool(4);

        let mut dirty = Vec::new();
        for i in 0..3u8 {
            let mut page = bpm.new_page().unwrap();
            page.write()[0] = i + 1;
            dirty.push(page.page_id());
        }
        let clean = bpm.new_page().unwrap().page_id();

        bpm.flush_all_pages().unwrap();

        disk.with(|disk| {
            assert_eq!(disk.writes.len(), 3);
            for (i, page_id) in dirty.iter().enumerate() {
                assert_eq!(disk.pages[page_id][0], i as u8 + 1);
            }
            assert_eq!(disk.writes_of(clean), 0);
        });
        for page_id in dirty {
            assert_eq!(bpm.is_dirty(page_id), Some(false));
        }
    }

    #[test]
    fn test_delete_page() {
        let (bpm, _disk) = recording_pool(3);

        // Deleting a page that is not resident changes nothing
        bpm.delete_page(1000).unwrap();
        assert_eq!(bpm.free_frame_count(), 3);
        assert_eq!(bpm.resident_page_count(), 0);

        let mut page0 = bpm.new_page().unwrap();
        let page1 = bpm.new_page().unwrap();
        let page0_id = page0.page_id();
        assert_eq!(page0.frame_id(), 0);
        assert_eq!(page1.frame_id(), 1);
        page0.write().fill(9);

        assert!(matches!(
            bpm.delete_page(page0_id),
            Err(BufferPoolError::PagePinned(id)) if id == page0_id
        ));
        assert_eq!(bpm.pin_count(page0_id), Some(1));

        drop(page0);
        bpm.delete_page(page0_id).unwrap();
        assert_eq!(bpm.pin_count(page0_id), None);
        assert_eq!(bpm.free_frame_count(), 2);
        assert_eq!(bpm.evictable_frame_count(), 0);
        bpm.check_invariants();

        // Deleted twice is still fine
        bpm.delete_page(page0_id).unwrap();

        // The deleted frame is reused before frame 2, and comes back zeroed
        let page2 = bpm.new_page().unwrap();
        assert_eq!(page2.frame_id(), 0);
        assert!(page2.read().iter().all(|b| *b == 0));

        drop(page1);
        drop(page2);
        bpm.check_invariants();
    }

    #[test]
    fn test_deleted_dirty_page_is_not_written() {
        let (bpm, disk) = recording_pool(1);

        let mut page = bpm.new_page().unwrap();
        let page_id = page.page_id();
        page.write()[0] = 1;
        drop(page);

        bpm.delete_page(page_id).unwrap();
        let _next = bpm.new_page().unwrap();
        bpm.flush_all_pages().unwrap();

        assert!(disk.with(|disk| disk.writes.is_empty()));
    }

    #[test]
    fn test_write_back_failure_keeps_victim() {
        let (bpm, disk) = recording_pool(1);

        let mut page = bpm.new_page().unwrap();
        let page_id = page.page_id();
        page.write()[0] = 5;
        drop(page);

        disk.with(|disk| disk.fail_writes = true);
        assert!(matches!(bpm.new_page(), Err(BufferPoolError::Disk(_))));
        assert!(matches!(bpm.fetch_page(99), Err(BufferPoolError::Disk(_))));

        // The page is still resident, dirty and evictable
        assert_eq!(bpm.pin_count(page_id), Some(0));
        assert_eq!(bpm.is_dirty(page_id), Some(true));
        assert!(bpm.flush_all_pages().is_err());
        bpm.check_invariants();

        disk.with(|disk| disk.fail_writes = false);
        let next = bpm.new_page().unwrap();
        assert_eq!(next.page_id(), page_id + 1);
        assert_eq!(disk.with(|disk| disk.pages[&page_id][0]), 5);
    }

    #[test]
    fn test_read_failure_frees_frame() {
        let (bpm, disk) = recording_pool(2);

        let page_id = bpm.new_page().unwrap().page_id();
        disk.with(|disk| disk.fail_reads = true);

        assert!(matches!(bpm.fetch_page(50), Err(BufferPoolError::Disk(_))));
        assert_eq!(bpm.pin_count(50), None);
        bpm.check_invariants();

        // Resident pages don't need the disk
        assert!(bpm.fetch_page(page_id).is_ok());

        // The victim is gone and its frame is back on the free list
        let _ = bpm.new_page().unwrap();
        assert!(matches!(bpm.fetch_page(51), Err(BufferPoolError::Disk(_))));
        assert_eq!(bpm.pin_count(page_id), None);
        assert_eq!(bpm.free_frame_count(), 1);
        assert_eq!(bpm.resident_page_count(), 1);
        bpm.check_invariants();
    }

    #[test]
    fn test_partitioned_ids() {
        setup_logger();
        let disk = DiskManager::new(Cursor::new(vec![]));
        let bpm = BufferPoolManager::new(BufferPoolConfig::partitioned(4, 3, 1), disk).unwrap();

        let ids = (0..4)
            .map(|_| bpm.new_page().unwrap().page_id())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_invalid_config() {
        let disk = DiskManager::new(Cursor::new(vec![]));
        assert!(matches!(
            BufferPoolManager::new(BufferPoolConfig::new(0), disk),
            Err(BufferPoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_persistence_through_disk_manager() {
        setup_logger();
        let disk = SharedDisk::new(DiskManager::new(Cursor::new(vec![])));
        let bpm = BufferPoolManager::new(BufferPoolConfig::new(2), disk.clone()).unwrap();

        let mut page_ids = Vec::new();
        for i in 0..10u8 {
            let mut page = bpm.new_page().unwrap();
            page.write().fill(i);
            page_ids.push(page.page_id());
        }

        for (i, page_id) in page_ids.iter().enumerate() {
            let page = bpm.fetch_page(*page_id).unwrap();
            assert!(page.read().iter().all(|b| *b == i as u8));
        }

        bpm.flush_all_pages().unwrap();
        assert_eq!(
            disk.with(|disk| disk.get_ref().get_ref().len()),
            page_ids.len() * PAGE_SIZE
        );
    }

    #[test]
    fn test_concurrent_counters() {
        const THREADS: usize = 4;
        const ROUNDS: usize = 200;
        const PAGES: usize = 16;

        let (bpm, _disk) = recording_pool(8);
        let page_ids = (0..PAGES)
            .map(|_| bpm.new_page().unwrap().page_id())
            .collect::<Vec<_>>();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let bpm = &bpm;
                let page_ids = &page_ids;
                s.spawn(move || {
                    for round in 0..ROUNDS {
                        // Each thread holds at most one pin, so the pool never runs out
                        let page_id = page_ids[(round * 7 + t * 3) % PAGES];
                        let mut page = bpm.fetch_page(page_id).unwrap();
                        let mut data = page.write();
                        let counter = u64::from_le_bytes(data[0..8].try_into().unwrap());
                        data[0..8].copy_from_slice(&(counter + 1).to_le_bytes());
                    }
                });
            }
        });

        bpm.check_invariants();
        assert_eq!(bpm.evictable_frame_count(), bpm.resident_page_count());

        let mut total = 0;
        for page_id in page_ids {
            let page = bpm.fetch_page(page_id).unwrap();
            total += u64::from_le_bytes(page.read()[0..8].try_into().unwrap());
        }
        assert_eq!(total, (THREADS * ROUNDS) as u64);
    }
}
