use crate::config::PAGE_SIZE;

pub type PageId = u32;

/// Marks a frame that holds no page. Never handed out by the allocator.
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

/// The content of a page that was allocated but never written.
pub static THE_EMPTY_PAGE: [u8; PAGE_SIZE] = [0u8; PAGE_SIZE];
