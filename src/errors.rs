use std::error::Error;

use crate::storage::PageId;

#[derive(Debug)]
pub enum BufferPoolError {
    /// Every frame is pinned: there is no free frame and nothing to evict.
    PoolExhausted,
    /// The requested page is not resident in the buffer pool.
    PageNotFound(PageId),
    /// The page is resident but its pin count is already zero.
    PageNotPinned(PageId),
    /// The page is still pinned and cannot be deleted.
    PagePinned(PageId),
    /// The sentinel page id was passed where a real page was expected.
    InvalidPageId,
    /// The page id space of this instance has been used up.
    PageIdsExhausted,
    /// The buffer pool was constructed with invalid parameters.
    InvalidConfig(String),
    /// Derived error from the disk backend
    Disk(std::io::Error),
}

impl std::fmt::Display for BufferPoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferPoolError::PoolExhausted => {
                write!(f, "Buffer pool is full. All frames are pinned")
            }
            BufferPoolError::PageNotFound(page_id) => {
                write!(f, "Page id={page_id} not found in buffer pool")
            }
            BufferPoolError::PageNotPinned(page_id) => {
                write!(f, "Page id={page_id} is not pinned")
            }
            BufferPoolError::PagePinned(page_id) => {
                write!(f, "Page id={page_id} is pinned and cannot be deleted")
            }
            BufferPoolError::InvalidPageId => write!(f, "Invalid page id"),
            BufferPoolError::PageIdsExhausted => write!(f, "No page ids left to allocate"),
            BufferPoolError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            BufferPoolError::Disk(err) => write!(f, "Disk error: {err}"),
        }
    }
}

impl std::convert::From<BufferPoolError> for std::io::Error {
    fn from(err: BufferPoolError) -> Self {
        match err {
            BufferPoolError::Disk(err) => err,
            err => std::io::Error::new(std::io::ErrorKind::Other, err),
        }
    }
}

impl std::convert::From<std::io::Error> for BufferPoolError {
    fn from(err: std::io::Error) -> Self {
        BufferPoolError::Disk(err)
    }
}

impl Error for BufferPoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BufferPoolError::Disk(err) => Some(err),
            _ => None,
        }
    }
}
