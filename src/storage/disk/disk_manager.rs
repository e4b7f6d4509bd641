use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{config::PAGE_SIZE, storage::PageId};

/// The contract the buffer pool consumes from the page store.
///
/// Buffers are always exactly `PAGE_SIZE` bytes long. Calls are synchronous: when
/// they return `Ok` the bytes have been transferred.
pub trait DiskBackend {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> io::Result<()>;

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> io::Result<()>;
}

/// Stores page `n` at byte offset `n * PAGE_SIZE` of a seekable stream.
///
/// Pages past the end of the stream read back as zeroes: they were allocated
/// but never written.
pub struct DiskManager<S: Read + Write + Seek> {
    stream: S,
    num_reads: u64,
    num_writes: u64,
}

impl<S: Read + Write + Seek> DiskManager<S> {
    pub fn new(stream: S) -> Self {
        DiskManager {
            stream,
            num_reads: 0,
            num_writes: 0,
        }
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl DiskManager<fs::File> {
    /// Opens the database file, creating it if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        log::debug!("opened database file {:?}", path.as_ref());
        Ok(DiskManager::new(file))
    }
}

impl<S: Read + Write + Seek> DiskBackend for DiskManager<S> {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        self.stream
            .seek(SeekFrom::Start(page_id_to_file_offset(page_id)))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        // EOF is not an error, the page was never written
        if filled < buf.len() {
            log::trace!("page_id={page_id} is past the end of the file, reading zeroes");
            buf[filled..].fill(0);
        }

        self.num_reads += 1;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        self.stream
            .seek(SeekFrom::Start(page_id_to_file_offset(page_id)))?;
        self.stream.write_all(buf)?;
        self.stream.flush()?;

        self.num_writes += 1;
        Ok(())
    }
}

/// A disk backend shared by several buffer pool instances.
pub struct SharedDisk<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> SharedDisk<D> {
    pub fn new(disk: D) -> Self {
        SharedDisk {
            inner: Arc::new(Mutex::new(disk)),
        }
    }

    /// Runs `f` with exclusive access to the underlying backend.
    pub fn with<T>(&self, f: impl FnOnce(&mut D) -> T) -> T {
        let mut disk = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut disk)
    }
}

impl<D> Clone for SharedDisk<D> {
    fn clone(&self) -> Self {
        SharedDisk {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: DiskBackend> DiskBackend for SharedDisk<D> {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        self.with(|disk| disk.read_page(page_id, buf))
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        self.with(|disk| disk.write_page(page_id, buf))
    }
}

/* Utils */

fn page_id_to_file_offset(id: PageId) -> u64 {
    id as u64 * PAGE_SIZE as u64
}
