use std::collections::HashMap;
use std::io;

use super::disk_manager::DiskBackend;
use crate::storage::PageId;

/// In-memory disk that remembers every read and write, and can be told to fail.
#[derive(Default)]
pub struct RecordingDisk {
    pub pages: HashMap<PageId, Vec<u8>>,
    pub reads: Vec<PageId>,
    pub writes: Vec<(PageId, Vec<u8>)>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl RecordingDisk {
    pub fn writes_of(&self, page_id: PageId) -> usize {
        self.writes.iter().filter(|(id, _)| *id == page_id).count()
    }
}

impl DiskBackend for RecordingDisk {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> io::Result<()> {
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        self.reads.push(page_id);
        match self.pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.writes.push((page_id, buf.to_vec()));
        self.pages.insert(page_id, buf.to_vec());
        Ok(())
    }
}
