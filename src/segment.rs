//! A single journal segment file: one file header followed by a contiguous
//! run of records.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::listener::RecordMeta;
use crate::record::{self, Decoded, FileHeader, FileType, FILE_HEADER_LEN, RECORD_HEADER_LEN};

/// Result of attempting to append one record to a segment.
#[derive(Debug)]
pub enum AppendOutcome {
    /// The record was framed, written, and synced.
    Success(RecordMeta),
    /// The record doesn't fit in the remaining space of this segment, but
    /// would fit in a fresh segment of the same `max_size`. No bytes were
    /// written.
    Overflow,
    /// The record's framed size exceeds `max_size` itself; it needs a
    /// dedicated segment sized for it. No bytes were written.
    FullOverflow,
}

struct Inner {
    file: Option<File>,
    position: u32,
    #[cfg(test)]
    fail_after: Option<u32>,
    #[cfg(test)]
    append_count: u32,
}

/// Test-only fault injection: lets a test make a freshly created segment's
/// append calls fail partway through, to exercise failure handling without
/// a real faulty filesystem. Mirrors the teacher's `repo::mem` fake, scaled
/// down to the one seam this crate's tests need.
#[cfg(test)]
pub(crate) mod fault {
    use std::cell::Cell;

    thread_local! {
        // Thread-local, not process-global: cargo test runs cases on separate
        // worker threads, and a shared global here would let one test's fault
        // configuration leak into a segment created by an unrelated test.
        static NEXT_SEGMENT_FAIL_AFTER: Cell<Option<u32>> = const { Cell::new(None) };
    }

    /// The next segment created via [`super::SegmentFile::create`] **on this
    /// thread** will return a real `io::Error` starting with its
    /// `(fail_after + 1)`-th `append` call; calls up to and including
    /// `fail_after` still succeed.
    pub(crate) fn fail_next_segment_append_after(fail_after: u32) {
        NEXT_SEGMENT_FAIL_AFTER.with(|cell| cell.set(Some(fail_after)));
    }

    /// Consumed once by each newly created segment; only the very next
    /// segment created on this thread after configuring a fault picks it up.
    pub(crate) fn take_pending_fail_after() -> Option<u32> {
        NEXT_SEGMENT_FAIL_AFTER.with(|cell| cell.take())
    }
}

/// One segment file. Owns its file handle exclusively; every append goes
/// through an internal lock even though callers are expected to already
/// serialize access via the directory mutex, so the type remains sound if
/// that discipline is ever relaxed.
pub struct SegmentFile {
    path: PathBuf,
    log_number: u64,
    max_size: u32,
    file_type: FileType,
    version: u16,
    inner: Mutex<Inner>,
}

impl SegmentFile {
    /// Create a new segment file at `path`, write its header, and position
    /// the append cursor immediately past it.
    pub fn create(path: PathBuf, log_number: u64, max_size: u32, file_type: FileType) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        let header = FileHeader {
            version: record::FORMAT_VERSION,
            file_type,
            max_size,
            log_number,
        };
        file.write_all(&header.encode())?;
        file.sync_data()?;
        Ok(Self {
            path,
            log_number,
            max_size,
            file_type,
            version: record::FORMAT_VERSION,
            inner: Mutex::new(Inner {
                file: Some(file),
                position: FILE_HEADER_LEN as u32,
                #[cfg(test)]
                fail_after: fault::take_pending_fail_after(),
                #[cfg(test)]
                append_count: 0,
            }),
        })
    }

    /// Open a previously created segment file, validating its header and
    /// positioning the append cursor at the end of the file.
    pub fn open_existing(path: PathBuf) -> io::Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mut hdr_buf = [0u8; FILE_HEADER_LEN];
        file.read_exact(&mut hdr_buf)?;
        let header = FileHeader::decode(&hdr_buf)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad segment file header"))?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            log_number: header.log_number,
            max_size: header.max_size,
            file_type: header.file_type,
            version: header.version,
            inner: Mutex::new(Inner {
                file: Some(file),
                position: len as u32,
                #[cfg(test)]
                fail_after: None,
                #[cfg(test)]
                append_count: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_number(&self) -> u64 {
        self.log_number
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn position(&self) -> u32 {
        self.inner.lock().position
    }

    /// Frame and append one record, syncing it to disk before returning.
    pub fn append(&self, payload: &[u8], type_tag: u8, record_id: u64) -> io::Result<AppendOutcome> {
        let frame_len = RECORD_HEADER_LEN as u32 + payload.len() as u32;

        if FILE_HEADER_LEN as u32 + frame_len > self.max_size {
            return Ok(AppendOutcome::FullOverflow);
        }

        let mut inner = self.inner.lock();
        if inner.position + frame_len > self.max_size {
            return Ok(AppendOutcome::Overflow);
        }

        #[cfg(test)]
        {
            inner.append_count += 1;
            if let Some(fail_after) = inner.fail_after {
                if inner.append_count > fail_after {
                    return Err(io::Error::new(io::ErrorKind::Other, "simulated write failure (test fault injection)"));
                }
            }
        }

        let file = inner
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "segment is closed"))?;

        let offset = inner.position;
        let frame = record::encode_frame(payload, type_tag, record_id);
        file.write_all(&frame)?;
        file.sync_data()?;
        inner.position += frame_len;

        let meta = RecordMeta {
            log_number: self.log_number,
            offset,
            record_id,
            type_tag,
            length: frame_len,
        };
        Ok(AppendOutcome::Success(meta))
    }

    /// Flush and release the file handle. Idempotent.
    pub fn close(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if let Some(file) = inner.file.take() {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Decode every record from byte [`FILE_HEADER_LEN`] to the first
    /// [`Decoded::EndOfSegment`] or [`Decoded::Corrupt`], invoking `f` for
    /// each one. Used by the replayer; requires its own read handle since
    /// the write handle may be closed or mid-use.
    pub fn for_each_record(path: &Path, mut f: impl FnMut(u32, record::RecordHeader, Vec<u8>)) -> io::Result<()> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut hdr_buf = [0u8; FILE_HEADER_LEN];
        file.read_exact(&mut hdr_buf)?;
        let mut offset = FILE_HEADER_LEN as u32;
        loop {
            let available = file_len.saturating_sub(offset as u64);
            match record::decode_frame(&mut file, available)? {
                Decoded::Record { header, payload } => {
                    let len = header.length;
                    f(offset, header, payload);
                    offset += len;
                }
                Decoded::EndOfSegment | Decoded::Corrupt => break,
            }
        }
        Ok(())
    }
}
