//! Binary framing for file headers and records.
//!
//! Everything here is pure: no file handles, no segment state. All
//! multi-byte integers are big-endian. Layout is part of the format and must
//! not change without a version bump.

use std::io::{self, Read};

/// Identifies this crate's on-disk format. Chosen arbitrarily; changing it
/// invalidates every existing journal directory.
pub const FILE_MAGIC: [u8; 4] = *b"DWJ1";

/// Current format version written by this build.
pub const FORMAT_VERSION: u16 = 1;

/// `magic[4] + version(2) + file_type(1) + max_size(4) + log_number(8) + reserved[6]`.
pub const FILE_HEADER_LEN: usize = 25;

/// `length(4) + type(1) + record_id(8) + reserved[4]`.
pub const RECORD_HEADER_LEN: usize = 17;

/// Combined header overhead of a segment holding exactly one record, used to
/// size a dedicated overflow segment.
pub const OVERFLOW_OVERHEAD: u32 = FILE_HEADER_LEN as u32 + RECORD_HEADER_LEN as u32;

/// The kind of segment a file header describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum FileType {
    /// A regular segment bounded by the configured maximum size.
    Default = 1,
    /// A segment created to hold exactly one oversize record.
    Overflow = 2,
    /// A segment created to hold exactly one atomic batch of records.
    Batch = 3,
}

impl FileType {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Default),
            2 => Some(Self::Overflow),
            3 => Some(Self::Batch),
            _ => None,
        }
    }
}

/// The 25-byte header every segment file starts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub file_type: FileType,
    pub max_size: u32,
    pub log_number: u64,
}

impl FileHeader {
    pub fn encode(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0u8; FILE_HEADER_LEN];
        buf[0..4].copy_from_slice(&FILE_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_be_bytes());
        buf[6] = self.file_type as u8;
        buf[7..11].copy_from_slice(&self.max_size.to_be_bytes());
        buf[11..19].copy_from_slice(&self.log_number.to_be_bytes());
        // buf[19..25] stays reserved/zeroed.
        buf
    }

    /// Decode a header previously written by [`Self::encode`].
    ///
    /// Returns `Ok(None)` if the magic bytes don't match this format, rather
    /// than erroring, so callers can distinguish "not our file" from I/O
    /// failure.
    pub fn decode(buf: &[u8; FILE_HEADER_LEN]) -> Option<Self> {
        if buf[0..4] != FILE_MAGIC {
            return None;
        }
        let version = u16::from_be_bytes(buf[4..6].try_into().unwrap());
        let file_type = FileType::from_u8(buf[6])?;
        let max_size = u32::from_be_bytes(buf[7..11].try_into().unwrap());
        let log_number = u64::from_be_bytes(buf[11..19].try_into().unwrap());
        Some(Self {
            version,
            file_type,
            max_size,
            log_number,
        })
    }
}

/// The 17-byte header that precedes every record's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct RecordHeader {
    /// Total framed length, including this header.
    pub length: u32,
    pub type_tag: u8,
    pub record_id: u64,
}

impl RecordHeader {
    fn encode(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut buf = [0u8; RECORD_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.length.to_be_bytes());
        buf[4] = self.type_tag;
        buf[5..13].copy_from_slice(&self.record_id.to_be_bytes());
        // buf[13..17] stays reserved/zeroed.
        buf
    }

    fn decode(buf: &[u8; RECORD_HEADER_LEN]) -> Self {
        let length = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        let type_tag = buf[4];
        let record_id = u64::from_be_bytes(buf[5..13].try_into().unwrap());
        Self {
            length,
            type_tag,
            record_id,
        }
    }
}

/// Frame `payload` behind a record header for `type_tag`/`record_id`.
pub fn encode_frame(payload: &[u8], type_tag: u8, record_id: u64) -> Vec<u8> {
    let length = RECORD_HEADER_LEN as u32 + payload.len() as u32;
    let header = RecordHeader {
        length,
        type_tag,
        record_id,
    };
    let mut frame = Vec::with_capacity(length as usize);
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    frame
}

/// Outcome of attempting to decode one record from a stream positioned at a
/// record boundary.
#[derive(Debug)]
pub enum Decoded {
    Record { header: RecordHeader, payload: Vec<u8> },
    /// Fewer than [`RECORD_HEADER_LEN`] bytes remained; a clean end of
    /// segment, not an error.
    EndOfSegment,
    /// A record header was read but its length field was invalid, or fewer
    /// payload bytes remained than the header promised. Trailing garbage
    /// from a crash mid-append.
    Corrupt,
}

enum ReadOutcome {
    Full,
    Eof,
    Partial,
}

fn try_read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<ReadOutcome> {
    let mut read = 0;
    while read < buf.len() {
        match r.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(if read == buf.len() {
        ReadOutcome::Full
    } else if read == 0 {
        ReadOutcome::Eof
    } else {
        ReadOutcome::Partial
    })
}

/// Decode the next record from `r`, which must be positioned at a record
/// boundary (either immediately after the file header or after a
/// previously-decoded record).
///
/// `available_len` is the number of bytes the caller knows remain readable
/// from `r`'s current position, including the header about to be read (a
/// file reader passes its real remaining byte count; callers with no such
/// bound can pass `u64::MAX`). A record header whose `length` field claims
/// more payload than `available_len` allows is reported as `Corrupt` before
/// a buffer is allocated for it, so a corrupted length field near
/// `u32::MAX` can't force a multi-gigabyte allocation.
pub fn decode_frame<R: Read>(mut r: R, available_len: u64) -> io::Result<Decoded> {
    let mut hdr_buf = [0u8; RECORD_HEADER_LEN];
    match try_read_exact(&mut r, &mut hdr_buf)? {
        ReadOutcome::Eof => return Ok(Decoded::EndOfSegment),
        ReadOutcome::Partial => return Ok(Decoded::Corrupt),
        ReadOutcome::Full => {}
    }
    let header = RecordHeader::decode(&hdr_buf);
    if (header.length as usize) < RECORD_HEADER_LEN {
        return Ok(Decoded::Corrupt);
    }
    let payload_len = header.length as usize - RECORD_HEADER_LEN;
    let remaining_after_header = available_len.saturating_sub(RECORD_HEADER_LEN as u64);
    if payload_len as u64 > remaining_after_header {
        return Ok(Decoded::Corrupt);
    }
    let mut payload = vec![0u8; payload_len];
    match try_read_exact(&mut r, &mut payload)? {
        ReadOutcome::Full => Ok(Decoded::Record { header, payload }),
        _ => Ok(Decoded::Corrupt),
    }
}
