//! Startup-time reconstruction: walk every segment in a journal directory,
//! in order, and republish its records to the listener before any writer is
//! admitted.

use std::path::Path;

use crate::codec::EntryDecoder;
use crate::error::ReplayError;
use crate::listener::{CommittedRecord, Listener, RecordMeta};
use crate::naming::NamingStrategy;
use crate::record::{self, FileHeader, FILE_HEADER_LEN};
use crate::segment::SegmentFile;

/// What replay learned, needed to resume the journal for new writes.
pub struct ReplayOutcome {
    /// Highest record id observed across every segment, if any were
    /// replayed.
    pub max_seen_record_id: Option<u64>,
    /// Log number of the newest segment found on disk, if any.
    pub last_log_number: Option<u64>,
}

/// Scan `path` for segment files named per `naming`, decode every record in
/// ascending `log_number` order, and notify `listener` of each one.
pub fn replay<V, Dec, Name, L>(
    path: &Path,
    naming: &Name,
    decoder: &Dec,
    listener: &L,
) -> Result<ReplayOutcome, ReplayError>
where
    Dec: EntryDecoder<V>,
    Name: NamingStrategy,
    L: Listener<V>,
{
    let mut log_numbers = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(log_number) = naming.extract_log_number(&name) {
            log_numbers.push(log_number);
        }
    }
    log_numbers.sort_unstable();

    let mut max_seen: Option<u64> = None;
    for &log_number in &log_numbers {
        let file_path = path.join(naming.generate(log_number));
        let header = read_file_header(&file_path)?;
        if header.is_none() {
            return Err(ReplayError::BadMagic { log_number });
        }
        let header = header.unwrap();
        if header.version > record::FORMAT_VERSION {
            return Err(ReplayError::UnsupportedVersion {
                log_number,
                found: header.version,
                max: record::FORMAT_VERSION,
            });
        }

        let mut decode_err: Option<ReplayError> = None;
        SegmentFile::for_each_record(&file_path, |offset, rh, payload| {
            if decode_err.is_some() {
                return;
            }
            match decoder.decode(&payload, rh.type_tag) {
                Ok(value) => {
                    max_seen = Some(max_seen.map_or(rh.record_id, |m| m.max(rh.record_id)));
                    let meta = RecordMeta::from_header(log_number, offset, rh);
                    listener.on_replay(&CommittedRecord { meta, entry: value });
                }
                Err(source) => {
                    log::error!("segment {log_number} record {} failed to decode", rh.record_id);
                    decode_err = Some(ReplayError::EntryDecode {
                        log_number,
                        record_id: rh.record_id,
                        source: Box::new(source),
                    });
                }
            }
        })?;
        if let Some(e) = decode_err {
            return Err(e);
        }
    }

    Ok(ReplayOutcome {
        max_seen_record_id: max_seen,
        last_log_number: log_numbers.last().copied(),
    })
}

fn read_file_header(path: &Path) -> std::io::Result<Option<FileHeader>> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; FILE_HEADER_LEN];
    file.read_exact(&mut buf)?;
    Ok(FileHeader::decode(&buf))
}
