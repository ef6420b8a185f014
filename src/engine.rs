//! Synchronous and asynchronous append paths, segment rollover, and atomic
//! batch commit. No threads of its own: callers (the synchronous API
//! directly, the writer thread for the asynchronous API) drive it.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::codec::EntryEncoder;
use crate::directory::SegmentDirectory;
use crate::error::{BatchSubmitError, JournalError, SubmitError};
use crate::listener::{CommittedRecord, FailedWrite, Listener};
use crate::naming::NamingStrategy;
use crate::record::{FileType, OVERFLOW_OVERHEAD, RECORD_HEADER_LEN};
use crate::recordid::RecordIdGenerator;
use crate::segment::{AppendOutcome, SegmentFile};
use crate::Entry;

pub struct AppendEngine<V, Enc, Gen, Name> {
    path: PathBuf,
    max_log_file_size: u32,
    encoder: Enc,
    id_gen: Gen,
    naming: Name,
    directory: Mutex<SegmentDirectory>,
    _entry: std::marker::PhantomData<fn() -> V>,
}

impl<V, Enc, Gen, Name> AppendEngine<V, Enc, Gen, Name>
where
    Enc: EntryEncoder<V>,
    Gen: RecordIdGenerator,
    Name: NamingStrategy,
{
    pub fn new(
        path: PathBuf,
        max_log_file_size: u32,
        encoder: Enc,
        id_gen: Gen,
        naming: Name,
        directory: SegmentDirectory,
    ) -> Self {
        Self {
            path,
            max_log_file_size,
            encoder,
            id_gen,
            naming,
            directory: Mutex::new(directory),
            _entry: std::marker::PhantomData,
        }
    }

    fn segment_path(&self, log_number: u64) -> PathBuf {
        self.path.join(self.naming.generate(log_number))
    }

    /// Encode `entry`'s value, without touching the directory or allocating
    /// a record id. Used by both the synchronous path and, ahead of
    /// enqueueing, by the asynchronous path.
    pub fn pre_encode(&self, entry: &Entry<V>) -> Result<Vec<u8>, Enc::Error> {
        let mut buf = Vec::new();
        self.encoder.encode(&entry.value, &mut buf)?;
        Ok(buf)
    }

    /// Encode then immediately commit synchronously. Equivalent to calling
    /// [`Self::pre_encode`] followed by [`Self::append_preencoded`].
    pub fn append_synchronous<L: Listener<V>>(
        &self,
        entry: Entry<V>,
        listener: &L,
    ) -> Result<(), SubmitError<Enc::Error>> {
        let payload = self.pre_encode(&entry).map_err(SubmitError::Encoding)?;
        self.append_preencoded(entry, payload, listener);
        Ok(())
    }

    /// Commit an already-encoded entry. This is the method the asynchronous
    /// writer thread drives, and what [`Self::append_synchronous`] reduces
    /// to once encoding has succeeded.
    pub fn append_preencoded<L: Listener<V>>(&self, entry: Entry<V>, payload: Vec<u8>, listener: &L) {
        let mut dir = self.directory.lock();

        let record_id = self.id_gen.next_record_id();
        let head = dir
            .head()
            .expect("directory always has a head once the journal has started");
        let outcome = head.append(&payload, entry.type_tag, record_id);

        match outcome {
            Ok(AppendOutcome::Success(meta)) => {
                listener.on_commit(&CommittedRecord { meta, entry: entry.value });
            }
            Ok(AppendOutcome::Overflow) => {
                if let Err(e) = self.roll_default(&mut dir) {
                    listener.on_failure(FailedWrite::Entry(entry.value), &JournalError::Io(e));
                    return;
                }
                self.retry_once_after_rollover(&mut dir, entry, payload, listener);
            }
            Ok(AppendOutcome::FullOverflow) => {
                let needed = OVERFLOW_OVERHEAD + payload.len() as u32;
                if let Err(e) = self.roll_overflow(&mut dir, needed) {
                    listener.on_failure(FailedWrite::Entry(entry.value), &JournalError::Io(e));
                    return;
                }
                self.retry_once_after_rollover(&mut dir, entry, payload, listener);
            }
            Err(e) => {
                listener.on_failure(FailedWrite::Entry(entry.value), &JournalError::Io(e));
            }
        }
    }

    /// Retry a single append against the fresh head just pushed by a
    /// rollover. Per the engine's contract this retry must succeed; any
    /// other outcome is a fatal failure, since a second rollover within one
    /// logical append is not supported.
    fn retry_once_after_rollover<L: Listener<V>>(
        &self,
        dir: &mut SegmentDirectory,
        entry: Entry<V>,
        payload: Vec<u8>,
        listener: &L,
    ) {
        let record_id = self.id_gen.next_record_id();
        let head = dir.head().expect("rollover always pushes a fresh head");
        match head.append(&payload, entry.type_tag, record_id) {
            Ok(AppendOutcome::Success(meta)) => {
                listener.on_commit(&CommittedRecord { meta, entry: entry.value });
            }
            Ok(_) => {
                listener.on_failure(FailedWrite::Entry(entry.value), &JournalError::FatalOverflowRetryFailed);
            }
            Err(e) => {
                listener.on_failure(FailedWrite::Entry(entry.value), &JournalError::Io(e));
            }
        }
    }

    fn roll_default(&self, dir: &mut SegmentDirectory) -> std::io::Result<()> {
        if let Some(head) = dir.head() {
            head.close()?;
        }
        let log_number = dir.next_log_number();
        let segment = SegmentFile::create(
            self.segment_path(log_number),
            log_number,
            self.max_log_file_size,
            FileType::Default,
        )?;
        dir.push_head(segment);
        Ok(())
    }

    fn roll_overflow(&self, dir: &mut SegmentDirectory, needed: u32) -> std::io::Result<()> {
        if let Some(head) = dir.head() {
            head.close()?;
        }
        let log_number = dir.next_log_number();
        let segment = SegmentFile::create(self.segment_path(log_number), log_number, needed, FileType::Overflow)?;
        dir.push_head(segment);
        Ok(())
    }

    /// Commit a batch of entries atomically: either every entry appears in
    /// a single dedicated BATCH segment, or none do and the segment is
    /// removed.
    pub fn commit_batch<L: Listener<V>>(
        &self,
        entries: Vec<Entry<V>>,
        listener: &L,
    ) -> Result<(), BatchSubmitError<Enc::Error>> {
        let mut encoded = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let mut buf = Vec::new();
            self.encoder
                .encode(&entry.value, &mut buf)
                .map_err(|source| BatchSubmitError::Encoding { index, source })?;
            encoded.push(buf);
        }

        let mut dir = self.directory.lock();
        let mark = self.id_gen.last_generated_record_id();

        let batch_size = crate::record::FILE_HEADER_LEN as u64
            + encoded
                .iter()
                .map(|p| (p.len() + RECORD_HEADER_LEN) as u64)
                .sum::<u64>();
        let log_number = dir.next_log_number();

        let segment = match SegmentFile::create(self.segment_path(log_number), log_number, batch_size as u32, FileType::Batch) {
            Ok(s) => s,
            Err(e) => {
                let values = entries.into_iter().map(|e| e.value).collect();
                listener.on_failure(FailedWrite::Batch(values), &JournalError::Io(e));
                return Ok(());
            }
        };
        dir.push_head(segment);

        let mut metas = Vec::with_capacity(entries.len());
        let mut failure = None;
        for (entry, payload) in entries.iter().zip(encoded.iter()) {
            let record_id = self.id_gen.next_record_id();
            let head = dir.head().expect("just pushed");
            match head.append(payload, entry.type_tag, record_id) {
                Ok(AppendOutcome::Success(meta)) => metas.push(meta),
                Ok(_) => {
                    failure = Some(JournalError::BatchSizingInvariantViolated);
                    break;
                }
                Err(e) => {
                    failure = Some(JournalError::Io(e));
                    break;
                }
            }
        }

        if let Some(cause) = failure {
            let seg = dir.pop_head().expect("just pushed");
            let _ = seg.close();
            let path = seg.path().to_path_buf();
            drop(seg);
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("failed to remove rolled-back batch segment {}: {e}", path.display());
            }
            self.id_gen.notify_highest_record_id(mark);

            let values = entries.into_iter().map(|e| e.value).collect();
            listener.on_failure(FailedWrite::Batch(values), &cause);
            return Ok(());
        }

        for (meta, entry) in metas.into_iter().zip(entries.into_iter()) {
            listener.on_commit(&CommittedRecord { meta, entry: entry.value });
        }
        Ok(())
    }

    /// Crate-internal only: `Journal::close`/`Drop` need to close every
    /// segment at shutdown. Not exposed publicly -- an embedder mutating
    /// segment state outside `append_synchronous`/`commit_batch` would break
    /// the invariant that the directory mutex is the only lock needed for
    /// correctness.
    pub(crate) fn directory(&self) -> &Mutex<SegmentDirectory> {
        &self.directory
    }
}
