//! Commit/replay/failure notifications. The listener is the only way an
//! embedder observes what the journal has durably written, so its contract
//! is load-bearing: `on_commit` and `on_replay` together enumerate every
//! entry the journal currently knows about, in order.

use parking_lot::Mutex;

use crate::error::JournalError;
use crate::record::RecordHeader;

/// Framing metadata for a record, independent of the entry it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordMeta {
    pub log_number: u64,
    /// Byte offset of this record's header within its segment.
    pub offset: u32,
    pub record_id: u64,
    pub type_tag: u8,
    /// Total framed length, including the record header.
    pub length: u32,
}

impl RecordMeta {
    pub(crate) fn from_header(log_number: u64, offset: u32, header: RecordHeader) -> Self {
        Self {
            log_number,
            offset,
            record_id: header.record_id,
            type_tag: header.type_tag,
            length: header.length,
        }
    }
}

/// A durably written record together with the entry it carries, delivered
/// to a [`Listener`] either on live commit or during replay.
#[derive(Clone, Copy, Debug)]
pub struct CommittedRecord<V> {
    pub meta: RecordMeta,
    pub entry: V,
}

/// Entries an append could not durably write, handed back to
/// [`Listener::on_failure`].
#[derive(Debug)]
pub enum FailedWrite<V> {
    Entry(V),
    Batch(Vec<V>),
}

/// Observer of journal activity.
///
/// Called synchronously from the thread performing the append (the caller
/// for [`crate::Journal::append_synchronous`], the dedicated writer thread
/// for [`crate::Journal::append`] and [`crate::Journal::commit_batch`]).
/// Implementations that need to do expensive work should hand off to
/// another thread themselves; a slow listener stalls the journal.
pub trait Listener<V>: Send + Sync {
    fn on_commit(&self, record: &CommittedRecord<V>);
    fn on_replay(&self, record: &CommittedRecord<V>);
    fn on_failure(&self, failed: FailedWrite<V>, cause: &JournalError);
}

/// A no-op listener, for embedders that only care about durability and
/// reconstruct their state purely from replay at the application layer some
/// other way.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullListener;

impl<V> Listener<V> for NullListener {
    fn on_commit(&self, _record: &CommittedRecord<V>) {}
    fn on_replay(&self, _record: &CommittedRecord<V>) {}
    fn on_failure(&self, _failed: FailedWrite<V>, _cause: &JournalError) {}
}

/// Test double that records every notification it receives, in order.
#[derive(Default)]
pub struct RecordingListener<V> {
    inner: Mutex<Recorded<V>>,
}

struct Recorded<V> {
    commits: Vec<CommittedRecord<V>>,
    replays: Vec<CommittedRecord<V>>,
    failures: Vec<String>,
}

impl<V> Default for Recorded<V> {
    fn default() -> Self {
        Self {
            commits: Vec::new(),
            replays: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<V: Clone> RecordingListener<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Recorded::default()),
        }
    }

    pub fn commits(&self) -> Vec<CommittedRecord<V>> {
        self.inner.lock().commits.clone()
    }

    pub fn replays(&self) -> Vec<CommittedRecord<V>> {
        self.inner.lock().replays.clone()
    }

    pub fn failure_count(&self) -> usize {
        self.inner.lock().failures.len()
    }
}

impl<V: Clone + Send + Sync> Listener<V> for RecordingListener<V> {
    fn on_commit(&self, record: &CommittedRecord<V>) {
        self.inner.lock().commits.push(record.clone());
    }

    fn on_replay(&self, record: &CommittedRecord<V>) {
        self.inner.lock().replays.push(record.clone());
    }

    fn on_failure(&self, _failed: FailedWrite<V>, cause: &JournalError) {
        self.inner.lock().failures.push(cause.to_string());
    }
}
