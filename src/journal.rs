//! Composes the append engine, the replayer, and a dedicated writer thread
//! into the journal's public entry point.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::codec::{EntryDecoder, EntryEncoder};
use crate::directory::SegmentDirectory;
use crate::engine::AppendEngine;
use crate::error::{BatchSubmitError, OpenError, SubmitError};
use crate::listener::Listener;
use crate::naming::NamingStrategy;
use crate::record::FileType;
use crate::recordid::RecordIdGenerator;
use crate::replay;
use crate::segment::SegmentFile;
use crate::Entry;

/// Configuration accepted by [`Journal::open`].
#[derive(Clone, Debug)]
pub struct JournalOptions {
    /// Directory the journal's segment files live in. Must already exist.
    pub journal_path: PathBuf,
    /// Ceiling, in bytes, for a DEFAULT segment's total size.
    pub max_log_file_size: u32,
}

struct QueueItem<V> {
    entry: Entry<V>,
    payload: Vec<u8>,
}

/// The durable journal. Generic over every external collaborator so the
/// whole stack is resolved at compile time with no dynamic dispatch on the
/// hot path.
pub struct Journal<V, Enc, Dec, Gen, Name, L> {
    engine: Arc<AppendEngine<V, Enc, Gen, Name>>,
    listener: Arc<L>,
    queue_tx: Option<Sender<QueueItem<V>>>,
    writer: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    _decoder: std::marker::PhantomData<Dec>,
}

impl<V, Enc, Dec, Gen, Name, L> Journal<V, Enc, Dec, Gen, Name, L>
where
    V: Send + 'static,
    Enc: EntryEncoder<V> + Send + Sync + 'static,
    Dec: EntryDecoder<V>,
    Gen: RecordIdGenerator + Send + Sync + 'static,
    Name: NamingStrategy + Send + Sync + 'static,
    L: Listener<V> + Send + Sync + 'static,
{
    /// Open (creating if necessary) a journal rooted at `options.journal_path`.
    ///
    /// If the directory already contains segment files, they are replayed
    /// in full -- emitting `on_replay` for every record found -- before the
    /// writer thread starts and before this call returns.
    pub fn open(
        options: JournalOptions,
        encoder: Enc,
        decoder: Dec,
        id_gen: Gen,
        naming: Name,
        listener: L,
    ) -> Result<Self, OpenError> {
        if !options.journal_path.is_dir() {
            return Err(OpenError::NotADirectory(options.journal_path));
        }
        if options.max_log_file_size == 0 {
            return Err(OpenError::InvalidMaxLogFileSize);
        }

        let listener = Arc::new(listener);

        let has_existing = std::fs::read_dir(&options.journal_path)?.next().is_some();
        let mut directory = SegmentDirectory::new();
        let mut next_log_number = 0u64;
        if has_existing {
            let outcome = replay::replay(&options.journal_path, &naming, &decoder, listener.as_ref())?;
            if let Some(max) = outcome.max_seen_record_id {
                id_gen.notify_highest_record_id(max);
            }
            next_log_number = outcome.last_log_number.map_or(0, |n| n + 1);
        }

        let head_path = options.journal_path.join(naming.generate(next_log_number));
        let head = SegmentFile::create(head_path, next_log_number, options.max_log_file_size, FileType::Default)?;
        directory.push_head(head);

        let engine = Arc::new(AppendEngine::new(
            options.journal_path.clone(),
            options.max_log_file_size,
            encoder,
            id_gen,
            naming,
            directory,
        ));

        let (tx, rx) = crossbeam_channel::unbounded::<QueueItem<V>>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let writer_engine = Arc::clone(&engine);
        let writer_listener = Arc::clone(&listener);
        let writer = std::thread::Builder::new()
            .name("journal-writer".into())
            .spawn(move || {
                for item in rx {
                    writer_engine.append_preencoded(item.entry, item.payload, writer_listener.as_ref());
                }
            })
            .map_err(OpenError::Io)?;

        Ok(Self {
            engine,
            listener,
            queue_tx: Some(tx),
            writer: Some(writer),
            shutdown,
            _decoder: std::marker::PhantomData,
        })
    }

    /// Append `entry` and wait for it to be durably written (or for the
    /// failure listener callback, on failure) before returning.
    pub fn append_synchronous(&self, entry: Entry<V>) -> Result<(), SubmitError<Enc::Error>> {
        self.engine.append_synchronous(entry, self.listener.as_ref())
    }

    /// Pre-encode `entry` and enqueue it for the writer thread. Returns as
    /// soon as encoding succeeds; durability is observed asynchronously via
    /// the listener.
    pub fn append(&self, entry: Entry<V>) -> Result<(), SubmitError<Enc::Error>> {
        let payload = self.engine.pre_encode(&entry).map_err(SubmitError::Encoding)?;
        let tx = self
            .queue_tx
            .as_ref()
            .expect("queue sender only taken down by close(), which consumes no further submissions");
        tx.send(QueueItem { entry, payload })
            .expect("writer thread is only joined after the sender is dropped");
        Ok(())
    }

    /// Commit `entries` atomically: either all are durably written to a
    /// single batch segment, or none are.
    pub fn commit_batch(&self, entries: Vec<Entry<V>>) -> Result<(), BatchSubmitError<Enc::Error>> {
        self.engine.commit_batch(entries, self.listener.as_ref())
    }

    /// The listener this journal was opened with.
    pub fn listener(&self) -> &L {
        self.listener.as_ref()
    }

    /// Drain the async queue, stop the writer thread, and close every open
    /// segment. Idempotent; safe to call more than once (including via
    /// `Drop`).
    pub fn close(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.queue_tx.take());
        if let Some(handle) = self.writer.take() {
            if handle.join().is_err() {
                log::error!("journal writer thread panicked during shutdown");
            }
        }
        self.engine.directory().lock().close_all();
    }
}

impl<V, Enc, Dec, Gen, Name, L> Drop for Journal<V, Enc, Dec, Gen, Name, L>
where
    Enc: EntryEncoder<V>,
    Gen: RecordIdGenerator,
    Name: NamingStrategy,
{
    fn drop(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.queue_tx.take());
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
        self.engine.directory().lock().close_all();
    }
}
