use std::path::Path;

use crate::{
    AtomicRecordIdGenerator, BytesCodec, DefaultNamingStrategy, Journal, JournalOptions, RecordingListener,
};

pub type TestJournal =
    Journal<Vec<u8>, BytesCodec, BytesCodec, AtomicRecordIdGenerator, DefaultNamingStrategy, RecordingListener<Vec<u8>>>;

pub fn open_journal(dir: &Path, max_log_file_size: u32) -> TestJournal {
    Journal::open(
        JournalOptions {
            journal_path: dir.to_path_buf(),
            max_log_file_size,
        },
        BytesCodec,
        BytesCodec,
        AtomicRecordIdGenerator::default(),
        DefaultNamingStrategy,
        RecordingListener::new(),
    )
    .unwrap()
}

pub fn enable_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .format_timestamp(None)
        .is_test(true)
        .try_init();
}
