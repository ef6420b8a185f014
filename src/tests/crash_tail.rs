use std::fs::OpenOptions;

use tempfile::tempdir;

use crate::tests::helpers::{enable_logging, open_journal};
use crate::Entry;

#[test]
fn truncated_tail_replays_a_clean_prefix_and_stops() {
    enable_logging();
    let dir = tempdir().unwrap();

    {
        let journal = open_journal(dir.path(), 4096);
        for i in 0..3u8 {
            journal.append_synchronous(Entry::new(vec![i], 1)).unwrap();
        }
    }
    {
        // A second segment, so we can confirm replay still proceeds past
        // the truncated one if it weren't the last -- here it happens to
        // also be last, which is the scenario under test.
        let journal = open_journal(dir.path(), 4096);
        for i in 3..6u8 {
            journal.append_synchronous(Entry::new(vec![i], 1)).unwrap();
        }
    }

    let segment_path = dir.path().join("00000000000000000001.journal");
    let full_len = std::fs::metadata(&segment_path).unwrap().len();
    // Truncate a few bytes into the header of what would be the third
    // record of the second segment, splitting a record header mid-field.
    let truncate_at = full_len - 5;
    let file = OpenOptions::new().write(true).open(&segment_path).unwrap();
    file.set_len(truncate_at).unwrap();
    drop(file);

    let journal = open_journal(dir.path(), 4096);
    let replays = journal.listener().replays();
    assert_eq!(replays.len(), 5, "the truncated record must not be replayed");
    for (i, record) in replays.iter().enumerate() {
        assert_eq!(record.entry, vec![i as u8]);
    }
}

#[test]
fn truncating_exactly_at_a_record_boundary_replays_cleanly() {
    enable_logging();
    let dir = tempdir().unwrap();
    {
        let journal = open_journal(dir.path(), 4096);
        for i in 0..4u8 {
            journal.append_synchronous(Entry::new(vec![i], 1)).unwrap();
        }
    }

    let segment_path = dir.path().join("00000000000000000000.journal");
    // 25 (file header) + 2 * (17 + 1) = 61: exactly two records.
    let file = OpenOptions::new().write(true).open(&segment_path).unwrap();
    file.set_len(61).unwrap();
    drop(file);

    let journal = open_journal(dir.path(), 4096);
    let replays = journal.listener().replays();
    assert_eq!(replays.len(), 2);
    assert_eq!(replays[0].entry, vec![0u8]);
    assert_eq!(replays[1].entry, vec![1u8]);
}
