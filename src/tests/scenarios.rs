use tempfile::tempdir;

use crate::tests::helpers::{enable_logging, open_journal};
use crate::Entry;

#[test]
fn scenario_1_simple_append() {
    enable_logging();
    let dir = tempdir().unwrap();
    let journal = open_journal(dir.path(), 4096);

    journal.append_synchronous(Entry::new(b"A".to_vec(), 1)).unwrap();
    journal.append_synchronous(Entry::new(b"BB".to_vec(), 1)).unwrap();
    journal.append_synchronous(Entry::new(b"CCC".to_vec(), 2)).unwrap();

    let commits = journal.listener().commits();
    assert_eq!(commits.len(), 3);
    assert_eq!(commits[0].entry, b"A".to_vec());
    assert_eq!(commits[1].entry, b"BB".to_vec());
    assert_eq!(commits[2].entry, b"CCC".to_vec());
    assert_eq!(commits[0].meta.record_id, 0);
    assert_eq!(commits[1].meta.record_id, 1);
    assert_eq!(commits[2].meta.record_id, 2);
    assert!(commits.iter().all(|r| r.meta.log_number == 0));

    // 25 + (17+1) + (17+2) + (17+3) = 82
    let segment_path = dir.path().join("00000000000000000000.journal");
    assert_eq!(std::fs::metadata(segment_path).unwrap().len(), 82);
}

#[test]
fn scenario_2_rollover_on_overflow() {
    enable_logging();
    let dir = tempdir().unwrap();
    // A fresh segment can hold exactly one 20-byte-payload record
    // (25 + 17 + 20 = 62), but not two (25 + 2*37 = 99 > 62).
    let journal = open_journal(dir.path(), 62);

    let payload = vec![7u8; 20];
    journal.append_synchronous(Entry::new(payload.clone(), 1)).unwrap();
    journal.append_synchronous(Entry::new(payload.clone(), 1)).unwrap();

    let commits = journal.listener().commits();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].meta.log_number, 0);
    assert_eq!(commits[1].meta.log_number, 1, "second record should roll into a new segment");

    let seg0 = std::fs::metadata(dir.path().join("00000000000000000000.journal")).unwrap();
    assert_eq!(seg0.len(), 62);
}

#[test]
fn scenario_3_oversize_routes_to_overflow_segment() {
    enable_logging();
    let dir = tempdir().unwrap();
    let journal = open_journal(dir.path(), 100);

    let payload = vec![0u8; 200];
    journal.append_synchronous(Entry::new(payload.clone(), 9)).unwrap();

    let commits = journal.listener().commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].meta.log_number, 1, "oversize record gets a fresh dedicated segment");
    assert_eq!(commits[0].meta.length as usize, 17 + 200);

    // 200 (payload) + 42 (file header + record header) = 242
    let overflow_segment = std::fs::metadata(dir.path().join("00000000000000000001.journal")).unwrap();
    assert_eq!(overflow_segment.len(), 242);
}

#[test]
fn asynchronous_append_preserves_submission_order() {
    enable_logging();
    let dir = tempdir().unwrap();
    let mut journal = open_journal(dir.path(), 4096);

    for i in 0..50u8 {
        journal.append(Entry::new(vec![i], 1)).unwrap();
    }
    journal.close();

    let commits = journal.listener().commits();
    assert_eq!(commits.len(), 50);
    for (i, record) in commits.iter().enumerate() {
        assert_eq!(record.entry, vec![i as u8]);
        assert_eq!(record.meta.record_id, i as u64);
    }
}

#[test]
fn replay_reproduces_committed_entries_in_order() {
    enable_logging();
    let dir = tempdir().unwrap();
    {
        let journal = open_journal(dir.path(), 4096);
        journal.append_synchronous(Entry::new(b"one".to_vec(), 1)).unwrap();
        journal.append_synchronous(Entry::new(b"two".to_vec(), 1)).unwrap();
        journal.append_synchronous(Entry::new(b"three".to_vec(), 2)).unwrap();
    } // journal closes on drop

    let journal = open_journal(dir.path(), 4096);
    let replays = journal.listener().replays();
    assert_eq!(replays.len(), 3);
    assert_eq!(replays[0].entry, b"one".to_vec());
    assert_eq!(replays[1].entry, b"two".to_vec());
    assert_eq!(replays[2].entry, b"three".to_vec());

    // New appends continue the id sequence and land in a fresh head segment.
    journal.append_synchronous(Entry::new(b"four".to_vec(), 1)).unwrap();
    let commits = journal.listener().commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].meta.record_id, 3);
    assert_eq!(commits[0].meta.log_number, 1);
}
