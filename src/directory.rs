//! The ordered set of segments belonging to one journal.

use crate::segment::SegmentFile;

/// Segments belonging to one journal, ordered by ascending `log_number`.
/// The last element, if any, is the head: the only segment new appends
/// target.
#[derive(Default)]
pub struct SegmentDirectory {
    segments: Vec<SegmentFile>,
}

impl SegmentDirectory {
    pub fn new() -> Self {
        Self { segments: Vec::new() }
    }

    /// Add a newly opened segment as the new head.
    ///
    /// # Panics
    ///
    /// Panics if `segment`'s `log_number` does not strictly exceed the
    /// current head's -- this would indicate a bug in the caller's
    /// log-number bookkeeping, not a recoverable runtime condition.
    pub fn push_head(&mut self, segment: SegmentFile) {
        if let Some(prev) = self.segments.last() {
            assert!(
                segment.log_number() > prev.log_number(),
                "segment log numbers must strictly increase: {} is not > {}",
                segment.log_number(),
                prev.log_number()
            );
        }
        self.segments.push(segment);
    }

    /// Remove and return the head segment. Only used by batch rollback.
    pub fn pop_head(&mut self) -> Option<SegmentFile> {
        self.segments.pop()
    }

    pub fn head(&self) -> Option<&SegmentFile> {
        self.segments.last()
    }

    /// The log number the next pushed segment must use.
    pub fn next_log_number(&self) -> u64 {
        self.segments.last().map_or(0, |s| s.log_number() + 1)
    }

    pub fn iter_oldest_to_newest(&self) -> impl Iterator<Item = &SegmentFile> {
        self.segments.iter()
    }

    /// Close every segment, oldest first. Best-effort: logs and continues
    /// past individual close failures so one bad segment doesn't prevent
    /// closing the rest.
    pub fn close_all(&self) {
        for segment in self.iter_oldest_to_newest() {
            if let Err(e) = segment.close() {
                log::warn!("failed to close segment {}: {e}", segment.log_number());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileType;
    use tempfile::tempdir;

    #[test]
    fn next_log_number_starts_at_zero() {
        let dir = SegmentDirectory::new();
        assert_eq!(dir.next_log_number(), 0);
    }

    #[test]
    fn push_head_tracks_latest() {
        let tmp = tempdir().unwrap();
        let mut dir = SegmentDirectory::new();
        let s0 = crate::segment::SegmentFile::create(tmp.path().join("0"), 0, 4096, FileType::Default).unwrap();
        dir.push_head(s0);
        assert_eq!(dir.next_log_number(), 1);
        let s1 = crate::segment::SegmentFile::create(tmp.path().join("1"), 1, 4096, FileType::Default).unwrap();
        dir.push_head(s1);
        assert_eq!(dir.head().unwrap().log_number(), 1);
        assert_eq!(dir.next_log_number(), 2);
    }

    #[test]
    #[should_panic(expected = "strictly increase")]
    fn push_head_rejects_non_increasing_log_number() {
        let tmp = tempdir().unwrap();
        let mut dir = SegmentDirectory::new();
        let s1 = crate::segment::SegmentFile::create(tmp.path().join("1"), 1, 4096, FileType::Default).unwrap();
        dir.push_head(s1);
        let s0 = crate::segment::SegmentFile::create(tmp.path().join("0"), 0, 4096, FileType::Default).unwrap();
        dir.push_head(s0);
    }
}
