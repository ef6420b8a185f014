//! Maps segment log numbers to filenames and back. An external concern in
//! principle (an embedder might want segment files named after a different
//! scheme, e.g. to interleave with other file kinds in the same directory),
//! but every journal needs one, so a reference implementation ships here.

/// Strategy for naming segment files within a journal directory.
pub trait NamingStrategy: Send + Sync {
    /// Produce the filename for segment `log_number`.
    fn generate(&self, log_number: u64) -> String;

    /// Whether `file_name` names a segment file under this strategy.
    fn is_journal(&self, file_name: &str) -> bool;

    /// Recover the log number encoded in `file_name`, if any.
    fn extract_log_number(&self, file_name: &str) -> Option<u64>;
}

const SEGMENT_FILE_EXT: &str = ".journal";

/// Zero-padded decimal log number followed by [`SEGMENT_FILE_EXT`], e.g.
/// `00000000000000000007.journal`. Zero-padding keeps lexicographic and
/// numeric ordering of directory listings identical, which is convenient
/// but not relied upon: the journal always sorts by the parsed number.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultNamingStrategy;

impl NamingStrategy for DefaultNamingStrategy {
    fn generate(&self, log_number: u64) -> String {
        format!("{log_number:020}{SEGMENT_FILE_EXT}")
    }

    fn is_journal(&self, file_name: &str) -> bool {
        self.extract_log_number(file_name).is_some()
    }

    fn extract_log_number(&self, file_name: &str) -> Option<u64> {
        file_name.strip_suffix(SEGMENT_FILE_EXT)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_extract_round_trips() {
        let naming = DefaultNamingStrategy;
        for log_number in [0, 1, 7, u64::MAX] {
            let name = naming.generate(log_number);
            assert!(naming.is_journal(&name));
            assert_eq!(naming.extract_log_number(&name), Some(log_number));
        }
    }

    #[test]
    fn unrelated_file_is_not_a_journal() {
        let naming = DefaultNamingStrategy;
        assert!(!naming.is_journal("README.md"));
        assert!(!naming.is_journal("7.journal.bak"));
    }
}
