use crate::error::{Result, TrackError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const MOVETRACK_DIR: &str = ".movetrack";
pub const DOCUMENTS_DIR: &str = ".movetrack/documents";

pub const CONFIG_FILE: &str = ".movetrack/config.yaml";
pub const DB_FILE: &str = ".movetrack/tracker.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

pub fn documents_dir(root: &Path) -> PathBuf {
    root.join(DOCUMENTS_DIR)
}

pub fn document_registry(root: &Path, move_id: &str) -> PathBuf {
    documents_dir(root).join(format!("{move_id}.yaml"))
}

// ---------------------------------------------------------------------------
// Sequence numbers
// ---------------------------------------------------------------------------

static SEQ_RE: OnceLock<Regex> = OnceLock::new();

fn seq_re() -> &'static Regex {
    SEQ_RE.get_or_init(|| Regex::new(r"^(?i:MV)-?(\d{1,12})$").unwrap())
}

/// Human-readable move number, e.g. `MV-000042`.
pub fn format_sequence(n: u64) -> String {
    format!("MV-{n:06}")
}

/// Parse `MV-000042` (case-insensitive, dash optional) back into its number.
pub fn parse_sequence(s: &str) -> Result<u64> {
    let caps = seq_re()
        .captures(s.trim())
        .ok_or_else(|| TrackError::Validation(format!("not a move number: '{s}'")))?;
    caps[1]
        .parse()
        .map_err(|_| TrackError::Validation(format!("not a move number: '{s}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_format_and_parse() {
        assert_eq!(format_sequence(42), "MV-000042");
        assert_eq!(parse_sequence("MV-000042").unwrap(), 42);
        assert_eq!(parse_sequence("mv42").unwrap(), 42);
        assert_eq!(parse_sequence("MV-1234567").unwrap(), 1_234_567);
    }

    #[test]
    fn sequence_rejects_garbage() {
        for s in ["", "MV-", "42", "XX-0001", "MV-12a"] {
            assert!(parse_sequence(s).is_err(), "expected invalid: {s}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.movetrack/config.yaml")
        );
        assert_eq!(
            document_registry(root, "abc"),
            PathBuf::from("/tmp/proj/.movetrack/documents/abc.yaml")
        );
    }
}
