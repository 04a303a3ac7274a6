use std::path::PathBuf;

use tempfile::TempDir;

/// Write `content` to a file named `name` in a new temporary directory.
pub fn fixture(name: &str, content: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("failed to write fixture");
    (dir, path)
}

/// A stream shaped like DAQ output: filler padding, idle heartbeat records, and
/// 3 readouts holding 4 hits in total.
pub const STREAM: &[u8] = b"ffffffff'20a1b2c3d4bcbcbcbc''bcbcbcbc20bcbcbcbc''20c48c402020a1b2c3d4'ffff'ffff";
