use std::fs::Metadata;
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// File creation time where the platform exposes one (btime on Linux via
/// statx, birthtime on macOS/Windows), falling back to the modification
/// time. The created-descending sort depends on this being stable across
/// in-place rewrites.
pub fn created_time(meta: &Metadata) -> DateTime<Local> {
    let t = meta
        .created()
        .unwrap_or_else(|_| meta.modified().unwrap_or(SystemTime::UNIX_EPOCH));
    DateTime::<Local>::from(t)
}

/// File modification time as a local timestamp.
pub fn modified_time(meta: &Metadata) -> DateTime<Local> {
    DateTime::<Local>::from(meta.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_created_time_close_to_now() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "x").unwrap();
        let meta = fs::metadata(&path).unwrap();
        let created = created_time(&meta);
        let age = Local::now().signed_duration_since(created);
        assert!(age.num_seconds().abs() < 60);
    }

    #[test]
    fn test_in_place_rewrite_keeps_created_time() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "first").unwrap();
        let before = created_time(&fs::metadata(&path).unwrap());
        fs::write(&path, "second").unwrap();
        let after = created_time(&fs::metadata(&path).unwrap());
        // truncate+write keeps the inode, so birth time (or the mtime
        // fallback's ordering) must not move backwards
        assert!(after >= before);
    }
}
