use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use planc::io::scan::scan_plans;
use planc::io::store::{set_frontmatter, write_body};
use planc::parse::{parse_frontmatter, serialize_frontmatter};

/// Parse a fixture and serialize it back; the bytes must not change.
fn assert_file_round_trip(fixture_name: &str) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(fixture_name);
    let source = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Could not read fixture {}: {}", fixture_name, e));

    let (fields, body) = parse_frontmatter(&source);
    let output = serialize_frontmatter(&fields, &body);

    assert_eq!(
        output, source,
        "Round-trip failed for fixture: {}",
        fixture_name
    );
}

#[test]
fn round_trip_full_frontmatter() {
    assert_file_round_trip("full_frontmatter.md");
}

#[test]
fn round_trip_no_frontmatter() {
    assert_file_round_trip("no_frontmatter.md");
}

// ============================================================================
// End-to-end frontmatter writes against real files
// ============================================================================

#[test]
fn set_status_on_bare_plan_writes_exact_bytes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan-a.md");
    fs::write(&path, "# Plan A\n\nBody\n").unwrap();

    set_frontmatter(&path, &[("status", "active")]).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\nstatus: active\n---\n# Plan A\n\nBody\n"
    );
}

#[test]
fn write_keeps_file_identity() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.md");
    fs::write(&path, "# Plan\n").unwrap();

    #[cfg(unix)]
    let inode_before = {
        use std::os::unix::fs::MetadataExt;
        fs::metadata(&path).unwrap().ino()
    };

    set_frontmatter(&path, &[("status", "done")]).unwrap();
    set_frontmatter(&path, &[("labels", "infra")]).unwrap();

    // in-place truncate+write: same inode, so platforms with a birth
    // time keep it and the created-descending sort stays stable
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        assert_eq!(fs::metadata(&path).unwrap().ino(), inode_before);
    }
}

#[test]
fn body_survives_repeated_metadata_writes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.md");
    let body = "# Plan\n\nParagraph.\n\n```sh\nstatus: fenced\n```\n\nTail.\n";
    fs::write(&path, body).unwrap();

    set_frontmatter(&path, &[("status", "reviewed")]).unwrap();
    set_frontmatter(&path, &[("labels", "a, b")]).unwrap();
    set_frontmatter(&path, &[("status", "")]).unwrap();

    let (_, got_body) = parse_frontmatter(&fs::read_to_string(&path).unwrap());
    assert_eq!(got_body, body);
}

#[test]
fn deleting_last_key_twice_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.md");
    fs::write(&path, "---\nstatus: active\n---\n# P\n").unwrap();

    set_frontmatter(&path, &[("status", "")]).unwrap();
    let once = fs::read_to_string(&path).unwrap();
    set_frontmatter(&path, &[("status", "")]).unwrap();
    let twice = fs::read_to_string(&path).unwrap();

    assert_eq!(once, "# P\n");
    assert_eq!(once, twice);
}

#[test]
fn legacy_fields_migrate_on_read_without_write() {
    let tmp = TempDir::new().unwrap();
    let raw = "---\nstatus: pending\nproject: foo\n---\n# P\n";
    fs::write(tmp.path().join("legacy.md"), raw).unwrap();

    let plans = scan_plans(tmp.path()).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].status, "reviewed");
    assert_eq!(plans[0].labels, vec!["foo".to_string()]);
    assert_eq!(plans[0].project, "foo");
    assert_eq!(plans[0].title, "P");

    // the migration lives in memory only
    assert_eq!(fs::read_to_string(tmp.path().join("legacy.md")).unwrap(), raw);
}

#[test]
fn comment_body_write_preserves_frontmatter() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plan.md");
    fs::write(
        &path,
        "---\nstatus: active\nlabels: infra\nbranch: x\n---\n# Old heading\n",
    )
    .unwrap();

    write_body(&path, "# New heading\n\n> **[comment]:** noted\n").unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\nstatus: active\nlabels: infra\nbranch: x\n---\n# New heading\n\n> **[comment]:** noted\n"
    );
}
