use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::io::config_io::config_path;
use crate::msg::{Cmd, Msg};

const UPDATE_CHECK_INTERVAL_HOURS: i64 = 24;
const UPDATE_REQUEST_TTL: Duration = Duration::from_secs(5);
const UPDATE_REPO: &str = "jakebf/planc";
const UPDATE_API_BASE: &str = "https://api.github.com";

/// Bundled changelog, sliced for the release-notes overlay.
const CHANGELOG: &str = include_str!("../../CHANGELOG.md");

/// Persisted update-check state, next to the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latest_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub release_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_seen_version: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    tag_name: String,
    #[serde(default)]
    html_url: String,
}

pub fn update_state_path() -> Option<PathBuf> {
    let cfg = config_path().ok()?;
    Some(cfg.parent()?.join("update-check.json"))
}

pub fn load_update_state(path: &PathBuf) -> UpdateState {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
        Err(_) => UpdateState::default(),
    }
}

/// Atomic write (temp + rename): update state has no birth-time
/// constraint and must never be left truncated.
pub fn save_update_state(path: &PathBuf, st: &UpdateState) -> io::Result<()> {
    let dir = path.parent().ok_or(io::Error::other("no parent dir"))?;
    fs::create_dir_all(dir)?;
    let mut data = serde_json::to_vec_pretty(st).map_err(io::Error::other)?;
    data.push(b'\n');
    let tmp = dir.join(format!(".update-check-{}.tmp", std::process::id()));
    if let Err(e) = fs::write(&tmp, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn fetch_latest_release(base_url: &str, repo: &str) -> Result<ReleaseInfo, String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(UPDATE_REQUEST_TTL)
        .build()
        .map_err(|e| e.to_string())?;
    let url = format!(
        "{}/repos/{}/releases/latest",
        base_url.trim_end_matches('/'),
        repo
    );
    let resp = client
        .get(&url)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", "planc-update-check")
        .send()
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("github latest release: {}", resp.status()));
    }
    let rel: ReleaseInfo = resp.json().map_err(|e| e.to_string())?;
    if rel.tag_name.is_empty() {
        return Err("github latest release missing tag_name".to_string());
    }
    Ok(rel)
}

/// Daily update check. Uses the cached state when fresh; a failed fetch
/// does not advance `checked_at`, so it retries the next day.
fn check_for_update(current_version: &str) -> Option<Msg> {
    let path = update_state_path()?;
    let mut st = load_update_state(&path);

    if let Some(checked) = st.checked_at
        && (Utc::now() - checked).num_hours() < UPDATE_CHECK_INTERVAL_HOURS
    {
        if is_newer_version(current_version, &st.latest_version) {
            return Some(Msg::UpdateAvailable {
                version: st.latest_version.clone(),
                url: st.release_url.clone(),
            });
        }
        return None;
    }

    let latest = fetch_latest_release(UPDATE_API_BASE, UPDATE_REPO).ok()?;
    st.checked_at = Some(Utc::now());
    st.latest_version = latest.tag_name.clone();
    st.release_url = latest.html_url.clone();
    let _ = save_update_state(&path, &st);

    if is_newer_version(current_version, &latest.tag_name) {
        return Some(Msg::UpdateAvailable {
            version: latest.tag_name,
            url: latest.html_url,
        });
    }
    None
}

/// Release-notes check: when the running binary is newer than the last
/// seen version, surface the changelog slice in between.
fn check_for_release_notes(current_version: &str) -> Option<Msg> {
    let current = canonical_semver(current_version)?;
    let path = update_state_path()?;
    let mut st = load_update_state(&path);

    if st.last_seen_version.is_empty() {
        st.last_seen_version = current;
        let _ = save_update_state(&path, &st);
        return None;
    }
    if !is_newer_version(&st.last_seen_version, &current) {
        if st.last_seen_version != current {
            st.last_seen_version = current;
            let _ = save_update_state(&path, &st);
        }
        return None;
    }

    let mut notes = release_notes_since(&st.last_seen_version, &current, CHANGELOG);
    if notes.trim().is_empty() {
        notes = format!("## {}\n\nUpdated to {}.\n", current, current);
    }
    Some(Msg::ReleaseNotes {
        version: current,
        markdown: notes,
    })
}

/// Startup command combining the update check and release-notes check.
/// Returns None for dev builds, which never phone home.
pub fn startup_update_cmd(current_version: &str) -> Option<Cmd> {
    let version = current_version.trim().to_string();
    if version.is_empty() || version == "dev" {
        return None;
    }
    Some(Box::new(move || {
        let update = match check_for_update(&version) {
            Some(Msg::UpdateAvailable { version, url }) => Some((version, url)),
            _ => None,
        };
        let release_notes = match check_for_release_notes(&version) {
            Some(Msg::ReleaseNotes { version, markdown }) => Some((version, markdown)),
            _ => None,
        };
        if update.is_none() && release_notes.is_none() {
            return None;
        }
        Some(Msg::StartupUpdate {
            update,
            release_notes,
        })
    }))
}

/// Record that release notes for a version were dismissed.
pub fn mark_release_notes_seen(version: &str) -> Cmd {
    let version = version.trim().to_string();
    Box::new(move || {
        let path = update_state_path()?;
        let mut st = load_update_state(&path);
        st.last_seen_version = version;
        let _ = save_update_state(&path, &st);
        None
    })
}

// ─── Changelog slicing ──────────────────────────────────────────────────

struct ChangelogSection {
    heading: String,
    version: String,
    body: String,
}

fn parse_changelog_sections(changelog: &str) -> Vec<ChangelogSection> {
    let mut sections = Vec::new();
    let mut current: Option<ChangelogSection> = None;
    for line in changelog.lines() {
        if line.starts_with("## ") {
            if let Some(mut sec) = current.take() {
                sec.body = sec.body.trim().to_string();
                sections.push(sec);
            }
            current = version_from_heading(line).map(|v| ChangelogSection {
                heading: line.trim().to_string(),
                version: v,
                body: String::new(),
            });
            continue;
        }
        if let Some(sec) = &mut current {
            if !sec.body.is_empty() {
                sec.body.push('\n');
            }
            sec.body.push_str(line);
        }
    }
    if let Some(mut sec) = current.take() {
        sec.body = sec.body.trim().to_string();
        sections.push(sec);
    }
    sections
}

fn version_from_heading(line: &str) -> Option<String> {
    let rest = line.strip_prefix("## ")?.trim();
    if rest.is_empty() {
        return None;
    }
    let candidate = if let Some(stripped) = rest.strip_prefix('[') {
        stripped.split(']').next()?
    } else {
        rest.split_whitespace().next()?
    };
    let candidate = candidate.trim_matches(['[', ']', '(', ')']).trim_end_matches(':');
    canonical_semver(candidate)
}

/// Slice the changelog to sections newer than `last_seen` and no newer
/// than `current`, in file order.
pub fn release_notes_since(last_seen: &str, current: &str, changelog: &str) -> String {
    let mut picked = Vec::new();
    for sec in parse_changelog_sections(changelog) {
        let Some(cmp_low) = compare_versions(&sec.version, last_seen) else {
            continue;
        };
        if cmp_low <= 0 {
            continue;
        }
        let Some(cmp_high) = compare_versions(&sec.version, current) else {
            continue;
        };
        if cmp_high > 0 {
            continue;
        }
        let mut text = sec.heading.clone();
        if !sec.body.is_empty() {
            text.push('\n');
            text.push_str(&sec.body);
        }
        picked.push(text);
    }
    picked.join("\n\n").trim().to_string()
}

// ─── Semver ─────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct ParsedSemver {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: String,
}

fn parse_semver(s: &str) -> Option<ParsedSemver> {
    let mut s = s.trim();
    if s.is_empty() {
        return None;
    }
    s = s.strip_prefix('v').unwrap_or(s);
    if let Some(i) = s.find('+') {
        s = &s[..i];
    }
    let (core, prerelease) = match s.find('-') {
        Some(i) => (&s[..i], s[i + 1..].to_string()),
        None => (s, String::new()),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let nums: Vec<u64> = parts
        .iter()
        .map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                p.parse().ok()
            }
        })
        .collect::<Option<Vec<u64>>>()?;
    Some(ParsedSemver {
        major: nums[0],
        minor: nums[1],
        patch: nums[2],
        prerelease,
    })
}

pub fn canonical_semver(s: &str) -> Option<String> {
    let v = parse_semver(s)?;
    if v.prerelease.is_empty() {
        Some(format!("v{}.{}.{}", v.major, v.minor, v.patch))
    } else {
        Some(format!("v{}.{}.{}-{}", v.major, v.minor, v.patch, v.prerelease))
    }
}

fn compare_versions(a: &str, b: &str) -> Option<i32> {
    let va = parse_semver(a)?;
    let vb = parse_semver(b)?;
    Some(compare_semver(&va, &vb))
}

/// True when `latest` is strictly newer than `current`.
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    match (parse_semver(current), parse_semver(latest)) {
        (Some(cur), Some(next)) => compare_semver(&next, &cur) > 0,
        _ => false,
    }
}

fn compare_semver(a: &ParsedSemver, b: &ParsedSemver) -> i32 {
    if a.major != b.major {
        return if a.major < b.major { -1 } else { 1 };
    }
    if a.minor != b.minor {
        return if a.minor < b.minor { -1 } else { 1 };
    }
    if a.patch != b.patch {
        return if a.patch < b.patch { -1 } else { 1 };
    }
    compare_prerelease(&a.prerelease, &b.prerelease)
}

/// Semver precedence: stable ranks above any prerelease; dot-separated
/// identifiers compare numerically when both are digits, lexically
/// otherwise.
fn compare_prerelease(a: &str, b: &str) -> i32 {
    if a == b {
        return 0;
    }
    if a.is_empty() {
        return 1;
    }
    if b.is_empty() {
        return -1;
    }
    let parts_a: Vec<&str> = a.split('.').collect();
    let parts_b: Vec<&str> = b.split('.').collect();
    for (pa, pb) in parts_a.iter().zip(parts_b.iter()) {
        let na = pa.parse::<u64>().ok();
        let nb = pb.parse::<u64>().ok();
        match (na, nb) {
            (Some(x), Some(y)) if x != y => return if x < y { -1 } else { 1 },
            (Some(_), Some(_)) => {}
            (Some(_), None) => return -1,
            (None, Some(_)) => return 1,
            (None, None) => {
                if pa != pb {
                    return if pa < pb { -1 } else { 1 };
                }
            }
        }
    }
    match parts_a.len().cmp(&parts_b.len()) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Equal => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_semver_parse_and_canonical() {
        assert_eq!(canonical_semver("1.2.3"), Some("v1.2.3".to_string()));
        assert_eq!(canonical_semver("v1.2.3"), Some("v1.2.3".to_string()));
        assert_eq!(
            canonical_semver("v1.2.3-rc.1+build5"),
            Some("v1.2.3-rc.1".to_string())
        );
        assert_eq!(canonical_semver("1.2"), None);
        assert_eq!(canonical_semver("not-a-version"), None);
    }

    #[test]
    fn test_is_newer_version() {
        assert!(is_newer_version("v1.0.0", "v1.0.1"));
        assert!(is_newer_version("v1.9.0", "v2.0.0"));
        assert!(!is_newer_version("v1.0.1", "v1.0.0"));
        assert!(!is_newer_version("v1.0.0", "v1.0.0"));
        // stable ranks above its prereleases
        assert!(is_newer_version("v1.0.0-rc.1", "v1.0.0"));
        assert!(!is_newer_version("v1.0.0", "v1.0.0-rc.2"));
        // numeric prerelease identifiers compare numerically
        assert!(is_newer_version("v1.0.0-rc.2", "v1.0.0-rc.10"));
        // unparsable versions are never "newer"
        assert!(!is_newer_version("dev", "v1.0.0"));
    }

    #[test]
    fn test_update_state_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("update-check.json");
        let st = UpdateState {
            checked_at: Some(Utc::now()),
            latest_version: "v0.5.0".to_string(),
            release_url: "https://example.com/rel".to_string(),
            last_seen_version: "v0.4.0".to_string(),
        };
        save_update_state(&path, &st).unwrap();
        let back = load_update_state(&path);
        assert_eq!(back.latest_version, "v0.5.0");
        assert_eq!(back.last_seen_version, "v0.4.0");
        assert!(back.checked_at.is_some());
    }

    #[test]
    fn test_load_missing_state_is_default() {
        let tmp = TempDir::new().unwrap();
        let st = load_update_state(&tmp.path().join("nope.json"));
        assert!(st.checked_at.is_none());
        assert!(st.latest_version.is_empty());
    }

    const SAMPLE_CHANGELOG: &str = "# Changelog\n\n## v0.4.0\n\n- comment mode\n- label filters\n\n## [v0.3.1] - 2026-01-10\n\n- fix watcher echo\n\n## v0.3.0\n\n- first public release\n";

    #[test]
    fn test_changelog_sections() {
        let sections = parse_changelog_sections(SAMPLE_CHANGELOG);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].version, "v0.4.0");
        assert_eq!(sections[1].version, "v0.3.1");
        assert!(sections[1].body.contains("watcher echo"));
    }

    #[test]
    fn test_release_notes_since_slices_range() {
        let notes = release_notes_since("v0.3.0", "v0.4.0", SAMPLE_CHANGELOG);
        assert!(notes.contains("v0.4.0"));
        assert!(notes.contains("v0.3.1"));
        assert!(!notes.contains("first public release"));
    }

    #[test]
    fn test_release_notes_since_empty_when_current() {
        let notes = release_notes_since("v0.4.0", "v0.4.0", SAMPLE_CHANGELOG);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_startup_cmd_skips_dev_builds() {
        assert!(startup_update_cmd("dev").is_none());
        assert!(startup_update_cmd("").is_none());
    }
}
