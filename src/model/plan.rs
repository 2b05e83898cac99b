use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Status values a plan can carry. Unset is the empty string, both in
/// memory and in frontmatter (where the key is simply omitted).
pub const STATUS_UNSET: &str = "";
pub const STATUS_REVIEWED: &str = "reviewed";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DONE: &str = "done";

/// A single plan file with its parsed metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Directory containing this plan file
    pub dir: PathBuf,
    /// Base filename, always ending in `.md`
    pub file: String,
    /// Status from frontmatter, or "" (unset). Legacy `pending` is
    /// migrated to `reviewed` on read and never written back as-is.
    pub status: String,
    /// Legacy `project` frontmatter value, kept as a read-only echo
    pub project: String,
    /// Normalized labels (lowercase, deduplicated, sorted)
    pub labels: Vec<String>,
    /// Text of the first `# ` heading, or the filename sans `.md`
    pub title: String,
    /// File birth time where the platform exposes one, mtime otherwise
    pub created: DateTime<Local>,
    /// File modification time
    pub modified: DateTime<Local>,
    /// True if the body contains comment blockquotes outside code fences
    pub has_comments: bool,
}

impl Plan {
    /// Full path uniquely identifying this plan.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }

    /// Path as a string key for selection sets and caches.
    pub fn path_string(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    /// Text the list search matches against.
    pub fn filter_value(&self) -> String {
        format!(
            "{} {} {} {}",
            self.status,
            self.labels.join(" "),
            self.title,
            self.file
        )
    }
}

/// Forward status cycle: unset → reviewed → active → done → reviewed.
/// Never cycles back to unset; unset is a transient "new" state.
pub fn next_status(current: &str) -> &'static str {
    match current {
        STATUS_UNSET => STATUS_REVIEWED,
        STATUS_REVIEWED => STATUS_ACTIVE,
        STATUS_ACTIVE => STATUS_DONE,
        STATUS_DONE => STATUS_REVIEWED,
        _ => STATUS_REVIEWED,
    }
}

/// List badge for a status value.
pub fn status_icon(status: &str) -> &'static str {
    match status {
        STATUS_ACTIVE => "●",
        STATUS_REVIEWED => "○",
        STATUS_DONE => "✓",
        _ => "·",
    }
}

/// Display name for a status value ("new" for unset).
pub fn status_label(status: &str) -> &'static str {
    match status {
        STATUS_ACTIVE => "active",
        STATUS_REVIEWED => "reviewed",
        STATUS_DONE => "done",
        _ => "new",
    }
}

/// Migrate a raw frontmatter status to the current vocabulary.
pub fn migrate_status(raw: &str) -> String {
    if raw == "pending" {
        STATUS_REVIEWED.to_string()
    } else {
        raw.to_string()
    }
}

/// Split a comma-separated labels string into normalized labels:
/// trimmed, lowercased, deduplicated, sorted.
pub fn parse_labels(s: &str) -> Vec<String> {
    let mut labels: Vec<String> = s
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Join labels with ", " for frontmatter serialization.
pub fn labels_string(labels: &[String]) -> String {
    labels.join(", ")
}

/// Sort plans by creation time descending, breaking ties by path so the
/// order is deterministic across scans.
pub fn sort_plans(plans: &mut [Plan]) {
    plans.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.path().cmp(&b.path())));
}

/// Apply the visibility rules to a plan list.
///
/// - a non-empty `label_filter` keeps only plans carrying that label;
/// - with `show_done` off, done plans are hidden unless kept;
/// - with `show_done` off, unset plans are hidden unless kept or modified
///   after `installed` (those are likely new). A missing install timestamp
///   hides all unset plans.
pub fn filter_plans(
    plans: &[Plan],
    show_done: bool,
    keep: &HashSet<String>,
    label_filter: &str,
    installed: Option<DateTime<Local>>,
) -> Vec<Plan> {
    plans
        .iter()
        .filter(|p| {
            if !label_filter.is_empty() && !p.labels.iter().any(|l| l == label_filter) {
                return false;
            }
            if !show_done && !keep.contains(&p.path_string()) {
                if p.status == STATUS_DONE {
                    return false;
                }
                if p.status.is_empty() {
                    match installed {
                        Some(at) if p.modified >= at => {}
                        _ => return false,
                    }
                }
            }
            true
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn plan_at(file: &str, status: &str, days_ago: i64) -> Plan {
        let base = Local.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t = base - chrono::Duration::days(days_ago);
        Plan {
            dir: PathBuf::from("/plans"),
            file: file.to_string(),
            status: status.to_string(),
            project: String::new(),
            labels: Vec::new(),
            title: file.trim_end_matches(".md").to_string(),
            created: t,
            modified: t,
            has_comments: false,
        }
    }

    #[test]
    fn test_next_status_cycle() {
        assert_eq!(next_status(""), "reviewed");
        assert_eq!(next_status("reviewed"), "active");
        assert_eq!(next_status("active"), "done");
        // never cycles back to unset
        assert_eq!(next_status("done"), "reviewed");
    }

    #[test]
    fn test_migrate_status_pending() {
        assert_eq!(migrate_status("pending"), "reviewed");
        assert_eq!(migrate_status("active"), "active");
        assert_eq!(migrate_status(""), "");
    }

    #[test]
    fn test_parse_labels_normalizes() {
        assert_eq!(parse_labels("Web, infra , web,"), vec!["infra", "web"]);
        assert!(parse_labels("").is_empty());
        assert!(parse_labels(" , ,").is_empty());
    }

    #[test]
    fn test_labels_round_trip() {
        let labels = parse_labels("beta, alpha");
        assert_eq!(labels_string(&labels), "alpha, beta");
    }

    #[test]
    fn test_sort_plans_created_desc_path_tiebreak() {
        let mut plans = vec![
            plan_at("b.md", "", 5),
            plan_at("c.md", "", 0),
            plan_at("a.md", "", 5),
        ];
        sort_plans(&mut plans);
        let files: Vec<&str> = plans.iter().map(|p| p.file.as_str()).collect();
        assert_eq!(files, vec!["c.md", "a.md", "b.md"]);
    }

    #[test]
    fn test_filter_hides_done() {
        let plans = vec![plan_at("a.md", "done", 1), plan_at("b.md", "active", 1)];
        let visible = filter_plans(&plans, false, &HashSet::new(), "", None);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].file, "b.md");
        let all = filter_plans(&plans, true, &HashSet::new(), "", None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_filter_keep_set_overrides() {
        let plans = vec![plan_at("a.md", "done", 1)];
        let keep: HashSet<String> = [plans[0].path_string()].into();
        let visible = filter_plans(&plans, false, &keep, "", None);
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_filter_unset_install_pivot() {
        let plans = vec![plan_at("old.md", "", 10), plan_at("new.md", "", 1)];
        // installed 5 days before the fixed base — only new.md survives
        let installed = Some(plans[0].modified + chrono::Duration::days(5));
        let visible = filter_plans(&plans, false, &HashSet::new(), "", installed);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].file, "new.md");
        // no install timestamp hides all unset plans
        let none = filter_plans(&plans, false, &HashSet::new(), "", None);
        assert!(none.is_empty());
    }

    #[test]
    fn test_filter_label() {
        let mut a = plan_at("a.md", "active", 1);
        a.labels = vec!["web".into()];
        let b = plan_at("b.md", "active", 2);
        let visible = filter_plans(&[a, b], false, &HashSet::new(), "web", None);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].file, "a.md");
    }

    #[test]
    fn test_filter_value_includes_metadata() {
        let mut p = plan_at("a.md", "active", 1);
        p.labels = vec!["infra".into()];
        let fv = p.filter_value();
        assert!(fv.contains("active"));
        assert!(fv.contains("infra"));
        assert!(fv.contains("a.md"));
    }
}
