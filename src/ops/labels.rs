use std::collections::{HashMap, HashSet};

use crate::model::Plan;

/// Deduplicated label names across plans, most frequent first, ties broken
/// alphabetically. Drives the label modal's choice list and filter cycling.
pub fn recent_labels(plans: &[Plan]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for p in plans {
        for l in &p.labels {
            *counts.entry(l.as_str()).or_default() += 1;
        }
    }
    let mut sorted: Vec<(&str, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// Apply add/remove deltas to an existing label set. Order is preserved:
/// surviving existing labels first, then new additions, both deduplicated.
pub fn apply_label_changes(existing: &[String], add: &[String], remove: &[String]) -> Vec<String> {
    let remove_set: HashSet<&str> = remove.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result = Vec::new();
    for l in existing {
        if !remove_set.contains(l.as_str()) && seen.insert(l.as_str()) {
            result.push(l.clone());
        }
    }
    for a in add {
        if seen.insert(a.as_str()) {
            result.push(a.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::path::PathBuf;

    fn plan_with_labels(file: &str, labels: &[&str]) -> Plan {
        let now = Local::now();
        Plan {
            dir: PathBuf::from("/plans"),
            file: file.to_string(),
            status: String::new(),
            project: String::new(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            title: file.to_string(),
            created: now,
            modified: now,
            has_comments: false,
        }
    }

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recent_labels_frequency_order() {
        let plans = vec![
            plan_with_labels("a.md", &["web", "infra"]),
            plan_with_labels("b.md", &["web"]),
            plan_with_labels("c.md", &["api"]),
        ];
        assert_eq!(recent_labels(&plans), strs(&["web", "api", "infra"]));
    }

    #[test]
    fn test_recent_labels_empty() {
        assert!(recent_labels(&[]).is_empty());
    }

    #[test]
    fn test_apply_label_changes_order() {
        let out = apply_label_changes(
            &strs(&["shared", "old"]),
            &strs(&["atlas"]),
            &strs(&["old"]),
        );
        assert_eq!(out, strs(&["shared", "atlas"]));
    }

    #[test]
    fn test_apply_label_changes_dedup() {
        let out = apply_label_changes(&strs(&["a", "a", "b"]), &strs(&["b", "c"]), &[]);
        assert_eq!(out, strs(&["a", "b", "c"]));
    }

    #[test]
    fn test_apply_label_changes_remove_all() {
        let out = apply_label_changes(&strs(&["a"]), &[], &strs(&["a"]));
        assert!(out.is_empty());
    }
}
