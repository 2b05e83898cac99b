use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::io::scan::scan_all_plans;
use crate::io::watcher::mark_self_write;
use crate::model::{Plan, labels_string, parse_labels};
use crate::msg::{Cmd, Msg};
use crate::ops::comments::{compute_render_lines, extract_toc};
use crate::parse::{parse_frontmatter, serialize_frontmatter};
use crate::render::{MdStyle, RenderedDoc, render_markdown};

/// Merge updates into a plan file's frontmatter and rewrite it in place.
///
/// An empty-string value deletes the key; an empty resulting map elides
/// the frontmatter block entirely. The write is deliberately
/// truncate-and-write rather than temp-file-and-rename: an atomic rename
/// allocates a new file identity on some platforms and resets the birth
/// time, which would scramble the created-descending sort. The narrow
/// torn-write-on-crash risk is the accepted trade-off.
pub fn set_frontmatter(path: &Path, updates: &[(&str, &str)]) -> io::Result<()> {
    let data = fs::read_to_string(path)?;
    let (mut existing, body) = parse_frontmatter(&data);
    for (k, v) in updates {
        if v.is_empty() {
            existing.remove(*k);
        } else {
            existing.insert(k.to_string(), v.to_string());
        }
    }
    let result = serialize_frontmatter(&existing, &body);
    mark_self_write();
    fs::write(path, result)
}

/// Rewrite a plan file with a new body, preserving its frontmatter
/// byte-for-byte semantics (same key ordering rules as set_frontmatter).
pub fn write_body(path: &Path, new_body: &str) -> io::Result<()> {
    let data = fs::read_to_string(path)?;
    let (existing, _) = parse_frontmatter(&data);
    let result = serialize_frontmatter(&existing, new_body);
    mark_self_write();
    fs::write(path, result)
}

/// The mutation surface the event core drives. Implemented by
/// [`DiskStore`] for real files and by the demo store for in-memory
/// plans; both return the same message shapes.
pub trait PlanStore {
    fn set_status(&self, plan: &Plan, status: &str) -> Cmd;
    fn set_labels(&self, plan: &Plan, labels: Vec<String>) -> Cmd;
    fn delete_plan(&self, plan: &Plan) -> Cmd;
    fn batch_set_status(&self, paths: Vec<String>, status: &str) -> Cmd;
    fn batch_update_labels(&self, paths: Vec<String>, add: Vec<String>, remove: Vec<String>)
    -> Cmd;
}

/// Store backed by the real filesystem.
pub struct DiskStore {
    pub agent_dir: PathBuf,
    pub project_glob: String,
}

impl PlanStore for DiskStore {
    fn set_status(&self, plan: &Plan, status: &str) -> Cmd {
        let old = plan.clone();
        let status = status.to_string();
        Box::new(move || {
            let path = old.path();
            if let Err(e) = set_frontmatter(&path, &[("status", &status)]) {
                return Some(Msg::Error(e.to_string()));
            }
            let mut new = old.clone();
            new.status = status;
            Some(Msg::StatusUpdated {
                old: Box::new(old),
                new: Box::new(new),
            })
        })
    }

    fn set_labels(&self, plan: &Plan, labels: Vec<String>) -> Cmd {
        let old = plan.clone();
        Box::new(move || {
            let path = old.path();
            let joined = labels_string(&labels);
            // setting labels also clears the legacy project key
            if let Err(e) = set_frontmatter(&path, &[("labels", &joined), ("project", "")]) {
                return Some(Msg::Error(e.to_string()));
            }
            let mut new = old.clone();
            new.labels = labels;
            new.project = String::new();
            Some(Msg::LabelsUpdated { plan: Box::new(new) })
        })
    }

    fn delete_plan(&self, plan: &Plan) -> Cmd {
        let path = plan.path();
        let agent_dir = self.agent_dir.clone();
        let glob = self.project_glob.clone();
        Box::new(move || {
            // racing an external delete is fine: not-exist is not an error
            if let Err(e) = fs::remove_file(&path)
                && e.kind() != io::ErrorKind::NotFound
            {
                return Some(Msg::Error(format!("could not delete file: {}", e)));
            }
            match scan_all_plans(&agent_dir, &glob) {
                Ok(plans) => Some(Msg::Reload { plans }),
                Err(e) => Some(Msg::Error(e.to_string())),
            }
        })
    }

    fn batch_set_status(&self, paths: Vec<String>, status: &str) -> Cmd {
        let status = status.to_string();
        let agent_dir = self.agent_dir.clone();
        let glob = self.project_glob.clone();
        Box::new(move || {
            let mut failed = 0;
            for path in &paths {
                if set_frontmatter(Path::new(path), &[("status", &status)]).is_err() {
                    failed += 1;
                }
            }
            let plans = match scan_all_plans(&agent_dir, &glob) {
                Ok(p) => p,
                Err(e) => return Some(Msg::Error(e.to_string())),
            };
            let label = if status.is_empty() { "unset" } else { &status };
            let mut message = format!("{} plans → {}", paths.len(), label);
            if failed > 0 {
                message.push_str(&format!(" ({} failed)", failed));
            }
            Some(Msg::BatchDone {
                plans,
                paths,
                message,
            })
        })
    }

    fn batch_update_labels(
        &self,
        paths: Vec<String>,
        add: Vec<String>,
        remove: Vec<String>,
    ) -> Cmd {
        let agent_dir = self.agent_dir.clone();
        let glob = self.project_glob.clone();
        Box::new(move || {
            let mut failed = 0;
            for path in &paths {
                match fs::read_to_string(path) {
                    Ok(data) => {
                        let (fm, _) = parse_frontmatter(&data);
                        let mut existing =
                            parse_labels(fm.get("labels").map(String::as_str).unwrap_or(""));
                        if existing.is_empty()
                            && let Some(project) = fm.get("project")
                            && !project.is_empty()
                        {
                            existing = vec![project.to_lowercase()];
                        }
                        let new_labels =
                            crate::ops::labels::apply_label_changes(&existing, &add, &remove);
                        let joined = labels_string(&new_labels);
                        if set_frontmatter(
                            Path::new(path),
                            &[("labels", &joined), ("project", "")],
                        )
                        .is_err()
                        {
                            failed += 1;
                        }
                    }
                    Err(_) => failed += 1,
                }
            }
            let plans = match scan_all_plans(&agent_dir, &glob) {
                Ok(p) => p,
                Err(e) => return Some(Msg::Error(e.to_string())),
            };
            let message = batch_label_summary(paths.len(), &add, &remove, failed);
            Some(Msg::BatchDone {
                plans,
                paths,
                message,
            })
        })
    }
}

/// Summary line for batch label results: `"N plans +a,b -c"`.
pub fn batch_label_summary(count: usize, add: &[String], remove: &[String], failed: usize) -> String {
    let mut parts = Vec::new();
    if !add.is_empty() {
        parts.push(format!("+{}", add.join(",")));
    }
    if !remove.is_empty() {
        parts.push(format!("-{}", remove.join(",")));
    }
    let mut message = format!("{} plans {}", count, parts.join(" "));
    if failed > 0 {
        message.push_str(&format!(" ({} failed)", failed));
    }
    message
}

/// Rescan all plan directories and replace the list.
pub fn reload_plans_cmd(agent_dir: PathBuf, project_glob: String) -> Cmd {
    Box::new(move || match scan_all_plans(&agent_dir, &project_glob) {
        Ok(plans) => Some(Msg::Reload { plans }),
        Err(e) => Some(Msg::Error(e.to_string())),
    })
}

/// Render one plan file's body for the preview cache. Read failures
/// become a readable preview rather than an error state.
pub fn render_plan_cmd(path: String, style: MdStyle, width: usize) -> Cmd {
    Box::new(move || {
        let doc = match fs::read_to_string(&path) {
            Ok(data) => {
                let (_, body) = parse_frontmatter(&data);
                render_markdown(&body, style, width)
            }
            Err(e) => RenderedDoc::plain(&format!("Error reading {}: {}", path, e)),
        };
        Some(Msg::PlanContent {
            path,
            doc: Arc::new(doc),
        })
    })
}

/// Render in-memory markdown for the preview cache (demo mode).
pub fn render_content_cmd(path: String, markdown: String, style: MdStyle, width: usize) -> Cmd {
    Box::new(move || {
        let doc = render_markdown(&markdown, style, width);
        Some(Msg::PlanContent {
            path,
            doc: Arc::new(doc),
        })
    })
}

/// Enter comment mode: read the plan, extract the ToC, render the body,
/// and map ToC entries onto rendered lines.
pub fn load_comment_cmd(path: String, style: MdStyle, width: usize) -> Cmd {
    Box::new(move || {
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) => return Some(Msg::Error(e.to_string())),
        };
        let (_, body) = parse_frontmatter(&data);
        let (doc, toc) = render_and_map(&body, style, width);
        Some(Msg::CommentLoaded {
            path,
            raw_body: body,
            doc,
            toc,
        })
    })
}

/// Save a comment edit: write the new body (frontmatter preserved), then
/// re-extract, re-render, and re-map.
pub fn save_comment_cmd(path: String, new_body: String, style: MdStyle, width: usize) -> Cmd {
    Box::new(move || {
        if let Err(e) = write_body(Path::new(&path), &new_body) {
            return Some(Msg::Error(e.to_string()));
        }
        let (doc, toc) = render_and_map(&new_body, style, width);
        Some(Msg::CommentSaved {
            path,
            raw_body: new_body,
            doc,
            toc,
        })
    })
}

pub(crate) fn render_and_map(
    body: &str,
    style: MdStyle,
    width: usize,
) -> (Arc<RenderedDoc>, Vec<crate::ops::comments::TocEntry>) {
    let doc = render_markdown(body, style, width);
    let mut toc = extract_toc(body);
    compute_render_lines(&mut toc, &doc);
    (Arc::new(doc), toc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use tempfile::TempDir;

    fn plan_in(dir: &Path, file: &str) -> Plan {
        let now = Local::now();
        Plan {
            dir: dir.to_path_buf(),
            file: file.to_string(),
            status: String::new(),
            project: String::new(),
            labels: Vec::new(),
            title: file.to_string(),
            created: now,
            modified: now,
            has_comments: false,
        }
    }

    #[test]
    fn test_set_frontmatter_on_bare_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "# Plan A\n\nBody\n").unwrap();
        set_frontmatter(&path, &[("status", "active")]).unwrap();
        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "---\nstatus: active\n---\n# Plan A\n\nBody\n");
    }

    #[test]
    fn test_set_frontmatter_body_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        let body = "# Plan\n\nLine one\n\n```\ncode: not frontmatter\n```\n";
        fs::write(&path, body).unwrap();
        set_frontmatter(&path, &[("status", "done")]).unwrap();
        set_frontmatter(&path, &[("labels", "x")]).unwrap();
        let out = fs::read_to_string(&path).unwrap();
        let (_, got_body) = parse_frontmatter(&out);
        assert_eq!(got_body, body);
    }

    #[test]
    fn test_set_frontmatter_delete_key_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "---\nstatus: active\nlabels: x\n---\nBody\n").unwrap();
        set_frontmatter(&path, &[("labels", "")]).unwrap();
        let once = fs::read_to_string(&path).unwrap();
        set_frontmatter(&path, &[("labels", "")]).unwrap();
        let twice = fs::read_to_string(&path).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, "---\nstatus: active\n---\nBody\n");
    }

    #[test]
    fn test_set_frontmatter_elides_empty_block() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "---\nstatus: active\n---\n# P\n").unwrap();
        set_frontmatter(&path, &[("status", "")]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# P\n");
    }

    #[test]
    fn test_set_frontmatter_preserves_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "---\nbranch: feat/x\nstatus: done\n---\nB\n").unwrap();
        set_frontmatter(&path, &[("status", "active")]).unwrap();
        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "---\nstatus: active\nbranch: feat/x\n---\nB\n");
    }

    #[test]
    fn test_write_body_preserves_frontmatter() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "---\nstatus: active\n---\n# Old\n").unwrap();
        write_body(&path, "# New body\n").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "---\nstatus: active\n---\n# New body\n"
        );
    }

    #[test]
    fn test_disk_store_set_status_message() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "# A\n").unwrap();
        let store = DiskStore {
            agent_dir: tmp.path().to_path_buf(),
            project_glob: String::new(),
        };
        let plan = plan_in(tmp.path(), "a.md");
        let msg = (store.set_status(&plan, "done"))().unwrap();
        match msg {
            Msg::StatusUpdated { old, new } => {
                assert_eq!(old.status, "");
                assert_eq!(new.status, "done");
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(fs::read_to_string(&path).unwrap().contains("status: done"));
    }

    #[test]
    fn test_disk_store_delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = DiskStore {
            agent_dir: tmp.path().to_path_buf(),
            project_glob: String::new(),
        };
        let plan = plan_in(tmp.path(), "gone.md");
        // file never existed; delete still reloads cleanly
        let msg = (store.delete_plan(&plan))().unwrap();
        assert!(matches!(msg, Msg::Reload { .. }));
    }

    #[test]
    fn test_batch_update_labels_end_state() {
        let tmp = TempDir::new().unwrap();
        for f in ["a.md", "b.md"] {
            fs::write(
                tmp.path().join(f),
                "---\nlabels: shared\n---\n# P\n",
            )
            .unwrap();
        }
        let store = DiskStore {
            agent_dir: tmp.path().to_path_buf(),
            project_glob: String::new(),
        };
        let paths = vec![
            tmp.path().join("a.md").to_string_lossy().into_owned(),
            tmp.path().join("b.md").to_string_lossy().into_owned(),
        ];
        let msg = (store.batch_update_labels(paths, vec!["atlas".into()], vec![]))().unwrap();
        match msg {
            Msg::BatchDone { plans, message, .. } => {
                assert_eq!(message, "2 plans +atlas");
                for p in plans {
                    assert_eq!(p.labels, vec!["atlas", "shared"]);
                }
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_batch_set_status_counts_failures() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("ok.md"), "# A\n").unwrap();
        let store = DiskStore {
            agent_dir: tmp.path().to_path_buf(),
            project_glob: String::new(),
        };
        let paths = vec![
            tmp.path().join("ok.md").to_string_lossy().into_owned(),
            tmp.path().join("missing.md").to_string_lossy().into_owned(),
        ];
        let msg = (store.batch_set_status(paths, "done"))().unwrap();
        match msg {
            Msg::BatchDone { message, .. } => assert_eq!(message, "2 plans → done (1 failed)"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_batch_label_summary_shapes() {
        assert_eq!(
            batch_label_summary(2, &["a".into()], &[], 0),
            "2 plans +a"
        );
        assert_eq!(
            batch_label_summary(3, &["a".into(), "b".into()], &["c".into()], 1),
            "3 plans +a,b -c (1 failed)"
        );
    }
}
