use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::io::birthtime::{created_time, modified_time};
use crate::model::{Plan, expand_home, migrate_status, parse_labels, sort_plans};
use crate::ops::comments::body_has_comments;
use crate::parse::{header_from_body, parse_frontmatter};

/// Directory names that are typically huge and never contain plan files.
/// Pruning them during glob resolution keeps startup fast even when the
/// pattern's walk root is something like ~/code.
const SKIP_DIRS: [&str; 27] = [
    "node_modules",
    ".git",
    ".svn",
    ".venv",
    "venv",
    "__pycache__",
    ".cache",
    ".next",
    ".nuxt",
    ".output",
    ".angular",
    ".gradle",
    ".cargo",
    ".npm",
    ".pnpm",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".generated",
    "target",
    "dist",
    "build",
    "coverage",
    ".turbo",
    ".parcel-cache",
    ".docusaurus",
    ".hg",
];

/// Read one plan file into a [`Plan`]. Malformed frontmatter degrades to
/// "no frontmatter"; a missing heading falls back to the filename.
fn read_plan(dir: &Path, file_name: &str) -> io::Result<Plan> {
    let path = dir.join(file_name);
    let data = fs::read_to_string(&path)?;
    let meta = fs::metadata(&path)?;

    let (fm, body) = parse_frontmatter(&data);
    let title = header_from_body(&body)
        .unwrap_or_else(|| file_name.trim_end_matches(".md").to_string());
    let project = fm.get("project").cloned().unwrap_or_default();
    let mut labels = parse_labels(fm.get("labels").map(String::as_str).unwrap_or(""));
    if labels.is_empty() && !project.is_empty() {
        labels = vec![project.to_lowercase()];
    }
    let status = migrate_status(fm.get("status").map(String::as_str).unwrap_or(""));

    Ok(Plan {
        dir: dir.to_path_buf(),
        file: file_name.to_string(),
        status,
        project,
        labels,
        title,
        created: created_time(&meta),
        modified: modified_time(&meta),
        has_comments: body_has_comments(&body),
    })
}

/// Scan one directory (no recursion) for `.md` plan files.
/// Unreadable individual files are skipped; the list is sorted by
/// creation time descending.
pub fn scan_plans(dir: &Path) -> io::Result<Vec<Plan>> {
    let mut plans = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".md") {
            continue;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
            continue;
        }
        if let Ok(plan) = read_plan(dir, &name) {
            plans.push(plan);
        }
    }
    sort_plans(&mut plans);
    Ok(plans)
}

/// Longest directory prefix of a glob pattern with no wildcard characters.
fn glob_base(pattern: &str) -> PathBuf {
    for (i, c) in pattern.char_indices() {
        if matches!(c, '*' | '?' | '[' | '{') {
            let prefix = &pattern[..i];
            return match prefix.rfind('/') {
                Some(j) => PathBuf::from(&pattern[..j]),
                None => PathBuf::from("."),
            };
        }
    }
    PathBuf::from(pattern)
}

fn walk_matching(base: &Path, pattern: &Pattern, dirs: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(base) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if SKIP_DIRS.contains(&name.as_str()) {
            continue;
        }
        let path = entry.path();
        if pattern.matches_path(&path) {
            dirs.push(path.clone());
        }
        walk_matching(&path, pattern, dirs);
    }
}

/// Expand a `**`-capable glob into matching directories, walking from the
/// pattern's wildcard-free prefix and pruning known heavy directories.
/// Walk errors on individual subtrees are skipped, not fatal.
pub fn resolve_project_dirs(glob: &str) -> Vec<PathBuf> {
    if glob.is_empty() {
        return Vec::new();
    }
    let expanded = expand_home(glob);
    let expanded_str = expanded.to_string_lossy().into_owned();

    let base = glob_base(&expanded_str);
    if !base.exists() {
        return Vec::new();
    }
    let pattern = match Pattern::new(&expanded_str) {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };

    let mut dirs = Vec::new();
    if pattern.matches_path(&base) {
        dirs.push(base.clone());
    }
    walk_matching(&base, &pattern, &mut dirs);
    dirs.sort();
    dirs
}

/// Scan the agent plans directory plus any directories matched by the
/// project glob. Duplicate paths keep the first occurrence (the agent
/// directory wins); the combined list is sorted.
pub fn scan_all_plans(agent_dir: &Path, project_glob: &str) -> io::Result<Vec<Plan>> {
    let mut plans = match scan_plans(agent_dir) {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };
    let mut seen: HashSet<PathBuf> = plans.iter().map(|p| p.path()).collect();
    for dir in resolve_project_dirs(project_glob) {
        let Ok(dir_plans) = scan_plans(&dir) else {
            continue;
        };
        for p in dir_plans {
            if seen.insert(p.path()) {
                plans.push(p);
            }
        }
    }
    sort_plans(&mut plans);
    Ok(plans)
}
