use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

/// User configuration, stored as JSON in the platform config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the agent plans directory
    pub plans_dir: String,
    /// Optional glob (supports `**`) for additional plan directories
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_plans_glob: String,
    /// Command launched by the `c` key; `{file}` is substituted, or the
    /// plan path is appended with `prompt_prefix` when absent
    pub primary: Vec<String>,
    /// Command launched by `enter`; same `{file}` rules, no prefix
    pub editor: Vec<String>,
    /// Text prepended to the appended plan path for `primary`
    pub prompt_prefix: String,
    /// "background", "foreground", or "" (auto-detect by editor name)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub editor_mode: String,
    /// Persists the done-visibility toggle across sessions
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_all: bool,
    /// RFC3339 timestamp of first run; pivot for "likely new" unset plans
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub installed: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            plans_dir: default_plans_dir(),
            project_plans_glob: String::new(),
            primary: vec!["claude".to_string()],
            editor: vec!["code".to_string()],
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            editor_mode: String::new(),
            show_all: false,
            installed: String::new(),
        }
    }
}

pub const DEFAULT_PROMPT_PREFIX: &str = "Read this plan file and review any comments: ";

fn default_plans_dir() -> String {
    match std::env::var("HOME") {
        Ok(home) => format!("{}/.claude/plans", home),
        Err(_) => String::new(),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return Path::new(&home).join(rest);
    }
    PathBuf::from(path)
}

/// Replace the home directory prefix with `~/` for display.
pub fn contract_home(path: &Path) -> String {
    let s = path.to_string_lossy();
    if let Ok(home) = std::env::var("HOME")
        && let Some(rest) = s.strip_prefix(&format!("{}/", home))
    {
        return format!("~/{}", rest);
    }
    s.into_owned()
}

/// Split a command string into words, respecting single and double quotes.
/// Quotes are consumed; backslash escapes work inside double quotes.
pub fn split_shell_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut cur = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '\\' if in_double && chars.peek().is_some() => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            ' ' | '\t' if !in_single && !in_double => {
                if !cur.is_empty() {
                    words.push(std::mem::take(&mut cur));
                }
            }
            _ => cur.push(c),
        }
    }
    if !cur.is_empty() {
        words.push(cur);
    }
    words
}

/// Replace `{file}` in the command template with the plan path. When no
/// argument carries the placeholder, the path is appended as a trailing
/// argument with `prefix` prepended.
pub fn expand_command(args: &[String], file_path: &str, prefix: &str) -> Vec<String> {
    let has_placeholder = args.iter().any(|a| a.contains("{file}"));
    let mut out: Vec<String> = args
        .iter()
        .map(|a| a.replace("{file}", file_path))
        .collect();
    if !has_placeholder {
        out.push(format!("{}{}", prefix, file_path));
    }
    out
}

/// True if the command appears to be a terminal-based editor.
fn is_terminal_editor(cmd: &[String]) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    let base = Path::new(first)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    matches!(
        base.as_str(),
        "vim" | "vi" | "nvim" | "nano" | "emacs" | "hx" | "micro"
    )
}

/// Resolve the editor launch mode: explicit override, otherwise foreground
/// for terminal editors and background for GUI editors.
pub fn effective_editor_mode(cfg: &Config) -> &'static str {
    match cfg.editor_mode.as_str() {
        "foreground" => "foreground",
        "background" => "background",
        _ => {
            if is_terminal_editor(&cfg.editor) {
                "foreground"
            } else {
                "background"
            }
        }
    }
}

/// Base name of the first command word, for key hint labels.
pub fn command_label(cmd: &[String]) -> String {
    match cmd.first() {
        Some(first) => Path::new(first)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| first.clone()),
        None => "unknown".to_string(),
    }
}

/// Quote a string for the platform shell.
fn shell_quote(s: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}

/// Build a Command that runs args through the user's shell. Unix uses
/// `$SHELL -ic` so aliases and rc files apply; Windows uses `cmd /C`.
pub fn shell_command(args: &[String]) -> Command {
    let quoted: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C");
        c.args(&quoted);
        c
    } else {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string());
        let mut c = Command::new(shell);
        c.arg("-ic");
        c.arg(quoted.join(" "));
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_shell_words_plain() {
        assert_eq!(split_shell_words("code --wait"), strs(&["code", "--wait"]));
    }

    #[test]
    fn test_split_shell_words_quotes() {
        assert_eq!(
            split_shell_words("open -a 'Visual Studio Code'"),
            strs(&["open", "-a", "Visual Studio Code"])
        );
        assert_eq!(
            split_shell_words(r#"sh -c "echo \"hi\"""#),
            strs(&["sh", "-c", "echo \"hi\""])
        );
    }

    #[test]
    fn test_expand_command_placeholder() {
        let out = expand_command(&strs(&["vim", "{file}"]), "/p/a.md", "ignored: ");
        assert_eq!(out, strs(&["vim", "/p/a.md"]));
    }

    #[test]
    fn test_expand_command_append_with_prefix() {
        let out = expand_command(&strs(&["claude"]), "/p/a.md", "Review: ");
        assert_eq!(out, strs(&["claude", "Review: /p/a.md"]));
    }

    #[test]
    fn test_effective_editor_mode() {
        let mut cfg = Config::default();
        cfg.editor = strs(&["nvim"]);
        assert_eq!(effective_editor_mode(&cfg), "foreground");
        cfg.editor = strs(&["code"]);
        assert_eq!(effective_editor_mode(&cfg), "background");
        cfg.editor_mode = "foreground".to_string();
        assert_eq!(effective_editor_mode(&cfg), "foreground");
    }

    #[test]
    fn test_command_label() {
        assert_eq!(command_label(&strs(&["/usr/bin/nvim", "-u"])), "nvim");
        assert_eq!(command_label(&[]), "unknown");
    }

    #[test]
    fn test_config_json_round_trip() {
        let mut cfg = Config::default();
        cfg.project_plans_glob = "~/code/**/plans".to_string();
        cfg.show_all = true;
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.project_plans_glob, cfg.project_plans_glob);
        assert!(back.show_all);
        assert_eq!(back.prompt_prefix, DEFAULT_PROMPT_PREFIX);
    }

    #[test]
    fn test_config_defaults_for_missing_keys() {
        let cfg: Config = serde_json::from_str(
            r#"{"plans_dir": "/p", "primary": ["claude"], "editor": ["code"], "prompt_prefix": "x"}"#,
        )
        .unwrap();
        assert!(!cfg.show_all);
        assert!(cfg.installed.is_empty());
        assert!(cfg.editor_mode.is_empty());
    }
}
