use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{Local, SecondsFormat};

use crate::model::config::{Config, expand_home, split_shell_words};

/// Error type for configuration I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine config directory (is $HOME set?)")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Config directory root, respecting XDG_CONFIG_HOME.
fn config_base() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Ok(PathBuf::from(xdg));
    }
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".config")),
        _ => Err(ConfigError::NoConfigDir),
    }
}

/// Full path of config.json.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_base()?.join("planc").join("config.json"))
}

/// Read the config without triggering first-time setup. Missing or
/// unreadable files yield defaults.
pub fn load_config_raw() -> Config {
    let Ok(path) = config_path() else {
        return Config::default();
    };
    let Ok(data) = fs::read_to_string(&path) else {
        return Config::default();
    };
    let mut cfg: Config = match serde_json::from_str(&data) {
        Ok(c) => c,
        Err(_) => return Config::default(),
    };
    cfg.plans_dir = expand_home(&cfg.plans_dir).to_string_lossy().into_owned();
    if cfg.prompt_prefix.is_empty() {
        cfg.prompt_prefix = Config::default().prompt_prefix;
    }
    cfg
}

/// Load the config, running the interactive setup on first use and
/// stamping `installed` on the first successful load.
pub fn load_config() -> Config {
    let Ok(path) = config_path() else {
        return Config::default();
    };
    match fs::read_to_string(&path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return first_time_setup(&path);
        }
        Err(_) => return Config::default(),
        Ok(data) => {
            let mut cfg: Config = match serde_json::from_str(&data) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(
                        "Warning: corrupt config ({}), using defaults. Run `planc --setup` to fix.",
                        e
                    );
                    return Config::default();
                }
            };
            cfg.plans_dir = expand_home(&cfg.plans_dir).to_string_lossy().into_owned();
            if cfg.prompt_prefix.is_empty() {
                cfg.prompt_prefix = Config::default().prompt_prefix;
            }
            if cfg.installed.is_empty() {
                cfg.installed = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
                let _ = save_config(&path, &cfg);
            }
            cfg
        }
    }
}

/// Write the config atomically (temp file + rename). Unlike plan files,
/// config has no birth-time constraint, and a crash mid-write must not
/// leave a truncated file that silently resets everything to defaults.
pub fn save_config(path: &PathBuf, cfg: &Config) -> Result<(), ConfigError> {
    let dir = path.parent().ok_or(ConfigError::NoConfigDir)?;
    fs::create_dir_all(dir)?;
    let mut data = serde_json::to_vec_pretty(cfg)?;
    data.push(b'\n');
    let tmp = dir.join(format!(".config-{}.tmp", std::process::id()));
    if let Err(e) = fs::write(&tmp, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(ConfigError::Io(e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(ConfigError::Io(e));
    }
    Ok(())
}

fn first_time_setup(path: &PathBuf) -> Config {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    show_welcome(&mut lines);
    let mut cfg = Config::default();
    cfg.installed = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    run_setup_with(path, cfg, &mut lines)
}

fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> String {
    match lines.next() {
        Some(Ok(line)) => line.trim().to_string(),
        _ => String::new(),
    }
}

/// Brief first-run orientation before setup.
fn show_welcome(lines: &mut impl Iterator<Item = io::Result<String>>) {
    println!();
    println!("  planc — a tiny TUI for browsing and annotating AI agent plans.");
    println!();
    println!("  Scans your plans directory for .md files and presents them in a");
    println!("  two-pane layout with rendered markdown preview.");
    println!();
    println!("  s set status      l set labels      x batch select");
    println!("  enter edit plan   c coding agent    v comment mode");
    println!("  ?  all keybindings");
    println!();
    println!("  Status and labels are stored as YAML frontmatter.");
    println!("  Plans with no user action are not modified at all.");
    println!();
    print!("  Press enter to continue to setup...");
    let _ = io::stdout().flush();
    let _ = read_line(lines);
    println!();
}

/// Interactive configuration prompts. Empty input keeps the current
/// value; saves on completion.
pub fn run_setup(path: &PathBuf, current: Config) -> Config {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    run_setup_with(path, current, &mut lines)
}

fn run_setup_with(
    path: &PathBuf,
    current: Config,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Config {
    println!("  planc setup");
    println!("  Press enter to keep the current value.");
    println!();

    let prompt = |label: &str, def: &str, lines: &mut dyn Iterator<Item = io::Result<String>>| {
        print!("{} [{}]: ", label, def);
        let _ = io::stdout().flush();
        let line = match lines.next() {
            Some(Ok(l)) => l.trim().to_string(),
            _ => String::new(),
        };
        if line.is_empty() { def.to_string() } else { line }
    };

    let mut cfg = current.clone();

    println!("  Primary directory to scan for .md plan files.");
    cfg.plans_dir = expand_home(&prompt("Agent plans path        ", &current.plans_dir, lines))
        .to_string_lossy()
        .into_owned();
    println!();

    println!("  Scan additional directories for plans, e.g. per-project plans/");
    println!("  folders. Use ** to match across projects: ~/code/**/plans");
    let glob_answer = prompt(
        "Additional plans (glob) ",
        &current.project_plans_glob,
        lines,
    );
    cfg.project_plans_glob = if glob_answer.eq_ignore_ascii_case("none") {
        String::new()
    } else {
        glob_answer
    };
    println!();

    println!("  Command to open a plan for editing (enter key).");
    cfg.editor = split_shell_words(&prompt(
        "Editor command          ",
        &current.editor.join(" "),
        lines,
    ));
    println!();

    println!("  Command to send a plan to your coding agent (c key).");
    println!("  The plan path is appended as the last argument.");
    cfg.primary = split_shell_words(&prompt(
        "Coding agent command    ",
        &current.primary.join(" "),
        lines,
    ));
    println!();

    println!("  Text prepended to the plan path when passed to the coding agent.");
    cfg.prompt_prefix = prompt("Prompt prefix           ", &current.prompt_prefix, lines);
    println!();

    match save_config(path, &cfg) {
        Ok(()) => println!("Saved to {}", path.display()),
        Err(e) => eprintln!("Warning: could not save config: {}", e),
    }
    println!();
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_reload_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("planc").join("config.json");
        let mut cfg = Config::default();
        cfg.plans_dir = "/tmp/plans".to_string();
        cfg.show_all = true;
        save_config(&path, &cfg).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let back: Config = serde_json::from_str(&data).unwrap();
        assert_eq!(back.plans_dir, "/tmp/plans");
        assert!(back.show_all);
        // trailing newline from the atomic writer
        assert!(data.ends_with('\n'));
    }

    #[test]
    fn test_save_config_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deep").join("planc").join("config.json");
        save_config(&path, &Config::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_setup_keeps_defaults_on_empty_input() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let mut input = "\n\n\n\n\n"
            .lines()
            .map(|l| Ok(l.to_string()))
            .collect::<Vec<io::Result<String>>>()
            .into_iter();
        let current = Config::default();
        let cfg = run_setup_with(&path, current.clone(), &mut input);
        assert_eq!(cfg.editor, current.editor);
        assert_eq!(cfg.prompt_prefix, current.prompt_prefix);
        assert!(path.exists());
    }

    #[test]
    fn test_setup_none_clears_glob() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let mut current = Config::default();
        current.project_plans_glob = "~/code/**/plans".to_string();
        let answers = ["", "none", "", "", ""];
        let mut input = answers
            .iter()
            .map(|l| Ok(l.to_string()))
            .collect::<Vec<io::Result<String>>>()
            .into_iter();
        let cfg = run_setup_with(&path, current, &mut input);
        assert!(cfg.project_plans_glob.is_empty());
    }
}
