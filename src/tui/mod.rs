pub mod app;
pub mod demo;
pub mod input;
pub mod render;
pub mod theme;

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::io::config_io::load_config;
use crate::io::scan::{resolve_project_dirs, scan_all_plans};
use crate::io::store::reload_plans_cmd;
use crate::io::update::startup_update_cmd;
use crate::io::watcher::PlanWatcher;
use crate::model::shell_command;
use crate::msg::{Msg, spawn_all};
use crate::tui::app::{App, PendingExec};

pub fn version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

/// Launch the TUI. `start_in_demo` skips straight to demo mode.
pub fn run(start_in_demo: bool) -> Result<(), Box<dyn Error>> {
    let cfg = load_config();
    if cfg.plans_dir.is_empty() {
        return Err("could not determine plans directory (is $HOME set?)".into());
    }
    let dir = PathBuf::from(&cfg.plans_dir);

    let plans = match scan_all_plans(&dir, &cfg.project_plans_glob) {
        Ok(plans) => plans,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            std::fs::create_dir_all(&dir)
                .map_err(|e| format!("creating plans directory: {}", e))?;
            Vec::new()
        }
        Err(e) => return Err(format!("scanning plans: {}", e).into()),
    };

    let watcher = start_watcher(&dir, &cfg.project_plans_glob);
    if watcher.is_none() {
        eprintln!("Warning: could not start file watcher; live updates disabled");
    }

    let mut app = App::new(plans, dir, cfg);
    app.watcher = watcher;
    if start_in_demo {
        app.enter_demo();
    }

    // terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // restore the terminal on panic so the shell isn't left raw
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let (tx, rx) = mpsc::channel::<Msg>();
    let input_paused = Arc::new(AtomicBool::new(false));
    spawn_input_thread(tx.clone(), Arc::clone(&input_paused));

    // seed the loop: current size, watcher arm, update check
    let (w, h) = crossterm::terminal::size()?;
    let _ = tx.send(Msg::Resize(w, h));
    spawn_all(app.arm_watcher(), &tx);
    if !app.demo.active
        && let Some(cmd) = startup_update_cmd(&version())
    {
        spawn_all(vec![cmd], &tx);
    }

    let result = run_event_loop(&mut terminal, &mut app, &tx, &rx, &input_paused);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    result
}

fn start_watcher(dir: &PathBuf, glob: &str) -> Option<Arc<Mutex<PlanWatcher>>> {
    let mut dirs = vec![dir.clone()];
    dirs.extend(resolve_project_dirs(glob));
    dirs.retain(|d| d.exists());
    PlanWatcher::start(&dirs).ok().map(|w| Arc::new(Mutex::new(w)))
}

/// Forward terminal events into the fan-in channel. The pause flag keeps
/// the poller off the tty while a foreground child owns it.
fn spawn_input_thread(tx: Sender<Msg>, paused: Arc<AtomicBool>) {
    thread::spawn(move || {
        loop {
            if paused.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
                continue;
            }
            match event::poll(Duration::from_millis(100)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(_) => break,
            }
            let msg = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(Msg::Key(key)),
                Ok(Event::Mouse(mouse)) => Some(Msg::Mouse(mouse)),
                Ok(Event::Resize(w, h)) => Some(Msg::Resize(w, h)),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(msg) = msg
                && tx.send(msg).is_err()
            {
                break;
            }
        }
    });
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: &Sender<Msg>,
    rx: &mpsc::Receiver<Msg>,
    input_paused: &Arc<AtomicBool>,
) -> Result<(), Box<dyn Error>> {
    loop {
        // a config change may have moved the plans directory
        if app.watcher_needs_restart {
            app.watcher_needs_restart = false;
            app.watcher = start_watcher(&app.dir, &app.cfg.project_plans_glob);
            app.watcher_armed = false;
            spawn_all(app.arm_watcher(), tx);
        }

        terminal.draw(|frame| render::render(frame, app))?;

        // block on the fan-in channel, then drain whatever else is ready
        // so bursts of task results coalesce into one redraw
        let msg = rx.recv()?;
        let cmds = app.update(msg);
        spawn_all(cmds, tx);
        while let Ok(extra) = rx.try_recv() {
            let cmds = app.update(extra);
            spawn_all(cmds, tx);
        }

        if let Some(exec) = app.pending_exec.take() {
            let dir = app.dir.clone();
            let glob = app.cfg.project_plans_glob.clone();
            run_foreground(terminal, exec, tx, input_paused, dir, glob)?;
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Run a child process that needs the terminal: restore the screen, pause
/// the input poller, wait for the child, then re-enter the TUI and post
/// the follow-up message.
fn run_foreground(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    exec: PendingExec,
    tx: &Sender<Msg>,
    input_paused: &Arc<AtomicBool>,
    dir: PathBuf,
    glob: String,
) -> Result<(), Box<dyn Error>> {
    input_paused.store(true, Ordering::SeqCst);
    // let the poller park before the child reads the tty
    thread::sleep(Duration::from_millis(150));

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    let _ = io::stdout().flush();

    let follow_up = match exec {
        PendingExec::Command { args } => match shell_command(&args).status() {
            // the command may have edited the plan; rescan
            Ok(_) => None,
            Err(e) => Some(Msg::Error(format!("command failed: {}", e))),
        },
        PendingExec::Setup => {
            let status = std::env::current_exe()
                .map_err(|e| format!("could not find executable: {}", e))
                .and_then(|exe| {
                    std::process::Command::new(exe)
                        .arg("--setup")
                        .status()
                        .map_err(|e| format!("setup failed: {}", e))
                });
            match status {
                Ok(_) => Some(Msg::ConfigUpdated),
                Err(e) => Some(Msg::Error(e)),
            }
        }
    };

    enable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        EnterAlternateScreen,
        EnableMouseCapture
    )?;
    terminal.clear()?;
    input_paused.store(false, Ordering::SeqCst);

    match follow_up {
        Some(msg) => {
            let _ = tx.send(msg);
        }
        None => spawn_all(vec![reload_plans_cmd(dir, glob)], tx),
    }
    Ok(())
}
