use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Local};

use crate::io::config_io::{config_path, save_config};
use crate::io::scan::scan_all_plans;
use crate::io::store::{
    DiskStore, PlanStore, load_comment_cmd, render_content_cmd, render_plan_cmd,
};
use crate::io::watcher::{PlanWatcher, watch_cmd};
use crate::model::{Config, Plan, filter_plans, sort_plans, status_label};
use crate::msg::{Cmd, Msg, tick};
use crate::ops::comments::TocEntry;
use crate::ops::labels::recent_labels;
use crate::render::{MdStyle, RenderedDoc};
use crate::tui::demo::{ClodState, DemoState, DemoStore, demo_plan_contents, demo_plans};
use crate::tui::theme::Theme;

pub const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
pub const COPIED_TIMEOUT: Duration = Duration::from_secs(2);
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(120);
pub const LABEL_FLASH_INTERVAL: Duration = Duration::from_millis(80);

pub const SPINNER_FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Which pane has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    List,
    Preview,
}

/// Rows of the status picker: key, icon, status value.
pub const STATUS_OPTIONS: [(&str, &str, &str); 4] = [
    ("0", "·", ""),
    ("1", "○", "reviewed"),
    ("2", "●", "active"),
    ("3", "✓", "done"),
];

pub fn status_cursor_for(status: &str) -> usize {
    STATUS_OPTIONS
        .iter()
        .position(|(_, _, s)| *s == status)
        .unwrap_or(0)
}

/// Label editor state. In batch mode a label is toggled on when every
/// selected plan carries it and mixed when only some do.
pub struct LabelModal {
    pub batch: bool,
    pub input: String,
    pub choices: Vec<String>,
    pub toggled: HashMap<String, bool>,
    /// Labels that were on for every plan when the modal opened; the
    /// batch apply only sends deltas against this snapshot
    pub original_on: HashSet<String>,
    pub mixed: HashSet<String>,
    pub cursor: usize,
    pub dirty: bool,
    pub flash_idx: Option<usize>,
    pub flash_ticks: u8,
}

impl LabelModal {
    pub fn filtered_choices(&self) -> Vec<String> {
        let filter = self.input.trim().to_lowercase();
        if filter.is_empty() {
            return self.choices.clone();
        }
        self.choices
            .iter()
            .filter(|c| c.contains(&filter))
            .cloned()
            .collect()
    }

    /// Toggle the label under the cursor. Mixed goes to on.
    pub fn toggle_at_cursor(&mut self) {
        let filtered = self.filtered_choices();
        if let Some(label) = filtered.get(self.cursor) {
            if self.mixed.remove(label) {
                self.toggled.insert(label.clone(), true);
            } else {
                let entry = self.toggled.entry(label.clone()).or_insert(false);
                *entry = !*entry;
            }
            self.dirty = true;
        }
    }
}

/// Comment mode state: ToC on the left, the rendered body on the right.
pub struct CommentUi {
    pub path: String,
    pub raw_body: String,
    pub doc: Arc<RenderedDoc>,
    pub toc: Vec<TocEntry>,
    pub cursor: usize,
    pub focused_toc: bool,
    pub loading: bool,
    /// Text input open for add/edit
    pub editing: bool,
    /// ToC index the edit applies to
    pub edit_target: usize,
    /// Editing an existing comment vs adding a new one
    pub edit_existing: bool,
    pub input: String,
}

pub struct ReleaseNotesUi {
    pub version: String,
    pub markdown: String,
    pub scroll: usize,
}

/// A foreground action the event loop must run with the terminal
/// restored (child processes own the tty while they run).
pub enum PendingExec {
    /// Launch a command; when done, rescan plans
    Command { args: Vec<String> },
    /// Re-run the setup wizard binary, then reload config
    Setup,
}

/// All application state. Owned exclusively by the event loop; tasks get
/// owned copies of whatever they need.
pub struct App {
    // layout
    pub width: u16,
    pub height: u16,
    pub ready: bool,
    pub focused: Pane,
    pub theme: Theme,
    pub should_quit: bool,

    // preview
    pub preview_cache: HashMap<String, Arc<RenderedDoc>>,
    /// Paths being re-rendered because of an external change; their next
    /// result preserves the scroll offset instead of resetting it
    pub refreshing: HashSet<String>,
    pub preview_width: usize,
    pub prerendered: bool,
    pub md_style: MdStyle,
    pub preview_scroll: usize,

    // plan data
    pub all_plans: Vec<Plan>,
    pub dir: PathBuf,
    pub cfg: Config,
    pub installed: Option<DateTime<Local>>,
    pub store: Box<dyn PlanStore>,
    pub show_done: bool,
    pub label_filter: String,

    // list state
    pub visible: Vec<Plan>,
    pub cursor: usize,
    pub prev_cursor: Option<usize>,

    // search
    pub searching: bool,
    pub search_input: String,

    // selection and inline indicators
    pub selected: HashSet<String>,
    pub changed_files: HashSet<String>,
    pub changed_spin_id: u64,
    pub copied_files: HashSet<String>,
    pub copied_id: u64,
    /// path → new status label, shown inline during the undo window
    pub undo_files: HashMap<String, String>,
    pub undo_id: u64,
    pub spinner_frame: usize,
    pub spinner_running: bool,

    // transient text
    pub notification: String,
    pub notification_id: u64,
    pub status_text: String,
    pub status_id: u64,

    // modals
    pub confirm_delete: bool,
    pub show_help: bool,
    pub status_modal: Option<usize>,
    pub label_modal: Option<LabelModal>,
    pub comment: Option<CommentUi>,
    pub release_notes: Option<ReleaseNotesUi>,
    pub update_available: Option<(String, String)>,

    // undo / batch linger
    pub last_status_change: Option<(Plan, Plan)>,
    pub batch_keep: Vec<String>,
    pub batch_linger_id: u64,

    // demo
    pub demo: DemoState,
    pub clod: ClodState,

    // plumbing
    pub watcher: Option<Arc<Mutex<PlanWatcher>>>,
    /// One armed watcher command at a time; cleared when its batch lands
    pub watcher_armed: bool,
    pub watcher_needs_restart: bool,
    pub pending_exec: Option<PendingExec>,
}

impl App {
    pub fn new(plans: Vec<Plan>, dir: PathBuf, cfg: Config) -> App {
        let installed = DateTime::parse_from_rfc3339(&cfg.installed)
            .ok()
            .map(|t| t.with_timezone(&Local));
        let md_style = MdStyle::detect();
        let mut plans = plans;
        sort_plans(&mut plans);
        let store = Box::new(DiskStore {
            agent_dir: dir.clone(),
            project_glob: cfg.project_plans_glob.clone(),
        });
        let mut app = App {
            width: 0,
            height: 0,
            ready: false,
            focused: Pane::List,
            theme: Theme::for_style(md_style),
            should_quit: false,
            preview_cache: HashMap::new(),
            refreshing: HashSet::new(),
            preview_width: 0,
            prerendered: false,
            md_style,
            preview_scroll: 0,
            all_plans: plans,
            dir,
            show_done: cfg.show_all,
            installed,
            cfg,
            store,
            label_filter: String::new(),
            visible: Vec::new(),
            cursor: 0,
            prev_cursor: None,
            searching: false,
            search_input: String::new(),
            selected: HashSet::new(),
            changed_files: HashSet::new(),
            changed_spin_id: 0,
            copied_files: HashSet::new(),
            copied_id: 0,
            undo_files: HashMap::new(),
            undo_id: 0,
            spinner_frame: 0,
            spinner_running: false,
            notification: String::new(),
            notification_id: 0,
            status_text: String::new(),
            status_id: 0,
            confirm_delete: false,
            show_help: false,
            status_modal: None,
            label_modal: None,
            comment: None,
            release_notes: None,
            update_available: None,
            last_status_change: None,
            batch_keep: Vec::new(),
            batch_linger_id: 0,
            demo: DemoState::default(),
            clod: ClodState::default(),
            watcher: None,
            watcher_armed: false,
            watcher_needs_restart: false,
            pending_exec: None,
        };
        app.refresh_visible();
        app
    }

    // ── list bookkeeping ────────────────────────────────────────────────

    pub fn plan_source(&self) -> &[Plan] {
        if self.demo.active {
            &self.demo.plans
        } else {
            &self.all_plans
        }
    }

    fn plan_source_mut(&mut self) -> &mut Vec<Plan> {
        if self.demo.active {
            &mut self.demo.plans
        } else {
            &mut self.all_plans
        }
    }

    /// Paths that stay visible past their normal filter eviction: the
    /// undo window's plan and batch-linger survivors.
    pub fn keep_set(&self) -> HashSet<String> {
        let mut keep: HashSet<String> = self.batch_keep.iter().cloned().collect();
        if let Some((_, new)) = &self.last_status_change {
            keep.insert(new.path_string());
        }
        keep
    }

    fn installed_pivot(&self) -> Option<DateTime<Local>> {
        if self.demo.active {
            // fake pivot so recently-modified unset demo plans show up
            Some(Local::now() - ChronoDuration::hours(48))
        } else {
            self.installed
        }
    }

    /// Recompute the visible list and keep cursor/selection consistent
    /// with it. While searching, the query matches across the full plan
    /// set so done/hidden plans can be found.
    pub fn refresh_visible(&mut self) {
        let query = self.search_input.trim().to_lowercase();
        if self.searching && !query.is_empty() {
            self.visible = self
                .plan_source()
                .iter()
                .filter(|p| p.filter_value().to_lowercase().contains(&query))
                .cloned()
                .collect();
        } else {
            self.visible = filter_plans(
                self.plan_source(),
                self.show_done,
                &self.keep_set(),
                &self.label_filter,
                self.installed_pivot(),
            );
        }
        if self.cursor >= self.visible.len() {
            self.cursor = self.visible.len().saturating_sub(1);
        }
        self.prune_selection();
    }

    /// The selection may never reference a hidden plan.
    fn prune_selection(&mut self) {
        let visible: HashSet<String> = self.visible.iter().map(|p| p.path_string()).collect();
        self.selected.retain(|path| visible.contains(path));
    }

    pub fn selected_plan(&self) -> Option<&Plan> {
        self.visible.get(self.cursor)
    }

    pub fn selected_path(&self) -> Option<String> {
        self.selected_plan().map(|p| p.path_string())
    }

    /// Move the cursor to the plan with this path, or clamp in place.
    pub fn select_path(&mut self, path: &str) {
        if let Some(idx) = self.visible.iter().position(|p| p.path_string() == path) {
            self.cursor = idx;
        } else if self.cursor >= self.visible.len() && !self.visible.is_empty() {
            self.cursor = self.visible.len() - 1;
        }
    }

    /// Selected paths in visible list order.
    pub fn selected_paths(&self) -> Vec<String> {
        self.visible
            .iter()
            .map(|p| p.path_string())
            .filter(|p| self.selected.contains(p))
            .collect()
    }

    pub fn first_selected_plan(&self) -> Option<&Plan> {
        self.visible.iter().find(|p| self.selected.contains(&p.path_string()))
    }

    // ── geometry ────────────────────────────────────────────────────────

    pub fn list_width(&self) -> u16 {
        self.width * 40 / 100
    }

    /// Inner preview width (pane minus borders).
    pub fn preview_inner_width(&self) -> usize {
        (self.width as usize)
            .saturating_sub(self.list_width() as usize)
            .saturating_sub(2)
            .max(10)
    }

    /// Rows available to preview content.
    pub fn preview_inner_height(&self) -> usize {
        (self.height as usize).saturating_sub(4).max(1)
    }

    // ── preview cache & window ──────────────────────────────────────────

    /// Issue render tasks for cursor ±2, skipping cached paths. The
    /// displayed preview updates when the selected path's result lands.
    pub fn render_window(&self) -> Vec<Cmd> {
        let mut cmds = Vec::new();
        if self.visible.is_empty() {
            return cmds;
        }
        let lo = self.cursor.saturating_sub(2);
        let hi = (self.cursor + 2).min(self.visible.len() - 1);
        for plan in &self.visible[lo..=hi] {
            let path = plan.path_string();
            if self.preview_cache.contains_key(&path) {
                continue;
            }
            if self.demo.active {
                let md = self
                    .demo
                    .content
                    .get(&plan.file)
                    .cloned()
                    .unwrap_or_else(|| "*No preview available*".to_string());
                cmds.push(render_content_cmd(
                    path,
                    md,
                    self.md_style,
                    self.preview_inner_width(),
                ));
            } else {
                cmds.push(render_plan_cmd(
                    path,
                    self.md_style,
                    self.preview_inner_width(),
                ));
            }
        }
        cmds
    }

    /// Reset the preview to the (possibly newly) selected plan. Cached
    /// content swaps in immediately; uncached waits for its render task.
    pub fn sync_preview_to_cursor(&mut self, cmds: &mut Vec<Cmd>) {
        if self.prev_cursor != Some(self.cursor) {
            self.prev_cursor = Some(self.cursor);
            self.preview_scroll = 0;
            cmds.extend(self.render_window());
        }
    }

    // ── transient text ──────────────────────────────────────────────────

    /// Right-aligned notification on the hint bar, auto-clearing.
    pub fn set_notification(&mut self, text: &str, after: Duration) -> Cmd {
        self.notification_id += 1;
        self.notification = text.to_string();
        tick(after, Msg::NotificationClear {
            id: self.notification_id,
        })
    }

    pub fn set_status_text(&mut self, text: &str, after: Duration) -> Vec<Cmd> {
        self.status_id += 1;
        self.status_text = text.to_string();
        let mut cmds = self.start_spinner();
        if !after.is_zero() {
            cmds.push(tick(after, Msg::StatusClear { id: self.status_id }));
        }
        cmds
    }

    /// Keep exactly one spinner tick chain in flight while anything
    /// animates; a second start is a no-op.
    fn start_spinner(&mut self) -> Vec<Cmd> {
        if self.spinner_running {
            return Vec::new();
        }
        self.spinner_running = true;
        vec![tick(SPINNER_INTERVAL, Msg::SpinnerTick)]
    }

    fn spinner_needed(&self) -> bool {
        !self.undo_files.is_empty() || !self.changed_files.is_empty() || !self.status_text.is_empty()
    }

    // ── status & label operations ───────────────────────────────────────

    /// Status change for the selection (batch) or the cursor plan.
    /// Setting the current status again is a no-op.
    pub fn apply_status(&mut self, status: &str) -> Vec<Cmd> {
        if !self.selected.is_empty() {
            let paths = self.selected_paths();
            return vec![self.store.batch_set_status(paths, status)];
        }
        if let Some(plan) = self.selected_plan() {
            if plan.status == status {
                return Vec::new();
            }
            return vec![self.store.set_status(plan, status)];
        }
        Vec::new()
    }

    pub fn open_label_modal(&mut self, batch: bool) {
        let choices = recent_labels(self.plan_source());
        let mut toggled: HashMap<String, bool> = HashMap::new();
        let mut mixed: HashSet<String> = HashSet::new();

        if batch && !self.selected.is_empty() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            let mut total = 0;
            for p in &self.visible {
                if self.selected.contains(&p.path_string()) {
                    total += 1;
                    for l in &p.labels {
                        *counts.entry(l.as_str()).or_default() += 1;
                    }
                }
            }
            for (l, c) in counts {
                if c == total {
                    toggled.insert(l.to_string(), true);
                } else {
                    mixed.insert(l.to_string());
                }
            }
        } else if let Some(plan) = self.selected_plan() {
            for l in &plan.labels {
                toggled.insert(l.clone(), true);
            }
        }

        let original_on: HashSet<String> = toggled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(l, _)| l.clone())
            .collect();
        self.label_modal = Some(LabelModal {
            batch,
            input: String::new(),
            choices,
            toggled,
            original_on,
            mixed,
            cursor: 0,
            dirty: false,
            flash_idx: None,
            flash_ticks: 0,
        });
    }

    /// Close-time apply for the label editor. Batch mode sends add/remove
    /// deltas (mixed labels untouched); single mode replaces the set.
    pub fn apply_label_changes(&mut self) -> Vec<Cmd> {
        let Some(modal) = self.label_modal.take() else {
            return Vec::new();
        };
        if modal.batch && !self.selected.is_empty() {
            // deltas only: labels the user turned on, labels the user
            // turned off; still-mixed labels are left untouched
            let mut add: Vec<String> = modal
                .toggled
                .iter()
                .filter(|(l, on)| **on && !modal.original_on.contains(l.as_str()))
                .map(|(l, _)| l.clone())
                .collect();
            add.sort();
            let mut remove: Vec<String> = modal
                .original_on
                .iter()
                .filter(|l| !modal.toggled.get(l.as_str()).copied().unwrap_or(false))
                .cloned()
                .collect();
            remove.sort();
            if add.is_empty() && remove.is_empty() {
                return Vec::new();
            }
            let paths = self.selected_paths();
            return vec![self.store.batch_update_labels(paths, add, remove)];
        }
        let mut labels: Vec<String> = modal
            .toggled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(l, _)| l.clone())
            .collect();
        labels.sort();
        if let Some(plan) = self.selected_plan() {
            return vec![self.store.set_labels(plan, labels)];
        }
        Vec::new()
    }

    pub fn label_modal_has_changes(&self) -> bool {
        let Some(modal) = &self.label_modal else {
            return false;
        };
        if modal.batch {
            return modal.dirty;
        }
        if let Some(plan) = self.selected_plan() {
            let current: HashSet<&str> = plan.labels.iter().map(String::as_str).collect();
            for (l, on) in &modal.toggled {
                if *on != current.contains(l.as_str()) {
                    return true;
                }
            }
            for l in &current {
                if !modal.toggled.get(*l).copied().unwrap_or(false) {
                    return true;
                }
            }
        }
        false
    }

    /// Cycle the label filter: "" → L₁ → … → "". Steps producing an
    /// empty visible set (with a non-empty filter) are skipped, so the
    /// user never lands on an empty view.
    pub fn cycle_label_filter(&mut self, forward: bool) -> Vec<Cmd> {
        let labels = recent_labels(self.plan_source());
        if labels.is_empty() {
            return Vec::new();
        }
        let mut idx: isize = labels
            .iter()
            .position(|l| *l == self.label_filter)
            .map(|i| i as isize)
            .unwrap_or(-1);
        let had_filter = !self.label_filter.is_empty();

        let mut tried = 0;
        while tried <= labels.len() {
            if forward {
                if idx < labels.len() as isize - 1 {
                    idx += 1;
                    self.label_filter = labels[idx as usize].clone();
                } else {
                    idx = -1;
                    self.label_filter = String::new();
                }
            } else if idx > 0 {
                idx -= 1;
                self.label_filter = labels[idx as usize].clone();
            } else if idx == 0 || had_filter {
                idx = -1;
                self.label_filter = String::new();
            } else {
                idx = labels.len() as isize - 1;
                self.label_filter = labels[idx as usize].clone();
            }
            tried += 1;
            self.refresh_visible();
            if !self.visible.is_empty() || self.label_filter.is_empty() {
                self.cursor = 0;
                self.prev_cursor = None;
                let mut cmds = Vec::new();
                self.sync_preview_to_cursor(&mut cmds);
                return cmds;
            }
        }
        Vec::new()
    }

    // ── demo mode ───────────────────────────────────────────────────────

    pub fn enter_demo(&mut self) {
        self.selected.clear();
        self.demo.active = true;
        self.demo.plans = demo_plans();
        self.demo.content = demo_plan_contents();
        self.store = Box::new(DemoStore {
            plans: self.demo.plans.clone(),
        });
        self.show_done = false;
        self.label_filter = String::new();
        self.last_status_change = None;
        self.batch_keep.clear();
        self.undo_files.clear();
        self.cursor = 0;
        self.prev_cursor = None;
        self.preview_cache.clear();
        self.preview_scroll = 0;
        self.refresh_visible();
    }

    pub fn exit_demo(&mut self) -> Vec<Cmd> {
        self.selected.clear();
        self.demo.active = false;
        self.demo.plans.clear();
        self.demo.content.clear();
        self.store = Box::new(DiskStore {
            agent_dir: self.dir.clone(),
            project_glob: self.cfg.project_plans_glob.clone(),
        });
        self.show_done = self.cfg.show_all;
        self.label_filter = String::new();
        self.last_status_change = None;
        self.batch_keep.clear();
        self.undo_files.clear();
        self.cursor = 0;
        self.prev_cursor = None;
        self.preview_cache.clear();
        self.preview_scroll = 0;
        self.refresh_visible();
        // rescan off-loop, and resume watching (arming was skipped while
        // demo state was live)
        let mut cmds = vec![crate::io::store::reload_plans_cmd(
            self.dir.clone(),
            self.cfg.project_plans_glob.clone(),
        )];
        cmds.extend(self.arm_watcher());
        cmds
    }

    /// Arm the watcher for one batch, unless demo mode is active or an
    /// armed command is already outstanding.
    pub fn arm_watcher(&mut self) -> Vec<Cmd> {
        if self.demo.active || self.watcher_armed {
            return Vec::new();
        }
        let Some(w) = &self.watcher else {
            return Vec::new();
        };
        self.watcher_armed = true;
        vec![watch_cmd(Arc::clone(w))]
    }

    /// Keep the demo store's snapshot in sync after demo mutations.
    fn refresh_demo_store(&mut self) {
        if self.demo.active {
            self.store = Box::new(DemoStore {
                plans: self.demo.plans.clone(),
            });
        }
    }

    // ── comment mode ────────────────────────────────────────────────────

    pub fn enter_comment_mode(&mut self) -> Vec<Cmd> {
        let Some((path, file)) = self
            .selected_plan()
            .map(|p| (p.path_string(), p.file.clone()))
        else {
            return Vec::new();
        };
        let width = self.preview_inner_width();
        self.comment = Some(CommentUi {
            path: path.clone(),
            raw_body: String::new(),
            doc: Arc::new(RenderedDoc::default()),
            toc: Vec::new(),
            cursor: 0,
            focused_toc: true,
            loading: true,
            editing: false,
            edit_target: 0,
            edit_existing: false,
            input: String::new(),
        });
        self.preview_scroll = 0;
        if self.demo.active {
            let body = self.demo.content.get(&file).cloned().unwrap_or_default();
            let style = self.md_style;
            vec![Box::new(move || {
                let (doc, toc) = crate::io::store::render_and_map(&body, style, width);
                Some(Msg::CommentLoaded {
                    path,
                    raw_body: body,
                    doc,
                    toc,
                })
            })]
        } else {
            vec![load_comment_cmd(path, self.md_style, width)]
        }
    }

    /// Scroll the preview so the entry's mapped render line sits near the
    /// top of the viewport.
    pub fn sync_comment_scroll(&mut self) {
        if let Some(c) = &self.comment
            && let Some(entry) = c.toc.get(c.cursor)
        {
            self.preview_scroll = entry.render_line.saturating_sub(2);
        }
    }

    pub fn persist_show_all(&mut self) {
        if !self.demo.active {
            self.cfg.show_all = self.show_done;
            if let Ok(path) = config_path() {
                let _ = save_config(&path, &self.cfg);
            }
        }
    }

    // ── update ──────────────────────────────────────────────────────────

    /// Reconcile one message into the model. Never blocks; all I/O goes
    /// out as commands.
    pub fn update(&mut self, msg: Msg) -> Vec<Cmd> {
        let mut cmds = Vec::new();
        match msg {
            Msg::Key(key) => {
                return crate::tui::input::handle_key(self, key);
            }

            Msg::Mouse(mouse) => {
                return crate::tui::input::handle_mouse(self, mouse);
            }

            Msg::Resize(w, h) => {
                self.width = w;
                self.height = h;
                self.ready = true;
                let inner = self.preview_inner_width();
                if !self.prerendered || self.preview_width != inner {
                    self.prerendered = true;
                    self.preview_width = inner;
                    // a new width epoch invalidates every cached render
                    self.preview_cache.clear();
                    cmds.extend(self.render_window());
                    if let Some(c) = &self.comment
                        && !c.loading
                    {
                        let path = c.path.clone();
                        let body = c.raw_body.clone();
                        let style = self.md_style;
                        cmds.push(Box::new(move || {
                            let (doc, toc) =
                                crate::io::store::render_and_map(&body, style, inner);
                            Some(Msg::CommentLoaded {
                                path,
                                raw_body: body,
                                doc,
                                toc,
                            })
                        }));
                    }
                }
            }

            Msg::PlanContent { path, doc } => {
                let is_refresh = self.refreshing.remove(&path);
                self.preview_cache.insert(path.clone(), doc);
                if Some(path) == self.selected_path() && !is_refresh {
                    self.preview_scroll = 0;
                }
            }

            Msg::StatusUpdated { old, new } => {
                let path = new.path_string();
                let label = status_label(&new.status).to_string();
                {
                    let plans = self.plan_source_mut();
                    if let Some(p) = plans.iter_mut().find(|p| p.path() == new.path()) {
                        *p = (*new).clone();
                        p.modified = Local::now();
                    }
                }
                self.refresh_demo_store();
                self.last_status_change = Some(((*old).clone(), (*new).clone()));
                self.refresh_visible();
                self.select_path(&path);
                self.undo_files.clear();
                self.undo_files.insert(path, label);
                self.undo_id += 1;
                cmds.push(tick(STATUS_TIMEOUT, Msg::UndoExpired { id: self.undo_id }));
                cmds.extend(self.start_spinner());
            }

            Msg::LabelsUpdated { plan } => {
                let path = plan.path_string();
                {
                    let plans = self.plan_source_mut();
                    if let Some(p) = plans.iter_mut().find(|p| p.path() == plan.path()) {
                        *p = (*plan).clone();
                        p.modified = Local::now();
                    }
                }
                self.refresh_demo_store();
                self.refresh_visible();
                self.select_path(&path);
                let label = if plan.labels.is_empty() {
                    "cleared".to_string()
                } else {
                    plan.labels.join(", ")
                };
                cmds.push(self.set_notification(&format!("Labels: {}", label), STATUS_TIMEOUT));
            }

            Msg::BatchDone {
                plans,
                paths,
                message,
            } => {
                *self.plan_source_mut() = plans;
                let source = self.plan_source_mut();
                sort_plans(source);
                self.refresh_demo_store();
                self.batch_keep = paths;
                self.selected.clear();
                self.refresh_visible();
                self.preview_cache.clear();
                self.prerendered = true;
                cmds.extend(self.render_window());
                cmds.push(self.set_notification(&message, STATUS_TIMEOUT));
                self.batch_linger_id += 1;
                cmds.push(tick(
                    STATUS_TIMEOUT,
                    Msg::BatchLingerExpired {
                        id: self.batch_linger_id,
                    },
                ));
            }

            Msg::BatchLingerExpired { id } => {
                if !self.batch_keep.is_empty() && id == self.batch_linger_id {
                    self.batch_keep.clear();
                    self.refresh_visible();
                }
            }

            Msg::UndoExpired { id } => {
                if self.last_status_change.is_some() && id == self.undo_id {
                    self.last_status_change = None;
                    self.undo_files.clear();
                    self.refresh_visible();
                }
            }

            Msg::Reload { plans } => {
                self.selected.clear();
                *self.plan_source_mut() = plans;
                let source = self.plan_source_mut();
                sort_plans(source);
                self.refresh_demo_store();
                self.refresh_visible();
                self.preview_cache.clear();
                self.prerendered = true;
                cmds.extend(self.render_window());
                self.preview_scroll = 0;
            }

            Msg::FilesChanged { files } => {
                self.watcher_armed = false;
                if !self.demo.active {
                    let dir = self.dir.clone();
                    let glob = self.cfg.project_plans_glob.clone();
                    cmds.push(Box::new(move || {
                        match scan_all_plans(&dir, &glob) {
                            Ok(plans) => Some(Msg::Rescanned {
                                plans,
                                changed: files,
                            }),
                            Err(e) => Some(Msg::Error(e.to_string())),
                        }
                    }));
                }
                // re-arm for the next batch (skipped while demo is live)
                cmds.extend(self.arm_watcher());
            }

            Msg::Rescanned { plans, changed } => {
                let prev = self.selected_path();
                self.selected.clear();
                self.all_plans = plans;
                sort_plans(&mut self.all_plans);
                self.refresh_visible();
                if let Some(path) = prev {
                    self.select_path(&path);
                }
                // refresh the cursor window: cached entries re-render with
                // scroll preserved
                self.refreshing.clear();
                if !self.visible.is_empty() {
                    let lo = self.cursor.saturating_sub(2);
                    let hi = (self.cursor + 2).min(self.visible.len() - 1);
                    for plan in &self.visible[lo..=hi] {
                        let path = plan.path_string();
                        if self.preview_cache.remove(&path).is_some() {
                            self.refreshing.insert(path);
                        }
                    }
                }
                cmds.extend(self.render_window());

                let known: HashSet<&str> =
                    self.all_plans.iter().map(|p| p.file.as_str()).collect();
                let still_here: Vec<&String> =
                    changed.iter().filter(|f| known.contains(f.as_str())).collect();
                if !still_here.is_empty() {
                    for f in &still_here {
                        self.changed_files.insert((*f).clone());
                    }
                    self.changed_spin_id += 1;
                    cmds.push(tick(
                        STATUS_TIMEOUT,
                        Msg::ChangedSpinExpired {
                            id: self.changed_spin_id,
                        },
                    ));
                    let label = if still_here.len() == 1 {
                        still_here[0].clone()
                    } else {
                        format!("{} files", still_here.len())
                    };
                    cmds.push(self.set_notification(&format!("Updated: {}", label), STATUS_TIMEOUT));
                    cmds.extend(self.start_spinner());
                }
            }

            Msg::ConfigUpdated => {
                self.selected.clear();
                let cfg = crate::io::config_io::load_config_raw();
                let dir_changed = PathBuf::from(&cfg.plans_dir) != self.dir;
                self.cfg = cfg;
                if dir_changed {
                    self.dir = PathBuf::from(&self.cfg.plans_dir);
                    self.store = Box::new(DiskStore {
                        agent_dir: self.dir.clone(),
                        project_glob: self.cfg.project_plans_glob.clone(),
                    });
                    self.watcher_needs_restart = true;
                    self.preview_cache.clear();
                    cmds.push(crate::io::store::reload_plans_cmd(
                        self.dir.clone(),
                        self.cfg.project_plans_glob.clone(),
                    ));
                }
            }

            Msg::StatusClear { id } => {
                if id == self.status_id {
                    self.status_text.clear();
                }
            }

            Msg::NotificationClear { id } => {
                if id == self.notification_id {
                    self.notification.clear();
                }
            }

            Msg::CopiedClear { id } => {
                if id == self.copied_id {
                    self.copied_files.clear();
                }
            }

            Msg::ChangedSpinExpired { id } => {
                if id == self.changed_spin_id {
                    self.changed_files.clear();
                }
            }

            Msg::SpinnerTick => {
                if self.spinner_needed() {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
                    cmds.push(tick(SPINNER_INTERVAL, Msg::SpinnerTick));
                } else {
                    self.spinner_running = false;
                }
            }

            Msg::LabelFlashTick => {
                let mut apply = false;
                if let Some(modal) = &mut self.label_modal
                    && modal.flash_ticks > 0
                {
                    modal.flash_ticks -= 1;
                    if modal.flash_ticks > 0 {
                        cmds.push(tick(LABEL_FLASH_INTERVAL, Msg::LabelFlashTick));
                    } else {
                        modal.flash_idx = None;
                        apply = true;
                    }
                }
                if apply {
                    cmds.extend(self.apply_label_changes());
                }
            }

            Msg::DemoScriptTick { id } => {
                if self.clod.active && id == self.clod.tick_id {
                    if let Some(delay) = self.clod.advance() {
                        let next_id = self.clod.tick_id;
                        cmds.push(tick(delay, Msg::DemoScriptTick { id: next_id }));
                    }
                }
            }

            Msg::CommentLoaded {
                path,
                raw_body,
                doc,
                toc,
            }
            | Msg::CommentSaved {
                path,
                raw_body,
                doc,
                toc,
            } => {
                if self.demo.active {
                    // demo saves update the in-memory body
                    if let Some(plan) = self
                        .demo
                        .plans
                        .iter()
                        .find(|p| p.path_string() == path)
                    {
                        self.demo.content.insert(plan.file.clone(), raw_body.clone());
                    }
                }
                self.status_text.clear();
                if let Some(c) = &mut self.comment
                    && c.path == path
                {
                    c.raw_body = raw_body;
                    c.doc = doc;
                    c.toc = toc;
                    c.loading = false;
                    if c.cursor >= c.toc.len() {
                        c.cursor = c.toc.len().saturating_sub(1);
                    }
                    self.sync_comment_scroll();
                }
            }

            Msg::UpdateAvailable { version, url } => {
                self.update_available = Some((version, url));
            }

            Msg::ReleaseNotes { version, markdown } => {
                self.release_notes = Some(ReleaseNotesUi {
                    version,
                    markdown,
                    scroll: 0,
                });
            }

            Msg::StartupUpdate {
                update,
                release_notes,
            } => {
                if let Some(u) = update {
                    self.update_available = Some(u);
                }
                if let Some((version, markdown)) = release_notes {
                    self.release_notes = Some(ReleaseNotesUi {
                        version,
                        markdown,
                        scroll: 0,
                    });
                }
            }

            Msg::EditorLaunched => {
                cmds.push(self.set_notification("Editor opened", COPIED_TIMEOUT));
            }

            Msg::Error(err) => {
                cmds.push(self.set_notification(&format!("Error: {}", err), STATUS_TIMEOUT));
            }
        }
        cmds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_plan(file: &str, status: &str, days_ago: i64) -> Plan {
        let base = Local.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t = base - ChronoDuration::days(days_ago);
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

    fn test_app(plans: Vec<Plan>) -> App {
        let mut cfg = Config::default();
        cfg.show_all = true;
        let mut app = App::new(plans, PathBuf::from("/plans"), cfg);
        app.width = 120;
        app.height = 40;
        app.ready = true;
        app
    }

    #[test]
    fn test_visible_tracks_filters() {
        let mut app = test_app(vec![
            test_plan("a.md", "active", 0),
            test_plan("b.md", "done", 1),
        ]);
        assert_eq!(app.visible.len(), 2);
        app.show_done = false;
        app.refresh_visible();
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.visible[0].file, "a.md");
    }

    #[test]
    fn test_selection_pruned_when_hidden() {
        let mut app = test_app(vec![
            test_plan("a.md", "active", 0),
            test_plan("b.md", "done", 1),
        ]);
        let b_path = app.all_plans[1].path_string();
        app.selected.insert(b_path.clone());
        app.show_done = false;
        app.refresh_visible();
        assert!(!app.selected.contains(&b_path));
    }

    #[test]
    fn test_status_updated_records_undo_and_keeps_row() {
        let mut app = test_app(vec![test_plan("a.md", "active", 0)]);
        app.show_done = false;
        app.refresh_visible();
        let old = app.all_plans[0].clone();
        let mut new = old.clone();
        new.status = "done".to_string();
        let cmds = app.update(Msg::StatusUpdated {
            old: Box::new(old.clone()),
            new: Box::new(new.clone()),
        });
        assert!(!cmds.is_empty());
        assert!(app.last_status_change.is_some());
        // done would normally be hidden, but the undo window keeps it
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.undo_files.get(&new.path_string()).unwrap(), "done");
    }

    #[test]
    fn test_undo_expiry_generation_checked() {
        let mut app = test_app(vec![test_plan("a.md", "active", 0)]);
        app.show_done = false;
        let old = app.all_plans[0].clone();
        let mut new = old.clone();
        new.status = "done".to_string();
        app.update(Msg::StatusUpdated {
            old: Box::new(old),
            new: Box::new(new),
        });
        let current_id = app.undo_id;
        // a stale expiry is ignored
        app.update(Msg::UndoExpired { id: current_id - 1 });
        assert!(app.last_status_change.is_some());
        // the live one clears the record and hides the done plan
        app.update(Msg::UndoExpired { id: current_id });
        assert!(app.last_status_change.is_none());
        assert!(app.visible.is_empty());
    }

    #[test]
    fn test_batch_done_lingers_and_clears_selection() {
        let mut app = test_app(vec![
            test_plan("a.md", "active", 0),
            test_plan("b.md", "active", 1),
        ]);
        app.show_done = false;
        app.refresh_visible();
        let paths: Vec<String> = app.visible.iter().map(|p| p.path_string()).collect();
        for p in &paths {
            app.selected.insert(p.clone());
        }
        let mut done_plans = app.all_plans.clone();
        for p in &mut done_plans {
            p.status = "done".to_string();
        }
        app.update(Msg::BatchDone {
            plans: done_plans,
            paths: paths.clone(),
            message: "2 plans → done".to_string(),
        });
        assert!(app.selected.is_empty());
        // both stay visible during the linger window
        assert_eq!(app.visible.len(), 2);
        let id = app.batch_linger_id;
        app.update(Msg::BatchLingerExpired { id });
        assert!(app.visible.is_empty());
    }

    #[test]
    fn test_plan_content_refresh_preserves_scroll() {
        let mut app = test_app(vec![test_plan("a.md", "active", 0)]);
        let path = app.visible[0].path_string();
        app.preview_scroll = 7;
        app.prev_cursor = Some(0);
        app.refreshing.insert(path.clone());
        app.update(Msg::PlanContent {
            path: path.clone(),
            doc: Arc::new(RenderedDoc::plain("body")),
        });
        assert_eq!(app.preview_scroll, 7);
        // a cursor-driven render resets to top
        app.update(Msg::PlanContent {
            path,
            doc: Arc::new(RenderedDoc::plain("body")),
        });
        assert_eq!(app.preview_scroll, 0);
    }

    #[test]
    fn test_resize_width_change_drops_cache() {
        let mut app = test_app(vec![test_plan("a.md", "active", 0)]);
        app.update(Msg::Resize(120, 40));
        let path = app.visible[0].path_string();
        app.preview_cache
            .insert(path.clone(), Arc::new(RenderedDoc::plain("x")));
        // same size: cache stays
        app.update(Msg::Resize(120, 40));
        assert!(app.preview_cache.contains_key(&path));
        // narrower: new width epoch
        app.update(Msg::Resize(80, 40));
        assert!(app.preview_cache.is_empty());
    }

    #[test]
    fn test_label_cycle_skips_empty_filters() {
        let mut a = test_plan("a.md", "active", 0);
        a.labels = vec!["web".into()];
        let mut b = test_plan("b.md", "done", 1);
        b.labels = vec!["hidden".into()];
        let mut app = test_app(vec![a, b]);
        app.show_done = false;
        app.refresh_visible();
        // "hidden" only labels a done plan: cycling must skip it
        app.cycle_label_filter(true);
        assert_eq!(app.label_filter, "web");
        app.cycle_label_filter(true);
        assert_eq!(app.label_filter, "");
    }

    #[test]
    fn test_demo_round_trip_restores_store() {
        let mut app = test_app(vec![test_plan("a.md", "active", 0)]);
        app.enter_demo();
        assert!(app.demo.active);
        assert!(!app.visible.is_empty());
        app.exit_demo();
        assert!(!app.demo.active);
        assert!(app.demo.plans.is_empty());
    }

    #[test]
    fn test_apply_status_noop_on_same_status() {
        let mut app = test_app(vec![test_plan("a.md", "active", 0)]);
        assert!(app.apply_status("active").is_empty());
        assert_eq!(app.apply_status("done").len(), 1);
    }

    #[test]
    fn test_open_label_modal_batch_mixed_state() {
        let mut a = test_plan("a.md", "active", 0);
        a.labels = vec!["shared".into(), "only-a".into()];
        let mut b = test_plan("b.md", "active", 1);
        b.labels = vec!["shared".into()];
        let mut app = test_app(vec![a, b]);
        for p in app.visible.iter().map(|p| p.path_string()).collect::<Vec<_>>() {
            app.selected.insert(p);
        }
        app.open_label_modal(true);
        let modal = app.label_modal.as_ref().unwrap();
        assert_eq!(modal.toggled.get("shared"), Some(&true));
        assert!(modal.mixed.contains("only-a"));
    }

    #[test]
    fn test_batch_label_apply_sends_only_deltas() {
        let mut a = test_plan("a.md", "active", 0);
        a.labels = vec!["shared".into()];
        let mut b = test_plan("b.md", "active", 1);
        b.labels = vec!["shared".into()];
        let mut app = test_app(vec![a, b]);
        for p in app.visible.iter().map(|p| p.path_string()).collect::<Vec<_>>() {
            app.selected.insert(p);
        }
        app.open_label_modal(true);
        // typing a new label and confirming toggles it on
        let modal = app.label_modal.as_mut().unwrap();
        modal.toggled.insert("atlas".to_string(), true);
        modal.dirty = true;

        let modal = app.label_modal.as_ref().unwrap();
        let add: Vec<&String> = modal
            .toggled
            .iter()
            .filter(|(l, on)| **on && !modal.original_on.contains(l.as_str()))
            .map(|(l, _)| l)
            .collect();
        // "shared" was already on everywhere, so only "atlas" is a delta
        assert_eq!(add, vec![&"atlas".to_string()]);
        let cmds = app.apply_label_changes();
        assert_eq!(cmds.len(), 1);
    }

    #[test]
    fn test_stale_notification_clear_ignored() {
        let mut app = test_app(vec![]);
        let _ = app.set_notification("first", STATUS_TIMEOUT);
        let stale = app.notification_id;
        let _ = app.set_notification("second", STATUS_TIMEOUT);
        app.update(Msg::NotificationClear { id: stale });
        assert_eq!(app.notification, "second");
        app.update(Msg::NotificationClear {
            id: app.notification_id,
        });
        assert!(app.notification.is_empty());
    }
}
