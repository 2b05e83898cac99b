use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::io::store::save_comment_cmd;
use crate::io::update::mark_release_notes_seen;
use crate::model::{expand_command, next_status, effective_editor_mode, shell_command};
use crate::msg::{Cmd, Msg, tick};
use crate::ops::comments::{inject_comment, remove_comment, replace_comment};
use crate::tui::app::{
    App, COPIED_TIMEOUT, LABEL_FLASH_INTERVAL, Pane, PendingExec, STATUS_OPTIONS, STATUS_TIMEOUT,
    status_cursor_for,
};

// ─── Clipboard ──────────────────────────────────────────────────────────
// Shells out to the platform clipboard tool; a missing backend surfaces
// as a notification, never a crash.

fn clipboard_set(text: &str) -> Result<(), String> {
    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("pbcopy");
    #[cfg(not(target_os = "macos"))]
    let mut cmd = {
        let mut c = Command::new("xclip");
        c.args(["-selection", "clipboard"]);
        c
    };
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("clipboard: {}", e))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| format!("clipboard: {}", e))?;
    }
    child.wait().map_err(|e| format!("clipboard: {}", e))?;
    Ok(())
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Scroll the preview by `delta` lines, clamped to the displayed doc.
fn scroll_preview(app: &mut App, delta: isize) {
    let doc_len = if let Some(c) = &app.comment {
        c.doc.line_count()
    } else {
        app.selected_path()
            .and_then(|p| app.preview_cache.get(&p))
            .map(|d| d.line_count())
            .unwrap_or(0)
    };
    let viewport = app.preview_inner_height();
    let max = doc_len.saturating_sub(viewport);
    let next = app.preview_scroll as isize + delta;
    app.preview_scroll = next.clamp(0, max as isize) as usize;
}

fn half_page(app: &App) -> isize {
    (app.preview_inner_height() / 2).max(1) as isize
}

/// Top-level key dispatch: global keys, then the active overlay, then
/// select-mode overrides, then pane-scoped keys, then list navigation.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    if is_ctrl_c(&key) {
        app.should_quit = true;
        return Vec::new();
    }

    // settings wizard — global, checked before any overlay handler
    if key.code == KeyCode::Char(',') {
        app.show_help = false;
        app.confirm_delete = false;
        app.status_modal = None;
        app.label_modal = None;
        app.pending_exec = Some(PendingExec::Setup);
        return Vec::new();
    }

    if app.clod.active {
        return handle_clod_key(app, key);
    }
    if app.release_notes.is_some() {
        return handle_release_notes_key(app, key);
    }
    if app.comment.is_some() {
        return handle_comment_key(app, key);
    }
    if app.show_help {
        match key.code {
            KeyCode::Char('?') | KeyCode::Esc => app.show_help = false,
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        }
        return Vec::new();
    }
    if app.label_modal.is_some() {
        return handle_label_modal_key(app, key);
    }
    if app.status_modal.is_some() {
        return handle_status_modal_key(app, key);
    }
    if app.confirm_delete {
        return handle_delete_confirm_key(app, key);
    }
    if app.searching {
        return handle_search_key(app, key);
    }

    // preview paging works regardless of pane focus
    match key.code {
        KeyCode::Char(' ') => {
            scroll_preview(app, half_page(app));
            return Vec::new();
        }
        KeyCode::Char('B') => {
            scroll_preview(app, -half_page(app));
            return Vec::new();
        }
        _ => {}
    }

    // demo toggle, blocked during search results
    if key.code == KeyCode::Char('d') && app.search_input.is_empty() {
        let mut cmds = Vec::new();
        if app.demo.active {
            cmds.extend(app.exit_demo());
        } else {
            app.enter_demo();
        }
        cmds.extend(app.render_window());
        app.prev_cursor = Some(app.cursor);
        return cmds;
    }

    if !app.selected.is_empty()
        && let Some(cmds) = handle_select_mode_key(app, &key)
    {
        return cmds;
    }

    if app.focused == Pane::Preview {
        return handle_preview_key(app, key);
    }
    handle_list_key(app, key)
}

/// Keys while one or more plans are selected. Returns None for keys that
/// fall through to normal handling (navigation, help, quit).
fn handle_select_mode_key(app: &mut App, key: &KeyEvent) -> Option<Vec<Cmd>> {
    match key.code {
        KeyCode::Esc => {
            app.selected.clear();
            Some(Vec::new())
        }
        KeyCode::Char('s') => {
            let status = app
                .first_selected_plan()
                .map(|p| p.status.clone())
                .unwrap_or_default();
            app.status_modal = Some(status_cursor_for(&status));
            Some(Vec::new())
        }
        KeyCode::Char('~') => {
            let target = app
                .first_selected_plan()
                .map(|p| next_status(&p.status))
                .unwrap_or("reviewed");
            Some(app.apply_status(target))
        }
        KeyCode::Char(c @ ('0' | '1' | '2' | '3')) => {
            let status = STATUS_OPTIONS[c as usize - '0' as usize].2;
            Some(app.apply_status(status))
        }
        KeyCode::Char('l') => {
            app.open_label_modal(true);
            Some(Vec::new())
        }
        KeyCode::Char('a') => {
            for path in app.visible.iter().map(|p| p.path_string()).collect::<Vec<_>>() {
                app.selected.insert(path);
            }
            Some(Vec::new())
        }
        KeyCode::Char('C') => {
            if app.demo.active {
                return Some(Vec::new());
            }
            let paths = app.selected_paths();
            Some(copy_to_clipboard(app, paths))
        }
        KeyCode::Char('x') => {
            if let Some(path) = app.selected_path() {
                if !app.selected.remove(&path) {
                    app.selected.insert(path);
                }
            }
            Some(Vec::new())
        }
        _ => None,
    }
}

fn copy_to_clipboard(app: &mut App, paths: Vec<String>) -> Vec<Cmd> {
    match clipboard_set(&paths.join(", ")) {
        Ok(()) => {
            app.copied_files.clear();
            for p in app
                .visible
                .iter()
                .filter(|p| paths.contains(&p.path_string()))
                .map(|p| p.file.clone())
                .collect::<Vec<_>>()
            {
                app.copied_files.insert(p);
            }
            app.copied_id += 1;
            vec![tick(COPIED_TIMEOUT, Msg::CopiedClear { id: app.copied_id })]
        }
        Err(e) => vec![app.set_notification(&format!("Error: {}", e), STATUS_TIMEOUT)],
    }
}

fn handle_preview_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => scroll_preview(app, 1),
        KeyCode::Char('k') | KeyCode::Up => scroll_preview(app, -1),
        KeyCode::PageDown => scroll_preview(app, half_page(app)),
        KeyCode::Char('u') | KeyCode::PageUp => scroll_preview(app, -half_page(app)),
        KeyCode::Left | KeyCode::Tab | KeyCode::BackTab => app.focused = Pane::List,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('q') => app.should_quit = true,
        _ => {}
    }
    Vec::new()
}

fn handle_list_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('?') => {
            app.show_help = true;
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Right => {
            app.focused = Pane::Preview;
        }
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                app.search_input.clear();
                app.refresh_visible();
                app.cursor = 0;
                app.sync_preview_to_cursor(&mut cmds);
            } else if app.show_done || !app.label_filter.is_empty() {
                app.show_done = false;
                app.label_filter = String::new();
                if app.cfg.show_all {
                    app.persist_show_all();
                }
                app.refresh_visible();
                app.cursor = 0;
                app.sync_preview_to_cursor(&mut cmds);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.cursor + 1 < app.visible.len() {
                app.cursor += 1;
            }
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.cursor = app.cursor.saturating_sub(1);
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::PageDown => {
            app.cursor = (app.cursor + 10).min(app.visible.len().saturating_sub(1));
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::PageUp => {
            app.cursor = app.cursor.saturating_sub(10);
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Char('g') | KeyCode::Home => {
            app.cursor = 0;
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Char('G') | KeyCode::End => {
            app.cursor = app.visible.len().saturating_sub(1);
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Char('/') => {
            app.searching = true;
            app.search_input.clear();
            app.refresh_visible();
        }
        KeyCode::Char('s') => {
            let cursor = app.selected_plan().map(|p| status_cursor_for(&p.status));
            if let Some(cursor) = cursor {
                app.status_modal = Some(cursor);
            }
        }
        KeyCode::Char('~') => {
            let target = app.selected_plan().map(|p| next_status(&p.status));
            if let Some(target) = target {
                cmds.extend(app.apply_status(target));
            }
        }
        KeyCode::Char(c @ ('0' | '1' | '2' | '3')) => {
            let status = STATUS_OPTIONS[c as usize - '0' as usize].2;
            cmds.extend(app.apply_status(status));
        }
        KeyCode::Char('u') => {
            if let Some((old, new)) = app.last_status_change.take() {
                app.undo_files.clear();
                cmds.push(app.store.set_status(&new, &old.status));
            }
        }
        KeyCode::Char('a') => {
            app.show_done = !app.show_done;
            app.persist_show_all();
            app.refresh_visible();
            app.cursor = 0;
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Char('[') => {
            cmds.extend(app.cycle_label_filter(false));
        }
        KeyCode::Char(']') => {
            cmds.extend(app.cycle_label_filter(true));
        }
        KeyCode::Char('l') => {
            if app.selected_plan().is_some() {
                app.open_label_modal(false);
            }
        }
        KeyCode::Char('#') => {
            let file = app.selected_plan().map(|p| p.file.clone());
            if let Some(file) = file {
                app.confirm_delete = true;
                app.notification = format!("Delete {}? (y/n)", file);
            }
        }
        KeyCode::Char('C') => {
            if !app.demo.active
                && let Some(path) = app.selected_path()
            {
                cmds.extend(copy_to_clipboard(app, vec![path]));
            }
        }
        KeyCode::Char('x') => {
            if let Some(path) = app.selected_path() {
                app.selected.insert(path);
            }
        }
        KeyCode::Char('v') => {
            cmds.extend(app.enter_comment_mode());
        }
        KeyCode::Char('c') => {
            cmds.extend(launch_primary(app));
        }
        KeyCode::Enter => {
            cmds.extend(launch_editor(app));
        }
        _ => {}
    }
    cmds
}

fn launch_primary(app: &mut App) -> Vec<Cmd> {
    if app.demo.active {
        return enter_clod(app);
    }
    let Some(path) = app.selected_path() else {
        return Vec::new();
    };
    let args = expand_command(&app.cfg.primary, &path, &app.cfg.prompt_prefix);
    if args.is_empty() {
        return Vec::new();
    }
    app.pending_exec = Some(PendingExec::Command { args });
    Vec::new()
}

fn launch_editor(app: &mut App) -> Vec<Cmd> {
    if app.demo.active {
        return enter_clod(app);
    }
    let Some(path) = app.selected_path() else {
        return Vec::new();
    };
    let args = expand_command(&app.cfg.editor, &path, "");
    if args.is_empty() {
        return Vec::new();
    }
    if effective_editor_mode(&app.cfg) == "background" {
        // GUI editor: start detached, reap in the background, let the
        // watcher pick up any changes
        return vec![Box::new(move || {
            let mut c = shell_command(&args);
            match c.spawn() {
                Ok(mut child) => {
                    std::thread::spawn(move || {
                        let _ = child.wait();
                    });
                    Some(Msg::EditorLaunched)
                }
                Err(e) => Some(Msg::Error(format!("editor start: {}", e))),
            }
        })];
    }
    app.pending_exec = Some(PendingExec::Command { args });
    Vec::new()
}

fn enter_clod(app: &mut App) -> Vec<Cmd> {
    let Some((file, label)) = app
        .selected_plan()
        .map(|p| (p.file.clone(), p.labels.first().cloned().unwrap_or_default()))
    else {
        return Vec::new();
    };
    let tick_id = app.clod.tick_id + 1;
    app.clod = crate::tui::demo::ClodState {
        active: true,
        done: false,
        tick_id,
        plan_file: file.clone(),
        label,
        preamble: format!("{}{}", app.cfg.prompt_prefix, file),
        input: String::new(),
        step: -1,
    };
    vec![tick(
        Duration::from_millis(500),
        Msg::DemoScriptTick { id: tick_id },
    )]
}

fn handle_clod_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    if !app.clod.done {
        // animation playing: swallow everything
        return Vec::new();
    }
    match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            app.clod.active = false;
            app.clod.tick_id += 1;
            return app.render_window();
        }
        KeyCode::Backspace => {
            app.clod.input.pop();
        }
        KeyCode::Char(c) => {
            app.clod.input.push(c);
        }
        _ => {}
    }
    Vec::new()
}

fn handle_release_notes_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
            if let Some(notes) = app.release_notes.take() {
                return vec![mark_release_notes_seen(&notes.version)];
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(notes) = &mut app.release_notes {
                notes.scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(notes) = &mut app.release_notes {
                notes.scroll = notes.scroll.saturating_sub(1);
            }
        }
        KeyCode::Char(' ') => {
            if let Some(notes) = &mut app.release_notes {
                notes.scroll += 10;
            }
        }
        KeyCode::Char('B') => {
            if let Some(notes) = &mut app.release_notes {
                notes.scroll = notes.scroll.saturating_sub(10);
            }
        }
        _ => {}
    }
    Vec::new()
}

fn handle_search_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    match key.code {
        KeyCode::Esc => {
            app.searching = false;
            app.search_input.clear();
            app.refresh_visible();
            app.cursor = 0;
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Enter => {
            app.searching = false;
            if app.search_input.is_empty() {
                app.refresh_visible();
            }
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Backspace => {
            if app.search_input.is_empty() {
                app.searching = false;
            } else {
                app.search_input.pop();
            }
            app.refresh_visible();
            app.cursor = 0;
            app.sync_preview_to_cursor(&mut cmds);
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
            app.refresh_visible();
            app.cursor = 0;
            app.sync_preview_to_cursor(&mut cmds);
        }
        _ => {}
    }
    cmds
}

fn handle_delete_confirm_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    match key.code {
        KeyCode::Char('y') => {
            app.confirm_delete = false;
            app.notification.clear();
            if let Some(plan) = app.selected_plan().cloned() {
                let mut cmds = vec![app.store.delete_plan(&plan)];
                cmds.push(app.set_notification(&format!("Deleted: {}", plan.file), STATUS_TIMEOUT));
                return cmds;
            }
        }
        KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
            app.confirm_delete = false;
            app.notification.clear();
        }
        _ => {}
    }
    Vec::new()
}

fn handle_status_modal_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    let Some(cursor) = app.status_modal else {
        return Vec::new();
    };
    match key.code {
        KeyCode::Esc => {
            app.status_modal = None;
        }
        KeyCode::Enter => {
            app.status_modal = None;
            return app.apply_status(STATUS_OPTIONS[cursor].2);
        }
        KeyCode::Char(c @ ('0' | '1' | '2' | '3')) => {
            app.status_modal = None;
            return app.apply_status(STATUS_OPTIONS[c as usize - '0' as usize].2);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if cursor + 1 < STATUS_OPTIONS.len() {
                app.status_modal = Some(cursor + 1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.status_modal = Some(cursor.saturating_sub(1));
        }
        _ => {}
    }
    Vec::new()
}

fn handle_label_modal_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    // a flash animation is running: ignore keys until it applies
    if app.label_modal.as_ref().is_some_and(|m| m.flash_ticks > 0) {
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            if app.label_modal_has_changes() {
                return app.apply_label_changes();
            }
            app.label_modal = None;
        }
        KeyCode::Enter => {
            let (filter, filtered) = match &app.label_modal {
                Some(m) => (m.input.trim().to_lowercase(), m.filtered_choices()),
                None => return Vec::new(),
            };
            if !filter.is_empty() && filtered.is_empty() {
                // create a new label
                if let Some(m) = &mut app.label_modal {
                    m.toggled.insert(filter, true);
                    m.dirty = true;
                }
                return app.apply_label_changes();
            }
            if filter.is_empty() && app.label_modal_has_changes() {
                return app.apply_label_changes();
            }
            let on_entry = app
                .label_modal
                .as_ref()
                .is_some_and(|m| m.cursor < filtered.len());
            if on_entry {
                // toggle under cursor, flash briefly, then apply
                if let Some(m) = &mut app.label_modal {
                    m.toggle_at_cursor();
                    m.flash_idx = Some(m.cursor);
                    m.flash_ticks = 5;
                }
                return vec![tick(LABEL_FLASH_INTERVAL, Msg::LabelFlashTick)];
            }
            app.label_modal = None;
        }
        KeyCode::Char(' ') => {
            if let Some(modal) = &mut app.label_modal {
                modal.toggle_at_cursor();
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(modal) = &mut app.label_modal {
                let n = modal.filtered_choices().len();
                if modal.cursor + 1 < n {
                    modal.cursor += 1;
                }
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(modal) = &mut app.label_modal {
                modal.cursor = modal.cursor.saturating_sub(1);
            }
        }
        KeyCode::Backspace => {
            let empty = app.label_modal.as_ref().is_some_and(|m| m.input.is_empty());
            if empty {
                app.label_modal = None;
            } else if let Some(modal) = &mut app.label_modal {
                modal.input.pop();
                modal.cursor = 0;
            }
        }
        KeyCode::Char(c) => {
            if let Some(modal) = &mut app.label_modal {
                modal.input.push(c);
                modal.cursor = 0;
            }
        }
        _ => {}
    }
    Vec::new()
}

fn handle_comment_key(app: &mut App, key: KeyEvent) -> Vec<Cmd> {
    if app.comment.is_none() {
        return Vec::new();
    }

    if app.comment.as_ref().is_some_and(|c| c.editing) {
        match key.code {
            KeyCode::Esc => {
                if let Some(c) = &mut app.comment {
                    c.editing = false;
                    c.input.clear();
                }
            }
            KeyCode::Enter => {
                let Some(c) = &mut app.comment else {
                    return Vec::new();
                };
                let text = c.input.trim().to_string();
                c.editing = false;
                c.input.clear();
                if text.is_empty() {
                    return Vec::new();
                }
                let Some(entry) = c.toc.get(c.edit_target) else {
                    return Vec::new();
                };
                let new_body = if c.edit_existing {
                    replace_comment(&c.raw_body, entry.raw_line, &text)
                } else {
                    inject_comment(&c.raw_body, entry.raw_line, &text)
                };
                return dispatch_comment_save(app, new_body);
            }
            KeyCode::Backspace => {
                if let Some(c) = &mut app.comment {
                    c.input.pop();
                }
            }
            KeyCode::Char(ch) => {
                if let Some(c) = &mut app.comment {
                    c.input.push(ch);
                }
            }
            _ => {}
        }
        return Vec::new();
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('v') => {
            app.comment = None;
            app.preview_scroll = 0;
            let mut cmds = Vec::new();
            app.prev_cursor = None;
            app.sync_preview_to_cursor(&mut cmds);
            return cmds;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if let Some(c) = &mut app.comment {
                c.focused_toc = !c.focused_toc;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let on_toc = app.comment.as_ref().is_some_and(|c| c.focused_toc);
            if on_toc {
                if let Some(c) = &mut app.comment
                    && c.cursor + 1 < c.toc.len()
                {
                    c.cursor += 1;
                }
                app.sync_comment_scroll();
            } else {
                scroll_preview(app, 1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let on_toc = app.comment.as_ref().is_some_and(|c| c.focused_toc);
            if on_toc {
                if let Some(c) = &mut app.comment {
                    c.cursor = c.cursor.saturating_sub(1);
                }
                app.sync_comment_scroll();
            } else {
                scroll_preview(app, -1);
            }
        }
        KeyCode::Char(' ') => {
            let delta = half_page(app);
            scroll_preview(app, delta);
        }
        KeyCode::Char('B') => {
            let delta = half_page(app);
            scroll_preview(app, -delta);
        }
        KeyCode::Char('c') | KeyCode::Enter => {
            if let Some(c) = &mut app.comment
                && let Some(entry) = c.toc.get(c.cursor)
            {
                c.edit_target = c.cursor;
                c.edit_existing = entry.is_comment;
                c.input = if entry.is_comment {
                    entry.text.clone()
                } else {
                    String::new()
                };
                c.editing = true;
            }
        }
        KeyCode::Char('d') => {
            let removal = app.comment.as_ref().and_then(|c| {
                c.toc.get(c.cursor).and_then(|entry| {
                    if entry.is_comment {
                        Some(remove_comment(&c.raw_body, entry.raw_line))
                    } else {
                        None
                    }
                })
            });
            if let Some(new_body) = removal {
                return dispatch_comment_save(app, new_body);
            }
        }
        _ => {}
    }
    Vec::new()
}

fn dispatch_comment_save(app: &mut App, new_body: String) -> Vec<Cmd> {
    let Some(c) = &mut app.comment else {
        return Vec::new();
    };
    c.loading = true;
    let path = c.path.clone();
    let style = app.md_style;
    let width = app.preview_inner_width();
    let mut cmds = app.set_status_text("Saving…", STATUS_TIMEOUT);
    if app.demo.active {
        // no disk in demo mode; the in-memory body updates on arrival
        cmds.push(Box::new(move || {
            let (doc, toc) = crate::io::store::render_and_map(&new_body, style, width);
            Some(Msg::CommentSaved {
                path,
                raw_body: new_body,
                doc,
                toc,
            })
        }));
    } else {
        cmds.push(save_comment_cmd(path, new_body, style, width));
    }
    cmds
}

/// Wheel over the list moves the cursor; wheel over the preview scrolls
/// it. Only wheel events are handled.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) -> Vec<Cmd> {
    if app.clod.active || app.release_notes.is_some() {
        return Vec::new();
    }
    let mut cmds = Vec::new();
    let over_list = mouse.column < app.list_width() && app.comment.is_none();
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            if over_list {
                app.cursor = app.cursor.saturating_sub(1);
                app.sync_preview_to_cursor(&mut cmds);
            } else {
                scroll_preview(app, -3);
            }
        }
        MouseEventKind::ScrollDown => {
            if over_list {
                if app.cursor + 1 < app.visible.len() {
                    app.cursor += 1;
                }
                app.sync_preview_to_cursor(&mut cmds);
            } else {
                scroll_preview(app, 3);
            }
        }
        _ => {}
    }
    cmds
}
