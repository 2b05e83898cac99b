pub mod clod;
pub mod list_view;
pub mod modals;
pub mod preview;
pub mod toc_pane;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use crate::tui::app::{App, Pane, SPINNER_FRAMES};

/// Compose one frame from the current model. Pure: reads App, never
/// issues commands.
pub fn render(frame: &mut Frame, app: &mut App) {
    if !app.ready {
        frame.render_widget(Paragraph::new("Loading..."), frame.area());
        return;
    }
    let area = frame.area();
    if app.clod.active {
        clod::render_clod(frame, app, area);
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    // 40/60 split between list and preview
    let list_w = app.list_width().max(20);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(list_w), Constraint::Min(10)])
        .split(chunks[0]);

    let (left_focused, right_focused) = match (&app.comment, app.focused) {
        (Some(c), _) => (c.focused_toc, !c.focused_toc),
        (None, Pane::List) => (true, false),
        (None, Pane::Preview) => (false, true),
    };

    let left_block = pane_block(app, left_focused);
    let right_block = pane_block(app, right_focused);

    let left_inner = left_block.inner(panes[0]);
    let right_inner = right_block.inner(panes[1]);
    frame.render_widget(left_block, panes[0]);
    frame.render_widget(right_block, panes[1]);

    if app.comment.is_some() {
        toc_pane::render_toc(frame, app, left_inner);
    } else {
        list_view::render_list(frame, app, left_inner);
    }
    preview::render_preview(frame, app, right_inner);

    render_hint_bar(frame, app, chunks[1]);

    // overlays, centered and clipped to the terminal
    if app.show_help {
        modals::render_help(frame, app, area);
    }
    if app.release_notes.is_some() {
        modals::render_release_notes(frame, app, area);
    }
    if app.status_modal.is_some() {
        modals::render_status_modal(frame, app, area);
    }
    if app.label_modal.is_some() {
        modals::render_label_modal(frame, app, area);
    }
}

fn pane_block(app: &App, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(app.theme.accent)
    } else {
        app.theme.dim_style()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_style)
}

/// Bottom bar: selection hints, transient status, update notice, or the
/// short key help, with the notification right-aligned.
fn render_hint_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let key = theme.accent_style();
    let dim = theme.dim_style();

    let mut spans: Vec<Span> = Vec::new();
    if app.confirm_delete {
        spans.push(Span::styled(format!(" {}", app.notification), theme.accent_style()));
    } else if !app.selected.is_empty() {
        spans.push(Span::styled(
            format!(" {} selected  ", app.selected.len()),
            Style::default().fg(theme.magenta),
        ));
        for (k, label) in [
            ("s", "status"),
            ("0-3", "set"),
            ("~", "cycle"),
            ("l", "labels"),
            ("a", "all"),
            ("esc", "clear"),
        ] {
            spans.push(Span::styled(k, key));
            spans.push(Span::styled(format!(" {} | ", label), dim));
        }
    } else if !app.status_text.is_empty() {
        spans.push(Span::styled(
            format!(" {} ", SPINNER_FRAMES[app.spinner_frame]),
            theme.accent_style(),
        ));
        spans.push(Span::styled(
            app.status_text.clone(),
            Style::default().fg(theme.magenta),
        ));
    } else if app.searching {
        spans.push(Span::styled(" Search: ", key));
        spans.push(Span::raw(app.search_input.clone()));
        spans.push(Span::styled("█", dim));
    } else if let Some((version, _)) = &app.update_available {
        spans.push(Span::styled(
            format!(
                " Update {} available · cargo install planc",
                version
            ),
            Style::default().fg(theme.yellow),
        ));
    } else if app.comment.is_some() {
        for (k, label) in [
            ("j/k", "navigate"),
            ("c", "comment"),
            ("d", "delete"),
            ("tab", "pane"),
            ("esc", "back"),
        ] {
            spans.push(Span::styled(format!(" {}", k), key));
            spans.push(Span::styled(format!(" {} |", label), dim));
        }
    } else {
        for (k, label) in [
            ("enter", "open"),
            ("c", "agent"),
            ("s", "status"),
            ("l", "labels"),
            ("v", "comments"),
            ("x", "select"),
            ("/", "search"),
            ("?", "help"),
        ] {
            spans.push(Span::styled(format!(" {}", k), key));
            spans.push(Span::styled(format!(" {} |", label), dim));
        }
    }

    let mut line = Line::from(spans);
    if !app.notification.is_empty() && !app.confirm_delete {
        // right-align the notification after the hints
        let used: usize = line.width();
        let text = format!("{} ", app.notification);
        let pad = (area.width as usize).saturating_sub(used + text.len());
        line.push_span(Span::raw(" ".repeat(pad)));
        line.push_span(Span::styled(text, Style::default().fg(app.theme.yellow)));
    }
    frame.render_widget(Paragraph::new(line), area);
}

/// A centered rect no larger than the given size, clipped to `area`.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width - w) / 2;
    let y = area.y + (area.height - h) / 2;
    Rect::new(x, y, w, h)
}
