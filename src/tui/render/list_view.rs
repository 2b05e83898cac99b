use chrono::{Datelike, Local};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::model::{Plan, status_icon};
use crate::tui::app::{App, SPINNER_FRAMES};
use crate::tui::theme::label_color;

/// Left pane: title line with tabs, then one row per visible plan.
pub fn render_list(frame: &mut Frame, app: &mut App, area: Rect) {
    if area.height < 2 {
        return;
    }
    let title_area = Rect::new(area.x, area.y, area.width, 1);
    frame.render_widget(Paragraph::new(title_line(app, area.width)), title_area);

    let rows_area = Rect::new(area.x, area.y + 2, area.width, area.height.saturating_sub(2));
    if app.visible.is_empty() {
        render_empty_state(frame, app, rows_area);
        return;
    }

    let visible_rows = rows_area.height as usize;
    // keep the cursor inside the window
    let first = if app.cursor >= visible_rows {
        app.cursor + 1 - visible_rows
    } else {
        0
    };

    let mut lines: Vec<Line> = Vec::new();
    for (i, plan) in app.visible.iter().enumerate().skip(first).take(visible_rows) {
        lines.push(plan_row(app, plan, i == app.cursor, area.width));
    }
    frame.render_widget(Paragraph::new(lines), rows_area);
}

/// "planc" brand, optional demo/filter indicators, right-aligned
/// Active · All tabs.
fn title_line(app: &App, width: u16) -> Line<'static> {
    let theme = &app.theme;
    let mut spans: Vec<Span> = vec![Span::styled(" planc", theme.accent_style())];
    if app.demo.active {
        spans.push(Span::styled(" demo · press d to exit", theme.dim_style()));
    }
    if !app.label_filter.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            app.label_filter.clone(),
            Style::default().fg(label_color(&app.label_filter)),
        ));
    }
    if !app.search_input.is_empty() {
        spans.push(Span::styled(
            format!(" /{}", app.search_input),
            theme.dim_style(),
        ));
    }

    let (active_style, all_style) = if app.show_done {
        (theme.dim_style(), Style::default().add_modifier(Modifier::BOLD))
    } else {
        (Style::default().add_modifier(Modifier::BOLD), theme.dim_style())
    };
    let tabs = vec![
        Span::styled("a ", theme.dim_style()),
        Span::styled("Active", active_style),
        Span::styled(" · ", theme.dim_style()),
        Span::styled("All ", all_style),
    ];
    let tabs_w: usize = tabs.iter().map(|s| s.content.width()).sum();
    let used: usize = spans.iter().map(|s| s.content.width()).sum();
    let pad = (width as usize).saturating_sub(used + tabs_w);
    if pad > 0 {
        spans.push(Span::raw(" ".repeat(pad)));
        spans.extend(tabs);
    }
    Line::from(spans)
}

fn plan_row(app: &App, plan: &Plan, is_cursor: bool, width: u16) -> Line<'static> {
    let theme = &app.theme;
    let path = plan.path_string();
    let marked = app.selected.contains(&path);
    let changed = app.changed_files.contains(&plan.file);
    let marked_style = Style::default().fg(theme.magenta);

    let mut spans: Vec<Span> = Vec::new();
    if is_cursor {
        spans.push(Span::styled("│ ", theme.accent_style()));
    } else {
        spans.push(Span::raw("  "));
    }

    // status badge; a spinner takes over while the file refreshes
    if changed {
        spans.push(Span::styled(
            SPINNER_FRAMES[app.spinner_frame].to_string(),
            theme.accent_style(),
        ));
    } else if marked {
        spans.push(Span::styled(status_icon(&plan.status).to_string(), marked_style));
    } else {
        spans.push(Span::styled(
            status_icon(&plan.status).to_string(),
            theme.status_style(&plan.status),
        ));
    }
    spans.push(Span::raw(" "));

    // right side: undo hint, copied indicator, or the created date
    let trailer = if let Some(status) = app.undo_files.get(&path) {
        format!("→ {} (u)", status)
    } else if app.copied_files.contains(&plan.file) {
        "Copied!".to_string()
    } else {
        short_date(plan)
    };

    let mut label_prefix = String::new();
    if let Some(first) = plan.labels.first() {
        label_prefix = format!("{} ", first);
    }

    let fixed = 4; // bar + badge + space
    let avail = (width as usize)
        .saturating_sub(fixed + label_prefix.width() + trailer.width() + 2);
    let mut title = plan.title.clone();
    if title.width() > avail {
        let mut w = 0;
        let mut cut = title.len();
        for (i, ch) in title.char_indices() {
            let cw = ch.to_string().width();
            if w + cw > avail.saturating_sub(1) {
                cut = i;
                break;
            }
            w += cw;
        }
        title.truncate(cut);
        title.push('…');
    }

    if !label_prefix.is_empty() {
        let style = if marked {
            marked_style
        } else {
            Style::default()
                .fg(label_color(plan.labels.first().map(String::as_str).unwrap_or("")))
                .add_modifier(Modifier::BOLD)
        };
        spans.push(Span::styled(label_prefix.clone(), style));
    }
    let title_style = if marked {
        marked_style
    } else if plan.status == "done" {
        theme.dim_style()
    } else {
        Style::default()
    };
    spans.push(Span::styled(title.clone(), title_style));

    let used: usize = fixed + label_prefix.width() + title.width();
    let pad = (width as usize).saturating_sub(used + trailer.width() + 1);
    spans.push(Span::raw(" ".repeat(pad.max(1))));
    let trailer_style = if app.undo_files.contains_key(&path) {
        Style::default().fg(theme.yellow)
    } else if marked {
        marked_style
    } else {
        theme.dim_style()
    };
    spans.push(Span::styled(trailer, trailer_style));

    Line::from(spans)
}

/// MM-DD for the current year, full date otherwise.
fn short_date(plan: &Plan) -> String {
    let date = plan.created.format("%Y-%m-%d").to_string();
    if plan.created.year() == Local::now().year() {
        date[5..].to_string()
    } else {
        date
    }
}

fn render_empty_state(frame: &mut Frame, app: &App, area: Rect) {
    let dim = app.theme.dim_style();
    let msg: Vec<&str> = if app.demo.active {
        vec!["All demo plans deleted", "", "Press d to exit demo mode"]
    } else if app.plan_source().is_empty() {
        vec![
            "No plans yet",
            "",
            "Use plan mode in Claude Code",
            "and get planning!",
            "",
            "~/.claude/plans/",
            "",
            "d  try demo mode",
        ]
    } else {
        vec![
            "No active plans",
            "",
            "a show all · s set status · l labels",
            "",
            "Status and labels are stored as YAML",
            "frontmatter in your plan files.",
            "",
            "d  try demo mode",
        ]
    };
    let top = area.height.saturating_sub(msg.len() as u16) / 2;
    let lines: Vec<Line> = msg
        .into_iter()
        .map(|m| Line::from(Span::styled(m.to_string(), dim)).centered())
        .collect();
    let inner = Rect::new(area.x, area.y + top, area.width, area.height.saturating_sub(top));
    frame.render_widget(Paragraph::new(lines), inner);
}
