use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use crate::model::status_label;
use crate::render::render_markdown;
use crate::tui::app::{App, STATUS_OPTIONS};
use crate::tui::render::centered_rect;
use crate::tui::theme::label_color;

fn modal_block(app: &App, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(app.theme.accent))
        .title(Span::styled(
            format!(" {} ", title),
            app.theme.accent_style(),
        ))
}

pub fn render_status_modal(frame: &mut Frame, app: &App, area: Rect) {
    let Some(cursor) = app.status_modal else {
        return;
    };
    let rect = centered_rect(area, 28, STATUS_OPTIONS.len() as u16 + 2);
    frame.render_widget(Clear, rect);
    let block = modal_block(app, "status");
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let lines: Vec<Line> = STATUS_OPTIONS
        .iter()
        .enumerate()
        .map(|(i, (key, icon, status))| {
            let selected = i == cursor;
            let bar = if selected { "│ " } else { "  " };
            let style = if selected {
                app.theme.accent_style()
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(bar.to_string(), app.theme.accent_style()),
                Span::styled(format!("{} ", key), app.theme.dim_style()),
                Span::styled(format!("{} ", icon), app.theme.status_style(status)),
                Span::styled(status_label(status).to_string(), style),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

pub fn render_label_modal(frame: &mut Frame, app: &App, area: Rect) {
    let Some(modal) = &app.label_modal else {
        return;
    };
    let filtered = modal.filtered_choices();
    let height = (filtered.len() as u16 + 4).min(area.height.saturating_sub(2)).max(6);
    let rect = centered_rect(area, 40, height);
    frame.render_widget(Clear, rect);
    let title = if modal.batch { "labels (batch)" } else { "labels" };
    let block = modal_block(app, title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::styled("filter: ", app.theme.dim_style()),
            Span::raw(modal.input.clone()),
            Span::styled("█", app.theme.dim_style()),
        ]),
        Line::default(),
    ];
    if filtered.is_empty() && !modal.input.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("enter creates \"{}\"", modal.input.trim().to_lowercase()),
            app.theme.dim_style(),
        )));
    }
    for (i, label) in filtered.iter().enumerate() {
        let on = modal.toggled.get(label).copied().unwrap_or(false);
        let mixed = modal.mixed.contains(label);
        let mark = if on {
            "[x]"
        } else if mixed {
            "[-]"
        } else {
            "[ ]"
        };
        let is_cursor = i == modal.cursor;
        let flashing = modal.flash_idx == Some(i) && modal.flash_ticks % 2 == 1;
        let bar = if is_cursor { "│ " } else { "  " };
        let mut style = Style::default().fg(label_color(label));
        if flashing {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            Span::styled(bar.to_string(), app.theme.accent_style()),
            Span::styled(format!("{} ", mark), app.theme.dim_style()),
            Span::styled(label.clone(), style),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let rect = centered_rect(area, 64, 22);
    frame.render_widget(Clear, rect);
    let block = modal_block(app, "keybindings");
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let rows: [(&str, &str); 18] = [
        ("enter", "open plan in editor"),
        ("c", "send plan to coding agent"),
        ("C", "copy plan path"),
        ("s", "status picker"),
        ("0-3", "set status directly"),
        ("~", "cycle status"),
        ("u", "undo last status change"),
        ("l", "edit labels"),
        ("[ / ]", "cycle label filter"),
        ("a", "toggle done plans"),
        ("x", "select for batch ops"),
        ("v", "comment mode"),
        ("/", "search"),
        ("#", "delete plan"),
        ("tab", "switch pane"),
        ("space / B", "page preview"),
        (",", "settings"),
        ("q", "quit"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("  {:<10}", key), app.theme.accent_style()),
                Span::styled(desc.to_string(), Style::default()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

pub fn render_release_notes(frame: &mut Frame, app: &App, area: Rect) {
    let Some(notes) = &app.release_notes else {
        return;
    };
    let rect = centered_rect(
        area,
        area.width.saturating_sub(4).min(96).max(32),
        area.height.saturating_sub(4).min(36).max(10),
    );
    frame.render_widget(Clear, rect);
    let block = modal_block(app, &format!("What's New in {}", notes.version));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let doc = render_markdown(&notes.markdown, app.md_style, inner.width as usize);
    let body_height = inner.height.saturating_sub(1) as usize;
    let max_scroll = doc.line_count().saturating_sub(body_height);
    let scroll = notes.scroll.min(max_scroll);

    let mut lines: Vec<Line> = doc
        .lines
        .iter()
        .skip(scroll)
        .take(body_height)
        .map(|l| {
            Line::from(
                l.spans
                    .iter()
                    .map(|(text, style)| Span::styled(text.clone(), *style))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    lines.push(Line::from(Span::styled(
        "enter/esc dismiss · j/k or space/B scroll",
        app.theme.dim_style(),
    )));
    frame.render_widget(Paragraph::new(lines), inner);
}
