use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::{status_icon, status_label};
use crate::tui::app::App;
use crate::tui::theme::label_color;

/// Comment-mode left pane: status/label header, then headings and
/// comments in source order, scrolled around the cursor.
pub fn render_toc(frame: &mut Frame, app: &App, area: Rect) {
    let Some(c) = &app.comment else {
        return;
    };
    let theme = &app.theme;
    let dim = theme.dim_style();

    let mut header: Vec<Span> = Vec::new();
    if let Some(plan) = app.selected_plan() {
        header.push(Span::raw(" "));
        header.push(Span::styled(
            status_icon(&plan.status).to_string(),
            theme.status_style(&plan.status),
        ));
        header.push(Span::styled(" s ", dim));
        header.push(Span::styled(
            status_label(&plan.status).to_string(),
            theme.status_style(&plan.status),
        ));
        header.push(Span::styled(" · l", dim));
        if plan.labels.is_empty() {
            header.push(Span::styled(" (none)", dim));
        } else {
            for l in &plan.labels {
                header.push(Span::raw(" "));
                header.push(Span::styled(
                    l.clone(),
                    Style::default().fg(label_color(l)),
                ));
            }
        }
    }
    frame.render_widget(
        Paragraph::new(Line::from(header)),
        Rect::new(area.x, area.y, area.width, 1),
    );

    let body = Rect::new(area.x, area.y + 2, area.width, area.height.saturating_sub(2));
    if c.loading {
        frame.render_widget(Paragraph::new(Span::styled("Loading...", dim)), body);
        return;
    }
    if c.toc.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled("No headings found", dim)).centered()),
            body,
        );
        return;
    }

    // reserve the last rows for the edit prompt while typing
    let edit_rows = if c.editing { 2u16 } else { 0 };
    let list_area = Rect::new(body.x, body.y, body.width, body.height.saturating_sub(edit_rows));
    let max_visible = list_area.height as usize;

    let mut first = 0;
    if c.toc.len() > max_visible {
        first = c
            .cursor
            .saturating_sub(max_visible / 2)
            .min(c.toc.len() - max_visible);
    }

    let mut lines: Vec<Line> = Vec::new();
    for (i, entry) in c.toc.iter().enumerate().skip(first).take(max_visible) {
        let is_cursor = i == c.cursor;
        let mut spans: Vec<Span> = Vec::new();
        if is_cursor {
            spans.push(Span::styled("│ ", theme.accent_style()));
        } else {
            spans.push(Span::raw("  "));
        }
        if entry.is_comment {
            let style = if is_cursor {
                theme.accent_style()
            } else {
                Style::default().fg(theme.yellow).add_modifier(Modifier::ITALIC)
            };
            spans.push(Span::styled(format!("💬 {}", entry.text), style));
        } else {
            let indent = "  ".repeat((entry.level.max(1) - 1) as usize);
            let style = if is_cursor { theme.accent_style() } else { dim };
            spans.push(Span::raw(indent));
            spans.push(Span::styled(entry.text.clone(), style));
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), list_area);

    if c.editing {
        let prompt_area = Rect::new(
            body.x,
            body.y + body.height.saturating_sub(edit_rows),
            body.width,
            edit_rows.min(body.height),
        );
        let label = if c.edit_existing { "edit comment" } else { "new comment" };
        let lines = vec![
            Line::from(Span::styled(format!("{} (enter to save, esc to cancel)", label), dim)),
            Line::from(vec![
                Span::styled("> ", theme.accent_style()),
                Span::raw(c.input.clone()),
                Span::styled("█", dim),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), prompt_area);
    }
}
