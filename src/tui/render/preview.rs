use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::render::RenderedDoc;
use crate::tui::app::App;

/// Right pane: the rendered markdown preview with a filename title line.
/// Reads the cache synchronously; a missing entry shows as blank until
/// its render task posts back.
pub fn render_preview(frame: &mut Frame, app: &App, area: Rect) {
    if area.height < 2 {
        return;
    }

    let (title, doc) = if let Some(c) = &app.comment {
        let name = c
            .path
            .rsplit('/')
            .next()
            .unwrap_or(c.path.as_str())
            .to_string();
        (name, Some(c.doc.clone()))
    } else {
        match app.selected_plan() {
            Some(plan) => (
                plan.file.clone(),
                app.preview_cache.get(&plan.path_string()).cloned(),
            ),
            None => (String::new(), None),
        }
    };

    let title_area = Rect::new(area.x, area.y, area.width, 1);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {}", title),
            app.theme.accent_style(),
        ))),
        title_area,
    );

    let body_area = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    let Some(doc) = doc else {
        let placeholder = if app.comment.as_ref().is_some_and(|c| c.loading) {
            "Loading..."
        } else {
            ""
        };
        frame.render_widget(
            Paragraph::new(Span::styled(placeholder, app.theme.dim_style())),
            body_area,
        );
        return;
    };

    frame.render_widget(
        Paragraph::new(doc_lines(&doc, app.preview_scroll, body_area.height as usize)),
        body_area,
    );
}

/// Slice a rendered doc into ratatui lines for the current viewport.
fn doc_lines(doc: &RenderedDoc, scroll: usize, height: usize) -> Vec<Line<'static>> {
    doc.lines
        .iter()
        .skip(scroll)
        .take(height)
        .map(|l| {
            Line::from(
                l.spans
                    .iter()
                    .map(|(text, style)| Span::styled(text.clone(), *style))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}
