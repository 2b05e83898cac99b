use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::tui::demo::{CLOD_SCRIPT, ClodStepKind};

/// Full-screen fake "Clod Code" session for demo mode.
pub fn render_clod(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let dim = theme.dim_style();
    let green = Style::default().fg(theme.green).add_modifier(Modifier::BOLD);
    let bullet = Style::default().add_modifier(Modifier::BOLD);
    let think = Style::default().fg(theme.yellow);

    let rule = "─".repeat(area.width.saturating_sub(2) as usize);
    let project = if app.clod.label.is_empty() {
        "myproject".to_string()
    } else {
        app.clod.label.clone()
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::default());

    // mascot + branding
    let header: [(&str, String); 6] = [
        ("        *", String::new()),
        ("       ╱ ╲", String::new()),
        ("      ╱   ╲", "Clod Code v9.0.0".to_string()),
        ("     ╱ ▪ ▪ ╲", "Gnopus 7 · Clod Ultra".to_string()),
        ("    ╱  ───  ╲", format!("~/code/{}", project)),
        ("   ╱_________╲", String::new()),
    ];
    for (left, right) in header {
        let pad = 24usize.saturating_sub(left.chars().count());
        lines.push(Line::from(vec![
            Span::styled(left.to_string(), dim),
            Span::raw(" ".repeat(pad)),
            Span::styled(right, dim),
        ]));
    }
    lines.push(Line::default());

    // top rule + submitted prompt
    lines.push(Line::from(Span::styled(rule.clone(), dim)));
    lines.push(Line::from(vec![
        Span::styled("❯ ", green),
        Span::raw(app.clod.preamble.clone()),
    ]));
    lines.push(Line::from(Span::styled(rule.clone(), dim)));

    if app.clod.step >= 0 {
        lines.push(Line::default());
        let mut last_thinking: Option<usize> = None;
        let upto = (app.clod.step as usize).min(CLOD_SCRIPT.len() - 1);
        for (i, step) in CLOD_SCRIPT.iter().enumerate().take(upto + 1) {
            let text = step.text.replace("{file}", &app.clod.plan_file);
            match step.kind {
                ClodStepKind::Text => {
                    last_thinking = None;
                    let mut first = true;
                    for part in text.split('\n') {
                        if first {
                            lines.push(Line::from(vec![
                                Span::styled("● ", bullet),
                                Span::raw(part.to_string()),
                            ]));
                            first = false;
                        } else {
                            lines.push(Line::from(Span::raw(format!("  {}", part))));
                        }
                    }
                    lines.push(Line::default());
                }
                ClodStepKind::ToolCall => {
                    last_thinking = None;
                    lines.push(Line::from(vec![
                        Span::styled("● ", bullet),
                        Span::raw(text),
                    ]));
                    let out = if step.output.is_empty() {
                        "(No output)".to_string()
                    } else {
                        step.output.replace("{file}", &app.clod.plan_file)
                    };
                    lines.push(Line::from(vec![
                        Span::raw("  ⎿  "),
                        Span::styled(out, dim),
                    ]));
                    lines.push(Line::default());
                }
                ClodStepKind::Thinking => last_thinking = Some(i),
            }
        }
        // only the latest thinking indicator is shown
        if let Some(i) = last_thinking {
            let text = CLOD_SCRIPT[i].text.replace("{file}", &app.clod.plan_file);
            lines.push(Line::from(vec![
                Span::styled(format!("✻ {}…", text), think),
                Span::styled(" (thinking)", dim),
            ]));
        }
    }

    if app.clod.done {
        lines.push(Line::from(Span::styled(rule.clone(), dim)));
        lines.push(Line::from(vec![
            Span::styled("❯ ", green),
            Span::raw(app.clod.input.clone()),
            Span::styled("█", dim),
        ]));
        lines.push(Line::from(Span::styled(rule, dim)));
    }

    frame.render_widget(Paragraph::new(lines), area);
}
