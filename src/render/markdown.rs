use std::sync::LazyLock;

use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use ratatui::style::{Color, Modifier, Style};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use unicode_width::UnicodeWidthStr;

/// Render style, picked once from the terminal background at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MdStyle {
    Dark,
    Light,
}

impl MdStyle {
    /// Best-effort terminal background detection via COLORFGBG
    /// ("fg;bg" — bg 0-6 or 8 means dark). Defaults to dark.
    pub fn detect() -> MdStyle {
        if let Ok(val) = std::env::var("COLORFGBG")
            && let Some(bg) = val.rsplit(';').next()
            && let Ok(n) = bg.parse::<u8>()
            && n >= 7
            && n != 8
        {
            return MdStyle::Light;
        }
        MdStyle::Dark
    }
}

/// One output line: styled spans for display plus the style-free text the
/// ToC mapper searches.
#[derive(Debug, Clone, Default)]
pub struct RenderedLine {
    pub spans: Vec<(String, Style)>,
    pub plain: String,
}

impl RenderedLine {
    fn push(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.plain.push_str(text);
        if let Some((last, last_style)) = self.spans.last_mut()
            && *last_style == style
        {
            last.push_str(text);
        } else {
            self.spans.push((text.to_string(), style));
        }
    }

    fn width(&self) -> usize {
        self.plain.width()
    }
}

/// A fully rendered document, cached per plan path.
#[derive(Debug, Clone, Default)]
pub struct RenderedDoc {
    pub lines: Vec<RenderedLine>,
}

impl RenderedDoc {
    /// Unstyled fallback: the raw text, one line per source line.
    /// Used when rendering is impossible, so a preview always exists.
    pub fn plain(text: &str) -> RenderedDoc {
        let lines = text
            .split('\n')
            .map(|l| RenderedLine {
                spans: vec![(l.to_string(), Style::default())],
                plain: l.to_string(),
            })
            .collect();
        RenderedDoc { lines }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

fn syntect_theme(style: MdStyle) -> &'static Theme {
    let name = match style {
        MdStyle::Dark => "base16-ocean.dark",
        MdStyle::Light => "InspiredGitHub",
    };
    &THEME_SET.themes[name]
}

/// Display colors for non-code markdown elements.
struct Palette {
    heading: Style,
    code: Style,
    blockquote_bar: Style,
    blockquote: Style,
    link: Style,
    rule: Style,
    bullet: Style,
    table_header: Style,
}

fn palette(style: MdStyle) -> Palette {
    match style {
        MdStyle::Dark => Palette {
            heading: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Rgb(0xD0, 0x87, 0x70)).bg(Color::Rgb(0x2B, 0x30, 0x3B)),
            blockquote_bar: Style::default().fg(Color::DarkGray),
            blockquote: Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            link: Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
            rule: Style::default().fg(Color::DarkGray),
            bullet: Style::default().fg(Color::Magenta),
            table_header: Style::default().add_modifier(Modifier::BOLD),
        },
        MdStyle::Light => Palette {
            heading: Style::default()
                .fg(Color::Rgb(0x8F, 0x3F, 0x71))
                .add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Rgb(0xA6, 0x26, 0x26)).bg(Color::Rgb(0xEE, 0xEE, 0xEE)),
            blockquote_bar: Style::default().fg(Color::Gray),
            blockquote: Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            link: Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            rule: Style::default().fg(Color::Gray),
            bullet: Style::default().fg(Color::Rgb(0x8F, 0x3F, 0x71)),
            table_header: Style::default().add_modifier(Modifier::BOLD),
        },
    }
}

#[derive(Default)]
struct InlineState {
    emphasis: usize,
    strong: usize,
    strikethrough: usize,
    link_depth: usize,
}

impl InlineState {
    fn style(&self, base: Style) -> Style {
        let mut style = base;
        if self.emphasis > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strong > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.strikethrough > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }
}

struct ListLevel {
    ordered: bool,
    next_index: u64,
}

#[derive(Default)]
struct TableState {
    in_head: bool,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
    alignments: Vec<Alignment>,
}

/// Markdown renderer parameterized by style and wrap width. Instances are
/// pooled and reused; rendering is stateless between calls.
pub struct MarkdownRenderer {
    pub style: MdStyle,
    pub width: usize,
    palette: Palette,
    theme: &'static Theme,
}

impl MarkdownRenderer {
    pub fn new(style: MdStyle, width: usize) -> MarkdownRenderer {
        MarkdownRenderer {
            style,
            width: width.max(20),
            palette: palette(style),
            theme: syntect_theme(style),
        }
    }

    pub fn render(&self, markdown: &str) -> RenderedDoc {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        let parser = Parser::new_ext(markdown, options);

        let mut state = RenderState::new(self);
        for event in parser {
            state.handle(event);
        }
        state.finish()
    }
}

struct RenderState<'a> {
    r: &'a MarkdownRenderer,
    lines: Vec<RenderedLine>,
    current: RenderedLine,
    inline: InlineState,
    heading_level: Option<u8>,
    blockquote_depth: usize,
    list_stack: Vec<ListLevel>,
    code_lang: Option<String>,
    code_buf: String,
    table: Option<TableState>,
    pending_blank: bool,
}

impl<'a> RenderState<'a> {
    fn new(r: &'a MarkdownRenderer) -> Self {
        RenderState {
            r,
            lines: Vec::new(),
            current: RenderedLine::default(),
            inline: InlineState::default(),
            heading_level: None,
            blockquote_depth: 0,
            list_stack: Vec::new(),
            code_lang: None,
            code_buf: String::new(),
            table: None,
            pending_blank: false,
        }
    }

    fn finish(mut self) -> RenderedDoc {
        self.flush_line();
        if self.lines.is_empty() {
            self.lines.push(RenderedLine::default());
        }
        RenderedDoc { lines: self.lines }
    }

    /// Prefix applied at the start of every physical line in the current
    /// block context (blockquote bars, list hang indent).
    fn line_prefix(&self) -> Vec<(String, Style)> {
        let mut prefix = vec![("  ".to_string(), Style::default())];
        for _ in 0..self.blockquote_depth {
            prefix.push(("│ ".to_string(), self.r.palette.blockquote_bar));
        }
        if !self.list_stack.is_empty() && self.heading_level.is_none() {
            let hang = "  ".repeat(self.list_stack.len());
            prefix.push((hang, Style::default()));
        }
        prefix
    }

    fn prefix_width(&self) -> usize {
        self.line_prefix().iter().map(|(t, _)| t.width()).sum()
    }

    fn start_line(&mut self) {
        if !self.current.spans.is_empty() {
            return;
        }
        for (text, style) in self.line_prefix() {
            self.current.push(&text, style);
        }
    }

    fn flush_line(&mut self) {
        if self.current.spans.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.current);
        self.lines.push(line);
    }

    fn blank_line(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|l| !l.plain.trim().is_empty()) {
            self.lines.push(RenderedLine::default());
        }
    }

    fn take_pending_blank(&mut self) {
        if self.pending_blank {
            self.pending_blank = false;
            self.blank_line();
        }
    }

    /// Append text with word wrapping at the renderer width.
    fn push_text(&mut self, text: &str, style: Style) {
        if let Some(t) = &mut self.table {
            t.current_cell.push_str(text);
            return;
        }
        for (i, word) in text.split(' ').enumerate() {
            if i > 0 {
                self.push_raw(" ", style);
            }
            if word.is_empty() {
                continue;
            }
            if self.current.width() + word.width() > self.r.width
                && self.current.width() > self.prefix_width()
            {
                self.flush_line();
            }
            self.start_line();
            self.current.push(word, style);
        }
    }

    /// Append text without word splitting (code spans keep their padding).
    fn push_raw(&mut self, text: &str, style: Style) {
        if let Some(t) = &mut self.table {
            t.current_cell.push_str(text);
            return;
        }
        if self.current.width() + text.width() > self.r.width
            && self.current.width() > self.prefix_width()
        {
            self.flush_line();
        }
        self.start_line();
        self.current.push(text, style);
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if self.code_lang.is_some() {
                    self.code_buf.push_str(&text);
                } else {
                    let style = self.text_style();
                    self.push_text(&text, style);
                }
            }
            Event::Code(code) => {
                let style = self.inline.style(self.r.palette.code);
                self.push_raw(&format!(" {} ", code), style);
            }
            Event::SoftBreak => {
                let style = self.text_style();
                self.push_raw(" ", style);
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.take_pending_blank();
                self.start_line();
                let w = self.r.width.saturating_sub(self.prefix_width()).max(1);
                self.current.push(&"─".repeat(w), self.r.palette.rule);
                self.flush_line();
                self.pending_blank = true;
            }
            Event::TaskListMarker(done) => {
                let mark = if done { "[✓] " } else { "[ ] " };
                self.push_raw(mark, self.r.palette.bullet);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.r.palette.blockquote;
                self.push_text(html.trim_end_matches('\n'), style);
            }
            _ => {}
        }
    }

    fn text_style(&self) -> Style {
        let mut base = Style::default();
        if self.heading_level.is_some() {
            base = self.r.palette.heading;
        } else if self.blockquote_depth > 0 {
            base = self.r.palette.blockquote;
        }
        if self.inline.link_depth > 0 {
            base = self.r.palette.link;
        }
        self.inline.style(base)
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.take_pending_blank(),
            Tag::Heading { level, .. } => {
                self.take_pending_blank();
                let level = heading_level_u8(level);
                self.heading_level = Some(level);
                self.start_line();
                let marks = "#".repeat(level as usize);
                self.current.push(&marks, self.r.palette.heading);
                self.current.push(" ", self.r.palette.heading);
            }
            Tag::BlockQuote(_) => {
                self.take_pending_blank();
                self.blockquote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.take_pending_blank();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_lang = Some(lang);
                self.code_buf.clear();
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.take_pending_blank();
                } else {
                    self.flush_line();
                }
                self.list_stack.push(ListLevel {
                    ordered: start.is_some(),
                    next_index: start.unwrap_or(1),
                });
            }
            Tag::Item => {
                self.flush_line();
                self.start_line();
                // the item marker replaces the last level of hang indent
                let marker = match self.list_stack.last_mut() {
                    Some(level) if level.ordered => {
                        let m = format!("{}. ", level.next_index);
                        level.next_index += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                if let Some((last, _)) = self.current.spans.last_mut()
                    && last.ends_with("  ")
                {
                    last.truncate(last.len() - 2);
                    let plain_len = self.current.plain.len();
                    self.current.plain.truncate(plain_len - 2);
                }
                self.current.push(&marker, self.r.palette.bullet);
            }
            Tag::Emphasis => self.inline.emphasis += 1,
            Tag::Strong => self.inline.strong += 1,
            Tag::Strikethrough => self.inline.strikethrough += 1,
            Tag::Link { .. } => self.inline.link_depth += 1,
            Tag::Image { .. } => self.inline.link_depth += 1,
            Tag::Table(alignments) => {
                self.take_pending_blank();
                self.table = Some(TableState {
                    alignments,
                    ..TableState::default()
                });
            }
            Tag::TableHead => {
                if let Some(t) = &mut self.table {
                    t.in_head = true;
                }
            }
            Tag::TableRow => {
                if let Some(t) = &mut self.table {
                    t.current_row = Vec::new();
                }
            }
            Tag::TableCell => {
                if let Some(t) = &mut self.table {
                    t.current_cell = String::new();
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                self.pending_blank = true;
            }
            TagEnd::Heading(_) => {
                self.flush_line();
                self.heading_level = None;
                self.pending_blank = true;
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
                self.pending_blank = true;
            }
            TagEnd::CodeBlock => {
                let lang = self.code_lang.take().unwrap_or_default();
                let code = std::mem::take(&mut self.code_buf);
                self.render_code_block(&lang, &code);
                self.pending_blank = true;
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.pending_blank = true;
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis => self.inline.emphasis = self.inline.emphasis.saturating_sub(1),
            TagEnd::Strong => self.inline.strong = self.inline.strong.saturating_sub(1),
            TagEnd::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_sub(1)
            }
            TagEnd::Link | TagEnd::Image => {
                self.inline.link_depth = self.inline.link_depth.saturating_sub(1)
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.render_table(table);
                }
                self.pending_blank = true;
            }
            TagEnd::TableHead => {
                if let Some(t) = &mut self.table {
                    t.in_head = false;
                    t.headers = std::mem::take(&mut t.current_row);
                }
            }
            TagEnd::TableRow => {
                if let Some(t) = &mut self.table {
                    let row = std::mem::take(&mut t.current_row);
                    if !t.in_head {
                        t.rows.push(row);
                    }
                }
            }
            TagEnd::TableCell => {
                if let Some(t) = &mut self.table {
                    let cell = std::mem::take(&mut t.current_cell);
                    t.current_row.push(cell.trim().to_string());
                }
            }
            _ => {}
        }
    }

    fn render_code_block(&mut self, lang: &str, code: &str) {
        self.flush_line();
        let syntax = SYNTAX_SET
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, self.r.theme);
        for line in LinesWithEndings::from(code) {
            let mut out = RenderedLine::default();
            out.push("    ", Style::default());
            match highlighter.highlight_line(line, &SYNTAX_SET) {
                Ok(regions) => {
                    for (style, text) in regions {
                        let text = text.trim_end_matches('\n');
                        if text.is_empty() {
                            continue;
                        }
                        out.push(text, convert_syntect_style(style));
                    }
                }
                Err(_) => {
                    out.push(line.trim_end_matches('\n'), Style::default());
                }
            }
            self.lines.push(out);
        }
    }

    fn render_table(&mut self, table: TableState) {
        self.flush_line();
        let cols = table
            .headers
            .len()
            .max(table.rows.iter().map(Vec::len).max().unwrap_or(0));
        if cols == 0 {
            return;
        }
        let mut widths = vec![0usize; cols];
        for (i, h) in table.headers.iter().enumerate() {
            widths[i] = widths[i].max(h.width());
        }
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let render_row = |cells: &[String], style: Style| {
            let mut line = RenderedLine::default();
            line.push("  ", Style::default());
            for i in 0..cols {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let pad = widths[i].saturating_sub(cell.width());
                line.push(cell, style);
                line.push(&" ".repeat(pad), Style::default());
                if i + 1 < cols {
                    line.push("  ", Style::default());
                }
            }
            line
        };

        if !table.headers.is_empty() {
            self.lines
                .push(render_row(&table.headers, self.r.palette.table_header));
            let mut sep = RenderedLine::default();
            sep.push("  ", Style::default());
            let total: usize = widths.iter().sum::<usize>() + 2 * (cols - 1);
            sep.push(&"─".repeat(total), self.r.palette.rule);
            self.lines.push(sep);
        }
        for row in &table.rows {
            self.lines.push(render_row(row, Style::default()));
        }
        let _ = table.alignments;
    }
}

fn heading_level_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn convert_syntect_style(style: syntect::highlighting::Style) -> Style {
    let fg = style.foreground;
    let mut out = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> RenderedDoc {
        MarkdownRenderer::new(MdStyle::Dark, 60).render(md)
    }

    fn plain(doc: &RenderedDoc) -> Vec<String> {
        doc.lines.iter().map(|l| l.plain.clone()).collect()
    }

    #[test]
    fn test_heading_keeps_marks() {
        let doc = render("## Section One\n");
        let lines = plain(&doc);
        assert!(lines.iter().any(|l| l.contains("## Section One")), "{:?}", lines);
    }

    #[test]
    fn test_code_span_padded() {
        let doc = render("Map keys: `file` now\n");
        let joined = plain(&doc).join("\n");
        assert!(joined.contains(" file "), "{:?}", joined);
    }

    #[test]
    fn test_paragraph_wraps_at_width() {
        let doc = MarkdownRenderer::new(MdStyle::Dark, 24)
            .render("one two three four five six seven eight nine ten\n");
        assert!(doc.lines.len() > 1);
        for line in &doc.lines {
            assert!(line.plain.width() <= 24, "line too wide: {:?}", line.plain);
        }
    }

    #[test]
    fn test_fenced_code_block_lines_kept_verbatim() {
        let doc = render("```rust\nfn main() {}\n```\n");
        let joined = plain(&doc).join("\n");
        assert!(joined.contains("fn main() {}"));
    }

    #[test]
    fn test_headings_not_rendered_inside_fences() {
        let doc = render("```\n# not a heading\n```\n");
        let joined = plain(&doc).join("\n");
        // the fence content is indented code, not a styled heading line
        assert!(joined.contains("# not a heading"));
        assert!(!joined.contains("## "));
    }

    #[test]
    fn test_blockquote_prefixed() {
        let doc = render("> quoted text\n");
        let joined = plain(&doc).join("\n");
        assert!(joined.contains("│ quoted text"), "{:?}", joined);
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        let doc = render("- alpha\n- beta\n\n1. one\n2. two\n");
        let joined = plain(&doc).join("\n");
        assert!(joined.contains("• alpha"));
        assert!(joined.contains("1. one"));
        assert!(joined.contains("2. two"));
    }

    #[test]
    fn test_table_renders_rows() {
        let doc = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let joined = plain(&doc).join("\n");
        assert!(joined.contains('a'));
        assert!(joined.contains('1'));
    }

    #[test]
    fn test_plain_fallback() {
        let doc = RenderedDoc::plain("line one\nline two");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.lines[1].plain, "line two");
    }

    #[test]
    fn test_headings_appear_in_order_for_toc() {
        let doc = render("# First\n\ntext\n\n## Second\n\nmore\n\n## Third\n");
        let lines = plain(&doc);
        let first = lines.iter().position(|l| l.contains("First")).unwrap();
        let second = lines.iter().position(|l| l.contains("Second")).unwrap();
        let third = lines.iter().position(|l| l.contains("Third")).unwrap();
        assert!(first < second && second < third);
    }
}
