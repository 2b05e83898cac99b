pub mod markdown;

pub use markdown::{MarkdownRenderer, MdStyle, RenderedDoc, RenderedLine};

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

/// Renderer reuse pools keyed by (style, width). Rendering allocates a
/// fair amount of per-instance state, so concurrent render tasks borrow
/// an instance, use it once, and return it rather than constructing fresh.
static POOLS: LazyLock<Mutex<HashMap<(MdStyle, usize), Vec<MarkdownRenderer>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn get_renderer(style: MdStyle, width: usize) -> MarkdownRenderer {
    if let Ok(mut pools) = POOLS.lock()
        && let Some(pool) = pools.get_mut(&(style, width))
        && let Some(r) = pool.pop()
    {
        return r;
    }
    MarkdownRenderer::new(style, width)
}

fn put_renderer(renderer: MarkdownRenderer) {
    if let Ok(mut pools) = POOLS.lock() {
        pools
            .entry((renderer.style, renderer.width))
            .or_default()
            .push(renderer);
    }
}

/// Render markdown at the given preview width using a pooled renderer.
/// The inner wrap width leaves room for pane padding; implausibly small
/// widths fall back to 80 columns. Never fails: unrenderable input comes
/// back as unstyled raw text.
pub fn render_markdown(markdown: &str, style: MdStyle, width: usize) -> RenderedDoc {
    let mut pw = width.saturating_sub(4);
    if pw < 20 {
        pw = 80;
    }
    let renderer = get_renderer(style, pw);
    let doc = renderer.render(markdown);
    put_renderer(renderer);
    if doc.lines.is_empty() {
        return RenderedDoc::plain(markdown);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicode_width::UnicodeWidthStr;

    #[test]
    fn test_pool_reuses_instances() {
        // drain any instances left by other tests for a clean count
        POOLS.lock().unwrap().remove(&(MdStyle::Dark, 37));
        let r = get_renderer(MdStyle::Dark, 37);
        put_renderer(r);
        assert_eq!(POOLS.lock().unwrap()[&(MdStyle::Dark, 37)].len(), 1);
        let _r = get_renderer(MdStyle::Dark, 37);
        assert!(POOLS.lock().unwrap()[&(MdStyle::Dark, 37)].is_empty());
    }

    #[test]
    fn test_render_markdown_width_floor() {
        // width below the floor falls back to 80-column wrapping
        let doc = render_markdown("# Title\n\nsome text\n", MdStyle::Dark, 10);
        assert!(doc.line_count() > 0);
        let heading = doc
            .lines
            .iter()
            .find(|l| l.plain.contains("Title"))
            .expect("heading rendered");
        assert!(heading.plain.width() <= 84);
    }

    #[test]
    fn test_render_markdown_keys_pool_by_width() {
        let _ = render_markdown("text", MdStyle::Dark, 60);
        let _ = render_markdown("text", MdStyle::Dark, 90);
        let pools = POOLS.lock().unwrap();
        assert!(pools.contains_key(&(MdStyle::Dark, 56)));
        assert!(pools.contains_key(&(MdStyle::Dark, 86)));
    }
}
