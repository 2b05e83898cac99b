use std::sync::LazyLock;

use regex::Regex;

use crate::render::RenderedDoc;

/// Inline comments are blockquote lines of this shape, conventionally
/// placed directly after a heading.
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s*\*\*\[comment\]:\*\*\s*(.+)$").expect("comment regex"));

/// One row of the comment-mode table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// 1-6 for headings, 0 for comments
    pub level: u8,
    /// Heading text (without `#`) or the comment text
    pub text: String,
    /// Line number in the raw body (after frontmatter strip)
    pub raw_line: usize,
    /// Line number in the rendered output, 0 when unmatched
    pub render_line: usize,
    pub is_comment: bool,
}

/// True if the body contains any comment blockquote outside code fences.
pub fn body_has_comments(body: &str) -> bool {
    let mut in_fence = false;
    for line in body.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if COMMENT_RE.is_match(trimmed) {
            return true;
        }
    }
    false
}

/// Build a table of contents from headings and comment blockquotes in
/// source order. Lines inside fenced code blocks are skipped.
pub fn extract_toc(raw_body: &str) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    let mut in_fence = false;

    for (i, line) in raw_body.split('\n').enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(caps) = COMMENT_RE.captures(trimmed) {
            toc.push(TocEntry {
                level: 0,
                text: caps[1].to_string(),
                raw_line: i,
                render_line: 0,
                is_comment: true,
            });
            continue;
        }

        if trimmed.starts_with('#') {
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            if (1..=6).contains(&level) && trimmed[level..].starts_with(' ') {
                toc.push(TocEntry {
                    level: level as u8,
                    text: trimmed[level + 1..].trim().to_string(),
                    raw_line: i,
                    render_line: 0,
                    is_comment: false,
                });
            }
        }
    }

    toc
}

/// Derive match tokens from a heading: strip backticks, split on
/// whitespace, and right-trim punctuation that the renderer may detach
/// from code spans (e.g. "`foo`,").
pub fn heading_words(s: &str) -> Vec<String> {
    s.replace('`', "")
        .split_whitespace()
        .filter_map(|f| {
            let trimmed = f.trim_end_matches([',', '.', ';', ':', '!', '?', ')']);
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// True if all words appear in `s` in order.
pub fn contains_words_in_order(s: &str, words: &[String]) -> bool {
    let mut pos = 0;
    for w in words {
        match s[pos..].find(w.as_str()) {
            Some(idx) => pos += idx + w.len(),
            None => return false,
        }
    }
    true
}

/// Map each ToC entry to its line in the rendered output.
///
/// The renderer re-pads code spans and detaches trailing punctuation, so
/// exact substring search fails; word-order matching over the style-free
/// line text is robust to that. Entries appear in source order, so the
/// search cursor only moves forward, which keeps mapped lines monotone.
/// Unmatched entries keep `render_line == 0`.
pub fn compute_render_lines(toc: &mut [TocEntry], doc: &RenderedDoc) {
    if toc.is_empty() {
        return;
    }
    let mut search_from = 0;
    for entry in toc.iter_mut() {
        let text = entry.text.trim();
        if text.is_empty() {
            continue;
        }
        let words = heading_words(text);
        if words.is_empty() {
            continue;
        }
        for j in search_from..doc.lines.len() {
            if contains_words_in_order(&doc.lines[j].plain, &words) {
                entry.render_line = j;
                search_from = j + 1;
                break;
            }
        }
    }
}

/// Format a comment line for insertion.
fn comment_line(text: &str) -> String {
    format!("> **[comment]:** {}", text)
}

/// Insert a comment blockquote after the given heading line, framed by
/// blank lines. A blank line already following the heading is consumed so
/// spacing stays single.
pub fn inject_comment(raw_body: &str, heading_line: usize, text: &str) -> String {
    let lines: Vec<&str> = raw_body.split('\n').collect();
    if heading_line >= lines.len() {
        return raw_body.to_string();
    }

    let mut result: Vec<String> = lines[..=heading_line].iter().map(|s| s.to_string()).collect();
    result.push(String::new());
    result.push(comment_line(text));
    result.push(String::new());

    let mut rest = &lines[heading_line + 1..];
    if let Some(first) = rest.first()
        && first.trim().is_empty()
    {
        rest = &rest[1..];
    }
    result.extend(rest.iter().map(|s| s.to_string()));

    result.join("\n")
}

/// Delete a comment line along with one adjacent blank line on each side.
pub fn remove_comment(raw_body: &str, comment_line: usize) -> String {
    let lines: Vec<&str> = raw_body.split('\n').collect();
    if comment_line >= lines.len() {
        return raw_body.to_string();
    }

    let mut result: Vec<&str> = lines[..comment_line].to_vec();

    let mut rest = &lines[comment_line + 1..];
    if let Some(first) = rest.first()
        && first.trim().is_empty()
    {
        rest = &rest[1..];
    }
    if let Some(last) = result.last()
        && last.trim().is_empty()
    {
        result.pop();
    }

    result.extend_from_slice(rest);
    result.join("\n")
}

/// Overwrite the text of an existing comment line in place.
pub fn replace_comment(raw_body: &str, line: usize, new_text: &str) -> String {
    let mut lines: Vec<String> = raw_body.split('\n').map(|s| s.to_string()).collect();
    if line >= lines.len() {
        return raw_body.to_string();
    }
    lines[line] = comment_line(new_text);
    lines.join("\n")
}
