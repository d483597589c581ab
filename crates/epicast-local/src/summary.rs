//! Episode description → readable multi-line summary.
//!
//! Markup is mapped onto line structure instead of being rendered: the output keeps paragraph
//! breaks and list lines, and nothing else from the HTML.

use epicast_core::FeedItem;

/// Max lines kept by `short_summary`.
pub const SHORT_MAX_LINES: usize = 3;
/// Max chars kept by `short_summary` (ellipsis not counted).
pub const SHORT_MAX_CHARS: usize = 220;
const ELLIPSIS: char = '…';

/// First non-blank description candidate: `description`, then `*:summary`, then `*:encoded`.
pub fn pick_source(item: &FeedItem) -> Option<&str> {
    [
        item.description.as_deref(),
        item.summary_ext.as_deref(),
        item.encoded_ext.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.trim().is_empty())
}

/// Full summary for a feed item (empty when the item has no usable description).
pub fn extract(item: &FeedItem) -> String {
    pick_source(item).map(html_to_lines).unwrap_or_default()
}

enum TagBreak {
    Line,
    Paragraph,
    Space,
}

fn classify_tag(inner: &str) -> TagBreak {
    let t = inner.trim().to_ascii_lowercase();
    if let Some(close) = t.strip_prefix('/') {
        return match close.trim_end() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => TagBreak::Paragraph,
            "li" => TagBreak::Line,
            _ => TagBreak::Space,
        };
    }
    if t.trim_end_matches('/').trim_end() == "br" {
        return TagBreak::Line;
    }
    TagBreak::Space
}

fn map_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) if close > 0 => {
                match classify_tag(&after[..close]) {
                    TagBreak::Line => out.push('\n'),
                    TagBreak::Paragraph => out.push_str("\n\n"),
                    TagBreak::Space => out.push(' '),
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn collapse_blank_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut newlines = 0usize;
    for ch in s.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}

/// Collapse runs of 2+ spaces/tabs to one space; a lone tab is left alone.
fn collapse_inline_ws(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = String::new();
    for ch in line.chars() {
        if ch == ' ' || ch == '\t' {
            run.push(ch);
            continue;
        }
        flush_run(&mut out, &mut run);
        out.push(ch);
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.chars().count() >= 2 {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}

/// Decode entities and map markup onto lines.
pub fn html_to_lines(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let decoded = html_escape::decode_html_entities(raw);
    let text = map_tags(&decoded)
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let text = collapse_blank_runs(&text);
    let lines = text
        .split('\n')
        .map(|ln| collapse_inline_ws(ln.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    // Lines that were whitespace-only only become empty after trimming.
    collapse_blank_runs(lines.trim())
}

/// Index-tier summary: first `SHORT_MAX_LINES` lines, hard-cut at `SHORT_MAX_CHARS`.
pub fn short_summary(summary: &str) -> String {
    let head = summary
        .split('\n')
        .take(SHORT_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    if head.chars().count() <= SHORT_MAX_CHARS {
        return head;
    }
    let mut cut: String = head.chars().take(SHORT_MAX_CHARS).collect();
    let kept = cut.trim_end().len();
    cut.truncate(kept);
    cut.push(ELLIPSIS);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: Option<&str>, summary: Option<&str>, encoded: Option<&str>) -> FeedItem {
        FeedItem {
            description: description.map(str::to_string),
            summary_ext: summary.map(str::to_string),
            encoded_ext: encoded.map(str::to_string),
            ..FeedItem::default()
        }
    }

    #[test]
    fn paragraphs_and_list_items_become_lines() {
        let html = "<p>First &amp; foremost.</p><p>Second   para<br/>next line</p><ul><li>one</li><li>two</li></ul><h2>Head</h2>tail";
        assert_eq!(
            html_to_lines(html),
            "First & foremost.\n\nSecond para\nnext line\n\none\ntwo\nHead\n\ntail"
        );
    }

    #[test]
    fn other_tags_become_single_spaces() {
        assert_eq!(
            html_to_lines("<b>bold</b>and<a href=\"x\">link</a>"),
            "bold and link"
        );
        assert_eq!(html_to_lines("<BR>x<Br />y"), "x\ny");
    }

    #[test]
    fn stray_angle_brackets_are_kept() {
        assert_eq!(html_to_lines("a <> b < c"), "a <> b < c");
    }

    #[test]
    fn blank_line_runs_collapse_to_one_blank_line() {
        assert_eq!(html_to_lines("a</p></p></p>b"), "a\n\nb");
        assert_eq!(html_to_lines("a</p> </p>b"), "a\n\nb");
        assert_eq!(html_to_lines("a\r\n\r\n\r\nb"), "a\n\nb");
    }

    #[test]
    fn single_tab_is_not_collapsed_but_runs_are() {
        assert_eq!(html_to_lines("a\tb  \t c"), "a\tb c");
    }

    #[test]
    fn re_extracting_a_summary_is_a_no_op() {
        let inputs = [
            "<p>One</p>\n\n\n<p>  Two  </p><li>x</li>",
            "plain\n\n\n\ntext with   gaps",
            "<div>a</div>   <span>b</span>&nbsp;c",
        ];
        for raw in inputs {
            let once = html_to_lines(raw);
            assert_eq!(html_to_lines(&once), once, "raw={raw:?}");
        }
    }

    #[test]
    fn description_wins_then_summary_then_encoded() {
        assert_eq!(extract(&item(Some("<p>d</p>"), Some("s"), Some("e"))), "d");
        assert_eq!(extract(&item(Some("   "), Some("s"), Some("e"))), "s");
        assert_eq!(extract(&item(None, Some(""), Some("<p>e</p>"))), "e");
        assert_eq!(extract(&item(None, None, None)), "");
    }

    #[test]
    fn short_summary_keeps_three_lines() {
        let s = "l1\nl2\nl3\nl4";
        assert_eq!(short_summary(s), "l1\nl2\nl3");
        assert_eq!(short_summary("only"), "only");
    }

    #[test]
    fn short_summary_cuts_trailing_line_with_ellipsis() {
        let long = "あ".repeat(300);
        let s = format!("intro\n{long}");
        let out = short_summary(&s);
        assert!(out.starts_with("intro\n"));
        assert!(out.ends_with('…'));
        assert_eq!(out.chars().count(), SHORT_MAX_CHARS + 1);
    }

    #[test]
    fn short_summary_exactly_at_limit_is_not_cut() {
        let s = "x".repeat(SHORT_MAX_CHARS);
        assert_eq!(short_summary(&s), s);
    }
}
