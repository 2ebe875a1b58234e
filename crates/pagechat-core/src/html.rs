//! Lightweight HTML text extraction.
//!
//! This is not a full HTML parser. It approximates what a browser's
//! `innerText` would give for the content element of a page: invisible blocks
//! are dropped, block-level tags become line breaks, and character references
//! are decoded.

use regex::Regex;
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

// One pattern per tag; the regex crate has no backreferences to pair them.
static INVISIBLE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "noscript", "template", "svg"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("valid regex")
        })
        .collect()
});

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(p|div|section|article|main|header|footer|nav|aside|h[1-6]|li|td|th|ul|ol|dl|dt|dd|tr|table|thead|tbody|blockquote|pre|figure|figcaption|form|hr|address)\b[^>]*>",
    )
    .expect("valid regex")
});

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static NEWLINE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("valid regex"));

/// Remove comments and elements whose content is never rendered as text.
pub fn strip_invisible(html: &str) -> String {
    let mut cleaned = COMMENT.replace_all(html, "").into_owned();
    for pattern in INVISIBLE.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Inner HTML of the first `tag` element, matched to its own closing tag.
///
/// An element that is never closed runs to the end of the document.
pub fn find_element<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    let pattern = Regex::new(&format!(r"(?i)<(/?){tag}(?:[\s/][^>]*)?>")).ok()?;

    let mut depth = 0usize;
    let mut content_start = None;
    for caps in pattern.captures_iter(html) {
        let whole = caps.get(0)?;
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = whole.as_str().ends_with("/>");

        match (closing, content_start) {
            (false, None) => {
                if self_closing {
                    return Some("");
                }
                content_start = Some(whole.end());
                depth = 1;
            }
            (false, Some(_)) => {
                if !self_closing {
                    depth += 1;
                }
            }
            (true, Some(start)) => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[start..whole.start()]);
                }
            }
            // Stray closing tag before any opening tag.
            (true, None) => {}
        }
    }
    content_start.map(|start| &html[start..])
}

/// Content element in priority order: `article`, `main`, `body`, whole document.
pub fn main_content(html: &str) -> &str {
    find_element(html, "article")
        .or_else(|| find_element(html, "main"))
        .or_else(|| find_element(html, "body"))
        .unwrap_or(html)
}

/// Document title, whitespace-normalized; empty when the page has none.
pub fn title(html: &str) -> String {
    find_element(html, "title")
        .map(|raw| normalize_whitespace(&decode_entities(&ANY_TAG.replace_all(raw, ""))))
        .unwrap_or_default()
}

/// Rendered text of an HTML fragment, before whitespace normalization.
pub fn inner_text(fragment: &str) -> String {
    let text = LINE_BREAK.replace_all(fragment, "\n");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Collapse whitespace runs to one space, newline runs to one newline, and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let spaced = WHITESPACE_RUN.replace_all(text, " ");
    NEWLINE_RUN.replace_all(&spaced, "\n").trim().to_string()
}

/// Decode named and numeric character references; unknown names stay as written.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Full pipeline: drop invisible blocks, select the content element, render
/// it to text and normalize whitespace.
pub fn page_text(html: &str) -> String {
    let cleaned = strip_invisible(html);
    normalize_whitespace(&inner_text(main_content(&cleaned)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_wins_over_main() {
        let html = "<html><body><main><p>Main text</p><article><p>Article text</p></article></main></body></html>";
        assert_eq!(page_text(html), "Article text");
    }

    #[test]
    fn test_main_when_no_article() {
        let html = "<body><nav>Menu</nav><main id=\"content\">Main <b>bold</b> text</main></body>";
        assert_eq!(page_text(html), "Main bold text");
    }

    #[test]
    fn test_body_fallback() {
        let html = "<html><head><title>T</title></head><body><div>Hello</div><div>world</div></body></html>";
        assert_eq!(page_text(html), "Hello world");
    }

    #[test]
    fn test_whole_document_without_body() {
        assert_eq!(page_text("just <i>some</i> text"), "just some text");
    }

    #[test]
    fn test_tag_name_prefix_does_not_match() {
        let html = "<body><mainframe>no</mainframe><articles>x</articles><p>body</p></body>";
        assert_eq!(find_element(html, "main"), None);
        assert_eq!(find_element(html, "article"), None);
        assert_eq!(page_text(html), "nox body");
    }

    #[test]
    fn test_nested_same_tag() {
        let html = "<div><div>inner</div>outer</div>tail";
        assert_eq!(find_element(html, "div"), Some("<div>inner</div>outer"));
    }

    #[test]
    fn test_unclosed_element_runs_to_end() {
        assert_eq!(find_element("<article>open ended", "article"), Some("open ended"));
    }

    #[test]
    fn test_case_insensitive_tags() {
        assert_eq!(page_text("<BODY><ARTICLE class=x>Loud</ARTICLE></BODY>"), "Loud");
    }

    #[test]
    fn test_scripts_and_comments_are_dropped() {
        let html = r#"<body><script>var a = "<article>fake</article>";</script>
            <!-- <main>hidden</main> --><style>p { color: red }</style><p>Visible</p></body>"#;
        assert_eq!(page_text(html), "Visible");
    }

    #[test]
    fn test_entities_decoded_after_tags_removed() {
        assert_eq!(page_text("<p>a &lt;b&gt; &amp; c&nbsp;d &#65;&#x42;</p>"), "a <b> & c d AB");
        assert_eq!(decode_entities("a &notarealentity; b"), "a &notarealentity; b");
    }

    #[test]
    fn test_typographic_entities() {
        assert_eq!(
            page_text("<p>It&rsquo;s caf&eacute; &ldquo;x&rdquo; &middot; y</p>"),
            "It\u{2019}s caf\u{e9} \u{201c}x\u{201d} \u{b7} y"
        );
    }

    #[test]
    fn test_table_cells_are_separated() {
        assert_eq!(
            page_text("<table><tr><th>Name</th><th>Age</th></tr><tr><td>a</td><td>b</td></tr></table>"),
            "Name Age a b"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \t b\n\n\n c  "), "a b c");
        assert_eq!(normalize_whitespace("\n \n"), "");
    }

    #[test]
    fn test_title() {
        assert_eq!(title("<head><title>\n  My &amp; Page \n</title></head>"), "My & Page");
        assert_eq!(title("<p>untitled</p>"), "");
    }
}
