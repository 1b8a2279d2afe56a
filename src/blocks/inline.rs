/// Inline pieces of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Link { text: String, url: String },
}

enum Scan {
    Text,
    Code,
    LinkText,
    LinkUrl,
}

fn flush_text(nodes: &mut Vec<Inline>, text: &mut String) {
    if !text.is_empty() {
        nodes.push(Inline::Text(std::mem::take(text)));
    }
}

/// Splits paragraph text into plain text, `code` spans and `[text](url)` links.
///
/// Single pass, no escapes. Broken markup never fails: an unterminated code span
/// runs to the end of the input, and a link missing `]`, `(` or `)` keeps eating
/// characters into its text or url.
pub fn parse_inline(input: &str) -> Vec<Inline> {
    let mut nodes = vec![];
    let mut state = Scan::Text;
    let mut text = String::new();
    let mut url = String::new();
    let mut url_opened = false;

    for ch in input.chars() {
        match state {
            Scan::Text => match ch {
                '`' => {
                    flush_text(&mut nodes, &mut text);
                    state = Scan::Code;
                }
                '[' => {
                    flush_text(&mut nodes, &mut text);
                    state = Scan::LinkText;
                }
                _ => text.push(ch),
            },
            Scan::Code => match ch {
                '`' => {
                    nodes.push(Inline::Code(std::mem::take(&mut text)));
                    state = Scan::Text;
                }
                _ => text.push(ch),
            },
            Scan::LinkText => match ch {
                ']' => state = Scan::LinkUrl,
                _ => text.push(ch),
            },
            Scan::LinkUrl => match ch {
                '(' if !url_opened && url.is_empty() => url_opened = true,
                ')' => {
                    nodes.push(Inline::Link {
                        text: std::mem::take(&mut text),
                        url: std::mem::take(&mut url),
                    });
                    url_opened = false;
                    state = Scan::Text;
                }
                _ => url.push(ch),
            },
        }
    }

    match state {
        Scan::Text => flush_text(&mut nodes, &mut text),
        Scan::Code => nodes.push(Inline::Code(text)),
        // Never closed: give the bracket back as plain text
        Scan::LinkText => nodes.push(Inline::Text(format!("[{}", text))),
        Scan::LinkUrl => nodes.push(Inline::Link { text, url }),
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn code(s: &str) -> Inline {
        Inline::Code(s.to_string())
    }

    fn link(t: &str, u: &str) -> Inline {
        Inline::Link { text: t.to_string(), url: u.to_string() }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse_inline("just words"), vec![text("just words")]);
        assert_eq!(parse_inline(""), vec![]);
    }

    #[test]
    fn test_code_span() {
        assert_eq!(parse_inline("`code`"), vec![code("code")]);
        assert_eq!(parse_inline("run `cargo test` now"), vec![text("run "), code("cargo test"), text(" now")]);
    }

    #[test]
    fn test_link() {
        assert_eq!(parse_inline("[t](u)"), vec![link("t", "u")]);
        assert_eq!(
            parse_inline("see [the docs](https://docs.rs) and `x`"),
            vec![text("see "), link("the docs", "https://docs.rs"), text(" and "), code("x")]
        );
    }

    #[test]
    fn test_unterminated_code_runs_to_end() {
        assert_eq!(parse_inline("a `b c"), vec![text("a "), code("b c")]);
        assert_eq!(parse_inline("`"), vec![code("")]);
    }

    #[test]
    fn test_malformed_links_degrade() {
        assert_eq!(parse_inline("[never closed"), vec![text("[never closed")]);
        assert_eq!(parse_inline("[t] rest"), vec![link("t", " rest")]);
        assert_eq!(parse_inline("[t](u"), vec![link("t", "u")]);
        assert_eq!(parse_inline("[t]x(y)"), vec![link("t", "x(y")]);
    }

    #[test]
    fn test_no_escapes() {
        assert_eq!(parse_inline("\\`x`"), vec![text("\\"), code("x")]);
    }

    #[test]
    fn test_multibyte() {
        assert_eq!(parse_inline("café `naïve` 🚀"), vec![text("café "), code("naïve"), text(" 🚀")]);
    }
}
