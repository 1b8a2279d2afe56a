use lazy_static::lazy_static;
use regex::Regex;
use spdlog::debug;

use crate::blocks::inline::{parse_inline, Inline};
use crate::blocks::{BlockId, BlockKind, Code, ContentBlock, Heading, HeadingLevel, List, Media, Note, DEFAULT_CODE_LANGUAGE};
use crate::text_utils::html_escape;

lazy_static! {
    static ref OPENING_FENCE: Regex = Regex::new(r"\A```[^\r\n`]*\r?\n").unwrap();
    static ref CLOSING_FENCE: Regex = Regex::new(r"(?:\A|\r?\n)```[ \t]*(?:\r?\n)?\z").unwrap();
}

/// Renders a block sequence to HTML, in sequence order.
pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    let mut html = String::new();
    for block in blocks {
        html.push_str(&render_block(block));
    }
    html
}

pub fn render_block(block: &ContentBlock) -> String {
    match &block.kind {
        BlockKind::Heading(heading) => render_heading(&block.id, heading),
        BlockKind::Paragraph(paragraph) => format!("<p>{}</p>\n", render_inline(&paragraph.text)),
        BlockKind::Code(code) => render_code(code),
        BlockKind::Image(media) => render_image(media),
        BlockKind::Video(media) => render_video(media),
        BlockKind::Note(note) => render_note(note),
        BlockKind::List(list) => render_list(list),
        BlockKind::Separator => "<hr>\n".to_string(),
        BlockKind::Unknown(unknown) => {
            debug!("Skipping block {} with unknown type {}", block.id, unknown.type_name);
            String::new()
        }
    }
}

/// Paragraph text with its inline code spans and links turned into HTML.
pub fn render_inline(text: &str) -> String {
    let mut html = String::new();
    for node in parse_inline(text) {
        match node {
            Inline::Text(text) => html.push_str(&html_escape(&text)),
            Inline::Code(code) => {
                html.push_str("<code>");
                html.push_str(&html_escape(&code));
                html.push_str("</code>");
            }
            Inline::Link { text, url } => {
                if is_safe_url(&url) {
                    html.push_str(&format!(
                        "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                        html_escape(url.trim()),
                        html_escape(&text)
                    ));
                } else {
                    html.push_str(&html_escape(&text));
                }
            }
        }
    }
    html
}

// Browsers drop tab/CR/LF anywhere and C0 controls or spaces at the ends
// before reading the scheme.
fn is_safe_url(url: &str) -> bool {
    let url: String = url.chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect::<String>()
        .trim_matches(|c: char| c <= ' ' || c.is_whitespace())
        .to_ascii_lowercase();
    !(url.starts_with("javascript:") || url.starts_with("data:") || url.starts_with("vbscript:"))
}

/// Drops one leading ```` ```lang ```` line and one trailing ```` ``` ```` line,
/// leaving whatever is between them untouched.
pub fn strip_code_fence(code: &str) -> &str {
    let start = OPENING_FENCE.find(code).map(|m| m.end()).unwrap_or(0);
    let body = &code[start..];
    let end = CLOSING_FENCE.find(body).map(|m| m.start()).unwrap_or(body.len());
    &body[..end]
}

fn render_heading(id: &BlockId, heading: &Heading) -> String {
    let anchor = html_escape(&id.0);
    let text = html_escape(&heading.text);
    match heading.level {
        HeadingLevel::H2 if heading.underline => format!("<h2 id=\"b-{}\" class=\"underline\">{}</h2>\n", anchor, text),
        HeadingLevel::H2 => format!("<h2 id=\"b-{}\">{}</h2>\n", anchor, text),
        HeadingLevel::H3 => format!("<h3 id=\"b-{}\">{}</h3>\n", anchor, text),
    }
}

fn render_code(code: &Code) -> String {
    let source = strip_code_fence(&code.code);
    let language = match code.language.trim() {
        "" => DEFAULT_CODE_LANGUAGE,
        lang => lang,
    };

    let mut html = String::from("<figure class=\"code-block\">");
    if let Some(title) = code.title.as_deref().filter(|t| !t.trim().is_empty()) {
        html.push_str(&format!("<figcaption>{}</figcaption>", html_escape(title)));
    }

    let body = if code.show_line_numbers {
        source.lines()
            .enumerate()
            .map(|(i, line)| format!("<span class=\"line\" data-line=\"{}\">{}</span>", i + 1, html_escape(line)))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        html_escape(source)
    };

    let pre_class = if code.show_line_numbers { " class=\"line-numbers\"" } else { "" };
    html.push_str(&format!(
        "<pre{}><code class=\"language-{}\">{}</code></pre></figure>\n",
        pre_class,
        html_escape(language),
        body
    ));
    html
}

fn caption_html(caption: &Option<String>) -> String {
    match caption.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(caption) => format!("<figcaption>{}</figcaption>", html_escape(caption)),
        None => String::new(),
    }
}

fn render_image(media: &Media) -> String {
    if media.url.trim().is_empty() {
        return String::new();
    }
    let alt = media.caption.as_deref().unwrap_or_default();
    format!(
        "<figure class=\"image\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\">{}</figure>\n",
        html_escape(media.url.trim()),
        html_escape(alt),
        caption_html(&media.caption)
    )
}

fn render_video(media: &Media) -> String {
    if media.url.trim().is_empty() {
        return String::new();
    }
    format!(
        "<figure class=\"video\"><video controls preload=\"metadata\" src=\"{}\"></video>{}</figure>\n",
        html_escape(media.url.trim()),
        caption_html(&media.caption)
    )
}

fn render_note(note: &Note) -> String {
    format!(
        "<aside class=\"note note-{}\" role=\"note\"><p>{}</p></aside>\n",
        note.variant.as_str(),
        html_escape(&note.text)
    )
}

fn render_list(list: &List) -> String {
    if list.items.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul>");
    for item in list.items.iter() {
        html.push_str(&format!("<li>{}</li>", html_escape(item)));
    }
    html.push_str("</ul>\n");
    html
}
