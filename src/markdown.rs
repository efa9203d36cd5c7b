use pulldown_cmark::{html, Options, Parser};

/// Turns a bot reply written in Markdown into HTML.
///
/// The output is inserted into the transcript without further sanitizing,
/// so implementations must be trusted.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PulldownRenderer;

impl MarkdownRenderer for PulldownRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        let parser = Parser::new_ext(markdown, options);
        let mut output = String::new();
        html::push_html(&mut output, parser);
        output
    }
}

/// Without a renderer the markdown source is used as the HTML body verbatim.
pub fn render_markup(renderer: Option<&dyn MarkdownRenderer>, markdown: &str) -> String {
    match renderer {
        Some(renderer) => renderer.render(markdown),
        None => markdown.to_string(),
    }
}

pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Flattens rendered HTML into readable text for widgets that cannot
/// display markup. Block tags become line breaks, list items get a bullet,
/// entities are decoded and every other tag is dropped.
pub fn markup_to_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find('<') {
        push_text(&mut out, &rest[..start]);
        let Some(len) = rest[start..].find('>') else {
            push_text(&mut out, &rest[start..]);
            rest = "";
            break;
        };
        apply_tag(&mut out, &rest[start + 1..start + len]);
        rest = &rest[start + len + 1..];
    }
    push_text(&mut out, rest);

    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim().to_string()
}

fn push_text(out: &mut String, text: &str) {
    // Whitespace between block tags is formatting, not content.
    if text.trim().is_empty() && text.contains('\n') {
        return;
    }
    out.push_str(&html_escape::decode_html_entities(text));
}

fn apply_tag(out: &mut String, tag: &str) {
    let closing = tag.starts_with('/');
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match (name.as_str(), closing) {
        ("br", _) => out.push('\n'),
        ("hr", _) => {
            ensure_newline(out);
            out.push_str("---\n");
        }
        ("li", false) => {
            ensure_newline(out);
            out.push_str("• ");
        }
        ("li" | "tr" | "div", true) => ensure_newline(out),
        ("p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol" | "pre" | "blockquote"
        | "table", true) => ensure_blank_line(out),
        _ => {}
    }
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn ensure_blank_line(out: &mut String) {
    ensure_newline(out);
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}
