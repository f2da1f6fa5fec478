//! Formatting utilities (feedback markdown → Telegram HTML, embed rendering).

use crate::messaging::types::Embed;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Convert the markdown subset used by bot replies (`**bold**`) to HTML.
///
/// Everything else is escaped verbatim; an unpaired `**` is kept as text.
pub fn markdown_to_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut rest = input;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        out.push_str(&escape_html(&rest[..start]));
        out.push_str("<b>");
        out.push_str(&escape_html(&after[..end]));
        out.push_str("</b>");
        rest = &after[end + 2..];
    }

    out.push_str(&escape_html(rest));
    out
}

/// Render an embed as a Telegram HTML message: bold title, optional author
/// line, then the body.
pub fn embed_to_html(embed: &Embed) -> String {
    let mut out = format!("<b>{}</b>", escape_html(&embed.title));
    if let Some(author) = &embed.author {
        out.push_str(&format!("\n<i>{}</i>", escape_html(&author.name)));
    }
    if !embed.description.is_empty() {
        out.push_str("\n\n");
        out.push_str(&escape_html(&embed.description));
    }
    out
}
