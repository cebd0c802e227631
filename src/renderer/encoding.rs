//! Output encodings selected by the `encoding` attribute

use pct_str::{PctString, URIReserved};
use tracing::warn;

/// Apply a named encoding; unknown encodings leave the text unchanged
pub fn encode(text: &str, encoding: &str) -> String {
    match encoding.trim() {
        "html" => escape_markup(text, true),
        "xml" | "form" => escape_markup(text, false),
        "url" => PctString::encode(text.chars(), URIReserved).to_string(),
        "" | "none" => text.to_string(),
        other => {
            warn!(encoding = other, "unknown encoding, output left as is");
            text.to_string()
        }
    }
}

fn escape_markup(text: &str, line_breaks: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' if line_breaks => out.push_str("<br />\n"),
            _ => out.push(c),
        }
    }
    out
}
