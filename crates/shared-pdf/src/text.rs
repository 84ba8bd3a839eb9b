//! Rich-text flattening and line wrapping

use lazy_static::lazy_static;
use regex::Regex;

use crate::metrics::Font;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)[^>]*?(/?)>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    Bullet,
}

/// A run of text the renderer wraps as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

impl Block {
    fn new(kind: BlockKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Flatten section rich text into blocks.
///
/// Markup is reduced to structure the PDF can express: headings, bullets and
/// paragraphs. Inline tags are dropped and entities decoded. Content without
/// any tags is treated as plain text, one paragraph per non-empty line.
pub fn html_to_blocks(html: &str) -> Vec<Block> {
    if !TAG.is_match(html) {
        return html
            .lines()
            .map(|line| collapse(&decode_entities(line)))
            .filter(|line| !line.is_empty())
            .map(|line| Block::new(BlockKind::Paragraph, &line))
            .collect();
    }

    let mut blocks = Vec::new();
    let mut kind = BlockKind::Paragraph;
    let mut buf = String::new();
    let mut cursor = 0;

    for caps in TAG.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        buf.push_str(&html[cursor..whole.start()]);
        cursor = whole.end();

        let closing = &caps[1] == "/";
        let name = caps[2].to_ascii_lowercase();
        match name.as_str() {
            "br" => flush(&mut blocks, &mut buf, kind),
            "li" => {
                flush(&mut blocks, &mut buf, kind);
                kind = if closing {
                    BlockKind::Paragraph
                } else {
                    BlockKind::Bullet
                };
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                flush(&mut blocks, &mut buf, kind);
                kind = if closing {
                    BlockKind::Paragraph
                } else {
                    BlockKind::Heading
                };
            }
            "p" | "div" | "ul" | "ol" | "tr" | "table" | "blockquote" | "section" => {
                flush(&mut blocks, &mut buf, kind);
            }
            "td" | "th" => buf.push(' '),
            _ => {}
        }
    }
    buf.push_str(&html[cursor..]);
    flush(&mut blocks, &mut buf, kind);
    blocks
}

fn flush(blocks: &mut Vec<Block>, buf: &mut String, kind: BlockKind) {
    let text = collapse(&decode_entities(buf));
    buf.clear();
    if !text.is_empty() {
        blocks.push(Block::new(kind, &text));
    }
}

fn collapse(text: &str) -> String {
    SPACES.replace_all(text, " ").trim().to_string()
}

/// Decode the common named entities and numeric references.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "hellip" => Some('…'),
                    "copy" => Some('©'),
                    "reg" => Some('®'),
                    "rsquo" => Some('’'),
                    "lsquo" => Some('‘'),
                    "ldquo" => Some('“'),
                    "rdquo" => Some('”'),
                    "bull" => Some('•'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Greedy word wrap by measured glyph widths.
///
/// Words wider than `max_width` on their own are broken between characters.
/// Always returns at least one line for non-blank input.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if font.text_width(word, size) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = break_word(word, font, size, max_width);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if font.text_width(&piece, size) > max_width && piece.chars().count() > 1 {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Shorten `text` with a trailing `...` so it fits `max_width`.
pub fn truncate_to_width(text: &str, font: Font, size: f32, max_width: f32) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() && font.text_width(&format!("{}...", out), size) > max_width {
        out.pop();
    }
    format!("{}...", out.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn html_structure_is_flattened() {
        let html = "<h3>Scope</h3><p>We will <strong>build</strong> your site.</p>\
                    <ul><li>Design</li><li>Build &amp; launch</li></ul><p>Thanks</p>";
        let blocks = html_to_blocks(html);
        assert_eq!(
            blocks,
            vec![
                Block::new(BlockKind::Heading, "Scope"),
                Block::new(BlockKind::Paragraph, "We will build your site."),
                Block::new(BlockKind::Bullet, "Design"),
                Block::new(BlockKind::Bullet, "Build & launch"),
                Block::new(BlockKind::Paragraph, "Thanks"),
            ]
        );
    }

    #[test]
    fn plain_text_split_by_lines() {
        let blocks = html_to_blocks("First line\n\n  Second   line ");
        assert_eq!(
            blocks,
            vec![
                Block::new(BlockKind::Paragraph, "First line"),
                Block::new(BlockKind::Paragraph, "Second line"),
            ]
        );
    }

    #[test]
    fn br_breaks_paragraph() {
        let blocks = html_to_blocks("<p>One<br/>Two</p>");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &unknown;"), "a <b> AB &unknown;");
    }

    #[test]
    fn wrap_respects_width() {
        let text = "The quick brown fox jumps over the lazy dog again and again";
        let lines = wrap(text, Font::Regular, 10.0, 100.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Regular.text_width(line, 10.0) <= 100.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn long_words_are_broken() {
        let word = "a".repeat(200);
        let lines = wrap(&word, Font::Regular, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(Font::Regular.text_width(line, 10.0) <= 50.0);
        }
    }

    #[test]
    fn truncation_adds_ellipsis() {
        let out = truncate_to_width("A very long description indeed", Font::Regular, 10.0, 60.0);
        assert!(out.ends_with("..."));
        assert!(Font::Regular.text_width(&out, 10.0) <= 60.0);
    }
}
