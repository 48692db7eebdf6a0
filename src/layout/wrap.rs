/*!
 * Greedy line breaking.
 *
 * Break opportunities are whitespace for spaced scripts and grapheme
 * cluster boundaries for scripts written without spaces. A line never
 * starts with a separator; a token wider than the line is placed alone and
 * allowed to overflow horizontally.
 */

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Where a line may be broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakStrategy {
    /// Break only at whitespace
    Whitespace,
    /// Break at any grapheme cluster boundary
    Grapheme,
}

/// One wrapped line
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    /// Byte offset in the source text where the line's first token starts
    pub start: usize,
    pub width: f32,
}

/// Token of a paragraph: its byte offset in the source and its text
struct Token<'a> {
    start: usize,
    text: &'a str,
    /// Preceded by whitespace in the source
    spaced: bool,
}

fn tokens(paragraph: &str, offset: usize, strategy: BreakStrategy) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut pending_space = false;
    match strategy {
        BreakStrategy::Whitespace => {
            let mut start = None;
            for (i, c) in paragraph.char_indices() {
                match (c.is_whitespace(), start) {
                    (true, Some(s)) => {
                        out.push(Token {
                            start: offset + s,
                            text: &paragraph[s..i],
                            spaced: pending_space,
                        });
                        start = None;
                        pending_space = true;
                    }
                    (true, None) => pending_space = !out.is_empty() || pending_space,
                    (false, None) => start = Some(i),
                    (false, Some(_)) => {}
                }
            }
            if let Some(s) = start {
                out.push(Token {
                    start: offset + s,
                    text: &paragraph[s..],
                    spaced: pending_space,
                });
            }
        }
        BreakStrategy::Grapheme => {
            for (i, g) in paragraph.grapheme_indices(true) {
                if g.chars().all(char::is_whitespace) {
                    pending_space = true;
                    continue;
                }
                out.push(Token {
                    start: offset + i,
                    text: g,
                    spaced: pending_space,
                });
                pending_space = false;
            }
        }
    }
    out
}

/// Wrap `text` into lines no wider than `max_width` where possible
///
/// `measure` returns the advance of a string. `\n` forces a break; an empty
/// paragraph yields an empty line so vertical spacing is kept.
pub fn wrap<F>(text: &str, max_width: f32, strategy: BreakStrategy, measure: F) -> Vec<WrappedLine>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        return lines;
    }

    let mut offset = 0;
    for paragraph in text.split('\n') {
        let paragraph_tokens = tokens(paragraph, offset, strategy);
        offset += paragraph.len() + 1;

        if paragraph_tokens.is_empty() {
            lines.push(WrappedLine {
                text: String::new(),
                start: offset - 1 - paragraph.len(),
                width: 0.0,
            });
            continue;
        }

        let mut current: Option<WrappedLine> = None;
        for token in paragraph_tokens {
            current = Some(match current.take() {
                None => WrappedLine {
                    text: token.text.to_string(),
                    start: token.start,
                    width: measure(token.text),
                },
                Some(mut line) => {
                    let mut candidate = line.text.clone();
                    if token.spaced {
                        candidate.push(' ');
                    }
                    candidate.push_str(token.text);
                    let width = measure(&candidate);
                    if width <= max_width {
                        line.text = candidate;
                        line.width = width;
                        line
                    } else {
                        lines.push(line);
                        WrappedLine {
                            text: token.text.to_string(),
                            start: token.start,
                            width: measure(token.text),
                        }
                    }
                }
            });
        }
        lines.extend(current);
    }

    // Trailing empty paragraphs add no visible content
    while lines.last().is_some_and(|l| l.text.is_empty()) {
        lines.pop();
    }
    lines
}
