/*!
 * Glyph advance estimation.
 *
 * Real font files are not available to the pipeline, so widths are
 * estimated per grapheme cluster from the cluster's script class. The
 * estimate only has to be stable and roughly proportional; the reflow
 * engine searches a scale ladder on top of it.
 */

use std::fmt::Debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::classification::Script;
use crate::document::FontDescriptor;

/// Text width measurement hook for line fitting
pub trait GlyphMetrics: Send + Sync + Debug {
    /// Advance width of `text` set in `font` at `size` units
    fn advance(&self, text: &str, font: &FontDescriptor, size: f32) -> f32;
}

/// Script-class width model
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMetrics;

impl HeuristicMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Width of one grapheme cluster in em
    pub fn cluster_em_width(cluster: &str) -> f32 {
        let Some(first) = cluster.chars().next() else {
            return 0.0;
        };
        match Script::of(first) {
            None => neutral_em_width(first),
            Some(Script::Latin) | Some(Script::Greek) | Some(Script::Cyrillic) => latin_em_width(first),
            Some(Script::Han) | Some(Script::Kana) | Some(Script::Hangul) => 1.0,
            Some(Script::Arabic) | Some(Script::Hebrew) => 0.45,
            Some(Script::Thai) | Some(Script::Lao) | Some(Script::Khmer) | Some(Script::Myanmar) => 0.55,
            // Indic clusters stack vowel signs and conjuncts around one base
            Some(_) => 0.6,
        }
    }

    fn family_scale(font: &FontDescriptor) -> f32 {
        let family = font.family.to_ascii_lowercase();
        let mut scale = if family.contains("serif") && !family.contains("sans") {
            1.03
        } else if family.contains("sans") {
            0.99
        } else {
            1.0
        };
        if font.is_bold() {
            scale += 0.05;
        }
        scale
    }
}

impl GlyphMetrics for HeuristicMetrics {
    fn advance(&self, text: &str, font: &FontDescriptor, size: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let family = font.family.to_ascii_lowercase();
        let monospace = family.contains("mono") || family.contains("courier") || family.contains("fixed");

        let em_sum: f32 = if monospace {
            text.graphemes(true)
                .map(|g| match Self::cluster_em_width(g) {
                    w if w >= 1.0 => 1.0,
                    _ if g == " " => 0.52,
                    _ => 0.6,
                })
                .sum()
        } else {
            text.graphemes(true).map(Self::cluster_em_width).sum()
        };

        em_sum * size * Self::family_scale(font)
    }
}

fn latin_em_width(ch: char) -> f32 {
    match ch {
        'i' | 'l' | 'I' | 'j' => 0.28,
        'f' | 't' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' => 0.78,
        c if c.is_uppercase() => 0.65,
        _ => 0.52,
    }
}

fn neutral_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.25,
        '\t' => 1.0,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' | '!' | '|' => 0.25,
        '(' | ')' | '[' | ']' | '{' | '}' | '-' => 0.33,
        '\u{3000}'..='\u{303F}' | '\u{FF00}'..='\u{FF0F}' => 1.0,
        '।' | '॥' => 0.3,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_whitespace() => 0.25,
        c if c.is_ascii_punctuation() => 0.42,
        _ => 0.56,
    }
}
