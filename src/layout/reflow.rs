/*!
 * Layout reflow engine.
 *
 * Fits translated text into the geometry of its source block. The engine
 * walks a descending scale ladder and keeps the first (largest) scale at
 * which the wrapped text fits the box. When even the smallest scale does
 * not fit, the box may grow downwards up to `max_expansion_ratio`; past
 * that the block is flagged `overflow`, set at the smallest scale, and its
 * box is grown to whatever the text needs. Nothing is ever clipped.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classification::{Script, ScriptCoverage};
use crate::document::{BlockId, BoundingBox, TextBlock, TextLayout};

use super::metrics::{GlyphMetrics, HeuristicMetrics};
use super::wrap::{BreakStrategy, WrappedLine, wrap};

/// Tolerance for floating point fit comparisons
const FIT_EPSILON: f32 = 1e-3;

/// Reflow parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Candidate scale factors, tried largest first
    pub scale_ladder: Vec<f32>,
    /// Baseline-to-baseline distance as a multiple of the font size
    pub line_height: f32,
    /// Largest allowed box height growth, as a multiple of the source height
    pub max_expansion_ratio: f32,
    /// Per-script break strategy overrides
    pub break_strategies: BTreeMap<Script, BreakStrategy>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            scale_ladder: default_scale_ladder(),
            line_height: 1.2,
            max_expansion_ratio: 1.5,
            break_strategies: BTreeMap::new(),
        }
    }
}

/// 1.0, 0.95, …, 0.5
pub fn default_scale_ladder() -> Vec<f32> {
    (0..=10).map(|step| 1.0 - step as f32 * 0.05).collect()
}

impl LayoutConfig {
    pub fn with_max_expansion_ratio(mut self, ratio: f32) -> Self {
        self.max_expansion_ratio = ratio;
        self
    }

    /// Ladder sorted largest first with duplicates and non-positive entries removed
    pub fn normalized_ladder(&self) -> Vec<f32> {
        let mut ladder: Vec<f32> = self
            .scale_ladder
            .iter()
            .copied()
            .filter(|s| s.is_finite() && *s > 0.0)
            .collect();
        ladder.sort_by(|a, b| b.total_cmp(a));
        ladder.dedup();
        if ladder.is_empty() {
            ladder.push(1.0);
        }
        ladder
    }

    /// Smallest scale of the ladder
    pub fn min_scale(&self) -> f32 {
        self.normalized_ladder().last().copied().unwrap_or(1.0)
    }

    /// Break strategy for text written in `script`
    pub fn break_strategy(&self, script: Script) -> BreakStrategy {
        if let Some(strategy) = self.break_strategies.get(&script) {
            return *strategy;
        }
        if script.uses_word_spacing() {
            BreakStrategy::Whitespace
        } else {
            BreakStrategy::Grapheme
        }
    }
}

/// A text block with its translated text laid out
#[derive(Debug, Clone, PartialEq)]
pub struct ReflowedBlock {
    pub block_id: BlockId,
    pub text: String,
    /// Chosen scale factor relative to the source font size
    pub scale: f32,
    /// Effective font size
    pub font_size: f32,
    pub line_height: f32,
    pub lines: Vec<String>,
    /// Byte offsets in `text` where each line starts
    pub line_breaks: Vec<usize>,
    /// Final box: the source box, possibly grown in height
    pub bbox: BoundingBox,
    /// The box height was grown within the expansion budget
    pub expanded: bool,
    /// The text does not fit even with the full expansion budget
    pub overflow: bool,
}

impl ReflowedBlock {
    pub fn layout(&self) -> TextLayout {
        TextLayout {
            scale: self.scale,
            font_size: self.font_size,
            line_height: self.line_height,
            lines: self.lines.clone(),
        }
    }

    /// Height the lines occupy
    pub fn content_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Candidate layout at one scale
struct Attempt {
    scale: f32,
    font_size: f32,
    line_height: f32,
    lines: Vec<WrappedLine>,
}

impl Attempt {
    fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    fn fits_width(&self, width: f32) -> bool {
        self.lines.iter().all(|l| l.width <= width + FIT_EPSILON)
    }

    fn fits(&self, bbox: &BoundingBox) -> bool {
        self.height() <= bbox.height + FIT_EPSILON && self.fits_width(bbox.width)
    }
}

/// Reflow engine
#[derive(Debug, Clone)]
pub struct ReflowEngine {
    config: LayoutConfig,
    ladder: Vec<f32>,
    metrics: Arc<dyn GlyphMetrics>,
}

impl ReflowEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self::with_metrics(config, Arc::new(HeuristicMetrics::new()))
    }

    pub fn with_metrics(config: LayoutConfig, metrics: Arc<dyn GlyphMetrics>) -> Self {
        let ladder = config.normalized_ladder();
        Self { config, ladder, metrics }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Script whose break rules apply to `text`
    fn layout_script(block: &TextBlock, text: &str) -> Script {
        let coverage = ScriptCoverage::measure(text);
        match coverage.dominant() {
            (_, share) if share == 0.0 => block.script.unwrap_or(Script::Unknown),
            (script, _) => script,
        }
    }

    fn attempt(&self, block: &TextBlock, text: &str, strategy: BreakStrategy, scale: f32) -> Attempt {
        let font_size = block.font.size * scale;
        let line_height = font_size * self.config.line_height;
        let lines = wrap(text, block.bbox.width, strategy, |s| {
            self.metrics.advance(s, &block.font, font_size)
        });
        Attempt {
            scale,
            font_size,
            line_height,
            lines,
        }
    }

    /// Lay out `text` inside `block`'s geometry
    pub fn reflow(&self, block: &TextBlock, text: &str) -> ReflowedBlock {
        let strategy = self.config.break_strategy(Self::layout_script(block, text));
        let bbox = block.bbox;

        let mut smallest = None;
        for &scale in &self.ladder {
            let attempt = self.attempt(block, text, strategy, scale);
            if attempt.fits(&bbox) {
                return Self::finish(block, text, attempt, bbox, false, false);
            }
            smallest = Some(attempt);
        }

        // The ladder is never empty, so `smallest` is the minimum-scale attempt
        let attempt = match smallest {
            Some(attempt) => attempt,
            None => self.attempt(block, text, strategy, 1.0),
        };

        let needed = attempt.height();
        let budget = bbox.height * self.config.max_expansion_ratio.max(1.0);
        if needed <= budget + FIT_EPSILON && attempt.fits_width(bbox.width) {
            debug!(
                "Block {} expanded from {:.1} to {:.1} at scale {:.2}",
                block.id, bbox.height, needed, attempt.scale
            );
            let grown = bbox.with_height(needed.max(bbox.height));
            return Self::finish(block, text, attempt, grown, true, false);
        }

        debug!(
            "Block {} overflows: needs {:.1} of {:.1} at minimum scale {:.2}",
            block.id, needed, budget, attempt.scale
        );
        let forced = bbox.with_height(needed.max(bbox.height));
        Self::finish(block, text, attempt, forced, forced.height > bbox.height, true)
    }

    fn finish(
        block: &TextBlock,
        text: &str,
        attempt: Attempt,
        bbox: BoundingBox,
        expanded: bool,
        overflow: bool,
    ) -> ReflowedBlock {
        let line_breaks = attempt.lines.iter().map(|l| l.start).collect();
        let lines = attempt.lines.into_iter().map(|l| l.text).collect();
        ReflowedBlock {
            block_id: block.id,
            text: text.to_string(),
            scale: attempt.scale,
            font_size: attempt.font_size,
            line_height: attempt.line_height,
            lines,
            line_breaks,
            bbox,
            expanded,
            overflow,
        }
    }
}
