/*!
 * Script and language classification.
 *
 * Each text block gets a script (from character ranges) and a language
 * distribution (from the pluggable `LanguageModel`). A block whose best
 * script covers no more than half of its letters is still classified but
 * reported as `AmbiguousScript`.
 */

pub mod language;
pub mod script;

pub use self::language::{HeuristicLanguageModel, LanguageModel, dominant_language};
pub use self::script::{Script, ScriptCoverage};

use log::debug;
use std::sync::Arc;

use crate::document::{LanguageDistribution, TextBlock};
use crate::errors::ClassifyError;

/// Share of letters a script must exceed to be trusted
pub const SCRIPT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Outcome of classifying one text
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub script: Script,
    /// Share of letters written in `script`
    pub script_coverage: f32,
    pub languages: LanguageDistribution,
}

impl Classification {
    pub fn top_language(&self) -> Option<&str> {
        self.languages.top().map(|(l, _)| l)
    }

    /// Copy the classification onto a block
    pub fn apply_to(&self, block: &mut TextBlock) {
        block.script = Some(self.script);
        block.languages = self.languages.clone();
    }
}

/// Classifier combining character-range heuristics with a language model
#[derive(Debug, Clone)]
pub struct ScriptClassifier {
    model: Arc<dyn LanguageModel>,
}

impl ScriptClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Classifier backed by the bundled heuristic model
    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicLanguageModel::new()))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Classify a non-empty text.
    ///
    /// Returns `AmbiguousScript` carrying the best-effort classification when
    /// no script covers more than half of the letters.
    pub fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyText);
        }

        let coverage = ScriptCoverage::measure(text);
        let (script, share) = coverage.dominant();
        let languages = self.model.detect(text, script);

        let classification = Classification {
            script,
            script_coverage: share,
            languages,
        };

        debug!(
            "Classified {} letters as {} ({:.0}%), top language {:?}",
            coverage.letters(),
            script,
            share * 100.0,
            classification.top_language()
        );

        if share > SCRIPT_CONFIDENCE_THRESHOLD {
            Ok(classification)
        } else {
            Err(ClassifyError::AmbiguousScript(classification))
        }
    }
}

impl Default for ScriptClassifier {
    fn default() -> Self {
        Self::heuristic()
    }
}
