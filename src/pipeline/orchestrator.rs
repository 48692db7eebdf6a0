/*!
 * Pipeline orchestrator for layout-preserving document translation.
 *
 * Each page moves through `Extracted → Classified → Translated → Reflowed →
 * Composed`. Pages run in parallel in two phases separated by a barrier:
 * 1. Analysis: OCR of raster regions, then script/language classification
 * 2. Rendering: translation, reflow and composition
 *
 * The barrier exists because blocks without a confident language fall back
 * to the document's dominant language, which needs every page classified.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::classification::{ScriptClassifier, ScriptCoverage, dominant_language};
use crate::composition::{RenderedBlock, assemble_document, compose_page};
use crate::document::{BlockId, Document, Page, codec_for_format};
use crate::errors::ClassifyError;
use crate::extraction::{Extractor, OcrEngine, fill_ocr_regions};
use crate::language_utils::UNDETERMINED;
use crate::layout::{LayoutConfig, ReflowEngine};
use crate::translation::{BlockTranslation, TranslationAdapter, TranslationRequest, TranslationStatus};

use super::cancel::CancellationToken;
use super::report::{
    BlockFlag, BlockReport, BlockStatus, DocumentOutcome, PageReport, RunStats, TranslationReport,
};

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub target_language: String,

    /// Overrides the detected source language of every block
    pub source_language: Option<String>,

    /// Pages processed in parallel
    pub workers: usize,

    pub layout: LayoutConfig,
}

impl PipelineConfig {
    pub fn new(target_language: &str) -> Self {
        Self {
            target_language: target_language.to_string(),
            source_language: None,
            workers: default_workers(),
            layout: LayoutConfig::default(),
        }
    }

    pub fn with_source_language(mut self, source_language: Option<&str>) -> Self {
        self.source_language = source_language.map(str::to_string);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_expansion_ratio(mut self, ratio: f32) -> Self {
        self.layout.max_expansion_ratio = ratio;
        self
    }
}

/// Number of available execution units, at least 1
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Decoding the container
    Extraction,
    /// OCR and classification
    Analysis,
    /// Translation, reflow and composition
    Rendering,
    /// Output assembled
    Done,
}

/// Progress information during pipeline execution
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineProgress {
    pub phase: PipelinePhase,
    pub pages_done: usize,
    pub total_pages: usize,
}

impl PipelineProgress {
    /// Overall completion in [0, 1]; analysis counts for a third
    pub fn overall(&self) -> f32 {
        let within = if self.total_pages == 0 {
            1.0
        } else {
            self.pages_done as f32 / self.total_pages as f32
        };
        match self.phase {
            PipelinePhase::Extraction => 0.0,
            PipelinePhase::Analysis => within / 3.0,
            PipelinePhase::Rendering => 1.0 / 3.0 + within * 2.0 / 3.0,
            PipelinePhase::Done => 1.0,
        }
    }
}

/// Progress callback
pub type ProgressCallback<'a> = &'a (dyn Fn(PipelineProgress) + Send + Sync);

/// Result of the complete pipeline execution
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Composed pages, absent when no page succeeded
    pub document: Option<Document>,
    pub report: TranslationReport,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    pub fn summary(&self) -> String {
        self.report.summary()
    }
}

/// What analysis learned about one text block
#[derive(Debug, Clone, Default)]
struct BlockNotes {
    /// Top language of a confidently classified block
    language: Option<String>,
    flags: Vec<(BlockFlag, Option<String>)>,
}

/// A page after OCR and classification
struct AnalyzedPage {
    page: Page,
    notes: HashMap<BlockId, BlockNotes>,
}

enum Analysis {
    Ready(AnalyzedPage),
    Cancelled(usize),
    Failed(usize, String),
}

struct PageRun {
    report: PageReport,
    composed: Option<Page>,
}

impl PageRun {
    fn cancelled(page: usize) -> Self {
        Self {
            report: PageReport::cancelled(page),
            composed: None,
        }
    }

    fn failed(page: usize, reason: String) -> Self {
        Self {
            report: PageReport::failed(page, reason),
            composed: None,
        }
    }
}

/// Per-page stages, cloned into every spawned page task
#[derive(Clone)]
struct PageWorker {
    source_language: Option<String>,
    target_language: String,
    classifier: ScriptClassifier,
    adapter: Arc<TranslationAdapter>,
    reflow: ReflowEngine,
    ocr: Option<Arc<dyn OcrEngine>>,
    cancel: CancellationToken,
}

/// The document translation pipeline
pub struct DocumentPipeline {
    config: PipelineConfig,
    extractor: Extractor,
    classifier: ScriptClassifier,
    adapter: Arc<TranslationAdapter>,
    reflow: ReflowEngine,
    ocr: Option<Arc<dyn OcrEngine>>,
    cancel: CancellationToken,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig, adapter: Arc<TranslationAdapter>) -> Self {
        let reflow = ReflowEngine::new(config.layout.clone());
        Self {
            config,
            extractor: Extractor::new(),
            classifier: ScriptClassifier::default(),
            adapter,
            reflow,
            ocr: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: ScriptClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_reflow_engine(mut self, reflow: ReflowEngine) -> Self {
        self.reflow = reflow;
        self
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn page_worker(&self) -> PageWorker {
        PageWorker {
            source_language: self.config.source_language.clone(),
            target_language: self.config.target_language.clone(),
            classifier: self.classifier.clone(),
            adapter: Arc::clone(&self.adapter),
            reflow: self.reflow.clone(),
            ocr: self.ocr.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Translate a document and encode the result in its source container
    ///
    /// Output bytes are `None` when the document-level result is `Failed`.
    pub async fn translate_bytes(
        &self,
        bytes: &[u8],
        progress: Option<ProgressCallback<'_>>,
    ) -> (Option<Vec<u8>>, TranslationReport) {
        let mut result = self.run(bytes, progress).await;
        let Some(document) = result.document.take() else {
            return (None, result.report);
        };

        match codec_for_format(&document.format).encode(&document) {
            Ok(encoded) => (Some(encoded), result.report),
            Err(e) => {
                error!("Failed to encode output document: {:#}", e);
                result.report.errors.push(format!("EncodeError: {:#}", e));
                result.report.outcome = DocumentOutcome::Failed;
                (None, result.report)
            }
        }
    }

    /// Run the pipeline over document bytes.
    ///
    /// Every page runs on its own task, at most `workers` at a time.
    /// Must be called from within a tokio runtime.
    pub async fn run(&self, bytes: &[u8], progress: Option<ProgressCallback<'_>>) -> PipelineResult {
        let start_time = Instant::now();
        let mut report = TranslationReport::new(bytes, &self.config.target_language, self.adapter.backend_name());
        report.source_language = self.config.source_language.clone();

        let notify = |phase: PipelinePhase, pages_done: usize, total_pages: usize| {
            if let Some(callback) = progress {
                callback(PipelineProgress {
                    phase,
                    pages_done,
                    total_pages,
                });
            }
        };
        notify(PipelinePhase::Extraction, 0, 0);

        let decoded = match self.extractor.extract(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!("Document extraction failed: {}", e);
                report.errors.push(e.to_string());
                report.set_duration(start_time.elapsed());
                return PipelineResult { document: None, report };
            }
        };

        let Document {
            format,
            pages,
            metadata,
            ..
        } = decoded.document;
        report.source_format = Some(format.to_string());

        let mut page_reports: Vec<PageReport> = decoded
            .page_failures
            .iter()
            .map(|(page, e)| PageReport::failed(page.0, e.to_string()))
            .collect();

        let total_pages = pages.len() + page_reports.len();
        let workers = self.config.workers.max(1);
        info!(
            "Translating {} page(s) to {} with {} worker(s)",
            total_pages, self.config.target_language, workers
        );

        let worker = self.page_worker();

        // Phase A: OCR and classification
        notify(PipelinePhase::Analysis, 0, total_pages);
        let mut analyzed = Vec::with_capacity(pages.len());
        let mut analysis = stream::iter(pages)
            .map(|page| {
                let page_no = page.id.0;
                let task = tokio::spawn(worker.clone().analyze_page(page));
                async move {
                    task.await
                        .unwrap_or_else(|e| Analysis::Failed(page_no, format!("analysis task failed: {}", e)))
                }
            })
            .buffer_unordered(workers);
        let mut done = page_reports.len();
        while let Some(outcome) = analysis.next().await {
            match outcome {
                Analysis::Ready(page) => analyzed.push(page),
                Analysis::Cancelled(page) => page_reports.push(PageReport::cancelled(page)),
                Analysis::Failed(page, reason) => {
                    error!("Page {} failed analysis: {}", page, reason);
                    page_reports.push(PageReport::failed(page, reason));
                }
            }
            done += 1;
            notify(PipelinePhase::Analysis, done, total_pages);
        }
        drop(analysis);

        let dominant = dominant_language(analyzed.iter().flat_map(|a| a.page.text_blocks()));
        debug!("Dominant language: {:?}", dominant);
        report.dominant_language = dominant.clone();

        // Phase B: translation, reflow, composition
        notify(PipelinePhase::Rendering, 0, total_pages);
        let mut composed_pages = Vec::new();
        let mut rendering = stream::iter(analyzed)
            .map(|page| {
                let page_no = page.page.id.0;
                let task = tokio::spawn(worker.clone().render_page(page, dominant.clone()));
                async move {
                    task.await
                        .unwrap_or_else(|e| PageRun::failed(page_no, format!("rendering task failed: {}", e)))
                }
            })
            .buffer_unordered(workers);
        let mut done = page_reports.len();
        while let Some(run) = rendering.next().await {
            if let Some(page) = run.composed {
                composed_pages.push(page);
            }
            page_reports.push(run.report);
            done += 1;
            notify(PipelinePhase::Rendering, done, total_pages);
        }
        drop(rendering);

        page_reports.sort_by_key(|p| p.page);
        report.pages = page_reports;
        report.cancelled = self.cancel.is_cancelled();

        let adapter_stats = self.adapter.stats();
        report.stats = RunStats::new(adapter_stats.backend_calls, adapter_stats.failed_units, adapter_stats.cache);

        let document = if composed_pages.is_empty() {
            warn!("No page could be composed");
            report.outcome = DocumentOutcome::Failed;
            None
        } else {
            report.outcome = DocumentOutcome::Success;
            Some(assemble_document(format, metadata, dominant, composed_pages))
        };

        report.set_duration(start_time.elapsed());
        notify(PipelinePhase::Done, total_pages, total_pages);
        info!("Pipeline finished: {}", report.summary());

        PipelineResult { document, report }
    }
}

/// Classify every text block of a page that has letters
fn classify_page(classifier: &ScriptClassifier, page: &mut Page, notes: &mut HashMap<BlockId, BlockNotes>) {
    for block in page.text_blocks_mut() {
        if ScriptCoverage::measure(&block.text).letters() == 0 {
            continue;
        }
        let entry = notes.entry(block.id).or_default();
        match classifier.classify(&block.text) {
            Ok(classification) => {
                classification.apply_to(block);
                entry.language = classification
                    .top_language()
                    .filter(|l| *l != UNDETERMINED)
                    .map(str::to_string);
            }
            Err(ClassifyError::AmbiguousScript(classification)) => {
                debug!("Block {} has an ambiguous script", block.id);
                classification.apply_to(block);
                entry.flags.push((
                    BlockFlag::LowConfidenceScript,
                    Some(format!(
                        "{} covers {:.0}% of letters",
                        classification.script,
                        classification.script_coverage * 100.0
                    )),
                ));
            }
            Err(ClassifyError::EmptyText) => {}
        }
    }
}

impl PageWorker {
    /// OCR then classify every text block of a page
    async fn analyze_page(self, mut page: Page) -> Analysis {
        let page_no = page.id.0;
        if self.cancel.is_cancelled() {
            return Analysis::Cancelled(page_no);
        }

        let mut notes: HashMap<BlockId, BlockNotes> = HashMap::new();

        let language_hint = self.source_language.as_deref();
        for fill in fill_ocr_regions(&mut page, self.ocr.as_deref(), language_hint).await {
            let entry = notes.entry(fill.block_id).or_default();
            match fill.result {
                Ok(confidence) => entry
                    .flags
                    .push((BlockFlag::OcrUsed, Some(format!("confidence {:.2}", confidence)))),
                Err(e) => entry.flags.push((BlockFlag::OcrFailed, Some(e.to_string()))),
            }
        }

        let classifier = self.classifier;
        let classified = tokio::task::spawn_blocking(move || {
            classify_page(&classifier, &mut page, &mut notes);
            AnalyzedPage { page, notes }
        })
        .await;

        match classified {
            Ok(analyzed) => Analysis::Ready(analyzed),
            Err(e) => Analysis::Failed(page_no, format!("classification failed: {}", e)),
        }
    }

    /// Source language of a block: override, then its own, then the document's
    fn source_language_for(&self, notes: Option<&BlockNotes>, dominant: Option<&str>) -> String {
        self.source_language
            .clone()
            .or_else(|| notes.and_then(|n| n.language.clone()))
            .or_else(|| dominant.map(str::to_string))
            .unwrap_or_else(|| UNDETERMINED.to_string())
    }

    /// Translate, then reflow and compose one analyzed page
    async fn render_page(self, analyzed: AnalyzedPage, dominant: Option<String>) -> PageRun {
        let page_no = analyzed.page.id.0;
        if self.cancel.is_cancelled() {
            return PageRun::cancelled(page_no);
        }

        let requests: Vec<TranslationRequest> = analyzed
            .page
            .text_blocks()
            .map(|block| {
                let source = self.source_language_for(analyzed.notes.get(&block.id), dominant.as_deref());
                TranslationRequest::new(block.id, block.text.clone(), source, self.target_language.clone())
            })
            .collect();

        let translations = self.adapter.translate_all(&requests).await;

        // Every translation of the page is resolved at this point
        if self.cancel.is_cancelled() {
            return PageRun::cancelled(page_no);
        }

        tokio::task::spawn_blocking(move || self.compose(analyzed, &requests, translations))
            .await
            .unwrap_or_else(|e| PageRun::failed(page_no, format!("composition task failed: {}", e)))
    }

    /// Reflow translated blocks and rebuild the page
    fn compose(
        &self,
        analyzed: AnalyzedPage,
        requests: &[TranslationRequest],
        translations: Vec<BlockTranslation>,
    ) -> PageRun {
        let AnalyzedPage { page, mut notes } = analyzed;
        let page_no = page.id.0;

        let mut rendered = Vec::with_capacity(translations.len());
        let mut blocks = Vec::with_capacity(translations.len());
        for (request, translation) in requests.iter().zip(translations) {
            let block_notes = notes.remove(&translation.block_id).unwrap_or_default();
            let status = match &translation.status {
                TranslationStatus::Translated => BlockStatus::Translated,
                TranslationStatus::PassedThrough(_) => BlockStatus::PassedThrough,
                TranslationStatus::Failed(_) => BlockStatus::Failed,
            };
            let mut block_report = BlockReport::new(translation.block_id, status);
            block_report.source_language = Some(request.source_language.clone());
            for (flag, reason) in block_notes.flags {
                block_report.flag(flag, reason);
            }

            match (&translation.status, page.block(translation.block_id).and_then(|b| b.as_text())) {
                (TranslationStatus::Translated, Some(source_block)) => {
                    let reflowed = self.reflow.reflow(source_block, &translation.text);
                    block_report.scale = Some(reflowed.scale);
                    if reflowed.overflow {
                        block_report.flag(
                            BlockFlag::Overflow,
                            Some(format!(
                                "needs {:.1} of {:.1} at scale {:.2}",
                                reflowed.content_height(),
                                source_block.bbox.height,
                                reflowed.scale
                            )),
                        );
                    }
                    rendered.push(RenderedBlock::Reflowed(reflowed));
                }
                (TranslationStatus::Failed(reason), _) => {
                    block_report.flag(BlockFlag::TranslationFailed, Some(reason.clone()));
                    rendered.push(RenderedBlock::Original(translation.block_id));
                }
                _ => rendered.push(RenderedBlock::Original(translation.block_id)),
            }
            blocks.push(block_report);
        }

        match compose_page(&page, rendered) {
            Ok(composed) => {
                debug!("Page {} composed", page.id);
                PageRun {
                    report: PageReport::composed(page_no, blocks),
                    composed: Some(composed),
                }
            }
            Err(e) => {
                error!("Page {} failed composition: {}", page.id, e);
                let mut report = PageReport::failed(page_no, e.to_string());
                report.blocks = blocks;
                PageRun { report, composed: None }
            }
        }
    }
}
