/*!
 * Integration tests for the full document pipeline.
 *
 * Documents are built in memory, encoded into `%DTL-` containers and run
 * through extraction, classification, translation, reflow and composition
 * against mock backends.
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use doctrans::classification::{LanguageModel, Script, ScriptClassifier};
use doctrans::document::{BlockId, BoundingBox, LanguageDistribution, Page, PageId};
use doctrans::errors::OcrError;
use doctrans::extraction::{ImageRegion, OcrEngine, OcrOutput};
use doctrans::pipeline::{BlockFlag, BlockStatus, DocumentOutcome, PageStatus, PipelineConfig, PipelinePhase};
use doctrans::providers::mock::MockBackend;
use doctrans::translation::AdapterOptions;

use crate::common::mock_backends::{SLOW_MARKER, hindi_backend, slow_on_marker, verbose_backend};
use crate::common::{
    decode_layout, decode_pdf, hindi_pipeline, image_block, init_test_logging, layout_bytes, page, page_of_texts,
    pdf_bytes, pipeline_with, text_block,
};

#[tokio::test]
async fn test_translate_helloToHindi_shouldFitWithoutOverflow() {
    init_test_logging();
    let bytes = layout_bytes(vec![page(
        0,
        vec![text_block(0, 0, BoundingBox::new(0.0, 0.0, 100.0, 20.0), "Hello")],
    )]);

    let (output, report) = hindi_pipeline(hindi_backend()).translate_bytes(&bytes, None).await;

    assert_eq!(report.outcome, DocumentOutcome::Success);
    let document = decode_layout(&output.unwrap());
    let block = document.pages[0].text_blocks().next().unwrap();
    assert_eq!(block.text, "नमस्ते");
    let layout = block.layout.as_ref().unwrap();
    assert!(layout.scale <= 1.0);
    assert!(!layout.lines.is_empty());
    assert_eq!(block.bbox, BoundingBox::new(0.0, 0.0, 100.0, 20.0));

    let block_report = report.block("p0-b0").unwrap();
    assert_eq!(block_report.status, BlockStatus::Translated);
    assert!(!block_report.has_flag(BlockFlag::Overflow));
    assert_eq!(report.flag_count(BlockFlag::Overflow), 0);
    let translated = report.pages[0]
        .blocks
        .iter()
        .filter(|b| b.status == BlockStatus::Translated)
        .count();
    assert_eq!(translated, 1);
}

#[tokio::test]
async fn test_translate_pdf_shouldWritePdfWithTranslatedText() {
    init_test_logging();
    let bytes = pdf_bytes(vec![page_of_texts(0, &["Hello", "Thank you"]), page_of_texts(1, &["Good morning"])]);
    let source = decode_pdf(&bytes);

    let (output, report) = hindi_pipeline(hindi_backend()).translate_bytes(&bytes, None).await;

    assert_eq!(report.outcome, DocumentOutcome::Success);
    let output = output.unwrap();
    assert!(output.starts_with(b"%PDF-1.7"));
    let document = decode_pdf(&output);
    assert_eq!(document.page_count(), 2);
    let texts: Vec<_> = document
        .pages
        .iter()
        .flat_map(|p| p.text_blocks().map(|b| b.text.clone()))
        .collect();
    assert_eq!(texts, vec!["नमस्ते", "धन्यवाद", "सुप्रभात"]);

    let before = source.pages[0].text_blocks().next().unwrap().bbox;
    let after = document.pages[0].text_blocks().next().unwrap().bbox;
    assert!((before.x - after.x).abs() < 0.01);
    assert!((before.y - after.y).abs() < 2.0);
}

#[tokio::test]
async fn test_translate_withOneSlowBlock_shouldFailOnlyThatBlock() {
    init_test_logging();
    let slow_text = format!("Closing remarks {}", SLOW_MARKER);
    let bytes = layout_bytes(vec![page_of_texts(0, &["Opening remarks", &slow_text, "Questions"])]);
    let options = AdapterOptions {
        call_timeout: Duration::from_millis(50),
        retry_count: 0,
        ..AdapterOptions::default()
    };
    let pipeline = pipeline_with(
        slow_on_marker(Duration::from_millis(500)),
        options,
        PipelineConfig::new("hi").with_source_language(Some("en")),
    );

    let (output, report) = pipeline.translate_bytes(&bytes, None).await;

    assert!(report.is_success());
    assert_eq!(report.pages[0].status, PageStatus::Composed);
    assert_eq!(report.flag_count(BlockFlag::TranslationFailed), 1);
    assert!(report.block("p0-b1").unwrap().has_flag(BlockFlag::TranslationFailed));
    assert_eq!(report.block("p0-b1").unwrap().status, BlockStatus::Failed);

    let document = decode_layout(&output.unwrap());
    let texts: Vec<_> = document.pages[0].text_blocks().map(|b| b.text.clone()).collect();
    assert_eq!(texts[0], "[hi] Opening remarks");
    assert_eq!(texts[1], slow_text);
    assert_eq!(texts[2], "[hi] Questions");
}

#[tokio::test]
async fn test_translate_withCorruptContainer_shouldProduceNoOutput() {
    init_test_logging();
    let backend = MockBackend::working();
    let (output, report) = hindi_pipeline(backend.clone())
        .translate_bytes(b"%DTL-1.0\n{bad", None)
        .await;

    assert!(output.is_none());
    assert_eq!(report.outcome, DocumentOutcome::Failed);
    assert!(report.errors.iter().any(|e| e.contains("CorruptDocument")));
    assert!(report.pages.is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withRepeatedText_shouldCallBackendOncePerUnit() {
    init_test_logging();
    let heading = "Chapter summary";
    let pages = (0..4)
        .map(|id| page_of_texts(id, &[heading, "Chapter  summary", &format!("Page body {}", id)]))
        .collect();
    let bytes = layout_bytes(pages);
    let backend = MockBackend::slow(20);
    let pipeline = pipeline_with(
        backend.clone(),
        AdapterOptions::default(),
        PipelineConfig::new("hi").with_source_language(Some("en")).with_workers(4),
    );

    let (output, report) = pipeline.translate_bytes(&bytes, None).await;

    assert!(output.is_some());
    // one call for the shared heading, one per distinct body
    assert_eq!(backend.call_count(), 5);
    assert_eq!(backend.calls_for(heading), 1);
    assert_eq!(report.stats.backend_calls, 5);
    assert_eq!(report.stats.cache_entries, 5);
}

#[tokio::test]
async fn test_translate_shouldKeepPageCountGeometryAndImages() {
    init_test_logging();
    let payload = vec![0x89, b'P', b'N', b'G', 13, 10, 26, 10, 0, 0, 0, 13];
    let pages = vec![
        page(
            0,
            vec![
                text_block(0, 0, BoundingBox::new(40.0, 40.0, 300.0, 40.0), "Annual report"),
                image_block(0, 1, BoundingBox::new(40.0, 100.0, 200.0, 150.0), &payload),
                text_block(0, 2, BoundingBox::new(40.0, 260.0, 300.0, 20.0), "Figure 1: revenue by region"),
            ],
        ),
        page_of_texts(1, &["The results are in the appendix"]),
    ];
    let input_pages: Vec<Page> = pages.clone();
    let bytes = layout_bytes(pages);

    let (output, _report) = hindi_pipeline(MockBackend::working()).translate_bytes(&bytes, None).await;
    let document = decode_layout(&output.unwrap());

    assert!(document.page_count() <= input_pages.len());
    assert_eq!(document.page_count(), 2);
    for (out_page, in_page) in document.pages.iter().zip(&input_pages) {
        assert_eq!(out_page.id, in_page.id);
        assert_eq!((out_page.width, out_page.height), (in_page.width, in_page.height));
        assert_eq!(out_page.blocks.len(), in_page.blocks.len());
        for (out_block, in_block) in out_page.blocks.iter().zip(&in_page.blocks) {
            assert_eq!(out_block.id(), in_block.id());
            assert_eq!(out_block.bbox().x, in_block.bbox().x);
            assert_eq!(out_block.bbox().y, in_block.bbox().y);
            assert_eq!(out_block.bbox().width, in_block.bbox().width);
            assert!(out_block.bbox().height >= in_block.bbox().height);
        }
    }
    let image = document.pages[0].image_blocks().next().unwrap();
    assert_eq!(image.payload.data, payload);
    assert_eq!(image.id, BlockId::new(0, 1));
}

#[tokio::test]
async fn test_translate_withVerboseBackend_shouldShrinkThenFlagOverflow() {
    init_test_logging();
    let bytes = layout_bytes(vec![page(
        0,
        vec![text_block(0, 0, BoundingBox::new(40.0, 40.0, 120.0, 14.0), "Short caption")],
    )]);
    let pipeline = pipeline_with(
        verbose_backend(),
        AdapterOptions::default(),
        PipelineConfig::new("hi")
            .with_source_language(Some("en"))
            .with_max_expansion_ratio(1.0),
    );

    let (output, report) = pipeline.translate_bytes(&bytes, None).await;

    assert!(report.is_success());
    let block_report = report.block("p0-b0").unwrap();
    assert!(block_report.has_flag(BlockFlag::Overflow));
    assert!((block_report.scale.unwrap() - 0.5).abs() < 1e-6);

    let document = decode_layout(&output.unwrap());
    let block = document.pages[0].text_blocks().next().unwrap();
    let layout = block.layout.as_ref().unwrap();
    assert!(layout.lines.len() as f32 * layout.line_height <= block.bbox.height + 0.01);
}

#[tokio::test]
async fn test_translate_withMixedLanguages_shouldUseEachBlocksLanguage() {
    init_test_logging();
    let backend = MockBackend::working();
    let bytes = layout_bytes(vec![page_of_texts(
        0,
        &[
            "The committee approved the budget for the next year",
            "यह रिपोर्ट पिछले साल की है",
            "இது ஒரு சோதனை",
        ],
    )]);
    let pipeline = pipeline_with(backend.clone(), AdapterOptions::default(), PipelineConfig::new("hi"));

    let (_output, report) = pipeline.translate_bytes(&bytes, None).await;

    // the Hindi block is already in the target language
    assert_eq!(report.block("p0-b1").unwrap().status, BlockStatus::PassedThrough);
    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().any(|c| c.source_language == "en"));
    assert!(calls.iter().any(|c| c.source_language == "ta"));
    assert!(calls.iter().all(|c| c.target_language == "hi"));
}

#[tokio::test]
async fn test_translate_withMixedScriptBlock_shouldFlagLowConfidence() {
    init_test_logging();
    let bytes = layout_bytes(vec![page_of_texts(0, &["abcd अआइई", "A plain English sentence is here"])]);

    let (output, report) = hindi_pipeline(MockBackend::working()).translate_bytes(&bytes, None).await;

    assert!(output.is_some());
    assert!(report.block("p0-b0").unwrap().has_flag(BlockFlag::LowConfidenceScript));
    assert!(!report.block("p0-b1").unwrap().has_flag(BlockFlag::LowConfidenceScript));
}

#[tokio::test]
async fn test_translate_shouldReportProgressThroughEveryPhase() {
    init_test_logging();
    let bytes = layout_bytes((0..3).map(|id| page_of_texts(id, &["Section heading"])).collect());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let on_progress = move |p: doctrans::pipeline::PipelineProgress| sink.lock().push((p.phase, p.overall()));

    let (_output, report) = hindi_pipeline(MockBackend::working())
        .translate_bytes(&bytes, Some(&on_progress))
        .await;

    assert!(report.is_success());
    let seen = seen.lock();
    assert!(seen.iter().any(|(phase, _)| *phase == PipelinePhase::Analysis));
    assert!(seen.iter().any(|(phase, _)| *phase == PipelinePhase::Rendering));
    assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1 + 1e-6));
    assert_eq!(seen.last().map(|(phase, _)| *phase), Some(PipelinePhase::Done));
}

/// OCR engine that returns one fixed text and counts its calls
#[derive(Debug, Default)]
struct ScriptedOcr {
    calls: AtomicUsize,
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract_text(&self, _region: &ImageRegion<'_>) -> Result<OcrOutput, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OcrOutput {
            text: "Scanned notice board".to_string(),
            confidence: 0.91,
        })
    }
}

#[tokio::test]
async fn test_translate_withScannedPage_shouldOcrThenTranslate() {
    init_test_logging();
    let mut scanned = page(0, vec![image_block(0, 0, BoundingBox::new(0.0, 0.0, 400.0, 60.0), &[1, 2, 3, 4])]);
    scanned.raster = true;
    let bytes = layout_bytes(vec![scanned]);
    let ocr = Arc::new(ScriptedOcr::default());
    let pipeline = hindi_pipeline(MockBackend::working()).with_ocr(ocr.clone());

    let (output, report) = pipeline.translate_bytes(&bytes, None).await;

    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    let block_report = report.block("p0-b1").unwrap();
    assert!(block_report.has_flag(BlockFlag::OcrUsed));
    assert_eq!(block_report.status, BlockStatus::Translated);

    let document = decode_layout(&output.unwrap());
    let page = &document.pages[0];
    assert_eq!(page.image_blocks().next().unwrap().payload.data, vec![1, 2, 3, 4]);
    assert_eq!(page.text_blocks().next().unwrap().text, "[hi] Scanned notice board");
}

#[tokio::test]
async fn test_translate_withScannedPageAndNoOcr_shouldFlagOcrFailure() {
    init_test_logging();
    let mut scanned = page(0, vec![image_block(0, 0, BoundingBox::new(0.0, 0.0, 400.0, 60.0), &[9, 9])]);
    scanned.raster = true;
    let bytes = layout_bytes(vec![scanned]);

    let (output, report) = hindi_pipeline(MockBackend::working()).translate_bytes(&bytes, None).await;

    assert!(output.is_some());
    assert!(report.block("p0-b1").unwrap().has_flag(BlockFlag::OcrFailed));
    assert_eq!(report.pages[0].status, PageStatus::Composed);
}

#[tokio::test]
async fn test_translate_withOneCorruptPage_shouldComposeTheOthers() {
    init_test_logging();
    let bytes = br#"%DTL-1.0
{"pages":[
 {"width":595,"height":842,"blocks":[
  {"kind":"text","bbox":{"x":40,"y":40,"width":400,"height":40},"text":"Hello"}
 ]},
 {"width":"wide","blocks":[]},
 {"width":595,"height":842,"blocks":[
  {"kind":"text","bbox":{"x":40,"y":40,"width":400,"height":40},"text":"Thank you"}
 ]}
]}"#;

    let (output, report) = hindi_pipeline(hindi_backend()).translate_bytes(bytes, None).await;

    assert_eq!(report.outcome, DocumentOutcome::Success);
    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.pages[0].status, PageStatus::Composed);
    assert_eq!(report.pages[1].status, PageStatus::Failed);
    assert!(report.pages[1].reason.as_deref().unwrap().contains("CorruptDocument"));
    assert_eq!(report.pages[2].status, PageStatus::Composed);

    let document = decode_layout(&output.unwrap());
    let ids: Vec<PageId> = document.pages.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![PageId(0), PageId(2)]);
    assert_eq!(document.pages[0].text_blocks().next().unwrap().text, "नमस्ते");
    assert_eq!(document.pages[1].text_blocks().next().unwrap().text, "धन्यवाद");
}

#[tokio::test]
async fn test_translate_cancelledMidRun_shouldFinishInFlightCallsAndStartNothing() {
    init_test_logging();
    let slow_text = format!("Appendix {}", SLOW_MARKER);
    let bytes = layout_bytes(vec![
        page_of_texts(0, &["Hello"]),
        page_of_texts(1, &[&slow_text]),
        page_of_texts(2, &["Good morning"]),
    ]);
    let backend = slow_on_marker(Duration::from_millis(400)).with_translation("Hello", "नमस्ते");
    let pipeline = pipeline_with(
        backend.clone(),
        AdapterOptions::default(),
        PipelineConfig::new("hi").with_source_language(Some("en")).with_workers(1),
    );
    let token = pipeline.cancellation_token();

    let start = Instant::now();
    let ((output, report), _) = tokio::join!(pipeline.translate_bytes(&bytes, None), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
    });

    // the in-flight call on page 1 was awaited, not aborted
    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(backend.calls_for(&slow_text), 1);
    assert_eq!(backend.calls_for("Good morning"), 0);

    assert!(report.cancelled);
    assert_eq!(report.outcome, DocumentOutcome::Success);
    assert_eq!(report.pages[0].status, PageStatus::Composed);
    assert_eq!(report.pages[1].status, PageStatus::Cancelled);
    assert_eq!(report.pages[2].status, PageStatus::Cancelled);

    let document = decode_layout(&output.unwrap());
    assert_eq!(document.page_count(), 1);
    assert_eq!(document.pages[0].text_blocks().next().unwrap().text, "नमस्ते");
}

/// Language model that blocks its thread for a fixed time per call
#[derive(Debug, Default)]
struct BlockingLanguageModel {
    threads: parking_lot::Mutex<HashSet<ThreadId>>,
}

impl LanguageModel for BlockingLanguageModel {
    fn name(&self) -> &str {
        "blocking"
    }

    fn detect(&self, _text: &str, _script: Script) -> LanguageDistribution {
        self.threads.lock().insert(std::thread::current().id());
        std::thread::sleep(Duration::from_millis(100));
        LanguageDistribution::certain("en")
    }
}

/// Run eight one-block pages; returns wall time and distinct classifier threads
async fn run_eight_pages(workers: usize) -> (Duration, usize) {
    let model = Arc::new(BlockingLanguageModel::default());
    let bytes = layout_bytes((0..8).map(|id| page_of_texts(id, &["Hello"])).collect());
    let pipeline = pipeline_with(
        hindi_backend(),
        AdapterOptions::default(),
        PipelineConfig::new("hi").with_workers(workers),
    )
    .with_classifier(ScriptClassifier::new(model.clone()));

    let start = Instant::now();
    let result = pipeline.run(&bytes, None).await;
    let elapsed = start.elapsed();

    assert!(result.is_success());
    let threads = model.threads.lock().len();
    (elapsed, threads)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_withMoreWorkers_shouldProcessPagesInParallel() {
    init_test_logging();
    let (serial, _) = run_eight_pages(1).await;
    let (parallel, threads) = run_eight_pages(4).await;

    assert!(serial >= Duration::from_millis(800), "serial run took {:?}", serial);
    assert!(parallel < Duration::from_millis(600), "parallel run took {:?}", parallel);
    assert!(threads > 1);
}
