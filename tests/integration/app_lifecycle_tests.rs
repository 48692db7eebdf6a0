/*!
 * Integration tests for the application controller: file discovery,
 * output naming, report files and skip/overwrite behavior.
 */

use std::sync::Arc;

use doctrans::app_config::Config;
use doctrans::app_controller::Controller;
use doctrans::file_utils::FileManager;
use doctrans::pipeline::{DocumentOutcome, TranslationReport};
use doctrans::providers::mock::MockBackend;

use crate::common::mock_backends::hindi_backend;
use crate::common::{
    create_temp_dir, create_test_file, decode_layout, decode_pdf, init_test_logging, layout_bytes, page_of_texts,
    pdf_bytes,
};

fn test_config() -> Config {
    let mut config = Config::default();
    config.target_language = "hi".to_string();
    config.source_language = Some("en".to_string());
    config.ocr.enabled = false;
    config
}

fn controller(backend: MockBackend) -> Controller {
    Controller::with_config(test_config())
        .unwrap()
        .with_backend(Arc::new(backend))
        .with_progress(false)
}

#[tokio::test]
async fn test_run_withValidDocument_shouldWriteOutputAndReport() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "letter.dtl", &layout_bytes(vec![page_of_texts(0, &["Hello"])])).unwrap();
    let out_dir = dir.path().join("out");

    let outcome = controller(hindi_backend())
        .run(input.clone(), out_dir.clone(), false)
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.is_success());
    let output_path = outcome.output_path.clone().unwrap();
    assert_eq!(output_path, out_dir.join("letter.hi.dtl"));
    assert_eq!(outcome.report_path, out_dir.join("letter.hi.report.json"));

    let document = decode_layout(&FileManager::read_bytes(&output_path).unwrap());
    assert_eq!(document.pages[0].text_blocks().next().unwrap().text, "नमस्ते");

    let json = std::fs::read_to_string(&outcome.report_path).unwrap();
    let report: TranslationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report.outcome, DocumentOutcome::Success);
    assert_eq!(report.target_language, "hi");
    assert_eq!(report.backend, "mock");
    assert_eq!(report.input_sha256.len(), 64);
}

#[tokio::test]
async fn test_run_withCorruptDocument_shouldWriteOnlyTheReport() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "broken.dtl", b"%DTL-1.0\n{bad").unwrap();

    let outcome = controller(MockBackend::working())
        .run(input, dir.path().to_path_buf(), false)
        .await
        .unwrap()
        .unwrap();

    assert!(!outcome.is_success());
    assert!(outcome.output_path.is_none());
    assert!(!dir.path().join("broken.hi.dtl").exists());
    assert!(outcome.report_path.exists());
    assert!(outcome.report.errors.iter().any(|e| e.contains("CorruptDocument")));
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "memo.dtl", &layout_bytes(vec![page_of_texts(0, &["Thank you"])])).unwrap();
    create_test_file(dir.path(), "memo.hi.dtl", b"stale").unwrap();

    let backend = hindi_backend();
    let controller = controller(backend.clone());

    let skipped = controller.run(input.clone(), dir.path().to_path_buf(), false).await.unwrap();
    assert!(skipped.is_none());
    assert_eq!(backend.call_count(), 0);

    let forced = controller.run(input, dir.path().to_path_buf(), true).await.unwrap();
    assert!(forced.unwrap().is_success());
    let document = decode_layout(&std::fs::read(dir.path().join("memo.hi.dtl")).unwrap());
    assert_eq!(document.pages[0].text_blocks().next().unwrap().text, "धन्यवाद");
}

#[tokio::test]
async fn test_runFolder_shouldTranslateEveryDocumentAndSkipOutputs() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let nested = dir.path().join("chapters");
    std::fs::create_dir_all(&nested).unwrap();
    create_test_file(dir.path(), "a.dtl", &layout_bytes(vec![page_of_texts(0, &["Good morning"])])).unwrap();
    create_test_file(&nested, "b.dtl", &layout_bytes(vec![page_of_texts(0, &["Hello"])])).unwrap();
    create_test_file(dir.path(), "old.ta.dtl", &layout_bytes(vec![page_of_texts(0, &["x"])])).unwrap();
    create_test_file(dir.path(), "notes.txt", b"not a document").unwrap();

    let outcomes = controller(hindi_backend())
        .run_folder(dir.path().to_path_buf(), None, false)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(dir.path().join("a.hi.dtl").exists());
    assert!(nested.join("b.hi.dtl").exists());
    assert!(!dir.path().join("old.ta.hi.dtl").exists());
}

#[tokio::test]
async fn test_run_withPdfInput_shouldWritePdfOutput() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "memo.pdf", &pdf_bytes(vec![page_of_texts(0, &["Thank you"])])).unwrap();

    let outcome = controller(hindi_backend())
        .run(input, dir.path().to_path_buf(), false)
        .await
        .unwrap()
        .unwrap();

    let output_path = outcome.output_path.clone().unwrap();
    assert_eq!(output_path, dir.path().join("memo.hi.pdf"));
    let document = decode_pdf(&FileManager::read_bytes(&output_path).unwrap());
    assert_eq!(document.pages[0].text_blocks().next().unwrap().text, "धन्यवाद");
}

#[tokio::test]
async fn test_runFolder_withOutputDir_shouldMirrorTheInputTree() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = dir.path().join("in");
    let nested = input.join("chapters");
    std::fs::create_dir_all(&nested).unwrap();
    create_test_file(&input, "a.dtl", &layout_bytes(vec![page_of_texts(0, &["Good morning"])])).unwrap();
    create_test_file(&nested, "b.dtl", &layout_bytes(vec![page_of_texts(0, &["Hello"])])).unwrap();
    let out = dir.path().join("out");

    let outcomes = controller(hindi_backend())
        .run_folder(input.clone(), Some(out.clone()), false)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(out.join("a.hi.dtl").exists());
    assert!(out.join("a.hi.report.json").exists());
    assert!(out.join("chapters").join("b.hi.dtl").exists());
    assert!(!input.join("a.hi.dtl").exists());
    assert!(!nested.join("b.hi.dtl").exists());
}

#[tokio::test]
async fn test_runFolder_afterCancellation_shouldStartNothing() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "a.dtl", &layout_bytes(vec![page_of_texts(0, &["Hello"])])).unwrap();

    let backend = MockBackend::working();
    let controller = controller(backend.clone());
    controller.cancellation_token().cancel();

    let outcomes = controller.run_folder(dir.path().to_path_buf(), None, false).await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[test]
fn test_withConfig_withInvalidRatio_shouldFail() {
    let mut config = test_config();
    config.layout.max_expansion_ratio = 0.5;
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_testConnection_withMockBackend_shouldSucceed() {
    let controller = controller(MockBackend::working());
    assert!(tokio_test::block_on(controller.test_connection()).is_ok());
}
