/*!
 * Common test utilities for the doctrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use doctrans::document::{
    Block, BlockId, BoundingBox, Document, DocumentCodec, FontDescriptor, ImageBlock, ImagePayload, LayoutCodec, Page,
    PageId, PdfCodec, SourceFormat, TextBlock,
};
use doctrans::pipeline::{DocumentPipeline, PipelineConfig};
use doctrans::providers::mock::MockBackend;
use doctrans::translation::{AdapterOptions, TranslationAdapter};

// Re-export the mock backends module
pub mod mock_backends;

/// Route `log` output through the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Text block with the default 11pt font
pub fn text_block(page: usize, index: usize, bbox: BoundingBox, text: &str) -> Block {
    Block::Text(TextBlock::new(
        BlockId::new(page, index),
        bbox,
        FontDescriptor::new("Helvetica", 11.0, 400),
        text,
    ))
}

/// Small PNG-tagged image block
pub fn image_block(page: usize, index: usize, bbox: BoundingBox, data: &[u8]) -> Block {
    Block::Image(ImageBlock {
        id: BlockId::new(page, index),
        bbox,
        payload: ImagePayload {
            media_type: "image/png".to_string(),
            data: data.to_vec(),
        },
    })
}

/// A4-ish page holding `blocks`
pub fn page(id: usize, blocks: Vec<Block>) -> Page {
    Page {
        id: PageId(id),
        width: 595.0,
        height: 842.0,
        raster: false,
        blocks,
    }
}

/// Page with one text block per entry, stacked vertically
pub fn page_of_texts(id: usize, texts: &[&str]) -> Page {
    let blocks = texts
        .iter()
        .enumerate()
        .map(|(index, text)| text_block(id, index, BoundingBox::new(40.0, 40.0 + index as f32 * 60.0, 400.0, 40.0), text))
        .collect();
    page(id, blocks)
}

/// Encode pages into a `%DTL-1.0` container
pub fn layout_bytes(pages: Vec<Page>) -> Vec<u8> {
    let document = Document::new(SourceFormat::Layout { major: 1, minor: 0 }, pages);
    LayoutCodec.encode(&document).unwrap()
}

/// Encode pages into a PDF 1.7 file
pub fn pdf_bytes(pages: Vec<Page>) -> Vec<u8> {
    let document = Document::new(SourceFormat::Pdf { version: "1.7".to_string() }, pages);
    PdfCodec.encode(&document).unwrap()
}

/// Decode a PDF produced by the pipeline
pub fn decode_pdf(bytes: &[u8]) -> Document {
    PdfCodec.decode(bytes).unwrap().document
}

/// Decode a `%DTL-` container produced by the pipeline
pub fn decode_layout(bytes: &[u8]) -> Document {
    LayoutCodec.decode(bytes).unwrap().document
}

/// Pipeline over a mock backend with the given adapter options
pub fn pipeline_with(backend: MockBackend, options: AdapterOptions, config: PipelineConfig) -> DocumentPipeline {
    let adapter = Arc::new(TranslationAdapter::new(Arc::new(backend), options));
    DocumentPipeline::new(config, adapter)
}

/// English → Hindi pipeline with default adapter options
pub fn hindi_pipeline(backend: MockBackend) -> DocumentPipeline {
    pipeline_with(
        backend,
        AdapterOptions::default(),
        PipelineConfig::new("hi").with_source_language(Some("en")).with_workers(2),
    )
}
