/*!
 * Glyph/block extractor.
 *
 * Decodes document bytes through the matching container codec and prepares
 * scanned pages for OCR: every image region of a raster page gets an empty
 * `needs_ocr` text block with the same bounding box. Placeholders are
 * appended after the existing blocks so source block ids never shift, and
 * they are drawn over the scan they describe.
 */

pub mod ocr;

use log::{debug, warn};

use crate::document::{Block, BlockId, DecodedDocument, Page, TextBlock, codec_for_bytes};
use crate::errors::{ExtractError, OcrError};

pub use self::ocr::{ImageRegion, OcrEngine, OcrOutput, TesseractCli, parse_tsv, script_for_language};

/// Outcome of filling one OCR placeholder
#[derive(Debug, Clone)]
pub struct OcrFill {
    pub block_id: BlockId,
    /// Engine confidence on success
    pub result: Result<f32, OcrError>,
}

/// Document extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Decode `bytes` into pages and blocks
    ///
    /// Fails with `UnsupportedFormat` for unknown signatures and with
    /// `CorruptDocument` when the container envelope cannot be read.
    /// Pages that fail individually are returned in `page_failures`.
    pub fn extract(&self, bytes: &[u8]) -> Result<DecodedDocument, ExtractError> {
        let codec = codec_for_bytes(bytes)?;
        let mut decoded = codec.decode(bytes)?;

        let mut placeholders = 0;
        for page in &mut decoded.document.pages {
            placeholders += Self::mark_raster_regions(page);
        }

        debug!(
            "Extracted {} page(s) via {} codec ({} OCR region(s), {} page failure(s))",
            decoded.document.page_count(),
            codec.name(),
            placeholders,
            decoded.page_failures.len()
        );

        Ok(decoded)
    }

    /// Whether a page's text lives only in raster regions
    pub fn is_raster_page(page: &Page) -> bool {
        page.raster || (page.text_blocks().next().is_none() && page.image_blocks().next().is_some())
    }

    /// Add a `needs_ocr` placeholder for every uncovered image of a raster page
    ///
    /// Returns the number of placeholders added. Images that already carry a
    /// text block with the identical bounding box are left alone, so running
    /// this twice adds nothing.
    pub fn mark_raster_regions(page: &mut Page) -> usize {
        if !Self::is_raster_page(page) {
            return 0;
        }

        let uncovered: Vec<_> = page
            .image_blocks()
            .filter(|image| !page.text_blocks().any(|t| t.bbox == image.bbox))
            .map(|image| image.bbox)
            .collect();

        for bbox in &uncovered {
            let id = BlockId::new(page.id.0, page.blocks.len());
            page.blocks.push(Block::Text(TextBlock::ocr_placeholder(id, *bbox)));
        }

        uncovered.len()
    }
}

/// Run OCR on every `needs_ocr` block of `page`
///
/// Each placeholder reads the image block sharing its bounding box. Without an
/// engine every placeholder fails with `OcrError::Unavailable` and stays empty.
pub async fn fill_ocr_regions(page: &mut Page, engine: Option<&dyn OcrEngine>, language_hint: Option<&str>) -> Vec<OcrFill> {
    let pending: Vec<(usize, BlockId)> = page
        .blocks
        .iter()
        .enumerate()
        .filter_map(|(i, b)| match b {
            Block::Text(t) if t.needs_ocr && !t.has_text() => Some((i, t.id)),
            _ => None,
        })
        .collect();

    let mut fills = Vec::with_capacity(pending.len());
    for (index, block_id) in pending {
        let bbox = *page.blocks[index].bbox();
        let recognized = match engine {
            None => Err(OcrError::Unavailable),
            Some(engine) => match page.image_blocks().find(|image| image.bbox == bbox) {
                None => Err(OcrError::InvalidPayload(format!("no image region under {}", block_id))),
                Some(image) => {
                    let region = ImageRegion {
                        block_id,
                        bbox,
                        payload: &image.payload,
                        language_hint,
                    };
                    engine.extract_text(&region).await
                }
            },
        };

        let result = match recognized {
            Ok(output) => {
                debug!("OCR filled {} with {} char(s)", block_id, output.text.chars().count());
                if let Block::Text(text) = &mut page.blocks[index] {
                    text.text = output.text;
                }
                Ok(output.confidence)
            }
            Err(e) => {
                warn!("OCR failed for {}: {}", block_id, e);
                Err(e)
            }
        };
        fills.push(OcrFill { block_id, result });
    }

    fills
}
