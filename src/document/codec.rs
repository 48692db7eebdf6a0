/*!
 * Container codecs.
 *
 * A codec recognizes a byte signature, decodes the container into a
 * `Document`, and encodes a `Document` back into the same container.
 * Two codecs are bundled: the `%DTL-` layout container (a signature line
 * followed by a JSON body, handled here) and PDF (see `pdf`).
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ExtractError;

use super::model::{BlockId, Document, Page, PageId, SourceFormat};
use super::pdf::PdfCodec;

/// Layout container magic bytes: %DTL-
pub const LAYOUT_MAGIC: &[u8] = b"%DTL-";
/// PDF magic bytes: %PDF-
pub const PDF_MAGIC: &[u8] = b"%PDF-";
/// Highest layout container major version this build reads
pub const LAYOUT_MAJOR_VERSION: u8 = 1;

/// Longest accepted signature line, e.g. `%DTL-1.0`
const MAX_SIGNATURE_LEN: usize = 16;

/// Result of decoding a container: readable pages plus per-page failures
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub document: Document,
    pub page_failures: Vec<(PageId, ExtractError)>,
}

/// A document container format
pub trait DocumentCodec: Send + Sync {
    /// Short format name used in logs and reports
    fn name(&self) -> &'static str;

    /// Whether the bytes carry this codec's signature
    fn detect(&self, bytes: &[u8]) -> bool;

    /// Decode the container. Envelope failures are fatal for the document;
    /// unreadable pages are returned as page failures.
    fn decode(&self, bytes: &[u8]) -> std::result::Result<DecodedDocument, ExtractError>;

    /// Encode a document back into this container
    fn encode(&self, document: &Document) -> Result<Vec<u8>>;
}

/// Pick the codec for a byte stream by signature
pub fn codec_for_bytes(bytes: &[u8]) -> std::result::Result<&'static dyn DocumentCodec, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::UnsupportedFormat("empty input".to_string()));
    }
    if LAYOUT_CODEC.detect(bytes) {
        return Ok(&LAYOUT_CODEC);
    }
    if PDF_CODEC.detect(bytes) {
        return Ok(&PDF_CODEC);
    }
    Err(ExtractError::UnsupportedFormat("unrecognized byte signature".to_string()))
}

/// Pick the codec that writes a given source format
pub fn codec_for_format(format: &SourceFormat) -> &'static dyn DocumentCodec {
    match format {
        SourceFormat::Layout { .. } => &LAYOUT_CODEC,
        SourceFormat::Pdf { .. } => &PDF_CODEC,
    }
}

static LAYOUT_CODEC: LayoutCodec = LayoutCodec;
static PDF_CODEC: PdfCodec = PdfCodec;

/// Codec for the `%DTL-<major>.<minor>` layout container
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutCodec;

#[derive(Deserialize)]
struct EnvelopeIn {
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    pages: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    metadata: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dominant_language: Option<&'a str>,
    pages: &'a [Page],
}

impl LayoutCodec {
    /// Split the signature line from the body and parse its version
    fn parse_signature(bytes: &[u8]) -> std::result::Result<(u8, u8, &[u8]), ExtractError> {
        let line_end = bytes
            .iter()
            .take(MAX_SIGNATURE_LEN + 1)
            .position(|&b| b == b'\n')
            .ok_or_else(|| ExtractError::CorruptDocument("signature line is not terminated".to_string()))?;

        let signature = std::str::from_utf8(&bytes[LAYOUT_MAGIC.len()..line_end])
            .map_err(|_| ExtractError::CorruptDocument("signature is not valid UTF-8".to_string()))?
            .trim_end_matches('\r');

        let (major, minor) = signature
            .split_once('.')
            .and_then(|(ma, mi)| Some((ma.parse::<u8>().ok()?, mi.parse::<u8>().ok()?)))
            .ok_or_else(|| ExtractError::CorruptDocument(format!("invalid container version '{}'", signature)))?;

        if major == 0 || major > LAYOUT_MAJOR_VERSION {
            return Err(ExtractError::CorruptDocument(format!(
                "unsupported container version {}.{}",
                major, minor
            )));
        }

        Ok((major, minor, &bytes[line_end + 1..]))
    }

    fn decode_page(index: usize, value: serde_json::Value) -> std::result::Result<Page, ExtractError> {
        let mut page: Page = serde_json::from_value(value)
            .map_err(|e| ExtractError::CorruptDocument(format!("page {}: {}", index, e)))?;

        // Stored ids are ignored so decoded pages and failures share one numbering.
        page.id = PageId(index);
        if !(page.width.is_finite() && page.height.is_finite()) || page.width <= 0.0 || page.height <= 0.0 {
            return Err(ExtractError::CorruptDocument(format!(
                "page {}: invalid page size {}x{}",
                index, page.width, page.height
            )));
        }

        let page_no = page.id.0;
        for (block_index, block) in page.blocks.iter_mut().enumerate() {
            let bbox = *block.bbox();
            if ![bbox.x, bbox.y, bbox.width, bbox.height].iter().all(|v| v.is_finite())
                || bbox.width < 0.0
                || bbox.height < 0.0
            {
                return Err(ExtractError::CorruptDocument(format!(
                    "page {}: block {} has an invalid bounding box",
                    index, block_index
                )));
            }
            block.set_id(BlockId::new(page_no, block_index));
        }

        Ok(page)
    }
}

impl DocumentCodec for LayoutCodec {
    fn name(&self) -> &'static str {
        "dtl"
    }

    fn detect(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(LAYOUT_MAGIC)
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<DecodedDocument, ExtractError> {
        if !self.detect(bytes) {
            return Err(ExtractError::UnsupportedFormat("missing %DTL- signature".to_string()));
        }

        let (major, minor, body) = Self::parse_signature(bytes)?;
        let envelope: EnvelopeIn = serde_json::from_slice(body)
            .map_err(|e| ExtractError::CorruptDocument(format!("unreadable document body: {}", e)))?;

        debug!("Decoding layout container {}.{} with {} page(s)", major, minor, envelope.pages.len());

        let mut pages = Vec::with_capacity(envelope.pages.len());
        let mut page_failures = Vec::new();

        for (index, value) in envelope.pages.into_iter().enumerate() {
            match Self::decode_page(index, value) {
                Ok(page) => pages.push(page),
                Err(e) => {
                    warn!("Failed to decode page {}: {}", index, e);
                    page_failures.push((PageId(index), e));
                }
            }
        }

        let mut document = Document::new(SourceFormat::Layout { major, minor }, pages);
        document.metadata = envelope.metadata;

        Ok(DecodedDocument { document, page_failures })
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        let (major, minor) = match document.format {
            SourceFormat::Layout { major, minor } => (major, minor),
            SourceFormat::Pdf { .. } => (LAYOUT_MAJOR_VERSION, 0),
        };
        let envelope = EnvelopeOut {
            metadata: &document.metadata,
            dominant_language: document.dominant_language.as_deref(),
            pages: &document.pages,
        };

        let mut out = format!("%DTL-{}.{}\n", major, minor).into_bytes();
        serde_json::to_writer_pretty(&mut out, &envelope).context("Failed to serialize layout container")?;
        out.push(b'\n');
        Ok(out)
    }
}
