/*!
 * Core document model types for layout-preserving translation.
 *
 * A `Document` is an ordered list of `Page`s, each owning positioned
 * `Block`s. Blocks are a tagged union of text and image regions; image
 * payloads are opaque and copied through unchanged.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::classification::Script;

/// Stable page identifier (position of the page in the source document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PageId(pub usize);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Stable block identifier: owning page plus position within that page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct BlockId {
    /// Owning page
    pub page: usize,
    /// Position of the block within the page
    pub index: usize,
}

impl BlockId {
    pub fn new(page: usize, index: usize) -> Self {
        Self { page, index }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}-b{}", self.page, self.index)
    }
}

/// Axis-aligned box in device-independent units, origin at the page's top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    #[serde(alias = "w")]
    pub width: f32,
    #[serde(alias = "h")]
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Area of the box; degenerate boxes count as zero
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Same origin and width, different height
    pub fn with_height(&self, height: f32) -> Self {
        Self { height, ..*self }
    }
}

/// Font used to render a text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescriptor {
    #[serde(default = "default_font_family")]
    pub family: String,
    #[serde(default = "default_font_size")]
    pub size: f32,
    #[serde(default = "default_font_weight")]
    pub weight: u16,
}

impl FontDescriptor {
    pub fn new(family: impl Into<String>, size: f32, weight: u16) -> Self {
        Self {
            family: family.into(),
            size,
            weight,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: default_font_family(),
            size: default_font_size(),
            weight: default_font_weight(),
        }
    }
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f32 {
    11.0
}

fn default_font_weight() -> u16 {
    400
}

/// Language code → probability. Normalized distributions sum to 1 ± ε.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LanguageDistribution(BTreeMap<String, f32>);

impl LanguageDistribution {
    /// Build a distribution from raw weights, dropping non-positive entries and normalizing
    pub fn from_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (lang, weight) in weights {
            if weight > 0.0 && weight.is_finite() {
                *map.entry(lang.into()).or_insert(0.0) += weight;
            }
        }
        let mut dist = Self(map);
        dist.normalize();
        dist
    }

    /// Distribution with all mass on one language
    pub fn certain(language: &str) -> Self {
        Self::from_weights([(language, 1.0)])
    }

    fn normalize(&mut self) {
        let total: f32 = self.0.values().sum();
        if total > 0.0 {
            for value in self.0.values_mut() {
                *value /= total;
            }
        }
    }

    pub fn probability(&self, language: &str) -> f32 {
        self.0.get(language).copied().unwrap_or(0.0)
    }

    /// Most probable language; ties go to the lexicographically smallest code
    pub fn top(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        // BTreeMap iterates in code order, so strict > keeps the smallest code on ties
        for (lang, &p) in &self.0 {
            match best {
                Some((_, bp)) if p <= bp => {}
                _ => best = Some((lang.as_str(), p)),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> f32 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Rendered layout of a text block after reflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayout {
    /// Chosen scale relative to the source font size
    pub scale: f32,
    /// Effective font size (source size × scale)
    pub font_size: f32,
    /// Distance between consecutive baselines
    pub line_height: f32,
    /// Wrapped lines, top to bottom
    pub lines: Vec<String>,
}

/// Positioned run of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub id: BlockId,
    pub bbox: BoundingBox,
    /// Offset of the first baseline from the top of the box
    #[serde(default)]
    pub baseline: f32,
    #[serde(default)]
    pub font: FontDescriptor,
    #[serde(default)]
    pub text: String,
    /// Set on regions of scanned pages whose text must come from OCR
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_ocr: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    #[serde(default, skip_serializing_if = "LanguageDistribution::is_empty")]
    pub languages: LanguageDistribution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<TextLayout>,
}

impl TextBlock {
    pub fn new(id: BlockId, bbox: BoundingBox, font: FontDescriptor, text: impl Into<String>) -> Self {
        Self {
            id,
            bbox,
            baseline: font.size,
            font,
            text: text.into(),
            needs_ocr: false,
            script: None,
            languages: LanguageDistribution::default(),
            layout: None,
        }
    }

    /// Empty placeholder covering a raster region that OCR will fill in
    pub fn ocr_placeholder(id: BlockId, bbox: BoundingBox) -> Self {
        Self {
            needs_ocr: true,
            ..Self::new(id, bbox, FontDescriptor::default(), String::new())
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Opaque raster or vector payload of a non-text region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

fn default_media_type() -> String {
    "application/octet-stream".to_string()
}

/// Non-text region, never mutated by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub id: BlockId,
    pub bbox: BoundingBox,
    pub payload: ImagePayload,
}

/// A page element: text or non-text region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn id(&self) -> BlockId {
        match self {
            Block::Text(t) => t.id,
            Block::Image(i) => i.id,
        }
    }

    pub fn bbox(&self) -> &BoundingBox {
        match self {
            Block::Text(t) => &t.bbox,
            Block::Image(i) => &i.bbox,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Block::Text(t) => Some(t),
            Block::Image(_) => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: BlockId) {
        match self {
            Block::Text(t) => t.id = id,
            Block::Image(i) => i.id = id,
        }
    }
}

/// One page: size plus ordered blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: PageId,
    pub width: f32,
    pub height: f32,
    /// Page is a scan: its text lives only in raster regions
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub raster: bool,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn text_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter_map(Block::as_text)
    }

    pub fn text_blocks_mut(&mut self) -> impl Iterator<Item = &mut TextBlock> {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Text(t) => Some(t),
            Block::Image(_) => None,
        })
    }

    pub fn image_blocks(&self) -> impl Iterator<Item = &ImageBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image(i) => Some(i),
            Block::Text(_) => None,
        })
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }
}

/// Container format the document was decoded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum SourceFormat {
    /// `%DTL-<major>.<minor>` layout container
    Layout { major: u8, minor: u8 },
    /// PDF with its header version, e.g. `1.7`
    Pdf { version: String },
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Layout { major, minor } => write!(f, "dtl {}.{}", major, minor),
            SourceFormat::Pdf { version } => write!(f, "pdf {}", version),
        }
    }
}

/// Complete document: ordered pages plus container metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub format: SourceFormat,
    pub pages: Vec<Page>,
    pub metadata: BTreeMap<String, String>,
    pub dominant_language: Option<String>,
}

impl Document {
    pub fn new(format: SourceFormat, pages: Vec<Page>) -> Self {
        Self {
            format,
            pages,
            metadata: BTreeMap::new(),
            dominant_language: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
