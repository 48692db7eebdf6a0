/*!
 * PDF codec.
 *
 * Decoding walks each page's content stream and tracks the graphics and
 * text state: every `BT`..`ET` object becomes one text block, every image
 * XObject drawn with `Do` becomes an image block placed by the current
 * transformation matrix. Coordinates are flipped to a top-left origin.
 *
 * Encoding rebuilds a fresh PDF: text is set in the standard Helvetica
 * fonts with WinAnsi encoding, and each block is wrapped in a marked
 * content span whose `/ActualText` carries the exact Unicode text, so
 * glyphs outside WinAnsi survive a decode of the output.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;

use crate::errors::ExtractError;
use crate::layout::{GlyphMetrics, HeuristicMetrics};

use super::codec::{DecodedDocument, DocumentCodec, PDF_MAGIC};
use super::model::{
    Block, BlockId, BoundingBox, Document, FontDescriptor, ImageBlock, ImagePayload, Page, PageId, SourceFormat,
    TextBlock,
};

/// Media type of PDF image samples that are not a standalone image file
pub const PDF_IMAGE_MEDIA_TYPE: &str = "application/x-pdf-image";

/// US Letter, used when a page has no readable MediaBox
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);
/// Share of the font size above the baseline, including half the line gap
const ASCENT: f32 = 0.9;
/// Share of the font size below the baseline, including half the line gap
const DESCENT: f32 = 0.3;
/// Guard against cyclic page trees when resolving inherited attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Codec for PDF documents
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfCodec;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied first, then `n`
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Axis-aligned rectangle in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl Rect {
    fn union(self, other: Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    fn of_points(points: &[(f32, f32)]) -> Rect {
        let mut rect = Rect {
            x0: f32::INFINITY,
            y0: f32::INFINITY,
            x1: f32::NEG_INFINITY,
            y1: f32::NEG_INFINITY,
        };
        for &(x, y) in points {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        rect
    }
}

/// Page box in user space: lower-left corner plus size
#[derive(Debug, Clone, Copy)]
struct MediaBox {
    llx: f32,
    lly: f32,
    width: f32,
    height: f32,
}

impl MediaBox {
    /// Top-left-origin box of a user-space rectangle
    fn to_bbox(self, rect: Rect) -> BoundingBox {
        let top = self.lly + self.height;
        BoundingBox::new(rect.x0 - self.llx, top - rect.y1, rect.x1 - rect.x0, rect.y1 - rect.y0)
    }
}

/// Text object being collected between `BT` and `ET`
#[derive(Debug)]
struct OpenText {
    text: String,
    rect: Option<Rect>,
    first_baseline: Option<f32>,
    last_baseline: Option<f32>,
    font: Option<FontDescriptor>,
}

impl OpenText {
    fn new() -> Self {
        Self {
            text: String::new(),
            rect: None,
            first_baseline: None,
            last_baseline: None,
            font: None,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() && !self.text.ends_with(' ') && !text.starts_with(' ') {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }
}

/// A page element in content-stream order, still in user space
#[derive(Debug)]
enum Item {
    Text(OpenText),
    Image(Rect, ImagePayload),
}

/// Marked-content section opened by `BMC` or `BDC`
#[derive(Debug)]
struct Marked {
    actual_text: Option<String>,
    items_before: usize,
}

/// Content-stream interpreter for one page
struct PageScanner<'a> {
    doc: &'a lopdf::Document,
    resources: Option<&'a Dictionary>,
    metrics: HeuristicMetrics,
    ctm: Matrix,
    saved: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font: FontDescriptor,
    font_size: f32,
    marked: Vec<Marked>,
    open: Option<OpenText>,
    items: Vec<Item>,
}

impl<'a> PageScanner<'a> {
    fn new(doc: &'a lopdf::Document, resources: Option<&'a Dictionary>) -> Self {
        Self {
            doc,
            resources,
            metrics: HeuristicMetrics::new(),
            ctm: IDENTITY,
            saved: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
            leading: 0.0,
            font: FontDescriptor::default(),
            font_size: 0.0,
            marked: Vec::new(),
            open: None,
            items: Vec::new(),
        }
    }

    fn run(mut self, operations: &[Operation]) -> Vec<Item> {
        for op in operations {
            self.step(op);
        }
        self.close_text();
        self.items
    }

    fn step(&mut self, op: &Operation) {
        let num = |i: usize| op.operands.get(i).and_then(|o| o.as_float().ok()).unwrap_or(0.0);
        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => self.ctm = self.saved.pop().unwrap_or(IDENTITY),
            "cm" => self.ctm = multiply(&[num(0), num(1), num(2), num(3), num(4), num(5)], &self.ctm),
            "BT" => {
                self.close_text();
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
                self.open = Some(OpenText::new());
            }
            "ET" => self.close_text(),
            "Tf" => {
                self.font_size = num(1);
                if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                    self.font = self.font_descriptor(name);
                }
            }
            "TL" => self.leading = num(0),
            "Td" => self.move_line(num(0), num(1)),
            "TD" => {
                self.leading = -num(1);
                self.move_line(num(0), num(1));
            }
            "T*" => self.move_line(0.0, -self.leading),
            "Tm" => {
                self.tlm = [num(0), num(1), num(2), num(3), num(4), num(5)];
                self.tm = self.tlm;
            }
            "Tj" | "TJ" => {
                if let Some(operand) = op.operands.first() {
                    self.show(operand);
                }
            }
            "'" => {
                self.move_line(0.0, -self.leading);
                if let Some(operand) = op.operands.first() {
                    self.show(operand);
                }
            }
            "\"" => {
                self.move_line(0.0, -self.leading);
                if let Some(operand) = op.operands.get(2) {
                    self.show(operand);
                }
            }
            "BMC" => self.marked.push(Marked {
                actual_text: None,
                items_before: self.items.len(),
            }),
            "BDC" => {
                let actual_text = op
                    .operands
                    .get(1)
                    .and_then(|o| resolve_dict(self.doc, o))
                    .and_then(|d| d.get(b"ActualText").ok())
                    .and_then(|o| o.as_str().ok())
                    .map(decode_pdf_string);
                self.marked.push(Marked {
                    actual_text,
                    items_before: self.items.len(),
                });
            }
            "EMC" => self.end_marked(),
            "Do" => {
                if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                    self.draw_xobject(name);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = multiply(&translation(tx, ty), &self.tlm);
        self.tm = self.tlm;
    }

    fn suppressed(&self) -> bool {
        self.marked.iter().any(|m| m.actual_text.is_some())
    }

    /// Show a string or a `TJ` array at the current text position
    fn show(&mut self, operand: &Object) {
        let mut shown = String::new();
        let mut advance = 0.0;
        match operand {
            Object::String(bytes, _) => {
                let text = decode_pdf_string(bytes);
                advance += self.metrics.advance(&text, &self.font, self.font_size);
                shown.push_str(&text);
            }
            Object::Array(parts) => {
                for part in parts {
                    match part {
                        Object::String(bytes, _) => {
                            let text = decode_pdf_string(bytes);
                            advance += self.metrics.advance(&text, &self.font, self.font_size);
                            shown.push_str(&text);
                        }
                        other => {
                            let adjust = other.as_float().unwrap_or(0.0);
                            advance -= adjust / 1000.0 * self.font_size;
                            // Wide negative kerning separates words
                            if adjust < -100.0 {
                                shown.push(' ');
                            }
                        }
                    }
                }
            }
            _ => return,
        }

        let render = multiply(&self.tm, &self.ctm);
        let (x, y) = apply(&render, 0.0, 0.0);
        let (x_end, _) = apply(&render, advance, 0.0);
        let size = self.font_size * render[2].hypot(render[3]);
        self.tm = multiply(&translation(advance, 0.0), &self.tm);

        let suppressed = self.suppressed();
        let font = FontDescriptor {
            size,
            ..self.font.clone()
        };
        let open = self.open.get_or_insert_with(OpenText::new);
        let rect = Rect {
            x0: x.min(x_end),
            y0: y - size * DESCENT,
            x1: x.max(x_end),
            y1: y + size * ASCENT,
        };
        open.rect = Some(open.rect.map_or(rect, |r| r.union(rect)));
        if open.first_baseline.is_none() {
            open.first_baseline = Some(y);
            open.font = Some(font);
        }

        if !suppressed {
            let new_line = open.last_baseline.is_some_and(|b| (b - y).abs() > size * 0.5);
            if new_line {
                open.push_text(&shown);
            } else {
                open.text.push_str(&shown);
            }
        }
        open.last_baseline = Some(y);
    }

    fn close_text(&mut self) {
        if let Some(open) = self.open.take() {
            if open.rect.is_some() {
                self.items.push(Item::Text(open));
            }
        }
    }

    fn end_marked(&mut self) {
        let Some(marked) = self.marked.pop() else {
            return;
        };
        let Some(actual) = marked.actual_text else {
            return;
        };
        if let Some(open) = self.open.as_mut() {
            open.push_text(&actual);
            return;
        }
        if self.items.len() > marked.items_before {
            if let Some(Item::Text(last)) = self.items.last_mut() {
                last.push_text(&actual);
            }
        }
    }

    fn font_descriptor(&self, resource: &[u8]) -> FontDescriptor {
        let base_font = self
            .resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve_dict(self.doc, f))
            .and_then(|fonts| fonts.get(resource).ok())
            .and_then(|f| resolve_dict(self.doc, f))
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|b| b.as_name().ok())
            .map(|b| String::from_utf8_lossy(b).into_owned());

        let Some(base_font) = base_font else {
            return FontDescriptor::default();
        };
        // Subset fonts carry a six-letter tag, e.g. ABCDEF+Helvetica-Bold
        let name = base_font.split_once('+').map_or(base_font.as_str(), |(_, rest)| rest);
        let family = name.split(['-', ',']).next().unwrap_or(name);
        let lowered = name.to_ascii_lowercase();
        let weight = if lowered.contains("bold") || lowered.contains("black") || lowered.contains("heavy") {
            700
        } else {
            400
        };
        FontDescriptor::new(family, FontDescriptor::default().size, weight)
    }

    fn draw_xobject(&mut self, name: &[u8]) {
        let stream = self
            .resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve_dict(self.doc, x))
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|o| resolve(self.doc, o))
            .and_then(|o| o.as_stream().ok());
        let Some(stream) = stream else {
            debug!("XObject /{} not found", String::from_utf8_lossy(name));
            return;
        };
        if stream.dict.get(b"Subtype").and_then(|s| s.as_name()).ok() != Some(b"Image".as_slice()) {
            return;
        }

        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(x, y)| apply(&self.ctm, x, y));
        self.close_text();
        self.items.push(Item::Image(Rect::of_points(&corners), image_payload(self.doc, stream)));
    }
}

/// Payload of an image XObject
///
/// JPEG and JPEG 2000 streams are kept as files; any other stream is
/// stored as decoded samples with its geometry in media type parameters.
fn image_payload(doc: &lopdf::Document, stream: &Stream) -> ImagePayload {
    let dict = &stream.dict;
    let int = |key: &[u8]| dict.get(key).and_then(|o| o.as_i64()).unwrap_or(0);
    let filter = dict
        .get(b"Filter")
        .ok()
        .and_then(|f| match resolve(doc, f)? {
            Object::Array(filters) => filters.last(),
            other => Some(other),
        })
        .and_then(|f| f.as_name().ok())
        .unwrap_or_default();
    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|c| resolve(doc, c))
        .and_then(|c| c.as_name().ok())
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .unwrap_or_else(|| "DeviceRGB".to_string());

    let params = format!(
        "width={}; height={}; bpc={}; cs={}",
        int(b"Width"),
        int(b"Height"),
        int(b"BitsPerComponent").max(1),
        color_space
    );
    match filter {
        b"DCTDecode" => ImagePayload {
            media_type: format!("image/jpeg; {}", params),
            data: stream.content.clone(),
        },
        b"JPXDecode" => ImagePayload {
            media_type: format!("image/jp2; {}", params),
            data: stream.content.clone(),
        },
        _ => ImagePayload {
            media_type: format!("{}; {}", PDF_IMAGE_MEDIA_TYPE, params),
            data: stream.decompressed_content().unwrap_or_else(|_| stream.content.clone()),
        },
    }
}

fn resolve<'a>(doc: &'a lopdf::Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a lopdf::Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, object)?.as_dict().ok()
}

/// Page attribute, following `/Parent` links for inherited keys
fn inherited<'a>(doc: &'a lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn media_box(doc: &lopdf::Document, page_id: ObjectId) -> MediaBox {
    let corners: Option<Vec<f32>> = inherited(doc, page_id, b"MediaBox")
        .and_then(|m| m.as_array().ok())
        .filter(|a| a.len() >= 4)
        .map(|a| a.iter().take(4).map(|v| v.as_float().unwrap_or(0.0)).collect());

    match corners.as_deref() {
        Some(&[x0, y0, x1, y1]) if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => MediaBox {
            llx: x0.min(x1),
            lly: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        },
        _ => MediaBox {
            llx: 0.0,
            lly: 0.0,
            width: DEFAULT_PAGE_SIZE.0,
            height: DEFAULT_PAGE_SIZE.1,
        },
    }
}

/// WinAnsi code points 0x80..=0x9F, `None` where the code is unassigned
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('€'),
    None,
    Some('‚'),
    Some('ƒ'),
    Some('„'),
    Some('…'),
    Some('†'),
    Some('‡'),
    Some('ˆ'),
    Some('‰'),
    Some('Š'),
    Some('‹'),
    Some('Œ'),
    None,
    Some('Ž'),
    None,
    None,
    Some('‘'),
    Some('’'),
    Some('“'),
    Some('”'),
    Some('•'),
    Some('–'),
    Some('—'),
    Some('˜'),
    Some('™'),
    Some('š'),
    Some('›'),
    Some('œ'),
    None,
    Some('ž'),
    Some('Ÿ'),
];

/// Decode a PDF string: UTF-16BE with BOM, then UTF-8, then WinAnsi
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => WIN_ANSI_HIGH[usize::from(b - 0x80)].unwrap_or('\u{FFFD}'),
            _ => char::from(b),
        })
        .collect()
}

/// Encode text for a WinAnsi font; characters outside it become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .position(|&w| w == Some(c))
                .map_or(b'?', |i| 0x80 + i as u8),
        })
        .collect()
}

/// PDF text string: literal when ASCII, otherwise UTF-16BE with BOM
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Geometry parameters of an image media type, e.g. `image/jpeg; width=8; height=8`
fn media_params(media_type: &str) -> (&str, BTreeMap<&str, &str>) {
    let mut parts = media_type.split(';').map(str::trim);
    let essence = parts.next().unwrap_or("");
    let params = parts.filter_map(|p| p.split_once('=')).collect();
    (essence, params)
}

impl PdfCodec {
    fn decode_page(doc: &lopdf::Document, index: usize, page_id: ObjectId) -> std::result::Result<Page, ExtractError> {
        let media = media_box(doc, page_id);
        let content = doc
            .get_page_content(page_id)
            .map_err(|e| ExtractError::CorruptDocument(format!("page {}: unreadable content: {}", index, e)))?;
        let content = Content::decode(&content)
            .map_err(|e| ExtractError::CorruptDocument(format!("page {}: unreadable content: {}", index, e)))?;
        let resources = inherited(doc, page_id, b"Resources").and_then(|r| r.as_dict().ok());

        let items = PageScanner::new(doc, resources).run(&content.operations);

        let mut blocks = Vec::with_capacity(items.len());
        for item in items {
            let id = BlockId::new(index, blocks.len());
            match item {
                Item::Text(open) => {
                    let text = open.text.split_whitespace().collect::<Vec<_>>().join(" ");
                    let Some(rect) = open.rect.filter(|_| !text.is_empty()) else {
                        continue;
                    };
                    let bbox = media.to_bbox(rect);
                    let font = open.font.unwrap_or_default();
                    let baseline = open
                        .first_baseline
                        .map_or(font.size, |b| rect.y1 - b);
                    blocks.push(Block::Text(TextBlock {
                        baseline,
                        ..TextBlock::new(id, bbox, font, text)
                    }));
                }
                Item::Image(rect, payload) => blocks.push(Block::Image(ImageBlock {
                    id,
                    bbox: media.to_bbox(rect),
                    payload,
                })),
            }
        }

        let mut page = Page {
            id: PageId(index),
            width: media.width,
            height: media.height,
            raster: false,
            blocks,
        };
        page.raster = page.text_blocks().next().is_none() && page.image_blocks().next().is_some();
        Ok(page)
    }

    fn read_metadata(doc: &lopdf::Document) -> BTreeMap<String, String> {
        let info = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|i| resolve_dict(doc, i));
        let Some(info) = info else {
            return BTreeMap::new();
        };
        info.iter()
            .filter_map(|(key, value)| {
                let value = resolve(doc, value)?.as_str().ok()?;
                Some((String::from_utf8_lossy(key).into_owned(), decode_pdf_string(value)))
            })
            .collect()
    }

    /// Image XObject for a payload, `None` when it cannot be embedded
    fn image_stream(payload: &ImagePayload) -> Option<Stream> {
        let (essence, params) = media_params(&payload.media_type);
        let filter = match essence {
            "image/jpeg" => Some("DCTDecode"),
            "image/jp2" => Some("JPXDecode"),
            PDF_IMAGE_MEDIA_TYPE => None,
            _ => return None,
        };
        let int = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok()).filter(|v| *v > 0);
        let (width, height) = (int("width")?, int("height")?);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width));
        dict.set("Height", Object::Integer(height));
        dict.set("BitsPerComponent", Object::Integer(int("bpc").unwrap_or(8)));
        let color_space = params.get("cs").copied().unwrap_or("DeviceRGB");
        dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
        if let Some(filter) = filter {
            dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        }
        Some(Stream::new(dict, payload.data.clone()))
    }

    fn text_operations(block: &TextBlock, page_height: f32, operations: &mut Vec<Operation>) {
        let size = block.layout.as_ref().map_or(block.font.size, |l| l.font_size);
        let line_height = block.layout.as_ref().map_or(size * 1.2, |l| l.line_height);
        let lines: Vec<&str> = match &block.layout {
            Some(layout) if !layout.lines.is_empty() => layout.lines.iter().map(String::as_str).collect(),
            _ => block.text.lines().collect(),
        };
        let baseline = if block.baseline > 0.0 { block.baseline } else { size };
        let font = if block.font.is_bold() { "F2" } else { "F1" };

        let mut marked = Dictionary::new();
        marked.set("ActualText", text_string(&block.text));
        operations.push(Operation::new(
            "BDC",
            vec![Object::Name(b"Span".to_vec()), Object::Dictionary(marked)],
        ));
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), Object::Real(size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![
                Object::Real(block.bbox.x),
                Object::Real(page_height - block.bbox.y - baseline),
            ],
        ));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("Td", vec![Object::Real(0.0), Object::Real(-line_height)]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));
        operations.push(Operation::new("EMC", vec![]));
    }

    fn standard_font(base_font: &str) -> Dictionary {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        font
    }
}

impl DocumentCodec for PdfCodec {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn detect(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(PDF_MAGIC)
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<DecodedDocument, ExtractError> {
        if !self.detect(bytes) {
            return Err(ExtractError::UnsupportedFormat("missing %PDF- signature".to_string()));
        }
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| ExtractError::CorruptDocument(format!("unreadable PDF: {}", e)))?;

        let page_ids = doc.get_pages();
        debug!("Decoding PDF {} with {} page(s)", doc.version, page_ids.len());

        let mut pages = Vec::with_capacity(page_ids.len());
        let mut page_failures = Vec::new();
        for (index, &page_id) in page_ids.values().enumerate() {
            match Self::decode_page(&doc, index, page_id) {
                Ok(page) => pages.push(page),
                Err(e) => {
                    warn!("Failed to decode page {}: {}", index, e);
                    page_failures.push((PageId(index), e));
                }
            }
        }

        let mut document = Document::new(
            SourceFormat::Pdf {
                version: doc.version.clone(),
            },
            pages,
        );
        document.metadata = Self::read_metadata(&doc);

        Ok(DecodedDocument { document, page_failures })
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        let version = match &document.format {
            SourceFormat::Pdf { version } => version.as_str(),
            SourceFormat::Layout { .. } => "1.7",
        };
        let mut doc = lopdf::Document::with_version(version);
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(Self::standard_font("Helvetica"));
        let bold = doc.add_object(Self::standard_font("Helvetica-Bold"));

        let mut kids = Vec::with_capacity(document.pages.len());
        for page in &document.pages {
            let mut operations = Vec::new();
            let mut xobjects = Dictionary::new();

            for block in &page.blocks {
                match block {
                    Block::Text(text) if text.has_text() => Self::text_operations(text, page.height, &mut operations),
                    Block::Text(_) => {}
                    Block::Image(image) => {
                        let Some(stream) = Self::image_stream(&image.payload) else {
                            warn!(
                                "Block {} ({}) cannot be embedded in a PDF, leaving it out",
                                image.id, image.payload.media_type
                            );
                            continue;
                        };
                        let name = format!("Im{}", xobjects.len());
                        xobjects.set(name.clone(), Object::Reference(doc.add_object(stream)));
                        let bbox = image.bbox;
                        operations.push(Operation::new("q", vec![]));
                        operations.push(Operation::new(
                            "cm",
                            vec![
                                Object::Real(bbox.width),
                                Object::Real(0.0),
                                Object::Real(0.0),
                                Object::Real(bbox.height),
                                Object::Real(bbox.x),
                                Object::Real(page.height - bbox.y - bbox.height),
                            ],
                        ));
                        operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                        operations.push(Operation::new("Q", vec![]));
                    }
                }
            }

            let content = Content { operations }
                .encode()
                .with_context(|| format!("Failed to encode content of page {}", page.id))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let mut fonts = Dictionary::new();
            fonts.set("F1", Object::Reference(regular));
            fonts.set("F2", Object::Reference(bold));
            let mut resources = Dictionary::new();
            resources.set("Font", Object::Dictionary(fonts));
            resources.set("XObject", Object::Dictionary(xobjects));

            let page_dict = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page.width),
                        Object::Real(page.height),
                    ]),
                ),
                ("Resources", Object::Dictionary(resources)),
                ("Contents", Object::Reference(content_id)),
            ]);
            kids.push(Object::Reference(doc.add_object(page_dict)));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut info = Dictionary::new();
        for (key, value) in &document.metadata {
            info.set(key.clone(), text_string(value));
        }
        info.set("Producer", text_string(concat!("doctrans ", env!("CARGO_PKG_VERSION"))));
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();
        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| anyhow!("Failed to write PDF: {}", e))?;
        Ok(out)
    }
}
