/*!
 * Document composer.
 *
 * Rebuilds a page from its source and the rendered text blocks. Non-text
 * regions are cloned untouched, block order and ids are preserved, and
 * every text block of the source must be accounted for exactly once.
 */

use log::debug;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::document::{Block, BlockId, Document, Page, SourceFormat, TextBlock};
use crate::errors::CompositionError;
use crate::layout::ReflowedBlock;

/// Rendering decision for one text block
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedBlock {
    /// Translated (or passed-through) text laid out by the reflow engine
    Reflowed(ReflowedBlock),
    /// Keep the source block exactly as it was
    Original(BlockId),
}

impl RenderedBlock {
    pub fn block_id(&self) -> BlockId {
        match self {
            RenderedBlock::Reflowed(r) => r.block_id,
            RenderedBlock::Original(id) => *id,
        }
    }
}

fn apply_reflow(source: &TextBlock, reflowed: ReflowedBlock) -> TextBlock {
    let layout = reflowed.layout();
    TextBlock {
        bbox: reflowed.bbox,
        baseline: source.baseline * reflowed.scale,
        text: reflowed.text,
        layout: Some(layout),
        ..source.clone()
    }
}

/// Compose an output page from `original` and one rendering per text block
pub fn compose_page(original: &Page, rendered: Vec<RenderedBlock>) -> Result<Page, CompositionError> {
    let mut by_id: BTreeMap<BlockId, RenderedBlock> = BTreeMap::new();
    for block in rendered {
        match by_id.entry(block.block_id()) {
            Entry::Occupied(entry) => return Err(CompositionError::DuplicateBlock(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(block);
            }
        }
    }

    let mut blocks = Vec::with_capacity(original.blocks.len());
    for block in &original.blocks {
        match block {
            Block::Image(image) => {
                if by_id.contains_key(&image.id) {
                    return Err(CompositionError::NotTextBlock(image.id));
                }
                blocks.push(Block::Image(image.clone()));
            }
            Block::Text(text) => {
                let composed = match by_id.remove(&text.id) {
                    Some(RenderedBlock::Reflowed(reflowed)) => apply_reflow(text, reflowed),
                    Some(RenderedBlock::Original(_)) => text.clone(),
                    None => return Err(CompositionError::MissingBlock(text.id)),
                };
                blocks.push(Block::Text(composed));
            }
        }
    }

    if let Some(stray) = by_id.keys().next() {
        return Err(CompositionError::UnknownBlock(*stray));
    }

    debug!("Composed page {} with {} block(s)", original.id, blocks.len());

    Ok(Page {
        id: original.id,
        width: original.width,
        height: original.height,
        raster: original.raster,
        blocks,
    })
}

/// Assemble composed pages into an output document, ordered by page id
pub fn assemble_document(
    format: SourceFormat,
    metadata: BTreeMap<String, String>,
    dominant_language: Option<String>,
    mut pages: Vec<Page>,
) -> Document {
    pages.sort_by_key(|p| p.id);
    let mut document = Document::new(format, pages);
    document.metadata = metadata;
    document.dominant_language = dominant_language;
    document
}
