/*!
 * Document model and container codecs.
 *
 * - `model`: pages, blocks and the identifiers that stay stable end-to-end
 * - `codec`: signature detection and container encode/decode
 * - `pdf`: PDF decode through content-stream interpretation, and re-encode
 */

pub mod codec;
pub mod model;
pub mod pdf;

pub use self::codec::{DecodedDocument, DocumentCodec, LayoutCodec, codec_for_bytes, codec_for_format};
pub use self::model::{
    Block, BlockId, BoundingBox, Document, FontDescriptor, ImageBlock, ImagePayload, LanguageDistribution, Page,
    PageId, SourceFormat, TextBlock, TextLayout,
};
pub use self::pdf::PdfCodec;
